//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `SCOUT__*` 覆盖（双下划线表示嵌套，如 `SCOUT__POLICY__STRATEGY=eager`）。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::policy::{Strategy, Thresholds};
use crate::reasoning::VisitWeights;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub run: RunSection,
    pub planner: PlannerSection,
    pub policy: PolicySection,
    pub llm: LlmSection,
    pub world: WorldSection,
}

/// [run] 段：目标商品、预算与看门狗
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunSection {
    pub target_item: String,
    /// 循环轮数上限
    pub max_steps: u32,
    /// 位置连续不变超过此轮数视为卡死
    pub stuck_threshold: u32,
    /// 相同错误连续出现第 max_error_repeats 次（含）时终止运行
    pub max_error_repeats: u32,
    /// 问题 / 领域文件所在目录，未设置时用 ./workspace
    pub workspace: Option<PathBuf>,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            target_item: "milk".to_string(),
            max_steps: 200,
            stuck_threshold: 6,
            max_error_repeats: 5,
            workspace: None,
        }
    }
}

/// [planner] 段：后端选择与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlannerSection {
    /// grid / fast_downward
    pub backend: String,
    pub timeout_secs: u64,
    /// Fast Downward 启动命令（fast-downward.py 路径）
    pub command: String,
    pub search: String,
}

impl Default for PlannerSection {
    fn default() -> Self {
        Self {
            backend: "grid".to_string(),
            timeout_secs: 30,
            command: "fast-downward.py".to_string(),
            search: "astar(lmcut())".to_string(),
        }
    }
}

/// [policy] 段：策略与各项阈值 / 权重
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PolicySection {
    pub strategy: Strategy,
    pub reference_price: f64,
    pub savings_threshold: f64,
    pub distance_threshold: u32,
    pub price_weight: f64,
    pub distance_weight: f64,
    pub distance_cost_per_step: f64,
    pub benefit_threshold: f64,
}

impl Default for PolicySection {
    fn default() -> Self {
        let thresholds = Thresholds::default();
        let weights = VisitWeights::default();
        Self {
            strategy: Strategy::Deliberative,
            reference_price: thresholds.reference_price,
            savings_threshold: thresholds.savings,
            distance_threshold: thresholds.distance,
            price_weight: weights.price_weight,
            distance_weight: weights.distance_weight,
            distance_cost_per_step: weights.distance_cost_per_step,
            benefit_threshold: weights.benefit_threshold,
        }
    }
}

impl PolicySection {
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            reference_price: self.reference_price,
            savings: self.savings_threshold,
            distance: self.distance_threshold,
        }
    }

    pub fn weights(&self) -> VisitWeights {
        VisitWeights {
            reference_price: self.reference_price,
            price_weight: self.price_weight,
            distance_weight: self.distance_weight,
            distance_cost_per_step: self.distance_cost_per_step,
            benefit_threshold: self.benefit_threshold,
        }
    }
}

/// [llm] 段：后端选择；无 API Key 或 provider = "offline" 时只用离线回退表
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// deepseek / openai / offline
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "deepseek".to_string(),
            model: "deepseek-chat".to_string(),
            base_url: None,
        }
    }
}

/// [world] 段：场景与传感器
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorldSection {
    /// 内置场景 id（scenario_1 .. scenario_5）
    pub scenario: String,
    /// 自定义场景 TOML 文件，优先于 scenario
    pub scenario_file: Option<PathBuf>,
    pub sensor_radius: u32,
    /// 设置后为场景生成随机迷宫
    pub maze_seed: Option<u64>,
    pub wall_density: f64,
    pub extra_stores: usize,
}

impl Default for WorldSection {
    fn default() -> Self {
        Self {
            scenario: "scenario_3".to_string(),
            scenario_file: None,
            sensor_radius: 3,
            maze_seed: None,
            wall_density: 0.15,
            extra_stores: 0,
        }
    }
}

/// 交给执行循环的运行参数
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub scenario: String,
    pub target_item: String,
    pub max_steps: u32,
    pub stuck_threshold: u32,
    pub max_error_repeats: u32,
    pub planner_timeout: Duration,
}

impl Default for RunSettings {
    fn default() -> Self {
        AppConfig::default().run_settings("default")
    }
}

impl AppConfig {
    pub fn run_settings(&self, scenario: impl Into<String>) -> RunSettings {
        RunSettings {
            scenario: scenario.into(),
            target_item: self.run.target_item.clone(),
            max_steps: self.run.max_steps,
            stuck_threshold: self.run.stuck_threshold,
            max_error_repeats: self.run.max_error_repeats,
            planner_timeout: Duration::from_secs(self.planner.timeout_secs),
        }
    }

    pub fn workspace(&self) -> PathBuf {
        self.run
            .workspace
            .clone()
            .unwrap_or_else(|| PathBuf::from("workspace"))
    }
}

/// 从 config 目录加载配置，环境变量 SCOUT__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 SCOUT__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("SCOUT")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.run.max_steps, 200);
        assert_eq!(cfg.run.stuck_threshold, 6);
        assert_eq!(cfg.policy.strategy, Strategy::Deliberative);
        assert_eq!(cfg.policy.thresholds(), Thresholds::default());
        assert_eq!(cfg.policy.weights(), VisitWeights::default());
        let settings = cfg.run_settings("scenario_1");
        assert_eq!(settings.planner_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_explicit_file_overrides() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "[policy]\nstrategy = \"thresholded\"\ndistance_threshold = 6\n\n[run]\nmax_steps = 50").unwrap();
        drop(f);

        let cfg = load_config(Some(path)).unwrap();
        assert_eq!(cfg.policy.strategy, Strategy::Thresholded);
        assert_eq!(cfg.policy.thresholds().distance, 6);
        assert_eq!(cfg.run.max_steps, 50);
        assert_eq!(cfg.run.target_item, "milk");
    }
}
