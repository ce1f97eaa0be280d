//! 运行构建器：按配置装配 LLM、推理器、策略、规划器、仿真世界与执行循环
//!
//! 二进制与集成测试共用同一套装配逻辑；测试可以用 with_* 注入替身（Mock LLM、脚本化规划器、自定义场景）。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::core::AgentError;
use crate::execution::ExecutionLoop;
use crate::llm::{LlmClient, OpenAiClient};
use crate::pddl::ProblemSynchronizer;
use crate::planner::{FastDownwardPlanner, GridSearchPlanner, SymbolicPlanner};
use crate::policy::{build_policy, Strategy};
use crate::reasoning::Reasoner;
use crate::sim::{capture_topology, GridWorld, MazeSpec, Scenario};

/// 运行构建器
pub struct RunBuilder {
    config: AppConfig,
    llm: Option<Option<Arc<dyn LlmClient>>>,
    planner: Option<Arc<dyn SymbolicPlanner>>,
    scenario: Option<Scenario>,
    strategy: Option<Strategy>,
    workspace: Option<PathBuf>,
}

impl RunBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            llm: None,
            planner: None,
            scenario: None,
            strategy: None,
            workspace: None,
        }
    }

    /// 指定 LLM 客户端（覆盖配置）
    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(Some(llm));
        self
    }

    /// 只用离线回退表
    pub fn offline(mut self) -> Self {
        self.llm = Some(None);
        self
    }

    pub fn with_planner(mut self, planner: Arc<dyn SymbolicPlanner>) -> Self {
        self.planner = Some(planner);
        self
    }

    pub fn with_scenario(mut self, scenario: Scenario) -> Self {
        self.scenario = Some(scenario);
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn with_workspace(mut self, workspace: impl Into<PathBuf>) -> Self {
        self.workspace = Some(workspace.into());
        self
    }

    /// 构建 LLM 客户端；无 API Key 或 provider = offline 时返回 None
    pub fn build_llm(&self) -> Option<Arc<dyn LlmClient>> {
        if let Some(llm) = &self.llm {
            return llm.clone();
        }
        let provider = self.config.llm.provider.to_lowercase();
        let deepseek_key = std::env::var("DEEPSEEK_API_KEY").ok();
        let openai_key = std::env::var("OPENAI_API_KEY").ok();
        match provider.as_str() {
            "deepseek" if deepseek_key.is_some() => {
                tracing::info!("Using DeepSeek LLM ({})", self.config.llm.model);
                Some(Arc::new(OpenAiClient::deepseek(Some(&self.config.llm.model))))
            }
            "openai" if openai_key.is_some() => {
                tracing::info!("Using OpenAI LLM ({})", self.config.llm.model);
                Some(Arc::new(OpenAiClient::new(
                    self.config.llm.base_url.as_deref(),
                    &self.config.llm.model,
                    openai_key.as_deref(),
                )))
            }
            _ => {
                tracing::warn!(provider = %provider, "No API key set or provider is offline, using the offline brand table");
                None
            }
        }
    }

    /// 构建规划器：grid（进程内）或 fast_downward（外部进程）
    pub fn build_planner(&self, workspace: &std::path::Path) -> Result<Arc<dyn SymbolicPlanner>, AgentError> {
        if let Some(planner) = &self.planner {
            return Ok(planner.clone());
        }
        let section = &self.config.planner;
        match section.backend.to_lowercase().as_str() {
            "grid" => Ok(Arc::new(GridSearchPlanner::new())),
            "fast_downward" | "fast-downward" => Ok(Arc::new(
                FastDownwardPlanner::new(section.command.clone(), workspace)
                    .with_search(section.search.clone())
                    .with_timeout(Duration::from_secs(section.timeout_secs)),
            )),
            other => Err(AgentError::ConfigError(format!("unknown planner backend: {other}"))),
        }
    }

    /// 场景：显式注入 > 配置文件 > 内置 id；配置了迷宫种子时追加随机迷宫
    pub async fn resolve_scenario(&self) -> Result<Scenario, AgentError> {
        let world = &self.config.world;
        let mut scenario = match (&self.scenario, &world.scenario_file) {
            (Some(s), _) => s.clone(),
            (None, Some(path)) => Scenario::load(path).await?,
            (None, None) => Scenario::by_id(&world.scenario).ok_or_else(|| {
                AgentError::ConfigError(format!("unknown scenario: {}", world.scenario))
            })?,
        };
        if let Some(seed) = world.maze_seed {
            scenario.maze = Some(MazeSpec {
                wall_density: world.wall_density,
                seed,
                extra_stores: world.extra_stores,
            });
        }
        Ok(scenario)
    }

    pub async fn build(self) -> Result<ExecutionLoop<GridWorld>, AgentError> {
        let scenario = self.resolve_scenario().await?;
        let workspace = self
            .workspace
            .clone()
            .unwrap_or_else(|| self.config.workspace());
        let item = self.config.run.target_item.clone();

        let world = scenario.build_world(&item, self.config.world.sensor_radius);
        let topology = capture_topology(&world);
        let sync = ProblemSynchronizer::new(workspace.join(format!("problem_{}.pddl", scenario.id)), topology);

        let reasoner = Arc::new(Reasoner::new(self.build_llm(), item, self.config.policy.weights()));
        let strategy = self.strategy.unwrap_or(self.config.policy.strategy);
        let policy = build_policy(strategy, reasoner.clone(), self.config.policy.thresholds());
        let planner = self.build_planner(&workspace)?;

        tracing::info!(
            scenario = %scenario.id,
            strategy = %strategy,
            planner = planner.name(),
            workspace = %workspace.display(),
            "run assembled"
        );
        let goal = &scenario.goal;
        Ok(ExecutionLoop::new(
            self.config.run_settings(scenario.id.clone()),
            world,
            sync,
            planner,
            policy,
        )
        .with_known_store(&goal.name, goal.position, goal.price)
        .with_reasoner(reasoner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::sim::Simulator;

    #[test]
    fn test_offline_provider_builds_no_client() {
        let mut cfg = AppConfig::default();
        cfg.llm.provider = "offline".into();
        assert!(RunBuilder::new(cfg).build_llm().is_none());
    }

    #[test]
    fn test_injected_llm_wins() {
        let builder = RunBuilder::new(AppConfig::default()).with_llm(Arc::new(MockLlmClient::default()));
        assert!(builder.build_llm().is_some());
    }

    #[test]
    fn test_unknown_planner_backend_is_config_error() {
        let mut cfg = AppConfig::default();
        cfg.planner.backend = "lama".into();
        let err = RunBuilder::new(cfg).build_planner(std::path::Path::new("."));
        assert!(matches!(err, Err(AgentError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_resolve_scenario_applies_maze_seed() {
        let mut cfg = AppConfig::default();
        cfg.world.scenario = "scenario_2".into();
        cfg.world.maze_seed = Some(9);
        let scenario = RunBuilder::new(cfg).resolve_scenario().await.unwrap();
        assert_eq!(scenario.id, "scenario_2");
        assert_eq!(scenario.maze.map(|m| m.seed), Some(9));
    }

    #[tokio::test]
    async fn test_build_seeds_goal_store() {
        let dir = tempfile::TempDir::new().unwrap();
        let run = RunBuilder::new(AppConfig::default())
            .offline()
            .with_workspace(dir.path())
            .build()
            .await
            .unwrap();
        let victory = run.belief().entity("victory").unwrap();
        assert_eq!(victory.position, run.simulator().pose().position.offset(17, 17));
        assert!(victory.properties.sells_target_item);
    }
}
