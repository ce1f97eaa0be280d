//! 重规划策略：对新发现的实体决定 忽略 / 当作商店 / 当作障碍物，以及是否需要重规划
//!
//! 四种策略共享同一套阻挡检查：实体位于剩余任一步骤的目标格上、且未被判定为要进入的商店时，
//! 一律标为障碍物并强制重规划。被判定要进入的商店永远不会被标为障碍物。

pub mod strategies;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::planner::SymbolicStep;
use crate::reasoning::{Judgement, Reasoner};
use crate::world::{Coord, EntityKind, EntityProperties};

pub use strategies::{DeliberativePolicy, EagerPolicy, PassivePolicy, ThresholdedPolicy};

/// 一次新发现
#[derive(Debug, Clone, PartialEq)]
pub struct Discovery {
    pub name: String,
    pub position: Coord,
    /// 从当前位置出发的步行距离，不可达为 None
    pub walking_distance: Option<u32>,
}

/// 决策时的计划上下文
#[derive(Debug, Clone, Copy)]
pub struct PolicyContext<'a> {
    /// 从当前步骤起的剩余计划
    pub remaining: &'a [SymbolicStep],
    pub agent: Coord,
}

impl PolicyContext<'_> {
    /// 实体是否落在剩余计划的某个目标格上（移动终点与购买地点）
    pub fn is_blocking(&self, position: Coord) -> bool {
        self.remaining.iter().any(|step| step.touches() == Some(position))
    }
}

/// 策略输出
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub trigger_replan: bool,
    pub classify_as: EntityKind,
    pub properties: EntityProperties,
    pub reason: String,
}

impl Decision {
    /// 进入该商店：保留为可通行的 Store 并重规划
    pub fn visit(judgement: &Judgement, reason: impl Into<String>) -> Self {
        Self {
            trigger_replan: true,
            classify_as: EntityKind::Store,
            properties: EntityProperties::seller(judgement.estimated_price),
            reason: reason.into(),
        }
    }

    /// 不进入：标为障碍物，只有挡路时才重规划
    pub fn decline(
        discovery: &Discovery,
        ctx: &PolicyContext<'_>,
        properties: EntityProperties,
        reason: impl Into<String>,
    ) -> Self {
        let blocking = ctx.is_blocking(discovery.position);
        let reason = reason.into();
        Self {
            trigger_replan: blocking,
            classify_as: EntityKind::Obstacle,
            properties,
            reason: if blocking {
                format!("{reason}; blocks planned path at {}", discovery.position)
            } else {
                reason
            },
        }
    }
}

/// 可选策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Passive,
    Eager,
    Deliberative,
    Thresholded,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::Passive,
        Strategy::Eager,
        Strategy::Deliberative,
        Strategy::Thresholded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Passive => "passive",
            Strategy::Eager => "eager",
            Strategy::Deliberative => "deliberative",
            Strategy::Thresholded => "thresholded",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = String;

    /// 接受名称或实验编号 A-D
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "passive" | "a" => Ok(Strategy::Passive),
            "eager" | "b" => Ok(Strategy::Eager),
            "deliberative" | "c" => Ok(Strategy::Deliberative),
            "thresholded" | "d" => Ok(Strategy::Thresholded),
            other => Err(format!("unknown strategy: {other}")),
        }
    }
}

/// Thresholded 策略的闭式规则参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub reference_price: f64,
    /// 节省必须严格大于此值
    pub savings: f64,
    /// 步行距离必须严格小于此值
    pub distance: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            reference_price: 4.0,
            savings: 1.0,
            distance: 10,
        }
    }
}

#[async_trait]
pub trait ReplanPolicy: Send + Sync {
    fn strategy(&self) -> Strategy;

    async fn decide(&self, discovery: &Discovery, ctx: &PolicyContext<'_>) -> Decision;
}

/// 按策略构造策略对象
pub fn build_policy(
    strategy: Strategy,
    reasoner: Arc<Reasoner>,
    thresholds: Thresholds,
) -> Arc<dyn ReplanPolicy> {
    match strategy {
        Strategy::Passive => Arc::new(PassivePolicy),
        Strategy::Eager => Arc::new(EagerPolicy::new(reasoner)),
        Strategy::Deliberative => Arc::new(DeliberativePolicy::new(reasoner)),
        Strategy::Thresholded => Arc::new(ThresholdedPolicy::new(reasoner, thresholds)),
    }
}
