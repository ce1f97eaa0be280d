//! 状态定义：执行循环阶段、运行统计与最终报告
//!
//! 循环内部只改 RunStats；结束时连同结果与最终位姿一起生成 RunReport，由二进制序列化输出。

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::policy::Strategy;
use crate::world::Pose;

/// 执行循环阶段
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopPhase {
    AwaitObservation,
    EvaluateDiscovery,
    SyncAndPlan,
    ExecutePrimitive,
    VerifyArrival,
    Recover,
    Done,
    Abort,
}

/// 运行计数器
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub iterations: u32,
    pub primitives: u32,
    pub replans: u32,
    pub discoveries: u32,
    pub backtracks: u32,
    pub desyncs: u32,
    pub collisions: u32,
    pub planner_failures: u32,
    pub stuck_resets: u32,
    pub reasoner_calls: u64,
    pub reasoner_fallbacks: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// 已买到目标商品
    Done { store: String, price: Option<f64> },
    /// 预算耗尽等非致命终止
    Aborted { reason: String },
}

impl RunOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, RunOutcome::Done { .. })
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub strategy: Strategy,
    pub scenario: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: RunOutcome,
    pub stats: RunStats,
    pub final_pose: Pose,
}

impl RunReport {
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}
