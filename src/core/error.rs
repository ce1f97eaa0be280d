//! 运行错误类型与恢复动作
//!
//! 与 RecoveryEngine 配合：根据 AgentError 决定 ResetAndReplan / Backtrack / Abort。

use thiserror::Error;

use crate::world::Coord;

/// 执行循环中可能出现的错误（步骤格式、文档同步、规划器、位姿失步等）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AgentError {
    /// 符号步骤的目标不是单轴单位位移，或动作字符串无法解析
    #[error("Malformed step: {0}")]
    MalformedStep(String),

    /// 问题文档结构损坏（缺少子句、括号不平衡、目标子句数量不对等），文件保持原样
    #[error("Problem synchronization failed: {0}")]
    SynchronizationFailure(String),

    /// 规划器超时、无解或返回空计划
    #[error("Planner failure: {0}")]
    PlannerFailure(String),

    #[error("Desynchronized: expected {expected}, observed {observed}")]
    Desynchronization { expected: Coord, observed: Coord },

    #[error("Stuck at {position} for {iterations} iterations")]
    Stuck { position: Coord, iterations: u32 },

    /// 前进动作被未知物体阻挡
    #[error("Collision ahead at {0}")]
    Collision(Coord),

    #[error("Repeated error loop ({count}x): {message}")]
    RepeatedErrorLoop { message: String, count: u32 },

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for AgentError {
    fn from(e: std::io::Error) -> Self {
        AgentError::Io(e.to_string())
    }
}

impl AgentError {
    /// 只有文档损坏与重复错误循环会终止整个运行
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AgentError::SynchronizationFailure(_) | AgentError::RepeatedErrorLoop { .. }
        )
    }
}

/// 恢复引擎根据错误类型给出的建议动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// 清空动作缓冲、重置步骤索引并重新规划
    ResetAndReplan,
    /// 执行紧急回退序列（右转、右转、前进），回退完成后再规划
    Backtrack,
    /// 终止运行
    Abort,
}

impl RecoveryAction {
    pub fn label(&self) -> &'static str {
        match self {
            RecoveryAction::ResetAndReplan => "reset_and_replan",
            RecoveryAction::Backtrack => "backtrack",
            RecoveryAction::Abort => "abort",
        }
    }
}
