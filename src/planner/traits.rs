//! 符号规划器抽象

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::AgentError;
use crate::planner::Plan;

/// 规划器失败原因；执行循环统一视作 PlannerFailure 并回退
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlannerError {
    #[error("planner timed out after {0}s")]
    Timeout(u64),

    #[error("problem is unsolvable: {0}")]
    Unsolvable(String),

    #[error("planner exited with status {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    #[error("planner produced no plan file at {0}")]
    NoPlanFile(String),

    #[error("planner I/O error: {0}")]
    Io(String),

    #[error("unreadable plan: {0}")]
    Parse(String),
}

impl From<PlannerError> for AgentError {
    fn from(e: PlannerError) -> Self {
        AgentError::PlannerFailure(e.to_string())
    }
}

/// 输入领域与问题文件，返回计划
#[async_trait]
pub trait SymbolicPlanner: Send + Sync {
    fn name(&self) -> &str;

    async fn plan(&self, domain: &Path, problem: &Path) -> Result<Plan, PlannerError>;
}
