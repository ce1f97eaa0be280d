//! 错误恢复引擎
//!
//! 根据 AgentError 类型返回 RecoveryAction；RepeatGuard 统计连续相同错误，达到上限即升级为 RepeatedErrorLoop。

use crate::core::{AgentError, RecoveryAction};

/// 语义化错误恢复：将错误映射为可执行动作（重置重规划 / 回退 / 终止）
#[derive(Debug, Default)]
pub struct RecoveryEngine;

impl RecoveryEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, err: &AgentError) -> RecoveryAction {
        match err {
            AgentError::PlannerFailure(_) => RecoveryAction::Backtrack,
            AgentError::MalformedStep(_)
            | AgentError::Desynchronization { .. }
            | AgentError::Stuck { .. }
            | AgentError::Collision(_) => RecoveryAction::ResetAndReplan,
            AgentError::SynchronizationFailure(_) | AgentError::RepeatedErrorLoop { .. } => {
                RecoveryAction::Abort
            }
            AgentError::ConfigError(_) | AgentError::Io(_) => RecoveryAction::Abort,
        }
    }
}

/// 连续相同错误计数器：同一消息连续出现第 max_repeats 次（含）即返回 RepeatedErrorLoop
#[derive(Debug)]
pub struct RepeatGuard {
    max_repeats: u32,
    last: Option<String>,
    count: u32,
}

impl RepeatGuard {
    pub fn new(max_repeats: u32) -> Self {
        Self {
            max_repeats: max_repeats.max(1),
            last: None,
            count: 0,
        }
    }

    pub fn record(&mut self, err: &AgentError) -> Result<(), AgentError> {
        let message = err.to_string();
        if self.last.as_deref() == Some(message.as_str()) {
            self.count += 1;
        } else {
            self.last = Some(message.clone());
            self.count = 1;
        }
        if self.count >= self.max_repeats {
            return Err(AgentError::RepeatedErrorLoop {
                message,
                count: self.count,
            });
        }
        Ok(())
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// 取得进展（完成一个步骤）后清零
    pub fn clear(&mut self) {
        self.last = None;
        self.count = 0;
    }
}
