//! 核心层：错误与恢复、循环状态与运行报告、组件装配

pub mod builder;
pub mod error;
pub mod recovery;
pub mod state;

pub use builder::RunBuilder;
pub use error::{AgentError, RecoveryAction};
pub use recovery::{RecoveryEngine, RepeatGuard};
pub use state::{LoopPhase, RunOutcome, RunReport, RunStats};
