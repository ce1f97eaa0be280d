//! 执行层：状态机主循环、过程事件与卡死看门狗

pub mod events;
pub mod loop_;
pub mod watchdog;

pub use events::RunEvent;
pub use loop_::ExecutionLoop;
pub use watchdog::StuckWatchdog;
