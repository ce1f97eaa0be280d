//! 规划层：符号计划、规划器抽象、Fast Downward 外部进程与进程内网格搜索

pub mod fast_downward;
pub mod grid_search;
pub mod plan;
pub mod traits;

pub use fast_downward::FastDownwardPlanner;
pub use grid_search::GridSearchPlanner;
pub use plan::{Plan, SymbolicStep};
pub use traits::{PlannerError, SymbolicPlanner};
