//! Scout - 部分可观测网格世界中的重规划智能体
//!
//! 模块划分：
//! - **world**: 坐标、朝向、位姿、运动原语与实体类型
//! - **belief**: 信念存储（位姿、已发现实体、被阻挡格子）
//! - **pddl**: S 表达式、问题模板与问题文件同步器
//! - **planner**: 符号规划器抽象（进程内网格搜索 / Fast Downward）
//! - **translator**: 符号步骤到运动原语的翻译
//! - **llm** / **reasoning**: 商店判断与访问决策（LLM + 离线回退表）
//! - **policy**: 四种重规划策略
//! - **sim**: 网格世界仿真器、内置场景与随机迷宫
//! - **execution**: 执行循环状态机、事件与卡死看门狗
//! - **core**: 错误、恢复、运行报告与组件装配
//! - **config**: 应用配置加载（TOML + 环境变量）

pub mod belief;
pub mod config;
pub mod core;
pub mod execution;
pub mod llm;
pub mod observability;
pub mod pddl;
pub mod planner;
pub mod policy;
pub mod reasoning;
pub mod sim;
pub mod translator;
pub mod world;

pub use crate::core::{RunBuilder, RunReport};
pub use crate::policy::Strategy;
