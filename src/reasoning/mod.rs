//! 推理层：LLM 感知 / 访问判断与离线回退

pub mod fallback;
pub mod judgement;
pub mod reasoner;

pub use fallback::VisitWeights;
pub use judgement::{extract_json, schema_json, Judgement, VisitJudgement};
pub use reasoner::{Reasoner, VisitContext};
