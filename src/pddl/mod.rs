//! PDDL 层：S 表达式解析、事实、问题文档、领域模板与问题同步器

pub mod document;
pub mod fact;
pub mod sexpr;
pub mod synchronizer;
pub mod template;

use thiserror::Error;

pub use document::ProblemDocument;
pub use fact::{ensure_integral, Fact, AGENT_OBJECT};
pub use sexpr::SExpr;
pub use synchronizer::ProblemSynchronizer;
pub use template::{ProblemTemplate, DOMAIN_NAME, DOMAIN_PDDL};

/// 文档解析与结构校验错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PddlError {
    #[error("Unbalanced delimiters: {0} unclosed '('")]
    Unclosed(usize),

    #[error("Unexpected ')' at byte {0}")]
    UnexpectedClose(usize),

    #[error("Empty document")]
    Empty,

    #[error("No (define ...) form found")]
    NotADefinition,

    #[error("Missing clause {0}")]
    MissingClause(String),

    #[error("Expected exactly one {keyword} clause, found {found}")]
    ClauseCount { keyword: String, found: usize },

    #[error("Fractional numeric literal not allowed: {0}")]
    FractionalLiteral(String),
}

impl From<PddlError> for crate::core::AgentError {
    fn from(e: PddlError) -> Self {
        crate::core::AgentError::SynchronizationFailure(e.to_string())
    }
}
