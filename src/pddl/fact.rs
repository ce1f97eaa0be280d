//! `:init` 中的事实：类型化表示与 S 表达式互转

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::pddl::{PddlError, SExpr};
use crate::world::Coord;

/// 智能体在 PDDL 中的常量名
pub const AGENT_OBJECT: &str = "agent";

/// `:init` 中的一条事实；无法识别的保留原样
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fact {
    AtAgent(Coord),
    AtStore { store: String, at: Coord },
    Selling { store: String, item: String },
    Blocked(Coord),
    Clear(Coord),
    Connected(Coord, Coord),
    Other(SExpr),
}

impl Fact {
    pub fn at_store(store: impl Into<String>, at: Coord) -> Self {
        Fact::AtStore {
            store: store.into(),
            at,
        }
    }

    pub fn selling(store: impl Into<String>, item: impl Into<String>) -> Self {
        Fact::Selling {
            store: store.into(),
            item: item.into(),
        }
    }

    pub fn from_sexpr(expr: &SExpr) -> Self {
        let atoms: Option<Vec<String>> = expr.as_list().and_then(|items| {
            items
                .iter()
                .map(|i| i.as_atom().map(|a| a.to_ascii_lowercase()))
                .collect()
        });
        let parsed = atoms.and_then(|words| {
            let loc = |s: &String| Coord::parse_location(s);
            match words.as_slice() {
                [p, _agent, l] if p == "at_agent" => loc(l).map(Fact::AtAgent),
                [p, s, l] if p == "at_store" => loc(l).map(|at| Fact::at_store(s.as_str(), at)),
                [p, s, i] if p == "selling" => Some(Fact::selling(s.as_str(), i.as_str())),
                [p, l] if p == "blocked" => loc(l).map(Fact::Blocked),
                [p, l] if p == "clear" => loc(l).map(Fact::Clear),
                [p, a, b] if p == "connected" => Some(Fact::Connected(loc(a)?, loc(b)?)),
                _ => None,
            }
        });
        parsed.unwrap_or_else(|| Fact::Other(expr.clone()))
    }

    pub fn to_sexpr(&self) -> SExpr {
        match self {
            Fact::AtAgent(c) => SExpr::from_atoms(&["at_agent", AGENT_OBJECT, &c.location_name()]),
            Fact::AtStore { store, at } => {
                SExpr::from_atoms(&["at_store", store.as_str(), &at.location_name()])
            }
            Fact::Selling { store, item } => {
                SExpr::from_atoms(&["selling", store.as_str(), item.as_str()])
            }
            Fact::Blocked(c) => SExpr::from_atoms(&["blocked", &c.location_name()]),
            Fact::Clear(c) => SExpr::from_atoms(&["clear", &c.location_name()]),
            Fact::Connected(a, b) => {
                SExpr::from_atoms(&["connected", &a.location_name(), &b.location_name()])
            }
            Fact::Other(expr) => expr.clone(),
        }
    }

    /// 数值价格事实 `(= (item-price ...) n)`
    pub fn is_price_fact(&self) -> bool {
        match self {
            Fact::Other(expr) => {
                expr.head() == Some("=")
                    && expr
                        .as_list()
                        .and_then(|items| items.get(1))
                        .and_then(SExpr::head)
                        .is_some_and(|h| h.to_ascii_lowercase().contains("price"))
            }
            _ => false,
        }
    }

    /// 拓扑事实（连通 / 墙 / 可通行）
    pub fn is_topology(&self) -> bool {
        matches!(self, Fact::Blocked(_) | Fact::Clear(_) | Fact::Connected(..))
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_sexpr())
    }
}

fn fractional_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:^|[\s(])(?:\d+\.\d*|\.\d+)(?:[\s)]|$)").unwrap())
}

/// 规划器不接受小数：出现小数字面量即拒绝
pub fn ensure_integral(text: &str) -> Result<(), PddlError> {
    match fractional_pattern().find(text) {
        Some(m) => Err(PddlError::FractionalLiteral(m.as_str().trim().to_string())),
        None => Ok(()),
    }
}
