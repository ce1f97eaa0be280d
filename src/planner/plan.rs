//! 符号计划：规划器输出的动作序列（不可变，由执行循环按 current_step_index 消费）

use std::fmt;

use serde::Serialize;

use crate::core::AgentError;
use crate::world::Coord;

/// 单个符号步骤
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SymbolicStep {
    /// `drive loc_a loc_b`
    Drive { from: Coord, to: Coord },
    /// `buy item store loc`：无位移目标，立即完成
    Buy {
        item: String,
        store: String,
        at: Option<Coord>,
    },
}

impl SymbolicStep {
    /// 解析规划器动作串，如 `(drive loc_1_1 loc_2_1)`；括号可选，大小写不敏感
    pub fn parse(raw: &str) -> Result<Self, AgentError> {
        let cleaned = raw.trim().trim_start_matches('(').trim_end_matches(')').to_ascii_lowercase();
        let words: Vec<&str> = cleaned.split_whitespace().collect();
        let location = |s: &str| {
            Coord::parse_location(s)
                .ok_or_else(|| AgentError::MalformedStep(format!("bad location '{s}' in '{raw}'")))
        };
        match words.as_slice() {
            ["drive", from, to] => Ok(SymbolicStep::Drive {
                from: location(*from)?,
                to: location(*to)?,
            }),
            ["buy", item, store, rest @ ..] => Ok(SymbolicStep::Buy {
                item: item.to_string(),
                store: store.to_string(),
                at: rest.first().and_then(|l| Coord::parse_location(l)),
            }),
            _ => Err(AgentError::MalformedStep(format!("unknown action '{raw}'"))),
        }
    }

    /// 位移目标；Buy 没有
    pub fn target(&self) -> Option<Coord> {
        match self {
            SymbolicStep::Drive { to, .. } => Some(*to),
            SymbolicStep::Buy { .. } => None,
        }
    }

    /// 计划经过的格子（用于路径阻挡判断）：drive 的目的地与 buy 的位置
    pub fn touches(&self) -> Option<Coord> {
        match self {
            SymbolicStep::Drive { to, .. } => Some(*to),
            SymbolicStep::Buy { at, .. } => *at,
        }
    }
}

impl fmt::Display for SymbolicStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolicStep::Drive { from, to } => {
                write!(f, "drive {} {}", from.location_name(), to.location_name())
            }
            SymbolicStep::Buy { item, store, at } => {
                write!(f, "buy {item} {store}")?;
                if let Some(at) = at {
                    write!(f, " {}", at.location_name())?;
                }
                Ok(())
            }
        }
    }
}

/// 规划结果
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Plan {
    pub steps: Vec<SymbolicStep>,
}

impl Plan {
    pub fn new(steps: Vec<SymbolicStep>) -> Self {
        Self { steps }
    }

    /// 从规划器文本输出解析：跳过空行与 `;` 注释行（如 `; cost = 12`）
    pub fn parse(text: &str) -> Result<Self, AgentError> {
        let steps = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with(';'))
            .map(SymbolicStep::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { steps })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SymbolicStep> {
        self.steps.get(index)
    }

    /// 从 index 起尚未执行的步骤
    pub fn remaining(&self, index: usize) -> &[SymbolicStep] {
        self.steps.get(index..).unwrap_or_default()
    }

    /// 前几步的预览文本（日志 / 事件用）
    pub fn preview(&self, n: usize) -> Vec<String> {
        self.steps.iter().take(n).map(ToString::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fast_downward_output() {
        let text = "(drive loc_1_1 loc_2_1)\n(drive loc_2_1 loc_2_2)\n(buy milk victory loc_2_2)\n; cost = 3 (unit cost)\n";
        let plan = Plan::parse(text).unwrap();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.steps[0].target(), Some(Coord::new(2, 1)));
        assert_eq!(plan.steps[2].target(), None);
        assert_eq!(plan.steps[2].touches(), Some(Coord::new(2, 2)));
        assert_eq!(plan.remaining(1).len(), 2);
        assert!(plan.remaining(7).is_empty());
    }

    #[test]
    fn test_parse_uppercase_and_bare() {
        let step = SymbolicStep::parse("DRIVE LOC_3_4 LOC_3_5").unwrap();
        assert_eq!(
            step,
            SymbolicStep::Drive {
                from: Coord::new(3, 4),
                to: Coord::new(3, 5)
            }
        );
        assert_eq!(step.to_string(), "drive loc_3_4 loc_3_5");
    }

    #[test]
    fn test_parse_malformed_step() {
        assert!(matches!(
            SymbolicStep::parse("drive loc_1_1 somewhere"),
            Err(AgentError::MalformedStep(_))
        ));
        assert!(matches!(
            SymbolicStep::parse("teleport loc_1_1"),
            Err(AgentError::MalformedStep(_))
        ));
    }
}
