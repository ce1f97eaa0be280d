//! 进程内网格搜索规划器
//!
//! 读取同一份问题文档，按领域语义（`connected` + 目标格 `clear`）做 BFS，
//! 找到最近的售卖目标商品的商店，输出 `drive ...` 序列加一个 `buy`。
//! 不依赖外部程序，适合离线运行与测试。

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;

use async_trait::async_trait;

use crate::pddl::{Fact, ProblemDocument, SExpr};
use crate::planner::{Plan, PlannerError, SymbolicPlanner, SymbolicStep};
use crate::world::Coord;

#[derive(Debug, Clone, Default)]
pub struct GridSearchPlanner;

impl GridSearchPlanner {
    pub fn new() -> Self {
        Self
    }

    /// 直接在已解析的文档上求解
    pub fn solve(doc: &ProblemDocument) -> Result<Plan, PlannerError> {
        let facts = doc.init_facts().map_err(|e| PlannerError::Parse(e.to_string()))?;
        let item = goal_item(doc)?;

        let mut start = None;
        let mut edges: HashMap<Coord, Vec<Coord>> = HashMap::new();
        let mut clear: HashSet<Coord> = HashSet::new();
        let mut store_at: HashMap<String, Coord> = HashMap::new();
        let mut sellers: HashSet<String> = HashSet::new();
        for fact in facts {
            match fact {
                Fact::AtAgent(c) => start = Some(c),
                Fact::Connected(a, b) => edges.entry(a).or_default().push(b),
                Fact::Clear(c) => {
                    clear.insert(c);
                }
                Fact::AtStore { store, at } => {
                    store_at.insert(store, at);
                }
                Fact::Selling { store, item: sold } if sold.eq_ignore_ascii_case(&item) => {
                    sellers.insert(store);
                }
                _ => {}
            }
        }
        let start = start.ok_or_else(|| PlannerError::Parse("no at_agent fact".to_string()))?;

        let mut goals: HashMap<Coord, String> = HashMap::new();
        let mut ranked: Vec<(&String, &Coord)> = store_at
            .iter()
            .filter(|(name, _)| sellers.contains(*name))
            .collect();
        ranked.sort();
        for (name, at) in ranked {
            goals.entry(*at).or_insert_with(|| name.clone());
        }
        if goals.is_empty() {
            return Err(PlannerError::Unsolvable(format!("no store sells {item}")));
        }

        // BFS；同层按 connected 出现顺序扩展，结果确定
        let mut parent: HashMap<Coord, Coord> = HashMap::new();
        let mut seen = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        let mut reached = None;
        while let Some(cell) = queue.pop_front() {
            if goals.contains_key(&cell) {
                reached = Some(cell);
                break;
            }
            for next in edges.get(&cell).map(Vec::as_slice).unwrap_or_default() {
                if clear.contains(next) && seen.insert(*next) {
                    parent.insert(*next, cell);
                    queue.push_back(*next);
                }
            }
        }
        let goal = reached.ok_or_else(|| {
            PlannerError::Unsolvable(format!("no reachable store sells {item}"))
        })?;

        let mut path = vec![goal];
        while let Some(prev) = parent.get(path.last().unwrap_or(&start)) {
            path.push(*prev);
        }
        path.reverse();

        let mut steps: Vec<SymbolicStep> = path
            .windows(2)
            .map(|w| SymbolicStep::Drive { from: w[0], to: w[1] })
            .collect();
        let store = goals.get(&goal).cloned().unwrap_or_default();
        steps.push(SymbolicStep::Buy {
            item,
            store,
            at: Some(goal),
        });
        Ok(Plan::new(steps))
    }
}

/// 从 `(:goal (and (have agent <item>)))` 取目标商品
fn goal_item(doc: &ProblemDocument) -> Result<String, PlannerError> {
    fn find(expr: &SExpr) -> Option<String> {
        if expr.head_is("have") {
            return expr.as_list()?.get(2)?.as_atom().map(str::to_string);
        }
        expr.as_list()?.iter().find_map(find)
    }
    let goal = doc
        .clause(":goal")
        .map_err(|e| PlannerError::Parse(e.to_string()))?;
    find(goal).ok_or_else(|| PlannerError::Unsolvable("goal has no (have ...) literal".to_string()))
}

#[async_trait]
impl SymbolicPlanner for GridSearchPlanner {
    fn name(&self) -> &str {
        "grid-search"
    }

    async fn plan(&self, _domain: &Path, problem: &Path) -> Result<Plan, PlannerError> {
        let text = tokio::fs::read_to_string(problem)
            .await
            .map_err(|e| PlannerError::Io(format!("{}: {e}", problem.display())))?;
        let doc = ProblemDocument::parse(&text).map_err(|e| PlannerError::Parse(e.to_string()))?;
        let plan = Self::solve(&doc)?;
        tracing::info!(steps = plan.len(), "grid search returned plan");
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pddl::{ProblemSynchronizer, ProblemTemplate};
    use crate::world::Topology;
    use tempfile::TempDir;

    async fn problem(dir: &TempDir, topology: Topology, facts: &[Fact]) -> ProblemSynchronizer {
        let (w, h) = (topology.width, topology.height);
        let mut sync = ProblemSynchronizer::new(dir.path().join("problem.pddl"), topology);
        sync.write_template(&ProblemTemplate::new("t", w, h, Coord::new(1, 1)))
            .await
            .unwrap();
        sync.initialize(w, h).await.unwrap();
        sync.apply(facts).await.unwrap();
        sync
    }

    #[tokio::test]
    async fn test_plans_shortest_route_to_store() {
        let dir = TempDir::new().unwrap();
        let sync = problem(
            &dir,
            Topology::bordered(6, 6),
            &[
                Fact::AtAgent(Coord::new(1, 1)),
                Fact::at_store("victory", Coord::new(4, 4)),
                Fact::selling("victory", "milk"),
            ],
        )
        .await;
        let plan = GridSearchPlanner::new()
            .plan(Path::new("domain.pddl"), sync.path())
            .await
            .unwrap();
        assert_eq!(plan.len(), 7);
        assert_eq!(plan.steps[5].target(), Some(Coord::new(4, 4)));
        assert!(matches!(&plan.steps[6], SymbolicStep::Buy { store, .. } if store == "victory"));
    }

    #[tokio::test]
    async fn test_blocked_corridor_is_unsolvable() {
        let dir = TempDir::new().unwrap();
        let sync = problem(
            &dir,
            Topology::bordered(5, 3),
            &[
                Fact::AtAgent(Coord::new(1, 1)),
                Fact::at_store("victory", Coord::new(3, 1)),
                Fact::selling("victory", "milk"),
                Fact::Blocked(Coord::new(2, 1)),
            ],
        )
        .await;
        let err = GridSearchPlanner::new()
            .plan(Path::new("domain.pddl"), sync.path())
            .await
            .unwrap_err();
        assert!(matches!(err, PlannerError::Unsolvable(_)));
    }

    #[tokio::test]
    async fn test_prefers_nearest_selling_store() {
        let dir = TempDir::new().unwrap();
        let sync = problem(
            &dir,
            Topology::bordered(8, 8),
            &[
                Fact::AtAgent(Coord::new(1, 1)),
                Fact::at_store("victory", Coord::new(6, 6)),
                Fact::selling("victory", "milk"),
                Fact::at_store("mega_bulldog", Coord::new(3, 3)),
                Fact::selling("mega_bulldog", "milk"),
            ],
        )
        .await;
        let plan = GridSearchPlanner::new()
            .plan(Path::new("domain.pddl"), sync.path())
            .await
            .unwrap();
        assert!(matches!(plan.steps.last(), Some(SymbolicStep::Buy { store, .. }) if store == "mega_bulldog"));
    }

    #[tokio::test]
    async fn test_already_at_store_only_buys() {
        let dir = TempDir::new().unwrap();
        let sync = problem(
            &dir,
            Topology::bordered(4, 4),
            &[
                Fact::AtAgent(Coord::new(2, 2)),
                Fact::at_store("victory", Coord::new(2, 2)),
                Fact::selling("victory", "milk"),
            ],
        )
        .await;
        let plan = GridSearchPlanner::new()
            .plan(Path::new("domain.pddl"), sync.path())
            .await
            .unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.steps[0].target(), None);
    }
}
