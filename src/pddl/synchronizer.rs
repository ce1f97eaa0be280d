//! 问题同步器：把信念快照写进问题文档的 `:init`
//!
//! 每次编辑都是 读取 -> 解析成树 -> 修改 -> 校验 -> 原子写回（临时文件 + rename）；
//! 任一步失败时磁盘上的文档保持原样。

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::core::AgentError;
use crate::pddl::{ensure_integral, Fact, ProblemDocument, ProblemTemplate};
use crate::world::{Coord, Topology};

/// 持有问题文档路径与静态拓扑（墙体）
#[derive(Debug, Clone)]
pub struct ProblemSynchronizer {
    path: PathBuf,
    topology: Topology,
}

impl ProblemSynchronizer {
    pub fn new(path: impl Into<PathBuf>, topology: Topology) -> Self {
        Self {
            path: path.into(),
            topology,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// 用模板生成全新的问题文档（覆盖已有文件）
    pub async fn write_template(&self, template: &ProblemTemplate) -> Result<(), AgentError> {
        self.commit(&template.to_document()).await
    }

    /// 写入全网格连通关系与墙 / 可通行事实；重复调用会替换旧的拓扑事实
    pub async fn initialize(&mut self, width: i32, height: i32) -> Result<(), AgentError> {
        self.topology.width = width;
        self.topology.height = height;
        let mut doc = self.load().await?;

        let kept: Vec<Fact> = doc
            .init_facts()?
            .into_iter()
            .filter(|f| match f {
                Fact::Connected(..) | Fact::Clear(_) => false,
                Fact::Blocked(c) => !self.topology.is_wall(*c),
                _ => true,
            })
            .collect();
        let dynamic_blocks: HashSet<Coord> = kept
            .iter()
            .filter_map(|f| match f {
                Fact::Blocked(c) => Some(*c),
                _ => None,
            })
            .collect();

        let mut facts = Vec::new();
        for cell in self.topology.cells() {
            for next in [cell.offset(1, 0), cell.offset(0, 1)] {
                if self.topology.contains(next) {
                    facts.push(Fact::Connected(cell, next));
                    facts.push(Fact::Connected(next, cell));
                }
            }
        }
        for cell in self.topology.cells() {
            if self.topology.is_wall(cell) {
                facts.push(Fact::Blocked(cell));
            } else if !dynamic_blocks.contains(&cell) {
                facts.push(Fact::Clear(cell));
            }
        }
        facts.extend(kept);

        doc.replace_init(&facts)?;
        self.commit(&doc).await?;
        tracing::info!(
            width,
            height,
            walls = self.topology.walls.len(),
            "problem topology initialized"
        );
        Ok(())
    }

    /// 用动态事实替换上一次注入的动态事实；同样输入重复调用得到逐字节相同的文档
    pub async fn apply(&self, facts: &[Fact]) -> Result<(), AgentError> {
        for fact in facts {
            ensure_integral(&fact.to_string())?;
        }
        let mut doc = self.load().await?;
        doc.validate()?;

        let store_cells: HashSet<Coord> = facts
            .iter()
            .filter_map(|f| match f {
                Fact::AtStore { at, .. } => Some(*at),
                _ => None,
            })
            .collect();
        let obstacle_cells: HashSet<Coord> = facts
            .iter()
            .filter_map(|f| match f {
                Fact::Blocked(c) if !store_cells.contains(c) => Some(*c),
                _ => None,
            })
            .collect();

        let mut next: Vec<Fact> = Vec::new();
        let mut seen: HashSet<Fact> = HashSet::new();
        let mut push = |fact: Fact, next: &mut Vec<Fact>| {
            if seen.insert(fact.clone()) {
                next.push(fact);
            }
        };

        for fact in doc.init_facts()? {
            if self.is_dynamic(&fact) {
                continue;
            }
            let conflicting = match &fact {
                Fact::Clear(c) => obstacle_cells.contains(c),
                Fact::Blocked(c) => store_cells.contains(c),
                _ => false,
            };
            if !conflicting {
                push(fact, &mut next);
            }
        }

        let initialized = next.iter().any(|f| matches!(f, Fact::Connected(..)));
        let clear: HashSet<Coord> = next
            .iter()
            .filter_map(|f| match f {
                Fact::Clear(c) => Some(*c),
                _ => None,
            })
            .collect();
        if initialized {
            let restored: Vec<Coord> = self
                .topology
                .cells()
                .filter(|c| {
                    !self.topology.is_wall(*c) && !obstacle_cells.contains(c) && !clear.contains(c)
                })
                .collect();
            for c in restored {
                push(Fact::Clear(c), &mut next);
            }
        }
        let mut stores: Vec<&Coord> = store_cells.iter().filter(|c| !clear.contains(c)).collect();
        stores.sort();
        for c in stores {
            push(Fact::Clear(*c), &mut next);
        }

        for fact in facts {
            match fact {
                Fact::Blocked(c) if store_cells.contains(c) => {}
                f => push(f.clone(), &mut next),
            }
        }

        let store_names: Vec<String> = facts
            .iter()
            .filter_map(|f| match f {
                Fact::AtStore { store, .. } | Fact::Selling { store, .. } => Some(store.clone()),
                _ => None,
            })
            .collect();
        let items: Vec<String> = facts
            .iter()
            .filter_map(|f| match f {
                Fact::Selling { item, .. } => Some(item.clone()),
                _ => None,
            })
            .collect();
        doc.declare_objects(&store_names, "store")?;
        doc.declare_objects(&items, "item")?;

        doc.replace_init(&next)?;
        self.commit(&doc).await?;
        tracing::debug!(
            facts = facts.len(),
            stores = store_cells.len(),
            obstacles = obstacle_cells.len(),
            path = %self.path.display(),
            "problem synchronized"
        );
        Ok(())
    }

    /// 单条 `(blocked c)` 追加；已存在或该格是商店时不改动，返回是否写入
    pub async fn add_blocked(&self, position: Coord) -> Result<bool, AgentError> {
        let mut doc = self.load().await?;
        doc.validate()?;
        let facts = doc.init_facts()?;
        let store_here = facts
            .iter()
            .any(|f| matches!(f, Fact::AtStore { at, .. } if *at == position));
        if store_here || facts.contains(&Fact::Blocked(position)) {
            return Ok(false);
        }
        let mut next: Vec<Fact> = facts
            .into_iter()
            .filter(|f| *f != Fact::Clear(position))
            .collect();
        next.push(Fact::Blocked(position));
        doc.replace_init(&next)?;
        self.commit(&doc).await?;
        tracing::info!(position = %position, "blocked cell added to problem");
        Ok(true)
    }

    /// 重新解析文档并取出当前的动态事实
    pub async fn read_dynamic_facts(&self) -> Result<Vec<Fact>, AgentError> {
        let doc = self.load().await?;
        Ok(doc
            .init_facts()?
            .into_iter()
            .filter(|f| self.is_dynamic(f))
            .collect())
    }

    fn is_dynamic(&self, fact: &Fact) -> bool {
        match fact {
            Fact::AtAgent(_) | Fact::AtStore { .. } | Fact::Selling { .. } => true,
            Fact::Blocked(c) => !self.topology.is_wall(*c),
            Fact::Other(_) => fact.is_price_fact(),
            Fact::Clear(_) | Fact::Connected(..) => false,
        }
    }

    async fn load(&self) -> Result<ProblemDocument, AgentError> {
        let text = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            AgentError::SynchronizationFailure(format!("read {}: {e}", self.path.display()))
        })?;
        Ok(ProblemDocument::parse(&text)?)
    }

    async fn commit(&self, doc: &ProblemDocument) -> Result<(), AgentError> {
        let text = doc.render();
        ProblemDocument::parse(&text)?.validate()?;
        ensure_integral(&text)?;

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "problem.pddl".to_string());
        let tmp = self.path.with_file_name(format!(".{file_name}.tmp"));
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&tmp, text).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn setup(dir: &TempDir) -> ProblemSynchronizer {
        let mut sync = ProblemSynchronizer::new(dir.path().join("problem.pddl"), Topology::bordered(5, 5));
        let template = ProblemTemplate::new("test", 5, 5, Coord::new(1, 1))
            .with_stores(vec!["victory".to_string()]);
        sync.write_template(&template).await.unwrap();
        sync.initialize(5, 5).await.unwrap();
        sync
    }

    async fn init_facts(sync: &ProblemSynchronizer) -> Vec<Fact> {
        let text = tokio::fs::read_to_string(sync.path()).await.unwrap();
        ProblemDocument::parse(&text).unwrap().init_facts().unwrap()
    }

    fn snapshot() -> Vec<Fact> {
        vec![
            Fact::AtAgent(Coord::new(1, 1)),
            Fact::at_store("victory", Coord::new(3, 3)),
            Fact::selling("victory", "milk"),
            Fact::Blocked(Coord::new(2, 2)),
        ]
    }

    #[tokio::test]
    async fn test_initialize_writes_topology() {
        let dir = TempDir::new().unwrap();
        let sync = setup(&dir).await;
        let facts = init_facts(&sync).await;
        let connected = facts.iter().filter(|f| matches!(f, Fact::Connected(..))).count();
        // 5x5：横向 4*5 对 + 纵向 4*5 对，双向
        assert_eq!(connected, 80);
        let clear = facts.iter().filter(|f| matches!(f, Fact::Clear(_))).count();
        assert_eq!(clear, 9);
        let blocked = facts.iter().filter(|f| matches!(f, Fact::Blocked(_))).count();
        assert_eq!(blocked, 16);
        assert!(facts.contains(&Fact::AtAgent(Coord::new(1, 1))));
    }

    #[tokio::test]
    async fn test_initialize_twice_does_not_duplicate() {
        let dir = TempDir::new().unwrap();
        let mut sync = setup(&dir).await;
        let before = tokio::fs::read_to_string(sync.path()).await.unwrap();
        sync.initialize(5, 5).await.unwrap();
        let after = tokio::fs::read_to_string(sync.path()).await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_apply_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let sync = setup(&dir).await;
        sync.apply(&snapshot()).await.unwrap();
        let first = tokio::fs::read(sync.path()).await.unwrap();
        sync.apply(&snapshot()).await.unwrap();
        let second = tokio::fs::read(sync.path()).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_apply_replaces_previous_dynamic_facts() {
        let dir = TempDir::new().unwrap();
        let sync = setup(&dir).await;
        sync.apply(&snapshot()).await.unwrap();
        sync.apply(&[Fact::AtAgent(Coord::new(2, 1))]).await.unwrap();
        let facts = init_facts(&sync).await;
        assert!(facts.contains(&Fact::AtAgent(Coord::new(2, 1))));
        assert!(!facts.contains(&Fact::AtAgent(Coord::new(1, 1))));
        assert!(!facts.iter().any(|f| matches!(f, Fact::AtStore { .. })));
        // 障碍物消失后可通行事实恢复
        assert!(facts.contains(&Fact::Clear(Coord::new(2, 2))));
        assert!(!facts.contains(&Fact::Blocked(Coord::new(2, 2))));
    }

    #[tokio::test]
    async fn test_obstacle_and_clear_never_coexist() {
        let dir = TempDir::new().unwrap();
        let sync = setup(&dir).await;
        sync.apply(&snapshot()).await.unwrap();
        let facts = init_facts(&sync).await;
        assert!(facts.contains(&Fact::Blocked(Coord::new(2, 2))));
        assert!(!facts.contains(&Fact::Clear(Coord::new(2, 2))));
        for f in &facts {
            if let Fact::Clear(c) = f {
                assert!(!facts.contains(&Fact::Blocked(*c)), "clear and blocked at {c}");
            }
        }
    }

    #[tokio::test]
    async fn test_store_wins_over_blocked_at_same_cell() {
        let dir = TempDir::new().unwrap();
        let sync = setup(&dir).await;
        let cell = Coord::new(3, 1);
        sync.apply(&[
            Fact::AtAgent(Coord::new(1, 1)),
            Fact::at_store("mega_bulldog", cell),
            Fact::selling("mega_bulldog", "milk"),
            Fact::Blocked(cell),
        ])
        .await
        .unwrap();
        let facts = init_facts(&sync).await;
        assert!(!facts.contains(&Fact::Blocked(cell)));
        assert!(facts.contains(&Fact::Clear(cell)));

        let text = tokio::fs::read_to_string(sync.path()).await.unwrap();
        let doc = ProblemDocument::parse(&text).unwrap();
        assert!(doc.objects_of_type("store").unwrap().contains(&"mega_bulldog".to_string()));
    }

    #[tokio::test]
    async fn test_round_trip_recovers_exact_fact_count() {
        let dir = TempDir::new().unwrap();
        let sync = setup(&dir).await;
        let mut facts = vec![
            Fact::AtAgent(Coord::new(1, 2)),
            Fact::at_store("victory", Coord::new(3, 3)),
            Fact::selling("victory", "milk"),
            Fact::Blocked(Coord::new(2, 2)),
            Fact::Blocked(Coord::new(3, 2)),
        ];
        for n in (0..=facts.len()).rev() {
            facts.truncate(n);
            sync.apply(&facts).await.unwrap();
            let read = sync.read_dynamic_facts().await.unwrap();
            assert_eq!(read.len(), n);
            assert_eq!(read, facts);
        }
    }

    #[tokio::test]
    async fn test_apply_without_goal_fails_and_leaves_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("problem.pddl");
        let original = "(define (problem p) (:domain d) (:objects) (:init (at_agent agent loc_1_1)))\n";
        tokio::fs::write(&path, original).await.unwrap();
        let sync = ProblemSynchronizer::new(&path, Topology::bordered(5, 5));

        let err = sync.apply(&snapshot()).await.unwrap_err();
        assert!(matches!(err, AgentError::SynchronizationFailure(_)));
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), original);
    }

    #[tokio::test]
    async fn test_apply_rejects_unbalanced_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("problem.pddl");
        let original = "(define (problem p) (:init (at_agent agent loc_1_1) (:goal (and))";
        tokio::fs::write(&path, original).await.unwrap();
        let sync = ProblemSynchronizer::new(&path, Topology::bordered(5, 5));
        assert!(sync.apply(&snapshot()).await.is_err());
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), original);
    }

    #[tokio::test]
    async fn test_apply_rejects_fractional_literal() {
        let dir = TempDir::new().unwrap();
        let sync = setup(&dir).await;
        let before = tokio::fs::read_to_string(sync.path()).await.unwrap();
        let price = Fact::Other(crate::pddl::SExpr::from_atoms(&["=", "price", "2.5"]));
        assert!(sync.apply(&[price]).await.is_err());
        assert_eq!(tokio::fs::read_to_string(sync.path()).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_add_blocked_is_idempotent_and_respects_store() {
        let dir = TempDir::new().unwrap();
        let sync = setup(&dir).await;
        sync.apply(&snapshot()).await.unwrap();

        assert!(sync.add_blocked(Coord::new(1, 3)).await.unwrap());
        assert!(!sync.add_blocked(Coord::new(1, 3)).await.unwrap());
        assert!(!sync.add_blocked(Coord::new(3, 3)).await.unwrap());

        let facts = init_facts(&sync).await;
        assert!(facts.contains(&Fact::Blocked(Coord::new(1, 3))));
        assert!(!facts.contains(&Fact::Clear(Coord::new(1, 3))));
        assert!(!facts.contains(&Fact::Blocked(Coord::new(3, 3))));
    }
}
