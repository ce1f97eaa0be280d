//! 信念存储：智能体位姿 + 已发现实体 + 碰撞得知的阻塞格
//!
//! 由执行循环独占写入；snapshot_dynamic_facts 产出交给 ProblemSynchronizer 的动态事实。

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;

use crate::pddl::Fact;
use crate::world::{Coord, EntityKind, EntityProperties, EntityRecord, Pose};

/// 单次运行的信念状态
#[derive(Debug, Clone, Serialize)]
pub struct BeliefStore {
    pose: Pose,
    target_item: String,
    entities: BTreeMap<String, EntityRecord>,
    blocked_cells: BTreeSet<Coord>,
}

impl BeliefStore {
    pub fn new(pose: Pose, target_item: impl Into<String>) -> Self {
        Self {
            pose,
            target_item: target_item.into(),
            entities: BTreeMap::new(),
            blocked_cells: BTreeSet::new(),
        }
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn target_item(&self) -> &str {
        &self.target_item
    }

    pub fn update_pose(&mut self, pose: Pose) {
        self.pose = pose;
    }

    /// 幂等 upsert：再次记录只覆盖类别与属性，位置保持首次记录的值
    pub fn record_entity(
        &mut self,
        name: &str,
        position: Coord,
        kind: EntityKind,
        properties: EntityProperties,
    ) -> &EntityRecord {
        let record = self
            .entities
            .entry(name.to_string())
            .or_insert_with(|| EntityRecord {
                name: name.to_string(),
                position,
                kind,
                properties: properties.clone(),
            });
        if record.position != position {
            tracing::warn!(
                entity = %name,
                recorded = %record.position,
                observed = %position,
                "entity position is immutable, keeping first observation"
            );
        }
        record.kind = kind;
        record.properties = properties;
        record
    }

    /// 碰撞发现的阻塞格
    pub fn mark_blocked(&mut self, position: Coord) -> bool {
        self.blocked_cells.insert(position)
    }

    pub fn entity(&self, name: &str) -> Option<&EntityRecord> {
        self.entities.get(name)
    }

    pub fn knows(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntityRecord> {
        self.entities.values()
    }

    /// 位于给定格子、售卖目标商品的商店
    pub fn store_at(&self, position: Coord) -> Option<&EntityRecord> {
        self.entities.values().find(|e| {
            e.kind == EntityKind::Store && e.position == position && e.properties.sells_target_item
        })
    }

    /// 动态事实：智能体位置在前，其后每个商店一对 (at_store, selling)，再是障碍物的 blocked；
    /// 与商店同格的 blocked 不输出
    pub fn snapshot_dynamic_facts(&self) -> Vec<Fact> {
        let mut facts = vec![Fact::AtAgent(self.pose.position)];
        let store_cells: HashSet<Coord> = self
            .entities
            .values()
            .filter(|e| e.kind == EntityKind::Store)
            .map(|e| e.position)
            .collect();

        for store in self.entities.values().filter(|e| e.kind == EntityKind::Store) {
            facts.push(Fact::at_store(store.name.as_str(), store.position));
            facts.push(Fact::selling(store.name.as_str(), self.target_item.as_str()));
        }

        let mut blocked: BTreeSet<Coord> = self
            .entities
            .values()
            .filter(|e| e.kind == EntityKind::Obstacle)
            .map(|e| e.position)
            .collect();
        blocked.extend(self.blocked_cells.iter().copied());
        facts.extend(
            blocked
                .into_iter()
                .filter(|c| !store_cells.contains(c))
                .map(Fact::Blocked),
        );
        facts
    }
}
