//! 网格世界：墙体、命名实体、曼哈顿半径传感器
//!
//! 运动语义与 MiniGrid 一致：前方是墙或任何实体时前进无效；`Interact` 在卖目标商品的商店格上完成购买。

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::sim::{Cell, SensedEntity, Simulator};
use crate::world::{Coord, MotorPrimitive, Pose};

/// 世界中的一个实体（商店或地标）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldEntity {
    pub name: String,
    pub position: Coord,
    #[serde(default)]
    pub sells_item: bool,
    #[serde(default)]
    pub price: Option<f64>,
}

impl WorldEntity {
    pub fn store(name: impl Into<String>, position: Coord, price: f64) -> Self {
        Self {
            name: name.into(),
            position,
            sells_item: true,
            price: Some(price),
        }
    }

    pub fn landmark(name: impl Into<String>, position: Coord) -> Self {
        Self {
            name: name.into(),
            position,
            sells_item: false,
            price: None,
        }
    }
}

/// 一次成功购买
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Purchase {
    pub store: String,
    pub price: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct GridWorld {
    width: i32,
    height: i32,
    walls: HashSet<Coord>,
    entities: Vec<WorldEntity>,
    pose: Pose,
    sensor_radius: u32,
    target_item: String,
    inventory: HashSet<String>,
    purchase: Option<Purchase>,
}

impl GridWorld {
    pub fn new(width: i32, height: i32, walls: HashSet<Coord>, start: Pose, target_item: impl Into<String>) -> Self {
        Self {
            width,
            height,
            walls,
            entities: Vec::new(),
            pose: start,
            sensor_radius: 3,
            target_item: target_item.into(),
            inventory: HashSet::new(),
            purchase: None,
        }
    }

    /// 四周一圈边框墙
    pub fn bordered(width: i32, height: i32, start: Pose, target_item: impl Into<String>) -> Self {
        let mut walls = HashSet::new();
        for x in 0..width {
            walls.insert(Coord::new(x, 0));
            walls.insert(Coord::new(x, height - 1));
        }
        for y in 0..height {
            walls.insert(Coord::new(0, y));
            walls.insert(Coord::new(width - 1, y));
        }
        Self::new(width, height, walls, start, target_item)
    }

    pub fn with_sensor_radius(mut self, radius: u32) -> Self {
        self.sensor_radius = radius;
        self
    }

    pub fn with_entity(mut self, entity: WorldEntity) -> Self {
        self.add_entity(entity);
        self
    }

    pub fn with_wall(mut self, at: Coord) -> Self {
        self.walls.insert(at);
        self
    }

    /// 同名实体覆盖旧的
    pub fn add_entity(&mut self, entity: WorldEntity) {
        self.entities.retain(|e| e.name != entity.name);
        self.entities.push(entity);
    }

    pub fn entities(&self) -> &[WorldEntity] {
        &self.entities
    }

    pub fn entity_at(&self, at: Coord) -> Option<&WorldEntity> {
        self.entities.iter().find(|e| e.position == at)
    }

    pub fn purchase(&self) -> Option<&Purchase> {
        self.purchase.as_ref()
    }

    fn in_bounds(&self, at: Coord) -> bool {
        at.x >= 0 && at.y >= 0 && at.x < self.width && at.y < self.height
    }

    fn can_enter(&self, at: Coord) -> bool {
        self.in_bounds(at) && !self.walls.contains(&at) && self.entity_at(at).is_none()
    }

    fn interact(&mut self) {
        let Some(store) = self.entity_at(self.pose.position).filter(|e| e.sells_item) else {
            tracing::debug!(position = %self.pose.position, "interact: nothing to buy here");
            return;
        };
        let purchase = Purchase {
            store: store.name.clone(),
            price: store.price,
        };
        tracing::info!(store = %purchase.store, item = %self.target_item, "item bought");
        self.inventory.insert(self.target_item.clone());
        self.purchase = Some(purchase);
    }
}

impl Simulator for GridWorld {
    fn pose(&self) -> Pose {
        self.pose
    }

    fn step(&mut self, primitive: MotorPrimitive) -> Pose {
        match primitive {
            MotorPrimitive::TurnLeft | MotorPrimitive::TurnRight => {
                self.pose = self.pose.apply(primitive);
            }
            MotorPrimitive::Forward => {
                let front = self.pose.front();
                if self.can_enter(front) {
                    self.pose.position = front;
                }
            }
            MotorPrimitive::Interact => self.interact(),
        }
        self.pose
    }

    fn sensed_entities(&self) -> Vec<SensedEntity> {
        self.entities
            .iter()
            .filter(|e| e.position.manhattan(&self.pose.position) <= self.sensor_radius)
            .map(|e| SensedEntity {
                name: e.name.clone(),
                position: e.position,
            })
            .collect()
    }

    fn cell_contents(&self, at: Coord) -> Cell {
        if !self.in_bounds(at) {
            Cell::OutOfBounds
        } else if self.walls.contains(&at) {
            Cell::Wall
        } else if let Some(e) = self.entity_at(at) {
            Cell::Entity(e.name.clone())
        } else {
            Cell::Empty
        }
    }

    fn dimensions(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    fn force_enter(&mut self, at: Coord) -> Pose {
        if self.in_bounds(at) && !self.walls.contains(&at) {
            self.pose.position = at;
        } else {
            tracing::warn!(target = %at, "force_enter refused: wall or out of bounds");
        }
        self.pose
    }

    fn holds(&self, item: &str) -> bool {
        self.inventory.contains(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::capture_topology;
    use crate::world::Heading;

    fn world() -> GridWorld {
        GridWorld::bordered(7, 7, Pose::new(Coord::new(1, 1), Heading::East), "milk")
    }

    #[test]
    fn test_forward_and_turns() {
        let mut w = world();
        assert_eq!(w.step(MotorPrimitive::Forward).position, Coord::new(2, 1));
        let p = w.step(MotorPrimitive::TurnRight);
        assert_eq!(p.heading, Heading::South);
        assert_eq!(w.step(MotorPrimitive::Forward).position, Coord::new(2, 2));
    }

    #[test]
    fn test_walls_and_entities_block() {
        let mut w = world().with_entity(WorldEntity::landmark("old_tree", Coord::new(2, 1)));
        assert_eq!(w.step(MotorPrimitive::Forward).position, Coord::new(1, 1));
        w.step(MotorPrimitive::TurnLeft);
        // 北面是边框墙
        assert_eq!(w.step(MotorPrimitive::Forward).position, Coord::new(1, 1));
    }

    #[test]
    fn test_sensor_radius() {
        let w = world()
            .with_sensor_radius(2)
            .with_entity(WorldEntity::landmark("near", Coord::new(2, 2)))
            .with_entity(WorldEntity::landmark("far", Coord::new(4, 4)));
        let seen: Vec<String> = w.sensed_entities().into_iter().map(|e| e.name).collect();
        assert_eq!(seen, vec!["near".to_string()]);
    }

    #[test]
    fn test_force_enter_then_buy() {
        let mut w = world().with_entity(WorldEntity::store("victory", Coord::new(2, 1), 4.0));
        assert!(!w.holds("milk"));
        w.step(MotorPrimitive::Interact);
        assert!(!w.holds("milk"));
        assert_eq!(w.force_enter(Coord::new(2, 1)).position, Coord::new(2, 1));
        w.step(MotorPrimitive::Interact);
        assert!(w.holds("milk"));
        assert_eq!(w.purchase().map(|p| p.store.as_str()), Some("victory"));
    }

    #[test]
    fn test_force_enter_refuses_wall() {
        let mut w = world();
        assert_eq!(w.force_enter(Coord::new(0, 1)).position, Coord::new(1, 1));
    }

    #[test]
    fn test_capture_topology_sees_only_walls() {
        let w = world()
            .with_wall(Coord::new(3, 3))
            .with_entity(WorldEntity::landmark("tree", Coord::new(4, 4)));
        let topo = capture_topology(&w);
        assert_eq!(topo.walls.len(), 24 + 1);
        assert!(topo.is_wall(Coord::new(3, 3)));
        assert!(topo.is_walkable(Coord::new(4, 4)));
        assert_eq!(w.cell_contents(Coord::new(9, 9)), Cell::OutOfBounds);
    }
}
