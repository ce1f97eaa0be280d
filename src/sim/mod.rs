//! 仿真器接口与网格世界实现
//!
//! 执行循环只通过 [`Simulator`] 与物理世界交互；`GridWorld` 是默认实现，测试中也可以换成替身。

pub mod catalog;
pub mod grid;
pub mod maze;
pub mod scenario;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::world::{Coord, MotorPrimitive, Pose, Topology};

pub use catalog::{CatalogEntry, CATALOG};
pub use grid::{GridWorld, WorldEntity};
pub use maze::MazeSpec;
pub use scenario::Scenario;

/// 传感器看到的实体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensedEntity {
    pub name: String,
    pub position: Coord,
}

/// 某个格子里有什么
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Wall,
    Entity(String),
    OutOfBounds,
}

pub trait Simulator: Send {
    fn pose(&self) -> Pose;

    /// 执行一个电机原语，返回执行后的位姿（被挡住时位置不变）
    fn step(&mut self, primitive: MotorPrimitive) -> Pose;

    /// 当前传感范围内的实体
    fn sensed_entities(&self) -> Vec<SensedEntity>;

    fn cell_contents(&self, at: Coord) -> Cell;

    /// (width, height)
    fn dimensions(&self) -> (i32, i32);

    /// 把智能体放到指定格子上（有意进入商店），朝向不变
    fn force_enter(&mut self, at: Coord) -> Pose;

    /// 智能体是否已持有该商品
    fn holds(&self, item: &str) -> bool;
}

/// 启动时抓取静态墙体图
pub fn capture_topology<S: Simulator + ?Sized>(sim: &S) -> Topology {
    let (width, height) = sim.dimensions();
    let walls: HashSet<Coord> = (0..height)
        .flat_map(|y| (0..width).map(move |x| Coord::new(x, y)))
        .filter(|c| sim.cell_contents(*c) == Cell::Wall)
        .collect();
    Topology::new(width, height, walls)
}
