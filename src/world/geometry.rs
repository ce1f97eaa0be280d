//! 网格几何：坐标、朝向、位姿与电机原语
//!
//! 朝向编号沿用仿真器约定：East=0、South=1、West=2、North=3；右转为 `heading + 1 (mod 4)`，
//! y 轴向下增长（South 为 +y）。

use std::fmt;

use serde::{Deserialize, Serialize};

/// 网格坐标（整数）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// PDDL 中的位置对象名：`loc_{x}_{y}`
    pub fn location_name(&self) -> String {
        format!("loc_{}_{}", self.x, self.y)
    }

    /// 解析 `loc_{x}_{y}`；大小写不敏感，允许负数
    pub fn parse_location(name: &str) -> Option<Self> {
        let lower = name.trim().to_ascii_lowercase();
        let rest = lower.strip_prefix("loc_")?;
        let (x, y) = rest.split_once('_')?;
        Some(Self::new(x.parse().ok()?, y.parse().ok()?))
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn manhattan(&self, other: &Coord) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// 四邻域（East, South, West, North 顺序）
    pub fn neighbours(&self) -> [Coord; 4] {
        Heading::ALL.map(|h| h.advance(*self))
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// 智能体朝向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Heading {
    East,
    South,
    West,
    North,
}

impl Heading {
    pub const ALL: [Heading; 4] = [Heading::East, Heading::South, Heading::West, Heading::North];

    pub fn index(self) -> u8 {
        match self {
            Heading::East => 0,
            Heading::South => 1,
            Heading::West => 2,
            Heading::North => 3,
        }
    }

    pub fn from_index(index: u8) -> Self {
        Self::ALL[(index % 4) as usize]
    }

    /// 单位位移向量
    pub fn delta(self) -> (i32, i32) {
        match self {
            Heading::East => (1, 0),
            Heading::South => (0, 1),
            Heading::West => (-1, 0),
            Heading::North => (0, -1),
        }
    }

    /// 单位向量对应的朝向；非单轴单位向量返回 None
    pub fn from_delta(dx: i32, dy: i32) -> Option<Self> {
        match (dx, dy) {
            (1, 0) => Some(Heading::East),
            (0, 1) => Some(Heading::South),
            (-1, 0) => Some(Heading::West),
            (0, -1) => Some(Heading::North),
            _ => None,
        }
    }

    pub fn right(self) -> Self {
        Self::from_index(self.index() + 1)
    }

    pub fn left(self) -> Self {
        Self::from_index(self.index() + 3)
    }

    pub fn advance(self, from: Coord) -> Coord {
        let (dx, dy) = self.delta();
        from.offset(dx, dy)
    }
}

/// 电机原语：仿真器一次 step 的最小动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotorPrimitive {
    TurnLeft,
    TurnRight,
    Forward,
    /// 与当前格交互（购买）
    Interact,
}

impl MotorPrimitive {
    pub fn is_turn(self) -> bool {
        matches!(self, MotorPrimitive::TurnLeft | MotorPrimitive::TurnRight)
    }
}

/// 位姿：位置 + 朝向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Coord,
    pub heading: Heading,
}

impl Pose {
    pub fn new(position: Coord, heading: Heading) -> Self {
        Self { position, heading }
    }

    /// 正前方的格子
    pub fn front(&self) -> Coord {
        self.heading.advance(self.position)
    }

    /// 无障碍假设下执行一个原语后的位姿（用于推演与测试）
    pub fn apply(&self, primitive: MotorPrimitive) -> Pose {
        match primitive {
            MotorPrimitive::TurnLeft => Pose::new(self.position, self.heading.left()),
            MotorPrimitive::TurnRight => Pose::new(self.position, self.heading.right()),
            MotorPrimitive::Forward => Pose::new(self.front(), self.heading),
            MotorPrimitive::Interact => *self,
        }
    }
}
