//! 世界模型：坐标 / 朝向 / 位姿、实体记录、静态拓扑与步行距离

pub mod distance;
pub mod entity;
pub mod geometry;

pub use distance::Topology;
pub use entity::{EntityKind, EntityProperties, EntityRecord};
pub use geometry::{Coord, Heading, MotorPrimitive, Pose};
