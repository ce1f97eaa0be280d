//! 实体记录：发现的商店与障碍物

use serde::{Deserialize, Serialize};

use crate::world::Coord;

/// 实体分类：商店状态始终优先于障碍物状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Store,
    Obstacle,
}

/// 实体属性（价格仅保存在信念中，不写入 PDDL）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityProperties {
    pub sells_target_item: bool,
    pub price: Option<f64>,
}

impl EntityProperties {
    pub fn seller(price: Option<f64>) -> Self {
        Self {
            sells_target_item: true,
            price,
        }
    }
}

/// 信念中的一条实体记录；位置创建后不可变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub name: String,
    pub position: Coord,
    pub kind: EntityKind,
    pub properties: EntityProperties,
}
