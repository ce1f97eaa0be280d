//! 商店目录：随机迷宫中额外摆放的真实地点（价格为真实售价，推理层看不到）

use crate::sim::WorldEntity;
use crate::world::Coord;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatalogEntry {
    pub name: &'static str,
    pub category: &'static str,
    pub price: Option<f64>,
}

impl CatalogEntry {
    pub fn sells_item(&self) -> bool {
        self.price.is_some()
    }

    pub fn place(&self, position: Coord) -> WorldEntity {
        match self.price {
            Some(price) => WorldEntity::store(self.name, position, price),
            None => WorldEntity::landmark(self.name, position),
        }
    }
}

pub const CATALOG: &[CatalogEntry] = &[
    CatalogEntry { name: "starbucks_tel_aviv", category: "coffee_shop", price: None },
    CatalogEntry { name: "moshe_butcher_rehovot", category: "butcher_shop", price: None },
    CatalogEntry { name: "rami_levy_jerusalem", category: "supermarket", price: Some(2.5) },
    CatalogEntry { name: "victory_tel_aviv", category: "supermarket", price: Some(4.0) },
    CatalogEntry { name: "mega_bulldog_tlv", category: "supermarket", price: Some(3.5) },
    CatalogEntry { name: "zara_tel_aviv", category: "clothing_store", price: None },
    CatalogEntry { name: "mango_jerusalem", category: "clothing_store", price: None },
    CatalogEntry { name: "burger_ranch_hod_hasharon", category: "restaurant", price: None },
    CatalogEntry { name: "aroma_tlv", category: "coffee_shop", price: None },
    CatalogEntry { name: "castro_haifa", category: "clothing_store", price: None },
    CatalogEntry { name: "old_tree_jerusalem_forest", category: "nature", price: None },
    CatalogEntry { name: "gan_safranim_tel_aviv", category: "park", price: None },
    CatalogEntry { name: "public_phone_booth_dizengoff", category: "infrastructure", price: None },
    CatalogEntry { name: "hummus_john_rehovot", category: "restaurant", price: None },
    CatalogEntry { name: "fox_home_tlv", category: "home_goods", price: None },
    CatalogEntry { name: "be_tlv", category: "pharmacy", price: None },
];

pub fn lookup(name: &str) -> Option<&'static CatalogEntry> {
    CATALOG.iter().find(|e| e.name == name)
}
