//! 随机迷宫：按密度撒墙，每放一面墙都检查起点到目标（及保留格）仍然连通；可选地从目录额外摆放商店

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::sim::{WorldEntity, CATALOG};
use crate::world::{Coord, Topology};

const MAX_ATTEMPTS: usize = 2000;
/// 左上角安全区边长
const SAFE_ZONE: i32 = 4;
/// 额外商店与目标之间的最小间隔
const GOAL_CLEARANCE: i32 = 4;

fn default_density() -> f64 {
    0.15
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MazeSpec {
    #[serde(default = "default_density")]
    pub wall_density: f64,
    #[serde(default)]
    pub seed: u64,
    /// 从目录随机摆放的额外商店数量
    #[serde(default)]
    pub extra_stores: usize,
}

impl Default for MazeSpec {
    fn default() -> Self {
        Self {
            wall_density: default_density(),
            seed: 0,
            extra_stores: 0,
        }
    }
}

impl MazeSpec {
    /// 生成墙体（含边框）与额外实体；`reserved` 中的格子不放墙且必须保持可达
    pub fn build(
        &self,
        width: i32,
        height: i32,
        start: Coord,
        goal: Coord,
        reserved: &[Coord],
        taken_names: &[&str],
    ) -> (HashSet<Coord>, Vec<WorldEntity>) {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut topo = Topology::bordered(width, height);
        let border = topo.walls.len();
        let max_walls = (f64::from(width * height) * self.wall_density) as usize;

        let mut placed = 0;
        for _ in 0..MAX_ATTEMPTS {
            if placed >= max_walls {
                break;
            }
            let c = Coord::new(rng.gen_range(1..width - 1), rng.gen_range(1..height - 1));
            if (c.x < SAFE_ZONE && c.y < SAFE_ZONE)
                || c == start
                || c == goal
                || reserved.contains(&c)
                || topo.walls.contains(&c)
            {
                continue;
            }
            topo.walls.insert(c);
            let connected = std::iter::once(goal)
                .chain(reserved.iter().copied())
                .all(|target| topo.walking_distance(start, target).is_some());
            if connected {
                placed += 1;
            } else {
                topo.walls.remove(&c);
            }
        }
        tracing::debug!(walls = placed, border, seed = self.seed, "maze walls placed");

        let extras = self.place_extra_stores(&mut rng, &topo, start, goal, reserved, taken_names);
        (topo.walls, extras)
    }

    fn place_extra_stores(
        &self,
        rng: &mut StdRng,
        topo: &Topology,
        start: Coord,
        goal: Coord,
        reserved: &[Coord],
        taken_names: &[&str],
    ) -> Vec<WorldEntity> {
        if self.extra_stores == 0 {
            return Vec::new();
        }
        let mut entries: Vec<_> = CATALOG
            .iter()
            .filter(|e| !taken_names.contains(&e.name))
            .collect();
        entries.shuffle(rng);

        let mut cells: Vec<Coord> = topo
            .cells()
            .filter(|c| {
                topo.is_walkable(*c)
                    && *c != start
                    && !reserved.contains(c)
                    && ((c.x - goal.x).abs() > GOAL_CLEARANCE || (c.y - goal.y).abs() > GOAL_CLEARANCE)
                    && topo.walking_distance(start, *c).is_some()
            })
            .collect();
        cells.shuffle(rng);

        entries
            .into_iter()
            .zip(cells)
            .take(self.extra_stores)
            .map(|(entry, cell)| entry.place(cell))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_maze() {
        let spec = MazeSpec {
            wall_density: 0.2,
            seed: 42,
            extra_stores: 3,
        };
        let a = spec.build(20, 20, Coord::new(1, 1), Coord::new(18, 18), &[], &["victory"]);
        let b = spec.build(20, 20, Coord::new(1, 1), Coord::new(18, 18), &[], &["victory"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_goal_and_reserved_stay_reachable() {
        let reserved = [Coord::new(10, 6)];
        for seed in 0..5 {
            let spec = MazeSpec {
                wall_density: 0.3,
                seed,
                extra_stores: 0,
            };
            let (walls, extras) = spec.build(20, 20, Coord::new(1, 1), Coord::new(18, 18), &reserved, &[]);
            assert!(extras.is_empty());
            let topo = Topology::new(20, 20, walls);
            assert!(topo.walking_distance(Coord::new(1, 1), Coord::new(18, 18)).is_some());
            assert!(topo.walking_distance(Coord::new(1, 1), Coord::new(10, 6)).is_some());
            assert!(!topo.is_wall(Coord::new(2, 2)));
        }
    }

    #[test]
    fn test_extra_stores_avoid_taken_names_and_goal() {
        let spec = MazeSpec {
            wall_density: 0.1,
            seed: 7,
            extra_stores: 4,
        };
        let goal = Coord::new(18, 18);
        let (walls, extras) = spec.build(20, 20, Coord::new(1, 1), goal, &[], &["rami_levy_jerusalem"]);
        assert_eq!(extras.len(), 4);
        for e in &extras {
            assert_ne!(e.name, "rami_levy_jerusalem");
            assert!(!walls.contains(&e.position));
            assert!((e.position.x - goal.x).abs() > 4 || (e.position.y - goal.y).abs() > 4);
        }
    }
}
