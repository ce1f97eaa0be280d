//! 步行距离：在静态墙体图上做 BFS（实体格视为可通行）

use std::collections::{HashSet, VecDeque};

use crate::world::Coord;

/// 网格尺寸 + 墙体集合
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Topology {
    pub width: i32,
    pub height: i32,
    pub walls: HashSet<Coord>,
}

impl Topology {
    pub fn new(width: i32, height: i32, walls: HashSet<Coord>) -> Self {
        Self {
            width,
            height,
            walls,
        }
    }

    /// 带边框墙的空网格
    pub fn bordered(width: i32, height: i32) -> Self {
        let mut walls = HashSet::new();
        for x in 0..width {
            walls.insert(Coord::new(x, 0));
            walls.insert(Coord::new(x, height - 1));
        }
        for y in 0..height {
            walls.insert(Coord::new(0, y));
            walls.insert(Coord::new(width - 1, y));
        }
        Self::new(width, height, walls)
    }

    pub fn contains(&self, c: Coord) -> bool {
        c.x >= 0 && c.y >= 0 && c.x < self.width && c.y < self.height
    }

    pub fn is_wall(&self, c: Coord) -> bool {
        self.walls.contains(&c)
    }

    pub fn is_walkable(&self, c: Coord) -> bool {
        self.contains(c) && !self.is_wall(c)
    }

    /// 按行优先顺序遍历所有格子
    pub fn cells(&self) -> impl Iterator<Item = Coord> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| Coord::new(x, y)))
    }

    /// 最短步行距离；不可达返回 None
    pub fn walking_distance(&self, from: Coord, to: Coord) -> Option<u32> {
        if from == to {
            return Some(0);
        }
        if !self.contains(from) || !self.is_walkable(to) {
            return None;
        }
        let mut seen = HashSet::from([from]);
        let mut queue = VecDeque::from([(from, 0u32)]);
        while let Some((cell, dist)) = queue.pop_front() {
            for next in cell.neighbours() {
                if !self.is_walkable(next) || !seen.insert(next) {
                    continue;
                }
                if next == to {
                    return Some(dist + 1);
                }
                queue.push_back((next, dist + 1));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walking_distance_open_grid() {
        let topo = Topology::bordered(6, 6);
        assert_eq!(topo.walking_distance(Coord::new(1, 1), Coord::new(4, 4)), Some(6));
        assert_eq!(topo.walking_distance(Coord::new(2, 2), Coord::new(2, 2)), Some(0));
    }

    #[test]
    fn test_walking_distance_detours_around_wall() {
        let mut topo = Topology::bordered(5, 5);
        topo.walls.insert(Coord::new(2, 1));
        topo.walls.insert(Coord::new(2, 2));
        // (1,1) -> (3,1)：必须从 y=3 绕行
        assert_eq!(topo.walking_distance(Coord::new(1, 1), Coord::new(3, 1)), Some(6));
    }

    #[test]
    fn test_walking_distance_unreachable() {
        let mut topo = Topology::bordered(5, 5);
        for y in 1..4 {
            topo.walls.insert(Coord::new(2, y));
        }
        assert_eq!(topo.walking_distance(Coord::new(1, 1), Coord::new(3, 3)), None);
        assert_eq!(topo.walking_distance(Coord::new(1, 1), Coord::new(0, 0)), None);
    }
}
