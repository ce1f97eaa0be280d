//! 实验场景：五个内置场景 + 从 TOML 文件加载自定义场景

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::AgentError;
use crate::sim::{GridWorld, MazeSpec, WorldEntity};
use crate::world::{Coord, Heading, Pose};

fn default_size() -> i32 {
    20
}

fn default_start() -> Coord {
    Coord::new(1, 1)
}

fn default_heading() -> Heading {
    Heading::East
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_size")]
    pub width: i32,
    #[serde(default = "default_size")]
    pub height: i32,
    #[serde(default = "default_start")]
    pub start: Coord,
    #[serde(default = "default_heading")]
    pub heading: Heading,
    /// 已知的目标商店，开局即在信念中
    pub goal: WorldEntity,
    /// 途中等待被发现的实体
    #[serde(default)]
    pub objects: Vec<WorldEntity>,
    /// 额外内墙（边框墙总是存在）
    #[serde(default)]
    pub walls: Vec<Coord>,
    #[serde(default)]
    pub maze: Option<MazeSpec>,
}

impl Scenario {
    fn builtin_one(id: &str, name: &str, description: &str, goal: Coord, object: WorldEntity) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            width: default_size(),
            height: default_size(),
            start: default_start(),
            heading: default_heading(),
            goal: WorldEntity::store("victory", goal, 4.0),
            objects: vec![object],
            walls: Vec::new(),
            maze: None,
        }
    }

    pub fn builtin() -> Vec<Scenario> {
        let far = Coord::new(18, 18);
        vec![
            Self::builtin_one(
                "scenario_1",
                "Irrelevant Object",
                "An ancient tree next to the route; not a store",
                far,
                WorldEntity::landmark("old_tree_jerusalem_forest", Coord::new(3, 2)),
            ),
            Self::builtin_one(
                "scenario_2",
                "Relevant but Useless",
                "A butcher shop; sells meat, not milk",
                far,
                WorldEntity::landmark("moshe_butcher_rehovot", Coord::new(2, 4)),
            ),
            Self::builtin_one(
                "scenario_3",
                "Useful but Far",
                "A cheap discount supermarket that requires a detour",
                far,
                WorldEntity::store("rami_levy_jerusalem", Coord::new(10, 6), 2.5),
            ),
            Self::builtin_one(
                "scenario_4",
                "Sweet Spot",
                "A reasonably priced supermarket two steps away",
                far,
                WorldEntity::store("mega_bulldog_tlv", Coord::new(3, 3), 3.5),
            ),
            Self::builtin_one(
                "scenario_5",
                "Expensive Trap",
                "A very expensive convenience store close to the start",
                Coord::new(10, 10),
                WorldEntity::store("am_pm_express", Coord::new(6, 4), 12.0),
            ),
        ]
    }

    /// 按 id 查找内置场景；接受 `scenario_3`、`SCENARIO_3` 或 `3`
    pub fn by_id(id: &str) -> Option<Scenario> {
        let wanted = id.trim().to_lowercase();
        Self::builtin()
            .into_iter()
            .find(|s| s.id == wanted || s.id.strip_prefix("scenario_") == Some(wanted.as_str()))
    }

    pub fn from_toml_str(text: &str) -> Result<Scenario, AgentError> {
        let scenario: Scenario =
            toml::from_str(text).map_err(|e| AgentError::ConfigError(format!("scenario: {e}")))?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub async fn load(path: &Path) -> Result<Scenario, AgentError> {
        let text = tokio::fs::read_to_string(path).await?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<(), AgentError> {
        let inside = |c: Coord| c.x > 0 && c.y > 0 && c.x < self.width - 1 && c.y < self.height - 1;
        if self.width < 3 || self.height < 3 {
            return Err(AgentError::ConfigError(format!(
                "scenario {}: grid {}x{} is too small",
                self.id, self.width, self.height
            )));
        }
        for (label, c) in std::iter::once(("start", self.start))
            .chain(std::iter::once(("goal", self.goal.position)))
            .chain(self.objects.iter().map(|o| (o.name.as_str(), o.position)))
        {
            if !inside(c) {
                return Err(AgentError::ConfigError(format!(
                    "scenario {}: {label} at {c} is outside the walkable area",
                    self.id
                )));
            }
        }
        Ok(())
    }

    pub fn start_pose(&self) -> Pose {
        Pose::new(self.start, self.heading)
    }

    /// 构建网格世界；配置了迷宫时按种子生成内墙与额外商店
    pub fn build_world(&self, target_item: &str, sensor_radius: u32) -> GridWorld {
        let mut world = GridWorld::bordered(self.width, self.height, self.start_pose(), target_item)
            .with_sensor_radius(sensor_radius);
        let reserved: Vec<Coord> = self.objects.iter().map(|o| o.position).collect();
        let mut walls: HashSet<Coord> = self
            .walls
            .iter()
            .copied()
            .filter(|w| *w != self.start && *w != self.goal.position && !reserved.contains(w))
            .collect();
        let mut extras = Vec::new();
        if let Some(maze) = &self.maze {
            let taken: Vec<&str> = std::iter::once(self.goal.name.as_str())
                .chain(self.objects.iter().map(|o| o.name.as_str()))
                .collect();
            let (maze_walls, maze_extras) =
                maze.build(self.width, self.height, self.start, self.goal.position, &reserved, &taken);
            walls.extend(maze_walls);
            extras = maze_extras;
        }
        for wall in walls {
            world = world.with_wall(wall);
        }
        world.add_entity(self.goal.clone());
        for entity in self.objects.iter().cloned().chain(extras) {
            world.add_entity(entity);
        }
        world
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{capture_topology, Simulator};

    #[test]
    fn test_five_builtin_scenarios() {
        let all = Scenario::builtin();
        assert_eq!(all.len(), 5);
        assert!(all.iter().all(|s| s.goal.name == "victory" && s.goal.price == Some(4.0)));
        assert_eq!(Scenario::by_id("SCENARIO_5").unwrap().goal.position, Coord::new(10, 10));
        assert_eq!(Scenario::by_id("3").unwrap().objects[0].name, "rami_levy_jerusalem");
        assert!(Scenario::by_id("scenario_9").is_none());
    }

    #[test]
    fn test_build_world_places_entities() {
        let s = Scenario::by_id("scenario_4").unwrap();
        let world = s.build_world("milk", 4);
        assert_eq!(world.dimensions(), (20, 20));
        assert_eq!(world.entities().len(), 2);
        assert!(world.sensed_entities().iter().any(|e| e.name == "mega_bulldog_tlv"));
    }

    #[test]
    fn test_custom_scenario_from_toml() {
        let text = r#"
id = "corridor"
width = 8
height = 5
walls = [{ x = 3, y = 2 }]

[goal]
name = "victory"
position = { x = 6, y = 3 }
sells_item = true
price = 4.0

[[objects]]
name = "nike_outlet"
position = { x = 4, y = 1 }
"#;
        let s = Scenario::from_toml_str(text).unwrap();
        assert_eq!(s.start, Coord::new(1, 1));
        assert_eq!(s.heading, Heading::East);
        let world = s.build_world("milk", 2);
        let topo = capture_topology(&world);
        assert!(topo.is_wall(Coord::new(3, 2)));
        assert!(!s.objects[0].sells_item);
    }

    #[test]
    fn test_custom_scenario_rejects_goal_on_border() {
        let text = r#"
id = "broken"
width = 6
height = 6
[goal]
name = "victory"
position = { x = 0, y = 3 }
"#;
        assert!(matches!(
            Scenario::from_toml_str(text),
            Err(AgentError::ConfigError(_))
        ));
    }

    #[test]
    fn test_maze_scenario_is_reproducible() {
        let mut s = Scenario::by_id("scenario_3").unwrap();
        s.maze = Some(MazeSpec {
            wall_density: 0.15,
            seed: 11,
            extra_stores: 2,
        });
        let a = capture_topology(&s.build_world("milk", 3));
        let b = capture_topology(&s.build_world("milk", 3));
        assert_eq!(a, b);
        assert_eq!(s.build_world("milk", 3).entities().len(), 4);
    }
}
