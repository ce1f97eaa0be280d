//! 卡死看门狗：位置连续多轮不变即报 Stuck

use crate::core::AgentError;
use crate::world::Coord;

#[derive(Debug)]
pub struct StuckWatchdog {
    threshold: u32,
    last: Option<Coord>,
    unchanged: u32,
}

impl StuckWatchdog {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            last: None,
            unchanged: 0,
        }
    }

    /// 每轮开头调用；位置不变的轮数超过阈值时返回 Stuck 并自动清零
    pub fn observe(&mut self, position: Coord) -> Result<(), AgentError> {
        if self.last == Some(position) {
            self.unchanged += 1;
        } else {
            self.last = Some(position);
            self.unchanged = 0;
        }
        if self.unchanged > self.threshold {
            let iterations = self.unchanged;
            self.unchanged = 0;
            return Err(AgentError::Stuck {
                position,
                iterations,
            });
        }
        Ok(())
    }

    pub fn reset(&mut self) {
        self.unchanged = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trips_after_threshold() {
        let mut dog = StuckWatchdog::new(2);
        let here = Coord::new(3, 3);
        assert!(dog.observe(here).is_ok());
        assert!(dog.observe(here).is_ok());
        assert!(dog.observe(here).is_ok());
        match dog.observe(here) {
            Err(AgentError::Stuck { iterations, position }) => {
                assert_eq!(iterations, 3);
                assert_eq!(position, here);
            }
            other => panic!("Expected Stuck, got {other:?}"),
        }
        // 触发后计数清零，重新累计
        assert!(dog.observe(here).is_ok());
    }

    #[test]
    fn test_movement_resets_counter() {
        let mut dog = StuckWatchdog::new(1);
        assert!(dog.observe(Coord::new(1, 1)).is_ok());
        assert!(dog.observe(Coord::new(1, 1)).is_ok());
        assert!(dog.observe(Coord::new(2, 1)).is_ok());
        assert!(dog.observe(Coord::new(2, 1)).is_ok());
        assert!(dog.observe(Coord::new(2, 1)).is_err());
    }
}
