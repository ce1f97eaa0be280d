//! 计划翻译器：把一个符号步骤拆成电机原语队列
//!
//! 所需朝向由单位位移查表得到，`turns = (required - current) mod 4`：
//! 1 -> 右转，2 -> 右转两次，3 -> 左转；最后恰好一个前进。
//! 缓冲区只属于当前步骤，步骤完成、重规划与恢复时清空。

use std::collections::VecDeque;

use crate::core::AgentError;
use crate::planner::SymbolicStep;
use crate::world::{Coord, Heading, MotorPrimitive, Pose};

/// 紧急回退序列：原地掉头后前进一格
pub const BACKTRACK_SEQUENCE: [MotorPrimitive; 3] = [
    MotorPrimitive::TurnRight,
    MotorPrimitive::TurnRight,
    MotorPrimitive::Forward,
];

/// decompose 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepTarget {
    /// 已在目标格，无需动作
    AlreadySatisfied(Coord),
    /// 缓冲区已装入前往目标的原语
    Pending(Coord),
    /// 无位移目标的步骤（如购买），立即完成
    NoTarget,
}

/// 当前缓冲区的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferOrigin {
    Idle,
    Step(Coord),
    Backtrack,
}

/// 从当前朝向转向 required 所需的转向原语（180° 统一为两次右转）
pub fn turns_between(current: Heading, required: Heading) -> Vec<MotorPrimitive> {
    let turns = (required.index() + 4 - current.index()) % 4;
    match turns {
        1 => vec![MotorPrimitive::TurnRight],
        2 => vec![MotorPrimitive::TurnRight, MotorPrimitive::TurnRight],
        3 => vec![MotorPrimitive::TurnLeft],
        _ => Vec::new(),
    }
}

/// 无障碍假设下从 pose 前往相邻格 target 的原语序列
pub fn primitives_to(pose: Pose, target: Coord) -> Result<Vec<MotorPrimitive>, AgentError> {
    let (dx, dy) = (target.x - pose.position.x, target.y - pose.position.y);
    let required = Heading::from_delta(dx, dy).ok_or_else(|| {
        AgentError::MalformedStep(format!(
            "target {target} is not adjacent to {} (delta {dx},{dy})",
            pose.position
        ))
    })?;
    let mut prims = turns_between(pose.heading, required);
    prims.push(MotorPrimitive::Forward);
    Ok(prims)
}

#[derive(Debug)]
pub struct PlanTranslator {
    buffer: VecDeque<MotorPrimitive>,
    origin: BufferOrigin,
}

impl Default for PlanTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanTranslator {
    pub fn new() -> Self {
        Self {
            buffer: VecDeque::new(),
            origin: BufferOrigin::Idle,
        }
    }

    /// 把 step 拆成原语装入缓冲区
    pub fn decompose(&mut self, step: &SymbolicStep, pose: Pose) -> Result<StepTarget, AgentError> {
        self.clear();
        let Some(target) = step.target() else {
            return Ok(StepTarget::NoTarget);
        };
        if target == pose.position {
            return Ok(StepTarget::AlreadySatisfied(target));
        }
        let prims = primitives_to(pose, target)?;
        tracing::debug!(step = %step, primitives = ?prims, "step decomposed");
        self.buffer.extend(prims);
        self.origin = BufferOrigin::Step(target);
        Ok(StepTarget::Pending(target))
    }

    pub fn load_backtrack(&mut self) {
        self.buffer = VecDeque::from(BACKTRACK_SEQUENCE);
        self.origin = BufferOrigin::Backtrack;
    }

    pub fn next_primitive(&mut self) -> Option<MotorPrimitive> {
        self.buffer.pop_front()
    }

    pub fn has_pending(&self) -> bool {
        !self.buffer.is_empty()
    }

    pub fn origin(&self) -> BufferOrigin {
        self.origin
    }

    /// 当前步骤的目标格（回退或空闲时为 None）
    pub fn target(&self) -> Option<Coord> {
        match self.origin {
            BufferOrigin::Step(c) => Some(c),
            _ => None,
        }
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.origin = BufferOrigin::Idle;
    }

    /// 缓冲区排空后重置来源，返回刚完成的来源
    pub fn finish(&mut self) -> BufferOrigin {
        std::mem::replace(&mut self.origin, BufferOrigin::Idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive(from: Coord, to: Coord) -> SymbolicStep {
        SymbolicStep::Drive { from, to }
    }

    fn drain(t: &mut PlanTranslator) -> Vec<MotorPrimitive> {
        std::iter::from_fn(|| t.next_primitive()).collect()
    }

    #[test]
    fn test_east_to_east_neighbour_is_single_forward() {
        let mut t = PlanTranslator::new();
        let pose = Pose::new(Coord::new(1, 1), Heading::East);
        let target = t.decompose(&drive(Coord::new(1, 1), Coord::new(2, 1)), pose).unwrap();
        assert_eq!(target, StepTarget::Pending(Coord::new(2, 1)));
        assert_eq!(drain(&mut t), vec![MotorPrimitive::Forward]);
    }

    #[test]
    fn test_east_to_south_neighbour_turns_right() {
        let mut t = PlanTranslator::new();
        let pose = Pose::new(Coord::new(1, 1), Heading::East);
        t.decompose(&drive(Coord::new(1, 1), Coord::new(1, 2)), pose).unwrap();
        assert_eq!(drain(&mut t), vec![MotorPrimitive::TurnRight, MotorPrimitive::Forward]);
    }

    #[test]
    fn test_about_face_is_two_right_turns() {
        let prims = turns_between(Heading::East, Heading::West);
        assert_eq!(prims, vec![MotorPrimitive::TurnRight, MotorPrimitive::TurnRight]);
        assert_eq!(turns_between(Heading::East, Heading::North), vec![MotorPrimitive::TurnLeft]);
    }

    #[test]
    fn test_every_heading_and_delta_reaches_target() {
        let origin = Coord::new(5, 5);
        for heading in Heading::ALL {
            for required in Heading::ALL {
                let target = required.advance(origin);
                let pose = Pose::new(origin, heading);
                let prims = primitives_to(pose, target).unwrap();

                assert_eq!(prims.last(), Some(&MotorPrimitive::Forward));
                assert_eq!(prims.iter().filter(|p| **p == MotorPrimitive::Forward).count(), 1);
                assert!(prims.iter().filter(|p| p.is_turn()).count() <= 2);

                let end = prims.iter().fold(pose, |p, prim| p.apply(*prim));
                assert_eq!(end.position, target);
                assert_eq!(end.heading, required);
            }
        }
    }

    #[test]
    fn test_non_adjacent_target_is_malformed() {
        let mut t = PlanTranslator::new();
        let pose = Pose::new(Coord::new(1, 1), Heading::East);
        let err = t.decompose(&drive(Coord::new(1, 1), Coord::new(2, 2)), pose).unwrap_err();
        assert!(matches!(err, AgentError::MalformedStep(_)));
        assert!(!t.has_pending());
    }

    #[test]
    fn test_already_at_target_and_buy_step() {
        let mut t = PlanTranslator::new();
        let pose = Pose::new(Coord::new(3, 3), Heading::North);
        assert_eq!(
            t.decompose(&drive(Coord::new(3, 4), Coord::new(3, 3)), pose).unwrap(),
            StepTarget::AlreadySatisfied(Coord::new(3, 3))
        );
        let buy = SymbolicStep::Buy {
            item: "milk".into(),
            store: "victory".into(),
            at: Some(Coord::new(3, 3)),
        };
        assert_eq!(t.decompose(&buy, pose).unwrap(), StepTarget::NoTarget);
        assert!(!t.has_pending());
    }

    #[test]
    fn test_backtrack_sequence() {
        let mut t = PlanTranslator::new();
        t.load_backtrack();
        assert_eq!(t.origin(), BufferOrigin::Backtrack);
        assert_eq!(t.target(), None);
        assert_eq!(drain(&mut t), BACKTRACK_SEQUENCE.to_vec());
        assert_eq!(t.finish(), BufferOrigin::Backtrack);
        assert_eq!(t.origin(), BufferOrigin::Idle);
    }
}
