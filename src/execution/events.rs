//! 运行过程事件：可序列化为 JSON，推给外部观察者（日志文件、仪表盘等）

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use crate::world::{Coord, EntityKind, MotorPrimitive, Pose};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    RunStarted {
        run_id: String,
        strategy: String,
        scenario: String,
        pose: Pose,
    },
    /// 新发现实体及策略决定
    Discovery {
        name: String,
        position: Coord,
        classify_as: EntityKind,
        trigger_replan: bool,
        reason: String,
    },
    /// 新计划就绪（前几步预览）
    PlanReady { steps: usize, preview: Vec<String> },
    Primitive {
        primitive: MotorPrimitive,
        pose: Pose,
    },
    /// 目标格被实体占据时强行进入
    ForcedEntry { target: Coord },
    StepCompleted { index: usize, position: Coord },
    Recovery { action: String, detail: String },
    GoalReached { store: String, price: Option<f64> },
    Aborted { reason: String },
}

pub(crate) fn send_event(tx: &Option<UnboundedSender<RunEvent>>, ev: RunEvent) {
    if let Some(t) = tx {
        let _ = t.send(ev);
    }
}
