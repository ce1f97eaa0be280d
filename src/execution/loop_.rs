//! 执行循环：感知 -> 评估发现 -> （按需）同步并规划 -> 执行一个原语 -> 验证到达
//!
//! 循环是唯一会改动信念与问题文档的调用方。规划失败时执行紧急回退而不是终止，
//! 回退序列排空后再尝试规划；失步、碰撞、卡死与坏步骤一律清空缓冲、重置索引并重规划。
//! 只有文档同步失败与重复错误循环以 Err 结束运行，步数预算耗尽返回 Aborted 报告。

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::belief::BeliefStore;
use crate::config::RunSettings;
use crate::core::recovery::RepeatGuard;
use crate::core::{AgentError, LoopPhase, RecoveryAction, RecoveryEngine, RunOutcome, RunReport, RunStats};
use crate::execution::events::{send_event, RunEvent};
use crate::execution::StuckWatchdog;
use crate::pddl::{ProblemSynchronizer, ProblemTemplate, DOMAIN_PDDL};
use crate::planner::{Plan, PlannerError, SymbolicPlanner, SymbolicStep};
use crate::policy::{Discovery, PolicyContext, ReplanPolicy};
use crate::reasoning::Reasoner;
use crate::sim::{Cell, Simulator};
use crate::translator::{BufferOrigin, PlanTranslator, StepTarget};
use crate::world::{Coord, EntityKind, EntityProperties, MotorPrimitive, Pose};

const DOMAIN_FILE: &str = "domain.pddl";
const PROBLEM_NAME: &str = "scout-problem";
/// 事件中计划预览的步数
const PLAN_PREVIEW_STEPS: usize = 5;

pub struct ExecutionLoop<S: Simulator> {
    settings: RunSettings,
    sim: S,
    belief: BeliefStore,
    sync: ProblemSynchronizer,
    planner: Arc<dyn SymbolicPlanner>,
    policy: Arc<dyn ReplanPolicy>,
    reasoner: Option<Arc<Reasoner>>,
    translator: PlanTranslator,
    plan: Plan,
    step_index: usize,
    replan_pending: bool,
    last_primitive: Option<MotorPrimitive>,
    watchdog: StuckWatchdog,
    repeat_guard: RepeatGuard,
    recovery: RecoveryEngine,
    stats: RunStats,
    phase: LoopPhase,
    event_tx: Option<UnboundedSender<RunEvent>>,
    run_id: Uuid,
}

impl<S: Simulator> ExecutionLoop<S> {
    pub fn new(
        settings: RunSettings,
        sim: S,
        sync: ProblemSynchronizer,
        planner: Arc<dyn SymbolicPlanner>,
        policy: Arc<dyn ReplanPolicy>,
    ) -> Self {
        let belief = BeliefStore::new(sim.pose(), settings.target_item.clone());
        Self {
            watchdog: StuckWatchdog::new(settings.stuck_threshold),
            repeat_guard: RepeatGuard::new(settings.max_error_repeats),
            settings,
            sim,
            belief,
            sync,
            planner,
            policy,
            reasoner: None,
            translator: PlanTranslator::new(),
            plan: Plan::default(),
            step_index: 0,
            replan_pending: true,
            last_primitive: None,
            recovery: RecoveryEngine::new(),
            stats: RunStats::default(),
            phase: LoopPhase::AwaitObservation,
            event_tx: None,
            run_id: Uuid::new_v4(),
        }
    }

    /// 开局已知的商店（目标商店），不会再被当作新发现
    pub fn with_known_store(mut self, name: &str, position: Coord, price: Option<f64>) -> Self {
        self.belief
            .record_entity(name, position, EntityKind::Store, EntityProperties::seller(price));
        self
    }

    /// 用于在报告中统计推理调用次数
    pub fn with_reasoner(mut self, reasoner: Arc<Reasoner>) -> Self {
        self.reasoner = Some(reasoner);
        self
    }

    pub fn with_event_tx(mut self, tx: UnboundedSender<RunEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn belief(&self) -> &BeliefStore {
        &self.belief
    }

    pub fn simulator(&self) -> &S {
        &self.sim
    }

    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    fn domain_path(&self) -> PathBuf {
        self.sync.path().with_file_name(DOMAIN_FILE)
    }

    /// 写领域文件、问题模板与静态拓扑
    async fn prepare(&mut self) -> Result<(), AgentError> {
        if let Some(dir) = self.sync.path().parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(self.domain_path(), DOMAIN_PDDL).await?;

        let (width, height) = self.sim.dimensions();
        let stores: Vec<String> = self
            .belief
            .entities()
            .filter(|e| e.kind == EntityKind::Store)
            .map(|e| e.name.clone())
            .collect();
        let template = ProblemTemplate::new(PROBLEM_NAME, width, height, self.belief.pose().position)
            .with_item(self.belief.target_item())
            .with_stores(stores);
        self.sync.write_template(&template).await?;
        self.sync.initialize(width, height).await?;
        Ok(())
    }

    /// 运行到买到目标商品、预算耗尽或致命错误
    pub async fn run(mut self) -> Result<RunReport, AgentError> {
        let started_at = Utc::now();
        self.prepare().await?;
        send_event(
            &self.event_tx,
            RunEvent::RunStarted {
                run_id: self.run_id.to_string(),
                strategy: self.policy.strategy().to_string(),
                scenario: self.settings.scenario.clone(),
                pose: self.sim.pose(),
            },
        );
        tracing::info!(
            run_id = %self.run_id,
            strategy = %self.policy.strategy(),
            scenario = %self.settings.scenario,
            planner = self.planner.name(),
            "run started"
        );

        let outcome = loop {
            if self.stats.iterations >= self.settings.max_steps {
                let reason = format!("step budget of {} iterations exhausted", self.settings.max_steps);
                self.phase = LoopPhase::Abort;
                tracing::warn!(reason = %reason, "run aborted");
                send_event(&self.event_tx, RunEvent::Aborted { reason: reason.clone() });
                break RunOutcome::Aborted { reason };
            }
            self.stats.iterations += 1;
            match self.iterate().await {
                Ok(Some(outcome)) => break outcome,
                Ok(None) => {}
                Err(e) => {
                    if let Err(fatal) = self.recover(e).await {
                        self.phase = LoopPhase::Abort;
                        tracing::error!(error = %fatal, "run terminated");
                        send_event(&self.event_tx, RunEvent::Aborted { reason: fatal.to_string() });
                        return Err(fatal);
                    }
                }
            }
        };

        if let Some(reasoner) = &self.reasoner {
            self.stats.reasoner_calls = reasoner.llm_calls();
            self.stats.reasoner_fallbacks = reasoner.fallbacks();
        }
        let report = RunReport {
            run_id: self.run_id,
            strategy: self.policy.strategy(),
            scenario: self.settings.scenario.clone(),
            started_at,
            finished_at: Utc::now(),
            outcome,
            stats: self.stats.clone(),
            final_pose: self.sim.pose(),
        };
        tracing::info!(
            run_id = %report.run_id,
            done = report.outcome.is_done(),
            iterations = report.stats.iterations,
            replans = report.stats.replans,
            "run finished"
        );
        Ok(report)
    }

    /// 单轮；返回 Some 表示运行结束
    async fn iterate(&mut self) -> Result<Option<RunOutcome>, AgentError> {
        // AWAIT_OBSERVATION
        self.phase = LoopPhase::AwaitObservation;
        let pose = self.sim.pose();
        self.belief.update_pose(pose);
        if let Some(outcome) = self.check_goal() {
            return Ok(Some(outcome));
        }
        self.watchdog.observe(pose.position)?;

        // EVALUATE_DISCOVERY
        self.evaluate_discoveries().await;

        // SYNC_AND_PLAN：回退序列执行期间不规划
        if self.replan_pending && self.translator.origin() != BufferOrigin::Backtrack {
            self.sync_and_plan().await?;
        }

        // EXECUTE_PRIMITIVE
        if !self.translator.has_pending() {
            if let Some(outcome) = self.load_next_step()? {
                return Ok(Some(outcome));
            }
            if !self.translator.has_pending() {
                return Ok(None);
            }
        }
        let before = self.sim.pose();
        let after = self.execute_primitive(before);

        // VERIFY_ARRIVAL
        if !self.translator.has_pending() {
            self.verify_arrival(before, after)?;
        }
        Ok(None)
    }

    /// 站在已知的卖目标商品的商店上时尝试购买
    fn check_goal(&mut self) -> Option<RunOutcome> {
        let position = self.belief.pose().position;
        let store = self
            .belief
            .store_at(position)
            .filter(|s| s.properties.sells_target_item)
            .cloned()?;
        self.sim.step(MotorPrimitive::Interact);
        self.try_purchase(&store.name)
    }

    /// Interact 之后检查是否持有商品；没买到说明该店其实不卖，降级为障碍物并重规划
    fn try_purchase(&mut self, store: &str) -> Option<RunOutcome> {
        if !self.sim.holds(self.belief.target_item()) {
            tracing::warn!(store = %store, "purchase failed, store does not sell the item");
            if let Some(position) = self.belief.entity(store).map(|e| e.position) {
                self.belief
                    .record_entity(store, position, EntityKind::Obstacle, EntityProperties::default());
            }
            self.replan_pending = true;
            return None;
        }
        let price = self.belief.entity(store).and_then(|e| e.properties.price);
        self.phase = LoopPhase::Done;
        tracing::info!(store = %store, price = ?price, "goal reached");
        send_event(
            &self.event_tx,
            RunEvent::GoalReached {
                store: store.to_string(),
                price,
            },
        );
        Some(RunOutcome::Done {
            store: store.to_string(),
            price,
        })
    }

    async fn evaluate_discoveries(&mut self) {
        self.phase = LoopPhase::EvaluateDiscovery;
        let agent = self.belief.pose().position;
        let fresh: Vec<_> = self
            .sim
            .sensed_entities()
            .into_iter()
            .filter(|e| !self.belief.knows(&e.name))
            .collect();
        for sensed in fresh {
            let discovery = Discovery {
                walking_distance: self.sync.topology().walking_distance(agent, sensed.position),
                name: sensed.name,
                position: sensed.position,
            };
            let ctx = PolicyContext {
                remaining: self.plan.remaining(self.step_index),
                agent,
            };
            let decision = self.policy.decide(&discovery, &ctx).await;
            self.stats.discoveries += 1;
            tracing::info!(
                entity = %discovery.name,
                position = %discovery.position,
                distance = ?discovery.walking_distance,
                kind = ?decision.classify_as,
                replan = decision.trigger_replan,
                reason = %decision.reason,
                "discovery evaluated"
            );
            send_event(
                &self.event_tx,
                RunEvent::Discovery {
                    name: discovery.name.clone(),
                    position: discovery.position,
                    classify_as: decision.classify_as,
                    trigger_replan: decision.trigger_replan,
                    reason: decision.reason.clone(),
                },
            );
            self.belief.record_entity(
                &discovery.name,
                discovery.position,
                decision.classify_as,
                decision.properties,
            );
            if decision.trigger_replan {
                self.replan_pending = true;
            }
        }
    }

    async fn sync_and_plan(&mut self) -> Result<(), AgentError> {
        self.phase = LoopPhase::SyncAndPlan;
        self.stats.replans += 1;
        self.translator.clear();
        self.plan = Plan::default();
        self.step_index = 0;

        let facts = self.belief.snapshot_dynamic_facts();
        self.sync.apply(&facts).await?;

        let domain = self.domain_path();
        let timeout = self.settings.planner_timeout;
        let plan = match tokio::time::timeout(timeout, self.planner.plan(&domain, self.sync.path())).await {
            Ok(Ok(plan)) if plan.is_empty() => {
                return Err(AgentError::PlannerFailure("planner returned an empty plan".into()))
            }
            Ok(Ok(plan)) => plan,
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(PlannerError::Timeout(timeout.as_secs()).into()),
        };

        tracing::info!(steps = plan.len(), preview = ?plan.preview(PLAN_PREVIEW_STEPS), "plan ready");
        send_event(
            &self.event_tx,
            RunEvent::PlanReady {
                steps: plan.len(),
                preview: plan.preview(PLAN_PREVIEW_STEPS),
            },
        );
        self.plan = plan;
        self.replan_pending = false;
        Ok(())
    }

    /// 缓冲区为空时装入当前步骤；计划耗尽则请求重规划
    fn load_next_step(&mut self) -> Result<Option<RunOutcome>, AgentError> {
        let Some(step) = self.plan.get(self.step_index).cloned() else {
            if !self.replan_pending {
                tracing::info!("plan exhausted without reaching the goal, replanning");
                self.replan_pending = true;
            }
            return Ok(None);
        };
        let pose = self.sim.pose();
        match self.translator.decompose(&step, pose)? {
            StepTarget::Pending(_) => Ok(None),
            StepTarget::AlreadySatisfied(at) => {
                self.complete_step(at);
                Ok(None)
            }
            StepTarget::NoTarget => {
                self.sim.step(MotorPrimitive::Interact);
                self.last_primitive = Some(MotorPrimitive::Interact);
                self.complete_step(pose.position);
                match &step {
                    SymbolicStep::Buy { store, .. } => Ok(self.try_purchase(store)),
                    SymbolicStep::Drive { .. } => Ok(None),
                }
            }
        }
    }

    /// 弹出一个原语执行；前进被当前步骤目标格上的已知卖家商店挡住时强行进入，
    /// 其他实体照常挡住，交给碰撞处理
    fn execute_primitive(&mut self, before: Pose) -> Pose {
        self.phase = LoopPhase::ExecutePrimitive;
        let Some(primitive) = self.translator.next_primitive() else {
            return before;
        };
        let front = before.front();
        let trusted_target = primitive == MotorPrimitive::Forward
            && self.translator.target() == Some(front)
            && matches!(self.sim.cell_contents(front), Cell::Entity(_))
            && self.belief.store_at(front).is_some();
        let after = if trusted_target {
            tracing::info!(target = %front, "target occupied by an entity, entering anyway");
            send_event(&self.event_tx, RunEvent::ForcedEntry { target: front });
            self.sim.force_enter(front)
        } else {
            self.sim.step(primitive)
        };
        self.last_primitive = Some(primitive);
        self.stats.primitives += 1;
        self.belief.update_pose(after);
        tracing::debug!(primitive = ?primitive, position = %after.position, heading = ?after.heading, "primitive executed");
        send_event(&self.event_tx, RunEvent::Primitive { primitive, pose: after });
        after
    }

    fn verify_arrival(&mut self, before: Pose, after: Pose) -> Result<(), AgentError> {
        self.phase = LoopPhase::VerifyArrival;
        match self.translator.finish() {
            BufferOrigin::Step(target) if after.position == target => {
                self.complete_step(target);
                Ok(())
            }
            BufferOrigin::Step(target) if after.position != before.position => {
                Err(AgentError::Desynchronization {
                    expected: target,
                    observed: after.position,
                })
            }
            BufferOrigin::Step(_) => match self.last_primitive {
                Some(MotorPrimitive::Forward) => Err(AgentError::Collision(after.front())),
                _ => Ok(()),
            },
            BufferOrigin::Backtrack => {
                tracing::info!(position = %after.position, "backtrack finished, replanning");
                Ok(())
            }
            BufferOrigin::Idle => Ok(()),
        }
    }

    fn complete_step(&mut self, position: Coord) {
        send_event(
            &self.event_tx,
            RunEvent::StepCompleted {
                index: self.step_index,
                position,
            },
        );
        self.step_index += 1;
        self.repeat_guard.clear();
    }

    /// 非致命错误按 RecoveryEngine 的建议恢复；致命错误原样返回
    async fn recover(&mut self, err: AgentError) -> Result<(), AgentError> {
        self.phase = LoopPhase::Recover;
        if err.is_fatal() {
            return Err(err);
        }
        self.repeat_guard.record(&err)?;

        match &err {
            AgentError::Collision(at) => {
                self.stats.collisions += 1;
                self.belief.mark_blocked(*at);
                self.sync.add_blocked(*at).await?;
            }
            AgentError::Desynchronization { .. } => self.stats.desyncs += 1,
            AgentError::Stuck { .. } => self.stats.stuck_resets += 1,
            AgentError::PlannerFailure(_) => self.stats.planner_failures += 1,
            _ => {}
        }

        let action = self.recovery.handle(&err);
        tracing::warn!(error = %err, action = action.label(), "recovering");
        send_event(
            &self.event_tx,
            RunEvent::Recovery {
                action: action.label().to_string(),
                detail: err.to_string(),
            },
        );
        match action {
            RecoveryAction::ResetAndReplan => {
                self.translator.clear();
                self.plan = Plan::default();
                self.step_index = 0;
                self.replan_pending = true;
                self.watchdog.reset();
                Ok(())
            }
            RecoveryAction::Backtrack => {
                self.stats.backtracks += 1;
                self.translator.load_backtrack();
                self.plan = Plan::default();
                self.step_index = 0;
                self.replan_pending = true;
                Ok(())
            }
            RecoveryAction::Abort => Err(err),
        }
    }
}
