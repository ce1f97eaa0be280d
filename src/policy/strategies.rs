//! 四种策略实现

use std::sync::Arc;

use async_trait::async_trait;

use crate::policy::{Decision, Discovery, PolicyContext, ReplanPolicy, Strategy, Thresholds};
use crate::reasoning::{Judgement, Reasoner, VisitContext};
use crate::world::EntityProperties;

fn properties_of(judgement: &Judgement) -> EntityProperties {
    EntityProperties {
        sells_target_item: judgement.sells_target_item,
        price: judgement.estimated_price,
    }
}

/// 基线：不调用推理，一律当作障碍物，只有挡路才重规划
#[derive(Debug, Default)]
pub struct PassivePolicy;

#[async_trait]
impl ReplanPolicy for PassivePolicy {
    fn strategy(&self) -> Strategy {
        Strategy::Passive
    }

    async fn decide(&self, discovery: &Discovery, ctx: &PolicyContext<'_>) -> Decision {
        Decision::decline(discovery, ctx, EntityProperties::default(), "passive: discovery ignored")
    }
}

/// 只要卖目标商品就去
pub struct EagerPolicy {
    reasoner: Arc<Reasoner>,
}

impl EagerPolicy {
    pub fn new(reasoner: Arc<Reasoner>) -> Self {
        Self { reasoner }
    }
}

#[async_trait]
impl ReplanPolicy for EagerPolicy {
    fn strategy(&self) -> Strategy {
        Strategy::Eager
    }

    async fn decide(&self, discovery: &Discovery, ctx: &PolicyContext<'_>) -> Decision {
        let judgement = self.reasoner.analyze(&discovery.name).await;
        if judgement.sells_target_item {
            return Decision::visit(&judgement, format!("eager: {} sells the item", discovery.name));
        }
        Decision::decline(
            discovery,
            ctx,
            properties_of(&judgement),
            format!("eager: {} is a {}", discovery.name, judgement.category),
        )
    }
}

/// 先分类，再让推理服务权衡节省与绕路
pub struct DeliberativePolicy {
    reasoner: Arc<Reasoner>,
}

impl DeliberativePolicy {
    pub fn new(reasoner: Arc<Reasoner>) -> Self {
        Self { reasoner }
    }
}

#[async_trait]
impl ReplanPolicy for DeliberativePolicy {
    fn strategy(&self) -> Strategy {
        Strategy::Deliberative
    }

    async fn decide(&self, discovery: &Discovery, ctx: &PolicyContext<'_>) -> Decision {
        let judgement = self.reasoner.analyze(&discovery.name).await;
        if !judgement.sells_target_item {
            return Decision::decline(
                discovery,
                ctx,
                properties_of(&judgement),
                format!("deliberative: {} is a {}", discovery.name, judgement.category),
            );
        }
        let visit_ctx = VisitContext {
            store: discovery.name.clone(),
            walking_distance: discovery.walking_distance,
        };
        let verdict = self.reasoner.decide_visit(&visit_ctx, &judgement).await;
        if verdict.visit {
            Decision::visit(&judgement, format!("deliberative: {}", verdict.rationale))
        } else {
            Decision::decline(
                discovery,
                ctx,
                properties_of(&judgement),
                format!("deliberative: store rejected, {}", verdict.rationale),
            )
        }
    }
}

/// 闭式规则：节省 > savings 且 步行距离 < distance
pub struct ThresholdedPolicy {
    reasoner: Arc<Reasoner>,
    thresholds: Thresholds,
}

impl ThresholdedPolicy {
    pub fn new(reasoner: Arc<Reasoner>, thresholds: Thresholds) -> Self {
        Self {
            reasoner,
            thresholds,
        }
    }
}

#[async_trait]
impl ReplanPolicy for ThresholdedPolicy {
    fn strategy(&self) -> Strategy {
        Strategy::Thresholded
    }

    async fn decide(&self, discovery: &Discovery, ctx: &PolicyContext<'_>) -> Decision {
        let judgement = self.reasoner.analyze(&discovery.name).await;
        if !judgement.sells_target_item {
            return Decision::decline(
                discovery,
                ctx,
                properties_of(&judgement),
                format!("thresholded: {} is a {}", discovery.name, judgement.category),
            );
        }
        let price = judgement
            .estimated_price
            .unwrap_or(self.thresholds.reference_price);
        let savings = self.thresholds.reference_price - price;
        let close_enough = discovery
            .walking_distance
            .is_some_and(|d| d < self.thresholds.distance);
        let summary = format!(
            "savings {savings:.2}, distance {}",
            discovery
                .walking_distance
                .map_or_else(|| "unreachable".to_string(), |d| d.to_string())
        );
        if savings > self.thresholds.savings && close_enough {
            Decision::visit(&judgement, format!("thresholded: {summary}"))
        } else {
            Decision::decline(
                discovery,
                ctx,
                properties_of(&judgement),
                format!("thresholded: below threshold, {summary}"),
            )
        }
    }
}
