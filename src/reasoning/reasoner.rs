//! Reasoner：调用 LLM 做感知判断与访问判断，传输或解析失败时回退到离线表

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::llm::{LlmClient, Message};
use crate::reasoning::{
    extract_json, fallback, schema_json, Judgement, VisitJudgement, VisitWeights,
};

const ANALYZE_SYSTEM_PROMPT: &str = "You are the perception module of a shopping agent walking \
through a city grid. You know common retail chains and what they sell. \
Answer with a single JSON object matching this schema and nothing else:\n{schema}";

const ANALYZE_USER_PROMPT: &str = "You pass a building labeled \"{name}\".\n\
1. What kind of place is it?\n\
2. Does it sell {item}?\n\
3. If it does, estimate the price of {item} compared to the reference store ({reference:.2}).";

const VISIT_SYSTEM_PROMPT: &str = "You are the strategic module of a shopping agent. Weigh price \
savings against detour distance. Answer with a single JSON object matching this schema and \
nothing else:\n{schema}";

const VISIT_USER_PROMPT: &str = "Current destination: reference store ({item} costs {reference:.2}).\n\
New option: \"{store}\" ({category}), estimated {item} price {price:.2}.\n\
Walking distance to the new option: {distance} steps.\n\
Price importance: {price_weight:.0}%. Distance importance: {distance_weight:.0}%.\n\
Should the agent switch to the new store?";

/// 访问判断所需的上下文
#[derive(Debug, Clone)]
pub struct VisitContext {
    pub store: String,
    pub walking_distance: Option<u32>,
}

pub struct Reasoner {
    llm: Option<Arc<dyn LlmClient>>,
    target_item: String,
    weights: VisitWeights,
    llm_calls: AtomicU64,
    fallbacks: AtomicU64,
}

impl Reasoner {
    pub fn new(llm: Option<Arc<dyn LlmClient>>, target_item: impl Into<String>, weights: VisitWeights) -> Self {
        Self {
            llm,
            target_item: target_item.into(),
            weights,
            llm_calls: AtomicU64::new(0),
            fallbacks: AtomicU64::new(0),
        }
    }

    /// 只用离线回退表
    pub fn offline(target_item: impl Into<String>, weights: VisitWeights) -> Self {
        Self::new(None, target_item, weights)
    }

    pub fn weights(&self) -> &VisitWeights {
        &self.weights
    }

    pub fn llm_calls(&self) -> u64 {
        self.llm_calls.load(Ordering::Relaxed)
    }

    pub fn fallbacks(&self) -> u64 {
        self.fallbacks.load(Ordering::Relaxed)
    }

    /// 感知判断：这是什么、是否卖目标商品、估价
    pub async fn analyze(&self, name: &str) -> Judgement {
        let messages = [
            Message::system(ANALYZE_SYSTEM_PROMPT.replace("{schema}", &schema_json::<Judgement>())),
            Message::user(
                ANALYZE_USER_PROMPT
                    .replace("{name}", name)
                    .replace("{item}", &self.target_item)
                    .replace("{reference:.2}", &format!("{:.2}", self.weights.reference_price)),
            ),
        ];
        let judgement = match self.ask::<Judgement>(&messages).await {
            Some(j) => j,
            None => fallback::classify(name),
        };
        tracing::info!(
            entity = %name,
            category = %judgement.category,
            sells = judgement.sells_target_item,
            price = ?judgement.estimated_price,
            "entity analyzed"
        );
        judgement
    }

    /// 访问判断：只对卖目标商品的地点有意义
    pub async fn decide_visit(&self, ctx: &VisitContext, judgement: &Judgement) -> VisitJudgement {
        if !judgement.sells_target_item {
            return VisitJudgement {
                visit: false,
                rationale: format!("{} does not sell {}", judgement.category, self.target_item),
            };
        }
        let price = judgement.estimated_price.unwrap_or(self.weights.reference_price);
        let Some(distance) = ctx.walking_distance else {
            return fallback::weigh_visit(price, None, &self.weights);
        };
        let messages = [
            Message::system(VISIT_SYSTEM_PROMPT.replace("{schema}", &schema_json::<VisitJudgement>())),
            Message::user(
                VISIT_USER_PROMPT
                    .replace("{item}", &self.target_item)
                    .replace("{reference:.2}", &format!("{:.2}", self.weights.reference_price))
                    .replace("{store}", &ctx.store)
                    .replace("{category}", &judgement.category)
                    .replace("{price:.2}", &format!("{price:.2}"))
                    .replace("{distance}", &distance.to_string())
                    .replace("{price_weight:.0}", &format!("{:.0}", self.weights.price_weight * 100.0))
                    .replace(
                        "{distance_weight:.0}",
                        &format!("{:.0}", self.weights.distance_weight * 100.0),
                    ),
            ),
        ];
        let verdict = match self.ask::<VisitJudgement>(&messages).await {
            Some(v) => v,
            None => fallback::weigh_visit(price, Some(distance), &self.weights),
        };
        tracing::info!(
            store = %ctx.store,
            distance,
            visit = verdict.visit,
            rationale = %verdict.rationale,
            "visit decided"
        );
        verdict
    }

    /// 调用 LLM 并解析 JSON；无客户端、传输失败或解析失败时返回 None
    async fn ask<T: DeserializeOwned>(&self, messages: &[Message]) -> Option<T> {
        let llm = self.llm.as_ref()?;
        self.llm_calls.fetch_add(1, Ordering::Relaxed);
        let parsed = match llm.complete(messages).await {
            Ok(output) => extract_json(&output)
                .ok_or_else(|| "no JSON object in reply".to_string())
                .and_then(|json| serde_json::from_str::<T>(json).map_err(|e| e.to_string())),
            Err(e) => Err(e),
        };
        match parsed {
            Ok(value) => Some(value),
            Err(e) => {
                self.fallbacks.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error = %e, "reasoning service failed, using offline table");
                None
            }
        }
    }
}
