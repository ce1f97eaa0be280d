//! 离线回退：已知品牌子串表 + 加权访问判断，不需要网络

use crate::reasoning::{Judgement, VisitJudgement};

enum Pattern {
    Any(&'static [&'static str]),
    All(&'static [&'static str]),
}

impl Pattern {
    fn matches(&self, name: &str) -> bool {
        match self {
            Pattern::Any(keys) => keys.iter().any(|k| name.contains(k)),
            Pattern::All(keys) => keys.iter().all(|k| name.contains(k)),
        }
    }
}

struct Brand {
    pattern: Pattern,
    category: &'static str,
    sells: bool,
    price: Option<f64>,
}

/// 按顺序匹配，先命中者生效
const BRANDS: &[Brand] = &[
    Brand { pattern: Pattern::Any(&["rami", "levy", "osher"]), category: "Discount supermarket chain", sells: true, price: Some(2.5) },
    Brand { pattern: Pattern::Any(&["victory"]), category: "Standard supermarket", sells: true, price: Some(4.0) },
    Brand { pattern: Pattern::Any(&["am:pm", "am_pm", "yellow"]), category: "Convenience store", sells: true, price: Some(12.0) },
    Brand { pattern: Pattern::Any(&["american", "eagle"]), category: "Clothing store", sells: false, price: None },
    Brand { pattern: Pattern::Any(&["mcdonald"]), category: "Fast food restaurant", sells: false, price: None },
    Brand { pattern: Pattern::Any(&["starbuck"]), category: "Coffee shop", sells: false, price: None },
    Brand { pattern: Pattern::Any(&["nike"]), category: "Sportswear store", sells: false, price: None },
    Brand { pattern: Pattern::All(&["super", "pharm"]), category: "Pharmacy and cosmetics store", sells: false, price: None },
    Brand { pattern: Pattern::All(&["louis", "vuitton"]), category: "Luxury fashion store", sells: false, price: None },
    Brand { pattern: Pattern::All(&["mega", "bulldog"]), category: "Supermarket", sells: true, price: Some(3.0) },
    Brand { pattern: Pattern::All(&["old", "tree"]), category: "Tree (natural object)", sells: false, price: None },
    Brand { pattern: Pattern::Any(&["butcher", "moshe"]), category: "Butcher shop", sells: false, price: None },
];

/// 子串匹配已知品牌（大小写不敏感）；未知名字视为不卖目标商品
pub fn classify(name: &str) -> Judgement {
    let lower = name.to_lowercase();
    match BRANDS.iter().find(|b| b.pattern.matches(&lower)) {
        Some(b) => Judgement {
            category: b.category.to_string(),
            sells_target_item: b.sells,
            estimated_price: b.price,
        },
        None => Judgement {
            category: "Unknown establishment".to_string(),
            sells_target_item: false,
            estimated_price: None,
        },
    }
}

/// 加权访问判断参数
#[derive(Debug, Clone, PartialEq)]
pub struct VisitWeights {
    pub reference_price: f64,
    pub price_weight: f64,
    pub distance_weight: f64,
    /// 每步距离折算的代价
    pub distance_cost_per_step: f64,
    /// 净收益超过此值才去
    pub benefit_threshold: f64,
}

impl Default for VisitWeights {
    fn default() -> Self {
        Self {
            reference_price: 4.0,
            price_weight: 0.6,
            distance_weight: 0.4,
            distance_cost_per_step: 0.1,
            benefit_threshold: 0.5,
        }
    }
}

/// net = 节省 * price_weight - 距离代价 * distance_weight；net > 阈值则去
pub fn weigh_visit(price: f64, distance: Option<u32>, weights: &VisitWeights) -> VisitJudgement {
    let Some(distance) = distance else {
        return VisitJudgement {
            visit: false,
            rationale: "store is unreachable".to_string(),
        };
    };
    let savings = weights.reference_price - price;
    let penalty = f64::from(distance) * weights.distance_cost_per_step;
    let net = savings * weights.price_weight - penalty * weights.distance_weight;
    let visit = net > weights.benefit_threshold;
    VisitJudgement {
        visit,
        rationale: format!(
            "savings {savings:.2} over {distance} steps, net benefit {net:.2} {} threshold {:.2}",
            if visit { "above" } else { "below" },
            weights.benefit_threshold
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_sellers() {
        let j = classify("Rami_Levy_Jerusalem");
        assert!(j.sells_target_item);
        assert_eq!(j.estimated_price, Some(2.5));

        let j = classify("mega_bulldog_tlv");
        assert_eq!(j.category, "Supermarket");
        assert_eq!(j.estimated_price, Some(3.0));

        assert_eq!(classify("AM:PM Express").estimated_price, Some(12.0));
    }

    #[test]
    fn test_non_sellers_and_unknown() {
        assert!(!classify("old_tree_jerusalem_forest").sells_target_item);
        assert_eq!(classify("moshe_butcher_rehovot").category, "Butcher shop");
        assert_eq!(classify("super_pharm").category, "Pharmacy and cosmetics store");
        let unknown = classify("zzz_warehouse");
        assert!(!unknown.sells_target_item);
        assert_eq!(unknown.estimated_price, None);
    }

    #[test]
    fn test_weigh_visit_cheap_and_close() {
        let w = VisitWeights::default();
        // 1.5 * 0.6 - 3 * 0.1 * 0.4 = 0.78
        assert!(weigh_visit(2.5, Some(3), &w).visit);
        // 1.5 * 0.6 - 12 * 0.1 * 0.4 = 0.42
        assert!(!weigh_visit(2.5, Some(12), &w).visit);
    }

    #[test]
    fn test_weigh_visit_expensive_or_unreachable() {
        let w = VisitWeights::default();
        assert!(!weigh_visit(12.0, Some(1), &w).visit);
        assert!(!weigh_visit(1.0, None, &w).visit);
    }
}
