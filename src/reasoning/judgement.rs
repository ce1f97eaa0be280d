//! 推理结果：感知判断与访问判断（JSON 结构由 schemars 生成后写进提示词）

use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

/// 对一个名字的感知判断：是什么、卖不卖目标商品、估价
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Judgement {
    /// 简短类别描述，如 "Discount supermarket chain"
    #[serde(alias = "type")]
    pub category: String,
    #[serde(alias = "sells_milk")]
    pub sells_target_item: bool,
    #[serde(default)]
    pub estimated_price: Option<f64>,
}

/// 是否绕路去新商店
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VisitJudgement {
    #[serde(alias = "replan_needed")]
    pub visit: bool,
    #[serde(default, alias = "reasoning")]
    pub rationale: String,
}

/// 生成 JSON Schema 字符串，供提示词约束输出格式
pub fn schema_json<T: JsonSchema>() -> String {
    serde_json::to_string_pretty(&schema_for!(T)).unwrap_or_default()
}

/// 从模型输出中提取 JSON：```json 代码块优先，其次首个 `{` 到最后一个 `}`
pub fn extract_json(output: &str) -> Option<&str> {
    let trimmed = output.trim();
    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        return Some(rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim()));
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    (end > start).then(|| &trimmed[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_from_fence() {
        let out = "Sure.\n```json\n{\"visit\": true, \"rationale\": \"cheap\"}\n```";
        let json = extract_json(out).unwrap();
        let parsed: VisitJudgement = serde_json::from_str(json).unwrap();
        assert!(parsed.visit);
    }

    #[test]
    fn test_accepts_legacy_field_names() {
        let parsed: Judgement = serde_json::from_str(
            r#"{"type": "Supermarket", "sells_milk": true, "estimated_price": 3.2}"#,
        )
        .unwrap();
        assert!(parsed.sells_target_item);
        assert_eq!(parsed.estimated_price, Some(3.2));
    }

    #[test]
    fn test_extract_json_none_without_braces() {
        assert_eq!(extract_json("no json here"), None);
    }

    #[test]
    fn test_schema_mentions_fields() {
        let schema = schema_json::<Judgement>();
        assert!(schema.contains("sells_target_item"));
        assert!(schema.contains("estimated_price"));
    }
}
