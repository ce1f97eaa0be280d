//! 问题文档：`(define (problem ...) ...)` 的结构化视图与规范化渲染
//!
//! 子句按关键字结构化定位；渲染格式固定，同一棵树总是得到同一段文本。

use crate::pddl::{sexpr, Fact, PddlError, SExpr};

/// 类型化对象列表每行最多名字数
const OBJECTS_PER_LINE: usize = 10;

/// 已解析的问题文档（`define` 列表的子项）
#[derive(Debug, Clone, PartialEq)]
pub struct ProblemDocument {
    items: Vec<SExpr>,
}

impl ProblemDocument {
    /// 解析文本；要求恰好一个顶层 `(define ...)`
    pub fn parse(text: &str) -> Result<Self, PddlError> {
        let exprs = sexpr::parse(text)?;
        let mut defines: Vec<SExpr> = exprs.into_iter().filter(|e| e.head_is("define")).collect();
        match defines.len() {
            0 => Err(PddlError::NotADefinition),
            1 => Ok(Self::from_items(defines.remove(0))),
            found => Err(PddlError::ClauseCount {
                keyword: "define".to_string(),
                found,
            }),
        }
    }

    fn from_items(define: SExpr) -> Self {
        match define {
            SExpr::List(items) => Self { items },
            atom @ SExpr::Atom(_) => Self { items: vec![atom] },
        }
    }

    /// 由 `(problem name)`、`:domain` 与其余子句组装
    pub fn new(problem: &str, domain: &str, clauses: Vec<SExpr>) -> Self {
        let mut items = vec![
            SExpr::atom("define"),
            SExpr::from_atoms(&["problem", problem]),
            SExpr::from_atoms(&[":domain", domain]),
        ];
        items.extend(clauses);
        Self { items }
    }

    pub fn problem_name(&self) -> Option<&str> {
        self.items
            .iter()
            .find(|i| i.head_is("problem"))
            .and_then(|i| i.as_list()?.get(1)?.as_atom())
    }

    pub fn clause_count(&self, keyword: &str) -> usize {
        self.items.iter().filter(|i| i.head_is(keyword)).count()
    }

    fn clause_index(&self, keyword: &str) -> Result<usize, PddlError> {
        self.items
            .iter()
            .position(|i| i.head_is(keyword))
            .ok_or_else(|| PddlError::MissingClause(keyword.to_string()))
    }

    pub fn clause(&self, keyword: &str) -> Result<&SExpr, PddlError> {
        Ok(&self.items[self.clause_index(keyword)?])
    }

    /// 结构校验：`:init` 与 `:goal` 各恰好一个
    pub fn validate(&self) -> Result<(), PddlError> {
        for keyword in [":init", ":goal"] {
            match self.clause_count(keyword) {
                1 => {}
                0 => return Err(PddlError::MissingClause(keyword.to_string())),
                found => {
                    return Err(PddlError::ClauseCount {
                        keyword: keyword.to_string(),
                        found,
                    })
                }
            }
        }
        Ok(())
    }

    pub fn init_facts(&self) -> Result<Vec<Fact>, PddlError> {
        let init = self.clause(":init")?;
        Ok(init
            .as_list()
            .map(|items| items.iter().skip(1).map(Fact::from_sexpr).collect())
            .unwrap_or_default())
    }

    /// 整体替换 `:init` 的内容，其余子句不动
    pub fn replace_init(&mut self, facts: &[Fact]) -> Result<(), PddlError> {
        let idx = self.clause_index(":init")?;
        let mut items = vec![SExpr::atom(":init")];
        items.extend(facts.iter().map(Fact::to_sexpr));
        self.items[idx] = SExpr::List(items);
        Ok(())
    }

    /// `:objects` 中声明为指定类型的名字
    pub fn objects_of_type(&self, ty: &str) -> Result<Vec<String>, PddlError> {
        let objects = self.clause(":objects")?;
        Ok(typed_groups(objects)
            .into_iter()
            .filter(|(t, _)| t.eq_ignore_ascii_case(ty))
            .flat_map(|(_, names)| names)
            .collect())
    }

    /// 为尚未声明的名字追加一组 `names - ty`；返回是否有改动
    pub fn declare_objects(&mut self, names: &[String], ty: &str) -> Result<bool, PddlError> {
        let declared: Vec<String> = {
            let objects = self.clause(":objects")?;
            typed_groups(objects)
                .into_iter()
                .flat_map(|(_, names)| names)
                .map(|n| n.to_ascii_lowercase())
                .collect()
        };
        let mut missing: Vec<&String> = names
            .iter()
            .filter(|n| !declared.contains(&n.to_ascii_lowercase()))
            .collect();
        missing.dedup();
        if missing.is_empty() {
            return Ok(false);
        }
        let idx = self.clause_index(":objects")?;
        if let Some(items) = self.items[idx].as_list_mut() {
            items.extend(missing.into_iter().map(|n| SExpr::atom(n.as_str())));
            items.push(SExpr::atom("-"));
            items.push(SExpr::atom(ty));
        }
        Ok(true)
    }

    /// 规范化渲染：`:objects` 按类型分行，`:init` 每条事实一行，其余子句单行
    pub fn render(&self) -> String {
        let mut out = String::from("(define");
        for (i, item) in self.items.iter().enumerate().skip(1) {
            if i == 1 && item.head_is("problem") {
                out.push(' ');
                out.push_str(&item.render_inline());
            } else if item.head_is(":objects") {
                out.push_str("\n  (:objects");
                for (ty, names) in typed_groups(item) {
                    for (n, chunk) in names.chunks(OBJECTS_PER_LINE).enumerate() {
                        out.push_str("\n    ");
                        out.push_str(&chunk.join(" "));
                        if (n + 1) * OBJECTS_PER_LINE >= names.len() {
                            out.push_str(" - ");
                            out.push_str(&ty);
                        }
                    }
                }
                out.push_str("\n  )");
            } else if item.head_is(":init") {
                out.push_str("\n  (:init");
                for fact in item.as_list().unwrap_or_default().iter().skip(1) {
                    out.push_str("\n    ");
                    out.push_str(&fact.render_inline());
                }
                out.push_str("\n  )");
            } else {
                out.push_str("\n  ");
                out.push_str(&item.render_inline());
            }
        }
        out.push_str("\n)\n");
        out
    }
}

/// 把 `a b - t1 c - t2 d` 切成 [(t1,[a,b]), (t2,[c]), (object,[d])]
fn typed_groups(objects: &SExpr) -> Vec<(String, Vec<String>)> {
    let mut groups = Vec::new();
    let mut pending = Vec::new();
    let mut atoms = objects
        .as_list()
        .unwrap_or_default()
        .iter()
        .skip(1)
        .filter_map(SExpr::as_atom);
    while let Some(atom) = atoms.next() {
        if atom == "-" {
            let ty = atoms.next().unwrap_or("object").to_string();
            groups.push((ty, std::mem::take(&mut pending)));
        } else {
            pending.push(atom.to_string());
        }
    }
    if !pending.is_empty() {
        groups.push(("object".to_string(), pending));
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Coord;

    const SAMPLE: &str = "(define (problem p) (:domain d)
        (:objects loc_1_1 loc_2_1 - location victory - store milk - item)
        (:init (at_agent agent loc_1_1) (clear loc_2_1))
        (:goal (and (have agent milk))))";

    #[test]
    fn test_parse_and_locate_clauses() {
        let doc = ProblemDocument::parse(SAMPLE).unwrap();
        assert_eq!(doc.problem_name(), Some("p"));
        assert!(doc.validate().is_ok());
        assert_eq!(doc.init_facts().unwrap().len(), 2);
        assert_eq!(doc.objects_of_type("store").unwrap(), vec!["victory".to_string()]);
    }

    #[test]
    fn test_render_is_canonical() {
        let doc = ProblemDocument::parse(SAMPLE).unwrap();
        let once = doc.render();
        let twice = ProblemDocument::parse(&once).unwrap().render();
        assert_eq!(once, twice);
        assert!(once.contains("\n    loc_1_1 loc_2_1 - location"));
        assert!(once.contains("\n    (clear loc_2_1)"));
    }

    #[test]
    fn test_validate_requires_single_goal() {
        let doc = ProblemDocument::parse("(define (problem p) (:init))").unwrap();
        assert_eq!(doc.validate(), Err(PddlError::MissingClause(":goal".into())));

        let doc = ProblemDocument::parse("(define (problem p) (:init) (:goal (a)) (:goal (b)))").unwrap();
        assert!(matches!(doc.validate(), Err(PddlError::ClauseCount { found: 2, .. })));
    }

    #[test]
    fn test_declare_objects_only_adds_missing() {
        let mut doc = ProblemDocument::parse(SAMPLE).unwrap();
        let names = vec!["victory".to_string(), "rami_levy".to_string()];
        assert!(doc.declare_objects(&names, "store").unwrap());
        assert!(!doc.declare_objects(&names, "store").unwrap());
        let stores = doc.objects_of_type("store").unwrap();
        assert_eq!(stores, vec!["victory".to_string(), "rami_levy".to_string()]);
    }

    #[test]
    fn test_replace_init_keeps_goal() {
        let mut doc = ProblemDocument::parse(SAMPLE).unwrap();
        doc.replace_init(&[Fact::AtAgent(Coord::new(2, 1))]).unwrap();
        let text = doc.render();
        assert!(text.contains("(at_agent agent loc_2_1)"));
        assert!(text.contains("(:goal (and (have agent milk)))"));
        assert!(!text.contains("(clear loc_2_1)"));
    }
}
