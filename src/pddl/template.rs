//! 固定领域定义与问题模板

use crate::pddl::{Fact, ProblemDocument, SExpr, AGENT_OBJECT};
use crate::world::Coord;

pub const DOMAIN_NAME: &str = "supermarket-navigation";

/// 领域：drive 需要相邻且目标可通行；buy 需要智能体与售卖该商品的商店同格
pub const DOMAIN_PDDL: &str = "(define (domain supermarket-navigation)
  (:requirements :typing)
  (:types location agent store item)
  (:constants agent - agent)
  (:predicates
    (at_agent ?agent - agent ?loc - location)
    (at_store ?store - store ?loc - location)
    (connected ?l1 ?l2 - location)
    (selling ?store - store ?item - item)
    (have ?agent - agent ?item - item)
    (blocked ?loc - location)
    (clear ?loc - location)
  )
  (:action drive
    :parameters (?from ?to - location)
    :precondition (and (at_agent agent ?from) (connected ?from ?to) (clear ?to))
    :effect (and (not (at_agent agent ?from)) (at_agent agent ?to))
  )
  (:action buy
    :parameters (?item - item ?store - store ?loc - location)
    :precondition (and (at_agent agent ?loc) (at_store ?store ?loc) (selling ?store ?item))
    :effect (and (have agent ?item))
  )
)
";

/// 新问题文档的参数
#[derive(Debug, Clone)]
pub struct ProblemTemplate {
    pub problem_name: String,
    pub width: i32,
    pub height: i32,
    pub start: Coord,
    pub item: String,
    /// 预先声明的商店名
    pub stores: Vec<String>,
}

impl ProblemTemplate {
    pub fn new(problem_name: impl Into<String>, width: i32, height: i32, start: Coord) -> Self {
        Self {
            problem_name: problem_name.into(),
            width,
            height,
            start,
            item: "milk".to_string(),
            stores: Vec::new(),
        }
    }

    pub fn with_item(mut self, item: impl Into<String>) -> Self {
        self.item = item.into();
        self
    }

    pub fn with_stores(mut self, stores: Vec<String>) -> Self {
        self.stores = stores;
        self
    }

    pub fn goal(&self) -> SExpr {
        SExpr::list(vec![
            SExpr::atom(":goal"),
            SExpr::list(vec![
                SExpr::atom("and"),
                SExpr::from_atoms(&["have", AGENT_OBJECT, self.item.as_str()]),
            ]),
        ])
    }

    pub fn to_document(&self) -> ProblemDocument {
        let mut objects = vec![SExpr::atom(":objects")];
        for y in 0..self.height {
            for x in 0..self.width {
                objects.push(SExpr::atom(Coord::new(x, y).location_name()));
            }
        }
        objects.push(SExpr::atom("-"));
        objects.push(SExpr::atom("location"));
        if !self.stores.is_empty() {
            objects.extend(self.stores.iter().map(|s| SExpr::atom(s.as_str())));
            objects.push(SExpr::atom("-"));
            objects.push(SExpr::atom("store"));
        }
        objects.extend([SExpr::atom(self.item.as_str()), SExpr::atom("-"), SExpr::atom("item")]);

        let init = SExpr::list(vec![SExpr::atom(":init"), Fact::AtAgent(self.start).to_sexpr()]);
        ProblemDocument::new(
            &self.problem_name,
            DOMAIN_NAME,
            vec![SExpr::List(objects), init, self.goal()],
        )
    }

    pub fn render(&self) -> String {
        self.to_document().render()
    }
}
