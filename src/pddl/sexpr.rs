//! S 表达式：括号深度解析器与规范化渲染
//!
//! 解析结果是可编辑的树，编辑后整体重新渲染；不依赖正则定位子句。

use std::fmt;

use crate::pddl::PddlError;

/// 原子或列表
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SExpr {
    Atom(String),
    List(Vec<SExpr>),
}

impl SExpr {
    pub fn atom(s: impl Into<String>) -> Self {
        SExpr::Atom(s.into())
    }

    pub fn list(items: Vec<SExpr>) -> Self {
        SExpr::List(items)
    }

    /// 由原子序列构造列表，如 `["clear", "loc_1_1"]` -> `(clear loc_1_1)`
    pub fn from_atoms<S: AsRef<str>>(atoms: &[S]) -> Self {
        SExpr::List(atoms.iter().map(|a| SExpr::atom(a.as_ref())).collect())
    }

    pub fn as_atom(&self) -> Option<&str> {
        match self {
            SExpr::Atom(a) => Some(a),
            SExpr::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[SExpr]> {
        match self {
            SExpr::List(items) => Some(items),
            SExpr::Atom(_) => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<SExpr>> {
        match self {
            SExpr::List(items) => Some(items),
            SExpr::Atom(_) => None,
        }
    }

    /// 列表首个原子（小写比较用）
    pub fn head(&self) -> Option<&str> {
        self.as_list()?.first()?.as_atom()
    }

    pub fn head_is(&self, keyword: &str) -> bool {
        self.head().is_some_and(|h| h.eq_ignore_ascii_case(keyword))
    }

    /// 单行渲染：`(a b (c d))`
    pub fn render_inline(&self) -> String {
        let mut out = String::new();
        self.write_inline(&mut out);
        out
    }

    fn write_inline(&self, out: &mut String) {
        match self {
            SExpr::Atom(a) => out.push_str(a),
            SExpr::List(items) => {
                out.push('(');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    item.write_inline(out);
                }
                out.push(')');
            }
        }
    }
}

impl fmt::Display for SExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_inline())
    }
}

/// 解析整段文本为若干顶层表达式；`;` 起到行尾为注释
pub fn parse(text: &str) -> Result<Vec<SExpr>, PddlError> {
    let mut stack: Vec<Vec<SExpr>> = Vec::new();
    let mut top: Vec<SExpr> = Vec::new();
    let mut atom = String::new();
    let mut in_comment = false;

    fn flush(atom: &mut String, stack: &mut [Vec<SExpr>], top: &mut Vec<SExpr>) {
        if atom.is_empty() {
            return;
        }
        let a = SExpr::Atom(std::mem::take(atom));
        match stack.last_mut() {
            Some(frame) => frame.push(a),
            None => top.push(a),
        }
    }

    for (offset, ch) in text.char_indices() {
        if in_comment {
            if ch == '\n' {
                in_comment = false;
            }
            continue;
        }
        match ch {
            ';' => {
                flush(&mut atom, &mut stack, &mut top);
                in_comment = true;
            }
            '(' => {
                flush(&mut atom, &mut stack, &mut top);
                stack.push(Vec::new());
            }
            ')' => {
                flush(&mut atom, &mut stack, &mut top);
                let done = stack.pop().ok_or(PddlError::UnexpectedClose(offset))?;
                let list = SExpr::List(done);
                match stack.last_mut() {
                    Some(frame) => frame.push(list),
                    None => top.push(list),
                }
            }
            c if c.is_whitespace() => flush(&mut atom, &mut stack, &mut top),
            c => atom.push(c),
        }
    }
    flush(&mut atom, &mut stack, &mut top);

    if !stack.is_empty() {
        return Err(PddlError::Unclosed(stack.len()));
    }
    if top.is_empty() {
        return Err(PddlError::Empty);
    }
    Ok(top)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_with_comments() {
        let exprs = parse("; header\n(define (problem p) ; trailing\n  (:goal (and (have agent milk))))").unwrap();
        assert_eq!(exprs.len(), 1);
        let define = &exprs[0];
        assert!(define.head_is("define"));
        assert_eq!(
            define.render_inline(),
            "(define (problem p) (:goal (and (have agent milk))))"
        );
    }

    #[test]
    fn test_parse_rejects_unclosed() {
        assert_eq!(parse("(define (problem p)"), Err(PddlError::Unclosed(1)));
    }

    #[test]
    fn test_parse_rejects_stray_close() {
        assert!(matches!(parse("(a))"), Err(PddlError::UnexpectedClose(3))));
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(parse("  ; only a comment\n"), Err(PddlError::Empty));
    }
}
