// src/expression.rs
use crate::parser::{ParseError, Parser};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Var(String),
    /// `"a ${x} b"`: one more string fragment than placeholder.
    Interpolated { strings: Vec<String>, values: Vec<Expr> },
    List(Vec<Expr>),
    Map(Vec<(String, Expr)>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Ternary { cond: Box<Expr>, then: Box<Expr>, otherwise: Box<Expr> },
    Elvis(Box<Expr>, Box<Expr>),
    Property { target: Box<Expr>, name: String, null_safe: bool },
    Index { target: Box<Expr>, index: Box<Expr> },
    Method { target: Box<Expr>, name: String, args: Vec<Expr>, null_safe: bool },
    Call { name: String, args: Vec<Expr> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Def(String, Option<Expr>),
    Assign(String, Expr),
    Return(Option<Expr>),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Script {
    pub statements: Vec<Stmt>,
}

type PResult<T> = Result<T, ParseError>;

/// Parses a whole script. `max_depth` bounds how deeply expressions may
/// nest; every bracket, unary operator, chained binary operator and
/// postfix step counts as one level.
pub fn parse_script(input: &str, max_depth: usize) -> PResult<Script> {
    let mut p = EParser::new(input, max_depth);
    let mut statements = Vec::new();
    loop {
        p.parser.skip_ws();
        while p.parser.consume_char(';') {
            p.parser.skip_ws();
        }
        if p.parser.eof() {
            break;
        }
        statements.push(p.parse_statement()?);
        p.parser.skip_inline_ws();
        if p.parser.eof() {
            break;
        }
        if !(p.parser.consume_char(';') || p.parser.consume_char('\n')) {
            return Err(p.parser.error("unexpected input after statement"));
        }
    }
    Ok(Script { statements })
}

const OR_OPS: &[(&str, BinaryOp)] = &[("||", BinaryOp::Or)];
const AND_OPS: &[(&str, BinaryOp)] = &[("&&", BinaryOp::And)];
const EQUALITY_OPS: &[(&str, BinaryOp)] = &[("==", BinaryOp::Eq), ("!=", BinaryOp::Ne)];
const RELATIONAL_OPS: &[(&str, BinaryOp)] = &[
    ("<=", BinaryOp::Lte),
    (">=", BinaryOp::Gte),
    ("<", BinaryOp::Lt),
    (">", BinaryOp::Gt),
];
const ADDITIVE_OPS: &[(&str, BinaryOp)] = &[("+", BinaryOp::Add), ("-", BinaryOp::Sub)];
const MULTIPLICATIVE_OPS: &[(&str, BinaryOp)] = &[
    ("*", BinaryOp::Mul),
    ("/", BinaryOp::Div),
    ("%", BinaryOp::Mod),
];

struct EParser<'a> {
    parser: Parser<'a>,
    depth: usize,
    max_depth: usize,
}

impl<'a> EParser<'a> {
    fn new(s: &'a str, max_depth: usize) -> Self {
        Self {
            parser: Parser::new(s),
            depth: 0,
            max_depth,
        }
    }

    fn descend(&mut self) -> PResult<()> {
        if self.depth >= self.max_depth {
            return Err(self.parser.error("nesting too deep"));
        }
        self.depth += 1;
        Ok(())
    }

    fn ascend(&mut self, levels: usize) {
        self.depth = self.depth.saturating_sub(levels);
    }

    fn parse_statement(&mut self) -> PResult<Stmt> {
        if self.parser.consume_keyword("def") {
            self.parser.skip_inline_ws();
            let name = self.parser.parse_identifier()?;
            self.parser.skip_inline_ws();
            if self.parser.peek_char() == Some('=') && self.parser.peek_second() != Some('=') {
                self.parser.expect('=')?;
                self.parser.skip_ws();
                return Ok(Stmt::Def(name, Some(self.parse_expr()?)));
            }
            return Ok(Stmt::Def(name, None));
        }
        if self.parser.consume_keyword("return") {
            self.parser.skip_inline_ws();
            if self.parser.eof() || matches!(self.parser.peek_char(), Some(';' | '\n')) {
                return Ok(Stmt::Return(None));
            }
            return Ok(Stmt::Return(Some(self.parse_expr()?)));
        }

        let mark = self.parser.mark();
        if self.parser.peek_char().is_some_and(Parser::is_ident_start) {
            let name = self.parser.parse_identifier()?;
            self.parser.skip_inline_ws();
            if self.parser.peek_char() == Some('=') && self.parser.peek_second() != Some('=') {
                self.parser.expect('=')?;
                self.parser.skip_ws();
                return Ok(Stmt::Assign(name, self.parse_expr()?));
            }
            self.parser.reset(mark);
        }
        Ok(Stmt::Expr(self.parse_expr()?))
    }

    fn parse_expr(&mut self) -> PResult<Expr> {
        self.descend()?;
        let expr = self.parse_conditional();
        self.ascend(1);
        expr
    }

    fn parse_conditional(&mut self) -> PResult<Expr> {
        let cond = self.parse_or()?;
        self.parser.skip_inline_ws();
        if self.parser.consume_str("?:") {
            self.parser.skip_ws();
            let fallback = self.parse_expr()?;
            return Ok(Expr::Elvis(Box::new(cond), Box::new(fallback)));
        }
        if self.parser.peek_char() == Some('?') && self.parser.peek_second() != Some('.') {
            self.parser.expect('?')?;
            self.parser.skip_ws();
            let then = self.parse_expr()?;
            self.parser.skip_ws();
            self.parser.expect(':')?;
            self.parser.skip_ws();
            let otherwise = self.parse_expr()?;
            return Ok(Expr::Ternary {
                cond: Box::new(cond),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            });
        }
        Ok(cond)
    }

    fn binary_chain(
        &mut self,
        ops: &[(&str, BinaryOp)],
        next: fn(&mut Self) -> PResult<Expr>,
    ) -> PResult<Expr> {
        let mut left = next(self)?;
        let mut levels = 0;
        'chain: loop {
            self.parser.skip_inline_ws();
            for (lit, op) in ops {
                if self.parser.consume_str(lit) {
                    self.descend()?;
                    levels += 1;
                    self.parser.skip_ws();
                    let right = next(self)?;
                    left = Expr::Binary(*op, Box::new(left), Box::new(right));
                    continue 'chain;
                }
            }
            break;
        }
        self.ascend(levels);
        Ok(left)
    }

    fn parse_or(&mut self) -> PResult<Expr> {
        self.binary_chain(OR_OPS, Self::parse_and)
    }

    fn parse_and(&mut self) -> PResult<Expr> {
        self.binary_chain(AND_OPS, Self::parse_equality)
    }

    fn parse_equality(&mut self) -> PResult<Expr> {
        self.binary_chain(EQUALITY_OPS, Self::parse_relational)
    }

    fn parse_relational(&mut self) -> PResult<Expr> {
        self.binary_chain(RELATIONAL_OPS, Self::parse_additive)
    }

    fn parse_additive(&mut self) -> PResult<Expr> {
        self.binary_chain(ADDITIVE_OPS, Self::parse_multiplicative)
    }

    fn parse_multiplicative(&mut self) -> PResult<Expr> {
        self.binary_chain(MULTIPLICATIVE_OPS, Self::parse_unary)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        self.parser.skip_inline_ws();
        let op = if self.parser.consume_char('!') {
            UnaryOp::Not
        } else if self.parser.consume_char('-') {
            UnaryOp::Neg
        } else {
            return self.parse_postfix();
        };
        self.descend()?;
        let inner = self.parse_unary()?;
        self.ascend(1);
        Ok(Expr::Unary(op, Box::new(inner)))
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_primary()?;
        let mut levels = 0;
        loop {
            self.parser.skip_inline_ws();
            if matches!(self.parser.peek_char(), Some('.' | '['))
                || self.parser.peek_str("?.")
            {
                self.descend()?;
                levels += 1;
            }
            let null_safe = if self.parser.consume_str("?.") {
                true
            } else if self.parser.consume_char('.') {
                false
            } else if self.parser.consume_char('[') {
                self.parser.open();
                self.parser.skip_ws();
                let index = self.parse_expr()?;
                self.parser.skip_ws();
                self.parser.expect(']')?;
                self.parser.close();
                expr = Expr::Index {
                    target: Box::new(expr),
                    index: Box::new(index),
                };
                continue;
            } else {
                break;
            };
            let name = self.parser.parse_identifier()?;
            expr = if self.parser.peek_char() == Some('(') {
                Expr::Method {
                    target: Box::new(expr),
                    name,
                    args: self.parse_args()?,
                    null_safe,
                }
            } else {
                Expr::Property {
                    target: Box::new(expr),
                    name,
                    null_safe,
                }
            };
        }
        self.ascend(levels);
        Ok(expr)
    }

    fn parse_args(&mut self) -> PResult<Vec<Expr>> {
        self.parser.expect('(')?;
        self.parser.open();
        self.parser.skip_ws();
        let mut out = Vec::new();
        if !self.parser.consume_char(')') {
            loop {
                out.push(self.parse_expr()?);
                self.parser.skip_ws();
                if self.parser.consume_char(',') {
                    self.parser.skip_ws();
                    continue;
                }
                self.parser.expect(')')?;
                break;
            }
        }
        self.parser.close();
        Ok(out)
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        self.parser.skip_inline_ws();
        match self.parser.peek_char() {
            None => Err(self.parser.error("unexpected end of script")),
            Some('(') => {
                self.parser.expect('(')?;
                self.parser.open();
                self.parser.skip_ws();
                let inner = self.parse_expr()?;
                self.parser.skip_ws();
                self.parser.expect(')')?;
                self.parser.close();
                Ok(inner)
            }
            Some('[') => self.parse_collection(),
            Some('\'') => Ok(Expr::Literal(Value::String(
                self.parser.parse_quoted_string()?,
            ))),
            Some('"') => self.parse_gstring(),
            Some(c) if c.is_ascii_digit() => Ok(Expr::Literal(self.parser.parse_number_literal()?)),
            Some(c) if Parser::is_ident_start(c) => {
                if self.parser.consume_keyword("true") {
                    return Ok(Expr::Literal(Value::Bool(true)));
                }
                if self.parser.consume_keyword("false") {
                    return Ok(Expr::Literal(Value::Bool(false)));
                }
                if self.parser.consume_keyword("null") {
                    return Ok(Expr::Literal(Value::Null));
                }
                let name = self.parser.parse_identifier()?;
                if self.parser.peek_char() == Some('(') {
                    let args = self.parse_args()?;
                    return Ok(Expr::Call { name, args });
                }
                Ok(Expr::Var(name))
            }
            Some(c) => Err(self.parser.error(format!("unexpected character '{c}'"))),
        }
    }

    /// `[a, b]`, `[]`, `[k: v]` or `[:]`.
    fn parse_collection(&mut self) -> PResult<Expr> {
        self.parser.expect('[')?;
        self.parser.open();
        self.parser.skip_ws();
        if self.parser.consume_char(':') {
            self.parser.skip_ws();
            self.parser.expect(']')?;
            self.parser.close();
            return Ok(Expr::Map(Vec::new()));
        }

        let node = if self.parser.consume_char(']') {
            Expr::List(Vec::new())
        } else if let Some(first_key) = self.try_map_key() {
            let mut entries = Vec::new();
            let mut key = first_key;
            loop {
                self.parser.skip_ws();
                entries.push((key, self.parse_expr()?));
                self.parser.skip_ws();
                if !self.parser.consume_char(',') {
                    break;
                }
                self.parser.skip_ws();
                if self.parser.peek_char() == Some(']') {
                    break;
                }
                key = self
                    .try_map_key()
                    .ok_or_else(|| self.parser.error("map key expected"))?;
            }
            self.parser.expect(']')?;
            Expr::Map(entries)
        } else {
            let mut items = Vec::new();
            loop {
                items.push(self.parse_expr()?);
                self.parser.skip_ws();
                if !self.parser.consume_char(',') {
                    break;
                }
                self.parser.skip_ws();
                if self.parser.peek_char() == Some(']') {
                    break;
                }
            }
            self.parser.expect(']')?;
            Expr::List(items)
        };
        self.parser.close();
        Ok(node)
    }

    /// Reads `key:` at the cursor, or rewinds and returns `None`.
    fn try_map_key(&mut self) -> Option<String> {
        let mark = self.parser.mark();
        let key = match self.parser.peek_char() {
            Some('\'') => self.parser.parse_quoted_string().ok(),
            Some('"') => match self.parse_gstring() {
                Ok(Expr::Literal(Value::String(s))) => Some(s),
                _ => None,
            },
            Some(c) if c.is_ascii_digit() => self
                .parser
                .parse_number_literal()
                .ok()
                .map(|n| n.to_string()),
            Some(c) if Parser::is_ident_start(c) => self.parser.parse_identifier().ok(),
            _ => None,
        };
        if key.is_some() {
            self.parser.skip_ws();
            if self.parser.consume_char(':') {
                return key;
            }
        }
        self.parser.reset(mark);
        None
    }

    /// Double-quoted string. Without placeholders it is an ordinary literal.
    fn parse_gstring(&mut self) -> PResult<Expr> {
        self.parser.expect('"')?;
        let mut strings = vec![String::new()];
        let mut values = Vec::new();
        loop {
            let c = self
                .parser
                .next_char()
                .ok_or_else(|| self.parser.error("unterminated string"))?;
            match c {
                '"' => break,
                '\\' => {
                    let escaped = self.parser.parse_escape()?;
                    push_fragment(&mut strings, escaped);
                }
                '$' if self.parser.peek_char() == Some('{') => {
                    self.parser.expect('{')?;
                    self.parser.open();
                    self.parser.skip_ws();
                    let inner = self.parse_expr()?;
                    self.parser.skip_ws();
                    self.parser.expect('}')?;
                    self.parser.close();
                    values.push(inner);
                    strings.push(String::new());
                }
                '$' if self.parser.peek_char().is_some_and(Parser::is_ident_start) => {
                    let mut inner = Expr::Var(self.parser.parse_identifier()?);
                    let mut levels = 0;
                    // `$user.name` walks properties, `$user.` ends at the dot
                    while self.parser.peek_char() == Some('.')
                        && self.parser.peek_second().is_some_and(Parser::is_ident_start)
                    {
                        self.descend()?;
                        levels += 1;
                        self.parser.expect('.')?;
                        inner = Expr::Property {
                            target: Box::new(inner),
                            name: self.parser.parse_identifier()?,
                            null_safe: false,
                        };
                    }
                    self.ascend(levels);
                    values.push(inner);
                    strings.push(String::new());
                }
                other => push_fragment(&mut strings, other),
            }
        }
        if values.is_empty() {
            return Ok(Expr::Literal(Value::String(strings.remove(0))));
        }
        Ok(Expr::Interpolated { strings, values })
    }
}

fn push_fragment(strings: &mut [String], c: char) {
    if let Some(last) = strings.last_mut() {
        last.push(c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn parse(src: &str) -> PResult<Script> {
        parse_script(src, crate::context::DEFAULT_MAX_DEPTH)
    }

    fn single_expr(src: &str) -> Expr {
        let script = parse(src).unwrap();
        assert_eq!(script.statements.len(), 1, "{src}");
        match script.statements.into_iter().next() {
            Some(Stmt::Expr(e)) => e,
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    fn var(name: &str) -> Box<Expr> {
        Box::new(Expr::Var(name.into()))
    }

    fn lit(v: Value) -> Box<Expr> {
        Box::new(Expr::Literal(v))
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        assert_eq!(
            single_expr("1 + x * 2"),
            Expr::Binary(
                BinaryOp::Add,
                lit(json!(1)),
                Box::new(Expr::Binary(BinaryOp::Mul, var("x"), lit(json!(2)))),
            )
        );
    }

    #[test]
    fn double_quotes_without_placeholders_are_plain() {
        assert_eq!(single_expr(r#""no $ here""#), Expr::Literal(json!("no $ here")));
        assert_eq!(single_expr(r#""cost \$5""#), Expr::Literal(json!("cost $5")));
    }

    #[test]
    fn placeholders_split_fragments() {
        assert_eq!(
            single_expr(r#""a ${x + 1} b $user.name!""#),
            Expr::Interpolated {
                strings: vec!["a ".into(), " b ".into(), "!".into()],
                values: vec![
                    Expr::Binary(BinaryOp::Add, var("x"), lit(json!(1))),
                    Expr::Property { target: var("user"), name: "name".into(), null_safe: false },
                ],
            }
        );
    }

    #[test]
    fn brackets_tell_lists_from_maps() {
        assert_eq!(single_expr("[]"), Expr::List(vec![]));
        assert_eq!(single_expr("[:]"), Expr::Map(vec![]));
        assert_eq!(
            single_expr("[a, 'b']"),
            Expr::List(vec![Expr::Var("a".into()), Expr::Literal(json!("b"))])
        );
        assert_eq!(
            single_expr("[a: 1, 'b c': x,]"),
            Expr::Map(vec![
                ("a".into(), Expr::Literal(json!(1))),
                ("b c".into(), Expr::Var("x".into())),
            ])
        );
    }

    #[test]
    fn statements_split_on_newlines_and_semicolons() {
        let script = parse("def a = 1\nb = a +\n 2; return b").unwrap();
        assert_eq!(
            script.statements,
            vec![
                Stmt::Def("a".into(), Some(Expr::Literal(json!(1)))),
                Stmt::Assign("b".into(), Expr::Binary(BinaryOp::Add, var("a"), lit(json!(2)))),
                Stmt::Return(Some(Expr::Var("b".into()))),
            ]
        );
    }

    #[test]
    fn newline_inside_parentheses_does_not_end_statement() {
        let script = parse("(1 +\n 2)\n").unwrap();
        assert_eq!(script.statements.len(), 1);
    }

    #[test]
    fn null_safe_and_elvis_are_not_ternaries() {
        assert_eq!(
            single_expr("a?.b ?: 'none'"),
            Expr::Elvis(
                Box::new(Expr::Property { target: var("a"), name: "b".into(), null_safe: true }),
                lit(json!("none")),
            )
        );
    }

    #[test]
    fn malformed_scripts_are_rejected() {
        for src in ["1 +", "(1", "'open", "\"${x\"", "x y", "[1, 2", "a.", "#"] {
            assert!(parse(src).is_err(), "{src} should not parse");
        }
    }

    #[test]
    fn empty_script_has_no_statements() {
        assert_eq!(parse("  // nothing\n;;").unwrap(), Script::default());
    }

    #[test]
    fn nesting_beyond_the_limit_is_a_parse_error() {
        let deep = format!("{}1{}", "(".repeat(20_000), ")".repeat(20_000));
        let err = parse(&deep).unwrap_err();
        assert!(matches!(err, ParseError::InvalidSyntax { ref message, .. } if message == "nesting too deep"));

        for deep in [
            "!".repeat(20_000) + "true",
            "-".repeat(20_000) + "1",
            "1".to_string() + &"+1".repeat(20_000),
            "x".to_string() + &".y".repeat(20_000),
            "x".to_string() + &"[0]".repeat(20_000),
            format!("\"${{x{}}}\"", ".y".repeat(20_000)),
            format!("\"$x{}\"", ".y".repeat(20_000)),
            "[".repeat(20_000) + &"]".repeat(20_000),
        ] {
            assert!(parse(&deep).is_err(), "{} should be rejected", &deep[..10]);
        }
    }

    #[test]
    fn depth_is_released_after_each_subexpression() {
        // many siblings at shallow depth are fine
        let wide = format!("[{}]", vec!["(1)"; 2_000].join(", "));
        assert!(parse(&wide).is_ok());
        let statements = "a.b.c + 1\n".repeat(1_000);
        assert_eq!(parse(&statements).unwrap().statements.len(), 1_000);
        assert!(parse_script("((1))", 3).is_ok());
        assert!(parse_script("(((1)))", 3).is_err());
    }
}
