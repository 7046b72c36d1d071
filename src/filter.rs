//! Structured filter conditions.
//!
//! A [`Condition`] renders to a WHERE fragment with positional `?N`
//! placeholders, so values never end up inside the SQL text. The textual
//! form accepted by [`Condition::from_str`] is what the CLI's `--where`
//! flag takes, e.g. `age > 26 AND name = 'Ana'`.

use crate::error::{Result, StoreError};
use crate::models::{Row, Value};
use std::fmt;
use std::iter::Peekable;
use std::str::{CharIndices, FromStr};

/// Comparison operator between a column and a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
}

impl CompareOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Like => "LIKE",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_sql())
    }
}

/// A filter expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Compare {
        column: String,
        op: CompareOp,
        value: Value,
    },
    IsNull {
        column: String,
        negated: bool,
    },
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    pub fn compare(column: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Condition::Compare {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Eq, value)
    }

    pub fn ne(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Ne, value)
    }

    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Lt, value)
    }

    pub fn le(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Le, value)
    }

    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Gt, value)
    }

    pub fn ge(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Ge, value)
    }

    pub fn like(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::compare(column, CompareOp::Like, Value::Text(pattern.into()))
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Condition::IsNull {
            column: column.into(),
            negated: false,
        }
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Condition::IsNull {
            column: column.into(),
            negated: true,
        }
    }

    pub fn and(self, other: Condition) -> Self {
        match self {
            Condition::And(mut children) => {
                children.push(other);
                Condition::And(children)
            }
            first => Condition::And(vec![first, other]),
        }
    }

    pub fn or(self, other: Condition) -> Self {
        match self {
            Condition::Or(mut children) => {
                children.push(other);
                Condition::Or(children)
            }
            first => Condition::Or(vec![first, other]),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Condition::Not(Box::new(self))
    }

    /// True when the condition holds for every row: a conjunction whose
    /// children are all empty, or a disjunction with an empty child.
    ///
    /// An empty `Or` matches nothing and a `Not` always constrains, so
    /// neither counts as empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Condition::Compare { .. } | Condition::IsNull { .. } | Condition::Not(_) => false,
            Condition::And(children) => children.iter().all(Condition::is_empty),
            Condition::Or(children) => children.iter().any(Condition::is_empty),
        }
    }

    /// Every column the condition references, in order of appearance
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Condition::Compare { column, .. } | Condition::IsNull { column, .. } => {
                out.push(column.as_str())
            }
            Condition::And(children) | Condition::Or(children) => {
                for child in children {
                    child.collect_columns(out);
                }
            }
            Condition::Not(inner) => inner.collect_columns(out),
        }
    }

    /// Renders the condition as SQL, appending bound values to `params`.
    /// Placeholders are numbered from `params.len() + 1`.
    pub fn to_sql(&self, params: &mut Vec<Value>) -> String {
        match self {
            Condition::Compare { column, op, value } => {
                params.push(value.clone());
                format!("{} {} ?{}", quote_ident(column), op.as_sql(), params.len())
            }
            Condition::IsNull { column, negated } => {
                let not = if *negated { " NOT" } else { "" };
                format!("{} IS{not} NULL", quote_ident(column))
            }
            Condition::And(children) => join_children(children, " AND ", "1", params),
            Condition::Or(_) if self.is_empty() => "1".to_string(),
            Condition::Or(children) => join_children(children, " OR ", "0", params),
            Condition::Not(inner) => format!("NOT ({})", inner.to_sql(params)),
        }
    }
}

fn join_children(
    children: &[Condition],
    separator: &str,
    identity: &str,
    params: &mut Vec<Value>,
) -> String {
    // Empty children are always true: dropped from a conjunction, and a
    // disjunction holding one never gets here.
    let parts = children
        .iter()
        .filter(|c| !c.is_empty())
        .map(|c| c.to_sql(params))
        .collect::<Vec<_>>();
    match parts.len() {
        0 => identity.to_string(),
        1 => parts.into_iter().next().unwrap_or_default(),
        _ => format!("({})", parts.join(separator)),
    }
}

/// Double-quotes an identifier, doubling any embedded quotes
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

impl FromStr for Condition {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        let tokens = tokenize(s)?;
        if tokens.is_empty() {
            return Err(StoreError::InvalidFilter("empty condition".to_string()));
        }
        let mut parser = Parser { tokens, pos: 0 };
        let condition = parser.parse_or()?;
        match parser.peek() {
            None => Ok(condition),
            Some(token) => Err(StoreError::InvalidFilter(format!(
                "unexpected `{token}` in `{s}`"
            ))),
        }
    }
}

// ==================== Literals ====================

/// Parses a single literal. `NULL`, integers, reals and single-quoted text
/// are recognized; anything else is taken as bare text.
pub fn parse_literal(text: &str) -> Value {
    let t = text.trim();
    if t.eq_ignore_ascii_case("null") {
        return Value::Null;
    }
    if let Some(value) = parse_number(t) {
        return value;
    }
    if t.len() >= 2 && t.starts_with('\'') && t.ends_with('\'') {
        return Value::Text(t[1..t.len() - 1].replace("''", "'"));
    }
    Value::Text(t.to_string())
}

/// Parses a comma-separated list of literals into a row. Commas inside
/// single quotes do not split.
pub fn parse_row(text: &str) -> Row {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in text.chars() {
        match c {
            '\'' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);

    fields.iter().map(|f| parse_literal(f)).collect()
}

fn parse_number(t: &str) -> Option<Value> {
    let digits = t.strip_prefix('-').unwrap_or(t);
    let leading = digits.strip_prefix('.').unwrap_or(digits);
    if !leading.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    if let Ok(n) = t.parse::<i64>() {
        return Some(Value::Integer(n));
    }
    let numeric = digits
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if numeric {
        t.parse::<f64>().ok().map(Value::Real)
    } else {
        None
    }
}

// ==================== Lexer ====================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    /// A `"..."` identifier; never matched as a keyword
    QuotedIdent(String),
    Literal(Value),
    Op(CompareOp),
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(name) => write!(f, "{name}"),
            Token::QuotedIdent(name) => write!(f, "{}", quote_ident(name)),
            Token::Literal(value) => write!(f, "{value}"),
            Token::Op(op) => write!(f, "{op}"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '=' | '!' | '<' | '>' => tokens.push(Token::Op(lex_op(&mut chars)?)),
            '\'' => tokens.push(Token::Literal(Value::Text(lex_quoted(&mut chars, '\'')?))),
            '"' => tokens.push(Token::QuotedIdent(lex_quoted(&mut chars, '"')?)),
            c if c.is_ascii_digit() || c == '-' || c == '.' => {
                let end = scan_while(&mut chars, |c| {
                    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+')
                });
                let text = &input[start..end];
                let value = parse_number(text).ok_or_else(|| {
                    StoreError::InvalidFilter(format!("invalid number `{text}`"))
                })?;
                tokens.push(Token::Literal(value));
            }
            c if c.is_alphabetic() || c == '_' => {
                let end = scan_while(&mut chars, |c| c.is_alphanumeric() || c == '_');
                tokens.push(Token::Ident(input[start..end].to_string()));
            }
            other => {
                return Err(StoreError::InvalidFilter(format!(
                    "unexpected character `{other}`"
                )));
            }
        }
    }

    Ok(tokens)
}

fn scan_while(chars: &mut Peekable<CharIndices<'_>>, pred: impl Fn(char) -> bool) -> usize {
    let mut end = 0;
    while let Some(&(i, c)) = chars.peek() {
        if !pred(c) {
            return i;
        }
        end = i + c.len_utf8();
        chars.next();
    }
    end
}

fn lex_op(chars: &mut Peekable<CharIndices<'_>>) -> Result<CompareOp> {
    let Some((_, first)) = chars.next() else {
        return Err(StoreError::InvalidFilter("expected operator".to_string()));
    };
    let second = chars.peek().map(|&(_, c)| c);
    let (op, consume_second) = match (first, second) {
        ('=', Some('=')) => (CompareOp::Eq, true),
        ('=', _) => (CompareOp::Eq, false),
        ('!', Some('=')) => (CompareOp::Ne, true),
        ('<', Some('>')) => (CompareOp::Ne, true),
        ('<', Some('=')) => (CompareOp::Le, true),
        ('<', _) => (CompareOp::Lt, false),
        ('>', Some('=')) => (CompareOp::Ge, true),
        ('>', _) => (CompareOp::Gt, false),
        _ => {
            return Err(StoreError::InvalidFilter(format!(
                "unexpected character `{first}`"
            )));
        }
    };
    if consume_second {
        chars.next();
    }
    Ok(op)
}

/// Reads a `quote`-delimited string; a doubled quote stands for one
fn lex_quoted(chars: &mut Peekable<CharIndices<'_>>, quote: char) -> Result<String> {
    chars.next();
    let mut out = String::new();
    while let Some((_, c)) = chars.next() {
        if c == quote {
            if chars.peek().map(|&(_, n)| n) == Some(quote) {
                chars.next();
                out.push(quote);
            } else {
                return Ok(out);
            }
        } else {
            out.push(c);
        }
    }
    Err(StoreError::InvalidFilter(format!(
        "unterminated {quote}-quoted string"
    )))
}

// ==================== Parser ====================

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        match self.peek() {
            Some(Token::Ident(word)) if word.eq_ignore_ascii_case(keyword) => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn parse_or(&mut self) -> Result<Condition> {
        let mut condition = self.parse_and()?;
        while self.eat_keyword("OR") {
            condition = condition.or(self.parse_and()?);
        }
        Ok(condition)
    }

    fn parse_and(&mut self) -> Result<Condition> {
        let mut condition = self.parse_unary()?;
        while self.eat_keyword("AND") {
            condition = condition.and(self.parse_unary()?);
        }
        Ok(condition)
    }

    fn parse_unary(&mut self) -> Result<Condition> {
        if self.eat_keyword("NOT") {
            return Ok(self.parse_unary()?.not());
        }
        if self.peek() == Some(&Token::LParen) {
            self.pos += 1;
            let inner = self.parse_or()?;
            return match self.next() {
                Some(Token::RParen) => Ok(inner),
                _ => Err(StoreError::InvalidFilter("missing `)`".to_string())),
            };
        }
        self.parse_predicate()
    }

    fn parse_predicate(&mut self) -> Result<Condition> {
        let column = match self.next() {
            Some(Token::Ident(name) | Token::QuotedIdent(name)) => name,
            Some(other) => {
                return Err(StoreError::InvalidFilter(format!(
                    "expected column name, found `{other}`"
                )));
            }
            None => {
                return Err(StoreError::InvalidFilter(
                    "expected column name, found end of input".to_string(),
                ));
            }
        };

        if self.eat_keyword("IS") {
            let negated = self.eat_keyword("NOT");
            if !self.eat_keyword("NULL") {
                return Err(StoreError::InvalidFilter(format!(
                    "expected NULL after `{column} IS`"
                )));
            }
            return Ok(Condition::IsNull { column, negated });
        }

        let op = if self.eat_keyword("LIKE") {
            CompareOp::Like
        } else {
            match self.next() {
                Some(Token::Op(op)) => op,
                _ => {
                    return Err(StoreError::InvalidFilter(format!(
                        "expected operator after `{column}`"
                    )));
                }
            }
        };

        let value = match self.next() {
            Some(Token::Literal(value)) => value,
            Some(Token::Ident(word)) if word.eq_ignore_ascii_case("NULL") => Value::Null,
            _ => {
                return Err(StoreError::InvalidFilter(format!(
                    "expected a value after `{column} {op}`"
                )));
            }
        };

        Ok(Condition::Compare { column, op, value })
    }
}
