//! A small Jinja-style template engine.
//!
//! Supported syntax:
//! - `{{ expr }}` output, where `expr` may use `or`/`and`/`not`, comparisons
//!   (`== != > < >= <=`), string/number/boolean literals, dotted paths (with `.length` on arrays
//!   and strings) and `| filter` chains
//! - `{% for item in expr %}...{% endfor %}` with a `loop` variable (`index`, `index0`, `first`,
//!   `last`, `length`)
//! - `{% if expr %}...{% elif expr %}...{% else %}...{% endif %}`
//!
//! Block tags strip leading indentation on their line and the newline that follows them, and a
//! `-` next to any delimiter trims all whitespace on that side.
//!
//! Templates are parsed up front so syntax errors surface before anything is rendered. Rendering
//! itself cannot fail: missing values render as empty strings and iterate as empty lists.

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Value, json};

use super::TemplateError;

static DELIMITER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\{\{(.*?)\}\}|\{%(.*?)%\}").unwrap_or_else(|_| unreachable!())
});

#[derive(Debug, Clone)]
enum Segment {
    Text(String),
    Output(String),
    Tag(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Filter {
    Trim,
    RoleTitle,
    Upper,
    Lower,
    Length,
}

impl Filter {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "trim" => Some(Self::Trim),
            "roleTitle" => Some(Self::RoleTitle),
            "upper" => Some(Self::Upper),
            "lower" => Some(Self::Lower),
            "length" => Some(Self::Length),
            _ => None,
        }
    }

    fn apply(self, value: Value) -> Value {
        match self {
            Self::Trim => Value::String(display(&value).trim().to_string()),
            Self::RoleTitle => Value::String(role_title(&display(&value))),
            Self::Upper => Value::String(display(&value).to_uppercase()),
            Self::Lower => Value::String(display(&value).to_lowercase()),
            Self::Length => json!(length_of(&value).unwrap_or(0)),
        }
    }
}

/// Heading label for a message role
pub fn role_title(role: &str) -> String {
    match role {
        "user" => "User".to_string(),
        "assistant" => "Assistant".to_string(),
        "system" => "System".to_string(),
        "tool" => "Tool".to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

#[derive(Debug, Clone)]
enum Expr {
    Literal(Value),
    Path(Vec<String>),
    Filtered(Box<Expr>, Filter),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare(CompareOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone)]
enum Node {
    Text(String),
    Output(Expr),
    For { var: String, iterable: Expr, body: Vec<Node> },
    If { branches: Vec<(Expr, Vec<Node>)>, otherwise: Vec<Node> },
}

/// A parsed template, ready to render against a JSON context
#[derive(Debug, Clone)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    /// # Errors
    ///
    /// Returns a [`TemplateError`] for unknown tags or filters, unbalanced blocks and
    /// malformed expressions.
    pub fn compile(source: &str) -> Result<Self, TemplateError> {
        let segments = split_segments(source);
        let mut parser = BlockParser { segments, pos: 0 };
        let (nodes, _) = parser.parse_block(&[])?;
        Ok(Self { nodes })
    }

    /// Render against `context`, whose top-level keys become template variables
    pub fn render(&self, context: &Value) -> String {
        let mut scope = Scope { root: context, locals: Vec::new() };
        let mut out = String::new();
        render_nodes(&self.nodes, &mut scope, &mut out);
        out
    }
}

fn split_segments(source: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last = 0;

    for caps in DELIMITER_PATTERN.captures_iter(source) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        segments.push(Segment::Text(source[last..whole.start()].to_string()));
        if let Some(inner) = caps.get(1) {
            segments.push(Segment::Output(inner.as_str().to_string()));
        } else if let Some(inner) = caps.get(2) {
            segments.push(Segment::Tag(inner.as_str().to_string()));
        }
        last = whole.end();
    }
    segments.push(Segment::Text(source[last..].to_string()));

    apply_whitespace_control(&mut segments);
    segments
}

/// Texts and delimiters strictly alternate: even indexes are text, odd indexes are delimiters
fn apply_whitespace_control(segments: &mut [Segment]) {
    // Indentation before a block tag is decided on the raw source, before newlines are trimmed.
    let mut lstrip = vec![false; segments.len()];
    for i in (1..segments.len()).step_by(2) {
        if let (Segment::Tag(_), Segment::Text(before)) = (&segments[i], &segments[i - 1]) {
            let tail_start = before.rfind('\n').map_or(0, |index| index + 1);
            let at_line_start = i == 1 || before.contains('\n');
            lstrip[i] = at_line_start && before[tail_start..].chars().all(|c| c == ' ' || c == '\t');
        }
    }

    for i in (1..segments.len()).step_by(2) {
        let (is_block, inner) = match &segments[i] {
            Segment::Tag(inner) => (true, inner.clone()),
            Segment::Output(inner) => (false, inner.clone()),
            Segment::Text(_) => continue,
        };

        if let Segment::Text(before) = &mut segments[i - 1] {
            if inner.starts_with('-') {
                before.truncate(before.trim_end().len());
            } else if lstrip[i] {
                let tail_start = before.rfind('\n').map_or(0, |index| index + 1);
                before.truncate(tail_start);
            }
        }

        if let Some(Segment::Text(after)) = segments.get_mut(i + 1) {
            if inner.ends_with('-') {
                *after = after.trim_start().to_string();
            } else if is_block {
                if let Some(rest) = after.strip_prefix("\r\n").or_else(|| after.strip_prefix('\n')) {
                    *after = rest.to_string();
                }
            }
        }

        let stripped = inner.strip_prefix('-').unwrap_or(&inner);
        let stripped = stripped.strip_suffix('-').unwrap_or(stripped).trim().to_string();
        segments[i] = if is_block { Segment::Tag(stripped) } else { Segment::Output(stripped) };
    }
}

struct BlockParser {
    segments: Vec<Segment>,
    pos: usize,
}

impl BlockParser {
    /// Parse until one of `terminators` (returned with its arguments) or the end of input
    fn parse_block(
        &mut self,
        terminators: &[&str],
    ) -> Result<(Vec<Node>, Option<(String, String)>), TemplateError> {
        let mut nodes = Vec::new();

        while let Some(segment) = self.segments.get(self.pos).cloned() {
            self.pos += 1;
            match segment {
                Segment::Text(text) => {
                    if !text.is_empty() {
                        nodes.push(Node::Text(text));
                    }
                }
                Segment::Output(source) => nodes.push(Node::Output(parse_expression(&source)?)),
                Segment::Tag(source) => {
                    let (keyword, args) = split_tag(&source);
                    if terminators.contains(&keyword) {
                        return Ok((nodes, Some((keyword.to_string(), args.to_string()))));
                    }
                    match keyword {
                        "for" => nodes.push(self.parse_for(args)?),
                        "if" => nodes.push(self.parse_if(args)?),
                        "endfor" | "endif" | "elif" | "else" => {
                            return Err(TemplateError::UnexpectedTag { tag: keyword.to_string() });
                        }
                        _ => return Err(TemplateError::UnknownTag { tag: keyword.to_string() }),
                    }
                }
            }
        }

        Ok((nodes, None))
    }

    fn parse_for(&mut self, args: &str) -> Result<Node, TemplateError> {
        let tokens = lex(args)?;
        let (var, rest) = match tokens.as_slice() {
            [ExprToken::Ident(var), ExprToken::Ident(kw), rest @ ..] if kw == "in" => (var.clone(), rest),
            _ => {
                return Err(TemplateError::InvalidExpression {
                    expr: args.to_string(),
                    reason: "expected `for <name> in <expr>`".to_string(),
                });
            }
        };
        let iterable = ExprParser::new(rest.to_vec(), args).parse_all()?;

        let (body, end) = self.parse_block(&["endfor"])?;
        if end.is_none() {
            return Err(TemplateError::UnclosedTag { tag: "for".to_string() });
        }
        Ok(Node::For { var, iterable, body })
    }

    fn parse_if(&mut self, args: &str) -> Result<Node, TemplateError> {
        let mut branches = Vec::new();
        let mut condition = parse_expression(args)?;

        loop {
            let (body, end) = self.parse_block(&["elif", "else", "endif"])?;
            branches.push((condition, body));
            match end {
                Some((keyword, args)) if keyword == "elif" => condition = parse_expression(&args)?,
                Some((keyword, _)) if keyword == "else" => {
                    let (otherwise, end) = self.parse_block(&["endif"])?;
                    if end.is_none() {
                        return Err(TemplateError::UnclosedTag { tag: "if".to_string() });
                    }
                    return Ok(Node::If { branches, otherwise });
                }
                Some(_) => return Ok(Node::If { branches, otherwise: Vec::new() }),
                None => return Err(TemplateError::UnclosedTag { tag: "if".to_string() }),
            }
        }
    }
}

fn split_tag(source: &str) -> (&str, &str) {
    match source.split_once(char::is_whitespace) {
        Some((keyword, args)) => (keyword, args.trim()),
        None => (source, ""),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ExprToken {
    Ident(String),
    Str(String),
    Num(f64),
    Dot,
    Pipe,
    LParen,
    RParen,
    Op(CompareOp),
}

fn lex(source: &str) -> Result<Vec<ExprToken>, TemplateError> {
    let invalid = |reason: String| TemplateError::InvalidExpression {
        expr: source.to_string(),
        reason,
    };

    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();

    while let Some(&ch) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '.' => {
                chars.next();
                tokens.push(ExprToken::Dot);
            }
            '|' => {
                chars.next();
                tokens.push(ExprToken::Pipe);
            }
            '(' => {
                chars.next();
                tokens.push(ExprToken::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(ExprToken::RParen);
            }
            '\'' | '"' => {
                let quote = ch;
                chars.next();
                let mut value = String::new();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                value.push(match escaped {
                                    'n' => '\n',
                                    't' => '\t',
                                    other => other,
                                });
                            }
                        }
                        c if c == quote => {
                            closed = true;
                            break;
                        }
                        c => value.push(c),
                    }
                }
                if !closed {
                    return Err(invalid("unterminated string literal".to_string()));
                }
                tokens.push(ExprToken::Str(value));
            }
            '=' | '!' | '<' | '>' => {
                chars.next();
                let followed_by_eq = chars.peek() == Some(&'=');
                if followed_by_eq {
                    chars.next();
                }
                let op = match (ch, followed_by_eq) {
                    ('=', true) => CompareOp::Eq,
                    ('!', true) => CompareOp::Ne,
                    ('<', false) => CompareOp::Lt,
                    ('<', true) => CompareOp::Le,
                    ('>', false) => CompareOp::Gt,
                    ('>', true) => CompareOp::Ge,
                    _ => return Err(invalid(format!("unexpected `{}`", ch))),
                };
                tokens.push(ExprToken::Op(op));
            }
            c if c.is_ascii_digit() => {
                let mut number = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || (d == '.' && !number.contains('.')) {
                        number.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = number
                    .parse::<f64>()
                    .map_err(|_| invalid(format!("invalid number `{}`", number)))?;
                tokens.push(ExprToken::Num(value));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_alphanumeric() || d == '_' {
                        ident.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(ExprToken::Ident(ident));
            }
            other => return Err(invalid(format!("unexpected character `{}`", other))),
        }
    }

    Ok(tokens)
}

fn parse_expression(source: &str) -> Result<Expr, TemplateError> {
    ExprParser::new(lex(source)?, source).parse_all()
}

struct ExprParser<'a> {
    tokens: Vec<ExprToken>,
    pos: usize,
    source: &'a str,
}

impl<'a> ExprParser<'a> {
    fn new(tokens: Vec<ExprToken>, source: &'a str) -> Self {
        Self { tokens, pos: 0, source }
    }

    fn error(&self, reason: impl Into<String>) -> TemplateError {
        TemplateError::InvalidExpression { expr: self.source.to_string(), reason: reason.into() }
    }

    fn peek(&self) -> Option<&ExprToken> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<ExprToken> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(ExprToken::Ident(ident)) if ident == keyword)
    }

    fn parse_all(mut self) -> Result<Expr, TemplateError> {
        if self.tokens.is_empty() {
            return Err(self.error("empty expression"));
        }
        let expr = self.parse_or()?;
        match self.peek() {
            None => Ok(expr),
            Some(token) => Err(self.error(format!("unexpected trailing {:?}", token))),
        }
    }

    fn parse_or(&mut self) -> Result<Expr, TemplateError> {
        let mut left = self.parse_and()?;
        while self.peek_keyword("or") {
            self.pos += 1;
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, TemplateError> {
        let mut left = self.parse_not()?;
        while self.peek_keyword("and") {
            self.pos += 1;
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, TemplateError> {
        if self.peek_keyword("not") {
            self.pos += 1;
            return Ok(Expr::Not(Box::new(self.parse_not()?)));
        }
        self.parse_compare()
    }

    fn parse_compare(&mut self) -> Result<Expr, TemplateError> {
        let left = self.parse_filtered()?;
        if let Some(ExprToken::Op(op)) = self.peek().cloned() {
            self.pos += 1;
            let right = self.parse_filtered()?;
            return Ok(Expr::Compare(op, Box::new(left), Box::new(right)));
        }
        Ok(left)
    }

    fn parse_filtered(&mut self) -> Result<Expr, TemplateError> {
        let mut expr = self.parse_primary()?;
        while self.peek() == Some(&ExprToken::Pipe) {
            self.pos += 1;
            let name = match self.next() {
                Some(ExprToken::Ident(name)) => name,
                _ => return Err(self.error("expected a filter name after `|`")),
            };
            let filter = Filter::from_name(&name).ok_or(TemplateError::UnknownFilter { name })?;
            expr = Expr::Filtered(Box::new(expr), filter);
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, TemplateError> {
        match self.next() {
            Some(ExprToken::Str(value)) => Ok(Expr::Literal(Value::String(value))),
            Some(ExprToken::Num(value)) => Ok(Expr::Literal(json!(value))),
            Some(ExprToken::LParen) => {
                let inner = self.parse_or()?;
                match self.next() {
                    Some(ExprToken::RParen) => Ok(inner),
                    _ => Err(self.error("expected `)`")),
                }
            }
            Some(ExprToken::Ident(ident)) => match ident.as_str() {
                "true" => Ok(Expr::Literal(Value::Bool(true))),
                "false" => Ok(Expr::Literal(Value::Bool(false))),
                "none" | "null" => Ok(Expr::Literal(Value::Null)),
                _ => {
                    let mut path = vec![ident];
                    while self.peek() == Some(&ExprToken::Dot) {
                        self.pos += 1;
                        match self.next() {
                            Some(ExprToken::Ident(segment)) => path.push(segment),
                            Some(ExprToken::Num(index)) if index.fract() == 0.0 => {
                                path.push(format!("{}", index as u64));
                            }
                            _ => return Err(self.error("expected a name after `.`")),
                        }
                    }
                    Ok(Expr::Path(path))
                }
            },
            Some(token) => Err(self.error(format!("unexpected {:?}", token))),
            None => Err(self.error("unexpected end of expression")),
        }
    }
}

struct Scope<'a> {
    root: &'a Value,
    locals: Vec<(String, Value)>,
}

impl Scope<'_> {
    fn lookup(&self, path: &[String]) -> Value {
        let Some((head, rest)) = path.split_first() else {
            return Value::Null;
        };

        let mut current = self
            .locals
            .iter()
            .rev()
            .find(|(name, _)| name == head)
            .map(|(_, value)| value.clone())
            .or_else(|| self.root.get(head).cloned())
            .unwrap_or(Value::Null);

        for segment in rest {
            current = match &current {
                Value::Object(map) => map.get(segment).cloned().unwrap_or(Value::Null),
                Value::Array(items) if segment == "length" => json!(items.len()),
                Value::Array(items) => segment
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| items.get(index).cloned())
                    .unwrap_or(Value::Null),
                Value::String(s) if segment == "length" => json!(s.chars().count()),
                _ => Value::Null,
            };
        }
        current
    }
}

fn evaluate(expr: &Expr, scope: &Scope<'_>) -> Value {
    match expr {
        Expr::Literal(value) => value.clone(),
        Expr::Path(path) => scope.lookup(path),
        Expr::Filtered(inner, filter) => filter.apply(evaluate(inner, scope)),
        Expr::Not(inner) => Value::Bool(!is_truthy(&evaluate(inner, scope))),
        Expr::And(left, right) => {
            let left = evaluate(left, scope);
            if is_truthy(&left) { evaluate(right, scope) } else { left }
        }
        Expr::Or(left, right) => {
            let left = evaluate(left, scope);
            if is_truthy(&left) { left } else { evaluate(right, scope) }
        }
        Expr::Compare(op, left, right) => {
            Value::Bool(compare(*op, &evaluate(left, scope), &evaluate(right, scope)))
        }
    }
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> bool {
    let ordering = match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64().zip(b.as_f64()).and_then(|(a, b)| a.partial_cmp(&b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    };

    match op {
        CompareOp::Eq => ordering.map_or(left == right, |o| o == Ordering::Equal),
        CompareOp::Ne => ordering.map_or(left != right, |o| o != Ordering::Equal),
        CompareOp::Gt => ordering == Some(Ordering::Greater),
        CompareOp::Lt => ordering == Some(Ordering::Less),
        CompareOp::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
        CompareOp::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
    }
}

/// Empty strings, empty lists, zero, `false` and missing values are falsy
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        Value::Object(map) => Some(map.len()),
        _ => None,
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                let f = n.as_f64().unwrap_or_default();
                if f.fract() == 0.0 && f.abs() < 1e15 { format!("{}", f as i64) } else { f.to_string() }
            }
        }
        other => other.to_string(),
    }
}

fn render_nodes(nodes: &[Node], scope: &mut Scope<'_>, out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Output(expr) => out.push_str(&display(&evaluate(expr, scope))),
            Node::For { var, iterable, body } => {
                let Value::Array(items) = evaluate(iterable, scope) else {
                    continue;
                };
                let length = items.len();
                for (index, item) in items.into_iter().enumerate() {
                    let loop_info = json!({
                        "index": index + 1,
                        "index0": index,
                        "first": index == 0,
                        "last": index + 1 == length,
                        "length": length,
                    });
                    scope.locals.push(("loop".to_string(), loop_info));
                    scope.locals.push((var.clone(), item));
                    render_nodes(body, scope, out);
                    scope.locals.truncate(scope.locals.len() - 2);
                }
            }
            Node::If { branches, otherwise } => {
                let chosen = branches
                    .iter()
                    .find(|(condition, _)| is_truthy(&evaluate(condition, scope)))
                    .map_or(otherwise, |(_, body)| body);
                render_nodes(chosen, scope, out);
            }
        }
    }
}
