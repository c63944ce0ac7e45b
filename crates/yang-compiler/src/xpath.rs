//! XPath 1.0 expression parsing for `when` and `must` arguments.
//!
//! Expressions are checked for syntax at schema-compile time and kept as an
//! AST; identifiers are not bound and nothing is evaluated here. Instance
//! validation, which evaluates these expressions against data trees, is a
//! separate concern built on top of the compiled schema.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Compare(CompareOp, Box<Expr>, Box<Expr>),
    Arith(ArithOp, Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
    Union(Box<Expr>, Box<Expr>),
    Path(LocationPath),
    /// A primary expression with optional predicates and a trailing path,
    /// e.g. `current()/../interface`.
    Filter {
        primary: Box<Expr>,
        predicates: Vec<Expr>,
        path: Option<LocationPath>,
    },
    Literal(String),
    Number(f64),
    Variable(String),
    Call(String, Vec<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationPath {
    pub absolute: bool,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub axis: Axis,
    pub test: NodeTest,
    pub predicates: Vec<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Ancestor,
    AncestorOrSelf,
    Attribute,
    Child,
    Descendant,
    DescendantOrSelf,
    Following,
    FollowingSibling,
    Namespace,
    Parent,
    Preceding,
    PrecedingSibling,
    SelfAxis,
}

impl Axis {
    fn from_name(name: &str) -> Option<Axis> {
        Some(match name {
            "ancestor" => Axis::Ancestor,
            "ancestor-or-self" => Axis::AncestorOrSelf,
            "attribute" => Axis::Attribute,
            "child" => Axis::Child,
            "descendant" => Axis::Descendant,
            "descendant-or-self" => Axis::DescendantOrSelf,
            "following" => Axis::Following,
            "following-sibling" => Axis::FollowingSibling,
            "namespace" => Axis::Namespace,
            "parent" => Axis::Parent,
            "preceding" => Axis::Preceding,
            "preceding-sibling" => Axis::PrecedingSibling,
            "self" => Axis::SelfAxis,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    /// `name`, `prefix:name`, `prefix:*` or `*`.
    Name {
        prefix: Option<String>,
        name: Option<String>,
    },
    Node,
    Text,
    Comment,
    ProcessingInstruction(Option<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("XPath syntax error at offset {offset}: {message}")]
pub struct XPathError {
    pub message: String,
    pub offset: usize,
}

/// Parses an XPath 1.0 expression.
pub fn parse(source: &str) -> Result<Expr, XPathError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        end: source.len(),
    };
    let expr = parser.expr()?;
    if let Some(tok) = parser.peek() {
        return Err(XPathError {
            message: format!("unexpected `{}`", tok.kind),
            offset: tok.offset,
        });
    }
    Ok(expr)
}

#[derive(Debug, Clone, PartialEq)]
enum TokKind {
    Number(f64),
    Literal(String),
    /// NCName, or QName with `prefix`; operator names are produced as
    /// `OpName` instead when the previous token ends an operand.
    Name {
        prefix: Option<String>,
        name: Option<String>, // None for a trailing `*`
    },
    OpName(&'static str), // and or div mod
    Variable(String),
    Star, // `*` as a multiply operator is OpName("*")
    Slash,
    DoubleSlash,
    Dot,
    DotDot,
    At,
    ColonColon,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    Pipe,
    Plus,
    Minus,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl fmt::Display for TokKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokKind::Number(n) => write!(f, "{n}"),
            TokKind::Literal(s) => write!(f, "{s:?}"),
            TokKind::Name { prefix, name } => {
                if let Some(p) = prefix {
                    write!(f, "{p}:")?;
                }
                write!(f, "{}", name.as_deref().unwrap_or("*"))
            }
            TokKind::OpName(s) => f.write_str(s),
            TokKind::Variable(s) => write!(f, "${s}"),
            TokKind::Star => f.write_str("*"),
            TokKind::Slash => f.write_str("/"),
            TokKind::DoubleSlash => f.write_str("//"),
            TokKind::Dot => f.write_str("."),
            TokKind::DotDot => f.write_str(".."),
            TokKind::At => f.write_str("@"),
            TokKind::ColonColon => f.write_str("::"),
            TokKind::LBracket => f.write_str("["),
            TokKind::RBracket => f.write_str("]"),
            TokKind::LParen => f.write_str("("),
            TokKind::RParen => f.write_str(")"),
            TokKind::Comma => f.write_str(","),
            TokKind::Pipe => f.write_str("|"),
            TokKind::Plus => f.write_str("+"),
            TokKind::Minus => f.write_str("-"),
            TokKind::Eq => f.write_str("="),
            TokKind::Ne => f.write_str("!="),
            TokKind::Lt => f.write_str("<"),
            TokKind::Le => f.write_str("<="),
            TokKind::Gt => f.write_str(">"),
            TokKind::Ge => f.write_str(">="),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Tok {
    kind: TokKind,
    offset: usize,
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_continue(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

fn tokenize(source: &str) -> Result<Vec<Tok>, XPathError> {
    let mut tokens: Vec<Tok> = Vec::new();
    let mut chars = source.char_indices().peekable();
    // The XPath disambiguation rule: `*` and the operator names are
    // operators iff the preceding token ends an operand.
    let prev_ends_operand = |tokens: &[Tok]| {
        matches!(
            tokens.last().map(|t| &t.kind),
            Some(
                TokKind::Number(_)
                    | TokKind::Literal(_)
                    | TokKind::Name { .. }
                    | TokKind::Variable(_)
                    | TokKind::RBracket
                    | TokKind::RParen
                    | TokKind::Dot
                    | TokKind::DotDot
                    | TokKind::Star
            )
        )
    };
    while let Some(&(offset, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => simple(&mut chars, &mut tokens, offset, TokKind::LParen),
            ')' => simple(&mut chars, &mut tokens, offset, TokKind::RParen),
            '[' => simple(&mut chars, &mut tokens, offset, TokKind::LBracket),
            ']' => simple(&mut chars, &mut tokens, offset, TokKind::RBracket),
            ',' => simple(&mut chars, &mut tokens, offset, TokKind::Comma),
            '|' => simple(&mut chars, &mut tokens, offset, TokKind::Pipe),
            '+' => simple(&mut chars, &mut tokens, offset, TokKind::Plus),
            '-' => simple(&mut chars, &mut tokens, offset, TokKind::Minus),
            '@' => simple(&mut chars, &mut tokens, offset, TokKind::At),
            '=' => simple(&mut chars, &mut tokens, offset, TokKind::Eq),
            '/' => {
                chars.next();
                if matches!(chars.peek(), Some(&(_, '/'))) {
                    chars.next();
                    tokens.push(Tok {
                        kind: TokKind::DoubleSlash,
                        offset,
                    });
                } else {
                    tokens.push(Tok {
                        kind: TokKind::Slash,
                        offset,
                    });
                }
            }
            '.' => {
                chars.next();
                if matches!(chars.peek(), Some(&(_, '.'))) {
                    chars.next();
                    tokens.push(Tok {
                        kind: TokKind::DotDot,
                        offset,
                    });
                } else if matches!(chars.peek(), Some(&(_, c)) if c.is_ascii_digit()) {
                    let number = lex_number(source, offset, &mut chars)?;
                    tokens.push(Tok {
                        kind: TokKind::Number(number),
                        offset,
                    });
                } else {
                    tokens.push(Tok {
                        kind: TokKind::Dot,
                        offset,
                    });
                }
            }
            ':' => {
                chars.next();
                if matches!(chars.peek(), Some(&(_, ':'))) {
                    chars.next();
                    tokens.push(Tok {
                        kind: TokKind::ColonColon,
                        offset,
                    });
                } else {
                    return Err(XPathError {
                        message: "stray `:`".to_owned(),
                        offset,
                    });
                }
            }
            '!' => {
                chars.next();
                if matches!(chars.peek(), Some(&(_, '='))) {
                    chars.next();
                    tokens.push(Tok {
                        kind: TokKind::Ne,
                        offset,
                    });
                } else {
                    return Err(XPathError {
                        message: "expected `!=`".to_owned(),
                        offset,
                    });
                }
            }
            '<' => {
                chars.next();
                if matches!(chars.peek(), Some(&(_, '='))) {
                    chars.next();
                    tokens.push(Tok {
                        kind: TokKind::Le,
                        offset,
                    });
                } else {
                    tokens.push(Tok {
                        kind: TokKind::Lt,
                        offset,
                    });
                }
            }
            '>' => {
                chars.next();
                if matches!(chars.peek(), Some(&(_, '='))) {
                    chars.next();
                    tokens.push(Tok {
                        kind: TokKind::Ge,
                        offset,
                    });
                } else {
                    tokens.push(Tok {
                        kind: TokKind::Gt,
                        offset,
                    });
                }
            }
            '"' | '\'' => {
                let quote = c;
                chars.next();
                let mut value = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == quote {
                        closed = true;
                        break;
                    }
                    value.push(c);
                }
                if !closed {
                    return Err(XPathError {
                        message: "unterminated string literal".to_owned(),
                        offset,
                    });
                }
                tokens.push(Tok {
                    kind: TokKind::Literal(value),
                    offset,
                });
            }
            '$' => {
                chars.next();
                let name = lex_ncname(&mut chars).ok_or_else(|| XPathError {
                    message: "expected a variable name after `$`".to_owned(),
                    offset,
                })?;
                tokens.push(Tok {
                    kind: TokKind::Variable(name),
                    offset,
                });
            }
            '*' => {
                chars.next();
                if prev_ends_operand(&tokens) {
                    tokens.push(Tok {
                        kind: TokKind::OpName("*"),
                        offset,
                    });
                } else {
                    tokens.push(Tok {
                        kind: TokKind::Star,
                        offset,
                    });
                }
            }
            c if c.is_ascii_digit() => {
                let number = lex_number(source, offset, &mut chars)?;
                tokens.push(Tok {
                    kind: TokKind::Number(number),
                    offset,
                });
            }
            c if is_name_start(c) => {
                let name = lex_ncname(&mut chars).unwrap();
                if prev_ends_operand(&tokens)
                    && matches!(name.as_str(), "and" | "or" | "div" | "mod")
                {
                    let op = match name.as_str() {
                        "and" => "and",
                        "or" => "or",
                        "div" => "div",
                        _ => "mod",
                    };
                    tokens.push(Tok {
                        kind: TokKind::OpName(op),
                        offset,
                    });
                    continue;
                }
                // QName: `prefix:name` or `prefix:*`; a lone `:` would be
                // `::` which the axis parser consumes separately.
                let mut prefix = None;
                let mut local = Some(name);
                if matches!(chars.peek(), Some(&(_, ':'))) {
                    let mut lookahead = chars.clone();
                    lookahead.next();
                    match lookahead.peek() {
                        Some(&(_, ':')) => {} // axis `::`, leave for the parser
                        Some(&(_, '*')) => {
                            chars.next();
                            chars.next();
                            prefix = local.take();
                        }
                        Some(&(_, c)) if is_name_start(c) => {
                            chars.next();
                            prefix = local.take();
                            local = Some(lex_ncname(&mut chars).unwrap());
                        }
                        _ => {}
                    }
                }
                tokens.push(Tok {
                    kind: TokKind::Name {
                        prefix,
                        name: local,
                    },
                    offset,
                });
            }
            other => {
                return Err(XPathError {
                    message: format!("unexpected character `{other}`"),
                    offset,
                })
            }
        }
    }
    Ok(tokens)
}

fn simple(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    tokens: &mut Vec<Tok>,
    offset: usize,
    kind: TokKind,
) {
    chars.next();
    tokens.push(Tok { kind, offset });
}

fn lex_ncname(chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>) -> Option<String> {
    let mut name = String::new();
    match chars.peek() {
        Some(&(_, c)) if is_name_start(c) => {
            name.push(c);
            chars.next();
        }
        _ => return None,
    }
    while let Some(&(_, c)) = chars.peek() {
        if is_name_continue(c) {
            name.push(c);
            chars.next();
        } else {
            break;
        }
    }
    Some(name)
}

fn lex_number(
    source: &str,
    start: usize,
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
) -> Result<f64, XPathError> {
    let mut end = start;
    let mut seen_dot = false;
    while let Some(&(i, c)) = chars.peek() {
        if c.is_ascii_digit() || (c == '.' && !seen_dot) {
            seen_dot |= c == '.';
            end = i + c.len_utf8();
            chars.next();
        } else {
            break;
        }
    }
    source[start..end].parse().map_err(|_| XPathError {
        message: format!("`{}` is not a number", &source[start..end]),
        offset: start,
    })
}

struct Parser<'a> {
    tokens: &'a [Tok],
    pos: usize,
    end: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Tok> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<&'a Tok> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, kind: &TokKind) -> bool {
        if self.peek().map(|t| &t.kind) == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokKind) -> Result<(), XPathError> {
        if self.eat(&kind) {
            Ok(())
        } else {
            Err(self.error(format!("expected `{kind}`")))
        }
    }

    fn error(&self, message: String) -> XPathError {
        XPathError {
            message,
            offset: self.peek().map(|t| t.offset).unwrap_or(self.end),
        }
    }

    fn expr(&mut self) -> Result<Expr, XPathError> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Expr, XPathError> {
        let mut lhs = self.and_expr()?;
        while self.eat(&TokKind::OpName("or")) {
            let rhs = self.and_expr()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr, XPathError> {
        let mut lhs = self.equality_expr()?;
        while self.eat(&TokKind::OpName("and")) {
            let rhs = self.equality_expr()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn equality_expr(&mut self) -> Result<Expr, XPathError> {
        let mut lhs = self.relational_expr()?;
        loop {
            let op = match self.peek().map(|t| &t.kind) {
                Some(TokKind::Eq) => CompareOp::Eq,
                Some(TokKind::Ne) => CompareOp::Ne,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.relational_expr()?;
            lhs = Expr::Compare(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn relational_expr(&mut self) -> Result<Expr, XPathError> {
        let mut lhs = self.additive_expr()?;
        loop {
            let op = match self.peek().map(|t| &t.kind) {
                Some(TokKind::Lt) => CompareOp::Lt,
                Some(TokKind::Le) => CompareOp::Le,
                Some(TokKind::Gt) => CompareOp::Gt,
                Some(TokKind::Ge) => CompareOp::Ge,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.additive_expr()?;
            lhs = Expr::Compare(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn additive_expr(&mut self) -> Result<Expr, XPathError> {
        let mut lhs = self.multiplicative_expr()?;
        loop {
            let op = match self.peek().map(|t| &t.kind) {
                Some(TokKind::Plus) => ArithOp::Add,
                Some(TokKind::Minus) => ArithOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.multiplicative_expr()?;
            lhs = Expr::Arith(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn multiplicative_expr(&mut self) -> Result<Expr, XPathError> {
        let mut lhs = self.unary_expr()?;
        loop {
            let op = match self.peek().map(|t| &t.kind) {
                Some(TokKind::OpName("*")) => ArithOp::Mul,
                Some(TokKind::OpName("div")) => ArithOp::Div,
                Some(TokKind::OpName("mod")) => ArithOp::Mod,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.unary_expr()?;
            lhs = Expr::Arith(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary_expr(&mut self) -> Result<Expr, XPathError> {
        if self.eat(&TokKind::Minus) {
            let inner = self.unary_expr()?;
            return Ok(Expr::Neg(Box::new(inner)));
        }
        self.union_expr()
    }

    fn union_expr(&mut self) -> Result<Expr, XPathError> {
        let mut lhs = self.path_expr()?;
        while self.eat(&TokKind::Pipe) {
            let rhs = self.path_expr()?;
            lhs = Expr::Union(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn path_expr(&mut self) -> Result<Expr, XPathError> {
        match self.peek().map(|t| &t.kind) {
            Some(TokKind::Number(_))
            | Some(TokKind::Literal(_))
            | Some(TokKind::Variable(_))
            | Some(TokKind::LParen) => self.filter_expr(),
            Some(TokKind::Name { prefix: None, name: Some(name) })
                if !is_node_type(name) && self.next_is_lparen() =>
            {
                self.filter_expr()
            }
            _ => {
                let path = self.location_path()?;
                Ok(Expr::Path(path))
            }
        }
    }

    fn next_is_lparen(&self) -> bool {
        matches!(
            self.tokens.get(self.pos + 1).map(|t| &t.kind),
            Some(TokKind::LParen)
        )
    }

    fn filter_expr(&mut self) -> Result<Expr, XPathError> {
        let primary = self.primary_expr()?;
        let mut predicates = Vec::new();
        while self.peek().map(|t| &t.kind) == Some(&TokKind::LBracket) {
            predicates.push(self.predicate()?);
        }
        let path = match self.peek().map(|t| &t.kind) {
            Some(TokKind::Slash) => {
                self.pos += 1;
                Some(self.relative_location_path(false)?)
            }
            Some(TokKind::DoubleSlash) => {
                self.pos += 1;
                Some(self.relative_location_path(true)?)
            }
            _ => None,
        };
        if predicates.is_empty() && path.is_none() {
            return Ok(primary);
        }
        Ok(Expr::Filter {
            primary: Box::new(primary),
            predicates,
            path,
        })
    }

    fn primary_expr(&mut self) -> Result<Expr, XPathError> {
        let tok = self.bump().ok_or_else(|| {
            self.error("expression ends unexpectedly".to_owned())
        })?;
        match &tok.kind {
            TokKind::Number(n) => Ok(Expr::Number(*n)),
            TokKind::Literal(s) => Ok(Expr::Literal(s.clone())),
            TokKind::Variable(name) => Ok(Expr::Variable(name.clone())),
            TokKind::LParen => {
                let inner = self.expr()?;
                self.expect(TokKind::RParen)?;
                Ok(inner)
            }
            TokKind::Name { prefix, name: Some(name) } => {
                let full = match prefix {
                    Some(p) => format!("{p}:{name}"),
                    None => name.clone(),
                };
                self.expect(TokKind::LParen)?;
                let mut args = Vec::new();
                if self.peek().map(|t| &t.kind) != Some(&TokKind::RParen) {
                    loop {
                        args.push(self.expr()?);
                        if !self.eat(&TokKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokKind::RParen)?;
                Ok(Expr::Call(full, args))
            }
            other => Err(XPathError {
                message: format!("unexpected `{other}`"),
                offset: tok.offset,
            }),
        }
    }

    fn predicate(&mut self) -> Result<Expr, XPathError> {
        self.expect(TokKind::LBracket)?;
        let inner = self.expr()?;
        self.expect(TokKind::RBracket)?;
        Ok(inner)
    }

    fn location_path(&mut self) -> Result<LocationPath, XPathError> {
        match self.peek().map(|t| &t.kind) {
            Some(TokKind::Slash) => {
                self.pos += 1;
                if self.starts_step() {
                    let mut path = self.relative_location_path(false)?;
                    path.absolute = true;
                    Ok(path)
                } else {
                    Ok(LocationPath {
                        absolute: true,
                        steps: Vec::new(),
                    })
                }
            }
            Some(TokKind::DoubleSlash) => {
                self.pos += 1;
                let mut path = self.relative_location_path(true)?;
                path.absolute = true;
                Ok(path)
            }
            _ => self.relative_location_path(false),
        }
    }

    fn starts_step(&self) -> bool {
        matches!(
            self.peek().map(|t| &t.kind),
            Some(
                TokKind::Name { .. }
                    | TokKind::Star
                    | TokKind::Dot
                    | TokKind::DotDot
                    | TokKind::At
            )
        )
    }

    fn relative_location_path(
        &mut self,
        leading_descendant: bool,
    ) -> Result<LocationPath, XPathError> {
        let mut steps = Vec::new();
        if leading_descendant {
            steps.push(descendant_or_self_step());
        }
        steps.push(self.step()?);
        loop {
            match self.peek().map(|t| &t.kind) {
                Some(TokKind::Slash) => {
                    self.pos += 1;
                    steps.push(self.step()?);
                }
                Some(TokKind::DoubleSlash) => {
                    self.pos += 1;
                    steps.push(descendant_or_self_step());
                    steps.push(self.step()?);
                }
                _ => break,
            }
        }
        Ok(LocationPath {
            absolute: false,
            steps,
        })
    }

    fn step(&mut self) -> Result<Step, XPathError> {
        match self.peek().map(|t| &t.kind) {
            Some(TokKind::Dot) => {
                self.pos += 1;
                return Ok(Step {
                    axis: Axis::SelfAxis,
                    test: NodeTest::Node,
                    predicates: Vec::new(),
                });
            }
            Some(TokKind::DotDot) => {
                self.pos += 1;
                return Ok(Step {
                    axis: Axis::Parent,
                    test: NodeTest::Node,
                    predicates: Vec::new(),
                });
            }
            _ => {}
        }
        let mut axis = Axis::Child;
        if self.eat(&TokKind::At) {
            axis = Axis::Attribute;
        } else if let Some(TokKind::Name { prefix: None, name: Some(name) }) =
            self.peek().map(|t| &t.kind)
        {
            if let Some(named_axis) = Axis::from_name(name) {
                if matches!(
                    self.tokens.get(self.pos + 1).map(|t| &t.kind),
                    Some(TokKind::ColonColon)
                ) {
                    axis = named_axis;
                    self.pos += 2;
                }
            }
        }
        let test = self.node_test()?;
        let mut predicates = Vec::new();
        while self.peek().map(|t| &t.kind) == Some(&TokKind::LBracket) {
            predicates.push(self.predicate()?);
        }
        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn node_test(&mut self) -> Result<NodeTest, XPathError> {
        let tok = self
            .bump()
            .ok_or_else(|| self.error("expected a node test".to_owned()))?;
        match &tok.kind {
            TokKind::Star => Ok(NodeTest::Name {
                prefix: None,
                name: None,
            }),
            TokKind::Name { prefix, name } => {
                if prefix.is_none() {
                    if let Some(name) = name {
                        if is_node_type(name) && self.peek().map(|t| &t.kind) == Some(&TokKind::LParen)
                        {
                            return self.node_type_test(name.clone());
                        }
                    }
                }
                Ok(NodeTest::Name {
                    prefix: prefix.clone(),
                    name: name.clone(),
                })
            }
            other => Err(XPathError {
                message: format!("expected a node test, got `{other}`"),
                offset: tok.offset,
            }),
        }
    }

    fn node_type_test(&mut self, name: String) -> Result<NodeTest, XPathError> {
        self.expect(TokKind::LParen)?;
        let test = match name.as_str() {
            "node" => NodeTest::Node,
            "text" => NodeTest::Text,
            "comment" => NodeTest::Comment,
            "processing-instruction" => {
                let target = match self.peek().map(|t| &t.kind) {
                    Some(TokKind::Literal(s)) => {
                        let s = s.clone();
                        self.pos += 1;
                        Some(s)
                    }
                    _ => None,
                };
                NodeTest::ProcessingInstruction(target)
            }
            _ => unreachable!("checked by is_node_type"),
        };
        self.expect(TokKind::RParen)?;
        Ok(test)
    }
}

fn is_node_type(name: &str) -> bool {
    matches!(
        name,
        "node" | "text" | "comment" | "processing-instruction"
    )
}

fn descendant_or_self_step() -> Step {
    Step {
        axis: Axis::DescendantOrSelf,
        test: NodeTest::Node,
        predicates: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_true_function() {
        assert_eq!(parse("true()").unwrap(), Expr::Call("true".to_owned(), vec![]));
    }

    #[test]
    fn parses_relative_paths() {
        let Expr::Path(path) = parse("../interface/name").unwrap() else {
            panic!("expected a path");
        };
        assert!(!path.absolute);
        assert_eq!(path.steps.len(), 3);
        assert_eq!(path.steps[0].axis, Axis::Parent);
    }

    #[test]
    fn parses_prefixed_absolute_paths() {
        let Expr::Path(path) = parse("/if:interfaces/if:interface[if:name = 'eth0']").unwrap()
        else {
            panic!("expected a path");
        };
        assert!(path.absolute);
        assert_eq!(path.steps.len(), 2);
        assert_eq!(path.steps[1].predicates.len(), 1);
    }

    #[test]
    fn parses_current_function_paths() {
        let expr = parse("current()/../type = 'ethernet'").unwrap();
        assert!(matches!(expr, Expr::Compare(CompareOp::Eq, _, _)));
    }

    #[test]
    fn operator_names_need_a_left_operand() {
        // `div` here is a name test, not the operator.
        let Expr::Path(path) = parse("div").unwrap() else {
            panic!("expected a path");
        };
        assert_eq!(
            path.steps[0].test,
            NodeTest::Name {
                prefix: None,
                name: Some("div".to_owned())
            }
        );
        // ... while here it is the operator.
        assert!(matches!(
            parse("2 div 3").unwrap(),
            Expr::Arith(ArithOp::Div, _, _)
        ));
    }

    #[test]
    fn precedence_or_lowest() {
        let expr = parse("a = 1 or b and c").unwrap();
        assert!(matches!(expr, Expr::Or(_, _)));
    }

    #[test]
    fn rejects_trailing_garbage() {
        let err = parse("a = ").unwrap_err();
        assert!(err.message.contains("unexpectedly") || err.message.contains("expected"));
        assert!(parse("a b").is_err());
        assert!(parse("(a").is_err());
    }

    #[test]
    fn double_slash_desugars_to_descendant_or_self() {
        let Expr::Path(path) = parse("//name").unwrap() else {
            panic!("expected a path");
        };
        assert_eq!(path.steps.len(), 2);
        assert_eq!(path.steps[0].axis, Axis::DescendantOrSelf);
    }
}
