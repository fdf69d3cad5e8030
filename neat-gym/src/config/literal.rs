//! A small, side-effect-free expression language for configuration
//! values, following Python literal syntax.
//!
//! Besides literals (numbers, strings, `True`, `False`, `None`,
//! tuples and lists) an expression may use arithmetic, comparisons,
//! boolean operators, the built-ins `range`, `float`, `int`, `abs`
//! and `len`, and list comprehensions, so that substrate coordinates
//! can be generated rather than spelled out:
//!
//! ```
//! use neat_gym::config::{evaluate, Value};
//!
//! let layer = evaluate("[(x / 2, 0.0) for x in range(-2, 3) if x != 0]").unwrap();
//! assert_eq!(layer.to_string(), "[(-1.0, 0.0), (-0.5, 0.0), (0.5, 0.0), (1.0, 0.0)]");
//! assert_eq!(evaluate("2 ** 10 // 3 % 7").unwrap(), Value::Int(5));
//! ```
use logos::Logos;
use thiserror::Error;

use std::cmp::Ordering;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

/// Upper bound on the length of any sequence an expression builds.
const MAX_ITEMS: usize = 1 << 20;
/// Upper bound on the nesting of an expression.
const MAX_DEPTH: usize = 100;
/// Upper bound on the comprehension iterations of an evaluation.
const MAX_STEPS: usize = 1 << 22;

/// An error type indicating an expression that
/// cannot be parsed or evaluated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LiteralError {
    #[error("unexpected character at offset {0}")]
    Lex(usize),
    #[error("unexpected {found:?} at offset {offset}, expected {expected}")]
    Syntax {
        offset: usize,
        found: String,
        expected: &'static str,
    },
    #[error("unexpected end of expression, expected {0}")]
    UnexpectedEnd(&'static str),
    #[error("unknown name {0}")]
    UnknownName(String),
    #[error("{function}() takes {expected} arguments, got {found}")]
    Arity {
        function: &'static str,
        expected: &'static str,
        found: usize,
    },
    #[error("unsupported operand types for {op}: {left} and {right}")]
    TypeMismatch {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },
    #[error("bad operand type for unary {op}: {operand}")]
    BadOperand {
        op: &'static str,
        operand: &'static str,
    },
    #[error("{0} is not iterable")]
    NotIterable(&'static str),
    #[error("cannot convert {value} to {target}")]
    Conversion { value: String, target: &'static str },
    #[error("cannot unpack {found} values into {expected} names")]
    Unpack { expected: usize, found: usize },
    #[error("range() step must not be zero")]
    ZeroStep,
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow")]
    Overflow,
    #[error("sequence longer than {} items", MAX_ITEMS)]
    TooLarge,
    #[error("expression nested deeper than {} levels", MAX_DEPTH)]
    TooDeep,
    #[error("comprehension takes more than {} steps", MAX_STEPS)]
    TooManySteps,
}

/// The value of an expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Tuple(Vec<Value>),
    List(Vec<Value>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Tuple(_) => "tuple",
            Value::List(_) => "list",
        }
    }

    /// Returns the numeric value of an integer, float or boolean.
    pub fn as_f64(&self) -> Option<f64> {
        match number(self)? {
            Number::Int(i) => Some(i as f64),
            Number::Float(f) => Some(f),
        }
    }

    /// Returns the value of an integer or boolean.
    pub fn as_i64(&self) -> Option<i64> {
        match number(self)? {
            Number::Int(i) => Some(i),
            Number::Float(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the items of a list or tuple.
    pub fn items(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::Tuple(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the coordinates of a two-number list or tuple.
    pub fn as_point(&self) -> Option<(f32, f32)> {
        match self.items()? {
            [x, y] => Some((x.as_f64()? as f32, y.as_f64()? as f32)),
            _ => None,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Tuple(items) | Value::List(items) => !items.is_empty(),
        }
    }
}

/// Formats values the way Python's `repr` does,
/// so that the output evaluates to an equal value.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) if x.is_nan() => write!(f, "float('nan')"),
            Value::Float(x) if x.is_infinite() => {
                write!(f, "float('{}inf')", if *x < 0.0 { "-" } else { "" })
            }
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Str(s) => {
                write!(f, "'")?;
                for c in s.chars() {
                    match c {
                        '\'' => write!(f, "\\'")?,
                        '\\' => write!(f, "\\\\")?,
                        '\n' => write!(f, "\\n")?,
                        '\t' => write!(f, "\\t")?,
                        '\r' => write!(f, "\\r")?,
                        c => write!(f, "{}", c)?,
                    }
                }
                write!(f, "'")
            }
            Value::Tuple(items) => {
                write!(f, "(")?;
                write_items(f, items)?;
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Value::List(items) => {
                write!(f, "[")?;
                write_items(f, items)?;
                write!(f, "]")
            }
        }
    }
}

fn write_items(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl FromStr for Value {
    type Err = LiteralError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        evaluate(s)
    }
}

/// Parses and evaluates `source`.
///
/// # Errors
/// Returns an error if `source` is not a well-formed expression,
/// or if its evaluation fails (unknown names, type mismatches,
/// division by zero, overlong sequences...).
pub fn evaluate(source: &str) -> Result<Value, LiteralError> {
    let mut parser = Parser::new(source)?;
    let expression = parser.expression_list()?;
    if let Some(found) = parser.found() {
        return Err(LiteralError::Syntax {
            offset: parser.offset(),
            found,
            expected: "end of expression",
        });
    }
    evaluate_expr(&expression, &mut Scope::default())
}

fn unescape(quoted: &str) -> Option<String> {
    let inner = quoted.get(1..quoted.len() - 1)?;
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next()? {
            'n' => result.push('\n'),
            't' => result.push('\t'),
            'r' => result.push('\r'),
            '0' => result.push('\0'),
            c @ ('\\' | '\'' | '"') => result.push(c),
            _ => return None,
        }
    }
    Some(result)
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
enum Token {
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),
    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),
    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| unescape(lex.slice()))]
    #[regex(r"'([^'\\\n]|\\.)*'", |lex| unescape(lex.slice()))]
    Str(String),
    #[token("True")]
    TrueLiteral,
    #[token("False")]
    FalseLiteral,
    #[token("None")]
    NoneLiteral,
    #[token("for")]
    For,
    #[token("in")]
    In,
    #[token("if")]
    If,
    #[token("and")]
    And,
    #[token("or")]
    Or,
    #[token("not")]
    Not,
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("**")]
    DoubleStar,
    #[token("/")]
    Slash,
    #[token("//")]
    DoubleSlash,
    #[token("%")]
    Percent,
    #[token("<")]
    Less,
    #[token("<=")]
    LessEqual,
    #[token(">")]
    Greater,
    #[token(">=")]
    GreaterEqual,
    #[token("==")]
    Equal,
    #[token("!=")]
    NotEqual,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

impl BinOp {
    fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::FloorDiv => "//",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum CmpOp {
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
}

impl CmpOp {
    fn from_token(token: &Token) -> Option<CmpOp> {
        match token {
            Token::Less => Some(CmpOp::Less),
            Token::LessEqual => Some(CmpOp::LessEqual),
            Token::Greater => Some(CmpOp::Greater),
            Token::GreaterEqual => Some(CmpOp::GreaterEqual),
            Token::Equal => Some(CmpOp::Equal),
            Token::NotEqual => Some(CmpOp::NotEqual),
            _ => None,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            CmpOp::Less => "<",
            CmpOp::LessEqual => "<=",
            CmpOp::Greater => ">",
            CmpOp::GreaterEqual => ">=",
            CmpOp::Equal => "==",
            CmpOp::NotEqual => "!=",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Target {
    Name(String),
    Tuple(Vec<Target>),
}

#[derive(Clone, Debug, PartialEq)]
enum Clause {
    For(Target, Expr),
    If(Expr),
}

#[derive(Clone, Debug, PartialEq)]
enum Expr {
    Literal(Value),
    Name(String),
    Tuple(Vec<Expr>),
    List(Vec<Expr>),
    Negate(Box<Expr>),
    Plus(Box<Expr>),
    Not(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Compare(Box<Expr>, Vec<(CmpOp, Expr)>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
    Comprehension(Box<Expr>, Vec<Clause>),
}

/// Recursive-descent parser over Python's expression grammar.
struct Parser<'s> {
    source: &'s str,
    tokens: Vec<(Token, Range<usize>)>,
    position: usize,
    depth: usize,
}

impl<'s> Parser<'s> {
    fn new(source: &'s str) -> Result<Parser<'s>, LiteralError> {
        let mut lexer = Token::lexer(source);
        let mut tokens = vec![];
        while let Some(token) = lexer.next() {
            match token {
                Ok(token) => tokens.push((token, lexer.span())),
                Err(()) => return Err(LiteralError::Lex(lexer.span().start)),
            }
        }
        Ok(Parser {
            source,
            tokens,
            position: 0,
            depth: 0,
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position).map(|(t, _)| t)
    }

    fn at(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.at(token) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.position)
            .map_or(self.source.len(), |(_, span)| span.start)
    }

    /// Source text of the current token.
    fn found(&self) -> Option<String> {
        let (_, span) = self.tokens.get(self.position)?;
        Some(self.source[span.clone()].to_string())
    }

    fn unexpected(&self, expected: &'static str) -> LiteralError {
        match self.found() {
            Some(found) => LiteralError::Syntax {
                offset: self.offset(),
                found,
                expected,
            },
            None => LiteralError::UnexpectedEnd(expected),
        }
    }

    fn expect(&mut self, token: &Token, expected: &'static str) -> Result<(), LiteralError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    /// One level deeper in the expression tree.
    fn deepen(&mut self) -> Result<(), LiteralError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(LiteralError::TooDeep);
        }
        Ok(())
    }

    /// Runs `parse` one level deeper.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T, LiteralError>) -> Result<T, LiteralError> {
        self.deepen()?;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn at_closing(&self) -> bool {
        matches!(self.peek(), None | Some(Token::RParen) | Some(Token::RBracket))
    }

    /// `expression (',' expression)* [',']`, a tuple if
    /// there is any comma.
    fn expression_list(&mut self) -> Result<Expr, LiteralError> {
        let first = self.expression()?;
        if !self.at(&Token::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(&Token::Comma) {
            if self.at_closing() {
                break;
            }
            items.push(self.expression()?);
        }
        Ok(Expr::Tuple(items))
    }

    fn expression(&mut self) -> Result<Expr, LiteralError> {
        self.nested(Self::or_test)
    }

    // Chained binary operators nest to the left, one level per operator.

    fn or_test(&mut self) -> Result<Expr, LiteralError> {
        let depth = self.depth;
        let mut left = self.and_test()?;
        while self.eat(&Token::Or) {
            self.deepen()?;
            let right = self.and_test()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        self.depth = depth;
        Ok(left)
    }

    fn and_test(&mut self) -> Result<Expr, LiteralError> {
        let depth = self.depth;
        let mut left = self.not_test()?;
        while self.eat(&Token::And) {
            self.deepen()?;
            let right = self.not_test()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        self.depth = depth;
        Ok(left)
    }

    fn not_test(&mut self) -> Result<Expr, LiteralError> {
        if self.eat(&Token::Not) {
            return Ok(Expr::Not(Box::new(self.nested(Self::not_test)?)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, LiteralError> {
        let left = self.arithmetic()?;
        let mut comparisons = vec![];
        while let Some(op) = self.peek().and_then(CmpOp::from_token) {
            self.position += 1;
            comparisons.push((op, self.arithmetic()?));
        }
        if comparisons.is_empty() {
            Ok(left)
        } else {
            Ok(Expr::Compare(Box::new(left), comparisons))
        }
    }

    fn arithmetic(&mut self) -> Result<Expr, LiteralError> {
        let depth = self.depth;
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => break,
            };
            self.position += 1;
            self.deepen()?;
            left = Expr::Binary(op, Box::new(left), Box::new(self.term()?));
        }
        self.depth = depth;
        Ok(left)
    }

    fn term(&mut self) -> Result<Expr, LiteralError> {
        let depth = self.depth;
        let mut left = self.factor()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                Some(Token::DoubleSlash) => BinOp::FloorDiv,
                Some(Token::Percent) => BinOp::Mod,
                _ => break,
            };
            self.position += 1;
            self.deepen()?;
            left = Expr::Binary(op, Box::new(left), Box::new(self.factor()?));
        }
        self.depth = depth;
        Ok(left)
    }

    fn factor(&mut self) -> Result<Expr, LiteralError> {
        if self.eat(&Token::Minus) {
            return Ok(Expr::Negate(Box::new(self.nested(Self::factor)?)));
        }
        if self.eat(&Token::Plus) {
            return Ok(Expr::Plus(Box::new(self.nested(Self::factor)?)));
        }
        let base = self.atom()?;
        if self.eat(&Token::DoubleStar) {
            let exponent = self.nested(Self::factor)?;
            return Ok(Expr::Binary(BinOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Expr, LiteralError> {
        let token = match self.peek() {
            Some(token) => token.clone(),
            None => return Err(LiteralError::UnexpectedEnd("an expression")),
        };
        self.position += 1;
        match token {
            Token::Int(i) => Ok(Expr::Literal(Value::Int(i))),
            Token::Float(f) => Ok(Expr::Literal(Value::Float(f))),
            Token::Str(mut s) => {
                // Adjacent string literals concatenate.
                while let Some(Token::Str(next)) = self.peek() {
                    s.push_str(next);
                    self.position += 1;
                }
                Ok(Expr::Literal(Value::Str(s)))
            }
            Token::TrueLiteral => Ok(Expr::Literal(Value::Bool(true))),
            Token::FalseLiteral => Ok(Expr::Literal(Value::Bool(false))),
            Token::NoneLiteral => Ok(Expr::Literal(Value::None)),
            Token::Ident(name) => {
                if self.eat(&Token::LParen) {
                    let arguments = self.arguments()?;
                    Ok(Expr::Call(name, arguments))
                } else {
                    Ok(Expr::Name(name))
                }
            }
            Token::LParen => self.parenthesized(),
            Token::LBracket => self.list(),
            _ => {
                self.position -= 1;
                Err(self.unexpected("an expression"))
            }
        }
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, LiteralError> {
        let mut arguments = vec![];
        while !self.eat(&Token::RParen) {
            arguments.push(self.expression()?);
            if !self.eat(&Token::Comma) {
                self.expect(&Token::RParen, "')'")?;
                break;
            }
        }
        Ok(arguments)
    }

    fn parenthesized(&mut self) -> Result<Expr, LiteralError> {
        if self.eat(&Token::RParen) {
            return Ok(Expr::Tuple(vec![]));
        }
        let expression = self.expression_list()?;
        self.expect(&Token::RParen, "')'")?;
        Ok(expression)
    }

    fn list(&mut self) -> Result<Expr, LiteralError> {
        if self.eat(&Token::RBracket) {
            return Ok(Expr::List(vec![]));
        }
        let first = self.expression()?;
        if self.at(&Token::For) {
            let clauses = self.comprehension_clauses()?;
            self.expect(&Token::RBracket, "']'")?;
            return Ok(Expr::Comprehension(Box::new(first), clauses));
        }
        let mut items = vec![first];
        while self.eat(&Token::Comma) {
            if self.at_closing() {
                break;
            }
            items.push(self.expression()?);
        }
        self.expect(&Token::RBracket, "']'")?;
        Ok(Expr::List(items))
    }

    fn comprehension_clauses(&mut self) -> Result<Vec<Clause>, LiteralError> {
        let mut clauses = vec![];
        while self.eat(&Token::For) {
            let target = self.target_list()?;
            self.expect(&Token::In, "'in'")?;
            clauses.push(Clause::For(target, self.expression()?));
            while self.eat(&Token::If) {
                clauses.push(Clause::If(self.expression()?));
            }
        }
        Ok(clauses)
    }

    fn target_list(&mut self) -> Result<Target, LiteralError> {
        let first = self.target()?;
        if !self.at(&Token::Comma) {
            return Ok(first);
        }
        let mut targets = vec![first];
        while self.eat(&Token::Comma) {
            if self.at(&Token::In) || self.at_closing() {
                break;
            }
            targets.push(self.target()?);
        }
        Ok(Target::Tuple(targets))
    }

    fn target(&mut self) -> Result<Target, LiteralError> {
        match self.peek().cloned() {
            Some(Token::Ident(name)) => {
                self.position += 1;
                Ok(Target::Name(name))
            }
            Some(Token::LParen) => {
                self.position += 1;
                let target = self.nested(Self::target_list)?;
                self.expect(&Token::RParen, "')'")?;
                Ok(target)
            }
            Some(Token::LBracket) => {
                self.position += 1;
                let target = self.nested(Self::target_list)?;
                self.expect(&Token::RBracket, "']'")?;
                Ok(target)
            }
            _ => Err(self.unexpected("a name")),
        }
    }
}

/// State of an evaluation.
#[derive(Default)]
struct Scope {
    /// Variables bound by enclosing comprehensions, innermost last.
    variables: Vec<(String, Value)>,
    /// Comprehension iterations so far, across every comprehension.
    steps: usize,
}

fn evaluate_expr(expr: &Expr, scope: &mut Scope) -> Result<Value, LiteralError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Name(name) => scope
            .variables
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
            .ok_or_else(|| LiteralError::UnknownName(name.clone())),
        Expr::Tuple(items) => Ok(Value::Tuple(evaluate_all(items, scope)?)),
        Expr::List(items) => Ok(Value::List(evaluate_all(items, scope)?)),
        Expr::Negate(operand) => negate(evaluate_expr(operand, scope)?),
        Expr::Plus(operand) => {
            let value = evaluate_expr(operand, scope)?;
            match number(&value) {
                Some(Number::Int(i)) => Ok(Value::Int(i)),
                Some(Number::Float(f)) => Ok(Value::Float(f)),
                None => Err(LiteralError::BadOperand {
                    op: "+",
                    operand: value.type_name(),
                }),
            }
        }
        Expr::Not(operand) => Ok(Value::Bool(!evaluate_expr(operand, scope)?.is_truthy())),
        Expr::Binary(op, left, right) => {
            let left = evaluate_expr(left, scope)?;
            let right = evaluate_expr(right, scope)?;
            binary(*op, left, right)
        }
        Expr::Compare(first, comparisons) => {
            let mut left = evaluate_expr(first, scope)?;
            for (op, right) in comparisons {
                let right = evaluate_expr(right, scope)?;
                if !compare(*op, &left, &right)? {
                    return Ok(Value::Bool(false));
                }
                left = right;
            }
            Ok(Value::Bool(true))
        }
        Expr::And(left, right) => {
            let left = evaluate_expr(left, scope)?;
            if left.is_truthy() {
                evaluate_expr(right, scope)
            } else {
                Ok(left)
            }
        }
        Expr::Or(left, right) => {
            let left = evaluate_expr(left, scope)?;
            if left.is_truthy() {
                Ok(left)
            } else {
                evaluate_expr(right, scope)
            }
        }
        Expr::Call(name, arguments) => {
            let arguments = evaluate_all(arguments, scope)?;
            call(name, arguments)
        }
        Expr::Comprehension(element, clauses) => {
            let mut items = vec![];
            comprehend(element, clauses, scope, &mut items)?;
            Ok(Value::List(items))
        }
    }
}

fn evaluate_all(exprs: &[Expr], scope: &mut Scope) -> Result<Vec<Value>, LiteralError> {
    exprs.iter().map(|e| evaluate_expr(e, scope)).collect()
}

fn comprehend(
    element: &Expr,
    clauses: &[Clause],
    scope: &mut Scope,
    items: &mut Vec<Value>,
) -> Result<(), LiteralError> {
    match clauses.split_first() {
        None => {
            if items.len() >= MAX_ITEMS {
                return Err(LiteralError::TooLarge);
            }
            items.push(evaluate_expr(element, scope)?);
        }
        Some((Clause::If(condition), rest)) => {
            if evaluate_expr(condition, scope)?.is_truthy() {
                comprehend(element, rest, scope, items)?;
            }
        }
        Some((Clause::For(target, iterable), rest)) => {
            for value in iterate(evaluate_expr(iterable, scope)?)? {
                scope.steps += 1;
                if scope.steps > MAX_STEPS {
                    return Err(LiteralError::TooManySteps);
                }
                let depth = scope.variables.len();
                let result = bind(target, value, scope)
                    .and_then(|_| comprehend(element, rest, scope, items));
                scope.variables.truncate(depth);
                result?;
            }
        }
    }
    Ok(())
}

fn bind(target: &Target, value: Value, scope: &mut Scope) -> Result<(), LiteralError> {
    match target {
        Target::Name(name) => scope.variables.push((name.clone(), value)),
        Target::Tuple(targets) => {
            let values = iterate(value)?;
            if values.len() != targets.len() {
                return Err(LiteralError::Unpack {
                    expected: targets.len(),
                    found: values.len(),
                });
            }
            for (target, value) in targets.iter().zip(values) {
                bind(target, value, scope)?;
            }
        }
    }
    Ok(())
}

fn iterate(value: Value) -> Result<Vec<Value>, LiteralError> {
    match value {
        Value::List(items) | Value::Tuple(items) => Ok(items),
        Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
        other => Err(LiteralError::NotIterable(other.type_name())),
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn to_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }
}

fn number(value: &Value) -> Option<Number> {
    match value {
        Value::Bool(b) => Some(Number::Int(*b as i64)),
        Value::Int(i) => Some(Number::Int(*i)),
        Value::Float(f) => Some(Number::Float(*f)),
        _ => None,
    }
}

fn negate(value: Value) -> Result<Value, LiteralError> {
    match number(&value) {
        Some(Number::Int(i)) => i.checked_neg().map(Value::Int).ok_or(LiteralError::Overflow),
        Some(Number::Float(f)) => Ok(Value::Float(-f)),
        None => Err(LiteralError::BadOperand {
            op: "-",
            operand: value.type_name(),
        }),
    }
}

fn binary(op: BinOp, left: Value, right: Value) -> Result<Value, LiteralError> {
    match (op, left, right) {
        (BinOp::Add, Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
        (BinOp::Add, Value::List(a), Value::List(b)) => Ok(Value::List(concat(a, b)?)),
        (BinOp::Add, Value::Tuple(a), Value::Tuple(b)) => Ok(Value::Tuple(concat(a, b)?)),
        (BinOp::Mul, sequence @ (Value::List(_) | Value::Tuple(_) | Value::Str(_)), Value::Int(n))
        | (BinOp::Mul, Value::Int(n), sequence @ (Value::List(_) | Value::Tuple(_) | Value::Str(_))) => {
            repeat(sequence, n)
        }
        (op, left, right) => match (number(&left), number(&right)) {
            (Some(Number::Int(a)), Some(Number::Int(b))) => integer_op(op, a, b),
            (Some(a), Some(b)) => float_op(op, a.to_f64(), b.to_f64()),
            _ => Err(LiteralError::TypeMismatch {
                op: op.symbol(),
                left: left.type_name(),
                right: right.type_name(),
            }),
        },
    }
}

fn concat(mut a: Vec<Value>, b: Vec<Value>) -> Result<Vec<Value>, LiteralError> {
    if a.len() + b.len() > MAX_ITEMS {
        return Err(LiteralError::TooLarge);
    }
    a.extend(b);
    Ok(a)
}

fn repeat(sequence: Value, n: i64) -> Result<Value, LiteralError> {
    let n = usize::try_from(n).unwrap_or(0);
    let length = match &sequence {
        Value::Str(s) => s.len(),
        other => other.items().map_or(0, <[Value]>::len),
    };
    if length.saturating_mul(n) > MAX_ITEMS {
        return Err(LiteralError::TooLarge);
    }
    let repeated = |items: Vec<Value>| -> Vec<Value> {
        (0..n).flat_map(|_| items.iter().cloned()).collect()
    };
    Ok(match sequence {
        Value::Str(s) => Value::Str(s.repeat(n)),
        Value::Tuple(items) => Value::Tuple(repeated(items)),
        Value::List(items) => Value::List(repeated(items)),
        other => other,
    })
}

fn integer_op(op: BinOp, a: i64, b: i64) -> Result<Value, LiteralError> {
    let checked = |result: Option<i64>| result.map(Value::Int).ok_or(LiteralError::Overflow);
    match op {
        BinOp::Add => checked(a.checked_add(b)),
        BinOp::Sub => checked(a.checked_sub(b)),
        BinOp::Mul => checked(a.checked_mul(b)),
        BinOp::Div if b == 0 => Err(LiteralError::DivisionByZero),
        BinOp::Div => Ok(Value::Float(a as f64 / b as f64)),
        BinOp::FloorDiv | BinOp::Mod if b == 0 => Err(LiteralError::DivisionByZero),
        BinOp::FloorDiv => {
            let quotient = a.checked_div(b).ok_or(LiteralError::Overflow)?;
            // Rounds towards negative infinity.
            if a % b != 0 && (a < 0) != (b < 0) {
                checked(quotient.checked_sub(1))
            } else {
                Ok(Value::Int(quotient))
            }
        }
        BinOp::Mod => {
            let remainder = a.checked_rem(b).ok_or(LiteralError::Overflow)?;
            // Takes the sign of the divisor.
            if remainder != 0 && (remainder < 0) != (b < 0) {
                Ok(Value::Int(remainder + b))
            } else {
                Ok(Value::Int(remainder))
            }
        }
        BinOp::Pow if b >= 0 => {
            let exponent = u32::try_from(b).map_err(|_| LiteralError::Overflow)?;
            checked(a.checked_pow(exponent))
        }
        BinOp::Pow if a == 0 => Err(LiteralError::DivisionByZero),
        BinOp::Pow => Ok(Value::Float((a as f64).powf(b as f64))),
    }
}

fn float_op(op: BinOp, a: f64, b: f64) -> Result<Value, LiteralError> {
    let value = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div | BinOp::FloorDiv | BinOp::Mod if b == 0.0 => {
            return Err(LiteralError::DivisionByZero)
        }
        BinOp::Div => a / b,
        BinOp::FloorDiv => (a / b).floor(),
        BinOp::Mod => {
            let remainder = a % b;
            if remainder != 0.0 && (remainder < 0.0) != (b < 0.0) {
                remainder + b
            } else {
                remainder
            }
        }
        BinOp::Pow if a == 0.0 && b < 0.0 => return Err(LiteralError::DivisionByZero),
        BinOp::Pow => a.powf(b),
    };
    Ok(Value::Float(value))
}

fn equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::None, Value::None) => true,
        (Value::List(a), Value::List(b)) | (Value::Tuple(a), Value::Tuple(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| equals(x, y))
        }
        _ => match (number(left), number(right)) {
            (Some(Number::Int(a)), Some(Number::Int(b))) => a == b,
            (Some(a), Some(b)) => a.to_f64() == b.to_f64(),
            _ => false,
        },
    }
}

fn compare(op: CmpOp, left: &Value, right: &Value) -> Result<bool, LiteralError> {
    let ordering = match op {
        CmpOp::Equal => return Ok(equals(left, right)),
        CmpOp::NotEqual => return Ok(!equals(left, right)),
        _ => match (left, right, number(left), number(right)) {
            (Value::Str(a), Value::Str(b), _, _) => Some(a.cmp(b)),
            (_, _, Some(Number::Int(a)), Some(Number::Int(b))) => Some(a.cmp(&b)),
            (_, _, Some(a), Some(b)) => a.to_f64().partial_cmp(&b.to_f64()),
            _ => {
                return Err(LiteralError::TypeMismatch {
                    op: op.symbol(),
                    left: left.type_name(),
                    right: right.type_name(),
                })
            }
        },
    };
    // Comparisons with NaN are false.
    Ok(match (op, ordering) {
        (_, None) => false,
        (CmpOp::Less, Some(o)) => o == Ordering::Less,
        (CmpOp::LessEqual, Some(o)) => o != Ordering::Greater,
        (CmpOp::Greater, Some(o)) => o == Ordering::Greater,
        (CmpOp::GreaterEqual, Some(o)) => o != Ordering::Less,
        (CmpOp::Equal | CmpOp::NotEqual, Some(_)) => false,
    })
}

fn call(name: &str, arguments: Vec<Value>) -> Result<Value, LiteralError> {
    let single = |function: &'static str, arguments: Vec<Value>| -> Result<Value, LiteralError> {
        let found = arguments.len();
        let mut arguments = arguments.into_iter();
        match (arguments.next(), arguments.next()) {
            (Some(argument), None) => Ok(argument),
            _ => Err(LiteralError::Arity {
                function,
                expected: "exactly 1",
                found,
            }),
        }
    };
    match name {
        "range" => range(arguments),
        "float" => to_float(single("float", arguments)?),
        "int" => to_int(single("int", arguments)?),
        "abs" => {
            let argument = single("abs", arguments)?;
            match number(&argument) {
                Some(Number::Int(i)) => i.checked_abs().map(Value::Int).ok_or(LiteralError::Overflow),
                Some(Number::Float(f)) => Ok(Value::Float(f.abs())),
                None => Err(LiteralError::BadOperand {
                    op: "abs()",
                    operand: argument.type_name(),
                }),
            }
        }
        "len" => {
            let argument = single("len", arguments)?;
            let length = match &argument {
                Value::Str(s) => s.chars().count(),
                other => other
                    .items()
                    .ok_or(LiteralError::BadOperand {
                        op: "len()",
                        operand: other.type_name(),
                    })?
                    .len(),
            };
            Ok(Value::Int(length as i64))
        }
        _ => Err(LiteralError::UnknownName(name.to_string())),
    }
}

fn range(arguments: Vec<Value>) -> Result<Value, LiteralError> {
    let integers = arguments
        .iter()
        .map(|a| {
            a.as_i64().ok_or_else(|| LiteralError::Conversion {
                value: a.to_string(),
                target: "int",
            })
        })
        .collect::<Result<Vec<i64>, _>>()?;
    let (start, stop, step) = match integers[..] {
        [stop] => (0, stop, 1),
        [start, stop] => (start, stop, 1),
        [start, stop, step] => (start, stop, step),
        _ => {
            return Err(LiteralError::Arity {
                function: "range",
                expected: "1 to 3",
                found: integers.len(),
            })
        }
    };
    if step == 0 {
        return Err(LiteralError::ZeroStep);
    }

    let (start, stop, step) = (start as i128, stop as i128, step as i128);
    let count = if step > 0 && start < stop {
        (stop - start - 1) / step + 1
    } else if step < 0 && start > stop {
        (start - stop - 1) / -step + 1
    } else {
        0
    };
    if count > MAX_ITEMS as i128 {
        return Err(LiteralError::TooLarge);
    }
    Ok(Value::List(
        (0..count)
            .map(|i| Value::Int((start + i * step) as i64))
            .collect(),
    ))
}

fn to_float(value: Value) -> Result<Value, LiteralError> {
    if let Some(f) = value.as_f64() {
        return Ok(Value::Float(f));
    }
    value
        .as_str()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .map(Value::Float)
        .ok_or_else(|| LiteralError::Conversion {
            value: value.to_string(),
            target: "float",
        })
}

fn to_int(value: Value) -> Result<Value, LiteralError> {
    let conversion = || LiteralError::Conversion {
        value: value.to_string(),
        target: "int",
    };
    match (&value, number(&value)) {
        (_, Some(Number::Int(i))) => Ok(Value::Int(i)),
        (_, Some(Number::Float(f))) if f.is_finite() => {
            let truncated = f.trunc();
            if truncated < i64::MIN as f64 || truncated >= i64::MAX as f64 {
                Err(LiteralError::Overflow)
            } else {
                Ok(Value::Int(truncated as i64))
            }
        }
        (Value::Str(s), _) => s.trim().parse().map(Value::Int).map_err(|_| conversion()),
        _ => Err(conversion()),
    }
}
