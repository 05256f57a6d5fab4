//! Axiomatic memory models: named relations over events and axioms on them.
//!
//! Relation expressions can be built directly or parsed from a small
//! cat-like syntax:
//!
//! ```text
//! expr    := diff ('|' diff)*
//! diff    := inter ('\' inter)*
//! inter   := seq ('&' seq)*
//! seq     := postfix (';' postfix)*
//! postfix := primary ('+' | '*' | '?' | '^-1')*
//! primary := name | '(' expr ')' | '[' SET ']' | SET '*' SET
//! SET     := R | W | M | IW
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Relations every model can refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BaseRelation {
    /// Program order (transitive, within one thread).
    Po,
    Rf,
    Co,
    Fr,
    /// Same variable.
    Loc,
    /// Same thread.
    Int,
    /// Different threads.
    Ext,
    Id,
}

impl BaseRelation {
    pub const ALL: [BaseRelation; 8] = [
        BaseRelation::Po,
        BaseRelation::Rf,
        BaseRelation::Co,
        BaseRelation::Fr,
        BaseRelation::Loc,
        BaseRelation::Int,
        BaseRelation::Ext,
        BaseRelation::Id,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BaseRelation::Po => "po",
            BaseRelation::Rf => "rf",
            BaseRelation::Co => "co",
            BaseRelation::Fr => "fr",
            BaseRelation::Loc => "loc",
            BaseRelation::Int => "int",
            BaseRelation::Ext => "ext",
            BaseRelation::Id => "id",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.name() == name)
    }
}

/// Sets of events used in products and identity restrictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventSet {
    Reads,
    Writes,
    /// All memory events.
    Memory,
    InitWrites,
}

impl EventSet {
    pub fn name(self) -> &'static str {
        match self {
            EventSet::Reads => "R",
            EventSet::Writes => "W",
            EventSet::Memory => "M",
            EventSet::InitWrites => "IW",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "R" => Some(EventSet::Reads),
            "W" => Some(EventSet::Writes),
            "M" => Some(EventSet::Memory),
            "IW" => Some(EventSet::InitWrites),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RelExpr {
    Base(BaseRelation),
    Product(EventSet, EventSet),
    Identity(EventSet),
    Union(Box<RelExpr>, Box<RelExpr>),
    Inter(Box<RelExpr>, Box<RelExpr>),
    Diff(Box<RelExpr>, Box<RelExpr>),
    Seq(Box<RelExpr>, Box<RelExpr>),
    Inverse(Box<RelExpr>),
    Plus(Box<RelExpr>),
    Star(Box<RelExpr>),
    Optional(Box<RelExpr>),
    Named(String),
}

impl RelExpr {
    pub fn base(rel: BaseRelation) -> Self {
        RelExpr::Base(rel)
    }

    pub fn named(name: impl Into<String>) -> Self {
        RelExpr::Named(name.into())
    }

    pub fn union(self, other: RelExpr) -> Self {
        RelExpr::Union(Box::new(self), Box::new(other))
    }

    pub fn inter(self, other: RelExpr) -> Self {
        RelExpr::Inter(Box::new(self), Box::new(other))
    }

    pub fn diff(self, other: RelExpr) -> Self {
        RelExpr::Diff(Box::new(self), Box::new(other))
    }

    pub fn seq(self, other: RelExpr) -> Self {
        RelExpr::Seq(Box::new(self), Box::new(other))
    }

    pub fn inverse(self) -> Self {
        RelExpr::Inverse(Box::new(self))
    }

    pub fn plus(self) -> Self {
        RelExpr::Plus(Box::new(self))
    }

    pub fn star(self) -> Self {
        RelExpr::Star(Box::new(self))
    }

    pub fn optional(self) -> Self {
        RelExpr::Optional(Box::new(self))
    }

    /// Left-nested union of `parts`; `None` when empty.
    pub fn union_all(parts: impl IntoIterator<Item = RelExpr>) -> Option<Self> {
        parts.into_iter().reduce(RelExpr::union)
    }

    /// Names of the relations this expression refers to.
    pub fn references(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references(&self, out: &mut BTreeSet<String>) {
        match self {
            RelExpr::Base(_) | RelExpr::Product(_, _) | RelExpr::Identity(_) => {}
            RelExpr::Named(name) => {
                out.insert(name.clone());
            }
            RelExpr::Union(a, b)
            | RelExpr::Inter(a, b)
            | RelExpr::Diff(a, b)
            | RelExpr::Seq(a, b) => {
                a.collect_references(out);
                b.collect_references(out);
            }
            RelExpr::Inverse(a) | RelExpr::Plus(a) | RelExpr::Star(a) | RelExpr::Optional(a) => {
                a.collect_references(out)
            }
        }
    }

    fn is_atomic(&self) -> bool {
        matches!(
            self,
            RelExpr::Base(_) | RelExpr::Named(_) | RelExpr::Identity(_)
        )
    }
}

impl fmt::Display for RelExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let postfix = |f: &mut fmt::Formatter<'_>, inner: &RelExpr, op: &str| {
            if inner.is_atomic() {
                write!(f, "{inner}{op}")
            } else {
                write!(f, "({inner}){op}")
            }
        };
        match self {
            RelExpr::Base(b) => write!(f, "{}", b.name()),
            RelExpr::Named(n) => write!(f, "{n}"),
            RelExpr::Product(a, b) => write!(f, "{} * {}", a.name(), b.name()),
            RelExpr::Identity(s) => write!(f, "[{}]", s.name()),
            RelExpr::Union(a, b) => write!(f, "({a} | {b})"),
            RelExpr::Inter(a, b) => write!(f, "({a} & {b})"),
            RelExpr::Diff(a, b) => write!(f, "({a} \\ {b})"),
            RelExpr::Seq(a, b) => write!(f, "({a} ; {b})"),
            RelExpr::Inverse(a) => postfix(f, a, "^-1"),
            RelExpr::Plus(a) => postfix(f, a, "+"),
            RelExpr::Star(a) => postfix(f, a, "*"),
            RelExpr::Optional(a) => postfix(f, a, "?"),
        }
    }
}

impl FromStr for RelExpr {
    type Err = McmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens = tokenize(s)?;
        let mut parser = Parser {
            input: s,
            tokens,
            pos: 0,
        };
        let expr = parser.expr()?;
        match parser.peek() {
            None => Ok(expr),
            Some(tok) => Err(parser.error(format!("unexpected '{tok}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Sym(&'static str),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "{s}"),
            Token::Sym(s) => write!(f, "{s}"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, McmError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();
    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c.is_ascii_alphabetic() || c == '_' {
            let mut end = start;
            while let Some(&(i, c)) = chars.peek() {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' {
                    end = i + c.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Ident(input[start..end].to_string()));
            continue;
        }
        chars.next();
        let sym = match c {
            '|' => "|",
            '&' => "&",
            '\\' => "\\",
            ';' => ";",
            '+' => "+",
            '*' => "*",
            '?' => "?",
            '(' => "(",
            ')' => ")",
            '[' => "[",
            ']' => "]",
            '^' => {
                let minus = chars.next().map(|(_, c)| c);
                let one = chars.next().map(|(_, c)| c);
                if minus != Some('-') || one != Some('1') {
                    return Err(McmError::Parse {
                        input: input.to_string(),
                        message: "expected '^-1'".to_string(),
                    });
                }
                "^-1"
            }
            other => {
                return Err(McmError::Parse {
                    input: input.to_string(),
                    message: format!("unexpected character '{other}'"),
                });
            }
        };
        tokens.push(Token::Sym(sym));
    }
    Ok(tokens)
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_sym(&self, sym: &str) -> bool {
        matches!(self.peek(), Some(Token::Sym(s)) if *s == sym)
    }

    fn eat(&mut self, sym: &str) -> bool {
        if self.peek_sym(sym) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, sym: &str) -> Result<(), McmError> {
        if self.eat(sym) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{sym}'")))
        }
    }

    fn error(&self, message: String) -> McmError {
        McmError::Parse {
            input: self.input.to_string(),
            message,
        }
    }

    fn binary(
        &mut self,
        op: &str,
        next: fn(&mut Self) -> Result<RelExpr, McmError>,
        build: fn(RelExpr, RelExpr) -> RelExpr,
    ) -> Result<RelExpr, McmError> {
        let mut lhs = next(self)?;
        while self.eat(op) {
            lhs = build(lhs, next(self)?);
        }
        Ok(lhs)
    }

    fn expr(&mut self) -> Result<RelExpr, McmError> {
        self.binary("|", Self::diff, RelExpr::union)
    }

    fn diff(&mut self) -> Result<RelExpr, McmError> {
        self.binary("\\", Self::inter, RelExpr::diff)
    }

    fn inter(&mut self) -> Result<RelExpr, McmError> {
        self.binary("&", Self::seq, RelExpr::inter)
    }

    fn seq(&mut self) -> Result<RelExpr, McmError> {
        self.binary(";", Self::postfix, RelExpr::seq)
    }

    fn postfix(&mut self) -> Result<RelExpr, McmError> {
        let mut expr = self.primary()?;
        loop {
            expr = if self.eat("+") {
                expr.plus()
            } else if self.eat("*") {
                expr.star()
            } else if self.eat("?") {
                expr.optional()
            } else if self.eat("^-1") {
                expr.inverse()
            } else {
                return Ok(expr);
            };
        }
    }

    fn set(&mut self) -> Result<EventSet, McmError> {
        match self.peek().cloned() {
            Some(Token::Ident(name)) => match EventSet::from_name(&name) {
                Some(set) => {
                    self.pos += 1;
                    Ok(set)
                }
                None => Err(self.error(format!("'{name}' is not an event set"))),
            },
            _ => Err(self.error("expected an event set".to_string())),
        }
    }

    fn primary(&mut self) -> Result<RelExpr, McmError> {
        if self.eat("(") {
            let inner = self.expr()?;
            self.expect(")")?;
            return Ok(inner);
        }
        if self.eat("[") {
            let set = self.set()?;
            self.expect("]")?;
            return Ok(RelExpr::Identity(set));
        }
        let Some(Token::Ident(name)) = self.peek().cloned() else {
            return Err(match self.peek() {
                Some(tok) => self.error(format!("unexpected '{tok}'")),
                None => self.error("unexpected end of input".to_string()),
            });
        };
        if let Some(lhs) = EventSet::from_name(&name) {
            self.pos += 1;
            self.expect("*")?;
            let rhs = self.set()?;
            return Ok(RelExpr::Product(lhs, rhs));
        }
        self.pos += 1;
        Ok(match BaseRelation::from_name(&name) {
            Some(base) => RelExpr::Base(base),
            None => RelExpr::Named(name),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxiomKind {
    Acyclic,
    Irreflexive,
    Empty,
}

impl fmt::Display for AxiomKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxiomKind::Acyclic => write!(f, "acyclic"),
            AxiomKind::Irreflexive => write!(f, "irreflexive"),
            AxiomKind::Empty => write!(f, "empty"),
        }
    }
}

impl FromStr for AxiomKind {
    type Err = McmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "acyclic" => Ok(AxiomKind::Acyclic),
            "irreflexive" => Ok(AxiomKind::Irreflexive),
            "empty" => Ok(AxiomKind::Empty),
            other => Err(McmError::Parse {
                input: other.to_string(),
                message: "expected acyclic, irreflexive or empty".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Axiom {
    pub name: String,
    pub kind: AxiomKind,
    pub rel: RelExpr,
}

impl Axiom {
    pub fn new(name: impl Into<String>, kind: AxiomKind, rel: RelExpr) -> Self {
        Self {
            name: name.into(),
            kind,
            rel,
        }
    }

    pub fn acyclic(name: impl Into<String>, rel: RelExpr) -> Self {
        Self::new(name, AxiomKind::Acyclic, rel)
    }

    pub fn irreflexive(name: impl Into<String>, rel: RelExpr) -> Self {
        Self::new(name, AxiomKind::Irreflexive, rel)
    }

    pub fn empty(name: impl Into<String>, rel: RelExpr) -> Self {
        Self::new(name, AxiomKind::Empty, rel)
    }
}

impl fmt::Display for Axiom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} as {}", self.kind, self.rel, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum McmError {
    /// A relation name is neither a base relation nor defined by the model.
    UnknownRelation {
        name: String,
        referenced_from: String,
    },
    /// A relation is defined in terms of itself.
    RecursiveRelation(String),
    /// A relation is defined twice, or shadows a base relation.
    DuplicateRelation(String),
    Parse { input: String, message: String },
}

impl fmt::Display for McmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            McmError::UnknownRelation {
                name,
                referenced_from,
            } => write!(f, "unknown relation '{name}' referenced from '{referenced_from}'"),
            McmError::RecursiveRelation(name) => {
                write!(f, "relation '{name}' is defined in terms of itself")
            }
            McmError::DuplicateRelation(name) => write!(f, "relation '{name}' is defined twice"),
            McmError::Parse { input, message } => {
                write!(f, "cannot parse relation '{input}': {message}")
            }
        }
    }
}

impl std::error::Error for McmError {}

/// A memory model: named relation definitions plus axioms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mcm {
    name: String,
    relations: Vec<(String, RelExpr)>,
    axioms: Vec<Axiom>,
}

impl Mcm {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            relations: Vec::new(),
            axioms: Vec::new(),
        }
    }

    pub fn with_relation(mut self, name: impl Into<String>, rel: RelExpr) -> Self {
        self.define(name, rel);
        self
    }

    pub fn with_axiom(mut self, axiom: Axiom) -> Self {
        self.axioms.push(axiom);
        self
    }

    pub fn define(&mut self, name: impl Into<String>, rel: RelExpr) {
        self.relations.push((name.into(), rel));
    }

    pub fn add_axiom(&mut self, axiom: Axiom) {
        self.axioms.push(axiom);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn relations(&self) -> &[(String, RelExpr)] {
        &self.relations
    }

    pub fn axioms(&self) -> &[Axiom] {
        &self.axioms
    }

    pub fn relation(&self, name: &str) -> Option<&RelExpr> {
        self.relations
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, rel)| rel)
    }

    /// Check that every referenced name is defined, no name is defined
    /// twice, and definitions are not recursive. A model without axioms is
    /// valid and allows every execution.
    pub fn validate(&self) -> Result<(), McmError> {
        let mut defs: BTreeMap<&str, &RelExpr> = BTreeMap::new();
        for (name, rel) in &self.relations {
            if BaseRelation::from_name(name).is_some() || defs.insert(name.as_str(), rel).is_some() {
                return Err(McmError::DuplicateRelation(name.clone()));
            }
        }

        let check_refs = |rel: &RelExpr, from: &str| -> Result<(), McmError> {
            match rel.references().into_iter().find(|r| !defs.contains_key(r.as_str())) {
                Some(name) => Err(McmError::UnknownRelation {
                    name,
                    referenced_from: from.to_string(),
                }),
                None => Ok(()),
            }
        };
        for (name, rel) in &self.relations {
            check_refs(rel, name)?;
        }
        for axiom in &self.axioms {
            check_refs(&axiom.rel, &axiom.name)?;
        }

        let mut done = BTreeSet::new();
        for (name, _) in &self.relations {
            let mut on_path = Vec::new();
            visit(name, &defs, &mut on_path, &mut done)?;
        }
        Ok(())
    }
}

fn visit<'a>(
    name: &'a str,
    defs: &BTreeMap<&'a str, &'a RelExpr>,
    on_path: &mut Vec<&'a str>,
    done: &mut BTreeSet<&'a str>,
) -> Result<(), McmError> {
    if done.contains(name) {
        return Ok(());
    }
    if on_path.contains(&name) {
        return Err(McmError::RecursiveRelation(name.to_string()));
    }
    let Some((&key, &rel)) = defs.get_key_value(name) else {
        return Ok(());
    };
    on_path.push(key);
    for next in rel.references() {
        if let Some((&next_key, _)) = defs.get_key_value(next.as_str()) {
            visit(next_key, defs, on_path, done)?;
        }
    }
    on_path.pop();
    done.insert(key);
    Ok(())
}

impl fmt::Display for Mcm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\"{}\"", self.name)?;
        for (name, rel) in &self.relations {
            writeln!(f, "let {name} = {rel}")?;
        }
        for axiom in &self.axioms {
            writeln!(f, "{axiom}")?;
        }
        Ok(())
    }
}
