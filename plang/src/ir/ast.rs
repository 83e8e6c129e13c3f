//! Policy syntax tree produced by the parser.
//!
//! Every node owns its children and remembers the position of the token that
//! started it. Nothing here is mutated after parsing.

use std::fmt;

use crate::span::{Span, Spanned};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Program,
    PolicyDecl,
    RuleDecl,
    RuleRef,
    ConditionBlock,
    ActionBlock,
    RouteTarget,
    Priority,
    Import,
    BinaryOp,
    UnaryOp,
    Literal,
    Ident,
    AttrAccess,
    FuncCall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Safety,
    Privacy,
    Operational,
    Routing,
    Custom,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Safety,
        Category::Privacy,
        Category::Operational,
        Category::Routing,
        Category::Custom,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Safety => "safety",
            Self::Privacy => "privacy",
            Self::Operational => "operational",
            Self::Routing => "routing",
            Self::Custom => "custom",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Deny,
    Allow,
    Escalate,
    Route,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Deny, Action::Allow, Action::Escalate, Action::Route];

    pub fn name(self) -> &'static str {
        match self {
            Self::Deny => "deny",
            Self::Allow => "allow",
            Self::Escalate => "escalate",
            Self::Route => "route",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Statement>,
    pub span: Span,
}

impl Program {
    pub fn policies(&self) -> impl Iterator<Item = &PolicyDecl> {
        self.statements.iter().filter_map(|s| match s {
            Statement::Policy(p) => Some(p),
            _ => None,
        })
    }

    /// Top-level rule declarations only; rules nested in policies are not included.
    pub fn rules(&self) -> impl Iterator<Item = &RuleDecl> {
        self.statements.iter().filter_map(|s| match s {
            Statement::Rule(r) => Some(r),
            _ => None,
        })
    }

    pub fn imports(&self) -> impl Iterator<Item = &Import> {
        self.statements.iter().filter_map(|s| match s {
            Statement::Import(i) => Some(i),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Policy(PolicyDecl),
    Rule(RuleDecl),
    Import(Import),
}

impl Statement {
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Policy(_) => NodeKind::PolicyDecl,
            Self::Rule(_) => NodeKind::RuleDecl,
            Self::Import(_) => NodeKind::Import,
        }
    }
}

/// policy name : category { ... }
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyDecl {
    pub name: String,
    pub category: Category,
    pub body: Vec<PolicyItem>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PolicyItem {
    RuleRef(RuleRef),
    Rule(RuleDecl),
    Condition(ConditionBlock),
    Action(ActionBlock),
    Priority(Priority),
}

impl PolicyItem {
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::RuleRef(_) => NodeKind::RuleRef,
            Self::Rule(_) => NodeKind::RuleDecl,
            Self::Condition(_) => NodeKind::ConditionBlock,
            Self::Action(_) => NodeKind::ActionBlock,
            Self::Priority(_) => NodeKind::Priority,
        }
    }
}

/// rule name : category { ... }
#[derive(Debug, Clone, PartialEq)]
pub struct RuleDecl {
    pub name: String,
    pub category: Category,
    pub body: Vec<RuleItem>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuleItem {
    Priority(Priority),
    Condition(ConditionBlock),
    Action(ActionBlock),
}

impl RuleItem {
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Priority(_) => NodeKind::Priority,
            Self::Condition(_) => NodeKind::ConditionBlock,
            Self::Action(_) => NodeKind::ActionBlock,
        }
    }
}

/// Names a rule declared elsewhere; never resolved here.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleRef {
    pub name: String,
    pub span: Span,
}

/// when <condition> then <action>
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionBlock {
    pub condition: Expr,
    pub action: ActionBlock,
    pub span: Span,
}

/// The outcome of an action block. Only `Route` can carry a target.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Deny,
    Allow,
    Escalate,
    Route(RouteTarget),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionBlock {
    pub verdict: Verdict,
    pub span: Span,
}

impl ActionBlock {
    pub fn action(&self) -> Action {
        match self.verdict {
            Verdict::Deny => Action::Deny,
            Verdict::Allow => Action::Allow,
            Verdict::Escalate => Action::Escalate,
            Verdict::Route(_) => Action::Route,
        }
    }

    pub fn target(&self) -> Option<&RouteTarget> {
        match &self.verdict {
            Verdict::Route(target) => Some(target),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteTarget {
    pub target: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Priority {
    pub value: i64,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub path: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// a and b, a or b, a > b
    BinaryOp {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// not a
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
    Literal(Literal),
    Ident(String),
    /// request.cost
    AttrAccess {
        object: Box<Expr>,
        attr: String,
    },
    /// flagged(request)
    FuncCall {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn node_kind(&self) -> NodeKind {
        match self.kind {
            ExprKind::BinaryOp { .. } => NodeKind::BinaryOp,
            ExprKind::UnaryOp { .. } => NodeKind::UnaryOp,
            ExprKind::Literal(_) => NodeKind::Literal,
            ExprKind::Ident(_) => NodeKind::Ident,
            ExprKind::AttrAccess { .. } => NodeKind::AttrAccess,
            ExprKind::FuncCall { .. } => NodeKind::FuncCall,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    And, // and
    Or,  // or
    Eq,  // ==
    Ne,  // !=
    Lt,  // <
    Gt,  // >
    Le,  // <=
    Ge,  // >=
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Not,
}

macro_rules! spanned {
    ($($node:ty),* $(,)?) => {
        $(impl Spanned for $node {
            fn span(&self) -> Span {
                self.span
            }
        })*
    };
}

spanned!(
    Program, PolicyDecl, RuleDecl, RuleRef, ConditionBlock, ActionBlock, RouteTarget,
    Priority, Import, Expr,
);

impl Spanned for Statement {
    fn span(&self) -> Span {
        match self {
            Self::Policy(p) => p.span,
            Self::Rule(r) => r.span,
            Self::Import(i) => i.span,
        }
    }
}

impl Spanned for PolicyItem {
    fn span(&self) -> Span {
        match self {
            Self::RuleRef(r) => r.span,
            Self::Rule(r) => r.span,
            Self::Condition(c) => c.span,
            Self::Action(a) => a.span,
            Self::Priority(p) => p.span,
        }
    }
}

impl Spanned for RuleItem {
    fn span(&self) -> Span {
        match self {
            Self::Priority(p) => p.span,
            Self::Condition(c) => c.span,
            Self::Action(a) => a.span,
        }
    }
}

// Canonical PLang rendering. Expressions are fully parenthesized so the
// printed tree parses back to the same shape.

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            // whole floats keep their dot so they lex back as floats
            Self::Float(x) if x.fract() == 0.0 => write!(f, "{x}.0"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Str(s) => write_quoted(f, s),
        }
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            '\0' => f.write_str("\\0")?,
            c => write!(f, "{c}")?,
        }
    }
    f.write_str("\"")
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::BinaryOp { op, left, right } => {
                write!(f, "({left} {} {right})", op.symbol())
            }
            ExprKind::UnaryOp { operand, .. } => write!(f, "(not {operand})"),
            ExprKind::Literal(lit) => write!(f, "{lit}"),
            ExprKind::Ident(name) => f.write_str(name),
            ExprKind::AttrAccess { object, attr } => write!(f, "{object}.{attr}"),
            ExprKind::FuncCall { callee, args } => {
                write!(f, "{callee}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
        }
    }
}

impl fmt::Display for ActionBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target() {
            Some(target) => write!(f, "route to {}", target.target),
            None => f.write_str(self.action().name()),
        }
    }
}

impl fmt::Display for ConditionBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "when {} then {}", self.condition, self.action)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "priority {}", self.value)
    }
}

impl fmt::Display for RuleItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Priority(p) => write!(f, "{p}"),
            Self::Condition(c) => write!(f, "{c}"),
            Self::Action(a) => write!(f, "{a}"),
        }
    }
}

impl fmt::Display for RuleDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "rule {} : {} {{", self.name, self.category)?;
        for item in &self.body {
            writeln!(f, "    {item}")?;
        }
        f.write_str("}")
    }
}

impl fmt::Display for PolicyDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "policy {} : {} {{", self.name, self.category)?;
        for item in &self.body {
            match item {
                PolicyItem::RuleRef(r) => writeln!(f, "    rule {}", r.name)?,
                // nested rules are indented one extra level
                PolicyItem::Rule(r) => {
                    for line in r.to_string().lines() {
                        writeln!(f, "    {line}")?;
                    }
                }
                PolicyItem::Condition(c) => writeln!(f, "    {c}")?,
                PolicyItem::Action(a) => writeln!(f, "    {a}")?,
                PolicyItem::Priority(p) => writeln!(f, "    {p}")?,
            }
        }
        f.write_str("}")
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Policy(p) => write!(f, "{p}"),
            Self::Rule(r) => write!(f, "{r}"),
            Self::Import(i) => {
                f.write_str("import ")?;
                write_quoted(f, &i.path)
            }
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for statement in &self.statements {
            writeln!(f, "{statement}")?;
        }
        Ok(())
    }
}
