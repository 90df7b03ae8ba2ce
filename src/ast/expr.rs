use serde::{Deserialize, Serialize};

use crate::ast::{
    ArithmeticOp, CompareModifier, CompareOp, FrameKind, LogicalOp, NodeId, OrderClause,
    QueryExpr, UnaryOp,
};

/// Kind of a literal as it was written in the script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiteralKind {
    Boolean,
    Number,
    DateTime,
    String,
    /// Hex literal (0x...)
    Binary,
    Uuid,
    /// Entity reference literal `{code:uuid}`
    Entity,
    Null,
}

/// A general expression node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Column (or enum value) reference resolved through the binding table
    Column(ColumnReference),
    /// Literal value
    Scalar(ScalarExpr),
    /// Script variable (@name)
    Variable(VariableReference),
    /// Member of an object variable (@msg.Body)
    Member(MemberAccess),
    /// Function call
    Function(FunctionExpr),
    /// CASE WHEN ... END
    Case(CaseExpr),
    /// Prefix operator (-x, NOT x)
    Unary { op: UnaryOp, expr: Box<Expr> },
    /// AND / OR
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// + - * / %
    Arithmetic {
        op: ArithmeticOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Comparison predicate
    Comparison(Box<Comparison>),
    /// Parenthesized expression
    Group(Box<Expr>),
    /// Value list for IN
    Values(Vec<Expr>),
    /// Scalar or EXISTS subquery
    Subquery(Box<QueryExpr>),
    /// All columns (*)
    Star,
}

impl Expr {
    pub fn group(expr: Expr) -> Self {
        Expr::Group(Box::new(expr))
    }

    pub fn and(left: Expr, right: Expr) -> Self {
        Expr::Logical {
            op: LogicalOp::And,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn compare(op: CompareOp, left: Expr, right: Expr) -> Self {
        Expr::Comparison(Box::new(Comparison {
            op,
            modifier: None,
            left,
            right,
        }))
    }

    pub fn eq(left: Expr, right: Expr) -> Self {
        Self::compare(CompareOp::Eq, left, right)
    }
}

/// Reference to a column, enum value or computed column by its script identifier.
///
/// The identifier is kept as written (`Alias.Column` or `Column`); the physical
/// column names come from the mapping recorded for `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnReference {
    pub id: NodeId,
    pub identifier: String,
}

impl ColumnReference {
    /// Split `Alias.Column` into its table qualifier and column name.
    pub fn parts(&self) -> (Option<&str>, &str) {
        split_identifier(&self.identifier)
    }

    pub fn column_name(&self) -> &str {
        self.parts().1
    }
}

/// Split a dotted identifier at its last dot.
pub fn split_identifier(identifier: &str) -> (Option<&str>, &str) {
    match identifier.rsplit_once('.') {
        Some((table, column)) => (Some(table), column),
        None => (None, identifier),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarExpr {
    pub kind: LiteralKind,
    pub literal: String,
}

impl ScalarExpr {
    pub fn new(kind: LiteralKind, literal: impl Into<String>) -> Self {
        Self {
            kind,
            literal: literal.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableReference {
    pub id: NodeId,
    pub identifier: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberAccess {
    pub id: NodeId,
    pub variable: String,
    pub member: String,
}

impl MemberAccess {
    /// Database parameter name carrying the member value (`@msg_Body`).
    pub fn parameter_name(&self) -> String {
        let variable = if self.variable.starts_with('@') {
            self.variable.clone()
        } else {
            format!("@{}", self.variable)
        };
        format!("{}_{}", variable, self.member)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionExpr {
    pub id: NodeId,
    pub name: String,
    #[serde(default)]
    pub args: Vec<Expr>,
    /// COUNT(DISTINCT ...)
    #[serde(default)]
    pub distinct: bool,
    #[serde(default)]
    pub over: Option<OverClause>,
}

impl FunctionExpr {
    pub fn upper_name(&self) -> String {
        self.name.to_uppercase()
    }

    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Window specification for analytic functions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverClause {
    #[serde(default)]
    pub partition: Vec<Expr>,
    #[serde(default)]
    pub order: Option<OrderClause>,
    #[serde(default)]
    pub frame: Option<WindowFrame>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowFrame {
    pub kind: FrameKind,
    pub preceding: Option<FrameBound>,
    #[serde(default)]
    pub following: Option<FrameBound>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameBound {
    UnboundedPreceding,
    Preceding(u32),
    CurrentRow,
    Following(u32),
    UnboundedFollowing,
}

impl std::fmt::Display for FrameBound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameBound::UnboundedPreceding => write!(f, "UNBOUNDED PRECEDING"),
            FrameBound::Preceding(n) => write!(f, "{} PRECEDING", n),
            FrameBound::CurrentRow => write!(f, "CURRENT ROW"),
            FrameBound::Following(n) => write!(f, "{} FOLLOWING", n),
            FrameBound::UnboundedFollowing => write!(f, "UNBOUNDED FOLLOWING"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseExpr {
    pub branches: Vec<WhenClause>,
    #[serde(default)]
    pub otherwise: Option<Box<Expr>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhenClause {
    pub when: Expr,
    pub then: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub op: CompareOp,
    #[serde(default)]
    pub modifier: Option<CompareModifier>,
    pub left: Expr,
    pub right: Expr,
}
