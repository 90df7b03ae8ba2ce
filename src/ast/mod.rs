pub mod builders;
pub mod expr;
pub mod operators;
pub mod query;
pub mod stmt;
pub mod visit;

use serde::{Deserialize, Serialize};

use crate::binding::Bindings;

pub use self::builders::ModelBuilder;
pub use self::expr::{
    CaseExpr, ColumnReference, Comparison, Expr, FrameBound, FunctionExpr, LiteralKind,
    MemberAccess, OverClause, ScalarExpr, VariableReference, WhenClause, WindowFrame,
    split_identifier,
};
pub use self::operators::{
    ArithmeticOp, CompareModifier, CompareOp, FrameKind, JoinKind, LogicalOp, UnaryOp,
};
pub use self::query::{
    ColumnExpr, Cte, OrderClause, OrderItem, QueryExpr, SelectExpr, TableExpression, TableJoin,
    TableReference, TableSource, UnionExpr,
};
pub use self::stmt::{
    ApplySequenceStatement, ConsumeStatement, CreateSequenceStatement, CreateTypeStatement,
    DeclareStatement, DeleteStatement, DropSequenceStatement, InsertSource, InsertStatement,
    OutputClause, RevokeSequenceStatement, SelectStatement, SetExpr, Statement,
    TableVariableStatement, TypeColumn, TypeIdentifier, UpdateStatement, UpsertStatement,
};

/// Stable handle of a syntax node, assigned by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A parsed and resolved script: statements plus their binding side table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptModel {
    pub statements: Vec<Statement>,
    #[serde(default)]
    pub bindings: Bindings,
}

impl ScriptModel {
    pub fn new(statements: Vec<Statement>, bindings: Bindings) -> Self {
        Self {
            statements,
            bindings,
        }
    }
}
