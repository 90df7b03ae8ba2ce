use serde::{Deserialize, Serialize};

use crate::ast::{
    ColumnExpr, ColumnReference, Cte, Expr, NodeId, OrderClause, QueryExpr, TableExpression,
    TableReference, TableSource,
};

/// Top-level statements of a script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    /// Variable or parameter declaration; produces no SQL text
    Declare(DeclareStatement),
    Select(SelectStatement),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
    Upsert(UpsertStatement),
    Consume(ConsumeStatement),
    /// Materialize a query into a table variable
    TableVariable(TableVariableStatement),
    /// Materialize a query into a temporary table
    TemporaryTable(TableVariableStatement),
    CreateType(CreateTypeStatement),
    CreateSequence(CreateSequenceStatement),
    DropSequence(DropSequenceStatement),
    ApplySequence(ApplySequenceStatement),
    RevokeSequence(RevokeSequenceStatement),
}

impl Statement {
    pub fn id(&self) -> NodeId {
        match self {
            Statement::Declare(s) => s.id,
            Statement::Select(s) => s.id,
            Statement::Insert(s) => s.id,
            Statement::Update(s) => s.id,
            Statement::Delete(s) => s.id,
            Statement::Upsert(s) => s.id,
            Statement::Consume(s) => s.id,
            Statement::TableVariable(s) | Statement::TemporaryTable(s) => s.id,
            Statement::CreateType(s) => s.id,
            Statement::CreateSequence(s) => s.id,
            Statement::DropSequence(s) => s.id,
            Statement::ApplySequence(s) => s.id,
            Statement::RevokeSequence(s) => s.id,
        }
    }

    /// Short keyword used in logs and the CLI.
    pub fn keyword(&self) -> &'static str {
        match self {
            Statement::Declare(_) => "DECLARE",
            Statement::Select(_) => "SELECT",
            Statement::Insert(_) => "INSERT",
            Statement::Update(_) => "UPDATE",
            Statement::Delete(_) => "DELETE",
            Statement::Upsert(_) => "UPSERT",
            Statement::Consume(_) => "CONSUME",
            Statement::TableVariable(_) => "TABLE VARIABLE",
            Statement::TemporaryTable(_) => "TEMPORARY TABLE",
            Statement::CreateType(_) => "CREATE TYPE",
            Statement::CreateSequence(_) => "CREATE SEQUENCE",
            Statement::DropSequence(_) => "DROP SEQUENCE",
            Statement::ApplySequence(_) => "APPLY SEQUENCE",
            Statement::RevokeSequence(_) => "REVOKE SEQUENCE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclareStatement {
    pub id: NodeId,
    pub name: String,
    #[serde(default)]
    pub type_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectStatement {
    pub id: NodeId,
    #[serde(default)]
    pub ctes: Vec<Cte>,
    pub query: QueryExpr,
}

/// Row source of an INSERT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InsertSource {
    /// CTE, table variable or temporary table
    Table(TableReference),
    /// `(SELECT ...) AS alias`
    Derived(TableExpression),
    /// Bare query, wrapped as `(...) AS source` on emission
    Query(QueryExpr),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertStatement {
    pub id: NodeId,
    #[serde(default)]
    pub ctes: Vec<Cte>,
    pub target: TableReference,
    pub source: InsertSource,
}

/// `column = initializer` inside SET.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetExpr {
    pub column: ColumnReference,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputClause {
    pub columns: Vec<ColumnExpr>,
    /// OUTPUT ... INTO table variable
    #[serde(default)]
    pub into: Option<TableReference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateStatement {
    pub id: NodeId,
    #[serde(default)]
    pub ctes: Vec<Cte>,
    pub target: TableReference,
    pub set: Vec<SetExpr>,
    #[serde(default)]
    pub output: Option<OutputClause>,
    #[serde(default)]
    pub source: Option<TableSource>,
    #[serde(default, rename = "where")]
    pub where_: Option<Expr>,
    /// Table hints (UPDLOCK, SERIALIZABLE)
    #[serde(default)]
    pub hints: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteStatement {
    pub id: NodeId,
    #[serde(default)]
    pub ctes: Vec<Cte>,
    pub target: TableReference,
    #[serde(default)]
    pub output: Option<OutputClause>,
    /// Extra row sources (FROM on MS-SQL, USING on PostgreSQL)
    #[serde(default)]
    pub source: Option<TableSource>,
    #[serde(default, rename = "where")]
    pub where_: Option<Expr>,
}

/// Insert-or-update against `target` keyed by `where_`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpsertStatement {
    pub id: NodeId,
    #[serde(default)]
    pub ctes: Vec<Cte>,
    pub target: TableReference,
    #[serde(default)]
    pub source: Option<TableSource>,
    #[serde(default)]
    pub set: Vec<SetExpr>,
    #[serde(default, rename = "where")]
    pub where_: Option<Expr>,
    /// UPSERT IGNORE UPDATE: insert missing rows only
    #[serde(default)]
    pub ignore_update: bool,
}

/// Destructive read: select up to `top` rows, delete them, return the projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumeStatement {
    pub id: NodeId,
    #[serde(default)]
    pub top: Option<Expr>,
    pub columns: Vec<ColumnExpr>,
    #[serde(default)]
    pub into: Option<TableReference>,
    pub from: Option<TableSource>,
    #[serde(default, rename = "where")]
    pub where_: Option<Expr>,
    #[serde(default)]
    pub order: Option<OrderClause>,
    /// Blocking row locks preserving a total order across consumers
    #[serde(default)]
    pub strict_order: bool,
    /// Stream processor target; such statements produce no SQL
    #[serde(default)]
    pub target: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableVariableStatement {
    pub id: NodeId,
    pub name: String,
    pub query: QueryExpr,
}

/// Declared column of an ephemeral table type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeColumn {
    pub name: String,
    pub data_type: TypeIdentifier,
}

/// Type name with its qualifiers, e.g. `number(10,2)` or `string(50)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeIdentifier {
    pub id: NodeId,
    pub identifier: String,
    #[serde(default)]
    pub qualifier1: u32,
    #[serde(default)]
    pub qualifier2: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTypeStatement {
    pub id: NodeId,
    pub name: String,
    pub columns: Vec<TypeColumn>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSequenceStatement {
    pub id: NodeId,
    pub name: String,
    #[serde(default)]
    pub data_type: Option<TypeIdentifier>,
    #[serde(default = "default_one")]
    pub start_with: i64,
    #[serde(default = "default_one")]
    pub increment: i64,
    #[serde(default)]
    pub cache_size: i64,
}

fn default_one() -> i64 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropSequenceStatement {
    pub id: NodeId,
    pub name: String,
}

/// Bind a sequence to a table column through an insert trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplySequenceStatement {
    pub id: NodeId,
    pub name: String,
    pub table: TableReference,
    pub column: ColumnReference,
    /// Renumber existing rows in index order
    #[serde(default)]
    pub recalculate: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevokeSequenceStatement {
    pub id: NodeId,
    pub name: String,
    pub table: TableReference,
}
