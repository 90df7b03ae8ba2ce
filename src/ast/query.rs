use serde::{Deserialize, Serialize};

use crate::ast::{Expr, JoinKind, NodeId};

/// A query producing a row set: a single SELECT or a UNION of queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryExpr {
    Select(Box<SelectExpr>),
    Union(Box<UnionExpr>),
}

impl QueryExpr {
    /// The SELECT whose projection defines the row shape.
    pub fn first_select(&self) -> &SelectExpr {
        match self {
            QueryExpr::Select(select) => select,
            QueryExpr::Union(union) => union.left.first_select(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectExpr {
    pub id: NodeId,
    #[serde(default)]
    pub distinct: bool,
    #[serde(default)]
    pub top: Option<Expr>,
    pub columns: Vec<ColumnExpr>,
    /// SELECT ... INTO table variable / temporary table
    #[serde(default)]
    pub into: Option<TableReference>,
    #[serde(default)]
    pub from: Option<TableSource>,
    #[serde(default, rename = "where")]
    pub where_: Option<Expr>,
    #[serde(default)]
    pub group: Vec<Expr>,
    #[serde(default)]
    pub having: Option<Expr>,
    #[serde(default)]
    pub order: Option<OrderClause>,
}

impl SelectExpr {
    pub fn new(id: NodeId, columns: Vec<ColumnExpr>, from: Option<TableSource>) -> Self {
        Self {
            id,
            distinct: false,
            top: None,
            columns,
            into: None,
            from,
            where_: None,
            group: Vec::new(),
            having: None,
            order: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionExpr {
    #[serde(default)]
    pub all: bool,
    pub left: QueryExpr,
    pub right: QueryExpr,
    #[serde(default)]
    pub order: Option<OrderClause>,
}

/// A projected column: expression plus optional alias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnExpr {
    pub id: NodeId,
    pub expr: Expr,
    #[serde(default)]
    pub alias: Option<String>,
}

impl ColumnExpr {
    /// Name of the projected property: the alias, else the referenced column name.
    pub fn name(&self) -> Option<&str> {
        if let Some(alias) = self.alias.as_deref() {
            return Some(alias);
        }
        match &self.expr {
            Expr::Column(column) => Some(column.column_name()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderClause {
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub offset: Option<Box<Expr>>,
    #[serde(default)]
    pub fetch: Option<Box<Expr>>,
}

impl OrderClause {
    pub fn new(items: Vec<OrderItem>) -> Self {
        Self {
            items,
            offset: None,
            fetch: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub expr: Expr,
    #[serde(default)]
    pub descending: bool,
}

/// Row source of a FROM clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TableSource {
    Table(TableReference),
    Derived(TableExpression),
    Join(Box<TableJoin>),
}

impl TableSource {
    /// Leftmost table reference of a join tree (the CONSUME target).
    pub fn leading_table(&self) -> Option<&TableReference> {
        match self {
            TableSource::Table(table) => Some(table),
            TableSource::Join(join) => join.left.leading_table(),
            TableSource::Derived(_) => None,
        }
    }
}

/// Reference to a table by its script identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableReference {
    pub id: NodeId,
    pub identifier: String,
    #[serde(default)]
    pub alias: Option<String>,
}

impl TableReference {
    /// Alias when present, else the unqualified identifier.
    pub fn source_name(&self) -> &str {
        match self.alias.as_deref() {
            Some(alias) if !alias.is_empty() => alias,
            _ => crate::ast::split_identifier(&self.identifier).1,
        }
    }
}

/// Derived table: `(SELECT ...) AS alias`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableExpression {
    pub id: NodeId,
    pub query: Box<QueryExpr>,
    pub alias: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableJoin {
    pub kind: JoinKind,
    pub left: TableSource,
    pub right: TableSource,
    /// None for CROSS JOIN and APPLY
    #[serde(default)]
    pub on: Option<Expr>,
}

/// Common table expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cte {
    pub id: NodeId,
    pub name: String,
    pub query: QueryExpr,
}
