//! Read-only tree walks used by the rewriters.

use std::collections::HashMap;

use crate::ast::{
    ColumnExpr, ColumnReference, Expr, InsertSource, NodeId, QueryExpr, SelectExpr, Statement,
    TableSource,
};

/// Call `f` for every column reference of an expression.
///
/// Subqueries are not entered: their columns belong to another scope.
pub fn for_each_column_ref<'a>(expr: &'a Expr, f: &mut impl FnMut(&'a ColumnReference)) {
    match expr {
        Expr::Column(column) => f(column),
        Expr::Function(function) => {
            for arg in &function.args {
                for_each_column_ref(arg, f);
            }
        }
        Expr::Case(case) => {
            for branch in &case.branches {
                for_each_column_ref(&branch.when, f);
                for_each_column_ref(&branch.then, f);
            }
            if let Some(otherwise) = &case.otherwise {
                for_each_column_ref(otherwise, f);
            }
        }
        Expr::Unary { expr, .. } | Expr::Group(expr) => for_each_column_ref(expr, f),
        Expr::Logical { left, right, .. } | Expr::Arithmetic { left, right, .. } => {
            for_each_column_ref(left, f);
            for_each_column_ref(right, f);
        }
        Expr::Comparison(comparison) => {
            for_each_column_ref(&comparison.left, f);
            for_each_column_ref(&comparison.right, f);
        }
        Expr::Values(values) => {
            for value in values {
                for_each_column_ref(value, f);
            }
        }
        Expr::Scalar(_)
        | Expr::Variable(_)
        | Expr::Member(_)
        | Expr::Subquery(_)
        | Expr::Star => {}
    }
}

/// Table qualifiers used by column references of `expr`, in first-seen order,
/// excluding `except`.
pub fn column_qualifiers(expr: &Expr, except: &str) -> Vec<String> {
    let mut qualifiers: Vec<String> = Vec::new();
    for_each_column_ref(expr, &mut |column| {
        if let (Some(table), _) = column.parts() {
            if table != except && !qualifiers.iter().any(|q| q == table) {
                qualifiers.push(table.to_string());
            }
        }
    });
    qualifiers
}

/// Index of every projected column of a script, keyed by node id.
///
/// Used to follow `Binding::Column` back-references to the defining expression.
pub fn index_columns(statements: &[Statement]) -> HashMap<NodeId, &ColumnExpr> {
    let mut index = HashMap::new();
    for statement in statements {
        match statement {
            Statement::Select(select) => {
                for cte in &select.ctes {
                    index_query(&cte.query, &mut index);
                }
                index_query(&select.query, &mut index);
            }
            Statement::Insert(insert) => {
                for cte in &insert.ctes {
                    index_query(&cte.query, &mut index);
                }
                match &insert.source {
                    InsertSource::Table(_) => {}
                    InsertSource::Derived(derived) => index_query(&derived.query, &mut index),
                    InsertSource::Query(query) => index_query(query, &mut index),
                }
            }
            Statement::Update(update) => {
                for cte in &update.ctes {
                    index_query(&cte.query, &mut index);
                }
                if let Some(source) = &update.source {
                    index_source(source, &mut index);
                }
                if let Some(output) = &update.output {
                    index_projection(&output.columns, &mut index);
                }
            }
            Statement::Delete(delete) => {
                for cte in &delete.ctes {
                    index_query(&cte.query, &mut index);
                }
                if let Some(source) = &delete.source {
                    index_source(source, &mut index);
                }
                if let Some(output) = &delete.output {
                    index_projection(&output.columns, &mut index);
                }
            }
            Statement::Upsert(upsert) => {
                for cte in &upsert.ctes {
                    index_query(&cte.query, &mut index);
                }
                if let Some(source) = &upsert.source {
                    index_source(source, &mut index);
                }
            }
            Statement::Consume(consume) => {
                index_projection(&consume.columns, &mut index);
                if let Some(source) = &consume.from {
                    index_source(source, &mut index);
                }
            }
            Statement::TableVariable(table) | Statement::TemporaryTable(table) => {
                index_query(&table.query, &mut index)
            }
            Statement::Declare(_)
            | Statement::CreateType(_)
            | Statement::CreateSequence(_)
            | Statement::DropSequence(_)
            | Statement::ApplySequence(_)
            | Statement::RevokeSequence(_) => {}
        }
    }
    index
}

fn index_query<'a>(query: &'a QueryExpr, index: &mut HashMap<NodeId, &'a ColumnExpr>) {
    match query {
        QueryExpr::Select(select) => index_select(select, index),
        QueryExpr::Union(union) => {
            index_query(&union.left, index);
            index_query(&union.right, index);
        }
    }
}

fn index_select<'a>(select: &'a SelectExpr, index: &mut HashMap<NodeId, &'a ColumnExpr>) {
    index_projection(&select.columns, index);
    if let Some(source) = &select.from {
        index_source(source, index);
    }
}

fn index_projection<'a>(columns: &'a [ColumnExpr], index: &mut HashMap<NodeId, &'a ColumnExpr>) {
    for column in columns {
        index.insert(column.id, column);
        if let Expr::Subquery(query) = &column.expr {
            index_query(query, index);
        }
    }
}

fn index_source<'a>(source: &'a TableSource, index: &mut HashMap<NodeId, &'a ColumnExpr>) {
    match source {
        TableSource::Table(_) => {}
        TableSource::Derived(derived) => index_query(&derived.query, index),
        TableSource::Join(join) => {
            index_source(&join.left, index);
            index_source(&join.right, index);
        }
    }
}

/// Queries defining named row sets of a script: CTEs, table variables and
/// temporary tables. Keys are lower-cased names.
pub fn index_tables(statements: &[Statement]) -> HashMap<String, &QueryExpr> {
    let mut index = HashMap::new();
    for statement in statements {
        let ctes = match statement {
            Statement::Select(select) => select.ctes.as_slice(),
            Statement::Insert(insert) => insert.ctes.as_slice(),
            Statement::Update(update) => update.ctes.as_slice(),
            Statement::Delete(delete) => delete.ctes.as_slice(),
            Statement::Upsert(upsert) => upsert.ctes.as_slice(),
            Statement::TableVariable(table) | Statement::TemporaryTable(table) => {
                index.insert(table.name.to_lowercase(), &table.query);
                &[]
            }
            _ => &[],
        };
        for cte in ctes {
            index.insert(cte.name.to_lowercase(), &cte.query);
        }
    }
    index
}

/// Whether `query` reads from a table named `name` (recursive CTE detection).
pub fn query_references(query: &QueryExpr, name: &str) -> bool {
    match query {
        QueryExpr::Select(select) => select
            .from
            .as_ref()
            .is_some_and(|source| source_references(source, name)),
        QueryExpr::Union(union) => {
            query_references(&union.left, name) || query_references(&union.right, name)
        }
    }
}

fn source_references(source: &TableSource, name: &str) -> bool {
    match source {
        TableSource::Table(table) => table.identifier.eq_ignore_ascii_case(name),
        TableSource::Derived(derived) => query_references(&derived.query, name),
        TableSource::Join(join) => {
            source_references(&join.left, name) || source_references(&join.right, name)
        }
    }
}
