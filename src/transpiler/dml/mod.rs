//! DML (Data Manipulation Language) SQL generation.
//!
//! One builder per statement kind. Builders share the dialect generator for
//! expressions and row sources and only decide the statement layout, which
//! differs structurally between MS-SQL and PostgreSQL.

pub mod consume;
pub mod delete;
pub mod insert;
pub mod select;
pub mod update;
pub mod upsert;

use crate::ast::{ColumnExpr, Cte, Expr, LiteralKind, NodeId, TableReference, visit};
use crate::binding::{Binding, ColumnMapper, TypeTag};
use crate::error::{TranspileError, TranspileResult};
use crate::transpiler::EmitContext;
use crate::transpiler::literals::{parse_entity, type_code_hex};
use crate::transpiler::traits::SqlGenerator;

/// Physical name of a DML target. CTE targets are rejected.
pub(crate) fn target_table(
    g: &dyn SqlGenerator,
    cx: &EmitContext<'_>,
    target: &TableReference,
    keyword: &str,
) -> TranspileResult<String> {
    match cx.table_binding(target) {
        Some(Binding::CommonTable) => Err(TranspileError::binding(
            target.id,
            format!("{}: computed table (cte) targeting is not allowed.", keyword),
        )),
        Some(_) => g.table_name(cx, target),
        None => Err(TranspileError::binding(
            target.id,
            "DML: Target table identifier is missing.",
        )),
    }
}

/// Mapped physical columns of a SET target.
pub(crate) fn set_columns(cx: &EmitContext<'_>, id: NodeId, identifier: &str) -> TranspileResult<Vec<ColumnMapper>> {
    match cx.mapping(id) {
        Some(mapping) if !mapping.is_empty() => Ok(mapping),
        _ => Err(TranspileError::binding(
            id,
            format!("Column [{}] is not resolved.", identifier),
        )),
    }
}

/// Values assigned to each physical column of `target`.
///
/// A mapped column reference of the same shape pairs index-wise. Entity
/// literals and NULL spread over multi-column targets by column tag.
pub(crate) fn emit_column_values(
    g: &dyn SqlGenerator,
    cx: &mut EmitContext<'_>,
    target: &[ColumnMapper],
    value: &Expr,
) -> TranspileResult<Vec<String>> {
    if target.is_empty() {
        return Err(TranspileError::statement(None, "Assignment target has no physical columns."));
    }
    if let Expr::Column(reference) = value {
        if let Some(mapping) = cx.mapping(reference.id) {
            if mapping.len() == target.len() && target.len() > 1 {
                return Ok(mapping.into_iter().map(|column| column.name).collect());
            }
        }
    }

    if target.len() == 1 {
        let mut text = String::new();
        g.emit_expr(cx, value, &mut text)?;
        return Ok(vec![text]);
    }

    match value {
        Expr::Scalar(scalar) if scalar.kind == LiteralKind::Null => {
            Ok(target.iter().map(|_| "NULL".to_string()).collect())
        }
        Expr::Scalar(scalar) if scalar.kind == LiteralKind::Entity => {
            let (code, identity) = parse_entity(&scalar.literal)?;
            target
                .iter()
                .map(|column| match column.tag {
                    Some(TypeTag::Tag) => Ok(g.bytes_literal("08")),
                    Some(TypeTag::TypeCode) => Ok(g.bytes_literal(&type_code_hex(code))),
                    Some(TypeTag::Entity) => Ok(g.uuid_literal(&identity)),
                    _ => Err(shape_mismatch(column)),
                })
                .collect()
        }
        _ => Err(shape_mismatch(&target[0])),
    }
}

fn shape_mismatch(column: &ColumnMapper) -> TranspileError {
    TranspileError::statement(
        None,
        format!("Value does not match the shape of column [{}].", column.name),
    )
}

/// Qualify the unqualified columns of an OUTPUT list with the row image
/// (`inserted` or `deleted`).
pub(crate) fn qualify_output(cx: &mut EmitContext<'_>, columns: &[ColumnExpr], image: &str) {
    let mut rewrites: Vec<(NodeId, Vec<ColumnMapper>)> = Vec::new();
    for column in columns {
        visit::for_each_column_ref(&column.expr, &mut |reference| {
            let Some(mapping) = cx.mapping(reference.id) else {
                return;
            };
            let qualified = mapping
                .into_iter()
                .map(|mut mapper| {
                    if !mapper.name.contains('.') {
                        mapper.name = format!("{}.{}", image, mapper.name);
                    }
                    mapper
                })
                .collect();
            rewrites.push((reference.id, qualified));
        });
    }
    for (id, mapping) in rewrites {
        cx.override_mapping(id, mapping);
    }
}

/// Projection list joined by `",\n"`.
pub(crate) fn emit_projection(
    g: &dyn SqlGenerator,
    cx: &mut EmitContext<'_>,
    columns: &[ColumnExpr],
    out: &mut String,
) -> TranspileResult<()> {
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            out.push_str(",\n");
        }
        g.emit_column_expr(cx, column, out)?;
    }
    Ok(())
}

/// PostgreSQL `OUTPUT ... INTO`: run the data-modifying statement in a CTE
/// and select its RETURNING rows into a temporary table.
pub(crate) fn returning_into(
    g: &dyn SqlGenerator,
    cx: &mut EmitContext<'_>,
    ctes: &[Cte],
    body: &str,
    into: &TableReference,
) -> TranspileResult<String> {
    let mut out = String::new();
    if ctes.is_empty() {
        out.push_str("WITH ");
    } else {
        g.emit_ctes(cx, ctes, &mut out)?;
        out.pop();
        out.push_str(",\n");
    }
    out.push_str("output AS\n(");
    out.push_str(body);
    out.push_str(")\nSELECT * ");
    out.push_str(g.into_keyword());
    out.push(' ');
    out.push_str(&g.table_name(cx, into)?);
    out.push_str("\nFROM output;");
    Ok(out)
}
