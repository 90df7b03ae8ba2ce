//! UPDATE SQL generation.

use crate::ast::{SetExpr, UpdateStatement};
use crate::error::TranspileResult;
use crate::transpiler::EmitContext;
use crate::transpiler::dialect::Dialect;
use crate::transpiler::dml::{
    emit_column_values, emit_projection, qualify_output, returning_into, set_columns, target_table,
};
use crate::transpiler::traits::SqlGenerator;

/// Generate UPDATE SQL.
///
/// MS-SQL writes `OUTPUT inserted.*` between SET and FROM and takes table
/// hints; PostgreSQL moves the output to RETURNING.
pub fn build_update(g: &dyn SqlGenerator, cx: &mut EmitContext<'_>, stmt: &UpdateStatement) -> TranspileResult<String> {
    let table = target_table(g, cx, &stmt.target, "UPDATE")?;
    let alias = stmt.target.alias.as_deref().filter(|alias| !alias.is_empty());
    let hints = (!stmt.hints.is_empty()).then(|| format!(" WITH ({})", stmt.hints.join(", ")));

    match g.dialect() {
        Dialect::SqlServer => {
            let mut sql = String::new();
            g.emit_ctes(cx, &stmt.ctes, &mut sql)?;

            sql.push_str("UPDATE ");
            match alias {
                Some(alias) => sql.push_str(alias),
                None => {
                    sql.push_str(&table);
                    sql.push_str(hints.as_deref().unwrap_or_default());
                }
            }
            sql.push_str("\nSET ");
            emit_set(g, cx, &stmt.set, &mut sql)?;

            if let Some(output) = &stmt.output {
                qualify_output(cx, &output.columns, "inserted");
                sql.push_str("\nOUTPUT\n");
                emit_projection(g, cx, &output.columns, &mut sql)?;
                if let Some(into) = &output.into {
                    sql.push_str("\nINTO ");
                    sql.push_str(&g.table_name(cx, into)?);
                }
            }

            match (alias, &stmt.source) {
                (Some(alias), source) => {
                    sql.push_str(&format!("\nFROM {} AS {}", table, alias));
                    sql.push_str(hints.as_deref().unwrap_or_default());
                    if let Some(source) = source {
                        sql.push_str(", ");
                        g.emit_table_source(cx, source, &mut sql)?;
                    }
                }
                (None, Some(source)) => {
                    sql.push_str("\nFROM ");
                    g.emit_table_source(cx, source, &mut sql)?;
                }
                (None, None) => {}
            }

            if let Some(predicate) = &stmt.where_ {
                sql.push_str("\nWHERE ");
                g.emit_expr(cx, predicate, &mut sql)?;
            }
            sql.push(';');
            Ok(sql)
        }
        Dialect::Postgres => {
            let mut body = String::new();
            body.push_str("UPDATE ");
            body.push_str(&table);
            if let Some(alias) = alias {
                body.push_str(" AS ");
                body.push_str(alias);
            }
            body.push_str("\nSET ");
            emit_set(g, cx, &stmt.set, &mut body)?;

            if let Some(source) = &stmt.source {
                body.push_str("\nFROM ");
                g.emit_table_source(cx, source, &mut body)?;
            }
            if let Some(predicate) = &stmt.where_ {
                body.push_str("\nWHERE ");
                g.emit_expr(cx, predicate, &mut body)?;
            }
            if let Some(output) = &stmt.output {
                body.push_str("\nRETURNING\n");
                emit_projection(g, cx, &output.columns, &mut body)?;
                if let Some(into) = &output.into {
                    return returning_into(g, cx, &stmt.ctes, &body, into);
                }
            }

            let mut sql = String::new();
            g.emit_ctes(cx, &stmt.ctes, &mut sql)?;
            sql.push_str(&body);
            sql.push(';');
            Ok(sql)
        }
    }
}

/// `column = value` pairs joined by `",\n"`; columns are unqualified.
fn emit_set(g: &dyn SqlGenerator, cx: &mut EmitContext<'_>, set: &[SetExpr], out: &mut String) -> TranspileResult<()> {
    let mut assignments = Vec::new();
    for expr in set {
        let columns = set_columns(cx, expr.column.id, &expr.column.identifier)?;
        let values = emit_column_values(g, cx, &columns, &expr.value)?;
        for (column, value) in columns.iter().zip(values) {
            assignments.push(format!("{} = {}", column.column_name(), value));
        }
    }
    out.push_str(&assignments.join(",\n"));
    Ok(())
}
