//! DELETE SQL generation.

use crate::ast::{DeleteStatement, visit};
use crate::error::TranspileResult;
use crate::transpiler::EmitContext;
use crate::transpiler::dialect::Dialect;
use crate::transpiler::dml::{emit_projection, qualify_output, returning_into, target_table};
use crate::transpiler::traits::SqlGenerator;

/// Generate DELETE SQL.
pub fn build_delete(g: &dyn SqlGenerator, cx: &mut EmitContext<'_>, stmt: &DeleteStatement) -> TranspileResult<String> {
    let table = target_table(g, cx, &stmt.target, "DELETE")?;
    let alias = stmt.target.alias.as_deref().filter(|alias| !alias.is_empty());

    match g.dialect() {
        Dialect::SqlServer => {
            let mut sql = String::new();
            g.emit_ctes(cx, &stmt.ctes, &mut sql)?;
            sql.push_str("DELETE ");
            sql.push_str(alias.unwrap_or(&table));

            if let Some(output) = &stmt.output {
                qualify_output(cx, &output.columns, "deleted");
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
            let mut body = format!("DELETE FROM {}", table);
            if let Some(alias) = alias {
                body.push_str(" AS ");
                body.push_str(alias);
            }

            if let Some(source) = &stmt.source {
                body.push_str(" USING ");
                g.emit_table_source(cx, source, &mut body)?;
            } else if let Some(predicate) = &stmt.where_ {
                let tables = visit::column_qualifiers(predicate, stmt.target.source_name());
                if !tables.is_empty() {
                    body.push_str(" USING ");
                    body.push_str(&tables.join(", "));
                }
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
