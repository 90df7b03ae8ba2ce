//! SELECT and table-variable materialization.

use crate::ast::{SelectStatement, TableVariableStatement};
use crate::error::TranspileResult;
use crate::transpiler::EmitContext;
use crate::transpiler::dialect::Dialect;
use crate::transpiler::infer::column_definitions;
use crate::transpiler::traits::SqlGenerator;

/// Generate SELECT SQL.
pub fn build_select(g: &dyn SqlGenerator, cx: &mut EmitContext<'_>, stmt: &SelectStatement) -> TranspileResult<String> {
    let mut sql = String::new();
    g.emit_ctes(cx, &stmt.ctes, &mut sql)?;
    g.emit_query(cx, &stmt.query, &mut sql)?;
    sql.push(';');
    Ok(sql)
}

/// Materialize a query into a table variable or a temporary table.
///
/// MS-SQL declares the table from the projection's column shapes and fills
/// it with INSERT; PostgreSQL creates a temporary table from the query.
pub fn build_table_variable(
    g: &dyn SqlGenerator,
    cx: &mut EmitContext<'_>,
    stmt: &TableVariableStatement,
    temporary: bool,
) -> TranspileResult<String> {
    let mut query = String::new();
    g.emit_query(cx, &stmt.query, &mut query)?;

    match g.dialect() {
        Dialect::Postgres => Ok(format!("CREATE TEMPORARY TABLE {} AS\n{};", stmt.name, query)),
        Dialect::SqlServer => {
            let definitions = column_definitions(g.dialect(), cx, &stmt.query.first_select().columns)?;
            let columns = definitions
                .iter()
                .map(|column| format!("{} {}", column.name, column.type_name))
                .collect::<Vec<_>>()
                .join(", ");
            if temporary {
                let name = g.temporary_table_name(&stmt.name);
                Ok(format!("CREATE TABLE {} ({});\nINSERT {}\n{};", name, columns, name, query))
            } else {
                let name = g.table_variable_name(&stmt.name);
                Ok(format!("DECLARE {} TABLE ({});\nINSERT {}\n{};", name, columns, name, query))
            }
        }
    }
}
