//! UPSERT decomposition: an optional UPDATE followed by a guarded INSERT.
//!
//! ```text
//! UPDATE target SET ... FROM source WHERE <key>;
//! INSERT INTO target (...) SELECT ... FROM source
//! WHERE NOT EXISTS (SELECT 1 FROM target WHERE <key>);
//! ```

use crate::ast::{
    InsertSource, InsertStatement, TableSource, UpdateStatement, UpsertStatement, visit,
};
use crate::binding::{Binding, ColumnMapper};
use crate::error::{TranspileError, TranspileResult};
use crate::transpiler::EmitContext;
use crate::transpiler::dialect::Dialect;
use crate::transpiler::dml::{insert, target_table, update};
use crate::transpiler::traits::SqlGenerator;

/// Generate UPSERT SQL.
pub fn build_upsert(g: &dyn SqlGenerator, cx: &mut EmitContext<'_>, stmt: &UpsertStatement) -> TranspileResult<String> {
    let table = target_table(g, cx, &stmt.target, "UPSERT")?;

    if stmt.set.is_empty() {
        return Err(TranspileError::statement(stmt.id, "UPSERT: SET clause is not defined."));
    }
    let (source, source_name) = match &stmt.source {
        None => {
            return Err(TranspileError::statement(stmt.id, "UPSERT: FROM clause is not defined."));
        }
        Some(TableSource::Table(table)) => (InsertSource::Table(table.clone()), table.source_name().to_string()),
        Some(TableSource::Derived(derived)) => (InsertSource::Derived(derived.clone()), derived.alias.clone()),
        Some(TableSource::Join(_)) => {
            return Err(TranspileError::statement(
                stmt.id,
                "UPSERT: FROM clause must be a single table or derived table.",
            ));
        }
    };

    disambiguate_source_columns(cx, stmt, &source_name);

    let mut sql = String::new();

    if !stmt.ignore_update {
        let hints = match (g.dialect(), cx.table_binding(&stmt.target)) {
            (Dialect::SqlServer, Some(Binding::Entity(_)) | Some(Binding::TemporaryTable)) => {
                vec!["UPDLOCK".to_string(), "SERIALIZABLE".to_string()]
            }
            _ => Vec::new(),
        };
        let update = UpdateStatement {
            id: stmt.id,
            ctes: stmt.ctes.clone(),
            target: stmt.target.clone(),
            set: stmt.set.clone(),
            output: None,
            source: stmt.source.clone(),
            where_: stmt.where_.clone(),
            hints,
        };
        sql.push_str(&update::build_update(g, cx, &update)?);
        sql.push('\n');
    }

    let insert = InsertStatement {
        id: stmt.id,
        ctes: stmt.ctes.clone(),
        target: stmt.target.clone(),
        source,
    };
    let mut insert_sql = insert::build_insert(g, cx, &insert)?;
    if insert_sql.ends_with(';') {
        insert_sql.pop();
    }
    sql.push_str(&insert_sql);

    sql.push_str("\nWHERE NOT EXISTS (SELECT 1 FROM ");
    sql.push_str(&table);
    if let Some(alias) = stmt.target.alias.as_deref().filter(|alias| !alias.is_empty()) {
        sql.push_str(" AS ");
        sql.push_str(alias);
    }
    if let Some(predicate) = &stmt.where_ {
        sql.push_str(" WHERE ");
        g.emit_expr(cx, predicate, &mut sql)?;
    }
    sql.push_str(");");
    Ok(sql)
}

/// Qualify every reference to a source column with the source name, so
/// columns named alike on both sides stay unambiguous.
fn disambiguate_source_columns(cx: &mut EmitContext<'_>, stmt: &UpsertStatement, source_name: &str) {
    let mut rewrites = Vec::new();
    let mut collect = |expr: &crate::ast::Expr| {
        visit::for_each_column_ref(expr, &mut |column| {
            if !matches!(cx.binding(column.id), Some(Binding::Column(_))) {
                return;
            }
            let mapping: Vec<ColumnMapper> = match cx.mapping(column.id) {
                Some(mapping) if !mapping.is_empty() => mapping
                    .into_iter()
                    .map(|mut mapper| {
                        mapper.name = format!("{}.{}", source_name, mapper.column_name());
                        mapper.alias = None;
                        mapper
                    })
                    .collect(),
                _ => vec![ColumnMapper::new(format!("{}.{}", source_name, column.column_name()))],
            };
            rewrites.push((column.id, mapping));
        });
    };

    if let Some(predicate) = &stmt.where_ {
        collect(predicate);
    }
    for set in &stmt.set {
        collect(&set.value);
    }

    for (id, mapping) in rewrites {
        cx.override_mapping(id, mapping);
    }
}
