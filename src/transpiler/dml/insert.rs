//! INSERT ... SELECT SQL generation.

use crate::ast::{ColumnExpr, Expr, InsertSource, InsertStatement, QueryExpr, TableReference};
use crate::binding::{Binding, ColumnMapper};
use crate::error::{TranspileError, TranspileResult};
use crate::transpiler::EmitContext;
use crate::transpiler::dml::{emit_column_values, target_table};
use crate::transpiler::sql::sequence_argument;
use crate::transpiler::traits::SqlGenerator;

/// Generate INSERT SQL.
///
/// Entity targets take the properties the source projects (matched by name,
/// database-generated columns skipped); table variables and temporary tables
/// take the whole source projection.
pub fn build_insert(g: &dyn SqlGenerator, cx: &mut EmitContext<'_>, stmt: &InsertStatement) -> TranspileResult<String> {
    let table = target_table(g, cx, &stmt.target, "INSERT")?;
    let (source_name, projection) = source_projection(cx, &stmt.source)?;
    let (columns, values) = column_lists(g, cx, &stmt.target, &source_name, &projection)?;

    let mut sql = String::new();
    g.emit_ctes(cx, &stmt.ctes, &mut sql)?;
    sql.push_str(&format!(
        "INSERT INTO {} ({})\nSELECT\n{}\nFROM ",
        table,
        columns.join(", "),
        values.join(",\n")
    ));
    match &stmt.source {
        InsertSource::Table(source) => g.emit_table_ref(cx, source, &mut sql)?,
        InsertSource::Derived(derived) => g.emit_derived(cx, derived, &mut sql)?,
        InsertSource::Query(query) => {
            sql.push('(');
            g.emit_query(cx, &without_vector(query), &mut sql)?;
            sql.push_str(") AS source");
        }
    }
    sql.push(';');
    Ok(sql)
}

/// Name under which the source rows are visible and their projection.
fn source_projection(cx: &EmitContext<'_>, source: &InsertSource) -> TranspileResult<(String, Vec<ColumnExpr>)> {
    match source {
        InsertSource::Table(table) => match cx.table_query(&table.identifier) {
            Some(query) => Ok((table.source_name().to_string(), query.first_select().columns.clone())),
            None => Err(TranspileError::binding(
                table.id,
                format!("INSERT: source table [{}] is not resolved.", table.identifier),
            )),
        },
        InsertSource::Derived(derived) => Ok((
            derived.alias.clone(),
            derived.query.first_select().columns.clone(),
        )),
        InsertSource::Query(query) => Ok(("source".to_string(), query.first_select().columns.clone())),
    }
}

fn column_lists(
    g: &dyn SqlGenerator,
    cx: &mut EmitContext<'_>,
    target: &TableReference,
    source_name: &str,
    projection: &[ColumnExpr],
) -> TranspileResult<(Vec<String>, Vec<String>)> {
    let mut columns = Vec::new();
    let mut values = Vec::new();

    match cx.table_binding(target) {
        Some(Binding::Entity(entity)) => {
            for property in &entity.properties {
                if property.is_generated() {
                    continue;
                }
                let matched = projection.iter().find(|column| {
                    column
                        .name()
                        .is_some_and(|name| name.eq_ignore_ascii_case(&property.name))
                });
                let Some(source) = matched else {
                    continue;
                };
                let targets: Vec<ColumnMapper> = property
                    .ordered_columns()
                    .into_iter()
                    .filter(|column| !column.is_generated)
                    .map(|column| ColumnMapper::new(column.name.clone()).with_tag(column.tag()))
                    .collect();
                if targets.is_empty() {
                    continue;
                }
                values.extend(source_values(g, cx, source_name, source, &targets)?);
                columns.extend(targets.into_iter().map(|column| column.name));
            }
        }
        _ => {
            for source in projection {
                if let Some(sequence) = vector_sequence(source)? {
                    columns.push(source.name().unwrap_or_default().to_string());
                    values.push(g.next_value(&sequence));
                    continue;
                }
                for output in source_outputs(cx, source) {
                    values.push(format!("{}.{}", source_name, output.name));
                    columns.push(output.name);
                }
            }
        }
    }

    if columns.is_empty() {
        return Err(TranspileError::statement(
            target.id,
            format!("INSERT: no source column matches table [{}].", target.identifier),
        ));
    }
    Ok((columns, values))
}

/// Values for the physical columns of one target property.
fn source_values(
    g: &dyn SqlGenerator,
    cx: &mut EmitContext<'_>,
    source_name: &str,
    source: &ColumnExpr,
    targets: &[ColumnMapper],
) -> TranspileResult<Vec<String>> {
    if let Some(sequence) = vector_sequence(source)? {
        return Ok(vec![g.next_value(&sequence)]);
    }
    if let Expr::Scalar(_) = &source.expr {
        return emit_column_values(g, cx, targets, &source.expr);
    }

    let outputs = source_outputs(cx, source);
    let qualify = |output: &ColumnMapper| format!("{}.{}", source_name, output.name);

    if outputs.len() == targets.len() {
        return Ok(outputs.iter().map(qualify).collect());
    }

    targets
        .iter()
        .map(|target| {
            outputs
                .iter()
                .find(|output| output.tag.is_some() && output.tag == target.tag)
                .map(qualify)
                .ok_or_else(|| {
                    TranspileError::statement(
                        source.id,
                        format!(
                            "INSERT: source column [{}] does not match column [{}].",
                            source.name().unwrap_or_default(),
                            target.name
                        ),
                    )
                })
        })
        .collect()
}

/// Output columns of a projected source column: name and type tag.
fn source_outputs(cx: &EmitContext<'_>, column: &ColumnExpr) -> Vec<ColumnMapper> {
    if let Expr::Column(reference) = &column.expr {
        if let Some(mapping) = cx.mapping(reference.id).filter(|mapping| !mapping.is_empty()) {
            return mapping
                .iter()
                .map(|mapper| ColumnMapper {
                    name: mapper.output_name().to_string(),
                    alias: None,
                    tag: mapper.tag,
                    type_name: mapper.type_name.clone(),
                })
                .collect();
        }
    }
    vec![ColumnMapper::new(column.name().unwrap_or("column"))]
}

fn vector_sequence(column: &ColumnExpr) -> TranspileResult<Option<String>> {
    match &column.expr {
        Expr::Function(function) if function.is("VECTOR") => Ok(Some(sequence_argument(function)?)),
        _ => Ok(None),
    }
}

/// Source query without its `VECTOR(seq)` columns; their values are
/// generated in the outer SELECT.
fn without_vector(query: &QueryExpr) -> QueryExpr {
    let mut query = query.clone();
    if let QueryExpr::Select(select) = &mut query {
        select
            .columns
            .retain(|column| !matches!(&column.expr, Expr::Function(function) if function.is("VECTOR")));
    }
    query
}
