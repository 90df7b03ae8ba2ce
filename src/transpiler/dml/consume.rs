//! CONSUME: destructive read rewritten into a single DELETE returning the
//! removed rows.
//!
//! Two shapes are produced per dialect:
//!
//! - **simple**: the statement reads one table. MS-SQL deletes through an
//!   updatable `queue` CTE; PostgreSQL locks the row keys in a `filter` CTE,
//!   deletes them in a `queue` CTE and re-sorts the returned rows.
//! - **enrichment**: the target table is joined to other tables. The keys of
//!   the target's identity index are selected together with the projection
//!   into a `changes` CTE, and the DELETE matches the target on those keys
//!   only, so the join fan-out never widens the deleted set.
//!
//! ORDER BY columns missing from the projection are carried through every
//! stage as hidden columns and dropped from the final projection.

use crate::ast::{ColumnExpr, ColumnReference, ConsumeStatement, Expr, SelectExpr, TableReference, TableSource};
use crate::binding::{Binding, ColumnMapper, IndexInfo, select_identity_index};
use crate::error::{TranspileError, TranspileResult};
use crate::transpiler::EmitContext;
use crate::transpiler::dialect::Dialect;
use crate::transpiler::infer::{ColumnDefinition, column_definitions, infer_columns};
use crate::transpiler::traits::SqlGenerator;

/// Table variable receiving the deleted rows before the final ORDER BY.
const CONSUME_RESULT: &str = "@consume_result";

/// Generate CONSUME SQL.
pub fn build_consume(g: &dyn SqlGenerator, cx: &mut EmitContext<'_>, stmt: &ConsumeStatement) -> TranspileResult<String> {
    if let Some(target) = stmt.target.as_deref().filter(|target| !target.is_empty()) {
        tracing::warn!(target, "CONSUME handed to the stream processor, no SQL emitted");
        return Ok(String::new());
    }

    let Some(from) = &stmt.from else {
        return Err(TranspileError::statement(stmt.id, "CONSUME: target table is not found."));
    };
    let Some(table) = from.leading_table() else {
        return Err(TranspileError::statement(stmt.id, "CONSUME: target table is not found."));
    };
    let table_name = match cx.table_binding(table) {
        Some(Binding::Entity(entity)) => entity.table_name,
        _ => {
            return Err(TranspileError::binding(
                table.id,
                "CONSUME: target table has no entity binding.",
            ));
        }
    };

    let simple = matches!(from, TableSource::Table(_));
    tracing::debug!(
        table = %table_name,
        shape = if simple { "simple" } else { "enrichment" },
        dialect = %g.dialect(),
        "CONSUME rewrite"
    );

    let index = if g.dialect() == Dialect::SqlServer && simple {
        None
    } else {
        Some(identity_index(cx, table, &table_name)?)
    };
    let reserved: Vec<&str> = match &index {
        Some(index) if !simple => index.columns.iter().map(|column| column.name.as_str()).collect(),
        _ => Vec::new(),
    };
    let consume = Consume::new(cx, stmt, &target_qualifier(table, &table_name), &reserved)?;

    let Some(index) = &index else {
        return consume.sqlserver_simple(g, cx, table);
    };
    match (g.dialect(), simple) {
        (Dialect::SqlServer, _) => consume.sqlserver_enrichment(g, cx, table, &table_name, index),
        (Dialect::Postgres, true) => consume.postgres_simple(g, cx, table, &table_name, index),
        (Dialect::Postgres, false) => consume.postgres_enrichment(g, cx, table, &table_name, index),
    }
}

fn identity_index(cx: &EmitContext<'_>, table: &TableReference, table_name: &str) -> TranspileResult<IndexInfo> {
    let indexes = cx.metadata.indexes(&table_name.to_lowercase());
    let Some(index) = select_identity_index(&indexes) else {
        return Err(TranspileError::schema(table.id, "CONSUME: target table has no valid index."));
    };
    tracing::debug!(table = %table_name, index = %index.name, "identity index selected");
    Ok(index.clone())
}

/// A physical column flowing through the rewrite stages.
#[derive(Debug, Clone)]
struct Carried {
    /// Column as written against the source rows, possibly qualified
    source: String,
    /// Name under which the column leaves every stage
    name: String,
    type_name: Option<String>,
    /// `DATALENGTH(source)` rather than the column itself
    length: bool,
    /// Sort key only, not part of the caller-visible result
    hidden: bool,
    /// ORDER BY reference and mapping position a hidden column comes from
    origin: Option<(ColumnReference, usize)>,
}

impl Carried {
    /// Unqualified physical column name.
    fn column_name(&self) -> &str {
        self.source.rsplit('.').next().unwrap_or(&self.source)
    }

    /// The column read back from a stage named `stage`.
    fn from_stage(&self, stage: &str) -> String {
        format!("{}.{}", stage, self.name)
    }
}

/// Sort key of the final projection.
#[derive(Debug, Clone)]
struct OrderKey {
    name: String,
    descending: bool,
}

impl OrderKey {
    fn render(keys: &[OrderKey], stage: &str) -> String {
        keys.iter()
            .map(|key| {
                format!(
                    "{}.{} {}",
                    stage,
                    key.name,
                    if key.descending { "DESC" } else { "ASC" }
                )
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

struct Consume<'s> {
    stmt: &'s ConsumeStatement,
    /// Projection columns followed by hidden order columns
    carried: Vec<Carried>,
    order: Vec<OrderKey>,
}

impl<'s> Consume<'s> {
    /// `reserved` lists the target key columns selected next to the
    /// projection; hidden columns of other tables are renamed around them.
    fn new(
        cx: &EmitContext<'_>,
        stmt: &'s ConsumeStatement,
        qualifier: &str,
        reserved: &[&str],
    ) -> TranspileResult<Self> {
        let mut carried = Vec::new();
        for column in &stmt.columns {
            carried.extend(projected(cx, column)?);
        }

        let mut order = Vec::new();
        if let Some(clause) = &stmt.order {
            for item in &clause.items {
                let Expr::Column(reference) = &item.expr else {
                    return Err(TranspileError::statement(
                        stmt.id,
                        "CONSUME: ORDER BY supports column references only.",
                    ));
                };
                let Some(mapping) = cx.mapping(reference.id) else {
                    return Err(TranspileError::binding(
                        reference.id,
                        format!("Column [{}] is not resolved.", reference.identifier),
                    ));
                };
                for (position, mapper) in mapping.into_iter().enumerate() {
                    let known = carried
                        .iter()
                        .find(|column| !column.length && column.source == mapper.name)
                        .map(|column| column.name.clone());
                    let name = match known {
                        Some(name) => name,
                        None => {
                            let name = hidden_name(&carried, &mapper, qualifier, reserved);
                            carried.push(Carried {
                                source: mapper.name.clone(),
                                name: name.clone(),
                                type_name: mapper.type_name.clone(),
                                length: false,
                                hidden: true,
                                origin: Some((reference.clone(), position)),
                            });
                            name
                        }
                    };
                    order.push(OrderKey {
                        name,
                        descending: item.descending,
                    });
                }
            }
        }

        Ok(Self { stmt, carried, order })
    }

    fn visible(&self) -> impl Iterator<Item = &Carried> {
        self.carried.iter().filter(|column| !column.hidden)
    }

    fn hidden(&self) -> impl Iterator<Item = &Carried> {
        self.carried.iter().filter(|column| column.hidden)
    }

    fn hint(&self, dialect: Dialect, target: &str) -> String {
        match (dialect, self.stmt.strict_order) {
            (Dialect::SqlServer, true) => "WITH (ROWLOCK)".to_string(),
            (Dialect::SqlServer, false) => "WITH (ROWLOCK, READPAST)".to_string(),
            (Dialect::Postgres, strict) => {
                let mut hint = "FOR UPDATE".to_string();
                if !target.is_empty() {
                    hint.push_str(" OF ");
                    hint.push_str(target);
                }
                if !strict {
                    hint.push_str(" SKIP LOCKED");
                }
                hint
            }
        }
    }

    // ---------------------------------------------------------------
    // MS-SQL
    // ---------------------------------------------------------------

    /// ```text
    /// WITH queue AS (SELECT TOP (n) ... FROM T WITH (ROWLOCK, READPAST) ...)
    /// DELETE queue OUTPUT deleted.* [INTO @x];
    /// ```
    fn sqlserver_simple(
        &self,
        g: &dyn SqlGenerator,
        cx: &mut EmitContext<'_>,
        table: &TableReference,
    ) -> TranspileResult<String> {
        let stmt = self.stmt;
        cx.set_hint(table.id, self.hint(Dialect::SqlServer, ""));

        let mut select = SelectExpr::new(stmt.id, stmt.columns.clone(), stmt.from.clone());
        select.top = stmt.top.clone();
        select.where_ = stmt.where_.clone();
        // T-SQL accepts ORDER BY inside a CTE only together with TOP
        select.order = stmt.top.as_ref().and(stmt.order.clone());

        let mut sql = self.declare_into(g, cx)?;
        sql.push_str("WITH queue AS\n(");
        g.emit_select(cx, &select, &mut sql)?;
        sql.push_str(")\nDELETE queue\nOUTPUT\n");
        self.push_stage_columns(&mut sql, "deleted", false);
        self.push_output_into(g, cx, &mut sql)?;
        sql.push(';');
        Ok(sql)
    }

    /// ```text
    /// WITH changes AS (SELECT TOP (n) q.key AS key, ... FROM T AS q WITH (...) JOIN ...)
    /// DELETE q OUTPUT changes.* [INTO @x]
    /// FROM T AS q INNER JOIN changes ON (q.key = changes.key);
    /// ```
    ///
    /// With ORDER BY and no INTO the deleted rows go through `@consume_result`
    /// and are selected back in order.
    fn sqlserver_enrichment(
        &self,
        g: &dyn SqlGenerator,
        cx: &mut EmitContext<'_>,
        table: &TableReference,
        table_name: &str,
        index: &IndexInfo,
    ) -> TranspileResult<String> {
        let stmt = self.stmt;
        let qualifier = target_qualifier(table, table_name);
        let reorder = !self.order.is_empty() && stmt.into.is_none();
        cx.set_hint(table.id, self.hint(Dialect::SqlServer, ""));

        let mut sql = String::new();
        if reorder {
            sql.push_str(&format!("DECLARE {} TABLE (", CONSUME_RESULT));
            let definitions = self.result_definitions(g.dialect(), cx)?;
            sql.push_str(
                &definitions
                    .iter()
                    .map(|column| format!("{} {}", column.name, column.type_name))
                    .collect::<Vec<_>>()
                    .join(", "),
            );
            sql.push_str(");\n");
        } else {
            sql.push_str(&self.declare_into(g, cx)?);
        }

        sql.push_str("WITH changes AS\n(");
        self.emit_changes(g, cx, &qualifier, index, reorder, &mut sql)?;
        sql.push_str(")\nDELETE ");
        sql.push_str(&qualifier);
        sql.push_str("\nOUTPUT\n");
        self.push_stage_columns(&mut sql, "changes", reorder);

        if reorder {
            sql.push_str("\nINTO ");
            sql.push_str(CONSUME_RESULT);
        } else {
            self.push_output_into(g, cx, &mut sql)?;
        }

        sql.push_str("\nFROM ");
        sql.push_str(table_name);
        if let Some(alias) = table.alias.as_deref().filter(|alias| !alias.is_empty()) {
            sql.push_str(" AS ");
            sql.push_str(alias);
        }
        sql.push_str(" INNER JOIN changes ON ");
        sql.push_str(&key_match(index, &qualifier, "changes", true));
        sql.push(';');

        if reorder {
            sql.push_str("\nSELECT\n");
            self.push_final_columns(&mut sql, "result");
            sql.push_str(&format!("\nFROM {} AS result\nORDER BY\n", CONSUME_RESULT));
            sql.push_str(&OrderKey::render(&self.order, "result"));
            sql.push(';');
        }
        Ok(sql)
    }

    /// `DECLARE @x AS TABLE (...)` for CONSUME ... INTO on MS-SQL.
    fn declare_into(&self, g: &dyn SqlGenerator, cx: &EmitContext<'_>) -> TranspileResult<String> {
        let Some(into) = &self.stmt.into else {
            return Ok(String::new());
        };
        let definitions = column_definitions(g.dialect(), cx, &self.stmt.columns)?;
        let mut sql = format!("DECLARE {} AS TABLE (\n", g.table_variable_name(&into.identifier));
        sql.push_str(
            &definitions
                .iter()
                .map(|column| format!("{} {}", column.name, column.type_name))
                .collect::<Vec<_>>()
                .join(",\n"),
        );
        sql.push_str(");\n");
        Ok(sql)
    }

    fn push_output_into(&self, g: &dyn SqlGenerator, cx: &mut EmitContext<'_>, sql: &mut String) -> TranspileResult<()> {
        if let Some(into) = &self.stmt.into {
            sql.push_str("\nINTO ");
            sql.push_str(&g.table_name(cx, into)?);
        }
        Ok(())
    }

    /// Columns of `@consume_result`: the projection then the hidden order
    /// columns.
    fn result_definitions(&self, dialect: Dialect, cx: &EmitContext<'_>) -> TranspileResult<Vec<ColumnDefinition>> {
        let shape_error = || {
            TranspileError::schema(
                self.stmt.id,
                "CONSUME: result table shape does not match the projection.",
            )
        };

        let projection = column_definitions(dialect, cx, &self.stmt.columns)?;
        if projection.len() != self.visible().count() {
            return Err(shape_error());
        }
        let mut definitions: Vec<ColumnDefinition> = self
            .visible()
            .zip(projection)
            .map(|(column, definition)| ColumnDefinition::new(column.name.clone(), definition.type_name))
            .collect();

        for column in self.hidden() {
            let type_name = match (&column.type_name, &column.origin) {
                (Some(type_name), _) => type_name.clone(),
                (None, Some((reference, position))) => {
                    let expr = ColumnExpr {
                        id: reference.id,
                        expr: Expr::Column(reference.clone()),
                        alias: None,
                    };
                    infer_columns(dialect, cx, &expr)?
                        .into_iter()
                        .nth(*position)
                        .map(|definition| definition.type_name)
                        .ok_or_else(shape_error)?
                }
                (None, None) => return Err(shape_error()),
            };
            definitions.push(ColumnDefinition::new(column.name.clone(), type_name));
        }
        Ok(definitions)
    }

    // ---------------------------------------------------------------
    // PostgreSQL
    // ---------------------------------------------------------------

    /// ```text
    /// WITH filter AS (SELECT key FROM T ... LIMIT n FOR UPDATE SKIP LOCKED),
    /// queue AS (DELETE FROM T AS source USING filter WHERE ... RETURNING ...)
    /// SELECT queue.* FROM queue ORDER BY ...;
    /// ```
    fn postgres_simple(
        &self,
        g: &dyn SqlGenerator,
        cx: &mut EmitContext<'_>,
        table: &TableReference,
        table_name: &str,
        index: &IndexInfo,
    ) -> TranspileResult<String> {
        let mut sql = String::from("WITH filter AS\n(SELECT\n");
        sql.push_str(
            &index
                .columns
                .iter()
                .map(|column| column.name.as_str())
                .collect::<Vec<_>>()
                .join(",\n"),
        );
        sql.push_str("\nFROM ");
        g.emit_table_ref(cx, table, &mut sql)?;
        self.emit_filter_tail(g, cx, "", &mut sql)?;

        sql.push_str("),\nqueue AS\n(DELETE FROM ");
        sql.push_str(table_name);
        sql.push_str(" AS source USING filter\nWHERE ");
        sql.push_str(&key_match(index, "source", "filter", false));
        sql.push_str("\nRETURNING\n");
        let returning: Vec<String> = self
            .carried
            .iter()
            .map(|column| {
                let mut text = String::new();
                if column.length {
                    text.push_str(&format!(
                        "OCTET_LENGTH(CAST(source.{} AS text)) AS {}",
                        column.column_name(),
                        column.name
                    ));
                } else {
                    let mapper = ColumnMapper {
                        name: format!("source.{}", column.column_name()),
                        alias: Some(column.name.clone()),
                        tag: None,
                        type_name: column.type_name.clone(),
                    };
                    g.emit_mapped_column(&mapper, &mut text);
                }
                text
            })
            .collect();
        sql.push_str(&returning.join(",\n"));
        sql.push(')');

        self.emit_final_select(g, cx, "queue", &mut sql)?;
        Ok(sql)
    }

    /// ```text
    /// WITH changes AS (SELECT q.key AS key, ... LIMIT n FOR UPDATE OF q SKIP LOCKED),
    /// source AS (DELETE FROM T AS target USING changes WHERE ... RETURNING changes.*)
    /// SELECT source.* FROM source ORDER BY ...;
    /// ```
    fn postgres_enrichment(
        &self,
        g: &dyn SqlGenerator,
        cx: &mut EmitContext<'_>,
        table: &TableReference,
        table_name: &str,
        index: &IndexInfo,
    ) -> TranspileResult<String> {
        let qualifier = target_qualifier(table, table_name);

        let mut sql = String::from("WITH changes AS\n(");
        self.emit_changes(g, cx, &qualifier, index, true, &mut sql)?;

        sql.push_str("),\nsource AS\n(DELETE FROM ");
        sql.push_str(table_name);
        sql.push_str(" AS target USING changes\nWHERE ");
        sql.push_str(&key_match(index, "target", "changes", false));
        sql.push_str("\nRETURNING\n");
        self.push_stage_columns(&mut sql, "changes", true);
        sql.push(')');

        self.emit_final_select(g, cx, "source", &mut sql)?;
        Ok(sql)
    }

    /// WHERE, ORDER BY, LIMIT and the row lock of a locking SELECT.
    fn emit_filter_tail(
        &self,
        g: &dyn SqlGenerator,
        cx: &mut EmitContext<'_>,
        lock_target: &str,
        sql: &mut String,
    ) -> TranspileResult<()> {
        let stmt = self.stmt;
        if let Some(predicate) = &stmt.where_ {
            sql.push_str("\nWHERE ");
            g.emit_expr(cx, predicate, sql)?;
        }
        if let Some(order) = &stmt.order {
            g.emit_order(cx, order, sql)?;
        }
        if let Some(top) = &stmt.top {
            g.emit_limit(cx, top, sql)?;
        }
        sql.push('\n');
        sql.push_str(&self.hint(Dialect::Postgres, lock_target));
        Ok(())
    }

    /// `SELECT stage.visible [INTO ...] FROM stage ORDER BY stage.keys;`
    fn emit_final_select(
        &self,
        g: &dyn SqlGenerator,
        cx: &mut EmitContext<'_>,
        stage: &str,
        sql: &mut String,
    ) -> TranspileResult<()> {
        sql.push_str("\nSELECT\n");
        self.push_final_columns(sql, stage);
        if let Some(into) = &self.stmt.into {
            sql.push('\n');
            sql.push_str(g.into_keyword());
            sql.push(' ');
            sql.push_str(&g.table_name(cx, into)?);
        }
        sql.push_str("\nFROM ");
        sql.push_str(stage);
        if !self.order.is_empty() {
            sql.push_str("\nORDER BY\n");
            sql.push_str(&OrderKey::render(&self.order, stage));
        }
        sql.push(';');
        Ok(())
    }

    // ---------------------------------------------------------------
    // Shared stages
    // ---------------------------------------------------------------

    /// The `changes` SELECT of the enrichment shape: target keys, hidden
    /// order columns (when `with_hidden`) and the projection.
    fn emit_changes(
        &self,
        g: &dyn SqlGenerator,
        cx: &mut EmitContext<'_>,
        qualifier: &str,
        index: &IndexInfo,
        with_hidden: bool,
        sql: &mut String,
    ) -> TranspileResult<()> {
        let stmt = self.stmt;
        let dialect = g.dialect();

        sql.push_str("SELECT");
        if dialect == Dialect::SqlServer {
            if let Some(top) = &stmt.top {
                g.emit_top(cx, top, sql)?;
            }
        }
        sql.push('\n');

        let mut columns: Vec<String> = index
            .columns
            .iter()
            .map(|column| format!("{}.{} AS {}", qualifier, column.name, column.name))
            .collect();
        if with_hidden {
            for column in self.hidden() {
                let projected_key = index.columns.iter().any(|key| {
                    key.name == column.name
                        && (column.source == key.name || column.source == format!("{}.{}", qualifier, key.name))
                });
                if projected_key {
                    continue;
                }
                let mut text = column.source.clone();
                if column.name != column.column_name() || column.source.contains('.') {
                    text.push_str(" AS ");
                    text.push_str(&column.name);
                }
                columns.push(text);
            }
        }
        for column in &stmt.columns {
            let mut text = String::new();
            g.emit_column_expr(cx, column, &mut text)?;
            columns.push(text);
        }
        sql.push_str(&columns.join(",\n"));

        if let Some(from) = &stmt.from {
            sql.push_str("\nFROM ");
            g.emit_table_source(cx, from, sql)?;
        }

        match dialect {
            Dialect::SqlServer => {
                if let Some(predicate) = &stmt.where_ {
                    sql.push_str("\nWHERE ");
                    g.emit_expr(cx, predicate, sql)?;
                }
                if let (Some(order), Some(_)) = (&stmt.order, &stmt.top) {
                    g.emit_order(cx, order, sql)?;
                }
            }
            Dialect::Postgres => self.emit_filter_tail(g, cx, qualifier, sql)?,
        }
        Ok(())
    }

    /// Columns read back from a previous stage, one per line.
    fn push_stage_columns(&self, sql: &mut String, stage: &str, with_hidden: bool) {
        let columns: Vec<String> = self
            .carried
            .iter()
            .filter(|column| with_hidden || !column.hidden)
            .map(|column| column.from_stage(stage))
            .collect();
        sql.push_str(&columns.join(",\n"));
    }

    fn push_final_columns(&self, sql: &mut String, stage: &str) {
        let columns: Vec<String> = self
            .visible()
            .map(|column| column.from_stage(stage))
            .collect();
        sql.push_str(&columns.join(",\n"));
    }
}

/// Physical columns contributed by one projected column.
fn projected(cx: &EmitContext<'_>, column: &ColumnExpr) -> TranspileResult<Vec<Carried>> {
    match &column.expr {
        Expr::Column(reference) => {
            let mapping = match cx.mapping(reference.id) {
                Some(mapping) if !mapping.is_empty() => mapping,
                _ => {
                    return Err(TranspileError::binding(
                        reference.id,
                        format!("Column [{}] is not resolved.", reference.identifier),
                    ));
                }
            };
            let single = mapping.len() == 1;
            Ok(mapping
                .into_iter()
                .map(|mapper| {
                    let name = match column.alias.as_deref() {
                        Some(alias) if single => alias.to_string(),
                        _ => mapper.output_name().to_string(),
                    };
                    Carried {
                        source: mapper.name.clone(),
                        name,
                        type_name: mapper.type_name.clone(),
                        length: false,
                        hidden: false,
                        origin: None,
                    }
                })
                .collect())
        }
        Expr::Function(function) if function.is("DATALENGTH") => {
            let Some(alias) = column.alias.as_deref() else {
                return Err(TranspileError::statement(
                    column.id,
                    "CONSUME: DATALENGTH column requires an alias.",
                ));
            };
            let source = match function.args.first() {
                Some(Expr::Column(reference)) => cx
                    .mapping(reference.id)
                    .and_then(|mapping| mapping.into_iter().next())
                    .map(|mapper| mapper.name),
                _ => None,
            };
            let Some(source) = source else {
                return Err(TranspileError::statement(
                    column.id,
                    "CONSUME: DATALENGTH expects a column argument.",
                ));
            };
            Ok(vec![Carried {
                source,
                name: alias.to_string(),
                type_name: None,
                length: true,
                hidden: false,
                origin: None,
            }])
        }
        _ => Err(TranspileError::statement(
            column.id,
            format!(
                "CONSUME: unsupported output column [{}].",
                column.name().unwrap_or("expression")
            ),
        )),
    }
}

/// Stage name of a hidden order column: the physical name, prefixed by its
/// table qualifier when that name is already taken.
fn hidden_name(carried: &[Carried], mapper: &ColumnMapper, qualifier: &str, reserved: &[&str]) -> String {
    let column = mapper.column_name();
    let target_column = mapper.name == column || mapper.name == format!("{}.{}", qualifier, column);
    let taken = |name: &str| {
        carried.iter().any(|carried| carried.name == name) || (!target_column && reserved.contains(&name))
    };
    if !taken(column) {
        return column.to_string();
    }
    let prefix = mapper.name.rsplit_once('.').map_or(qualifier, |(prefix, _)| prefix);
    let mut name = format!("{}_{}", prefix, column);
    while taken(&name) {
        name.push('_');
    }
    name
}

/// Name the target rows are qualified by: the alias, else the table name.
fn target_qualifier(table: &TableReference, table_name: &str) -> String {
    match table.alias.as_deref() {
        Some(alias) if !alias.is_empty() => alias.to_string(),
        _ => table_name.to_string(),
    }
}

/// `left.k1 = right.k1 AND left.k2 = right.k2` over the index keys.
fn key_match(index: &IndexInfo, left: &str, right: &str, grouped: bool) -> String {
    let condition = index
        .columns
        .iter()
        .map(|column| format!("{}.{} = {}.{}", left, column.name, right, column.name))
        .collect::<Vec<_>>()
        .join(" AND ");
    if grouped {
        format!("({})", condition)
    } else {
        condition
    }
}
