//! Transpiler: resolved script model to MS-SQL or PostgreSQL text.
//!
//! Each top-level statement is emitted independently by the dialect's
//! [`SqlGenerator`]. The per-statement results (SQL text, output mapper and
//! deferred function parameters) are collected into a [`TranspilerOutput`]
//! together with the whole-script concatenation.

pub mod ddl;
pub mod dialect;
pub mod dml;
pub mod functions;
pub mod infer;
pub mod literals;
pub mod sql;
pub mod traits;

#[cfg(test)]
mod tests;

use std::collections::HashMap;

use serde::Serialize;

use crate::ast::{ColumnExpr, NodeId, QueryExpr, ScriptModel, Statement, TableReference, visit};
use crate::binding::{Binding, Bindings, ColumnMapper};
use crate::config::TranspilerConfig;
use crate::error::TranspileResult;
use crate::mapper::{EntityMapper, map_projection};
use crate::metadata::MetadataProvider;

pub use dialect::Dialect;
pub use functions::{FunctionDescriptor, FunctionRegistry, UserDefinedFunction};
pub use traits::SqlGenerator;

/// Read-only view of one transpile call plus the transient state of the
/// statement being emitted.
pub struct EmitContext<'a> {
    pub bindings: &'a Bindings,
    pub metadata: &'a dyn MetadataProvider,
    pub functions: &'a FunctionRegistry,
    pub year_offset: i32,
    columns: HashMap<NodeId, &'a ColumnExpr>,
    tables: HashMap<String, &'a QueryExpr>,
    descriptors: Vec<FunctionDescriptor>,
    hints: HashMap<NodeId, String>,
    overrides: HashMap<NodeId, Vec<ColumnMapper>>,
}

impl<'a> EmitContext<'a> {
    pub fn new(
        bindings: &'a Bindings,
        metadata: &'a dyn MetadataProvider,
        functions: &'a FunctionRegistry,
        year_offset: i32,
    ) -> Self {
        Self {
            bindings,
            metadata,
            functions,
            year_offset,
            columns: HashMap::new(),
            tables: HashMap::new(),
            descriptors: Vec::new(),
            hints: HashMap::new(),
            overrides: HashMap::new(),
        }
    }

    /// Index the projections and named row sets of the script being emitted.
    pub fn with_script(mut self, statements: &'a [Statement]) -> Self {
        self.columns = visit::index_columns(statements);
        self.tables = visit::index_tables(statements);
        self
    }

    pub fn binding(&self, id: NodeId) -> Option<&'a Binding> {
        self.bindings.get(id)
    }

    /// Column mapping of a node; statement-local rewrites take precedence.
    pub fn mapping(&self, id: NodeId) -> Option<Vec<ColumnMapper>> {
        self.overrides
            .get(&id)
            .cloned()
            .or_else(|| self.bindings.mapping(id).map(<[ColumnMapper]>::to_vec))
    }

    /// Binding of a table reference, falling back to the metadata provider.
    pub fn table_binding(&self, table: &TableReference) -> Option<Binding> {
        self.bindings
            .get(table.id)
            .cloned()
            .or_else(|| self.metadata.resolve(&table.identifier))
    }

    /// Defining column expression of a `Binding::Column` back-reference.
    pub fn parent_column(&self, id: NodeId) -> Option<&'a ColumnExpr> {
        self.columns.get(&id).copied()
    }

    /// Query defining a CTE, table variable or temporary table.
    pub fn table_query(&self, name: &str) -> Option<&'a QueryExpr> {
        self.tables.get(&name.to_lowercase()).copied()
    }

    pub fn hint(&self, table: NodeId) -> Option<&str> {
        self.hints.get(&table).map(String::as_str)
    }

    pub fn set_hint(&mut self, table: NodeId, hint: impl Into<String>) {
        self.hints.insert(table, hint.into());
    }

    pub fn override_mapping(&mut self, id: NodeId, mapping: Vec<ColumnMapper>) {
        self.overrides.insert(id, mapping);
    }

    pub fn push_descriptor(&mut self, descriptor: FunctionDescriptor) {
        self.descriptors.push(descriptor);
    }

    /// Drop statement-local state, returning the collected descriptors.
    pub fn finish_statement(&mut self) -> Vec<FunctionDescriptor> {
        self.hints.clear();
        self.overrides.clear();
        std::mem::take(&mut self.descriptors)
    }
}

/// Transpiled statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlStatement {
    pub node: NodeId,
    /// Empty for declarations and stream-processor statements
    pub script: String,
    pub mapper: EntityMapper,
    /// Function values the caller must bind as parameters
    pub functions: Vec<FunctionDescriptor>,
}

/// Result of one transpile call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TranspilerOutput {
    pub statements: Vec<SqlStatement>,
    /// Mappers of statements that return rows
    pub mappers: Vec<EntityMapper>,
    pub script: String,
}

impl TranspilerOutput {
    fn assemble(statements: Vec<SqlStatement>) -> Self {
        let mappers = statements
            .iter()
            .filter(|statement| !statement.mapper.is_empty())
            .map(|statement| statement.mapper.clone())
            .collect();
        let script = statements
            .iter()
            .filter(|statement| !statement.script.is_empty())
            .map(|statement| statement.script.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            statements,
            mappers,
            script,
        }
    }
}

/// Transpiler bound to a dialect, a metadata provider and a function registry.
pub struct Transpiler<'a> {
    dialect: Dialect,
    year_offset: i32,
    terminate_statements: bool,
    metadata: &'a dyn MetadataProvider,
    functions: &'a FunctionRegistry,
}

impl<'a> Transpiler<'a> {
    pub fn new(dialect: Dialect, metadata: &'a dyn MetadataProvider, functions: &'a FunctionRegistry) -> Self {
        Self {
            dialect,
            year_offset: metadata.year_offset(),
            terminate_statements: true,
            metadata,
            functions,
        }
    }

    pub fn from_config(
        config: &TranspilerConfig,
        metadata: &'a dyn MetadataProvider,
        functions: &'a FunctionRegistry,
    ) -> Self {
        Self {
            dialect: config.dialect,
            year_offset: config.year_offset,
            terminate_statements: config.terminate_statements,
            metadata,
            functions,
        }
    }

    pub fn with_year_offset(mut self, years: i32) -> Self {
        self.year_offset = years;
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Transpile every statement of `model`. Any error aborts the whole call.
    pub fn transpile(&self, model: &ScriptModel) -> TranspileResult<TranspilerOutput> {
        let generator = self.dialect.generator();
        let mut cx = EmitContext::new(&model.bindings, self.metadata, self.functions, self.year_offset)
            .with_script(&model.statements);

        let mut statements = Vec::with_capacity(model.statements.len());
        for statement in &model.statements {
            let mut script = transpile_statement(generator.as_ref(), &mut cx, statement)?;
            if !self.terminate_statements {
                while script.ends_with(';') {
                    script.pop();
                }
            }
            let mapper = statement_mapper(&cx, statement);
            tracing::debug!(
                dialect = %self.dialect,
                node = %statement.id(),
                statement = statement.keyword(),
                bytes = script.len(),
                "statement transpiled"
            );
            statements.push(SqlStatement {
                node: statement.id(),
                script,
                mapper,
                functions: cx.finish_statement(),
            });
        }

        Ok(TranspilerOutput::assemble(statements))
    }
}

fn transpile_statement(
    generator: &dyn SqlGenerator,
    cx: &mut EmitContext<'_>,
    statement: &Statement,
) -> TranspileResult<String> {
    match statement {
        Statement::Declare(_) => Ok(String::new()),
        Statement::Select(select) => dml::select::build_select(generator, cx, select),
        Statement::Insert(insert) => dml::insert::build_insert(generator, cx, insert),
        Statement::Update(update) => dml::update::build_update(generator, cx, update),
        Statement::Delete(delete) => dml::delete::build_delete(generator, cx, delete),
        Statement::Upsert(upsert) => dml::upsert::build_upsert(generator, cx, upsert),
        Statement::Consume(consume) => dml::consume::build_consume(generator, cx, consume),
        Statement::TableVariable(table) => dml::select::build_table_variable(generator, cx, table, false),
        Statement::TemporaryTable(table) => dml::select::build_table_variable(generator, cx, table, true),
        Statement::CreateType(create) => ddl::build_create_type(generator.dialect(), cx, create),
        Statement::CreateSequence(create) => ddl::build_create_sequence(generator.dialect(), create),
        Statement::DropSequence(drop) => Ok(ddl::build_drop_sequence(drop)),
        Statement::ApplySequence(apply) => ddl::build_apply_sequence(generator, cx, apply),
        Statement::RevokeSequence(revoke) => ddl::build_revoke_sequence(generator, cx, revoke),
    }
}

/// Output mapper of a statement. INTO forms return no rows and map nothing.
fn statement_mapper(cx: &EmitContext<'_>, statement: &Statement) -> EntityMapper {
    let year_offset = cx.year_offset;
    match statement {
        Statement::Select(select) => {
            let first = select.query.first_select();
            let name = match &first.from {
                Some(crate::ast::TableSource::Derived(derived)) => derived.alias.clone(),
                Some(source) => source
                    .leading_table()
                    .map(|table| table.source_name().to_string())
                    .unwrap_or_default(),
                None => String::new(),
            };
            let mut mapper = EntityMapper::new(name, year_offset);
            if first.into.is_none() {
                mapper.properties = map_projection(&first.columns, cx.bindings);
            }
            mapper
        }
        Statement::Consume(consume) => {
            let name = consume
                .from
                .as_ref()
                .and_then(|source| source.leading_table())
                .map(|table| table.source_name().to_string())
                .unwrap_or_default();
            let mut mapper = EntityMapper::new(name, year_offset);
            if consume.into.is_none() && consume.target.is_none() {
                mapper.properties = map_projection(&consume.columns, cx.bindings);
            }
            mapper
        }
        Statement::Update(update) => {
            output_mapper(update.target.source_name(), update.output.as_ref(), cx.bindings, year_offset)
        }
        Statement::Delete(delete) => {
            output_mapper(delete.target.source_name(), delete.output.as_ref(), cx.bindings, year_offset)
        }
        Statement::Insert(insert) => EntityMapper::new(insert.target.source_name(), year_offset),
        Statement::Upsert(upsert) => EntityMapper::new(upsert.target.source_name(), year_offset),
        Statement::TableVariable(table) | Statement::TemporaryTable(table) => {
            EntityMapper::new(table.name.clone(), year_offset)
        }
        Statement::Declare(_)
        | Statement::CreateType(_)
        | Statement::CreateSequence(_)
        | Statement::DropSequence(_)
        | Statement::ApplySequence(_)
        | Statement::RevokeSequence(_) => EntityMapper::new(String::new(), year_offset),
    }
}

fn output_mapper(
    name: &str,
    output: Option<&crate::ast::OutputClause>,
    bindings: &Bindings,
    year_offset: i32,
) -> EntityMapper {
    let mut mapper = EntityMapper::new(name, year_offset);
    if let Some(output) = output.filter(|output| output.into.is_none()) {
        mapper.properties = map_projection(&output.columns, bindings);
    }
    mapper
}
