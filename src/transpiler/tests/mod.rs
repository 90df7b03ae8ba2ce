//! Transpiler test modules.
//!
//! Tests are organized by category:
//! - `core`: SELECT, INSERT, UPDATE, DELETE and result assembly
//! - `dialects`: literal, function and row-source differences between backends
//! - `consume`: destructive reads, simple and enriched
//! - `ddl`: CREATE TYPE and sequence statements
//! - `upsert`: UPSERT decomposition

mod core;
mod ddl;
mod dialects;

use crate::ast::{
    ColumnReference, ConsumeStatement, Expr, LiteralKind, ModelBuilder, OrderClause, OrderItem,
    ScalarExpr, ScriptModel, Statement,
};
use crate::binding::{
    ColumnPurpose, EntityDefinition, IndexColumn, IndexInfo, MetadataColumn, PropertyDefinition,
};
use crate::error::TranspileError;
use crate::metadata::InMemoryMetadata;
use crate::transpiler::{Dialect, FunctionRegistry, Transpiler, TranspilerOutput};

/// Queue register: `_InfoRg42 (_Fld43 Moment, _Fld44 Id, _Fld45 Body)`.
pub(super) fn queue() -> EntityDefinition {
    EntityDefinition {
        name: "Queue".into(),
        table_name: "_InfoRg42".into(),
        type_code: 42,
        properties: vec![
            PropertyDefinition::new(
                "Moment",
                vec![MetadataColumn::new("_Fld43", "numeric").with_precision(19, 0)],
            ),
            PropertyDefinition::new("Id", vec![MetadataColumn::new("_Fld44", "binary").with_length(16)]),
            PropertyDefinition::new("Body", vec![MetadataColumn::new("_Fld45", "nvarchar").with_length(-1)]),
        ],
    }
}

/// Exchange node catalog: `_Node7 (_IDRRef Ref, _Code Code)`.
pub(super) fn node() -> EntityDefinition {
    EntityDefinition {
        name: "Node".into(),
        table_name: "_Node7".into(),
        type_code: 7,
        properties: vec![
            PropertyDefinition::new("Ref", vec![MetadataColumn::new("_IDRRef", "binary").with_length(16)]),
            PropertyDefinition::new("Code", vec![MetadataColumn::new("_Code", "nvarchar").with_length(9)]),
        ],
    }
}

/// Catalog product with a polymorphic `Owner` reference.
pub(super) fn product() -> EntityDefinition {
    EntityDefinition {
        name: "Product".into(),
        table_name: "_Reference12".into(),
        type_code: 12,
        properties: vec![
            PropertyDefinition::new("Ref", vec![MetadataColumn::new("_IDRRef", "binary").with_length(16)]),
            PropertyDefinition::new("Name", vec![MetadataColumn::new("_Description", "nvarchar").with_length(50)]),
            PropertyDefinition::new(
                "Owner",
                vec![
                    MetadataColumn::new("_OwnerTRef", "binary")
                        .with_length(4)
                        .with_purpose(ColumnPurpose::TypeCode),
                    MetadataColumn::new("_OwnerRRef", "binary")
                        .with_length(16)
                        .with_purpose(ColumnPurpose::Identity),
                ],
            ),
        ],
    }
}

pub(super) fn queue_index() -> IndexInfo {
    IndexInfo {
        name: "_InfoRg42_pk".into(),
        is_primary: true,
        is_unique: true,
        is_clustered: true,
        columns: vec![IndexColumn::new("_Fld43"), IndexColumn::new("_Fld44")],
    }
}

pub(super) fn metadata() -> InMemoryMetadata {
    InMemoryMetadata::new()
        .with_entity(queue())
        .with_entity(node())
        .with_entity(product())
        .with_index("_InfoRg42", queue_index())
}

pub(super) fn transpile_with(
    model: &ScriptModel,
    dialect: Dialect,
    metadata: &InMemoryMetadata,
) -> Result<TranspilerOutput, TranspileError> {
    let functions = FunctionRegistry::default();
    Transpiler::new(dialect, metadata, &functions).transpile(model)
}

pub(super) fn transpile(model: &ScriptModel, dialect: Dialect) -> TranspilerOutput {
    transpile_with(model, dialect, &metadata()).unwrap()
}

pub(super) fn sql(model: &ScriptModel, dialect: Dialect) -> String {
    transpile(model, dialect).script
}

pub(super) fn number(value: &str) -> Expr {
    Expr::Scalar(ScalarExpr::new(LiteralKind::Number, value))
}

pub(super) fn string(value: &str) -> Expr {
    Expr::Scalar(ScalarExpr::new(LiteralKind::String, value))
}

pub(super) fn column(reference: ColumnReference) -> Expr {
    Expr::Column(reference)
}

pub(super) fn ascending(reference: ColumnReference) -> OrderItem {
    OrderItem {
        expr: Expr::Column(reference),
        descending: false,
    }
}

/// `CONSUME TOP 10 Moment, Id, Body FROM Queue ORDER BY Moment, Id`
pub(super) fn consume_queue(strict_order: bool) -> ScriptModel {
    let queue = queue();
    let mut b = ModelBuilder::new();
    let from = b.entity_table(&queue, None);
    let columns = queue
        .properties
        .iter()
        .map(|property| b.select_property(None, property, None))
        .collect();
    let order = OrderClause::new(vec![
        ascending(b.property(None, &queue.properties[0])),
        ascending(b.property(None, &queue.properties[1])),
    ]);
    let id = b.id();
    let consume = ConsumeStatement {
        id,
        top: Some(number("10")),
        columns,
        into: None,
        from: Some(from),
        where_: None,
        order: Some(order),
        strict_order,
        target: None,
    };
    b.finish(vec![Statement::Consume(consume)])
}
