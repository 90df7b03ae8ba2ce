//! Structural type inference for computed columns.
//!
//! Used to declare table variables and CONSUME result tables whose columns
//! have no schema-backed type. Only the shape of the defining expression is
//! inspected; CASE looks at its first THEN branch only.

use crate::ast::{ColumnExpr, Expr, FunctionExpr, LiteralKind, NodeId};
use crate::binding::{Binding, PrimitiveType};
use crate::error::{TranspileError, TranspileResult};
use crate::transpiler::EmitContext;
use crate::transpiler::dialect::Dialect;

/// Column of a synthesized table declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: String,
    pub type_name: String,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// One inferred physical column; `suffix` distinguishes the parts of a
/// multi-column value.
struct Shape {
    suffix: &'static str,
    type_name: String,
}

impl Shape {
    fn single(type_name: impl Into<String>) -> Vec<Shape> {
        vec![Shape {
            suffix: "",
            type_name: type_name.into(),
        }]
    }
}

/// Definitions for every column of a projection, in output order.
pub fn column_definitions(
    dialect: Dialect,
    cx: &EmitContext<'_>,
    columns: &[ColumnExpr],
) -> TranspileResult<Vec<ColumnDefinition>> {
    let mut definitions = Vec::with_capacity(columns.len());
    for column in columns {
        definitions.extend(infer_columns(dialect, cx, column)?);
    }
    Ok(definitions)
}

/// Physical columns produced by one projected column.
pub fn infer_columns(
    dialect: Dialect,
    cx: &EmitContext<'_>,
    column: &ColumnExpr,
) -> TranspileResult<Vec<ColumnDefinition>> {
    if let Expr::Column(reference) = &column.expr {
        if let Some(mapping) = cx.mapping(reference.id) {
            if !mapping.is_empty() && mapping.iter().all(|m| m.type_name.is_some()) {
                return Ok(mapping
                    .iter()
                    .map(|m| {
                        ColumnDefinition::new(m.output_name(), m.type_name.clone().unwrap_or_default())
                    })
                    .collect());
            }
        }
    }

    let mut base = column.name().unwrap_or("column").to_string();
    if column.alias.is_none() {
        if let Expr::Column(reference) = &column.expr {
            if let Some(Binding::Property(property)) = cx.binding(reference.id) {
                base = property.name.clone();
            }
        }
    }

    let shapes = infer_expr(dialect, cx, &column.expr)?;
    Ok(shapes
        .into_iter()
        .map(|shape| {
            let name = if shape.suffix.is_empty() {
                base.clone()
            } else {
                format!("{}_{}", base, shape.suffix)
            };
            ColumnDefinition::new(name, shape.type_name)
        })
        .collect())
}

fn infer_expr(dialect: Dialect, cx: &EmitContext<'_>, expr: &Expr) -> TranspileResult<Vec<Shape>> {
    match expr {
        Expr::Column(column) => match cx.binding(column.id) {
            Some(Binding::Column(parent)) => match cx.parent_column(*parent) {
                Some(defining) => infer_expr(dialect, cx, &defining.expr),
                None => Err(unresolved(column.id, &column.identifier)),
            },
            Some(Binding::EnumValue(_)) => Ok(Shape::single(uuid_type(dialect))),
            Some(Binding::Property(property)) => Ok(property
                .ordered_columns()
                .into_iter()
                .map(|metadata| Shape {
                    suffix: if property.columns.len() > 1 { metadata.purpose.literal() } else { "" },
                    type_name: metadata.sql_type(),
                })
                .collect()),
            Some(Binding::Primitive(primitive)) => Ok(primitive_shapes(dialect, *primitive)),
            _ => Err(unresolved(column.id, &column.identifier)),
        },
        Expr::Scalar(scalar) => {
            let type_name = match scalar.kind {
                LiteralKind::Boolean => pick(dialect, "binary(1)", "boolean"),
                LiteralKind::Number => "numeric(19,5)",
                LiteralKind::DateTime => pick(dialect, "datetime2", "timestamp"),
                LiteralKind::String => pick(dialect, "nvarchar(max)", "text"),
                LiteralKind::Binary => pick(dialect, "varbinary(max)", "bytea"),
                LiteralKind::Uuid | LiteralKind::Entity => uuid_type(dialect),
                LiteralKind::Null => {
                    return Err(TranspileError::schema(
                        None,
                        "Failed to infer column type of NULL literal.",
                    ));
                }
            };
            Ok(Shape::single(type_name))
        }
        Expr::Variable(variable) => match cx.binding(variable.id) {
            Some(Binding::Primitive(primitive)) => Ok(primitive_shapes(dialect, *primitive)),
            _ => Err(unresolved(variable.id, &variable.identifier)),
        },
        Expr::Member(member) => match cx.binding(member.id) {
            Some(Binding::Primitive(primitive)) => Ok(primitive_shapes(dialect, *primitive)),
            _ => Err(unresolved(member.id, &member.parameter_name())),
        },
        Expr::Function(function) => infer_function(dialect, cx, function),
        Expr::Case(case) => match (case.branches.first(), case.otherwise.as_deref()) {
            (Some(branch), _) => infer_expr(dialect, cx, &branch.then),
            (None, Some(otherwise)) => infer_expr(dialect, cx, otherwise),
            (None, None) => Err(TranspileError::schema(None, "Failed to infer column type of empty CASE.")),
        },
        Expr::Unary { expr, .. } | Expr::Group(expr) => infer_expr(dialect, cx, expr),
        Expr::Arithmetic { left, .. } => infer_expr(dialect, cx, left),
        Expr::Logical { .. } | Expr::Comparison(_) => {
            Ok(Shape::single(pick(dialect, "binary(1)", "boolean")))
        }
        Expr::Subquery(query) => match query.first_select().columns.first() {
            Some(column) => infer_expr(dialect, cx, &column.expr),
            None => Err(TranspileError::schema(None, "Failed to infer column type of empty subquery.")),
        },
        Expr::Values(_) | Expr::Star => Err(TranspileError::schema(
            None,
            "Failed to infer column type of a value list.",
        )),
    }
}

fn infer_function(dialect: Dialect, cx: &EmitContext<'_>, function: &FunctionExpr) -> TranspileResult<Vec<Shape>> {
    let type_name = match function.upper_name().as_str() {
        "DATALENGTH" | "OCTET_LENGTH" | "CHARLENGTH" => pick(dialect, "int", "integer"),
        "COUNT" => pick(dialect, "int", "bigint"),
        "ROW_NUMBER" | "RANK" | "DENSE_RANK" | "NTILE" => "bigint",
        "SUBSTRING" | "CONCAT" | "CONCAT_WS" | "STRING_AGG" => pick(dialect, "nvarchar(max)", "text"),
        "NOW" | "UTC" => pick(dialect, "datetime2", "timestamp"),
        "VECTOR" => pick(dialect, "numeric(19,0)", "bigint"),
        "NEWUUID" => uuid_type(dialect),
        "TYPEOF" => pick(dialect, "binary(4)", "bytea"),
        _ => {
            return match function.args.first() {
                Some(arg) => infer_expr(dialect, cx, arg),
                None => Err(TranspileError::schema(
                    function.id,
                    format!("Failed to infer column type of function {}.", function.name),
                )),
            };
        }
    };
    Ok(Shape::single(type_name))
}

fn primitive_shapes(dialect: Dialect, primitive: PrimitiveType) -> Vec<Shape> {
    let type_name = match primitive {
        PrimitiveType::Boolean => pick(dialect, "binary(1)", "boolean"),
        PrimitiveType::Decimal => "numeric(19,5)",
        PrimitiveType::Integer => pick(dialect, "int", "integer"),
        PrimitiveType::DateTime => pick(dialect, "datetime2", "timestamp"),
        PrimitiveType::String => pick(dialect, "nvarchar(max)", "text"),
        PrimitiveType::Binary => pick(dialect, "varbinary(max)", "bytea"),
        PrimitiveType::Uuid => uuid_type(dialect),
        PrimitiveType::Version => pick(dialect, "binary(8)", "bytea"),
        PrimitiveType::Entity => {
            return vec![
                Shape {
                    suffix: "TRef",
                    type_name: pick(dialect, "binary(4)", "bytea").to_string(),
                },
                Shape {
                    suffix: "RRef",
                    type_name: uuid_type(dialect).to_string(),
                },
            ];
        }
    };
    Shape::single(type_name)
}

fn pick(dialect: Dialect, sqlserver: &'static str, postgres: &'static str) -> &'static str {
    match dialect {
        Dialect::SqlServer => sqlserver,
        Dialect::Postgres => postgres,
    }
}

fn uuid_type(dialect: Dialect) -> &'static str {
    pick(dialect, "binary(16)", "bytea")
}

fn unresolved(node: NodeId, identifier: &str) -> TranspileError {
    TranspileError::binding(
        node,
        format!("Failed to create column definition for identifier [{}]", identifier),
    )
}
