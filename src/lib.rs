//! # scriptql
//!
//! Transpiles a resolved data-access script into MS-SQL or PostgreSQL.
//!
//! A script arrives as a [`ast::ScriptModel`]: statements plus a side table
//! binding every identifier to an entity, property, computed column or local
//! table. The transpiler walks the statements and emits dialect SQL along
//! with one [`mapper::EntityMapper`] per row-returning statement.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use scriptql::prelude::*;
//!
//! let metadata = InMemoryMetadata::load("catalog.json".as_ref())?;
//! let model: ScriptModel = serde_json::from_str(&script_json)?;
//!
//! let output = scriptql::transpile(&model, Dialect::Postgres, &metadata)?;
//! println!("{}", output.script);
//! ```
//!
//! ## Statements
//!
//! | Statement            | MS-SQL                          | PostgreSQL                        |
//! |----------------------|---------------------------------|-----------------------------------|
//! | `CONSUME`            | `DELETE ... OUTPUT deleted.*`   | `DELETE ... USING ... RETURNING`  |
//! | `UPSERT`             | `UPDATE` + guarded `INSERT`     | `UPDATE` + guarded `INSERT`       |
//! | `DECLARE @t = ...`   | table variable                  | temporary table                   |
//! | `CREATE TYPE`        | `CREATE TYPE ... AS TABLE`      | composite type                    |
//! | `APPLY SEQUENCE`     | `INSTEAD OF INSERT` trigger     | `BEFORE INSERT` trigger function  |

pub mod ast;
pub mod binding;
pub mod config;
pub mod error;
pub mod mapper;
pub mod metadata;
pub mod transpiler;

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::binding::{Binding, EntityDefinition, IndexInfo, PrimitiveType, PropertyDefinition};
    pub use crate::config::TranspilerConfig;
    pub use crate::error::*;
    pub use crate::mapper::{EntityMapper, PropertyMapper};
    pub use crate::metadata::{InMemoryMetadata, MetadataProvider};
    pub use crate::transpiler::{Dialect, FunctionRegistry, Transpiler, TranspilerOutput};
}

/// Transpile `model` with the default function registry.
///
/// # Example
///
/// ```
/// use scriptql::{transpile, ast::ScriptModel, metadata::InMemoryMetadata, transpiler::Dialect};
///
/// let output = transpile(&ScriptModel::default(), Dialect::Postgres, &InMemoryMetadata::new()).unwrap();
/// assert!(output.script.is_empty());
/// ```
pub fn transpile(
    model: &ast::ScriptModel,
    dialect: transpiler::Dialect,
    metadata: &dyn metadata::MetadataProvider,
) -> error::TranspileResult<transpiler::TranspilerOutput> {
    let functions = transpiler::FunctionRegistry::default();
    transpiler::Transpiler::new(dialect, metadata, &functions).transpile(model)
}
