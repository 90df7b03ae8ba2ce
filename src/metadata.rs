//! Metadata provider: identifier resolution and index introspection.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::binding::{Binding, EntityDefinition, IndexInfo};
use crate::error::{TranspileError, TranspileResult};

/// Catalog access needed while emitting SQL.
///
/// Implementations are consulted at most once per CONSUME or sequence
/// recalculation statement for indexes; callers that talk to a live database
/// are expected to cache.
pub trait MetadataProvider {
    /// Resolve a table identifier that carries no side-table binding.
    fn resolve(&self, identifier: &str) -> Option<Binding>;

    /// Indexes of a physical table.
    fn indexes(&self, table_name: &str) -> Vec<IndexInfo>;

    /// Years added to every datetime value stored by the backend.
    fn year_offset(&self) -> i32 {
        0
    }
}

/// Static catalog, loaded from JSON or assembled in code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InMemoryMetadata {
    #[serde(default)]
    pub year_offset: i32,
    #[serde(default)]
    pub entities: Vec<EntityDefinition>,
    /// Physical table name -> indexes
    #[serde(default)]
    pub indexes: HashMap<String, Vec<IndexInfo>>,
}

impl InMemoryMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(mut self, entity: EntityDefinition) -> Self {
        self.entities.push(entity);
        self
    }

    pub fn with_index(mut self, table_name: &str, index: IndexInfo) -> Self {
        self.indexes
            .entry(table_name.to_lowercase())
            .or_default()
            .push(index);
        self
    }

    pub fn with_year_offset(mut self, year_offset: i32) -> Self {
        self.year_offset = year_offset;
        self
    }

    pub fn from_json(json: &str) -> TranspileResult<Self> {
        let mut metadata: InMemoryMetadata = serde_json::from_str(json)
            .map_err(|e| TranspileError::Config(format!("invalid metadata: {}", e)))?;
        metadata.indexes = metadata
            .indexes
            .into_iter()
            .map(|(table, indexes)| (table.to_lowercase(), indexes))
            .collect();
        Ok(metadata)
    }

    pub fn load(path: &Path) -> TranspileResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

impl MetadataProvider for InMemoryMetadata {
    fn resolve(&self, identifier: &str) -> Option<Binding> {
        self.entities
            .iter()
            .find(|entity| {
                entity.name.eq_ignore_ascii_case(identifier)
                    || entity.table_name.eq_ignore_ascii_case(identifier)
            })
            .cloned()
            .map(Binding::Entity)
    }

    fn indexes(&self, table_name: &str) -> Vec<IndexInfo> {
        self.indexes
            .get(&table_name.to_lowercase())
            .cloned()
            .unwrap_or_default()
    }

    fn year_offset(&self) -> i32 {
        self.year_offset
    }
}
