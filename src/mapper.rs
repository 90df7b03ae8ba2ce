//! Output mappers: how result-set columns map back to script properties.

use serde::{Deserialize, Serialize};

use crate::ast::{ColumnExpr, Expr};
use crate::binding::{Bindings, ColumnMapper};

/// Named projection of one statement's result set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityMapper {
    /// Source table alias, or the table name
    pub name: String,
    pub year_offset: i32,
    pub properties: Vec<PropertyMapper>,
}

impl EntityMapper {
    pub fn new(name: impl Into<String>, year_offset: i32) -> Self {
        Self {
            name: name.into(),
            year_offset,
            properties: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Total number of result-set columns.
    pub fn column_count(&self) -> usize {
        self.properties.iter().map(|p| p.columns.len()).sum()
    }
}

/// One script-level property and the physical output columns carrying it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyMapper {
    pub name: String,
    pub columns: Vec<ColumnMapper>,
}

/// Build property mappers for a projection.
///
/// Each output column is named by the alias under which it appears in the
/// result set; computed columns without a mapping map to their alias.
pub fn map_projection(columns: &[ColumnExpr], bindings: &Bindings) -> Vec<PropertyMapper> {
    let mut properties = Vec::with_capacity(columns.len());
    for (ordinal, column) in columns.iter().enumerate() {
        let name = column
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("column{}", ordinal + 1));

        let mapped = match &column.expr {
            Expr::Column(reference) => bindings.mapping(reference.id),
            _ => None,
        };

        let outputs = match mapped {
            Some(mapping) if !mapping.is_empty() => mapping
                .iter()
                .map(|mapper| ColumnMapper {
                    name: mapper.output_name().to_string(),
                    alias: None,
                    tag: mapper.tag,
                    type_name: mapper.type_name.clone(),
                })
                .collect(),
            _ => vec![ColumnMapper::new(name.clone())],
        };

        properties.push(PropertyMapper {
            name,
            columns: outputs,
        });
    }
    properties
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{LiteralKind, ModelBuilder, ScalarExpr};
    use crate::binding::{ColumnPurpose, MetadataColumn, PropertyDefinition, TypeTag};

    #[test]
    fn test_map_projection() {
        let mut b = ModelBuilder::new();
        let owner = PropertyDefinition::new(
            "Owner",
            vec![
                MetadataColumn::new("_OwnerTRef", "binary")
                    .with_length(4)
                    .with_purpose(ColumnPurpose::TypeCode),
                MetadataColumn::new("_OwnerRRef", "binary")
                    .with_length(16)
                    .with_purpose(ColumnPurpose::Identity),
            ],
        );
        let columns = vec![
            b.select_property(Some("t"), &owner, None),
            b.computed(Expr::Scalar(ScalarExpr::new(LiteralKind::Number, "1")), "One"),
        ];
        let properties = map_projection(&columns, b.bindings());

        assert_eq!(properties.len(), 2);
        assert_eq!(properties[0].name, "Owner");
        let names: Vec<&str> = properties[0].columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Owner_TRef", "Owner_RRef"]);
        assert_eq!(properties[0].columns[1].tag, Some(TypeTag::Entity));
        assert_eq!(properties[1].columns[0].name, "One");
    }
}
