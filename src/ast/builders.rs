//! Construction helpers for resolved script models.
//!
//! The parser and resolver live outside this crate; `ModelBuilder` plays both
//! roles for programmatic callers and tests. It allocates node ids and records
//! the bindings and column mappings the resolver would produce.
//!
//! # Example
//! ```
//! use scriptql::ast::ModelBuilder;
//! use scriptql::binding::{EntityDefinition, MetadataColumn, PropertyDefinition};
//!
//! let entity = EntityDefinition {
//!     name: "Queue".into(),
//!     table_name: "_InfoRg42".into(),
//!     type_code: 42,
//!     properties: vec![PropertyDefinition::new(
//!         "Id",
//!         vec![MetadataColumn::new("_Fld43", "binary").with_length(16)],
//!     )],
//! };
//!
//! let mut b = ModelBuilder::new();
//! let table = b.entity_table(&entity, None);
//! let id = b.select_property(None, &entity.properties[0], None);
//! let select = b.select(vec![id], Some(table));
//! assert_eq!(select.columns.len(), 1);
//! ```

use crate::ast::{
    ColumnExpr, ColumnReference, Expr, FunctionExpr, NodeId, QueryExpr, ScriptModel, SelectExpr,
    Statement, TableExpression, TableReference, TableSource, VariableReference,
};
use crate::binding::{
    Binding, Bindings, ColumnMapper, EntityDefinition, MetadataColumn, PrimitiveType,
    PropertyDefinition,
};

#[derive(Debug, Default)]
pub struct ModelBuilder {
    next: u32,
    bindings: Bindings,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh node id.
    pub fn id(&mut self) -> NodeId {
        self.next += 1;
        NodeId(self.next)
    }

    pub fn bind(&mut self, id: NodeId, binding: Binding) {
        self.bindings.bind(id, binding);
    }

    pub fn map(&mut self, id: NodeId, mapping: Vec<ColumnMapper>) {
        self.bindings.map(id, mapping);
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Table reference with an explicit binding.
    pub fn table(&mut self, identifier: &str, alias: Option<&str>, binding: Binding) -> TableReference {
        let id = self.id();
        self.bind(id, binding);
        TableReference {
            id,
            identifier: identifier.to_string(),
            alias: alias.map(str::to_string),
        }
    }

    /// Table reference bound to a metadata entity.
    pub fn entity_table(&mut self, entity: &EntityDefinition, alias: Option<&str>) -> TableSource {
        TableSource::Table(self.table(&entity.name, alias, Binding::Entity(entity.clone())))
    }

    /// Reference to an entity property, e.g. in WHERE or ORDER BY.
    pub fn property(&mut self, table_alias: Option<&str>, property: &PropertyDefinition) -> ColumnReference {
        let mapping = property
            .ordered_columns()
            .into_iter()
            .map(|column| property_mapper(table_alias, column))
            .collect();
        self.column_ref(
            &qualify(table_alias, &property.name),
            Binding::Property(property.clone()),
            mapping,
        )
    }

    /// Projected entity property; output columns are aliased after the
    /// property (or `alias`), suffixed by purpose when there are several.
    pub fn select_property(
        &mut self,
        table_alias: Option<&str>,
        property: &PropertyDefinition,
        alias: Option<&str>,
    ) -> ColumnExpr {
        let output = alias.unwrap_or(&property.name);
        let columns = property.ordered_columns();
        let single = columns.len() == 1;
        let mapping = columns
            .into_iter()
            .map(|column| {
                let suffix = column.purpose.literal();
                let name = if single || suffix.is_empty() {
                    output.to_string()
                } else {
                    format!("{}_{}", output, suffix)
                };
                property_mapper(table_alias, column).with_alias(name)
            })
            .collect();
        let reference = self.column_ref(
            &qualify(table_alias, &property.name),
            Binding::Property(property.clone()),
            mapping,
        );
        let id = self.id();
        ColumnExpr {
            id,
            expr: Expr::Column(reference),
            alias: alias.map(str::to_string),
        }
    }

    /// Column reference with an explicit binding and mapping.
    pub fn column_ref(&mut self, identifier: &str, binding: Binding, mapping: Vec<ColumnMapper>) -> ColumnReference {
        let id = self.id();
        self.bind(id, binding);
        if !mapping.is_empty() {
            self.map(id, mapping);
        }
        ColumnReference {
            id,
            identifier: identifier.to_string(),
        }
    }

    /// Reference to a column projected by a CTE or derived table `table_alias`.
    pub fn derived_column(&mut self, table_alias: &str, parent: &ColumnExpr) -> ColumnReference {
        let name = parent.name().unwrap_or_default().to_string();
        let mapping = match &parent.expr {
            Expr::Column(column) => self
                .bindings
                .mapping(column.id)
                .map(|mapping| {
                    mapping
                        .iter()
                        .map(|mapper| ColumnMapper {
                            name: qualify(Some(table_alias), mapper.output_name()),
                            alias: None,
                            tag: mapper.tag,
                            type_name: mapper.type_name.clone(),
                        })
                        .collect()
                })
                .unwrap_or_default(),
            _ => vec![ColumnMapper::new(qualify(Some(table_alias), &name))],
        };
        self.column_ref(&qualify(Some(table_alias), &name), Binding::Column(parent.id), mapping)
    }

    /// Projected reference to a CTE or derived-table column.
    pub fn select_derived(&mut self, table_alias: &str, parent: &ColumnExpr) -> ColumnExpr {
        let reference = self.derived_column(table_alias, parent);
        let aliased: Vec<ColumnMapper> = self
            .bindings
            .mapping(reference.id)
            .unwrap_or_default()
            .iter()
            .map(|mapper| {
                let alias = mapper.column_name().to_string();
                mapper.clone().with_alias(alias)
            })
            .collect();
        let id = self.id();
        if let Some(binding) = self.bindings.get(reference.id).cloned() {
            self.bind(id, binding);
        }
        self.map(id, aliased);
        let column_id = self.id();
        ColumnExpr {
            id: column_id,
            expr: Expr::Column(ColumnReference {
                id,
                identifier: reference.identifier,
            }),
            alias: None,
        }
    }

    /// Projected computed expression.
    pub fn computed(&mut self, expr: Expr, alias: &str) -> ColumnExpr {
        let id = self.id();
        ColumnExpr {
            id,
            expr,
            alias: Some(alias.to_string()),
        }
    }

    pub fn function(&mut self, name: &str, args: Vec<Expr>) -> FunctionExpr {
        FunctionExpr {
            id: self.id(),
            name: name.to_string(),
            args,
            distinct: false,
            over: None,
        }
    }

    pub fn variable(&mut self, identifier: &str, primitive: PrimitiveType) -> Expr {
        let id = self.id();
        self.bind(id, Binding::Primitive(primitive));
        Expr::Variable(VariableReference {
            id,
            identifier: identifier.to_string(),
        })
    }

    pub fn select(&mut self, columns: Vec<ColumnExpr>, from: Option<TableSource>) -> SelectExpr {
        let id = self.id();
        SelectExpr::new(id, columns, from)
    }

    /// `(query) AS alias`
    pub fn derived(&mut self, query: QueryExpr, alias: &str) -> TableExpression {
        let id = self.id();
        self.bind(id, Binding::DerivedTable);
        TableExpression {
            id,
            query: Box::new(query),
            alias: alias.to_string(),
        }
    }

    pub fn finish(self, statements: Vec<Statement>) -> ScriptModel {
        ScriptModel::new(statements, self.bindings)
    }
}

fn property_mapper(table_alias: Option<&str>, column: &MetadataColumn) -> ColumnMapper {
    let mut mapper = ColumnMapper::new(qualify(table_alias, &column.name)).with_tag(column.tag());
    mapper.type_name = Some(column.sql_type());
    mapper
}

fn qualify(table: Option<&str>, column: &str) -> String {
    match table {
        Some(table) if !table.is_empty() => format!("{}.{}", table, column),
        _ => column.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::ColumnPurpose;

    #[test]
    fn test_select_property_aliases_multi_column() {
        let owner = PropertyDefinition::new(
            "Owner",
            vec![
                MetadataColumn::new("_OwnerRRef", "binary")
                    .with_length(16)
                    .with_purpose(ColumnPurpose::Identity),
                MetadataColumn::new("_OwnerTRef", "binary")
                    .with_length(4)
                    .with_purpose(ColumnPurpose::TypeCode),
            ],
        );
        let mut b = ModelBuilder::new();
        let column = b.select_property(Some("t"), &owner, None);
        let Expr::Column(reference) = &column.expr else {
            panic!("expected column reference");
        };
        let mapping = b.bindings().mapping(reference.id).unwrap();
        let names: Vec<(&str, &str)> = mapping
            .iter()
            .map(|m| (m.name.as_str(), m.alias.as_deref().unwrap()))
            .collect();
        assert_eq!(
            names,
            vec![("t._OwnerTRef", "Owner_TRef"), ("t._OwnerRRef", "Owner_RRef")]
        );
    }

    #[test]
    fn test_ids_are_unique() {
        let mut b = ModelBuilder::new();
        let a = b.id();
        let c = b.id();
        assert_ne!(a, c);
    }
}
