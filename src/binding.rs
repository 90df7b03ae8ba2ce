//! Resolved bindings and column mappings.
//!
//! The resolver (outside this crate) attaches a [`Binding`] and, for column
//! references, an ordered list of [`ColumnMapper`] entries to syntax nodes.
//! Both are stored here keyed by [`NodeId`] and are read-only while SQL is
//! being emitted.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ast::NodeId;

/// Primitive type discriminator of an output column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeTag {
    /// Union type discriminator column
    Tag,
    Boolean,
    Numeric,
    DateTime,
    String,
    Binary,
    Uuid,
    /// Entity type code column
    TypeCode,
    /// Entity identity column
    Entity,
    Version,
    Integer,
}

/// One physical output column of a column reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMapper {
    /// Physical column, possibly qualified (`t._Fld12`)
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub tag: Option<TypeTag>,
    /// Physical type with qualifiers (`nvarchar(50)`)
    #[serde(default)]
    pub type_name: Option<String>,
}

impl ColumnMapper {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            tag: None,
            type_name: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_tag(mut self, tag: TypeTag) -> Self {
        self.tag = Some(tag);
        self
    }

    /// Unqualified physical column name.
    pub fn column_name(&self) -> &str {
        crate::ast::split_identifier(&self.name).1
    }

    /// Name under which the column appears in a result set.
    pub fn output_name(&self) -> &str {
        match self.alias.as_deref() {
            Some(alias) if !alias.is_empty() => alias,
            _ => self.column_name(),
        }
    }
}

/// Role of a physical column inside a (possibly polymorphic) property.
///
/// Declaration order is the canonical column order of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ColumnPurpose {
    Default,
    Tag,
    Boolean,
    Numeric,
    DateTime,
    String,
    TypeCode,
    Identity,
}

impl ColumnPurpose {
    /// Column-name suffix used for multi-column properties.
    pub fn literal(&self) -> &'static str {
        match self {
            ColumnPurpose::Default => "",
            ColumnPurpose::Tag => "TYPE",
            ColumnPurpose::Boolean => "L",
            ColumnPurpose::Numeric => "N",
            ColumnPurpose::DateTime => "T",
            ColumnPurpose::String => "S",
            ColumnPurpose::TypeCode => "TRef",
            ColumnPurpose::Identity => "RRef",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataColumn {
    pub name: String,
    pub type_name: String,
    #[serde(default = "default_purpose")]
    pub purpose: ColumnPurpose,
    /// -1 for unlimited (max), 0 when not applicable
    #[serde(default)]
    pub length: i32,
    #[serde(default)]
    pub precision: u32,
    #[serde(default)]
    pub scale: u32,
    /// Maintained by the database (row version); never inserted
    #[serde(default)]
    pub is_generated: bool,
}

fn default_purpose() -> ColumnPurpose {
    ColumnPurpose::Default
}

impl MetadataColumn {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            purpose: ColumnPurpose::Default,
            length: 0,
            precision: 0,
            scale: 0,
            is_generated: false,
        }
    }

    pub fn with_purpose(mut self, purpose: ColumnPurpose) -> Self {
        self.purpose = purpose;
        self
    }

    pub fn with_length(mut self, length: i32) -> Self {
        self.length = length;
        self
    }

    pub fn with_precision(mut self, precision: u32, scale: u32) -> Self {
        self.precision = precision;
        self.scale = scale;
        self
    }

    /// Physical type including qualifiers: `nvarchar(max)`, `binary(16)`, `numeric(10,2)`.
    pub fn sql_type(&self) -> String {
        if self.length == -1 {
            format!("{}(max)", self.type_name)
        } else if self.length > 0 {
            format!("{}({})", self.type_name, self.length)
        } else if self.type_name == "numeric" {
            format!("{}({},{})", self.type_name, self.precision, self.scale)
        } else {
            self.type_name.clone()
        }
    }

    pub fn tag(&self) -> TypeTag {
        match self.purpose {
            ColumnPurpose::Tag => TypeTag::Tag,
            ColumnPurpose::Boolean => TypeTag::Boolean,
            ColumnPurpose::Numeric => TypeTag::Numeric,
            ColumnPurpose::DateTime => TypeTag::DateTime,
            ColumnPurpose::String => TypeTag::String,
            ColumnPurpose::TypeCode => TypeTag::TypeCode,
            ColumnPurpose::Identity => TypeTag::Entity,
            ColumnPurpose::Default => tag_of_type_name(&self.type_name),
        }
    }
}

fn tag_of_type_name(type_name: &str) -> TypeTag {
    match type_name {
        "numeric" | "decimal" => TypeTag::Numeric,
        "int" | "integer" | "bigint" | "smallint" => TypeTag::Integer,
        "datetime" | "datetime2" | "timestamp" => TypeTag::DateTime,
        "nvarchar" | "nchar" | "varchar" | "char" | "text" | "mvarchar" | "mchar" => TypeTag::String,
        "boolean" => TypeTag::Boolean,
        "uuid" => TypeTag::Uuid,
        "rowversion" | "timestamp_version" => TypeTag::Version,
        _ => TypeTag::Binary,
    }
}

/// A property of an entity, stored in one or more physical columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    pub name: String,
    pub columns: Vec<MetadataColumn>,
}

impl PropertyDefinition {
    pub fn new(name: impl Into<String>, columns: Vec<MetadataColumn>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Columns in canonical (purpose) order.
    pub fn ordered_columns(&self) -> Vec<&MetadataColumn> {
        let mut columns: Vec<&MetadataColumn> = self.columns.iter().collect();
        columns.sort_by_key(|column| column.purpose);
        columns
    }

    pub fn is_generated(&self) -> bool {
        !self.columns.is_empty() && self.columns.iter().all(|c| c.is_generated)
    }
}

/// A physical table described by metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDefinition {
    pub name: String,
    pub table_name: String,
    #[serde(default)]
    pub type_code: i32,
    pub properties: Vec<PropertyDefinition>,
}

impl EntityDefinition {
    pub fn property(&self, name: &str) -> Option<&PropertyDefinition> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// CLR-level primitive type of a variable or declared column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrimitiveType {
    Boolean,
    Decimal,
    Integer,
    DateTime,
    String,
    Binary,
    Uuid,
    /// Reference to an entity of any type (type code + identity)
    Entity,
    Version,
}

/// Physical index descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexInfo {
    pub name: String,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub is_unique: bool,
    #[serde(default)]
    pub is_clustered: bool,
    pub columns: Vec<IndexColumn>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexColumn {
    pub name: String,
    #[serde(default)]
    pub is_descending: bool,
}

impl IndexColumn {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_descending: false,
        }
    }
}

/// Pick the row-identity index: primary, then unique clustered, then unique.
pub fn select_identity_index(indexes: &[IndexInfo]) -> Option<&IndexInfo> {
    indexes
        .iter()
        .find(|index| index.is_primary)
        .or_else(|| indexes.iter().find(|index| index.is_unique && index.is_clustered))
        .or_else(|| indexes.iter().find(|index| index.is_unique))
}

/// Resolved target of a syntax node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Binding {
    /// Physical table
    Entity(EntityDefinition),
    /// Entity property (column reference)
    Property(PropertyDefinition),
    /// Defining column expression of a computed column
    Column(NodeId),
    /// Enumeration value, emitted as its identity literal
    EnumValue(Uuid),
    CommonTable,
    DerivedTable,
    TableVariable,
    TemporaryTable,
    /// Table-valued parameter of a user-defined table type
    UserDefinedType { table_name: String },
    Primitive(PrimitiveType),
    /// Reference to one fixed entity type
    EntityType { type_code: i32 },
    IndexColumn(IndexColumn),
}

/// Side table of bindings and mappings keyed by node identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bindings {
    #[serde(default)]
    bindings: HashMap<NodeId, Binding>,
    #[serde(default)]
    mappings: HashMap<NodeId, Vec<ColumnMapper>>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a binding; the first binding recorded for a node wins.
    pub fn bind(&mut self, id: NodeId, binding: Binding) {
        self.bindings.entry(id).or_insert(binding);
    }

    pub fn map(&mut self, id: NodeId, mapping: Vec<ColumnMapper>) {
        self.mappings.entry(id).or_insert(mapping);
    }

    pub fn get(&self, id: NodeId) -> Option<&Binding> {
        self.bindings.get(&id)
    }

    pub fn mapping(&self, id: NodeId) -> Option<&[ColumnMapper]> {
        self.mappings.get(&id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty() && self.mappings.is_empty()
    }
}
