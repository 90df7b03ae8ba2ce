use super::dialect::Dialect;
use super::traits::SqlGenerator;
use super::EmitContext;
use crate::ast::*;
use crate::binding::{Binding, EntityDefinition, IndexInfo, PrimitiveType, select_identity_index};
use crate::error::{TranspileError, TranspileResult};

/// Kind of a declared type column.
enum ColumnKind {
    Primitive(PrimitiveType),
    /// Reference to one fixed entity type
    Reference(i32),
}

fn column_kind(cx: &EmitContext<'_>, data_type: &TypeIdentifier) -> TranspileResult<ColumnKind> {
    match cx.binding(data_type.id) {
        Some(Binding::Primitive(primitive)) => return Ok(ColumnKind::Primitive(*primitive)),
        Some(Binding::EntityType { type_code }) => return Ok(ColumnKind::Reference(*type_code)),
        _ => {}
    }
    let primitive = match data_type.identifier.to_lowercase().as_str() {
        "boolean" => PrimitiveType::Boolean,
        "number" | "decimal" => PrimitiveType::Decimal,
        "datetime" => PrimitiveType::DateTime,
        "string" => PrimitiveType::String,
        "binary" => PrimitiveType::Binary,
        "uuid" => PrimitiveType::Uuid,
        "entity" => PrimitiveType::Entity,
        _ => {
            return Err(TranspileError::schema(
                data_type.id,
                format!("Unknown column data type [{}].", data_type.identifier),
            ));
        }
    };
    Ok(ColumnKind::Primitive(primitive))
}

/// Generate CREATE TYPE SQL for a table-valued parameter type.
///
/// Column names carry the primitive kind as a suffix (`_L`, `_N`, `_T`, `_S`,
/// `_B`, `_U`); entity references become `_C` + `_R` pairs, or a single
/// `_R_<code>` column when bound to one entity type.
pub fn build_create_type(dialect: Dialect, cx: &EmitContext<'_>, stmt: &CreateTypeStatement) -> TranspileResult<String> {
    let mut defs = Vec::new();
    for column in &stmt.columns {
        let kind = column_kind(cx, &column.data_type)?;
        defs.extend(type_columns(dialect, &column.name, &column.data_type, kind)?);
    }

    let mut sql = match dialect {
        Dialect::SqlServer => format!("CREATE TYPE [{}] AS TABLE\n(\n", stmt.name),
        Dialect::Postgres => format!("CREATE TYPE \"{}\" AS\n(\n", stmt.name),
    };
    sql.push_str(&defs.join(",\n"));
    sql.push_str("\n);");
    Ok(sql)
}

fn type_columns(
    dialect: Dialect,
    name: &str,
    data_type: &TypeIdentifier,
    kind: ColumnKind,
) -> TranspileResult<Vec<String>> {
    let column = |suffix: &str, sql_type: String| match dialect {
        Dialect::SqlServer => format!("_{}_{} {}", name, suffix, sql_type),
        Dialect::Postgres => format!("\"_{}_{}\" {}", name, suffix.to_lowercase(), sql_type),
    };
    let pg = dialect == Dialect::Postgres;

    let columns = match kind {
        ColumnKind::Reference(type_code) => vec![column(
            &format!("R_{}", type_code),
            if pg { "bytea" } else { "binary(16)" }.to_string(),
        )],
        ColumnKind::Primitive(PrimitiveType::Boolean) => {
            vec![column("L", if pg { "boolean" } else { "binary(1)" }.to_string())]
        }
        ColumnKind::Primitive(PrimitiveType::Decimal) => vec![column(
            "N",
            format!("numeric({},{})", data_type.qualifier1, data_type.qualifier2),
        )],
        ColumnKind::Primitive(PrimitiveType::DateTime) => vec![column(
            "T",
            if pg { "timestamp without time zone" } else { "datetime2" }.to_string(),
        )],
        ColumnKind::Primitive(PrimitiveType::String) => {
            let sql_type = match (pg, data_type.qualifier1) {
                (true, 0) => "text".to_string(),
                (true, length) => format!("varchar({})", length),
                (false, 0) => "nvarchar(max)".to_string(),
                (false, length) => format!("nvarchar({})", length),
            };
            vec![column("S", sql_type)]
        }
        ColumnKind::Primitive(PrimitiveType::Binary) => {
            vec![column("B", if pg { "bytea" } else { "varbinary(max)" }.to_string())]
        }
        ColumnKind::Primitive(PrimitiveType::Uuid) => {
            vec![column("U", if pg { "bytea" } else { "binary(16)" }.to_string())]
        }
        ColumnKind::Primitive(PrimitiveType::Entity) => vec![
            column("C", if pg { "bytea" } else { "binary(4)" }.to_string()),
            column("R", if pg { "bytea" } else { "binary(16)" }.to_string()),
        ],
        ColumnKind::Primitive(other) => {
            return Err(TranspileError::schema(
                data_type.id,
                format!("Unsupported column data type [{:?}].", other),
            ));
        }
    };
    Ok(columns)
}

/// Generate CREATE SEQUENCE SQL.
///
/// MS-SQL guards the statement with a `sys.sequences` lookup; PostgreSQL
/// sequences are always `bigint`.
pub fn build_create_sequence(dialect: Dialect, stmt: &CreateSequenceStatement) -> TranspileResult<String> {
    match dialect {
        Dialect::SqlServer => {
            let sql_type = match stmt.data_type.as_ref().map(|t| (t.identifier.to_lowercase(), t)) {
                Some((name, t)) if matches!(name.as_str(), "number" | "decimal" | "numeric") && t.qualifier1 > 0 => {
                    format!("numeric({},{})", t.qualifier1, t.qualifier2)
                }
                Some((name, _)) if name == "int" || name == "integer" => "int".to_string(),
                _ => "bigint".to_string(),
            };
            let mut sql = format!(
                "IF NOT EXISTS(SELECT 1 FROM sys.sequences WHERE name = '{}')\nBEGIN\nCREATE SEQUENCE {} AS {} START WITH {} INCREMENT BY {}",
                stmt.name, stmt.name, sql_type, stmt.start_with, stmt.increment
            );
            if stmt.cache_size > 0 {
                sql.push_str(&format!(" CACHE {}", stmt.cache_size));
            }
            sql.push_str(";\nEND;");
            Ok(sql)
        }
        Dialect::Postgres => Ok(format!(
            "CREATE SEQUENCE IF NOT EXISTS {} AS bigint INCREMENT BY {} START WITH {} CACHE {};",
            stmt.name,
            stmt.increment,
            stmt.start_with,
            stmt.cache_size.max(1)
        )),
    }
}

/// Generate DROP SEQUENCE SQL.
pub fn build_drop_sequence(stmt: &DropSequenceStatement) -> String {
    format!("DROP SEQUENCE {};", stmt.name)
}

fn sequence_entity(
    cx: &EmitContext<'_>,
    keyword: &str,
    name: &str,
    table: &TableReference,
    node: NodeId,
) -> TranspileResult<EntityDefinition> {
    if name.trim().is_empty() {
        return Err(TranspileError::statement(
            node,
            format!("[{}] Sequence identifier missing", keyword),
        ));
    }
    match cx.table_binding(table) {
        Some(Binding::Entity(entity)) => Ok(entity),
        _ => Err(TranspileError::binding(
            table.id,
            format!("[{}] Unsupported table binding", keyword),
        )),
    }
}

/// MS-SQL trigger name.
fn instead_of_insert_trigger(table_name: &str) -> String {
    format!("{}_instead_of_insert", table_name.to_lowercase())
}

/// PostgreSQL trigger function and trigger names. Table names starting with
/// `_` are appended without a separator.
fn before_insert_names(table_name: &str) -> (String, String) {
    let separator = if table_name.starts_with('_') { "" } else { "_" };
    (
        format!("fn{}{}_before_insert", separator, table_name),
        format!("tr{}{}_before_insert", separator, table_name),
    )
}

/// Generate APPLY SEQUENCE SQL: an insert trigger filling the column from
/// the sequence, plus an optional renumbering script for existing rows.
pub fn build_apply_sequence(
    g: &dyn SqlGenerator,
    cx: &EmitContext<'_>,
    stmt: &ApplySequenceStatement,
) -> TranspileResult<String> {
    let entity = sequence_entity(cx, "APPLY SEQUENCE", &stmt.name, &stmt.table, stmt.id)?;
    let Some(Binding::Property(property)) = cx.binding(stmt.column.id) else {
        return Err(TranspileError::binding(
            stmt.column.id,
            "[APPLY SEQUENCE] Unsupported column binding",
        ));
    };
    let Some(first) = property.ordered_columns().first().map(|column| column.name.clone()) else {
        return Err(TranspileError::schema(
            stmt.column.id,
            format!("[APPLY SEQUENCE] Property [{}] has no columns", property.name),
        ));
    };

    match g.dialect() {
        Dialect::SqlServer => {
            let trigger = instead_of_insert_trigger(&entity.table_name);
            let mut columns = Vec::new();
            let mut values = Vec::new();
            for candidate in &entity.properties {
                for column in candidate.ordered_columns() {
                    columns.push(column.name.clone());
                    if candidate.name == property.name {
                        values.push(g.next_value(&stmt.name));
                    } else {
                        values.push(format!("i.{}", column.name));
                    }
                }
            }

            let mut sql = format!(
                "IF OBJECT_ID('{trigger}', 'TR') IS NULL\n\
                 EXECUTE('CREATE TRIGGER {trigger} ON {table} INSTEAD OF INSERT NOT FOR REPLICATION AS\n\
                 INSERT {table}({columns})\n\
                 SELECT {values}\n\
                 FROM INSERTED AS i;');",
                trigger = trigger,
                table = entity.table_name,
                columns = columns.join(", "),
                values = values.join(", "),
            );
            if stmt.recalculate {
                sql.push('\n');
                sql.push_str(&recalculate_script(g, cx, &entity.table_name, &first, &stmt.name, stmt.id)?);
            }
            Ok(sql)
        }
        Dialect::Postgres => {
            let table_name = entity.table_name.to_lowercase();
            let column_name = first.to_lowercase();
            let (function, trigger) = before_insert_names(&table_name);

            let mut sql = format!(
                "CREATE FUNCTION {function}()\n\
                 RETURNS trigger AS $BODY$\n\
                 BEGIN\n\
                 NEW.{column} := {next};\n\
                 RETURN NEW;\n\
                 END $BODY$ LANGUAGE 'plpgsql';\n\
                 \n\
                 CREATE TRIGGER {trigger}\n\
                 BEFORE INSERT ON {table} FOR EACH ROW\n\
                 EXECUTE PROCEDURE {function}();",
                function = function,
                column = column_name,
                next = g.next_value(&stmt.name),
                trigger = trigger,
                table = table_name,
            );
            if stmt.recalculate {
                sql.push('\n');
                sql.push_str(&recalculate_script(g, cx, &table_name, &column_name, &stmt.name, stmt.id)?);
            }
            Ok(sql)
        }
    }
}

/// Generate REVOKE SEQUENCE SQL: drops what APPLY SEQUENCE installed.
pub fn build_revoke_sequence(
    g: &dyn SqlGenerator,
    cx: &EmitContext<'_>,
    stmt: &RevokeSequenceStatement,
) -> TranspileResult<String> {
    let entity = sequence_entity(cx, "REVOKE SEQUENCE", &stmt.name, &stmt.table, stmt.id)?;
    match g.dialect() {
        Dialect::SqlServer => {
            let trigger = instead_of_insert_trigger(&entity.table_name);
            Ok(format!(
                "IF OBJECT_ID('{}', 'TR') IS NOT NULL DROP TRIGGER {};",
                trigger, trigger
            ))
        }
        Dialect::Postgres => {
            let table_name = entity.table_name.to_lowercase();
            let (function, trigger) = before_insert_names(&table_name);
            Ok(format!(
                "DROP FUNCTION IF EXISTS {} CASCADE;\nDROP TRIGGER IF EXISTS {} ON {};",
                function, trigger, table_name
            ))
        }
    }
}

/// Renumber the sequence column of existing rows in identity-index order,
/// inside one transaction holding an exclusive table lock.
fn recalculate_script(
    g: &dyn SqlGenerator,
    cx: &EmitContext<'_>,
    table_name: &str,
    column_name: &str,
    sequence: &str,
    node: NodeId,
) -> TranspileResult<String> {
    let indexes = cx.metadata.indexes(&table_name.to_lowercase());
    let index: &IndexInfo = select_identity_index(&indexes).ok_or_else(|| {
        TranspileError::schema(
            node,
            format!(
                "[APPLY SEQUENCE RECALCULATE]: Primary or unique index missing for table [{}]",
                table_name
            ),
        )
    })?;
    tracing::debug!(table = %table_name, index = %index.name, "identity index selected");

    let columns = index
        .columns
        .iter()
        .map(|column| column.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let order = index
        .columns
        .iter()
        .map(|column| format!("{} {}", column.name, if column.is_descending { "DESC" } else { "ASC" }))
        .collect::<Vec<_>>()
        .join(", ");
    let matches = |left: &str, right: &str| {
        index
            .columns
            .iter()
            .map(|column| format!("{}.{} = {}.{}", left, column.name, right, column.name))
            .collect::<Vec<_>>()
            .join(" AND ")
    };

    let sql = match g.dialect() {
        Dialect::SqlServer => {
            let copy = format!("#COPY{}", table_name);
            format!(
                "BEGIN TRANSACTION;\n\
                 SELECT {columns}, NEXT VALUE FOR {sequence} OVER (ORDER BY {order}) AS sequence_value\n\
                 INTO {copy} FROM {table} WITH (TABLOCKX, HOLDLOCK);\n\
                 UPDATE T SET T.{column} = S.sequence_value FROM {table} AS T\n\
                 INNER JOIN {copy} AS S ON {join};\n\
                 DROP TABLE {copy};\n\
                 COMMIT TRANSACTION;",
                columns = columns,
                sequence = sequence,
                order = order,
                copy = copy,
                table = table_name,
                column = column_name,
                join = matches("T", "S"),
            )
        }
        Dialect::Postgres => format!(
            "BEGIN TRANSACTION;\n\
             LOCK TABLE {table} IN ACCESS EXCLUSIVE MODE;\n\
             WITH cte AS (SELECT {columns}, {next} AS sequence_value\n\
             FROM {table} ORDER BY {order})\n\
             UPDATE {table} SET {column} = cte.sequence_value FROM cte\n\
             WHERE {join};\n\
             COMMIT TRANSACTION;",
            table = table_name,
            columns = columns,
            next = g.next_value(sequence),
            order = order,
            column = column_name,
            join = matches(table_name, "cte"),
        ),
    };
    Ok(sql)
}
