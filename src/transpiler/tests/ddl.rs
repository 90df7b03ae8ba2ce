use pretty_assertions::assert_eq;

use super::*;
use crate::ast::{
    ApplySequenceStatement, CreateSequenceStatement, CreateTypeStatement, DropSequenceStatement,
    RevokeSequenceStatement, TypeColumn, TypeIdentifier,
};
use crate::binding::{Binding, PrimitiveType};
use crate::error::ErrorKind;

fn type_column(b: &mut ModelBuilder, name: &str, identifier: &str, q1: u32, q2: u32) -> TypeColumn {
    TypeColumn {
        name: name.into(),
        data_type: TypeIdentifier {
            id: b.id(),
            identifier: identifier.into(),
            qualifier1: q1,
            qualifier2: q2,
        },
    }
}

fn create_type() -> ScriptModel {
    let mut b = ModelBuilder::new();
    let mut columns = vec![
        type_column(&mut b, "Flag", "boolean", 0, 0),
        type_column(&mut b, "Amount", "number", 10, 2),
        type_column(&mut b, "Created", "datetime", 0, 0),
        type_column(&mut b, "Title", "string", 50, 0),
        type_column(&mut b, "Notes", "string", 0, 0),
        type_column(&mut b, "Payload", "binary", 0, 0),
        type_column(&mut b, "Key", "uuid", 0, 0),
        type_column(&mut b, "Owner", "entity", 0, 0),
    ];
    let product = type_column(&mut b, "Product", "Product", 0, 0);
    b.bind(product.data_type.id, Binding::EntityType { type_code: 12 });
    columns.push(product);
    let id = b.id();
    b.finish(vec![Statement::CreateType(CreateTypeStatement {
        id,
        name: "OrderLine".into(),
        columns,
    })])
}

#[test]
fn test_create_type_sqlserver() {
    assert_eq!(
        sql(&create_type(), Dialect::SqlServer),
        "CREATE TYPE [OrderLine] AS TABLE\n\
         (\n\
         _Flag_L binary(1),\n\
         _Amount_N numeric(10,2),\n\
         _Created_T datetime2,\n\
         _Title_S nvarchar(50),\n\
         _Notes_S nvarchar(max),\n\
         _Payload_B varbinary(max),\n\
         _Key_U binary(16),\n\
         _Owner_C binary(4),\n\
         _Owner_R binary(16),\n\
         _Product_R_12 binary(16)\n\
         );"
    );
}

#[test]
fn test_create_type_postgres() {
    assert_eq!(
        sql(&create_type(), Dialect::Postgres),
        "CREATE TYPE \"OrderLine\" AS\n\
         (\n\
         \"_Flag_l\" boolean,\n\
         \"_Amount_n\" numeric(10,2),\n\
         \"_Created_t\" timestamp without time zone,\n\
         \"_Title_s\" varchar(50),\n\
         \"_Notes_s\" text,\n\
         \"_Payload_b\" bytea,\n\
         \"_Key_u\" bytea,\n\
         \"_Owner_c\" bytea,\n\
         \"_Owner_r\" bytea,\n\
         \"_Product_r_12\" bytea\n\
         );"
    );
}

#[test]
fn test_create_type_rejects_unknown_types() {
    let mut b = ModelBuilder::new();
    let columns = vec![type_column(&mut b, "Price", "money", 0, 0)];
    let id = b.id();
    let model = b.finish(vec![Statement::CreateType(CreateTypeStatement {
        id,
        name: "Prices".into(),
        columns,
    })]);
    let err = transpile_with(&model, Dialect::SqlServer, &metadata()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Schema);
    assert!(err.to_string().contains("Unknown column data type [money]."));

    let mut b = ModelBuilder::new();
    let column = type_column(&mut b, "Version", "version", 0, 0);
    b.bind(column.data_type.id, Binding::Primitive(PrimitiveType::Version));
    let id = b.id();
    let model = b.finish(vec![Statement::CreateType(CreateTypeStatement {
        id,
        name: "Versions".into(),
        columns: vec![column],
    })]);
    let err = transpile_with(&model, Dialect::Postgres, &metadata()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Schema);
}

fn create_sequence(data_type: Option<TypeIdentifier>, start_with: i64, increment: i64, cache_size: i64) -> ScriptModel {
    let mut b = ModelBuilder::new();
    let id = b.id();
    b.finish(vec![Statement::CreateSequence(CreateSequenceStatement {
        id,
        name: "doc_number".into(),
        data_type,
        start_with,
        increment,
        cache_size,
    })])
}

#[test]
fn test_create_sequence_defaults() {
    let model = create_sequence(None, 1, 1, 0);
    assert_eq!(
        sql(&model, Dialect::SqlServer),
        "IF NOT EXISTS(SELECT 1 FROM sys.sequences WHERE name = 'doc_number')\n\
         BEGIN\n\
         CREATE SEQUENCE doc_number AS bigint START WITH 1 INCREMENT BY 1;\n\
         END;"
    );
    assert_eq!(
        sql(&model, Dialect::Postgres),
        "CREATE SEQUENCE IF NOT EXISTS doc_number AS bigint INCREMENT BY 1 START WITH 1 CACHE 1;"
    );
}

#[test]
fn test_create_sequence_numeric_with_cache() {
    let data_type = TypeIdentifier {
        id: crate::ast::NodeId(500),
        identifier: "number".into(),
        qualifier1: 10,
        qualifier2: 0,
    };
    let model = create_sequence(Some(data_type), 100, 5, 20);
    assert!(sql(&model, Dialect::SqlServer)
        .contains("CREATE SEQUENCE doc_number AS numeric(10,0) START WITH 100 INCREMENT BY 5 CACHE 20;"));
    assert_eq!(
        sql(&model, Dialect::Postgres),
        "CREATE SEQUENCE IF NOT EXISTS doc_number AS bigint INCREMENT BY 5 START WITH 100 CACHE 20;"
    );
}

#[test]
fn test_drop_sequence() {
    let model = ScriptModel::new(
        vec![Statement::DropSequence(DropSequenceStatement {
            id: crate::ast::NodeId(1),
            name: "doc_number".into(),
        })],
        Default::default(),
    );
    assert_eq!(sql(&model, Dialect::SqlServer), "DROP SEQUENCE doc_number;");
    assert_eq!(sql(&model, Dialect::Postgres), "DROP SEQUENCE doc_number;");
}

/// `APPLY SEQUENCE doc_number ON Queue(Moment)`
fn apply_sequence(name: &str, entity: crate::binding::EntityDefinition, recalculate: bool) -> ScriptModel {
    let mut b = ModelBuilder::new();
    let table = b.table(&entity.name, None, Binding::Entity(entity.clone()));
    let column = b.property(None, &entity.properties[0]);
    let id = b.id();
    b.finish(vec![Statement::ApplySequence(ApplySequenceStatement {
        id,
        name: name.into(),
        table,
        column,
        recalculate,
    })])
}

#[test]
fn test_apply_sequence_sqlserver() {
    assert_eq!(
        sql(&apply_sequence("doc_number", queue(), false), Dialect::SqlServer),
        "IF OBJECT_ID('_inforg42_instead_of_insert', 'TR') IS NULL\n\
         EXECUTE('CREATE TRIGGER _inforg42_instead_of_insert ON _InfoRg42 INSTEAD OF INSERT NOT FOR REPLICATION AS\n\
         INSERT _InfoRg42(_Fld43, _Fld44, _Fld45)\n\
         SELECT NEXT VALUE FOR doc_number, i._Fld44, i._Fld45\n\
         FROM INSERTED AS i;');"
    );
}

#[test]
fn test_apply_sequence_postgres() {
    assert_eq!(
        sql(&apply_sequence("doc_number", queue(), false), Dialect::Postgres),
        "CREATE FUNCTION fn_inforg42_before_insert()\n\
         RETURNS trigger AS $BODY$\n\
         BEGIN\n\
         NEW._fld43 := nextval('doc_number');\n\
         RETURN NEW;\n\
         END $BODY$ LANGUAGE 'plpgsql';\n\
         \n\
         CREATE TRIGGER tr_inforg42_before_insert\n\
         BEFORE INSERT ON _inforg42 FOR EACH ROW\n\
         EXECUTE PROCEDURE fn_inforg42_before_insert();"
    );
}

#[test]
fn test_apply_sequence_recalculate_sqlserver() {
    let script = sql(&apply_sequence("doc_number", queue(), true), Dialect::SqlServer);
    let (_, recalculate) = script.split_once("FROM INSERTED AS i;');\n").unwrap();
    assert_eq!(
        recalculate,
        "BEGIN TRANSACTION;\n\
         SELECT _Fld43, _Fld44, NEXT VALUE FOR doc_number OVER (ORDER BY _Fld43 ASC, _Fld44 ASC) AS sequence_value\n\
         INTO #COPY_InfoRg42 FROM _InfoRg42 WITH (TABLOCKX, HOLDLOCK);\n\
         UPDATE T SET T._Fld43 = S.sequence_value FROM _InfoRg42 AS T\n\
         INNER JOIN #COPY_InfoRg42 AS S ON T._Fld43 = S._Fld43 AND T._Fld44 = S._Fld44;\n\
         DROP TABLE #COPY_InfoRg42;\n\
         COMMIT TRANSACTION;"
    );
}

#[test]
fn test_apply_sequence_recalculate_postgres() {
    let script = sql(&apply_sequence("doc_number", queue(), true), Dialect::Postgres);
    let (_, recalculate) = script.split_once("EXECUTE PROCEDURE fn_inforg42_before_insert();\n").unwrap();
    assert_eq!(
        recalculate,
        "BEGIN TRANSACTION;\n\
         LOCK TABLE _inforg42 IN ACCESS EXCLUSIVE MODE;\n\
         WITH cte AS (SELECT _Fld43, _Fld44, nextval('doc_number') AS sequence_value\n\
         FROM _inforg42 ORDER BY _Fld43 ASC, _Fld44 ASC)\n\
         UPDATE _inforg42 SET _fld43 = cte.sequence_value FROM cte\n\
         WHERE _inforg42._Fld43 = cte._Fld43 AND _inforg42._Fld44 = cte._Fld44;\n\
         COMMIT TRANSACTION;"
    );
}

#[test]
fn test_apply_sequence_recalculate_requires_index() {
    for dialect in [Dialect::SqlServer, Dialect::Postgres] {
        let err = transpile_with(&apply_sequence("doc_number", product(), true), dialect, &metadata()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Schema);
        assert!(err.to_string().contains("Primary or unique index missing for table"));
    }
}

#[test]
fn test_apply_sequence_errors() {
    let err = transpile_with(&apply_sequence("  ", queue(), false), Dialect::SqlServer, &metadata()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Statement);
    assert!(err.to_string().contains("[APPLY SEQUENCE] Sequence identifier missing"));

    let queue = queue();
    let mut b = ModelBuilder::new();
    let table = b.table("Queue", None, Binding::Entity(queue.clone()));
    let column = b.column_ref("Moment", Binding::Primitive(PrimitiveType::Decimal), Vec::new());
    let id = b.id();
    let model = b.finish(vec![Statement::ApplySequence(ApplySequenceStatement {
        id,
        name: "doc_number".into(),
        table,
        column,
        recalculate: false,
    })]);
    let err = transpile_with(&model, Dialect::Postgres, &metadata()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Binding);
    assert!(err.to_string().contains("[APPLY SEQUENCE] Unsupported column binding"));
}

fn revoke_sequence(binding: Binding) -> ScriptModel {
    let mut b = ModelBuilder::new();
    let table = b.table("Queue", None, binding);
    let id = b.id();
    b.finish(vec![Statement::RevokeSequence(RevokeSequenceStatement {
        id,
        name: "doc_number".into(),
        table,
    })])
}

#[test]
fn test_revoke_sequence() {
    let model = revoke_sequence(Binding::Entity(queue()));
    assert_eq!(
        sql(&model, Dialect::SqlServer),
        "IF OBJECT_ID('_inforg42_instead_of_insert', 'TR') IS NOT NULL DROP TRIGGER _inforg42_instead_of_insert;"
    );
    assert_eq!(
        sql(&model, Dialect::Postgres),
        "DROP FUNCTION IF EXISTS fn_inforg42_before_insert CASCADE;\n\
         DROP TRIGGER IF EXISTS tr_inforg42_before_insert ON _inforg42;"
    );
}

#[test]
fn test_revoke_sequence_requires_entity() {
    let err = transpile_with(&revoke_sequence(Binding::TableVariable), Dialect::SqlServer, &metadata()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Binding);
    assert!(err.to_string().contains("[REVOKE SEQUENCE] Unsupported table binding"));
}
