use pretty_assertions::assert_eq;

use super::*;
use crate::ast::{
    Cte, JoinKind, QueryExpr, SelectStatement, TableJoin, TableSource, UnionExpr,
};
use crate::binding::{Binding, PrimitiveType};
use crate::error::ErrorKind;

/// `SELECT <expr> AS Value` without a FROM clause.
fn select_value(build: impl FnOnce(&mut ModelBuilder) -> Expr) -> ScriptModel {
    let mut b = ModelBuilder::new();
    let expr = build(&mut b);
    let column = b.computed(expr, "Value");
    let select = b.select(vec![column], None);
    let id = b.id();
    b.finish(vec![Statement::Select(SelectStatement {
        id,
        ctes: Vec::new(),
        query: QueryExpr::Select(Box::new(select)),
    })])
}

fn value_sql(model: &ScriptModel, dialect: Dialect, year_offset: i32) -> String {
    let metadata = metadata();
    let functions = FunctionRegistry::default();
    let output = Transpiler::new(dialect, &metadata, &functions)
        .with_year_offset(year_offset)
        .transpile(model)
        .unwrap();
    output
        .script
        .strip_prefix("SELECT\n")
        .and_then(|rest| rest.strip_suffix(" AS Value;"))
        .unwrap_or(&output.script)
        .to_string()
}

#[test]
fn test_boolean_literals() {
    let model = select_value(|_| Expr::Scalar(ScalarExpr::new(LiteralKind::Boolean, "true")));
    assert_eq!(value_sql(&model, Dialect::SqlServer, 0), "0x01");
    assert_eq!(value_sql(&model, Dialect::Postgres, 0), "TRUE");
}

#[test]
fn test_uuid_literals() {
    let model = select_value(|_| {
        Expr::Scalar(ScalarExpr::new(LiteralKind::Uuid, "08ec109e-4fe7-11ed-9c80-0050568fa7a7"))
    });
    assert_eq!(value_sql(&model, Dialect::SqlServer, 0), "0x9C800050568FA7A711ED4FE708EC109E");
    assert_eq!(
        value_sql(&model, Dialect::Postgres, 0),
        "CAST(E'\\\\x9C800050568FA7A711ED4FE708EC109E' AS bytea)"
    );
}

#[test]
fn test_string_literal_escaping() {
    let model = select_value(|_| string("it's"));
    assert_eq!(value_sql(&model, Dialect::SqlServer, 0), "'it''s'");
    assert_eq!(value_sql(&model, Dialect::Postgres, 0), "CAST('it''s' AS mvarchar)");
}

#[test]
fn test_datetime_literal_with_year_offset() {
    let model = select_value(|_| Expr::Scalar(ScalarExpr::new(LiteralKind::DateTime, "2023-05-01T10:20:30")));
    assert_eq!(
        value_sql(&model, Dialect::SqlServer, 2000),
        "CAST('4023-05-01T10:20:30' AS datetime2)"
    );
    assert_eq!(value_sql(&model, Dialect::Postgres, 2000), "'4023-05-01T10:20:30'::timestamp");
    assert_eq!(value_sql(&model, Dialect::Postgres, 0), "'2023-05-01T10:20:30'::timestamp");
}

#[test]
fn test_now_with_year_offset() {
    let model = select_value(|b| Expr::Function(b.function("NOW", Vec::new())));
    assert_eq!(value_sql(&model, Dialect::SqlServer, 0), "GETDATE()");
    assert_eq!(value_sql(&model, Dialect::SqlServer, 2000), "DATEADD(year, 2000, GETDATE())");
    assert_eq!(value_sql(&model, Dialect::Postgres, 0), "NOW()::timestamp");
    assert_eq!(
        value_sql(&model, Dialect::Postgres, 2000),
        "(NOW() + INTERVAL '2000 years')::timestamp"
    );
}

#[test]
fn test_builtin_translation() {
    let model = select_value(|b| {
        let variable = b.variable("@name", PrimitiveType::String);
        Expr::Function(b.function("ISNULL", vec![variable, string("none")]))
    });
    assert_eq!(value_sql(&model, Dialect::SqlServer, 0), "ISNULL(@name, 'none')");
    assert_eq!(
        value_sql(&model, Dialect::Postgres, 0),
        "COALESCE(CAST(@name AS mvarchar), CAST('none' AS mvarchar))"
    );

    let model = select_value(|b| {
        let variable = b.variable("@name", PrimitiveType::String);
        Expr::Function(b.function("CHARLENGTH", vec![variable]))
    });
    assert_eq!(value_sql(&model, Dialect::SqlServer, 0), "LEN(@name)");
    assert_eq!(value_sql(&model, Dialect::Postgres, 0), "LENGTH(CAST(@name AS mvarchar))");
}

#[test]
fn test_vector_uses_sequence() {
    let model = select_value(|b| Expr::Function(b.function("VECTOR", vec![string("Doc_Number")])));
    assert_eq!(value_sql(&model, Dialect::SqlServer, 0), "NEXT VALUE FOR Doc_Number");
    assert_eq!(value_sql(&model, Dialect::Postgres, 0), "nextval('doc_number')");
}

#[test]
fn test_unknown_function_is_rejected() {
    let model = select_value(|b| Expr::Function(b.function("LOOKUP", Vec::new())));
    let err = transpile_with(&model, Dialect::SqlServer, &metadata()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Statement);
    assert_eq!(err.to_string(), "Statement error: Invalid function name: LOOKUP");
}

#[test]
fn test_postgres_datalength() {
    let model = select_value(|b| Expr::Function(b.function("DATALENGTH", vec![number("5")])));
    assert_eq!(value_sql(&model, Dialect::Postgres, 0), "OCTET_LENGTH(CAST(5 AS text))");

    let model = select_value(|b| Expr::Function(b.function("DATALENGTH", Vec::new())));
    let err = transpile_with(&model, Dialect::Postgres, &metadata()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Statement);
    assert!(err.to_string().contains("DATALENGTH: value argument is expected."));
}

#[test]
fn test_typeof_known_entity_is_inlined() {
    let model = select_value(|b| {
        let entity = b.column_ref("Product", Binding::Entity(product()), Vec::new());
        Expr::Function(b.function("TYPEOF", vec![Expr::Column(entity)]))
    });
    assert_eq!(value_sql(&model, Dialect::SqlServer, 0), "0x0000000C");
    assert_eq!(value_sql(&model, Dialect::Postgres, 0), "CAST(E'\\\\x0000000C' AS bytea)");
}

#[test]
fn test_typeof_unknown_entity_is_deferred() {
    let model = select_value(|b| {
        let owner = b.column_ref("p.Owner", Binding::Primitive(PrimitiveType::Entity), Vec::new());
        Expr::Function(b.function("TYPEOF", vec![Expr::Column(owner)]))
    });
    let output = transpile(&model, Dialect::SqlServer);
    assert_eq!(output.script, "SELECT\n@TYPEOF_p_Owner AS Value;");
    let functions = &output.statements[0].functions;
    assert_eq!(functions.len(), 1);
    assert_eq!(functions[0].name, "TYPEOF");
    assert_eq!(functions[0].target, "@TYPEOF_p_Owner");
}

#[test]
fn test_enum_value_is_uuid_literal() {
    let model = select_value(|b| {
        let uuid = uuid::Uuid::parse_str("08ec109e-4fe7-11ed-9c80-0050568fa7a7").unwrap();
        Expr::Column(b.column_ref("Status.Active", Binding::EnumValue(uuid), Vec::new()))
    });
    assert_eq!(value_sql(&model, Dialect::SqlServer, 0), "0x9C800050568FA7A711ED4FE708EC109E");
}

#[test]
fn test_top_and_limit() {
    let node = node();
    let mut b = ModelBuilder::new();
    let from = b.entity_table(&node, None);
    let code = b.select_property(None, &node.properties[1], None);
    let mut select = b.select(vec![code], Some(from));
    select.top = Some(number("5"));
    let id = b.id();
    let model = b.finish(vec![Statement::Select(SelectStatement {
        id,
        ctes: Vec::new(),
        query: QueryExpr::Select(Box::new(select)),
    })]);

    assert_eq!(sql(&model, Dialect::SqlServer), "SELECT TOP (5)\n_Code AS Code\nFROM _Node7;");
    assert_eq!(sql(&model, Dialect::Postgres), "SELECT\n_Code AS Code\nFROM _Node7\nLIMIT 5;");
}

#[test]
fn test_character_columns_cast_on_postgres() {
    let entity = crate::binding::EntityDefinition {
        name: "Unit".into(),
        table_name: "_Reference20".into(),
        type_code: 20,
        properties: vec![crate::binding::PropertyDefinition::new(
            "Code",
            vec![crate::binding::MetadataColumn::new("_Code", "char").with_length(10)],
        )],
    };
    let mut b = ModelBuilder::new();
    let from = b.entity_table(&entity, None);
    let code = b.select_property(None, &entity.properties[0], None);
    let select = b.select(vec![code], Some(from));
    let id = b.id();
    let model = b.finish(vec![Statement::Select(SelectStatement {
        id,
        ctes: Vec::new(),
        query: QueryExpr::Select(Box::new(select)),
    })]);

    assert_eq!(sql(&model, Dialect::SqlServer), "SELECT\n_Code AS Code\nFROM _Reference20;");
    assert_eq!(
        sql(&model, Dialect::Postgres),
        "SELECT\nCAST(_Code AS mvarchar) AS Code\nFROM _Reference20;"
    );
}

#[test]
fn test_cross_apply_and_lateral() {
    let product = product();
    let node = node();
    let mut b = ModelBuilder::new();

    let inner_from = b.entity_table(&node, Some("n"));
    let inner_code = b.select_property(Some("n"), &node.properties[1], None);
    let mut inner = b.select(vec![inner_code.clone()], Some(inner_from));
    inner.top = Some(number("1"));
    let derived = b.derived(QueryExpr::Select(Box::new(inner)), "x");

    let left = b.entity_table(&product, None);
    let from = TableSource::Join(Box::new(TableJoin {
        kind: JoinKind::CrossApply,
        left,
        right: TableSource::Derived(derived),
        on: None,
    }));
    let name = b.select_property(None, &product.properties[1], None);
    let code = b.select_derived("x", &inner_code);
    let select = b.select(vec![name, code], Some(from));
    let id = b.id();
    let model = b.finish(vec![Statement::Select(SelectStatement {
        id,
        ctes: Vec::new(),
        query: QueryExpr::Select(Box::new(select)),
    })]);

    assert_eq!(
        sql(&model, Dialect::SqlServer),
        "SELECT\n\
         _Description AS Name,\n\
         x.Code\n\
         FROM _Reference12\n\
         CROSS APPLY (SELECT TOP (1)\n\
         n._Code AS Code\n\
         FROM _Node7 AS n) AS x;"
    );
    assert_eq!(
        sql(&model, Dialect::Postgres),
        "SELECT\n\
         _Description AS Name,\n\
         x.Code\n\
         FROM _Reference12\n\
         INNER JOIN LATERAL (SELECT\n\
         n._Code AS Code\n\
         FROM _Node7 AS n\n\
         LIMIT 1) AS x ON TRUE;"
    );
}

#[test]
fn test_recursive_cte_keyword() {
    let product = product();
    let mut b = ModelBuilder::new();
    let from = b.entity_table(&product, None);
    let name = b.select_property(None, &product.properties[1], None);
    let anchor = b.select(vec![name.clone()], Some(from));
    let tree = b.table("tree", None, Binding::CommonTable);
    let step_name = b.select_derived("tree", &name);
    let step = b.select(vec![step_name], Some(TableSource::Table(tree)));
    let cte_id = b.id();
    let cte = Cte {
        id: cte_id,
        name: "tree".into(),
        query: QueryExpr::Union(Box::new(UnionExpr {
            all: true,
            left: QueryExpr::Select(Box::new(anchor)),
            right: QueryExpr::Select(Box::new(step)),
            order: None,
        })),
    };

    let outer_tree = b.table("tree", None, Binding::CommonTable);
    let outer_name = b.select_derived("tree", &name);
    let outer = b.select(vec![outer_name], Some(TableSource::Table(outer_tree)));
    let id = b.id();
    let model = b.finish(vec![Statement::Select(SelectStatement {
        id,
        ctes: vec![cte],
        query: QueryExpr::Select(Box::new(outer)),
    })]);

    assert!(sql(&model, Dialect::SqlServer).starts_with("WITH tree AS\n(SELECT\n"));
    assert!(sql(&model, Dialect::Postgres).starts_with("WITH RECURSIVE tree AS\n(SELECT\n"));
}

#[test]
fn test_dialect_names() {
    assert_eq!(Dialect::SqlServer.to_string(), "sqlserver");
    assert_eq!("pg".parse::<Dialect>(), Ok(Dialect::Postgres));
    assert_eq!("MSSQL".parse::<Dialect>(), Ok(Dialect::SqlServer));
    assert!("oracle".parse::<Dialect>().is_err());
}
