use pretty_assertions::assert_eq;

use super::*;
use crate::ast::{
    CompareOp, Cte, DeclareStatement, DeleteStatement, InsertSource, InsertStatement, OutputClause,
    QueryExpr, SelectStatement, SetExpr, TableSource, TableVariableStatement, UnionExpr,
    UpdateStatement,
};
use crate::binding::{Binding, PrimitiveType};
use crate::error::ErrorKind;

fn select_statement(b: &mut ModelBuilder, query: QueryExpr) -> Statement {
    let id = b.id();
    Statement::Select(SelectStatement {
        id,
        ctes: Vec::new(),
        query,
    })
}

/// `SELECT Name FROM Product WHERE Name = 'Pen'`
fn select_product_name() -> ScriptModel {
    let product = product();
    let mut b = ModelBuilder::new();
    let from = b.entity_table(&product, None);
    let name = b.select_property(None, &product.properties[1], None);
    let mut select = b.select(vec![name], Some(from));
    select.where_ = Some(Expr::eq(column(b.property(None, &product.properties[1])), string("Pen")));
    let statement = select_statement(&mut b, QueryExpr::Select(Box::new(select)));
    b.finish(vec![statement])
}

#[test]
fn test_select_basic() {
    let model = select_product_name();
    assert_eq!(
        sql(&model, Dialect::SqlServer),
        "SELECT\n_Description AS Name\nFROM _Reference12\nWHERE _Description = 'Pen';"
    );
    assert_eq!(
        sql(&model, Dialect::Postgres),
        "SELECT\n_Description AS Name\nFROM _Reference12\nWHERE _Description = CAST('Pen' AS mvarchar);"
    );
}

#[test]
fn test_select_mapper() {
    let output = transpile(&select_product_name(), Dialect::SqlServer);
    assert_eq!(output.mappers.len(), 1);
    let mapper = &output.mappers[0];
    assert_eq!(mapper.name, "Product");
    assert_eq!(mapper.properties.len(), 1);
    assert_eq!(mapper.properties[0].name, "Name");
    assert_eq!(mapper.properties[0].columns[0].name, "Name");
    assert_eq!(mapper.properties[0].columns[0].type_name.as_deref(), Some("nvarchar(50)"));
}

#[test]
fn test_select_multi_column_property() {
    let product = product();
    let mut b = ModelBuilder::new();
    let from = b.entity_table(&product, Some("p"));
    let owner = b.select_property(Some("p"), &product.properties[2], None);
    let mut select = b.select(vec![owner], Some(from));
    select.order = Some(OrderClause::new(vec![ascending(b.property(Some("p"), &product.properties[2]))]));
    let statement = select_statement(&mut b, QueryExpr::Select(Box::new(select)));
    let model = b.finish(vec![statement]);

    assert_eq!(
        sql(&model, Dialect::SqlServer),
        "SELECT\n\
         p._OwnerTRef AS Owner_TRef, p._OwnerRRef AS Owner_RRef\n\
         FROM _Reference12 AS p\n\
         ORDER BY\n\
         p._OwnerTRef ASC, p._OwnerRRef ASC;"
    );
    let output = transpile(&model, Dialect::SqlServer);
    assert_eq!(output.mappers[0].name, "p");
    assert_eq!(output.mappers[0].column_count(), 2);
}

#[test]
fn test_select_from_cte() {
    let product = product();
    let mut b = ModelBuilder::new();
    let from = b.entity_table(&product, None);
    let name = b.select_property(None, &product.properties[1], None);
    let inner = b.select(vec![name.clone()], Some(from));
    let cte_id = b.id();
    let cte = Cte {
        id: cte_id,
        name: "items".into(),
        query: QueryExpr::Select(Box::new(inner)),
    };

    let items = b.table("items", None, Binding::CommonTable);
    let outer_name = b.select_derived("items", &name);
    let outer = b.select(vec![outer_name], Some(TableSource::Table(items)));
    let id = b.id();
    let model = b.finish(vec![Statement::Select(SelectStatement {
        id,
        ctes: vec![cte],
        query: QueryExpr::Select(Box::new(outer)),
    })]);

    let expected = "WITH items AS\n\
                    (SELECT\n\
                    _Description AS Name\n\
                    FROM _Reference12)\n\
                    SELECT\n\
                    items.Name\n\
                    FROM items;";
    assert_eq!(sql(&model, Dialect::SqlServer), expected);
    assert_eq!(sql(&model, Dialect::Postgres), expected);

    let output = transpile(&model, Dialect::Postgres);
    assert_eq!(output.mappers[0].name, "items");
    assert_eq!(output.mappers[0].properties[0].columns[0].name, "Name");
}

#[test]
fn test_select_union_all() {
    let product = product();
    let node = node();
    let mut b = ModelBuilder::new();
    let left_from = b.entity_table(&product, None);
    let left_name = b.select_property(None, &product.properties[1], None);
    let left = b.select(vec![left_name], Some(left_from));
    let right_from = b.entity_table(&node, None);
    let right_code = b.select_property(None, &node.properties[1], Some("Name"));
    let right = b.select(vec![right_code], Some(right_from));
    let union = QueryExpr::Union(Box::new(UnionExpr {
        all: true,
        left: QueryExpr::Select(Box::new(left)),
        right: QueryExpr::Select(Box::new(right)),
        order: None,
    }));
    let statement = select_statement(&mut b, union);
    let model = b.finish(vec![statement]);

    assert_eq!(
        sql(&model, Dialect::SqlServer),
        "SELECT\n_Description AS Name\nFROM _Reference12\nUNION ALL\nSELECT\n_Code AS Name\nFROM _Node7;"
    );
}

#[test]
fn test_unresolved_column_is_binding_error() {
    let product = product();
    let mut b = ModelBuilder::new();
    let from = b.entity_table(&product, None);
    let missing = b.column_ref("Colour", Binding::Primitive(PrimitiveType::String), Vec::new());
    let id = b.id();
    let column = crate::ast::ColumnExpr {
        id,
        expr: Expr::Column(missing),
        alias: None,
    };
    let select = b.select(vec![column], Some(from));
    let statement = select_statement(&mut b, QueryExpr::Select(Box::new(select)));
    let model = b.finish(vec![statement]);

    let err = transpile_with(&model, Dialect::SqlServer, &metadata()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Binding);
    assert_eq!(err.to_string(), "Binding error: Column [Colour] is not resolved.");
}

/// `TABLE items AS (SELECT Name, Owner FROM Product); INSERT Product FROM items`
fn insert_from_table_variable() -> ScriptModel {
    let product = product();
    let mut b = ModelBuilder::new();
    let from = b.entity_table(&product, None);
    let name = b.select_property(None, &product.properties[1], None);
    let owner = b.select_property(None, &product.properties[2], None);
    let query = QueryExpr::Select(Box::new(b.select(vec![name, owner], Some(from))));
    let table_id = b.id();
    let table = Statement::TableVariable(TableVariableStatement {
        id: table_id,
        name: "items".into(),
        query,
    });

    let target = b.table("Product", None, Binding::Entity(product.clone()));
    let source = b.table("items", None, Binding::TableVariable);
    let id = b.id();
    let insert = Statement::Insert(InsertStatement {
        id,
        ctes: Vec::new(),
        target,
        source: InsertSource::Table(source),
    });
    b.finish(vec![table, insert])
}

#[test]
fn test_table_variable_and_insert_sqlserver() {
    let output = transpile(&insert_from_table_variable(), Dialect::SqlServer);
    assert_eq!(
        output.statements[0].script,
        "DECLARE @items TABLE (Name nvarchar(50), Owner_TRef binary(4), Owner_RRef binary(16));\n\
         INSERT @items\n\
         SELECT\n\
         _Description AS Name,\n\
         _OwnerTRef AS Owner_TRef, _OwnerRRef AS Owner_RRef\n\
         FROM _Reference12;"
    );
    assert_eq!(
        output.statements[1].script,
        "INSERT INTO _Reference12 (_Description, _OwnerTRef, _OwnerRRef)\n\
         SELECT\n\
         items.Name,\n\
         items.Owner_TRef,\n\
         items.Owner_RRef\n\
         FROM @items AS items;"
    );
    assert!(output.mappers.is_empty());
    assert_eq!(
        output.script,
        format!("{}\n{}", output.statements[0].script, output.statements[1].script)
    );
}

#[test]
fn test_table_variable_and_insert_postgres() {
    let output = transpile(&insert_from_table_variable(), Dialect::Postgres);
    assert_eq!(
        output.statements[0].script,
        "CREATE TEMPORARY TABLE items AS\n\
         SELECT\n\
         _Description AS Name,\n\
         _OwnerTRef AS Owner_TRef, _OwnerRRef AS Owner_RRef\n\
         FROM _Reference12;"
    );
    assert!(output.statements[1].script.ends_with("\nFROM items;"));
}

fn update_queue(with_output: bool) -> ScriptModel {
    let queue = queue();
    let mut b = ModelBuilder::new();
    let target = b.table("Queue", None, Binding::Entity(queue.clone()));
    let body = b.property(None, &queue.properties[2]);
    let id_param = b.variable("@id", PrimitiveType::Uuid);
    let predicate = Expr::eq(column(b.property(None, &queue.properties[1])), id_param);
    let output = with_output.then(|| OutputClause {
        columns: vec![b.select_property(None, &queue.properties[1], None)],
        into: None,
    });
    let id = b.id();
    b.finish(vec![Statement::Update(UpdateStatement {
        id,
        ctes: Vec::new(),
        target,
        set: vec![SetExpr {
            column: body,
            value: string("done"),
        }],
        output,
        source: None,
        where_: Some(predicate),
        hints: Vec::new(),
    })])
}

#[test]
fn test_update() {
    let model = update_queue(false);
    assert_eq!(
        sql(&model, Dialect::SqlServer),
        "UPDATE _InfoRg42\nSET _Fld45 = 'done'\nWHERE _Fld44 = @id;"
    );
    assert_eq!(
        sql(&model, Dialect::Postgres),
        "UPDATE _InfoRg42\nSET _Fld45 = CAST('done' AS mvarchar)\nWHERE _Fld44 = @id;"
    );
    assert!(transpile(&model, Dialect::SqlServer).mappers.is_empty());
}

#[test]
fn test_update_output() {
    let model = update_queue(true);
    assert_eq!(
        sql(&model, Dialect::SqlServer),
        "UPDATE _InfoRg42\nSET _Fld45 = 'done'\nOUTPUT\ninserted._Fld44 AS Id\nWHERE _Fld44 = @id;"
    );
    assert_eq!(
        sql(&model, Dialect::Postgres),
        "UPDATE _InfoRg42\nSET _Fld45 = CAST('done' AS mvarchar)\nWHERE _Fld44 = @id\nRETURNING\n_Fld44 AS Id;"
    );
    let output = transpile(&model, Dialect::Postgres);
    assert_eq!(output.mappers.len(), 1);
    assert_eq!(output.mappers[0].properties[0].name, "Id");
}

#[test]
fn test_update_entity_literal_spreads_over_columns() {
    let product = product();
    let mut b = ModelBuilder::new();
    let target = b.table("Product", None, Binding::Entity(product.clone()));
    let owner = b.property(None, &product.properties[2]);
    let id = b.id();
    let model = b.finish(vec![Statement::Update(UpdateStatement {
        id,
        ctes: Vec::new(),
        target,
        set: vec![SetExpr {
            column: owner,
            value: Expr::Scalar(ScalarExpr::new(
                LiteralKind::Entity,
                "{42:08ec109e-4fe7-11ed-9c80-0050568fa7a7}",
            )),
        }],
        output: None,
        source: None,
        where_: None,
        hints: Vec::new(),
    })]);

    assert_eq!(
        sql(&model, Dialect::SqlServer),
        "UPDATE _Reference12\nSET _OwnerTRef = 0x0000002A,\n_OwnerRRef = 0x9C800050568FA7A711ED4FE708EC109E;"
    );
}

fn delete_queue() -> ScriptModel {
    let queue = queue();
    let mut b = ModelBuilder::new();
    let target = b.table("Queue", Some("q"), Binding::Entity(queue.clone()));
    let predicate = Expr::compare(
        CompareOp::Lt,
        column(b.property(Some("q"), &queue.properties[0])),
        number("100"),
    );
    let id = b.id();
    b.finish(vec![Statement::Delete(DeleteStatement {
        id,
        ctes: Vec::new(),
        target,
        output: None,
        source: None,
        where_: Some(predicate),
    })])
}

#[test]
fn test_delete() {
    let model = delete_queue();
    assert_eq!(
        sql(&model, Dialect::SqlServer),
        "DELETE q\nFROM _InfoRg42 AS q\nWHERE q._Fld43 < 100;"
    );
    assert_eq!(
        sql(&model, Dialect::Postgres),
        "DELETE FROM _InfoRg42 AS q\nWHERE q._Fld43 < 100;"
    );
}

#[test]
fn test_delete_from_cte_is_rejected() {
    let mut b = ModelBuilder::new();
    let target = b.table("items", None, Binding::CommonTable);
    let id = b.id();
    let model = b.finish(vec![Statement::Delete(DeleteStatement {
        id,
        ctes: Vec::new(),
        target,
        output: None,
        source: None,
        where_: None,
    })]);

    let err = transpile_with(&model, Dialect::Postgres, &metadata()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Binding);
    assert!(err.to_string().contains("DELETE: computed table (cte) targeting is not allowed."));
}

#[test]
fn test_declarations_emit_nothing() {
    let mut model = select_product_name();
    model.statements.insert(
        0,
        Statement::Declare(DeclareStatement {
            id: crate::ast::NodeId(1000),
            name: "@name".into(),
            type_name: Some("string".into()),
        }),
    );
    let output = transpile(&model, Dialect::SqlServer);
    assert_eq!(output.statements.len(), 2);
    assert_eq!(output.statements[0].script, "");
    assert!(output.script.starts_with("SELECT\n"));
}

#[test]
fn test_unterminated_statements() {
    let config = crate::config::TranspilerConfig::builder()
        .dialect(Dialect::Postgres)
        .terminate_statements(false)
        .build();
    let metadata = metadata();
    let functions = FunctionRegistry::default();
    let output = Transpiler::from_config(&config, &metadata, &functions)
        .transpile(&delete_queue())
        .unwrap();
    assert_eq!(output.script, "DELETE FROM _InfoRg42 AS q\nWHERE q._Fld43 < 100");
}

/// `INSERT Queue FROM (SELECT 1 AS Flag, 5 AS Moment) AS src`, where the
/// catalog lists `Flag` with no physical columns.
fn insert_into_columnless_property(with_moment: bool) -> ScriptModel {
    let mut queue = queue();
    queue.properties.push(PropertyDefinition::new("Flag", Vec::new()));
    let mut b = ModelBuilder::new();
    let mut columns = vec![b.computed(number("1"), "Flag")];
    if with_moment {
        columns.push(b.computed(number("5"), "Moment"));
    }
    let query = QueryExpr::Select(Box::new(b.select(columns, None)));
    let source = b.derived(query, "src");
    let target = b.table("Queue", None, Binding::Entity(queue));
    let id = b.id();
    b.finish(vec![Statement::Insert(InsertStatement {
        id,
        ctes: Vec::new(),
        target,
        source: InsertSource::Derived(source),
    })])
}

#[test]
fn test_insert_skips_property_without_columns() {
    let script = sql(&insert_into_columnless_property(true), Dialect::SqlServer);
    assert!(script.starts_with("INSERT INTO _InfoRg42 (_Fld43)\nSELECT\n5\nFROM ("));
    assert!(script.ends_with(") AS src;"));
}

#[test]
fn test_insert_of_columnless_property_only_fails() {
    for dialect in [Dialect::SqlServer, Dialect::Postgres] {
        let err = transpile_with(&insert_into_columnless_property(false), dialect, &metadata()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Statement);
        assert!(err.to_string().contains("INSERT: no source column matches table [Queue]."));
    }
}

/// `SELECT ROW_NUMBER() OVER(ORDER BY Name) AS Position, Name FROM Product
///  ORDER BY Name OFFSET 10 ROWS FETCH NEXT 5 ROWS ONLY`
#[test]
fn test_window_order_and_paging() {
    let product = product();
    let mut b = ModelBuilder::new();
    let from = b.entity_table(&product, None);
    let mut position = b.function("ROW_NUMBER", Vec::new());
    position.over = Some(crate::ast::OverClause {
        partition: Vec::new(),
        order: Some(OrderClause::new(vec![ascending(b.property(None, &product.properties[1]))])),
        frame: None,
    });
    let columns = vec![
        b.computed(Expr::Function(position), "Position"),
        b.select_property(None, &product.properties[1], None),
    ];
    let mut select = b.select(columns, Some(from));
    let mut order = OrderClause::new(vec![ascending(b.property(None, &product.properties[1]))]);
    order.offset = Some(Box::new(number("10")));
    order.fetch = Some(Box::new(number("5")));
    select.order = Some(order);
    let statement = select_statement(&mut b, QueryExpr::Select(Box::new(select)));
    let model = b.finish(vec![statement]);

    let json = serde_json::to_string(&model).unwrap();
    assert_eq!(serde_json::from_str::<ScriptModel>(&json).unwrap(), model);

    assert_eq!(
        sql(&model, Dialect::SqlServer),
        "SELECT\n\
         ROW_NUMBER() OVER(ORDER BY _Description ASC) AS Position,\n\
         _Description AS Name\n\
         FROM _Reference12\n\
         ORDER BY\n\
         _Description ASC\n\
         OFFSET 10 ROWS\n\
         FETCH NEXT 5 ROWS ONLY;"
    );
}
