use chado_test_macros::pg_test;
use crate::models::{ColumnDescriptor, TableDescriptor};
use crate::test_helpers;
use crate::test_helpers::TestHelper;
use crate::{ChadoToolsError, IdentifierKind, QualifiedName, SchemaIntrospector};

#[pg_test(arg(postgres = 12))]
#[pg_test(arg(postgres = 16))]
async fn detects_schemas_and_tables(helper: &TestHelper) {
    helper.execute_not_query(r#"
    create schema audit;
    create table audit.feature(feature_id bigint);
    create view audit.feature_view as select * from audit.feature;
    "#).await;

    let introspector = SchemaIntrospector::new(helper.get_conn());

    assert!(introspector.schema_exists("audit").await.unwrap());
    assert!(introspector.schema_exists("public").await.unwrap());
    assert!(!introspector.schema_exists("audit_backup").await.unwrap());

    assert!(introspector.table_exists("feature", "audit").await.unwrap());
    assert!(!introspector.table_exists("feature", "public").await.unwrap());
    assert!(!introspector.table_exists("feature_view", "audit").await.unwrap());
}

#[pg_test(arg(postgres = 16))]
async fn detects_table_inheritance(helper: &TestHelper) {
    helper.execute_not_query(r#"
    create table cities(name text, population real);
    create table capitals(state char(2)) inherits (cities);
    create table towns(name text, population real);
    "#).await;

    let introspector = SchemaIntrospector::new(helper.get_conn());

    assert!(introspector.table_inherits("public.capitals", "public.cities").await.unwrap());
    assert!(!introspector.table_inherits("public.cities", "public.capitals").await.unwrap());
    assert!(!introspector.table_inherits("public.towns", "public.cities").await.unwrap());
    assert!(!introspector.table_inherits("public.villages", "public.cities").await.unwrap());

    helper.execute_not_query("alter table towns inherit cities;").await;
    assert!(introspector.table_inherits("public.towns", "public.cities").await.unwrap());
}

#[pg_test(arg(postgres = 16))]
async fn detects_triggers_and_functions(helper: &TestHelper) {
    helper.execute_not_query(r#"
    create table feature(feature_id bigint primary key);

    create function public.feature_proc() returns trigger language plpgsql as $$
    begin
        return new;
    end;
    $$;

    create trigger feature_audit_tr after insert on feature for each row execute procedure public.feature_proc();
    "#).await;

    let introspector = SchemaIntrospector::new(helper.get_conn());

    assert!(introspector.function_exists("public", "feature_proc").await.unwrap());
    assert!(!introspector.function_exists("public", "organism_proc").await.unwrap());

    assert!(introspector.trigger_exists("public", "feature_audit_tr").await.unwrap());
    assert!(!introspector.trigger_exists("public", "organism_audit_tr").await.unwrap());

    // Foreign keys are enforced through internal triggers, which are not reported.
    helper.execute_not_query("create table feature_synonym(feature_id bigint references feature(feature_id));").await;
    let names: Vec<String> = helper.get_single_results("select tgname::text from pg_trigger where tgisinternal and tgrelid = 'feature_synonym'::regclass;").await;
    assert!(!names.is_empty());
    for name in names {
        assert!(!introspector.trigger_exists("public", &name).await.unwrap());
    }
}

#[pg_test(arg(postgres = 16))]
async fn detects_roles(helper: &TestHelper) {
    let role = helper.create_role("curator").await;

    let introspector = SchemaIntrospector::new(helper.get_conn());

    assert!(introspector.role_exists(&role).await.unwrap());
    assert!(introspector.role_exists("postgres").await.unwrap());
    assert!(!introspector.role_exists("no_such_role_hopefully").await.unwrap());
}

#[pg_test(arg(postgres = 16))]
async fn rejects_unsafe_names_before_querying(helper: &TestHelper) {
    let introspector = SchemaIntrospector::new(helper.get_conn());

    let result = introspector.schema_exists("audit; drop schema public").await;
    assert!(matches!(result, Err(ChadoToolsError::InvalidIdentifier { kind: IdentifierKind::Schema, .. })));

    let result = introspector.table_exists("feature\"", "public").await;
    assert!(matches!(result, Err(ChadoToolsError::InvalidIdentifier { kind: IdentifierKind::Table, .. })));

    let result = introspector.role_exists("robert'); --").await;
    assert!(matches!(result, Err(ChadoToolsError::InvalidIdentifier { kind: IdentifierKind::Role, .. })));

    let result = introspector.table_inherits("capitals", "public.cities").await;
    assert!(matches!(result, Err(ChadoToolsError::InvalidIdentifier { .. })));

    let still_there = introspector.schema_exists("public").await.unwrap();
    assert!(still_there);
}

#[pg_test(arg(postgres = 16))]
async fn reads_table_descriptors(helper: &TestHelper) {
    helper.execute_not_query(r#"
    create table cities(
        city_id serial primary key,
        name text not null,
        population real default 0
    );
    create table capitals(state char(2)) inherits (cities);
    create table feature_relationship(
        subject_id bigint not null,
        object_id bigint not null,
        rank int not null default 0,
        primary key (object_id, subject_id)
    );
    "#).await;

    let introspector = SchemaIntrospector::new(helper.get_conn());
    let tables = introspector.get_table_descriptors("public").await.unwrap();

    similar_asserts::assert_eq!(
        tables,
        vec![
            TableDescriptor {
                schema: "public".to_string(),
                name: "capitals".to_string(),
                columns: vec![
                    ColumnDescriptor::new("city_id", "integer").not_null().with_default("nextval('cities_city_id_seq'::regclass)"),
                    ColumnDescriptor::new("name", "text").not_null(),
                    ColumnDescriptor::new("population", "real").with_default("0"),
                    ColumnDescriptor::new("state", "character(2)"),
                ],
                primary_key: vec![],
                parent: Some(QualifiedName::new("public", "cities")),
            },
            TableDescriptor {
                schema: "public".to_string(),
                name: "cities".to_string(),
                columns: vec![
                    ColumnDescriptor::new("city_id", "integer").not_null().with_default("nextval('cities_city_id_seq'::regclass)"),
                    ColumnDescriptor::new("name", "text").not_null(),
                    ColumnDescriptor::new("population", "real").with_default("0"),
                ],
                primary_key: vec!["city_id".to_string()],
                parent: None,
            },
            TableDescriptor {
                schema: "public".to_string(),
                name: "feature_relationship".to_string(),
                columns: vec![
                    ColumnDescriptor::new("subject_id", "bigint").not_null(),
                    ColumnDescriptor::new("object_id", "bigint").not_null(),
                    ColumnDescriptor::new("rank", "integer").not_null().with_default("0"),
                ],
                primary_key: vec!["object_id".to_string(), "subject_id".to_string()],
                parent: None,
            },
        ]
    );
}

#[pg_test(arg(postgres = 16))]
async fn multiple_inheritance_is_rejected(helper: &TestHelper) {
    helper.execute_not_query(r#"
    create table named(name text);
    create table located(latitude real, longitude real);
    create table landmark(height real) inherits (named, located);
    "#).await;

    let introspector = SchemaIntrospector::new(helper.get_conn());
    let result = introspector.get_table_descriptors("public").await;

    match result {
        Err(ChadoToolsError::MultipleInheritance { table }) => assert_eq!(table, "public.landmark"),
        other => panic!("Expected multiple inheritance error, got {:?}", other),
    }
}
