//! One constructor per statement shape the engine emits.
//!
//! Every constructor takes validated [`Identifier`]s, so the only text reaching the database
//! unvalidated is what comes out of the catalog itself (column types, default expressions)
//! and the bodies generated by the audit and backup modules.

use std::fmt::{Display, Formatter};
use itertools::Itertools;
use crate::identifier::Identifier;
use crate::quoting::{quote_always, AttemptedKeywordUsage, IdentifierQuoter, Quotable};

/// A finished, immutable SQL statement.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DdlStatement(String);

impl DdlStatement {
    pub(crate) fn new(sql: impl Into<String>) -> Self {
        Self(sql.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DdlStatement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DdlStatement {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TablePrivilege {
    Select,
    Insert,
    Update,
    Delete,
}

impl TablePrivilege {
    fn keyword(self) -> &'static str {
        match self {
            TablePrivilege::Select => "SELECT",
            TablePrivilege::Insert => "INSERT",
            TablePrivilege::Update => "UPDATE",
            TablePrivilege::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SequencePrivilege {
    Usage,
    Update,
}

impl SequencePrivilege {
    fn keyword(self) -> &'static str {
        match self {
            SequencePrivilege::Usage => "USAGE",
            SequencePrivilege::Update => "UPDATE",
        }
    }
}

/// The object classes `ALL ... IN SCHEMA` can address.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SchemaObjects {
    Tables,
    Sequences,
    Functions,
}

impl SchemaObjects {
    fn keyword(self) -> &'static str {
        match self {
            SchemaObjects::Tables => "TABLES",
            SchemaObjects::Sequences => "SEQUENCES",
            SchemaObjects::Functions => "FUNCTIONS",
        }
    }
}

pub fn grant_schema_usage(schema: &Identifier, role: &Identifier) -> DdlStatement {
    DdlStatement::new(format!(
        "GRANT USAGE ON SCHEMA {} TO {}",
        quote_always(schema),
        quote_always(role)
    ))
}

pub fn grant_on_all_tables(privilege: TablePrivilege, schema: &Identifier, role: &Identifier) -> DdlStatement {
    DdlStatement::new(format!(
        "GRANT {} ON ALL TABLES IN SCHEMA {} TO {}",
        privilege.keyword(),
        quote_always(schema),
        quote_always(role)
    ))
}

pub fn grant_on_all_sequences(privilege: SequencePrivilege, schema: &Identifier, role: &Identifier) -> DdlStatement {
    DdlStatement::new(format!(
        "GRANT {} ON ALL SEQUENCES IN SCHEMA {} TO {}",
        privilege.keyword(),
        quote_always(schema),
        quote_always(role)
    ))
}

pub fn revoke_all_privileges(objects: SchemaObjects, schema: &Identifier, role: &Identifier) -> DdlStatement {
    DdlStatement::new(format!(
        "REVOKE ALL PRIVILEGES ON ALL {} IN SCHEMA {} FROM {}",
        objects.keyword(),
        quote_always(schema),
        quote_always(role)
    ))
}

pub fn revoke_schema_usage(schema: &Identifier, role: &Identifier) -> DdlStatement {
    DdlStatement::new(format!(
        "REVOKE USAGE ON SCHEMA {} FROM {}",
        quote_always(schema),
        quote_always(role)
    ))
}

pub fn create_schema(schema: &Identifier, quoter: &IdentifierQuoter) -> DdlStatement {
    DdlStatement::new(format!(
        "CREATE SCHEMA {}",
        schema.quote(quoter, AttemptedKeywordUsage::Other)
    ))
}

pub fn create_sequence(schema: &Identifier, sequence: &Identifier, quoter: &IdentifierQuoter) -> DdlStatement {
    DdlStatement::new(format!(
        "CREATE SEQUENCE IF NOT EXISTS {}",
        quoter.quote_qualified(schema, sequence, AttemptedKeywordUsage::Other)
    ))
}

pub fn alter_table_inherit(
    schema: &Identifier,
    child: &Identifier,
    parent_schema: &Identifier,
    parent: &Identifier,
    quoter: &IdentifierQuoter,
) -> DdlStatement {
    DdlStatement::new(format!(
        "ALTER TABLE {} INHERIT {}",
        quoter.quote_qualified(schema, child, AttemptedKeywordUsage::Other),
        quoter.quote_qualified(parent_schema, parent, AttemptedKeywordUsage::Other)
    ))
}

/// `CREATE TABLE schema.table (LIKE like_schema.like_table)`, copying columns only.
pub fn create_table_like(
    schema: &Identifier,
    table: &Identifier,
    like_schema: &Identifier,
    like_table: &Identifier,
    quoter: &IdentifierQuoter,
) -> DdlStatement {
    DdlStatement::new(format!(
        "CREATE TABLE {} (LIKE {})",
        quoter.quote_qualified(schema, table, AttemptedKeywordUsage::Other),
        quoter.quote_qualified(like_schema, like_table, AttemptedKeywordUsage::Other)
    ))
}

/// Wraps a plpgsql body into a function returning `trigger`.
pub fn create_trigger_function(
    schema: &Identifier,
    name: &Identifier,
    body: &str,
    quoter: &IdentifierQuoter,
) -> DdlStatement {
    DdlStatement::new(format!(
        "CREATE OR REPLACE FUNCTION {}()\nRETURNS trigger\nLANGUAGE plpgsql\nAS $function$\nBEGIN\n{};\nEND;\n$function$",
        quoter.quote_qualified(schema, name, AttemptedKeywordUsage::TypeOrFunctionName),
        body
    ))
}

/// Makes a function run with the privileges of its owner, resolving names only in `pg_catalog`.
pub fn secure_function(schema: &Identifier, name: &Identifier, quoter: &IdentifierQuoter) -> DdlStatement {
    DdlStatement::new(format!(
        "ALTER FUNCTION {}() SECURITY DEFINER SET search_path = pg_catalog, pg_temp",
        quoter.quote_qualified(schema, name, AttemptedKeywordUsage::TypeOrFunctionName)
    ))
}

/// A typed function parameter or local variable, e.g. `cutoff text` or `total bigint := 0`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TypedVariable {
    pub name: Identifier,
    pub data_type: String,
    pub initial_value: Option<String>,
}

impl TypedVariable {
    pub fn new(name: Identifier, data_type: impl Into<String>) -> Self {
        Self {
            name,
            data_type: data_type.into(),
            initial_value: None,
        }
    }

    pub fn with_initial_value(mut self, value: impl Into<String>) -> Self {
        self.initial_value = Some(value.into());
        self
    }

    fn render(&self, quoter: &IdentifierQuoter) -> String {
        let mut s = format!("{} {}", self.name.quote(quoter, AttemptedKeywordUsage::ColumnName), self.data_type);
        if let Some(value) = &self.initial_value {
            s.push_str(" := ");
            s.push_str(value);
        }
        s
    }
}

/// Wraps a plpgsql body into a function taking `parameters` and returning a `bigint` row count.
pub fn create_counting_function(
    schema: &Identifier,
    name: &Identifier,
    parameters: &[TypedVariable],
    locals: &[TypedVariable],
    body: &str,
    quoter: &IdentifierQuoter,
) -> DdlStatement {
    let parameters = parameters.iter().map(|p| p.render(quoter)).join(", ");

    let mut sql = format!(
        "CREATE OR REPLACE FUNCTION {}({})\nRETURNS bigint\nLANGUAGE plpgsql\nAS $function$\n",
        quoter.quote_qualified(schema, name, AttemptedKeywordUsage::TypeOrFunctionName),
        parameters
    );

    if !locals.is_empty() {
        sql.push_str("DECLARE\n");
        for local in locals {
            sql.push_str(&local.render(quoter));
            sql.push_str(";\n");
        }
    }

    sql.push_str("BEGIN\n");
    sql.push_str(body);
    sql.push_str(";\nEND;\n$function$");

    DdlStatement::new(sql)
}

pub fn create_generic_trigger(
    name: &Identifier,
    function_schema: &Identifier,
    function_name: &Identifier,
    table_schema: &Identifier,
    table_name: &Identifier,
    quoter: &IdentifierQuoter,
) -> DdlStatement {
    DdlStatement::new(format!(
        "CREATE TRIGGER {} AFTER INSERT OR UPDATE OR DELETE ON {} FOR EACH ROW EXECUTE PROCEDURE {}()",
        name.quote(quoter, AttemptedKeywordUsage::Other),
        quoter.quote_qualified(table_schema, table_name, AttemptedKeywordUsage::Other),
        quoter.quote_qualified(function_schema, function_name, AttemptedKeywordUsage::TypeOrFunctionName)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use similar_asserts::assert_eq;

    fn id(s: &str) -> Identifier {
        Identifier::new(crate::IdentifierKind::Table, s).unwrap()
    }

    #[test]
    fn privilege_statements_quote_every_name() {
        assert_eq!(
            grant_schema_usage(&id("public"), &id("reader")).as_str(),
            r#"GRANT USAGE ON SCHEMA "public" TO "reader""#
        );
        assert_eq!(
            grant_on_all_tables(TablePrivilege::Insert, &id("public"), &id("writer")).as_str(),
            r#"GRANT INSERT ON ALL TABLES IN SCHEMA "public" TO "writer""#
        );
        assert_eq!(
            grant_on_all_sequences(SequencePrivilege::Update, &id("public"), &id("writer")).as_str(),
            r#"GRANT UPDATE ON ALL SEQUENCES IN SCHEMA "public" TO "writer""#
        );
        assert_eq!(
            revoke_all_privileges(SchemaObjects::Tables, &id("public"), &id("Reader")).as_str(),
            r#"REVOKE ALL PRIVILEGES ON ALL TABLES IN SCHEMA "public" FROM "Reader""#
        );
        assert_eq!(
            revoke_schema_usage(&id("audit"), &id("reader")).as_str(),
            r#"REVOKE USAGE ON SCHEMA "audit" FROM "reader""#
        );
    }

    #[test]
    fn trigger_function_wrapper() {
        let quoter = IdentifierQuoter::empty();
        let statement = create_trigger_function(&id("audit"), &id("public_feature_proc"), "trigger_def", &quoter);

        assert_eq!(
            statement.as_str(),
            indoc! {"
            CREATE OR REPLACE FUNCTION audit.public_feature_proc()
            RETURNS trigger
            LANGUAGE plpgsql
            AS $function$
            BEGIN
            trigger_def;
            END;
            $function$"}
        );
    }

    #[test]
    fn secured_trigger_function() {
        let quoter = IdentifierQuoter::empty();
        let statement = secure_function(&id("audit"), &id("public_feature_proc"), &quoter);

        assert_eq!(
            statement.as_str(),
            "ALTER FUNCTION audit.public_feature_proc() SECURITY DEFINER SET search_path = pg_catalog, pg_temp"
        );
    }

    #[test]
    fn generic_trigger() {
        let quoter = IdentifierQuoter::empty();
        let statement = create_generic_trigger(
            &id("feature_audit_tr"),
            &id("audit"),
            &id("public_feature_proc"),
            &id("public"),
            &id("feature"),
            &quoter,
        );

        assert_eq!(
            statement.as_str(),
            "CREATE TRIGGER feature_audit_tr AFTER INSERT OR UPDATE OR DELETE ON public.feature FOR EACH ROW EXECUTE PROCEDURE audit.public_feature_proc()"
        );
    }

    #[test]
    fn counting_function_with_locals() {
        let quoter = IdentifierQuoter::empty();
        let statement = create_counting_function(
            &id("audit_backup"),
            &id("backup_audit_tables"),
            &[TypedVariable::new(id("cutoff"), "text")],
            &[
                TypedVariable::new(id("moved"), "bigint"),
                TypedVariable::new(id("total"), "bigint").with_initial_value("0"),
            ],
            "RETURN total",
            &quoter,
        );

        assert_eq!(
            statement.as_str(),
            indoc! {"
            CREATE OR REPLACE FUNCTION audit_backup.backup_audit_tables(cutoff text)
            RETURNS bigint
            LANGUAGE plpgsql
            AS $function$
            DECLARE
            moved bigint;
            total bigint := 0;
            BEGIN
            RETURN total;
            END;
            $function$"}
        );
    }

    #[test]
    fn structural_statements() {
        let quoter = IdentifierQuoter::empty();

        assert_eq!(create_schema(&id("audit"), &quoter).as_str(), "CREATE SCHEMA audit");
        assert_eq!(
            create_sequence(&id("audit"), &id("audit_id_seq"), &quoter).as_str(),
            "CREATE SEQUENCE IF NOT EXISTS audit.audit_id_seq"
        );
        assert_eq!(
            alter_table_inherit(&id("audit"), &id("capitals"), &id("audit"), &id("cities"), &quoter).as_str(),
            "ALTER TABLE audit.capitals INHERIT audit.cities"
        );
        assert_eq!(
            create_table_like(&id("audit_backup"), &id("feature"), &id("audit"), &id("feature"), &quoter).as_str(),
            "CREATE TABLE audit_backup.feature (LIKE audit.feature)"
        );
    }
}
