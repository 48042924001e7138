use crate::identifier::Identifier;
use crate::quoting::{AttemptedKeywordUsage, IdentifierQuoter, Quotable};
use crate::statements::DdlStatement;

pub struct DdlQueryBuilder<'q> {
    sql: String,
    identifier_quoter: &'q IdentifierQuoter,
}

impl<'a> DdlQueryBuilder<'a> {
    pub fn new(identifier_quoter: &'a IdentifierQuoter) -> Self {
        Self {
            sql: String::new(),
            identifier_quoter,
        }
    }

    pub fn create_table(&mut self, schema: &Identifier, table: &Identifier) -> DdlTableBuilder<'a, '_> {
        self.sql.push_str(&format!(
            "CREATE TABLE {} (",
            self.identifier_quoter.quote_qualified(schema, table, AttemptedKeywordUsage::Other),
        ));

        DdlTableBuilder {
            query_builder: self,
            has_first_line: false,
        }
    }

    pub fn build(mut self) -> DdlStatement {
        self.sql.push_str("\n)");

        DdlStatement::new(self.sql)
    }
}

pub struct DdlTableBuilder<'q, 'b> {
    query_builder: &'b mut DdlQueryBuilder<'q>,
    has_first_line: bool,
}

impl<'a, 'q> DdlTableBuilder<'a, 'q> {
    pub fn column<'b>(&'b mut self, name: &Identifier, data_type: &str) -> DdlTableColumnBuilder<'b> {
        let name = name.quote(self.query_builder.identifier_quoter, AttemptedKeywordUsage::ColumnName);
        self.start_new_line();
        self.query_builder
            .sql
            .push_str(&format!("    {} {}", name, data_type));

        DdlTableColumnBuilder {
            sql: &mut self.query_builder.sql,
        }
    }

    pub fn check_constraint(&mut self, name: &Identifier, expression: &str) -> &mut Self {
        self.start_new_line();
        self.query_builder.sql.push_str(&format!(
            "    CONSTRAINT {} CHECK {}",
            name.quote(self.query_builder.identifier_quoter, AttemptedKeywordUsage::Other),
            expression
        ));

        self
    }

    fn start_new_line(&mut self) {
        if self.has_first_line {
            self.query_builder.sql.push_str(",\n")
        } else {
            self.query_builder.sql.push('\n');
            self.has_first_line = true;
        }
    }
}

pub struct DdlTableColumnBuilder<'a> {
    sql: &'a mut String,
}

impl DdlTableColumnBuilder<'_> {
    pub fn not_null(&mut self) -> &mut Self {
        self.sql.push_str(" NOT NULL");

        self
    }

    pub fn default_value(&mut self, expression: &str) -> &mut Self {
        self.sql.push_str(" DEFAULT ");
        self.sql.push_str(expression);

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn id(s: &str) -> Identifier {
        Identifier::column(s).unwrap()
    }

    #[test]
    fn builds_create_table_expression() {
        let quoter = IdentifierQuoter::empty();
        let mut builder = DdlQueryBuilder::new(&quoter);
        let mut table_builder = builder.create_table(&id("audit"), &id("feature"));
        table_builder.column(&id("feature_id"), "bigint");
        table_builder.column(&id("name"), "character varying(255)");
        let result = builder.build();

        assert_eq!(
            result.as_str(),
            indoc! {r#"
        CREATE TABLE audit.feature (
            feature_id bigint,
            name character varying(255)
        )"#}
        );
    }

    #[test]
    fn not_null_and_default_columns() {
        let quoter = IdentifierQuoter::empty();
        let mut builder = DdlQueryBuilder::new(&quoter);
        let mut table_builder = builder.create_table(&id("audit"), &id("audit"));
        table_builder.column(&id("audit_id"), "bigint").not_null().default_value("nextval('audit.audit_id_seq'::regclass)");
        table_builder.column(&id("audit_time"), "timestamp without time zone").not_null().default_value("CURRENT_TIMESTAMP");
        table_builder.column(&id("is_obsolete"), "boolean").default_value("false");
        let result = builder.build();

        assert_eq!(
            result.as_str(),
            indoc! {r#"
        CREATE TABLE audit.audit (
            audit_id bigint NOT NULL DEFAULT nextval('audit.audit_id_seq'::regclass),
            audit_time timestamp without time zone NOT NULL DEFAULT CURRENT_TIMESTAMP,
            is_obsolete boolean DEFAULT false
        )"#}
        );
    }

    #[test]
    fn check_constraint() {
        let quoter = IdentifierQuoter::empty();
        let mut builder = DdlQueryBuilder::new(&quoter);
        let mut table_builder = builder.create_table(&id("audit"), &id("feature"));
        table_builder.column(&id("audit_type"), "text").not_null();
        table_builder.check_constraint(&id("audit_type_check"), "(audit_type IN ('INSERT', 'DELETE'))");
        let result = builder.build();

        assert_eq!(
            result.as_str(),
            indoc! {r#"
        CREATE TABLE audit.feature (
            audit_type text NOT NULL,
            CONSTRAINT audit_type_check CHECK (audit_type IN ('INSERT', 'DELETE'))
        )"#}
        );
    }

    #[test]
    fn quotes_keyword_columns() {
        let quoter = IdentifierQuoter::new(std::collections::HashMap::from([(
            "user".to_string(),
            crate::quoting::AllowedKeywordUsage {
                column_name: false,
                type_or_function_name: false,
            },
        )]));
        let mut builder = DdlQueryBuilder::new(&quoter);
        let mut table_builder = builder.create_table(&id("audit"), &id("login"));
        table_builder.column(&id("user"), "text");
        let result = builder.build();

        assert_eq!(
            result.as_str(),
            indoc! {r#"
        CREATE TABLE audit.login (
            "user" text
        )"#}
        );
    }
}
