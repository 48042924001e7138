use serde::Serialize;
use crate::ddl_query_builder::DdlQueryBuilder;
use crate::identifier::{Identifier, IdentifierKind, QualifiedName};
use crate::models::table::TableDescriptor;
use crate::quoting::{AttemptedKeywordUsage, IdentifierQuoter};
use crate::statements::DdlStatement;
use crate::Result;

pub const AUDIT_ID_COLUMN: &str = "audit_id";
pub const AUDIT_TYPE_COLUMN: &str = "audit_type";
pub const AUDIT_USER_COLUMN: &str = "audit_user";
pub const AUDIT_TIME_COLUMN: &str = "audit_time";
pub const AUDIT_TYPE_CHECK: &str = "audit_type_check";
pub const AUDIT_ID_SEQUENCE: &str = "audit_id_seq";

/// The values `audit_type` can take. `BEFORE` holds the old state of an updated row.
pub const AUDIT_TYPES: [&str; 4] = ["INSERT", "UPDATE", "BEFORE", "DELETE"];

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
pub enum AuditColumnKind {
    /// One of the four columns describing the change itself.
    Bookkeeping,
    /// A primary key column of the source table, kept as a plain column.
    RetainedKey,
    Data,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct AuditColumn {
    pub name: String,
    pub data_type: String,
    pub is_nullable: bool,
    pub default_value: Option<String>,
    pub kind: AuditColumnKind,
}

/// The mirror of a source table in the audit schema.
///
/// An audit table never has a primary key: the same source row shows up once per change.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct AuditTableDescriptor {
    pub schema: String,
    pub name: String,
    /// The table whose changes are captured, `None` for the master table.
    pub source: Option<QualifiedName>,
    pub columns: Vec<AuditColumn>,
}

impl AuditTableDescriptor {
    /// The table every root audit table inherits from. It only holds the bookkeeping columns.
    pub fn master(audit_schema: &str, name: &str, quoter: &IdentifierQuoter) -> Self {
        Self {
            schema: audit_schema.to_string(),
            name: name.to_string(),
            source: None,
            columns: bookkeeping_columns(audit_schema, quoter),
        }
    }

    /// Derives the audit table for `source`.
    ///
    /// Columns of `parent` that `source` does not list are added, so the audit table of a child
    /// always has every column of its parent's audit table.
    pub fn from_source(
        source: &TableDescriptor,
        audit_schema: &str,
        parent: Option<&AuditTableDescriptor>,
        quoter: &IdentifierQuoter,
    ) -> Self {
        let mut columns = bookkeeping_columns(audit_schema, quoter);

        if let Some(parent) = parent {
            columns.extend(
                parent
                    .data_columns()
                    .filter(|c| source.get_column(&c.name).is_none())
                    .cloned(),
            );
        }

        for column in &source.columns {
            if source.is_primary_key_column(&column.name) {
                columns.push(AuditColumn {
                    name: column.name.clone(),
                    data_type: column.data_type.clone(),
                    is_nullable: true,
                    default_value: None,
                    kind: AuditColumnKind::RetainedKey,
                });
            } else {
                columns.push(AuditColumn {
                    name: column.name.clone(),
                    data_type: column.data_type.clone(),
                    is_nullable: true,
                    default_value: column.default_value.clone(),
                    kind: AuditColumnKind::Data,
                });
            }
        }

        Self {
            schema: audit_schema.to_string(),
            name: source.name.clone(),
            source: Some(source.qualified_name()),
            columns,
        }
    }

    /// Every column copied from the source table, in table order.
    pub fn data_columns(&self) -> impl Iterator<Item = &AuditColumn> {
        self.columns.iter().filter(|c| c.kind != AuditColumnKind::Bookkeeping)
    }

    pub fn data_column_names(&self) -> Vec<&str> {
        self.data_columns().map(|c| c.name.as_str()).collect()
    }

    pub fn qualified_name(&self) -> QualifiedName {
        QualifiedName::new(&self.schema, &self.name)
    }

    pub fn get_create_statement(&self, identifier_quoter: &IdentifierQuoter) -> Result<DdlStatement> {
        let schema = Identifier::schema(&self.schema)?;
        let table = Identifier::table(&self.name)?;

        let mut builder = DdlQueryBuilder::new(identifier_quoter);
        let mut table_builder = builder.create_table(&schema, &table);

        for column in &self.columns {
            let name = Identifier::column(&column.name)?;
            let mut column_builder = table_builder.column(&name, &column.data_type);
            if !column.is_nullable {
                column_builder.not_null();
            }
            if let Some(default_value) = &column.default_value {
                column_builder.default_value(default_value);
            }
        }

        table_builder.check_constraint(&Identifier::new(IdentifierKind::Constraint, AUDIT_TYPE_CHECK)?, &audit_type_check_expression());

        Ok(builder.build())
    }
}

fn audit_type_check_expression() -> String {
    let values = AUDIT_TYPES.iter().map(|t| format!("'{t}'")).collect::<Vec<_>>().join(", ");
    format!("({AUDIT_TYPE_COLUMN} IN ({values}))")
}

fn bookkeeping_columns(audit_schema: &str, quoter: &IdentifierQuoter) -> Vec<AuditColumn> {
    let sequence = quoter.quote_qualified(audit_schema, AUDIT_ID_SEQUENCE, AttemptedKeywordUsage::Other);

    vec![
        AuditColumn {
            name: AUDIT_ID_COLUMN.to_string(),
            data_type: "bigint".to_string(),
            is_nullable: false,
            default_value: Some(format!("nextval('{}'::regclass)", sequence.replace('\'', "''"))),
            kind: AuditColumnKind::Bookkeeping,
        },
        AuditColumn {
            name: AUDIT_TYPE_COLUMN.to_string(),
            data_type: "text".to_string(),
            is_nullable: false,
            default_value: None,
            kind: AuditColumnKind::Bookkeeping,
        },
        AuditColumn {
            name: AUDIT_USER_COLUMN.to_string(),
            data_type: "text".to_string(),
            is_nullable: false,
            default_value: Some("SESSION_USER".to_string()),
            kind: AuditColumnKind::Bookkeeping,
        },
        AuditColumn {
            name: AUDIT_TIME_COLUMN.to_string(),
            data_type: "timestamp with time zone".to_string(),
            is_nullable: false,
            default_value: Some("CURRENT_TIMESTAMP".to_string()),
            kind: AuditColumnKind::Bookkeeping,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ColumnDescriptor;
    use indoc::indoc;
    use similar_asserts::assert_eq;

    fn feature_table() -> TableDescriptor {
        TableDescriptor {
            columns: vec![
                ColumnDescriptor::new("feature_id", "bigint").not_null().with_default("nextval('feature_feature_id_seq'::regclass)"),
                ColumnDescriptor::new("uniquename", "text").not_null(),
                ColumnDescriptor::new("is_obsolete", "boolean").not_null().with_default("false"),
            ],
            primary_key: vec!["feature_id".to_string()],
            ..TableDescriptor::new("public", "feature")
        }
    }

    #[test]
    fn audit_table_has_source_columns_and_bookkeeping() {
        let quoter = IdentifierQuoter::empty();
        let source = feature_table();
        let audit = AuditTableDescriptor::from_source(&source, "audit", None, &quoter);

        assert_eq!(audit.columns.len(), 2 + 1 + 4);
        assert_eq!(audit.source, Some(QualifiedName::new("public", "feature")));
        for name in [AUDIT_ID_COLUMN, AUDIT_TYPE_COLUMN, AUDIT_USER_COLUMN, AUDIT_TIME_COLUMN] {
            assert!(audit.columns.iter().any(|c| c.name == name && c.kind == AuditColumnKind::Bookkeeping));
        }
        assert_eq!(audit.data_column_names(), vec!["feature_id", "uniquename", "is_obsolete"]);

        let key = audit.columns.iter().find(|c| c.name == "feature_id").unwrap();
        assert_eq!(key.kind, AuditColumnKind::RetainedKey);
        assert!(key.is_nullable);
        assert_eq!(key.default_value, None);

        assert!(audit.data_columns().all(|c| c.is_nullable));
    }

    #[test]
    fn creates_audit_table_without_primary_key() {
        let quoter = IdentifierQuoter::empty();
        let audit = AuditTableDescriptor::from_source(&feature_table(), "audit", None, &quoter);
        let statement = audit.get_create_statement(&quoter).unwrap();

        assert_eq!(
            statement.as_str(),
            indoc! {r#"
            CREATE TABLE audit.feature (
                audit_id bigint NOT NULL DEFAULT nextval('audit.audit_id_seq'::regclass),
                audit_type text NOT NULL,
                audit_user text NOT NULL DEFAULT SESSION_USER,
                audit_time timestamp with time zone NOT NULL DEFAULT CURRENT_TIMESTAMP,
                feature_id bigint,
                uniquename text,
                is_obsolete boolean DEFAULT false,
                CONSTRAINT audit_type_check CHECK (audit_type IN ('INSERT', 'UPDATE', 'BEFORE', 'DELETE'))
            )"#}
        );
        assert!(!statement.as_str().to_uppercase().contains("PRIMARY KEY"));
    }

    #[test]
    fn child_audit_table_receives_missing_parent_columns() {
        let quoter = IdentifierQuoter::empty();
        let cities = TableDescriptor {
            columns: vec![
                ColumnDescriptor::new("name", "text"),
                ColumnDescriptor::new("population", "integer"),
            ],
            ..TableDescriptor::new("public", "cities")
        };
        let capitals = TableDescriptor {
            columns: vec![ColumnDescriptor::new("state", "character(2)")],
            parent: Some(cities.qualified_name()),
            ..TableDescriptor::new("public", "capitals")
        };

        let audit_cities = AuditTableDescriptor::from_source(&cities, "audit", None, &quoter);
        let audit_capitals = AuditTableDescriptor::from_source(&capitals, "audit", Some(&audit_cities), &quoter);

        assert_eq!(audit_capitals.data_column_names(), vec!["name", "population", "state"]);
    }

    #[test]
    fn master_table_only_has_bookkeeping_columns() {
        let quoter = IdentifierQuoter::empty();
        let master = AuditTableDescriptor::master("audit", "audit", &quoter);

        assert_eq!(master.columns.len(), 4);
        assert!(master.data_column_names().is_empty());
        assert_eq!(master.source, None);
    }

    #[test]
    fn rejects_unsafe_column_names() {
        let quoter = IdentifierQuoter::empty();
        let source = TableDescriptor {
            columns: vec![ColumnDescriptor::new("name text); drop table feature; --", "text")],
            ..TableDescriptor::new("public", "feature")
        };
        let audit = AuditTableDescriptor::from_source(&source, "audit", None, &quoter);

        assert!(matches!(
            audit.get_create_statement(&quoter),
            Err(crate::ChadoToolsError::InvalidIdentifier { kind: crate::IdentifierKind::Column, .. })
        ));
    }
}
