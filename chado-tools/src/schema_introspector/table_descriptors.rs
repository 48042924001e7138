use std::collections::HashMap;
use tokio_postgres::Row;
use tracing::instrument;
use crate::identifier::{Identifier, QualifiedName};
use crate::models::{ColumnDescriptor, TableDescriptor};
use crate::postgres_client_wrapper::FromRow;
use crate::schema_introspector::SchemaIntrospector;
use crate::{ChadoToolsError, Result};

struct TableColumnResult {
    table_name: String,
    column_name: String,
    data_type: String,
    is_nullable: bool,
    column_default: Option<String>,
}

impl FromRow for TableColumnResult {
    fn from_row(row: Row) -> Result<Self> {
        Ok(TableColumnResult {
            table_name: row.try_get(0)?,
            column_name: row.try_get(1)?,
            data_type: row.try_get(2)?,
            is_nullable: row.try_get(3)?,
            column_default: row.try_get(4)?,
        })
    }
}

//language=postgresql
const TABLES_QUERY: &str = r#"
select c.relname
from pg_catalog.pg_class c
         join pg_catalog.pg_namespace n on n.oid = c.relnamespace
where n.nspname = $1
  and c.relkind in ('r', 'p')
  and not c.relispartition
order by c.relname;
"#;

//language=postgresql
const COLUMNS_QUERY: &str = r#"
select c.relname,
       a.attname,
       pg_catalog.format_type(a.atttypid, a.atttypmod),
       not a.attnotnull                                     as is_nullable,
       CASE
           WHEN a.attgenerated = ''::"char" THEN pg_catalog.pg_get_expr(d.adbin, d.adrelid)
           ELSE NULL::text
           END::text                                        AS column_default
from pg_catalog.pg_attribute a
         join pg_catalog.pg_class c on c.oid = a.attrelid
         join pg_catalog.pg_namespace n on n.oid = c.relnamespace
         left join pg_catalog.pg_attrdef d on d.adrelid = a.attrelid and d.adnum = a.attnum
where n.nspname = $1
  and c.relkind in ('r', 'p')
  and not c.relispartition
  and a.attnum > 0
  and not a.attisdropped
order by c.relname, a.attnum;
"#;

//language=postgresql
const PRIMARY_KEYS_QUERY: &str = r#"
select c.relname, a.attname
from pg_catalog.pg_index i
         join pg_catalog.pg_class c on c.oid = i.indrelid
         join pg_catalog.pg_namespace n on n.oid = c.relnamespace
         join pg_catalog.pg_attribute a on a.attrelid = i.indrelid and a.attnum = any (i.indkey)
where n.nspname = $1
  and i.indisprimary
order by c.relname, array_position(i.indkey::int2[], a.attnum);
"#;

//language=postgresql
const PARENTS_QUERY: &str = r#"
select c.relname, parent_ns.nspname, parent.relname
from pg_catalog.pg_inherits i
         join pg_catalog.pg_class c on c.oid = i.inhrelid
         join pg_catalog.pg_namespace n on n.oid = c.relnamespace
         join pg_catalog.pg_class parent on parent.oid = i.inhparent
         join pg_catalog.pg_namespace parent_ns on parent_ns.oid = parent.relnamespace
where n.nspname = $1
  and not c.relispartition
order by c.relname, i.inhseqno;
"#;

impl SchemaIntrospector<'_> {
    /// Reads every table of `schema` with its columns, primary key and inheritance parent.
    ///
    /// Columns a table inherits are listed on the child as well, as Postgres stores them there.
    #[instrument(skip(self))]
    pub async fn get_table_descriptors(&self, schema: &str) -> Result<Vec<TableDescriptor>> {
        let schema = Identifier::schema(schema)?;
        let params: [&(dyn tokio_postgres::types::ToSql + Sync); 1] = [&schema.as_str()];

        let tables: Vec<(String,)> = self.connection.get_results_with_params(TABLES_QUERY, &params).await?;
        let columns: Vec<TableColumnResult> = self.connection.get_results_with_params(COLUMNS_QUERY, &params).await?;
        let primary_keys: Vec<(String, String)> = self.connection.get_results_with_params(PRIMARY_KEYS_QUERY, &params).await?;
        let parents: Vec<(String, String, String)> = self.connection.get_results_with_params(PARENTS_QUERY, &params).await?;

        let mut descriptors: Vec<TableDescriptor> = tables
            .into_iter()
            .map(|(name,)| TableDescriptor::new(schema.as_str(), &name))
            .collect();

        let positions: HashMap<String, usize> = descriptors
            .iter()
            .enumerate()
            .map(|(idx, t)| (t.name.clone(), idx))
            .collect();

        for column in columns {
            if let Some(&idx) = positions.get(&column.table_name) {
                descriptors[idx].columns.push(ColumnDescriptor {
                    name: column.column_name,
                    data_type: column.data_type,
                    is_nullable: column.is_nullable,
                    default_value: column.column_default,
                });
            }
        }

        for (table_name, column_name) in primary_keys {
            if let Some(&idx) = positions.get(&table_name) {
                descriptors[idx].primary_key.push(column_name);
            }
        }

        for (table_name, parent_schema, parent_name) in parents {
            if let Some(&idx) = positions.get(&table_name) {
                let table = &mut descriptors[idx];
                if table.parent.is_some() {
                    return Err(ChadoToolsError::MultipleInheritance {
                        table: table.qualified_name().to_string(),
                    });
                }
                table.parent = Some(QualifiedName::new(parent_schema, parent_name));
            }
        }

        Ok(descriptors)
    }
}
