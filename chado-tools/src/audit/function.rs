use itertools::Itertools;
use crate::identifier::Identifier;
use crate::models::AUDIT_TYPE_COLUMN;
use crate::quoting::{AttemptedKeywordUsage, IdentifierQuoter, QuotableIter};

/// Builds the body of a trigger function writing every change of a row into `schema.table`.
///
/// An update produces two audit rows: a `BEFORE` row with the old values followed by an
/// `UPDATE` row with the new ones. The output only depends on the arguments.
pub fn generic_audit_function(
    schema: &Identifier,
    table: &Identifier,
    columns: &[Identifier],
    identifier_quoter: &IdentifierQuoter,
) -> String {
    let target = identifier_quoter.quote_qualified(schema, table, AttemptedKeywordUsage::Other);

    let quoted_columns = columns
        .iter()
        .quote(identifier_quoter, AttemptedKeywordUsage::ColumnName)
        .collect_vec();

    let column_list = std::iter::once(AUDIT_TYPE_COLUMN.to_string())
        .chain(quoted_columns.iter().cloned())
        .join(", ");

    let insert = |audit_type: &str, record: &str| {
        let values = std::iter::once(audit_type.to_string())
            .chain(quoted_columns.iter().map(|c| format!("{record}.{c}")))
            .join(", ");

        format!("\tINSERT INTO {target}({column_list}) VALUES ({values});\n")
    };

    let mut body = String::new();

    body.push_str("IF TG_OP = 'INSERT' THEN\n");
    body.push_str(&insert("'INSERT'", "NEW"));
    body.push_str("\tRETURN NEW;\n");

    body.push_str("ELSIF TG_OP = 'UPDATE' THEN\n");
    body.push_str(&insert("'BEFORE'", "OLD"));
    body.push_str(&insert("'UPDATE'", "NEW"));
    body.push_str("\tRETURN NEW;\n");

    body.push_str("ELSE\n");
    body.push_str(&insert("TG_OP", "OLD"));
    body.push_str("\tRETURN OLD;\n");

    body.push_str("END IF");

    body
}
