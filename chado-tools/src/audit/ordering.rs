use std::collections::{HashMap, VecDeque};
use crate::identifier::QualifiedName;
use crate::models::TableDescriptor;
use crate::{ChadoToolsError, Result};

/// Orders `tables` so every parent comes before its children.
///
/// Parents outside of `tables` are ignored. Tables that don't depend on each other keep their
/// relative input order. Fails with [`ChadoToolsError::CyclicInheritance`] naming the tables
/// that could not be ordered.
pub fn inheritance_order(tables: &[TableDescriptor]) -> Result<Vec<&TableDescriptor>> {
    let positions: HashMap<QualifiedName, usize> = tables
        .iter()
        .enumerate()
        .map(|(idx, t)| (t.qualified_name(), idx))
        .collect();

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); tables.len()];
    let mut waiting_for_parent = vec![false; tables.len()];

    for (idx, table) in tables.iter().enumerate() {
        if let Some(parent_idx) = table.parent.as_ref().and_then(|p| positions.get(p)) {
            children[*parent_idx].push(idx);
            waiting_for_parent[idx] = true;
        }
    }

    let mut ready: VecDeque<usize> = (0..tables.len()).filter(|idx| !waiting_for_parent[*idx]).collect();
    let mut ordered = Vec::with_capacity(tables.len());

    while let Some(idx) = ready.pop_front() {
        ordered.push(&tables[idx]);

        for child in &children[idx] {
            waiting_for_parent[*child] = false;
            ready.push_back(*child);
        }
    }

    if ordered.len() != tables.len() {
        let tables = tables
            .iter()
            .zip(waiting_for_parent)
            .filter(|(_, waiting)| *waiting)
            .map(|(t, _)| t.qualified_name().to_string())
            .collect();

        return Err(ChadoToolsError::CyclicInheritance { tables });
    }

    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str, parent: Option<&str>) -> TableDescriptor {
        TableDescriptor {
            parent: parent.map(|p| QualifiedName::new("public", p)),
            ..TableDescriptor::new("public", name)
        }
    }

    fn names(tables: Vec<&TableDescriptor>) -> Vec<&str> {
        tables.into_iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn parents_come_first() {
        let tables = vec![
            table("capitals", Some("cities")),
            table("feature", None),
            table("cities", None),
            table("metropoles", Some("capitals")),
        ];

        let ordered = inheritance_order(&tables).unwrap();

        assert_eq!(names(ordered), vec!["feature", "cities", "capitals", "metropoles"]);
    }

    #[test]
    fn unrelated_tables_keep_their_order() {
        let tables = vec![table("organism", None), table("cv", None), table("db", None)];

        let ordered = inheritance_order(&tables).unwrap();

        assert_eq!(names(ordered), vec!["organism", "cv", "db"]);
    }

    #[test]
    fn parents_outside_the_set_are_ignored() {
        let tables = vec![table("capitals", Some("cities")), table("feature", None)];

        let ordered = inheritance_order(&tables).unwrap();

        assert_eq!(names(ordered), vec!["capitals", "feature"]);
    }

    #[test]
    fn cycles_are_rejected() {
        let tables = vec![
            table("feature", None),
            table("a", Some("c")),
            table("b", Some("a")),
            table("c", Some("b")),
        ];

        let result = inheritance_order(&tables);

        match result {
            Err(ChadoToolsError::CyclicInheritance { tables }) => {
                assert_eq!(tables, vec!["public.a", "public.b", "public.c"]);
            }
            other => panic!("Expected cyclic inheritance error, got {:?}", other.map(names)),
        }
    }

    #[test]
    fn empty_input() {
        assert!(inheritance_order(&[]).unwrap().is_empty());
    }
}
