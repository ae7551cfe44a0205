//! Whole-cell duplicate detection across the rows of one column.

use std::collections::HashMap;

use tracing::debug;

/// One cell of a column as seen by the index.
#[derive(Debug, Clone, Copy)]
pub struct ColumnCell<'a> {
    pub row: usize,
    /// Identifier reported to partners (a name, or a positional label).
    pub label: &'a str,
    pub text: &'a str,
}

/// Outcome of looking a row up in the index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DuplicateLookup {
    pub is_duplicate: bool,
    /// Labels of the other rows sharing the text, in row order.
    pub partners: Vec<String>,
}

/// Rows grouped by identical non-empty text. Built once per column and
/// read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct DuplicateCellIndex {
    partners: HashMap<usize, Vec<String>>,
    groups: usize,
}

impl DuplicateCellIndex {
    pub fn build<'a, I>(cells: I) -> Self
    where
        I: IntoIterator<Item = ColumnCell<'a>>,
    {
        let mut order: Vec<&'a str> = Vec::new();
        let mut by_text: HashMap<&'a str, Vec<ColumnCell<'a>>> = HashMap::new();
        for cell in cells {
            if cell.text.is_empty() {
                continue;
            }
            let group = by_text.entry(cell.text).or_default();
            if group.is_empty() {
                order.push(cell.text);
            }
            group.push(cell);
        }

        let mut partners = HashMap::new();
        let mut groups = 0;
        for text in order {
            let Some(members) = by_text.get(text) else {
                continue;
            };
            if members.len() < 2 {
                continue;
            }
            groups += 1;
            for member in members {
                let others: Vec<String> = members
                    .iter()
                    .filter(|other| other.row != member.row)
                    .map(|other| other.label.to_string())
                    .collect();
                partners.insert(member.row, others);
            }
        }
        debug!(groups, rows = partners.len(), "built duplicate cell index");
        Self { partners, groups }
    }

    pub fn lookup(&self, row: usize) -> DuplicateLookup {
        match self.partners.get(&row) {
            Some(partners) => DuplicateLookup {
                is_duplicate: true,
                partners: partners.clone(),
            },
            None => DuplicateLookup::default(),
        }
    }

    /// Number of duplicate groups (texts shared by two or more rows).
    pub fn group_count(&self) -> usize {
        self.groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(texts: &[&str], labels: &[&str]) -> DuplicateCellIndex {
        DuplicateCellIndex::build(texts.iter().zip(labels).enumerate().map(
            |(row, (text, label))| ColumnCell {
                row,
                label: *label,
                text: *text,
            },
        ))
    }

    #[test]
    fn identical_rows_are_mutual_partners() {
        let idx = index(&["hello", "hello", "world"], &["r0", "r1", "r2"]);
        assert_eq!(
            idx.lookup(0),
            DuplicateLookup {
                is_duplicate: true,
                partners: vec!["r1".into()]
            }
        );
        assert_eq!(idx.lookup(1).partners, vec!["r0".to_string()]);
        assert!(!idx.lookup(2).is_duplicate);
        assert_eq!(idx.group_count(), 1);
    }

    #[test]
    fn empty_cells_are_never_duplicates() {
        let idx = index(&["", "", ""], &["a", "b", "c"]);
        for row in 0..3 {
            assert!(!idx.lookup(row).is_duplicate);
        }
        assert_eq!(idx.group_count(), 0);
    }

    #[test]
    fn partners_keep_row_order_and_repeated_labels() {
        let idx = index(&["x", "y", "x", "x"], &["김", "이", "김", "박"]);
        assert_eq!(idx.lookup(0).partners, vec!["김".to_string(), "박".to_string()]);
        assert_eq!(idx.lookup(3).partners, vec!["김".to_string(), "김".to_string()]);
        assert!(!idx.lookup(1).is_duplicate);
    }

    #[test]
    fn equality_is_exact() {
        let idx = index(&["abc", "abc ", "ABC"], &["a", "b", "c"]);
        assert_eq!(idx.group_count(), 0);
        assert!((0..3).all(|row| !idx.lookup(row).is_duplicate));
    }

    #[test]
    fn unknown_row_is_not_duplicate() {
        let idx = index(&["a", "a"], &["0", "1"]);
        assert_eq!(idx.lookup(42), DuplicateLookup::default());
    }
}
