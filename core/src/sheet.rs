//! Header discovery over a raw sheet grid.
//!
//! Exported sheets often carry title rows above the real header, so the
//! header is the first row (within a bounded scan) with a cell containing a
//! marker such as `특기사항`.

use tracing::debug;

use crate::{analyzer::Table, Error, Result, SheetConfig};

/// Raw sheet content: rows of nullable cells, no header applied.
pub type Grid = Vec<Vec<Option<String>>>;

fn clean_cell(value: &str) -> String {
    value.replace('\n', " ").replace('\r', "")
}

/// Index of the first row among the first `scan_rows` with a cell
/// containing `marker`.
pub fn locate_header(
    grid: &[Vec<Option<String>>],
    marker: &str,
    scan_rows: usize,
) -> Result<usize> {
    grid.iter()
        .take(scan_rows)
        .position(|row| {
            row.iter()
                .any(|cell| cell.as_deref().is_some_and(|v| clean_cell(v).contains(marker)))
        })
        .ok_or_else(|| Error::HeaderNotFound {
            marker: marker.to_string(),
            scanned: scan_rows.min(grid.len()),
        })
}

/// Sheet with its header applied.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub header_index: usize,
    pub table: Table,
}

impl Sheet {
    pub fn from_grid(mut grid: Grid, config: &SheetConfig) -> Result<Self> {
        let header_index = locate_header(&grid, &config.header_marker, config.header_scan_rows)?;
        let rows = grid.split_off(header_index + 1);
        let header = grid.pop().unwrap_or_default();
        let columns = header
            .iter()
            .map(|cell| clean_cell(cell.as_deref().unwrap_or("")).trim().to_string())
            .collect();
        debug!(header_index, rows = rows.len(), "located header row");

        let mut table = Table::new(columns, rows);
        // 1-based source row number of the first data row.
        table.row_offset = header_index + 2;
        Ok(Self {
            header_index,
            table,
        })
    }

    /// Columns whose name contains `marker`.
    pub fn marker_columns(&self, marker: &str) -> Vec<String> {
        self.table
            .columns
            .iter()
            .filter(|c| c.contains(marker))
            .cloned()
            .collect()
    }

    /// Explicit column names if any were given, otherwise every marker column.
    pub fn resolve_targets(&self, explicit: &[String], marker: &str) -> Result<Vec<String>> {
        if !explicit.is_empty() {
            for name in explicit {
                if self.table.column_index(name).is_none() {
                    return Err(Error::UnknownColumn(name.clone()));
                }
            }
            return Ok(explicit.to_vec());
        }
        let targets = self.marker_columns(marker);
        if targets.is_empty() {
            return Err(Error::NoTargetColumn {
                marker: marker.to_string(),
            });
        }
        Ok(targets)
    }

    /// `name` if the sheet has a column with exactly that name.
    pub fn resolve_id_column(&self, name: Option<&str>) -> Option<String> {
        let name = name?;
        self.table.column_index(name).map(|_| name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Grid {
        rows.iter()
            .map(|r| {
                r.iter()
                    .map(|c| (!c.is_empty()).then(|| c.to_string()))
                    .collect()
            })
            .collect()
    }

    #[test]
    fn finds_header_below_title_rows() {
        let g = grid(&[
            &["2024 학교생활기록부", ""],
            &["", ""],
            &["성명", "세부능력 및\n특기사항"],
            &["김철수", "성실함."],
        ]);
        let sheet = Sheet::from_grid(g, &SheetConfig::default()).unwrap();
        assert_eq!(sheet.header_index, 2);
        assert_eq!(sheet.table.row_offset, 4);
        assert_eq!(sheet.table.columns, vec!["성명", "세부능력 및 특기사항"]);
        assert_eq!(sheet.table.rows.len(), 1);
        assert_eq!(sheet.table.cell(0, 1), "성실함.");
    }

    #[test]
    fn marker_split_across_lines_is_still_found() {
        let g = grid(&[&["특기\r사항"]]);
        assert_eq!(locate_header(&g, "특기사항", 20).unwrap(), 0);
    }

    #[test]
    fn header_outside_scan_window_is_an_error() {
        let mut rows: Vec<&[&str]> = vec![&["x"] as &[&str]; 3];
        rows.push(&["특기사항"]);
        let g = grid(&rows);
        match locate_header(&g, "특기사항", 3) {
            Err(Error::HeaderNotFound { scanned, .. }) => assert_eq!(scanned, 3),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(locate_header(&g, "특기사항", 4).unwrap(), 3);
    }

    #[test]
    fn resolves_marker_targets_and_id_column() {
        let g = grid(&[
            &["번호", "성명", "자율 특기사항", "진로 특기사항"],
            &["1", "김", "a", "b"],
        ]);
        let sheet = Sheet::from_grid(g, &SheetConfig::default()).unwrap();
        assert_eq!(
            sheet.resolve_targets(&[], "특기사항").unwrap(),
            vec!["자율 특기사항".to_string(), "진로 특기사항".to_string()]
        );
        assert_eq!(sheet.resolve_id_column(Some("성명")).as_deref(), Some("성명"));
        assert_eq!(sheet.resolve_id_column(Some("이름")), None);
        assert_eq!(sheet.resolve_id_column(None), None);
    }

    #[test]
    fn explicit_targets_must_exist() {
        let g = grid(&[&["특기사항", "비고"]]);
        let sheet = Sheet::from_grid(g, &SheetConfig::default()).unwrap();
        assert_eq!(
            sheet.resolve_targets(&["비고".into()], "특기사항").unwrap(),
            vec!["비고".to_string()]
        );
        assert!(matches!(
            sheet.resolve_targets(&["없음".into()], "특기사항"),
            Err(Error::UnknownColumn(_))
        ));
    }

    #[test]
    fn header_match_without_column_match_is_reported() {
        let sheet = Sheet {
            header_index: 0,
            table: Table::new(vec!["성명".into()], Vec::new()),
        };
        assert!(matches!(
            sheet.resolve_targets(&[], "특기사항"),
            Err(Error::NoTargetColumn { .. })
        ));
    }
}
