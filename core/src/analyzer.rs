//! Per-cell analysis and the table-level inspection pipeline.

use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::{
    cells::{ColumnCell, DuplicateCellIndex},
    highlight::{self, Highlight, Segment},
    rules::RuleSet,
    sentences::find_duplicate_sentences,
    Config, Error, Messages, Result, Span,
};

/// Classified range of a record's text. `span` is in UTF-8 bytes, `chars`
/// is the same range in chars for consumers that index by code point.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Mark {
    pub text: String,
    pub span: Span,
    pub chars: Span,
    pub class: Highlight,
}

/// Findings for one (row, column) cell.
#[derive(Debug, Clone, Serialize)]
pub struct ResultRecord {
    /// Source row number when produced by [`inspect`], data index otherwise.
    pub row: usize,
    pub display_id: String,
    pub column: String,
    pub text: String,
    pub marks: Vec<Mark>,
    pub messages: Vec<String>,
}

impl ResultRecord {
    pub fn segments(&self) -> Vec<Segment<'_>> {
        self.marks
            .iter()
            .map(|m| Segment {
                text: &m.text,
                span: m.span,
                class: m.class,
            })
            .collect()
    }

    pub fn html(&self) -> String {
        highlight::render_html(&self.segments())
    }

    fn located(mut self, row: usize, display_id: &str) -> Self {
        self.row = row;
        self.display_id = display_id.to_string();
        self
    }
}

/// Runs the fixed rules and duplicate checks over single cells.
pub struct Analyzer {
    rules: RuleSet,
    messages: Messages,
}

impl Analyzer {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            rules: RuleSet::new(&config.rules)?,
            messages: config.messages.clone(),
        })
    }

    pub fn messages(&self) -> &Messages {
        &self.messages
    }

    /// Analyzes one cell. `row` is the key used against `index`. Returns
    /// `None` for blank cells and for cells without findings.
    pub fn analyze(
        &self,
        row: usize,
        column: &str,
        text: &str,
        index: &DuplicateCellIndex,
    ) -> Result<Option<ResultRecord>> {
        if text.trim().is_empty() {
            return Ok(None);
        }

        let scan = self.rules.scan(text);
        let mut messages = scan.messages;
        let mut dup_spans = Vec::new();

        let sentences = find_duplicate_sentences(text, &self.messages.duplicate_sentence);
        if sentences.found {
            push_unique(&mut messages, sentences.message);
            dup_spans.extend(sentences.spans);
        }

        let lookup = index.lookup(row);
        if lookup.is_duplicate {
            if lookup.partners.is_empty() {
                // Groups always have two or more rows.
                warn!(row, column, "duplicate cell without partners");
            }
            push_unique(
                &mut messages,
                self.messages.duplicate_cell_message(column, &lookup.partners),
            );
            if !sentences.found {
                dup_spans.push(Span::whole(text));
            }
        }

        if messages.is_empty() {
            return Ok(None);
        }

        let marks = highlight::merge(text, &scan.spans, &dup_spans)?
            .into_iter()
            .map(|s| Mark {
                text: s.text.to_string(),
                span: s.span,
                chars: s.span.to_chars(text),
                class: s.class,
            })
            .collect();
        trace!(row, column, findings = messages.len(), "cell flagged");
        Ok(Some(ResultRecord {
            row,
            display_id: String::new(),
            column: column.to_string(),
            text: text.to_string(),
            marks,
            messages,
        }))
    }
}

fn push_unique(messages: &mut Vec<String>, message: String) {
    if !messages.contains(&message) {
        messages.push(message);
    }
}

/// Materialized sheet: named columns and rows of nullable cells.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
    /// Added to a data row index to get the source row number.
    pub row_offset: usize,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self {
            columns,
            rows,
            row_offset: 0,
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell text, with missing and null cells read as empty.
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .and_then(|c| c.as_deref())
            .unwrap_or("")
    }
}

/// Outcome of inspecting a table.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub row_count: usize,
    pub records: Vec<ResultRecord>,
}

impl Report {
    pub fn is_clean(&self) -> bool {
        self.records.is_empty()
    }
}

/// Checks every target column of `table`. Duplicate indexes are built for
/// all columns before any row is analyzed. A cell whose analysis fails is
/// logged and skipped.
pub fn inspect(
    analyzer: &Analyzer,
    table: &Table,
    targets: &[String],
    id_column: Option<&str>,
) -> Result<Report> {
    let mut columns = Vec::with_capacity(targets.len());
    for name in targets {
        let idx = table
            .column_index(name)
            .ok_or_else(|| Error::UnknownColumn(name.clone()))?;
        columns.push((name.as_str(), idx));
    }
    let id_idx = match id_column {
        Some(name) => Some(
            table
                .column_index(name)
                .ok_or_else(|| Error::UnknownColumn(name.to_string()))?,
        ),
        None => None,
    };

    let labels: Vec<String> = (0..table.rows.len())
        .map(|row| match id_idx {
            Some(idx) => table.cell(row, idx).to_string(),
            None => analyzer.messages().row_label(row + table.row_offset),
        })
        .collect();

    let indexes: Vec<DuplicateCellIndex> = columns
        .iter()
        .map(|&(name, col)| {
            let index = DuplicateCellIndex::build((0..table.rows.len()).map(|row| ColumnCell {
                row,
                label: &labels[row],
                text: table.cell(row, col),
            }));
            debug!(column = name, groups = index.group_count(), "indexed column");
            index
        })
        .collect();

    let mut records = Vec::new();
    for row in 0..table.rows.len() {
        let display_id = id_idx.map(|idx| table.cell(row, idx)).unwrap_or("");
        for (&(name, col), index) in columns.iter().zip(&indexes) {
            match analyzer.analyze(row, name, table.cell(row, col), index) {
                Ok(Some(record)) => {
                    records.push(record.located(row + table.row_offset, display_id));
                }
                Ok(None) => {}
                Err(err) => warn!(row, column = name, error = %err, "skipping cell"),
            }
        }
    }

    Ok(Report {
        row_count: table.rows.len(),
        records,
    })
}
