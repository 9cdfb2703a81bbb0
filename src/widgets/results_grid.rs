use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Paragraph, Row, Table, Widget},
};
use serde_json::Value;

use crate::api::Record;

/// Schema-less grid over a query result set.
///
/// A pure view: column headers come from the first record's keys in that
/// record's insertion order, one row per record, and a record missing a key
/// renders an empty cell instead of failing. Columns are derived once per
/// render, never per row, so the same slice always produces the same layout.
pub struct ResultsGrid<'a> {
    records: &'a [Record],
    offset: usize,
    cell_padding: u16,
}

impl<'a> ResultsGrid<'a> {
    pub fn new(records: &'a [Record]) -> Self {
        Self {
            records,
            offset: 0,
            cell_padding: 2,
        }
    }

    /// Skip this many records before the first rendered row
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Column headers, derived from the first record
    pub fn columns(&self) -> Vec<&str> {
        self.records
            .first()
            .map(|record| record.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

/// Text shown for a single cell value
fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

impl Widget for ResultsGrid<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if self.records.is_empty() {
            Paragraph::new("No results")
                .style(Style::default().fg(Color::DarkGray))
                .render(area, buf);
            return;
        }

        let columns = self.columns();
        let visible_rows = area.height.saturating_sub(1) as usize; // minus header
        let window: Vec<&Record> = self
            .records
            .iter()
            .skip(self.offset.min(self.records.len().saturating_sub(1)))
            .take(visible_rows)
            .collect();

        // Cell text per visible row, column order fixed by the header set
        let cells: Vec<Vec<String>> = window
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|col| cell_text(record.get(*col)))
                    .collect()
            })
            .collect();

        // Fit columns to content, left to right, until the area is full
        let mut widths: Vec<u16> = Vec::with_capacity(columns.len());
        let mut used_width = 0u16;
        for (col_index, col) in columns.iter().enumerate() {
            let mut max_len = col.chars().count() as u16;
            for row in &cells {
                max_len = max_len.max(row[col_index].chars().count() as u16);
            }
            if used_width + max_len > area.width {
                break;
            }
            widths.push(max_len);
            used_width += max_len + self.cell_padding;
        }
        if widths.is_empty() && !columns.is_empty() {
            // Degenerate width: show what fits of the first column
            widths.push(area.width);
        }
        let visible_columns = widths.len();

        let rows: Vec<Row> = cells
            .into_iter()
            .map(|mut row| {
                row.truncate(visible_columns);
                Row::new(row)
            })
            .collect();

        let header: Vec<String> = columns
            .iter()
            .take(visible_columns)
            .map(|c| c.to_string())
            .collect();

        Widget::render(
            Table::new(rows, widths)
                .column_spacing(self.cell_padding)
                .header(
                    Row::new(header).style(Style::default().add_modifier(Modifier::BOLD)),
                ),
            area,
            buf,
        );
    }
}
