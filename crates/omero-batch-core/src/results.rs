use crate::error::Error;
use crate::remote::{Container, RemoteStore};
use crate::roi::Roi;
use crate::workbench::Workbench;
use std::path::Path;
use tracing::{debug, error, info};

/// Title of the results window measurements go to by default.
pub const DEFAULT_TABLE: &str = "Results";

/// Columns that may name the ROI a row was measured on.
const LABEL_COLUMNS: [&str; 2] = ["Label", "ROI"];

/// A results window: named columns, string cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultsTable {
    title: String,
    headings: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl ResultsTable {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            headings: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn headings(&self) -> &[String] {
        &self.headings
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headings.is_empty() && self.rows.is_empty()
    }

    /// Appends a row. Unknown columns are added, earlier rows get empty cells.
    pub fn add_row(&mut self, cells: Vec<(String, String)>) {
        let mut row = vec![String::new(); self.headings.len()];
        for (column, value) in cells {
            let index = match self.headings.iter().position(|h| *h == column) {
                Some(index) => index,
                None => {
                    self.headings.push(column);
                    for existing in &mut self.rows {
                        existing.push(String::new());
                    }
                    row.push(String::new());
                    self.headings.len() - 1
                }
            };
            row[index] = value;
        }
        self.rows.push(row);
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.headings.iter().position(|h| h == column)?;
        self.rows.get(row).map(|r| r[index].as_str())
    }

    pub fn reset(&mut self) {
        self.headings.clear();
        self.rows.clear();
    }
}

/// Titles of the tables to save for the current unit, each at most once:
/// the default window first when it has columns, then every other
/// non-empty window.
pub fn discover_tables(bench: &Workbench) -> Vec<String> {
    let mut names = Vec::new();
    if let Some(results) = bench.table(DEFAULT_TABLE) {
        if !results.headings().is_empty() {
            names.push(DEFAULT_TABLE.to_string());
        }
    }
    for title in bench.table_titles() {
        if names.contains(&title) {
            continue;
        }
        if bench.table(&title).is_some_and(|t| !t.is_empty()) {
            names.push(title);
        }
    }
    names
}

/// Writes the table as CSV, then clears it so the next image starts empty.
pub fn save_locally(table: &mut ResultsTable, path: &Path) -> Result<(), Error> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(table.headings())?;
    for row in table.rows() {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    debug!("Saved {} rows to {}", table.row_count(), path.display());
    table.reset();
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRow {
    pub image_id: Option<i64>,
    pub roi_id: Option<i64>,
    pub values: Vec<String>,
}

/// Table built up locally across a run and sent to the remote store once.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteTable {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<RemoteRow>,
}

impl RemoteTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Appends every row of `results`, tagged with `image_id` and, when a
    /// label column names one of `rois`, with that ROI's remote id.
    pub fn add_rows(
        &mut self,
        results: &ResultsTable,
        image_id: Option<i64>,
        rois: &[Roi],
        property: &str,
    ) {
        let mapping: Vec<usize> = results
            .headings()
            .iter()
            .map(|h| self.column_index(h))
            .collect();

        for (r, row) in results.rows().iter().enumerate() {
            let mut values = vec![String::new(); self.columns.len()];
            for (cell, &target) in row.iter().zip(&mapping) {
                values[target] = cell.clone();
            }
            self.rows.push(RemoteRow {
                image_id,
                roi_id: linked_roi(results, r, rois, property),
                values,
            });
        }
    }

    pub fn rows_for_image(&self, image_id: i64) -> usize {
        self.rows
            .iter()
            .filter(|row| row.image_id == Some(image_id))
            .count()
    }

    fn column_index(&mut self, heading: &str) -> usize {
        match self.columns.iter().position(|c| c == heading) {
            Some(index) => index,
            None => {
                self.columns.push(heading.to_string());
                for row in &mut self.rows {
                    row.values.push(String::new());
                }
                self.columns.len() - 1
            }
        }
    }
}

fn linked_roi(results: &ResultsTable, row: usize, rois: &[Roi], property: &str) -> Option<i64> {
    let label = LABEL_COLUMNS
        .iter()
        .find_map(|column| results.value(row, column))
        .filter(|label| !label.is_empty())?;
    rois.iter()
        .find(|roi| roi.name.as_deref() == Some(label))
        .and_then(|roi| roi.property(property))
        .and_then(|id| id.parse().ok())
}

#[derive(Debug, Default)]
pub struct FlushOutcome {
    pub published: usize,
    pub failures: Vec<(String, Error)>,
}

/// Per-run map from table title to the remote table collecting its rows.
#[derive(Debug, Default)]
pub struct ResultsAccumulator {
    tables: Vec<RemoteTable>,
}

impl ResultsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(
        &mut self,
        results: &ResultsTable,
        image_id: Option<i64>,
        rois: &[Roi],
        property: &str,
    ) {
        let name = results.title();
        match self.tables.iter_mut().find(|t| t.name == name) {
            Some(table) => table.add_rows(results, image_id, rois, property),
            None => {
                let mut table = RemoteTable::new(name);
                table.add_rows(results, image_id, rois, property);
                self.tables.push(table);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&RemoteTable> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Names every table `<timestamp>_<title>` and attaches it to `target`.
    /// The accumulator is drained; a failing table does not stop the others.
    pub fn flush(
        &mut self,
        store: &mut dyn RemoteStore,
        target: Container,
        timestamp: &str,
    ) -> FlushOutcome {
        let mut outcome = FlushOutcome::default();
        for mut table in self.tables.drain(..) {
            let base = if table.name.is_empty() {
                DEFAULT_TABLE.to_string()
            } else {
                table.name.clone()
            };
            table.name = format!("{}_{}", timestamp, base);
            match store.attach_table(target, &table) {
                Ok(()) => {
                    info!("Uploaded table '{}' to {}", table.name, target);
                    outcome.published += 1;
                }
                Err(e) => {
                    error!("Could not save table '{}': {}", table.name, e);
                    outcome.failures.push((table.name, e));
                }
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_add_row_extends_columns() {
        let mut table = ResultsTable::new(DEFAULT_TABLE);
        table.add_row(cells(&[("Area", "10")]));
        table.add_row(cells(&[("Mean", "3.5"), ("Area", "12")]));

        assert_eq!(table.headings(), ["Area", "Mean"]);
        assert_eq!(table.value(0, "Mean"), Some(""));
        assert_eq!(table.value(1, "Area"), Some("12"));
    }

    #[test]
    fn test_discover_visits_default_first_and_once() {
        let mut bench = Workbench::new();
        bench.table_mut("Counts").add_row(cells(&[("n", "4")]));
        bench.table_mut("Empty");
        bench.results().add_row(cells(&[("Area", "1")]));

        assert_eq!(discover_tables(&bench), vec!["Results", "Counts"]);
    }

    #[test]
    fn test_remote_rows_link_to_rois_by_label() {
        let roi = Roi::new(crate::roi::Shape::Point { x: 0.0, y: 0.0 })
            .named("cell-1")
            .with_property("ROI", "99");
        let mut results = ResultsTable::new(DEFAULT_TABLE);
        results.add_row(cells(&[("Label", "cell-1"), ("Area", "5")]));
        results.add_row(cells(&[("Label", "cell-2"), ("Area", "6")]));

        let mut table = RemoteTable::new(DEFAULT_TABLE);
        table.add_rows(&results, Some(1), &[roi], "ROI");

        assert_eq!(table.rows[0].roi_id, Some(99));
        assert_eq!(table.rows[1].roi_id, None);
        assert_eq!(table.rows_for_image(1), 2);
    }
}
