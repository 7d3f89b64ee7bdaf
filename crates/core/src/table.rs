use serde::{Deserialize, Serialize};

/// A loosely formatted tabular script: a header of column names plus string
/// cells. Tables arrive in this shape from CSV files and from the
/// presentation layer, and are persisted verbatim so operator edits survive
/// a failed compile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new<S: Into<String>>(columns: Vec<S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row<S: Into<String>>(&mut self, row: Vec<S>) {
        let mut cells: Vec<String> = row.into_iter().map(Into::into).collect();
        // Ragged rows are padded so every row has one cell per column.
        cells.resize(self.columns.len(), String::new());
        self.rows.push(cells);
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Order-insensitive exact column-set comparison.
    pub fn has_columns(&self, expected: &[&str]) -> bool {
        let mut actual: Vec<&str> = self.columns.iter().map(String::as_str).collect();
        let mut wanted: Vec<&str> = expected.to_vec();
        actual.sort_unstable();
        wanted.sort_unstable();
        actual == wanted
    }

    pub fn is_blank_row(row: &[String]) -> bool {
        row.iter().all(|cell| cell.trim().is_empty())
    }

    /// Parse CSV text into a table. The first record is the header; blank
    /// records are kept (they carry meaning in cue scripts); short records
    /// are padded to the header width.
    pub fn from_csv(text: &str) -> Self {
        let mut records = parse_csv(text);
        if records.is_empty() {
            return Self::default();
        }
        let columns = records.remove(0);
        let mut table = Self {
            columns,
            rows: Vec::new(),
        };
        for record in records {
            table.push_row(record);
        }
        table
    }

    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        write_record(&mut out, &self.columns);
        for row in &self.rows {
            write_record(&mut out, row);
        }
        out
    }
}

fn write_record(out: &mut String, cells: &[String]) {
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        if cell.contains(',') || cell.contains('"') || cell.contains('\n') {
            out.push('"');
            out.push_str(&cell.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(cell);
        }
    }
    out.push('\n');
}

/// Minimal CSV reader: comma separated, double-quoted cells may contain
/// commas, doubled quotes, and newlines.
fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    cell.push('"');
                }
                '"' => in_quotes = false,
                _ => cell.push(ch),
            }
        } else {
            match ch {
                '"' => in_quotes = true,
                ',' => record.push(std::mem::take(&mut cell)),
                '\r' => {}
                '\n' => {
                    record.push(std::mem::take(&mut cell));
                    records.push(std::mem::take(&mut record));
                }
                _ => cell.push(ch),
            }
        }
    }
    if !cell.is_empty() || !record.is_empty() {
        record.push(cell);
        records.push(record);
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_round_trip() {
        let mut table = RawTable::new(vec!["Cue Number", "When", "Action", "Cue State"]);
        table.push_row(vec!["SL1", "on go", "fade up", "Fire"]);
        table.push_row(vec!["", "", "", ""]);
        table.push_row(vec!["SR1", "after, a beat", "say \"go\"", "Fire"]);

        let parsed = RawTable::from_csv(&table.to_csv());
        assert_eq!(parsed, table);
    }

    #[test]
    fn test_blank_rows_survive_parsing() {
        let table = RawTable::from_csv("A,B\n1,2\n,\n3,4\n");
        assert_eq!(table.rows.len(), 3);
        assert!(RawTable::is_blank_row(&table.rows[1]));
    }

    #[test]
    fn test_has_columns_is_order_insensitive() {
        let table = RawTable::new(vec!["When", "Cue Number", "Cue State", "Action"]);
        assert!(table.has_columns(&["Cue Number", "When", "Action", "Cue State"]));
        assert!(!table.has_columns(&["Cue Number", "When", "Action"]));
    }

    #[test]
    fn test_short_rows_are_padded() {
        let table = RawTable::from_csv("A,B,C\n1\n");
        assert_eq!(table.rows[0], vec!["1", "", ""]);
    }
}
