use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use tracing::{debug, error};

use crate::extract::error::ExtractionError;

const EMPTY_CELL: &str = "-";
const COLUMN_GAP: &str = "  ";

/// Render every sheet of a workbook as a column-aligned text grid with the
/// header row first.
pub fn extract_spreadsheet(bytes: &[u8]) -> String {
    match read_spreadsheet(bytes) {
        Ok(text) => text,
        Err(e) => {
            error!(error = %e, "Error reading Excel");
            String::new()
        }
    }
}

fn read_spreadsheet(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| ExtractionError::Spreadsheet(e.to_string()))?;

    let mut text = String::new();
    for sheet_name in workbook.sheet_names().to_vec() {
        let range = match workbook.worksheet_range(&sheet_name) {
            Ok(range) => range,
            Err(e) => {
                debug!(sheet = %sheet_name, error = %e, "Skipping unreadable sheet");
                continue;
            }
        };

        let rows: Vec<Vec<String>> = range
            .rows()
            .map(|row| row.iter().map(cell_text).collect::<Vec<_>>())
            .filter(|row| row.iter().any(|cell| cell != EMPTY_CELL))
            .collect();

        // Blank line keeps a keyword in the sheet name from opening a table
        text.push_str(&format!("Sheet: {}\n\n", sheet_name));
        text.push_str(&render_grid(&rows));
        text.push('\n');
    }

    Ok(text)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => EMPTY_CELL.to_string(),
        Data::String(s) if s.trim().is_empty() => EMPTY_CELL.to_string(),
        Data::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

/// Pad each column to its widest cell. The last column is left unpadded.
pub(crate) fn render_grid(rows: &[Vec<String>]) -> String {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0usize; columns];
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let mut out = String::new();
    for row in rows {
        let mut line = String::new();
        for (i, cell) in row.iter().enumerate() {
            if i > 0 {
                line.push_str(COLUMN_GAP);
            }
            line.push_str(cell);
            if i + 1 < row.len() {
                let pad = widths[i] - cell.chars().count();
                line.extend(std::iter::repeat(' ').take(pad));
            }
        }
        out.push_str(&line);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_render_grid_aligns_columns() {
        let grid = render_grid(&[
            row(&["University Name", "Country", "Fee"]),
            row(&["ETH Zurich", "Switzerland", "1460"]),
            row(&["TU Munich", "-", "0"]),
        ]);

        assert_eq!(
            grid,
            "University Name  Country      Fee\n\
             ETH Zurich       Switzerland  1460\n\
             TU Munich        -            0\n"
        );
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Data::Empty), "-");
        assert_eq!(cell_text(&Data::String("  Oxford ".to_string())), "Oxford");
        assert_eq!(cell_text(&Data::Int(42)), "42");
        assert_eq!(cell_text(&Data::Bool(true)), "true");
    }

    fn cells(line: &str) -> Vec<&str> {
        line.split("  ").map(str::trim).filter(|c| !c.is_empty()).collect()
    }

    #[test]
    fn test_reads_workbook() {
        let text = extract_spreadsheet(include_bytes!("../../tests/fixtures/partners.xlsx"));
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Sheet: Country list");
        assert_eq!(lines[1], "");
        assert_eq!(cells(lines[2]), vec!["University Name", "Country", "Commission"]);
        assert_eq!(cells(lines[3]), vec!["University of Toronto", "Canada", "15"]);
        assert_eq!(cells(lines[4]), vec!["TU Munich", "Germany", "10"]);
    }

    #[test]
    fn test_sheet_label_does_not_swallow_header() {
        use crate::tables::KeywordTableDetector;

        let text = extract_spreadsheet(include_bytes!("../../tests/fixtures/partners.xlsx"));
        let tables = KeywordTableDetector::new().find_tables(&text);

        let partners = tables
            .iter()
            .find(|t| t.len() > 1)
            .expect("partner table");
        assert_eq!(partners[0], vec!["University Name", "Country", "Commission"]);
        assert_eq!(partners.len(), 3);
    }

    #[test]
    fn test_malformed_workbook_is_empty() {
        assert_eq!(extract_spreadsheet(b"not a workbook"), "");
    }
}
