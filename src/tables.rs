use std::sync::OnceLock;

use prettytable::{format, Cell, Row, Table};
use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

/// Header phrases that mark the first line of a table in extracted text.
pub const TABLE_HEADER_KEYWORDS: &[&str] = &[
    "Sl No",
    "University Name",
    "Country",
    "City/State",
    "Commission to Associate",
    "Country University Name Commission to Associate",
];

#[derive(Error, Debug)]
pub enum TableDetectionError {
    #[error("Failed to render table: {0}")]
    Render(#[from] std::io::Error),

    #[error("Rendered table is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Finds tabular spans in plain text and renders them as formatted grids.
///
/// Implementations must not fail: when detection goes wrong the result is
/// an empty string.
pub trait TableDetector: Send + Sync {
    fn detect(&self, text: &str) -> String;
}

/// Line-based heuristic detector.
///
/// A line containing one of the header keywords opens a table; the table
/// runs until the next blank line or the end of the text. Columns are split
/// on tabs or runs of two or more spaces. Single-space separated columns and
/// irregular headers are not recognised and come out as best-effort rows.
#[derive(Debug, Clone)]
pub struct KeywordTableDetector {
    keywords: Vec<String>,
}

impl Default for KeywordTableDetector {
    fn default() -> Self {
        Self::with_keywords(TABLE_HEADER_KEYWORDS.iter().copied())
    }
}

impl KeywordTableDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords.into_iter().map(Into::into).collect(),
        }
    }

    fn is_header(&self, line: &str) -> bool {
        self.keywords.iter().any(|k| line.contains(k.as_str()))
    }

    /// Locate table spans and split them into cells. The first row of each
    /// table is its header.
    pub fn find_tables(&self, text: &str) -> Vec<Vec<Vec<String>>> {
        let lines: Vec<&str> = text.lines().collect();
        let mut tables = Vec::new();
        let mut consumed_until = 0;

        for (start, line) in lines.iter().enumerate() {
            if start < consumed_until || !self.is_header(line) {
                continue;
            }

            let end = lines[start + 1..]
                .iter()
                .position(|l| l.trim().is_empty())
                .map(|offset| start + 1 + offset)
                .unwrap_or(lines.len());

            let rows: Vec<Vec<String>> = lines[start..end]
                .iter()
                .map(|l| split_columns(l.trim()))
                .collect();

            debug!(start, end, rows = rows.len(), "Found table");
            tables.push(rows);
            consumed_until = end;
        }

        tables
    }

    fn try_detect(&self, text: &str) -> Result<Vec<String>, TableDetectionError> {
        self.find_tables(text)
            .iter()
            .map(|rows| render_table(rows))
            .collect()
    }
}

impl TableDetector for KeywordTableDetector {
    fn detect(&self, text: &str) -> String {
        match self.try_detect(text) {
            Ok(tables) => tables.join("\n"),
            Err(e) => {
                warn!(error = %e, "Error extracting tables");
                String::new()
            }
        }
    }
}

fn column_separator() -> &'static Regex {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    SEPARATOR.get_or_init(|| Regex::new(r"\t+|\s{2,}").expect("column separator pattern is valid"))
}

fn split_columns(line: &str) -> Vec<String> {
    column_separator()
        .split(line)
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(str::to_string)
        .collect()
}

fn render_table(rows: &[Vec<String>]) -> Result<String, TableDetectionError> {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_DEFAULT);

    let mut rows = rows.iter();
    if let Some(header) = rows.next() {
        table.set_titles(to_row(header));
    }
    for row in rows {
        table.add_row(to_row(row));
    }

    let mut out = Vec::new();
    table.print(&mut out)?;
    let rendered = String::from_utf8(out)?;
    Ok(rendered.trim_end().to_string())
}

fn to_row(cells: &[String]) -> Row {
    Row::new(cells.iter().map(|c| Cell::new(c)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_rows(rendered: &str) -> Vec<&str> {
        rendered.lines().filter(|l| l.starts_with('|')).collect()
    }

    #[test]
    fn test_detects_university_table() {
        let text = "Partner list for 2024\n\
                    University Name  Country  City/State\n\
                    University of Melbourne  Australia  Victoria\n\
                    McGill University  Canada  Quebec\n\
                    \n\
                    Applications close in March.";

        let detector = KeywordTableDetector::new();
        let tables = detector.find_tables(text);
        assert_eq!(tables.len(), 1);
        assert_eq!(
            tables[0],
            vec![
                vec!["University Name", "Country", "City/State"],
                vec!["University of Melbourne", "Australia", "Victoria"],
                vec!["McGill University", "Canada", "Quebec"],
            ]
        );

        let rendered = detector.detect(text);
        let rows = grid_rows(&rendered);
        assert_eq!(rows.len(), 3);
        assert!(rows[0].contains("University Name"));
        assert!(rows[0].contains("City/State"));
        assert!(rows[1].contains("University of Melbourne"));
        assert!(rows[2].contains("McGill University"));
        assert!(rendered.contains("+="));
        assert!(!rendered.contains("Applications close"));
    }

    #[test]
    fn test_table_runs_to_end_of_text() {
        let text = "Sl No  Program\n1  MSc Data Science\n2  MBA";
        let tables = KeywordTableDetector::new().find_tables(text);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].len(), 3);
        assert_eq!(tables[0][2], vec!["2", "MBA"]);
    }

    #[test]
    fn test_multiple_tables_joined_by_newline() {
        let text = "University Name  Fee\nLMU  0\n\nCountry  Visa\nGermany  National D\n";
        let detector = KeywordTableDetector::new();
        let rendered = detector.detect(text);

        assert_eq!(detector.find_tables(text).len(), 2);
        assert_eq!(grid_rows(&rendered).len(), 4);
        assert!(rendered.contains("LMU"));
        assert!(rendered.contains("National D"));
    }

    #[test]
    fn test_rows_inside_a_table_do_not_open_another() {
        let text = "University Name  Country\nUCL  United Kingdom\nUBC  Country: Canada\n";
        let tables = KeywordTableDetector::new().find_tables(text);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].len(), 3);
    }

    #[test]
    fn test_tabs_split_columns() {
        assert_eq!(split_columns("Country\tCity/State"), vec!["Country", "City/State"]);
        assert_eq!(split_columns("New York University    USA"), vec!["New York University", "USA"]);
    }

    #[test]
    fn test_no_keywords_no_tables() {
        let detector = KeywordTableDetector::new();
        assert_eq!(detector.detect("I scored 320 in the GRE.\n\nMy budget is 20k."), "");
        assert_eq!(detector.detect(""), "");
    }

    #[test]
    fn test_custom_keywords() {
        let detector = KeywordTableDetector::with_keywords(["Scholarship"]);
        let rendered = detector.detect("Scholarship  Amount\nDAAD  934 EUR/month\n");
        assert_eq!(grid_rows(&rendered).len(), 2);
        assert_eq!(detector.detect("University Name  Country\nETH  CH\n"), "");
    }
}
