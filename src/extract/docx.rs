use docx_rs::{
    DocumentChild, Paragraph, ParagraphChild, RunChild, Table, TableCellContent, TableChild,
    TableRowChild,
};
use tracing::error;

use crate::extract::error::ExtractionError;

/// Extract a Word document: one line per paragraph, table rows with cells
/// joined by two spaces so they read like the column layout of a PDF table.
pub fn extract_docx(bytes: &[u8]) -> String {
    match read_docx(bytes) {
        Ok(text) => text,
        Err(e) => {
            error!(error = %e, "Error reading DOCX");
            String::new()
        }
    }
}

fn read_docx(bytes: &[u8]) -> Result<String, ExtractionError> {
    let docx = docx_rs::read_docx(bytes).map_err(|e| ExtractionError::Docx(e.to_string()))?;

    let mut text = String::new();
    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(paragraph) => {
                text.push_str(&paragraph_text(paragraph));
                text.push('\n');
            }
            DocumentChild::Table(table) => {
                for row in table_rows(table) {
                    text.push_str(&row);
                    text.push('\n');
                }
                // A blank line closes the table for the detector
                text.push('\n');
            }
            _ => {}
        }
    }

    Ok(text)
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut text = String::new();
    for child in &paragraph.children {
        if let ParagraphChild::Run(run) = child {
            for run_child in &run.children {
                if let RunChild::Text(t) = run_child {
                    text.push_str(&t.text);
                }
            }
        }
    }
    text
}

#[allow(unreachable_patterns)]
fn table_rows(table: &Table) -> Vec<String> {
    table
        .rows
        .iter()
        .filter_map(|row| match row {
            TableChild::TableRow(row) => Some(row),
            _ => None,
        })
        .map(|row| {
            row.cells
                .iter()
                .filter_map(|cell| match cell {
                    TableRowChild::TableCell(cell) => Some(cell),
                    _ => None,
                })
                .map(|cell| {
                    cell.children
                        .iter()
                        .filter_map(|content| match content {
                            TableCellContent::Paragraph(p) => Some(paragraph_text(p)),
                            _ => None,
                        })
                        .collect::<Vec<_>>()
                        .join(" ")
                        .trim()
                        .to_string()
                })
                .collect::<Vec<_>>()
                .join("  ")
        })
        .collect()
}
