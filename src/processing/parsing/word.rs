use docx_rs::{DocumentChild, Paragraph, ParagraphChild, RunChild, Table, TableCellContent};
use docx_rs::{TableChild, TableRowChild};

use crate::processing::types::ParseError;

/// Extract raw text from an OOXML Word document, one line per paragraph.
///
/// Tabs become spaces and line breaks become newlines. Table cells are read row by row, and
/// hyperlink text is kept. Legacy binary `.doc` files are not OOXML archives and are reported as
/// [`ParseError::Word`].
pub(crate) fn extract_text(bytes: &[u8]) -> Result<String, ParseError> {
    let docx = docx_rs::read_docx(bytes).map_err(|err| ParseError::Word(err.to_string()))?;

    let mut content = String::new();
    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(paragraph) => push_paragraph(&mut content, paragraph),
            DocumentChild::Table(table) => push_table(&mut content, table),
            _ => {}
        }
    }

    Ok(content)
}

fn push_paragraph(content: &mut String, paragraph: &Paragraph) {
    push_paragraph_children(content, &paragraph.children);
    content.push('\n');
}

fn push_paragraph_children(content: &mut String, children: &[ParagraphChild]) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => {
                for run_child in &run.children {
                    match run_child {
                        RunChild::Text(text) => content.push_str(&text.text),
                        RunChild::Tab(_) | RunChild::PTab(_) => content.push(' '),
                        RunChild::Break(_) | RunChild::CarriageReturn(_) => content.push('\n'),
                        _ => {}
                    }
                }
            }
            ParagraphChild::Hyperlink(link) => push_paragraph_children(content, &link.children),
            _ => {}
        }
    }
}

fn push_table(content: &mut String, table: &Table) {
    for TableChild::TableRow(row) in &table.rows {
        for TableRowChild::TableCell(cell) in &row.cells {
            for cell_content in &cell.children {
                match cell_content {
                    TableCellContent::Paragraph(paragraph) => push_paragraph(content, paragraph),
                    TableCellContent::Table(nested) => push_table(content, nested),
                    _ => {}
                }
            }
        }
    }
}
