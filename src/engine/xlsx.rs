//! Minimal XLSX writer: one worksheet, a bold header row, inline strings.

use crate::engine::ooxml::{escape, Package, XML_DECLARATION};
use crate::engine::SpreadsheetWriter;
use crate::error::ToolkitError;
use crate::table::CombinedTable;
use std::fmt::Write as _;

const OP: &str = "Excel conversion";

pub const SHEET_NAME: &str = "Sheet1";

const CONTENT_TYPES: &str = r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS: &str = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

/// Style 0 is the default, style 1 is bold.
const STYLES: &str = r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="2"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1"/></cellXfs></styleSheet>"#;

const BOLD: u8 = 1;

/// The built-in [`SpreadsheetWriter`].
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxWriter;

impl SpreadsheetWriter for XlsxWriter {
    fn write(&self, table: &CombinedTable) -> Result<Vec<u8>, ToolkitError> {
        let mut pkg = Package::new(OP);
        pkg.add("[Content_Types].xml", &format!("{XML_DECLARATION}{CONTENT_TYPES}"))?;
        pkg.add("_rels/.rels", &format!("{XML_DECLARATION}{ROOT_RELS}"))?;
        pkg.add("xl/workbook.xml", &workbook_xml())?;
        pkg.add(
            "xl/_rels/workbook.xml.rels",
            &format!("{XML_DECLARATION}{WORKBOOK_RELS}"),
        )?;
        pkg.add("xl/styles.xml", &format!("{XML_DECLARATION}{STYLES}"))?;
        pkg.add("xl/worksheets/sheet1.xml", &sheet_xml(table))?;
        pkg.finish()
    }
}

fn workbook_xml() -> String {
    format!(
        r#"{XML_DECLARATION}<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="{SHEET_NAME}" sheetId="1" r:id="rId1"/></sheets></workbook>"#
    )
}

fn sheet_xml(table: &CombinedTable) -> String {
    let mut xml = String::with_capacity(256 + table.rows.len() * table.columns.len() * 48);
    xml.push_str(XML_DECLARATION);
    xml.push_str(
        r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );

    let header = table.columns.iter().map(ToString::to_string);
    push_row(&mut xml, 1, header, Some(BOLD));
    for (i, row) in table.rows.iter().enumerate() {
        push_row(&mut xml, i + 2, row.iter().cloned(), None);
    }

    xml.push_str("</sheetData></worksheet>");
    xml
}

fn push_row(xml: &mut String, number: usize, cells: impl Iterator<Item = String>, style: Option<u8>) {
    let _ = write!(xml, r#"<row r="{number}">"#);
    for (col, value) in cells.enumerate() {
        if value.is_empty() {
            continue;
        }
        let reference = format!("{}{number}", column_name(col));
        let style = style.map(|s| format!(r#" s="{s}""#)).unwrap_or_default();
        let _ = write!(
            xml,
            r#"<c r="{reference}" t="inlineStr"{style}><is><t xml:space="preserve">{}</t></is></c>"#,
            escape(&value)
        );
    }
    xml.push_str("</row>");
}

/// Spreadsheet column letters: 0 → A, 25 → Z, 26 → AA.
fn column_name(mut index: usize) -> String {
    let mut name = Vec::new();
    loop {
        name.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}
