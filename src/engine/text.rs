//! Positioned text runs from page content streams.
//!
//! A run is one string-showing operator (`Tj`, `TJ`, `'`, `"`) with the
//! device-space origin it was painted at. The interpreter tracks just enough
//! state to place runs: CTM stack (`q`/`Q`/`cm`), text and line matrices
//! (`BT`, `Tm`, `Td`, `TD`, `T*`), leading (`TL`), font size (`Tf`) and
//! character spacing (`Tc`).
//!
//! ## Why estimate widths?
//!
//! Exact advances need per-font glyph metrics. Layout analysis here only
//! has to tell "same cell" from "next cell", so an average glyph width of
//! half an em is accurate enough and keeps the interpreter font-agnostic.
//!
//! ## Decoding
//!
//! Shown strings go through the encoding of the font selected by `Tf`. A
//! font's `/ToUnicode` CMap wins over its `/Encoding`; a `/Differences`
//! dictionary falls back to its `/BaseEncoding`. Fonts declaring neither,
//! and strings the font encoding cannot decode, are read as UTF-16BE when
//! they carry a BOM, else as Latin-1.

use crate::error::ToolkitError;
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Encoding, Object, ObjectId};
use std::collections::BTreeMap;
use tracing::debug;

/// Average glyph advance as a fraction of the font size.
const AVG_GLYPH_WIDTH: f32 = 0.5;

/// `TJ` adjustments at least this large (thousandths of an em) read as a space.
const TJ_SPACE_THRESHOLD: f32 = 250.0;

/// One painted string.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    /// Left edge, device space.
    pub x: f32,
    /// Baseline, device space (grows upwards).
    pub y: f32,
    /// Estimated advance width.
    pub width: f32,
    pub font_size: f32,
    pub text: String,
}

impl TextRun {
    pub fn right(&self) -> f32 {
        self.x + self.width
    }
}

/// Runs sharing a baseline, left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub y: f32,
    pub runs: Vec<TextRun>,
}

/// Adjacent runs of one line merged into a cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub x: f32,
    pub right: f32,
    pub text: String,
}

impl TextLine {
    /// Merge runs separated by less than `gap` into cells.
    pub fn cells(&self, gap: f32) -> Vec<Cell> {
        let mut cells: Vec<Cell> = Vec::new();
        for run in &self.runs {
            match cells.last_mut() {
                Some(cell) if run.x - cell.right < gap => {
                    if run.x - cell.right > run.font_size * 0.15 && !cell.text.ends_with(' ') {
                        cell.text.push(' ');
                    }
                    cell.text.push_str(&run.text);
                    cell.right = cell.right.max(run.right());
                }
                _ => cells.push(Cell {
                    x: run.x,
                    right: run.right(),
                    text: run.text.clone(),
                }),
            }
        }
        for cell in &mut cells {
            cell.text = cell.text.trim().to_string();
        }
        cells
    }

    /// Line text with cells separated by tabs.
    pub fn text(&self, gap: f32) -> String {
        self.cells(gap)
            .into_iter()
            .map(|c| c.text)
            .collect::<Vec<_>>()
            .join("\t")
    }
}

/// Font resource name → encoding of its shown strings.
type FontEncodings<'a> = BTreeMap<Vec<u8>, Encoding<'a>>;

/// Every text run on a page, in painting order.
pub fn page_runs(doc: &Document, page_id: ObjectId) -> Result<Vec<TextRun>, ToolkitError> {
    let data = doc
        .get_page_content(page_id)
        .map_err(|e| ToolkitError::engine("text extraction", format!("page content: {e}")))?;
    let fonts = decoding_fonts(doc, page_id);
    let encodings: FontEncodings<'_> = fonts
        .iter()
        .filter_map(|(name, font)| match font.get_font_encoding(doc) {
            Ok(encoding) => Some((name.clone(), encoding)),
            Err(e) => {
                debug!("Font /{} has no usable encoding: {}", String::from_utf8_lossy(name), e);
                None
            }
        })
        .collect();
    interpret(&data, &encodings)
}

/// Interpret raw (decoded) content stream bytes without font information.
pub fn runs_from_content(data: &[u8]) -> Result<Vec<TextRun>, ToolkitError> {
    interpret(data, &FontEncodings::new())
}

fn interpret(data: &[u8], encodings: &FontEncodings<'_>) -> Result<Vec<TextRun>, ToolkitError> {
    let content = Content::decode(data)
        .map_err(|e| ToolkitError::engine("text extraction", format!("content stream: {e}")))?;

    let mut state = TextState::default();
    let mut runs = Vec::new();
    for op in &content.operations {
        state.apply(&op.operator, &op.operands, encodings, &mut runs);
    }
    Ok(runs)
}

/// Page fonts that declare how their strings decode, rewritten so lopdf
/// resolves them: a `/ToUnicode` CMap is read as if the font were
/// `Identity-H`, and an `/Encoding` dictionary is replaced by its base name.
fn decoding_fonts(doc: &Document, page_id: ObjectId) -> BTreeMap<Vec<u8>, Dictionary> {
    let Ok(fonts) = doc.get_page_fonts(page_id) else {
        return BTreeMap::new();
    };
    fonts
        .into_iter()
        .filter_map(|(name, font)| {
            let mut font = font.clone();
            if font.has(b"ToUnicode") {
                font.set("Encoding", Object::Name(b"Identity-H".to_vec()));
            } else {
                let base = match font.get_deref(b"Encoding", doc).ok()? {
                    Object::Name(n) => n.clone(),
                    Object::Dictionary(d) => d.get(b"BaseEncoding").and_then(Object::as_name).ok()?.to_vec(),
                    _ => return None,
                };
                font.set("Encoding", Object::Name(base));
            }
            Some((name, font))
        })
        .collect()
}

/// Group runs into lines, top of the page first.
pub fn group_lines(mut runs: Vec<TextRun>, tolerance: f32) -> Vec<TextLine> {
    runs.retain(|r| !r.text.trim().is_empty());
    runs.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

    let mut lines: Vec<TextLine> = Vec::new();
    for run in runs {
        match lines.last_mut() {
            Some(line) if (line.y - run.y).abs() <= tolerance => line.runs.push(run),
            _ => lines.push(TextLine {
                y: run.y,
                runs: vec![run],
            }),
        }
    }
    for line in &mut lines {
        line.runs.sort_by(|a, b| a.x.total_cmp(&b.x));
    }
    lines
}

// ── Interpreter ──────────────────────────────────────────────────────────

/// Affine matrix `[a b c d e f]`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix([f32; 6]);

impl Matrix {
    const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    fn translate(tx: f32, ty: f32) -> Self {
        Matrix([1.0, 0.0, 0.0, 1.0, tx, ty])
    }

    /// `self × other`
    fn mul(self, other: Matrix) -> Matrix {
        let [a, b, c, d, e, f] = self.0;
        let [a2, b2, c2, d2, e2, f2] = other.0;
        Matrix([
            a * a2 + b * c2,
            a * b2 + b * d2,
            c * a2 + d * c2,
            c * b2 + d * d2,
            e * a2 + f * c2 + e2,
            e * b2 + f * d2 + f2,
        ])
    }

    fn vertical_scale(self) -> f32 {
        let [_, _, c, d, _, _] = self.0;
        (c * c + d * d).sqrt()
    }
}

struct TextState {
    ctm: Matrix,
    stack: Vec<Matrix>,
    tm: Matrix,
    tlm: Matrix,
    leading: f32,
    font: Option<Vec<u8>>,
    font_size: f32,
    char_spacing: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            stack: Vec::new(),
            tm: Matrix::IDENTITY,
            tlm: Matrix::IDENTITY,
            leading: 0.0,
            font: None,
            font_size: 12.0,
            char_spacing: 0.0,
        }
    }
}

impl TextState {
    fn apply(
        &mut self,
        operator: &str,
        operands: &[Object],
        encodings: &FontEncodings<'_>,
        runs: &mut Vec<TextRun>,
    ) {
        let n = |i: usize| operands.get(i).and_then(number);
        let decode = |font: &Option<Vec<u8>>, bytes: &[u8]| {
            font.as_ref()
                .and_then(|f| encodings.get(f))
                .and_then(|enc| enc.bytes_to_string(bytes).ok())
                .unwrap_or_else(|| decode_pdf_string(bytes))
        };
        match operator {
            "q" => self.stack.push(self.ctm),
            "Q" => {
                if let Some(m) = self.stack.pop() {
                    self.ctm = m;
                }
            }
            "cm" => {
                if let Some(m) = matrix(operands) {
                    self.ctm = m.mul(self.ctm);
                }
            }
            "BT" => {
                self.tm = Matrix::IDENTITY;
                self.tlm = Matrix::IDENTITY;
            }
            "Tf" => {
                if let Some(Object::Name(name)) = operands.first() {
                    self.font = Some(name.clone());
                }
                if let Some(size) = n(1) {
                    self.font_size = size;
                }
            }
            "Tc" => self.char_spacing = n(0).unwrap_or(0.0),
            "TL" => self.leading = n(0).unwrap_or(0.0),
            "Tm" => {
                if let Some(m) = matrix(operands) {
                    self.tm = m;
                    self.tlm = m;
                }
            }
            "Td" => self.next_line(n(0).unwrap_or(0.0), n(1).unwrap_or(0.0)),
            "TD" => {
                let ty = n(1).unwrap_or(0.0);
                self.leading = -ty;
                self.next_line(n(0).unwrap_or(0.0), ty);
            }
            "T*" => self.next_line(0.0, -self.leading),
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show(decode(&self.font, bytes), 0.0, runs);
                }
            }
            "'" => {
                self.next_line(0.0, -self.leading);
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show(decode(&self.font, bytes), 0.0, runs);
                }
            }
            "\"" => {
                if let Some(ac) = n(1) {
                    self.char_spacing = ac;
                }
                self.next_line(0.0, -self.leading);
                if let Some(Object::String(bytes, _)) = operands.get(2) {
                    self.show(decode(&self.font, bytes), 0.0, runs);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    let text = |bytes: &[u8]| decode(&self.font, bytes);
                    let (text, adjust) = self.array_text(items, text);
                    self.show(text, adjust, runs);
                }
            }
            _ => {}
        }
    }

    fn next_line(&mut self, tx: f32, ty: f32) {
        self.tlm = Matrix::translate(tx, ty).mul(self.tlm);
        self.tm = self.tlm;
    }

    /// Paint `text` as one run, then advance the text matrix past it.
    /// `extra` is an additional advance in text-space units.
    fn show(&mut self, text: String, extra: f32, runs: &mut Vec<TextRun>) {
        let chars = text.chars().count() as f32;
        let advance = chars * (self.font_size * AVG_GLYPH_WIDTH + self.char_spacing) + extra;
        let trm = self.tm.mul(self.ctm);
        let scale_x = (trm.0[0] * trm.0[0] + trm.0[1] * trm.0[1]).sqrt();

        if !text.is_empty() {
            runs.push(TextRun {
                x: trm.0[4],
                y: trm.0[5],
                width: advance * scale_x,
                font_size: self.font_size * trm.vertical_scale(),
                text,
            });
        }
        self.tm = Matrix::translate(advance, 0.0).mul(self.tm);
    }

    /// Concatenated `TJ` text and the extra advance its kerning adds.
    fn array_text(&self, items: &[Object], decode: impl Fn(&[u8]) -> String) -> (String, f32) {
        let mut text = String::new();
        let mut adjust = 0.0;
        for item in items {
            match item {
                Object::String(bytes, _) => text.push_str(&decode(bytes)),
                other => {
                    if let Some(kern) = number(other) {
                        if kern <= -TJ_SPACE_THRESHOLD && !text.is_empty() && !text.ends_with(' ') {
                            text.push(' ');
                            // The space glyph already accounts for part of the gap.
                            adjust -= self.font_size * AVG_GLYPH_WIDTH;
                        }
                        adjust -= kern / 1000.0 * self.font_size;
                    }
                }
            }
        }
        (text, adjust)
    }
}

fn number(o: &Object) -> Option<f32> {
    match o {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

fn matrix(operands: &[Object]) -> Option<Matrix> {
    if operands.len() < 6 {
        return None;
    }
    let mut m = [0.0f32; 6];
    for (slot, o) in m.iter_mut().zip(operands) {
        *slot = number(o)?;
    }
    Some(Matrix(m))
}

/// Decode a PDF string: UTF-16BE with BOM, else Latin-1.
pub fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(body) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = body
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| char::from(b)).collect()
}
