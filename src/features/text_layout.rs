//! Text run extraction from page content streams.
//!
//! Each text-showing operator (`Tj`, `TJ`, `'`, `"`) becomes one [`TextRun`] whose origin is
//! the text rendering matrix translation in page space, relative to the MediaBox origin.

use std::collections::BTreeMap;
use std::sync::Arc;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use serde::Serialize;

use crate::error::{SignError, SignResult};
use crate::features::document::{inherited, obj_to_f64, open_document, page_box, resolve, PageSize};
use crate::features::font_encoding::{differences, parse_to_unicode, utf16_be};

/// Glyph width used when the font carries no `/Widths`, in 1/1000 em.
const DEFAULT_GLYPH_WIDTH: f64 = 500.0;
/// TJ adjustments below this (thousandths of an em) read as a word gap.
const TJ_SPACE_THRESHOLD: f64 = -200.0;
const MAX_FORM_DEPTH: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextRun {
    pub text: String,
    pub pdf_x: f64,
    pub pdf_y: f64,
    pub width: f64,
    pub height: f64,
    pub page_number: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub page_number: u32,
    pub size: PageSize,
    pub runs: Vec<TextRun>,
}

pub fn extract_layout(bytes: &[u8]) -> SignResult<Vec<PageLayout>> {
    let doc = open_document(bytes).map_err(|e| SignError::scan(e.to_string()))?;
    extract_document_layout(&doc)
}

pub fn extract_document_layout(doc: &Document) -> SignResult<Vec<PageLayout>> {
    doc.get_pages()
        .into_iter()
        .map(|(page_number, page_id)| page_layout(doc, page_number, page_id))
        .collect()
}

fn page_layout(doc: &Document, page_number: u32, page_id: ObjectId) -> SignResult<PageLayout> {
    let media = page_box(doc, page_id).map_err(|e| SignError::scan(e.to_string()))?;
    let page_dict = doc
        .get_object(page_id)
        .and_then(|o| o.as_dict())
        .map_err(|_| SignError::scan("page_missing_dict"))?;
    let content = page_content_bytes(doc, page_dict)?;
    let resources = inherited(doc, page_id, b"Resources")
        .and_then(|r| resolve(doc, r))
        .and_then(|r| r.as_dict().ok());

    let mut walker = Walker {
        doc,
        page_number,
        origin: (media.llx, media.lly),
        runs: Vec::new(),
    };
    walker.run(&content, resources, IDENTITY, 0)?;

    Ok(PageLayout {
        page_number,
        size: media.size,
        runs: walker.runs,
    })
}

fn page_content_bytes(doc: &Document, page_dict: &Dictionary) -> SignResult<Vec<u8>> {
    let contents = match page_dict.get(b"Contents") {
        Ok(obj) => obj,
        Err(_) => return Ok(Vec::new()),
    };
    match contents {
        Object::Reference(id) => {
            let stream = doc
                .get_object(*id)
                .and_then(|o| o.as_stream())
                .map_err(|e| SignError::scan(format!("contents_not_stream:{e}")))?;
            stream_bytes(stream)
        }
        Object::Array(items) => {
            let mut out = Vec::new();
            for item in items {
                let stream = resolve(doc, item)
                    .and_then(|o| o.as_stream().ok())
                    .ok_or_else(|| SignError::scan("contents_item_not_stream"))?;
                if !out.is_empty() {
                    out.push(b'\n');
                }
                out.extend_from_slice(&stream_bytes(stream)?);
            }
            Ok(out)
        }
        Object::Stream(stream) => stream_bytes(stream),
        _ => Err(SignError::scan("contents_invalid")),
    }
}

fn stream_bytes(stream: &Stream) -> SignResult<Vec<u8>> {
    if stream.dict.get(b"Filter").is_ok() {
        stream
            .decompressed_content()
            .map_err(|e| SignError::scan(format!("content_decompress_failed:{e}")))
    } else {
        Ok(stream.content.clone())
    }
}

type Matrix = [f64; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

fn mul(m1: &Matrix, m2: &Matrix) -> Matrix {
    [
        m1[0] * m2[0] + m1[1] * m2[2],
        m1[0] * m2[1] + m1[1] * m2[3],
        m1[2] * m2[0] + m1[3] * m2[2],
        m1[2] * m2[1] + m1[3] * m2[3],
        m1[4] * m2[0] + m1[5] * m2[2] + m2[4],
        m1[4] * m2[1] + m1[5] * m2[3] + m2[5],
    ]
}

fn translate(tx: f64, ty: f64) -> Matrix {
    [1.0, 0.0, 0.0, 1.0, tx, ty]
}

fn apply(m: &Matrix, x: f64, y: f64) -> (f64, f64) {
    (m[0] * x + m[2] * y + m[4], m[1] * x + m[3] * y + m[5])
}

/// Length of a vector after the linear part of `m`.
fn scaled_len(m: &Matrix, x: f64, y: f64) -> f64 {
    let dx = m[0] * x + m[2] * y;
    let dy = m[1] * x + m[3] * y;
    (dx * dx + dy * dy).sqrt()
}

#[derive(Debug, Clone, Default)]
struct FontMetrics {
    first_char: i64,
    widths: Vec<f64>,
    missing_width: f64,
    composite: bool,
    to_unicode: Option<BTreeMap<u32, String>>,
    differences: BTreeMap<u32, char>,
}

impl FontMetrics {
    fn from_dict(doc: &Document, dict: &Dictionary) -> Self {
        let composite = matches!(dict.get(b"Subtype").and_then(|s| s.as_name()), Ok(b"Type0"));
        let to_unicode = dict
            .get(b"ToUnicode")
            .ok()
            .and_then(|o| resolve(doc, o))
            .and_then(|o| o.as_stream().ok())
            .and_then(|stream| stream_bytes(stream).ok())
            .map(|data| parse_to_unicode(&data))
            .filter(|map| !map.is_empty());
        if composite {
            let missing_width = descendant(doc, dict)
                .and_then(|d| d.get(b"DW").ok())
                .and_then(obj_to_f64)
                .unwrap_or(1000.0);
            return Self {
                composite,
                missing_width,
                to_unicode,
                ..Self::default()
            };
        }

        let first_char = dict
            .get(b"FirstChar")
            .ok()
            .and_then(|o| resolve(doc, o))
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(0);
        let widths = dict
            .get(b"Widths")
            .ok()
            .and_then(|o| resolve(doc, o))
            .and_then(|o| o.as_array().ok())
            .map(|arr| {
                arr.iter()
                    .map(|w| resolve(doc, w).and_then(obj_to_f64).unwrap_or(0.0))
                    .collect()
            })
            .unwrap_or_default();
        let missing_width = dict
            .get(b"FontDescriptor")
            .ok()
            .and_then(|o| resolve(doc, o))
            .and_then(|o| o.as_dict().ok())
            .and_then(|d| d.get(b"MissingWidth").ok())
            .and_then(obj_to_f64)
            .filter(|w| *w > 0.0)
            .unwrap_or(DEFAULT_GLYPH_WIDTH);
        let differences = dict
            .get(b"Encoding")
            .map(|enc| differences(doc, enc))
            .unwrap_or_default();
        Self {
            first_char,
            widths,
            missing_width,
            composite,
            to_unicode,
            differences,
        }
    }

    fn glyph_width(&self, code: u32) -> f64 {
        if self.composite {
            return self.missing_width;
        }
        let idx = code as i64 - self.first_char;
        if idx < 0 {
            return self.missing_width;
        }
        match self.widths.get(idx as usize) {
            Some(w) if *w > 0.0 => *w,
            _ => self.missing_width,
        }
    }

    fn codes(&self, bytes: &[u8]) -> Vec<u32> {
        if self.composite {
            bytes
                .chunks(2)
                .map(|pair| match pair {
                    [hi, lo] => u32::from(*hi) << 8 | u32::from(*lo),
                    [single] => u32::from(*single),
                    _ => 0,
                })
                .collect()
        } else {
            bytes.iter().map(|b| u32::from(*b)).collect()
        }
    }

    /// Text for each entry of `codes`: `/ToUnicode` first, then `/Differences`, then the raw
    /// code as UTF-16 (composite) or Latin-1 (simple). Without a `/ToUnicode` map a string
    /// starting with a UTF-16BE BOM is decoded whole into the first slot after the BOM.
    fn decode(&self, bytes: &[u8], codes: &[u32]) -> Vec<String> {
        if self.to_unicode.is_none() {
            if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
                let bom_codes = if self.composite { 1 } else { 2 };
                let mut out = vec![String::new(); codes.len()];
                if let Some(slot) = out.get_mut(bom_codes) {
                    *slot = utf16_be(rest);
                }
                return out;
            }
        }
        codes.iter().map(|code| self.decode_code(*code)).collect()
    }

    fn decode_code(&self, code: u32) -> String {
        if let Some(text) = self.to_unicode.as_ref().and_then(|map| map.get(&code)) {
            return text.clone();
        }
        let ch = if self.composite {
            char::from_u32(code)
        } else {
            self.differences
                .get(&code)
                .copied()
                .or_else(|| u8::try_from(code).ok().map(char::from))
        };
        ch.unwrap_or(char::REPLACEMENT_CHARACTER).to_string()
    }
}

fn descendant<'a>(doc: &'a Document, dict: &'a Dictionary) -> Option<&'a Dictionary> {
    let arr = resolve(doc, dict.get(b"DescendantFonts").ok()?)?.as_array().ok()?;
    resolve(doc, arr.first()?)?.as_dict().ok()
}

#[derive(Debug, Clone)]
struct TextState {
    font: Option<Arc<FontMetrics>>,
    font_size: f64,
    char_spacing: f64,
    word_spacing: f64,
    h_scale: f64,
    leading: f64,
    rise: f64,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: None,
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            h_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

/// Text shown by one operator, or a TJ array being collected.
struct Showing {
    text: String,
    advance: f64,
    /// Advance before the first visible glyph.
    lead: f64,
}

impl Showing {
    fn empty() -> Self {
        Self {
            text: String::new(),
            advance: 0.0,
            lead: 0.0,
        }
    }

    fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    fn push(&mut self, part: Showing) {
        if self.is_blank() {
            self.lead = self.advance + part.lead;
        }
        self.text.push_str(&part.text);
        self.advance += part.advance;
    }

    fn adjust(&mut self, shift: f64) {
        self.advance += shift;
        if self.is_blank() {
            self.lead = self.advance;
        }
    }
}

struct Walker<'a> {
    doc: &'a Document,
    page_number: u32,
    origin: (f64, f64),
    runs: Vec<TextRun>,
}

impl<'a> Walker<'a> {
    fn run(
        &mut self,
        content: &[u8],
        resources: Option<&'a Dictionary>,
        base_ctm: Matrix,
        depth: usize,
    ) -> SignResult<()> {
        let content = Content::decode(content)
            .map_err(|e| SignError::scan(format!("content_decode_failed:{e}")))?;
        let fonts = self.fonts(resources);

        let mut ctm = base_ctm;
        let mut ts = TextState::default();
        let mut stack: Vec<(Matrix, TextState)> = Vec::new();
        let mut tm = IDENTITY;
        let mut tlm = IDENTITY;

        for op in &content.operations {
            let nums = numbers(op);
            match op.operator.as_str() {
                "q" => stack.push((ctm, ts.clone())),
                "Q" => {
                    if let Some((saved_ctm, saved_ts)) = stack.pop() {
                        ctm = saved_ctm;
                        ts = saved_ts;
                    }
                }
                "cm" if nums.len() == 6 => {
                    let m = [nums[0], nums[1], nums[2], nums[3], nums[4], nums[5]];
                    ctm = mul(&m, &ctm);
                }
                "BT" => {
                    tm = IDENTITY;
                    tlm = IDENTITY;
                }
                "Tf" => {
                    if let Some(name) = op.operands.first().and_then(|o| o.as_name().ok()) {
                        ts.font = fonts.get(name).cloned();
                    }
                    if let Some(size) = op.operands.get(1).and_then(obj_to_f64) {
                        ts.font_size = size;
                    }
                }
                "TL" if !nums.is_empty() => ts.leading = nums[0],
                "Tc" if !nums.is_empty() => ts.char_spacing = nums[0],
                "Tw" if !nums.is_empty() => ts.word_spacing = nums[0],
                "Tz" if !nums.is_empty() => ts.h_scale = nums[0] / 100.0,
                "Ts" if !nums.is_empty() => ts.rise = nums[0],
                "Td" if nums.len() == 2 => {
                    tlm = mul(&translate(nums[0], nums[1]), &tlm);
                    tm = tlm;
                }
                "TD" if nums.len() == 2 => {
                    ts.leading = -nums[1];
                    tlm = mul(&translate(nums[0], nums[1]), &tlm);
                    tm = tlm;
                }
                "Tm" if nums.len() == 6 => {
                    tlm = [nums[0], nums[1], nums[2], nums[3], nums[4], nums[5]];
                    tm = tlm;
                }
                "T*" => {
                    tlm = mul(&translate(0.0, -ts.leading), &tlm);
                    tm = tlm;
                }
                "Tj" => {
                    if let Some(bytes) = op.operands.first().and_then(string_bytes) {
                        let showing = self.measure(&ts, bytes);
                        tm = self.emit(showing, &ts, tm, &ctm);
                    }
                }
                "'" | "\"" => {
                    let (string_idx, spacing) = if op.operator == "'" {
                        (0, None)
                    } else {
                        (2, Some((nums.first().copied(), nums.get(1).copied())))
                    };
                    if let Some((aw, ac)) = spacing {
                        if let Some(aw) = aw {
                            ts.word_spacing = aw;
                        }
                        if let Some(ac) = ac {
                            ts.char_spacing = ac;
                        }
                    }
                    tlm = mul(&translate(0.0, -ts.leading), &tlm);
                    tm = tlm;
                    if let Some(bytes) = op.operands.get(string_idx).and_then(string_bytes) {
                        let showing = self.measure(&ts, bytes);
                        tm = self.emit(showing, &ts, tm, &ctm);
                    }
                }
                "TJ" => {
                    if let Some(Ok(items)) = op.operands.first().map(|o| o.as_array()) {
                        let mut showing = Showing::empty();
                        for item in items {
                            if let Some(bytes) = string_bytes(item) {
                                showing.push(self.measure(&ts, bytes));
                            } else if let Some(adjust) = obj_to_f64(item) {
                                showing.adjust(-adjust / 1000.0 * ts.font_size * ts.h_scale);
                                if adjust < TJ_SPACE_THRESHOLD && !showing.text.ends_with(' ') {
                                    showing.text.push(' ');
                                }
                            }
                        }
                        tm = self.emit(showing, &ts, tm, &ctm);
                    }
                }
                "Do" if depth < MAX_FORM_DEPTH => {
                    if let Some(name) = op.operands.first().and_then(|o| o.as_name().ok()) {
                        self.form(name, resources, &ctm, depth)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn fonts(&self, resources: Option<&Dictionary>) -> BTreeMap<Vec<u8>, Arc<FontMetrics>> {
        let mut out = BTreeMap::new();
        let Some(font_dict) = resources
            .and_then(|r| r.get(b"Font").ok())
            .and_then(|f| resolve(self.doc, f))
            .and_then(|f| f.as_dict().ok())
        else {
            return out;
        };
        for (name, obj) in font_dict.iter() {
            if let Some(dict) = resolve(self.doc, obj).and_then(|o| o.as_dict().ok()) {
                out.insert(name.clone(), Arc::new(FontMetrics::from_dict(self.doc, dict)));
            }
        }
        out
    }

    /// Run a form XObject's content with its own matrix and resources.
    fn form(
        &mut self,
        name: &[u8],
        resources: Option<&'a Dictionary>,
        ctm: &Matrix,
        depth: usize,
    ) -> SignResult<()> {
        let doc = self.doc;
        let Some(stream) = resources
            .and_then(|r| r.get(b"XObject").ok())
            .and_then(|x| resolve(doc, x))
            .and_then(|x| x.as_dict().ok())
            .and_then(|x| x.get(name).ok())
            .and_then(|x| resolve(doc, x))
            .and_then(|x| x.as_stream().ok())
        else {
            return Ok(());
        };
        if !matches!(stream.dict.get(b"Subtype").and_then(|s| s.as_name()), Ok(b"Form")) {
            return Ok(());
        }
        let matrix = stream
            .dict
            .get(b"Matrix")
            .ok()
            .and_then(|m| resolve(doc, m))
            .and_then(|m| m.as_array().ok())
            .and_then(|arr| {
                let vals: Vec<f64> = arr.iter().filter_map(obj_to_f64).collect();
                (vals.len() == 6).then(|| [vals[0], vals[1], vals[2], vals[3], vals[4], vals[5]])
            })
            .unwrap_or(IDENTITY);
        let form_resources = stream
            .dict
            .get(b"Resources")
            .ok()
            .and_then(|r| resolve(doc, r))
            .and_then(|r| r.as_dict().ok())
            .or(resources);
        let bytes = stream_bytes(stream)?;
        self.run(&bytes, form_resources, mul(&matrix, ctm), depth + 1)
    }

    fn measure(&self, ts: &TextState, bytes: &[u8]) -> Showing {
        let fallback = FontMetrics::default();
        let metrics = ts.font.as_deref().unwrap_or(&fallback);
        let codes = metrics.codes(bytes);
        let pieces = metrics.decode(bytes, &codes);
        let mut showing = Showing::empty();
        for (code, piece) in codes.iter().zip(pieces) {
            let w0 = if ts.font.is_some() {
                metrics.glyph_width(*code)
            } else {
                DEFAULT_GLYPH_WIDTH
            };
            let word = if !metrics.composite && *code == 32 {
                ts.word_spacing
            } else {
                0.0
            };
            showing.push(Showing {
                text: piece,
                advance: (w0 / 1000.0 * ts.font_size + ts.char_spacing + word) * ts.h_scale,
                lead: 0.0,
            });
        }
        showing
    }

    /// Record the run (if it has visible text) and return the advanced text matrix.
    fn emit(&mut self, showing: Showing, ts: &TextState, tm: Matrix, ctm: &Matrix) -> Matrix {
        let trm = mul(&tm, ctm);
        let text = showing.text.trim();
        if !text.is_empty() {
            let (x, y) = apply(&trm, showing.lead, ts.rise);
            self.runs.push(TextRun {
                text: text.to_string(),
                pdf_x: x - self.origin.0,
                pdf_y: y - self.origin.1,
                width: scaled_len(&trm, showing.advance - showing.lead, 0.0),
                height: scaled_len(&trm, 0.0, ts.font_size),
                page_number: self.page_number,
            });
        }
        mul(&translate(showing.advance, 0.0), &tm)
    }
}

fn numbers(op: &Operation) -> Vec<f64> {
    op.operands.iter().filter_map(obj_to_f64).collect()
}

fn string_bytes(obj: &Object) -> Option<&[u8]> {
    match obj {
        Object::String(bytes, _) => Some(bytes.as_slice()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        cid_hex, differences_font, identity_h_font, pdf_with_font, pdf_with_inherited_resources,
        pdf_with_pages, show_text, PageSpec,
    };

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn single_run_position_and_metrics() {
        let bytes = pdf_with_pages(&[PageSpec::letter(&show_text(100.0, 500.0, 12.0, "Signature"))]);
        let pages = extract_layout(&bytes).unwrap();
        assert_eq!(pages.len(), 1);
        let run = &pages[0].runs[0];
        assert_eq!(run.text, "Signature");
        assert!(approx(run.pdf_x, 100.0));
        assert!(approx(run.pdf_y, 500.0));
        // 9 glyphs * 500/1000 em * 12pt
        assert!(approx(run.width, 54.0));
        assert!(approx(run.height, 12.0));
        assert_eq!(run.page_number, 1);
    }

    #[test]
    fn runs_are_grouped_per_page_in_order() {
        let bytes = pdf_with_pages(&[
            PageSpec::letter(&show_text(50.0, 700.0, 10.0, "Invoice")),
            PageSpec::letter(&format!(
                "{}{}",
                show_text(50.0, 300.0, 10.0, "Name"),
                show_text(50.0, 280.0, 10.0, "Date")
            )),
        ]);
        let pages = extract_layout(&bytes).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].page_number, 2);
        let texts: Vec<&str> = pages[1].runs.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["Name", "Date"]);
        assert!(pages[1].runs.iter().all(|r| r.page_number == 2));
    }

    #[test]
    fn text_matrix_and_ctm_compose() {
        let content = "q 2 0 0 2 10 20 cm BT /F1 10 Tf 1 0 0 1 30 40 Tm (Ab) Tj ET Q";
        let bytes = pdf_with_pages(&[PageSpec::letter(content)]);
        let run = &extract_layout(&bytes).unwrap()[0].runs[0];
        assert!(approx(run.pdf_x, 70.0));
        assert!(approx(run.pdf_y, 100.0));
        // 2 glyphs * 5pt, doubled by the CTM
        assert!(approx(run.width, 20.0));
        assert!(approx(run.height, 20.0));
    }

    #[test]
    fn consecutive_tj_advances_along_the_line() {
        let content = "BT /F1 10 Tf 100 200 Td (Sign) Tj (ature) Tj ET";
        let bytes = pdf_with_pages(&[PageSpec::letter(content)]);
        let runs = &extract_layout(&bytes).unwrap()[0].runs;
        assert_eq!(runs.len(), 2);
        assert!(approx(runs[1].pdf_x, 120.0));
        assert!(approx(runs[1].pdf_y, 200.0));
    }

    #[test]
    fn tj_array_joins_parts_and_inserts_word_gaps() {
        let content = "BT /F1 10 Tf 100 200 Td [(Authorised) -300 (Signature)] TJ ET";
        let bytes = pdf_with_pages(&[PageSpec::letter(content)]);
        let run = &extract_layout(&bytes).unwrap()[0].runs[0];
        assert_eq!(run.text, "Authorised Signature");
        // 19 glyphs * 5pt + 3pt gap
        assert!(approx(run.width, 98.0));
    }

    #[test]
    fn next_line_operators_use_leading() {
        let content = "BT /F1 10 Tf 14 TL 50 600 Td (First) Tj (Second) ' T* (Third) Tj ET";
        let bytes = pdf_with_pages(&[PageSpec::letter(content)]);
        let runs = &extract_layout(&bytes).unwrap()[0].runs;
        let ys: Vec<f64> = runs.iter().map(|r| r.pdf_y).collect();
        assert_eq!(runs.len(), 3);
        assert!(approx(ys[0], 600.0));
        assert!(approx(ys[1], 586.0));
        assert!(approx(ys[2], 572.0));
        assert!(approx(runs[1].pdf_x, 50.0));
    }

    #[test]
    fn whitespace_runs_are_dropped() {
        let content = "BT /F1 10 Tf 10 10 Td (   ) Tj ( x ) Tj ET";
        let bytes = pdf_with_pages(&[PageSpec::letter(content)]);
        let runs = &extract_layout(&bytes).unwrap()[0].runs;
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].text, "x");
    }

    #[test]
    fn fonts_resolve_through_inherited_resources() {
        let bytes = pdf_with_inherited_resources(&show_text(10.0, 10.0, 10.0, "Hi"));
        let run = &extract_layout(&bytes).unwrap()[0].runs[0];
        assert!(approx(run.width, 10.0));
    }

    #[test]
    fn utf16_strings_with_bom_are_decoded() {
        let metrics = FontMetrics::default();
        let bytes = [0xFE, 0xFF, 0x00, 0x53, 0x00, 0x69];
        let codes = metrics.codes(&bytes);
        assert_eq!(metrics.decode(&bytes, &codes).concat(), "Si");
        assert_eq!(metrics.decode(b"Sign", &metrics.codes(b"Sign")).concat(), "Sign");
    }

    #[test]
    fn identity_h_text_is_decoded_through_to_unicode() {
        let content = format!("BT /F2 12 Tf 100 500 Td {} Tj ET", cid_hex(9));
        let bytes = pdf_with_font(&content, |doc| identity_h_font(doc, "Signature"));
        let run = &extract_layout(&bytes).unwrap()[0].runs[0];
        assert_eq!(run.text, "Signature");
        assert!(approx(run.pdf_x, 100.0));
        // 9 CIDs * DW 500/1000 em * 12pt
        assert!(approx(run.width, 54.0));
    }

    #[test]
    fn identity_h_without_to_unicode_keeps_raw_cids() {
        let metrics = FontMetrics {
            composite: true,
            ..FontMetrics::default()
        };
        let bytes = [0x00, 0x41, 0x00, 0x42];
        assert_eq!(metrics.decode(&bytes, &metrics.codes(&bytes)).concat(), "AB");
    }

    #[test]
    fn differences_rename_simple_font_codes() {
        let names = ["S", "i", "g", "n", "a", "t", "u", "r", "e"];
        let content = "BT /F2 10 Tf 40 300 Td <010203040506070809> Tj ET";
        let bytes = pdf_with_font(content, |doc| differences_font(doc, 1, &names));
        let run = &extract_layout(&bytes).unwrap()[0].runs[0];
        assert_eq!(run.text, "Signature");
    }

    #[test]
    fn leading_spaces_move_the_run_origin() {
        let content = "BT /F1 10 Tf 100 200 Td (  Signature) Tj ET";
        let bytes = pdf_with_pages(&[PageSpec::letter(content)]);
        let run = &extract_layout(&bytes).unwrap()[0].runs[0];
        assert_eq!(run.text, "Signature");
        // two 5pt spaces skipped
        assert!(approx(run.pdf_x, 110.0));
        assert!(approx(run.width, 45.0));
    }

    #[test]
    fn tj_leading_adjustment_counts_toward_origin() {
        let content = "BT /F1 10 Tf 100 200 Td [( ) -1000 (Sign)] TJ ET";
        let bytes = pdf_with_pages(&[PageSpec::letter(content)]);
        let run = &extract_layout(&bytes).unwrap()[0].runs[0];
        assert_eq!(run.text, "Sign");
        // 5pt space + 10pt adjustment
        assert!(approx(run.pdf_x, 115.0));
    }

    #[test]
    fn corrupt_input_is_a_scan_error() {
        let err = extract_layout(b"definitely not a pdf").unwrap_err();
        assert!(matches!(err, SignError::Scan { .. }));
    }
}
