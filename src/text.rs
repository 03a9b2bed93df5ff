//! Text extraction: content-stream interpretation and page traversal.
//!
//! [`extract_text`] drives the whole pipeline: unfilter streams, index the
//! object graph, expand object streams, register fonts, then walk every page
//! and feed its content streams through the operator reader. Documents whose
//! pages yield nothing fall back to scanning every plausible content stream
//! in the file.

use std::collections::HashMap;
use std::sync::Arc;

use crate::filters;
use crate::fonts::{self, FontInfo, FontRegistry};
use crate::model::Object;
use crate::parser::PdfDoc;
use crate::tokenizer::{Lexer, Token};

/// Pages whose `Resources` are inherited follow at most this many `/Parent`
/// links.
const PARENT_CHAIN_MAX: usize = 32;

#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Soft line-break token within a page, and the joiner between
    /// fallback-path stream emissions.
    pub divider: String,
    /// Emit extraction diagnostics (they go through `log`, so a logger must
    /// be installed to see them).
    pub debug: bool,
    /// `TJ` numeric adjustments below this advance far enough to count as an
    /// inter-word gap.
    pub tj_space_threshold: f64,
    /// ToUnicode maps with fewer entries than this are considered subset
    /// leftovers and get supplemented from the embedded font program.
    pub to_unicode_completeness: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            divider: "\n".to_string(),
            debug: false,
            tj_space_threshold: -80.0,
            to_unicode_completeness: fonts::DEFAULT_TO_UNICODE_COMPLETENESS,
        }
    }
}

/// Extract all text from a top-level object sequence. Best-effort: the
/// result may be empty, but the call never fails.
pub fn extract_text(docs: Vec<Object>) -> String {
    extract_text_with_options(docs, &ExtractOptions::default())
}

pub fn extract_text_with_options(docs: Vec<Object>, options: &ExtractOptions) -> String {
    let docs = filters::unfilter(docs);
    let mut doc = PdfDoc::from_objects(docs);
    doc.expand_object_streams();
    let mut registry = FontRegistry::build(&doc, options.to_unicode_completeness);
    if options.debug {
        log::debug!(
            "indexed {} objects, {} font entries",
            doc.objects.len(),
            registry.fonts().count()
        );
    }

    let mut out = String::new();
    for id in doc.sorted_ids() {
        let Some(page) = doc.get(id).filter(|obj| obj.type_name() == Some("Page")) else {
            continue;
        };
        let Some(page) = page.as_dict() else { continue };
        let scope = page_font_scope(&doc, page, &mut registry);
        let mut run = TextRun::new(&scope, &registry, options);
        for data in page_content_streams(&doc, page) {
            run.process(data);
        }
        let page_text = run.finish();
        if options.debug {
            log::debug!("page object {id}: {} chars", page_text.chars().count());
        }
        if !page_text.is_empty() {
            out.push_str(&page_text);
            out.push_str("\n\n");
        }
    }

    if out.is_empty() {
        if options.debug {
            log::debug!("no page text; scanning loose streams");
        }
        out = fallback_extract(&doc, &registry, options);
    }
    out
}

/// Resolve the page's font resources into a name → decoder scope. Fonts
/// referenced but not yet registered are built on demand.
fn page_font_scope(
    doc: &PdfDoc,
    page: &HashMap<String, Object>,
    registry: &mut FontRegistry,
) -> HashMap<String, Arc<FontInfo>> {
    let mut scope = HashMap::new();
    let Some(resources) = page_resources(doc, page) else {
        return scope;
    };
    let Some(font_dict) = resources.get("Font").map(|f| doc.resolve(f)) else {
        return scope;
    };
    let Some(font_dict) = font_dict.as_dict() else {
        return scope;
    };
    for (name, value) in font_dict {
        let font = match value {
            Object::Reference { obj_num, .. } => registry.register(doc, *obj_num),
            other => other.as_dict().map(|dict| {
                Arc::new(fonts::build_font_info(
                    doc,
                    dict,
                    fonts::DEFAULT_TO_UNICODE_COMPLETENESS,
                ))
            }),
        };
        if let Some(font) = font {
            scope.insert(name.clone(), font);
        }
    }
    scope
}

/// A page's `Resources`, following the `/Parent` chain when the page itself
/// carries none.
fn page_resources<'a>(
    doc: &'a PdfDoc,
    page: &'a HashMap<String, Object>,
) -> Option<&'a HashMap<String, Object>> {
    let mut node = page;
    for _ in 0..PARENT_CHAIN_MAX {
        if let Some(resources) = node.get("Resources").map(|r| doc.resolve(r))
            && let Some(resources) = resources.as_dict()
        {
            return Some(resources);
        }
        node = node.get("Parent").map(|p| doc.resolve(p))?.as_dict()?;
    }
    None
}

/// `Contents` as a list of raw stream buffers: a single stream, or an array
/// of streams, each possibly behind a reference.
fn page_content_streams<'a>(doc: &'a PdfDoc, page: &'a HashMap<String, Object>) -> Vec<&'a [u8]> {
    let mut out = Vec::new();
    let Some(contents) = page.get("Contents") else {
        return out;
    };
    match doc.resolve(contents) {
        Object::Stream { data, .. } => out.push(data.as_slice()),
        Object::Array(items) => {
            for item in items {
                if let Object::Stream { data, .. } = doc.resolve(item) {
                    out.push(data.as_slice());
                }
            }
        }
        _ => {}
    }
    out
}

/// When no page produced text, try every stream that plausibly holds content
/// operators and decode it against the global registry.
fn fallback_extract(doc: &PdfDoc, registry: &FontRegistry, options: &ExtractOptions) -> String {
    let empty_scope = HashMap::new();
    let mut pieces = Vec::new();
    for id in doc.sorted_ids() {
        let Some((dict, data)) = doc.get(id).and_then(Object::as_stream) else {
            continue;
        };
        let type_name = dict.get("Type").and_then(Object::as_name);
        if matches!(type_name, Some("XRef" | "ObjStm" | "XObject")) {
            continue;
        }
        let subtype = dict.get("Subtype").and_then(Object::as_name);
        if matches!(
            subtype,
            Some("Image" | "Type1" | "TrueType" | "CIDFontType2" | "OpenType")
        ) {
            continue;
        }
        if !has_text_operators(data) {
            continue;
        }
        let mut run = TextRun::new(&empty_scope, registry, options);
        run.process(data);
        let text = run.finish();
        if !text.is_empty() {
            pieces.push(text);
        }
    }
    pieces.join(&options.divider)
}

/// A content stream announces itself with a `BT`…`ET` pair or a show
/// operator anywhere in the buffer.
fn has_text_operators(data: &[u8]) -> bool {
    let finds = |needle: &[u8]| memchr::memmem::find(data, needle).is_some();
    (finds(b"BT") && finds(b"ET")) || finds(b"Tj") || finds(b"TJ")
}

/// Operator-level state while reading one page's content.
struct TextRun<'a> {
    scope: &'a HashMap<String, Arc<FontInfo>>,
    registry: &'a FontRegistry,
    options: &'a ExtractOptions,
    current_font: Option<Arc<FontInfo>>,
    pending_line_break: bool,
    out: String,
}

impl<'a> TextRun<'a> {
    fn new(
        scope: &'a HashMap<String, Arc<FontInfo>>,
        registry: &'a FontRegistry,
        options: &'a ExtractOptions,
    ) -> Self {
        Self {
            scope,
            registry,
            options,
            current_font: None,
            pending_line_break: false,
            out: String::new(),
        }
    }

    fn process(&mut self, data: &[u8]) {
        let mut reader = ContentReader::new(data);
        let mut operands: Vec<Object> = Vec::with_capacity(8);
        while let Some(op) = reader.next_op_into(&mut operands) {
            match op.as_str() {
                "Tf" => self.select_font(&operands),
                "Td" | "TD" | "Tm" | "T*" | "ET" => self.pending_line_break = true,
                "Tj" => {
                    if let Some(Object::String(bytes)) = operands.last() {
                        let text = self.decode(bytes);
                        self.append(&text);
                    }
                }
                "'" | "\"" => {
                    // Move-to-next-line-and-show; `"` also sets spacing,
                    // which does not affect decoded text.
                    self.pending_line_break = true;
                    if let Some(Object::String(bytes)) = operands.last() {
                        let text = self.decode(bytes);
                        self.append(&text);
                    }
                }
                "TJ" => self.show_adjusted(&operands),
                _ => {}
            }
        }
    }

    fn finish(self) -> String {
        self.out
    }

    fn select_font(&mut self, operands: &[Object]) {
        let Some(name) = operands.first().and_then(Object::as_name) else {
            return;
        };
        if operands.get(1).and_then(Object::as_f64).is_some_and(f64::is_nan) {
            return;
        }
        self.current_font = self
            .scope
            .get(name)
            .cloned()
            .or_else(|| self.registry.get(name));
        if self.current_font.is_none() {
            log::debug!("font {name} not in scope or registry");
        }
    }

    fn show_adjusted(&mut self, operands: &[Object]) {
        let Some(Object::Array(items)) = operands.last() else {
            return;
        };
        let mut segment = String::new();
        for item in items {
            match item {
                Object::String(bytes) => segment.push_str(&self.decode(bytes)),
                // Negative adjustments move the cursor forward; a large one
                // is an inter-word gap.
                Object::Number(v) if *v < self.options.tj_space_threshold => segment.push(' '),
                _ => {}
            }
        }
        self.append(&segment);
    }

    fn decode(&self, bytes: &[u8]) -> String {
        match &self.current_font {
            Some(font) => font.decode_bytes(bytes),
            // No font selected yet: printable ASCII passthrough only.
            None => bytes
                .iter()
                .filter(|&&b| matches!(b, 0x20..0x7F | b'\t' | b'\n' | b'\r'))
                .map(|&b| b as char)
                .collect(),
        }
    }

    fn append(&mut self, text: &str) {
        if text.is_empty() || !is_mostly_text(text) {
            return;
        }
        if self.pending_line_break {
            if !self.out.is_empty() {
                self.out.push_str(&self.options.divider);
            }
            self.pending_line_break = false;
        }
        self.out.push_str(text);
    }
}

/// Binary-noise guard: a decoded segment dominated by control characters is
/// not text. Anything at or above U+0080 counts as textual, so non-Latin
/// output survives the filter.
fn is_mostly_text(text: &str) -> bool {
    let mut total = 0usize;
    let mut textual = 0usize;
    for ch in text.chars() {
        total += 1;
        if matches!(ch, ' '..='~' | '\t' | '\n' | '\r') || ch as u32 >= 0x80 {
            textual += 1;
        }
    }
    textual * 2 >= total
}

/// Reads a content stream as (operand list, operator) pairs. Inline images
/// are skipped wholesale; malformed tokens are dropped one at a time.
struct ContentReader<'a> {
    lexer: Lexer<'a>,
}

impl<'a> ContentReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            lexer: Lexer::new(data),
        }
    }

    fn next_op_into(&mut self, operands: &mut Vec<Object>) -> Option<String> {
        operands.clear();
        while let Some(token) = self.lexer.next_token() {
            match token {
                Token::Keyword(op) => {
                    if op == "BI" {
                        self.skip_inline_image();
                        operands.clear();
                        continue;
                    }
                    return Some(op);
                }
                other => {
                    if let Some(obj) = self.object_from_token(other) {
                        operands.push(obj);
                    }
                }
            }
        }
        None
    }

    fn object_from_token(&mut self, token: Token) -> Option<Object> {
        match token {
            Token::Null => Some(Object::Null),
            Token::Boolean(v) => Some(Object::Boolean(v)),
            Token::Integer(v) => Some(Object::Number(v as f64)),
            Token::Real(v) => Some(Object::Number(v)),
            Token::String(v) | Token::HexString(v) => Some(Object::String(v)),
            Token::Name(v) => Some(Object::Name(v)),
            Token::ArrayStart => Some(Object::Array(self.collect_array())),
            _ => None,
        }
    }

    fn collect_array(&mut self) -> Vec<Object> {
        let mut items = Vec::new();
        while let Some(token) = self.lexer.next_token() {
            if token == Token::ArrayEnd {
                break;
            }
            if let Some(obj) = self.object_from_token(token) {
                items.push(obj);
            }
        }
        items
    }

    fn skip_inline_image(&mut self) {
        while let Some(token) = self.lexer.next_token() {
            if let Token::Keyword(op) = token
                && op == "ID"
            {
                self.lexer.skip_inline_image_data();
                return;
            }
        }
    }
}
