//! Document-level object parsing and the indirect-object table.
//!
//! [`Parser`] turns raw PDF bytes into the flat sequence of top-level
//! objects (each typically an [`Object::Indirect`] envelope). [`PdfDoc`]
//! indexes that sequence by object id, resolves references, and expands
//! PDF 1.5 object streams so pages and fonts stored inside them stay
//! reachable.

use std::collections::{HashMap, VecDeque};
use std::sync::OnceLock;

use regex::bytes::Regex;

use crate::model::Object;
use crate::tokenizer::{Lexer, Token};

/// Window scanned past a length-delimited stream for a recovery marker.
const MARKER_SCAN_WINDOW: usize = 256;

/// Depth cap for the nested-indirect registration walk.
const REGISTER_MAX_DEPTH: usize = 64;

#[derive(Debug, Default)]
pub struct PdfDoc {
    pub objects: HashMap<u32, Object>,
}

impl PdfDoc {
    /// Build the id-indexed table from a top-level object sequence.
    ///
    /// Top-level `Indirect` envelopes are flattened; `Indirect` values nested
    /// inside arrays, dictionaries and stream dicts are registered too and
    /// replaced by references in their parent. `Ref` edges are never
    /// followed, so the walk terminates without cycle detection.
    pub fn from_objects(docs: Vec<Object>) -> PdfDoc {
        let mut doc = PdfDoc::default();
        for top in docs {
            match top {
                Object::Indirect { obj_num, body, .. } => {
                    let body = doc.register_nested(*body, 0);
                    doc.objects.entry(obj_num).or_insert(body);
                }
                other => {
                    log::debug!("ignoring top-level object without id: {:?}", kind_of(&other));
                }
            }
        }
        doc
    }

    fn register_nested(&mut self, obj: Object, depth: usize) -> Object {
        if depth >= REGISTER_MAX_DEPTH {
            return obj;
        }
        match obj {
            Object::Indirect {
                obj_num,
                gen_num,
                body,
            } => {
                let body = self.register_nested(*body, depth + 1);
                self.objects.entry(obj_num).or_insert(body);
                Object::Reference { obj_num, gen_num }
            }
            Object::Array(items) => Object::Array(
                items
                    .into_iter()
                    .map(|item| self.register_nested(item, depth + 1))
                    .collect(),
            ),
            Object::Dictionary(dict) => Object::Dictionary(
                dict.into_iter()
                    .map(|(k, v)| (k, self.register_nested(v, depth + 1)))
                    .collect(),
            ),
            Object::Stream { dict, data } => Object::Stream {
                dict: dict
                    .into_iter()
                    .map(|(k, v)| (k, self.register_nested(v, depth + 1)))
                    .collect(),
                data,
            },
            other => other,
        }
    }

    pub fn get(&self, obj_num: u32) -> Option<&Object> {
        self.objects.get(&obj_num)
    }

    /// Collapse at most one reference level. Unresolvable references come
    /// back unchanged so callers degrade to their defaults.
    pub fn resolve<'a>(&'a self, obj: &'a Object) -> &'a Object {
        match obj {
            Object::Reference { obj_num, .. } => self.objects.get(obj_num).unwrap_or(obj),
            _ => obj,
        }
    }

    /// Object ids in ascending order, for deterministic iteration.
    pub fn sorted_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.objects.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Materialize objects embedded in `ObjStm` streams.
    ///
    /// Each embedded body is re-lexed as a complete object. Bodies that fail
    /// to parse fall back to a marker scan that recovers minimal page/font
    /// dictionaries, so content streams and ToUnicode maps referenced from
    /// inside object streams stay reachable. Objects parsed from the outer
    /// document are never overwritten.
    pub fn expand_object_streams(&mut self) {
        let mut stream_ids: Vec<u32> = self
            .objects
            .iter()
            .filter(|(_, obj)| obj.type_name() == Some("ObjStm"))
            .map(|(id, _)| *id)
            .collect();
        stream_ids.sort_unstable();

        let mut updates: HashMap<u32, Object> = HashMap::new();
        for id in stream_ids {
            let Some((dict, data)) = self.objects.get(&id).and_then(Object::as_stream) else {
                continue;
            };
            let count = dict.get("N").and_then(Object::as_i64).unwrap_or(0).max(0) as usize;
            let first = dict.get("First").and_then(Object::as_i64).unwrap_or(0).max(0) as usize;
            if count == 0 || first == 0 || first > data.len() {
                continue;
            }

            let mut header = Lexer::new(data);
            let mut entries = Vec::with_capacity(count);
            for _ in 0..count {
                let (Some(Token::Integer(obj_num)), Some(Token::Integer(offset))) =
                    (header.next_token(), header.next_token())
                else {
                    break;
                };
                if obj_num < 0 || offset < 0 {
                    break;
                }
                entries.push((obj_num as u32, offset as usize));
            }

            for (index, &(obj_num, offset)) in entries.iter().enumerate() {
                let start = first.saturating_add(offset);
                if start >= data.len()
                    || self.objects.contains_key(&obj_num)
                    || updates.contains_key(&obj_num)
                {
                    continue;
                }
                let end = entries
                    .get(index + 1)
                    .map(|&(_, next)| (first + next).min(data.len()))
                    .unwrap_or(data.len());
                let body = &data[start..end.max(start)];
                match parse_object_at(data, start) {
                    // A garbled body can still lex into a stray scalar; only
                    // containers are trusted over the marker scan.
                    Some(obj @ (Object::Dictionary(_) | Object::Stream { .. })) => {
                        updates.insert(obj_num, obj);
                    }
                    parsed => {
                        if let Some(obj) = recover_embedded_object(body) {
                            log::debug!("recovered object {obj_num} from ObjStm {id} by marker scan");
                            updates.insert(obj_num, obj);
                        } else if let Some(obj) = parsed {
                            updates.insert(obj_num, obj);
                        }
                    }
                }
            }
        }

        for (obj_num, obj) in updates {
            self.objects.entry(obj_num).or_insert(obj);
        }
    }
}

fn kind_of(obj: &Object) -> &'static str {
    match obj {
        Object::Null => "null",
        Object::Boolean(_) => "boolean",
        Object::Number(_) => "number",
        Object::String(_) => "string",
        Object::Name(_) => "name",
        Object::Array(_) => "array",
        Object::Dictionary(_) => "dictionary",
        Object::Stream { .. } => "stream",
        Object::Reference { .. } => "reference",
        Object::Indirect { .. } => "indirect",
    }
}

/// Minimal recovery for ObjStm bodies the lexer cannot reassemble: find the
/// page/font type marker and the one reference each needs to stay useful.
fn recover_embedded_object(body: &[u8]) -> Option<Object> {
    fn contents_re() -> &'static Regex {
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| Regex::new(r"/Contents\s+(\d+)\s+\d+\s+R").unwrap())
    }
    fn to_unicode_re() -> &'static Regex {
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| Regex::new(r"/ToUnicode\s+(\d+)\s+\d+\s+R").unwrap())
    }

    let has_marker = |name: &str| {
        let spaced = format!("/Type /{name}");
        let tight = format!("/Type/{name}");
        memchr::memmem::find(body, spaced.as_bytes()).is_some()
            || memchr::memmem::find(body, tight.as_bytes()).is_some()
    };
    let captured_id = |re: &Regex| {
        re.captures(body)
            .and_then(|caps| std::str::from_utf8(caps.get(1)?.as_bytes()).ok()?.parse().ok())
    };

    if has_marker("Page") {
        let obj_num: u32 = captured_id(contents_re())?;
        let mut dict = HashMap::new();
        dict.insert("Type".to_string(), Object::Name("Page".to_string()));
        dict.insert("Contents".to_string(), Object::Reference { obj_num, gen_num: 0 });
        return Some(Object::Dictionary(dict));
    }
    if has_marker("Font") {
        let obj_num: u32 = captured_id(to_unicode_re())?;
        let mut dict = HashMap::new();
        dict.insert("Type".to_string(), Object::Name("Font".to_string()));
        dict.insert("ToUnicode".to_string(), Object::Reference { obj_num, gen_num: 0 });
        return Some(Object::Dictionary(dict));
    }
    None
}

fn parse_object_at(data: &[u8], offset: usize) -> Option<Object> {
    let mut lexer = Lexer::new(data);
    lexer.set_position(offset);
    Parser::new(lexer).parse_object()
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    buffer: VecDeque<Token>,
    integer_bodies: HashMap<u32, i64>,
}

impl<'a> Parser<'a> {
    pub fn new(lexer: Lexer<'a>) -> Self {
        Self {
            lexer,
            buffer: VecDeque::new(),
            integer_bodies: HashMap::new(),
        }
    }

    /// Parse the whole input into its top-level object sequence.
    ///
    /// Every recognized `N G obj … endobj` region becomes an
    /// [`Object::Indirect`]; unrecognized bytes between objects are skipped.
    /// Parsing is best-effort and never fails.
    pub fn parse(mut self) -> Vec<Object> {
        let mut out = Vec::new();
        while let Some(token) = self.next_token() {
            match token {
                Token::Integer(obj_num) if obj_num >= 0 => {
                    let gen_num = match self.peek(1) {
                        Some(Token::Integer(v)) if *v >= 0 => *v as u16,
                        _ => continue,
                    };
                    if !matches!(self.peek(2), Some(Token::Keyword(kw)) if kw == "obj") {
                        continue;
                    }
                    self.next_token();
                    self.next_token();
                    if let Some(body) = self.parse_indirect_body() {
                        if let Some(v) = body.as_i64() {
                            self.integer_bodies.insert(obj_num as u32, v);
                        }
                        out.push(Object::Indirect {
                            obj_num: obj_num as u32,
                            gen_num,
                            body: Box::new(body),
                        });
                    }
                }
                Token::Keyword(kw) if kw == "trailer" => {
                    // Consume the trailer dictionary so its entries are not
                    // misread as object headers.
                    self.parse_object();
                }
                _ => {}
            }
        }
        out
    }

    fn parse_indirect_body(&mut self) -> Option<Object> {
        let body = self.parse_object()?;
        while let Some(token) = self.peek(1) {
            let done = matches!(token, Token::Keyword(kw) if kw == "endobj");
            self.next_token();
            if done {
                break;
            }
        }
        Some(body)
    }

    pub(crate) fn parse_object(&mut self) -> Option<Object> {
        match self.next_token()? {
            Token::Null => Some(Object::Null),
            Token::Boolean(v) => Some(Object::Boolean(v)),
            Token::Integer(v) => Some(self.number_or_reference(v)),
            Token::Real(v) => Some(Object::Number(v)),
            Token::String(v) | Token::HexString(v) => Some(Object::String(v)),
            Token::Name(v) => Some(Object::Name(v)),
            Token::ArrayStart => Some(Object::Array(self.parse_array())),
            Token::DictStart => self.parse_dict_or_stream(),
            _ => None,
        }
    }

    fn number_or_reference(&mut self, first: i64) -> Object {
        let second = match self.peek(1) {
            Some(Token::Integer(v)) if (0..=u16::MAX as i64).contains(v) => Some(*v as u16),
            _ => None,
        };
        if first >= 0
            && let Some(gen_num) = second
            && matches!(self.peek(2), Some(Token::Keyword(kw)) if kw == "R")
        {
            self.next_token();
            self.next_token();
            return Object::Reference {
                obj_num: first as u32,
                gen_num,
            };
        }
        Object::Number(first as f64)
    }

    fn parse_array(&mut self) -> Vec<Object> {
        let mut items = Vec::new();
        loop {
            match self.peek(1) {
                None => break,
                Some(Token::ArrayEnd) => {
                    self.next_token();
                    break;
                }
                Some(_) => match self.parse_object() {
                    Some(obj) => items.push(obj),
                    // Stray keyword inside an array: already consumed, move on.
                    None => {}
                },
            }
        }
        items
    }

    fn parse_dict_or_stream(&mut self) -> Option<Object> {
        let mut dict = HashMap::new();
        loop {
            match self.peek(1) {
                None => break,
                Some(Token::DictEnd) => {
                    self.next_token();
                    break;
                }
                Some(_) => {
                    let Some(Token::Name(key)) = self.next_token() else {
                        break;
                    };
                    match self.parse_object() {
                        Some(value) => {
                            dict.insert(key, value);
                        }
                        None => break,
                    }
                }
            }
        }

        if !matches!(self.peek(1), Some(Token::Keyword(kw)) if kw == "stream") {
            return Some(Object::Dictionary(dict));
        }
        self.next_token();

        let length = self.stream_length(&dict);
        let payload_start = self.lexer.position();
        let mut data = match length {
            Some(length) => self.lexer.consume_stream(length),
            None => self.lexer.consume_stream_to_endstream(),
        };

        if length.is_some() && !matches!(self.peek(1), Some(Token::Keyword(kw)) if kw == "endstream")
        {
            // A wrong /Length leaves the cursor mid-payload. Prefer rescanning
            // to the endstream marker unless an endobj comes first, which
            // means the marker itself is what is missing.
            let at_endobj = matches!(self.peek(1), Some(Token::Keyword(kw)) if kw == "endobj");
            if !at_endobj && self.should_rescan_for_endstream() {
                self.buffer.clear();
                self.lexer.set_position(payload_start);
                data = self.lexer.consume_stream_to_endstream();
            }
        }

        if matches!(self.peek(1), Some(Token::Keyword(kw)) if kw == "endstream") {
            self.next_token();
        }
        Some(Object::Stream { dict, data })
    }

    fn should_rescan_for_endstream(&self) -> bool {
        let input = self.lexer.input();
        let start = self.lexer.position().min(input.len());
        let window = &input[start..(start + MARKER_SCAN_WINDOW).min(input.len())];
        let endstream = memchr::memmem::find(window, b"endstream");
        let endobj = memchr::memmem::find(window, b"endobj");
        match (endstream, endobj) {
            (Some(a), Some(b)) => a <= b,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => true,
        }
    }

    fn stream_length(&mut self, dict: &HashMap<String, Object>) -> Option<usize> {
        let length = match dict.get("Length")? {
            Object::Number(v) => *v as i64,
            Object::Reference { obj_num, .. } => *self.integer_bodies.get(obj_num)?,
            _ => return None,
        };
        (length > 0).then(|| length as usize)
    }

    fn next_token(&mut self) -> Option<Token> {
        match self.buffer.pop_front() {
            Some(token) => Some(token),
            None => self.lexer.next_token(),
        }
    }

    fn peek(&mut self, n: usize) -> Option<&Token> {
        while self.buffer.len() < n {
            let token = self.lexer.next_token()?;
            self.buffer.push_back(token);
        }
        self.buffer.get(n - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_bytes(input: &[u8]) -> Vec<Object> {
        Parser::new(Lexer::new(input)).parse()
    }

    fn doc_from(input: &[u8]) -> PdfDoc {
        PdfDoc::from_objects(parse_bytes(input))
    }

    #[test]
    fn parses_indirect_objects_into_sequence() {
        let objs = parse_bytes(
            br#"%PDF-1.7
1 0 obj
<< /Type /Catalog >>
endobj
2 0 obj
(hello)
endobj
%%EOF
"#,
        );
        assert_eq!(objs.len(), 2);
        assert!(matches!(&objs[0], Object::Indirect { obj_num: 1, .. }));
        assert!(matches!(&objs[1], Object::Indirect { obj_num: 2, .. }));
    }

    #[test]
    fn startxref_offset_is_not_mistaken_for_object_header() {
        let doc = doc_from(
            br#"1 0 obj
<< /Type /Catalog >>
endobj
startxref
123
2 0 obj
(ok)
endobj
"#,
        );
        assert!(doc.get(1).is_some());
        assert!(doc.get(2).is_some());
    }

    #[test]
    fn stream_uses_backward_indirect_length() {
        let doc = doc_from(
            br#"1 0 obj
5
endobj
2 0 obj
<< /Length 1 0 R >>
stream
ABCDE
endstream
endobj
"#,
        );
        let Some(Object::Stream { data, .. }) = doc.get(2) else {
            panic!("object 2 should be a stream");
        };
        assert_eq!(data, b"ABCDE");
    }

    #[test]
    fn stream_with_unresolved_length_scans_to_endstream() {
        let doc = doc_from(
            br#"2 0 obj
<< /Length 9 0 R >>
stream
ABCDE
endstream
endobj
"#,
        );
        let Some(Object::Stream { data, .. }) = doc.get(2) else {
            panic!("object 2 should be a stream");
        };
        assert_eq!(data, b"ABCDE\n");
    }

    #[test]
    fn stream_recovers_when_declared_length_is_short() {
        let doc = doc_from(
            br#"1 0 obj
3
endobj
2 0 obj
<< /Length 1 0 R >>
stream
ABCDE
endstream
endobj
3 0 obj
(ok)
endobj
"#,
        );
        let Some(Object::Stream { data, .. }) = doc.get(2) else {
            panic!("object 2 should be a stream");
        };
        assert_eq!(data, b"ABCDE\n");
        assert!(doc.get(3).is_some());
    }

    #[test]
    fn nested_indirect_objects_register_and_become_references() {
        let objs = vec![Object::Indirect {
            obj_num: 1,
            gen_num: 0,
            body: Box::new(Object::Array(vec![Object::Indirect {
                obj_num: 7,
                gen_num: 0,
                body: Box::new(Object::Number(42.0)),
            }])),
        }];
        let doc = PdfDoc::from_objects(objs);
        assert_eq!(doc.get(7), Some(&Object::Number(42.0)));
        let Some(Object::Array(items)) = doc.get(1) else {
            panic!("object 1 should be an array");
        };
        assert_eq!(
            items[0],
            Object::Reference {
                obj_num: 7,
                gen_num: 0
            }
        );
    }

    #[test]
    fn resolve_collapses_one_reference_level() {
        let doc = doc_from(b"1 0 obj 42 endobj");
        let reference = Object::Reference {
            obj_num: 1,
            gen_num: 0,
        };
        assert_eq!(doc.resolve(&reference), &Object::Number(42.0));
        let dangling = Object::Reference {
            obj_num: 99,
            gen_num: 0,
        };
        assert_eq!(doc.resolve(&dangling), &dangling);
    }

    #[test]
    fn object_stream_bodies_are_relexed() {
        let payload = b"4 0 5 34 << /Type /Page /Contents 9 0 R >> << /K (v) >>";
        let mut dict = HashMap::new();
        dict.insert("Type".to_string(), Object::Name("ObjStm".to_string()));
        dict.insert("N".to_string(), Object::Number(2.0));
        dict.insert("First".to_string(), Object::Number(9.0));
        let mut doc = PdfDoc::default();
        doc.objects.insert(
            3,
            Object::Stream {
                dict,
                data: payload.to_vec(),
            },
        );

        doc.expand_object_streams();

        let page = doc.get(4).and_then(Object::as_dict).expect("page dict");
        assert_eq!(page.get("Type"), Some(&Object::Name("Page".to_string())));
        assert_eq!(
            page.get("Contents"),
            Some(&Object::Reference {
                obj_num: 9,
                gen_num: 0
            })
        );
        let other = doc.get(5).and_then(Object::as_dict).expect("second dict");
        assert_eq!(other.get("K"), Some(&Object::String(b"v".to_vec())));
    }

    #[test]
    fn marker_scan_recovers_page_from_garbled_body() {
        // A body the object parser cannot reassemble (stray delimiter first)
        // still yields a synthetic page when the markers are present.
        let body = b"} /Type /Page /Contents 12 0 R junk";
        let recovered = recover_embedded_object(body).expect("synthetic page");
        let dict = recovered.as_dict().unwrap();
        assert_eq!(dict.get("Type"), Some(&Object::Name("Page".to_string())));
        assert_eq!(
            dict.get("Contents"),
            Some(&Object::Reference {
                obj_num: 12,
                gen_num: 0
            })
        );
    }

    #[test]
    fn marker_scan_recovers_font_to_unicode() {
        let body = b"} /Type/Font /Subtype /Type0 /ToUnicode 31 0 R";
        let recovered = recover_embedded_object(body).expect("synthetic font");
        let dict = recovered.as_dict().unwrap();
        assert_eq!(dict.get("Type"), Some(&Object::Name("Font".to_string())));
        assert_eq!(
            dict.get("ToUnicode"),
            Some(&Object::Reference {
                obj_num: 31,
                gen_num: 0
            })
        );
    }
}
