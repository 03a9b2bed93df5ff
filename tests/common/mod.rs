#![allow(dead_code)]

use pluck::model::Object;
use pluck::parser::Parser;
use pluck::text::{ExtractOptions, extract_text, extract_text_with_options};
use pluck::tokenizer::Lexer;

/// Assembles a synthetic PDF body object by object. Stream lengths are
/// computed from the payload, so fixtures stay byte-accurate as they evolve.
pub struct PdfBuilder {
    out: Vec<u8>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self {
            out: b"%PDF-1.7\n".to_vec(),
        }
    }

    pub fn object(mut self, id: u32, body: &str) -> Self {
        self.out
            .extend_from_slice(format!("{id} 0 obj\n{body}\nendobj\n").as_bytes());
        self
    }

    pub fn stream(mut self, id: u32, dict_extra: &str, data: &[u8]) -> Self {
        let dict = if dict_extra.is_empty() {
            format!("<< /Length {} >>", data.len())
        } else {
            format!("<< /Length {} {dict_extra} >>", data.len())
        };
        self.out
            .extend_from_slice(format!("{id} 0 obj\n{dict}\nstream\n").as_bytes());
        self.out.extend_from_slice(data);
        self.out.extend_from_slice(b"\nendstream\nendobj\n");
        self
    }

    pub fn build(mut self) -> Vec<u8> {
        self.out.extend_from_slice(b"%%EOF\n");
        self.out
    }
}

pub fn objects(bytes: &[u8]) -> Vec<Object> {
    Parser::new(Lexer::new(bytes)).parse()
}

pub fn extract(bytes: &[u8]) -> String {
    extract_text(objects(bytes))
}

pub fn extract_with(bytes: &[u8], options: &ExtractOptions) -> String {
    extract_text_with_options(objects(bytes), options)
}

/// One page, one content stream, one font at /F1.
pub fn one_page_pdf(font_body: &str, content: &str) -> Vec<u8> {
    one_page_pdf_bytes(font_body, content.as_bytes())
}

/// Same, for content streams carrying raw (non-UTF-8) string bytes.
pub fn one_page_pdf_bytes(font_body: &str, content: &[u8]) -> Vec<u8> {
    PdfBuilder::new()
        .object(
            1,
            "<< /Type /Page /Resources << /Font << /F1 3 0 R >> >> /Contents 2 0 R >>",
        )
        .stream(2, "", content)
        .object(3, font_body)
        .build()
}

pub fn flate_compress(data: &[u8]) -> Vec<u8> {
    use std::io::Write;
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn push_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn push_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes());
}

/// A minimal TrueType font whose `cmap` (format 4, Windows BMP) maps the
/// glyph ids `start..=end` to the same code points.
pub fn identity_truetype(start: u16, end: u16) -> Vec<u8> {
    let mut sub = Vec::new();
    push_u16(&mut sub, 4); // format
    push_u16(&mut sub, 0); // length, unused by the reader
    push_u16(&mut sub, 0); // language
    push_u16(&mut sub, 4); // segCountX2: data segment + terminator
    push_u16(&mut sub, 0);
    push_u16(&mut sub, 0);
    push_u16(&mut sub, 0);
    push_u16(&mut sub, end);
    push_u16(&mut sub, 0xFFFF);
    push_u16(&mut sub, 0); // reservedPad
    push_u16(&mut sub, start);
    push_u16(&mut sub, 0xFFFF);
    push_u16(&mut sub, 0); // idDelta: identity
    push_u16(&mut sub, 1);
    push_u16(&mut sub, 0); // idRangeOffset
    push_u16(&mut sub, 0);

    let mut cmap = Vec::new();
    push_u16(&mut cmap, 0);
    push_u16(&mut cmap, 1);
    push_u16(&mut cmap, 3); // Windows
    push_u16(&mut cmap, 1); // Unicode BMP
    push_u32(&mut cmap, 12);
    cmap.extend_from_slice(&sub);

    let mut font = Vec::new();
    push_u32(&mut font, 0x0001_0000);
    push_u16(&mut font, 1); // one table
    push_u16(&mut font, 0);
    push_u16(&mut font, 0);
    push_u16(&mut font, 0);
    font.extend_from_slice(b"cmap");
    push_u32(&mut font, 0); // checksum
    push_u32(&mut font, 28); // 12-byte header + one 16-byte entry
    push_u32(&mut font, cmap.len() as u32);
    font.extend_from_slice(&cmap);
    font
}
