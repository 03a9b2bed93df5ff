//! Per-font decoders and the document-wide font registry.
//!
//! Every font dictionary in the document becomes a [`FontInfo`]: a bundle of
//! code → Unicode maps assembled from whichever signals the font carries
//! (ToUnicode CMap, standard or Differences-patched simple encoding, an
//! embedded TrueType/OpenType `cmap`, a `CIDToGIDMap`). Decoding always
//! walks the same chain, so a font with several partial signals still
//! produces the best text each one can offer.

use std::collections::HashMap;
use std::sync::Arc;

use crate::cmap;
use crate::model::Object;
use crate::parser::PdfDoc;
use crate::sfnt;

/// Fonts whose ToUnicode has fewer entries than this also get their embedded
/// font program parsed; subset fonts often ship both an incomplete ToUnicode
/// and a complete `cmap`.
pub const DEFAULT_TO_UNICODE_COMPLETENESS: usize = 100;

#[derive(Debug, Default)]
pub struct FontInfo {
    /// BaseFont (or embedded `name` table) value, informational only.
    pub name: Option<String>,
    pub encoding_name: Option<String>,
    /// Single-byte code → Unicode code point.
    pub simple_encoding: HashMap<u16, u32>,
    /// Char code (1–2 bytes) → decoded string. Highest-priority decoder.
    pub to_unicode: HashMap<u32, String>,
    /// Glyph id → Unicode, from the embedded font's `cmap`.
    pub embedded_glyph_to_unicode: HashMap<u16, u32>,
}

impl FontInfo {
    /// Decode one character code. The chain is fixed: ToUnicode, embedded
    /// glyph map, simple encoding, printable ASCII, empty.
    pub fn decode(&self, code: u32) -> String {
        if let Some(mapped) = self.to_unicode.get(&code) {
            return mapped.clone();
        }
        if code <= u16::MAX as u32 {
            let narrow = code as u16;
            if let Some(&point) = self.embedded_glyph_to_unicode.get(&narrow)
                && let Some(ch) = char::from_u32(point)
            {
                return ch.to_string();
            }
            if let Some(&point) = self.simple_encoding.get(&narrow)
                && let Some(ch) = char::from_u32(point)
            {
                return ch.to_string();
            }
        }
        if (32..127).contains(&code) {
            return (code as u8 as char).to_string();
        }
        String::new()
    }

    /// Decode a whole show-string. At each position the two-byte big-endian
    /// code is probed against ToUnicode first, so CID strings and one-byte
    /// simple strings both come out right without an explicit width flag.
    pub fn decode_bytes(&self, bytes: &[u8]) -> String {
        let mut out = String::new();
        let mut i = 0;
        while i < bytes.len() {
            if i + 1 < bytes.len() {
                let wide = u16::from_be_bytes([bytes[i], bytes[i + 1]]) as u32;
                if let Some(mapped) = self.to_unicode.get(&wide) {
                    out.push_str(mapped);
                    i += 2;
                    continue;
                }
            }
            out.push_str(&self.decode(bytes[i] as u32));
            i += 1;
        }
        out
    }

    fn has_any_mapping(&self) -> bool {
        !self.to_unicode.is_empty()
            || !self.simple_encoding.is_empty()
            || !self.embedded_glyph_to_unicode.is_empty()
    }
}

pub struct FontRegistry {
    fonts: HashMap<String, Arc<FontInfo>>,
    completeness_threshold: usize,
}

impl FontRegistry {
    /// Walk the object table and build a decoder for every font dictionary,
    /// registering each under `F{id}` and under every resource-dict name
    /// that references it.
    pub fn build(doc: &PdfDoc, completeness_threshold: usize) -> FontRegistry {
        let mut registry = FontRegistry {
            fonts: HashMap::new(),
            completeness_threshold,
        };
        for id in doc.sorted_ids() {
            let Some(obj) = doc.get(id) else { continue };
            if obj.type_name() == Some("Font") {
                registry.register(doc, id);
            }
        }
        registry.alias_resource_names(doc);
        registry
    }

    /// Build and register the font stored at `obj_num` (no-op when already
    /// registered). The object only needs to be a dictionary; resource dicts
    /// reference fonts that occasionally omit `/Type`.
    pub fn register(&mut self, doc: &PdfDoc, obj_num: u32) -> Option<Arc<FontInfo>> {
        let key = format!("F{obj_num}");
        if let Some(existing) = self.fonts.get(&key) {
            return Some(existing.clone());
        }
        let dict = doc.get(obj_num)?.as_dict()?;
        let info = Arc::new(build_font_info(doc, dict, self.completeness_threshold));
        log::debug!(
            "registered font {key} ({}): {} ToUnicode, {} embedded, {} simple",
            info.name.as_deref().unwrap_or("unnamed"),
            info.to_unicode.len(),
            info.embedded_glyph_to_unicode.len(),
            info.simple_encoding.len(),
        );
        self.fonts.insert(key, info.clone());
        Some(info)
    }

    pub fn get(&self, name: &str) -> Option<Arc<FontInfo>> {
        self.fonts.get(name).cloned()
    }

    pub fn fonts(&self) -> impl Iterator<Item = (&String, &Arc<FontInfo>)> {
        self.fonts.iter()
    }

    /// Cross-reference resource dictionaries: every `/Font << /Fx N 0 R >>`
    /// entry aliases the per-name key to the font registered for object N.
    fn alias_resource_names(&mut self, doc: &PdfDoc) {
        let mut aliases: Vec<(String, String)> = Vec::new();
        for id in doc.sorted_ids() {
            let Some(dict) = doc.get(id).and_then(Object::as_dict) else {
                continue;
            };
            for candidate in [Some(dict), resolved_sub_dict(doc, dict, "Resources")] {
                let Some(font_dict) =
                    candidate.and_then(|d| d.get("Font")).map(|f| doc.resolve(f))
                else {
                    continue;
                };
                let Some(font_dict) = font_dict.as_dict() else {
                    continue;
                };
                for (name, value) in font_dict {
                    if let Object::Reference { obj_num, .. } = value {
                        aliases.push((name.clone(), format!("F{obj_num}")));
                    }
                }
            }
        }
        // Names can collide across resource dicts; sort so the winner does
        // not depend on hash order.
        aliases.sort();
        for (name, key) in aliases {
            if let Some(info) = self.fonts.get(&key).cloned() {
                self.fonts.entry(name).or_insert(info);
            }
        }
    }
}

fn resolved_sub_dict<'a>(
    doc: &'a PdfDoc,
    dict: &'a HashMap<String, Object>,
    key: &str,
) -> Option<&'a HashMap<String, Object>> {
    dict.get(key).map(|v| doc.resolve(v))?.as_dict()
}

/// Assemble one [`FontInfo`] from a font dictionary, pulling in every signal
/// it carries.
pub fn build_font_info(
    doc: &PdfDoc,
    dict: &HashMap<String, Object>,
    completeness_threshold: usize,
) -> FontInfo {
    let mut info = FontInfo {
        name: dict
            .get("BaseFont")
            .and_then(Object::as_name)
            .map(str::to_string),
        ..FontInfo::default()
    };

    if let Some(encoding) = dict.get("Encoding") {
        apply_encoding(doc, encoding, &mut info);
    }

    if let Some(data) = resolved_stream_data(doc, dict.get("ToUnicode")) {
        info.to_unicode = cmap::parse_to_unicode(data);
    }

    let descendant = dict
        .get("DescendantFonts")
        .map(|v| doc.resolve(v))
        .and_then(Object::as_array)
        .and_then(<[Object]>::first)
        .map(|v| doc.resolve(v))
        .and_then(Object::as_dict);

    if info.to_unicode.len() < completeness_threshold {
        attach_embedded_font(doc, dict, descendant, &mut info);
    }

    if !info.has_any_mapping() {
        // A font with no usable signal still decodes as WinAnsi text.
        info.simple_encoding = table_to_map(&WIN_ANSI);
    }
    info
}

fn apply_encoding(doc: &PdfDoc, encoding: &Object, info: &mut FontInfo) {
    match doc.resolve(encoding) {
        Object::Name(name) => {
            info.encoding_name = Some(name.clone());
            if let Some(map) = standard_encoding(name) {
                info.simple_encoding = map;
            }
        }
        Object::Dictionary(enc_dict) => {
            let base = enc_dict.get("BaseEncoding").and_then(Object::as_name);
            info.encoding_name = base.map(str::to_string);
            info.simple_encoding = base
                .and_then(standard_encoding)
                .unwrap_or_else(|| table_to_map(&WIN_ANSI));
            if let Some(differences) = enc_dict.get("Differences") {
                apply_differences(doc, differences, &mut info.simple_encoding);
            }
        }
        _ => {}
    }
}

/// `Differences` is a flat array: numbers reset the running code, names
/// assign a glyph to it and advance. Unrecognized names still advance.
fn apply_differences(doc: &PdfDoc, differences: &Object, map: &mut HashMap<u16, u32>) {
    let Some(entries) = doc.resolve(differences).as_array() else {
        return;
    };
    let mut code: Option<u16> = None;
    for entry in entries {
        match doc.resolve(entry) {
            Object::Number(v) if (0.0..=255.0).contains(v) => {
                code = Some(*v as u16);
            }
            Object::Name(glyph) => {
                if let Some(current) = code {
                    if let Some(point) = glyph_name_to_unicode(glyph) {
                        map.insert(current, point);
                    }
                    code = current.checked_add(1);
                }
            }
            _ => {}
        }
    }
}

fn attach_embedded_font(
    doc: &PdfDoc,
    dict: &HashMap<String, Object>,
    descendant: Option<&HashMap<String, Object>>,
    info: &mut FontInfo,
) {
    let descriptor = [Some(dict), descendant]
        .into_iter()
        .flatten()
        .find_map(|d| resolved_sub_dict(doc, d, "FontDescriptor"));
    let Some(descriptor) = descriptor else { return };

    let program = ["FontFile2", "FontFile3", "FontFile"]
        .into_iter()
        .find_map(|key| resolved_stream_data(doc, descriptor.get(key)));
    let Some(program) = program else { return };
    let Some(embedded) = sfnt::parse(program) else {
        return;
    };

    if info.name.is_none() {
        info.name = embedded.name.clone();
    }

    // CID → GID indirection: a CIDToGIDMap stream is a packed array of
    // big-endian glyph ids indexed by CID.
    let gid_map = descendant
        .and_then(|d| d.get("CIDToGIDMap"))
        .map(|v| doc.resolve(v));
    if let Some(Object::Stream { data, .. }) = gid_map {
        for (cid, pair) in data.chunks_exact(2).enumerate() {
            let gid = u16::from_be_bytes([pair[0], pair[1]]);
            if gid == 0 {
                continue;
            }
            if let Some(&point) = embedded.glyph_to_unicode.get(&gid)
                && let Some(ch) = char::from_u32(point)
            {
                info.to_unicode
                    .entry(cid as u32)
                    .or_insert_with(|| ch.to_string());
            }
        }
    }

    // Direct merge covers Identity CIDToGIDMap and simple TrueType fonts,
    // where the char code addresses the glyph table directly.
    for (&gid, &point) in &embedded.glyph_to_unicode {
        if let Some(ch) = char::from_u32(point) {
            info.to_unicode
                .entry(gid as u32)
                .or_insert_with(|| ch.to_string());
        }
    }
    info.embedded_glyph_to_unicode = embedded.glyph_to_unicode;
}

fn resolved_stream_data<'a>(doc: &'a PdfDoc, obj: Option<&'a Object>) -> Option<&'a [u8]> {
    match doc.resolve(obj?) {
        Object::Stream { data, .. } => Some(data),
        _ => None,
    }
}

/// The standard single-byte encodings a font can name.
pub fn standard_encoding(name: &str) -> Option<HashMap<u16, u32>> {
    match name {
        "WinAnsiEncoding" => Some(table_to_map(&WIN_ANSI)),
        "MacRomanEncoding" => Some(table_to_map(&MAC_ROMAN)),
        "StandardEncoding" => Some(table_to_map(&STANDARD)),
        "Identity-H" | "Identity-V" => Some((0u16..=255).map(|c| (c, c as u32)).collect()),
        _ => None,
    }
}

fn table_to_map(table: &[u16; 256]) -> HashMap<u16, u32> {
    table
        .iter()
        .enumerate()
        .filter(|&(_, &point)| point != 0)
        .map(|(code, &point)| (code as u16, point as u32))
        .collect()
}

/// Glyph names usable in `Differences` arrays: the printable-ASCII names
/// plus the `uniXXXX` convention.
pub fn glyph_name_to_unicode(name: &str) -> Option<u32> {
    if let Some(hex) = name.strip_prefix("uni")
        && hex.len() == 4
        && let Ok(point) = u32::from_str_radix(hex, 16)
    {
        return Some(point);
    }
    if name.len() == 1 {
        let ch = name.chars().next()?;
        if ch.is_ascii_alphabetic() {
            return Some(ch as u32);
        }
    }
    let ch = match name {
        "space" => ' ',
        "exclam" => '!',
        "quotedbl" => '"',
        "numbersign" => '#',
        "dollar" => '$',
        "percent" => '%',
        "ampersand" => '&',
        "quotesingle" => '\'',
        "parenleft" => '(',
        "parenright" => ')',
        "asterisk" => '*',
        "plus" => '+',
        "comma" => ',',
        "hyphen" => '-',
        "period" => '.',
        "slash" => '/',
        "zero" => '0',
        "one" => '1',
        "two" => '2',
        "three" => '3',
        "four" => '4',
        "five" => '5',
        "six" => '6',
        "seven" => '7',
        "eight" => '8',
        "nine" => '9',
        "colon" => ':',
        "semicolon" => ';',
        "less" => '<',
        "equal" => '=',
        "greater" => '>',
        "question" => '?',
        "at" => '@',
        "bracketleft" => '[',
        "backslash" => '\\',
        "bracketright" => ']',
        "asciicircum" => '^',
        "underscore" => '_',
        "grave" => '`',
        "braceleft" => '{',
        "bar" => '|',
        "braceright" => '}',
        "asciitilde" => '~',
        _ => return None,
    };
    Some(ch as u32)
}

// WinAnsiEncoding (PDF 1.7 Annex D): CP1252 extensions in 0x80–0x9F,
// Latin-1 above. Zero entries are unmapped.
const WIN_ANSI: [u16; 256] = [
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000,
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000,
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0020, 0x0021, 0x0022, 0x0023,
    0x0024, 0x0025, 0x0026, 0x0027, 0x0028, 0x0029, 0x002A, 0x002B, 0x002C, 0x002D, 0x002E, 0x002F,
    0x0030, 0x0031, 0x0032, 0x0033, 0x0034, 0x0035, 0x0036, 0x0037, 0x0038, 0x0039, 0x003A, 0x003B,
    0x003C, 0x003D, 0x003E, 0x003F, 0x0040, 0x0041, 0x0042, 0x0043, 0x0044, 0x0045, 0x0046, 0x0047,
    0x0048, 0x0049, 0x004A, 0x004B, 0x004C, 0x004D, 0x004E, 0x004F, 0x0050, 0x0051, 0x0052, 0x0053,
    0x0054, 0x0055, 0x0056, 0x0057, 0x0058, 0x0059, 0x005A, 0x005B, 0x005C, 0x005D, 0x005E, 0x005F,
    0x0060, 0x0061, 0x0062, 0x0063, 0x0064, 0x0065, 0x0066, 0x0067, 0x0068, 0x0069, 0x006A, 0x006B,
    0x006C, 0x006D, 0x006E, 0x006F, 0x0070, 0x0071, 0x0072, 0x0073, 0x0074, 0x0075, 0x0076, 0x0077,
    0x0078, 0x0079, 0x007A, 0x007B, 0x007C, 0x007D, 0x007E, 0x0000, 0x20AC, 0x0000, 0x201A, 0x0192,
    0x201E, 0x2026, 0x2020, 0x2021, 0x02C6, 0x2030, 0x0160, 0x2039, 0x0152, 0x0000, 0x017D, 0x0000,
    0x0000, 0x2018, 0x2019, 0x201C, 0x201D, 0x2022, 0x2013, 0x2014, 0x02DC, 0x2122, 0x0161, 0x203A,
    0x0153, 0x0000, 0x017E, 0x0178, 0x00A0, 0x00A1, 0x00A2, 0x00A3, 0x00A4, 0x00A5, 0x00A6, 0x00A7,
    0x00A8, 0x00A9, 0x00AA, 0x00AB, 0x00AC, 0x00AD, 0x00AE, 0x00AF, 0x00B0, 0x00B1, 0x00B2, 0x00B3,
    0x00B4, 0x00B5, 0x00B6, 0x00B7, 0x00B8, 0x00B9, 0x00BA, 0x00BB, 0x00BC, 0x00BD, 0x00BE, 0x00BF,
    0x00C0, 0x00C1, 0x00C2, 0x00C3, 0x00C4, 0x00C5, 0x00C6, 0x00C7, 0x00C8, 0x00C9, 0x00CA, 0x00CB,
    0x00CC, 0x00CD, 0x00CE, 0x00CF, 0x00D0, 0x00D1, 0x00D2, 0x00D3, 0x00D4, 0x00D5, 0x00D6, 0x00D7,
    0x00D8, 0x00D9, 0x00DA, 0x00DB, 0x00DC, 0x00DD, 0x00DE, 0x00DF, 0x00E0, 0x00E1, 0x00E2, 0x00E3,
    0x00E4, 0x00E5, 0x00E6, 0x00E7, 0x00E8, 0x00E9, 0x00EA, 0x00EB, 0x00EC, 0x00ED, 0x00EE, 0x00EF,
    0x00F0, 0x00F1, 0x00F2, 0x00F3, 0x00F4, 0x00F5, 0x00F6, 0x00F7, 0x00F8, 0x00F9, 0x00FA, 0x00FB,
    0x00FC, 0x00FD, 0x00FE, 0x00FF,
];

const MAC_ROMAN: [u16; 256] = [
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000,
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000,
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0020, 0x0021, 0x0022, 0x0023,
    0x0024, 0x0025, 0x0026, 0x0027, 0x0028, 0x0029, 0x002A, 0x002B, 0x002C, 0x002D, 0x002E, 0x002F,
    0x0030, 0x0031, 0x0032, 0x0033, 0x0034, 0x0035, 0x0036, 0x0037, 0x0038, 0x0039, 0x003A, 0x003B,
    0x003C, 0x003D, 0x003E, 0x003F, 0x0040, 0x0041, 0x0042, 0x0043, 0x0044, 0x0045, 0x0046, 0x0047,
    0x0048, 0x0049, 0x004A, 0x004B, 0x004C, 0x004D, 0x004E, 0x004F, 0x0050, 0x0051, 0x0052, 0x0053,
    0x0054, 0x0055, 0x0056, 0x0057, 0x0058, 0x0059, 0x005A, 0x005B, 0x005C, 0x005D, 0x005E, 0x005F,
    0x0060, 0x0061, 0x0062, 0x0063, 0x0064, 0x0065, 0x0066, 0x0067, 0x0068, 0x0069, 0x006A, 0x006B,
    0x006C, 0x006D, 0x006E, 0x006F, 0x0070, 0x0071, 0x0072, 0x0073, 0x0074, 0x0075, 0x0076, 0x0077,
    0x0078, 0x0079, 0x007A, 0x007B, 0x007C, 0x007D, 0x007E, 0x0000, 0x00C4, 0x00C5, 0x00C7, 0x00C9,
    0x00D1, 0x00D6, 0x00DC, 0x00E1, 0x00E0, 0x00E2, 0x00E4, 0x00E3, 0x00E5, 0x00E7, 0x00E9, 0x00E8,
    0x00EA, 0x00EB, 0x00ED, 0x00EC, 0x00EE, 0x00EF, 0x00F1, 0x00F3, 0x00F2, 0x00F4, 0x00F6, 0x00F5,
    0x00FA, 0x00F9, 0x00FB, 0x00FC, 0x2020, 0x00B0, 0x00A2, 0x00A3, 0x00A7, 0x2022, 0x00B6, 0x00DF,
    0x00AE, 0x00A9, 0x2122, 0x00B4, 0x00A8, 0x2260, 0x00C6, 0x00D8, 0x221E, 0x00B1, 0x2264, 0x2265,
    0x00A5, 0x00B5, 0x2202, 0x2211, 0x220F, 0x03C0, 0x222B, 0x00AA, 0x00BA, 0x03A9, 0x00E6, 0x00F8,
    0x00BF, 0x00A1, 0x00AC, 0x221A, 0x0192, 0x2248, 0x2206, 0x00AB, 0x00BB, 0x2026, 0x00A0, 0x00C0,
    0x00C3, 0x00D5, 0x0152, 0x0153, 0x2013, 0x2014, 0x201C, 0x201D, 0x2018, 0x2019, 0x00F7, 0x25CA,
    0x00FF, 0x0178, 0x2044, 0x20AC, 0x2039, 0x203A, 0xFB01, 0xFB02, 0x2021, 0x00B7, 0x201A, 0x201E,
    0x2030, 0x00C2, 0x00CA, 0x00C1, 0x00CB, 0x00C8, 0x00CD, 0x00CE, 0x00CF, 0x00CC, 0x00D3, 0x00D4,
    0xF8FF, 0x00D2, 0x00DA, 0x00DB, 0x00D9, 0x0131, 0x02C6, 0x02DC, 0x00AF, 0x02D8, 0x02D9, 0x02DA,
    0x00B8, 0x02DD, 0x02DB, 0x02C7,
];

// Adobe StandardEncoding. Differs from WinAnsi mainly in 0x27/0x60 (curly
// quotes) and the 0xA1–0xFF accents-and-ligatures block.
const STANDARD: [u16; 256] = [
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000,
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000,
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0020, 0x0021, 0x0022, 0x0023,
    0x0024, 0x0025, 0x0026, 0x2019, 0x0028, 0x0029, 0x002A, 0x002B, 0x002C, 0x002D, 0x002E, 0x002F,
    0x0030, 0x0031, 0x0032, 0x0033, 0x0034, 0x0035, 0x0036, 0x0037, 0x0038, 0x0039, 0x003A, 0x003B,
    0x003C, 0x003D, 0x003E, 0x003F, 0x0040, 0x0041, 0x0042, 0x0043, 0x0044, 0x0045, 0x0046, 0x0047,
    0x0048, 0x0049, 0x004A, 0x004B, 0x004C, 0x004D, 0x004E, 0x004F, 0x0050, 0x0051, 0x0052, 0x0053,
    0x0054, 0x0055, 0x0056, 0x0057, 0x0058, 0x0059, 0x005A, 0x005B, 0x005C, 0x005D, 0x005E, 0x005F,
    0x2018, 0x0061, 0x0062, 0x0063, 0x0064, 0x0065, 0x0066, 0x0067, 0x0068, 0x0069, 0x006A, 0x006B,
    0x006C, 0x006D, 0x006E, 0x006F, 0x0070, 0x0071, 0x0072, 0x0073, 0x0074, 0x0075, 0x0076, 0x0077,
    0x0078, 0x0079, 0x007A, 0x007B, 0x007C, 0x007D, 0x007E, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000,
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000,
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000,
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x00A1, 0x00A2, 0x00A3, 0x2044, 0x00A5, 0x0192, 0x00A7,
    0x00A4, 0x0027, 0x201C, 0x00AB, 0x2039, 0x203A, 0xFB01, 0xFB02, 0x0000, 0x2013, 0x2020, 0x2021,
    0x00B7, 0x0000, 0x00B6, 0x2022, 0x201A, 0x201E, 0x201D, 0x00BB, 0x2026, 0x2030, 0x0000, 0x00BF,
    0x0000, 0x0060, 0x00B4, 0x02C6, 0x02DC, 0x00AF, 0x02D8, 0x02D9, 0x00A8, 0x0000, 0x02DA, 0x00B8,
    0x0000, 0x02DD, 0x02DB, 0x02C7, 0x2014, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000,
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x00C6, 0x0000, 0x00AA,
    0x0000, 0x0000, 0x0000, 0x0000, 0x0141, 0x00D8, 0x0152, 0x00BA, 0x0000, 0x0000, 0x0000, 0x0000,
    0x0000, 0x00E6, 0x0000, 0x0000, 0x0000, 0x0131, 0x0000, 0x0000, 0x0142, 0x00F8, 0x0153, 0x00DF,
    0x0000, 0x0000, 0x0000, 0x0000,
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Parser, PdfDoc};
    use crate::tokenizer::Lexer;

    fn doc_from(input: &[u8]) -> PdfDoc {
        PdfDoc::from_objects(Parser::new(Lexer::new(input)).parse())
    }

    #[test]
    fn decode_chain_prefers_to_unicode() {
        let mut info = FontInfo::default();
        info.to_unicode.insert(0x41, "é".to_string());
        info.embedded_glyph_to_unicode.insert(0x41, 0x58);
        info.simple_encoding.insert(0x41, 0x59);
        assert_eq!(info.decode(0x41), "é");

        info.to_unicode.clear();
        assert_eq!(info.decode(0x41), "X");
        info.embedded_glyph_to_unicode.clear();
        assert_eq!(info.decode(0x41), "Y");
        info.simple_encoding.clear();
        assert_eq!(info.decode(0x41), "A");
        assert_eq!(info.decode(0x01), "");
        assert_eq!(info.decode(0x200), "");
    }

    #[test]
    fn bulk_decode_mixes_wide_and_narrow_codes() {
        let mut info = FontInfo::default();
        info.to_unicode.insert(0x0105, "ą".to_string());
        // 0x01 0x05 resolves as a wide code, the trailing 0x41 as ASCII.
        assert_eq!(info.decode_bytes(&[0x01, 0x05, 0x41]), "ąA");
    }

    #[test]
    fn win_ansi_has_annex_d_extensions() {
        let map = standard_encoding("WinAnsiEncoding").unwrap();
        assert_eq!(map.get(&0x80), Some(&0x20AC)); // Euro
        assert_eq!(map.get(&0x93), Some(&0x201C));
        assert_eq!(map.get(&0xE9), Some(&0x00E9));
        assert_eq!(map.get(&0x41), Some(&0x41));
        assert!(!map.contains_key(&0x81));
    }

    #[test]
    fn standard_encoding_curly_quotes_differ_from_ascii() {
        let map = standard_encoding("StandardEncoding").unwrap();
        assert_eq!(map.get(&0x27), Some(&0x2019));
        assert_eq!(map.get(&0x60), Some(&0x2018));
        assert_eq!(map.get(&0xE1), Some(&0x00C6));
    }

    #[test]
    fn identity_encodings_map_bytes_to_themselves() {
        let map = standard_encoding("Identity-H").unwrap();
        assert_eq!(map.len(), 256);
        assert_eq!(map.get(&0xF3), Some(&0xF3));
    }

    #[test]
    fn glyph_names_cover_printable_ascii_and_uni_form() {
        assert_eq!(glyph_name_to_unicode("space"), Some(0x20));
        assert_eq!(glyph_name_to_unicode("A"), Some(0x41));
        assert_eq!(glyph_name_to_unicode("z"), Some(0x7A));
        assert_eq!(glyph_name_to_unicode("seven"), Some(0x37));
        assert_eq!(glyph_name_to_unicode("asciitilde"), Some(0x7E));
        assert_eq!(glyph_name_to_unicode("uni20AC"), Some(0x20AC));
        assert_eq!(glyph_name_to_unicode("uni20A"), None);
        assert_eq!(glyph_name_to_unicode("gobbledygook"), None);
    }

    #[test]
    fn differences_overlay_advances_running_code() {
        let doc = PdfDoc::default();
        let differences = Object::Array(vec![
            Object::Number(65.0),
            Object::Name("quotesingle".to_string()),
            Object::Name("mystery".to_string()),
            Object::Name("uni00E9".to_string()),
        ]);
        let mut map = HashMap::new();
        apply_differences(&doc, &differences, &mut map);
        assert_eq!(map.get(&65), Some(&0x27));
        // "mystery" is unknown but still consumed code 66.
        assert_eq!(map.get(&66), None);
        assert_eq!(map.get(&67), Some(&0xE9));
    }

    #[test]
    fn registry_builds_fonts_and_aliases_resource_names() {
        let doc = doc_from(
            br#"1 0 obj
<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>
endobj
2 0 obj
<< /Type /Page /Resources << /Font << /Body 1 0 R >> >> >>
endobj
"#,
        );
        let registry = FontRegistry::build(&doc, DEFAULT_TO_UNICODE_COMPLETENESS);
        let by_id = registry.get("F1").expect("font registered under F1");
        assert_eq!(by_id.name.as_deref(), Some("Helvetica"));
        assert_eq!(by_id.encoding_name.as_deref(), Some("WinAnsiEncoding"));
        assert!(!by_id.simple_encoding.is_empty());
        let by_name = registry.get("Body").expect("font aliased by resource name");
        assert!(Arc::ptr_eq(&by_id, &by_name));
    }

    #[test]
    fn font_without_signals_defaults_to_win_ansi() {
        let doc = doc_from(b"1 0 obj << /Type /Font /Subtype /Type1 >> endobj");
        let registry = FontRegistry::build(&doc, DEFAULT_TO_UNICODE_COMPLETENESS);
        let font = registry.get("F1").unwrap();
        assert!(!font.simple_encoding.is_empty());
        assert_eq!(font.decode(0x93), "\u{201C}");
    }

    #[test]
    fn to_unicode_stream_attaches_to_font() {
        let doc = doc_from(
            br#"1 0 obj
<< /Type /Font /Subtype /Type0 /BaseFont /Demo /Encoding /Identity-H /ToUnicode 2 0 R >>
endobj
2 0 obj
<< /Length 38 >>
stream
1 beginbfchar
<0041> <00E9>
endbfchar
endstream
endobj
"#,
        );
        let registry = FontRegistry::build(&doc, DEFAULT_TO_UNICODE_COMPLETENESS);
        let font = registry.get("F1").unwrap();
        assert_eq!(font.to_unicode.get(&0x41).map(String::as_str), Some("é"));
    }
}
