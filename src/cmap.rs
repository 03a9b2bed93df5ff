//! ToUnicode CMap parsing.
//!
//! A ToUnicode stream maps a font's character codes to Unicode strings via
//! `bfchar` and `bfrange` sections (Adobe TN #5014 grammar). Parsing is
//! tolerant: unknown sections, commentary and malformed hex only reduce the
//! number of mappings, never fail.

use std::collections::HashMap;

/// Parse a ToUnicode CMap stream into a char-code → UTF-8 string map.
pub fn parse_to_unicode(data: &[u8]) -> HashMap<u32, String> {
    let mut tokens = CMapScanner::new(data);
    let mut map = HashMap::new();
    while let Some(token) = tokens.next() {
        match token.as_str() {
            "beginbfchar" => parse_bfchar(&mut tokens, &mut map),
            "beginbfrange" => parse_bfrange(&mut tokens, &mut map),
            _ => {}
        }
    }
    map
}

fn parse_bfchar(tokens: &mut CMapScanner<'_>, map: &mut HashMap<u32, String>) {
    while let Some(token) = tokens.next() {
        if token == "endbfchar" {
            return;
        }
        let Some(src) = hex_bytes(&token) else {
            continue;
        };
        let Some(dst) = tokens.next().as_deref().and_then(hex_bytes) else {
            continue;
        };
        if !src.is_empty() {
            map.insert(big_endian(&src), utf16be_chunks_to_string(&dst));
        }
    }
}

fn parse_bfrange(tokens: &mut CMapScanner<'_>, map: &mut HashMap<u32, String>) {
    while let Some(token) = tokens.next() {
        if token == "endbfrange" {
            return;
        }
        let Some(lo) = hex_bytes(&token) else {
            continue;
        };
        let Some(hi) = tokens.next().as_deref().and_then(hex_bytes) else {
            continue;
        };
        if lo.is_empty() || hi.is_empty() {
            continue;
        }
        let (lo, hi) = (big_endian(&lo), big_endian(&hi));
        let Some(dst) = tokens.next() else {
            return;
        };

        if dst == "[" {
            // Array form: one destination per code; excess codes stay unmapped.
            let mut code = lo;
            while let Some(item) = tokens.next() {
                if item == "]" || item == "endbfrange" {
                    break;
                }
                if code <= hi
                    && let Some(bytes) = hex_bytes(&item)
                {
                    map.insert(code, utf16be_chunks_to_string(&bytes));
                }
                code = code.saturating_add(1);
            }
        } else if let Some(bytes) = hex_bytes(&dst) {
            // Scalar form: consecutive code points from the decoded start.
            let start = utf16be_chunks_to_string(&bytes);
            let Some(mut point) = start.chars().next().map(|c| c as u32) else {
                continue;
            };
            for code in lo..=hi {
                if let Some(ch) = char::from_u32(point) {
                    map.insert(code, ch.to_string());
                }
                point = point.saturating_add(1);
            }
        }
    }
}

/// Decode UTF-16BE hex payload bytes: 2-byte chunks, zero chunks skipped,
/// surrogate pairs combined. Lone surrogates and values past the Unicode
/// range produce nothing.
pub(crate) fn utf16be_chunks_to_string(bytes: &[u8]) -> String {
    let mut units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .filter(|&unit| unit != 0)
        .peekable();
    let mut out = String::new();
    while let Some(unit) = units.next() {
        let point = match unit {
            0xD800..=0xDBFF => match units.peek() {
                Some(&low @ 0xDC00..=0xDFFF) => {
                    units.next();
                    0x10000 + (((unit as u32) - 0xD800) << 10) + (low as u32 - 0xDC00)
                }
                _ => continue,
            },
            0xDC00..=0xDFFF => continue,
            _ => unit as u32,
        };
        if let Some(ch) = char::from_u32(point) {
            out.push(ch);
        }
    }
    out
}

fn big_endian(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32)
}

/// `<48656C6C6F>` → raw bytes. Odd trailing digits are dropped.
fn hex_bytes(token: &str) -> Option<Vec<u8>> {
    let inner = token.strip_prefix('<')?.strip_suffix('>')?;
    let digits: Vec<u8> = inner
        .bytes()
        .filter(|b| b.is_ascii_hexdigit())
        .collect();
    Some(
        digits
            .chunks_exact(2)
            .filter_map(|pair| {
                let text = std::str::from_utf8(pair).ok()?;
                u8::from_str_radix(text, 16).ok()
            })
            .collect(),
    )
}

/// Whitespace-separated CMap tokens; `<…>` hex runs, `[` and `]` stand alone.
struct CMapScanner<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> CMapScanner<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn next(&mut self) -> Option<String> {
        while self.pos < self.data.len() && self.data[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
        let &first = self.data.get(self.pos)?;
        let start = self.pos;
        match first {
            b'<' => {
                self.pos += 1;
                while self.pos < self.data.len() && self.data[self.pos] != b'>' {
                    self.pos += 1;
                }
                self.pos = (self.pos + 1).min(self.data.len());
            }
            b'[' | b']' => self.pos += 1,
            _ => {
                while self.pos < self.data.len()
                    && !self.data[self.pos].is_ascii_whitespace()
                    && !matches!(self.data[self.pos], b'[' | b']' | b'<')
                {
                    self.pos += 1;
                }
            }
        }
        Some(String::from_utf8_lossy(&self.data[start..self.pos]).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bfchar_maps_codes_to_utf16be_strings() {
        let map = parse_to_unicode(b"2 beginbfchar\n<0041> <00E9>\n<0042> <0057006F0057> endbfchar");
        assert_eq!(map.get(&0x41).map(String::as_str), Some("\u{E9}"));
        assert_eq!(map.get(&0x42).map(String::as_str), Some("WoW"));
    }

    #[test]
    fn bfchar_surrogate_pair_combines_to_supplementary_plane() {
        let map = parse_to_unicode(b"1 beginbfchar <01> <D83DDE00> endbfchar");
        assert_eq!(map.get(&1).map(String::as_str), Some("\u{1F600}"));
    }

    #[test]
    fn bfchar_zero_chunks_are_skipped() {
        let map = parse_to_unicode(b"1 beginbfchar <02> <00000041> endbfchar");
        assert_eq!(map.get(&2).map(String::as_str), Some("A"));
    }

    #[test]
    fn bfrange_scalar_walks_consecutive_code_points() {
        let map = parse_to_unicode(b"1 beginbfrange <20> <22> <0041> endbfrange");
        assert_eq!(map.get(&0x20).map(String::as_str), Some("A"));
        assert_eq!(map.get(&0x21).map(String::as_str), Some("B"));
        assert_eq!(map.get(&0x22).map(String::as_str), Some("C"));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn bfrange_array_maps_one_destination_per_code() {
        let map =
            parse_to_unicode(b"1 beginbfrange <05> <07> [<0058> <0059>] endbfrange");
        assert_eq!(map.get(&5).map(String::as_str), Some("X"));
        assert_eq!(map.get(&6).map(String::as_str), Some("Y"));
        assert_eq!(map.get(&7), None);
    }

    #[test]
    fn four_byte_source_codes_parse_as_big_endian() {
        let map = parse_to_unicode(b"1 beginbfchar <00010203> <0041> endbfchar");
        assert_eq!(map.get(&0x00010203).map(String::as_str), Some("A"));
    }

    #[test]
    fn commentary_and_unknown_sections_are_ignored() {
        let data = br#"%!PS-Adobe-3.0 Resource-CMap
/CIDInit /ProcSet findresource begin
1 begincodespacerange <00> <FF> endcodespacerange
1 beginbfchar <41> <0042> endbfchar
endcmap end
"#;
        let map = parse_to_unicode(data);
        assert_eq!(map.get(&0x41).map(String::as_str), Some("B"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn malformed_hex_reduces_mappings_without_failing() {
        let map = parse_to_unicode(b"2 beginbfchar <zz> <0041> <42> <0043> endbfchar");
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&0x42).map(String::as_str), Some("C"));
    }
}
