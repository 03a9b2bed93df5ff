//! Embedded font programs (TrueType/OpenType sfnt containers).
//!
//! Reads just enough of an sfnt file to recover a glyph-id → Unicode map
//! from the `cmap` table (subtable formats 0, 4, 6 and 12) and a display
//! name from the `name` table. Everything is bounds-checked; a truncated
//! table yields whatever mappings were read before the cut.

use std::collections::HashMap;

const TAG_TRUETYPE: u32 = 0x0001_0000;
const TAG_TRUE: u32 = u32::from_be_bytes(*b"true");
const TAG_OTTO: u32 = u32::from_be_bytes(*b"OTTO");
const TAG_TTC: u32 = u32::from_be_bytes(*b"ttcf");

/// Groups wider than this in a format 12 subtable are treated as hostile
/// input and skipped.
const MAX_GROUP_SPAN: u32 = 10_000;

#[derive(Debug, Default)]
pub struct EmbeddedFont {
    pub glyph_to_unicode: HashMap<u16, u32>,
    pub name: Option<String>,
}

/// Parse an sfnt font program. Returns `None` when the container is not a
/// plain TrueType/OpenType file or no glyph mapping could be recovered.
pub fn parse(data: &[u8]) -> Option<EmbeddedFont> {
    let mut reader = Reader::new(data);
    match reader.read_u32()? {
        TAG_TRUETYPE | TAG_TRUE | TAG_OTTO => {}
        TAG_TTC => {
            log::debug!("TrueType collections are not supported");
            return None;
        }
        _ => return None,
    }

    let num_tables = reader.read_u16()?;
    // searchRange, entrySelector, rangeShift: redundant, consume and ignore.
    reader.skip(6)?;

    let mut tables: HashMap<[u8; 4], (usize, usize)> = HashMap::new();
    for _ in 0..num_tables {
        let tag = reader.read_tag()?;
        let _checksum = reader.read_u32()?;
        let offset = reader.read_u32()? as usize;
        let length = reader.read_u32()? as usize;
        tables.insert(tag, (offset, length));
    }

    let mut font = EmbeddedFont::default();
    if let Some(&(offset, _)) = tables.get(b"cmap") {
        let _ = parse_cmap(data, offset, &mut font.glyph_to_unicode);
    }
    if let Some(&(offset, _)) = tables.get(b"name") {
        font.name = parse_name(data, offset);
    }

    (!font.glyph_to_unicode.is_empty()).then_some(font)
}

/// Preference order for `cmap` subtables. Unlisted platform/encoding pairs
/// are never selected.
fn subtable_priority(platform: u16, encoding: u16) -> u8 {
    match (platform, encoding) {
        (3, 10) => 11,
        (3, 1) => 10,
        (0, e) if e >= 3 => 9,
        (0, _) => 8,
        (1, 0) => 5,
        _ => 0,
    }
}

fn parse_cmap(data: &[u8], table_offset: usize, map: &mut HashMap<u16, u32>) -> Option<()> {
    let mut reader = Reader::at(data, table_offset)?;
    let _version = reader.read_u16()?;
    let num_subtables = reader.read_u16()?;

    let mut best: Option<(u8, usize)> = None;
    for _ in 0..num_subtables {
        let platform = reader.read_u16()?;
        let encoding = reader.read_u16()?;
        let offset = reader.read_u32()? as usize;
        let priority = subtable_priority(platform, encoding);
        if priority > 0 && best.is_none_or(|(p, _)| priority > p) {
            best = Some((priority, table_offset + offset));
        }
    }

    let (_, subtable_offset) = best?;
    let mut sub = Reader::at(data, subtable_offset)?;
    match sub.read_u16()? {
        0 => parse_format0(&mut sub, map),
        4 => parse_format4(&mut sub, map),
        6 => parse_format6(&mut sub, map),
        12 => parse_format12(&mut sub, map),
        other => {
            log::debug!("unsupported cmap subtable format {other}");
            None
        }
    }
}

fn parse_format0(reader: &mut Reader<'_>, map: &mut HashMap<u16, u32>) -> Option<()> {
    let _length = reader.read_u16()?;
    let _language = reader.read_u16()?;
    for code in 0..256u32 {
        let glyph = reader.read_u8()?;
        if glyph != 0 {
            map.entry(glyph as u16).or_insert(code);
        }
    }
    Some(())
}

fn parse_format4(reader: &mut Reader<'_>, map: &mut HashMap<u16, u32>) -> Option<()> {
    let _length = reader.read_u16()?;
    let _language = reader.read_u16()?;
    let seg_count = (reader.read_u16()? / 2) as usize;
    reader.skip(6)?; // searchRange, entrySelector, rangeShift

    let mut end_codes = Vec::with_capacity(seg_count);
    for _ in 0..seg_count {
        end_codes.push(reader.read_u16()?);
    }
    let _reserved_pad = reader.read_u16()?;
    let mut start_codes = Vec::with_capacity(seg_count);
    for _ in 0..seg_count {
        start_codes.push(reader.read_u16()?);
    }
    let mut id_deltas = Vec::with_capacity(seg_count);
    for _ in 0..seg_count {
        let raw = reader.read_u16()? as i32;
        id_deltas.push(if raw >= 0x8000 { raw - 0x10000 } else { raw });
    }
    // The indirect lookup below addresses bytes relative to this array.
    let range_offset_base = reader.position();
    let mut range_offsets = Vec::with_capacity(seg_count);
    for _ in 0..seg_count {
        range_offsets.push(reader.read_u16()? as usize);
    }

    for seg in 0..seg_count {
        let start = start_codes[seg];
        let end = end_codes[seg];
        if start == 0xFFFF || end < start {
            continue;
        }
        for code in start as u32..=end as u32 {
            let glyph = if range_offsets[seg] == 0 {
                ((code as i32 + id_deltas[seg]) & 0xFFFF) as u16
            } else {
                let at = range_offset_base
                    + seg * 2
                    + range_offsets[seg]
                    + (code - start as u32) as usize * 2;
                let raw = Reader::at(reader.data(), at)?.read_u16()?;
                if raw == 0 {
                    0
                } else {
                    ((raw as i32 + id_deltas[seg]) & 0xFFFF) as u16
                }
            };
            if glyph != 0 {
                map.entry(glyph).or_insert(code);
            }
        }
    }
    Some(())
}

fn parse_format6(reader: &mut Reader<'_>, map: &mut HashMap<u16, u32>) -> Option<()> {
    let _length = reader.read_u16()?;
    let _language = reader.read_u16()?;
    let first_code = reader.read_u16()? as u32;
    let entry_count = reader.read_u16()?;
    for i in 0..entry_count as u32 {
        let glyph = reader.read_u16()?;
        if glyph != 0 {
            map.entry(glyph).or_insert(first_code + i);
        }
    }
    Some(())
}

fn parse_format12(reader: &mut Reader<'_>, map: &mut HashMap<u16, u32>) -> Option<()> {
    let _reserved = reader.read_u16()?;
    let _length = reader.read_u32()?;
    let _language = reader.read_u32()?;
    let num_groups = reader.read_u32()?;
    for _ in 0..num_groups {
        let start_char = reader.read_u32()?;
        let end_char = reader.read_u32()?;
        let start_glyph = reader.read_u32()?;
        if end_char < start_char || end_char - start_char > MAX_GROUP_SPAN {
            continue;
        }
        for k in 0..=(end_char - start_char) {
            let code = start_char + k;
            let glyph = start_glyph + k;
            if code >= 0x110000 || glyph > u16::MAX as u32 {
                continue;
            }
            map.entry(glyph as u16).or_insert(code);
        }
    }
    Some(())
}

fn parse_name(data: &[u8], table_offset: usize) -> Option<String> {
    let mut reader = Reader::at(data, table_offset)?;
    let _format = reader.read_u16()?;
    let count = reader.read_u16()?;
    let string_offset = reader.read_u16()? as usize;

    for _ in 0..count {
        let platform = reader.read_u16()?;
        let _encoding = reader.read_u16()?;
        let _language = reader.read_u16()?;
        let name_id = reader.read_u16()?;
        let length = reader.read_u16()? as usize;
        let offset = reader.read_u16()? as usize;
        if !matches!(name_id, 4 | 6) {
            continue;
        }
        let start = table_offset + string_offset + offset;
        let bytes = data.get(start..start + length)?;
        let name = if matches!(platform, 0 | 3) {
            crate::cmap::utf16be_chunks_to_string(bytes)
        } else {
            bytes.iter().map(|&b| b as char).collect()
        };
        if !name.is_empty() {
            return Some(name);
        }
    }
    None
}

/// Bounds-checked big-endian cursor. Every read returns `None` past the end
/// of the buffer so a truncated table aborts cleanly.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn at(data: &'a [u8], pos: usize) -> Option<Self> {
        (pos <= data.len()).then_some(Self { data, pos })
    }

    fn data(&self) -> &'a [u8] {
        self.data
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn skip(&mut self, n: usize) -> Option<()> {
        let next = self.pos.checked_add(n)?;
        (next <= self.data.len()).then(|| self.pos = next)
    }

    fn read_u8(&mut self) -> Option<u8> {
        let value = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(value)
    }

    fn read_u16(&mut self) -> Option<u16> {
        let bytes = self.data.get(self.pos..self.pos + 2)?;
        self.pos += 2;
        Some(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn read_u32(&mut self) -> Option<u32> {
        let bytes = self.data.get(self.pos..self.pos + 4)?;
        self.pos += 4;
        Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_tag(&mut self) -> Option<[u8; 4]> {
        let bytes = self.data.get(self.pos..self.pos + 4)?;
        self.pos += 4;
        Some([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}
