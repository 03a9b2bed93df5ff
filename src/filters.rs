//! Stream unfiltering.
//!
//! [`unfilter`] rewrites every stream in the object sequence so downstream
//! consumers see plain bytes. Supported filters: `FlateDecode`,
//! `ASCIIHexDecode`, `ASCII85Decode`, applied in `Filter`-array order.
//! Unknown filters leave the stream untouched (its `Filter` entry stays, so
//! the failure remains visible to callers).

use std::collections::HashMap;

use crate::model::Object;

pub fn unfilter(objects: Vec<Object>) -> Vec<Object> {
    objects.into_iter().map(unfilter_value).collect()
}

fn unfilter_value(obj: Object) -> Object {
    match obj {
        Object::Indirect {
            obj_num,
            gen_num,
            body,
        } => Object::Indirect {
            obj_num,
            gen_num,
            body: Box::new(unfilter_value(*body)),
        },
        Object::Array(items) => Object::Array(items.into_iter().map(unfilter_value).collect()),
        Object::Dictionary(dict) => Object::Dictionary(
            dict.into_iter()
                .map(|(k, v)| (k, unfilter_value(v)))
                .collect(),
        ),
        Object::Stream { mut dict, data } => {
            let names = filter_names(&dict);
            if names.is_empty() {
                return Object::Stream { dict, data };
            }
            match apply_filters(&names, &data) {
                Some(decoded) => {
                    dict.remove("Filter");
                    dict.remove("DecodeParms");
                    dict.insert("Length".to_string(), Object::Number(decoded.len() as f64));
                    Object::Stream {
                        dict,
                        data: decoded,
                    }
                }
                None => {
                    log::debug!("leaving stream filtered: {:?}", names);
                    Object::Stream { dict, data }
                }
            }
        }
        other => other,
    }
}

fn filter_names(dict: &HashMap<String, Object>) -> Vec<String> {
    match dict.get("Filter") {
        Some(Object::Name(name)) => vec![name.clone()],
        Some(Object::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_name().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

fn apply_filters(names: &[String], data: &[u8]) -> Option<Vec<u8>> {
    let mut data = data.to_vec();
    for name in names {
        data = match name.as_str() {
            "FlateDecode" | "Fl" => flate_decode(&data),
            "ASCIIHexDecode" | "AHx" => ascii_hex_decode(&data),
            "ASCII85Decode" | "A85" => ascii85_decode(&data)?,
            _ => return None,
        };
    }
    Some(data)
}

fn flate_decode(data: &[u8]) -> Vec<u8> {
    use std::io::Read;
    let mut decoder = flate2::read::ZlibDecoder::new(data);
    let mut out = Vec::new();
    // Truncated input still yields the prefix that did inflate.
    let _ = decoder.read_to_end(&mut out);
    out
}

fn ascii_hex_decode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut high: Option<u8> = None;
    for &byte in data {
        if byte == b'>' {
            break;
        }
        let Some(nibble) = hex_value(byte) else {
            continue;
        };
        match high.take() {
            Some(h) => out.push((h << 4) | nibble),
            None => high = Some(nibble),
        }
    }
    if let Some(h) = high {
        out.push(h << 4);
    }
    out
}

fn ascii85_decode(data: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    let mut group = [0u8; 5];
    let mut count = 0usize;
    for &byte in data {
        match byte {
            b'~' => break,
            b'z' if count == 0 => out.extend_from_slice(&[0, 0, 0, 0]),
            b'!'..=b'u' => {
                group[count] = byte - b'!';
                count += 1;
                if count == 5 {
                    let value = group.iter().fold(0u32, |acc, &d| {
                        acc.checked_mul(85)
                            .and_then(|v| v.checked_add(d as u32))
                            .unwrap_or(u32::MAX)
                    });
                    out.extend_from_slice(&value.to_be_bytes());
                    count = 0;
                }
            }
            _ if byte.is_ascii_whitespace() => {}
            _ => return None,
        }
    }
    if count == 1 {
        return None;
    }
    if count > 1 {
        // A partial group of n digits encodes n-1 bytes; pad with 'u'.
        for slot in group.iter_mut().take(5).skip(count) {
            *slot = 84;
        }
        let value = group
            .iter()
            .fold(0u32, |acc, &d| acc.saturating_mul(85).saturating_add(d as u32));
        out.extend_from_slice(&value.to_be_bytes()[..count - 1]);
    }
    Some(out)
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flate_compress(data: &[u8]) -> Vec<u8> {
        use std::io::Write;
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn stream_with_filter(filter: Object, data: Vec<u8>) -> Object {
        let mut dict = HashMap::new();
        dict.insert("Filter".to_string(), filter);
        Object::Stream { dict, data }
    }

    #[test]
    fn flate_streams_are_inflated_and_filter_removed() {
        let stream = stream_with_filter(
            Object::Name("FlateDecode".to_string()),
            flate_compress(b"BT (x) Tj ET"),
        );
        let out = unfilter(vec![stream]);
        let Some((dict, data)) = out[0].as_stream() else {
            panic!("expected stream");
        };
        assert_eq!(data, b"BT (x) Tj ET");
        assert!(!dict.contains_key("Filter"));
        assert_eq!(dict.get("Length"), Some(&Object::Number(12.0)));
    }

    #[test]
    fn ascii_hex_decodes_with_whitespace_and_eod() {
        assert_eq!(ascii_hex_decode(b"48 65 6C 6C 6F>garbage"), b"Hello");
        assert_eq!(ascii_hex_decode(b"7"), vec![0x70]);
    }

    #[test]
    fn ascii85_decodes_groups_and_z_shortcut() {
        // "9jqo^" encodes "Man " in the canonical btoa example.
        assert_eq!(ascii85_decode(b"9jqo^~>").unwrap(), b"Man ");
        assert_eq!(ascii85_decode(b"z~>").unwrap(), vec![0, 0, 0, 0]);
    }

    #[test]
    fn ascii85_partial_group_yields_prefix_bytes() {
        // A 3-digit trailing group decodes to two bytes: "9jn" is "Ma".
        assert_eq!(ascii85_decode(b"9jn~>").unwrap(), b"Ma");
    }

    #[test]
    fn filter_chain_applies_in_order() {
        let hex_of_flate: Vec<u8> = flate_compress(b"chained")
            .iter()
            .flat_map(|b| format!("{b:02X}").into_bytes())
            .collect();
        let stream = stream_with_filter(
            Object::Array(vec![
                Object::Name("ASCIIHexDecode".to_string()),
                Object::Name("FlateDecode".to_string()),
            ]),
            hex_of_flate,
        );
        let out = unfilter(vec![stream]);
        assert_eq!(out[0].as_stream().unwrap().1, b"chained");
    }

    #[test]
    fn unknown_filters_leave_stream_untouched() {
        let stream = stream_with_filter(Object::Name("JPXDecode".to_string()), vec![1, 2, 3]);
        let out = unfilter(vec![stream]);
        let (dict, data) = out[0].as_stream().unwrap();
        assert_eq!(data, &[1, 2, 3]);
        assert!(dict.contains_key("Filter"));
    }
}
