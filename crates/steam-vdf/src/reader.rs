use crate::{GenericMap, GenericValue, VdfError, TAG_END, TAG_INT, TAG_MAP, TAG_STRING};

/// Deepest map nesting accepted. Shortcut files nest three or four levels.
pub const MAX_DEPTH: usize = 64;

/// Parses a binary VDF buffer into its root map.
///
/// An empty buffer is an empty map. Anything after the root end marker is rejected.
pub fn decode(bytes: &[u8]) -> Result<GenericMap, VdfError> {
    if bytes.is_empty() {
        return Ok(GenericMap::new());
    }
    let mut reader = Reader {
        bytes,
        pos: 0,
        depth: 0,
    };
    let root = reader.read_map()?;
    if reader.pos != bytes.len() {
        return Err(VdfError::TrailingBytes {
            offset: reader.pos,
            count: bytes.len() - reader.pos,
        });
    }
    Ok(root)
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> Reader<'a> {
    fn read_map(&mut self) -> Result<GenericMap, VdfError> {
        let mut map = GenericMap::new();
        loop {
            let offset = self.pos;
            let tag = self.read_u8()?;
            if tag == TAG_END {
                return Ok(map);
            }
            let (key, value) = match tag {
                TAG_MAP => {
                    let key = self.read_cstr()?;
                    if self.depth >= MAX_DEPTH {
                        return Err(VdfError::TooDeep { offset });
                    }
                    self.depth += 1;
                    let nested = self.read_map()?;
                    self.depth -= 1;
                    (key, GenericValue::Map(nested))
                }
                TAG_STRING => {
                    let key = self.read_cstr()?;
                    (key, GenericValue::String(self.read_cstr()?))
                }
                TAG_INT => {
                    let key = self.read_cstr()?;
                    (key, GenericValue::U32(self.read_u32()?))
                }
                other => return Err(VdfError::UnsupportedType { tag: other, offset }),
            };
            map.insert(key, value);
        }
    }

    fn read_u8(&mut self) -> Result<u8, VdfError> {
        let byte = *self
            .bytes
            .get(self.pos)
            .ok_or(VdfError::UnexpectedEof { offset: self.pos })?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_u32(&mut self) -> Result<u32, VdfError> {
        let end = self.pos + 4;
        let slice = self
            .bytes
            .get(self.pos..end)
            .ok_or(VdfError::UnexpectedEof {
                offset: self.bytes.len(),
            })?;
        let mut raw = [0u8; 4];
        raw.copy_from_slice(slice);
        self.pos = end;
        Ok(u32::from_le_bytes(raw))
    }

    fn read_cstr(&mut self) -> Result<String, VdfError> {
        let start = self.pos;
        let rest = &self.bytes[start..];
        let len = rest
            .iter()
            .position(|byte| *byte == 0)
            .ok_or(VdfError::UnexpectedEof {
                offset: self.bytes.len(),
            })?;
        let text = std::str::from_utf8(&rest[..len])
            .map_err(|_| VdfError::InvalidUtf8 { offset: start })?;
        self.pos = start + len + 1;
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shortcut_bytes() -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.push(TAG_MAP);
        bytes.extend_from_slice(b"shortcuts\0");
        bytes.push(TAG_MAP);
        bytes.extend_from_slice(b"0\0");
        bytes.push(TAG_INT);
        bytes.extend_from_slice(b"appid\0");
        bytes.extend_from_slice(&0x8000_1234u32.to_le_bytes());
        bytes.push(TAG_STRING);
        bytes.extend_from_slice(b"AppName\0Celeste\0");
        bytes.push(TAG_END);
        bytes.push(TAG_END);
        bytes.push(TAG_END);
        bytes
    }

    #[test]
    fn decodes_nested_shortcut_map() {
        let root = decode(&shortcut_bytes()).expect("decode");
        let shortcuts = root["shortcuts"].as_map().expect("shortcuts map");
        let first = shortcuts["0"].as_map().expect("entry map");
        assert_eq!(first["appid"], GenericValue::U32(0x8000_1234));
        assert_eq!(first["AppName"].as_str(), Some("Celeste"));
    }

    #[test]
    fn empty_input_is_empty_map() {
        assert!(decode(&[]).expect("decode").is_empty());
    }

    #[test]
    fn rejects_unsupported_type_tag() {
        let bytes = [0x07, b'x', 0, 1, 2, 3, 4, 5, 6, 7, 8, TAG_END];
        assert_eq!(
            decode(&bytes),
            Err(VdfError::UnsupportedType { tag: 0x07, offset: 0 })
        );
    }

    #[test]
    fn rejects_truncated_input() {
        let mut bytes = shortcut_bytes();
        bytes.truncate(bytes.len() - 2);
        assert!(matches!(
            decode(&bytes),
            Err(VdfError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn rejects_runaway_nesting() {
        let bytes = [TAG_MAP, 0].repeat(2_000_000);
        assert_eq!(
            decode(&bytes),
            Err(VdfError::TooDeep {
                offset: MAX_DEPTH * 2
            })
        );
    }

    #[test]
    fn accepts_nesting_up_to_limit() {
        let mut bytes = [TAG_MAP, b'k', 0].repeat(MAX_DEPTH);
        bytes.extend(std::iter::repeat(TAG_END).take(MAX_DEPTH + 1));
        let mut map = &decode(&bytes).expect("decode");
        for _ in 0..MAX_DEPTH {
            map = map["k"].as_map().expect("nested map");
        }
        assert!(map.is_empty());
    }

    #[test]
    fn rejects_truncated_integer() {
        let bytes = [TAG_INT, b'n', 0, 1, 2];
        assert_eq!(decode(&bytes), Err(VdfError::UnexpectedEof { offset: 5 }));
    }

    #[test]
    fn rejects_trailing_bytes() {
        let mut bytes = shortcut_bytes();
        bytes.push(0xff);
        let expected_offset = bytes.len() - 1;
        assert_eq!(
            decode(&bytes),
            Err(VdfError::TrailingBytes {
                offset: expected_offset,
                count: 1
            })
        );
    }

    #[test]
    fn rejects_invalid_utf8() {
        let bytes = [TAG_STRING, b'k', 0, 0xff, 0xfe, 0, TAG_END];
        assert_eq!(decode(&bytes), Err(VdfError::InvalidUtf8 { offset: 3 }));
    }
}
