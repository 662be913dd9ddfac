use crate::{GenericMap, GenericValue, VdfError, TAG_END, TAG_INT, TAG_MAP, TAG_STRING};

/// Serializes a root map, closing every level with the end marker.
pub fn encode(root: &GenericMap) -> Result<Vec<u8>, VdfError> {
    let mut out = Vec::new();
    write_map(&mut out, root)?;
    Ok(out)
}

fn write_map(out: &mut Vec<u8>, map: &GenericMap) -> Result<(), VdfError> {
    for (key, value) in map {
        match value {
            GenericValue::Map(inner) => {
                out.push(TAG_MAP);
                write_cstr(out, key, key)?;
                write_map(out, inner)?;
            }
            GenericValue::String(text) => {
                out.push(TAG_STRING);
                write_cstr(out, key, key)?;
                write_cstr(out, key, text)?;
            }
            GenericValue::U32(number) => {
                out.push(TAG_INT);
                write_cstr(out, key, key)?;
                out.extend_from_slice(&number.to_le_bytes());
            }
        }
    }
    out.push(TAG_END);
    Ok(())
}

fn write_cstr(out: &mut Vec<u8>, key: &str, text: &str) -> Result<(), VdfError> {
    if text.as_bytes().contains(&0) {
        return Err(VdfError::InteriorNul {
            key: key.to_string(),
        });
    }
    out.extend_from_slice(text.as_bytes());
    out.push(0);
    Ok(())
}
