// Unicode helpers for building keys from text

use crate::CoreError;

/// Encodes code point labels as UTF-8.
pub fn utf32_to_utf8(labels: &[i32]) -> Result<Vec<u8>, CoreError> {
    let mut out = Vec::with_capacity(labels.len());
    let mut buf = [0u8; 4];
    for &label in labels {
        let c = u32::try_from(label)
            .ok()
            .and_then(char::from_u32)
            .ok_or(CoreError::InvalidCodePoint(label))?;
        out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
    }
    Ok(out)
}

/// Decodes UTF-8 into code point labels.
pub fn utf8_to_utf32(bytes: &[u8]) -> Result<Vec<i32>, CoreError> {
    let s = std::str::from_utf8(bytes).map_err(|_| CoreError::InvalidUtf8)?;
    Ok(s.chars().map(|c| c as i32).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_points_round_trip() {
        let text = "hyvää yötä 🌙";
        let labels = utf8_to_utf32(text.as_bytes()).unwrap();
        assert_eq!(labels.len(), text.chars().count());
        assert_eq!(utf32_to_utf8(&labels).unwrap(), text.as_bytes());
    }

    #[test]
    fn rejects_surrogates_and_negatives() {
        assert_eq!(utf32_to_utf8(&[0xDC00]), Err(CoreError::InvalidCodePoint(0xDC00)));
        assert_eq!(utf32_to_utf8(&[-1]), Err(CoreError::InvalidCodePoint(-1)));
    }
}
