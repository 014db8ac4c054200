use async_trait::async_trait;
use concord_core::{DocumentExtractor, ExtractedProfile, MatchError};

/// Default [`DocumentExtractor`]: treats input bytes as UTF-8 text. Good
/// enough for `.txt` uploads; a real PDF/DOCX pipeline is out of scope and
/// is not reimplemented here — plug in a real extractor behind the same
/// trait when one is needed.
#[derive(Debug, Default)]
pub struct PlainTextExtractor;

#[async_trait]
impl DocumentExtractor for PlainTextExtractor {
    async fn extract(&self, bytes: &[u8], filename: &str) -> Result<ExtractedProfile, MatchError> {
        let free_text = String::from_utf8(bytes.to_vec())
            .map_err(|e| MatchError::Validation(format!("{filename}: not valid UTF-8 text: {e}")))?;
        Ok(ExtractedProfile {
            free_text,
            detected_skills: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn extracts_utf8_text() {
        let extractor = PlainTextExtractor;
        let profile = extractor.extract(b"Rust engineer, 5 years", "cv.txt").await.unwrap();
        assert_eq!(profile.free_text, "Rust engineer, 5 years");
    }

    #[tokio::test]
    async fn rejects_invalid_utf8() {
        let extractor = PlainTextExtractor;
        let err = extractor.extract(&[0xff, 0xfe, 0xfd], "cv.txt").await.unwrap_err();
        assert!(matches!(err, MatchError::Validation(_)));
    }
}
