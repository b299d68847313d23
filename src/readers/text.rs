use log::{debug, warn};

/// Below this many non-whitespace characters the PDF is treated as
/// scanned/image-only and the caller falls back to the vision path.
pub const MIN_PDF_TEXT_CHARS: usize = 200;

/// Extracts embedded text from a PDF. Returns None for empty buffers,
/// unparseable files, and documents whose text layer is too thin to carry a
/// financial statement.
pub fn read_pdf_text(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() {
        debug!("pdf text reader skipped: empty buffer");
        return None;
    }

    let text = match pdf_extract::extract_text_from_mem(bytes) {
        Ok(text) => text,
        Err(e) => {
            warn!("pdf text extraction failed: {}", e);
            return None;
        }
    };

    let meaningful = text.chars().filter(|c| !c.is_whitespace()).count();
    if meaningful < MIN_PDF_TEXT_CHARS {
        debug!(
            "pdf text too sparse ({} meaningful chars, need {}), likely a scan",
            meaningful, MIN_PDF_TEXT_CHARS
        );
        return None;
    }

    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_buffer_is_none() {
        assert!(read_pdf_text(&[]).is_none());
    }

    #[test]
    fn test_garbage_bytes_are_none_not_panic() {
        assert!(read_pdf_text(b"this is not a pdf at all").is_none());
    }
}
