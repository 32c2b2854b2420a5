//! Source document → plain UTF-8 text.
//!
//! The structurer only ever sees text. PDFs are run through `pdf-extract`;
//! anything else must already be UTF-8. Failures here are the only way the
//! structuring step can fail, and they surface as
//! [`IndexError::Extraction`].

use std::path::Path;

use anyhow::Result;

use crate::error::IndexError;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_TEXT: &str = "text/plain";

/// Guess the content type from the file extension, falling back to the
/// `%PDF` magic bytes.
pub fn detect_content_type(path: &Path, bytes: &[u8]) -> &'static str {
    let is_pdf_ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);
    if is_pdf_ext || bytes.starts_with(b"%PDF") {
        MIME_PDF
    } else {
        MIME_TEXT
    }
}

/// Decode raw bytes of the given content type into text.
pub fn extract_text(bytes: &[u8], content_type: &str) -> std::result::Result<String, String> {
    match content_type {
        MIME_PDF => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| format!("PDF extraction failed: {}", e)),
        MIME_TEXT => String::from_utf8(bytes.to_vec())
            .map_err(|e| format!("not valid UTF-8 text: {}", e)),
        other => Err(format!("unsupported content-type: {}", other)),
    }
}

/// Read a source document from disk and return its full text.
pub fn read_source(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| IndexError::Extraction {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let content_type = detect_content_type(path, &bytes);
    let text = extract_text(&bytes, content_type).map_err(|message| IndexError::Extraction {
        path: path.to_path_buf(),
        message,
    })?;
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn detects_pdf_by_extension_or_magic() {
        assert_eq!(detect_content_type(Path::new("code.PDF"), b""), MIME_PDF);
        assert_eq!(
            detect_content_type(Path::new("code.bin"), b"%PDF-1.7\n"),
            MIME_PDF
        );
        assert_eq!(detect_content_type(Path::new("code.txt"), b"CHAPTER I"), MIME_TEXT);
    }

    #[test]
    fn invalid_pdf_returns_error() {
        let err = extract_text(b"not a pdf", MIME_PDF).unwrap_err();
        assert!(err.contains("PDF"));
    }

    #[test]
    fn invalid_utf8_returns_error() {
        let err = extract_text(&[0xff, 0xfe, 0x00], MIME_TEXT).unwrap_err();
        assert!(err.contains("UTF-8"));
    }

    #[test]
    fn missing_file_is_extraction_error() {
        let err = read_source(&PathBuf::from("/nonexistent/penal_code.txt")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IndexError>(),
            Some(IndexError::Extraction { .. })
        ));
    }

    #[test]
    fn reads_plain_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("code.txt");
        std::fs::write(&path, "CHAPTER I General\n").unwrap();
        assert_eq!(read_source(&path).unwrap(), "CHAPTER I General\n");
    }
}
