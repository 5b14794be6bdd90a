use std::path::Path;

use lopdf::Document;
use tracing::{debug, warn};

use crate::{Result, TutorError};

/// Extract the raw text of a PDF file.
///
/// Pages are concatenated in page order, separated by newlines. A page with
/// no extractable text contributes an empty segment rather than failing the
/// whole document. Unreadable or unparsable files yield
/// [`TutorError::Extraction`].
#[inline]
pub fn extract_text_from_pdf(path: &Path) -> Result<String> {
    let document = Document::load(path).map_err(|e| {
        TutorError::Extraction(format!("Failed to open PDF {}: {}", path.display(), e))
    })?;

    if document.is_encrypted() {
        return Err(TutorError::Extraction(format!(
            "PDF {} is encrypted",
            path.display()
        )));
    }

    let mut pages = Vec::new();
    for (page_number, _) in document.get_pages() {
        match document.extract_text(&[page_number]) {
            Ok(text) => pages.push(text.trim_end().to_string()),
            Err(e) => {
                // Scanned or image-only pages carry no text layer.
                warn!("No extractable text on page {}: {}", page_number, e);
                pages.push(String::new());
            }
        }
    }

    debug!(
        "Extracted {} pages ({} characters) from {}",
        pages.len(),
        pages.iter().map(String::len).sum::<usize>(),
        path.display()
    );

    Ok(pages.join("\n"))
}
