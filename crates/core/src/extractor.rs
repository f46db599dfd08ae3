use crate::error::IngestError;
use crate::models::PdfDocument;
use lopdf::Document;

#[derive(Debug, Clone)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct PageFailure {
    pub number: u32,
    pub reason: String,
}

/// Per-page outcome of extracting one document. Pages that parsed but
/// carried no text are dropped from `pages` without being counted as failures.
#[derive(Debug, Clone, Default)]
pub struct ExtractedPages {
    pub page_count: u32,
    pub pages: Vec<PageText>,
    pub failures: Vec<PageFailure>,
}

pub trait PdfExtractor: Send + Sync {
    fn extract_pages(&self, document: &PdfDocument) -> Result<ExtractedPages, IngestError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, document: &PdfDocument) -> Result<ExtractedPages, IngestError> {
        let unreadable = |reason: String| IngestError::UnreadableDocument {
            name: document.name.clone(),
            reason,
        };

        let parsed = Document::load_mem(&document.bytes)
            .map_err(|error| unreadable(error.to_string()))?;
        let page_numbers = parsed.get_pages().into_keys().collect::<Vec<_>>();

        if page_numbers.is_empty() {
            return Err(unreadable("pdf has no pages".to_string()));
        }

        let mut extracted = ExtractedPages {
            page_count: page_numbers.len() as u32,
            ..ExtractedPages::default()
        };

        for page_no in page_numbers {
            match parsed.extract_text(&[page_no]) {
                Ok(text) if text.trim().is_empty() => {}
                Ok(text) => extracted.pages.push(PageText {
                    number: page_no,
                    text,
                }),
                Err(error) => extracted.failures.push(PageFailure {
                    number: page_no,
                    reason: error.to_string(),
                }),
            }
        }

        if extracted.pages.is_empty() && extracted.failures.is_empty() {
            return Err(unreadable("pdf had no readable page text".to_string()));
        }

        Ok(extracted)
    }
}

pub fn extract_page_texts(document: &PdfDocument) -> Result<ExtractedPages, IngestError> {
    LopdfExtractor.extract_pages(document)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_come_back_in_order() {
        let document =
            PdfDocument::new("two.pdf", test_pdf::with_pages(&["Alpha page", "Beta page"]));

        let extracted = extract_page_texts(&document).expect("generated pdf should parse");

        assert_eq!(extracted.page_count, 2);
        assert_eq!(extracted.pages.len(), 2);
        assert_eq!(extracted.pages[0].number, 1);
        assert!(extracted.pages[0].text.contains("Alpha page"));
        assert!(extracted.pages[1].text.contains("Beta page"));
        assert!(extracted.failures.is_empty());
    }

    #[test]
    fn garbage_bytes_are_unreadable() {
        let document = PdfDocument::new("broken.pdf", b"%PDF-1.4\n%broken".to_vec());

        match extract_page_texts(&document) {
            Err(IngestError::UnreadableDocument { name, .. }) => assert_eq!(name, "broken.pdf"),
            other => panic!("expected unreadable document, got {other:?}"),
        }
    }

    #[test]
    fn textless_pdf_is_unreadable() {
        let document = PdfDocument::new("blank.pdf", test_pdf::with_pages(&["   "]));

        assert!(matches!(
            extract_page_texts(&document),
            Err(IngestError::UnreadableDocument { .. })
        ));
    }
}
