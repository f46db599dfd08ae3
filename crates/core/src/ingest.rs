use crate::extractor::PdfExtractor;
use crate::{
    DocumentFingerprint, IngestError, IngestionOptions, PageFailurePolicy, PdfDocument,
    SkippedPage,
};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub fn discover_pdf_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_pdf = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

/// Reads every pdf under `folder` into memory, in discovery order.
pub fn load_pdf_folder(folder: &Path) -> Result<Vec<PdfDocument>, IngestError> {
    let files = discover_pdf_files(folder);

    if files.is_empty() {
        return Err(IngestError::InvalidArgument(format!(
            "no pdf files found in {}",
            folder.display()
        )));
    }

    files
        .into_iter()
        .map(|path| {
            let name = path
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| IngestError::MissingFileName(path.display().to_string()))?
                .to_string();
            let bytes = fs::read(&path)?;
            Ok(PdfDocument::new(name, bytes))
        })
        .collect()
}

pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone)]
pub struct IngestionReport {
    pub text: String,
    pub documents: Vec<DocumentFingerprint>,
    pub skipped_pages: Vec<SkippedPage>,
}

impl IngestionReport {
    pub fn page_count(&self) -> u32 {
        self.documents.iter().map(|document| document.page_count).sum()
    }
}

/// Extracts every document and joins the page texts in file/page order.
///
/// Any unparseable document fails the whole batch. A page that fails on its
/// own follows `options.page_failure`.
pub fn extract_batch_text(
    documents: &[PdfDocument],
    extractor: &dyn PdfExtractor,
    options: &IngestionOptions,
) -> Result<IngestionReport, IngestError> {
    if documents.is_empty() {
        return Err(IngestError::EmptyDocumentSet);
    }

    let mut page_texts = Vec::new();
    let mut fingerprints = Vec::with_capacity(documents.len());
    let mut skipped_pages = Vec::new();

    for document in documents {
        let extracted = extractor.extract_pages(document)?;

        if let Some(failure) = extracted.failures.first() {
            if options.page_failure == PageFailurePolicy::Abort {
                return Err(IngestError::UnreadableDocument {
                    name: document.name.clone(),
                    reason: format!("page {}: {}", failure.number, failure.reason),
                });
            }
        }

        if extracted.pages.is_empty() {
            return Err(IngestError::UnreadableDocument {
                name: document.name.clone(),
                reason: "no page produced readable text".to_string(),
            });
        }

        skipped_pages.extend(extracted.failures.into_iter().map(|failure| SkippedPage {
            document_title: document.name.clone(),
            page: failure.number,
            reason: failure.reason,
        }));

        fingerprints.push(build_document_fingerprint(document, extracted.page_count));
        page_texts.extend(extracted.pages.into_iter().map(|page| page.text));
    }

    Ok(IngestionReport {
        text: page_texts.join(&options.page_separator),
        documents: fingerprints,
        skipped_pages,
    })
}

fn build_document_fingerprint(document: &PdfDocument, page_count: u32) -> DocumentFingerprint {
    let checksum = digest_bytes(&document.bytes);

    DocumentFingerprint {
        document_id: generate_document_id(&document.name, &checksum),
        document_title: document.name.clone(),
        checksum,
        page_count,
        ingested_at: Utc::now(),
    }
}

fn generate_document_id(name: &str, checksum: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update(checksum.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::{test_pdf, ExtractedPages, LopdfExtractor, PageFailure, PageText};
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::tempdir;

    struct FlakyExtractor;

    impl PdfExtractor for FlakyExtractor {
        fn extract_pages(&self, _document: &PdfDocument) -> Result<ExtractedPages, IngestError> {
            Ok(ExtractedPages {
                page_count: 2,
                pages: vec![PageText {
                    number: 1,
                    text: "kept".to_string(),
                }],
                failures: vec![PageFailure {
                    number: 2,
                    reason: "bad content stream".to_string(),
                }],
            })
        }
    }

    #[test]
    fn discover_pdf_files_is_recursive() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let base = dir.path();
        let nested = base.join("nested");
        fs::create_dir(&nested)?;

        File::create(base.join("a.pdf")).and_then(|mut file| file.write_all(b"%PDF-1.4\n%fake"))?;
        File::create(nested.join("b.PDF"))
            .and_then(|mut file| file.write_all(b"%PDF-1.4\n%fake"))?;
        File::create(base.join("notes.txt"))?;

        let files = discover_pdf_files(base);
        assert_eq!(files.len(), 2);

        let loaded = load_pdf_folder(base)?;
        assert_eq!(loaded[0].name, "a.pdf");
        Ok(())
    }

    #[test]
    fn empty_folder_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        assert!(matches!(
            load_pdf_folder(dir.path()),
            Err(IngestError::InvalidArgument(_))
        ));
        Ok(())
    }

    #[test]
    fn checksum_is_reproducible() {
        assert_eq!(digest_bytes(b"abc"), digest_bytes(b"abc"));
        assert_ne!(digest_bytes(b"abc"), digest_bytes(b"abd"));
    }

    #[test]
    fn empty_batch_is_an_error() {
        let result = extract_batch_text(&[], &LopdfExtractor, &IngestionOptions::default());
        assert!(matches!(result, Err(IngestError::EmptyDocumentSet)));
    }

    #[test]
    fn batch_joins_files_in_order() -> Result<(), Box<dyn std::error::Error>> {
        let documents = vec![
            PdfDocument::new("first.pdf", test_pdf::with_pages(&["One", "Two"])),
            PdfDocument::new("second.pdf", test_pdf::with_pages(&["Three"])),
        ];

        let report = extract_batch_text(&documents, &LopdfExtractor, &IngestionOptions::default())?;

        let one = report.text.find("One").ok_or("missing One")?;
        let two = report.text.find("Two").ok_or("missing Two")?;
        let three = report.text.find("Three").ok_or("missing Three")?;
        assert!(one < two && two < three);
        assert_eq!(report.page_count(), 3);
        assert_eq!(report.documents[1].document_title, "second.pdf");
        Ok(())
    }

    #[test]
    fn one_unreadable_file_fails_the_batch() {
        let documents = vec![
            PdfDocument::new("good.pdf", test_pdf::with_pages(&["fine"])),
            PdfDocument::new("bad.pdf", b"not a pdf".to_vec()),
        ];

        match extract_batch_text(&documents, &LopdfExtractor, &IngestionOptions::default()) {
            Err(IngestError::UnreadableDocument { name, .. }) => assert_eq!(name, "bad.pdf"),
            other => panic!("expected unreadable bad.pdf, got {other:?}"),
        }
    }

    #[test]
    fn page_failures_follow_policy() -> Result<(), Box<dyn std::error::Error>> {
        let documents = vec![PdfDocument::new("flaky.pdf", Vec::new())];

        let aborted = extract_batch_text(&documents, &FlakyExtractor, &IngestionOptions::default());
        assert!(matches!(aborted, Err(IngestError::UnreadableDocument { .. })));

        let options = IngestionOptions {
            page_failure: PageFailurePolicy::SkipAndWarn,
            ..IngestionOptions::default()
        };
        let report = extract_batch_text(&documents, &FlakyExtractor, &options)?;
        assert_eq!(report.text, "kept");
        assert_eq!(report.skipped_pages.len(), 1);
        assert_eq!(report.skipped_pages[0].page, 2);
        Ok(())
    }
}
