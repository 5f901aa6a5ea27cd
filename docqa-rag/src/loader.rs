//! Discovering PDF files and extracting their per-page text.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::document::Document;
use crate::error::{RagError, Result};

/// Turns a file on disk into a [`Document`] of ordered page texts.
pub trait DocumentLoader: Send + Sync {
    /// Load the document at `path`.
    fn load(&self, path: &Path) -> Result<Document>;
}

/// Whether the path names a PDF file, judged by its extension.
pub fn is_pdf(path: impl AsRef<Path>) -> bool {
    path.as_ref().extension().is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// List the PDF files directly inside `dir`, sorted by path.
///
/// A missing directory yields an empty list.
pub async fn discover_pdfs(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut listing = match tokio::fs::read_dir(dir).await {
        Ok(listing) => listing,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %dir.display(), "documents directory does not exist");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let mut files = Vec::new();
    while let Some(entry) = listing.next_entry().await? {
        let path = entry.path();
        if entry.file_type().await?.is_file() && is_pdf(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// A [`DocumentLoader`] that extracts text from PDFs with `lopdf`.
///
/// Each page's text has trailing whitespace trimmed from its lines. Pages
/// whose text cannot be extracted are logged and left empty so the rest of
/// the document is still usable.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfLoader;

impl PdfLoader {
    /// Create a new `PdfLoader`.
    pub fn new() -> Self {
        Self
    }
}

impl DocumentLoader for PdfLoader {
    fn load(&self, path: &Path) -> Result<Document> {
        let pdf = lopdf::Document::load(path).map_err(|e| RagError::LoaderError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let pages = pdf
            .get_pages()
            .into_keys()
            .map(|page_number| match pdf.extract_text(&[page_number]) {
                Ok(text) => text.lines().map(str::trim_end).collect::<Vec<_>>().join("\n"),
                Err(e) => {
                    warn!(path = %path.display(), page_number, error = %e, "failed to extract page text");
                    String::new()
                }
            })
            .collect::<Vec<_>>();

        debug!(path = %path.display(), page_count = pages.len(), "loaded PDF");
        Ok(Document::new(document_id(path), pages).with_source_uri(path.display().to_string()))
    }
}

/// The document identifier for a path: its file name.
pub fn document_id(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn pdf_extension_is_case_insensitive() {
        assert!(is_pdf("report.pdf"));
        assert!(is_pdf("REPORT.PDF"));
        assert!(!is_pdf("report.pdf.txt"));
        assert!(!is_pdf("pdf"));
    }

    #[tokio::test]
    async fn discovers_only_top_level_pdfs_sorted() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("nested")).unwrap();
        fs::write(root.join("b.pdf"), b"%PDF").unwrap();
        fs::write(root.join("a.PDF"), b"%PDF").unwrap();
        fs::write(root.join("notes.txt"), b"ignore").unwrap();
        fs::write(root.join("nested/c.pdf"), b"%PDF").unwrap();

        let files = discover_pdfs(root).await.unwrap();
        let names: Vec<_> = files.iter().map(|p| document_id(p)).collect();
        assert_eq!(names, vec!["a.PDF", "b.pdf"]);
    }

    #[tokio::test]
    async fn missing_directory_is_empty() {
        let temp = tempfile::tempdir().unwrap();
        assert!(discover_pdfs(temp.path().join("nope")).await.unwrap().is_empty());
    }

    fn write_two_page_pdf(path: &Path, texts: [&str; 2]) {
        use lopdf::content::{Content, Operation};
        use lopdf::{Object, Stream, dictionary};

        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in texts {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![100.into(), 600.into()]),
                    Operation::new("Tj", vec![Object::string_literal(text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => 2,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    #[test]
    fn pdf_pages_are_extracted_in_order() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("handbook.pdf");
        write_two_page_pdf(&path, ["Hello page one", "Second page"]);

        let document = PdfLoader::new().load(&path).unwrap();

        assert_eq!(document.id, "handbook.pdf");
        assert_eq!(document.pages, vec!["Hello page one", "Second page"]);
        assert_eq!(document.text(), "Hello page one\nSecond page");
        assert_eq!(document.source_uri.as_deref(), Some(path.display().to_string().as_str()));
    }

    #[test]
    fn garbage_pdf_is_a_loader_error() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("broken.pdf");
        fs::write(&path, b"not a pdf at all").unwrap();
        let err = PdfLoader::new().load(&path).unwrap_err();
        assert!(matches!(err, RagError::LoaderError { .. }));
    }
}
