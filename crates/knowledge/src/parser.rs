//! Source file loading and page extraction.

use docent_core::{AppError, AppResult};
use std::fs;
use std::path::Path;

/// Form feed, the page separator emitted by common PDF-to-text tools.
const PAGE_BREAK: char = '\x0c';

/// Source format classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    PlainText,
    Markdown,
    Pdf,
    Unknown,
}

impl ContentType {
    /// Detect content type from file extension.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("txt") | Some("text") => Self::PlainText,
            Some("md") | Some("markdown") => Self::Markdown,
            Some("pdf") => Self::Pdf,
            _ => Self::Unknown,
        }
    }
}

/// One page of a loaded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// 1-based page number; `None` when the source is not paged
    pub number: Option<u32>,
    pub text: String,
}

/// Load a source file as a sequence of pages.
///
/// PDFs yield one numbered page per PDF page. Text with form-feed
/// separators is split per page; anything else is a single unnumbered page.
pub fn load_document(path: &Path) -> AppResult<Vec<Page>> {
    match ContentType::from_path(path) {
        ContentType::PlainText | ContentType::Markdown => {}
        ContentType::Pdf => return load_pdf(path),
        ContentType::Unknown => {
            return Err(AppError::Knowledge(format!(
                "Unsupported source type: {:?}",
                path
            )))
        }
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Knowledge(format!("Failed to read {:?}: {}", path, e)))?;

    if !is_likely_text(&raw) {
        return Err(AppError::Knowledge(format!(
            "Binary content in {:?} not supported",
            path
        )));
    }

    Ok(split_pages(&raw))
}

fn load_pdf(path: &Path) -> AppResult<Vec<Page>> {
    let bytes = fs::read(path)
        .map_err(|e| AppError::Knowledge(format!("Failed to read {:?}: {}", path, e)))?;

    let pages = pdf_extract::extract_text_from_mem_by_pages(&bytes).map_err(|e| {
        AppError::Knowledge(format!("PDF extraction error in {:?}: {}", path, e))
    })?;

    if pages.iter().all(|p| p.trim().is_empty()) {
        tracing::warn!("{:?} contains no extractable text", path);
    }

    Ok(pages
        .into_iter()
        .enumerate()
        .map(|(i, text)| Page {
            number: Some(i as u32 + 1),
            text,
        })
        .collect())
}

/// Split raw text into pages on form feeds.
pub fn split_pages(text: &str) -> Vec<Page> {
    if !text.contains(PAGE_BREAK) {
        return vec![Page {
            number: None,
            text: text.to_string(),
        }];
    }

    text.split(PAGE_BREAK)
        .enumerate()
        .map(|(i, page)| Page {
            number: Some(i as u32 + 1),
            text: page.to_string(),
        })
        .collect()
}

/// Check if text is likely UTF-8 text (not binary).
fn is_likely_text(data: &str) -> bool {
    !data.contains('\0')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_content_type_detection() {
        assert_eq!(
            ContentType::from_path(Path::new("notes.md")),
            ContentType::Markdown
        );
        assert_eq!(
            ContentType::from_path(Path::new("doc.TXT")),
            ContentType::PlainText
        );
        assert_eq!(
            ContentType::from_path(Path::new("report.pdf")),
            ContentType::Pdf
        );
        assert_eq!(
            ContentType::from_path(Path::new("main.rs")),
            ContentType::Unknown
        );
    }

    #[test]
    fn test_split_pages_unpaged() {
        let pages = split_pages("one page only");
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].number, None);
    }

    #[test]
    fn test_split_pages_form_feed() {
        let pages = split_pages("first\x0csecond\x0cthird");
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].number, Some(1));
        assert_eq!(pages[2].number, Some(3));
        assert_eq!(pages[1].text, "second");
    }

    /// Two pages of Courier text, one sentence each.
    fn two_page_pdf() -> Vec<u8> {
        use lopdf::content::{Content, Operation};
        use lopdf::{dictionary, Document, Object, Stream};

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for sentence in [
            "Paris is the capital of France.",
            "Berlin is the capital of Germany.",
        ] {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(sentence)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            });
            kids.push(page_id.into());
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => 2,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_load_pdf_numbers_pages() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("capitals.pdf");
        fs::write(&path, two_page_pdf()).unwrap();

        let pages = load_document(&path).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].number, Some(1));
        assert_eq!(pages[1].number, Some(2));
        assert!(pages[0].text.contains("capital of France"));
        assert!(pages[1].text.contains("capital of Germany"));
        assert!(!pages[0].text.contains("Germany"));
    }

    #[test]
    fn test_load_pdf_rejects_truncated_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.pdf");
        fs::write(&path, b"%PDF-1.4").unwrap();

        assert!(matches!(load_document(&path), Err(AppError::Knowledge(_))));
    }

    #[test]
    fn test_load_document_rejects_binary() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("blob.txt");
        fs::write(&path, "abc\0def").unwrap();

        assert!(load_document(&path).is_err());
    }
}
