//! Text chunking with configurable size and overlap.
//!
//! Sizes are measured in characters. A chunk ends at the last paragraph
//! break inside its window, else the last sentence boundary, else the last
//! whitespace, else a hard cut at the chunk size. The next chunk starts
//! exactly `overlap` characters before the previous end, so chunks cover the
//! text without gaps.

use crate::parser::{self, Page};
use crate::types::DocumentChunk;
use docent_core::config::RagSettings;
use docent_core::{AppError, AppResult};
use std::path::Path;
use unicode_segmentation::UnicodeSegmentation;
use walkdir::WalkDir;

/// Splits documents into overlapping chunks.
#[derive(Debug, Clone)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    /// Create a chunker.
    ///
    /// # Errors
    /// `AppError::Config` when the size is zero or the overlap is not
    /// strictly smaller than the size.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> AppResult<Self> {
        if chunk_size == 0 {
            return Err(AppError::Config("chunk size must be positive".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(AppError::Config(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                chunk_overlap, chunk_size
            )));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn from_settings(settings: &RagSettings) -> AppResult<Self> {
        Self::new(settings.chunk_size, settings.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split an unpaged document.
    pub fn split(&self, text: &str, source: &str) -> Vec<DocumentChunk> {
        self.split_document(
            source,
            &[Page {
                number: None,
                text: text.to_string(),
            }],
        )
    }

    /// Split a document page by page.
    ///
    /// Chunk indices run across the whole document, so ids stay unique when
    /// the document has several pages.
    pub fn split_document(&self, source: &str, pages: &[Page]) -> Vec<DocumentChunk> {
        let mut chunks = Vec::new();

        for page in pages {
            for text in self.segment(&page.text) {
                let index = chunks.len();
                chunks.push(DocumentChunk::new(source, index, page.number, text));
            }
        }

        tracing::debug!(
            "Chunked {} into {} chunks (size: {}, overlap: {})",
            source,
            chunks.len(),
            self.chunk_size,
            self.chunk_overlap
        );

        chunks
    }

    /// Load and chunk every matching file directly inside `dir`.
    ///
    /// Files are visited in file-name order. Unreadable or unsupported files
    /// are skipped with a warning.
    pub fn scan(&self, dir: &Path, extensions: &[String]) -> AppResult<Vec<DocumentChunk>> {
        if !dir.is_dir() {
            return Err(AppError::Knowledge(format!(
                "Data directory not found: {:?}",
                dir
            )));
        }

        let mut chunks = Vec::new();
        let mut files = 0usize;

        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry in {:?}: {}", dir, e);
                    continue;
                }
            };

            let path = entry.path();
            if !entry.file_type().is_file() || !has_extension(path, extensions) {
                continue;
            }

            let source = entry.file_name().to_string_lossy().to_string();
            match parser::load_document(path) {
                Ok(pages) => {
                    chunks.extend(self.split_document(&source, &pages));
                    files += 1;
                }
                Err(e) => tracing::warn!("Skipping {:?}: {}", path, e),
            }
        }

        tracing::info!(
            "Scanned {:?}: {} files, {} chunks",
            dir,
            files,
            chunks.len()
        );

        Ok(chunks)
    }

    fn segment(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = text.chars().collect();
        let sentence_starts = sentence_starts(text);
        let total = chars.len();

        let mut pieces = Vec::new();
        let mut start = 0;

        loop {
            if total - start <= self.chunk_size {
                pieces.push(chars[start..].iter().collect());
                break;
            }

            let limit = start + self.chunk_size;
            // The next start must move forward.
            let floor = start + self.chunk_overlap + 1;
            let end = find_break(&chars, &sentence_starts, floor, limit).unwrap_or(limit);

            pieces.push(chars[start..end].iter().collect());
            start = end - self.chunk_overlap;
        }

        pieces
    }
}

/// Character offsets at which sentences begin.
fn sentence_starts(text: &str) -> Vec<usize> {
    text.split_sentence_bounds()
        .scan(0usize, |pos, sentence| {
            let start = *pos;
            *pos += sentence.chars().count();
            Some(start)
        })
        .collect()
}

/// Best end offset in `floor..=limit`, or `None` for a hard cut.
fn find_break(
    chars: &[char],
    sentence_starts: &[usize],
    floor: usize,
    limit: usize,
) -> Option<usize> {
    let paragraph = (floor.max(2)..=limit)
        .rev()
        .find(|&i| chars[i - 2] == '\n' && chars[i - 1] == '\n');

    paragraph
        .or_else(|| {
            let idx = sentence_starts.partition_point(|&s| s <= limit);
            sentence_starts[..idx]
                .last()
                .copied()
                .filter(|&s| s >= floor)
        })
        .or_else(|| (floor..=limit).rev().find(|&i| chars[i - 1].is_whitespace()))
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };

    extensions
        .iter()
        .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(ext))
}
