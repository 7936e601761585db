//! Fixed-window text splitter

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScholarError};
use crate::sources::{Document, DocumentMetadata};

/// A fragment of a document, the unit that gets embedded and retrieved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub metadata: DocumentMetadata,
    /// Position of this chunk within its document
    pub chunk_index: usize,
}

/// Splits text into overlapping character windows.
///
/// Windows advance by `chunk_size - chunk_overlap` characters, so every chunk
/// is at most `chunk_size` long, neighbours share exactly `chunk_overlap`
/// characters and only the last chunk may be shorter.
#[derive(Debug, Clone, Copy)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(ScholarError::Configuration(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(ScholarError::Configuration(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split raw text. Empty or whitespace-only text yields no chunks.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = text.chars().collect();
        let stride = self.chunk_size - self.chunk_overlap;
        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            let end = (start + self.chunk_size).min(chars.len());
            chunks.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += stride;
        }

        chunks
    }

    /// Split every document, tagging chunks with their source metadata
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        documents
            .iter()
            .flat_map(|doc| {
                self.split_text(&doc.content)
                    .into_iter()
                    .enumerate()
                    .map(move |(chunk_index, content)| Chunk {
                        content,
                        metadata: doc.metadata.clone(),
                        chunk_index,
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_window_properties(splitter: &TextSplitter, text: &str) {
        let chunks = splitter.split_text(text);
        let size = splitter.chunk_size();
        let overlap = splitter.chunk_overlap();

        for (i, chunk) in chunks.iter().enumerate() {
            let len = chunk.chars().count();
            assert!(len <= size, "chunk {} has {} chars", i, len);
            if i + 1 < chunks.len() {
                assert_eq!(len, size, "only the last chunk may be short");
                let tail: String = chunk.chars().skip(size - overlap).collect();
                let head: String = chunks[i + 1].chars().take(overlap).collect();
                assert_eq!(tail, head, "overlap between {} and {}", i, i + 1);
            }
        }

        let rebuilt: String = chunks
            .iter()
            .enumerate()
            .map(|(i, c)| {
                if i == 0 {
                    c.clone()
                } else {
                    c.chars().skip(overlap).collect()
                }
            })
            .collect();
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_rejects_bad_overlap() {
        assert!(TextSplitter::new(100, 100).is_err());
        assert!(TextSplitter::new(0, 0).is_err());
        assert!(TextSplitter::new(100, 99).is_ok());
    }

    #[test]
    fn test_short_and_empty_text() {
        let splitter = TextSplitter::new(1000, 200).unwrap();
        assert_eq!(splitter.split_text("short text"), vec!["short text"]);
        assert!(splitter.split_text("").is_empty());
        assert!(splitter.split_text(" \n\t ").is_empty());
    }

    #[test]
    fn test_window_properties_hold() {
        let text: String = (0..2600)
            .map(|i| char::from(b'a' + (i % 26) as u8))
            .collect();

        for (size, overlap) in [(1000, 200), (100, 0), (7, 3), (10, 9)] {
            let splitter = TextSplitter::new(size, overlap).unwrap();
            assert_window_properties(&splitter, &text);
        }
    }

    #[test]
    fn test_multibyte_characters() {
        let splitter = TextSplitter::new(4, 1).unwrap();
        let text = "αβγδεζηθ";
        let chunks = splitter.split_text(text);
        assert_eq!(chunks, vec!["αβγδ", "δεζη", "ηθ"]);
        assert_window_properties(&splitter, text);
    }

    #[test]
    fn test_split_documents_keeps_metadata() {
        let splitter = TextSplitter::new(10, 2).unwrap();
        let doc = Document::from_metadata(DocumentMetadata {
            entry_id: "http://arxiv.org/abs/1".to_string(),
            title: "Title".to_string(),
            authors: vec![],
            published: None,
            summary: "a summary that is long enough".to_string(),
            pdf_url: None,
        });

        let chunks = splitter.split_documents(&[doc]);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.metadata.entry_id == "http://arxiv.org/abs/1"));
        assert_eq!(chunks[1].chunk_index, 1);
    }
}
