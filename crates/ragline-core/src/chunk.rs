//! Sliding-window text chunker.
//!
//! Splits document text into fixed-size, overlapping windows. The window
//! never looks at sentence, paragraph, or token boundaries: it is a pure
//! function of `(text, size, overlap)`, which is what makes a rebuild over
//! unchanged documents reproduce the same rows.
//!
//! # Algorithm
//!
//! 1. Start at offset 0.
//! 2. Emit `text[offset .. offset + size]` (the last window may be shorter).
//! 3. Advance `offset` by `size - overlap`.
//! 4. Stop once `offset >= len(text)`.
//!
//! Sizes and offsets are measured in `char`s, so a window never splits a
//! multi-byte UTF-8 sequence.
//!
//! # Example
//!
//! ```rust
//! use ragline_core::chunk::chunk_text;
//!
//! let windows = chunk_text("abcdefghij", 4, 1).unwrap();
//! assert_eq!(windows, vec!["abcd", "defg", "ghij", "j"]);
//! ```

use anyhow::{bail, Result};

use crate::models::{Chunk, Document};

/// Default window size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default overlap between consecutive windows in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Split `text` into overlapping windows of `size` chars.
///
/// # Errors
///
/// Returns an error unless `overlap < size` (which also rules out `size == 0`).
///
/// # Guarantees
///
/// - Text shorter than `size` yields exactly one window equal to the text.
/// - Empty text yields no windows.
/// - The window count is `ceil(len / (size - overlap))`.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Result<Vec<String>> {
    validate_window(size, overlap)?;

    // Byte offset of every char, plus the end of the string, so windows can be
    // sliced without re-walking the text.
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_len = boundaries.len() - 1;
    let step = size - overlap;

    let mut windows = Vec::with_capacity(char_len.div_ceil(step));
    let mut offset = 0;
    while offset < char_len {
        let end = (offset + size).min(char_len);
        windows.push(text[boundaries[offset]..boundaries[end]].to_string());
        offset += step;
    }

    Ok(windows)
}

/// Chunk a [`Document`] into [`Chunk`]s carrying its provenance.
///
/// Chunk indices are contiguous, starting at 0, in window order.
pub fn chunk_document(doc: &Document, size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    let source = doc.source();
    Ok(chunk_text(&doc.content, size, overlap)?
        .into_iter()
        .enumerate()
        .map(|(chunk_index, text)| Chunk {
            text,
            source_path: source.clone(),
            chunk_index,
        })
        .collect())
}

/// Check the window precondition `0 <= overlap < size`.
pub fn validate_window(size: usize, overlap: usize) -> Result<()> {
    if size == 0 {
        bail!("chunk size must be > 0");
    }
    if overlap >= size {
        bail!(
            "chunk overlap ({}) must be smaller than chunk size ({})",
            overlap,
            size
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    /// Undo the overlap: the first window whole, then each later window
    /// without its leading `overlap` chars.
    fn reconstruct(windows: &[String], overlap: usize) -> String {
        let mut out = String::new();
        for (i, w) in windows.iter().enumerate() {
            if i == 0 {
                out.push_str(w);
            } else {
                out.extend(w.chars().skip(overlap));
            }
        }
        out
    }

    fn sample_text(len: usize) -> String {
        "The quick brown fox jumps over the lazy dog. "
            .chars()
            .cycle()
            .take(len)
            .collect()
    }

    #[test]
    fn test_short_text_single_chunk() {
        let windows = chunk_text("Hello, world!", 1000, 200).unwrap();
        assert_eq!(windows, vec!["Hello, world!".to_string()]);
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        assert!(chunk_text("", 1000, 200).unwrap().is_empty());
    }

    #[test]
    fn test_default_window_on_2500_chars() {
        let text = sample_text(2500);
        let windows = chunk_text(&text, DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP).unwrap();
        assert_eq!(windows.len(), 4);
        assert_eq!(windows[0].chars().count(), 1000);
        assert_eq!(windows[1].chars().count(), 1000);
        assert_eq!(windows[2].chars().count(), 900);
        assert_eq!(windows[3].chars().count(), 100);
        assert_eq!(windows[2], text[1600..2500]);
    }

    #[test]
    fn test_consecutive_windows_share_overlap() {
        let text = sample_text(3000);
        let windows = chunk_text(&text, 1000, 200).unwrap();
        for pair in windows.windows(2) {
            let tail: String = pair[0].chars().skip(800).collect();
            let head: String = pair[1].chars().take(tail.chars().count()).collect();
            assert_eq!(tail, head);
        }
    }

    #[test]
    fn test_coverage_reconstructs_text() {
        let text = sample_text(4321);
        for (size, overlap) in [(1000, 200), (100, 0), (7, 3), (50, 49), (1, 0)] {
            let windows = chunk_text(&text, size, overlap).unwrap();
            assert_eq!(
                reconstruct(&windows, overlap),
                text,
                "size={} overlap={}",
                size,
                overlap
            );
        }
    }

    #[test]
    fn test_chunk_count_formula() {
        for len in [1usize, 799, 800, 801, 1000, 2500, 9999] {
            let text = sample_text(len);
            let windows = chunk_text(&text, 1000, 200).unwrap();
            assert_eq!(windows.len(), len.div_ceil(800), "len={}", len);
        }
    }

    #[test]
    fn test_multibyte_chars_counted_as_chars() {
        let text = "┌─é─┐ 日本語のテキスト 🦀🦀🦀";
        let windows = chunk_text(text, 5, 2).unwrap();
        assert!(windows.iter().all(|w| w.chars().count() <= 5));
        assert_eq!(reconstruct(&windows, 2), text);
    }

    #[test]
    fn test_invalid_window_rejected() {
        assert!(chunk_text("abc", 0, 0).is_err());
        assert!(chunk_text("abc", 10, 10).is_err());
        assert!(chunk_text("abc", 10, 11).is_err());
    }

    #[test]
    fn test_deterministic() {
        let text = sample_text(5000);
        assert_eq!(
            chunk_text(&text, 300, 40).unwrap(),
            chunk_text(&text, 300, 40).unwrap()
        );
    }

    #[test]
    fn test_chunk_document_provenance() {
        let doc = Document {
            path: PathBuf::from("notes/alpha.md"),
            content: sample_text(2500),
            extension: ".md".to_string(),
        };
        let chunks = chunk_document(&doc, 1000, 200).unwrap();
        assert_eq!(chunks.len(), 4);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i);
            assert_eq!(c.source_path, "notes/alpha.md");
        }
    }
}
