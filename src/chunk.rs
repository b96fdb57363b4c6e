//! Fixed-size text chunker with overlap.
//!
//! Splits the document's full text into [`Chunk`]s of at most
//! `chunk_size` characters. Consecutive chunks share exactly `overlap`
//! characters, so a sentence cut at one chunk boundary appears whole in
//! the neighbouring chunk.
//!
//! Sizes are counted in `char`s rather than bytes; a split never lands
//! inside a UTF-8 sequence.
//!
//! # Algorithm
//!
//! 1. Start a window at char offset 0.
//! 2. Emit `text[start .. min(start + chunk_size, len)]`.
//! 3. If the window reached the end of the text, stop.
//! 4. Otherwise the next window starts at `end - overlap`.
//!
//! # Example
//!
//! ```rust
//! use policy_rag::chunk::split_text;
//!
//! let chunks = split_text("abcdefghij", 4, 1).unwrap();
//! let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
//! assert_eq!(texts, ["abcd", "defg", "ghij"]);
//! ```

use anyhow::{bail, Result};

use crate::models::Chunk;

/// Split `text` into overlapping windows of at most `chunk_size` chars.
///
/// Returns chunks with contiguous indices starting at 0. Empty text
/// yields no chunks.
///
/// # Errors
///
/// Returns an error if `chunk_size` is zero or `overlap >= chunk_size`
/// (the window would never advance).
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    if chunk_size == 0 {
        bail!("chunk_size must be > 0");
    }
    if overlap >= chunk_size {
        bail!(
            "chunk overlap ({}) must be smaller than chunk_size ({})",
            overlap,
            chunk_size
        );
    }

    // Byte offset of every char boundary, including the end of the text.
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_len = boundaries.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < char_len {
        let end = (start + chunk_size).min(char_len);
        chunks.push(Chunk {
            index: chunks.len(),
            text: text[boundaries[start]..boundaries[end]].to_string(),
        });
        if end == char_len {
            break;
        }
        start = end - overlap;
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconstruct(chunks: &[Chunk], overlap: usize) -> String {
        let mut out = String::new();
        for (i, c) in chunks.iter().enumerate() {
            if i == 0 {
                out.push_str(&c.text);
            } else {
                out.extend(c.text.chars().skip(overlap));
            }
        }
        out
    }

    #[test]
    fn test_small_text_single_chunk() {
        let chunks = split_text("Hello, world!", 1000, 200).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].text, "Hello, world!");
    }

    #[test]
    fn test_empty_text() {
        assert!(split_text("", 10, 2).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_sizes() {
        assert!(split_text("abc", 0, 0).is_err());
        assert!(split_text("abc", 5, 5).is_err());
        assert!(split_text("abc", 5, 6).is_err());
    }

    #[test]
    fn test_lengths_and_overlap() {
        let text: String = (0..997).map(|i| (b'a' + (i % 26) as u8) as char).collect();
        let (size, overlap) = (100, 30);
        let chunks = split_text(&text, size, overlap).unwrap();

        for c in &chunks {
            assert!(c.text.chars().count() <= size);
            assert!(!c.text.is_empty());
        }
        for pair in chunks.windows(2) {
            let prev: Vec<char> = pair[0].text.chars().collect();
            let next: Vec<char> = pair[1].text.chars().collect();
            assert_eq!(&prev[prev.len() - overlap..], &next[..overlap]);
        }
        assert_eq!(reconstruct(&chunks, overlap), text);
    }

    #[test]
    fn test_reconstruction_various_sizes() {
        let text = "The speed limit on urban roads is 50 km/h unless signposted otherwise. \
                    Heavy vehicles must use the designated freight corridors.";
        for size in 1..40 {
            for overlap in 0..size {
                let chunks = split_text(text, size, overlap).unwrap();
                assert_eq!(
                    reconstruct(&chunks, overlap),
                    text,
                    "size={} overlap={}",
                    size,
                    overlap
                );
            }
        }
    }

    #[test]
    fn test_zero_overlap_partitions_text() {
        let chunks = split_text("abcdefg", 3, 0).unwrap();
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, ["abc", "def", "g"]);
    }

    #[test]
    fn test_multibyte_chars() {
        let text = "Überholverbot für Lkw über 7,5 t — gilt ganztägig.";
        let chunks = split_text(text, 7, 2).unwrap();
        for c in &chunks {
            assert!(c.text.chars().count() <= 7);
        }
        assert_eq!(reconstruct(&chunks, 2), text);
    }

    #[test]
    fn test_chunk_indices_contiguous() {
        let text = "x".repeat(5000);
        let chunks = split_text(&text, 300, 50).unwrap();
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.index, i, "Index mismatch at position {}", i);
        }
    }

    #[test]
    fn test_deterministic() {
        let text = "Alpha\n\nBeta\n\nGamma\n\nDelta";
        let c1 = split_text(text, 6, 2).unwrap();
        let c2 = split_text(text, 6, 2).unwrap();
        assert_eq!(c1, c2);
    }
}
