//! Fixed-size chunking with overlap.

/// Split text into chunks of at most `chunk_size` characters, each chunk
/// sharing its last `overlap` characters with the next one's start.
///
/// Boundaries land on char boundaries, never inside a code point. An
/// `overlap >= chunk_size` is treated as `chunk_size / 2` so the window
/// always advances.
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    if text.is_empty() || chunk_size == 0 {
        return Vec::new();
    }
    let overlap = if overlap >= chunk_size {
        chunk_size / 2
    } else {
        overlap
    };
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= chunk_size {
        return vec![text.to_string()];
    }

    let step = chunk_size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = split_text("hello world", 500, 100);
        assert_eq!(chunks, vec!["hello world".to_string()]);
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(split_text("", 500, 100).is_empty());
    }

    #[test]
    fn chunks_respect_size_and_overlap() {
        let text = "abcdefghij".repeat(10); // 100 chars
        let chunks = split_text(&text, 40, 10);
        assert!(chunks.iter().all(|c| c.chars().count() <= 40));
        // each chunk starts 30 chars after the previous one
        for pair in chunks.windows(2) {
            let prev_tail: String = pair[0].chars().skip(30).collect();
            let next_head: String = pair[1].chars().take(10).collect();
            assert_eq!(prev_tail, next_head);
        }
    }

    #[test]
    fn full_text_is_covered() {
        let text = "0123456789".repeat(7); // 70 chars
        let chunks = split_text(&text, 30, 5);
        let last = chunks.last().unwrap();
        assert!(text.ends_with(last.as_str()));
        assert!(text.starts_with(chunks[0].as_str()));
    }

    #[test]
    fn multibyte_text_splits_on_char_boundaries() {
        let text = "héllo wörld ünïcode ".repeat(20);
        let chunks = split_text(&text, 25, 5);
        // collecting chars back proves no code point was torn
        assert!(chunks.iter().all(|c| c.chars().count() <= 25));
        assert!(!chunks.is_empty());
    }

    #[test]
    fn degenerate_overlap_still_advances() {
        let text = "x".repeat(100);
        let chunks = split_text(&text, 10, 10);
        assert!(chunks.len() < 100, "window must advance");
    }

    #[test]
    fn zero_chunk_size_yields_nothing() {
        assert!(split_text("abc", 0, 0).is_empty());
    }
}
