use crate::chunk::Chunk;

#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    pub chunk_chars: usize,
    /// Overlap between neighbors; prevents context loss at boundaries.
    pub overlap_chars: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_chars: 1000,
            overlap_chars: 200,
        }
    }
}

/// Deterministic sliding-window chunker.
///
/// Windows are `chunk_chars` characters long and start `chunk_chars -
/// overlap_chars` characters apart; the final window may be shorter. All
/// offsets are measured in characters, never bytes, so multibyte text
/// chunks identically to ASCII.
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Self {
        assert!(
            config.overlap_chars < config.chunk_chars,
            "overlap must be smaller than the chunk size"
        );
        Self { config }
    }

    pub fn chunk_text(&self, doc_id: &str, text: &str) -> Vec<Chunk> {
        let stride = self.config.chunk_chars - self.config.overlap_chars;

        // Byte offset of every char boundary, plus the end of the string.
        let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        boundaries.push(text.len());
        let total_chars = boundaries.len() - 1;

        let mut chunks = Vec::new();
        let mut start = 0;
        let mut seq = 0;
        while start < total_chars {
            let end = (start + self.config.chunk_chars).min(total_chars);
            let slice = &text[boundaries[start]..boundaries[end]];
            chunks.push(Chunk::new(doc_id, seq, slice.to_string()));
            start += stride;
            seq += 1;
        }
        chunks
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(ChunkerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk_counts(len: usize) -> usize {
        let text = "a".repeat(len);
        Chunker::default().chunk_text("doc", &text).len()
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert_eq!(chunk_counts(0), 0);
    }

    #[test]
    fn count_matches_sliding_window_steps() {
        // Windows of 1000 starting every 800 chars, while start < length.
        assert_eq!(chunk_counts(1), 1);
        assert_eq!(chunk_counts(800), 1);
        assert_eq!(chunk_counts(801), 2);
        assert_eq!(chunk_counts(1000), 2);
        assert_eq!(chunk_counts(1600), 2);
        assert_eq!(chunk_counts(1601), 3);
        assert_eq!(chunk_counts(2400), 3);
    }

    #[test]
    fn boundaries_overlap_by_200_chars() {
        let text: String = (0..2500).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let chunks = Chunker::default().chunk_text("doc", &text);

        assert_eq!(chunks[0].text.chars().count(), 1000);
        for pair in chunks.windows(2) {
            let tail: String = pair[0].text.chars().skip(800).collect();
            let head: String = pair[1].text.chars().take(tail.chars().count()).collect();
            assert_eq!(tail, head);
        }
        // Last chunk covers the remainder: 2500 - 2*800 = 900 chars.
        assert_eq!(chunks.last().unwrap().text.chars().count(), 900);
    }

    #[test]
    fn ids_are_doc_scoped_and_sequential() {
        let text = "x".repeat(1700);
        let chunks = Chunker::default().chunk_text("report.pdf", &text);
        let ids: Vec<_> = chunks.iter().map(|c| c.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["report.pdf_0", "report.pdf_1", "report.pdf_2"]);
        assert!(chunks.iter().all(|c| c.doc_id == "report.pdf"));
    }

    #[test]
    fn chunking_is_deterministic() {
        let text: String = "Lorem ipsum dolor sit amet. ".repeat(100);
        let chunker = Chunker::default();
        assert_eq!(
            chunker.chunk_text("doc", &text),
            chunker.chunk_text("doc", &text)
        );
    }

    #[test]
    fn multibyte_text_does_not_split_codepoints() {
        let text = "héllo wörld ".repeat(200);
        let chunks = Chunker::default().chunk_text("doc", &text);
        assert!(!chunks.is_empty());
        let rejoined_chars: usize = chunks
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let count = c.text.chars().count();
                if i + 1 == chunks.len() { count } else { count.min(800) }
            })
            .sum();
        assert_eq!(rejoined_chars, text.chars().count());
    }
}
