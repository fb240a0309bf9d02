use super::html::{html_to_text, is_html_path};
use crate::{Chunk, ChunkMetadata, Result};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::LazyLock;

/// Paragraphs are joined with a blank line inside a chunk
const PARAGRAPH_SEPARATOR: &str = "\n\n";
const PARAGRAPH_SEPARATOR_LEN: usize = 2;

static BLANK_LINE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid blank line regex"));

/// Section headers of 10-K / 10-Q filings, matched at the start of a paragraph only
static SECTION_HEADERS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)^(ITEM\s+\d+[A-Z]?\.?(?:\s*[-–—]?\s*.+?)?)(?:\n|$)",
        r"(?i)^(PART\s+[IVX]+\b\.?(?:\s*[-–—]?\s*.+?)?)(?:\n|$)",
        r"(?i)^(RISK\s+FACTORS)(?:\n|$)",
        r"(?i)^(MANAGEMENT['’]S\s+DISCUSSION(?:\s+AND\s+.+?)?)(?:\n|$)",
        r"(?i)^(FINANCIAL\s+STATEMENTS(?:\s+AND\s+.+?)?)(?:\n|$)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid section header regex"))
    .collect()
});

/// A paragraph of the cleaned document with its char offset
#[derive(Debug, Clone, Copy)]
struct Paragraph<'a> {
    text: &'a str,
    start: usize,
    len: usize,
}

#[derive(Debug, Clone)]
pub struct DocumentChunker {
    chunk_size: usize,
    overlap: usize,
    min_chunk_size: usize,
}

impl Default for DocumentChunker {
    fn default() -> Self {
        Self::new(1000, 200, 100)
    }
}

impl DocumentChunker {
    pub fn new(chunk_size: usize, overlap: usize, min_chunk_size: usize) -> Self {
        Self {
            chunk_size,
            overlap,
            min_chunk_size,
        }
    }

    pub fn from_config(config: &crate::config::ChunkingConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap, config.min_chunk_size)
    }

    /// Split a document into overlapping, section-tagged chunks.
    ///
    /// Chunks never split a paragraph: a paragraph longer than the target
    /// size becomes its own oversized chunk. A trailing chunk shorter than
    /// the minimum size is dropped. A document that fits in one chunk is
    /// returned whole whatever its length.
    pub fn chunk_text(&self, text: &str, metadata: &ChunkMetadata) -> Vec<Chunk> {
        let cleaned = clean_text(text);
        if cleaned.is_empty() {
            tracing::debug!("[CHUNKER] Empty document, nothing to chunk");
            return Vec::new();
        }

        let total_chars = cleaned.chars().count();
        if total_chars <= self.chunk_size {
            let mut chunk_metadata = metadata.clone();
            if let Some(section) = find_section_header(&cleaned) {
                chunk_metadata.section = Some(section);
            }
            return vec![self.create_chunk(cleaned, chunk_metadata, 0, 0, total_chars)];
        }

        let paragraphs = split_into_paragraphs(&cleaned);
        let mut chunks = Vec::new();
        let mut buffer: Vec<Paragraph> = Vec::new();
        let mut buffer_len = 0;
        // Paragraphs in the buffer that were not carried over as overlap
        let mut fresh = 0;
        let mut current_section: Option<String> = None;

        for para in paragraphs {
            let projected = joined_len_with(buffer_len, buffer.is_empty(), para.len);

            if fresh > 0 && projected > self.chunk_size && buffer_len >= self.min_chunk_size {
                chunks.push(self.flush(&buffer, chunks.len(), current_section.as_deref(), metadata));

                buffer = self.overlap_tail(&buffer);
                buffer_len = joined_len(&buffer);
                fresh = 0;
            }

            if let Some(section) = find_section_header(para.text) {
                current_section = Some(section);
            }

            buffer_len = joined_len_with(buffer_len, buffer.is_empty(), para.len);
            buffer.push(para);
            fresh += 1;
        }

        if fresh > 0 {
            if buffer_len >= self.min_chunk_size {
                chunks.push(self.flush(&buffer, chunks.len(), current_section.as_deref(), metadata));
            } else {
                tracing::debug!(
                    "[CHUNKER] Dropping trailing chunk of {} chars (minimum {})",
                    buffer_len,
                    self.min_chunk_size
                );
            }
        }

        tracing::info!(
            "[CHUNKER] Chunked {} chars into {} chunks",
            total_chars,
            chunks.len()
        );

        chunks
    }

    /// Chunk a text or HTML file, tagging chunks with its path and file name
    pub fn chunk_file(&self, file_path: &Path, metadata: &ChunkMetadata) -> Result<Vec<Chunk>> {
        let Some(text) = read_document(file_path)? else {
            return Ok(Vec::new());
        };

        Ok(self.chunk_text(&text, &file_metadata(file_path, metadata)))
    }

    /// Whole trailing paragraphs of a flushed buffer that fit the overlap budget
    fn overlap_tail<'a>(&self, buffer: &[Paragraph<'a>]) -> Vec<Paragraph<'a>> {
        let mut taken = 0;
        let mut overlap_len = 0;

        for para in buffer.iter().rev() {
            let next_len = joined_len_with(overlap_len, taken == 0, para.len);
            if next_len > self.overlap {
                break;
            }
            overlap_len = next_len;
            taken += 1;
        }

        buffer[buffer.len() - taken..].to_vec()
    }

    fn flush(
        &self,
        buffer: &[Paragraph],
        chunk_index: usize,
        section: Option<&str>,
        metadata: &ChunkMetadata,
    ) -> Chunk {
        let content = buffer
            .iter()
            .map(|p| p.text)
            .collect::<Vec<_>>()
            .join(PARAGRAPH_SEPARATOR);

        let start_char = buffer.first().map(|p| p.start).unwrap_or(0);
        let end_char = buffer.last().map(|p| p.start + p.len).unwrap_or(start_char);

        let mut chunk_metadata = metadata.clone();
        if let Some(section) = section {
            chunk_metadata.section = Some(section.to_string());
        }

        self.create_chunk(content, chunk_metadata, chunk_index, start_char, end_char)
    }

    fn create_chunk(
        &self,
        content: String,
        metadata: ChunkMetadata,
        chunk_index: usize,
        start_char: usize,
        end_char: usize,
    ) -> Chunk {
        let mut hasher = Sha256::new();
        hasher.update(metadata.source_key().unwrap_or("").as_bytes());
        hasher.update(b":");
        hasher.update(metadata.form_type.as_deref().unwrap_or("").as_bytes());
        hasher.update(b":");
        hasher.update(chunk_index.to_string().as_bytes());
        hasher.update(b":");
        hasher.update(start_char.to_string().as_bytes());
        hasher.update(b":");
        hasher.update(end_char.to_string().as_bytes());
        hasher.update(b":");
        hasher.update(content.as_bytes());
        let id = format!("{:x}", hasher.finalize());

        Chunk {
            id,
            content,
            metadata,
            chunk_index,
            start_char,
            end_char,
        }
    }
}

/// Text of a filing on disk; HTML files are reduced to their visible text.
///
/// Returns `None` when the file does not exist.
pub fn read_document(file_path: &Path) -> Result<Option<String>> {
    if !file_path.exists() {
        tracing::error!("[CHUNKER] File not found: {}", file_path.display());
        return Ok(None);
    }

    let bytes = std::fs::read(file_path)?;
    let raw = String::from_utf8_lossy(&bytes);

    if is_html_path(file_path) {
        let text = html_to_text(&raw);
        tracing::debug!(
            "[CHUNKER] Extracted {} chars of text from {} bytes of HTML",
            text.chars().count(),
            bytes.len()
        );
        Ok(Some(text))
    } else {
        Ok(Some(raw.into_owned()))
    }
}

/// Document metadata plus the file's path and name
pub fn file_metadata(file_path: &Path, metadata: &ChunkMetadata) -> ChunkMetadata {
    let mut file_metadata = metadata.clone();
    file_metadata.source = Some(file_path.to_string_lossy().to_string());
    file_metadata.filename = file_path
        .file_name()
        .map(|name| name.to_string_lossy().to_string());
    file_metadata
}

/// Normalize filing text.
///
/// Runs of spaces and tabs collapse to one space, lines holding only a page
/// number are dropped, and three or more newlines collapse to a blank line.
/// Line structure is kept so paragraph boundaries survive.
pub fn clean_text(text: &str) -> String {
    let lines: Vec<String> = text
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !is_page_number(line))
        .collect();

    let joined = lines.join("\n");
    BLANK_LINE_RUNS
        .replace_all(&joined, PARAGRAPH_SEPARATOR)
        .trim()
        .to_string()
}

fn is_page_number(line: &str) -> bool {
    !line.is_empty() && line.chars().all(|c| c.is_ascii_digit())
}

/// Section header at the very start of a paragraph, if any.
///
/// A header that does not open its own line is not detected.
pub fn find_section_header(text: &str) -> Option<String> {
    SECTION_HEADERS.iter().find_map(|pattern| {
        pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
    })
}

fn split_into_paragraphs(cleaned: &str) -> Vec<Paragraph<'_>> {
    let mut paragraphs = Vec::new();
    let mut cursor = 0;

    for raw in cleaned.split(PARAGRAPH_SEPARATOR) {
        let len = raw.chars().count();
        if !raw.trim().is_empty() {
            paragraphs.push(Paragraph {
                text: raw,
                start: cursor,
                len,
            });
        }
        cursor += len + PARAGRAPH_SEPARATOR_LEN;
    }

    paragraphs
}

fn joined_len(paragraphs: &[Paragraph]) -> usize {
    paragraphs
        .iter()
        .fold(0, |acc, p| joined_len_with(acc, acc == 0, p.len))
}

fn joined_len_with(current: usize, is_empty: bool, para_len: usize) -> usize {
    if is_empty {
        para_len
    } else {
        current + PARAGRAPH_SEPARATOR_LEN + para_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn char_slice(text: &str, start: usize, end: usize) -> String {
        text.chars().skip(start).take(end - start).collect()
    }

    fn filing_metadata() -> ChunkMetadata {
        ChunkMetadata::for_filing("nvda", "10-K")
    }

    #[test]
    fn test_clean_text() {
        let raw = "Net   sales\tincreased.\n\n\n\n12\n\nThe   company  grew.\n  \n";
        assert_eq!(clean_text(raw), "Net sales increased.\n\nThe company grew.");
    }

    #[test]
    fn test_empty_document_yields_no_chunks() {
        let chunker = DocumentChunker::default();
        assert!(chunker.chunk_text("", &filing_metadata()).is_empty());
        assert!(chunker.chunk_text("   \n\n\t  ", &filing_metadata()).is_empty());
    }

    #[test]
    fn test_short_document_single_chunk() {
        let chunker = DocumentChunker::new(1000, 200, 100);
        let chunks = chunker.chunk_text("Short filing.\n\nTwo paragraphs.", &filing_metadata());

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start_char, 0);
        assert_eq!(chunks[0].end_char, chunks[0].content.chars().count());
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].metadata.ticker.as_deref(), Some("NVDA"));
    }

    #[test]
    fn test_chunking_is_deterministic() {
        let chunker = DocumentChunker::new(120, 40, 10);
        let text = (0..20)
            .map(|i| format!("Paragraph number {i} talks about operations in some detail."))
            .collect::<Vec<_>>()
            .join("\n\n");

        let first = chunker.chunk_text(&text, &filing_metadata());
        let second = chunker.chunk_text(&text, &filing_metadata());
        assert!(first.len() > 1);
        assert_eq!(first, second);
    }

    #[test]
    fn test_overlap_carries_whole_trailing_paragraphs() {
        let chunker = DocumentChunker::new(100, 40, 10);
        let text = format!("{}\n\n{}\n\n{}", "a".repeat(50), "b".repeat(30), "c".repeat(60));

        let chunks = chunker.chunk_text(&text, &filing_metadata());

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, format!("{}\n\n{}", "a".repeat(50), "b".repeat(30)));
        assert_eq!((chunks[0].start_char, chunks[0].end_char), (0, 82));
        assert_eq!(chunks[1].content, format!("{}\n\n{}", "b".repeat(30), "c".repeat(60)));
        assert_eq!((chunks[1].start_char, chunks[1].end_char), (52, 144));
    }

    #[test]
    fn test_offsets_cover_cleaned_text() {
        let chunker = DocumentChunker::new(200, 60, 20);
        let text = (0..30)
            .map(|i| format!("Segment {i} reports  results for the   quarter.\n{}", "x".repeat(i * 3)))
            .collect::<Vec<_>>()
            .join("\n\n\n");
        let cleaned = clean_text(&text);

        let chunks = chunker.chunk_text(&text, &filing_metadata());
        assert!(chunks.len() > 3);
        assert_eq!(chunks[0].start_char, 0);

        for chunk in &chunks {
            assert_eq!(char_slice(&cleaned, chunk.start_char, chunk.end_char), chunk.content);
        }

        for pair in chunks.windows(2) {
            // Overlap only looks backwards and never leaves a gap
            assert!(pair[1].start_char <= pair[0].end_char + PARAGRAPH_SEPARATOR_LEN);
            assert!(pair[1].start_char > pair[0].start_char);
            assert!(pair[1].end_char > pair[0].end_char);
        }
    }

    #[test]
    fn test_oversized_paragraph_is_not_split() {
        let chunker = DocumentChunker::new(100, 20, 10);
        let text = format!("{}\n\n{}\n\n{}", "a".repeat(60), "b".repeat(250), "c".repeat(60));

        let chunks = chunker.chunk_text(&text, &filing_metadata());

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].content, "b".repeat(250));
    }

    #[test]
    fn test_trailing_short_chunk_is_dropped() {
        let chunker = DocumentChunker::new(100, 0, 50);
        let text = format!("{}\n\n{}\n\n{}", "a".repeat(60), "b".repeat(95), "c".repeat(10));

        let chunks = chunker.chunk_text(&text, &filing_metadata());

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].content, "b".repeat(95));
        assert!(chunks.iter().all(|c| !c.content.contains('c')));
    }

    #[test]
    fn test_section_headers_tag_chunks() {
        let chunker = DocumentChunker::new(400, 50, 10);
        let text = [
            "PART I".to_string(),
            "ITEM 1. BUSINESS".to_string(),
            "x".repeat(300),
            "ITEM 1A. RISK FACTORS".to_string(),
            "y".repeat(300),
            "z".repeat(300),
        ]
        .join("\n\n");

        let chunks = chunker.chunk_text(&text, &filing_metadata());

        assert_eq!(chunks.len(), 3);
        assert!(chunks[1].content.starts_with("ITEM 1A. RISK FACTORS"));
        assert_eq!(chunks[1].metadata.section.as_deref(), Some("ITEM 1A. RISK FACTORS"));
        assert_eq!(chunks[2].metadata.section.as_deref(), Some("ITEM 1A. RISK FACTORS"));
    }

    #[test]
    fn test_header_applies_to_following_chunks_only() {
        let chunker = DocumentChunker::new(400, 50, 10);
        let text = [
            "ITEM 1. BUSINESS".to_string(),
            "x".repeat(380),
            "ITEM 7. MANAGEMENT'S DISCUSSION AND ANALYSIS".to_string(),
            "w".repeat(300),
        ]
        .join("\n\n");

        let chunks = chunker.chunk_text(&text, &filing_metadata());

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].metadata.section.as_deref(), Some("ITEM 1. BUSINESS"));
        assert_eq!(
            chunks[1].metadata.section.as_deref(),
            Some("ITEM 7. MANAGEMENT'S DISCUSSION AND ANALYSIS")
        );
    }

    #[test]
    fn test_find_section_header() {
        assert_eq!(
            find_section_header("ITEM 1A. RISK FACTORS").as_deref(),
            Some("ITEM 1A. RISK FACTORS")
        );
        assert_eq!(
            find_section_header("Item 7. Management's Discussion and Analysis").as_deref(),
            Some("Item 7. Management's Discussion and Analysis")
        );
        assert_eq!(find_section_header("PART II").as_deref(), Some("PART II"));
        assert_eq!(find_section_header("RISK FACTORS").as_deref(), Some("RISK FACTORS"));
        assert_eq!(
            find_section_header("FINANCIAL STATEMENTS AND SUPPLEMENTARY DATA").as_deref(),
            Some("FINANCIAL STATEMENTS AND SUPPLEMENTARY DATA")
        );
        assert_eq!(
            find_section_header("ITEM 1A. RISK FACTORS\nOur business depends on...").as_deref(),
            Some("ITEM 1A. RISK FACTORS")
        );
    }

    #[test]
    fn test_inline_header_is_missed() {
        // Only a paragraph's opening line is inspected
        assert_eq!(find_section_header("As described in ITEM 1A. RISK FACTORS, we face..."), None);
        assert_eq!(find_section_header("Risk factors include rising costs."), None);
    }

    #[test]
    fn test_chunk_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nvda-10k.txt");
        std::fs::write(&path, "ITEM 1. BUSINESS\n\nWe design graphics processors.").unwrap();

        let chunker = DocumentChunker::default();
        let chunks = chunker.chunk_file(&path, &ChunkMetadata::default()).unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].metadata.filename.as_deref(), Some("nvda-10k.txt"));
        assert_eq!(chunks[0].metadata.section.as_deref(), Some("ITEM 1. BUSINESS"));

        let missing = chunker
            .chunk_file(&dir.path().join("missing.txt"), &ChunkMetadata::default())
            .unwrap();
        assert!(missing.is_empty());
    }

    #[test]
    fn test_chunk_html_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nvda-20240128.htm");
        std::fs::write(
            &path,
            "<html><body><div><b>ITEM 1. BUSINESS</b></div>\
             <p>We design <i>graphics</i> processors.</p></body></html>",
        )
        .unwrap();

        let chunks = DocumentChunker::default()
            .chunk_file(&path, &ChunkMetadata::default())
            .unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "ITEM 1. BUSINESS\n\nWe design graphics processors.");
        assert_eq!(chunks[0].metadata.section.as_deref(), Some("ITEM 1. BUSINESS"));
    }

    #[test]
    fn test_chunk_ids_depend_on_content() {
        let chunker = DocumentChunker::default();
        let metadata = ChunkMetadata::default();

        let first = chunker.chunk_text("Revenue grew in the quarter.", &metadata);
        let second = chunker.chunk_text("Margins fell in the quarter.", &metadata);

        // same offsets, no source key
        assert_eq!(first[0].end_char, second[0].end_char);
        assert_ne!(first[0].id, second[0].id);
    }
}
