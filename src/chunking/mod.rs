//! Section-aware chunking of regulatory filings

pub mod html;
pub mod splitter;

pub use html::{html_to_text, is_html_path};
pub use splitter::{clean_text, file_metadata, find_section_header, read_document, DocumentChunker};
