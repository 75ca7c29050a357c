/// Transcript text normalization, chunking and timestamp extraction

pub mod chunker;
pub mod timestamps;

pub use chunker::{chunk_text, clean, TextChunker, BOUNDARY_WINDOW};
pub use timestamps::{extract_timestamps, TimestampedText};
