use crate::error::IngestError;
use crate::models::{IngestionOptions, TextChunk};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, IngestError> {
        let config = Self {
            chunk_size,
            overlap,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), IngestError> {
        if self.chunk_size == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk size must be at least 1".to_string(),
            ));
        }
        if self.overlap >= self.chunk_size {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap {} must be smaller than chunk size {}",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }

    fn stride(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

impl From<&IngestionOptions> for ChunkingConfig {
    fn from(value: &IngestionOptions) -> Self {
        Self {
            chunk_size: value.chunk_size,
            overlap: value.chunk_overlap,
        }
    }
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('\u{a0}', " ")
}

/// Slides a `chunk_size` window over `text` in steps of `chunk_size - overlap`.
///
/// Every chunk but the last is exactly `chunk_size` chars, so neighbours share
/// exactly `overlap` chars. Returns the chunks with their start offsets.
pub fn sliding_window(
    text: &str,
    config: ChunkingConfig,
) -> Result<Vec<(usize, String)>, IngestError> {
    config.validate()?;

    let chars: Vec<char> = text.chars().collect();
    let mut windows = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + config.chunk_size).min(chars.len());
        windows.push((start, chars[start..end].iter().collect()));
        if end == chars.len() {
            break;
        }
        start += config.stride();
    }

    Ok(windows)
}

pub fn split_text(text: &str, config: ChunkingConfig) -> Result<Vec<String>, IngestError> {
    Ok(sliding_window(text, config)?
        .into_iter()
        .map(|(_, piece)| piece)
        .collect())
}

pub fn build_chunks(text: &str, config: ChunkingConfig) -> Result<Vec<TextChunk>, IngestError> {
    Ok(sliding_window(text, config)?
        .into_iter()
        .enumerate()
        .map(|(position, (start, piece))| TextChunk {
            chunk_id: make_chunk_id(position, start, &piece),
            position,
            start,
            text: piece,
        })
        .collect())
}

/// Inverse of [`split_text`]: drops the leading `overlap` chars of every chunk
/// after the first and concatenates the rest.
pub fn merge_chunks<S: AsRef<str>>(chunks: &[S], overlap: usize) -> String {
    let mut merged = String::new();
    for (index, chunk) in chunks.iter().enumerate() {
        let chunk = chunk.as_ref();
        if index == 0 {
            merged.push_str(chunk);
        } else {
            merged.extend(chunk.chars().skip(overlap));
        }
    }
    merged
}

fn make_chunk_id(position: usize, start: usize, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update((position as u64).to_le_bytes());
    hasher.update((start as u64).to_le_bytes());
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Retrieval needs chunks: the quick brown fox jumps over the lazy dog, \
        and then the dog wakes up. Überraschung für alle — naïve café résumé.";

    fn overlap_of(left: &str, right: &str, overlap: usize) -> bool {
        let tail: String = left.chars().skip(left.chars().count() - overlap).collect();
        let head: String = right.chars().take(overlap).collect();
        tail == head
    }

    #[test]
    fn whitespace_is_normalized() {
        let input = "A  \t  lot\nof   spacing";
        let normalized = normalize_whitespace(input);
        assert_eq!(normalized, "A lot of spacing");
    }

    #[test]
    fn splits_on_fixed_windows_without_overlap() -> Result<(), IngestError> {
        let chunks = split_text("AAAA BBBB CCCC", ChunkingConfig::new(5, 0)?)?;
        assert_eq!(chunks, vec!["AAAA ", "BBBB ", "CCCC"]);
        Ok(())
    }

    #[test]
    fn short_text_is_a_single_chunk() -> Result<(), IngestError> {
        let config = ChunkingConfig::new(1000, 100)?;
        assert_eq!(split_text("tiny", config)?, vec!["tiny"]);
        assert_eq!(split_text(&"x".repeat(1000), config)?.len(), 1);
        assert!(split_text("", config)?.is_empty());
        Ok(())
    }

    #[test]
    fn chunks_respect_size_and_overlap_for_every_config() -> Result<(), IngestError> {
        for size in 1..=12 {
            for overlap in 0..size {
                let config = ChunkingConfig::new(size, overlap)?;
                let chunks = split_text(SAMPLE, config)?;

                assert!(chunks.iter().all(|chunk| chunk.chars().count() <= size));
                for pair in chunks.windows(2) {
                    assert!(
                        overlap_of(&pair[0], &pair[1], overlap),
                        "size={size} overlap={overlap} pair={pair:?}"
                    );
                }
                assert_eq!(merge_chunks(&chunks, overlap), SAMPLE);
            }
        }
        Ok(())
    }

    #[test]
    fn invalid_configs_are_rejected() {
        assert!(matches!(
            ChunkingConfig::new(0, 0),
            Err(IngestError::InvalidChunkConfig(_))
        ));
        assert!(matches!(
            ChunkingConfig::new(10, 10),
            Err(IngestError::InvalidChunkConfig(_))
        ));
    }

    #[test]
    fn chunk_ids_and_positions_are_stable() -> Result<(), IngestError> {
        let config = ChunkingConfig::new(20, 5)?;
        let first = build_chunks(SAMPLE, config)?;
        let second = build_chunks(SAMPLE, config)?;

        assert_eq!(first, second);
        for (index, chunk) in first.iter().enumerate() {
            assert_eq!(chunk.position, index);
            assert_eq!(chunk.start, index * 15);
        }
        Ok(())
    }
}
