use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A PDF exactly as the user supplied it.
#[derive(Debug, Clone)]
pub struct PdfDocument {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl PdfDocument {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFingerprint {
    pub document_id: String,
    pub document_title: String,
    pub checksum: String,
    pub page_count: u32,
    pub ingested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkippedPage {
    pub document_title: String,
    pub page: u32,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextChunk {
    pub chunk_id: String,
    pub position: usize,
    /// Offset of the first character within the concatenated text, in chars.
    pub start: usize,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedChunk {
    pub chunk: TextChunk,
    /// Higher is closer. Under the L2 metric this is the negated distance.
    pub score: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatTurn {
    pub speaker: Speaker,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Running dialogue of one session. Turns are only ever appended in
/// user/assistant pairs, so the sequence always alternates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationState {
    turns: Vec<ChatTurn>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_exchange(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        let at = Utc::now();
        self.turns.push(ChatTurn {
            speaker: Speaker::User,
            message: question.into(),
            at,
        });
        self.turns.push(ChatTurn {
            speaker: Speaker::Assistant,
            message: answer.into(),
            at,
        });
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Number of completed question/answer pairs.
    pub fn exchanges(&self) -> usize {
        self.turns.len() / 2
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub standalone_question: String,
    pub sources: Vec<RetrievedChunk>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessSummary {
    pub documents: Vec<DocumentFingerprint>,
    pub page_count: u32,
    pub chunk_count: usize,
    pub dimensions: usize,
    pub similarity: SimilarityMetric,
    pub skipped_pages: Vec<SkippedPage>,
    pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PageFailurePolicy {
    #[default]
    Abort,
    SkipAndWarn,
}

impl FromStr for PageFailurePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "skip" | "skip-and-warn" | "skip_and_warn" => Ok(Self::SkipAndWarn),
            other => Err(format!("unknown page failure policy '{other}'; use abort or skip")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMetric {
    #[default]
    L2,
    Cosine,
}

impl FromStr for SimilarityMetric {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "l2" | "euclidean" => Ok(Self::L2),
            "cosine" => Ok(Self::Cosine),
            other => Err(format!("unknown similarity metric '{other}'; use l2 or cosine")),
        }
    }
}

impl fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimilarityMetric::L2 => f.write_str("l2"),
            SimilarityMetric::Cosine => f.write_str("cosine"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestionOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub page_separator: String,
    pub page_failure: PageFailurePolicy,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            chunk_size: 1_000,
            chunk_overlap: 100,
            page_separator: "\n".to_string(),
            page_failure: PageFailurePolicy::Abort,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConversationOptions {
    pub top_k: usize,
    pub similarity: SimilarityMetric,
    pub temperature: f32,
    pub max_tokens: usize,
    pub condense_question: bool,
}

impl Default for ConversationOptions {
    fn default() -> Self {
        Self {
            top_k: 4,
            similarity: SimilarityMetric::L2,
            temperature: 0.0,
            max_tokens: 512,
            condense_question: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_grows_in_alternating_pairs() {
        let mut history = ConversationState::new();
        history.push_exchange("first?", "one");
        history.push_exchange("second?", "two");

        assert_eq!(history.len(), 4);
        assert_eq!(history.exchanges(), 2);
        for (index, turn) in history.turns().iter().enumerate() {
            let expected = if index % 2 == 0 {
                Speaker::User
            } else {
                Speaker::Assistant
            };
            assert_eq!(turn.speaker, expected);
        }
    }

    #[test]
    fn policies_parse_from_cli_values() {
        assert_eq!("skip".parse::<PageFailurePolicy>(), Ok(PageFailurePolicy::SkipAndWarn));
        assert_eq!("ABORT".parse::<PageFailurePolicy>(), Ok(PageFailurePolicy::Abort));
        assert_eq!("cosine".parse::<SimilarityMetric>(), Ok(SimilarityMetric::Cosine));
        assert!("manhattan".parse::<SimilarityMetric>().is_err());
    }
}
