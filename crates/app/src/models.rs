//! Request and response bodies of the chat API

use chrono::{DateTime, Utc};
use pdf_chat_core::{Answer, ChatTurn, ProcessSummary, RetrievedChunk};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest excerpt of a source chunk echoed back with an answer, in chars.
const EXCERPT_CHARS: usize = 280;

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UploadedDocument {
    pub name: String,
    pub content_base64: String,
}

#[derive(Debug, Deserialize)]
pub struct ProcessRequest {
    #[serde(default)]
    pub documents: Vec<UploadedDocument>,
}

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub session_id: Uuid,
    pub summary: ProcessSummary,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct SourceView {
    pub position: usize,
    pub score: f32,
    pub excerpt: String,
}

impl From<&RetrievedChunk> for SourceView {
    fn from(value: &RetrievedChunk) -> Self {
        let mut excerpt: String = value.chunk.text.chars().take(EXCERPT_CHARS).collect();
        if value.chunk.text.chars().count() > EXCERPT_CHARS {
            excerpt.push('…');
        }
        Self {
            position: value.chunk.position,
            score: value.score,
            excerpt,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
    pub standalone_question: String,
    pub sources: Vec<SourceView>,
    pub history: Vec<ChatTurn>,
    pub transcript_html: String,
}

impl AskResponse {
    pub fn new(answer: Answer, history: &[ChatTurn], transcript_html: String) -> Self {
        Self {
            sources: answer.sources.iter().map(SourceView::from).collect(),
            answer: answer.text,
            standalone_question: answer.standalone_question,
            history: history.to_vec(),
            transcript_html,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub ready: bool,
    pub history: Vec<ChatTurn>,
    pub transcript_html: String,
}
