//! Prompt assembly for the two generation calls a question can make: the
//! follow-up rewrite and the grounded answer.

use crate::chunking::normalize_whitespace;
use crate::{ConversationState, RetrievedChunk, Speaker};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    fn label(self) -> &'static str {
        match self {
            Role::System => "System",
            Role::User => "Human",
            Role::Assistant => "Assistant",
        }
    }
}

impl From<Speaker> for Role {
    fn from(value: Speaker) -> Self {
        match value {
            Speaker::User => Role::User,
            Speaker::Assistant => Role::Assistant,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

impl PromptMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub messages: Vec<PromptMessage>,
    pub temperature: f32,
    pub max_tokens: usize,
}

impl GenerationRequest {
    /// Flattens the messages into one prompt for text-completion models.
    pub fn render_plain(&self) -> String {
        let mut out = String::new();
        for message in &self.messages {
            if message.role == Role::System {
                out.push_str(&message.content);
                out.push_str("\n\n");
            } else {
                out.push_str(message.role.label());
                out.push_str(": ");
                out.push_str(&message.content);
                out.push('\n');
            }
        }
        out.push_str("Assistant:");
        out
    }
}

const CONDENSE_INSTRUCTIONS: &str = "Given the following conversation and a follow up question, \
rephrase the follow up question to be a standalone question, in its original language. \
Reply with the standalone question only.";

const ANSWER_INSTRUCTIONS: &str = "Use the following pieces of context to answer the question \
at the end. If you don't know the answer, just say that you don't know, \
don't try to make up an answer.";

pub fn condense_question_request(
    history: &ConversationState,
    question: &str,
    max_tokens: usize,
) -> GenerationRequest {
    let mut transcript = String::new();
    for turn in history.turns() {
        transcript.push_str(Role::from(turn.speaker).label());
        transcript.push_str(": ");
        transcript.push_str(&turn.message);
        transcript.push('\n');
    }

    GenerationRequest {
        messages: vec![
            PromptMessage::new(Role::System, CONDENSE_INSTRUCTIONS),
            PromptMessage::new(
                Role::User,
                format!(
                    "Chat History:\n{transcript}\nFollow Up Input: {question}\nStandalone question:"
                ),
            ),
        ],
        temperature: 0.0,
        max_tokens,
    }
}

pub fn render_context(sources: &[RetrievedChunk]) -> String {
    sources
        .iter()
        .map(|source| normalize_whitespace(&source.chunk.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn answer_request(
    sources: &[RetrievedChunk],
    history: &ConversationState,
    question: &str,
    temperature: f32,
    max_tokens: usize,
) -> GenerationRequest {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(PromptMessage::new(
        Role::System,
        format!("{ANSWER_INSTRUCTIONS}\n\n{}", render_context(sources)),
    ));
    messages.extend(
        history
            .turns()
            .iter()
            .map(|turn| PromptMessage::new(turn.speaker.into(), turn.message.clone())),
    );
    messages.push(PromptMessage::new(Role::User, question));

    GenerationRequest {
        messages,
        temperature,
        max_tokens,
    }
}
