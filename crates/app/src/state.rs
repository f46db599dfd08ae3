//! Application state: the shared pipeline and the per-user chat sessions.

use chrono::{DateTime, Utc};
use pdf_chat_core::{ChatSession, Pipeline};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub sessions: SessionRegistry,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>, max_upload_bytes: usize) -> Self {
        Self {
            pipeline,
            sessions: SessionRegistry::default(),
            max_upload_bytes,
        }
    }
}

/// Live sessions by id. Each session has its own lock, so one user's slow
/// Process never blocks another user's questions.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, Arc<Mutex<ChatSession>>>>,
}

impl SessionRegistry {
    pub async fn create(&self, pipeline: Arc<Pipeline>) -> (Uuid, DateTime<Utc>) {
        let session = ChatSession::new(pipeline);
        let (id, created_at) = (session.id(), session.created_at());
        self.sessions
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(session)));
        (id, created_at)
    }

    pub async fn get(&self, id: Uuid) -> Option<Arc<Mutex<ChatSession>>> {
        self.sessions.read().await.get(&id).cloned()
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
