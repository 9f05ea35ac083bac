//! In-memory session store keyed by uuid.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::controller::WizardController;
use crate::error::WizardError;
use crate::pipeline::{LeadSource, SubmissionPipeline};

struct Entry {
    controller: Arc<WizardController>,
    last_seen: Instant,
}

/// Live wizard sessions. Idle sessions are dropped when a new one is created.
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Entry>>,
    pipeline: Arc<SubmissionPipeline>,
    source: LeadSource,
    idle_timeout: Duration,
}

impl SessionStore {
    pub fn new(
        pipeline: Arc<SubmissionPipeline>,
        source: LeadSource,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            pipeline,
            source,
            idle_timeout,
        }
    }

    pub async fn create(&self) -> (Uuid, Arc<WizardController>) {
        let mut sessions = self.sessions.write().await;

        let before = sessions.len();
        sessions.retain(|_, entry| entry.last_seen.elapsed() <= self.idle_timeout);
        let pruned = before - sessions.len();
        if pruned > 0 {
            debug!(pruned, "Dropped idle quote sessions");
        }

        let id = Uuid::new_v4();
        let controller = Arc::new(WizardController::new(
            self.pipeline.clone(),
            self.source.clone(),
        ));
        sessions.insert(
            id,
            Entry {
                controller: controller.clone(),
                last_seen: Instant::now(),
            },
        );
        info!(session_id = %id, active = sessions.len(), "Quote session started");
        (id, controller)
    }

    /// Look up a session and mark it as active.
    pub async fn get(&self, id: Uuid) -> Result<Arc<WizardController>, WizardError> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .get_mut(&id)
            .ok_or(WizardError::SessionNotFound(id))?;
        entry.last_seen = Instant::now();
        Ok(entry.controller.clone())
    }

    pub async fn remove(&self, id: Uuid) -> Result<(), WizardError> {
        self.sessions
            .write()
            .await
            .remove(&id)
            .map(|_| info!(session_id = %id, "Quote session closed"))
            .ok_or(WizardError::SessionNotFound(id))
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
