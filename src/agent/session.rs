//! Conversation identities and the sessions that route prompts to the agent.
//!
//! All requests share one long-lived session by default. The registry keeps
//! sessions by key so per-user sessions only need a different key.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::reducer::{execution_error, reduce_events};
use super::runtime::{AgentError, AgentRuntime, EventStream};
use crate::config::SessionConfig;

/// The (application, user, session) triple naming one conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
}

impl SessionKey {
    pub fn new(
        app_name: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            user_id: user_id.into(),
            session_id: session_id.into(),
        }
    }
}

impl From<&SessionConfig> for SessionKey {
    fn from(config: &SessionConfig) -> Self {
        Self::new(&config.app_name, &config.user_id, &config.session_id)
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.app_name, self.user_id, self.session_id)
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session {0} already exists")]
    AlreadyExists(SessionKey),

    #[error("Session service unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub key: SessionKey,
    pub created_at: DateTime<Utc>,
}

/// Storage of known conversation identities.
#[async_trait]
pub trait SessionService: Send + Sync {
    /// Register `key`. Fails with `AlreadyExists` if it is already known.
    async fn create_session(&self, key: &SessionKey) -> Result<SessionRecord, SessionError>;

    async fn get_session(&self, key: &SessionKey) -> Option<SessionRecord>;
}

/// Process-local session storage.
#[derive(Debug, Default)]
pub struct InMemorySessionService {
    sessions: RwLock<HashMap<SessionKey, SessionRecord>>,
}

impl InMemorySessionService {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionService for InMemorySessionService {
    async fn create_session(&self, key: &SessionKey) -> Result<SessionRecord, SessionError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(key) {
            return Err(SessionError::AlreadyExists(key.clone()));
        }

        let record = SessionRecord {
            key: key.clone(),
            created_at: Utc::now(),
        };
        sessions.insert(key.clone(), record.clone());
        Ok(record)
    }

    async fn get_session(&self, key: &SessionKey) -> Option<SessionRecord> {
        self.sessions.read().await.get(key).cloned()
    }
}

/// A conversation bound to the agent runtime.
pub struct AgentSession {
    key: SessionKey,
    runtime: Arc<dyn AgentRuntime>,
    sessions: Arc<dyn SessionService>,
}

impl AgentSession {
    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    /// Start an invocation and return its event stream.
    pub async fn invoke(&self, prompt: &str) -> Result<EventStream, AgentError> {
        if self.sessions.get_session(&self.key).await.is_none() {
            return Err(AgentError::SessionNotFound(self.key.clone()));
        }

        info!(session = %self.key, prompt, "Running travel agent");
        self.runtime.run(&self.key, prompt).await
    }

    /// Invoke and reduce to the answer string. Never fails; errors become prose.
    pub async fn respond(&self, prompt: &str) -> String {
        match self.invoke(prompt).await {
            Ok(events) => reduce_events(events).await,
            Err(e) => {
                warn!(session = %self.key, error = %e, "Agent invocation failed");
                execution_error(e)
            }
        }
    }
}

/// Sessions by key, with one default session shared by every request.
pub struct SessionRegistry {
    runtime: Arc<dyn AgentRuntime>,
    service: Arc<dyn SessionService>,
    default: Arc<AgentSession>,
    sessions: RwLock<HashMap<SessionKey, Arc<AgentSession>>>,
}

impl SessionRegistry {
    /// Create the registry and its default session.
    ///
    /// # Errors
    ///
    /// Any session creation failure other than `AlreadyExists`.
    pub async fn new(
        runtime: Arc<dyn AgentRuntime>,
        service: Arc<dyn SessionService>,
        default_key: SessionKey,
    ) -> Result<Self, SessionError> {
        create_idempotent(service.as_ref(), &default_key).await?;

        let default = Arc::new(AgentSession {
            key: default_key.clone(),
            runtime: runtime.clone(),
            sessions: service.clone(),
        });

        let mut sessions = HashMap::new();
        sessions.insert(default_key, default.clone());

        Ok(Self {
            runtime,
            service,
            default,
            sessions: RwLock::new(sessions),
        })
    }

    /// The process-wide session.
    pub fn default_session(&self) -> Arc<AgentSession> {
        self.default.clone()
    }

    pub async fn get(&self, key: &SessionKey) -> Option<Arc<AgentSession>> {
        self.sessions.read().await.get(key).cloned()
    }

    /// Return the session for `key`, creating it if needed.
    pub async fn ensure_session(&self, key: SessionKey) -> Result<Arc<AgentSession>, SessionError> {
        if let Some(session) = self.get(&key).await {
            return Ok(session);
        }

        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get(&key) {
            return Ok(session.clone());
        }

        create_idempotent(self.service.as_ref(), &key).await?;
        let session = Arc::new(AgentSession {
            key: key.clone(),
            runtime: self.runtime.clone(),
            sessions: self.service.clone(),
        });
        sessions.insert(key, session.clone());
        Ok(session)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Create `key`, treating an existing session as success.
async fn create_idempotent(service: &dyn SessionService, key: &SessionKey) -> Result<(), SessionError> {
    match service.create_session(key).await {
        Ok(_) => {
            info!(session = %key, "Session created");
            Ok(())
        }
        Err(SessionError::AlreadyExists(_)) => {
            info!(session = %key, "Session already exists, continuing");
            Ok(())
        }
        Err(e) => Err(e),
    }
}
