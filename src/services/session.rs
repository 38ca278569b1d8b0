/// Client sign-in state
///
/// A session is either anonymous or bound to one user. Interested parts of the
/// service subscribe to transitions instead of polling the state.
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Anonymous,
    Authenticated {
        user_id: String,
        since: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionTransition {
    SignedIn { session_id: Uuid, user_id: String },
    SignedOut { session_id: Uuid, user_id: String },
}

pub type TransitionListener = Arc<dyn Fn(&SessionTransition) + Send + Sync>;

/// One client's session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub id: Uuid,
    #[serde(flatten)]
    pub state: SessionState,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SessionState::Anonymous,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match &self.state {
            SessionState::Anonymous => None,
            SessionState::Authenticated { user_id, .. } => Some(user_id.as_str()),
        }
    }

    /// Anonymous -> Authenticated
    pub fn sign_in(&mut self, user_id: &str) -> AppResult<SessionTransition> {
        if user_id.trim().is_empty() {
            return Err(AppError::InvalidInput("user_id cannot be empty".to_string()));
        }
        match &self.state {
            SessionState::Anonymous => {
                self.state = SessionState::Authenticated {
                    user_id: user_id.to_string(),
                    since: Utc::now(),
                };
                Ok(SessionTransition::SignedIn {
                    session_id: self.id,
                    user_id: user_id.to_string(),
                })
            }
            SessionState::Authenticated { user_id: current, .. } => Err(AppError::InvalidInput(
                format!("session {} is already signed in as {}", self.id, current),
            )),
        }
    }

    /// Authenticated -> Anonymous
    pub fn sign_out(&mut self) -> AppResult<SessionTransition> {
        match std::mem::replace(&mut self.state, SessionState::Anonymous) {
            SessionState::Authenticated { user_id, .. } => Ok(SessionTransition::SignedOut {
                session_id: self.id,
                user_id,
            }),
            SessionState::Anonymous => Err(AppError::InvalidInput(format!(
                "session {} is not signed in",
                self.id
            ))),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// All live sessions plus the listeners notified on every transition
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, Session>>,
    listeners: std::sync::RwLock<Vec<TransitionListener>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback run after each successful transition
    pub fn subscribe(&self, listener: TransitionListener) {
        match self.listeners.write() {
            Ok(mut listeners) => listeners.push(listener),
            Err(poisoned) => poisoned.into_inner().push(listener),
        }
    }

    fn notify(&self, transition: &SessionTransition) {
        let listeners = match self.listeners.read() {
            Ok(listeners) => listeners.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        for listener in listeners {
            listener(transition);
        }
    }

    /// Opens a new session already signed in as `user_id`
    pub async fn sign_in(&self, user_id: &str) -> AppResult<Session> {
        let mut session = Session::new();
        let transition = session.sign_in(user_id)?;
        self.sessions
            .write()
            .await
            .insert(session.id, session.clone());

        tracing::info!(session_id = %session.id, user_id = %user_id, "Session signed in");
        self.notify(&transition);
        Ok(session)
    }

    /// Signs the session out and forgets it
    pub async fn sign_out(&self, session_id: Uuid) -> AppResult<Session> {
        let transition = {
            let mut sessions = self.sessions.write().await;
            let session = sessions
                .get_mut(&session_id)
                .ok_or_else(|| AppError::NotFound(format!("session {}", session_id)))?;
            let transition = session.sign_out()?;
            sessions.remove(&session_id);
            transition
        };

        tracing::info!(session_id = %session_id, "Session signed out");
        self.notify(&transition);
        Ok(Session {
            id: session_id,
            state: SessionState::Anonymous,
        })
    }

    pub async fn get(&self, session_id: Uuid) -> AppResult<Session> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("session {}", session_id)))
    }
}
