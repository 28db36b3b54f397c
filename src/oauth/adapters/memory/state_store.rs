//! In-memory authorization state store.

use crate::oauth::{
    domain::AuthorizationState,
    ports::{AuthorizationStateStore, OAuthStoreError, OAuthStoreResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Thread-safe in-memory authorization state store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAuthorizationStateStore {
    states: Arc<RwLock<HashMap<String, AuthorizationState>>>,
}

impl InMemoryAuthorizationStateStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(err: impl std::fmt::Display) -> OAuthStoreError {
    OAuthStoreError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl AuthorizationStateStore for InMemoryAuthorizationStateStore {
    async fn insert(&self, state: &AuthorizationState) -> OAuthStoreResult<()> {
        let mut states = self.states.write().map_err(poisoned)?;
        if states.contains_key(state.state()) {
            return Err(OAuthStoreError::DuplicateState);
        }
        states.insert(state.state().to_owned(), state.clone());
        Ok(())
    }

    async fn find(&self, state: &str) -> OAuthStoreResult<Option<AuthorizationState>> {
        let states = self.states.read().map_err(poisoned)?;
        Ok(states.get(state).cloned())
    }

    async fn mark_consumed(&self, state: &str) -> OAuthStoreResult<bool> {
        let mut states = self.states.write().map_err(poisoned)?;
        match states.get_mut(state) {
            Some(stored) if !stored.is_consumed() => {
                stored.consume();
                Ok(true)
            }
            Some(_) | None => Ok(false),
        }
    }

    async fn purge_created_before(&self, cutoff: DateTime<Utc>) -> OAuthStoreResult<usize> {
        let mut states = self.states.write().map_err(poisoned)?;
        let before = states.len();
        states.retain(|_, stored| stored.created_at() >= cutoff);
        Ok(before.saturating_sub(states.len()))
    }
}
