//! `PostgreSQL` implementations of the OAuth token and state stores.

use super::{
    models::{AuthorizationStateRow, OAuthTokenRow},
    schema::{oauth_authorization_states, oauth_tokens},
};
use crate::oauth::{
    domain::{AuthorizationState, OAuthToken, PersistedAuthorizationState},
    ports::{AuthorizationStateStore, OAuthStoreError, OAuthStoreResult, OAuthTokenStore},
};
use crate::server_registry::adapters::postgres::SwitchboardPgPool;
use crate::server_registry::domain::{ProviderName, TenantId};
use crate::vault::EncryptedSecret;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::upsert::excluded;

async fn run_blocking<F, T>(pool: &SwitchboardPgPool, operation: F) -> OAuthStoreResult<T>
where
    F: FnOnce(&mut PgConnection) -> OAuthStoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    let owned_pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut connection = owned_pool.get().map_err(OAuthStoreError::persistence)?;
        operation(&mut connection)
    })
    .await
    .map_err(OAuthStoreError::persistence)?
}

/// `PostgreSQL`-backed token store.
#[derive(Debug, Clone)]
pub struct PostgresOAuthTokenStore {
    pool: SwitchboardPgPool,
}

impl PostgresOAuthTokenStore {
    /// Creates a new store from a `PostgreSQL` pool.
    #[must_use]
    pub const fn new(pool: SwitchboardPgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OAuthTokenStore for PostgresOAuthTokenStore {
    async fn find(
        &self,
        provider: &ProviderName,
        tenant: &TenantId,
    ) -> OAuthStoreResult<Option<OAuthToken>> {
        let provider_name = provider.as_str().to_owned();
        let tenant_id = tenant.as_str().to_owned();
        run_blocking(&self.pool, move |connection| {
            let row = oauth_tokens::table
                .find((&provider_name, &tenant_id))
                .select(OAuthTokenRow::as_select())
                .first::<OAuthTokenRow>(connection)
                .optional()
                .map_err(OAuthStoreError::persistence)?;
            row.map(row_to_token).transpose()
        })
        .await
    }

    async fn upsert(&self, token: &OAuthToken) -> OAuthStoreResult<()> {
        let row = OAuthTokenRow {
            provider_name: token.provider().as_str().to_owned(),
            tenant_id: token.tenant().as_str().to_owned(),
            access_token: token.access_token().as_str().to_owned(),
            refresh_token: token.refresh_token().map(|value| value.as_str().to_owned()),
            expires_at: token.expires_at(),
            updated_at: token.updated_at(),
        };
        run_blocking(&self.pool, move |connection| {
            diesel::insert_into(oauth_tokens::table)
                .values(&row)
                .on_conflict((oauth_tokens::provider_name, oauth_tokens::tenant_id))
                .do_update()
                .set((
                    oauth_tokens::access_token.eq(excluded(oauth_tokens::access_token)),
                    oauth_tokens::refresh_token.eq(excluded(oauth_tokens::refresh_token)),
                    oauth_tokens::expires_at.eq(excluded(oauth_tokens::expires_at)),
                    oauth_tokens::updated_at.eq(excluded(oauth_tokens::updated_at)),
                ))
                .execute(connection)
                .map_err(OAuthStoreError::persistence)?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, provider: &ProviderName, tenant: &TenantId) -> OAuthStoreResult<bool> {
        let provider_name = provider.as_str().to_owned();
        let tenant_id = tenant.as_str().to_owned();
        run_blocking(&self.pool, move |connection| {
            let deleted = diesel::delete(oauth_tokens::table.find((&provider_name, &tenant_id)))
                .execute(connection)
                .map_err(OAuthStoreError::persistence)?;
            Ok(deleted > 0)
        })
        .await
    }
}

/// `PostgreSQL`-backed authorization state store.
#[derive(Debug, Clone)]
pub struct PostgresAuthorizationStateStore {
    pool: SwitchboardPgPool,
}

impl PostgresAuthorizationStateStore {
    /// Creates a new store from a `PostgreSQL` pool.
    #[must_use]
    pub const fn new(pool: SwitchboardPgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthorizationStateStore for PostgresAuthorizationStateStore {
    async fn insert(&self, state: &AuthorizationState) -> OAuthStoreResult<()> {
        let row = AuthorizationStateRow {
            state: state.state().to_owned(),
            code_verifier: state.code_verifier().to_owned(),
            provider_name: state.provider().as_str().to_owned(),
            tenant_id: state.tenant().as_str().to_owned(),
            redirect_uri: state.redirect_uri().to_owned(),
            created_at: state.created_at(),
            consumed: state.is_consumed(),
        };
        run_blocking(&self.pool, move |connection| {
            diesel::insert_into(oauth_authorization_states::table)
                .values(&row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        OAuthStoreError::DuplicateState
                    }
                    other => OAuthStoreError::persistence(other),
                })?;
            Ok(())
        })
        .await
    }

    async fn find(&self, state: &str) -> OAuthStoreResult<Option<AuthorizationState>> {
        let state_value = state.to_owned();
        run_blocking(&self.pool, move |connection| {
            let row = oauth_authorization_states::table
                .find(&state_value)
                .select(AuthorizationStateRow::as_select())
                .first::<AuthorizationStateRow>(connection)
                .optional()
                .map_err(OAuthStoreError::persistence)?;
            row.map(row_to_state).transpose()
        })
        .await
    }

    async fn mark_consumed(&self, state: &str) -> OAuthStoreResult<bool> {
        let state_value = state.to_owned();
        run_blocking(&self.pool, move |connection| {
            let updated = diesel::update(
                oauth_authorization_states::table
                    .filter(oauth_authorization_states::state.eq(&state_value))
                    .filter(oauth_authorization_states::consumed.eq(false)),
            )
            .set(oauth_authorization_states::consumed.eq(true))
            .execute(connection)
            .map_err(OAuthStoreError::persistence)?;
            Ok(updated == 1)
        })
        .await
    }

    async fn purge_created_before(&self, cutoff: DateTime<Utc>) -> OAuthStoreResult<usize> {
        run_blocking(&self.pool, move |connection| {
            diesel::delete(
                oauth_authorization_states::table
                    .filter(oauth_authorization_states::created_at.lt(cutoff)),
            )
            .execute(connection)
            .map_err(OAuthStoreError::persistence)
        })
        .await
    }
}

fn row_to_token(row: OAuthTokenRow) -> OAuthStoreResult<OAuthToken> {
    let OAuthTokenRow {
        provider_name,
        tenant_id,
        access_token,
        refresh_token,
        expires_at,
        updated_at,
    } = row;

    Ok(OAuthToken::new(
        ProviderName::new(provider_name).map_err(OAuthStoreError::invalid_persisted_data)?,
        TenantId::new(tenant_id).map_err(OAuthStoreError::invalid_persisted_data)?,
        EncryptedSecret::from_stored(access_token),
        refresh_token.map(EncryptedSecret::from_stored),
        expires_at,
        updated_at,
    ))
}

fn row_to_state(row: AuthorizationStateRow) -> OAuthStoreResult<AuthorizationState> {
    let AuthorizationStateRow {
        state,
        code_verifier,
        provider_name,
        tenant_id,
        redirect_uri,
        created_at,
        consumed,
    } = row;

    Ok(AuthorizationState::from_persisted(
        PersistedAuthorizationState {
            state,
            code_verifier,
            provider: ProviderName::new(provider_name)
                .map_err(OAuthStoreError::invalid_persisted_data)?,
            tenant: TenantId::new(tenant_id).map_err(OAuthStoreError::invalid_persisted_data)?,
            redirect_uri,
            created_at,
            consumed,
        },
    ))
}
