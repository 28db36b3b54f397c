//! Token pairs and authorization states in `PostgreSQL`.

use super::helpers::{BoxError, PreparedDatabase, oauth_server, prepared_database};
use chrono::{TimeDelta, Utc};
use mockable::DefaultClock;
use rstest::rstest;
use switchboard::oauth::adapters::postgres::{
    PostgresAuthorizationStateStore, PostgresOAuthTokenStore,
};
use switchboard::oauth::domain::{AuthorizationState, OAuthToken, PkcePair};
use switchboard::oauth::ports::{AuthorizationStateStore, OAuthTokenStore};
use switchboard::server_registry::domain::TenantId;
use switchboard::vault::EncryptedSecret;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn token_upsert_replaces_the_pair(
    prepared_database: Result<PreparedDatabase, BoxError>,
) -> Result<(), BoxError> {
    let prepared = prepared_database?;
    let store = PostgresOAuthTokenStore::new(prepared.pool.clone());
    let server = oauth_server("tenant-a", "Calendar")?;
    let provider = server
        .provider_name()
        .expect("OAuth server owns a provider")
        .clone();
    let tenant = TenantId::new("tenant-a")?;
    let now = Utc::now();
    let first = OAuthToken::new(
        provider.clone(),
        tenant.clone(),
        EncryptedSecret::from_stored("access-1"),
        Some(EncryptedSecret::from_stored("refresh-1")),
        Some(now + TimeDelta::hours(1)),
        now,
    );
    let second = OAuthToken::new(
        provider.clone(),
        tenant.clone(),
        EncryptedSecret::from_stored("access-2"),
        None,
        None,
        now,
    );

    store.upsert(&first).await?;
    store.upsert(&second).await?;
    let stored = store
        .find(&provider, &tenant)
        .await?
        .expect("token stored");

    assert_eq!(stored.access_token().as_str(), "access-2");
    assert!(stored.refresh_token().is_none());
    assert!(store.delete(&provider, &tenant).await?);
    assert!(store.find(&provider, &tenant).await?.is_none());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn authorization_states_are_consumed_once(
    prepared_database: Result<PreparedDatabase, BoxError>,
) -> Result<(), BoxError> {
    let prepared = prepared_database?;
    let store = PostgresAuthorizationStateStore::new(prepared.pool.clone());
    let server = oauth_server("tenant-a", "Calendar")?;
    let provider = server
        .provider_name()
        .expect("OAuth server owns a provider")
        .clone();
    let state = AuthorizationState::issue(
        provider,
        TenantId::new("tenant-a")?,
        "https://switchboard.example.com/oauth/callback".to_owned(),
        &PkcePair::generate(),
        &DefaultClock,
    );

    store.insert(&state).await?;

    assert!(store.mark_consumed(state.state()).await?);
    assert!(!store.mark_consumed(state.state()).await?);
    assert_eq!(
        store
            .purge_created_before(Utc::now() + TimeDelta::minutes(1))
            .await?,
        1
    );
    Ok(())
}
