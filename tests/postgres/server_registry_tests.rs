//! Server rows: round trips, per-tenant names, listing, and bad rows.

use super::helpers::{BoxError, PreparedDatabase, oauth_server, prepared_database};
use chrono::Utc;
use diesel::prelude::*;
use mockable::DefaultClock;
use rstest::rstest;
use switchboard::server_registry::adapters::postgres::PostgresServerRegistry;
use switchboard::server_registry::domain::{ConnectionStatus, StatusUpdate, TenantId, TransportKind};
use switchboard::server_registry::ports::{ServerConfigRepository, ServerRegistryError};
use uuid::Uuid;

#[derive(diesel::QueryableByName)]
struct StatusRow {
    #[diesel(sql_type = diesel::sql_types::Text)]
    status: String,
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Text>)]
    last_error: Option<String>,
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn servers_round_trip_and_resolve_by_provider(
    prepared_database: Result<PreparedDatabase, BoxError>,
) -> Result<(), BoxError> {
    let prepared = prepared_database?;
    let repository = PostgresServerRegistry::new(prepared.pool.clone());
    let server = oauth_server("tenant-a", "Calendar")?;

    repository.insert(&server).await?;
    let provider = server.provider_name().expect("OAuth server owns a provider");
    let found = repository
        .find_by_provider_name(provider)
        .await?
        .expect("server resolves by provider");

    assert_eq!(found.id(), server.id());
    assert_eq!(found.auth(), server.auth());
    assert_eq!(found.transport(), TransportKind::StreamableHttp);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn names_are_unique_per_tenant(
    prepared_database: Result<PreparedDatabase, BoxError>,
) -> Result<(), BoxError> {
    let prepared = prepared_database?;
    let repository = PostgresServerRegistry::new(prepared.pool.clone());
    repository.insert(&oauth_server("tenant-a", "Calendar")?).await?;
    repository.insert(&oauth_server("tenant-b", "Calendar")?).await?;

    let duplicate = repository.insert(&oauth_server("tenant-a", "Calendar")?).await;

    assert!(matches!(
        duplicate,
        Err(ServerRegistryError::DuplicateServerName { .. })
    ));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn status_updates_and_disabled_rows_filter_listing(
    prepared_database: Result<PreparedDatabase, BoxError>,
) -> Result<(), BoxError> {
    let prepared = prepared_database?;
    let repository = PostgresServerRegistry::new(prepared.pool.clone());
    let tenant = TenantId::new("tenant-a")?;
    let live = oauth_server("tenant-a", "Calendar")?;
    let mut disabled = oauth_server("tenant-a", "Archive")?;
    disabled.set_enabled(false, &DefaultClock);
    repository.insert(&live).await?;
    repository.insert(&disabled).await?;

    let now = Utc::now();
    repository
        .update_status(live.id(), &StatusUpdate::connected(now, 3), now)
        .await?;
    let listed = repository.list_enabled(&tenant).await?;

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].status(), ConnectionStatus::Connected);
    assert_eq!(listed[0].tools_count(), 3);
    Ok(())
}

#[rstest]
#[case::unsupported_scheme("Legacy FTP", "ftp://files.example.com/mcp")]
#[case::blank_name("   ", "https://blank.example.com/mcp")]
#[tokio::test(flavor = "multi_thread")]
async fn undecodable_rows_are_skipped_and_flagged(
    prepared_database: Result<PreparedDatabase, BoxError>,
    #[case] name: &str,
    #[case] url: &str,
) -> Result<(), BoxError> {
    let prepared = prepared_database?;
    let repository = PostgresServerRegistry::new(prepared.pool.clone());
    let tenant = TenantId::new("tenant-a")?;
    let healthy = oauth_server("tenant-a", "Calendar")?;
    repository.insert(&healthy).await?;
    let bad_id = Uuid::new_v4();
    let mut raw = prepared.raw_connection()?;
    diesel::sql_query(
        "INSERT INTO mcp_servers (id, tenant_id, name, url) VALUES ($1, 'tenant-a', $2, $3)",
    )
    .bind::<diesel::sql_types::Uuid, _>(bad_id)
    .bind::<diesel::sql_types::Text, _>(name)
    .bind::<diesel::sql_types::Text, _>(url)
    .execute(&mut raw)?;

    let listed = repository.list_enabled(&tenant).await?;

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id(), healthy.id());
    let flagged = diesel::sql_query("SELECT status, last_error FROM mcp_servers WHERE id = $1")
        .bind::<diesel::sql_types::Uuid, _>(bad_id)
        .get_result::<StatusRow>(&mut raw)?;
    assert_eq!(flagged.status, "error");
    let message = flagged.last_error.expect("bad row records why it was skipped");
    assert!(
        message.starts_with("invalid server configuration"),
        "unexpected message: {message}"
    );
    Ok(())
}
