//! Template database and pool fixtures for the adapter tests.

pub use super::cluster::{BoxError, PostgresCluster, TemporaryDatabase};
use super::cluster::shared_cluster;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use mockable::DefaultClock;
use rstest::fixture;
use switchboard::server_registry::adapters::postgres::SwitchboardPgPool;
use switchboard::server_registry::domain::{
    EndpointUrl, NewServerConfig, OAuthEndpoints, ServerAuthRequest, ServerConfig, ServerName,
    TenantId, TransportKind,
};
use switchboard::vault::EncryptedSecret;
use tokio::runtime::Runtime;
use uuid::Uuid;

pub const CREATE_SERVERS_SQL: &str =
    include_str!("../../migrations/2026-10-01-000000_create_mcp_servers/up.sql");
pub const CREATE_OAUTH_SQL: &str =
    include_str!("../../migrations/2026-10-01-000001_create_oauth_tables/up.sql");

/// Pre-migrated database every test clones.
pub const TEMPLATE_DB: &str = "switchboard_test_template";

pub fn test_runtime() -> Result<Runtime, BoxError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| Box::new(err) as BoxError)
}

pub fn ensure_template(cluster: PostgresCluster) -> Result<(), BoxError> {
    let connection = cluster.connection();
    cluster.ensure_template_exists(TEMPLATE_DB, move |db_name| {
        apply_migrations(&connection.database_url(db_name))
    })
}

fn apply_migrations(url: &str) -> Result<(), BoxError> {
    let mut conn = PgConnection::establish(url).map_err(|err| Box::new(err) as BoxError)?;
    conn.batch_execute(CREATE_SERVERS_SQL)
        .map_err(|err| Box::new(err) as BoxError)?;
    conn.batch_execute(CREATE_OAUTH_SQL)
        .map_err(|err| Box::new(err) as BoxError)?;
    Ok(())
}

/// Migrated throwaway database plus a pool onto it.
pub struct PreparedDatabase {
    pub pool: SwitchboardPgPool,
    pub database: TemporaryDatabase,
}

impl PreparedDatabase {
    /// Opens a direct connection for raw SQL the adapters never issue.
    pub fn raw_connection(&self) -> Result<PgConnection, BoxError> {
        PgConnection::establish(self.database.url()).map_err(|err| Box::new(err) as BoxError)
    }
}

/// Clones the template into a fresh database.
///
/// Runs on a plain thread so cluster startup never nests inside the test's runtime.
#[fixture]
pub fn prepared_database() -> Result<PreparedDatabase, BoxError> {
    let setup = std::thread::spawn(|| -> Result<PreparedDatabase, BoxError> {
        let cluster = shared_cluster();
        ensure_template(cluster)?;
        let database = cluster
            .temporary_database_from_template(&format!("switchboard_{}", Uuid::new_v4()), TEMPLATE_DB)?;
        let pool = Pool::builder()
            .max_size(2)
            .build(ConnectionManager::<PgConnection>::new(database.url()))
            .map_err(|err| Box::new(err) as BoxError)?;
        Ok(PreparedDatabase { pool, database })
    });
    setup.join().map_err(|payload| {
        let message = payload
            .downcast_ref::<String>()
            .cloned()
            .unwrap_or_else(|| "database setup panicked".to_owned());
        Box::new(std::io::Error::other(message)) as BoxError
    })?
}

pub fn oauth_server(tenant: &str, name: &str) -> Result<ServerConfig, BoxError> {
    let endpoints = OAuthEndpoints::new(
        "https://auth.example.com/authorize",
        "https://auth.example.com/token",
        "switchboard",
    )?
    .with_client_secret(Some(EncryptedSecret::from_stored("sealed-secret")))
    .with_scope(Some("tools".to_owned()));
    Ok(ServerConfig::new(
        NewServerConfig {
            tenant: TenantId::new(tenant)?,
            name: ServerName::new(name)?,
            url: EndpointUrl::parse("url", "https://calendar.example.com/mcp")?,
            transport: TransportKind::StreamableHttp,
            auth: ServerAuthRequest::OAuth(endpoints),
        },
        &DefaultClock,
    ))
}
