//! `PostgreSQL` repository implementation for registered MCP servers.

use super::{
    models::{ServerRecord, ServerRow},
    schema::mcp_servers,
};
use crate::server_registry::{
    domain::{
        AuthKind, ConnectionStatus, EndpointUrl, PersistedAuthColumns, PersistedServerData,
        ProviderName, ServerAuth, ServerConfig, ServerId, ServerName, StatusUpdate, TenantId,
        TransportKind, truncate_message,
    },
    ports::{ServerConfigRepository, ServerRegistryError, ServerRegistryResult},
};
use crate::vault::EncryptedSecret;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::warn;
use uuid::Uuid;

/// `PostgreSQL` connection pool type shared by the switchboard adapters.
pub type SwitchboardPgPool = Pool<ConnectionManager<PgConnection>>;

const TENANT_NAME_CONSTRAINT: &str = "idx_mcp_servers_tenant_name";
const PROVIDER_NAME_CONSTRAINT: &str = "idx_mcp_servers_provider_name";

/// `PostgreSQL`-backed server registry.
#[derive(Debug, Clone)]
pub struct PostgresServerRegistry {
    pool: SwitchboardPgPool,
}

impl PostgresServerRegistry {
    /// Creates a new repository from a `PostgreSQL` pool.
    #[must_use]
    pub const fn new(pool: SwitchboardPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, operation: F) -> ServerRegistryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> ServerRegistryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(ServerRegistryError::persistence)?;
            operation(&mut connection)
        })
        .await
        .map_err(ServerRegistryError::persistence)?
    }
}

#[async_trait]
impl ServerConfigRepository for PostgresServerRegistry {
    async fn insert(&self, server: &ServerConfig) -> ServerRegistryResult<()> {
        let record = to_record(server)?;
        let conflict = ConflictContext::of(server);

        self.run_blocking(move |connection| {
            diesel::insert_into(mcp_servers::table)
                .values(&record)
                .execute(connection)
                .map_err(|err| conflict.classify(err))?;
            Ok(())
        })
        .await
    }

    async fn update(&self, server: &ServerConfig) -> ServerRegistryResult<()> {
        let server_id = server.id();
        let record = to_record(server)?;
        let conflict = ConflictContext::of(server);

        self.run_blocking(move |connection| {
            let updated_count = diesel::update(mcp_servers::table.find(record.id))
                .set(&record)
                .execute(connection)
                .map_err(|err| conflict.classify(err))?;
            if updated_count == 0 {
                return Err(ServerRegistryError::NotFound(server_id));
            }
            Ok(())
        })
        .await
    }

    async fn delete(&self, server_id: ServerId) -> ServerRegistryResult<bool> {
        self.run_blocking(move |connection| {
            let deleted = diesel::delete(mcp_servers::table.find(server_id.into_inner()))
                .execute(connection)
                .map_err(ServerRegistryError::persistence)?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn find_by_id(&self, server_id: ServerId) -> ServerRegistryResult<Option<ServerConfig>> {
        self.run_blocking(move |connection| {
            let row = mcp_servers::table
                .find(server_id.into_inner())
                .select(ServerRow::as_select())
                .first::<ServerRow>(connection)
                .optional()
                .map_err(ServerRegistryError::persistence)?;
            row.map(row_to_server).transpose()
        })
        .await
    }

    async fn list_enabled(&self, tenant: &TenantId) -> ServerRegistryResult<Vec<ServerConfig>> {
        let tenant_id = tenant.as_str().to_owned();
        self.run_blocking(move |connection| {
            let rows = mcp_servers::table
                .filter(mcp_servers::tenant_id.eq(&tenant_id))
                .filter(mcp_servers::enabled.eq(true))
                .order(mcp_servers::name.asc())
                .select(ServerRow::as_select())
                .load::<ServerRow>(connection)
                .map_err(ServerRegistryError::persistence)?;

            let mut servers = Vec::with_capacity(rows.len());
            for row in rows {
                let row_id = row.id;
                match row_to_server(row) {
                    Ok(server) => servers.push(server),
                    Err(err) => {
                        warn!(server_id = %row_id, error = %err, "skipping undecodable MCP server row");
                        mark_invalid(connection, row_id, &err);
                    }
                }
            }
            Ok(servers)
        })
        .await
    }

    async fn find_by_provider_name(
        &self,
        provider: &ProviderName,
    ) -> ServerRegistryResult<Option<ServerConfig>> {
        let provider_name = provider.as_str().to_owned();
        self.run_blocking(move |connection| {
            let row = mcp_servers::table
                .filter(mcp_servers::oauth_provider_name.eq(&provider_name))
                .select(ServerRow::as_select())
                .first::<ServerRow>(connection)
                .optional()
                .map_err(ServerRegistryError::persistence)?;
            row.map(row_to_server).transpose()
        })
        .await
    }

    async fn update_status(
        &self,
        server_id: ServerId,
        update: &StatusUpdate,
        updated_at: DateTime<Utc>,
    ) -> ServerRegistryResult<()> {
        let status_update = update.clone();
        self.run_blocking(move |connection| {
            connection.transaction(|transaction| {
                let row = mcp_servers::table
                    .find(server_id.into_inner())
                    .for_update()
                    .select(ServerRow::as_select())
                    .first::<ServerRow>(transaction)
                    .optional()
                    .map_err(ServerRegistryError::persistence)?
                    .ok_or(ServerRegistryError::NotFound(server_id))?;

                let mut server = row_to_server(row)?;
                server.apply_status(&status_update, updated_at);
                let tools_count = i32::try_from(server.tools_count())
                    .map_err(ServerRegistryError::invalid_persisted_data)?;

                diesel::update(mcp_servers::table.find(server_id.into_inner()))
                    .set((
                        mcp_servers::status.eq(server.status().as_str()),
                        mcp_servers::last_error.eq(server.last_error()),
                        mcp_servers::last_connected_at.eq(server.last_connected_at()),
                        mcp_servers::tools_count.eq(tools_count),
                        mcp_servers::updated_at.eq(server.updated_at()),
                    ))
                    .execute(transaction)
                    .map_err(ServerRegistryError::persistence)?;
                Ok(())
            })
        })
        .await
    }
}

impl From<DieselError> for ServerRegistryError {
    fn from(err: DieselError) -> Self {
        Self::persistence(err)
    }
}

struct ConflictContext {
    server_id: ServerId,
    tenant: TenantId,
    name: ServerName,
    provider: Option<ProviderName>,
}

impl ConflictContext {
    fn of(server: &ServerConfig) -> Self {
        Self {
            server_id: server.id(),
            tenant: server.tenant().clone(),
            name: server.name().clone(),
            provider: server.provider_name().cloned(),
        }
    }

    fn classify(&self, err: DieselError) -> ServerRegistryError {
        let DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info) = err else {
            return ServerRegistryError::persistence(err);
        };
        match (info.constraint_name(), &self.provider) {
            (Some(TENANT_NAME_CONSTRAINT), _) => ServerRegistryError::DuplicateServerName {
                tenant: self.tenant.clone(),
                name: self.name.clone(),
            },
            (Some(PROVIDER_NAME_CONSTRAINT), Some(provider)) => {
                ServerRegistryError::DuplicateProviderName(provider.clone())
            }
            _ => ServerRegistryError::DuplicateServer(self.server_id),
        }
    }
}

fn to_record(server: &ServerConfig) -> ServerRegistryResult<ServerRecord> {
    let PersistedAuthColumns {
        bearer_token,
        provider_name,
        authorization_url,
        token_url,
        client_id,
        client_secret,
        scope,
    } = server.auth().to_columns();
    let tools_count =
        i32::try_from(server.tools_count()).map_err(ServerRegistryError::invalid_persisted_data)?;

    Ok(ServerRecord {
        id: server.id().into_inner(),
        tenant_id: server.tenant().as_str().to_owned(),
        name: server.name().as_str().to_owned(),
        url: server.url().as_str().to_owned(),
        transport: server.transport().as_str().to_owned(),
        auth_kind: server.auth().kind().as_str().to_owned(),
        bearer_token: bearer_token.map(|token| token.as_str().to_owned()),
        oauth_provider_name: provider_name,
        oauth_authorization_url: authorization_url,
        oauth_token_url: token_url,
        oauth_client_id: client_id,
        oauth_client_secret: client_secret.map(|secret| secret.as_str().to_owned()),
        oauth_scope: scope,
        enabled: server.is_enabled(),
        status: server.status().as_str().to_owned(),
        last_error: server.last_error().map(str::to_owned),
        last_connected_at: server.last_connected_at(),
        tools_count,
        created_at: server.created_at(),
        updated_at: server.updated_at(),
    })
}

/// Flags a row that cannot be decoded so its status explains why it is
/// never connected. Failures are logged only.
fn mark_invalid(connection: &mut PgConnection, id: Uuid, err: &ServerRegistryError) {
    let message = truncate_message(&format!("invalid server configuration: {err}"));
    let outcome = diesel::update(mcp_servers::table.find(id))
        .set((
            mcp_servers::status.eq(ConnectionStatus::Error.as_str()),
            mcp_servers::last_error.eq(message),
            mcp_servers::updated_at.eq(Utc::now()),
        ))
        .execute(connection);
    if let Err(update_err) = outcome {
        warn!(server_id = %id, error = %update_err, "failed to flag invalid MCP server row");
    }
}

fn row_to_server(row: ServerRow) -> ServerRegistryResult<ServerConfig> {
    let ServerRow {
        id,
        tenant_id,
        name,
        url,
        transport,
        auth_kind,
        bearer_token,
        oauth_provider_name,
        oauth_authorization_url,
        oauth_token_url,
        oauth_client_id,
        oauth_client_secret,
        oauth_scope,
        enabled,
        status,
        last_error,
        last_connected_at,
        tools_count,
        created_at,
        updated_at,
    } = row;

    let parsed_auth_kind = AuthKind::try_from(auth_kind.as_str())
        .map_err(ServerRegistryError::invalid_persisted_data)?;
    let columns = PersistedAuthColumns {
        bearer_token: bearer_token.map(EncryptedSecret::from_stored),
        provider_name: oauth_provider_name,
        authorization_url: oauth_authorization_url,
        token_url: oauth_token_url,
        client_id: oauth_client_id,
        client_secret: oauth_client_secret.map(EncryptedSecret::from_stored),
        scope: oauth_scope,
    };

    let data = PersistedServerData {
        id: ServerId::from_uuid(id),
        tenant: TenantId::new(tenant_id).map_err(ServerRegistryError::invalid_persisted_data)?,
        name: ServerName::new(name).map_err(ServerRegistryError::invalid_persisted_data)?,
        url: EndpointUrl::parse("url", url).map_err(ServerRegistryError::invalid_persisted_data)?,
        transport: TransportKind::try_from(transport.as_str())
            .map_err(ServerRegistryError::invalid_persisted_data)?,
        auth: ServerAuth::from_columns(parsed_auth_kind, columns)
            .map_err(ServerRegistryError::invalid_persisted_data)?,
        enabled,
        status: ConnectionStatus::try_from(status.as_str())
            .map_err(ServerRegistryError::invalid_persisted_data)?,
        last_error,
        last_connected_at,
        tools_count: u32::try_from(tools_count)
            .map_err(ServerRegistryError::invalid_persisted_data)?,
        created_at,
        updated_at,
    };

    Ok(ServerConfig::from_persisted(data))
}
