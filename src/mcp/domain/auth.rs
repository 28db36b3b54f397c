//! Credential selection for one MCP client.

use crate::server_registry::domain::{ProviderName, ServerAuth, TenantId};
use crate::vault::EncryptedSecret;

/// How a client authenticates. Bearer and OAuth are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAuth {
    /// No `Authorization` header.
    None,
    /// Static bearer token, decrypted just before connecting.
    Bearer(EncryptedSecret),
    /// Stored OAuth access token for (provider, tenant).
    OAuth {
        /// Provider name.
        provider: ProviderName,
        /// Tenant owning the token.
        tenant: TenantId,
    },
}

impl ClientAuth {
    /// Derives client auth from a server row's auth settings.
    #[must_use]
    pub fn for_server(auth: &ServerAuth, tenant: &TenantId) -> Self {
        match auth {
            ServerAuth::None => Self::None,
            ServerAuth::Bearer { token } => Self::Bearer(token.clone()),
            ServerAuth::OAuth { provider_name, .. } => Self::OAuth {
                provider: provider_name.clone(),
                tenant: tenant.clone(),
            },
        }
    }
}
