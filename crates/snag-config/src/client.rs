//! Typed client for the plugin and platform endpoints.

use serde::Serialize;
use serde::de::DeserializeOwned;
use snag_proto::{
    ChannelEntity, ChannelRulesRequest, ChannelRulesResponse, Collaborator,
    CollaboratorsResponse, ErrorBody, MessageBody, Organization, OrganizationsResponse,
    PlatformUserEntity, ProjectChannelMappings, ProjectEntity, ProjectsResponse,
    TestConnectionRequest, UserMapping, UserMappingsEnvelope,
};
use tracing::{debug, warn};

use crate::config::{AdminConfig, ApiPaths};
use crate::connection::ConnectionCheck;
use crate::error::{Result, SyncError};
use crate::transport::{ApiRequest, ApiResponse, HttpTransport, Transport};

/// Client for the admin endpoints, generic over the transport.
#[derive(Debug, Clone)]
pub struct AdminClient<T> {
    transport: T,
    paths: ApiPaths,
}

impl AdminClient<HttpTransport> {
    /// Creates an HTTP client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Config` if the configuration is invalid.
    pub fn from_config(config: &AdminConfig) -> Result<Self> {
        Ok(Self::new(HttpTransport::new(config)?, config.paths()))
    }
}

impl<T: Transport> AdminClient<T> {
    /// Creates a client over `transport`.
    #[must_use]
    pub const fn new(transport: T, paths: ApiPaths) -> Self {
        Self { transport, paths }
    }

    /// The underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// The API paths in use.
    #[must_use]
    pub const fn paths(&self) -> &ApiPaths {
        &self.paths
    }

    /// Tests provider credentials. Never fails: every failure becomes an
    /// error-status check.
    pub async fn test_connection(&self, credentials: &TestConnectionRequest) -> ConnectionCheck {
        let body = match serde_json::to_value(credentials) {
            Ok(body) => body,
            Err(e) => return ConnectionCheck::failure(Some(e.to_string())),
        };

        match self.transport.send(ApiRequest::post(self.paths.test(), body)).await {
            Ok(response) if response.is_success() => {
                let body: MessageBody = response.decode().unwrap_or_default();
                ConnectionCheck::success(body.message.filter(|m| !m.is_empty()))
            }
            Ok(response) => {
                let body = ErrorBody::parse(&response.body);
                let message = body
                    .message
                    .filter(|m| !m.is_empty())
                    .or_else(|| body.error.filter(|e| !e.is_empty()));
                debug!(status = response.status, "connection test rejected");
                ConnectionCheck::failure(message)
            }
            Err(e) => {
                warn!(error = %e, "connection test did not reach the server");
                ConnectionCheck::failure(Some(e.message))
            }
        }
    }

    /// Lists provider projects.
    pub async fn projects(&self) -> Result<Vec<ProjectEntity>> {
        let body: ProjectsResponse = self.get(self.paths.projects()).await?;
        Ok(body.projects)
    }

    /// Lists provider organizations.
    pub async fn organizations(&self) -> Result<Vec<Organization>> {
        let body: OrganizationsResponse = self.get(self.paths.organizations()).await?;
        Ok(body.organizations)
    }

    /// Lists provider collaborators.
    pub async fn collaborators(&self) -> Result<Vec<Collaborator>> {
        let body: CollaboratorsResponse = self.get(self.paths.collaborators()).await?;
        Ok(body.collaborators)
    }

    /// Lists platform channels.
    pub async fn channels(&self) -> Result<Vec<ChannelEntity>> {
        self.get(self.paths.channels()).await
    }

    /// Lists the first page of platform users.
    pub async fn platform_users(&self) -> Result<Vec<PlatformUserEntity>> {
        self.get(self.paths.users()).await
    }

    /// Fetches the stored project→channel rules, in either wire shape.
    pub async fn channel_rules(&self) -> Result<ProjectChannelMappings> {
        let body: ChannelRulesResponse = self.get(self.paths.channel_rules()).await?;
        Ok(body.into_mappings())
    }

    /// Replaces the stored project→channel rules with `mappings`.
    pub async fn save_channel_rules(&self, mappings: &ProjectChannelMappings) -> Result<()> {
        let body = ChannelRulesRequest {
            mappings: mappings.clone(),
        };
        self.post(self.paths.channel_rules(), &body).await?;
        Ok(())
    }

    /// Fetches the stored user mappings.
    pub async fn user_mappings(&self) -> Result<Vec<UserMapping>> {
        let body: UserMappingsEnvelope = self.get(self.paths.user_mappings()).await?;
        Ok(body.mappings)
    }

    /// Replaces the stored user mappings with `mappings`.
    pub async fn save_user_mappings(&self, mappings: &[UserMapping]) -> Result<()> {
        let body = UserMappingsEnvelope {
            mappings: mappings.to_vec(),
        };
        self.post(self.paths.user_mappings(), &body).await?;
        Ok(())
    }

    async fn get<R: DeserializeOwned>(&self, path: String) -> Result<R> {
        let response = self.transport.send(ApiRequest::get(path)).await?;
        check(response)?.decode()
    }

    async fn post<B: Serialize>(&self, path: String, body: &B) -> Result<ApiResponse> {
        let body = serde_json::to_value(body).map_err(|e| SyncError::Decode(e.to_string()))?;
        let response = self.transport.send(ApiRequest::post(path, body)).await?;
        check(response)
    }
}

/// Converts a non-2xx response into `SyncError::Server`.
fn check(response: ApiResponse) -> Result<ApiResponse> {
    if response.is_success() {
        return Ok(response);
    }

    let message = ErrorBody::parse(&response.body).text().map(str::to_string);
    Err(SyncError::Server {
        status: response.status,
        message,
    })
}
