//! Connector framework contract and the PrivX connector.
//!
//! The orchestrator drives each [`ResourceSyncer`] by calling `list` with the
//! token it got back last time until the token comes back empty, then asks for
//! entitlements and grants per resource. [`ResourceProvisioner`] adds
//! grant/revoke for resource types that support it.

pub mod roles;
pub mod types;
pub mod users;

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::config::Config;
use crate::error::ConnectorResult;
use crate::pagination::{parse_page_token, PageToken};
use crate::privx::PrivxClient;

pub use roles::{role_resource, RoleBuilder, ENTITLEMENT_ASSIGNED};
pub use types::{
    Annotation, Annotations, Entitlement, Grant, Page, Resource, ResourceId, ResourceType,
    ROLE_RESOURCE_TYPE, USER_RESOURCE_TYPE,
};
pub use users::{user_resource, UserBuilder};

/// Sync side of a resource type.
#[async_trait]
pub trait ResourceSyncer: Send + Sync {
    /// Descriptor of the resource type this builder produces.
    fn resource_type(&self) -> &ResourceType;

    /// List one page of resources.
    async fn list(
        &self,
        ctx: &CancellationToken,
        parent: Option<&ResourceId>,
        token: &PageToken,
    ) -> ConnectorResult<Page<Resource>>;

    /// List one page of entitlements offered by `resource`.
    async fn entitlements(
        &self,
        ctx: &CancellationToken,
        resource: &Resource,
        token: &PageToken,
    ) -> ConnectorResult<Page<Entitlement>>;

    /// List one page of grants on `resource`.
    async fn grants(
        &self,
        ctx: &CancellationToken,
        resource: &Resource,
        token: &PageToken,
    ) -> ConnectorResult<Page<Grant>>;
}

/// Provisioning side of a resource type.
#[async_trait]
pub trait ResourceProvisioner: ResourceSyncer {
    /// Give `principal` the `entitlement`.
    async fn grant(
        &self,
        ctx: &CancellationToken,
        principal: &Resource,
        entitlement: &Entitlement,
    ) -> ConnectorResult<Annotations>;

    /// Take away an existing grant.
    async fn revoke(&self, ctx: &CancellationToken, grant: &Grant) -> ConnectorResult<Annotations>;
}

/// The PrivX connector: owns the API client and hands out the builders.
#[derive(Clone)]
pub struct PrivxConnector {
    client: Arc<PrivxClient>,
}

impl PrivxConnector {
    pub fn new(client: Arc<PrivxClient>) -> Self {
        Self { client }
    }

    /// Build a connector from validated configuration.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(Arc::new(PrivxClient::new(config)?)))
    }

    /// Check that the configured credentials can obtain an access token.
    pub async fn validate(&self, ctx: &CancellationToken) -> ConnectorResult<()> {
        self.client.verify_credentials(ctx).await
    }

    pub fn user_builder(&self) -> UserBuilder {
        UserBuilder::new(Arc::clone(&self.client))
    }

    pub fn role_builder(&self) -> RoleBuilder {
        RoleBuilder::new(Arc::clone(&self.client))
    }

    /// Every resource type this connector syncs, in sync order.
    pub fn resource_syncers(&self) -> Vec<Arc<dyn ResourceSyncer>> {
        vec![Arc::new(self.user_builder()), Arc::new(self.role_builder())]
    }
}

/// Decode `token` into `(offset, limit)`, falling back to offset 0 on a
/// malformed token. A bad token never fails a sync.
pub(crate) fn lenient_page_bounds(token: &PageToken) -> (u64, u32) {
    match parse_page_token(token) {
        Ok(bounds) => bounds,
        Err(e) => {
            error!(error = %e, "invalid page token");
            (0, token.limit())
        }
    }
}
