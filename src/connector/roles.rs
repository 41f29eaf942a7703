//! Role resource type: membership entitlements, grants, and provisioning.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::types::{
    Annotation, Annotations, Entitlement, Grant, Page, Resource, ResourceId, ResourceTrait,
    ResourceType, ROLE_RESOURCE_TYPE, USER_RESOURCE_TYPE,
};
use super::{lenient_page_bounds, ResourceProvisioner, ResourceSyncer};
use crate::error::{ConnectorError, ConnectorResult};
use crate::pagination::PageToken;
use crate::privx::{GrantOutcome, PrivxClient, RemoteRole};

/// Slug of the single entitlement every role offers: "is a member of this role".
pub const ENTITLEMENT_ASSIGNED: &str = "assigned";

/// Lists PrivX roles, their membership entitlement and member grants.
pub struct RoleBuilder {
    client: Arc<PrivxClient>,
}

impl RoleBuilder {
    pub fn new(client: Arc<PrivxClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceSyncer for RoleBuilder {
    fn resource_type(&self) -> &ResourceType {
        &ROLE_RESOURCE_TYPE
    }

    async fn list(
        &self,
        ctx: &CancellationToken,
        _parent: Option<&ResourceId>,
        token: &PageToken,
    ) -> ConnectorResult<Page<Resource>> {
        debug!(page_token = %token.token, "Starting call to Roles.List");

        let (offset, limit) = lenient_page_bounds(token);

        let listing = self
            .client
            .list_roles(ctx, offset, limit)
            .await
            .inspect_err(|e| debug!(error = %e, "Error fetching roles"))?;

        let resources = listing
            .items
            .iter()
            .map(role_resource)
            .collect::<ConnectorResult<Vec<_>>>()?;

        Ok(Page::new(resources, listing.next_token))
    }

    async fn entitlements(
        &self,
        _ctx: &CancellationToken,
        resource: &Resource,
        _token: &PageToken,
    ) -> ConnectorResult<Page<Entitlement>> {
        Ok(Page::new(vec![assigned_entitlement(resource)], String::new()))
    }

    async fn grants(
        &self,
        ctx: &CancellationToken,
        resource: &Resource,
        token: &PageToken,
    ) -> ConnectorResult<Page<Grant>> {
        debug!(
            page_token = %token.token,
            role_id = %resource.id.resource,
            "Starting call to Roles.Grants"
        );

        let (offset, limit) = lenient_page_bounds(token);

        let listing = self
            .client
            .list_role_members(ctx, &resource.id.resource, offset, limit)
            .await?;

        let entitlement = assigned_entitlement(resource);
        let grants = listing
            .items
            .iter()
            .map(|user| Grant::new(&entitlement, ResourceId::new(&USER_RESOURCE_TYPE, &user.id)))
            .collect();

        Ok(Page::new(grants, listing.next_token))
    }
}

#[async_trait]
impl ResourceProvisioner for RoleBuilder {
    async fn grant(
        &self,
        ctx: &CancellationToken,
        principal: &Resource,
        entitlement: &Entitlement,
    ) -> ConnectorResult<Annotations> {
        ensure_user_principal("grant", &principal.id)?;

        let outcome = self
            .client
            .grant_role(ctx, &principal.id.resource, &entitlement.resource.id.resource)
            .await?;

        Ok(match outcome {
            GrantOutcome::AlreadyPresent => Annotations::with(Annotation::GrantAlreadyExists),
            _ => Annotations::new(),
        })
    }

    async fn revoke(&self, ctx: &CancellationToken, grant: &Grant) -> ConnectorResult<Annotations> {
        ensure_user_principal("revoke", &grant.principal)?;

        let outcome = self
            .client
            .revoke_role(
                ctx,
                &grant.principal.resource,
                &grant.entitlement.resource.id.resource,
            )
            .await?;

        Ok(match outcome {
            GrantOutcome::AlreadyAbsent => Annotations::with(Annotation::GrantAlreadyRevoked),
            _ => Annotations::new(),
        })
    }
}

/// Only users can hold roles. Checked before any remote call.
fn ensure_user_principal(operation: &'static str, principal: &ResourceId) -> ConnectorResult<()> {
    if principal.is_type(&USER_RESOURCE_TYPE) {
        return Ok(());
    }

    warn!(
        principal_type = %principal.resource_type,
        principal_id = %principal.resource,
        "{}: only users can be assigned roles",
        operation
    );

    Err(ConnectorError::InvalidPrincipalType {
        operation,
        principal_type: principal.resource_type.clone(),
        principal_id: principal.resource.clone(),
    })
}

/// The "assigned" membership entitlement of a role resource.
pub fn assigned_entitlement(resource: &Resource) -> Entitlement {
    Entitlement::assignment(
        resource,
        ENTITLEMENT_ASSIGNED,
        &[&*USER_RESOURCE_TYPE],
        format!("{} role {}", resource.display_name, ENTITLEMENT_ASSIGNED),
        format!("Has {} role membership", resource.display_name),
    )
}

/// Convert a PrivX role into a role resource.
pub fn role_resource(role: &RemoteRole) -> ConnectorResult<Resource> {
    let mut profile = serde_json::Map::new();
    profile.insert("name".to_string(), json!(role.name));

    let resource = Resource::new(&ROLE_RESOURCE_TYPE, &role.id, role.name.clone())?
        .with_profile(profile)
        .with_trait(ResourceTrait::Role);

    Ok(resource)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admins() -> Resource {
        role_resource(&RemoteRole {
            id: "r1".into(),
            name: "admins".into(),
        })
        .unwrap()
    }

    #[test]
    fn test_role_resource_mapping() {
        let resource = admins();
        assert_eq!(resource.id.resource_type, "role");
        assert_eq!(resource.id.resource, "r1");
        assert_eq!(resource.display_name, "admins");
        assert_eq!(resource.profile["name"], "admins");
        assert_eq!(resource.trait_data, Some(ResourceTrait::Role));
    }

    #[test]
    fn test_assigned_entitlement() {
        let entitlement = assigned_entitlement(&admins());
        assert_eq!(entitlement.id, "role:r1:assigned");
        assert_eq!(entitlement.slug, ENTITLEMENT_ASSIGNED);
        assert_eq!(entitlement.display_name, "admins role assigned");
        assert_eq!(entitlement.description, "Has admins role membership");
        assert_eq!(entitlement.grantable_to, vec!["user".to_string()]);
    }

    #[test]
    fn test_ensure_user_principal() {
        assert!(ensure_user_principal("grant", &ResourceId::new(&USER_RESOURCE_TYPE, "u1")).is_ok());

        let err =
            ensure_user_principal("revoke", &ResourceId::new(&ROLE_RESOURCE_TYPE, "r2")).unwrap_err();
        match err {
            ConnectorError::InvalidPrincipalType {
                operation,
                principal_type,
                principal_id,
            } => {
                assert_eq!(operation, "revoke");
                assert_eq!(principal_type, "role");
                assert_eq!(principal_id, "r2");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
