//! User resource type.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::types::{
    Email, Entitlement, Grant, Page, Resource, ResourceId, ResourceTrait, ResourceType,
    UserStatus, UserTrait, USER_RESOURCE_TYPE,
};
use super::{lenient_page_bounds, ResourceSyncer};
use crate::error::ConnectorResult;
use crate::pagination::PageToken;
use crate::privx::{PrivxClient, RemoteUser};

/// Lists PrivX users. Users are only ever grant targets, so they offer no
/// entitlements and carry no grants.
pub struct UserBuilder {
    client: Arc<PrivxClient>,
}

impl UserBuilder {
    pub fn new(client: Arc<PrivxClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceSyncer for UserBuilder {
    fn resource_type(&self) -> &ResourceType {
        &USER_RESOURCE_TYPE
    }

    async fn list(
        &self,
        ctx: &CancellationToken,
        _parent: Option<&ResourceId>,
        token: &PageToken,
    ) -> ConnectorResult<Page<Resource>> {
        debug!(page_token = %token.token, "Starting call to Users.List");

        let (offset, limit) = lenient_page_bounds(token);

        let listing = self
            .client
            .list_users(ctx, offset, limit)
            .await
            .inspect_err(|e| debug!(error = %e, "Error fetching users"))?;

        let resources = listing
            .items
            .iter()
            .map(user_resource)
            .collect::<ConnectorResult<Vec<_>>>()?;

        Ok(Page::new(resources, listing.next_token))
    }

    async fn entitlements(
        &self,
        _ctx: &CancellationToken,
        _resource: &Resource,
        _token: &PageToken,
    ) -> ConnectorResult<Page<Entitlement>> {
        Ok(Page::empty())
    }

    async fn grants(
        &self,
        _ctx: &CancellationToken,
        _resource: &Resource,
        _token: &PageToken,
    ) -> ConnectorResult<Page<Grant>> {
        Ok(Page::empty())
    }
}

/// Convert a PrivX user into a user resource.
///
/// Status is always reported enabled: the role store exposes no disable signal
/// this connector reads.
pub fn user_resource(user: &RemoteUser) -> ConnectorResult<Resource> {
    let mut profile = serde_json::Map::new();
    profile.insert("full_name".to_string(), json!(user.full_name));
    profile.insert("id".to_string(), json!(user.id));

    let emails = if user.email.is_empty() {
        Vec::new()
    } else {
        vec![Email {
            address: user.email.clone(),
            verified: true,
        }]
    };

    let resource = Resource::new(&USER_RESOURCE_TYPE, &user.id, user.full_name.clone())?
        .with_profile(profile)
        .with_trait(ResourceTrait::User(UserTrait {
            emails,
            status: UserStatus::Enabled,
        }));

    Ok(resource)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConnectorError;

    fn jane() -> RemoteUser {
        RemoteUser {
            id: "u1".into(),
            full_name: "Jane Doe".into(),
            email: "jane@x.com".into(),
        }
    }

    #[test]
    fn test_user_resource_mapping() {
        let resource = user_resource(&jane()).unwrap();

        assert_eq!(resource.display_name, "Jane Doe");
        assert_eq!(resource.id.resource, "u1");
        assert_eq!(resource.id.resource_type, "user");

        let user_trait = resource.user_trait().unwrap();
        assert_eq!(
            user_trait.emails,
            vec![Email {
                address: "jane@x.com".into(),
                verified: true,
            }]
        );
        assert_eq!(user_trait.status, UserStatus::Enabled);
    }

    #[test]
    fn test_user_profile_fields() {
        let resource = user_resource(&jane()).unwrap();
        assert_eq!(resource.profile["full_name"], "Jane Doe");
        assert_eq!(resource.profile["id"], "u1");
        assert_eq!(resource.profile.len(), 2);
    }

    #[test]
    fn test_user_without_email_has_no_email_entry() {
        let mut user = jane();
        user.email.clear();
        let resource = user_resource(&user).unwrap();
        assert!(resource.user_trait().unwrap().emails.is_empty());
    }

    #[test]
    fn test_user_with_empty_id_fails() {
        let mut user = jane();
        user.id.clear();
        assert!(matches!(
            user_resource(&user),
            Err(ConnectorError::InvalidResource(_))
        ));
    }
}
