//! Resource, entitlement and grant shapes of the connector framework.

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::error::{ConnectorError, ConnectorResult};

/// Capability marker attached to a resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trait {
    User,
    Role,
}

/// Describes one kind of resource the connector syncs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceType {
    pub id: &'static str,
    pub display_name: &'static str,
    pub traits: Vec<Trait>,
}

pub static USER_RESOURCE_TYPE: Lazy<ResourceType> = Lazy::new(|| ResourceType {
    id: "user",
    display_name: "User",
    traits: vec![Trait::User],
});

pub static ROLE_RESOURCE_TYPE: Lazy<ResourceType> = Lazy::new(|| ResourceType {
    id: "role",
    display_name: "Role",
    traits: vec![Trait::Role],
});

/// Globally unique resource identifier: type plus remote ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResourceId {
    pub resource_type: String,
    pub resource: String,
}

impl ResourceId {
    pub fn new(resource_type: &ResourceType, resource: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.id.to_string(),
            resource: resource.into(),
        }
    }

    pub fn is_type(&self, resource_type: &ResourceType) -> bool {
        self.resource_type == resource_type.id
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.resource_type, self.resource)
    }
}

/// Account status reported in the user trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Enabled,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Email {
    pub address: String,
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserTrait {
    pub emails: Vec<Email>,
    pub status: UserStatus,
}

/// Trait data carried by a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "trait", rename_all = "lowercase")]
pub enum ResourceTrait {
    User(UserTrait),
    Role,
}

/// Standardized representation of a remote entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    pub id: ResourceId,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ResourceId>,
    pub profile: serde_json::Map<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trait_data: Option<ResourceTrait>,
}

impl Resource {
    /// Create a resource. Fails when `id` is empty.
    pub fn new(
        resource_type: &ResourceType,
        id: &str,
        display_name: impl Into<String>,
    ) -> ConnectorResult<Self> {
        if id.trim().is_empty() {
            return Err(ConnectorError::InvalidResource(format!(
                "{} with empty id",
                resource_type.id
            )));
        }

        Ok(Self {
            id: ResourceId::new(resource_type, id),
            display_name: display_name.into(),
            parent_id: None,
            profile: serde_json::Map::new(),
            trait_data: None,
        })
    }

    pub fn with_profile(mut self, profile: serde_json::Map<String, serde_json::Value>) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_trait(mut self, trait_data: ResourceTrait) -> Self {
        self.trait_data = Some(trait_data);
        self
    }

    pub fn user_trait(&self) -> Option<&UserTrait> {
        match &self.trait_data {
            Some(ResourceTrait::User(user)) => Some(user),
            _ => None,
        }
    }
}

/// What holding an entitlement means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntitlementPurpose {
    /// Membership of the resource.
    Assignment,
}

/// A grantable capability on a resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entitlement {
    /// `{resource_type}:{resource_id}:{slug}`
    pub id: String,
    pub resource: Resource,
    pub slug: String,
    pub display_name: String,
    pub description: String,
    pub grantable_to: Vec<String>,
    pub purpose: EntitlementPurpose,
}

impl Entitlement {
    /// Membership entitlement on `resource`.
    pub fn assignment(
        resource: &Resource,
        slug: &str,
        grantable_to: &[&ResourceType],
        display_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: format!("{}:{}", resource.id, slug),
            resource: resource.clone(),
            slug: slug.to_string(),
            display_name: display_name.into(),
            description: description.into(),
            grantable_to: grantable_to.iter().map(|t| t.id.to_string()).collect(),
            purpose: EntitlementPurpose::Assignment,
        }
    }
}

/// A principal holding an entitlement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grant {
    /// `{entitlement_id}:{principal_type}:{principal_id}`
    pub id: String,
    pub entitlement: Entitlement,
    pub principal: ResourceId,
}

impl Grant {
    pub fn new(entitlement: &Entitlement, principal: ResourceId) -> Self {
        Self {
            id: format!("{}:{}", entitlement.id, principal),
            entitlement: entitlement.clone(),
            principal,
        }
    }
}

/// Extra facts returned alongside a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Annotation {
    GrantAlreadyExists,
    GrantAlreadyRevoked,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Annotations(Vec<Annotation>);

impl Annotations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(annotation: Annotation) -> Self {
        Self(vec![annotation])
    }

    pub fn contains(&self, annotation: Annotation) -> bool {
        self.0.contains(&annotation)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Empty when there are no more pages.
    pub next_page_token: String,
    pub annotations: Annotations,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_page_token: impl Into<String>) -> Self {
        Self {
            items,
            next_page_token: next_page_token.into(),
            annotations: Annotations::new(),
        }
    }

    /// A final page with no items.
    pub fn empty() -> Self {
        Self::new(Vec::new(), String::new())
    }

    pub fn is_last(&self) -> bool {
        self.next_page_token.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(id: &str) -> Resource {
        Resource::new(&ROLE_RESOURCE_TYPE, id, "Admins").unwrap()
    }

    #[test]
    fn test_resource_rejects_empty_id() {
        let err = Resource::new(&USER_RESOURCE_TYPE, " ", "Nobody").unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidResource(_)));
    }

    #[test]
    fn test_entitlement_and_grant_ids() {
        let resource = role("r1");
        let entitlement =
            Entitlement::assignment(&resource, "assigned", &[&*USER_RESOURCE_TYPE], "d", "desc");
        assert_eq!(entitlement.id, "role:r1:assigned");
        assert_eq!(entitlement.grantable_to, vec!["user".to_string()]);

        let grant = Grant::new(&entitlement, ResourceId::new(&USER_RESOURCE_TYPE, "u1"));
        assert_eq!(grant.id, "role:r1:assigned:user:u1");
        assert_eq!(grant.entitlement.resource.id.resource, "r1");
    }

    #[test]
    fn test_annotations() {
        assert!(Annotations::new().is_empty());

        let annotations = Annotations::with(Annotation::GrantAlreadyExists);
        assert!(!annotations.is_empty());
        assert!(annotations.contains(Annotation::GrantAlreadyExists));
        assert!(!annotations.contains(Annotation::GrantAlreadyRevoked));
    }

    #[test]
    fn test_page_is_last() {
        assert!(Page::<Resource>::empty().is_last());
        assert!(!Page::new(vec![role("r1")], "1").is_last());
    }

    #[test]
    fn test_resource_type_ids() {
        assert!(ResourceId::new(&USER_RESOURCE_TYPE, "u1").is_type(&USER_RESOURCE_TYPE));
        assert!(!ResourceId::new(&ROLE_RESOURCE_TYPE, "r1").is_type(&USER_RESOURCE_TYPE));
    }
}
