//! Role-store data models.

use serde::{Deserialize, Deserializer, Serialize};

/// A PrivX user as returned by the role store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteUser {
    /// Unique identifier (UUID).
    pub id: String,

    /// Full name, used as the display name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub full_name: String,

    /// Primary email address.
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
}

/// A PrivX role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRole {
    pub id: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

/// Entry in a user's role list.
///
/// Fields this connector does not interpret are carried through unchanged so
/// the read-modify-write in grant/revoke does not strip them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleRef {
    pub id: String,

    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub name: String,

    /// Directly assigned, as opposed to granted through a rule.
    #[serde(default, deserialize_with = "null_as_default")]
    pub explicit: bool,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RoleRef {
    /// Reference used when granting a role directly.
    pub fn explicit(role_id: &str) -> Self {
        Self {
            id: role_id.to_string(),
            name: String::new(),
            explicit: true,
            extra: serde_json::Map::new(),
        }
    }
}

/// Treat an explicit JSON `null` like a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One page of a remote listing plus the continuation token for the next one.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing<T> {
    pub items: Vec<T>,
    /// Empty when there are no more pages.
    pub next_token: String,
}

/// Result of a grant or revoke against the user's role list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantOutcome {
    /// The role list was rewritten.
    Applied,
    /// Grant skipped: the user already holds the role.
    AlreadyPresent,
    /// Revoke skipped: the user does not hold the role.
    AlreadyAbsent,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_missing_fields_default() {
        let user: RemoteUser = serde_json::from_value(json!({"id": "u1"})).unwrap();
        assert_eq!(user.id, "u1");
        assert!(user.full_name.is_empty());
        assert!(user.email.is_empty());
    }

    #[test]
    fn test_null_fields_default() {
        let user: RemoteUser =
            serde_json::from_value(json!({"id": "u1", "full_name": null, "email": null}))
                .unwrap();
        assert_eq!(user.id, "u1");
        assert!(user.full_name.is_empty());
        assert!(user.email.is_empty());

        let role: RemoteRole = serde_json::from_value(json!({"id": "r1", "name": null})).unwrap();
        assert!(role.name.is_empty());

        let role_ref: RoleRef =
            serde_json::from_value(json!({"id": "r1", "name": null, "explicit": null})).unwrap();
        assert!(role_ref.name.is_empty());
        assert!(!role_ref.explicit);
        assert!(role_ref.extra.is_empty());
    }

    #[test]
    fn test_role_ref_preserves_unknown_fields() {
        let value = json!({
            "id": "r1",
            "name": "admins",
            "explicit": false,
            "implicit": true,
            "source_id": "rule-7"
        });
        let role_ref: RoleRef = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(role_ref.extra.len(), 2);
        assert_eq!(serde_json::to_value(&role_ref).unwrap(), value);
    }

    #[test]
    fn test_explicit_role_ref() {
        let value = serde_json::to_value(RoleRef::explicit("r2")).unwrap();
        assert_eq!(value, json!({"id": "r2", "explicit": true}));
    }
}
