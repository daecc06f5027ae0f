//! Normalization of raw provider profiles into the canonical record.

use crate::config::ProfileFieldMap;
use arena_identity_core::FederatedIdentity;
use serde_json::Value;

/// Normalize a raw provider profile using the provider's field-name table.
///
/// Purely mechanical: absent fields map to empty values, and validation is
/// the flow controller's responsibility.
pub fn map_profile(profile: &Value, fields: &ProfileFieldMap) -> FederatedIdentity {
    let external_id = field_string(profile, &fields.external_id).unwrap_or_default();
    let email = field_string(profile, &fields.email).unwrap_or_default();

    let mut candidate_usernames: Vec<String> = fields
        .username_fields
        .iter()
        .filter_map(|name| field_string(profile, name))
        .filter(|value| !value.is_empty())
        .collect();

    // Account creation needs at least one candidate to try; the external id
    // is the fallback of last resort.
    if candidate_usernames.is_empty() && !external_id.is_empty() {
        candidate_usernames.push(external_id.clone());
    }

    let avatar = fields
        .avatar
        .as_ref()
        .and_then(|name| field_string(profile, name))
        .filter(|value| !value.is_empty())
        .map(|url| format!("url:{url}"));

    let mut extra = serde_json::Map::new();
    for name in &fields.passthrough {
        if let Some(value) = profile.get(name) {
            if !value.is_null() {
                extra.insert(name.clone(), value.clone());
            }
        }
    }

    FederatedIdentity {
        external_id,
        email,
        candidate_usernames,
        avatar,
        extra,
    }
}

/// Read a profile field as a string, coercing numeric ids.
fn field_string(profile: &Value, name: &str) -> Option<String> {
    match profile.get(name)? {
        Value::String(value) => Some(value.clone()),
        Value::Number(value) => Some(value.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_field_map() {
        let profile = json!({
            "sub": "123456",
            "email": "user@example.com",
            "name": "Test User",
            "picture": "https://example.com/picture.jpg"
        });

        let identity = map_profile(&profile, &ProfileFieldMap::default());

        assert_eq!(identity.external_id, "123456");
        assert_eq!(identity.email, "user@example.com");
        assert_eq!(identity.candidate_usernames, vec!["Test User"]);
        assert_eq!(
            identity.avatar.as_deref(),
            Some("url:https://example.com/picture.jpg")
        );
        assert!(identity.extra.is_empty());
    }

    #[test]
    fn test_open_id_shape() {
        let fields = ProfileFieldMap {
            external_id: "openId".to_string(),
            email: "email".to_string(),
            username_fields: vec!["name".to_string()],
            avatar: Some("avatar".to_string()),
            passthrough: vec!["studentId".to_string(), "ojUid".to_string()],
        };

        let profile = json!({
            "openId": "wx-9f2c",
            "email": "student@school.edu",
            "name": "Zhang San",
            "avatar": "https://cdn.example/avatars/9f2c.png",
            "studentId": "20230421",
            "ojUid": 8841
        });

        let identity = map_profile(&profile, &fields);

        assert_eq!(identity.external_id, "wx-9f2c");
        assert_eq!(identity.candidate_usernames, vec!["Zhang San"]);
        assert_eq!(identity.extra["studentId"], "20230421");
        assert_eq!(identity.extra["ojUid"], 8841);
    }

    #[test]
    fn test_nickname_shape_with_numeric_id() {
        let fields = ProfileFieldMap {
            external_id: "id".to_string(),
            email: "email".to_string(),
            username_fields: vec!["nickname".to_string(), "login".to_string()],
            avatar: None,
            passthrough: vec!["uid".to_string()],
        };

        let profile = json!({
            "id": 99120,
            "email": "dev@example.com",
            "nickname": "octocat",
            "login": "octocat2",
            "uid": "u-99120"
        });

        let identity = map_profile(&profile, &fields);

        assert_eq!(identity.external_id, "99120");
        assert_eq!(identity.candidate_usernames, vec!["octocat", "octocat2"]);
        assert!(identity.avatar.is_none());
        assert_eq!(identity.extra["uid"], "u-99120");
    }

    #[test]
    fn test_missing_email_maps_to_empty() {
        let profile = json!({ "sub": "123456", "name": "No Email" });

        let identity = map_profile(&profile, &ProfileFieldMap::default());

        assert_eq!(identity.external_id, "123456");
        assert!(identity.email.is_empty());
    }

    #[test]
    fn test_username_falls_back_to_external_id() {
        let profile = json!({ "sub": "123456", "email": "user@example.com" });

        let identity = map_profile(&profile, &ProfileFieldMap::default());

        assert_eq!(identity.candidate_usernames, vec!["123456"]);
    }

    #[test]
    fn test_missing_everything_maps_to_empty() {
        let identity = map_profile(&json!({}), &ProfileFieldMap::default());

        assert!(identity.external_id.is_empty());
        assert!(identity.email.is_empty());
        assert!(identity.candidate_usernames.is_empty());
        assert!(identity.avatar.is_none());
    }
}
