//! Guild configuration document.
//!
//! The shape serialized into a settings row's JSON blob. Field names are a
//! stable camelCase contract; renaming one requires a schema version bump
//! and a migration pass over stored documents.

use serde::{Deserialize, Deserializer, Serialize};

/// Schema tag written into newly created documents.
pub const SCHEMA_VERSION: i32 = 1;

/// Full configuration document for one guild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuildConfig {
    /// Monotonic schema tag, never below 1.
    #[serde(default = "default_schema_version")]
    pub schema_version: i32,

    /// Verification flow settings.
    #[serde(default, deserialize_with = "null_as_default")]
    pub verification: VerificationSettings,

    /// Named faction role mappings, in display order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub role_sets: Vec<RoleSet>,
}

/// Settings for the member verification flow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationSettings {
    /// Instructional image shown to applicants.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// Channel where verification requests await review.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_channel_id: Option<u64>,

    /// Channel notified when a request is approved or denied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_channel_id: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colonial_secure_channel_id: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warden_secure_channel_id: Option<u64>,

    /// Roles allowed to assign the recruit role.
    #[serde(default, deserialize_with = "null_as_default")]
    pub recruit_assigner_roles: Vec<u64>,

    /// Roles allowed to assign the ally role.
    #[serde(default, deserialize_with = "null_as_default")]
    pub ally_assigner_roles: Vec<u64>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub restricted_access: RestrictedAccessSettings,
}

/// Restricted-access channel mode settings.
///
/// The banner pointer changes on nearly every access-mode toggle, far more
/// often than anything else in the document, and has its own accessors on
/// the settings repository.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestrictedAccessSettings {
    /// Roles that stay restricted regardless of channel mode.
    #[serde(default, deserialize_with = "null_as_default")]
    pub always_restrict: Vec<u64>,

    /// Roles still allowed in while a channel is members-only.
    #[serde(default, deserialize_with = "null_as_default")]
    pub members_only: Vec<u64>,

    /// Channel holding the currently posted access-mode banner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<u64>,

    /// The banner message itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<u64>,
}

/// A named mapping from a membership tier to per-faction roles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleSet {
    /// Operator-entered label ("Faction", "Ally", "Recruit").
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colonial: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warden: Option<u64>,

    /// Faction-agnostic role, used when the tier has no per-faction split.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generic: Option<u64>,
}

impl Default for GuildConfig {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            verification: VerificationSettings::default(),
            role_sets: Vec::new(),
        }
    }
}

impl GuildConfig {
    /// Normalize a freshly deserialized document.
    ///
    /// Documents written before a field existed deserialize with lists
    /// already forced non-null at the serde boundary; this floors the schema
    /// tag so downstream checks can rely on it.
    pub fn ensure_defaults(&mut self) {
        self.schema_version = self.schema_version.max(1);
    }

    /// Look up a role set by name. Matching is case-insensitive.
    pub fn role_set(&self, name: &str) -> Option<&RoleSet> {
        self.role_sets
            .iter()
            .find(|set| set.name.eq_ignore_ascii_case(name))
    }

    /// Mutable case-insensitive role set lookup.
    pub fn role_set_mut(&mut self, name: &str) -> Option<&mut RoleSet> {
        self.role_sets
            .iter_mut()
            .find(|set| set.name.eq_ignore_ascii_case(name))
    }

    /// Replace the role set with a matching name, or append a new one.
    pub fn upsert_role_set(&mut self, set: RoleSet) {
        match self.role_set_mut(&set.name) {
            Some(existing) => *existing = set,
            None => self.role_sets.push(set),
        }
    }
}

fn default_schema_version() -> i32 {
    SCHEMA_VERSION
}

/// Deserialize an explicit `null` as the field's default value.
///
/// Older documents wrote `null` where newer ones omit the field entirely;
/// both come out as the default, so readers never see a null list.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_template_has_current_schema() {
        let config = GuildConfig::default();
        assert_eq!(config.schema_version, SCHEMA_VERSION);
        assert!(config.role_sets.is_empty());
        assert!(config.verification.recruit_assigner_roles.is_empty());
    }

    #[test]
    fn null_lists_deserialize_empty() {
        let json = r#"{
            "schemaVersion": 1,
            "verification": {
                "recruitAssignerRoles": null,
                "allyAssignerRoles": null,
                "restrictedAccess": { "alwaysRestrict": null, "membersOnly": null }
            },
            "roleSets": null
        }"#;

        let config: GuildConfig = serde_json::from_str(json).unwrap();
        assert!(config.verification.recruit_assigner_roles.is_empty());
        assert!(config.verification.ally_assigner_roles.is_empty());
        assert!(config.verification.restricted_access.always_restrict.is_empty());
        assert!(config.verification.restricted_access.members_only.is_empty());
        assert!(config.role_sets.is_empty());
    }

    #[test]
    fn missing_sections_deserialize_to_defaults() {
        let config: GuildConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.schema_version, SCHEMA_VERSION);
        assert_eq!(config.verification, VerificationSettings::default());
    }

    #[test]
    fn ensure_defaults_floors_schema_version() {
        let mut config: GuildConfig =
            serde_json::from_str(r#"{"schemaVersion": 0}"#).unwrap();
        config.ensure_defaults();
        assert_eq!(config.schema_version, 1);

        let mut ahead = GuildConfig {
            schema_version: 7,
            ..GuildConfig::default()
        };
        ahead.ensure_defaults();
        assert_eq!(ahead.schema_version, 7);
    }

    #[test]
    fn role_set_lookup_is_case_insensitive() {
        let mut config = GuildConfig::default();
        config.upsert_role_set(RoleSet {
            name: "Faction".into(),
            colonial: Some(10),
            warden: Some(20),
            generic: None,
        });

        assert_eq!(config.role_set("faction").unwrap().colonial, Some(10));
        assert_eq!(config.role_set("FACTION").unwrap().warden, Some(20));
        assert!(config.role_set("Ally").is_none());
    }

    #[test]
    fn upsert_role_set_replaces_by_name() {
        let mut config = GuildConfig::default();
        config.upsert_role_set(RoleSet {
            name: "Recruit".into(),
            generic: Some(1),
            ..RoleSet::default()
        });
        config.upsert_role_set(RoleSet {
            name: "recruit".into(),
            generic: Some(2),
            ..RoleSet::default()
        });

        assert_eq!(config.role_sets.len(), 1);
        assert_eq!(config.role_sets[0].generic, Some(2));
    }

    #[test]
    fn serializes_camel_case_field_names() {
        let mut config = GuildConfig::default();
        config.verification.recruit_assigner_roles.push(42);
        config.verification.restricted_access.channel_id = Some(7);

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"schemaVersion\""));
        assert!(json.contains("\"recruitAssignerRoles\""));
        assert!(json.contains("\"restrictedAccess\""));
        assert!(json.contains("\"channelId\""));
        // Unset options are omitted, not written as null.
        assert!(!json.contains("imageUrl"));
    }
}
