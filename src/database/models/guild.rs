//! Guild directory row.
//!
//! Display metadata lives outside the settings document so frequent
//! settings writes never contend with rename events.

use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Per-guild display metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Guild {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub guild_id: u64,

    /// Guild name as last observed from the gateway.
    #[serde(default)]
    pub name: Option<String>,

    /// Short clan-style tag, preferred over the name when displaying.
    #[serde(default)]
    pub tag: Option<String>,

    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl Guild {
    pub fn new(guild_id: u64) -> Self {
        Self {
            id: None,
            guild_id,
            name: None,
            tag: None,
            created_at: Utc::now(),
        }
    }

    /// Tag when set, name as fallback, nothing when neither is usable.
    pub fn display_name(&self) -> Option<&str> {
        let usable = |s: &&str| !s.trim().is_empty();
        self.tag
            .as_deref()
            .filter(usable)
            .or_else(|| self.name.as_deref().filter(usable))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_prefers_tag() {
        let mut guild = Guild::new(1);
        assert_eq!(guild.display_name(), None);

        guild.name = Some("Warden Logistics".into());
        assert_eq!(guild.display_name(), Some("Warden Logistics"));

        guild.tag = Some("WLL".into());
        assert_eq!(guild.display_name(), Some("WLL"));
    }

    #[test]
    fn blank_tag_falls_back_to_name() {
        let mut guild = Guild::new(1);
        guild.name = Some("Warden Logistics".into());
        guild.tag = Some("   ".into());
        assert_eq!(guild.display_name(), Some("Warden Logistics"));
    }
}
