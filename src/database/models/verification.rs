//! Verification approval records.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Faction a verified member belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Faction {
    Colonial,
    Warden,
}

#[derive(Debug, Error)]
#[error("unknown faction: {0:?}")]
pub struct ParseFactionError(String);

impl FromStr for Faction {
    type Err = ParseFactionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "colonial" => Ok(Faction::Colonial),
            "warden" => Ok(Faction::Warden),
            _ => Err(ParseFactionError(s.to_owned())),
        }
    }
}

impl std::fmt::Display for Faction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Faction::Colonial => write!(f, "Colonial"),
            Faction::Warden => write!(f, "Warden"),
        }
    }
}

/// One verification approval, append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationRecord {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub guild_id: u64,

    pub user_id: u64,

    pub faction: Faction,

    /// Evidence screenshot attached to the request.
    #[serde(default)]
    pub image_url: Option<String>,

    /// Reviewer who approved, when the approval wasn't automatic.
    #[serde(default)]
    pub approved_by: Option<u64>,

    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub approved_at: DateTime<Utc>,
}

/// Compact approval view for track-record embeds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerificationBrief {
    pub faction: Faction,
    pub approved_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn faction_parses_case_insensitively() {
        assert_eq!("colonial".parse::<Faction>().unwrap(), Faction::Colonial);
        assert_eq!("WARDEN".parse::<Faction>().unwrap(), Faction::Warden);
        assert_eq!(" Warden ".parse::<Faction>().unwrap(), Faction::Warden);
        assert!("neutral".parse::<Faction>().is_err());
    }
}
