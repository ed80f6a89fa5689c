//! Verification audit trail.
//!
//! Append-only log of verification approvals. The read paths power
//! reviewer embeds: a short per-user track record and the user's most
//! recent faction.

use futures::TryStreamExt;
use mongodb::Collection;
use mongodb::bson::doc;
use tracing::debug;

use crate::database::Database;
use crate::database::models::{Faction, VerificationBrief, VerificationRecord};
use crate::error::Result;

/// Repository for verification approval records.
#[derive(Clone)]
pub struct VerificationHistoryRepo {
    collection: Collection<VerificationRecord>,
}

impl VerificationHistoryRepo {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("verification_records"),
        }
    }

    /// Record an approval.
    pub async fn log_approval(
        &self,
        guild_id: u64,
        user_id: u64,
        faction: Faction,
        image_url: Option<String>,
        approved_by: Option<u64>,
    ) -> Result<()> {
        let record = VerificationRecord {
            id: None,
            guild_id,
            user_id,
            faction,
            image_url,
            approved_by,
            approved_at: chrono::Utc::now(),
        };

        self.collection.insert_one(&record).await?;
        debug!("Logged {faction} verification for user {user_id} in guild {guild_id}");
        Ok(())
    }

    /// The user's most recent approvals, newest first.
    pub async fn track_record(&self, user_id: u64, take: usize) -> Result<Vec<VerificationBrief>> {
        let filter = doc! { "user_id": user_id as i64 };
        let records: Vec<VerificationRecord> = self
            .collection
            .find(filter)
            .sort(doc! { "approved_at": -1 })
            .limit(take.max(1) as i64)
            .await?
            .try_collect()
            .await?;

        Ok(records
            .into_iter()
            .map(|record| VerificationBrief {
                faction: record.faction,
                approved_at: record.approved_at,
            })
            .collect())
    }

    /// Faction from the user's most recent approval, if any.
    pub async fn most_recent_faction(&self, user_id: u64) -> Result<Option<Faction>> {
        Ok(self
            .track_record(user_id, 1)
            .await?
            .first()
            .map(|brief| brief.faction))
    }
}
