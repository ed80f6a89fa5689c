//! Data models.

mod guild;
mod guild_config;
mod settings_record;
mod verification;

pub use guild::Guild;
pub use guild_config::{
    GuildConfig, RestrictedAccessSettings, RoleSet, SCHEMA_VERSION, VerificationSettings,
};
pub use settings_record::{GuildSettingsRecord, Revision, SettingsHistoryEntry};
pub use verification::{Faction, ParseFactionError, VerificationBrief, VerificationRecord};
