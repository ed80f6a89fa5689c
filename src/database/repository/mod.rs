//! Repository module - the surfaces command handlers talk to.

mod guild_settings;
mod guilds;
mod verification_history;

pub use guild_settings::GuildSettingsRepo;
pub use guilds::GuildRepo;
pub use verification_history::VerificationHistoryRepo;
