//! Source code for a subscription registration bot. Users send it their
//! subscription link in a private chat, and it records who submitted which
//! embedded username.

/// Various types used throughout.
pub mod types;

/// Extracting usernames out of encoded subscription links.
pub mod link_decoder;

/// The database.
pub mod database;

/// Functions that handle events from Telegram.
pub mod handlers;

/// Entry function that starts the bot.
mod entry;
pub use entry::*;
