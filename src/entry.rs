use std::{fs, sync::Arc};

use teloxide::{dptree::deps, prelude::*};

use crate::{database::Database, handlers};

/// # Panics
///
/// Panics if there's no key file, or the database can't be opened.
pub async fn entry() {
    let key = fs::read_to_string(match cfg!(debug_assertions) {
        true => "key_debug",
        false => "key",
    })
    .expect("Could not load bot key file!");

    let bot = Bot::new(key.trim());

    bot.set_my_commands(handlers::generate_bot_commands())
        .await
        .expect("Failed to set bot commands!");

    let database = Arc::new(Database::new().await.expect("Failed to open the database!"));

    log::info!("Creating the handler...");

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    log::info!("Dispatching the dispatcher!");

    Dispatcher::builder(bot, handler)
        .default_handler(|_| async {})
        .dependencies(deps![database])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    log::info!("Polling stopped.");
}
