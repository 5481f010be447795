use std::sync::Arc;

use chrono::Utc;
use teloxide::{
    prelude::*,
    types::{BotCommand, Me},
    RequestError,
};

use crate::{
    database::Database,
    link_decoder::extract_username,
    types::{SenderInfo, SubmissionOutcome},
};

pub fn generate_bot_commands() -> Vec<BotCommand> {
    vec![BotCommand {
        command: "start".to_string(),
        description: "Ask for a subscription link.".to_string(),
    }]
}

pub async fn handle_message(
    bot: Bot,
    me: Me,
    message: Message,
    database: Arc<Database>,
) -> Result<(), RequestError> {
    // Subscription links only make sense one-on-one. Stay quiet everywhere
    // else instead of nagging group chats about links.
    if !message.chat.is_private() {
        return Ok(());
    }

    if handle_command(&bot, &me, &message).await? {
        return Ok(());
    }

    let Some(user) = &message.from else {
        return Ok(());
    };
    let sender = SenderInfo::from_user(user);

    let outcome = process_submission(&database, message.text(), &sender).await;

    bot.send_message(message.chat.id, outcome.reply_text())
        .await?;

    Ok(())
}

/// Returns `true` if a command was parsed and responded to.
async fn handle_command(bot: &Bot, me: &Me, message: &Message) -> Result<bool, RequestError> {
    let Some(text) = message.text() else {
        return Ok(false);
    };
    if !text.starts_with('/') {
        return Ok(false);
    }
    let Some(command) = text.split_whitespace().next() else {
        return Ok(false);
    };

    // Trim the bot's username from the command and convert to lowercase.
    let username = format!("@{}", me.username());
    let command = command.trim_end_matches(username.as_str()).to_lowercase();

    match command.as_str() {
        "/start" | "/help" => {
            bot.send_message(message.chat.id, "Send your subscription link")
                .await?;
            Ok(true)
        }
        // Anything else falls through and gets judged as a link,
        // which it isn't, so the user gets the usual guidance.
        _ => Ok(false),
    }
}

/// Run one submitted message through validation, extraction and storage.
///
/// This never errors; every way a submission can go wrong maps to an
/// outcome with a reply of its own.
pub async fn process_submission(
    database: &Database,
    text: Option<&str>,
    sender: &SenderInfo,
) -> SubmissionOutcome {
    let Some(link) = text.map(str::trim).filter(|link| !link.is_empty()) else {
        return SubmissionOutcome::InvalidLink;
    };

    if !link.starts_with("http://") && !link.starts_with("https://") {
        return SubmissionOutcome::InvalidLink;
    }

    // The encoded payload is whatever follows the final slash.
    let payload = link.rsplit('/').next().unwrap_or("").trim();

    let Some(username) = extract_username(payload) else {
        log::debug!(
            "Could not extract a username for telegram id {}",
            sender.telegram_id
        );
        return SubmissionOutcome::DecodeFailed;
    };

    match database
        .save_subscription(
            &username,
            sender.telegram_id,
            &sender.telegram_username,
            &sender.telegram_name,
            Utc::now(),
        )
        .await
    {
        Ok(()) => {
            log::info!(
                "Saved subscription to {} for telegram id {}",
                username,
                sender.telegram_id
            );
            SubmissionOutcome::Stored
        }
        Err(err) => {
            log::error!(
                "Failed to save subscription for telegram id {}: {}",
                sender.telegram_id,
                err
            );
            SubmissionOutcome::StoreError
        }
    }
}
