use teloxide::types::User;

/// Identity of whoever sent us a message, in the shape it gets stored
/// alongside their subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderInfo {
    pub telegram_id: i64,
    /// `@username`, or an empty string if the user has none.
    pub telegram_username: String,
    /// First name, or "first last" if a last name is set.
    pub telegram_name: String,
}

impl SenderInfo {
    pub fn from_user(user: &User) -> Self {
        let telegram_username = match &user.username {
            Some(username) => format!("@{username}"),
            None => String::new(),
        };

        let telegram_name = match &user.last_name {
            Some(last_name) => format!("{} {last_name}", user.first_name),
            None => user.first_name.clone(),
        };

        SenderInfo {
            telegram_id: user.id.0 as i64,
            telegram_username,
            telegram_name,
        }
    }
}

/// What came out of handling a single submitted message.
/// Each variant maps to one reply text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// The message wasn't a link at all.
    InvalidLink,
    /// The link was well-formed, but no username could be extracted.
    DecodeFailed,
    /// The subscription was written (created or refreshed).
    Stored,
    /// The database write failed. Details are in the log, not the reply.
    StoreError,
}

impl SubmissionOutcome {
    pub fn reply_text(self) -> &'static str {
        match self {
            SubmissionOutcome::InvalidLink => {
                "Please send a valid link that starts with http:// or https://"
            }
            SubmissionOutcome::DecodeFailed => "Could not extract a username from this link",
            SubmissionOutcome::Stored => "Your subscription has been registered",
            SubmissionOutcome::StoreError => "An error occurred. Please try again",
        }
    }
}
