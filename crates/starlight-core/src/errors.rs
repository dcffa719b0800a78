/// Core error type for the bot.
///
/// Adapter crates map their specific errors (sqlx, serenity) into this type so
/// the dispatch shell can tell user-facing refusals apart from real failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("store error: {0}")]
    Store(String),

    #[error("external error: {0}")]
    External(String),

    #[error(transparent)]
    Refused(#[from] Refusal),
}

impl Error {
    /// The refusal carried by this error, if it is a user-facing one.
    pub fn refusal(&self) -> Option<&Refusal> {
        match self {
            Error::Refused(r) => Some(r),
            _ => None,
        }
    }
}

/// A request the bot declines to act on.
///
/// These are non-fatal and shown to the invoking user as-is; no state has
/// changed when one is returned.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Refusal {
    #[error("This service is not available anymore. If this is an unexpected error, please contact an administrator.")]
    ServiceUnavailable,

    #[error("This service is not configured to be ticketable.")]
    NotTicketable,

    #[error("It seems like you already have a ticket. Please ensure it is closed before opening a new one.")]
    AlreadyHasTicket,

    #[error("This channel is not a ticket channel.")]
    NotATicketChannel,

    #[error("Ticket names must be between {min} and {max} characters.")]
    InvalidName { min: usize, max: usize },

    #[error("Invalid review: {0}")]
    InvalidReview(String),
}

impl Refusal {
    /// Heading shown above the refusal message.
    pub fn title(&self) -> &'static str {
        match self {
            Refusal::NotATicketChannel => "How Did We Get Here?",
            _ => "Sorry!",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
