use std::{fmt, str::FromStr, sync::OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{errors::Error, Result};

fn snowflake_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{17,20}$").expect("valid regex"))
}

/// Discord ids are 17-20 digit numeric strings.
pub fn is_snowflake(s: &str) -> bool {
    snowflake_re().is_match(s)
}

macro_rules! snowflake_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Parse and validate a raw id string.
            pub fn parse(raw: &str) -> Result<Self> {
                let raw = raw.trim();
                if !is_snowflake(raw) {
                    return Err(Error::Config(format!(
                        "invalid {} value: {raw:?}",
                        stringify!($name)
                    )));
                }
                Ok(Self(raw.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

snowflake_id!(
    /// Discord user id.
    UserId
);
snowflake_id!(
    /// Discord channel id (text channels and categories alike).
    ChannelId
);
snowflake_id!(
    /// Discord guild id.
    GuildId
);
snowflake_id!(
    /// Discord role id.
    RoleId
);
/// A person acting on the bot, as seen by the engines.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    pub display_name: String,
}

// ============== Service availability ==============

/// Availability of one service offering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Open,
    Limited,
    #[default]
    Closed,
}

impl ServiceState {
    pub const ALL: [ServiceState; 3] = [ServiceState::Open, ServiceState::Limited, ServiceState::Closed];

    /// Toggle order: open → limited → closed → open.
    pub fn next(self) -> Self {
        match self {
            ServiceState::Open => ServiceState::Limited,
            ServiceState::Limited => ServiceState::Closed,
            ServiceState::Closed => ServiceState::Open,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceState::Open => "open",
            ServiceState::Limited => "limited",
            ServiceState::Closed => "closed",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ServiceState::Open => "Open",
            ServiceState::Limited => "Limited",
            ServiceState::Closed => "Closed",
        }
    }
}

impl FromStr for ServiceState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "open" => Ok(ServiceState::Open),
            "limited" => Ok(ServiceState::Limited),
            "closed" => Ok(ServiceState::Closed),
            other => Err(Error::Store(format!("unknown service state: {other}"))),
        }
    }
}

// ============== Tickets ==============

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    #[default]
    Open,
    Claimed,
    Completed,
}

impl TicketStatus {
    /// Channel-name prefix for the status.
    pub fn glyph(self) -> &'static str {
        match self {
            TicketStatus::Open => "🔴",
            TicketStatus::Claimed => "🟡",
            TicketStatus::Completed => "🟢",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::Claimed => "claimed",
            TicketStatus::Completed => "completed",
        }
    }
}

impl FromStr for TicketStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "open" => Ok(TicketStatus::Open),
            "claimed" => Ok(TicketStatus::Claimed),
            "completed" => Ok(TicketStatus::Completed),
            other => Err(Error::Store(format!("unknown ticket status: {other}"))),
        }
    }
}

/// A persisted ticket row.
///
/// Values are never mutated in place: transitions return a new `Ticket`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ticket {
    pub id: i64,
    pub owner_id: UserId,
    pub channel_id: ChannelId,
    pub claimed_by_id: Option<UserId>,
    pub status: TicketStatus,
}

impl Ticket {
    /// Assign `actor`. Status only moves forward, so a completed ticket stays completed.
    pub fn claimed_by(&self, actor: &UserId) -> Self {
        let status = match self.status {
            TicketStatus::Completed => TicketStatus::Completed,
            _ => TicketStatus::Claimed,
        };
        Self {
            claimed_by_id: Some(actor.clone()),
            status,
            ..self.clone()
        }
    }

    pub fn completed(&self) -> Self {
        Self {
            status: TicketStatus::Completed,
            ..self.clone()
        }
    }
}

/// Partial update applied to a ticket row. `None` fields are left alone.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TicketUpdate {
    pub claimed_by_id: Option<UserId>,
    pub status: Option<TicketStatus>,
}
