use std::sync::OnceLock;

use regex::Regex;

use crate::{errors::Error, Result};

/// Maximum buttons Discord accepts in one action row.
pub const MAX_BUTTONS_PER_ROW: usize = 5;
/// Maximum action rows Discord accepts on one message.
pub const MAX_ROWS: usize = 5;

/// Accent colors shared by the bot's messages.
pub mod colors {
    pub const BRAND: u32 = 0x2965af;
    pub const ERROR: u32 = 0x9f0712;
    pub const AVAILABILITY: u32 = 0x9e2b2b;
    pub const REVIEW: u32 = 0x7e0404;
    pub const READY: u32 = 0x66bb6a;
}

/// Emoji usable in text and on buttons.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Emoji {
    Unicode(String),
    Custom {
        name: String,
        id: String,
        animated: bool,
    },
}

fn custom_emoji_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^<(a?):([A-Za-z0-9_]{2,32}):(\d{17,20})>$").expect("valid regex"))
}

impl Emoji {
    /// Parse either a `<:name:id>` / `<a:name:id>` mention or a plain unicode emoji.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(Error::Config("emoji must not be empty".to_string()));
        }
        if let Some(caps) = custom_emoji_re().captures(raw) {
            return Ok(Emoji::Custom {
                animated: &caps[1] == "a",
                name: caps[2].to_string(),
                id: caps[3].to_string(),
            });
        }
        if raw.starts_with('<') {
            return Err(Error::Config(format!("invalid custom emoji: {raw}")));
        }
        Ok(Emoji::Unicode(raw.to_string()))
    }

    /// Inline form for message text.
    pub fn mention(&self) -> String {
        match self {
            Emoji::Unicode(s) => s.clone(),
            Emoji::Custom { name, id, animated } => {
                let prefix = if *animated { "a" } else { "" };
                format!("<{prefix}:{name}:{id}>")
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonStyle {
    Primary,
    Secondary,
    Danger,
    Link,
}

/// A clickable control. `custom_id` routes clicks back to the bot; link
/// buttons carry a `url` instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub custom_id: String,
    pub style: ButtonStyle,
    pub emoji: Option<Emoji>,
    pub url: Option<String>,
    pub disabled: bool,
}

impl Button {
    pub fn new(custom_id: impl Into<String>, label: impl Into<String>, style: ButtonStyle) -> Self {
        Self {
            label: label.into(),
            custom_id: custom_id.into(),
            style,
            emoji: None,
            url: None,
            disabled: false,
        }
    }

    pub fn link(url: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            custom_id: String::new(),
            style: ButtonStyle::Link,
            emoji: None,
            url: Some(url.into()),
            disabled: false,
        }
    }

    pub fn emoji(mut self, emoji: Emoji) -> Self {
        self.emoji = Some(emoji);
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ButtonRow {
    pub buttons: Vec<Button>,
}

impl ButtonRow {
    pub fn new(buttons: Vec<Button>) -> Self {
        Self { buttons }
    }

    /// Lay buttons out left to right, starting a new row every `MAX_BUTTONS_PER_ROW`.
    pub fn chunked(buttons: Vec<Button>) -> Vec<Self> {
        buttons
            .chunks(MAX_BUTTONS_PER_ROW)
            .map(|c| Self::new(c.to_vec()))
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
}

/// A single-choice dropdown. Takes a whole action row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectMenu {
    pub custom_id: String,
    pub placeholder: String,
    pub options: Vec<SelectOption>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Embed {
    pub title: Option<String>,
    pub description: String,
    pub color: Option<u32>,
    pub footer: Option<String>,
}

impl Embed {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }
}

/// Platform-neutral message payload.
///
/// The engines build these; the Discord adapter turns them into serenity builders.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Message {
    pub content: Option<String>,
    pub embeds: Vec<Embed>,
    pub rows: Vec<ButtonRow>,
    pub select: Option<SelectMenu>,
}

impl Message {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn embed(embed: Embed) -> Self {
        Self {
            embeds: vec![embed],
            ..Self::default()
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_rows(mut self, rows: Vec<ButtonRow>) -> Self {
        self.rows = rows;
        self
    }

    pub fn with_select(mut self, select: SelectMenu) -> Self {
        self.select = Some(select);
        self
    }

    /// Every button on the message, row by row.
    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.rows.iter().flat_map(|r| r.buttons.iter())
    }
}

/// Mention a role in message text.
pub fn role_mention(role: &crate::domain::RoleId) -> String {
    format!("<@&{role}>")
}

/// Mention a user in message text.
pub fn user_mention(user: &crate::domain::UserId) -> String {
    format!("<@{user}>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_custom_and_unicode_emoji() {
        let e = Emoji::parse("<:ss_open:1366879016950431754>").unwrap();
        assert_eq!(
            e,
            Emoji::Custom {
                name: "ss_open".to_string(),
                id: "1366879016950431754".to_string(),
                animated: false
            }
        );
        assert_eq!(e.mention(), "<:ss_open:1366879016950431754>");

        let a = Emoji::parse("<a:redstars:1338652445882191893>").unwrap();
        assert!(matches!(a, Emoji::Custom { animated: true, .. }));

        assert_eq!(Emoji::parse("🟢").unwrap(), Emoji::Unicode("🟢".to_string()));
        assert!(Emoji::parse("<:broken>").is_err());
        assert!(Emoji::parse("  ").is_err());
    }

    #[test]
    fn chunked_rows_respect_row_width() {
        let buttons = (0..12)
            .map(|i| Button::new(format!("b{i}"), format!("B{i}"), ButtonStyle::Secondary))
            .collect::<Vec<_>>();
        let rows = ButtonRow::chunked(buttons);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].buttons.len(), 5);
        assert_eq!(rows[2].buttons.len(), 2);
        assert_eq!(rows[2].buttons[1].custom_id, "b11");
    }
}
