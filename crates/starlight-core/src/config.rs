use std::{
    collections::HashSet,
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::{
    board::MAX_SERVICES,
    domain::{ChannelId, RoleId, ServiceState, UserId},
    errors::Error,
    messaging::types::Emoji,
    Result,
};

const CONFIG_FILE_NAME: &str = "config.toml";
const DEFAULT_DATABASE_URL: &str = "sqlite://starlight.db";
/// Offering names end up in button labels (`{name}: {State}`), which Discord caps at 80.
pub const MAX_OFFERING_NAME_LEN: usize = 64;
/// Idle window of a service board session when none is configured.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(180);

/// Typed configuration, built once at startup and shared as `Arc<Config>`.
#[derive(Clone, Debug)]
pub struct Config {
    pub bot_id: UserId,
    pub bot_token: String,
    pub database_url: String,

    pub ready_channel: Option<ChannelId>,
    pub review_channel: ChannelId,

    // Audit
    pub audit_log_path: Option<PathBuf>,
    pub audit_log_json: bool,

    pub services: ServicesConfig,

    /// Where the config was read from (None when parsed from a string).
    pub source: Option<PathBuf>,
}

#[derive(Clone, Debug, Default)]
pub struct ServicesConfig {
    pub availability: Option<AvailabilityConfig>,
    /// Offerings in display order.
    pub offerings: Vec<ServiceOffering>,
}

impl ServicesConfig {
    pub fn offering(&self, id: &str) -> Option<&ServiceOffering> {
        self.offerings.iter().find(|o| o.id == id)
    }
}

#[derive(Clone, Debug)]
pub struct AvailabilityConfig {
    /// Channel receiving availability announcements.
    pub channel: ChannelId,
    pub notify_role: RoleId,
    /// Idle window after which an editing session is finalized.
    pub idle_timeout: Duration,
    pub emojis: StatusEmojis,
}

#[derive(Clone, Debug)]
pub struct StatusEmojis {
    pub open: Emoji,
    pub limited: Emoji,
    pub closed: Emoji,
}

impl Default for StatusEmojis {
    fn default() -> Self {
        Self {
            open: Emoji::Unicode("🟢".to_string()),
            limited: Emoji::Unicode("🟡".to_string()),
            closed: Emoji::Unicode("🔴".to_string()),
        }
    }
}

impl StatusEmojis {
    pub fn for_state(&self, state: ServiceState) -> &Emoji {
        match state {
            ServiceState::Open => &self.open,
            ServiceState::Limited => &self.limited,
            ServiceState::Closed => &self.closed,
        }
    }
}

/// A configured category of request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceOffering {
    pub id: String,
    pub name: String,
    /// Category new ticket channels are created under; `None` disables tickets.
    pub ticket_category: Option<ChannelId>,
    /// Role pinged in new tickets.
    pub staff_role: Option<RoleId>,
}

// ============== File layout ==============

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    bot: RawBot,
    database_url: Option<String>,
    ready_channel: Option<String>,
    review_channel: String,
    audit_log: Option<PathBuf>,
    audit_log_json: Option<bool>,
    #[serde(default)]
    services: RawServices,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBot {
    id: String,
    token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawServices {
    availability: Option<RawAvailability>,
    #[serde(default)]
    offerings: Vec<RawOffering>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAvailability {
    channel: String,
    notify_role: String,
    idle_timeout_secs: Option<u64>,
    emojis: Option<RawEmojis>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEmojis {
    open: Option<String>,
    limited: Option<String>,
    closed: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawOffering {
    id: String,
    name: String,
    ticket_category: Option<String>,
    staff_role: Option<String>,
}

impl Config {
    /// Load `.env`, locate `config.toml` and apply environment overrides.
    ///
    /// Lookup order: `STARLIGHT_CONFIG`, then the first `config.toml` found
    /// walking up from the current directory.
    pub fn load() -> Result<Self> {
        // Existing variables win over `.env`.
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(Error::Config(format!("failed to read .env: {e}")));
            }
        }

        let path = match env_path("STARLIGHT_CONFIG") {
            Some(p) => p,
            None => {
                let cwd = env::current_dir()?;
                find_config_file(&cwd).ok_or_else(|| {
                    Error::Config(format!(
                        "failed to find a {CONFIG_FILE_NAME} in {} or any parent directory",
                        cwd.display()
                    ))
                })?
            }
        };

        let text = fs::read_to_string(&path).map_err(|e| {
            Error::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let mut cfg = Self::parse(&text)?;
        cfg.source = Some(path);

        if let Some(token) = env_str("DISCORD_TOKEN").and_then(non_empty) {
            cfg.bot_token = token;
        }
        if let Some(url) = env_str("DATABASE_URL").and_then(non_empty) {
            cfg.database_url = url;
        }

        if cfg.bot_token.trim().is_empty() {
            return Err(Error::Config(
                "bot token is required (bot.token or DISCORD_TOKEN)".to_string(),
            ));
        }

        Ok(cfg)
    }

    /// Parse and validate a config document without consulting the environment.
    pub fn parse(text: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(text)?;

        let bot_id = UserId::parse(&raw.bot.id)?;
        let ready_channel = raw
            .ready_channel
            .as_deref()
            .map(ChannelId::parse)
            .transpose()?;
        let review_channel = ChannelId::parse(&raw.review_channel)?;
        let services = parse_services(raw.services)?;

        Ok(Self {
            bot_id,
            bot_token: raw.bot.token.unwrap_or_default(),
            database_url: raw
                .database_url
                .and_then(non_empty)
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            ready_channel,
            review_channel,
            audit_log_path: raw.audit_log,
            audit_log_json: raw.audit_log_json.unwrap_or(true),
            services,
            source: None,
        })
    }
}

fn parse_services(raw: RawServices) -> Result<ServicesConfig> {
    if raw.offerings.len() > MAX_SERVICES {
        return Err(Error::Config(format!(
            "at most {MAX_SERVICES} service offerings are supported, found {}",
            raw.offerings.len()
        )));
    }

    let mut seen = HashSet::new();
    let mut offerings = Vec::with_capacity(raw.offerings.len());
    for o in raw.offerings {
        let id = o.id.trim().to_string();
        if id.is_empty() || o.name.trim().is_empty() {
            return Err(Error::Config(
                "service offerings need a non-empty id and name".to_string(),
            ));
        }
        if !seen.insert(id.clone()) {
            return Err(Error::Config(format!("duplicate service offering id: {id}")));
        }
        let name = o.name.trim().to_string();
        if name.chars().count() > MAX_OFFERING_NAME_LEN {
            return Err(Error::Config(format!(
                "service offering {id}: name is longer than {MAX_OFFERING_NAME_LEN} characters"
            )));
        }
        offerings.push(ServiceOffering {
            id,
            name,
            ticket_category: o.ticket_category.as_deref().map(ChannelId::parse).transpose()?,
            staff_role: o.staff_role.as_deref().map(RoleId::parse).transpose()?,
        });
    }

    let availability = match raw.availability {
        Some(a) => Some(parse_availability(a)?),
        None if !offerings.is_empty() => {
            return Err(Error::Config(
                "services.availability is required when offerings are configured".to_string(),
            ));
        }
        None => None,
    };

    Ok(ServicesConfig {
        availability,
        offerings,
    })
}

fn parse_availability(raw: RawAvailability) -> Result<AvailabilityConfig> {
    let defaults = StatusEmojis::default();
    let emojis = raw.emojis.unwrap_or_default();
    let pick = |v: Option<String>, fallback: Emoji| -> Result<Emoji> {
        match v {
            Some(s) => Emoji::parse(&s),
            None => Ok(fallback),
        }
    };

    let idle = raw
        .idle_timeout_secs
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_IDLE_TIMEOUT);
    if idle.is_zero() {
        return Err(Error::Config(
            "services.availability.idle_timeout_secs must be positive".to_string(),
        ));
    }

    Ok(AvailabilityConfig {
        channel: ChannelId::parse(&raw.channel)?,
        notify_role: RoleId::parse(&raw.notify_role)?,
        idle_timeout: idle,
        emojis: StatusEmojis {
            open: pick(emojis.open, defaults.open)?,
            limited: pick(emojis.limited, defaults.limited)?,
            closed: pick(emojis.closed, defaults.closed)?,
        },
    })
}

/// Walk up from `start` until a directory containing `config.toml` is found.
fn find_config_file(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).map(PathBuf::from)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
