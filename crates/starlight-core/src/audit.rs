use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::Utc;
use serde::Serialize;

use crate::{
    domain::{ChannelId, GuildId, Ticket, UserId},
    errors::Error,
    store::ServiceStates,
    Result,
};

/// RFC3339 timestamp in UTC.
pub fn iso_timestamp_utc() -> String {
    Utc::now().to_rfc3339()
}

#[derive(Clone, Debug, Serialize)]
pub struct AuditEvent {
    pub timestamp: String,
    pub event: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

impl AuditEvent {
    /// A ticket lifecycle action (`created`, `claimed`, `completed`, `renamed`, `closed`).
    pub fn ticket(action: &str, actor: &UserId, ticket: &Ticket) -> Self {
        Self {
            timestamp: iso_timestamp_utc(),
            event: format!("ticket_{action}"),
            guild_id: None,
            user_id: Some(actor.to_string()),
            channel_id: Some(ticket.channel_id.to_string()),
            ticket_id: Some(ticket.id),
            detail: Some(serde_json::json!({
                "owner_id": ticket.owner_id,
                "status": ticket.status.as_str(),
                "claimed_by_id": ticket.claimed_by_id,
            })),
        }
    }

    pub fn ticket_renamed(actor: &UserId, channel: &ChannelId, name: &str) -> Self {
        Self {
            timestamp: iso_timestamp_utc(),
            event: "ticket_renamed".to_string(),
            guild_id: None,
            user_id: Some(actor.to_string()),
            channel_id: Some(channel.to_string()),
            ticket_id: None,
            detail: Some(serde_json::json!({ "name": name })),
        }
    }

    pub fn services_updated(guild: &GuildId, actor: &UserId, services: &ServiceStates) -> Self {
        Self {
            timestamp: iso_timestamp_utc(),
            event: "services_updated".to_string(),
            guild_id: Some(guild.to_string()),
            user_id: Some(actor.to_string()),
            channel_id: None,
            ticket_id: None,
            detail: serde_json::to_value(services).ok(),
        }
    }
}

/// Append-only audit trail. A logger without a path drops every event.
#[derive(Clone, Debug)]
pub struct AuditLogger {
    path: Option<PathBuf>,
    json: bool,
}

impl AuditLogger {
    pub fn new(path: Option<PathBuf>, json: bool) -> Self {
        Self { path, json }
    }

    pub fn disabled() -> Self {
        Self {
            path: None,
            json: true,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn write(&self, event: AuditEvent) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;

        if self.json {
            let line = serde_json::to_string(&event)?;
            writeln!(file, "{line}")?;
            return Ok(());
        }

        // Plain text format for readability.
        let mut out = String::new();
        out.push('\n');
        out.push_str(&"=".repeat(60));

        let value = serde_json::to_value(&event)?;
        let Some(obj) = value.as_object() else {
            return Err(Error::External(
                "audit event is not a JSON object".to_string(),
            ));
        };
        for (k, v) in obj {
            out.push('\n');
            out.push_str(k);
            out.push_str(": ");
            out.push_str(&json_value_to_display(v));
        }
        out.push('\n');

        file.write_all(out.as_bytes())?;
        Ok(())
    }

    /// Write an event, logging instead of failing. Audit problems never abort an action.
    pub fn record(&self, event: AuditEvent) {
        if let Err(e) = self.write(event) {
            tracing::warn!(error = %e, "failed to write audit event");
        }
    }
}

fn json_value_to_display(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.to_string(),
        other => serde_json::to_string(other).unwrap_or_else(|_| "<unprintable>".to_string()),
    }
}
