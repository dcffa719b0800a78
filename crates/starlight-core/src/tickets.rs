//! Ticket lifecycle: creation, claiming, renaming, completion and closure.
//!
//! Every ticket-scoped operation first resolves the ticket by channel and
//! refuses with [`Refusal::NotATicketChannel`] when there is none.

use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    audit::{AuditEvent, AuditLogger},
    config::Config,
    domain::{Actor, ChannelId, GuildId, RoleId, Ticket, TicketStatus, TicketUpdate, UserId},
    errors::Refusal,
    locks::KeyedLocks,
    messaging::{
        port::PlatformPort,
        types::{
            colors, Button, ButtonRow, ButtonStyle, Embed, Message, SelectMenu, SelectOption,
        },
    },
    store::Store,
    Result,
};

/// Component ids of the ticket controls.
pub const CREATE_TICKET_ID: &str = "create-ticket";
pub const CLOSE_TICKET_ID: &str = "close-ticket";
pub const CLOSE_CONFIRM_ID: &str = "close-ticket-confirm";
pub const CLOSE_CANCEL_ID: &str = "close-ticket-cancel";

/// Bounds for an explicit channel name.
pub const MIN_NAME_LEN: usize = 3;
pub const MAX_NAME_LEN: usize = 32;

/// Display names are cut to this many characters before slugging.
pub const SLUG_MAX_CHARS: usize = 20;

const WELCOME_TEXT: &str = "Thank you for choosing Starlight Services! A staff member will be with you as soon as possible.

## Ticket Rules
- Please be patient; we are a completely free service provider.
  - We receive many tickets a day and handle them in the order they were received.
- Please do not ping staff members in your ticket except for the staff member assisting you.
- Do not DM staff members about your ticket status.
- Keep all conversation about your request in this ticket.";

/// Lowercase ASCII slug of at most `max_chars` source characters.
///
/// Non-ASCII letters are transliterated (`Ü` → `u`). Runs of anything else
/// that is not an ASCII letter or digit collapse into a single `-`; leading
/// and trailing dashes are dropped.
pub fn slugify(name: &str, max_chars: usize) -> String {
    let mut out = String::new();
    let mut pending_dash = false;
    let mut buf = [0u8; 4];
    for c in name.chars().take(max_chars) {
        let piece = if c.is_ascii() {
            &*c.encode_utf8(&mut buf)
        } else if c.is_alphabetic() {
            deunicode::deunicode_char(c).unwrap_or("")
        } else {
            ""
        };
        if piece.is_empty() {
            pending_dash = true;
        }
        for p in piece.chars() {
            if p.is_ascii_alphanumeric() {
                if pending_dash && !out.is_empty() {
                    out.push('-');
                }
                pending_dash = false;
                out.push(p.to_ascii_lowercase());
            } else {
                pending_dash = true;
            }
        }
    }
    if out.is_empty() {
        return "user".to_string();
    }
    out
}

/// `{glyph}┃{slug}-{id}`, e.g. `🔴┃jo-hn-7`.
pub fn canonical_name(status: TicketStatus, owner_display_name: &str, id: i64) -> String {
    format!(
        "{}┃{}-{}",
        status.glyph(),
        slugify(owner_display_name, SLUG_MAX_CHARS),
        id
    )
}

fn validate_name(name: &str) -> Result<()> {
    let len = name.chars().count();
    if !(MIN_NAME_LEN..=MAX_NAME_LEN).contains(&len) {
        return Err(Refusal::InvalidName {
            min: MIN_NAME_LEN,
            max: MAX_NAME_LEN,
        }
        .into());
    }
    Ok(())
}

/// Message posted into a new ticket when the offering has a staff role.
pub fn welcome_message(staff_role: &RoleId) -> Message {
    Message::embed(Embed::new(WELCOME_TEXT))
        .with_content(crate::messaging::types::role_mention(staff_role))
        .with_rows(vec![ButtonRow::new(vec![Button::new(
            CLOSE_TICKET_ID,
            "Close",
            ButtonStyle::Secondary,
        )])])
}

/// Header message with the service picker that opens tickets.
///
/// Only offerings with a ticket category are listed. `None` when there is
/// nothing to pick.
pub fn ticket_panel(cfg: &Config) -> Option<Message> {
    let ticketable = cfg
        .services
        .offerings
        .iter()
        .filter(|o| o.ticket_category.is_some())
        .collect::<Vec<_>>();
    if ticketable.is_empty() {
        return None;
    }

    let mut description = String::from("Select a service below to open a ticket with our team.\n");
    for o in &ticketable {
        description.push_str(&format!("\n⁑ ────﹒**{}**", o.name));
    }

    let mut message = Message::embed(Embed::new(description).color(colors::BRAND));
    if let Some(a) = &cfg.services.availability {
        message.embeds.push(
            Embed::new(format!("Is your service not available? Check <#{}>.", a.channel))
                .color(colors::ERROR),
        );
    }

    Some(message.with_select(SelectMenu {
        custom_id: CREATE_TICKET_ID.to_string(),
        placeholder: "Select a Service".to_string(),
        options: ticketable
            .iter()
            .map(|o| SelectOption {
                label: o.name.clone(),
                value: o.id.clone(),
            })
            .collect(),
    }))
}

/// Confirmation prompt shown before a ticket is closed.
pub fn close_prompt() -> Message {
    Message::embed(Embed::new("Are you sure you want to close this ticket?").color(colors::BRAND))
        .with_rows(vec![ButtonRow::new(vec![
            Button::new(CLOSE_CONFIRM_ID, "Close Ticket", ButtonStyle::Danger),
            Button::new(CLOSE_CANCEL_ID, "Cancel", ButtonStyle::Secondary),
        ])])
}

/// Reply to the requester once their ticket exists.
pub fn created_reply(channel_url: &str) -> Message {
    Message::embed(Embed::new("✅ Created ticket").color(colors::BRAND))
        .with_rows(vec![ButtonRow::new(vec![Button::link(channel_url, "Open")])])
}

/// Reply for a refused request.
pub fn refusal_message(refusal: &Refusal) -> Message {
    Message::embed(
        Embed::new(refusal.to_string())
            .title(refusal.title())
            .color(colors::ERROR),
    )
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreatedTicket {
    pub ticket: Ticket,
    pub channel_name: String,
}

/// A ticket after a transition, together with the channel name applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TicketChange {
    pub ticket: Ticket,
    pub channel_name: String,
}

pub struct TicketEngine {
    cfg: Arc<Config>,
    store: Arc<dyn Store>,
    platform: Arc<dyn PlatformPort>,
    audit: Arc<AuditLogger>,
    owner_locks: KeyedLocks<UserId>,
}

impl TicketEngine {
    pub fn new(
        cfg: Arc<Config>,
        store: Arc<dyn Store>,
        platform: Arc<dyn PlatformPort>,
        audit: Arc<AuditLogger>,
    ) -> Self {
        Self {
            cfg,
            store,
            platform,
            audit,
            owner_locks: KeyedLocks::new(),
        }
    }

    /// Look up the ticket backing `channel`.
    pub async fn resolve(&self, channel: &ChannelId) -> Result<Ticket> {
        match self.store.ticket_by_channel(channel).await? {
            Some(t) => Ok(t),
            None => Err(Refusal::NotATicketChannel.into()),
        }
    }

    /// Open a ticket for `requester` under the offering `service_id`.
    pub async fn create_ticket(
        &self,
        guild: &GuildId,
        requester: &Actor,
        service_id: &str,
    ) -> Result<CreatedTicket> {
        let Some(offering) = self.cfg.services.offering(service_id) else {
            return Err(Refusal::ServiceUnavailable.into());
        };
        let Some(category) = &offering.ticket_category else {
            return Err(Refusal::NotTicketable.into());
        };

        // Held until the row exists, so a second request by the same owner
        // waits here and then fails the duplicate check.
        let _guard = self.owner_locks.lock(&requester.id).await;

        if !self.store.tickets_by_owner(&requester.id).await?.is_empty() {
            return Err(Refusal::AlreadyHasTicket.into());
        }

        let sequence = self.store.next_ticket_sequence().await?;
        let mut channel_name = canonical_name(TicketStatus::Open, &requester.display_name, sequence);
        let channel = self
            .platform
            .create_text_channel(guild, category, &channel_name)
            .await?;

        let id = match self.store.insert_ticket(&channel, &requester.id).await {
            Ok(id) => id,
            Err(e) => {
                if let Err(cleanup) = self.platform.delete_channel(&channel).await {
                    warn!(channel = %channel, error = %cleanup, "failed to remove orphaned ticket channel");
                }
                return Err(e);
            }
        };

        if id != sequence {
            // Another ticket took the reserved number in the meantime.
            channel_name = canonical_name(TicketStatus::Open, &requester.display_name, id);
            self.platform.rename_channel(&channel, &channel_name).await?;
        }

        if let Some(role) = &offering.staff_role {
            self.platform
                .send_message(&channel, welcome_message(role))
                .await?;
        }

        let ticket = Ticket {
            id,
            owner_id: requester.id.clone(),
            channel_id: channel,
            claimed_by_id: None,
            status: TicketStatus::Open,
        };
        info!(ticket = id, owner = %requester.id, service = service_id, "ticket created");
        self.audit
            .record(AuditEvent::ticket("created", &requester.id, &ticket));

        Ok(CreatedTicket {
            ticket,
            channel_name,
        })
    }

    /// Assign the ticket to `actor`. Claiming an already claimed ticket reassigns it;
    /// a completed ticket keeps its status.
    pub async fn claim(&self, channel: &ChannelId, actor: &UserId) -> Result<TicketChange> {
        let ticket = self.resolve(channel).await?;
        let claimed = ticket.claimed_by(actor);
        let status = (claimed.status != ticket.status).then_some(claimed.status);
        self.store
            .update_ticket(
                claimed.id,
                &TicketUpdate {
                    claimed_by_id: Some(actor.clone()),
                    status,
                },
            )
            .await?;

        let change = self.apply_canonical_name(claimed).await?;
        info!(ticket = change.ticket.id, by = %actor, "ticket claimed");
        self.audit
            .record(AuditEvent::ticket("claimed", actor, &change.ticket));
        Ok(change)
    }

    pub async fn complete(&self, channel: &ChannelId, actor: &UserId) -> Result<TicketChange> {
        let ticket = self.resolve(channel).await?;
        let completed = ticket.completed();
        self.store
            .update_ticket(
                completed.id,
                &TicketUpdate {
                    status: Some(TicketStatus::Completed),
                    ..TicketUpdate::default()
                },
            )
            .await?;

        let change = self.apply_canonical_name(completed).await?;
        info!(ticket = change.ticket.id, by = %actor, "ticket completed");
        self.audit
            .record(AuditEvent::ticket("completed", actor, &change.ticket));
        Ok(change)
    }

    /// Rename the ticket channel. Without an explicit name the canonical one is restored.
    pub async fn rename(
        &self,
        channel: &ChannelId,
        actor: &UserId,
        name: Option<&str>,
    ) -> Result<String> {
        let ticket = self.resolve(channel).await?;
        let new_name = match name {
            Some(n) => {
                validate_name(n)?;
                n.to_string()
            }
            None => self.canonical_name_for(&ticket).await?,
        };

        self.platform.rename_channel(channel, &new_name).await?;
        info!(ticket = ticket.id, name = %new_name, "ticket renamed");
        self.audit
            .record(AuditEvent::ticket_renamed(actor, channel, &new_name));
        Ok(new_name)
    }

    /// Delete the ticket row, then its channel.
    pub async fn close(&self, channel: &ChannelId, actor: &UserId) -> Result<Ticket> {
        let ticket = self.resolve(channel).await?;
        self.store.delete_ticket_by_channel(channel).await?;
        self.platform.delete_channel(channel).await?;

        info!(ticket = ticket.id, by = %actor, "ticket closed");
        self.audit.record(AuditEvent::ticket("closed", actor, &ticket));
        Ok(ticket)
    }

    async fn canonical_name_for(&self, ticket: &Ticket) -> Result<String> {
        let owner = self.platform.user_display_name(&ticket.owner_id).await?;
        Ok(canonical_name(ticket.status, &owner, ticket.id))
    }

    async fn apply_canonical_name(&self, ticket: Ticket) -> Result<TicketChange> {
        let channel_name = self.canonical_name_for(&ticket).await?;
        self.platform
            .rename_channel(&ticket.channel_id, &channel_name)
            .await?;
        Ok(TicketChange {
            ticket,
            channel_name,
        })
    }
}
