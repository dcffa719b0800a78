//! Persistence port.
//!
//! Pure data access: no business rules live behind this trait beyond the
//! uniqueness constraints of the underlying rows.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    domain::{ChannelId, GuildId, ServiceState, Ticket, TicketStatus, TicketUpdate, UserId},
    errors::{Error, Refusal},
    Result,
};

/// Stored availability per service id. Services missing from the map are closed.
pub type ServiceStates = BTreeMap<String, ServiceState>;

/// Read a service's state, defaulting to closed.
pub fn state_of(states: &ServiceStates, service_id: &str) -> ServiceState {
    states.get(service_id).copied().unwrap_or_default()
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Stored states for a guild; empty when the guild has no row yet.
    async fn guild_services(&self, guild: &GuildId) -> Result<ServiceStates>;

    /// Insert-or-replace the guild's service map.
    async fn upsert_guild_services(&self, guild: &GuildId, services: &ServiceStates) -> Result<()>;

    async fn ticket_by_channel(&self, channel: &ChannelId) -> Result<Option<Ticket>>;
    async fn tickets_by_owner(&self, owner: &UserId) -> Result<Vec<Ticket>>;

    /// Insert an open, unclaimed ticket and return its generated id.
    ///
    /// Fails with [`Refusal::AlreadyHasTicket`] when the owner already has a row.
    async fn insert_ticket(&self, channel: &ChannelId, owner: &UserId) -> Result<i64>;

    async fn update_ticket(&self, id: i64, update: &TicketUpdate) -> Result<()>;
    async fn delete_ticket_by_channel(&self, channel: &ChannelId) -> Result<()>;

    /// The id the next inserted ticket is expected to receive.
    async fn next_ticket_sequence(&self) -> Result<i64>;
}

#[derive(Debug, Default)]
struct MemoryState {
    guilds: HashMap<GuildId, ServiceStates>,
    tickets: Vec<Ticket>,
    last_id: i64,
}

/// In-process store with the same constraints as the SQLite schema.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn guild_services(&self, guild: &GuildId) -> Result<ServiceStates> {
        let st = self.state.lock().await;
        Ok(st.guilds.get(guild).cloned().unwrap_or_default())
    }

    async fn upsert_guild_services(&self, guild: &GuildId, services: &ServiceStates) -> Result<()> {
        let mut st = self.state.lock().await;
        st.guilds.insert(guild.clone(), services.clone());
        Ok(())
    }

    async fn ticket_by_channel(&self, channel: &ChannelId) -> Result<Option<Ticket>> {
        let st = self.state.lock().await;
        Ok(st.tickets.iter().find(|t| &t.channel_id == channel).cloned())
    }

    async fn tickets_by_owner(&self, owner: &UserId) -> Result<Vec<Ticket>> {
        let st = self.state.lock().await;
        Ok(st
            .tickets
            .iter()
            .filter(|t| &t.owner_id == owner)
            .cloned()
            .collect())
    }

    async fn insert_ticket(&self, channel: &ChannelId, owner: &UserId) -> Result<i64> {
        let mut st = self.state.lock().await;
        if st.tickets.iter().any(|t| &t.owner_id == owner) {
            return Err(Refusal::AlreadyHasTicket.into());
        }
        if st.tickets.iter().any(|t| &t.channel_id == channel) {
            return Err(Error::Store(format!(
                "channel {channel} already has a ticket"
            )));
        }

        st.last_id += 1;
        let id = st.last_id;
        st.tickets.push(Ticket {
            id,
            owner_id: owner.clone(),
            channel_id: channel.clone(),
            claimed_by_id: None,
            status: TicketStatus::Open,
        });
        Ok(id)
    }

    async fn update_ticket(&self, id: i64, update: &TicketUpdate) -> Result<()> {
        let mut st = self.state.lock().await;
        let Some(ticket) = st.tickets.iter_mut().find(|t| t.id == id) else {
            return Err(Error::Store(format!("ticket {id} does not exist")));
        };
        if let Some(claimed) = &update.claimed_by_id {
            ticket.claimed_by_id = Some(claimed.clone());
        }
        if let Some(status) = update.status {
            ticket.status = status;
        }
        Ok(())
    }

    async fn delete_ticket_by_channel(&self, channel: &ChannelId) -> Result<()> {
        let mut st = self.state.lock().await;
        st.tickets.retain(|t| &t.channel_id != channel);
        Ok(())
    }

    async fn next_ticket_sequence(&self) -> Result<i64> {
        Ok(self.state.lock().await.last_id + 1)
    }
}
