//! SQLite adapter (sqlx).
//!
//! This crate implements the `starlight-core` Store over a single SQLite file.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Row as _, SqlitePool,
};

use starlight_core::{
    domain::{ChannelId, GuildId, Ticket, TicketStatus, TicketUpdate, UserId},
    errors::{Error, Refusal},
    store::{ServiceStates, Store},
    Result,
};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS guilds (
        id TEXT(20) PRIMARY KEY NOT NULL,
        services TEXT NOT NULL DEFAULT '{}'
    )",
    "CREATE TABLE IF NOT EXISTS tickets (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_id TEXT(20) NOT NULL UNIQUE,
        channel_id TEXT(20) NOT NULL UNIQUE,
        claimed_by_id TEXT(20),
        status TEXT NOT NULL DEFAULT 'open'
    )",
];

fn db_err(e: sqlx::Error) -> Error {
    Error::Store(format!("sqlite: {e}"))
}

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database at `url` and apply the schema.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(db_err)?
            .create_if_missing(true);

        let mut pool_options = SqlitePoolOptions::new().max_connections(5);
        if url.contains(":memory:") {
            // Every connection to an in-memory database is its own database,
            // so keep exactly one alive for the pool's lifetime.
            pool_options = SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(db_err)?;

        let store = Self::new(pool);
        store.migrate().await?;
        tracing::info!(url, "database ready");
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<()> {
        for stmt in SCHEMA {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(db_err)?;
        }
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn ticket_from_row(row: &SqliteRow) -> Result<Ticket> {
    let status: String = row.try_get("status").map_err(db_err)?;
    let claimed: Option<String> = row.try_get("claimed_by_id").map_err(db_err)?;
    Ok(Ticket {
        id: row.try_get("id").map_err(db_err)?,
        owner_id: UserId(row.try_get("owner_id").map_err(db_err)?),
        channel_id: ChannelId(row.try_get("channel_id").map_err(db_err)?),
        claimed_by_id: claimed.map(UserId),
        status: TicketStatus::from_str(&status)?,
    })
}

/// Translate constraint failures on insert into their domain meaning.
fn insert_err(e: sqlx::Error) -> Error {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() && db.message().contains("owner_id") {
            return Refusal::AlreadyHasTicket.into();
        }
    }
    db_err(e)
}

const TICKET_COLUMNS: &str = "id, owner_id, channel_id, claimed_by_id, status";

#[async_trait]
impl Store for SqliteStore {
    async fn guild_services(&self, guild: &GuildId) -> Result<ServiceStates> {
        let row = sqlx::query("SELECT services FROM guilds WHERE id = ?")
            .bind(guild.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        match row {
            Some(row) => {
                let raw: String = row.try_get("services").map_err(db_err)?;
                Ok(serde_json::from_str(&raw)?)
            }
            None => Ok(ServiceStates::new()),
        }
    }

    async fn upsert_guild_services(&self, guild: &GuildId, services: &ServiceStates) -> Result<()> {
        let json = serde_json::to_string(services)?;
        sqlx::query(
            "INSERT INTO guilds (id, services) VALUES (?, ?) \
             ON CONFLICT(id) DO UPDATE SET services = excluded.services",
        )
        .bind(guild.as_str())
        .bind(&json)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn ticket_by_channel(&self, channel: &ChannelId) -> Result<Option<Ticket>> {
        let row = sqlx::query(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE channel_id = ?"
        ))
        .bind(channel.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(ticket_from_row).transpose()
    }

    async fn tickets_by_owner(&self, owner: &UserId) -> Result<Vec<Ticket>> {
        let rows = sqlx::query(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE owner_id = ? ORDER BY id"
        ))
        .bind(owner.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(ticket_from_row).collect()
    }

    async fn insert_ticket(&self, channel: &ChannelId, owner: &UserId) -> Result<i64> {
        let result = sqlx::query("INSERT INTO tickets (owner_id, channel_id) VALUES (?, ?)")
            .bind(owner.as_str())
            .bind(channel.as_str())
            .execute(&self.pool)
            .await
            .map_err(insert_err)?;
        Ok(result.last_insert_rowid())
    }

    async fn update_ticket(&self, id: i64, update: &TicketUpdate) -> Result<()> {
        let result = sqlx::query(
            "UPDATE tickets SET \
             claimed_by_id = COALESCE(?, claimed_by_id), \
             status = COALESCE(?, status) \
             WHERE id = ?",
        )
        .bind(update.claimed_by_id.as_ref().map(|u| u.as_str()))
        .bind(update.status.map(|s| s.as_str()))
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(Error::Store(format!("ticket {id} does not exist")));
        }
        Ok(())
    }

    async fn delete_ticket_by_channel(&self, channel: &ChannelId) -> Result<()> {
        sqlx::query("DELETE FROM tickets WHERE channel_id = ?")
            .bind(channel.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn next_ticket_sequence(&self) -> Result<i64> {
        // sqlite_sequence remembers ids of deleted rows; MAX(id) covers a fresh table.
        let seq: Option<i64> =
            sqlx::query_scalar("SELECT seq FROM sqlite_sequence WHERE name = 'tickets'")
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        let last = match seq {
            Some(s) => s,
            None => sqlx::query_scalar("SELECT COALESCE(MAX(id), 0) FROM tickets")
                .fetch_one(&self.pool)
                .await
                .map_err(db_err)?,
        };
        Ok(last + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use starlight_core::{domain::ServiceState, store::state_of};

    async fn store() -> SqliteStore {
        SqliteStore::connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite should connect")
    }

    fn guild() -> GuildId {
        GuildId::from("100000000000000001")
    }

    #[tokio::test]
    async fn migrate_is_repeatable() {
        let store = store().await;
        store.migrate().await.unwrap();
        store.migrate().await.unwrap();
    }

    #[tokio::test]
    async fn guild_services_round_trip_through_json_column() {
        let store = store().await;
        let empty = store.guild_services(&guild()).await.unwrap();
        assert!(empty.is_empty());
        assert_eq!(state_of(&empty, "marketing"), ServiceState::Closed);

        let mut states = ServiceStates::new();
        states.insert("marketing".to_string(), ServiceState::Open);
        states.insert("video".to_string(), ServiceState::Limited);
        store.upsert_guild_services(&guild(), &states).await.unwrap();

        let mut next = ServiceStates::new();
        next.insert("marketing".to_string(), ServiceState::Closed);
        store.upsert_guild_services(&guild(), &next).await.unwrap();

        assert_eq!(store.guild_services(&guild()).await.unwrap(), next);

        let raw: String = sqlx::query_scalar("SELECT services FROM guilds WHERE id = ?")
            .bind(guild().as_str())
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(raw, r#"{"marketing":"closed"}"#);
    }

    #[tokio::test]
    async fn ticket_lifecycle_rows() {
        let store = store().await;
        let owner = UserId::from("200000000000000001");
        let staff = UserId::from("200000000000000002");
        let chan = ChannelId::from("300000000000000001");

        assert_eq!(store.next_ticket_sequence().await.unwrap(), 1);
        let id = store.insert_ticket(&chan, &owner).await.unwrap();
        assert_eq!(id, 1);
        assert_eq!(store.next_ticket_sequence().await.unwrap(), 2);

        let t = store.ticket_by_channel(&chan).await.unwrap().unwrap();
        assert_eq!(t.status, TicketStatus::Open);
        assert_eq!(t.claimed_by_id, None);

        store
            .update_ticket(
                id,
                &TicketUpdate {
                    claimed_by_id: Some(staff.clone()),
                    status: Some(TicketStatus::Claimed),
                },
            )
            .await
            .unwrap();
        store
            .update_ticket(
                id,
                &TicketUpdate {
                    status: Some(TicketStatus::Completed),
                    ..TicketUpdate::default()
                },
            )
            .await
            .unwrap();
        let t = store.tickets_by_owner(&owner).await.unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t[0].status, TicketStatus::Completed);
        assert_eq!(t[0].claimed_by_id, Some(staff));

        let missing = store
            .update_ticket(99, &TicketUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(missing, Error::Store(_)));

        store.delete_ticket_by_channel(&chan).await.unwrap();
        assert!(store.ticket_by_channel(&chan).await.unwrap().is_none());
        // AUTOINCREMENT never hands out a deleted id again.
        assert_eq!(store.next_ticket_sequence().await.unwrap(), 2);
        let id2 = store.insert_ticket(&chan, &owner).await.unwrap();
        assert_eq!(id2, 2);
    }

    #[tokio::test]
    async fn unique_constraints_map_to_domain_errors() {
        let store = store().await;
        let owner = UserId::from("200000000000000001");
        let chan = ChannelId::from("300000000000000001");
        store.insert_ticket(&chan, &owner).await.unwrap();

        let dup_owner = store
            .insert_ticket(&ChannelId::from("300000000000000002"), &owner)
            .await
            .unwrap_err();
        assert_eq!(dup_owner.refusal(), Some(&Refusal::AlreadyHasTicket));

        let dup_channel = store
            .insert_ticket(&chan, &UserId::from("200000000000000002"))
            .await
            .unwrap_err();
        assert!(matches!(dup_channel, Error::Store(_)));
    }
}
