//! Discord adapter (poise / serenity).
//!
//! This crate implements the `starlight-core` PlatformPort over the Discord
//! HTTP API and hosts the slash commands and component handlers.

use std::sync::Arc;

use async_trait::async_trait;
use poise::serenity_prelude as serenity;

pub mod board;
pub mod commands;
pub mod handlers;
pub mod render;
pub mod router;

use starlight_core::{
    domain::{ChannelId, GuildId, UserId},
    errors::Error,
    messaging::{port::PlatformPort, types::Message},
    Result,
};

const TICKET_AUDIT_REASON: &str = "[Starlight] Automatically created ticket";

fn map_err(e: serenity::Error) -> Error {
    Error::External(format!("discord error: {e}"))
}

fn raw_id(raw: &str) -> Result<u64> {
    match raw.parse::<u64>() {
        Ok(n) if n != 0 => Ok(n),
        _ => Err(Error::External(format!("invalid discord id: {raw:?}"))),
    }
}

pub(crate) fn dc_channel(id: &ChannelId) -> Result<serenity::ChannelId> {
    Ok(serenity::ChannelId::new(raw_id(id.as_str())?))
}

pub(crate) fn dc_guild(id: &GuildId) -> Result<serenity::GuildId> {
    Ok(serenity::GuildId::new(raw_id(id.as_str())?))
}

pub(crate) fn dc_user(id: &UserId) -> Result<serenity::UserId> {
    Ok(serenity::UserId::new(raw_id(id.as_str())?))
}

#[derive(Clone)]
pub struct DiscordPlatform {
    http: Arc<serenity::Http>,
}

impl DiscordPlatform {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl PlatformPort for DiscordPlatform {
    async fn create_text_channel(
        &self,
        guild: &GuildId,
        category: &ChannelId,
        name: &str,
    ) -> Result<ChannelId> {
        let builder = serenity::CreateChannel::new(name)
            .kind(serenity::ChannelType::Text)
            .category(dc_channel(category)?)
            .audit_log_reason(TICKET_AUDIT_REASON);
        let channel = dc_guild(guild)?
            .create_channel(&*self.http, builder)
            .await
            .map_err(map_err)?;
        Ok(ChannelId(channel.id.to_string()))
    }

    async fn rename_channel(&self, channel: &ChannelId, name: &str) -> Result<()> {
        dc_channel(channel)?
            .edit(&*self.http, serenity::EditChannel::new().name(name))
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn delete_channel(&self, channel: &ChannelId) -> Result<()> {
        dc_channel(channel)?
            .delete(&*self.http)
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn send_message(&self, channel: &ChannelId, message: Message) -> Result<()> {
        dc_channel(channel)?
            .send_message(&*self.http, render::create_message(&message))
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn user_display_name(&self, user: &UserId) -> Result<String> {
        let user = dc_user(user)?
            .to_user(&*self.http)
            .await
            .map_err(map_err)?;
        Ok(user.name)
    }
}
