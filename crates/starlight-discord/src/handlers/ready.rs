use chrono::Utc;
use poise::serenity_prelude as serenity;
use tracing::{info, warn};

use starlight_core::messaging::types::{colors, Embed, Message};

use crate::router::{AppState, Error};

const PRESENCE: &str = "Starlight Services!";

fn ready_message(started_unix: i64) -> Message {
    Message::embed(
        Embed::new(format!("**Started:** <t:{started_unix}:R>"))
            .title("Ready!")
            .color(colors::READY),
    )
}

pub(super) async fn handle_ready(
    ctx: &serenity::Context,
    ready: &serenity::Ready,
    state: &AppState,
) -> Result<(), Error> {
    info!(user = %ready.user.name, guilds = ready.guilds.len(), "logged in");

    ctx.set_presence(
        Some(serenity::ActivityData::watching(PRESENCE)),
        serenity::OnlineStatus::Online,
    );

    if let Some(channel) = &state.cfg.ready_channel {
        let message = ready_message(Utc::now().timestamp());
        if let Err(e) = state.platform.send_message(channel, message).await {
            warn!(channel = %channel, error = %e, "failed to post ready message");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_embed_uses_relative_timestamp() {
        let m = ready_message(1_700_000_000);
        assert_eq!(m.embeds[0].title.as_deref(), Some("Ready!"));
        assert_eq!(m.embeds[0].description, "**Started:** <t:1700000000:R>");
        assert_eq!(m.embeds[0].color, Some(colors::READY));
    }
}
