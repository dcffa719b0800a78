use std::time::Duration;

use chrono::Utc;

use starlight_core::messaging::types::{colors, Embed, Message};

use crate::router::{Context, Error};

/// Milliseconds between the Unix epoch and the Discord epoch (2015-01-01).
const DISCORD_EPOCH_MS: u64 = 1_420_070_400_000;

/// Creation time of a snowflake, in Unix milliseconds.
fn snowflake_millis(id: u64) -> u64 {
    (id >> 22) + DISCORD_EPOCH_MS
}

fn pong(round_trip_ms: i64, heartbeat: Duration) -> Message {
    // The shard reports zero until the first heartbeat is acknowledged.
    let heartbeat = if heartbeat.is_zero() {
        "N/A".to_string()
    } else {
        format!("{} ms", heartbeat.as_millis())
    };
    Message::embed(
        Embed::new(format!(
            "**Round-trip:** `{round_trip_ms} ms`\n**Heartbeat:** `{heartbeat}`"
        ))
        .title("Pong!")
        .color(colors::BRAND),
    )
}

/// Ping!
#[poise::command(slash_command)]
pub async fn ping(ctx: Context<'_>) -> Result<(), Error> {
    let created = snowflake_millis(ctx.id()) as i64;
    let round_trip = Utc::now().timestamp_millis() - created;
    let heartbeat = ctx.ping().await;

    super::send_ephemeral(ctx, &pong(round_trip.max(0), heartbeat)).await
}
