use starlight_core::messaging::types::{colors, Embed, Message};

use crate::router::{Context, Error};

/// `1234567` → `1,234,567`.
fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn info_message(version: &str, members: Option<u64>, launched_unix: i64) -> Message {
    let members = members.map(group_thousands).unwrap_or_else(|| "?".to_string());
    Message::embed(
        Embed::new(format!(
            "`v{version}` • `{members}` users\nLaunched <t:{launched_unix}:f>, <t:{launched_unix}:R>"
        ))
        .color(colors::BRAND),
    )
}

/// Displays bot information
#[poise::command(slash_command)]
pub async fn botinfo(ctx: Context<'_>) -> Result<(), Error> {
    let members = ctx.guild().map(|g| g.member_count);
    let launched = ctx.data().launched_at.timestamp();

    let message = info_message(env!("CARGO_PKG_VERSION"), members, launched);
    ctx.send(crate::render::reply(&message)).await?;
    Ok(())
}
