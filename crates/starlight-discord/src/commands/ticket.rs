use starlight_core::{
    domain::{ChannelId, UserId},
    messaging::types::{colors, user_mention, Embed, Message},
    tickets::{close_prompt, ticket_panel},
};

use crate::{
    render,
    router::{Context, Error},
};

fn current(ctx: Context<'_>) -> (ChannelId, UserId) {
    (
        ChannelId(ctx.channel_id().to_string()),
        UserId(ctx.author().id.to_string()),
    )
}

/// Refuse before prompting in a channel that is not a ticket.
async fn in_ticket(ctx: Context<'_>, channel: &ChannelId) -> Result<bool, Error> {
    let resolved = ctx.data().tickets.resolve(channel).await;
    Ok(super::refuse_or(ctx, resolved).await?.is_some())
}

fn renamed_message(name: &str) -> Message {
    Message::embed(
        Embed::new(format!("Renamed this channel to \"{name}\"."))
            .title("Rename complete")
            .color(colors::BRAND),
    )
}

/// Manage tickets.
#[poise::command(
    slash_command,
    guild_only,
    subcommands("close", "rename", "claim", "complete", "panel"),
    subcommand_required,
    default_member_permissions = "MANAGE_GUILD"
)]
pub async fn ticket(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Close this ticket.
#[poise::command(slash_command, guild_only)]
pub async fn close(ctx: Context<'_>) -> Result<(), Error> {
    let (channel, _) = current(ctx);
    if !in_ticket(ctx, &channel).await? {
        return Ok(());
    }
    super::send_ephemeral(ctx, &close_prompt()).await
}

/// Rename this ticket.
#[poise::command(slash_command, guild_only)]
pub async fn rename(
    ctx: Context<'_>,
    #[description = "The new name. Omit to restore the default name."]
    #[min_length = 3]
    #[max_length = 32]
    name: Option<String>,
) -> Result<(), Error> {
    let (channel, actor) = current(ctx);
    ctx.defer_ephemeral().await?;

    let result = ctx
        .data()
        .tickets
        .rename(&channel, &actor, name.as_deref())
        .await;
    if let Some(new_name) = super::refuse_or(ctx, result).await? {
        ctx.send(render::reply(&renamed_message(&new_name))).await?;
    }
    Ok(())
}

/// Claim this ticket.
#[poise::command(slash_command, guild_only)]
pub async fn claim(ctx: Context<'_>) -> Result<(), Error> {
    let (channel, actor) = current(ctx);
    ctx.defer_ephemeral().await?;

    let result = ctx.data().tickets.claim(&channel, &actor).await;
    if super::refuse_or(ctx, result).await?.is_some() {
        ctx.say(format!("Claimed by {}.", user_mention(&actor)))
            .await?;
    }
    Ok(())
}

/// Mark this ticket as complete.
#[poise::command(slash_command, guild_only)]
pub async fn complete(ctx: Context<'_>) -> Result<(), Error> {
    let (channel, actor) = current(ctx);
    ctx.defer_ephemeral().await?;

    let result = ctx.data().tickets.complete(&channel, &actor).await;
    if super::refuse_or(ctx, result).await?.is_some() {
        ctx.say("Marked as complete.").await?;
    }
    Ok(())
}

/// Post the service picker that opens tickets in this channel.
#[poise::command(slash_command, guild_only)]
pub async fn panel(ctx: Context<'_>) -> Result<(), Error> {
    let Some(panel) = ticket_panel(&ctx.data().cfg) else {
        return super::send_ephemeral(
            ctx,
            &Message::embed(
                Embed::new("No service offering has a ticket category configured.")
                    .title("Sorry!")
                    .color(colors::ERROR),
            ),
        )
        .await;
    };

    ctx.channel_id()
        .send_message(ctx.http(), render::create_message(&panel))
        .await?;
    super::send_ephemeral(ctx, &Message::text("Posted the ticket panel.")).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rename_reply_quotes_the_name() {
        let m = renamed_message("🟡┃jo-hn-7");
        assert_eq!(m.embeds[0].title.as_deref(), Some("Rename complete"));
        assert_eq!(m.embeds[0].description, "Renamed this channel to \"🟡┃jo-hn-7\".");
    }
}
