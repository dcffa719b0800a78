use tracing::info;

use starlight_core::{board::not_configured, domain::GuildId};

use crate::{
    board::run_session,
    render,
    router::{Context, Error},
};

/// Update the availability status of services.
#[poise::command(
    slash_command,
    guild_only,
    subcommands("update"),
    subcommand_required,
    default_member_permissions = "MANAGE_GUILD"
)]
pub async fn services(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Update any service's availability
#[poise::command(slash_command, guild_only)]
pub async fn update(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild) = ctx.guild_id() else {
        return Ok(());
    };
    let board = ctx.data().board.clone();

    let Some(session) = board.open(&GuildId(guild.to_string())).await? else {
        return super::send_ephemeral(ctx, &not_configured()).await;
    };

    let handle = ctx.send(render::reply(&board.render(&session))).await?;
    let message = handle.into_message().await?;

    let done = run_session(ctx.serenity_context(), &board, session, &message).await?;
    info!(guild = %guild, phase = ?done.phase(), "service board closed");
    Ok(())
}
