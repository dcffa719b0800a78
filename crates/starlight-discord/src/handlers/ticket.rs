use poise::serenity_prelude as serenity;
use tracing::{debug, error};

use starlight_core::{
    domain::{Actor, ChannelId, GuildId, UserId},
    tickets::{
        close_prompt, created_reply, refusal_message, CLOSE_CANCEL_ID, CLOSE_CONFIRM_ID,
        CLOSE_TICKET_ID, CREATE_TICKET_ID,
    },
};

use crate::{
    render,
    router::{AppState, Error},
};

fn channel_url(guild: serenity::GuildId, channel: &ChannelId) -> String {
    format!("https://discord.com/channels/{guild}/{channel}")
}

fn actor(user: &serenity::User) -> Actor {
    Actor {
        id: UserId(user.id.to_string()),
        display_name: user.name.clone(),
    }
}

/// Route clicks on the fixed ticket controls. Anything else (board tokens)
/// is left to the collector that owns it.
pub(super) async fn handle_component(
    ctx: &serenity::Context,
    ci: &serenity::ComponentInteraction,
    state: &AppState,
) -> Result<(), Error> {
    let result = match ci.data.custom_id.as_str() {
        CREATE_TICKET_ID => create_ticket(ctx, ci, state).await,
        CLOSE_TICKET_ID => prompt_close(ctx, ci).await,
        CLOSE_CONFIRM_ID => confirm_close(ctx, ci, state).await,
        CLOSE_CANCEL_ID => cancel_close(ctx, ci).await,
        other => {
            debug!(custom_id = other, "component not handled here");
            return Ok(());
        }
    };

    if let Err(e) = &result {
        error!(custom_id = %ci.data.custom_id, user = %ci.user.id, error = %e, "component failed");
        report_failure(ctx, ci).await;
    }
    result
}

async fn report_failure(ctx: &serenity::Context, ci: &serenity::ComponentInteraction) {
    let message = render::failure_message();
    let first = ci
        .create_response(
            &ctx.http,
            serenity::CreateInteractionResponse::Message(
                render::response(&message).ephemeral(true),
            ),
        )
        .await;
    if first.is_err() {
        // Already acknowledged.
        let _ = ci
            .create_followup(&ctx.http, render::followup(&message).ephemeral(true))
            .await;
    }
}

async fn create_ticket(
    ctx: &serenity::Context,
    ci: &serenity::ComponentInteraction,
    state: &AppState,
) -> Result<(), Error> {
    let Some(guild) = ci.guild_id else {
        return Ok(());
    };
    let serenity::ComponentInteractionDataKind::StringSelect { values } = &ci.data.kind else {
        return Ok(());
    };
    let service = values.first().cloned().unwrap_or_default();

    ci.create_response(
        &ctx.http,
        serenity::CreateInteractionResponse::Defer(
            serenity::CreateInteractionResponseMessage::new().ephemeral(true),
        ),
    )
    .await?;

    let reply = match state
        .tickets
        .create_ticket(&GuildId(guild.to_string()), &actor(&ci.user), &service)
        .await
    {
        Ok(created) => created_reply(&channel_url(guild, &created.ticket.channel_id)),
        Err(e) => match e.refusal() {
            Some(r) => refusal_message(r),
            None => return Err(e.into()),
        },
    };

    ci.edit_response(&ctx.http, render::edit_response(&reply))
        .await?;
    Ok(())
}

async fn prompt_close(
    ctx: &serenity::Context,
    ci: &serenity::ComponentInteraction,
) -> Result<(), Error> {
    ci.create_response(
        &ctx.http,
        serenity::CreateInteractionResponse::Message(
            render::response(&close_prompt()).ephemeral(true),
        ),
    )
    .await?;
    Ok(())
}

async fn confirm_close(
    ctx: &serenity::Context,
    ci: &serenity::ComponentInteraction,
    state: &AppState,
) -> Result<(), Error> {
    let channel = ChannelId(ci.channel_id.to_string());
    let actor = UserId(ci.user.id.to_string());

    ci.create_response(&ctx.http, serenity::CreateInteractionResponse::Acknowledge)
        .await?;

    if let Err(e) = state.tickets.close(&channel, &actor).await {
        let Some(r) = e.refusal() else {
            return Err(e.into());
        };
        ci.create_followup(
            &ctx.http,
            render::followup(&refusal_message(r)).ephemeral(true),
        )
        .await?;
    }
    Ok(())
}

async fn cancel_close(
    ctx: &serenity::Context,
    ci: &serenity::ComponentInteraction,
) -> Result<(), Error> {
    ci.create_response(&ctx.http, serenity::CreateInteractionResponse::Acknowledge)
        .await?;
    ci.delete_response(&ctx.http).await?;
    Ok(())
}
