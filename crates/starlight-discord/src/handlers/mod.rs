//! Gateway event handlers.
//!
//! Slash commands are dispatched by poise; everything else that reaches the
//! bot (ready, component clicks) comes through [`handle_event`].

use poise::serenity_prelude as serenity;

use crate::router::{AppState, Error};

mod ready;
mod ticket;

pub async fn handle_event(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, AppState, Error>,
    state: &AppState,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Ready { data_about_bot } => {
            ready::handle_ready(ctx, data_about_bot, state).await
        }
        serenity::FullEvent::InteractionCreate {
            interaction: serenity::Interaction::Component(ci),
        } => ticket::handle_component(ctx, ci, state).await,
        _ => Ok(()),
    }
}
