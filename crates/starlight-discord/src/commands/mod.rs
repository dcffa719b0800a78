//! Slash commands.
//!
//! The registry is fixed at compile time: [`all`] lists every command and is
//! registered once at startup.

use starlight_core::{messaging::types::Message, tickets::refusal_message};

use crate::{
    render,
    router::{Context, Error},
};

mod botinfo;
mod ping;
mod review;
mod services;
mod ticket;

pub fn all() -> Vec<poise::Command<crate::router::AppState, Error>> {
    vec![
        ping::ping(),
        botinfo::botinfo(),
        review::review(),
        services::services(),
        ticket::ticket(),
    ]
}

async fn send_ephemeral(ctx: Context<'_>, message: &Message) -> Result<(), Error> {
    ctx.send(render::reply(message).ephemeral(true)).await?;
    Ok(())
}

/// Show a refusal to the invoker and yield `None`; real failures propagate
/// to the framework error handler.
async fn refuse_or<T>(
    ctx: Context<'_>,
    result: starlight_core::Result<T>,
) -> Result<Option<T>, Error> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(e) => match e.refusal() {
            Some(r) => {
                send_ephemeral(ctx, &refusal_message(r)).await?;
                Ok(None)
            }
            None => Err(e.into()),
        },
    }
}
