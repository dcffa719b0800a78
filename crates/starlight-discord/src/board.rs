//! Runs a service board session against a live Discord message.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use poise::serenity_prelude as serenity;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use starlight_core::{
    board::{BoardClick, BoardSession, BoardSurface, ServiceBoard},
    domain::UserId,
    errors::Error,
    messaging::types::Message,
    Result,
};

use crate::render;

const CLICK_BUFFER: usize = 16;

/// The board message a session renders into.
pub struct DiscordBoardSurface {
    http: Arc<serenity::Http>,
    channel_id: serenity::ChannelId,
    message_id: serenity::MessageId,
}

impl DiscordBoardSurface {
    pub fn new(
        http: Arc<serenity::Http>,
        channel_id: serenity::ChannelId,
        message_id: serenity::MessageId,
    ) -> Self {
        Self {
            http,
            channel_id,
            message_id,
        }
    }
}

#[async_trait]
impl BoardSurface for DiscordBoardSurface {
    type Responder = serenity::ComponentInteraction;

    async fn update(&self, responder: Self::Responder, view: Message) -> Result<()> {
        responder
            .create_response(
                &*self.http,
                serenity::CreateInteractionResponse::UpdateMessage(render::response(&view)),
            )
            .await
            .map_err(|e| Error::External(format!("discord error: {e}")))
    }

    async fn finalize(&self, view: Message) -> Result<()> {
        self.channel_id
            .edit_message(&*self.http, self.message_id, render::edit_message(&view))
            .await
            .map_err(|e| Error::External(format!("discord error: {e}")))?;
        Ok(())
    }
}

/// Forward clicks on the board message into the session until it ends.
pub async fn run_session(
    ctx: &serenity::Context,
    board: &ServiceBoard,
    session: BoardSession,
    message: &serenity::Message,
) -> Result<BoardSession> {
    let (tx, rx) = mpsc::channel(CLICK_BUFFER);
    let cancel = CancellationToken::new();

    let clicks = serenity::ComponentInteractionCollector::new(ctx)
        .message_id(message.id)
        .stream();
    let forward = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let mut clicks = Box::pin(clicks);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    next = clicks.next() => {
                        let Some(ci) = next else { break };
                        let click = BoardClick {
                            token: ci.data.custom_id.clone(),
                            actor: UserId(ci.user.id.to_string()),
                            responder: ci,
                        };
                        if tx.send(click).await.is_err() {
                            break;
                        }
                    }
                }
            }
        })
    };

    let surface = DiscordBoardSurface::new(ctx.http.clone(), message.channel_id, message.id);
    let result = board.drive(session, rx, &surface).await;

    cancel.cancel();
    let _ = forward.await;
    result
}
