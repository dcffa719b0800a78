use std::sync::Arc;

use chrono::{DateTime, Utc};
use poise::serenity_prelude as serenity;
use tracing::{error, info};

use starlight_core::{
    audit::AuditLogger, board::ServiceBoard, config::Config, messaging::port::PlatformPort,
    store::Store, tickets::TicketEngine,
};

use crate::{commands, handlers, render, DiscordPlatform};

/// Shared state handed to every command and event handler.
pub struct AppState {
    pub cfg: Arc<Config>,
    pub platform: Arc<dyn PlatformPort>,
    pub tickets: Arc<TicketEngine>,
    pub board: Arc<ServiceBoard>,
    pub launched_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(cfg: Arc<Config>, store: Arc<dyn Store>, platform: Arc<dyn PlatformPort>) -> Self {
        let audit = Arc::new(AuditLogger::new(
            cfg.audit_log_path.clone(),
            cfg.audit_log_json,
        ));
        let tickets = Arc::new(TicketEngine::new(
            cfg.clone(),
            store.clone(),
            platform.clone(),
            audit.clone(),
        ));
        let board = Arc::new(ServiceBoard::new(
            cfg.clone(),
            store,
            platform.clone(),
            audit,
        ));
        Self {
            cfg,
            platform,
            tickets,
            board,
            launched_at: Utc::now(),
        }
    }
}

pub type Error = anyhow::Error;
pub type Context<'a> = poise::Context<'a, AppState, Error>;

pub async fn run(cfg: Arc<Config>, store: Arc<dyn Store>) -> anyhow::Result<()> {
    let token = cfg.bot_token.clone();
    let setup_cfg = cfg.clone();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::all(),
            on_error: |err| Box::pin(on_error(err)),
            event_handler: |ctx, event, framework, state| {
                Box::pin(handlers::handle_event(ctx, event, framework, state))
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                info!(
                    user = %ready.user.name,
                    commands = framework.options().commands.len(),
                    "registered slash commands"
                );

                let platform: Arc<dyn PlatformPort> =
                    Arc::new(DiscordPlatform::new(ctx.http.clone()));
                Ok(AppState::new(setup_cfg, store, platform))
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged();
    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;

    info!(
        config = ?cfg.source,
        offerings = cfg.services.offerings.len(),
        "starting discord client"
    );
    client.start().await?;
    Ok(())
}

async fn on_error(err: poise::FrameworkError<'_, AppState, Error>) {
    match err {
        poise::FrameworkError::Setup { error, .. } => {
            error!(error = %error, "framework setup failed");
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!(
                command = %ctx.command().qualified_name,
                user = %ctx.author().id,
                error = %error,
                "command failed"
            );
            let reply = render::reply(&render::failure_message()).ephemeral(true);
            if let Err(e) = ctx.send(reply).await {
                error!(error = %e, "failed to report command failure");
            }
        }
        poise::FrameworkError::EventHandler { error, event, .. } => {
            error!(event = event.snake_case_name(), error = %error, "event handler failed");
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                error!(error = %e, "error while handling framework error");
            }
        }
    }
}
