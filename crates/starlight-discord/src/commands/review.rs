use poise::serenity_prelude as serenity;
use tracing::info;

use starlight_core::{
    domain::UserId,
    messaging::types::Message,
    review::{Review, REVIEW_REACTION, REVIEW_THANKS},
};

use crate::{
    dc_channel, render,
    router::{Context, Error},
};

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum ReviewService {
    #[name = "Non-Animated GFX"]
    NonAnimatedGfx,
    #[name = "Animated GFX"]
    AnimatedGfx,
    #[name = "Server Building"]
    ServerBuilding,
    #[name = "Marketing"]
    Marketing,
    #[name = "Content Creation"]
    ContentCreation,
}

impl ReviewService {
    fn as_str(self) -> &'static str {
        match self {
            ReviewService::NonAnimatedGfx => "Non-Animated GFX",
            ReviewService::AnimatedGfx => "Animated GFX",
            ReviewService::ServerBuilding => "Server Building",
            ReviewService::Marketing => "Marketing",
            ReviewService::ContentCreation => "Content Creation",
        }
    }
}

/// Submit a service review.
#[poise::command(slash_command, guild_only)]
pub async fn review(
    ctx: Context<'_>,
    #[rename = "assisted-by"]
    #[description = "The staff member who assisted you"]
    assisted_by: serenity::User,
    #[description = "What service did you request?"] service: ReviewService,
    #[description = "On a scale from 1–10, what was the quality of the item you received?"]
    #[min = 1]
    #[max = 10]
    quality: u8,
    #[description = "On a scale from 1–10, how was your interaction with the staff members who assisted you?"]
    #[min = 1]
    #[max = 10]
    staff: u8,
    #[description = "On a scale from 1–10, how professional were the staff members you interacted with?"]
    #[min = 1]
    #[max = 10]
    professionalism: u8,
    #[description = "On a scale from 1–10, how likely are you to recommend Starlight to others in the future?"]
    #[min = 1]
    #[max = 10]
    recommendation: u8,
    #[description = "If you have any other comments, please list them here."]
    #[max_length = 1000]
    comments: Option<String>,
) -> Result<(), Error> {
    let review = Review {
        author: UserId(ctx.author().id.to_string()),
        assisted_by: UserId(assisted_by.id.to_string()),
        service: service.as_str().to_string(),
        quality,
        staff,
        professionalism,
        recommendation,
        comments,
    };
    if super::refuse_or(ctx, review.validate()).await?.is_none() {
        return Ok(());
    }

    super::send_ephemeral(ctx, &Message::text(REVIEW_THANKS)).await?;

    let channel = dc_channel(&ctx.data().cfg.review_channel)?;
    let posted = channel
        .send_message(ctx.http(), render::create_message(&review.render()))
        .await?;
    posted
        .react(
            ctx.http(),
            serenity::ReactionType::Unicode(REVIEW_REACTION.to_string()),
        )
        .await?;

    info!(author = %review.author, service = %review.service, "review posted");
    Ok(())
}
