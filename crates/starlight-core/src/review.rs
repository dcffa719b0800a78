use crate::{
    domain::UserId,
    errors::Refusal,
    messaging::types::{colors, user_mention, Embed, Message},
    Result,
};

/// Services a review can be left for.
pub const REVIEW_SERVICES: [&str; 5] = [
    "Non-Animated GFX",
    "Animated GFX",
    "Server Building",
    "Marketing",
    "Content Creation",
];

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 10;
pub const MAX_COMMENT_LEN: usize = 1000;

/// Emoji the posted review is reacted with.
pub const REVIEW_REACTION: &str = "❤️";
pub const REVIEW_THANKS: &str = "Thank you for submitting a review!";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Review {
    pub author: UserId,
    pub assisted_by: UserId,
    pub service: String,
    pub quality: u8,
    pub staff: u8,
    pub professionalism: u8,
    pub recommendation: u8,
    pub comments: Option<String>,
}

impl Review {
    pub fn validate(&self) -> Result<()> {
        if !REVIEW_SERVICES.contains(&self.service.as_str()) {
            return Err(Refusal::InvalidReview(format!("unknown service {:?}", self.service)).into());
        }
        for (name, value) in [
            ("quality", self.quality),
            ("staff", self.staff),
            ("professionalism", self.professionalism),
            ("recommendation", self.recommendation),
        ] {
            if !(MIN_RATING..=MAX_RATING).contains(&value) {
                return Err(Refusal::InvalidReview(format!(
                    "{name} must be between {MIN_RATING} and {MAX_RATING}"
                ))
                .into());
            }
        }
        if let Some(c) = &self.comments {
            if c.chars().count() > MAX_COMMENT_LEN {
                return Err(Refusal::InvalidReview(format!(
                    "comments must be at most {MAX_COMMENT_LEN} characters"
                ))
                .into());
            }
        }
        Ok(())
    }

    /// Message posted to the review channel.
    pub fn render(&self) -> Message {
        let author = user_mention(&self.author);
        let staff = user_mention(&self.assisted_by);
        let comments = self
            .comments
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or("N/A");

        let body = [
            format!("**Username**: {author}"),
            format!("**Assisted by**: {staff}"),
            format!("**Service requested**: {}", self.service),
            format!("**Item quality**: {}/10", self.quality),
            format!("**Interaction with staff**: {}/10", self.staff),
            format!("**Professionalism**: {}/10", self.professionalism),
            format!("**Would recommend**: {}/10", self.recommendation),
            format!("**Additional comments**: {comments}"),
        ]
        .map(|line| format!("▸ {line}"))
        .join("\n");

        Message::embed(
            Embed::new(body)
                .title("Service Review")
                .color(colors::REVIEW)
                .footer("Thank you for choosing Starlight Services!"),
        )
        .with_content(format!("**rev by ,,** {author}\n**staff asst ,,** {staff}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review() -> Review {
        Review {
            author: UserId::from("200000000000000001"),
            assisted_by: UserId::from("200000000000000002"),
            service: "Marketing".to_string(),
            quality: 9,
            staff: 10,
            professionalism: 8,
            recommendation: 1,
            comments: None,
        }
    }

    #[test]
    fn renders_all_fields() {
        let m = review().render();
        let e = &m.embeds[0];
        assert_eq!(e.title.as_deref(), Some("Service Review"));
        assert_eq!(e.color, Some(colors::REVIEW));
        assert!(e.description.contains("**Username**: <@200000000000000001>"));
        assert!(e.description.contains("**Assisted by**: <@200000000000000002>"));
        assert!(e.description.contains("**Item quality**: 9/10"));
        assert!(e.description.contains("**Would recommend**: 1/10"));
        assert!(e.description.ends_with("**Additional comments**: N/A"));
        assert_eq!(e.description.lines().count(), 8);
    }

    #[test]
    fn blank_comments_render_as_na() {
        let r = Review {
            comments: Some("   ".to_string()),
            ..review()
        };
        assert!(r.render().embeds[0].description.ends_with("N/A"));

        let r = Review {
            comments: Some("great work".to_string()),
            ..review()
        };
        assert!(r.render().embeds[0].description.ends_with("great work"));
    }

    #[test]
    fn validation_bounds() {
        assert!(review().validate().is_ok());

        for bad in [0, 11] {
            let r = Review {
                staff: bad,
                ..review()
            };
            assert!(matches!(
                r.validate().unwrap_err().refusal(),
                Some(Refusal::InvalidReview(_))
            ));
        }

        let r = Review {
            service: "VFX".to_string(),
            ..review()
        };
        assert!(r.validate().is_err());

        let r = Review {
            comments: Some("x".repeat(MAX_COMMENT_LEN + 1)),
            ..review()
        };
        assert!(r.validate().is_err());
        let r = Review {
            comments: Some("x".repeat(MAX_COMMENT_LEN)),
            ..review()
        };
        assert!(r.validate().is_ok());
    }
}
