//! Platform-neutral `Message` → serenity builders.

use poise::serenity_prelude as serenity;

use starlight_core::messaging::types::{
    colors, Button, ButtonStyle, Embed, Emoji, Message, SelectMenu,
};

/// Shown when a handler fails for reasons the user cannot fix.
pub fn failure_message() -> Message {
    Message::embed(
        Embed::new("Something went wrong while handling this. Please try again later.")
            .title("Sorry!")
            .color(colors::ERROR),
    )
}

pub fn reaction(emoji: &Emoji) -> serenity::ReactionType {
    match emoji {
        Emoji::Unicode(s) => serenity::ReactionType::Unicode(s.clone()),
        Emoji::Custom { name, id, animated } => match id.parse::<u64>() {
            Ok(n) if n != 0 => serenity::ReactionType::Custom {
                animated: *animated,
                id: serenity::EmojiId::new(n),
                name: Some(name.clone()),
            },
            // Config validation only lets snowflakes through.
            _ => serenity::ReactionType::Unicode(format!(":{name}:")),
        },
    }
}

pub fn embed(e: &Embed) -> serenity::CreateEmbed {
    let mut out = serenity::CreateEmbed::new().description(&e.description);
    if let Some(title) = &e.title {
        out = out.title(title);
    }
    if let Some(color) = e.color {
        out = out.color(color);
    }
    if let Some(footer) = &e.footer {
        out = out.footer(serenity::CreateEmbedFooter::new(footer));
    }
    out
}

fn button(b: &Button) -> serenity::CreateButton {
    let mut out = match (&b.style, &b.url) {
        (ButtonStyle::Link, Some(url)) => serenity::CreateButton::new_link(url),
        (style, _) => serenity::CreateButton::new(&b.custom_id).style(match style {
            ButtonStyle::Primary => serenity::ButtonStyle::Primary,
            ButtonStyle::Danger => serenity::ButtonStyle::Danger,
            ButtonStyle::Secondary | ButtonStyle::Link => serenity::ButtonStyle::Secondary,
        }),
    };
    out = out.label(&b.label).disabled(b.disabled);
    if let Some(emoji) = &b.emoji {
        out = out.emoji(reaction(emoji));
    }
    out
}

fn select_menu(s: &SelectMenu) -> serenity::CreateSelectMenu {
    let options = s
        .options
        .iter()
        .map(|o| serenity::CreateSelectMenuOption::new(&o.label, &o.value))
        .collect();
    serenity::CreateSelectMenu::new(&s.custom_id, serenity::CreateSelectMenuKind::String { options })
        .placeholder(&s.placeholder)
}

pub fn embeds(m: &Message) -> Vec<serenity::CreateEmbed> {
    m.embeds.iter().map(embed).collect()
}

pub fn components(m: &Message) -> Vec<serenity::CreateActionRow> {
    let mut rows = Vec::with_capacity(m.rows.len() + 1);
    if let Some(select) = &m.select {
        rows.push(serenity::CreateActionRow::SelectMenu(select_menu(select)));
    }
    rows.extend(
        m.rows
            .iter()
            .map(|r| serenity::CreateActionRow::Buttons(r.buttons.iter().map(button).collect())),
    );
    rows
}

pub fn create_message(m: &Message) -> serenity::CreateMessage {
    let mut out = serenity::CreateMessage::new()
        .embeds(embeds(m))
        .components(components(m));
    if let Some(content) = &m.content {
        out = out.content(content);
    }
    out
}

pub fn edit_message(m: &Message) -> serenity::EditMessage {
    let mut out = serenity::EditMessage::new()
        .embeds(embeds(m))
        .components(components(m));
    if let Some(content) = &m.content {
        out = out.content(content);
    }
    out
}

pub fn reply(m: &Message) -> poise::CreateReply {
    let mut out = poise::CreateReply::default().components(components(m));
    for e in embeds(m) {
        out = out.embed(e);
    }
    if let Some(content) = &m.content {
        out = out.content(content.clone());
    }
    out
}

/// Body of an interaction response; also used for in-place updates.
pub fn response(m: &Message) -> serenity::CreateInteractionResponseMessage {
    let mut out = serenity::CreateInteractionResponseMessage::new()
        .embeds(embeds(m))
        .components(components(m));
    if let Some(content) = &m.content {
        out = out.content(content);
    }
    out
}

pub fn edit_response(m: &Message) -> serenity::EditInteractionResponse {
    let mut out = serenity::EditInteractionResponse::new()
        .embeds(embeds(m))
        .components(components(m));
    if let Some(content) = &m.content {
        out = out.content(content);
    }
    out
}

pub fn followup(m: &Message) -> serenity::CreateInteractionResponseFollowup {
    let mut out = serenity::CreateInteractionResponseFollowup::new()
        .embeds(embeds(m))
        .components(components(m));
    if let Some(content) = &m.content {
        out = out.content(content);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use starlight_core::messaging::types::{ButtonRow, SelectOption};

    #[test]
    fn embed_carries_title_description_and_footer() {
        let e = embed(
            &Embed::new("body")
                .title("Service Review")
                .footer("Thank you for choosing Starlight Services!"),
        );
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["title"], "Service Review");
        assert_eq!(v["description"], "body");
        assert_eq!(v["footer"]["text"], "Thank you for choosing Starlight Services!");
    }

    #[test]
    fn select_menu_gets_its_own_row_first() {
        let m = Message::text("hi")
            .with_rows(vec![ButtonRow::new(vec![Button::new(
                "close-ticket",
                "Close",
                ButtonStyle::Secondary,
            )])])
            .with_select(SelectMenu {
                custom_id: "create-ticket".to_string(),
                placeholder: "Select a Service".to_string(),
                options: vec![SelectOption {
                    label: "Marketing".to_string(),
                    value: "marketing".to_string(),
                }],
            });
        let rows = components(&m);
        assert_eq!(rows.len(), 2);
        assert!(matches!(rows[0], serenity::CreateActionRow::SelectMenu(_)));
        assert!(matches!(rows[1], serenity::CreateActionRow::Buttons(ref b) if b.len() == 1));
    }

    #[test]
    fn custom_emoji_becomes_custom_reaction() {
        let r = reaction(&Emoji::Custom {
            name: "ss_open".to_string(),
            id: "1366879016950431754".to_string(),
            animated: false,
        });
        assert!(matches!(r, serenity::ReactionType::Custom { .. }));
        let u = reaction(&Emoji::Unicode("🟢".to_string()));
        assert_eq!(u, serenity::ReactionType::Unicode("🟢".to_string()));
    }
}
