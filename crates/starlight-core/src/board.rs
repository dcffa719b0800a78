//! Service availability board.
//!
//! A [`BoardSession`] is the in-memory state behind one `/services update`
//! invocation. [`ServiceBoard`] opens sessions, renders them and drives them
//! from a stream of clicks until they are saved or go idle.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::{sync::mpsc, time::Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    audit::{AuditEvent, AuditLogger},
    config::{AvailabilityConfig, Config, ServiceOffering, StatusEmojis},
    domain::{GuildId, ServiceState, UserId},
    messaging::{
        port::PlatformPort,
        types::{colors, role_mention, Button, ButtonRow, ButtonStyle, Embed, Message, MAX_ROWS},
    },
    store::{state_of, ServiceStates, Store},
    Result,
};

/// Toggle buttons fill every row but the last, which holds Save and Reset.
pub const MAX_SERVICES: usize = (MAX_ROWS - 1) * crate::messaging::types::MAX_BUTTONS_PER_ROW;

const BOARD_TITLE: &str = "Update Services";

const NOT_CONFIGURED: &str = r#"This component has not been set up yet.
If you are an administrator, please update the `config.toml` file.
An example configuration is displayed below.

```toml
[services.availability]
channel = "123456789123456789"
notify_role = "123456789123456789"

[[services.offerings]]
id = "graphics-animated"
name = "Animated GFX"

[[services.offerings]]
id = "marketing"
name = "Marketing"
```"#;

const REVIEW_REMINDER: &str = "Once your service is completed please fill out the review form requested by Staff. We are a **free** service provider and it takes seconds to help us show new customers the level of care we put into our work. Failure to leave a review could result in a service blacklist.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoardEntry {
    pub id: String,
    pub name: String,
    pub original_state: ServiceState,
    pub current_state: ServiceState,
    /// Custom id of this entry's toggle button.
    pub token: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Editing,
    /// Finalized by a successful submit.
    Saved,
    /// Finalized by the idle timeout.
    Expired,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BoardAction {
    Toggle(String),
    Submit,
    Reset,
}

fn new_token() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Clone, Debug)]
pub struct BoardSession {
    guild: GuildId,
    entries: Vec<BoardEntry>,
    submit_token: String,
    reset_token: String,
    phase: Phase,
}

impl BoardSession {
    /// Seed a session from the configured offerings and the stored states.
    /// Services without a stored state start out closed.
    pub fn new(guild: GuildId, offerings: &[ServiceOffering], stored: &ServiceStates) -> Self {
        let entries = offerings
            .iter()
            .map(|o| {
                let state = state_of(stored, &o.id);
                BoardEntry {
                    id: o.id.clone(),
                    name: o.name.clone(),
                    original_state: state,
                    current_state: state,
                    token: new_token(),
                }
            })
            .collect();

        Self {
            guild,
            entries,
            submit_token: new_token(),
            reset_token: new_token(),
            phase: Phase::Editing,
        }
    }

    pub fn guild(&self) -> &GuildId {
        &self.guild
    }

    pub fn entries(&self) -> &[BoardEntry] {
        &self.entries
    }

    pub fn entry(&self, id: &str) -> Option<&BoardEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn submit_token(&self) -> &str {
        &self.submit_token
    }

    pub fn reset_token(&self) -> &str {
        &self.reset_token
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_finalized(&self) -> bool {
        self.phase != Phase::Editing
    }

    /// Map a control token to an action. Foreign tokens and any token of a
    /// finalized session map to nothing.
    pub fn route(&self, token: &str) -> Option<BoardAction> {
        if self.is_finalized() {
            return None;
        }
        if token == self.submit_token {
            return Some(BoardAction::Submit);
        }
        if token == self.reset_token {
            return Some(BoardAction::Reset);
        }
        self.entries
            .iter()
            .find(|e| e.token == token)
            .map(|e| BoardAction::Toggle(e.id.clone()))
    }

    /// Advance one service through open → limited → closed. Returns whether
    /// anything changed.
    pub fn toggle(&mut self, service_id: &str) -> bool {
        if self.is_finalized() {
            return false;
        }
        match self.entries.iter_mut().find(|e| e.id == service_id) {
            Some(entry) => {
                entry.current_state = entry.current_state.next();
                true
            }
            None => false,
        }
    }

    pub fn reset(&mut self) -> bool {
        if self.is_finalized() {
            return false;
        }
        for entry in &mut self.entries {
            entry.current_state = entry.original_state;
        }
        true
    }

    /// Current states of every service on the board.
    pub fn snapshot(&self) -> ServiceStates {
        self.entries
            .iter()
            .map(|e| (e.id.clone(), e.current_state))
            .collect()
    }

    fn finalize(&mut self, phase: Phase) {
        if self.phase == Phase::Editing {
            self.phase = phase;
        }
    }

    pub fn mark_saved(&mut self) {
        self.finalize(Phase::Saved);
    }

    pub fn expire(&mut self) {
        self.finalize(Phase::Expired);
    }
}

// ============== Rendering ==============

/// Render the session. Pure: the same session always yields the same message.
pub fn render(session: &BoardSession, emojis: &StatusEmojis) -> Message {
    if session.phase() == Phase::Saved {
        return render_saved(session, emojis);
    }

    let disabled = session.is_finalized();
    let lines = session
        .entries()
        .iter()
        .map(|e| format!("{} ・ {}", emojis.for_state(e.current_state).mention(), e.name))
        .collect::<Vec<_>>()
        .join("\n");

    let toggles = session
        .entries()
        .iter()
        .map(|e| {
            Button::new(
                e.token.clone(),
                format!("{}: {}", e.name, e.current_state.label()),
                ButtonStyle::Secondary,
            )
            .emoji(emojis.for_state(e.current_state).clone())
            .disabled(disabled)
        })
        .collect::<Vec<_>>();

    let mut rows = ButtonRow::chunked(toggles);
    rows.push(ButtonRow::new(vec![
        Button::new(session.submit_token(), "Save", ButtonStyle::Primary).disabled(disabled),
        Button::new(session.reset_token(), "Reset", ButtonStyle::Secondary).disabled(disabled),
    ]));

    Message::embed(Embed::new(lines).title(BOARD_TITLE).color(colors::BRAND)).with_rows(rows)
}

/// Confirmation view that replaces the board after a submit.
pub fn render_saved(session: &BoardSession, emojis: &StatusEmojis) -> Message {
    let summary = session
        .entries()
        .iter()
        .map(|e| format!("* {}: {}", e.name, emojis.for_state(e.current_state).mention()))
        .collect::<Vec<_>>()
        .join("\n");

    Message::embed(
        Embed::new(format!("Successfully updated services.\n\n{summary}"))
            .title(BOARD_TITLE)
            .color(colors::BRAND),
    )
}

/// Announcement posted to the availability channel after a submit.
pub fn announcement(session: &BoardSession, cfg: &AvailabilityConfig) -> Message {
    let e = &cfg.emojis;
    let legend = ServiceState::ALL
        .iter()
        .map(|s| format!("{} {}", e.for_state(*s).mention(), s.label()))
        .collect::<Vec<_>>()
        .join("\n");
    let services = session
        .entries()
        .iter()
        .map(|entry| format!("{} ・ {}", e.for_state(entry.current_state).mention(), entry.name))
        .collect::<Vec<_>>()
        .join("\n");

    Message::embed(
        Embed::new(format!("{legend}\n\n{services}\n\n‧ ――★\n\n{REVIEW_REMINDER}"))
            .title("📌 Service Availability")
            .color(colors::AVAILABILITY),
    )
    .with_content(role_mention(&cfg.notify_role))
}

/// Reply for guilds without configured services.
pub fn not_configured() -> Message {
    Message::embed(Embed::new(NOT_CONFIGURED).title("Sorry!").color(colors::ERROR))
}

// ============== Driving ==============

/// A click on one of the board's controls.
#[derive(Debug)]
pub struct BoardClick<R> {
    pub token: String,
    pub actor: UserId,
    /// Handle used to answer this particular click.
    pub responder: R,
}

/// Where a running session shows itself.
#[async_trait]
pub trait BoardSurface: Send + Sync {
    type Responder: Send;

    /// Answer a click by replacing the board message with `view`.
    async fn update(&self, responder: Self::Responder, view: Message) -> Result<()>;

    /// Replace the board message once the session expired.
    async fn finalize(&self, view: Message) -> Result<()>;
}

pub struct ServiceBoard {
    cfg: Arc<Config>,
    store: Arc<dyn Store>,
    platform: Arc<dyn PlatformPort>,
    audit: Arc<AuditLogger>,
}

impl ServiceBoard {
    pub fn new(
        cfg: Arc<Config>,
        store: Arc<dyn Store>,
        platform: Arc<dyn PlatformPort>,
        audit: Arc<AuditLogger>,
    ) -> Self {
        Self {
            cfg,
            store,
            platform,
            audit,
        }
    }

    fn availability(&self) -> Option<&AvailabilityConfig> {
        self.cfg.services.availability.as_ref()
    }

    fn emojis(&self) -> StatusEmojis {
        self.availability()
            .map(|a| a.emojis.clone())
            .unwrap_or_default()
    }

    /// Start a session for `guild`, or `None` when no services are configured.
    pub async fn open(&self, guild: &GuildId) -> Result<Option<BoardSession>> {
        let offerings = &self.cfg.services.offerings;
        if offerings.is_empty() || self.availability().is_none() {
            return Ok(None);
        }
        let stored = self.store.guild_services(guild).await?;
        Ok(Some(BoardSession::new(guild.clone(), offerings, &stored)))
    }

    pub fn render(&self, session: &BoardSession) -> Message {
        render(session, &self.emojis())
    }

    /// Persist the board, announce it and finalize the session.
    pub async fn submit(&self, session: &mut BoardSession, actor: &UserId) -> Result<()> {
        if session.is_finalized() {
            return Ok(());
        }
        let Some(availability) = self.availability() else {
            return Ok(());
        };

        let states = session.snapshot();
        self.store
            .upsert_guild_services(session.guild(), &states)
            .await?;
        self.platform
            .send_message(&availability.channel, announcement(session, availability))
            .await?;
        session.mark_saved();

        info!(guild = %session.guild(), by = %actor, "service availability updated");
        self.audit
            .record(AuditEvent::services_updated(session.guild(), actor, &states));
        Ok(())
    }

    /// Feed clicks into `session` until it is saved, goes idle, or the click
    /// stream ends. Each routed click re-arms the idle timer.
    pub async fn drive<S: BoardSurface>(
        &self,
        mut session: BoardSession,
        mut clicks: mpsc::Receiver<BoardClick<S::Responder>>,
        surface: &S,
    ) -> Result<BoardSession> {
        let idle = self
            .availability()
            .map(|a| a.idle_timeout)
            .unwrap_or(crate::config::DEFAULT_IDLE_TIMEOUT);

        if let Err(e) = self.run(&mut session, &mut clicks, surface, idle).await {
            session.expire();
            if let Err(fin) = surface.finalize(self.render(&session)).await {
                warn!(error = %fin, "failed to disable service board");
            }
            return Err(e);
        }

        if !session.is_finalized() {
            session.expire();
            debug!(guild = %session.guild(), "service board expired");
            surface.finalize(self.render(&session)).await?;
        }
        Ok(session)
    }

    async fn run<S: BoardSurface>(
        &self,
        session: &mut BoardSession,
        clicks: &mut mpsc::Receiver<BoardClick<S::Responder>>,
        surface: &S,
        idle: std::time::Duration,
    ) -> Result<()> {
        let mut deadline = Instant::now() + idle;
        loop {
            let click = match tokio::time::timeout_at(deadline, clicks.recv()).await {
                Ok(Some(click)) => click,
                Ok(None) | Err(_) => return Ok(()),
            };
            let Some(action) = session.route(&click.token) else {
                debug!(token = %click.token, "ignoring click for another session");
                continue;
            };
            deadline = Instant::now() + idle;

            match action {
                BoardAction::Toggle(id) => {
                    session.toggle(&id);
                }
                BoardAction::Reset => {
                    session.reset();
                }
                BoardAction::Submit => {
                    self.submit(session, &click.actor).await?;
                    surface.update(click.responder, self.render(session)).await?;
                    return Ok(());
                }
            }
            surface.update(click.responder, self.render(session)).await?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::ChannelId,
        messaging::types::Emoji,
        store::MemoryStore,
        tickets::tests::{test_config, Call, FakePlatform, GUILD},
    };
    use std::{sync::Mutex, time::Duration};

    fn offerings() -> Vec<ServiceOffering> {
        ["a", "b", "c"]
            .iter()
            .map(|id| ServiceOffering {
                id: id.to_string(),
                name: id.to_uppercase(),
                ticket_category: None,
                staff_role: None,
            })
            .collect()
    }

    fn session_with(stored: &[(&str, ServiceState)]) -> BoardSession {
        let stored = stored
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect::<ServiceStates>();
        BoardSession::new(GuildId::from(GUILD), &offerings(), &stored)
    }

    #[test]
    fn unknown_services_start_closed() {
        let s = session_with(&[("a", ServiceState::Open)]);
        assert_eq!(s.entry("a").unwrap().current_state, ServiceState::Open);
        assert_eq!(s.entry("b").unwrap().current_state, ServiceState::Closed);
        assert_eq!(s.entry("b").unwrap().original_state, ServiceState::Closed);
    }

    #[test]
    fn tokens_are_unique_per_control_and_session() {
        let s1 = session_with(&[]);
        let s2 = session_with(&[]);
        let mut tokens = s1
            .entries()
            .iter()
            .map(|e| e.token.clone())
            .chain([s1.submit_token().to_string(), s1.reset_token().to_string()])
            .collect::<Vec<_>>();
        tokens.sort();
        tokens.dedup();
        assert_eq!(tokens.len(), 5);
        assert_eq!(s1.route(s2.submit_token()), None);
        assert_eq!(s1.route("not-a-token"), None);
    }

    #[test]
    fn toggling_cycles_three_states() {
        let mut s = session_with(&[("a", ServiceState::Open)]);
        let mut seen = Vec::new();
        for _ in 0..7 {
            seen.push(s.entry("a").unwrap().current_state);
            assert!(s.toggle("a"));
        }
        assert_eq!(
            seen,
            vec![
                ServiceState::Open,
                ServiceState::Limited,
                ServiceState::Closed,
                ServiceState::Open,
                ServiceState::Limited,
                ServiceState::Closed,
                ServiceState::Open,
            ]
        );
        assert_eq!(s.entry("a").unwrap().original_state, ServiceState::Open);
        assert!(!s.toggle("missing"));
    }

    #[test]
    fn reset_restores_originals_and_is_idempotent() {
        let mut s = session_with(&[("a", ServiceState::Limited), ("c", ServiceState::Open)]);
        for _ in 0..5 {
            s.toggle("a");
        }
        s.toggle("b");
        s.toggle("c");
        s.reset();
        let once = s.snapshot();
        s.reset();
        assert_eq!(s.snapshot(), once);
        assert_eq!(once.get("a"), Some(&ServiceState::Limited));
        assert_eq!(once.get("b"), Some(&ServiceState::Closed));
        assert_eq!(once.get("c"), Some(&ServiceState::Open));
    }

    #[test]
    fn finalized_sessions_ignore_input_and_render_disabled() {
        let mut s = session_with(&[]);
        s.expire();
        let before = s.snapshot();
        assert!(!s.toggle("a"));
        assert!(!s.reset());
        assert_eq!(s.snapshot(), before);
        assert_eq!(s.route(s.submit_token()), None);

        let view = render(&s, &StatusEmojis::default());
        assert_eq!(view.buttons().count(), 5);
        assert!(view.buttons().all(|b| b.disabled));

        // Expired does not become saved later.
        s.mark_saved();
        assert_eq!(s.phase(), Phase::Expired);
    }

    #[test]
    fn render_is_pure_and_shows_state() {
        let mut s = session_with(&[("a", ServiceState::Open)]);
        s.toggle("b");
        let emojis = StatusEmojis::default();
        let v1 = render(&s, &emojis);
        assert_eq!(v1, render(&s, &emojis));

        assert_eq!(v1.embeds[0].title.as_deref(), Some("Update Services"));
        let labels = v1.buttons().map(|b| b.label.as_str()).collect::<Vec<_>>();
        assert_eq!(labels, vec!["A: Open", "B: Open", "C: Closed", "Save", "Reset"]);
        let first = v1.buttons().next().unwrap();
        assert_eq!(first.emoji, Some(Emoji::Unicode("🟢".to_string())));
        assert!(v1.buttons().all(|b| !b.disabled));
        assert_eq!(v1.rows.len(), 2);
    }

    #[test]
    fn full_board_fits_the_row_limit() {
        let many = (0..MAX_SERVICES)
            .map(|i| ServiceOffering {
                id: format!("s{i}"),
                name: format!("S{i}"),
                ticket_category: None,
                staff_role: None,
            })
            .collect::<Vec<_>>();
        let s = BoardSession::new(GuildId::from(GUILD), &many, &ServiceStates::new());
        let view = render(&s, &StatusEmojis::default());
        assert_eq!(view.rows.len(), MAX_ROWS);
        assert!(view.rows.iter().all(|r| r.buttons.len() <= 5));
    }

    // ---- driving ----

    #[derive(Default)]
    struct FakeSurface {
        updates: Mutex<Vec<(u32, Message)>>,
        finals: Mutex<Vec<Message>>,
    }

    #[async_trait]
    impl BoardSurface for FakeSurface {
        type Responder = u32;

        async fn update(&self, responder: u32, view: Message) -> Result<()> {
            self.updates.lock().unwrap().push((responder, view));
            Ok(())
        }

        async fn finalize(&self, view: Message) -> Result<()> {
            self.finals.lock().unwrap().push(view);
            Ok(())
        }
    }

    fn board() -> (Arc<ServiceBoard>, Arc<MemoryStore>, Arc<FakePlatform>) {
        let store = Arc::new(MemoryStore::new());
        let platform = Arc::new(FakePlatform::default());
        let board = ServiceBoard::new(
            Arc::new(test_config()),
            store.clone(),
            platform.clone(),
            Arc::new(AuditLogger::disabled()),
        );
        (Arc::new(board), store, platform)
    }

    fn click(token: &str, n: u32) -> BoardClick<u32> {
        BoardClick {
            token: token.to_string(),
            actor: UserId::from("200000000000000009"),
            responder: n,
        }
    }

    #[tokio::test]
    async fn open_without_services_yields_no_session() {
        let store = Arc::new(MemoryStore::new());
        let cfg = Config::parse(
            r#"
review_channel = "700000000000000001"
[bot]
id = "774660568728469585"
"#,
        )
        .unwrap();
        let board = ServiceBoard::new(
            Arc::new(cfg),
            store,
            Arc::new(FakePlatform::default()),
            Arc::new(AuditLogger::disabled()),
        );
        assert!(board.open(&GuildId::from(GUILD)).await.unwrap().is_none());
        assert_eq!(not_configured().embeds[0].title.as_deref(), Some("Sorry!"));
    }

    #[tokio::test]
    async fn submit_persists_announces_and_finalizes() {
        let (board, store, platform) = board();
        let guild = GuildId::from(GUILD);
        let session = board.open(&guild).await.unwrap().unwrap();
        let toggle = session.entry("marketing").unwrap().token.clone();
        let submit = session.submit_token().to_string();

        let (tx, rx) = mpsc::channel(8);
        let surface = FakeSurface::default();
        tx.send(click(&toggle, 1)).await.unwrap();
        tx.send(click("someone-elses-token", 2)).await.unwrap();
        tx.send(click(&submit, 3)).await.unwrap();

        let done = board.drive(session, rx, &surface).await.unwrap();
        assert_eq!(done.phase(), Phase::Saved);

        let stored = store.guild_services(&guild).await.unwrap();
        assert_eq!(stored.get("marketing"), Some(&ServiceState::Open));
        assert_eq!(stored.get("graphics-animated"), Some(&ServiceState::Closed));
        assert_eq!(stored.len(), 3);

        let calls = platform.calls();
        assert_eq!(calls.len(), 1);
        let Call::Send(chan, msg) = &calls[0] else {
            panic!("expected announcement, got {calls:?}");
        };
        assert_eq!(chan, &ChannelId::from("710000000000000001"));
        assert_eq!(msg.content.as_deref(), Some("<@&720000000000000001>"));
        assert_eq!(msg.embeds[0].title.as_deref(), Some("📌 Service Availability"));
        assert!(msg.embeds[0].description.contains("🟢 ・ Marketing"));

        let updates = surface.updates.lock().unwrap();
        assert_eq!(updates.iter().map(|(n, _)| *n).collect::<Vec<_>>(), vec![1, 3]);
        let saved = &updates[1].1;
        assert!(saved.rows.is_empty());
        assert!(saved.embeds[0]
            .description
            .starts_with("Successfully updated services."));
        assert!(surface.finals.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn idle_session_expires_without_persisting() {
        let (board, store, platform) = board();
        let guild = GuildId::from(GUILD);
        let session = board.open(&guild).await.unwrap().unwrap();
        let (_tx, rx) = mpsc::channel::<BoardClick<u32>>(8);
        let surface = FakeSurface::default();

        let done = board.drive(session, rx, &surface).await.unwrap();
        assert_eq!(done.phase(), Phase::Expired);
        assert!(store.guild_services(&guild).await.unwrap().is_empty());
        assert!(platform.calls().is_empty());

        let finals = surface.finals.lock().unwrap();
        assert_eq!(finals.len(), 1);
        assert!(finals[0].buttons().all(|b| b.disabled));
    }

    #[tokio::test(start_paused = true)]
    async fn clicks_rearm_the_idle_timer() {
        let (board, _store, _platform) = board();
        let session = board.open(&GuildId::from(GUILD)).await.unwrap().unwrap();
        let reset = session.reset_token().to_string();
        let (tx, rx) = mpsc::channel(8);
        let surface = Arc::new(FakeSurface::default());

        let driver = {
            let board = board.clone();
            let surface = surface.clone();
            tokio::spawn(async move { board.drive(session, rx, &*surface).await })
        };

        tokio::time::sleep(Duration::from_secs(170)).await;
        tx.send(click(&reset, 1)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(170)).await;
        assert!(!driver.is_finished());
        assert!(surface.finals.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_secs(20)).await;
        let done = driver.await.unwrap().unwrap();
        assert_eq!(done.phase(), Phase::Expired);
        assert_eq!(surface.updates.lock().unwrap().len(), 1);
        assert_eq!(surface.finals.lock().unwrap().len(), 1);
    }
}
