//! Async Session Driver
//!
//! Runs one [`ArcadeEngine`] inside a tokio task. Commands arrive through an
//! mpsc mailbox, engine events fan out over a broadcast channel, and the task
//! sleeps until the engine's next timer deadline when idle.
//!
//! Finished runs are handed to the [`RunSubmitter`] on a detached task and
//! appended to the [`RunLogStore`]. Neither ever blocks gameplay.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, instrument, warn};

use crate::audit::analytics::AnalyticsRun;
use crate::core::clock::{Clock, Millis};
use crate::game::config::{EngineConfig, GameSettings};
use crate::game::engine::ArcadeEngine;
use crate::game::events::{EngineEvent, EngineEventData};
use crate::game::input::{map_key, InputAction, RawKey};
use crate::game::prompt::{PromptGenerator, PromptSource};
use crate::game::state::{GameSnapshot, RunSummary};
use crate::session::collaborators::{RunLogStore, RunSubmitter};

/// Session errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    #[error("Session closed")]
    Closed,
}

/// Configuration for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub engine: EngineConfig,
    pub settings: GameSettings,
    /// Broadcast buffer; slow subscribers lag past this
    pub event_capacity: usize,
    /// Mailbox size
    pub command_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            settings: GameSettings::default(),
            event_capacity: 256,
            command_capacity: 64,
        }
    }
}

// =============================================================================
// CLOCK
// =============================================================================

/// Engine clock on tokio's timeline, so paused-time tests drive it too.
#[derive(Debug, Clone)]
pub struct TokioClock {
    origin: Instant,
    wall_origin: DateTime<Utc>,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            wall_origin: Utc::now(),
        }
    }

    /// Tokio instant for an engine time.
    pub fn instant_at(&self, ms: Millis) -> Instant {
        self.origin + Duration::from_millis(ms)
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now_ms(&self) -> Millis {
        self.origin.elapsed().as_millis() as Millis
    }

    fn wall_time(&self) -> DateTime<Utc> {
        self.wall_origin + ChronoDuration::milliseconds(self.now_ms() as i64)
    }
}

// =============================================================================
// HANDLE
// =============================================================================

enum SessionCommand {
    Action(InputAction, oneshot::Sender<bool>),
    Key(RawKey, oneshot::Sender<bool>),
    SetSettings(GameSettings, oneshot::Sender<()>),
    Snapshot(oneshot::Sender<GameSnapshot>),
    Summary(oneshot::Sender<Option<RunSummary>>),
    Shutdown(oneshot::Sender<()>),
}

/// Handle to a running session. Clones address the same session.
///
/// The session stops when [`SessionHandle::shutdown`] is called or every
/// handle is dropped.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    events: broadcast::Sender<EngineEvent>,
}

impl SessionHandle {
    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    /// Apply an engine action. Returns whether the engine accepted it.
    pub async fn action(&self, action: InputAction) -> Result<bool, SessionError> {
        self.request(|tx| SessionCommand::Action(action, tx)).await
    }

    pub async fn start(&self) -> Result<bool, SessionError> {
        self.action(InputAction::Start).await
    }

    pub async fn restart(&self) -> Result<bool, SessionError> {
        self.action(InputAction::Restart).await
    }

    pub async fn char(&self, c: char) -> Result<bool, SessionError> {
        self.action(InputAction::Char(c)).await
    }

    pub async fn backspace(&self) -> Result<bool, SessionError> {
        self.action(InputAction::Backspace).await
    }

    pub async fn go_to_results(&self) -> Result<bool, SessionError> {
        self.action(InputAction::Continue).await
    }

    /// Feed a raw host key through the input adapter.
    pub async fn key(&self, key: RawKey) -> Result<bool, SessionError> {
        self.request(|tx| SessionCommand::Key(key, tx)).await
    }

    /// Replace settings for the next run.
    pub async fn set_settings(&self, settings: GameSettings) -> Result<(), SessionError> {
        self.request(|tx| SessionCommand::SetSettings(settings, tx)).await
    }

    pub async fn snapshot(&self) -> Result<GameSnapshot, SessionError> {
        self.request(SessionCommand::Snapshot).await
    }

    pub async fn summary(&self) -> Result<Option<RunSummary>, SessionError> {
        self.request(SessionCommand::Summary).await
    }

    /// Subscribe to engine events.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// Stop the session and cancel its timers.
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.request(SessionCommand::Shutdown).await
    }
}

// =============================================================================
// ACTOR
// =============================================================================

struct SessionActor<P: PromptSource, S: RunSubmitter> {
    engine: ArcadeEngine<TokioClock, P>,
    events: broadcast::Sender<EngineEvent>,
    submitter: Arc<S>,
    store: RunLogStore,
}

impl<P: PromptSource, S: RunSubmitter> SessionActor<P, S> {
    fn new(
        config: SessionConfig,
        prompts: P,
        submitter: Arc<S>,
        store: RunLogStore,
        events: broadcast::Sender<EngineEvent>,
    ) -> Self {
        let engine = ArcadeEngine::with_prompt_source(
            config.settings,
            config.engine,
            TokioClock::new(),
            prompts,
        );
        Self {
            engine,
            events,
            submitter,
            store,
        }
    }

    /// Apply one mailbox command. Breaks on shutdown.
    fn handle(&mut self, command: SessionCommand) -> ControlFlow<()> {
        match command {
            SessionCommand::Action(action, reply) => {
                let _ = reply.send(self.engine.apply_action(action));
            }
            SessionCommand::Key(key, reply) => {
                // map against the phase after any due timers have fired
                self.engine.poll();
                let action = map_key(self.engine.phase(), &key);
                let _ = reply.send(self.engine.apply_action(action));
            }
            SessionCommand::SetSettings(settings, reply) => {
                self.engine.set_settings(settings);
                let _ = reply.send(());
            }
            SessionCommand::Snapshot(reply) => {
                let _ = reply.send(self.engine.snapshot());
            }
            SessionCommand::Summary(reply) => {
                let _ = reply.send(self.engine.summary().cloned());
            }
            SessionCommand::Shutdown(reply) => {
                let _ = reply.send(());
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    /// Forward queued events and hand finished runs to collaborators.
    async fn drain_events(&mut self) {
        for event in self.engine.take_events() {
            if let EngineEventData::RunFinished(summary) = &event.data {
                info!(
                    seed = %summary.seed,
                    streak = summary.final_streak,
                    score = summary.score,
                    "run finished"
                );
                self.submit(summary.as_ref().clone());

                match AnalyticsRun::from_engine(&self.engine) {
                    Ok(run) => self.store.push(run).await,
                    Err(error) => warn!(%error, "could not record analytics run"),
                }
            }

            // no subscribers is fine
            let _ = self.events.send(event);
        }
    }

    fn submit(&self, summary: RunSummary) {
        let submitter = Arc::clone(&self.submitter);
        tokio::spawn(async move {
            if let Err(error) = submitter.submit(summary).await {
                warn!(%error, "run submission failed");
            }
        });
    }
}

#[instrument(skip_all, name = "session")]
async fn run_session<P, S>(mut actor: SessionActor<P, S>, mut commands: mpsc::Receiver<SessionCommand>)
where
    P: PromptSource,
    S: RunSubmitter,
{
    debug!("session started");

    loop {
        let deadline = actor
            .engine
            .next_deadline()
            .map(|ms| actor.engine.clock().instant_at(ms));

        tokio::select! {
            command = commands.recv() => match command {
                Some(command) => {
                    if actor.handle(command).is_break() {
                        break;
                    }
                }
                None => break,
            },
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                actor.engine.poll();
            }
        }

        actor.drain_events().await;
    }

    actor.engine.cleanup();
    debug!("session stopped");
}

/// Spawn a session using the built-in prompt generator.
pub fn spawn_session<S: RunSubmitter>(
    config: SessionConfig,
    submitter: Arc<S>,
    store: RunLogStore,
) -> SessionHandle {
    let prompts = PromptGenerator::with_config(config.engine.prompt);
    spawn_session_with_prompts(config, prompts, submitter, store)
}

/// Spawn a session with a custom prompt source.
pub fn spawn_session_with_prompts<P, S>(
    config: SessionConfig,
    prompts: P,
    submitter: Arc<S>,
    store: RunLogStore,
) -> SessionHandle
where
    P: PromptSource + Send + 'static,
    S: RunSubmitter,
{
    let (command_tx, command_rx) = mpsc::channel(config.command_capacity.max(1));
    let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));

    let actor = SessionActor::new(config, prompts, submitter, store, event_tx.clone());

    tokio::spawn(run_session(actor, command_rx));

    SessionHandle {
        commands: command_tx,
        events: event_tx,
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use tokio::sync::Mutex;
    use tokio::time::sleep;

    use crate::game::prompt::ScriptedPrompts;
    use crate::game::state::GamePhase;
    use crate::session::collaborators::{NoopSubmitter, SubmitError};

    #[derive(Default)]
    struct RecordingSubmitter {
        runs: Arc<Mutex<Vec<RunSummary>>>,
    }

    impl RunSubmitter for RecordingSubmitter {
        fn submit(
            &self,
            summary: RunSummary,
        ) -> impl Future<Output = Result<(), SubmitError>> + Send {
            let runs = Arc::clone(&self.runs);
            async move {
                runs.lock().await.push(summary);
                Ok(())
            }
        }
    }

    struct FailingSubmitter;

    impl RunSubmitter for FailingSubmitter {
        fn submit(
            &self,
            _summary: RunSummary,
        ) -> impl Future<Output = Result<(), SubmitError>> + Send {
            async {
                sleep(Duration::from_secs(60)).await;
                Err(SubmitError::Unavailable("leaderboard down".to_string()))
            }
        }
    }

    fn config() -> SessionConfig {
        SessionConfig {
            settings: GameSettings::default().with_seed("session"),
            ..SessionConfig::default()
        }
    }

    fn scripted<S: RunSubmitter>(submitter: Arc<S>, store: RunLogStore) -> SessionHandle {
        spawn_session_with_prompts(config(), ScriptedPrompts::new(["hey", "you"]), submitter, store)
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_to_playing() {
        let handle = spawn_session(config(), Arc::new(NoopSubmitter), RunLogStore::default());
        assert!(handle.start().await.unwrap());
        assert_eq!(
            handle.snapshot().await.unwrap().phase,
            GamePhase::Countdown { remaining: 3 }
        );

        sleep(Duration::from_millis(2_750)).await;
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.phase, GamePhase::Playing);
        assert_eq!(snapshot.round, 1);
        assert!(snapshot.prompt.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_through_keys() {
        let handle = scripted(Arc::new(NoopSubmitter), RunLogStore::default());
        let mut events = handle.subscribe();

        handle.key(RawKey::named("Enter")).await.unwrap();
        sleep(Duration::from_millis(2_750)).await;

        for c in "hey".chars() {
            sleep(Duration::from_millis(100)).await;
            assert!(handle.key(RawKey::char(c)).await.unwrap());
        }
        // repeats never reach the engine
        assert!(!handle.key(RawKey::char('y').repeated()).await.unwrap());

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.streak, 1);

        let mut cleared = false;
        while let Ok(event) = events.try_recv() {
            if matches!(event.data, EngineEventData::RoundCleared { round: 1, .. }) {
                cleared = true;
            }
        }
        assert!(cleared);

        sleep(Duration::from_millis(850)).await;
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.round, 2);
        assert_eq!(snapshot.prompt.as_deref(), Some("you"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_submits_and_records() {
        let submitter = Arc::new(RecordingSubmitter::default());
        let store = RunLogStore::default();
        let handle = scripted(Arc::clone(&submitter), store.clone());

        handle.start().await.unwrap();
        sleep(Duration::from_millis(2_700 + 15_000 + 100)).await;

        assert_eq!(handle.snapshot().await.unwrap().phase, GamePhase::Dead);
        let summary = handle.summary().await.unwrap().unwrap();
        assert!(summary.is_timeout());
        assert_eq!(summary.duration_ms, 15_000);

        sleep(Duration::from_millis(10)).await;
        assert_eq!(submitter.runs.lock().await.len(), 1);
        assert_eq!(store.len().await, 1);
        assert!(store.recent().await[0].fingerprint_valid());

        // continuing to results does not submit again
        handle.go_to_results().await.unwrap();
        sleep(Duration::from_millis(10)).await;
        assert_eq!(submitter.runs.lock().await.len(), 1);
        assert_eq!(handle.snapshot().await.unwrap().phase, GamePhase::Results);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_failing_submitter_does_not_block() {
        let handle = scripted(Arc::new(FailingSubmitter), RunLogStore::default());
        handle.start().await.unwrap();
        sleep(Duration::from_millis(2_750)).await;

        handle.char('x').await.unwrap();
        assert_eq!(handle.snapshot().await.unwrap().phase, GamePhase::Dead);

        // the submitter is still sleeping; the session keeps answering
        assert!(handle.restart().await.unwrap());
        assert_eq!(
            handle.snapshot().await.unwrap().phase,
            GamePhase::Countdown { remaining: 3 }
        );
    }

    fn actor() -> SessionActor<ScriptedPrompts, NoopSubmitter> {
        let (events, _) = broadcast::channel(16);
        SessionActor::new(
            config(),
            ScriptedPrompts::new(["hey"]),
            Arc::new(NoopSubmitter),
            RunLogStore::default(),
            events,
        )
    }

    fn send_key(actor: &mut SessionActor<ScriptedPrompts, NoopSubmitter>, key: RawKey) -> bool {
        let (tx, mut rx) = oneshot::channel();
        assert!(actor.handle(SessionCommand::Key(key, tx)).is_continue());
        rx.try_recv().unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_key_after_countdown_deadline_reaches_round() {
        let mut actor = actor();
        assert!(send_key(&mut actor, RawKey::named("Enter")));

        // the countdown timers are due but nothing has polled them yet
        tokio::time::advance(Duration::from_millis(2_750)).await;
        assert!(matches!(actor.engine.phase(), GamePhase::Countdown { .. }));

        assert!(send_key(&mut actor, RawKey::char('h')));
        assert_eq!(actor.engine.phase(), GamePhase::Playing);
        assert_eq!(actor.engine.snapshot().cursor_index, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enter_after_unpolled_timeout_continues() {
        let mut actor = actor();
        assert!(send_key(&mut actor, RawKey::named("Enter")));

        tokio::time::advance(Duration::from_millis(2_700 + 15_000 + 50)).await;
        assert!(actor.engine.phase().is_playing());

        assert!(send_key(&mut actor, RawKey::named("Enter")));
        assert_eq!(actor.engine.phase(), GamePhase::Results);
        assert!(actor.engine.summary().unwrap().is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_breaks_actor_loop() {
        let mut actor = actor();
        let (tx, mut rx) = oneshot::channel();
        assert!(actor.handle(SessionCommand::Shutdown(tx)).is_break());
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_closes_session() {
        let handle = spawn_session(config(), Arc::new(NoopSubmitter), RunLogStore::default());
        handle.start().await.unwrap();
        handle.shutdown().await.unwrap();

        assert!(matches!(handle.snapshot().await, Err(SessionError::Closed)));

        // no timers left running after shutdown
        sleep(Duration::from_secs(30)).await;
        assert!(matches!(handle.start().await, Err(SessionError::Closed)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_settings_apply_on_next_run() {
        let handle = scripted(Arc::new(NoopSubmitter), RunLogStore::default());
        handle
            .set_settings(GameSettings::default().with_seed("other").with_backspace(true))
            .await
            .unwrap();
        handle.start().await.unwrap();
        sleep(Duration::from_millis(2_750)).await;

        handle.char('h').await.unwrap();
        assert!(handle.backspace().await.unwrap());
        assert_eq!(handle.snapshot().await.unwrap().cursor_index, 0);
    }
}
