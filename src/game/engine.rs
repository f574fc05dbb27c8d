//! Arcade Engine
//!
//! The imperative shell around [`step`]: it owns the clock, the timer queue
//! and the prompt source, turns fired timers into commands, and applies the
//! effects each step asks for.
//!
//! Single-writer: one owner drives the engine. The async wrapper in
//! [`crate::session`] serializes access through a mailbox.

use tracing::debug;

use crate::core::clock::{Clock, Millis};
use crate::core::rng::fresh_seed;
use crate::game::config::{EngineConfig, GameSettings};
use crate::game::events::EngineEvent;
use crate::game::input::InputAction;
use crate::game::prompt::{PromptGenerator, PromptSource};
use crate::game::state::{
    DeathInfo, GamePhase, GameSnapshot, GameState, KeystrokeLog, RunSummary,
};
use crate::game::step::{snapshot, step, Command, Effect, Now, StepOutcome};
use crate::game::timers::{TimerId, TimerKind, TimerQueue};

/// Timer-driven arcade engine.
pub struct ArcadeEngine<C: Clock, P: PromptSource = PromptGenerator> {
    state: GameState,
    config: EngineConfig,
    clock: C,
    prompts: P,
    timers: TimerQueue,
    round_deadline: Option<TimerId>,
    /// Settings staged for the next run
    pending_settings: Option<GameSettings>,
}

impl<C: Clock> ArcadeEngine<C, PromptGenerator> {
    /// Engine with the built-in word bank.
    pub fn new(settings: GameSettings, config: EngineConfig, clock: C) -> Self {
        let prompts = PromptGenerator::with_config(config.prompt);
        Self::with_prompt_source(settings, config, clock, prompts)
    }
}

impl<C: Clock, P: PromptSource> ArcadeEngine<C, P> {
    pub fn with_prompt_source(
        settings: GameSettings,
        config: EngineConfig,
        clock: C,
        prompts: P,
    ) -> Self {
        Self {
            state: GameState::new(settings),
            config,
            clock,
            prompts,
            timers: TimerQueue::new(),
            round_deadline: None,
            pending_settings: None,
        }
    }

    fn now(&self) -> Now {
        Now::new(self.clock.now_ms(), self.clock.wall_time())
    }

    /// Install staged settings. Only called when a new run is about to begin.
    fn apply_pending_settings(&mut self) {
        if let Some(settings) = self.pending_settings.take() {
            debug!(difficulty = settings.difficulty.as_str(), "applying staged settings");
            self.state.settings = settings;
        }
    }

    fn resolve_seed(&self) -> String {
        self.state.settings.seed.clone().unwrap_or_else(fresh_seed)
    }

    /// Run one command at `now` and apply its effects.
    fn dispatch(&mut self, command: Command, now: Now) -> bool {
        let outcome = step(
            &mut self.state,
            command,
            now,
            &self.config,
            &mut self.prompts,
        );
        self.apply(outcome, now.ms)
    }

    fn apply(&mut self, outcome: StepOutcome, now: Millis) -> bool {
        let epoch = self.state.epoch;
        for effect in outcome.effects {
            match effect {
                Effect::CancelAll => {
                    self.timers.cancel_all();
                    self.round_deadline = None;
                }
                Effect::CancelRoundDeadline => {
                    if let Some(id) = self.round_deadline.take() {
                        self.timers.cancel(id);
                    }
                }
                Effect::ScheduleCountdownTick { delay_ms } => {
                    self.timers
                        .schedule(now + delay_ms, TimerKind::CountdownTick { epoch });
                }
                Effect::ScheduleRoundDeadline { round, delay_ms } => {
                    let id = self
                        .timers
                        .schedule(now + delay_ms, TimerKind::RoundDeadline { epoch, round });
                    self.round_deadline = Some(id);
                }
                Effect::ScheduleNextRound { round, delay_ms } => {
                    self.timers
                        .schedule(now + delay_ms, TimerKind::NextRound { epoch, round });
                }
            }
        }
        outcome.accepted
    }

    // =========================================================================
    // TIMERS
    // =========================================================================

    /// Fire every timer due by now. Returns how many fired.
    ///
    /// Each timer runs at its own due time, so the outcome does not depend on
    /// how late the poll is.
    pub fn poll(&mut self) -> usize {
        let now_ms = self.clock.now_ms();
        let mut fired = 0;

        while let Some((due, kind)) = self.timers.pop_due(now_ms) {
            fired += 1;
            let command = match kind {
                TimerKind::CountdownTick { epoch } => Command::CountdownTick { epoch },
                TimerKind::RoundDeadline { epoch, round } => {
                    self.round_deadline = None;
                    Command::RoundTimeout { epoch, round }
                }
                TimerKind::NextRound { epoch, round } => Command::BeginRound { epoch, round },
            };
            let now = Now::new(due, self.clock.wall_time());
            if !self.dispatch(command.clone(), now) {
                debug!(?command, due, "stale timer ignored");
            }
        }

        fired
    }

    /// Due time of the next pending timer.
    pub fn next_deadline(&self) -> Option<Millis> {
        self.timers.next_deadline()
    }

    /// Cancel every pending timer. Idempotent.
    pub fn cleanup(&mut self) {
        if !self.timers.is_empty() {
            debug!(pending = self.timers.len(), "cancelling timers");
        }
        self.timers.cancel_all();
        self.round_deadline = None;
    }

    // =========================================================================
    // COMMANDS
    // =========================================================================

    /// Start from idle.
    pub fn start(&mut self) -> bool {
        self.poll();
        if self.state.phase != GamePhase::Idle {
            return false;
        }
        self.apply_pending_settings();
        let seed = self.resolve_seed();
        let now = self.now();
        self.dispatch(Command::Start { seed }, now)
    }

    /// Throw away the current run and begin a fresh one.
    pub fn restart(&mut self) -> bool {
        self.apply_pending_settings();
        let seed = self.resolve_seed();
        let now = self.now();
        self.dispatch(Command::Restart { seed }, now)
    }

    pub fn handle_char(&mut self, c: char) -> bool {
        self.poll();
        let now = self.now();
        self.dispatch(Command::Char(c), now)
    }

    pub fn handle_backspace(&mut self) -> bool {
        self.poll();
        let now = self.now();
        self.dispatch(Command::Backspace, now)
    }

    pub fn go_to_results(&mut self) -> bool {
        self.poll();
        let now = self.now();
        self.dispatch(Command::GoToResults, now)
    }

    /// Apply an action produced by the input adapter.
    pub fn apply_action(&mut self, action: InputAction) -> bool {
        match action {
            InputAction::Char(c) => self.handle_char(c),
            InputAction::Backspace => self.handle_backspace(),
            InputAction::Start => self.start(),
            InputAction::Restart => self.restart(),
            InputAction::Continue => self.go_to_results(),
            InputAction::Ignore => false,
        }
    }

    // =========================================================================
    // READS
    // =========================================================================

    pub fn snapshot(&self) -> GameSnapshot {
        snapshot(&self.state, self.clock.now_ms(), &self.config)
    }

    pub fn phase(&self) -> GamePhase {
        self.state.phase
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Settings of the current (or last) run.
    pub fn settings(&self) -> &GameSettings {
        &self.state.settings
    }

    /// Settings waiting for the next start or restart.
    pub fn pending_settings(&self) -> Option<&GameSettings> {
        self.pending_settings.as_ref()
    }

    /// Stage settings for the next start or restart. A run in progress keeps
    /// the settings it began with.
    pub fn set_settings(&mut self, settings: GameSettings) {
        self.pending_settings = Some(settings);
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn summary(&self) -> Option<&RunSummary> {
        self.state.summary.as_ref()
    }

    pub fn death(&self) -> Option<&DeathInfo> {
        self.state.death.as_ref()
    }

    pub fn keystroke_log(&self) -> &[KeystrokeLog] {
        &self.state.keystroke_log
    }

    /// Prompts handed out this run, in order.
    pub fn prompts(&self) -> &[String] {
        &self.state.prompts
    }

    /// Take queued events (consumes them).
    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        self.state.take_events()
    }
}

// =============================================================================
// TESTS
// =============================================================================
