//! Arcade Transition Function
//!
//! `step` applies one [`Command`] to a [`GameState`] and reports the timer
//! work the shell must do. It never reads a clock and never sleeps: time comes
//! in through [`Now`], randomness through the state's seeded RNG.
//!
//! Every timer-originated command carries the epoch and round it was
//! scheduled for, and is ignored when the state has moved on.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::core::clock::Millis;
use crate::game::config::{compute_score, EngineConfig};
use crate::game::events::{EngineEvent, SoundCue};
use crate::game::prompt::PromptSource;
use crate::game::state::{
    DeathInfo, GamePhase, GameSnapshot, GameState, KeystrokeLog, RoundData, RunSummary, Typed,
    BACKSPACE_CHAR,
};
use crate::metrics::{consistency, round1, CHARS_PER_WORD, MS_PER_MINUTE};

/// Keystrokes that fill the combo meter.
pub const COMBO_METER_FULL: u32 = 30;

/// Floor on round elapsed time for the WPM sample.
pub const ROUND_ELAPSED_FLOOR_MS: u64 = 250;

/// Prompt used when a source hands back an empty string.
const FALLBACK_PROMPT: &str = "type";

// =============================================================================
// INPUTS AND OUTPUTS
// =============================================================================

/// Time of a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Now {
    /// Engine clock
    pub ms: Millis,
    /// Wall clock, for summary timestamps only
    pub wall: DateTime<Utc>,
}

impl Now {
    pub fn new(ms: Millis, wall: DateTime<Utc>) -> Self {
        Self { ms, wall }
    }
}

/// Something that can happen to a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Start from idle
    Start { seed: String },
    /// Start over from any phase
    Restart { seed: String },
    Char(char),
    Backspace,
    /// Dead -> results, or forced completion from playing
    GoToResults,
    CountdownTick { epoch: u64 },
    BeginRound { epoch: u64, round: u32 },
    RoundTimeout { epoch: u64, round: u32 },
}

/// Timer work requested by a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Cancel every pending timer
    CancelAll,
    CancelRoundDeadline,
    ScheduleCountdownTick { delay_ms: u64 },
    ScheduleRoundDeadline { round: u32, delay_ms: u64 },
    ScheduleNextRound { round: u32, delay_ms: u64 },
}

/// Result of a step.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StepOutcome {
    /// False when the command did not apply in the current phase
    pub accepted: bool,
    pub effects: Vec<Effect>,
}

impl StepOutcome {
    fn accepted() -> Self {
        Self {
            accepted: true,
            effects: Vec::new(),
        }
    }

    fn rejected() -> Self {
        Self::default()
    }
}

// =============================================================================
// STEP
// =============================================================================

/// Apply one command.
///
/// Rejected commands leave `state` untouched.
pub fn step(
    state: &mut GameState,
    command: Command,
    now: Now,
    config: &EngineConfig,
    prompts: &mut dyn PromptSource,
) -> StepOutcome {
    match command {
        Command::Start { seed } => {
            if state.phase != GamePhase::Idle {
                return StepOutcome::rejected();
            }
            begin_run(state, seed, now, config, prompts)
        }
        Command::Restart { seed } => begin_run(state, seed, now, config, prompts),
        Command::Char(c) => handle_char(state, c, now, config),
        Command::Backspace => handle_backspace(state, now),
        Command::GoToResults => go_to_results(state, now),
        Command::CountdownTick { epoch } => countdown_tick(state, epoch, now, config, prompts),
        Command::BeginRound { epoch, round } => {
            let expected_round = state.rounds_started + 1;
            if epoch != state.epoch
                || !state.phase.is_playing()
                || state.round.is_some()
                || round != expected_round
            {
                return StepOutcome::rejected();
            }
            let mut out = StepOutcome::accepted();
            begin_round(state, now, config, prompts, &mut out);
            out
        }
        Command::RoundTimeout { epoch, round } => {
            let live = state.round.as_ref().map(|r| r.round_number);
            if epoch != state.epoch || !state.phase.is_playing() || live != Some(round) {
                return StepOutcome::rejected();
            }
            let mut out = StepOutcome::accepted();
            die(state, Typed::TimedOut, now, &mut out);
            out
        }
    }
}

fn set_phase(state: &mut GameState, phase: GamePhase, at: Millis) {
    let old_phase = state.phase;
    state.phase = phase;
    if std::mem::discriminant(&old_phase) != std::mem::discriminant(&phase) {
        debug!(from = %old_phase, to = %phase, "phase change");
        state.push_event(EngineEvent::phase_changed(at, old_phase, phase));
    }
}

fn cue(state: &mut GameState, at: Millis, cue: SoundCue) {
    if !state.settings.muted {
        state.push_event(EngineEvent::cue(at, cue));
    }
}

/// WPM of a round sample.
pub fn round_wpm(correct_chars: u32, elapsed_ms: u64) -> f64 {
    let minutes = elapsed_ms.max(ROUND_ELAPSED_FLOOR_MS) as f64 / MS_PER_MINUTE;
    f64::from(correct_chars) / CHARS_PER_WORD / minutes
}

// =============================================================================
// RUN LIFECYCLE
// =============================================================================

fn begin_run(
    state: &mut GameState,
    seed: String,
    now: Now,
    config: &EngineConfig,
    prompts: &mut dyn PromptSource,
) -> StepOutcome {
    let start_level = state
        .settings
        .difficulty
        .preset()
        .start_level
        .min(config.level_cap());

    state.epoch += 1;
    state.reset_run(seed, start_level);
    debug!(seed = %state.seed, epoch = state.epoch, level = start_level, "run started");

    let mut out = StepOutcome::accepted();
    out.effects.push(Effect::CancelAll);

    if config.countdown_ticks == 0 {
        enter_playing(state, now, config, prompts, &mut out);
        return out;
    }

    let remaining = config.countdown_ticks;
    set_phase(state, GamePhase::Countdown { remaining }, now.ms);
    state.push_event(EngineEvent::countdown_tick(now.ms, remaining));
    cue(state, now.ms, SoundCue::CountdownTick);
    out.effects.push(Effect::ScheduleCountdownTick {
        delay_ms: config.countdown_interval_ms,
    });
    out
}

fn countdown_tick(
    state: &mut GameState,
    epoch: u64,
    now: Now,
    config: &EngineConfig,
    prompts: &mut dyn PromptSource,
) -> StepOutcome {
    let GamePhase::Countdown { remaining } = state.phase else {
        return StepOutcome::rejected();
    };
    if epoch != state.epoch || remaining == 0 {
        return StepOutcome::rejected();
    }

    let mut out = StepOutcome::accepted();
    let remaining = remaining - 1;
    state.phase = GamePhase::Countdown { remaining };
    state.push_event(EngineEvent::countdown_tick(now.ms, remaining));

    if remaining == 0 {
        cue(state, now.ms, SoundCue::Go);
        enter_playing(state, now, config, prompts, &mut out);
    } else {
        cue(state, now.ms, SoundCue::CountdownTick);
        out.effects.push(Effect::ScheduleCountdownTick {
            delay_ms: config.countdown_interval_ms,
        });
    }
    out
}

fn enter_playing(
    state: &mut GameState,
    now: Now,
    config: &EngineConfig,
    prompts: &mut dyn PromptSource,
    out: &mut StepOutcome,
) {
    set_phase(state, GamePhase::Playing, now.ms);
    state.run_started_at = Some(now.ms);
    begin_round(state, now, config, prompts, out);
}

fn begin_round(
    state: &mut GameState,
    now: Now,
    config: &EngineConfig,
    prompts: &mut dyn PromptSource,
    out: &mut StepOutcome,
) {
    state.rounds_started += 1;
    let round_number = state.rounds_started;
    let level = state.difficulty_level;

    let mut prompt = prompts.next_prompt(level, &mut state.rng);
    if prompt.is_empty() {
        prompt = FALLBACK_PROMPT.to_string();
    }

    debug!(round = round_number, level, prompt = %prompt, "round started");

    state.prompts.push(prompt.clone());
    state.round = Some(RoundData::new(round_number, prompt.clone(), level, now.ms));
    state.push_event(EngineEvent::round_started(now.ms, round_number, level, prompt));
    out.effects.push(Effect::ScheduleRoundDeadline {
        round: round_number,
        delay_ms: config.round_duration_ms,
    });
}

// =============================================================================
// INPUT
// =============================================================================

fn handle_char(state: &mut GameState, c: char, now: Now, config: &EngineConfig) -> StepOutcome {
    if !state.phase.is_playing() {
        return StepOutcome::rejected();
    }
    let Some(round) = state.round.as_ref() else {
        return StepOutcome::rejected();
    };
    let Some(expected) = round.expected() else {
        return StepOutcome::rejected();
    };

    let since = state.last_key_time.unwrap_or(round.start_time).max(round.start_time);
    let correct = c == expected;

    let entry = KeystrokeLog {
        timestamp: now.ms,
        expected,
        typed: c,
        correct,
        round: round.round_number,
        prompt_index: round.cursor_index,
        interval_ms: now.ms.saturating_sub(since),
        backspace: false,
    };

    #[cfg(feature = "debug-tracing")]
    tracing::trace!(
        round = entry.round,
        index = entry.prompt_index,
        expected = %expected,
        typed = %c,
        correct,
        "keystroke"
    );

    state.keystroke_log.push(entry);
    state.last_key_time = Some(now.ms);
    state.typed_chars += 1;

    let mut out = StepOutcome::accepted();

    if !correct {
        state.combo = 0;
        die(state, Typed::Char(c), now, &mut out);
        return out;
    }

    state.correct_chars += 1;
    state.combo += 1;

    let complete = match state.round.as_mut() {
        Some(round) => {
            round.cursor_index += 1;
            round.typed.push(c);
            round.correct_chars += 1;
            round.is_complete()
        }
        None => false,
    };

    if complete {
        complete_round(state, now, config, &mut out);
    }
    out
}

fn handle_backspace(state: &mut GameState, now: Now) -> StepOutcome {
    if !state.phase.is_playing() || !state.settings.backspace_enabled {
        return StepOutcome::rejected();
    }
    let Some(round) = state.round.as_mut() else {
        return StepOutcome::rejected();
    };
    if round.cursor_index == 0 {
        return StepOutcome::rejected();
    }

    round.cursor_index -= 1;
    let removed = round.typed.pop().unwrap_or(BACKSPACE_CHAR);
    round.correct_chars = round.correct_chars.saturating_sub(1);

    let since = state
        .last_key_time
        .unwrap_or(round.start_time)
        .max(round.start_time);

    // Backspace entries are never errors
    let entry = KeystrokeLog {
        timestamp: now.ms,
        expected: removed,
        typed: BACKSPACE_CHAR,
        correct: true,
        round: round.round_number,
        prompt_index: round.cursor_index,
        interval_ms: now.ms.saturating_sub(since),
        backspace: true,
    };

    state.keystroke_log.push(entry);
    state.last_key_time = Some(now.ms);
    state.combo = 0;

    StepOutcome::accepted()
}

// =============================================================================
// ROUND END
// =============================================================================

fn complete_round(state: &mut GameState, now: Now, config: &EngineConfig, out: &mut StepOutcome) {
    let Some(round) = state.round.take() else {
        return;
    };

    let wpm = round_wpm(round.correct_chars, now.ms.saturating_sub(round.start_time));
    state.round_wpms.push(wpm);
    state.streak += 1;

    let ramp_every = state.settings.difficulty.preset().ramp_every.max(1);
    if state.streak % ramp_every == 0 && state.difficulty_level < config.level_cap() {
        state.difficulty_level += 1;
        cue(state, now.ms, SoundCue::LevelUp);
    }

    debug!(
        round = round.round_number,
        wpm = round1(wpm),
        streak = state.streak,
        level = state.difficulty_level,
        "round cleared"
    );

    state.push_event(EngineEvent::round_cleared(
        now.ms,
        round.round_number,
        round1(wpm),
        state.streak,
        state.difficulty_level,
    ));
    cue(state, now.ms, SoundCue::RoundClear);

    out.effects.push(Effect::CancelRoundDeadline);
    out.effects.push(Effect::ScheduleNextRound {
        round: state.rounds_started + 1,
        delay_ms: config.round_pause_ms,
    });
}

fn die(state: &mut GameState, typed: Typed, now: Now, out: &mut StepOutcome) {
    let Some(round) = state.round.take() else {
        return;
    };

    if round.correct_chars > 0 {
        let wpm = round_wpm(round.correct_chars, now.ms.saturating_sub(round.start_time));
        state.round_wpms.push(wpm);
    }

    let death = DeathInfo {
        expected: round.expected().unwrap_or(' '),
        typed,
        prompt_index: round.cursor_index,
        word_index: round.word_index(),
        prompt: round.prompt.clone(),
        round: round.round_number,
    };

    info!(
        round = death.round,
        expected = %death.expected,
        typed = %death.typed,
        index = death.prompt_index,
        streak = state.streak,
        "player died"
    );

    set_phase(state, GamePhase::Dead, now.ms);
    state.death = Some(death.clone());
    state.push_event(EngineEvent::died(now.ms, death));
    cue(state, now.ms, SoundCue::Death);

    finish_run(state, now);
    out.effects.push(Effect::CancelAll);
}

fn go_to_results(state: &mut GameState, now: Now) -> StepOutcome {
    match state.phase {
        GamePhase::Dead => {
            set_phase(state, GamePhase::Results, now.ms);
            let mut out = StepOutcome::accepted();
            out.effects.push(Effect::CancelAll);
            out
        }
        GamePhase::Playing => {
            // Forced completion: the run closes without a death
            if let Some(round) = state.round.take() {
                if round.correct_chars > 0 {
                    let wpm =
                        round_wpm(round.correct_chars, now.ms.saturating_sub(round.start_time));
                    state.round_wpms.push(wpm);
                }
            }
            set_phase(state, GamePhase::Results, now.ms);
            finish_run(state, now);

            let mut out = StepOutcome::accepted();
            out.effects.push(Effect::CancelAll);
            out
        }
        _ => StepOutcome::rejected(),
    }
}

/// Build the run summary. Called exactly once per run.
fn finish_run(state: &mut GameState, now: Now) {
    let average_wpm = state.average_wpm();
    let score = compute_score(state.streak, average_wpm, state.difficulty_level);
    let duration_ms = state
        .run_started_at
        .map(|start| now.ms.saturating_sub(start))
        .unwrap_or(0);

    let summary = RunSummary {
        seed: state.seed.clone(),
        final_streak: state.streak,
        average_wpm: round1(average_wpm),
        accuracy: round1(state.accuracy()),
        difficulty_reached: state.difficulty_level,
        rounds_cleared: state.streak,
        score,
        correct_chars: state.correct_chars,
        typed_chars: state.typed_chars,
        death: state.death.clone(),
        timestamp: now.wall,
        duration_ms,
        round_wpms: state.round_wpms.iter().map(|w| round1(*w)).collect(),
        consistency: consistency(&state.round_wpms),
    };

    info!(
        seed = %summary.seed,
        streak = summary.final_streak,
        wpm = summary.average_wpm,
        score = summary.score,
        timeout = summary.is_timeout(),
        "run finished"
    );

    state.summary = Some(summary.clone());
    state.push_event(EngineEvent::run_finished(now.ms, summary));
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Project the state for the HUD at `now`.
pub fn snapshot(state: &GameState, now: Millis, config: &EngineConfig) -> GameSnapshot {
    let countdown = match state.phase {
        GamePhase::Countdown { remaining } => remaining,
        _ => 0,
    };

    let time_remaining_ms = match (&state.phase, &state.round) {
        (GamePhase::Playing, Some(round)) => config
            .round_duration_ms
            .saturating_sub(now.saturating_sub(round.start_time)),
        (GamePhase::Playing, None) => config.round_duration_ms,
        _ => 0,
    };

    let average_wpm = state.average_wpm();
    let score = match &state.summary {
        Some(summary) => summary.score,
        None => compute_score(state.streak, average_wpm, state.difficulty_level),
    };

    GameSnapshot {
        phase: state.phase,
        round: state.rounds_started,
        countdown,
        time_remaining_ms,
        streak: state.streak,
        wpm: round1(average_wpm),
        accuracy: round1(state.accuracy()),
        difficulty_level: state.difficulty_level,
        combo_meter: (f64::from(state.combo) / f64::from(COMBO_METER_FULL)).min(1.0),
        correct_chars: state.correct_chars,
        typed_chars: state.typed_chars,
        score,
        prompt: state.round.as_ref().map(|r| r.prompt.clone()),
        cursor_index: state.round.as_ref().map_or(0, |r| r.cursor_index),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::config::{Difficulty, GameSettings};
    use crate::game::events::EngineEventData;
    use crate::game::prompt::ScriptedPrompts;

    fn at(ms: Millis) -> Now {
        Now::new(ms, DateTime::<Utc>::UNIX_EPOCH)
    }

    fn no_countdown() -> EngineConfig {
        EngineConfig {
            countdown_ticks: 0,
            ..EngineConfig::default()
        }
    }

    fn playing(settings: GameSettings, prompts: &mut ScriptedPrompts) -> GameState {
        let mut state = GameState::new(settings);
        let out = step(
            &mut state,
            Command::Start { seed: "t".into() },
            at(0),
            &no_countdown(),
            prompts,
        );
        assert!(out.accepted);
        assert_eq!(state.phase, GamePhase::Playing);
        state
    }

    fn type_str(
        state: &mut GameState,
        text: &str,
        start: Millis,
        prompts: &mut ScriptedPrompts,
    ) -> Vec<StepOutcome> {
        text.chars()
            .enumerate()
            .map(|(i, c)| {
                step(
                    state,
                    Command::Char(c),
                    at(start + i as u64 * 100),
                    &no_countdown(),
                    prompts,
                )
            })
            .collect()
    }

    #[test]
    fn test_death_on_mismatch() {
        let mut prompts = ScriptedPrompts::new(["cat"]);
        let mut state = playing(GameSettings::default(), &mut prompts);

        let out = step(&mut state, Command::Char('x'), at(300), &no_countdown(), &mut prompts);
        assert!(out.accepted);
        assert_eq!(state.phase, GamePhase::Dead);
        assert!(out.effects.contains(&Effect::CancelAll));

        let death = state.death.clone().unwrap();
        assert_eq!(death.expected, 'c');
        assert_eq!(death.typed, Typed::Char('x'));
        assert_eq!(death.prompt_index, 0);
        assert_eq!(death.word_index, 0);
        assert_eq!(death.prompt, "cat");
        assert_eq!(death.round, 1);
        assert!(state.summary.is_some());
        assert!(state.round.is_none());
    }

    #[test]
    fn test_round_completion_ramps_difficulty() {
        let mut prompts = ScriptedPrompts::new(["go"]);
        let mut state = playing(GameSettings::default(), &mut prompts);
        assert_eq!(state.difficulty_level, 1);

        let outs = type_str(&mut state, "go", 500, &mut prompts);
        assert!(outs.iter().all(|o| o.accepted));

        assert_eq!(state.streak, 1);
        assert_eq!(state.difficulty_level, 2);
        assert!(state.round.is_none());
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(
            outs[1].effects,
            vec![
                Effect::CancelRoundDeadline,
                Effect::ScheduleNextRound { round: 2, delay_ms: 800 },
            ]
        );

        // 2 chars in 600ms
        assert_eq!(state.round_wpms.len(), 1);
        assert!((state.round_wpms[0] - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_easy_ramps_every_second_round() {
        let mut prompts = ScriptedPrompts::new(["a"]);
        let settings = GameSettings::default().with_difficulty(Difficulty::Easy);
        let mut state = playing(settings, &mut prompts);
        let config = no_countdown();

        step(&mut state, Command::Char('a'), at(100), &config, &mut prompts);
        assert_eq!(state.difficulty_level, 1);

        let epoch = state.epoch;
        step(&mut state, Command::BeginRound { epoch, round: 2 }, at(900), &config, &mut prompts);
        step(&mut state, Command::Char('a'), at(1_000), &config, &mut prompts);
        assert_eq!(state.streak, 2);
        assert_eq!(state.difficulty_level, 2);
    }

    #[test]
    fn test_difficulty_capped() {
        let mut prompts = ScriptedPrompts::new(["a"]);
        let settings = GameSettings::default().with_difficulty(Difficulty::Hard);
        let mut state = playing(settings, &mut prompts);
        let config = no_countdown();
        let epoch = state.epoch;

        let mut t = 100;
        for round in 2..=8 {
            step(&mut state, Command::Char('a'), at(t), &config, &mut prompts);
            t += 1_000;
            step(&mut state, Command::BeginRound { epoch, round }, at(t), &config, &mut prompts);
            t += 100;
        }
        assert_eq!(state.streak, 7);
        assert_eq!(state.difficulty_level, 6);
    }

    #[test]
    fn test_timeout_death() {
        let mut prompts = ScriptedPrompts::new(["cat"]);
        let mut state = playing(GameSettings::default(), &mut prompts);
        let config = no_countdown();
        let epoch = state.epoch;

        step(&mut state, Command::Char('c'), at(1_000), &config, &mut prompts);
        let out = step(
            &mut state,
            Command::RoundTimeout { epoch, round: 1 },
            at(15_000),
            &config,
            &mut prompts,
        );
        assert!(out.accepted);

        let death = state.death.clone().unwrap();
        assert_eq!(death.typed, Typed::TimedOut);
        assert_eq!(death.expected, 'a');
        assert_eq!(death.prompt_index, 1);
        // partial sample from the one correct char
        assert_eq!(state.round_wpms.len(), 1);
        assert!(state.summary.as_ref().unwrap().is_timeout());
    }

    #[test]
    fn test_stale_timers_ignored() {
        let mut prompts = ScriptedPrompts::new(["go"]);
        let mut state = playing(GameSettings::default(), &mut prompts);
        let config = no_countdown();
        let epoch = state.epoch;

        // wrong epoch
        let out = step(
            &mut state,
            Command::RoundTimeout { epoch: epoch + 7, round: 1 },
            at(15_000),
            &config,
            &mut prompts,
        );
        assert!(!out.accepted);
        assert_eq!(state.phase, GamePhase::Playing);

        // round already cleared
        type_str(&mut state, "go", 100, &mut prompts);
        let out = step(
            &mut state,
            Command::RoundTimeout { epoch, round: 1 },
            at(15_000),
            &config,
            &mut prompts,
        );
        assert!(!out.accepted);
        assert_eq!(state.phase, GamePhase::Playing);

        // next-round timer for the wrong round
        let out = step(
            &mut state,
            Command::BeginRound { epoch, round: 5 },
            at(15_000),
            &config,
            &mut prompts,
        );
        assert!(!out.accepted);
        assert!(state.round.is_none());
    }

    #[test]
    fn test_backspace_gating() {
        let mut prompts = ScriptedPrompts::new(["cat"]);
        let config = no_countdown();

        // disabled: never moves
        let mut state = playing(GameSettings::default(), &mut prompts);
        step(&mut state, Command::Char('c'), at(100), &config, &mut prompts);
        let out = step(&mut state, Command::Backspace, at(200), &config, &mut prompts);
        assert!(!out.accepted);
        assert_eq!(state.round.as_ref().unwrap().cursor_index, 1);

        // enabled at zero: floor
        let settings = GameSettings::default().with_backspace(true);
        let mut state = playing(settings, &mut prompts);
        let out = step(&mut state, Command::Backspace, at(100), &config, &mut prompts);
        assert!(!out.accepted);
        assert_eq!(state.round.as_ref().unwrap().cursor_index, 0);

        // enabled after a char: retreats
        step(&mut state, Command::Char('c'), at(200), &config, &mut prompts);
        let out = step(&mut state, Command::Backspace, at(300), &config, &mut prompts);
        assert!(out.accepted);
        let round = state.round.as_ref().unwrap();
        assert_eq!(round.cursor_index, 0);
        assert_eq!(round.typed, "");
        assert_eq!(state.combo, 0);
        assert!(state.keystroke_log.last().unwrap().backspace);
    }

    #[test]
    fn test_backspace_never_resurrects() {
        let mut prompts = ScriptedPrompts::new(["cat"]);
        let settings = GameSettings::default().with_backspace(true);
        let mut state = playing(settings, &mut prompts);
        let config = no_countdown();

        step(&mut state, Command::Char('c'), at(100), &config, &mut prompts);
        step(&mut state, Command::Char('x'), at(200), &config, &mut prompts);
        assert_eq!(state.phase, GamePhase::Dead);

        let out = step(&mut state, Command::Backspace, at(300), &config, &mut prompts);
        assert!(!out.accepted);
        assert_eq!(state.phase, GamePhase::Dead);
    }

    #[test]
    fn test_phase_violations_rejected() {
        let mut prompts = ScriptedPrompts::new(["cat"]);
        let config = EngineConfig::default();
        let mut state = GameState::new(GameSettings::default());

        for command in [Command::Char('c'), Command::Backspace, Command::GoToResults] {
            let out = step(&mut state, command, at(0), &config, &mut prompts);
            assert!(!out.accepted);
        }
        assert_eq!(state.phase, GamePhase::Idle);
        assert!(state.pending_events.is_empty());

        step(&mut state, Command::Start { seed: "x".into() }, at(0), &config, &mut prompts);
        let out = step(&mut state, Command::Start { seed: "y".into() }, at(10), &config, &mut prompts);
        assert!(!out.accepted);
        assert_eq!(state.seed, "x");

        // typing during the countdown does nothing
        let out = step(&mut state, Command::Char('c'), at(20), &config, &mut prompts);
        assert!(!out.accepted);
        assert!(state.keystroke_log.is_empty());
    }

    #[test]
    fn test_countdown_sequence() {
        let mut prompts = ScriptedPrompts::new(["go"]);
        let config = EngineConfig::default();
        let mut state = GameState::new(GameSettings::default());

        let out = step(&mut state, Command::Start { seed: "c".into() }, at(0), &config, &mut prompts);
        assert_eq!(state.phase, GamePhase::Countdown { remaining: 3 });
        assert_eq!(
            out.effects,
            vec![Effect::CancelAll, Effect::ScheduleCountdownTick { delay_ms: 900 }]
        );

        let epoch = state.epoch;
        for (i, expected) in [2, 1].into_iter().enumerate() {
            step(&mut state, Command::CountdownTick { epoch }, at(900 * (i as u64 + 1)), &config, &mut prompts);
            assert_eq!(state.phase, GamePhase::Countdown { remaining: expected });
        }

        let out = step(&mut state, Command::CountdownTick { epoch }, at(2_700), &config, &mut prompts);
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.round.as_ref().unwrap().start_time, 2_700);
        assert_eq!(
            out.effects,
            vec![Effect::ScheduleRoundDeadline { round: 1, delay_ms: 15_000 }]
        );

        let ticks: Vec<u32> = state
            .take_events()
            .into_iter()
            .filter_map(|e| match e.data {
                EngineEventData::CountdownTick { remaining } => Some(remaining),
                _ => None,
            })
            .collect();
        assert_eq!(ticks, vec![3, 2, 1, 0]);
    }

    #[test]
    fn test_muted_suppresses_cues() {
        let mut prompts = ScriptedPrompts::new(["go"]);
        let config = EngineConfig::default();

        let mut loud = GameState::new(GameSettings::default());
        step(&mut loud, Command::Start { seed: "m".into() }, at(0), &config, &mut prompts);
        assert!(loud
            .take_events()
            .iter()
            .any(|e| matches!(e.data, EngineEventData::Cue(_))));

        let mut quiet = GameState::new(GameSettings::default().muted(true));
        step(&mut quiet, Command::Start { seed: "m".into() }, at(0), &config, &mut prompts);
        let events = quiet.take_events();
        assert!(!events.is_empty());
        assert!(!events.iter().any(|e| matches!(e.data, EngineEventData::Cue(_))));
    }

    #[test]
    fn test_forced_completion() {
        let mut prompts = ScriptedPrompts::new(["go", "cat"]);
        let mut state = playing(GameSettings::default(), &mut prompts);
        let config = no_countdown();

        type_str(&mut state, "go", 100, &mut prompts);
        let out = step(&mut state, Command::GoToResults, at(400), &config, &mut prompts);
        assert!(out.accepted);
        assert_eq!(state.phase, GamePhase::Results);

        let summary = state.summary.clone().unwrap();
        assert!(summary.death.is_none());
        assert_eq!(summary.final_streak, 1);
        assert_eq!(summary.duration_ms, 400);

        // results is terminal
        let out = step(&mut state, Command::GoToResults, at(500), &config, &mut prompts);
        assert!(!out.accepted);
    }

    #[test]
    fn test_dead_to_results_keeps_summary() {
        let mut prompts = ScriptedPrompts::new(["cat"]);
        let mut state = playing(GameSettings::default(), &mut prompts);
        let config = no_countdown();

        step(&mut state, Command::Char('x'), at(100), &config, &mut prompts);
        let summary = state.summary.clone();
        step(&mut state, Command::GoToResults, at(5_000), &config, &mut prompts);
        assert_eq!(state.phase, GamePhase::Results);
        assert_eq!(state.summary, summary);
    }

    #[test]
    fn test_restart_from_any_phase() {
        let mut prompts = ScriptedPrompts::new(["cat"]);
        let mut state = playing(GameSettings::default(), &mut prompts);
        let config = no_countdown();
        let first_epoch = state.epoch;

        step(&mut state, Command::Char('x'), at(100), &config, &mut prompts);
        let out = step(&mut state, Command::Restart { seed: "again".into() }, at(200), &config, &mut prompts);
        assert!(out.accepted);
        assert_eq!(state.epoch, first_epoch + 1);
        assert_eq!(state.phase, GamePhase::Playing);
        assert!(state.death.is_none());
        assert!(state.summary.is_none());
        assert!(state.keystroke_log.is_empty());
        assert_eq!(state.rounds_started, 1);
    }

    #[test]
    fn test_snapshot() {
        let mut prompts = ScriptedPrompts::new(["go", "cat"]);
        let mut state = playing(GameSettings::default(), &mut prompts);
        let config = no_countdown();

        let snap = snapshot(&state, 1_000, &config);
        assert_eq!(snap.phase, GamePhase::Playing);
        assert_eq!(snap.time_remaining_ms, 14_000);
        assert_eq!(snap.accuracy, 100.0);
        assert_eq!(snap.prompt.as_deref(), Some("go"));

        type_str(&mut state, "go", 100, &mut prompts);
        let snap = snapshot(&state, 500, &config);
        assert_eq!(snap.streak, 1);
        assert_eq!(snap.combo_meter, 2.0 / 30.0);
        assert_eq!(snap.difficulty_level, 2);
        // 2 chars in 250ms floor -> 96 wpm, x1 streak, x1.25 level 2
        assert_eq!(snap.wpm, 96.0);
        assert_eq!(snap.score, 120);
        assert_eq!(snap.time_remaining_ms, 15_000);
    }

    #[test]
    fn test_interval_measured_from_round_start() {
        let mut prompts = ScriptedPrompts::new(["ab"]);
        let mut state = playing(GameSettings::default(), &mut prompts);
        let config = no_countdown();

        step(&mut state, Command::Char('a'), at(400), &config, &mut prompts);
        step(&mut state, Command::Char('b'), at(650), &config, &mut prompts);

        let intervals: Vec<u64> = state.keystroke_log.iter().map(|k| k.interval_ms).collect();
        assert_eq!(intervals, vec![400, 250]);
    }
}
