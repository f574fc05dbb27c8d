//! KeyRush Demo
//!
//! Plays a scripted headless arcade run with a fixed seed, then exports the
//! run and verifies it by replay.

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use keyrush::{
    audit::{verify_run, AnalyticsRun},
    core::clock::{Clock, ManualClock},
    game::{
        events::EngineEventData, ArcadeEngine, EngineConfig, GamePhase, GameSettings,
        PromptGenerator,
    },
    metrics::{
        calculate_metrics_with, key_statistics, peak_wpm_with, trouble_keys_with, KeystrokeEvent,
        MetricsConfig,
    },
    VERSION,
};

const DEMO_SEED: &str = "keyrush-demo";
const DEMO_ROUNDS: usize = 5;

type DemoEngine = ArcadeEngine<ManualClock, PromptGenerator>;

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    info!("KeyRush Engine v{}", VERSION);

    let config = EngineConfig::default();
    info!(
        "Round: {} ms, pause: {} ms, countdown: {} x {} ms",
        config.round_duration_ms,
        config.round_pause_ms,
        config.countdown_ticks,
        config.countdown_interval_ms
    );

    let run = demo_run(config)?;
    verify_export(&run)
}

/// Deterministic key interval for the i-th keystroke.
fn key_interval(i: usize) -> u64 {
    90 + (i as u64 * 37) % 80
}

fn log_events(engine: &mut DemoEngine) {
    for event in engine.take_events() {
        match &event.data {
            EngineEventData::RoundStarted { round, difficulty_level, prompt } => {
                info!("Round {} (level {}): {:?}", round, difficulty_level, prompt);
            }
            EngineEventData::RoundCleared { round, wpm, streak, .. } => {
                info!("Round {} cleared at {:.1} wpm, streak {}", round, wpm, streak);
            }
            EngineEventData::Died(death) => {
                info!(
                    "Died in round {}: expected {:?}, typed {}",
                    death.round, death.expected, death.typed
                );
            }
            EngineEventData::RunFinished(summary) => {
                info!("Run finished: score {}", summary.score);
            }
            _ => {}
        }
    }
}

fn demo_run(config: EngineConfig) -> Result<AnalyticsRun> {
    info!("=== Starting Demo Run ===");

    let clock = ManualClock::new();
    let settings = GameSettings::default().with_seed(DEMO_SEED);
    let mut engine = ArcadeEngine::new(settings, config.clone(), clock.clone());

    engine.start();
    clock.advance(config.countdown_ticks as u64 * config.countdown_interval_ms);
    engine.poll();
    log_events(&mut engine);

    if engine.phase() != GamePhase::Playing {
        bail!("engine did not reach play: {}", engine.phase());
    }

    let mut keys = 0;
    let mut events = Vec::new();
    for round in 0..DEMO_ROUNDS {
        let prompt = engine.snapshot().prompt.unwrap_or_default();
        for c in prompt.chars() {
            clock.advance(key_interval(keys));
            keys += 1;
            if round == 0 {
                events.push(
                    KeystrokeEvent::keydown(c.to_string(), clock_now(&engine))
                        .expecting(c.to_string()),
                );
            }
            engine.handle_char(c);
        }
        log_events(&mut engine);

        clock.advance(config.round_pause_ms);
        engine.poll();
        log_events(&mut engine);
    }

    // first round through the metrics engine
    let first_prompt = engine.prompts().first().cloned().unwrap_or_default();
    let metrics_config = MetricsConfig {
        peak_window_ms: 2_000,
        ..MetricsConfig::default()
    };
    let metrics = calculate_metrics_with(&events, &first_prompt, &metrics_config);
    info!(
        "Round 1 metrics: {:.1} gross / {:.1} net wpm, {:.1}% accuracy, peak {:.1}",
        metrics.gross_wpm,
        metrics.net_wpm,
        metrics.accuracy,
        peak_wpm_with(&events, &metrics_config)
    );
    let stats = key_statistics(&events);
    info!(
        "{} distinct keys, {} trouble keys",
        stats.len(),
        trouble_keys_with(&stats, &metrics_config).len()
    );

    // one wrong key ends the run
    let expected = engine.state().round.as_ref().and_then(|r| r.expected());
    let wrong = if expected == Some('q') { 'z' } else { 'q' };
    clock.advance(120);
    engine.handle_char(wrong);
    log_events(&mut engine);

    let summary = engine.summary().context("run did not finish")?;
    info!("=== Run Summary ===");
    info!("Seed: {}", summary.seed);
    info!("Streak: {}", summary.final_streak);
    info!("Average WPM: {:.1}", summary.average_wpm);
    info!("Accuracy: {:.1}%", summary.accuracy);
    info!("Consistency: {:.1}%", summary.consistency);
    info!("Difficulty reached: {}", summary.difficulty_reached);
    info!("Score: {}", summary.score);
    info!("Summary fingerprint: {}", hex::encode(summary.fingerprint()));

    AnalyticsRun::from_engine(&engine).context("failed to package run")
}

fn clock_now(engine: &DemoEngine) -> u64 {
    engine.clock().now_ms()
}

fn verify_export(run: &AnalyticsRun) -> Result<()> {
    info!("=== Verifying Export ===");

    let json = run.to_json()?;
    let bytes = run.to_bytes()?;
    info!("Run {}: {} bytes JSON, {} bytes bincode", run.run_id, json.len(), bytes.len());

    let decoded = AnalyticsRun::from_bytes(&bytes)?;
    let result = verify_run(&decoded);

    if result.valid {
        info!("REPLAY VERIFIED: fingerprint {}", &run.fingerprint[..16]);
        Ok(())
    } else {
        warn!("REPLAY FAILED: {:?}", result.error);
        bail!("replay verification failed")
    }
}
