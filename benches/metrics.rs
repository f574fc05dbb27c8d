use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use keyrush::core::rng::SeededRng;
use keyrush::metrics::{
    calculate_live_metrics, calculate_metrics, consistency, key_statistics, peak_wpm,
    KeystrokeEvent, DEFAULT_LIVE_WINDOW_MS,
};

/// Typed text with roughly one error in twenty keys, plus a backspace after
/// each error.
fn session(len: usize) -> (Vec<KeystrokeEvent>, String) {
    let mut rng = SeededRng::from_seed("bench");
    let expected: String = (0..len)
        .map(|i| if i % 6 == 5 { ' ' } else { (b'a' + (i % 26) as u8) as char })
        .collect();

    let mut events = Vec::with_capacity(len * 2);
    let mut t = 0;
    for c in expected.chars() {
        t += 80 + rng.next_int(120) as u64;
        if rng.chance(0.05) {
            events.push(KeystrokeEvent::keydown("x", t).expecting(c.to_string()));
            t += 60;
            events.push(KeystrokeEvent::keydown("Backspace", t));
            t += 60;
        }
        events.push(KeystrokeEvent::keydown(c.to_string(), t).expecting(c.to_string()));
        events.push(KeystrokeEvent::keyup(c.to_string(), t + 40));
    }
    (events, expected)
}

fn benchmark_session_metrics(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_metrics");

    for len in [50, 500, 5000] {
        let (events, expected) = session(len);
        let now = events.last().map(|e| e.timestamp).unwrap_or(0);

        group.bench_with_input(BenchmarkId::new("calculate", len), &len, |b, _| {
            b.iter(|| calculate_metrics(black_box(&events), black_box(&expected)))
        });
        group.bench_with_input(BenchmarkId::new("live", len), &len, |b, _| {
            b.iter(|| {
                calculate_live_metrics(
                    black_box(&events),
                    black_box(&expected),
                    DEFAULT_LIVE_WINDOW_MS,
                    now,
                )
            })
        });
        group.bench_with_input(BenchmarkId::new("peak", len), &len, |b, _| {
            b.iter(|| peak_wpm(black_box(&events), 10_000))
        });
        group.bench_with_input(BenchmarkId::new("key_stats", len), &len, |b, _| {
            b.iter(|| key_statistics(black_box(&events)))
        });
    }

    group.finish();
}

fn benchmark_consistency(c: &mut Criterion) {
    let mut group = c.benchmark_group("consistency");

    for len in [10, 1000] {
        let mut rng = SeededRng::from_seed("wpm");
        let samples: Vec<f64> = (0..len).map(|_| 40.0 + rng.next_f64() * 40.0).collect();
        group.bench_with_input(BenchmarkId::new("welford", len), &samples, |b, samples| {
            b.iter(|| consistency(black_box(samples)))
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_session_metrics, benchmark_consistency);
criterion_main!(benches);
