//! Offline render throughput of whole venues
//!
//! Each iteration renders one second of audio at 48kHz, so the reported time
//! is the real-time cost of that many venues.
//!
//! Run with: cargo bench --bench venue_render

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use drift_core::config::EngineConfig;
use drift_core::Engine;

const SAMPLE_RATE: u32 = 48_000;

fn warmed_engine(genre: &str, venues: usize) -> Engine {
    let mut engine = Engine::offline(EngineConfig::seeded(7), SAMPLE_RATE);
    for i in 0..venues {
        engine.start_venue(&format!("venue-{i}"), genre, 80.0);
    }
    // Past every layer's first invocation, with reverb tails ringing
    if let Err(e) = engine.run_offline(5.0) {
        panic!("warm-up render failed: {e}");
    }
    engine
}

fn bench_single_venue(c: &mut Criterion) {
    let mut group = c.benchmark_group("one_second_one_venue");
    group.sample_size(10);

    for genre in ["meditation", "ambient", "jazz"] {
        let mut engine = warmed_engine(genre, 1);
        group.bench_with_input(BenchmarkId::from_parameter(genre), &genre, |b, _| {
            b.iter(|| black_box(engine.run_offline(1.0).map(|out| out.len())))
        });
    }

    group.finish();
}

fn bench_many_venues(c: &mut Criterion) {
    let mut group = c.benchmark_group("one_second_many_venues");
    group.sample_size(10);

    for venues in [2usize, 4, 8] {
        let mut engine = warmed_engine("ambient", venues);
        group.bench_with_input(BenchmarkId::from_parameter(venues), &venues, |b, _| {
            b.iter(|| black_box(engine.run_offline(1.0).map(|out| out.len())))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_single_venue, bench_many_venues);
criterion_main!(benches);
