use criterion::{Criterion, black_box, criterion_group, criterion_main};
use lean_signal::{
    AttitudeFilter, EngineSettings, FsmInputs, NullSink, Override, SensorSample, SignalEngine,
    SlidingSmoother, TurnSignalFsm, VelocityEstimator, extract,
};
use nalgebra::Vector3;
use rand::prelude::*;
use rand_pcg::Pcg64;
use std::f32::consts::PI;

/// Ticks between samples at 100 Hz on the 32.768 kHz clock
const SAMPLE_TICKS: u32 = 328;

// Pre-generated ride so the RNG stays out of the measured loop
struct PreGeneratedRide {
    samples: Vec<SensorSample>,
    index: usize,
}

impl PreGeneratedRide {
    fn new(count: usize, seed: u64) -> Self {
        let mut rng = Pcg64::seed_from_u64(seed);
        let mut samples = Vec::with_capacity(count);

        for i in 0..count {
            let time = i as f32 * 0.01;
            // Slow weave, one lean every four seconds
            let lean = 0.35 * (time * 0.25 * 2.0 * PI).sin();

            let accelerometer = Vector3::new(
                rng.random_range(-0.02..0.02),
                lean.sin() + rng.random_range(-0.02..0.02),
                lean.cos() + rng.random_range(-0.02..0.02),
            );
            let gyroscope = Vector3::new(
                20.0 * (time * 0.25 * 2.0 * PI).cos() + rng.random_range(-0.5..0.5),
                rng.random_range(-0.5..0.5),
                rng.random_range(-0.5..0.5),
            );
            let magnetometer = Vector3::new(
                0.5 + rng.random_range(-0.02..0.02),
                -0.8 * lean.sin() + rng.random_range(-0.02..0.02),
                -0.8 * lean.cos() + rng.random_range(-0.02..0.02),
            );

            samples.push(SensorSample::new(
                accelerometer,
                gyroscope,
                magnetometer,
                (i as u32 * SAMPLE_TICKS) & 0xFF_FFFF,
            ));
        }

        Self { samples, index: 0 }
    }

    fn next(&mut self) -> SensorSample {
        let sample = self.samples[self.index];
        self.index = (self.index + 1) % self.samples.len();
        sample
    }
}

/// One fusion step at 100 Hz
fn bench_attitude_update(c: &mut Criterion) {
    let mut filter = AttitudeFilter::new();
    let mut ride = PreGeneratedRide::new(1000, 42);

    c.bench_function("attitude_update", |b| {
        b.iter(|| filter.update(black_box(&ride.next()), black_box(10.0)))
    });
}

/// Angle and linear acceleration extraction
fn bench_extract(c: &mut Criterion) {
    let mut filter = AttitudeFilter::new();
    let mut ride = PreGeneratedRide::new(1000, 7);
    for _ in 0..500 {
        filter.update(&ride.next(), 10.0);
    }
    let quaternion = filter.quaternion();
    let sample = ride.next();

    c.bench_function("extract_angles", |b| {
        b.iter(|| extract(black_box(&quaternion), black_box(&sample), black_box(0.0)))
    });
}

/// Push into the full-size roll window
fn bench_smoother_push(c: &mut Criterion) {
    let mut smoother = SlidingSmoother::<300>::new().unwrap();
    let mut rng = Pcg64::seed_from_u64(3);
    let values: Vec<f32> = (0..1024).map(|_| rng.random_range(-30.0..30.0)).collect();
    let mut index = 0;

    c.bench_function("smoother_push_300", |b| {
        b.iter(|| {
            index = (index + 1) % values.len();
            smoother.push(black_box(values[index]))
        })
    });
}

/// One 250 ms speed window with ten pulses
fn bench_velocity_window(c: &mut Criterion) {
    let mut estimator =
        VelocityEstimator::new(Default::default(), Default::default()).unwrap();
    let mut tick = 0u32;

    c.bench_function("velocity_window_10_pulses", |b| {
        b.iter(|| {
            for _ in 0..10 {
                tick = (tick + 819) & 0xFF_FFFF;
                estimator.on_pulse(black_box(tick));
            }
            estimator.on_window_tick()
        })
    });
}

/// State machine evaluation over a lean and brake cycle
fn bench_fsm_evaluate(c: &mut Criterion) {
    let mut fsm = TurnSignalFsm::new();
    let script = [(0.0, 0.0), (18.0, 0.0), (5.0, 0.0), (0.0, -1.0), (-20.0, 0.0)];
    let mut now_ms = 0u64;
    let mut index = 0;

    c.bench_function("fsm_evaluate", |b| {
        b.iter(|| {
            now_ms += 250;
            index = (index + 1) % script.len();
            let (roll, speed_delta) = script[index];
            fsm.evaluate(
                black_box(FsmInputs {
                    smoothed_roll: roll,
                    speed_delta,
                    override_request: Override::NONE,
                    now_ms,
                }),
                &mut NullSink,
            )
        })
    });
}

/// Full per-sample path: alignment, fusion, extraction and both smoothers
fn bench_engine_sample(c: &mut Criterion) {
    let mut engine: SignalEngine<NullSink> =
        SignalEngine::new(EngineSettings::default(), NullSink).unwrap();
    let mut ride = PreGeneratedRide::new(1000, 11);

    c.bench_function("engine_on_sample", |b| {
        b.iter(|| engine.on_sample(black_box(ride.next())))
    });
}

/// One second of riding: 100 samples, four windows and evaluations
fn bench_engine_one_second(c: &mut Criterion) {
    let mut engine: SignalEngine<NullSink> =
        SignalEngine::new(EngineSettings::default(), NullSink).unwrap();
    let mut ride = PreGeneratedRide::new(1000, 19);

    c.bench_function("engine_one_second", |b| {
        b.iter(|| {
            for i in 0..100 {
                let sample = ride.next();
                let tick = sample.timestamp;
                engine.on_sample(sample);
                if i % 10 == 0 {
                    engine.on_pulse(tick);
                }
                if i % 25 == 24 {
                    engine.on_window_tick();
                    engine.evaluate(tick, Override::NONE);
                }
            }
        })
    });
}

criterion_group!(
    benches,
    bench_attitude_update,
    bench_extract,
    bench_smoother_push,
    bench_velocity_window,
    bench_fsm_evaluate,
    bench_engine_sample,
    bench_engine_one_second
);

criterion_main!(benches);
