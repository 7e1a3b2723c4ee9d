use lean_signal::{
    ClockSettings, DEFAULT_SPEED_CEILING_MPS, SpeedUnit, TickClock, VelocityEstimator,
    WheelSettings, isr::PulseQueue,
};
use rand::prelude::*;
use rand_pcg::Pcg64;

/// One 250 ms window at the reference clock
const WINDOW_TICKS: u32 = 8192;

fn wheel(unit: SpeedUnit) -> VelocityEstimator {
    VelocityEstimator::new(
        WheelSettings {
            unit,
            ..Default::default()
        },
        ClockSettings::default(),
    )
    .unwrap()
}

#[test]
fn test_ten_pulses_in_one_window() {
    let mut estimator = wheel(SpeedUnit::MilesPerHour);
    for i in 0..10 {
        estimator.on_pulse(i * (WINDOW_TICKS / 10));
    }
    estimator.on_window_tick();

    assert!((estimator.cumulative_distance() - 2.721).abs() < 1e-6);
}

#[test]
fn test_distance_never_decreases() {
    let mut rng = Pcg64::seed_from_u64(1234);
    let mut estimator = wheel(SpeedUnit::KilometersPerHour);
    let mut tick = 0u32;
    let mut previous = 0.0;
    let ceiling = SpeedUnit::KilometersPerHour.from_meters_per_second(DEFAULT_SPEED_CEILING_MPS);

    for _ in 0..500 {
        for _ in 0..rng.random_range(0..12) {
            // Includes duplicate timestamps and absurdly short gaps
            tick = tick.wrapping_add(rng.random_range(0..3000));
            estimator.on_pulse(tick & 0xFF_FFFF);
        }
        if rng.random_bool(0.1) {
            estimator.on_untimed_pulses(rng.random_range(1..4));
        }
        estimator.on_window_tick();

        let distance = estimator.cumulative_distance();
        assert!(distance >= previous);
        previous = distance;

        let speed = estimator.current_speed();
        assert!(speed.is_finite() && speed >= 0.0 && speed < ceiling);
    }
}

#[test]
fn test_steady_speed_across_counter_wrap() {
    let mut estimator = wheel(SpeedUnit::MetersPerSecond);
    // 0.2721 m every 2048 ticks is 4.3536 m/s
    let mut tick: u32 = 0xFF_F000;
    for _ in 0..4 {
        for _ in 0..4 {
            estimator.on_pulse(tick);
            tick = (tick + 2048) & 0xFF_FFFF;
        }
        estimator.on_window_tick();
    }

    for speed in estimator.history() {
        assert!((speed - 4.3536).abs() < 1e-3, "history {:?}", estimator.history());
    }
    assert!(estimator.speed_delta().abs() < 1e-3);
}

#[test]
fn test_deceleration_gives_negative_delta() {
    let mut estimator = wheel(SpeedUnit::MilesPerHour);
    let mut tick = 0u32;
    // 8 m/s easing to 4 m/s
    for metres_per_second in [8.0f32, 8.0, 8.0, 6.0, 4.0] {
        let spacing = (0.2721 / metres_per_second * 32_768.0) as u32;
        for _ in 0..6 {
            tick += spacing;
            estimator.on_pulse(tick);
        }
        estimator.on_window_tick();
    }

    assert!(estimator.speed_delta() < -0.7, "delta {}", estimator.speed_delta());
}

#[test]
fn test_pulses_collected_from_interrupt_queue() {
    let queue: PulseQueue<8> = PulseQueue::new();
    let clock = TickClock::new(ClockSettings::default()).unwrap();
    let mut estimator = wheel(SpeedUnit::MetersPerSecond);

    for i in 0..12 {
        queue.record(i * 1024);
    }
    let drained = queue.drain();
    estimator.on_untimed_pulses(drained.missed);
    for tick in &drained.ticks {
        estimator.on_pulse(*tick);
    }
    let speed = estimator.on_window_tick();

    assert_eq!(drained.missed, 4);
    assert_eq!(drained.ticks.first(), Some(&(4 * 1024)));
    assert!((estimator.cumulative_distance() - 12.0 * 0.2721).abs() < 1e-5);
    let expected = 0.2721 / (clock.ticks_to_millis(1024) / 1000.0);
    assert!((speed - expected).abs() < 1e-3);
}

#[test]
fn test_city_speed_kept_in_every_unit() {
    // 32 km/h, a normal cruising speed
    let spacing = (0.2721 / (32.0 / 3.6) * 32_768.0) as u32;
    let mut estimator = wheel(SpeedUnit::KilometersPerHour);
    for i in 0..8 {
        estimator.on_pulse(i * spacing);
    }
    let speed = estimator.on_window_tick();
    assert!((speed - 32.0).abs() < 0.1, "speed {}", speed);
}

#[test]
fn test_restart_after_parking_past_counter_wrap() {
    let mut estimator = wheel(SpeedUnit::MilesPerHour);
    estimator.on_pulse(0);
    estimator.on_window_tick();

    // 512.25 s of 250 ms windows with the wheel standing still
    for _ in 0..2049 {
        estimator.on_window_tick();
    }

    // Rider moves off at 4 m/s; the first gap wraps the 24-bit counter
    let spacing = (0.2721 / 4.0 * 32_768.0) as u32;
    let mut tick = ((1u32 << 24) + 3277) & 0xFF_FFFF;
    for _ in 0..4 {
        estimator.on_pulse(tick);
        tick += spacing;
    }
    let speed = estimator.on_window_tick();

    assert!((speed - 4.0 * 2.236_936).abs() < 0.05, "speed {}", speed);
    assert!(estimator.speed_delta() > 0.0);
}

#[test]
fn test_rejects_bad_geometry() {
    let result = VelocityEstimator::new(
        WheelSettings {
            arc_length_per_pulse: -0.1,
            ..Default::default()
        },
        ClockSettings::default(),
    );
    assert!(result.is_err());
}
