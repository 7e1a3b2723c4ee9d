use lean_signal::{
    DisplaySink, EngineSettings, Override, RiderState, SensorSample, SensorSource, SignalEngine,
    Telemetry, command::button_override, isr::SharedInputs,
};
use nalgebra::Vector3;
use serde::Deserialize;
use std::error::Error;

/// One row of the recorded ride: an IMU sample or a wheel pulse
#[derive(Debug, Deserialize)]
struct RideRow {
    #[serde(rename = "Kind")]
    kind: String,
    #[serde(rename = "Time (ms)")]
    time_ms: f64,
    #[serde(rename = "Tick")]
    tick: u32,
    #[serde(rename = "Accelerometer X (g)")]
    accel_x: Option<f32>,
    #[serde(rename = "Accelerometer Y (g)")]
    accel_y: Option<f32>,
    #[serde(rename = "Accelerometer Z (g)")]
    accel_z: Option<f32>,
    #[serde(rename = "Gyroscope X (deg/s)")]
    gyro_x: Option<f32>,
    #[serde(rename = "Gyroscope Y (deg/s)")]
    gyro_y: Option<f32>,
    #[serde(rename = "Gyroscope Z (deg/s)")]
    gyro_z: Option<f32>,
    #[serde(rename = "Magnetometer X")]
    mag_x: Option<f32>,
    #[serde(rename = "Magnetometer Y")]
    mag_y: Option<f32>,
    #[serde(rename = "Magnetometer Z")]
    mag_z: Option<f32>,
}

impl RideRow {
    fn sample(&self) -> Option<SensorSample> {
        Some(SensorSample::new(
            Vector3::new(self.accel_x?, self.accel_y?, self.accel_z?),
            Vector3::new(self.gyro_x?, self.gyro_y?, self.gyro_z?),
            Vector3::new(self.mag_x?, self.mag_y?, self.mag_z?),
            self.tick,
        ))
    }
}

#[derive(Default)]
struct RideLog {
    changes: Vec<RiderState>,
    telemetry: Vec<Telemetry>,
}

impl DisplaySink for RideLog {
    fn on_state_changed(&mut self, state: RiderState) {
        self.changes.push(state);
    }

    fn on_telemetry(&mut self, telemetry: &Telemetry) {
        self.telemetry.push(*telemetry);
    }
}

const WINDOW_MS: f64 = 250.0;

fn load_ride() -> Result<Vec<RideRow>, Box<dyn Error>> {
    let mut reader = csv::Reader::from_path("testdata/ride_scenario.csv")?;
    let mut rows = Vec::new();
    for result in reader.deserialize() {
        let row: RideRow = result?;
        rows.push(row);
    }
    Ok(rows)
}

/// Replays the ride and returns the state after every 250 ms evaluation
fn replay(
    rows: &[RideRow],
    engine: &mut SignalEngine<RideLog>,
) -> Vec<(f64, RiderState)> {
    let mut timeline = Vec::new();
    for row in rows {
        match row.kind.as_str() {
            "pulse" => engine.on_pulse(row.tick),
            "imu" => {
                let sample = row.sample().expect("imu row carries all nine axes");
                engine.on_sample(sample);

                if row.time_ms > 0.0 && row.time_ms % WINDOW_MS == 0.0 {
                    engine.on_window_tick();
                    let state = engine.evaluate(row.tick, Override::NONE);
                    timeline.push((row.time_ms, state));
                }
            }
            other => panic!("unknown row kind {}", other),
        }
    }
    timeline
}

fn state_at(timeline: &[(f64, RiderState)], time_ms: f64) -> RiderState {
    timeline
        .iter()
        .rev()
        .find(|(t, _)| *t <= time_ms)
        .map(|(_, state)| *state)
        .unwrap_or_default()
}

/// Straight, 25 degree left lean, straight, hard braking, slow cruise
#[test]
fn test_recorded_ride_scenario() -> Result<(), Box<dyn Error>> {
    let rows = load_ride()?;
    assert!(rows.len() > 2000);

    let mut engine: SignalEngine<RideLog> =
        SignalEngine::new(EngineSettings::default(), RideLog::default())?;
    let timeline = replay(&rows, &mut engine);

    assert_eq!(state_at(&timeline, 4_000.0), RiderState::Idle);
    assert_eq!(state_at(&timeline, 9_000.0), RiderState::Left);
    assert_eq!(state_at(&timeline, 14_500.0), RiderState::Idle);
    assert_eq!(state_at(&timeline, 16_500.0), RiderState::Brake);
    assert_eq!(state_at(&timeline, 22_000.0), RiderState::Idle);

    assert!(timeline.iter().all(|(_, state)| *state != RiderState::Right));
    assert_eq!(
        engine.sink().changes,
        [
            RiderState::Left,
            RiderState::Idle,
            RiderState::Brake,
            RiderState::Idle
        ]
    );
    Ok(())
}

#[test]
fn test_recorded_ride_telemetry() -> Result<(), Box<dyn Error>> {
    let rows = load_ride()?;
    let mut engine: SignalEngine<RideLog> =
        SignalEngine::new(EngineSettings::default(), RideLog::default())?;
    replay(&rows, &mut engine);

    let telemetry = engine.sink().telemetry.clone();
    assert_eq!(telemetry.len(), 96);

    // Odometer never runs backwards
    for pair in telemetry.windows(2) {
        assert!(pair[1].distance_m >= pair[0].distance_m);
    }

    // 160 m ridden in total
    let distance = engine.telemetry().distance_m;
    assert!((distance - 160.0).abs() < 1.0, "distance {}", distance);

    // Slow cruise at 4 m/s at the end
    let speed = engine.telemetry().speed;
    assert!((speed - 4.0 * 2.236_936).abs() < 0.2, "speed {}", speed);

    // Heading stays north through the lean
    let yaw = engine.angles().yaw;
    assert!(yaw.min(360.0 - yaw) < 5.0, "yaw {}", yaw);
    Ok(())
}

struct ScriptedSensor {
    samples: std::vec::IntoIter<Result<SensorSample, &'static str>>,
}

impl SensorSource for ScriptedSensor {
    type Error = &'static str;

    fn read_sample(&mut self) -> Result<SensorSample, Self::Error> {
        self.samples.next().unwrap_or(Err("no more samples"))
    }
}

#[test]
fn test_main_loop_with_interrupt_inputs() -> Result<(), Box<dyn Error>> {
    static SHARED: SharedInputs = SharedInputs::new();

    let level = |tick| {
        SensorSample::new(
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::zeros(),
            Vector3::new(0.5, 0.0, -0.8),
            tick,
        )
    };
    let mut sensor = ScriptedSensor {
        samples: vec![Ok(level(0)), Err("bus error"), Ok(level(656))].into_iter(),
    };
    let mut engine: SignalEngine<RideLog, 8> =
        SignalEngine::new(EngineSettings::default(), RideLog::default())?;

    SHARED.data_ready.set();
    SHARED.pulses.record(100);
    SHARED.pulses.record(1100);
    assert!(engine.service(&SHARED, &mut sensor));

    // Read fails: previous values kept, loop carries on
    SHARED.data_ready.set();
    assert!(!engine.service(&SHARED, &mut sensor));

    SHARED.data_ready.set();
    assert!(engine.service(&SHARED, &mut sensor));
    assert!(engine.angles().roll.abs() < 1e-3);

    // No interrupt, nothing read
    assert!(!engine.service(&SHARED, &mut sensor));

    engine.on_window_tick();
    assert!((engine.telemetry().distance_m - 2.0 * 0.2721).abs() < 1e-6);

    // Handlebar brake button
    let state = engine.evaluate(2000, button_override(3));
    assert_eq!(state, RiderState::Brake);
    Ok(())
}
