//! Ride replay demonstration
//!
//! Replays the recorded ride in `testdata/ride_scenario.csv` through the full
//! decision core and prints what the rider would see: every state change, the
//! segment-display text and the LED strip, plus dashboard numbers once per
//! second.
//!
//! Run with: `cargo run --example ride_sim`

use lean_signal::{
    DisplaySink, EngineSettings, LedPattern, Override, Rgb, RiderState, SensorSample,
    SignalEngine, Telemetry, indicator_text,
};
use nalgebra::Vector3;
use serde::Deserialize;
use std::error::Error;

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

const WINDOW_MS: f64 = 250.0;
const STRIP_LEN: usize = 8;

/// Terminal stand-in for the dashboard and the rear LED strip
struct Console {
    pattern: LedPattern,
    strip: [Rgb; STRIP_LEN],
    time_ms: f64,
}

impl Console {
    fn render(&mut self) -> String {
        self.pattern.next_frame(&mut self.strip);
        self.strip
            .iter()
            .map(|pixel| match *pixel {
                Rgb::AMBER => '>',
                Rgb::RED => '#',
                Rgb::OFF => ' ',
                _ => '.',
            })
            .collect()
    }
}

impl DisplaySink for Console {
    fn on_state_changed(&mut self, state: RiderState) {
        self.pattern.set_state(state);
        println!(
            "{:>8.2} s  {:<5}  [{}]",
            self.time_ms / 1000.0,
            state.as_str(),
            indicator_text(state)
        );
    }

    fn on_telemetry(&mut self, telemetry: &Telemetry) {
        if self.time_ms % 1000.0 != 0.0 {
            return;
        }
        let strip = self.render();
        println!(
            "{:>8.2} s  {:6.1} m  {:5.1} mph  roll {:6.1}  |{}|",
            self.time_ms / 1000.0,
            telemetry.distance_m,
            telemetry.speed,
            telemetry.roll,
            strip
        );
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    println!("Ride replay - lean, brake and cruise");

    let mut reader = csv::Reader::from_path("testdata/ride_scenario.csv")?;
    let mut rows = Vec::new();
    for result in reader.deserialize() {
        let row: RideRow = result?;
        rows.push(row);
    }
    println!("Loaded {} rows", rows.len());

    let console = Console {
        pattern: LedPattern::new(),
        strip: [Rgb::OFF; STRIP_LEN],
        time_ms: 0.0,
    };
    let mut engine: SignalEngine<Console> = SignalEngine::new(EngineSettings::default(), console)?;

    for row in &rows {
        engine.sink_mut().time_ms = row.time_ms;
        match row.kind.as_str() {
            "pulse" => engine.on_pulse(row.tick),
            "imu" => {
                let Some(sample) = row.sample() else {
                    eprintln!("skipping incomplete row at {} ms", row.time_ms);
                    continue;
                };
                engine.on_sample(sample);

                if row.time_ms > 0.0 && row.time_ms % WINDOW_MS == 0.0 {
                    engine.on_window_tick();
                    engine.evaluate(row.tick, Override::NONE);
                }
            }
            other => eprintln!("unknown row kind {}", other),
        }
    }

    let telemetry = engine.telemetry();
    let angles = engine.angles();
    println!(
        "Finished in {}: {:.1} m ridden, heading {:.1} deg",
        engine.state().as_str(),
        telemetry.distance_m,
        angles.yaw
    );

    Ok(())
}
