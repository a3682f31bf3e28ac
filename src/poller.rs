/*
 * This file is part of mlxtemp.
 *
 * Copyright (C) 2025 mlxtemp contributors
 *
 * mlxtemp is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * mlxtemp is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with mlxtemp. If not, see <https://www.gnu.org/licenses/>.
 */

//! Fixed-interval polling loop.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde_json::json;

use crate::config::PollConfig;
use crate::logger;
use crate::source::{Channel, TemperatureReading, TemperatureSource};

const SLEEP_SLICE: Duration = Duration::from_millis(50);
pub const SEPARATOR: &str = "---";

/// Shared flag that ends [`Poller::run`] at the next check.
#[derive(Debug, Clone, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct Poller {
    config: PollConfig,
    stop: StopToken,
}

impl Poller {
    pub fn new(config: PollConfig) -> Self {
        Self::with_stop_token(config, StopToken::new())
    }

    pub fn with_stop_token(config: PollConfig, stop: StopToken) -> Self {
        Self { config, stop }
    }

    pub fn stop_token(&self) -> StopToken {
        self.stop.clone()
    }

    /// Read object then ambient. A failure on one channel never skips the other.
    pub fn poll_once<S: TemperatureSource + ?Sized>(&self, source: &S) -> [TemperatureReading; 2] {
        [
            TemperatureReading::take(source, Channel::Object),
            TemperatureReading::take(source, Channel::Ambient),
        ]
    }

    /// Poll until the stop token is set. Returns the number of completed iterations.
    pub fn run<S, W>(&self, source: &S, out: &mut W) -> io::Result<u64>
    where
        S: TemperatureSource + ?Sized,
        W: Write,
    {
        let mut iterations = 0u64;
        let mut last_state: [Option<ChannelState>; 2] = [None, None];
        while !self.stop.is_stopped() {
            let readings = self.poll_once(source);
            for (reading, last) in readings.iter().zip(last_state.iter_mut()) {
                log_transition(reading, last);
                writeln!(out, "{}", format_reading(reading, self.config.precision))?;
            }
            writeln!(out, "{}", SEPARATOR)?;
            out.flush()?;
            iterations += 1;

            self.sleep_interval();
        }
        Ok(iterations)
    }

    fn sleep_interval(&self) {
        let deadline = Instant::now() + self.config.interval;
        loop {
            if self.stop.is_stopped() {
                return;
            }
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChannelState {
    Ok,
    OutOfRange,
    Error,
}

impl ChannelState {
    fn of(reading: &TemperatureReading) -> Self {
        match &reading.outcome {
            Err(_) => ChannelState::Error,
            Ok(_) if !reading.is_plausible() => ChannelState::OutOfRange,
            Ok(_) => ChannelState::Ok,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            ChannelState::Ok => "ok",
            ChannelState::OutOfRange => "out_of_range",
            ChannelState::Error => "error",
        }
    }
}

// Only state changes are logged, never the values themselves. A channel that
// starts out healthy produces no event.
fn log_transition(reading: &TemperatureReading, last: &mut Option<ChannelState>) {
    let state = ChannelState::of(reading);
    let changed = match *last {
        Some(prev) => prev != state,
        None => state != ChannelState::Ok,
    };
    *last = Some(state);
    if !changed {
        return;
    }
    let mut data = json!({ "channel": reading.channel, "state": state.as_str() });
    if let Some(e) = reading.error() {
        data["error"] = json!(e.to_string());
    }
    logger::log_event("channel_state", data);
}

/// One console line, e.g. `Object:  21.50°C` or `Ambient: Error reading sensor (...)`.
pub fn format_reading(reading: &TemperatureReading, precision: usize) -> String {
    let label = format!("{}:", reading.channel);
    match &reading.outcome {
        Ok(c) => {
            let suffix = if reading.is_plausible() { "" } else { " (out of range)" };
            format!("{:<8} {:.prec$}°C{}", label, c, suffix, prec = precision)
        }
        Err(e) => format!("{:<8} Error reading sensor ({})", label, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SensorError;
    use crate::source::MockTemperatureSource;
    use serial_test::serial;
    use serde_json::Value;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::atomic::AtomicUsize;
    use tempfile::TempDir;

    fn fast_config(precision: usize) -> PollConfig {
        PollConfig { interval: Duration::ZERO, precision }
    }

    fn reading(channel: Channel, outcome: crate::error::Result<f64>) -> TemperatureReading {
        TemperatureReading { channel, outcome }
    }

    #[test]
    fn test_format_reading() {
        assert_eq!(format_reading(&reading(Channel::Object, Ok(21.457)), 2), "Object:  21.46°C");
        assert_eq!(format_reading(&reading(Channel::Ambient, Ok(21.46)), 1), "Ambient: 21.5°C");
        assert_eq!(
            format_reading(&reading(Channel::Ambient, Ok(-300.0)), 1),
            "Ambient: -300.0°C (out of range)"
        );

        let err = reading(Channel::Object, Err(SensorError::AttributeMissing(PathBuf::from("/x/in_temp_scale"))));
        assert_eq!(format_reading(&err, 2), "Object:  Error reading sensor (Cannot read /x/in_temp_scale)");
    }

    #[test]
    fn test_poll_once_isolates_channel_failures() {
        let mut source = MockTemperatureSource::new();
        source
            .expect_read_object()
            .times(1)
            .returning(|| Err(SensorError::AttributeMissing(PathBuf::from("in_temp_object_raw"))));
        source.expect_read_ambient().times(1).returning(|| Ok(22.0));

        let poller = Poller::new(fast_config(2));
        let [object, ambient] = poller.poll_once(&source);
        assert_eq!(object.channel, Channel::Object);
        assert!(!object.is_ok());
        assert_eq!(ambient.channel, Channel::Ambient);
        assert_eq!(ambient.celsius(), Some(22.0));
    }

    #[test]
    #[serial]
    fn test_run_stops_on_token() {
        let poller = Poller::new(fast_config(1));
        let token = poller.stop_token();
        let calls = Arc::new(AtomicUsize::new(0));

        let mut source = MockTemperatureSource::new();
        source.expect_read_object().returning(|| Ok(30.0));
        let counter = calls.clone();
        source.expect_read_ambient().returning(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 2 {
                token.stop();
            }
            Ok(20.0)
        });

        let mut out = Vec::new();
        let iterations = poller.run(&source, &mut out).unwrap();
        assert_eq!(iterations, 3);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 9);
        assert_eq!(&lines[..3], &["Object:  30.0°C", "Ambient: 20.0°C", "---"]);
    }

    #[test]
    #[serial]
    fn test_run_with_stopped_token_does_nothing() {
        let token = StopToken::new();
        token.stop();
        let poller = Poller::with_stop_token(fast_config(2), token);

        let source = MockTemperatureSource::new();
        let mut out = Vec::new();
        assert_eq!(poller.run(&source, &mut out).unwrap(), 0);
        assert!(out.is_empty());
    }

    #[test]
    #[serial]
    fn test_sleep_interrupted_by_stop() {
        let poller = Poller::new(PollConfig { interval: Duration::from_secs(30), precision: 2 });
        let token = poller.stop_token();

        let mut source = MockTemperatureSource::new();
        source.expect_read_object().returning(|| Ok(30.0));
        source.expect_read_ambient().returning(|| Ok(20.0));

        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            token.stop();
        });
        let started = Instant::now();
        let mut out = Vec::new();
        assert_eq!(poller.run(&source, &mut out).unwrap(), 1);
        assert!(started.elapsed() < Duration::from_secs(10));
        stopper.join().unwrap();
    }

    fn logged_events(path: &std::path::Path) -> Vec<Value> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str::<Value>(l).unwrap())
            .filter(|v| v["event"] == "channel_state")
            .collect()
    }

    /// Mock source whose object reads follow `object` (true = ok) and stop after the last one.
    fn scripted_source(poller: &Poller, object: Vec<bool>, ambient: f64) -> MockTemperatureSource {
        let token = poller.stop_token();
        let total = object.len();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut source = MockTemperatureSource::new();
        source.expect_read_object().returning(move || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n + 1 >= total {
                token.stop();
            }
            if object[n] {
                Ok(25.0)
            } else {
                Err(SensorError::AttributeMissing(PathBuf::from("in_temp_object_raw")))
            }
        });
        source.expect_read_ambient().returning(move || Ok(ambient));
        source
    }

    #[test]
    #[serial]
    fn test_persistent_failure_logs_once_per_channel() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.json");
        logger::init_logging_at(&path).unwrap();

        let poller = Poller::new(fast_config(2));
        let source = scripted_source(&poller, vec![false; 1000], -300.0);
        let mut out = Vec::new();
        assert_eq!(poller.run(&source, &mut out).unwrap(), 1000);
        logger::shutdown_logging();

        let events = logged_events(&path);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["data"]["channel"], "object");
        assert_eq!(events[0]["data"]["state"], "error");
        assert_eq!(events[1]["data"]["channel"], "ambient");
        assert_eq!(events[1]["data"]["state"], "out_of_range");
        // Readings are never persisted
        assert!(events.iter().all(|e| e["data"].get("celsius").is_none()));
    }

    #[test]
    #[serial]
    fn test_state_changes_are_logged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.json");
        logger::init_logging_at(&path).unwrap();

        let poller = Poller::new(fast_config(2));
        let source = scripted_source(&poller, vec![true, false, false, true, true], 21.0);
        let mut out = Vec::new();
        assert_eq!(poller.run(&source, &mut out).unwrap(), 5);
        logger::shutdown_logging();

        let states: Vec<String> = logged_events(&path)
            .iter()
            .map(|e| format!("{}:{}", e["data"]["channel"].as_str().unwrap(), e["data"]["state"].as_str().unwrap()))
            .collect();
        assert_eq!(states, vec!["object:error", "object:ok"]);
    }
}
