//! Accelerometer sample sources.
//!
//! The detector only sees timestamped 3-axis samples; where they come from is
//! decided here. Two sources are provided: replaying a recorded fixture
//! (newline-delimited JSON) and a deterministic synthetic generator used by
//! the simulator and the tests. Both push into an `mpsc` channel so the
//! detection loop can run on its own thread, the same way a live platform
//! binding would deliver them.

use crate::error::SensorError;
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::str::FromStr;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

// ── Signal constants ────────────────────────────────────────────────────────

/// Standard gravity, what a phone lying still reports.
pub const GRAVITY: f64 = 9.81;

// Synthetic jerk vector (18, 0, 24) has magnitude 30.
const JERK_X: f64 = 18.0;
const JERK_Z: f64 = 24.0;
const JERK_PERIOD: u64 = 3;

/// Longest single synthetic segment (10 minutes).
pub const MAX_SEGMENT_MS: u64 = 10 * 60 * 1000;

/// Longest synthetic pattern as a whole (1 hour).
pub const MAX_PATTERN_MS: u64 = 60 * 60 * 1000;

// ── Public types ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccelerationSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub timestamp_ms: u64,
}

impl AccelerationSample {
    pub fn new(x: f64, y: f64, z: f64, timestamp_ms: u64) -> Self {
        Self {
            x,
            y,
            z,
            timestamp_ms,
        }
    }

    /// Total acceleration. NaN if any axis is NaN.
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub sent: usize,
    pub skipped: usize,
}

// ── Recorded fixtures ───────────────────────────────────────────────────────

/// Reads one JSON sample per line and sends it through `tx`.
///
/// Blank lines are ignored and unparseable lines are skipped with a warning.
/// Returns early, without error, when the receiving side hangs up.
pub fn replay<R: BufRead>(
    reader: R,
    tx: mpsc::Sender<AccelerationSample>,
) -> Result<ReplaySummary, SensorError> {
    let mut summary = ReplaySummary::default();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let sample: AccelerationSample = match serde_json::from_str(trimmed) {
            Ok(sample) => sample,
            Err(e) => {
                tracing::warn!(line = index + 1, error = %e, "skipping malformed sample");
                summary.skipped += 1;
                continue;
            }
        };

        if tx.send(sample).is_err() {
            tracing::debug!("sample receiver closed, stopping replay");
            break;
        }
        summary.sent += 1;
    }

    Ok(summary)
}

// ── Synthetic streams ───────────────────────────────────────────────────────

/// One stretch of a synthetic recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    /// Device at rest: gravity only.
    Still(u64),
    /// Vigorous shaking: one jerk every third sample over a gravity floor.
    Shake(u64),
}

impl Segment {
    pub fn duration_ms(&self) -> u64 {
        match self {
            Segment::Still(ms) | Segment::Shake(ms) => *ms,
        }
    }
}

impl FromStr for Segment {
    type Err = SensorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SensorError::InvalidSegment(s.to_string());
        let (kind, ms) = s.trim().split_once(':').ok_or_else(invalid)?;
        let ms: u64 = ms.trim().parse().map_err(|_| invalid())?;
        if ms > MAX_SEGMENT_MS {
            return Err(invalid());
        }
        match kind.trim() {
            "still" => Ok(Segment::Still(ms)),
            "shake" => Ok(Segment::Shake(ms)),
            _ => Err(invalid()),
        }
    }
}

/// Parses a comma-separated list such as `still:300,shake:3300`.
pub fn parse_pattern(pattern: &str) -> Result<Vec<Segment>, SensorError> {
    let segments: Vec<Segment> = pattern
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(str::parse)
        .collect::<Result<_, _>>()?;

    let total_ms = segments
        .iter()
        .try_fold(0u64, |total, segment| total.checked_add(segment.duration_ms()));
    match total_ms {
        Some(total_ms) if total_ms <= MAX_PATTERN_MS => Ok(segments),
        _ => Err(SensorError::PatternTooLong {
            max_ms: MAX_PATTERN_MS,
        }),
    }
}

/// Deterministic sample generator.
#[derive(Debug, Clone)]
pub struct SyntheticShake {
    pub interval_ms: u64,
    pub start_ms: u64,
    pub segments: Vec<Segment>,
}

impl SyntheticShake {
    pub fn new(interval_ms: u64, segments: Vec<Segment>) -> Self {
        Self {
            interval_ms,
            start_ms: 0,
            segments,
        }
    }

    /// Renders the segments back to back, one sample per interval. Each
    /// segment covers `[start, start + duration)`, with durations clamped
    /// to `MAX_SEGMENT_MS`.
    pub fn samples(&self) -> Vec<AccelerationSample> {
        let interval = self.interval_ms.max(1);
        let mut samples = Vec::new();
        let mut t = self.start_ms;
        let mut segment_start = self.start_ms;

        for segment in &self.segments {
            let segment_end =
                segment_start.saturating_add(segment.duration_ms().min(MAX_SEGMENT_MS));
            let mut tick: u64 = 0;
            while t < segment_end {
                let sample = match segment {
                    Segment::Shake(_) if tick % JERK_PERIOD == 0 => {
                        AccelerationSample::new(JERK_X, 0.0, JERK_Z, t)
                    }
                    _ => AccelerationSample::new(0.0, 0.0, GRAVITY, t),
                };
                samples.push(sample);
                tick += 1;
                t = match t.checked_add(interval) {
                    Some(next) => next,
                    None => return samples,
                };
            }
            segment_start = segment_end;
        }

        samples
    }
}

/// Sends prepared samples through `tx`. With `pace` set, sleeps
/// `interval` between samples like a live sensor would.
pub fn stream(
    samples: Vec<AccelerationSample>,
    tx: mpsc::Sender<AccelerationSample>,
    pace: Option<Duration>,
) -> usize {
    let mut sent = 0;
    for sample in samples {
        if tx.send(sample).is_err() {
            break;
        }
        sent += 1;
        if let Some(interval) = pace {
            thread::sleep(interval);
        }
    }
    sent
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn magnitude_of_gravity_sample() {
        let sample = AccelerationSample::new(0.0, 0.0, GRAVITY, 0);
        assert!((sample.magnitude() - GRAVITY).abs() < 1e-12);
        let jerk = AccelerationSample::new(JERK_X, 0.0, JERK_Z, 0);
        assert!((jerk.magnitude() - 30.0).abs() < 1e-12);
    }

    #[test]
    fn nan_axis_gives_nan_magnitude() {
        let sample = AccelerationSample::new(f64::NAN, 0.0, 9.81, 0);
        assert!(sample.magnitude().is_nan());
    }

    #[test]
    fn replay_skips_blank_and_malformed_lines() {
        let input = concat!(
            r#"{"x":0.0,"y":0.0,"z":9.81,"timestamp_ms":0}"#,
            "\n\n",
            "garbage\n",
            r#"{"x":1.0,"y":2.0,"z":3.0,"timestamp_ms":33}"#,
            "\n",
        );
        let (tx, rx) = mpsc::channel();
        let summary = replay(Cursor::new(input), tx).unwrap();
        assert_eq!(summary, ReplaySummary { sent: 2, skipped: 1 });

        let samples: Vec<_> = rx.iter().collect();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1], AccelerationSample::new(1.0, 2.0, 3.0, 33));
    }

    #[test]
    fn replay_stops_when_receiver_drops() {
        let input = r#"{"x":0.0,"y":0.0,"z":9.81,"timestamp_ms":0}"#;
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let summary = replay(Cursor::new(input), tx).unwrap();
        assert_eq!(summary.sent, 0);
    }

    #[test]
    fn parses_pattern_segments() {
        let segments = parse_pattern("still:300, shake:3300,").unwrap();
        assert_eq!(segments, vec![Segment::Still(300), Segment::Shake(3300)]);
        assert!(matches!(
            parse_pattern("wobble:10"),
            Err(SensorError::InvalidSegment(_))
        ));
        assert!(parse_pattern("shake:abc").is_err());
        assert!(parse_pattern("shake").is_err());
    }

    #[test]
    fn oversized_patterns_are_rejected() {
        assert!(matches!(
            parse_pattern("still:10,shake:18446744073709551615"),
            Err(SensorError::InvalidSegment(_))
        ));
        assert!(parse_pattern(&format!("shake:{}", MAX_SEGMENT_MS)).is_ok());

        let too_long = vec![format!("still:{MAX_SEGMENT_MS}"); 7].join(",");
        assert!(matches!(
            parse_pattern(&too_long),
            Err(SensorError::PatternTooLong { .. })
        ));
    }

    #[test]
    fn huge_segments_render_without_overflow() {
        let synth = SyntheticShake {
            interval_ms: 33,
            start_ms: u64::MAX - 100,
            segments: vec![Segment::Still(10), Segment::Shake(u64::MAX)],
        };
        let samples = synth.samples();
        assert_eq!(samples.len(), 4);
        assert!(samples.windows(2).all(|w| w[0].timestamp_ms < w[1].timestamp_ms));
    }

    #[test]
    fn synthetic_stream_is_evenly_spaced() {
        let synth = SyntheticShake::new(33, vec![Segment::Still(99), Segment::Shake(99)]);
        let samples = synth.samples();
        let stamps: Vec<u64> = samples.iter().map(|s| s.timestamp_ms).collect();
        assert_eq!(stamps, vec![0, 33, 66, 99, 132, 165]);
        assert!((samples[2].magnitude() - GRAVITY).abs() < 1e-12);
        assert!((samples[3].magnitude() - 30.0).abs() < 1e-12);
        assert!((samples[4].magnitude() - GRAVITY).abs() < 1e-12);
    }

    #[test]
    fn stream_sends_everything() {
        let synth = SyntheticShake::new(33, vec![Segment::Shake(330)]);
        let (tx, rx) = mpsc::channel();
        let sent = stream(synth.samples(), tx, None);
        assert_eq!(sent, 10);
        assert_eq!(rx.iter().count(), 10);
    }
}
