//! Sustained shake detector.
//!
//! Turns a noisy accelerometer stream into one discrete "shake completed"
//! event per deliberate gesture. A tick counts as shaking when the recent
//! peak magnitude rises far enough above the rolling average. Shaking has
//! to be held for `sustained_duration_ms`; brief drop-outs are tolerated for
//! `interruption_grace_ms`, and completions are spaced by `cooldown_ms`.
//!
//! The detector is single-writer and never blocks: all time comes from
//! sample timestamps (or [`ShakeDetector::tick`]), and the completion
//! callback runs synchronously inside [`ShakeDetector::on_sample`]. Callers
//! with real work to do should hand it off to their own queue.

use crate::config::DetectorConfig;
use crate::error::ConfigError;
use crate::history::{MagnitudeHistory, MIN_SAMPLES_FOR_SPIKE};
use crate::sensor::AccelerationSample;
use crate::timer::GraceTimer;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

/// A completed sustained shake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShakeEvent {
    /// Value of `shake_count` after this completion.
    pub count: u32,
    pub timestamp_ms: u64,
    pub session_started_ms: u64,
}

impl ShakeEvent {
    pub fn session_ms(&self) -> u64 {
        self.timestamp_ms.saturating_sub(self.session_started_ms)
    }
}

/// Read-only snapshot for UI consumption.
///
/// `sustained_progress` is always 0 when `is_sustained_shaking` is false.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DetectorState {
    pub is_shaking: bool,
    pub shake_count: u32,
    pub sustained_progress: f64,
    pub is_sustained_shaking: bool,
}

pub type ShakeCallback = Box<dyn FnMut(&ShakeEvent) + Send>;

pub struct ShakeDetector {
    config: DetectorConfig,
    feature_enabled: bool,
    history: MagnitudeHistory,
    warmed_up: bool,
    is_shaking: bool,
    session_started_ms: Option<u64>,
    progress: f64,
    grace: GraceTimer,
    shake_count: u32,
    last_completion_ms: Option<u64>,
    on_completed: Option<ShakeCallback>,
}

impl ShakeDetector {
    pub fn new(config: DetectorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_valid_config(config))
    }

    fn with_valid_config(config: DetectorConfig) -> Self {
        Self {
            config,
            feature_enabled: true,
            history: MagnitudeHistory::new(),
            warmed_up: false,
            is_shaking: false,
            session_started_ms: None,
            progress: 0.0,
            grace: GraceTimer::new(),
            shake_count: 0,
            last_completion_ms: None,
            on_completed: None,
        }
    }

    /// Replaces the configuration and resets the detector, including the
    /// shake count and cooldown. An invalid config is rejected and the
    /// current one stays in effect.
    pub fn configure(&mut self, config: DetectorConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.config = config;
        self.clear_session_state();
        self.shake_count = 0;
        self.last_completion_ms = None;
        Ok(())
    }

    /// Registers the completion callback, replacing any previous one.
    /// It runs on the sampling path and must return quickly.
    pub fn on_shake_completed<F>(&mut self, callback: F)
    where
        F: FnMut(&ShakeEvent) + Send + 'static,
    {
        self.on_completed = Some(Box::new(callback));
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn last_completion_ms(&self) -> Option<u64> {
        self.last_completion_ms
    }

    pub fn is_feature_enabled(&self) -> bool {
        self.feature_enabled
    }

    fn is_active(&self) -> bool {
        self.feature_enabled && self.config.enabled
    }

    pub fn state(&self) -> DetectorState {
        if !self.feature_enabled {
            return DetectorState::default();
        }
        match self.session_started_ms {
            Some(_) => DetectorState {
                is_shaking: self.is_shaking,
                shake_count: self.shake_count,
                sustained_progress: self.progress,
                is_sustained_shaking: true,
            },
            None => DetectorState {
                is_shaking: self.is_shaking,
                shake_count: self.shake_count,
                sustained_progress: 0.0,
                is_sustained_shaking: false,
            },
        }
    }

    /// Zeroes the count. In-progress sessions and the cooldown are untouched.
    pub fn reset_shake_count(&mut self) {
        self.shake_count = 0;
    }

    /// Disabling drops any session without side effects; re-enabling starts
    /// from an empty history and needs a fresh warm-up sample.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.config.enabled == enabled {
            return;
        }
        self.config.enabled = enabled;
        self.clear_session_state();
        debug!(enabled, "shake detection toggled");
    }

    /// Global feature flag. While off, samples are ignored and `state()`
    /// reports the idle snapshot.
    pub fn set_feature_enabled(&mut self, enabled: bool) {
        if self.feature_enabled == enabled {
            return;
        }
        self.feature_enabled = enabled;
        self.clear_session_state();
    }

    /// Advances the clock without a sample so a pending grace period can
    /// lapse while the sensor is quiet.
    pub fn tick(&mut self, now_ms: u64) {
        if self.is_active() {
            self.expire_grace(now_ms);
        }
    }

    /// Processes one accelerometer sample. Returns the completion event if
    /// this sample finished a sustained shake.
    pub fn on_sample(&mut self, sample: &AccelerationSample) -> Option<ShakeEvent> {
        if !self.is_active() {
            return None;
        }
        let now = sample.timestamp_ms;
        self.expire_grace(now);

        // First sample only establishes that the stream is live.
        if !self.warmed_up {
            self.warmed_up = true;
            return None;
        }

        let magnitude = sample.magnitude();
        if !magnitude.is_finite() {
            if self.config.debug {
                debug!(timestamp_ms = now, "non-finite sample treated as still");
            }
            self.on_quiet(now);
            return None;
        }

        self.history.push(magnitude);
        if self.history.len() < MIN_SAMPLES_FOR_SPIKE {
            return None;
        }

        let (Some(average), Some(spike)) = (self.history.mean(), self.history.spike()) else {
            return None;
        };
        let threshold = self.config.effective_threshold();
        let shaking = spike > threshold;

        if self.config.debug {
            debug!(
                timestamp_ms = now,
                magnitude, average, spike, threshold, shaking, "shake tick"
            );
        }

        if shaking {
            self.on_spike(now)
        } else {
            self.on_quiet(now);
            None
        }
    }

    fn on_spike(&mut self, now: u64) -> Option<ShakeEvent> {
        self.is_shaking = true;
        self.grace.cancel();

        let started = match self.session_started_ms {
            Some(started) => started,
            None => {
                self.session_started_ms = Some(now);
                self.progress = 0.0;
                debug!(timestamp_ms = now, "sustained shake started");
                now
            }
        };

        let elapsed = now.saturating_sub(started);
        let required = self.config.sustained_duration_ms;
        self.progress = (elapsed as f64 / required as f64).min(1.0);

        if elapsed < required {
            return None;
        }
        if let Some(last) = self.last_completion_ms {
            if now.saturating_sub(last) < self.config.cooldown_ms {
                return None;
            }
        }

        Some(self.complete(now, started))
    }

    fn on_quiet(&mut self, now: u64) {
        self.is_shaking = false;
        if self.session_started_ms.is_some() && self.grace.arm(now, self.config.interruption_grace_ms)
        {
            debug!(
                timestamp_ms = now,
                grace_ms = self.config.interruption_grace_ms,
                "shake interrupted"
            );
        }
    }

    fn complete(&mut self, now: u64, started: u64) -> ShakeEvent {
        self.shake_count = self.shake_count.saturating_add(1);
        self.last_completion_ms = Some(now);
        self.session_started_ms = None;
        self.progress = 0.0;
        // Leftover peaks from this gesture must not seed the next session.
        self.history.clear();

        let event = ShakeEvent {
            count: self.shake_count,
            timestamp_ms: now,
            session_started_ms: started,
        };
        info!(
            count = event.count,
            session_ms = event.session_ms(),
            "sustained shake completed"
        );
        if let Some(callback) = self.on_completed.as_mut() {
            callback(&event);
        }
        event
    }

    fn expire_grace(&mut self, now: u64) {
        if self.grace.fire_if_due(now) {
            debug!(timestamp_ms = now, "grace period elapsed, shake abandoned");
            self.session_started_ms = None;
            self.progress = 0.0;
        }
    }

    fn clear_session_state(&mut self) {
        self.is_shaking = false;
        self.session_started_ms = None;
        self.progress = 0.0;
        self.grace.cancel();
        self.history.clear();
        self.warmed_up = false;
    }
}

impl Default for ShakeDetector {
    fn default() -> Self {
        Self::with_valid_config(DetectorConfig::default())
    }
}

impl fmt::Debug for ShakeDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShakeDetector")
            .field("config", &self.config)
            .field("feature_enabled", &self.feature_enabled)
            .field("state", &self.state())
            .field("history_len", &self.history.len())
            .field("grace_deadline_ms", &self.grace.deadline())
            .field("last_completion_ms", &self.last_completion_ms)
            .finish_non_exhaustive()
    }
}
