//! Sustained shake-gesture detection.
//!
//! Feed timestamped accelerometer samples into a [`ShakeDetector`]; it
//! reports live progress through [`DetectorState`] and fires one
//! [`ShakeEvent`] per deliberate, sustained shake.
//!
//! ```ignore
//! use shake::{AccelerationSample, DetectorConfig, ShakeDetector};
//!
//! let mut detector = ShakeDetector::new(DetectorConfig::default())?;
//! detector.on_shake_completed(|event| println!("shake #{}", event.count));
//! detector.on_sample(&AccelerationSample::new(0.0, 0.0, 9.81, 0));
//! ```

pub mod config;
pub mod detector;
pub mod error;
pub mod history;
pub mod sensor;
pub mod timer;


pub use config::{DetectorConfig, Sensitivity, ShakeSettings};
pub use detector::{DetectorState, ShakeDetector, ShakeEvent};
pub use error::{ConfigError, SensorError};
pub use sensor::AccelerationSample;
