//! Utility Module
//!
//! - [`time`]: frame clock feeding the playback tick

pub mod time;

pub use time::FrameClock;
