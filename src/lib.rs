//! musicalert: plays a sound when a Grafana alert fires.

pub mod api;
pub mod config;
pub mod error;
pub mod event;
pub mod matcher;
pub mod payload;
pub mod playback;
pub mod player;
pub mod quiet_hours;
pub mod rules;
