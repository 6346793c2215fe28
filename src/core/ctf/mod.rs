// Core CTF module - event lifecycle business logic.
// Discord and SQLite live behind the store and platform traits.

pub mod ctf_config;
pub mod ctf_models;
pub mod ctf_platform;
pub mod ctf_service;
pub mod ctf_store;
pub mod join_action;
pub mod schedule;
pub mod slug;
pub mod status_tracker;
pub mod tally;

pub use ctf_config::*;
pub use ctf_models::*;
pub use ctf_platform::*;
pub use ctf_service::*;
pub use ctf_store::*;
pub use join_action::JoinAction;
pub use schedule::ScheduleError;
pub use status_tracker::StatusTracker;
pub use tally::Tally;
