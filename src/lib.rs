//! Window chrome for the Typhoon weather widget: a borderless, aspect-locked
//! window that moves, resizes, remembers its geometry and drives a launcher badge.

pub mod aspect;
pub mod badge;
pub mod chrome;
pub mod commands;
pub mod config;
pub mod drag;
pub mod geometry;
pub mod host;
pub mod launcher;
pub mod notify;
pub mod resize;
pub mod storage;
pub mod theme;

#[cfg(feature = "desktop")]
pub mod tauri_host;
