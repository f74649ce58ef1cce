#![forbid(unsafe_code)]

pub mod auth;
pub mod catalog;
pub mod cli;
pub mod collab;
pub mod commands;
pub mod config;
pub mod content;
pub mod formats;
pub mod logging;
pub mod markdown;
pub mod render;
pub mod route;
pub mod shell;
pub mod state_store;
pub mod throttle;
