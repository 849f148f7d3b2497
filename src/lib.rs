//! Raka - a Telegram bot that answers with canned replies or an external language model.

pub mod classifier;
pub mod commands;
pub mod config;
pub mod dispatcher;
pub mod inference;
pub mod rate_limiter;
