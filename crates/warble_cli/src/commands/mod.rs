pub mod auth;
pub mod config;
pub mod task;
pub mod transcribe;
