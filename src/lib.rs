pub mod app;
pub mod auth;
pub mod cli;
pub mod commands;
pub mod configuration;
pub mod context;
pub mod rest;
pub mod stats;
pub mod storage;
pub mod tracing;
pub mod types;
pub mod workouts;
