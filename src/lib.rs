//! Switchboard coordination server library.
//! This crate exposes internal modules for integration testing.
//! The binary entry point is in main.rs.

pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod routes;
pub mod signaling;
pub mod state;
pub mod users;
pub mod ws;
