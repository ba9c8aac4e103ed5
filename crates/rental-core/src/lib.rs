//! Core rental client library (token lifecycle, API access, session, services).

pub mod api;
pub mod auth;
pub mod config;
pub mod services;
pub mod session;
pub mod types;
