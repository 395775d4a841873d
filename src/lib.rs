//! Kara - A citizen air-quality and pollution-complaint service.
//!
//! # Overview
//!
//! Kara shows the current Air Quality Index for one city, lets anonymous
//! users file pollution complaints, upvote them and follow a live feed, and
//! uses a generative text endpoint for health tips and complaint drafts.
//!
//! # Modules
//!
//! - [`aqi`]: AQI categories, display tokens and the PM2.5 step table
//! - [`model`]: Complaint, reading and request/response types
//! - [`storage`]: The complaint store contract and its SQLite implementation
//! - [`repository`]: Store writes with live feed notification
//! - [`feed`]: Feed subscriptions
//! - [`geocode`]: Deterministic pseudo-coordinates for map markers
//! - [`data_sources`]: WAQI, Open-Meteo and Gemini clients
//! - [`assistant`]: Health tips and complaint drafts
//! - [`request`]: Request slots that discard stale responses
//! - [`session`]: Anonymous identities
//! - [`dashboard`]: Headless dashboard session
//! - [`api`]: HTTP API handlers

pub mod api;
pub mod aqi;
pub mod assistant;
pub mod config;
pub mod dashboard;
pub mod data_sources;
pub mod error;
pub mod feed;
pub mod geocode;
pub mod model;
pub mod repository;
pub mod request;
pub mod session;
pub mod state;
pub mod storage;

#[cfg(test)]
mod testing;
