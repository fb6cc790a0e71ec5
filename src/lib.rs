//! Skydeck - records API for the astronomy, weather and news dashboard
//!
//! Signed-in users save snapshots of the feeds they are looking at and
//! later list, edit or delete them. The same server proxies the public
//! feeds so upstream keys never reach the browser.
//!
//! ## Services
//!
//! - **Records**: per-user CRUD over saved snapshots, MongoDB or in-memory
//! - **Sessions**: JWT session verification plus a shared X-API-Key
//! - **Feeds**: NASA APOD, OpenWeatherMap and Spaceflight News pass-through

pub mod auth;
pub mod config;
pub mod db;
pub mod feeds;
pub mod records;
pub mod routes;
pub mod server;
pub mod types;

pub use config::Args;
pub use server::{dispatch, run, AppState};
pub use types::{Result, SkydeckError};
