//! Chicago transit tracker client.
//!
//! Fetches live bus and train data from the CTA trackers and answers: "which
//! scheduled trip is this vehicle running?" Live reports are matched against a
//! static schedule and returned as overlays on the scheduled trips.

pub mod cache;
pub mod classify;
pub mod client;
pub mod config;
pub mod domain;
pub mod overlay;
pub mod resolve;
pub mod store;
