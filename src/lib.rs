#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use
)]

pub mod agent;
pub mod auth;
pub mod config;
pub mod countries;
pub mod db;
pub mod error;
pub mod events;
pub mod gateway;
pub mod runtime;
pub mod session;

pub use config::Config;
