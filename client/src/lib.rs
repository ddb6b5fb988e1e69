//! # Roster Client
//!
//! Connects the Roster engine to the school's record service: a single web
//! app endpoint that serves every collection as a table.
//!
//! - [`HttpRemote`] implements [`RemoteService`](roster_engine::RemoteService)
//!   over that endpoint.
//! - [`Config`] loads the endpoint, key and cache settings from the
//!   environment.

pub mod config;
pub mod error;
pub mod http;

pub use config::{Config, ConfigError};
pub use error::ClientError;
pub use http::HttpRemote;
