//! Session host for the turn-flow kernel.
//!
//! The kernel is a pure function of state, move and answers. This crate owns
//! the state between transitions, keeps the one in-flight suspended move,
//! and records every completed move with its answers into a [`ReplayLog`]
//! that [`replay`] reproduces bit for bit.
//!
//! Modules are organized by responsibility:
//! - [`session`] drives one game through submissions and choice answers
//! - [`replay`] defines the log format and re-executes it
//! - [`repository`] stores logs on disk
//! - [`config`] reads session settings from TOML
pub mod config;
pub mod error;
pub mod replay;
pub mod repository;
pub mod session;

pub use config::SessionConfig;
pub use error::{RepositoryError, Result, SessionError};
pub use replay::{Answer, ReplayEntry, ReplayLog, replay};
pub use repository::ReplayStore;
pub use session::{Session, Step};
