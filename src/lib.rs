#![deny(missing_docs)]
//! A single-node key/value store.
//!
//! Clients talk to the server with length-prefixed text frames (see [`frame`]).
//! Each request is parsed into an [`Operation`] and executed against a
//! [`KvStore`], which appends every mutating operation to a command log
//! before applying it and replays that log when it is opened.

#[macro_use]
extern crate log;

pub use client::KvsClient;
pub use engines::{CommandLog, KvStore, KvsEngine};
pub use error::{KvsError, Result};
pub use frame::{FrameReader, FrameWriter};
pub use operation::{Command, IntoOperation, Operation};
pub use server::{KvsServer, ServerConfig, ERROR_PREFIX};

mod client;
mod engines;
mod error;
pub mod frame;
mod operation;
mod server;
