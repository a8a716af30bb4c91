//! Core library for the headless Wi-Fi station manager.
//!
//! The device runs a softAP for provisioning while a single long-running
//! task drives the station side of the radio: it services connect, disconnect
//! and scan requests raised by arbitrary producer contexts, talks to the
//! wireless driver, and republishes machine-readable status JSON for
//! read-only consumers (typically an HTTP handler and a captive-portal DNS
//! responder, both outside this crate).
//!
//! This crate defines the core traits (interfaces) and data structures and
//! provides in-tree implementations for the mock driver backend and the
//! credential stores.

pub mod backends;
pub mod config;
pub mod credentials;
pub mod manager;
pub mod signals;
pub mod status;
pub mod store;
pub mod traits;

// Define a shared Error and Result type for the entire crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// A wireless driver call failed. There is no local recovery for this;
    /// the supervisor owns the restart decision.
    #[error("driver operation failed: {0}")]
    Driver(String),

    #[error("credential store error: {0}")]
    Store(String),

    /// A wait on the signal bus outlived its deadline. Raised for waits the
    /// state machine relies on always completing (softAP startup, driver
    /// acknowledgement events).
    #[error("timed out waiting for {0}")]
    SignalTimeout(&'static str),

    /// The status projection could not be locked in time while publishing a
    /// connect/disconnect outcome.
    #[error("could not lock the status projection for publishing")]
    StatusLock,

    #[error("{field} exceeds {max} bytes (got {len})")]
    CredentialTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
}

/// A specialized `Result` type for this crate's operations.
pub type Result<T> = std::result::Result<T, Error>;
