//! # Haven Core Library
//!
//! The identity, membership and encrypted-messaging core of the Haven
//! anonymous peer-support platform. Clients (UI layers) drive this crate
//! through a [`Session`]; nothing here touches the network.
//!
//! ## Core Guarantees
//!
//! - No accounts, emails, or phone numbers: an identity is a locally
//!   generated secret seed, and its public commitment is the only value
//!   that ever leaves the device
//! - One-way commitments: seeds cannot be recovered from commitments,
//!   attestation proofs, membership proofs or nullifiers
//! - Anonymous rate limiting: at most one accepted message per identity,
//!   per room, per epoch, enforced without identifying the sender
//! - Authenticated encryption for every stored message; wrong keys fail
//!   explicitly
//! - No recovery: deleting the identity cascades everything derived
//!   from it
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              session (facade)           │
//! ├─────────────────────────────────────────┤
//! │  rooms    │  membership/rln  │ storage  │
//! ├─────────────────────────────────────────┤
//! │       crypto        │     identity      │
//! └─────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]
#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod clock;
pub mod crypto;
pub mod error;
pub mod identity;
pub mod logging;
pub mod membership;
pub mod rooms;
pub mod session;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use identity::{Attestation, Category, Identity};
pub use membership::{Membership, RlnConfig};
pub use rooms::{Room, StoredMessage};
pub use session::{ReportReceipt, RoomSecretProvider, Session, SessionConfig, StaticRoomSecrets};
pub use storage::DatabaseConfig;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
