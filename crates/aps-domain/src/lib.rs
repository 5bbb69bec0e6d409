#![deny(clippy::all)]

//! Core types for the APTrust replica staging pipeline.
//!
//! Everything in this crate is pure: addresses and their bucket keys,
//! the metadata record the backing store holds per object, the attribute
//! vocabulary exposed to callers, content-type selection, and the ingest
//! lifecycle observed through the preservation service's event feed.
//! All I/O lives in `aps-core`.

mod address;
mod attribute;
mod content_type;
mod event;
mod record;

pub use address::{AddressError, ReplicaAddress, KEY_SEPARATOR};
pub use attribute::ObjectAttribute;
pub use content_type::content_type_for;
pub use event::{ArchivalEvent, IngestStatus};
pub use record::ObjectRecord;
