#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

//! # liftkms: a plane allocation engine for DRM/KMS compositors
//!
//! This crate picks which layers a compositor submits as hardware planes and
//! which it must composite itself, by driving the kernel's atomic-commit
//! `TEST_ONLY` mode as an oracle: candidate `(plane, layer)` assignments are
//! written into an atomic request and test-committed, and the kernel's
//! accept/reject answer prunes the search instead of the engine trying to
//! model every driver's plane constraints itself.
//!
//! ## Structure of the crate
//!
//! [`Device`] is the entry point: it owns every registered [`Plane`],
//! [`Output`] and [`Layer`] and exposes the per-frame [`Device::apply_output`]
//! call. The search itself lives in `alloc` and the reuse fast path in
//! `reuse`; both are internal, driven only through `Device`. `apply` turns a
//! winning `(plane, layer)` pair into atomic properties, and `request`
//! defines the [`AtomicRequest`] trait that abstracts over the kernel
//! interface so the same engine runs against a real DRM card or, behind the
//! `test-util` feature, the in-memory `mock` backend.
//!
//! ## Logging
//!
//! The engine emits [`tracing`] events at `debug` (per-apply summaries),
//! `trace` (per-candidate search detail) and `info` (reuse-cache hits).
//! Compositors typically install a subscriber once at startup; this crate
//! never does so itself.

mod alloc;
mod apply;
pub mod backend;
pub mod device;
pub mod error;
pub mod ids;
pub mod layer;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod output;
pub mod plane;
pub mod property;
pub mod rect;
mod reuse;
pub mod request;

pub use backend::{register_all_planes, DrmAtomicRequest};
pub use device::Device;
pub use error::{Error, Result};
pub use ids::{LayerId, OutputId, PlaneId};
pub use layer::{Layer, LayerProperty};
pub use output::Output;
pub use plane::{Plane, PlaneProperty, PlaneType};
pub use property::{CoreProperty, PropertyTable};
pub use rect::Rect;
pub use request::{AtomicRequest, CommitFlags};
