//! Error types returned by this crate.

use crate::{LayerId, OutputId, PlaneId};

/// Errors produced by the plane allocation engine.
///
/// Most operations that only mutate in-memory state (creating layers, setting
/// properties) can only fail with a handful of programming-error variants.
/// [`crate::Device::apply_output`] is the one operation that can also surface
/// an unexpected error from the kernel atomic-commit interface.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A plane with this id was already registered on the device.
    #[error("plane {0:?} is already registered")]
    DuplicatePlane(u32),

    /// The given crtc id is not among the device's enumerated CRTCs.
    #[error("crtc {0:#x} is not one of this device's CRTCs")]
    UnknownCrtc(u32),

    /// Setting `CRTC_ID` directly on a layer is not allowed; the engine
    /// derives it from the layer's output.
    #[error("CRTC_ID is a reserved property and cannot be set on a layer")]
    ReservedProperty,

    /// An id referred to an output that no longer exists on this device.
    #[error("output {0:?} does not exist on this device")]
    UnknownOutput(OutputId),

    /// An id referred to a layer that no longer exists on this device.
    #[error("layer {0:?} does not exist on this device")]
    UnknownLayer(LayerId),

    /// An id referred to a plane that no longer exists on this device.
    #[error("plane {0:?} does not exist on this device")]
    UnknownPlane(PlaneId),

    /// The composition layer passed to [`crate::Device::set_composition_layer`]
    /// does not belong to the given output.
    #[error("layer {0:?} does not belong to output {1:?}")]
    LayerNotInOutput(LayerId, OutputId),

    /// The kernel atomic-commit interface returned an error that is neither a
    /// prune signal (`EINVAL`/`ERANGE`/`ENOSPC`) nor a transient retry signal
    /// (`EINTR`/`EAGAIN`).
    #[error("atomic commit failed with errno {0}")]
    Commit(i32),

    /// The request builder itself failed to record a property (allocation
    /// failure or similar in the underlying backend).
    #[error("failed to build atomic request")]
    Request(#[source] std::io::Error),

    /// An internal invariant was violated: the search accepted an allocation
    /// via a test commit, but the final write-out of that allocation was
    /// rejected as incompatible by the plane applier. This indicates a bug in
    /// the engine, not a caller error.
    #[error("internal invariant violated: {0}")]
    Invariant(&'static str),
}

/// Result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;
