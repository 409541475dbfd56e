//! Serializes a layer's properties onto a plane into an atomic request.

use tracing::trace;

use crate::plane::Plane;
use crate::property::CoreProperty;
use crate::request::AtomicRequest;
use crate::{Layer, Output, Result};

/// Result of attempting to write one layer's properties onto one plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ApplyOutcome {
    /// The plane accommodates every property the layer set.
    Applied,
    /// The plane lacks a property the layer set to a non-default value; the
    /// request cursor has been rewound to its entry mark.
    Incompatible,
}

/// Writes `layer`'s properties onto `plane` into `req`, or disables `plane`
/// if `layer` is `None`.
pub(crate) fn apply_plane<R: AtomicRequest + ?Sized>(
    plane: &Plane,
    layer: Option<&Layer>,
    output: &Output,
    req: &mut R,
) -> Result<ApplyOutcome> {
    let mark = req.cursor();

    let Some(layer) = layer else {
        if let Some(p) = plane.props.get_core(CoreProperty::FbId) {
            req.add_property(plane.id, p.id, 0);
        }
        if let Some(p) = plane.props.get_core(CoreProperty::CrtcId) {
            req.add_property(plane.id, p.id, 0);
        }
        return Ok(ApplyOutcome::Applied);
    };

    if let Some(p) = plane.props.get_core(CoreProperty::CrtcId) {
        req.add_property(plane.id, p.id, output.crtc_id as u64);
    }

    for (name, prop) in layer.props.iter() {
        if name == CoreProperty::Zpos.name() {
            continue;
        }

        match plane.props.get(name) {
            Some(plane_prop) => {
                if plane_prop.immutable {
                    continue;
                }
                req.add_property(plane.id, plane_prop.id, prop.value);
            }
            None => {
                let omit_default = (name == CoreProperty::Alpha.name() && prop.value == 0xFFFF)
                    || (name == CoreProperty::Rotation.name() && prop.value == 0);
                if omit_default {
                    continue;
                }
                trace!(plane = plane.id, property = name, "plane lacks required property");
                req.set_cursor(mark);
                return Ok(ApplyOutcome::Incompatible);
            }
        }
    }

    Ok(ApplyOutcome::Applied)
}
