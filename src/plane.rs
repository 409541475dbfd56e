//! Hardware plane handles.

use crate::property::PropertyTable;
use crate::LayerId;

/// The kind of a hardware plane, as reported by its `type` enum property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneType {
    /// The plane conventionally required to light up a CRTC.
    Primary,
    /// Any non-primary, non-cursor plane.
    Overlay,
    /// A small plane conventionally composited on top.
    Cursor,
}

/// A plane's DRM property id, plus whether the kernel reports it as
/// immutable (read-only once the plane is created, e.g. a fixed `zpos` on
/// some overlay hardware).
#[derive(Debug, Clone, Copy)]
pub struct PlaneProperty {
    /// The DRM property object id, passed to `add_property`.
    pub id: u32,
    /// Whether the kernel reported `DRM_MODE_PROP_IMMUTABLE` for this
    /// property.
    pub immutable: bool,
}

/// A hardware plane, immutable after registration except for its current
/// layer binding.
#[derive(Debug)]
pub struct Plane {
    pub(crate) id: u32,
    pub(crate) possible_crtcs: u32,
    pub(crate) plane_type: PlaneType,
    pub(crate) zpos: i32,
    pub(crate) props: PropertyTable<PlaneProperty>,
    pub(crate) layer: Option<LayerId>,
}

impl Plane {
    pub(crate) fn new(
        id: u32,
        possible_crtcs: u32,
        plane_type: PlaneType,
        zpos: i32,
        props: PropertyTable<PlaneProperty>,
    ) -> Self {
        Plane {
            id,
            possible_crtcs,
            plane_type,
            zpos,
            props,
            layer: None,
        }
    }

    /// The plane's DRM object id.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Bitmask of CRTC indices this plane may be routed through.
    pub fn possible_crtcs(&self) -> u32 {
        self.possible_crtcs
    }

    /// Primary, overlay, or cursor.
    pub fn plane_type(&self) -> PlaneType {
        self.plane_type
    }

    /// The plane's z-position, guessed at registration time if the kernel
    /// did not report one.
    pub fn zpos(&self) -> i32 {
        self.zpos
    }

    /// The layer currently bound to this plane, if any.
    pub fn layer(&self) -> Option<LayerId> {
        self.layer
    }

    pub(crate) fn accepts_crtc_index(&self, crtc_index: u32) -> bool {
        self.possible_crtcs & (1 << crtc_index) != 0
    }
}

/// Guesses a plane's z-position from its type when the kernel does not
/// expose a `zpos` property, mirroring the convention that primary planes
/// sit at the bottom and cursor planes at the top.
pub(crate) fn guess_zpos(plane_type: PlaneType, plane_id: u32, primary_id: u32) -> i32 {
    match plane_type {
        PlaneType::Primary => 0,
        PlaneType::Cursor => 2,
        PlaneType::Overlay => {
            if plane_id < primary_id {
                -1
            } else {
                1
            }
        }
    }
}
