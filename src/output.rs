//! A single CRTC's layer list and composition state.

use indexmap::IndexMap;

use crate::LayerId;

/// One display pipeline: a CRTC id, the ordered layers submitted to it, and
/// an optional composition (GPU fallback) layer.
#[derive(Debug)]
pub struct Output {
    pub(crate) crtc_id: u32,
    pub(crate) crtc_index: u32,
    pub(crate) layers: IndexMap<LayerId, ()>,
    pub(crate) composition_layer: Option<LayerId>,
    pub(crate) layers_changed: bool,
    pub(crate) alloc_reused_counter: u64,
}

impl Output {
    pub(crate) fn new(crtc_id: u32, crtc_index: u32) -> Self {
        Output {
            crtc_id,
            crtc_index,
            layers: IndexMap::new(),
            composition_layer: None,
            layers_changed: false,
            alloc_reused_counter: 0,
        }
    }

    /// The DRM CRTC object id this output drives.
    pub fn crtc_id(&self) -> u32 {
        self.crtc_id
    }

    /// The CRTC's index within the device's CRTC list, used to test a
    /// plane's `possible_crtcs` mask.
    pub fn crtc_index(&self) -> u32 {
        self.crtc_index
    }

    /// The output's layers, in registration order.
    pub fn layers(&self) -> impl Iterator<Item = LayerId> + '_ {
        self.layers.keys().copied()
    }

    /// The designated composition (GPU fallback) layer, if one is set.
    pub fn composition_layer(&self) -> Option<LayerId> {
        self.composition_layer
    }

    /// Number of times in a row the reuse cache has successfully replayed
    /// the previous allocation for this output.
    pub fn alloc_reused_counter(&self) -> u64 {
        self.alloc_reused_counter
    }
}
