//! Virtual scanout units the engine tries to map onto hardware planes.

use crate::property::{CoreProperty, PropertyTable};
use crate::rect::Rect;
use crate::{Error, OutputId, PlaneId, Result};

/// A single property value on a layer, together with the value it held as of
/// the last successful apply.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayerProperty {
    /// The current value.
    pub value: u64,
    /// The value as of the last `mark_clean`.
    pub previous_value: u64,
}

/// A user-submitted virtual plane: a bag of DRM-style properties the engine
/// tries to scan out directly, falling back to GPU composition when it
/// cannot.
#[derive(Debug)]
pub struct Layer {
    pub(crate) output: OutputId,
    pub(crate) props: PropertyTable<LayerProperty>,
    pub(crate) force_composition: bool,
    pub(crate) plane: Option<PlaneId>,
    pub(crate) changed: bool,
    pub(crate) current_priority: u64,
    pub(crate) pending_priority: u64,
}

impl Layer {
    pub(crate) fn new(output: OutputId) -> Self {
        Layer {
            output,
            props: PropertyTable::new(),
            force_composition: false,
            plane: None,
            changed: false,
            current_priority: 0,
            pending_priority: 0,
        }
    }

    /// The output this layer belongs to.
    pub fn output(&self) -> OutputId {
        self.output
    }

    /// The plane bound to this layer after the most recent successful
    /// `apply_output`, if any.
    pub fn plane(&self) -> Option<PlaneId> {
        self.plane
    }

    /// Sets a property by name. `CRTC_ID` is reserved: the engine derives it
    /// from the layer's output and rejects attempts to set it directly.
    /// Setting `FB_ID` implicitly clears `force_composition`.
    pub fn set_property(&mut self, name: &str, value: u64) -> Result<()> {
        if name == CoreProperty::CrtcId.name() {
            return Err(Error::ReservedProperty);
        }

        let previous = self.props.get(name).map(|p| p.value);
        match previous {
            Some(_) => {
                self.props.get_mut(name).unwrap().value = value;
            }
            None => {
                self.props.insert(
                    name,
                    LayerProperty {
                        value,
                        previous_value: 0,
                    },
                );
                self.changed = true;
            }
        }

        if name == CoreProperty::FbId.name() {
            self.force_composition = false;
        }

        Ok(())
    }

    /// Forces this layer to be composited: sets `force_composition`, zeroes
    /// `FB_ID`, and marks the layer changed.
    pub fn set_composited(&mut self) {
        self.force_composition = true;
        let _ = self.set_property(CoreProperty::FbId.name(), 0);
        self.changed = true;
    }

    /// The raw value of a property, by name or well-known identity.
    pub fn get_property(&self, name: &str) -> Option<u64> {
        self.props.get(name).map(|p| p.value)
    }

    pub(crate) fn get_core(&self, core: CoreProperty) -> Option<u64> {
        self.props.get_core(core).map(|p| p.value)
    }

    /// Whether this layer currently carries a non-zero framebuffer and is
    /// not fully transparent; invisible layers are never search candidates.
    pub fn is_visible(&self) -> bool {
        let fb_id = self.get_core(CoreProperty::FbId).unwrap_or(0);
        if fb_id == 0 {
            return false;
        }
        let alpha = self.get_core(CoreProperty::Alpha);
        !matches!(alpha, Some(0))
    }

    /// Whether this layer is visible but currently unassigned to any plane,
    /// i.e. it will be drawn by the software compositor this frame.
    pub fn needs_composition(&self) -> bool {
        self.is_visible() && self.plane.is_none()
    }

    /// The layer's `zpos` property, if it set one.
    pub fn zpos(&self) -> Option<i64> {
        self.get_core(CoreProperty::Zpos).map(|v| v as i64)
    }

    /// The layer's on-screen rectangle, from `CRTC_X/Y/W/H`, defaulting
    /// missing components to `0`.
    pub fn rect(&self) -> Rect {
        Rect {
            x: self.get_core(CoreProperty::CrtcX).unwrap_or(0) as i64,
            y: self.get_core(CoreProperty::CrtcY).unwrap_or(0) as i64,
            width: self.get_core(CoreProperty::CrtcW).unwrap_or(0) as i64,
            height: self.get_core(CoreProperty::CrtcH).unwrap_or(0) as i64,
        }
    }

    /// Whether this layer needs the engine to re-run the full search rather
    /// than replay the previous allocation, per the reuse cache's rules.
    pub(crate) fn needs_realloc(&self) -> bool {
        if self.changed {
            return true;
        }
        for (name, prop) in self.props.iter() {
            if prop.value == prop.previous_value {
                continue;
            }
            match CoreProperty::from_name(name) {
                Some(CoreProperty::FbId) => {
                    let was_zero = prop.previous_value == 0;
                    let is_zero = prop.value == 0;
                    if was_zero != is_zero {
                        return true;
                    }
                }
                Some(CoreProperty::Alpha) => {
                    let crosses = |v: u64| v == 0 || v == 0xFFFF;
                    if crosses(prop.value) || crosses(prop.previous_value) {
                        return true;
                    }
                }
                Some(CoreProperty::InFenceFd) | Some(CoreProperty::FbDamageClips) => {}
                _ => return true,
            }
        }
        false
    }

    /// Rolls `pending_priority` (bumped whenever `FB_ID` changes) into
    /// `current_priority` when the priority window elapses.
    pub(crate) fn update_priority(&mut self, window_elapsed: bool) {
        let fb = self.props.get_core(CoreProperty::FbId);
        if let Some(p) = fb {
            if p.value != p.previous_value {
                self.pending_priority += 1;
            }
        }
        if window_elapsed {
            self.current_priority = self.pending_priority;
            self.pending_priority = 0;
        }
    }

    /// Copies every property's current value into `previous_value` and
    /// clears the `changed` flag, as done after a successful apply.
    pub(crate) fn mark_clean(&mut self) {
        self.changed = false;
        for (_, prop) in self.props.iter_mut() {
            prop.previous_value = prop.value;
        }
    }
}
