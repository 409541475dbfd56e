//! The root object owning every plane, output and layer on one DRM card.

use std::os::fd::{AsFd, BorrowedFd, OwnedFd};

use indexmap::IndexMap;
use tracing::{debug, info, instrument};

use crate::alloc::run_search;
use crate::ids::IdAllocator;
use crate::layer::Layer;
use crate::output::Output;
use crate::plane::{guess_zpos, Plane, PlaneProperty, PlaneType};
use crate::property::PropertyTable;
use crate::request::{AtomicRequest, CommitFlags};
use crate::reuse::try_reuse;
use crate::{Error, LayerId, OutputId, PlaneId, Result};

/// Number of `apply_output` calls after which per-layer priority bumps roll
/// over into current priority.
pub const DEFAULT_PRIORITY_WINDOW: u64 = 60;

/// Owns the DRM file descriptor and every plane, output and layer registered
/// against it.
#[derive(Debug)]
pub struct Device {
    fd: OwnedFd,
    pub(crate) planes: IndexMap<PlaneId, Plane>,
    pub(crate) outputs: IndexMap<OutputId, Output>,
    pub(crate) layers: IndexMap<LayerId, Layer>,
    pub(crate) crtcs: Vec<u32>,
    ids: IdAllocator,
    pub(crate) page_flip_counter: u64,
    pub(crate) test_commit_counter: u64,
    priority_window: u64,
}

impl AsFd for Device {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

impl Device {
    /// Duplicates `fd` and wraps it in a fresh, plane-less `Device`.
    ///
    /// The caller retains ownership of `fd` and may keep using it; this
    /// crate never closes a descriptor it did not itself duplicate.
    pub fn new(fd: OwnedFd, crtcs: Vec<u32>) -> Result<Device> {
        let fd = fd.try_clone().map_err(Error::Request)?;
        Ok(Device {
            fd,
            planes: IndexMap::new(),
            outputs: IndexMap::new(),
            layers: IndexMap::new(),
            crtcs,
            ids: IdAllocator::default(),
            page_flip_counter: 0,
            test_commit_counter: 0,
            priority_window: DEFAULT_PRIORITY_WINDOW,
        })
    }

    /// Overrides the priority window (number of `apply_output` calls between
    /// rollovers). Tests use a small window to avoid iterating hundreds of
    /// times; production code typically keeps [`DEFAULT_PRIORITY_WINDOW`].
    pub fn set_priority_window(&mut self, window: u64) {
        self.priority_window = window.max(1);
    }

    /// The device's enumerated CRTC ids, in the order used to derive
    /// `crtc_index`.
    pub fn crtcs(&self) -> &[u32] {
        &self.crtcs
    }

    /// Total number of test-only atomic commits issued so far, across every
    /// output and every call to `apply_output`.
    pub fn test_commit_count(&self) -> u64 {
        self.test_commit_counter
    }

    /// Registers one plane's immutable identity and property table.
    ///
    /// `props` is `(name, drm_property_id, value, immutable)` for every
    /// property the kernel reports on this plane; it must include `type` and
    /// should include `zpos` when the hardware exposes one.
    pub fn register_plane(
        &mut self,
        plane_id: u32,
        possible_crtcs: u32,
        props: Vec<(String, u32, u64, bool)>,
    ) -> Result<PlaneId> {
        if self.planes.values().any(|p| p.id == plane_id) {
            return Err(Error::DuplicatePlane(plane_id));
        }

        let mut table = PropertyTable::new();
        let mut type_value = None;
        let mut zpos_value = None;
        for (name, id, value, immutable) in &props {
            table.insert(name, PlaneProperty { id: *id, immutable: *immutable });
            match name.as_str() {
                "type" => type_value = Some(*value),
                "zpos" => zpos_value = Some(*value as i32),
                _ => {}
            }
        }

        let plane_type = match type_value {
            Some(0) => PlaneType::Overlay,
            Some(1) => PlaneType::Primary,
            Some(2) => PlaneType::Cursor,
            _ => PlaneType::Overlay,
        };

        let primary_id = self
            .planes
            .values()
            .find(|p| p.plane_type == PlaneType::Primary)
            .map(|p| p.id)
            .unwrap_or(plane_id);
        let zpos = zpos_value.unwrap_or_else(|| guess_zpos(plane_type, plane_id, primary_id));

        let id = PlaneId(self.ids.next());
        let plane = Plane::new(plane_id, possible_crtcs, plane_type, zpos, table);
        insert_plane_sorted(&mut self.planes, id, plane);
        debug!(plane = plane_id, ?plane_type, zpos, "registered plane");
        Ok(id)
    }

    /// Unregisters a plane. A no-op if the id no longer resolves.
    pub fn unregister_plane(&mut self, plane: PlaneId) {
        if let Some(p) = self.planes.shift_remove(&plane) {
            if let Some(layer_id) = p.layer {
                if let Some(layer) = self.layers.get_mut(&layer_id) {
                    layer.plane = None;
                }
            }
        }
    }

    /// Creates an output bound to `crtc_id`, which must be one of this
    /// device's enumerated CRTCs.
    pub fn create_output(&mut self, crtc_id: u32) -> Result<OutputId> {
        let crtc_index = self
            .crtcs
            .iter()
            .position(|&c| c == crtc_id)
            .ok_or(Error::UnknownCrtc(crtc_id))? as u32;
        let id = OutputId(self.ids.next());
        self.outputs.insert(id, Output::new(crtc_id, crtc_index));
        Ok(id)
    }

    /// Destroys an output. Does not destroy its layers; the caller is
    /// responsible for destroying them first if desired.
    pub fn destroy_output(&mut self, output: OutputId) {
        self.outputs.shift_remove(&output);
    }

    /// Creates a layer on `output`.
    pub fn create_layer(&mut self, output: OutputId) -> Result<LayerId> {
        if !self.outputs.contains_key(&output) {
            return Err(Error::UnknownOutput(output));
        }
        let id = LayerId(self.ids.next());
        self.layers.insert(id, Layer::new(output));
        let out = self.outputs.get_mut(&output).unwrap();
        out.layers.insert(id, ());
        out.layers_changed = true;
        Ok(id)
    }

    /// Destroys a layer. A no-op if the id no longer resolves.
    pub fn destroy_layer(&mut self, layer: LayerId) {
        let Some(l) = self.layers.shift_remove(&layer) else {
            return;
        };
        if let Some(plane_id) = l.plane {
            if let Some(plane) = self.planes.get_mut(&plane_id) {
                plane.layer = None;
            }
        }
        if let Some(out) = self.outputs.get_mut(&l.output) {
            out.layers.shift_remove(&layer);
            if out.composition_layer == Some(layer) {
                out.composition_layer = None;
            }
            out.layers_changed = true;
        }
    }

    /// Sets a layer property. See [`Layer::set_property`] for the semantics.
    pub fn set_layer_property(&mut self, layer: LayerId, name: &str, value: u64) -> Result<()> {
        self.layers
            .get_mut(&layer)
            .ok_or(Error::UnknownLayer(layer))?
            .set_property(name, value)
    }

    /// Forces a layer to be composited by the caller's software compositor.
    pub fn set_layer_composited(&mut self, layer: LayerId) -> Result<()> {
        self.layers
            .get_mut(&layer)
            .ok_or(Error::UnknownLayer(layer))?
            .set_composited();
        Ok(())
    }

    /// Designates `layer` as `output`'s composition (GPU fallback) layer.
    /// `layer` must already belong to `output`.
    pub fn set_composition_layer(&mut self, output: OutputId, layer: LayerId) -> Result<()> {
        let out = self.outputs.get_mut(&output).ok_or(Error::UnknownOutput(output))?;
        if !out.layers.contains_key(&layer) {
            return Err(Error::LayerNotInOutput(layer, output));
        }
        if out.composition_layer != Some(layer) {
            out.composition_layer = Some(layer);
            out.layers_changed = true;
        }
        Ok(())
    }

    /// The plane currently bound to `layer`, if any.
    pub fn layer_plane(&self, layer: LayerId) -> Option<PlaneId> {
        self.layers.get(&layer).and_then(|l| l.plane)
    }

    /// Whether `layer` is visible but currently unassigned to a plane.
    pub fn layer_needs_composition(&self, layer: LayerId) -> bool {
        self.layers.get(&layer).map(|l| l.needs_composition()).unwrap_or(false)
    }

    /// Read-only access to a layer.
    pub fn layer(&self, layer: LayerId) -> Option<&Layer> {
        self.layers.get(&layer)
    }

    /// Read-only access to a plane.
    pub fn plane(&self, plane: PlaneId) -> Option<&crate::plane::Plane> {
        self.planes.get(&plane)
    }

    /// Read-only access to an output.
    pub fn output(&self, output: OutputId) -> Option<&Output> {
        self.outputs.get(&output)
    }

    /// The main per-frame entry point: reallocates (or replays) the plane
    /// bindings for `output` into `req`.
    #[instrument(skip(self, req), fields(output = output.0))]
    pub fn apply_output<R: AtomicRequest + ?Sized>(
        &mut self,
        output: OutputId,
        req: &mut R,
        flags: CommitFlags,
    ) -> Result<()> {
        if !self.outputs.contains_key(&output) {
            return Err(Error::UnknownOutput(output));
        }

        self.update_priorities();

        if try_reuse(self, output, req, flags)? {
            if let Some(out) = self.outputs.get_mut(&output) {
                out.alloc_reused_counter += 1;
            }
            info!("replayed previous allocation");
            return Ok(());
        }
        if let Some(out) = self.outputs.get_mut(&output) {
            out.alloc_reused_counter = 0;
        }

        self.unbind_output_planes(output, req)?;

        let best = run_search(self, output, req, flags)?;

        self.apply_best(output, &best, req)?;

        if let Some(out) = self.outputs.get_mut(&output) {
            out.layers_changed = false;
        }
        for layer in self.layer_ids_for(output) {
            self.layers.get_mut(&layer).unwrap().mark_clean();
        }

        Ok(())
    }

    fn update_priorities(&mut self) {
        self.page_flip_counter += 1;
        let elapsed = self.page_flip_counter >= self.priority_window;
        if elapsed {
            self.page_flip_counter = 0;
        }
        for layer in self.layers.values_mut() {
            layer.update_priority(elapsed);
        }
    }

    fn layer_ids_for(&self, output: OutputId) -> Vec<LayerId> {
        self.outputs
            .get(&output)
            .map(|o| o.layers.keys().copied().collect())
            .unwrap_or_default()
    }

    pub(crate) fn unbind_output_planes<R: AtomicRequest + ?Sized>(
        &mut self,
        output: OutputId,
        req: &mut R,
    ) -> Result<()> {
        let layers = &self.layers;
        let plane_ids: Vec<PlaneId> = self
            .planes
            .iter()
            .filter(|(_, p)| {
                p.layer
                    .and_then(|l| layers.get(&l))
                    .map(|l| l.output == output)
                    .unwrap_or(false)
            })
            .map(|(id, _)| *id)
            .collect();
        for id in plane_ids {
            let plane = self.planes.get_mut(&id).unwrap();
            crate::apply::apply_plane(plane, None, self.outputs.get(&output).unwrap(), req)?;
            plane.layer = None;
        }
        Ok(())
    }

    fn apply_best<R: AtomicRequest + ?Sized>(
        &mut self,
        output: OutputId,
        best: &IndexMap<PlaneId, Option<LayerId>>,
        req: &mut R,
    ) -> Result<()> {
        for (&plane_id, &layer_id) in best {
            let layer = layer_id.and_then(|l| self.layers.get(&l));
            let plane = self.planes.get(&plane_id).unwrap();
            let out = self.outputs.get(&output).unwrap();
            let outcome = crate::apply::apply_plane(plane, layer, out, req)?;
            if outcome == crate::apply::ApplyOutcome::Incompatible {
                return Err(Error::Invariant(
                    "search accepted an allocation the final applier rejected",
                ));
            }
            let plane = self.planes.get_mut(&plane_id).unwrap();
            plane.layer = layer_id;
            if let Some(l) = layer_id {
                self.layers.get_mut(&l).unwrap().plane = Some(plane_id);
            }
        }
        Ok(())
    }
}

/// Inserts `plane` into `planes` keeping all primary planes first (in
/// registration order), then non-primary planes in order of strictly
/// decreasing `zpos`, with equal-zpos non-primary planes kept in
/// registration order.
fn insert_plane_sorted(planes: &mut IndexMap<PlaneId, Plane>, id: PlaneId, plane: Plane) {
    let position = if plane.plane_type == PlaneType::Primary {
        planes.values().take_while(|p| p.plane_type == PlaneType::Primary).count()
    } else {
        let mut pos = planes.len();
        for (i, p) in planes.values().enumerate() {
            if p.plane_type != PlaneType::Primary && p.zpos < plane.zpos {
                pos = i;
                break;
            }
        }
        pos
    };
    planes.shift_insert(position, id, plane);
}
