//! Production [`AtomicRequest`] implementation and plane enumeration backed
//! by the `drm`/`drm-ffi` crates.

use drm::control::{atomic::AtomicModeReq, Device as ControlDevice};

use crate::request::{AtomicRequest, CommitFlags};
use crate::{Device, Result};

/// An atomic request accumulated as flat `(object, property, value)` triples
/// and flushed through `drm_ffi::mode::atomic_commit` on [`AtomicRequest::commit`].
///
/// `drm::control::atomic::AtomicModeReq` groups properties per object rather
/// than keeping one flat, truncatable list, so this type keeps its own flat
/// buffer and only builds an `AtomicModeReq` at commit time.
pub struct DrmAtomicRequest<'a, D: ControlDevice> {
    card: &'a D,
    entries: Vec<(u32, u32, u64)>,
}

impl<'a, D: ControlDevice> DrmAtomicRequest<'a, D> {
    /// Creates an empty request against `card`.
    pub fn new(card: &'a D) -> Self {
        DrmAtomicRequest {
            card,
            entries: Vec::new(),
        }
    }
}

impl<D: ControlDevice> AtomicRequest for DrmAtomicRequest<'_, D> {
    fn add_property(&mut self, object_id: u32, property_id: u32, value: u64) {
        self.entries.push((object_id, property_id, value));
    }

    fn cursor(&self) -> usize {
        self.entries.len()
    }

    fn set_cursor(&mut self, cursor: usize) {
        self.entries.truncate(cursor);
    }

    fn commit(&mut self, flags: CommitFlags) -> std::result::Result<(), i32> {
        let mut req = AtomicModeReq::new();
        for &(object_id, property_id, value) in &self.entries {
            req.add_raw_property(object_id, property_id, value);
        }

        let mut drm_flags = Vec::new();
        if flags.contains(CommitFlags::TEST_ONLY) {
            drm_flags.push(drm::control::AtomicCommitFlags::TestOnly);
        }
        if flags.contains(CommitFlags::ALLOW_MODESET) {
            drm_flags.push(drm::control::AtomicCommitFlags::AllowModeset);
        }
        if flags.contains(CommitFlags::PAGE_FLIP_EVENT) {
            drm_flags.push(drm::control::AtomicCommitFlags::PageFlipEvent);
        }

        self.card
            .atomic_commit(&drm_flags, req)
            .map_err(|e| -e.errno())
    }
}

/// Enumerates every plane compatible with any of `device`'s CRTCs and
/// registers it, along with its full property set.
pub fn register_all_planes<D: ControlDevice>(card: &D, device: &mut Device) -> Result<()> {
    let planes = card.plane_handles().map_err(to_request_error)?;
    for handle in planes.planes() {
        let info = card.get_plane(*handle).map_err(to_request_error)?;
        let props = card.get_properties(*handle).map_err(to_request_error)?;
        let (ids, values) = props.as_props_and_values();

        let mut table = Vec::with_capacity(ids.len());
        for (&prop_id, &value) in ids.iter().zip(values.iter()) {
            let prop_info = card.get_property(prop_id).map_err(to_request_error)?;
            let name = prop_info.name().to_string_lossy().into_owned();
            table.push((name, Into::<u32>::into(prop_id), value, !prop_info.mutable()));
        }

        device.register_plane((*handle).into(), info.possible_crtcs().bits(), table)?;
    }
    Ok(())
}

fn to_request_error(e: drm_ffi::result::SystemError) -> crate::Error {
    crate::Error::Request(std::io::Error::from_raw_os_error(-e.errno()))
}
