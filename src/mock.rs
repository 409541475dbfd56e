//! An in-memory DRM/KMS atomic-commit oracle for tests.
//!
//! Mirrors the reference test suite's mock: plane, property and framebuffer
//! ids are synthesized from fixed ranges, and a commit is accepted only if
//! every plane's `FB_ID`/`CRTC_ID` pair is consistent and the framebuffer's
//! originating layer is on that plane's compatible-layers allow-list.

use std::cell::RefCell;
use std::rc::Rc;

use crate::plane::PlaneType;
use crate::request::{AtomicRequest, CommitFlags};
use crate::{Device, Result};

const PLANE_ID_BASE: u32 = 0xEE00_0000;
const FB_ID_BASE: u32 = 0xFB00_0000;
const PROP_ID_BASE: u32 = 0xB000_0000;
const CRTC_ID: u32 = 0xCC00_0000;

const BASE_PROPS: &[&str] = &[
    "type", "FB_ID", "CRTC_ID", "CRTC_X", "CRTC_Y", "CRTC_W", "CRTC_H", "SRC_X", "SRC_Y", "SRC_W",
    "SRC_H",
];

/// Opaque handle to a plane created on a [`MockCard`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockPlaneHandle(u32);

struct MockPlane {
    id: u32,
    plane_type: PlaneType,
    possible_crtcs: u32,
    props: Vec<(String, u64, bool)>,
    compatible_layers: Vec<u64>,
}

struct MockState {
    planes: Vec<MockPlane>,
    prop_names: Vec<String>,
    fbs: Vec<u64>,
    commit_count: u64,
}

impl MockState {
    fn prop_id(&mut self, name: &str) -> u32 {
        if let Some(i) = self.prop_names.iter().position(|n| n == name) {
            return PROP_ID_BASE + i as u32;
        }
        self.prop_names.push(name.to_string());
        PROP_ID_BASE + (self.prop_names.len() - 1) as u32
    }
}

/// A mock DRM card exposing one CRTC and a caller-populated set of planes.
#[derive(Clone)]
pub struct MockCard {
    state: Rc<RefCell<MockState>>,
}

impl Default for MockCard {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCard {
    /// Creates a mock card with no planes registered yet.
    pub fn new() -> Self {
        MockCard {
            state: Rc::new(RefCell::new(MockState {
                planes: Vec::new(),
                prop_names: Vec::new(),
                fbs: Vec::new(),
                commit_count: 0,
            })),
        }
    }

    /// The mock's single CRTC id.
    pub fn crtc_id(&self) -> u32 {
        CRTC_ID
    }

    /// Number of atomic commits (test or real) the mock has validated.
    pub fn commit_count(&self) -> u64 {
        self.state.borrow().commit_count
    }

    /// Creates a plane exposing the base set of properties every real plane
    /// reports (`type`, `FB_ID`, `CRTC_ID`, geometry); callers add anything
    /// else (`zpos`, `alpha`, `rotation`, ...) via [`Self::add_property`].
    pub fn create_plane(&self, plane_type: PlaneType) -> MockPlaneHandle {
        let mut state = self.state.borrow_mut();
        let id = PLANE_ID_BASE + state.planes.len() as u32;
        let type_value = match plane_type {
            PlaneType::Overlay => 0,
            PlaneType::Primary => 1,
            PlaneType::Cursor => 2,
        };
        for name in BASE_PROPS {
            state.prop_id(name);
        }
        state.planes.push(MockPlane {
            id,
            plane_type,
            possible_crtcs: 1,
            props: vec![("type".to_string(), type_value, true)],
            compatible_layers: Vec::new(),
        });
        MockPlaneHandle(id)
    }

    /// Adds a non-base property to a plane, e.g. `zpos` or `alpha`.
    pub fn add_property(&self, plane: MockPlaneHandle, name: &str, value: u64, immutable: bool) {
        let mut state = self.state.borrow_mut();
        state.prop_id(name);
        let plane = find_plane_mut(&mut state, plane);
        plane.props.push((name.to_string(), value, immutable));
    }

    /// Allows `layer_tag` to be assigned to `plane` during validation.
    pub fn add_compatible_layer(&self, plane: MockPlaneHandle, layer_tag: u64) {
        let mut state = self.state.borrow_mut();
        let plane = find_plane_mut(&mut state, plane);
        plane.compatible_layers.push(layer_tag);
    }

    /// Creates a framebuffer id tagged with an opaque `layer_tag` (typically
    /// the layer's id, used only to check compatible-layer membership).
    pub fn create_fb(&self, layer_tag: u64) -> u32 {
        let mut state = self.state.borrow_mut();
        let idx = state.fbs.len();
        state.fbs.push(layer_tag);
        FB_ID_BASE + idx as u32
    }

    /// Builds a fresh, empty request against this card.
    pub fn new_request(&self) -> MockRequest {
        MockRequest {
            state: self.state.clone(),
            props: Vec::new(),
        }
    }

    /// Registers every plane created so far onto `device`, in creation
    /// order; `device.register_plane` re-sorts them by type and z-position.
    pub fn register_all(&self, device: &mut Device) -> Result<()> {
        let state = self.state.borrow();
        for plane in &state.planes {
            let mut props = Vec::new();
            for name in BASE_PROPS {
                let id = PROP_ID_BASE
                    + state.prop_names.iter().position(|n| n == name).unwrap() as u32;
                let value = plane
                    .props
                    .iter()
                    .find(|(n, _, _)| n == name)
                    .map(|(_, v, _)| *v)
                    .unwrap_or(0);
                let immutable = plane
                    .props
                    .iter()
                    .find(|(n, _, _)| n == name)
                    .map(|(_, _, im)| *im)
                    .unwrap_or(false);
                props.push((name.to_string(), id, value, immutable));
            }
            for (name, value, immutable) in &plane.props {
                if BASE_PROPS.contains(&name.as_str()) {
                    continue;
                }
                let id =
                    PROP_ID_BASE + state.prop_names.iter().position(|n| n == name).unwrap() as u32;
                props.push((name.clone(), id, *value, *immutable));
            }
            device.register_plane(plane.id, plane.possible_crtcs, props)?;
        }
        Ok(())
    }

    /// Resolves which layer tag (if any) is bound to `plane` in `req`, by
    /// looking up the last-written `FB_ID` for that plane and mapping it
    /// back to the tag passed to [`Self::create_fb`].
    pub fn plane_layer_tag(&self, plane: MockPlaneHandle, req: &MockRequest) -> Option<u64> {
        let state = self.state.borrow();
        let fb_prop = PROP_ID_BASE + state.prop_names.iter().position(|n| n == "FB_ID")? as u32;
        let fb_id = req
            .props
            .iter()
            .rev()
            .find(|(obj, prop, _)| *obj == plane.0 && *prop == fb_prop)
            .map(|(_, _, v)| *v)?;
        if fb_id == 0 {
            return None;
        }
        let idx = (fb_id - FB_ID_BASE) as usize;
        state.fbs.get(idx).copied()
    }
}

fn find_plane_mut(state: &mut MockState, handle: MockPlaneHandle) -> &mut MockPlane {
    state
        .planes
        .iter_mut()
        .find(|p| p.id == handle.0)
        .expect("mock plane handle from a different MockCard")
}

/// An atomic request backed by [`MockCard`].
pub struct MockRequest {
    state: Rc<RefCell<MockState>>,
    props: Vec<(u32, u32, u64)>,
}

impl AtomicRequest for MockRequest {
    fn add_property(&mut self, object_id: u32, property_id: u32, value: u64) {
        self.props.push((object_id, property_id, value));
    }

    fn cursor(&self) -> usize {
        self.props.len()
    }

    fn set_cursor(&mut self, cursor: usize) {
        self.props.truncate(cursor);
    }

    fn commit(&mut self, _flags: CommitFlags) -> std::result::Result<(), i32> {
        let mut state = self.state.borrow_mut();
        state.commit_count += 1;

        let fb_prop = state.prop_id("FB_ID");
        let crtc_prop = state.prop_id("CRTC_ID");

        for plane in &state.planes {
            let fb_id = self.last_value(plane.id, fb_prop);
            let crtc_id = self.last_value(plane.id, crtc_prop);
            let has_fb = fb_id.map(|v| v != 0).unwrap_or(false);
            let has_crtc = crtc_id.map(|v| v != 0).unwrap_or(false);
            if has_fb != has_crtc {
                return Err(-libc::EINVAL);
            }
            if !has_fb {
                continue;
            }
            if crtc_id != Some(CRTC_ID as u64) {
                return Err(-libc::EINVAL);
            }
            let idx = (fb_id.unwrap() - FB_ID_BASE as u64) as usize;
            let Some(&tag) = state.fbs.get(idx) else {
                return Err(-libc::EINVAL);
            };
            if !plane.compatible_layers.contains(&tag) {
                return Err(-libc::EINVAL);
            }
        }

        Ok(())
    }
}

impl MockRequest {
    fn last_value(&self, object_id: u32, property_id: u32) -> Option<u64> {
        self.props
            .iter()
            .rev()
            .find(|(obj, prop, _)| *obj == object_id && *prop == property_id)
            .map(|(_, _, v)| *v)
    }
}
