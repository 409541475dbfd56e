//! Replays the previous allocation with a single test commit when nothing
//! relevant has changed, avoiding a full search.

use tracing::debug;

use crate::apply::{apply_plane, ApplyOutcome};
use crate::device::Device;
use crate::request::{test_commit, AtomicRequest, CommitFlags, CommitOutcome};
use crate::{Error, OutputId, Result};

/// Attempts to replay `output`'s previous allocation. Returns `Ok(true)` if
/// it was accepted by a single test commit, `Ok(false)` if a full search is
/// required.
pub(crate) fn try_reuse<R: AtomicRequest + ?Sized>(
    device: &mut Device,
    output: OutputId,
    req: &mut R,
    flags: CommitFlags,
) -> Result<bool> {
    let out = &device.outputs[&output];
    if out.layers_changed {
        return Ok(false);
    }
    for layer_id in out.layers() {
        if device.layers[&layer_id].needs_realloc() {
            return Ok(false);
        }
    }

    let crtc_index = out.crtc_index;
    let layers = &device.layers;
    let mark = req.cursor();

    for plane in device.planes.values() {
        if !plane.accepts_crtc_index(crtc_index) {
            continue;
        }
        let belongs = plane
            .layer
            .map(|l| layers.get(&l).map(|ly| ly.output) == Some(Some(output)))
            .unwrap_or(true);
        if !belongs {
            continue;
        }
        let layer = plane.layer.and_then(|l| layers.get(&l));
        let outcome = apply_plane(plane, layer, out, req)?;
        if outcome == ApplyOutcome::Incompatible {
            return Err(Error::Invariant(
                "previous allocation is no longer compatible with its plane",
            ));
        }
    }

    match test_commit(req, flags) {
        CommitOutcome::Ok => {
            device.test_commit_counter += 1;
            debug!("reuse cache hit");
            Ok(true)
        }
        CommitOutcome::Prune => {
            req.set_cursor(mark);
            device.test_commit_counter += 1;
            Ok(false)
        }
        CommitOutcome::Error(e) => {
            req.set_cursor(mark);
            Err(Error::Commit(e))
        }
    }
}
