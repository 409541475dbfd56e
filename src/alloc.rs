//! Depth-first, pruned search over `(plane <- layer)` assignments.

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::apply::{apply_plane, ApplyOutcome};
use crate::device::Device;
use crate::layer::Layer;
use crate::output::Output;
use crate::plane::{Plane, PlaneType};
use crate::request::{test_commit, AtomicRequest, CommitFlags, CommitOutcome};
use crate::{Error, LayerId, OutputId, PlaneId, Result};

struct Ctx<'a> {
    plane_ids: Vec<PlaneId>,
    planes: Vec<&'a Plane>,
    layers: &'a IndexMap<LayerId, Layer>,
    candidates: Vec<LayerId>,
    composition_layer: Option<LayerId>,
    non_composition_visible: usize,
    output: &'a Output,
    flags: CommitFlags,
    best: Vec<Option<LayerId>>,
    best_score: i64,
    commits: u64,
}

/// Runs the search for `output` and returns the winning `(plane, layer)`
/// assignment, applying no side effects to `device` beyond the
/// `test_commit_counter`; the caller is responsible for writing the winning
/// allocation via the plane applier.
pub(crate) fn run_search<R: AtomicRequest + ?Sized>(
    device: &mut Device,
    output: OutputId,
    req: &mut R,
    flags: CommitFlags,
) -> Result<IndexMap<PlaneId, Option<LayerId>>> {
    let out = &device.outputs[&output];
    let crtc_index = out.crtc_index;
    let layers = &device.layers;

    let mut plane_ids = Vec::new();
    let mut planes = Vec::new();
    for (id, plane) in device.planes.iter() {
        if !plane.accepts_crtc_index(crtc_index) {
            continue;
        }
        let bound_elsewhere = plane
            .layer
            .and_then(|l| layers.get(&l))
            .map(|l| l.output != output)
            .unwrap_or(false);
        if bound_elsewhere {
            continue;
        }
        plane_ids.push(*id);
        planes.push(plane);
    }

    // Candidates ordered by descending current priority, ties broken by
    // registration order: sort_by is stable so it preserves the latter.
    let mut candidates: Vec<LayerId> = out.layers().collect();
    candidates.sort_by(|a, b| layers[b].current_priority.cmp(&layers[a].current_priority));

    let composition_layer = out.composition_layer;
    let non_composition_visible = candidates
        .iter()
        .filter(|&&id| Some(id) != composition_layer)
        .filter(|&&id| layers[&id].is_visible() && !layers[&id].force_composition)
        .count();

    let plane_count = plane_ids.len();
    let mut ctx = Ctx {
        plane_ids,
        planes,
        layers,
        candidates,
        composition_layer,
        non_composition_visible,
        output: out,
        flags,
        best: vec![None; plane_count],
        best_score: -1,
        commits: 0,
    };

    let mut alloc = vec![None; plane_count];
    search(&mut ctx, req, 0, &mut alloc, 0, i64::MAX, false)?;

    debug!(
        test_commits = ctx.commits,
        best_score = ctx.best_score,
        "search finished"
    );
    device.test_commit_counter += ctx.commits;

    let mut result = IndexMap::new();
    for (id, layer) in ctx.plane_ids.iter().zip(ctx.best.iter()) {
        result.insert(*id, *layer);
    }
    Ok(result)
}

#[allow(clippy::too_many_arguments)]
fn search<R: AtomicRequest + ?Sized>(
    ctx: &mut Ctx,
    req: &mut R,
    plane_idx: usize,
    alloc: &mut Vec<Option<LayerId>>,
    score: i64,
    last_layer_zpos: i64,
    composited: bool,
) -> Result<()> {
    if plane_idx == ctx.plane_ids.len() {
        record_if_valid(ctx, alloc, score, composited);
        return Ok(());
    }

    let remaining = (ctx.plane_ids.len() - plane_idx) as i64;
    if ctx.best_score >= score + remaining {
        return Ok(());
    }

    let plane = ctx.planes[plane_idx];
    let candidates = ctx.candidates.clone();
    for candidate_id in candidates {
        let candidate = &ctx.layers[&candidate_id];
        if !candidate_compatible(ctx, alloc, plane_idx, plane, candidate_id, candidate, last_layer_zpos) {
            continue;
        }

        let mark = req.cursor();
        let outcome = apply_plane(plane, Some(candidate), ctx.output, req)?;
        if outcome == ApplyOutcome::Incompatible {
            continue;
        }

        match test_commit(req, ctx.flags) {
            CommitOutcome::Ok => {
                ctx.commits += 1;
                let is_composition = Some(candidate_id) == ctx.composition_layer;
                let new_score = if is_composition { score } else { score + 1 };
                let new_composited = composited || is_composition;
                let new_last_zpos = if plane.plane_type() != PlaneType::Primary {
                    candidate.zpos().unwrap_or(last_layer_zpos)
                } else {
                    last_layer_zpos
                };

                alloc[plane_idx] = Some(candidate_id);
                search(ctx, req, plane_idx + 1, alloc, new_score, new_last_zpos, new_composited)?;
                alloc[plane_idx] = None;
            }
            CommitOutcome::Prune => {
                ctx.commits += 1;
            }
            CommitOutcome::Error(e) => {
                req.set_cursor(mark);
                return Err(Error::Commit(e));
            }
        }
        req.set_cursor(mark);
    }

    // Always also explore leaving this plane unused.
    search(ctx, req, plane_idx + 1, alloc, score, last_layer_zpos, composited)
}

fn record_if_valid(ctx: &mut Ctx, alloc: &[Option<LayerId>], score: i64, composited: bool) {
    if ctx.composition_layer.is_some() && !composited && score < ctx.non_composition_visible as i64 {
        return;
    }
    if composited && score == ctx.non_composition_visible as i64 {
        return;
    }
    if score > ctx.best_score {
        trace!(score, "new best allocation");
        ctx.best_score = score;
        ctx.best.copy_from_slice(alloc);
    }
}

#[allow(clippy::too_many_arguments)]
fn candidate_compatible(
    ctx: &Ctx,
    alloc: &[Option<LayerId>],
    plane_idx: usize,
    plane: &Plane,
    candidate_id: LayerId,
    candidate: &Layer,
    last_layer_zpos: i64,
) -> bool {
    if alloc[..plane_idx].contains(&Some(candidate_id)) {
        return false;
    }
    if candidate.force_composition || !candidate.is_visible() {
        return false;
    }

    if plane.plane_type() == PlaneType::Primary {
        return true;
    }

    if Some(candidate_id) == ctx.composition_layer {
        return false;
    }

    if let Some(cz) = candidate.zpos() {
        if cz > last_layer_zpos && has_allocated_layer_under(ctx, alloc, plane_idx, cz, candidate) {
            return false;
        }
        if cz < last_layer_zpos
            && has_allocated_plane_under_with_intersection(ctx, alloc, plane_idx, plane.zpos(), candidate)
        {
            return false;
        }
    }

    if has_unallocated_layer_over(ctx, alloc, plane_idx, candidate_id, candidate) {
        return false;
    }

    true
}

fn has_allocated_layer_under(
    ctx: &Ctx,
    alloc: &[Option<LayerId>],
    plane_idx: usize,
    candidate_zpos: i64,
    candidate: &Layer,
) -> bool {
    for i in 0..plane_idx {
        let Some(lid) = alloc[i] else { continue };
        if ctx.planes[i].plane_type() == PlaneType::Primary {
            continue;
        }
        let m = &ctx.layers[&lid];
        if let Some(mz) = m.zpos() {
            if mz < candidate_zpos && m.rect().intersects(&candidate.rect()) {
                return true;
            }
        }
    }
    false
}

fn has_allocated_plane_under_with_intersection(
    ctx: &Ctx,
    alloc: &[Option<LayerId>],
    plane_idx: usize,
    current_plane_zpos: i32,
    candidate: &Layer,
) -> bool {
    for i in 0..plane_idx {
        let Some(lid) = alloc[i] else { continue };
        let p = ctx.planes[i];
        if p.plane_type() == PlaneType::Primary {
            continue;
        }
        if p.zpos() <= current_plane_zpos {
            let m = &ctx.layers[&lid];
            if m.rect().intersects(&candidate.rect()) {
                return true;
            }
        }
    }
    false
}

fn has_unallocated_layer_over(
    ctx: &Ctx,
    alloc: &[Option<LayerId>],
    plane_idx: usize,
    candidate_id: LayerId,
    candidate: &Layer,
) -> bool {
    let Some(cz) = candidate.zpos() else {
        return false;
    };
    for &other_id in &ctx.candidates {
        if other_id == candidate_id || alloc[..plane_idx].contains(&Some(other_id)) {
            continue;
        }
        let other = &ctx.layers[&other_id];
        if other.force_composition || !other.is_visible() {
            continue;
        }
        if let Some(oz) = other.zpos() {
            if oz > cz && other.rect().intersects(&candidate.rect()) {
                return true;
            }
        }
    }
    false
}
