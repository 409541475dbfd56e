//! Abstraction over the kernel atomic-commit request builder.
//!
//! The engine never talks to `/dev/dri/cardN` directly: it is generic over
//! any [`AtomicRequest`] implementation, so the same search code runs against
//! a real `drm`/`drm-ffi`-backed request in production and against the
//! in-memory mock in `mock` during tests.

use bitflags::bitflags;

bitflags! {
    /// Flags accompanying an atomic commit, mirroring the kernel's
    /// `DRM_MODE_ATOMIC_*` bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CommitFlags: u32 {
        /// Validate only; never applied to hardware.
        const TEST_ONLY = 1 << 0;
        /// Permit a modeset as part of this commit.
        const ALLOW_MODESET = 1 << 1;
        /// Request a page-flip completion event.
        const PAGE_FLIP_EVENT = 1 << 2;
    }
}

/// An append-only builder for one atomic-commit property set, plus the
/// mark/restore cursor the search uses to discard a rejected branch and the
/// commit operation itself.
///
/// Implementors only need to guarantee that `set_cursor` truncates the
/// property list back to what it was when `cursor` returned the given value;
/// the engine never re-reads already-appended properties.
pub trait AtomicRequest {
    /// Appends one `(object, property, value)` triple to the request.
    fn add_property(&mut self, object_id: u32, property_id: u32, value: u64);

    /// Returns an opaque mark for the request's current length.
    fn cursor(&self) -> usize;

    /// Truncates the request back to a mark previously returned by
    /// [`Self::cursor`].
    fn set_cursor(&mut self, cursor: usize);

    /// Submits the accumulated properties to the kernel (or the mock).
    ///
    /// Returns `Ok(())` on success, or `Err(errno)` with a negative errno
    /// value on failure, matching `libdrm`'s convention.
    fn commit(&mut self, flags: CommitFlags) -> std::result::Result<(), i32>;
}

/// The outcome of a single test commit, already classified into the three
/// kernel-response buckets the search and reuse cache react to.
#[derive(Debug, Clone, Copy)]
pub(crate) enum CommitOutcome {
    Ok,
    Prune,
    Error(i32),
}

/// Issues a test-only commit, retrying transparently on `EINTR`/`EAGAIN` and
/// classifying `EINVAL`/`ERANGE`/`ENOSPC` as a prune signal rather than an
/// error.
pub(crate) fn test_commit<R: AtomicRequest + ?Sized>(req: &mut R, flags: CommitFlags) -> CommitOutcome {
    let flags = (flags & !CommitFlags::PAGE_FLIP_EVENT) | CommitFlags::TEST_ONLY;
    loop {
        match req.commit(flags) {
            Ok(()) => return CommitOutcome::Ok,
            Err(errno) => {
                let e = errno.unsigned_abs() as i32;
                if e == libc::EINTR || e == libc::EAGAIN {
                    continue;
                }
                if e == libc::EINVAL || e == libc::ERANGE || e == libc::ENOSPC {
                    return CommitOutcome::Prune;
                }
                return CommitOutcome::Error(errno);
            }
        }
    }
}
