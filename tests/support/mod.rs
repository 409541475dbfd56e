//! Shared fixtures for the integration tests: a throwaway file descriptor
//! (the mock never issues real ioctls against it) and small helpers for
//! building a visible layer's geometry.

use std::os::fd::OwnedFd;
use std::sync::Once;

use liftkms::{CommitFlags, Device, LayerId};

static LOGGING: Once = Once::new();

/// Installs a `tracing` subscriber once per test binary, honoring `RUST_LOG`
/// so a failing test can be re-run with e.g. `RUST_LOG=liftkms=trace` to see
/// the search's per-candidate decisions.
#[allow(dead_code)]
pub fn init_logging() {
    LOGGING.call_once(|| {
        let subscriber = tracing_subscriber::fmt().with_test_writer().compact();
        match tracing_subscriber::EnvFilter::try_from_default_env() {
            Ok(filter) => subscriber.with_env_filter(filter).init(),
            Err(_) => subscriber.init(),
        }
    });
}

pub fn dummy_fd() -> OwnedFd {
    std::fs::File::open("/dev/null")
        .expect("open /dev/null")
        .into()
}

pub fn set_rect(device: &mut Device, layer: LayerId, x: u64, y: u64, w: u64, h: u64) {
    device.set_layer_property(layer, "CRTC_X", x).unwrap();
    device.set_layer_property(layer, "CRTC_Y", y).unwrap();
    device.set_layer_property(layer, "CRTC_W", w).unwrap();
    device.set_layer_property(layer, "CRTC_H", h).unwrap();
    device.set_layer_property(layer, "SRC_X", 0).unwrap();
    device.set_layer_property(layer, "SRC_Y", 0).unwrap();
    device.set_layer_property(layer, "SRC_W", w << 16).unwrap();
    device.set_layer_property(layer, "SRC_H", h << 16).unwrap();
}

#[allow(dead_code)]
pub const NO_FLAGS: CommitFlags = CommitFlags::empty();
