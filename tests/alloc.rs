mod support;

use liftkms::mock::MockCard;
use liftkms::{CommitFlags, Device, PlaneType};

use support::{dummy_fd, set_rect};

#[test]
fn single_layer_goes_to_primary_plane() {
    support::init_logging();
    let card = MockCard::new();
    let primary = card.create_plane(PlaneType::Primary);
    card.add_compatible_layer(primary, 1);

    let mut device = Device::new(dummy_fd(), vec![card.crtc_id()]).unwrap();
    card.register_all(&mut device).unwrap();
    let output = device.create_output(card.crtc_id()).unwrap();

    let layer = device.create_layer(output).unwrap();
    let fb = card.create_fb(1);
    device.set_layer_property(layer, "FB_ID", fb as u64).unwrap();
    set_rect(&mut device, layer, 0, 0, 1920, 1080);

    let mut req = card.new_request();
    device.apply_output(output, &mut req, CommitFlags::empty()).unwrap();

    assert_eq!(card.plane_layer_tag(primary, &req), Some(1));
    assert!(device.layer_plane(layer).is_some());
    assert!(!device.layer_needs_composition(layer));
}

#[test]
fn two_non_overlapping_layers_use_primary_and_overlay() {
    let card = MockCard::new();
    let primary = card.create_plane(PlaneType::Primary);
    card.add_compatible_layer(primary, 1);
    let overlay = card.create_plane(PlaneType::Overlay);
    card.add_property(overlay, "zpos", 1, false);
    card.add_compatible_layer(overlay, 2);

    let mut device = Device::new(dummy_fd(), vec![card.crtc_id()]).unwrap();
    card.register_all(&mut device).unwrap();
    let output = device.create_output(card.crtc_id()).unwrap();

    let background = device.create_layer(output).unwrap();
    let fb1 = card.create_fb(1);
    device.set_layer_property(background, "FB_ID", fb1 as u64).unwrap();
    set_rect(&mut device, background, 0, 0, 1920, 1080);

    let cursor_like = device.create_layer(output).unwrap();
    let fb2 = card.create_fb(2);
    device.set_layer_property(cursor_like, "FB_ID", fb2 as u64).unwrap();
    device.set_layer_property(cursor_like, "zpos", 1).unwrap();
    set_rect(&mut device, cursor_like, 100, 100, 32, 32);

    let mut req = card.new_request();
    device.apply_output(output, &mut req, CommitFlags::empty()).unwrap();

    assert_eq!(card.plane_layer_tag(primary, &req), Some(1));
    assert_eq!(card.plane_layer_tag(overlay, &req), Some(2));
    assert!(!device.layer_needs_composition(background));
    assert!(!device.layer_needs_composition(cursor_like));
}

#[test]
fn excess_layer_falls_back_to_composition() {
    let card = MockCard::new();
    let primary = card.create_plane(PlaneType::Primary);
    card.add_compatible_layer(primary, 1);
    card.add_compatible_layer(primary, 2);

    let mut device = Device::new(dummy_fd(), vec![card.crtc_id()]).unwrap();
    card.register_all(&mut device).unwrap();
    let output = device.create_output(card.crtc_id()).unwrap();

    let background = device.create_layer(output).unwrap();
    let fb1 = card.create_fb(1);
    device.set_layer_property(background, "FB_ID", fb1 as u64).unwrap();
    set_rect(&mut device, background, 0, 0, 1920, 1080);
    device.set_composition_layer(output, background).unwrap();

    let overlay_layer = device.create_layer(output).unwrap();
    let fb2 = card.create_fb(2);
    device.set_layer_property(overlay_layer, "FB_ID", fb2 as u64).unwrap();
    set_rect(&mut device, overlay_layer, 0, 0, 1920, 1080);

    let mut req = card.new_request();
    device.apply_output(output, &mut req, CommitFlags::empty()).unwrap();

    // Only one plane exists; the non-composition layer wins it and the
    // composition layer is left for the caller's software compositor.
    assert_eq!(card.plane_layer_tag(primary, &req), Some(2));
    assert!(device.layer_needs_composition(background));
    assert!(!device.layer_needs_composition(overlay_layer));
}

#[test]
fn overlapping_layers_respect_zpos_stacking() {
    let card = MockCard::new();
    let primary = card.create_plane(PlaneType::Primary);
    card.add_compatible_layer(primary, 1);
    let overlay = card.create_plane(PlaneType::Overlay);
    card.add_property(overlay, "zpos", 1, false);
    card.add_compatible_layer(overlay, 2);

    let mut device = Device::new(dummy_fd(), vec![card.crtc_id()]).unwrap();
    card.register_all(&mut device).unwrap();
    let output = device.create_output(card.crtc_id()).unwrap();

    let bottom = device.create_layer(output).unwrap();
    let fb1 = card.create_fb(1);
    device.set_layer_property(bottom, "FB_ID", fb1 as u64).unwrap();
    set_rect(&mut device, bottom, 0, 0, 1920, 1080);

    let top = device.create_layer(output).unwrap();
    let fb2 = card.create_fb(2);
    device.set_layer_property(top, "FB_ID", fb2 as u64).unwrap();
    device.set_layer_property(top, "zpos", 5).unwrap();
    set_rect(&mut device, top, 500, 500, 200, 200);

    let mut req = card.new_request();
    device.apply_output(output, &mut req, CommitFlags::empty()).unwrap();

    // `top` has the higher zpos and overlaps `bottom`; the overlay plane
    // (registered above the primary) must carry it, not the other way
    // around.
    assert_eq!(card.plane_layer_tag(overlay, &req), Some(2));
    assert_eq!(card.plane_layer_tag(primary, &req), Some(1));
}
