mod support;

use liftkms::mock::MockCard;
use liftkms::{CommitFlags, Device, PlaneType};

use support::{dummy_fd, set_rect};

#[test]
fn opaque_alpha_is_omitted_on_a_plane_without_alpha() {
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
    device.set_layer_property(layer, "alpha", 0xFFFF).unwrap();
    set_rect(&mut device, layer, 0, 0, 1920, 1080);

    let mut req = card.new_request();
    device.apply_output(output, &mut req, CommitFlags::empty()).unwrap();

    assert_eq!(card.plane_layer_tag(primary, &req), Some(1));
}

#[test]
fn non_opaque_alpha_is_incompatible_without_an_alpha_property() {
    let card = MockCard::new();
    let primary = card.create_plane(PlaneType::Primary);
    card.add_compatible_layer(primary, 1);

    let mut device = Device::new(dummy_fd(), vec![card.crtc_id()]).unwrap();
    card.register_all(&mut device).unwrap();
    let output = device.create_output(card.crtc_id()).unwrap();

    let layer = device.create_layer(output).unwrap();
    let fb = card.create_fb(1);
    device.set_layer_property(layer, "FB_ID", fb as u64).unwrap();
    device.set_layer_property(layer, "alpha", 0x8000).unwrap();
    set_rect(&mut device, layer, 0, 0, 1920, 1080);

    let mut req = card.new_request();
    device.apply_output(output, &mut req, CommitFlags::empty()).unwrap();

    // The only plane can't express translucency, so the layer is left for
    // the software compositor instead of being forced onto hardware.
    assert_eq!(card.plane_layer_tag(primary, &req), None);
    assert!(device.layer_needs_composition(layer));
}

#[test]
fn default_rotation_is_omitted_on_a_plane_without_rotation() {
    let card = MockCard::new();
    let primary = card.create_plane(PlaneType::Primary);
    card.add_compatible_layer(primary, 1);

    let mut device = Device::new(dummy_fd(), vec![card.crtc_id()]).unwrap();
    card.register_all(&mut device).unwrap();
    let output = device.create_output(card.crtc_id()).unwrap();

    let layer = device.create_layer(output).unwrap();
    let fb = card.create_fb(1);
    device.set_layer_property(layer, "FB_ID", fb as u64).unwrap();
    device.set_layer_property(layer, "rotation", 0).unwrap();
    set_rect(&mut device, layer, 0, 0, 1920, 1080);

    let mut req = card.new_request();
    device.apply_output(output, &mut req, CommitFlags::empty()).unwrap();

    assert_eq!(card.plane_layer_tag(primary, &req), Some(1));
}

#[test]
fn immutable_plane_property_is_never_written() {
    let card = MockCard::new();
    let primary = card.create_plane(PlaneType::Primary);
    card.add_property(primary, "zpos", 0, true);
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

    // A fixed, immutable zpos on the plane must not stop allocation; the
    // applier skips zpos entirely since it is read-only to this crate.
    assert_eq!(card.plane_layer_tag(primary, &req), Some(1));
}
