mod support;

use liftkms::mock::MockCard;
use liftkms::{CommitFlags, Device, PlaneType};

use support::{dummy_fd, set_rect};

/// Forces the next `apply_output` on `output` to run a full search instead
/// of replaying the cached allocation, without otherwise touching the
/// layers under test.
fn force_full_search(device: &mut Device, output: liftkms::OutputId) {
    let scratch = device.create_layer(output).unwrap();
    device.destroy_layer(scratch);
}

#[test]
fn starved_layer_wins_the_plane_after_priority_rolls_over() {
    support::init_logging();
    let card = MockCard::new();
    let primary = card.create_plane(PlaneType::Primary);
    card.add_compatible_layer(primary, 99);
    let overlay = card.create_plane(PlaneType::Overlay);
    card.add_property(overlay, "zpos", 1, false);
    card.add_compatible_layer(overlay, 1);
    card.add_compatible_layer(overlay, 2);

    let mut device = Device::new(dummy_fd(), vec![card.crtc_id()]).unwrap();
    card.register_all(&mut device).unwrap();
    device.set_priority_window(2);
    let output = device.create_output(card.crtc_id()).unwrap();

    let background = device.create_layer(output).unwrap();
    let background_fb = card.create_fb(99);
    device
        .set_layer_property(background, "FB_ID", background_fb as u64)
        .unwrap();
    set_rect(&mut device, background, 0, 0, 1920, 1080);

    // Registered in this order: whichever of the two ties on priority wins
    // by registration order, so `a` starts out ahead of `b`.
    let a = device.create_layer(output).unwrap();
    device
        .set_layer_property(a, "FB_ID", card.create_fb(1) as u64)
        .unwrap();
    set_rect(&mut device, a, 0, 0, 64, 64);

    let b = device.create_layer(output).unwrap();
    device
        .set_layer_property(b, "FB_ID", card.create_fb(2) as u64)
        .unwrap();
    set_rect(&mut device, b, 0, 0, 64, 64);

    let mut req = card.new_request();
    device.apply_output(output, &mut req, CommitFlags::empty()).unwrap();
    assert_eq!(card.plane_layer_tag(overlay, &req), Some(1));

    // `b`'s framebuffer changes every frame from here on, bumping its
    // pending priority while `a`'s stays put.
    device.set_layer_property(b, "FB_ID", card.create_fb(2) as u64).unwrap();
    force_full_search(&mut device, output);
    let mut req = card.new_request();
    device.apply_output(output, &mut req, CommitFlags::empty()).unwrap();

    // With a priority window of 2, this second apply rolls `b`'s bumps
    // into its current priority, putting it ahead of `a` in the search's
    // candidate order.
    assert_eq!(card.plane_layer_tag(overlay, &req), Some(2));
}
