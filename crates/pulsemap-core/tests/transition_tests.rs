use proptest::prelude::*;
use pulsemap_core::parameters::{ParameterSet, Rgba};
use pulsemap_core::transition::Transition;

fn start_preset() -> ParameterSet {
    ParameterSet::default()
}

fn end_preset() -> ParameterSet {
    ParameterSet {
        time_speed: 0.3,
        spin_time_speed: 4.7,
        main_color: Rgba::new(12, 250, 3, 128),
        accent_color: Rgba::new(255, 255, 0, 255),
        background_color: Rgba::new(0, 0, 0, 0),
        contrast: 1.1,
        spin_amount: 0.7,
        parallax_x: -0.3,
        parallax_y: 0.1,
        zoom_scale: 2.5,
        saturation_amount: 0.33,
        saturation_amount_2: 0.77,
        pixel_size: 320.0,
        spin_ease: 0.1,
        loop_count: 2.0,
    }
}

#[test]
fn test_endpoints_are_exact() {
    let mut transition = Transition::new(start_preset(), end_preset());

    transition.set_progress(0.0);
    assert_eq!(transition.interpolated(), start_preset());

    transition.set_progress(1.0);
    assert_eq!(transition.interpolated(), end_preset());
}

#[test]
fn test_progress_is_clamped() {
    let mut transition = Transition::new(start_preset(), end_preset());
    transition.set_progress(-0.5);
    assert_eq!(transition.progress(), 0.0);
    transition.set_progress(1.7);
    assert_eq!(transition.progress(), 1.0);
}

#[test]
fn test_midpoint_scalars_and_colors() {
    let mut transition = Transition::new(start_preset(), end_preset());
    transition.set_progress(0.5);
    let mid = transition.interpolated();

    let expected_zoom = (start_preset().zoom_scale + end_preset().zoom_scale) / 2.0;
    assert!((mid.zoom_scale - expected_zoom).abs() < 1e-6);
    // 0x16 = 22 and 0 -> 11; alpha 255 and 0 -> 127.5 rounds to 128
    assert_eq!(mid.background_color.r, 11);
    assert_eq!(mid.background_color.a, 128);
}

fn rgba() -> impl Strategy<Value = Rgba> {
    (any::<u8>(), any::<u8>(), any::<u8>(), any::<u8>())
        .prop_map(|(r, g, b, a)| Rgba::new(r, g, b, a))
}

proptest! {
    #[test]
    fn prop_color_lerp_stays_between_endpoints(a in rgba(), b in rgba(), t in 0.0f32..=1.0) {
        let mixed = a.lerp(b, t);
        for ((x, y), m) in a.to_array().into_iter().zip(b.to_array()).zip(mixed.to_array()) {
            prop_assert!(m >= x.min(y) && m <= x.max(y));
        }
    }

    #[test]
    fn prop_progress_always_in_unit_range(p in -10.0f32..10.0) {
        let mut transition = Transition::new(start_preset(), end_preset());
        transition.set_progress(p);
        let progress = transition.progress();
        prop_assert!((0.0..=1.0).contains(&progress));
    }
}
