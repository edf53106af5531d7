//! Property tests for layout invariants.
//!
//! 1. Resolved sizes respect min/max bounds, with min winning when they cross.
//! 2. Point/pixel conversion round-trips for any usable DPI.
//! 3. Percentages keep two decimal digits.
//! 4. An auto-sized parent equals the sum of its fixed children plus spacing.
//! 5. Vertical flow positions never overlap and never go backwards.
//! 6. A second validation changes nothing.

use proptest::prelude::*;
use rfgui_layout::{Axis, Dpi, DpiScale, GuiContext, SizeValue};

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() <= 1e-3 * (1.0 + a.abs().max(b.abs()))
}

// ── Bounds ──────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn resolved_width_respects_bounds(
        width in 0.0f32..500.0,
        min in proptest::option::of(0.0f32..500.0),
        max in proptest::option::of(0.0f32..500.0),
    ) {
        let mut ctx = GuiContext::default();
        let surface = ctx.create_surface(800.0, 600.0);
        let root = ctx.create_element();
        ctx.set_element_surface(root, Some(surface));
        ctx.set_element_width(root, SizeValue::px(width));
        ctx.set_element_min_width(root, min.map(SizeValue::px));
        ctx.set_element_max_width(root, max.map(SizeValue::px));

        let mut expected = width;
        if let Some(max) = max {
            expected = expected.min(max);
        }
        if let Some(min) = min {
            expected = expected.max(min);
        }
        let resolved = ctx.element_size(root).width;
        prop_assert!(approx(resolved, expected), "{} != {}", resolved, expected);
    }
}

// ── DPI ─────────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn point_pixel_round_trip(dpi in 24.0f32..600.0, points in -1000.0f32..1000.0) {
        let scale = DpiScale::between(Dpi::uniform(dpi), Dpi::STANDARD);
        for axis in Axis::BOTH {
            let back = scale.pixels_to_points(axis, scale.points_to_pixels(axis, points));
            prop_assert!(approx(back, points), "{} -> {}", points, back);
        }
    }

    #[test]
    fn unusable_dpi_scales_by_one(dpi in prop_oneof![Just(0.0f32), Just(-96.0), Just(f32::NAN), Just(f32::INFINITY)]) {
        let scale = DpiScale::between(Dpi::uniform(dpi), Dpi::STANDARD);
        prop_assert_eq!(scale, DpiScale::IDENTITY);
    }
}

// ── Percent ─────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn percent_has_two_decimals(value in 0.0f32..1000.0) {
        let SizeValue::Percent(stored) = SizeValue::percent(value) else {
            return Err(TestCaseError::fail("not a percent"));
        };
        let hundredths = stored * 100.0;
        prop_assert!(approx(hundredths, hundredths.round()));
        prop_assert!((stored - value).abs() <= 0.005 + 1e-3);
    }
}

// ── Flow ────────────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn auto_height_sums_children_and_flow_is_monotonic(
        heights in proptest::collection::vec(0.0f32..80.0, 1..8),
        spacing in 0.0f32..10.0,
    ) {
        let mut ctx = GuiContext::default();
        let surface = ctx.create_surface(800.0, 600.0);
        let root = ctx.create_element();
        ctx.set_element_surface(root, Some(surface));
        ctx.set_element_height(root, SizeValue::AutoToChildren);
        ctx.set_element_child_spacing(root, spacing);

        ctx.begin_batch();
        let children: Vec<_> = heights
            .iter()
            .map(|height| {
                let child = ctx.create_element();
                ctx.set_element_parent(child, Some(root));
                ctx.set_element_height(child, SizeValue::px(*height));
                child
            })
            .collect();
        ctx.end_batch();

        let expected = heights.iter().sum::<f32>() + spacing * (heights.len() - 1) as f32;
        prop_assert!(approx(ctx.element_size(root).height, expected));

        for pair in children.windows(2) {
            let above = ctx.element_rect(pair[0]);
            let below = ctx.element_rect(pair[1]);
            prop_assert!(below.y + 1e-3 >= above.bottom());
        }

        let before: Vec<_> = children.iter().map(|c| ctx.element_rect(*c)).collect();
        ctx.validate_layout();
        let after: Vec<_> = children.iter().map(|c| ctx.element_rect(*c)).collect();
        prop_assert_eq!(before, after);
    }
}
