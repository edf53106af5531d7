use std::cell::RefCell;
use std::rc::Rc;

use rfgui_layout::{
    Alignment, Axis, ChildrenBoundary, Dpi, Edge, EdgeInsets, ElementId, EventKind, GuiContext,
    Position, Positioning, RelativeOffsets, Size, SizeBound, SizeValue, SurfaceId,
};

fn root_on_surface(ctx: &mut GuiContext, width: f32, height: f32) -> (SurfaceId, ElementId) {
    let surface = ctx.create_surface(width, height);
    let root = ctx.create_element();
    assert!(ctx.set_element_surface(root, Some(surface)));
    (surface, root)
}

fn child_of(ctx: &mut GuiContext, parent: ElementId) -> ElementId {
    let child = ctx.create_element();
    assert!(ctx.set_element_parent(child, Some(parent)));
    child
}

fn record_geometry_events(ctx: &mut GuiContext) -> Rc<RefCell<Vec<(EventKind, Option<ElementId>)>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    ctx.add_global_event_handler(move |_, event| {
        if matches!(
            event.kind,
            EventKind::Size | EventKind::Move | EventKind::SizeAndMove
        ) {
            sink.borrow_mut().push((event.kind, event.element));
        }
    });
    log
}

#[test]
fn percent_root_with_auto_height_stacks_children() {
    let mut ctx = GuiContext::default();
    let (_, root) = root_on_surface(&mut ctx, 800.0, 600.0);
    ctx.set_element_width(root, SizeValue::percent(50.0));
    ctx.set_element_height(root, SizeValue::AutoToChildren);

    let first = child_of(&mut ctx, root);
    let second = child_of(&mut ctx, root);
    for child in [first, second] {
        ctx.set_element_height(child, SizeValue::px(40.0));
    }

    assert_eq!(ctx.element_size(root), Size::new(400.0, 80.0));
    assert_eq!(ctx.element_position(first), Position::new(0.0, 0.0));
    assert_eq!(ctx.element_position(second), Position::new(0.0, 40.0));
}

#[test]
fn auto_size_sums_children_and_adds_insets() {
    let mut ctx = GuiContext::default();
    let (_, root) = root_on_surface(&mut ctx, 800.0, 600.0);
    ctx.set_element_height(root, SizeValue::AutoToChildren);
    ctx.set_element_paddings(root, EdgeInsets::uniform(5.0));
    ctx.set_element_borders(root, EdgeInsets::uniform(2.0));

    for height in [10.0, 20.0, 30.0] {
        let child = child_of(&mut ctx, root);
        ctx.set_element_height(child, SizeValue::px(height));
    }

    assert_eq!(ctx.element_size(root).height, 60.0 + 10.0 + 4.0);

    ctx.set_element_children_boundary(root, Axis::Vertical, ChildrenBoundary::InnerBorder);
    assert_eq!(ctx.element_size(root).height, 60.0 + 4.0);
}

#[test]
fn auto_size_skips_percent_and_out_of_flow_children() {
    let mut ctx = GuiContext::default();
    let (_, root) = root_on_surface(&mut ctx, 800.0, 600.0);
    ctx.set_element_width(root, SizeValue::AutoToChildren);

    let fixed = child_of(&mut ctx, root);
    ctx.set_element_width(fixed, SizeValue::px(70.0));
    let percent = child_of(&mut ctx, root);
    ctx.set_element_width(percent, SizeValue::percent(100.0));
    let absolute = child_of(&mut ctx, root);
    ctx.set_element_width(absolute, SizeValue::px(500.0));
    ctx.set_element_positioning(absolute, Positioning::Absolute);
    let hidden = child_of(&mut ctx, root);
    ctx.set_element_width(hidden, SizeValue::px(900.0));
    ctx.set_element_visible(hidden, false);

    assert_eq!(ctx.element_size(root).width, 70.0);
    assert_eq!(ctx.element_size(percent).width, 70.0);
}

#[test]
fn horizontal_flow_applies_spacing_and_margins() {
    let mut ctx = GuiContext::default();
    let (_, root) = root_on_surface(&mut ctx, 800.0, 600.0);
    ctx.set_element_child_axis(root, Axis::Horizontal);
    ctx.set_element_child_spacing(root, 10.0);
    ctx.set_element_width(root, SizeValue::AutoToChildren);

    let a = child_of(&mut ctx, root);
    let b = child_of(&mut ctx, root);
    ctx.set_element_width(a, SizeValue::px(50.0));
    ctx.set_element_width(b, SizeValue::px(30.0));
    ctx.set_element_margin(b, Edge::Left, 5.0);

    assert_eq!(ctx.element_position(b), Position::new(50.0 + 10.0 + 5.0, 0.0));
    assert_eq!(ctx.element_size(root).width, 50.0 + 10.0 + 5.0 + 30.0);
}

#[test]
fn main_axis_alignment_offsets_the_run() {
    let mut ctx = GuiContext::default();
    let (_, root) = root_on_surface(&mut ctx, 800.0, 600.0);
    ctx.set_element_height(root, SizeValue::px(100.0));
    ctx.set_element_vertical_alignment(root, Alignment::End);
    ctx.set_element_horizontal_alignment(root, Alignment::Center);

    let child = child_of(&mut ctx, root);
    ctx.set_element_height(child, SizeValue::px(40.0));
    ctx.set_element_width(child, SizeValue::px(20.0));

    assert_eq!(ctx.element_position(child), Position::new(40.0, 60.0));
}

#[test]
fn relative_left_beats_right_and_top_beats_bottom() {
    let mut ctx = GuiContext::default();
    let (_, root) = root_on_surface(&mut ctx, 800.0, 600.0);
    ctx.set_element_width(root, SizeValue::px(300.0));
    ctx.set_element_height(root, SizeValue::px(200.0));

    let child = child_of(&mut ctx, root);
    ctx.set_element_width(child, SizeValue::px(50.0));
    ctx.set_element_height(child, SizeValue::px(50.0));
    ctx.set_element_positioning(child, Positioning::Relative);
    ctx.set_element_relative_offsets(
        child,
        RelativeOffsets {
            left: Some(10.0),
            right: Some(20.0),
            top: None,
            bottom: Some(30.0),
        },
    );

    assert_eq!(ctx.element_position(child), Position::new(10.0, 200.0 - 30.0 - 50.0));

    ctx.set_element_relative_offset(child, Edge::Left, None);
    assert_eq!(ctx.element_position(child).x, 300.0 - 20.0 - 50.0);
}

#[test]
fn absolute_children_are_offset_from_the_parent_outer_origin() {
    let mut ctx = GuiContext::default();
    let (_, root) = root_on_surface(&mut ctx, 800.0, 600.0);
    ctx.set_element_paddings(root, EdgeInsets::uniform(8.0));
    ctx.set_element_margin(root, Edge::Left, 15.0);

    let child = child_of(&mut ctx, root);
    ctx.set_element_positioning(child, Positioning::Absolute);
    ctx.set_element_absolute_position(child, 4.0, 6.0);

    assert_eq!(ctx.element_position(root), Position::new(15.0, 0.0));
    assert_eq!(ctx.element_position(child), Position::new(4.0, 6.0));
    assert_eq!(ctx.element_absolute_position(child), Position::new(19.0, 6.0));
}

#[test]
fn flexing_percent_children_share_leftover_space() {
    let mut ctx = GuiContext::default();
    let (_, root) = root_on_surface(&mut ctx, 800.0, 600.0);
    ctx.set_element_height(root, SizeValue::px(300.0));
    ctx.set_element_width(root, SizeValue::px(100.0));
    ctx.set_element_flex_percent(root, Axis::Vertical, true);
    ctx.set_element_flex_percent(root, Axis::Horizontal, true);

    let fixed = child_of(&mut ctx, root);
    ctx.set_element_height(fixed, SizeValue::px(100.0));
    let small = child_of(&mut ctx, root);
    ctx.set_element_height(small, SizeValue::percent(10.0));
    let large = child_of(&mut ctx, root);
    ctx.set_element_height(large, SizeValue::percent(30.0));
    ctx.set_element_width(large, SizeValue::percent(20.0));

    // Natural 30 + 90, leftover 80 shared 1:3.
    assert_eq!(ctx.element_size(small).height, 50.0);
    assert_eq!(ctx.element_size(large).height, 150.0);
    assert_eq!(ctx.element_position(large).y, 150.0);
    // Cross axis fills the children area.
    assert_eq!(ctx.element_size(large).width, 100.0);
}

#[test]
fn clamping_lets_min_win_over_max() {
    let mut ctx = GuiContext::default();
    let (_, root) = root_on_surface(&mut ctx, 800.0, 600.0);
    ctx.set_element_width(root, SizeValue::px(50.0));
    ctx.set_element_max_width(root, SizeValue::px(40.0));
    assert_eq!(ctx.element_size(root).width, 40.0);

    ctx.set_element_min_width(root, SizeValue::px(60.0));
    assert_eq!(ctx.element_size(root).width, 60.0);

    ctx.set_element_min_width(root, SizeBound::NONE);
    ctx.set_element_max_width(root, SizeValue::percent(10.0));
    // 10% of the 800px surface does not bind.
    assert_eq!(ctx.element_size(root).width, 50.0);
}

#[test]
fn malformed_percent_resolves_to_zero() {
    let mut ctx = GuiContext::default();
    let (_, root) = root_on_surface(&mut ctx, 800.0, 600.0);
    ctx.set_element_width(root, SizeValue::percent(f32::NAN));
    ctx.set_element_height(root, SizeValue::percent(-20.0));
    assert_eq!(ctx.element_size(root), Size::new(0.0, 0.0));
}

#[test]
fn points_scale_with_surface_dpi_and_pixels_do_not() {
    let mut ctx = GuiContext::default();
    let (surface, root) = root_on_surface(&mut ctx, 800.0, 600.0);
    ctx.set_element_width(root, SizeValue::pt(100.0));
    ctx.set_element_height(root, SizeValue::px(100.0));

    ctx.set_surface_dpi(surface, Dpi::uniform(192.0));
    assert_eq!(ctx.element_size(root), Size::new(200.0, 100.0));
    assert_eq!(ctx.points_to_pixels(root, Axis::Horizontal, 10.0), 20.0);

    ctx.set_base_dpi(Dpi::uniform(192.0));
    assert_eq!(ctx.element_size(root).width, 100.0);
}

#[test]
fn detached_elements_convert_with_identity_scale() {
    let mut ctx = GuiContext::default();
    let element = ctx.create_element();
    assert_eq!(ctx.points_to_pixels(element, Axis::Vertical, 12.5), 12.5);
    assert_eq!(ctx.pixels_to_points(element, Axis::Vertical, 12.5), 12.5);
}

#[test]
fn validation_is_idempotent() {
    let mut ctx = GuiContext::default();
    let (_, root) = root_on_surface(&mut ctx, 800.0, 600.0);
    ctx.set_element_height(root, SizeValue::AutoToChildren);
    let child = child_of(&mut ctx, root);
    ctx.set_element_height(child, SizeValue::pt(25.0));

    let log = record_geometry_events(&mut ctx);
    let before = (ctx.element_size(root), ctx.element_absolute_position(child));
    ctx.validate_layout();
    ctx.validate_layout();
    assert_eq!(before, (ctx.element_size(root), ctx.element_absolute_position(child)));
    assert!(log.borrow().is_empty());
    assert!(!ctx.has_pending_layout());
}

#[test]
fn batching_posts_one_event_per_element() {
    let mut ctx = GuiContext::default();
    let (_, root) = root_on_surface(&mut ctx, 800.0, 600.0);
    let children: Vec<_> = (0..3).map(|_| child_of(&mut ctx, root)).collect();
    let log = record_geometry_events(&mut ctx);

    ctx.begin_batch();
    ctx.begin_batch();
    for (index, child) in children.iter().enumerate() {
        ctx.set_element_height(*child, SizeValue::px(10.0 + index as f32));
        ctx.set_element_width(*child, SizeValue::px(20.0));
    }
    ctx.end_batch();
    assert!(log.borrow().is_empty());
    assert!(ctx.has_pending_layout());
    ctx.end_batch();
    // Unbalanced end is ignored.
    ctx.end_batch();

    let log = log.borrow();
    for child in &children {
        let count = log.iter().filter(|(_, id)| *id == Some(*child)).count();
        assert_eq!(count, 1, "expected a single event for {child:?}");
    }
}

#[test]
fn detaching_a_root_clears_the_surface_of_its_subtree() {
    let mut ctx = GuiContext::default();
    let (surface, root) = root_on_surface(&mut ctx, 800.0, 600.0);
    let a = child_of(&mut ctx, root);
    let b = child_of(&mut ctx, root);
    let c = child_of(&mut ctx, a);
    let d = child_of(&mut ctx, c);
    let all = [root, a, b, c, d];
    assert!(all.iter().all(|id| ctx.element_surface(*id) == Some(surface)));

    assert!(ctx.set_element_surface(root, None));
    assert!(all.iter().all(|id| ctx.element_surface(*id).is_none()));
    assert!(ctx.surface_roots(surface).is_empty());
}

#[test]
fn deleting_a_surface_keeps_its_roots_alive() {
    let mut ctx = GuiContext::default();
    let (surface, root) = root_on_surface(&mut ctx, 800.0, 600.0);
    let child = child_of(&mut ctx, root);
    assert!(ctx.delete_surface(surface));
    assert!(ctx.is_element_valid(root));
    assert_eq!(ctx.element_surface(child), None);
    assert!(!ctx.delete_surface(surface));
}

#[test]
fn cycles_are_rejected_and_subtrees_are_deleted_together() {
    let mut ctx = GuiContext::default();
    let (_, root) = root_on_surface(&mut ctx, 800.0, 600.0);
    let child = child_of(&mut ctx, root);
    let grandchild = child_of(&mut ctx, child);

    assert!(!ctx.set_element_parent(root, Some(grandchild)));
    assert_eq!(ctx.element_parent(root), None);

    assert!(ctx.delete_element(child));
    assert!(!ctx.is_element_valid(grandchild));
    assert_eq!(ctx.element_first_child(root), None);
    // Stale handles are inert.
    ctx.set_element_width(grandchild, SizeValue::px(5.0));
    assert_eq!(ctx.element_size(grandchild), Size::default());
}

#[test]
fn removing_a_child_moves_its_following_siblings_up() {
    let mut ctx = GuiContext::default();
    let (_, root) = root_on_surface(&mut ctx, 800.0, 600.0);
    ctx.set_element_height(root, SizeValue::AutoToChildren);
    let a = child_of(&mut ctx, root);
    let b = child_of(&mut ctx, root);
    let c = child_of(&mut ctx, root);
    for child in [a, b, c] {
        ctx.set_element_height(child, SizeValue::px(10.0));
    }
    assert_eq!(ctx.element_position(c).y, 20.0);

    ctx.delete_element(b);
    assert_eq!(ctx.element_position(c).y, 10.0);
    assert_eq!(ctx.element_size(root).height, 20.0);
}

#[test]
fn insert_before_reorders_the_flow() {
    let mut ctx = GuiContext::default();
    let (_, root) = root_on_surface(&mut ctx, 800.0, 600.0);
    let a = child_of(&mut ctx, root);
    let b = child_of(&mut ctx, root);
    for child in [a, b] {
        ctx.set_element_height(child, SizeValue::px(10.0));
    }
    assert!(ctx.insert_element_before(b, a));
    assert_eq!(ctx.element_children(root).collect::<Vec<_>>(), vec![b, a]);
    assert_eq!(ctx.element_position(a).y, 10.0);
    assert_eq!(ctx.element_position(b).y, 0.0);
    assert_eq!(ctx.element_previous_sibling(a), Some(b));
}

#[test]
fn nested_absolute_positions_follow_ancestors() {
    let mut ctx = GuiContext::default();
    let (_, root) = root_on_surface(&mut ctx, 800.0, 600.0);
    ctx.set_element_paddings(root, EdgeInsets::uniform(10.0));
    let child = child_of(&mut ctx, root);
    let grandchild = child_of(&mut ctx, child);
    ctx.set_element_margin(grandchild, Edge::Top, 3.0);

    assert_eq!(ctx.element_absolute_position(grandchild), Position::new(10.0, 13.0));

    ctx.set_element_margin(root, Edge::Left, 100.0);
    assert_eq!(ctx.element_absolute_position(grandchild), Position::new(110.0, 13.0));
}

#[test]
fn surface_resize_reflows_percent_roots() {
    let mut ctx = GuiContext::default();
    let (surface, root) = root_on_surface(&mut ctx, 800.0, 600.0);
    ctx.set_element_width(root, SizeValue::percent(25.0));
    assert_eq!(ctx.element_size(root).width, 200.0);
    ctx.set_surface_size(surface, 400.0, 600.0);
    assert_eq!(ctx.element_size(root).width, 100.0);
}

#[test]
fn surfaces_can_be_found_by_name() {
    let mut ctx = GuiContext::default();
    let surface = ctx.create_surface(10.0, 10.0);
    ctx.set_surface_name(surface, Some("main"));
    assert_eq!(ctx.find_surface("main"), Some(surface));
    assert_eq!(ctx.surface_name(surface), Some("main"));
    ctx.set_surface_aux_data(surface, Some(Box::new(7_u32)));
    let aux = ctx.surface_aux_data(surface).and_then(|data| data.downcast_ref::<u32>());
    assert_eq!(aux, Some(&7));
}

#[test]
fn auto_width_text_grows_to_its_measured_extent() {
    let mut ctx = GuiContext::default();
    let (_, root) = root_on_surface(&mut ctx, 800.0, 600.0);
    ctx.set_element_width(root, SizeValue::AutoToChildren);
    ctx.set_element_height(root, SizeValue::AutoToChildren);
    ctx.set_element_text(root, Some("abcd"));

    // Default font is 16pt; the estimator gives ASCII 0.56em and lines 1.25em.
    let size = ctx.element_size(root);
    assert!((size.width - 4.0 * 16.0 * 0.56).abs() < 0.01);
    assert_eq!(size.height, 20.0);
    let layout = ctx.element_text_layout(root).expect("text layout");
    assert_eq!(layout.lines.len(), 1);
}

#[test]
fn fixed_width_text_wraps_and_grows_auto_height() {
    let mut ctx = GuiContext::default();
    let (_, root) = root_on_surface(&mut ctx, 800.0, 600.0);
    ctx.set_element_width(root, SizeValue::px(30.0));
    ctx.set_element_height(root, SizeValue::AutoToChildren);
    ctx.set_element_text(root, Some("aaa aaa"));

    assert_eq!(ctx.element_text_layout(root).map(|l| l.lines.len()), Some(2));
    assert_eq!(ctx.element_size(root).height, 40.0);
}
