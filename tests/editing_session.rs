//! An end-to-end editing session: build a document, paint, select, reorder,
//! merge, persist and flatten.

use image::Rgba;

use texpaint::canvas::{Rect, TRANSPARENT};
use texpaint::components::layers::{BlendMode, LayerStack};
use texpaint::components::tools;
use texpaint::compositor::{composite, composite_with};
use texpaint::error::EngineError;
use texpaint::project::ProjectRecord;
use texpaint::settings::EngineSettings;

const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);
const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

#[test]
fn red_below_half_blue_composites_to_purple() {
    let mut stack = LayerStack::new(4, 4).unwrap();
    stack.rename(0, "A").unwrap();
    stack.active_buffer_mut().fill(RED);
    stack.add_layer(Some("B"));
    stack.active_buffer_mut().fill(BLUE);
    stack.set_opacity(1, 0.5).unwrap();

    let out = composite(&stack).unwrap();
    for p in out.as_image().pixels() {
        assert_eq!(*p, Rgba([128, 0, 128, 255]));
    }
}

#[test]
fn paint_select_reorder_and_flatten() {
    let mut stack = LayerStack::new(40, 30).unwrap();
    stack.active_buffer_mut().fill(WHITE);

    // closed square outline on its own layer
    stack.add_layer(Some("outline"));
    let corners = [(5, 5), (34, 5), (34, 24), (5, 24), (5, 5)];
    for pair in corners.windows(2) {
        tools::brush_line(&mut stack, pair[0], pair[1], 1, BLUE).unwrap();
    }

    // the interior is one transparent region enclosed by the outline
    let inside = tools::select_on_active(&stack, (20, 15), 0, false).unwrap();
    assert!(inside.bounds().x >= 6 && inside.bounds().max_x() <= 33);
    assert!(inside.bounds().y >= 6 && inside.bounds().max_y() <= 23);
    assert!(!inside.contains(0, 0));

    // global select reaches the outside too
    let everywhere = tools::select_on_active(&stack, (20, 15), 0, true).unwrap();
    assert!(everywhere.contains(0, 0));
    assert!(everywhere.len() > inside.len());

    // fill the interior on a layer of its own below the outline
    stack.set_active(0).unwrap();
    stack.add_layer(Some("paint"));
    assert_eq!(stack.active_index(), 1);
    let n = tools::fill_selection_active(&mut stack, &inside, RED).unwrap();
    assert_eq!(n as usize, inside.len());

    // move the outline to the bottom; the cursor stays on "paint"
    let paint_id = stack.active().id();
    stack.move_layer(2, 0).unwrap();
    assert_eq!(stack.active().id(), paint_id);
    assert_eq!(stack.active_index(), 2);
    let names: Vec<_> = stack.layers().iter().map(|l| l.name.clone()).collect();
    assert_eq!(names, ["outline", "Background", "paint"]);

    let flat = composite(&stack).unwrap();
    assert_eq!(flat.get(20, 15).unwrap(), RED);
    // outline now sits under the opaque background
    assert_eq!(flat.get(5, 5).unwrap(), WHITE);
    assert_eq!(flat.get(0, 0).unwrap(), WHITE);
}

#[test]
fn merge_down_bakes_opacity_into_lower_layer() {
    let mut stack = LayerStack::new(6, 6).unwrap();
    stack.active_buffer_mut().fill(RED);
    stack.add_layer(None);
    stack.active_buffer_mut().fill(BLUE);
    stack.set_opacity(1, 0.5).unwrap();
    let before = composite(&stack).unwrap();

    stack.merge_down(1).unwrap();
    assert_eq!(stack.len(), 1);
    assert_eq!(stack.active_index(), 0);
    assert_eq!(composite(&stack).unwrap(), before);
}

#[test]
fn locked_layers_reject_tools_but_allow_reads() {
    let mut stack = LayerStack::new(10, 10).unwrap();
    stack.active_buffer_mut().fill(WHITE);
    stack.set_locked(0, true).unwrap();

    assert!(matches!(
        tools::fill_active(&mut stack, (0, 0), RED),
        Err(EngineError::LayerLocked { .. })
    ));
    assert!(tools::brush_dab(&mut stack, (5, 5), 2, RED).is_err());
    assert!(tools::clone_stamp(&mut stack, (0, 0), (5, 5), 3).is_err());
    assert!(stack.active().buffer().as_image().pixels().all(|p| *p == WHITE));

    let copy = tools::copy_active(&stack, Rect::new(2, 2, 3, 3)).unwrap();
    assert_eq!(copy.dimensions(), (3, 3));
    assert_eq!(tools::select_on_active(&stack, (0, 0), 0, false).unwrap().len(), 100);
}

#[test]
fn saved_document_restores_and_composites_identically() {
    let mut stack = LayerStack::new(16, 16).unwrap();
    stack.active_buffer_mut().fill(WHITE);
    stack.add_layer(Some("dots"));
    tools::brush_dab(&mut stack, (4, 4), 3, RED).unwrap();
    tools::erase_dab(&mut stack, (4, 4), 1).unwrap();
    stack.set_opacity(1, 0.8).unwrap();
    stack.add_layer(Some("hidden multiply"));
    stack.active_buffer_mut().fill(BLUE);
    stack.set_blend_mode(2, BlendMode::Multiply).unwrap();
    stack.set_visibility(2, false).unwrap();

    let record: ProjectRecord = stack.to_record();
    let bytes = bincode::serialize(&record).unwrap();
    let restored = LayerStack::from_record(bincode::deserialize(&bytes).unwrap()).unwrap();

    assert_eq!(restored.len(), 3);
    assert_eq!(restored.active_index(), 2);
    assert_eq!(restored.layers()[1].buffer().get(4, 4).unwrap(), TRANSPARENT);
    assert_eq!(composite(&restored).unwrap(), composite(&stack).unwrap());

    // making the multiply layer visible turns compositing into an error
    let mut restored = restored;
    restored.set_visibility(2, true).unwrap();
    assert!(matches!(
        composite(&restored),
        Err(EngineError::UnsupportedBlendMode(BlendMode::Multiply))
    ));
}

#[test]
fn document_size_cap_comes_from_settings() {
    let settings = EngineSettings::parse("max_document_pixels=100\nparallel_composite=false\n");
    assert!(LayerStack::with_settings(10, 10, &settings).is_ok());
    assert!(matches!(
        LayerStack::with_settings(11, 10, &settings),
        Err(EngineError::InvalidDimensions { .. })
    ));
    let stack = LayerStack::with_settings(10, 10, &settings).unwrap();
    assert!(composite_with(&stack, &settings).is_ok());
}
