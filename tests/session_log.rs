//! The session logger records engine activity once initialised.
//!
//! Kept in its own test binary: the logger is process-global and only the
//! first `init` takes effect.

use image::Rgba;

use texpaint::components::layers::LayerStack;
use texpaint::components::tools;
use texpaint::error::EngineError;
use texpaint::logger;

#[test]
fn engine_activity_lands_in_the_log() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logs").join("session.log");
    logger::init(&path).unwrap();
    assert!(logger::is_initialized());
    assert_eq!(logger::log_path(), Some(&path));

    // a second init is ignored
    let other = dir.path().join("other.log");
    logger::init(&other).unwrap();
    assert_eq!(logger::log_path(), Some(&path));
    assert!(!other.exists());

    let mut stack = LayerStack::new(4, 4).unwrap();
    stack.add_layer(Some("ink"));
    tools::fill_active(&mut stack, (0, 0), Rgba([0, 0, 0, 255])).unwrap();
    stack.set_locked(1, true).unwrap();
    assert!(matches!(
        tools::clear_active(&mut stack),
        Err(EngineError::LayerLocked { .. })
    ));
    assert!(stack.remove(0).is_ok());
    assert!(matches!(stack.remove_active(), Err(EngineError::CannotRemoveLastLayer)));

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("=== TexPaint session started"));
    assert!(text.contains("[INFO] add layer 'ink' at index 1"));
    assert!(text.contains("[INFO] fill at (0, 0) on 'ink': 16 px"));
    assert!(text.contains("[WARN] rejected pixel edit on locked layer 'ink'"));
    assert!(text.contains("[INFO] removed layer 'Background' (index 0)"));
    assert!(text.contains("[WARN] refused to remove the last layer"));
}
