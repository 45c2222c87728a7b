//! TexPaint raster layer engine.
//!
//! Straight-alpha RGBA8 pixel buffers, 4-connected region growth (flood fill
//! and magic wand), an ordered layer stack with an active cursor, and a CPU
//! compositor that flattens the stack back to front.

pub mod logger;

pub mod canvas;
pub mod cli;
pub mod components;
pub mod compositor;
pub mod error;
pub mod ops;
pub mod project;
pub mod settings;

pub use canvas::{PixelBuffer, Rect, TRANSPARENT};
pub use components::layers::{BlendMode, Layer, LayerId, LayerStack};
pub use compositor::{blend_normal, composite, composite_with};
pub use error::{EngineError, Result};
pub use ops::fill::{FillOutcome, Selection, fill_selection, flood_fill, select_global, select_similar};
pub use project::{LayerRecord, ProjectRecord};
pub use settings::EngineSettings;
