// ============================================================================
// PROJECT RECORDS – serde representation of a LayerStack for persistence
// ============================================================================
//
// The engine does not define a file format.  These records are what a
// persistence layer serializes (with whatever serde format it chooses): each
// layer's pixels plus its metadata, in stack order, bottom first.

use serde::{Deserialize, Serialize};

use crate::canvas::PixelBuffer;
use crate::components::layers::{BlendMode, Layer, LayerId, LayerStack, clamp_opacity};
use crate::error::{EngineError, Result};
use crate::log_info;

/// Maximum supported canvas dimension in pixels (per axis).
/// Prevents memory exhaustion from crafted records.
pub const MAX_CANVAS_DIM: u32 = 32_768;
/// Maximum number of layers in a record.
pub const MAX_LAYERS: usize = 256;

/// A whole document: size, active cursor and layers bottom-to-top.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub width: u32,
    pub height: u32,
    pub active_index: usize,
    pub layers: Vec<LayerRecord>,
}

/// One layer: identity, metadata and raw row-major RGBA bytes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerRecord {
    pub id: LayerId,
    pub name: String,
    pub visible: bool,
    pub opacity: f32,
    pub blend_mode: BlendMode,
    pub locked: bool,
    pub pixels: Vec<u8>,
}

impl LayerRecord {
    fn from_layer(layer: &Layer) -> Self {
        Self {
            id: layer.id(),
            name: layer.name.clone(),
            visible: layer.visible,
            opacity: layer.opacity(),
            blend_mode: layer.blend_mode,
            locked: layer.locked,
            pixels: layer.buffer().as_raw().to_vec(),
        }
    }

    fn into_layer(self, width: u32, height: u32) -> Result<Layer> {
        let expected = width as usize * height as usize * 4;
        if self.pixels.len() != expected {
            return Err(EngineError::InvalidRecord(format!(
                "layer '{}' has {} bytes of pixels, expected {}",
                self.name,
                self.pixels.len(),
                expected
            )));
        }
        let buffer = PixelBuffer::from_raw(width, height, self.pixels)?;
        let mut layer = Layer::from_buffer(self.name, buffer).with_id(self.id);
        layer.visible = self.visible;
        // out-of-range opacity from older writers is clamped, not rejected
        layer.set_opacity(clamp_opacity(self.opacity));
        layer.blend_mode = self.blend_mode;
        layer.locked = self.locked;
        Ok(layer)
    }
}

impl LayerStack {
    /// Snapshot the stack into a serializable record.
    pub fn to_record(&self) -> ProjectRecord {
        ProjectRecord {
            width: self.width(),
            height: self.height(),
            active_index: self.active_index(),
            layers: self.layers().iter().map(LayerRecord::from_layer).collect(),
        }
    }

    /// Rebuild a stack from a record, validating every invariant.
    pub fn from_record(record: ProjectRecord) -> Result<LayerStack> {
        let ProjectRecord {
            width,
            height,
            active_index,
            layers,
        } = record;

        if width == 0 || height == 0 || width > MAX_CANVAS_DIM || height > MAX_CANVAS_DIM {
            return Err(EngineError::InvalidRecord(format!(
                "canvas dimensions {}x{} exceed limits (max {}x{})",
                width, height, MAX_CANVAS_DIM, MAX_CANVAS_DIM
            )));
        }
        if layers.is_empty() || layers.len() > MAX_LAYERS {
            return Err(EngineError::InvalidRecord(format!(
                "layer count {} is outside 1..={}",
                layers.len(),
                MAX_LAYERS
            )));
        }
        if active_index >= layers.len() {
            return Err(EngineError::InvalidRecord(format!(
                "active index {} with {} layers",
                active_index,
                layers.len()
            )));
        }

        let mut seen = std::collections::HashSet::with_capacity(layers.len());
        if let Some(dup) = layers.iter().find(|l| !seen.insert(l.id)) {
            return Err(EngineError::InvalidRecord(format!("duplicate layer id {}", dup.id)));
        }

        let layers = layers
            .into_iter()
            .map(|l| l.into_layer(width, height))
            .collect::<Result<Vec<_>>>()?;
        let stack = LayerStack::from_parts(layers, active_index, width, height)?;
        log_info!(
            "restored {}x{} document with {} layers",
            width,
            height,
            stack.len()
        );
        Ok(stack)
    }
}
