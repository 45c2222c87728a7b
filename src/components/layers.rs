use std::fmt;

use image::Rgba;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::canvas::{PixelBuffer, Rect, TRANSPARENT};
use crate::error::{EngineError, Result};
use crate::settings::EngineSettings;
use crate::{log_info, log_warn};

// ============================================================================
// BLEND MODE
// ============================================================================

/// How a layer combines with what is below it.
///
/// Only `Normal` is implemented by the compositor.  The remaining modes are
/// declared so documents can carry them; compositing a visible layer that
/// uses one fails with [`EngineError::UnsupportedBlendMode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Additive,
}

impl BlendMode {
    pub fn all() -> &'static [BlendMode] {
        &[
            BlendMode::Normal,
            BlendMode::Multiply,
            BlendMode::Screen,
            BlendMode::Overlay,
            BlendMode::Additive,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            BlendMode::Normal => "Normal",
            BlendMode::Multiply => "Multiply",
            BlendMode::Screen => "Screen",
            BlendMode::Overlay => "Overlay",
            BlendMode::Additive => "Additive",
        }
    }

    pub fn is_supported(&self) -> bool {
        matches!(self, BlendMode::Normal)
    }
}

// ============================================================================
// LAYER
// ============================================================================

/// Opaque layer identity, stable for the layer's lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerId(Uuid);

impl LayerId {
    pub fn new() -> Self {
        LayerId(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        LayerId(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for LayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A named, independently editable pixel buffer plus its compositing flags.
#[derive(Clone, Debug)]
pub struct Layer {
    id: LayerId,
    pub name: String,
    pub visible: bool,
    opacity: f32,
    pub blend_mode: BlendMode,
    /// Paint tools refuse to modify locked layers; the stack itself does not check.
    pub locked: bool,
    buffer: PixelBuffer,
}

impl Layer {
    /// A fully transparent, visible, unlocked, opaque `Normal` layer.
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Result<Self> {
        Ok(Self::from_buffer(name, PixelBuffer::new(width, height)?))
    }

    pub fn from_buffer(name: impl Into<String>, buffer: PixelBuffer) -> Self {
        Self {
            id: LayerId::new(),
            name: name.into(),
            visible: true,
            opacity: 1.0,
            blend_mode: BlendMode::Normal,
            locked: false,
            buffer,
        }
    }

    /// Rebuild a layer with a known id (used when restoring records).
    pub(crate) fn with_id(mut self, id: LayerId) -> Self {
        self.id = id;
        self
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Set opacity, clamped to `[0, 1]`.  NaN is treated as 0.
    pub fn set_opacity(&mut self, value: f32) {
        self.opacity = clamp_opacity(value);
    }

    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    /// Pixel editing handle.  Callers that paint must check `locked` first.
    pub fn buffer_mut(&mut self) -> LayerPixels<'_> {
        LayerPixels(&mut self.buffer)
    }

    pub(crate) fn raw_buffer_mut(&mut self) -> &mut PixelBuffer {
        &mut self.buffer
    }

    /// Fails with `LayerLocked` when the layer is locked.
    pub fn ensure_unlocked(&self) -> Result<()> {
        if self.locked {
            log_warn!("rejected pixel edit on locked layer '{}'", self.name);
            return Err(EngineError::LayerLocked {
                name: self.name.clone(),
            });
        }
        Ok(())
    }
}

/// Mutable view of a layer's pixels that can change every pixel but never
/// the buffer's dimensions.
#[derive(Debug)]
pub struct LayerPixels<'a>(&'a mut PixelBuffer);

impl std::ops::Deref for LayerPixels<'_> {
    type Target = PixelBuffer;

    fn deref(&self) -> &PixelBuffer {
        &*self.0
    }
}

impl LayerPixels<'_> {
    pub fn set(&mut self, x: u32, y: u32, color: Rgba<u8>) -> Result<()> {
        self.0.set(x, y, color)
    }

    pub fn fill(&mut self, color: Rgba<u8>) {
        self.0.fill(color);
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Clipped paste, see [`PixelBuffer::write_rect`].
    pub fn write_rect(&mut self, x: i64, y: i64, src: &PixelBuffer) -> Option<Rect> {
        self.0.write_rect(x, y, src)
    }

    /// Row-major RGBA bytes; the slice length is fixed.
    pub fn as_raw_mut(&mut self) -> &mut [u8] {
        self.0.as_raw_mut()
    }

    /// Replace every pixel with `src`, which must have the same dimensions.
    pub fn replace(&mut self, src: PixelBuffer) -> Result<()> {
        if src.dimensions() != self.0.dimensions() {
            return Err(EngineError::InvalidDimensions {
                width: src.width() as u64,
                height: src.height() as u64,
            });
        }
        *self.0 = src;
        Ok(())
    }
}

pub(crate) fn clamp_opacity(value: f32) -> f32 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

// ============================================================================
// LAYER STACK
// ============================================================================

/// Ordered layers (index 0 = bottom) with an active-layer cursor.
///
/// Invariants, upheld by every method:
/// * there is always at least one layer;
/// * `active_index` is always a valid index;
/// * every layer's buffer matches the document size.
#[derive(Clone, Debug)]
pub struct LayerStack {
    layers: Vec<Layer>,
    active_index: usize,
    width: u32,
    height: u32,
}

impl LayerStack {
    /// New document with a single transparent "Background" layer.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let background = Layer::new("Background", width, height)?;
        Ok(Self {
            layers: vec![background],
            active_index: 0,
            width,
            height,
        })
    }

    /// Like [`LayerStack::new`] but also enforces the configured document size cap.
    pub fn with_settings(width: u32, height: u32, settings: &EngineSettings) -> Result<Self> {
        if width as u64 * height as u64 > settings.max_document_pixels {
            return Err(EngineError::InvalidDimensions {
                width: width as u64,
                height: height as u64,
            });
        }
        Self::new(width, height)
    }

    /// Assemble a stack from pre-built layers (restoring a saved document).
    pub(crate) fn from_parts(layers: Vec<Layer>, active_index: usize, width: u32, height: u32) -> Result<Self> {
        if layers.is_empty() {
            return Err(EngineError::InvalidRecord("document has no layers".into()));
        }
        if active_index >= layers.len() {
            return Err(EngineError::IndexOutOfRange {
                index: active_index,
                len: layers.len(),
            });
        }
        if let Some(bad) = layers.iter().find(|l| l.buffer.dimensions() != (width, height)) {
            return Err(EngineError::InvalidRecord(format!(
                "layer '{}' is {}x{}, document is {}x{}",
                bad.name,
                bad.buffer.width(),
                bad.buffer.height(),
                width,
                height
            )));
        }
        Ok(Self {
            layers,
            active_index,
            width,
            height,
        })
    }

    // ---- queries --------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Never true; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn active(&self) -> &Layer {
        &self.layers[self.active_index]
    }

    pub(crate) fn active_mut(&mut self) -> &mut Layer {
        &mut self.layers[self.active_index]
    }

    /// Pixels of the active layer.  Does not check `locked`.
    pub fn active_buffer_mut(&mut self) -> LayerPixels<'_> {
        self.active_mut().buffer_mut()
    }

    /// Pixels of layer `index`.  Does not check `locked`.
    pub fn buffer_mut(&mut self, index: usize) -> Result<LayerPixels<'_>> {
        Ok(self.layer_mut(index)?.buffer_mut())
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Result<&Layer> {
        let len = self.layers.len();
        self.layers
            .get(index)
            .ok_or(EngineError::IndexOutOfRange { index, len })
    }

    pub(crate) fn layer_mut(&mut self, index: usize) -> Result<&mut Layer> {
        let len = self.layers.len();
        self.layers
            .get_mut(index)
            .ok_or(EngineError::IndexOutOfRange { index, len })
    }

    pub fn index_of(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|l| l.id == id)
    }

    pub fn find(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    // ---- structure ------------------------------------------------------------

    /// Create a transparent layer directly above the active one and make it
    /// active.  `None` names it "Layer N" where N is the new layer count.
    pub fn add_layer(&mut self, name: Option<&str>) -> &Layer {
        let insert_idx = self.active_index + 1;
        let name = name
            .map(str::to_string)
            .unwrap_or_else(|| format!("Layer {}", self.layers.len() + 1));
        self.insert_new(insert_idx, name)
    }

    /// Create a transparent layer at `index` (0 = bottom, `len()` = top) and
    /// make it active.
    pub fn insert_layer(&mut self, index: usize, name: Option<&str>) -> Result<&Layer> {
        if index > self.layers.len() {
            return Err(EngineError::IndexOutOfRange {
                index,
                len: self.layers.len(),
            });
        }
        let name = name
            .map(str::to_string)
            .unwrap_or_else(|| format!("Layer {}", self.layers.len() + 1));
        Ok(self.insert_new(index, name))
    }

    fn insert_new(&mut self, index: usize, name: String) -> &Layer {
        let layer = Layer::from_buffer(name, PixelBuffer::blank(self.width, self.height));
        log_info!("add layer '{}' at index {}", layer.name, index);
        self.layers.insert(index, layer);
        self.active_index = index;
        &self.layers[index]
    }

    /// Copy the active layer (pixels and flags, new id) directly above it and
    /// make the copy active.
    pub fn duplicate_active(&mut self) -> &Layer {
        let source = &self.layers[self.active_index];
        let mut copy = source.clone().with_id(LayerId::new());
        copy.name = format!("{} copy", source.name);
        let new_index = self.active_index + 1;
        log_info!("duplicate layer '{}' to index {}", source.name, new_index);
        self.layers.insert(new_index, copy);
        self.active_index = new_index;
        &self.layers[new_index]
    }

    /// Remove the active layer.  The cursor moves to the layer that was
    /// directly below it (or the new bottom layer if the bottom was removed).
    pub fn remove_active(&mut self) -> Result<Layer> {
        self.remove(self.active_index)
    }

    /// Remove the layer at `index`.  Removing a non-active layer leaves the
    /// cursor on the same layer it pointed at before.
    pub fn remove(&mut self, index: usize) -> Result<Layer> {
        if index >= self.layers.len() {
            return Err(EngineError::IndexOutOfRange {
                index,
                len: self.layers.len(),
            });
        }
        if self.layers.len() <= 1 {
            log_warn!("refused to remove the last layer");
            return Err(EngineError::CannotRemoveLastLayer);
        }

        let removed = self.layers.remove(index);
        if index == self.active_index {
            self.active_index = index.saturating_sub(1);
        } else if index < self.active_index {
            self.active_index -= 1;
        }
        log_info!("removed layer '{}' (index {})", removed.name, index);
        Ok(removed)
    }

    pub fn set_active(&mut self, index: usize) -> Result<()> {
        if index >= self.layers.len() {
            return Err(EngineError::IndexOutOfRange {
                index,
                len: self.layers.len(),
            });
        }
        self.active_index = index;
        Ok(())
    }

    /// Move the layer at `from` so it ends up at `to`.  The active cursor keeps
    /// pointing at the same layer, wherever it lands.
    pub fn move_layer(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.layers.len();
        for index in [from, to] {
            if index >= len {
                return Err(EngineError::IndexOutOfRange { index, len });
            }
        }
        if from == to {
            return Ok(());
        }

        let active_id = self.layers[self.active_index].id;
        let layer = self.layers.remove(from);
        self.layers.insert(to, layer);
        // Re-derive from identity instead of shifting indices by hand.
        self.active_index = self
            .index_of(active_id)
            .unwrap_or(self.active_index.min(len - 1));
        log_info!("moved layer {} -> {}", from, to);
        Ok(())
    }

    /// Blend layer `index` onto the layer directly below it, then remove it.
    ///
    /// Fails if `index` is 0 or invalid, if the lower layer is locked, if
    /// the upper layer uses a blend mode the compositor does not implement,
    /// or if the two buffers differ in size.
    pub fn merge_down(&mut self, index: usize) -> Result<()> {
        let len = self.layers.len();
        if index == 0 || index >= len {
            return Err(EngineError::IndexOutOfRange { index, len });
        }
        self.layers[index - 1].ensure_unlocked()?;
        let upper_mode = self.layers[index].blend_mode;
        if !upper_mode.is_supported() {
            return Err(EngineError::UnsupportedBlendMode(upper_mode));
        }
        let (w, h) = self.layers[index].buffer.dimensions();
        if self.layers[index - 1].buffer.dimensions() != (w, h) {
            return Err(EngineError::InvalidDimensions {
                width: w as u64,
                height: h as u64,
            });
        }

        if self.layers[index].visible {
            let (below, above) = self.layers.split_at_mut(index);
            let upper = &above[0];
            crate::compositor::blend_buffer_onto(&mut below[index - 1].buffer, &upper.buffer, upper.opacity, false)?;
        }
        let upper = self.layers.remove(index);

        if self.active_index >= index {
            // either the upper layer itself (now merged into index - 1) or one above it
            self.active_index -= 1;
        }
        log_info!("merged '{}' down into '{}'", upper.name, self.layers[index - 1].name);
        Ok(())
    }

    // ---- per-layer flags --------------------------------------------------------

    pub fn set_visibility(&mut self, index: usize, visible: bool) -> Result<()> {
        self.layer_mut(index)?.visible = visible;
        Ok(())
    }

    /// Clamps to `[0, 1]`; NaN becomes 0.
    pub fn set_opacity(&mut self, index: usize, value: f32) -> Result<()> {
        self.layer_mut(index)?.set_opacity(value);
        Ok(())
    }

    pub fn set_locked(&mut self, index: usize, locked: bool) -> Result<()> {
        self.layer_mut(index)?.locked = locked;
        Ok(())
    }

    pub fn set_blend_mode(&mut self, index: usize, mode: BlendMode) -> Result<()> {
        self.layer_mut(index)?.blend_mode = mode;
        Ok(())
    }

    pub fn rename(&mut self, index: usize, name: impl Into<String>) -> Result<()> {
        self.layer_mut(index)?.name = name.into();
        Ok(())
    }

    /// Sample the active layer (handy for eyedropper-style callers).
    pub fn active_pixel(&self, x: u32, y: u32) -> Result<Rgba<u8>> {
        self.active().buffer.get(x, y)
    }

    /// True when every layer is transparent everywhere.
    pub fn is_blank(&self) -> bool {
        self.layers
            .iter()
            .all(|l| l.buffer.as_image().pixels().all(|p| *p == TRANSPARENT))
    }
}
