use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Hard cap on `width * height` for any buffer (~256 megapixels, ~1 GB of RGBA).
pub const MAX_PIXELS: u64 = 256_000_000;

/// Fully transparent black, the initial content of every new layer.
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

// ============================================================================
// RECT
// ============================================================================

/// Axis-aligned pixel rectangle.  `width`/`height` are always >= 1 when
/// produced by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build from inclusive min/max corners.
    pub fn from_min_max(min_x: u32, min_y: u32, max_x: u32, max_y: u32) -> Self {
        Self {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
        }
    }

    /// Inclusive right edge.
    pub fn max_x(&self) -> u32 {
        self.x + self.width - 1
    }

    /// Inclusive bottom edge.
    pub fn max_y(&self) -> u32 {
        self.y + self.height - 1
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && y >= self.y && x <= self.max_x() && y <= self.max_y()
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

// ============================================================================
// PIXEL BUFFER – dense RGBA8 storage
// ============================================================================

/// Owned, contiguous `width * height` RGBA8 pixel array.
///
/// Every coordinate access is bounds-checked and fails with
/// [`EngineError::OutOfBounds`] instead of wrapping or clamping.  The one
/// exception is [`PixelBuffer::write_rect`], which clips like a paint tool's
/// paste does.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    image: RgbaImage,
}

impl PixelBuffer {
    // ---- construction -------------------------------------------------------

    /// Create a fully transparent buffer.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        check_dimensions(width, height)?;
        Ok(Self {
            image: RgbaImage::new(width, height),
        })
    }

    /// Create a buffer with every pixel set to `color`.
    pub fn filled(width: u32, height: u32, color: Rgba<u8>) -> Result<Self> {
        check_dimensions(width, height)?;
        Ok(Self {
            image: RgbaImage::from_pixel(width, height, color),
        })
    }

    /// Wrap raw RGBA bytes.  `data.len()` must be exactly `width * height * 4`.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        check_dimensions(width, height)?;
        if data.len() as u64 != width as u64 * height as u64 * 4 {
            return Err(EngineError::InvalidDimensions {
                width: width as u64,
                height: height as u64,
            });
        }
        RgbaImage::from_raw(width, height, data)
            .map(|image| Self { image })
            .ok_or(EngineError::InvalidDimensions {
                width: width as u64,
                height: height as u64,
            })
    }

    /// Transparent buffer for dimensions that were already validated (the
    /// document size of an existing stack).
    pub(crate) fn blank(width: u32, height: u32) -> Self {
        debug_assert!(check_dimensions(width, height).is_ok());
        Self {
            image: RgbaImage::new(width, height),
        }
    }

    pub fn from_image(image: RgbaImage) -> Result<Self> {
        check_dimensions(image.width(), image.height())?;
        Ok(Self { image })
    }

    // ---- dimensions ---------------------------------------------------------

    #[inline]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn pixel_count(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// True when `(x, y)` lies inside `[0,w) x [0,h)`.  Accepts signed
    /// coordinates so callers can test off-canvas positions.
    #[inline]
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < self.width() as i64 && y < self.height() as i64
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width(), self.height())
    }

    // ---- pixel access -------------------------------------------------------

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Result<Rgba<u8>> {
        self.check(x, y)?;
        Ok(*self.image.get_pixel(x, y))
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, color: Rgba<u8>) -> Result<()> {
        self.check(x, y)?;
        self.image.put_pixel(x, y, color);
        Ok(())
    }

    /// Overwrite every pixel with `color`.
    pub fn fill(&mut self, color: Rgba<u8>) {
        for px in self.image.pixels_mut() {
            *px = color;
        }
    }

    /// Reset to fully transparent.
    pub fn clear(&mut self) {
        self.as_raw_mut().fill(0);
    }

    // ---- region copy / paste ------------------------------------------------

    /// Copy a sub-region into a new buffer.  The rectangle must be non-empty
    /// and lie entirely inside this buffer.
    pub fn read_rect(&self, x: u32, y: u32, width: u32, height: u32) -> Result<PixelBuffer> {
        if width == 0 || height == 0 {
            return Err(EngineError::InvalidDimensions {
                width: width as u64,
                height: height as u64,
            });
        }
        let end_x = x as u64 + width as u64;
        let end_y = y as u64 + height as u64;
        if end_x > self.width() as u64 || end_y > self.height() as u64 {
            // report the first corner that falls outside
            let (bx, by) = if x >= self.width() || y >= self.height() {
                (x as i64, y as i64)
            } else {
                (end_x as i64 - 1, end_y as i64 - 1)
            };
            return Err(EngineError::out_of_bounds(bx, by, self.width(), self.height()));
        }

        let src = self.image.as_raw();
        let src_stride = self.width() as usize * 4;
        let row_bytes = width as usize * 4;
        let mut data = Vec::with_capacity(row_bytes * height as usize);
        for row in y..y + height {
            let off = row as usize * src_stride + x as usize * 4;
            data.extend_from_slice(&src[off..off + row_bytes]);
        }
        PixelBuffer::from_raw(width, height, data)
    }

    /// Paste `src` with its top-left corner at `(x, y)`, overwriting pixels.
    ///
    /// The paste is clipped to this buffer; a paste lying entirely off-canvas
    /// writes nothing.  Returns the destination rectangle actually written.
    pub fn write_rect(&mut self, x: i64, y: i64, src: &PixelBuffer) -> Option<Rect> {
        let dst_w = self.width() as i64;
        let dst_h = self.height() as i64;
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = x.saturating_add(src.width() as i64).min(dst_w);
        let y1 = y.saturating_add(src.height() as i64).min(dst_h);
        if x0 >= x1 || y0 >= y1 {
            return None;
        }

        let run = (x1 - x0) as usize * 4;
        let src_stride = src.width() as usize * 4;
        let dst_stride = self.width() as usize * 4;
        let src_raw = src.image.as_raw();
        let dst_raw: &mut [u8] = &mut self.image;
        for gy in y0..y1 {
            let sy = (gy - y) as usize;
            let sx = (x0 - x) as usize;
            let s_off = sy * src_stride + sx * 4;
            let d_off = gy as usize * dst_stride + x0 as usize * 4;
            dst_raw[d_off..d_off + run].copy_from_slice(&src_raw[s_off..s_off + run]);
        }

        Some(Rect::new(
            x0 as u32,
            y0 as u32,
            (x1 - x0) as u32,
            (y1 - y0) as u32,
        ))
    }

    // ---- raw views ------------------------------------------------------------

    /// Row-major RGBA bytes.
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub(crate) fn as_raw_mut(&mut self) -> &mut [u8] {
        &mut self.image
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    #[inline]
    fn check(&self, x: u32, y: u32) -> Result<()> {
        if x >= self.width() || y >= self.height() {
            return Err(EngineError::out_of_bounds(
                x as i64,
                y as i64,
                self.width(),
                self.height(),
            ));
        }
        Ok(())
    }
}

/// Reject zero-sized and oversized documents.
pub(crate) fn check_dimensions(width: u32, height: u32) -> Result<()> {
    let total = width as u64 * height as u64;
    if width == 0 || height == 0 || total > MAX_PIXELS {
        return Err(EngineError::InvalidDimensions {
            width: width as u64,
            height: height as u64,
        });
    }
    Ok(())
}
