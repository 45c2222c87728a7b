// ============================================================================
// REGION GROWTH – flood fill and magic-wand selection over a PixelBuffer
// ============================================================================
//
// Both operations share one primitive: a 4-connected DFS from a seed using an
// explicit Vec stack and a per-pixel state byte.  A coordinate is classified
// (included / rejected) the first time it is reached and never re-examined,
// so the stack holds at most one entry per included pixel and deep regions
// never touch the call stack.

use image::Rgba;

use crate::canvas::{PixelBuffer, Rect};
use crate::error::{EngineError, Result};

const UNSEEN: u8 = 0;
const REJECTED: u8 = 1;
const INCLUDED: u8 = 255;

/// Result of [`flood_fill`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FillOutcome {
    /// Number of pixels recoloured.
    pub filled: u64,
    /// Bounding box of the recoloured pixels (`None` when nothing changed).
    pub bounds: Option<Rect>,
}

/// A magic-wand selection: the chosen pixels, their bounding box and the
/// colour that was sampled at the seed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    pixels: Vec<(u32, u32)>,
    bounds: Rect,
    target: Rgba<u8>,
    width: u32,
    height: u32,
    mask: Vec<u8>,
}

impl Selection {
    /// Selected coordinates in row-major order.
    pub fn pixels(&self) -> &[(u32, u32)] {
        &self.pixels
    }

    /// Bounding rectangle of the selected pixels.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Colour at the seed point.
    pub fn target(&self) -> Rgba<u8> {
        self.target
    }

    /// Dimensions of the buffer the selection was taken from.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    /// Always false for selections produced by this module; the seed
    /// matches itself.
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width
            && y < self.height
            && self.mask[y as usize * self.width as usize + x as usize] == INCLUDED
    }

    /// Row-major selection mask, 255 = selected, 0 = not selected.
    pub fn mask(&self) -> &[u8] {
        &self.mask
    }
}

/// Region found by [`grow_region`]: state bytes (`INCLUDED` marks members),
/// member count and bounding box.
struct Region {
    state: Vec<u8>,
    count: u64,
    bounds: Rect,
}

/// Exact RGBA equality: the flood-fill matching rule.
#[inline(always)]
fn same_color(a: [u8; 4], b: [u8; 4]) -> bool {
    a == b
}

/// Per-channel tolerance: the magic-wand matching rule.
#[inline(always)]
fn within_tolerance(candidate: [u8; 4], target: [u8; 4], tolerance: u8) -> bool {
    candidate
        .iter()
        .zip(target.iter())
        .all(|(&c, &t)| c.abs_diff(t) <= tolerance)
}

#[inline(always)]
fn pix(flat: &[u8], idx: usize) -> [u8; 4] {
    let o = idx * 4;
    [flat[o], flat[o + 1], flat[o + 2], flat[o + 3]]
}

/// 4-connected region growth from `seed`.  `matches` decides membership from
/// a pixel's RGBA value.  The seed must be in bounds and must match.
fn grow_region<F>(buffer: &PixelBuffer, seed: (u32, u32), matches: F) -> Region
where
    F: Fn([u8; 4]) -> bool,
{
    let w = buffer.width();
    let h = buffer.height();
    let wu = w as usize;
    let flat = buffer.as_raw();
    let mut state = vec![UNSEEN; wu * h as usize];

    let (sx, sy) = seed;
    let mut min_x = sx;
    let mut min_y = sy;
    let mut max_x = sx;
    let mut max_y = sy;
    let mut count = 0u64;

    // Flat indices fit in u32: buffers are capped at MAX_PIXELS (< u32::MAX).
    let mut stack: Vec<u32> = Vec::with_capacity(4096);
    let seed_idx = sy as usize * wu + sx as usize;
    state[seed_idx] = INCLUDED;
    stack.push(seed_idx as u32);

    while let Some(idx) = stack.pop() {
        let idx = idx as usize;
        let x = (idx % wu) as u32;
        let y = (idx / wu) as u32;
        count += 1;

        min_x = min_x.min(x);
        max_x = max_x.max(x);
        min_y = min_y.min(y);
        max_y = max_y.max(y);

        let mut visit = |ni: usize, stack: &mut Vec<u32>| {
            if state[ni] != UNSEEN {
                return;
            }
            if matches(pix(flat, ni)) {
                state[ni] = INCLUDED;
                stack.push(ni as u32);
            } else {
                state[ni] = REJECTED;
            }
        };

        // Left, right, up, down; neighbours outside the buffer are never formed.
        if x > 0 {
            visit(idx - 1, &mut stack);
        }
        if x + 1 < w {
            visit(idx + 1, &mut stack);
        }
        if y > 0 {
            visit(idx - wu, &mut stack);
        }
        if y + 1 < h {
            visit(idx + wu, &mut stack);
        }
    }

    Region {
        state,
        count,
        bounds: Rect::from_min_max(min_x, min_y, max_x, max_y),
    }
}

fn seed_color(buffer: &PixelBuffer, seed: (u32, u32)) -> Result<Rgba<u8>> {
    buffer.get(seed.0, seed.1)
}

/// Replace the 4-connected area of pixels exactly equal to the seed colour
/// with `fill`.
///
/// Filling with the colour already at the seed is a no-op.  A seed outside
/// the buffer fails with `OutOfBounds` and writes nothing.
pub fn flood_fill(buffer: &mut PixelBuffer, seed: (u32, u32), fill: Rgba<u8>) -> Result<FillOutcome> {
    let target = seed_color(buffer, seed)?;
    if same_color(target.0, fill.0) {
        return Ok(FillOutcome {
            filled: 0,
            bounds: None,
        });
    }

    let region = grow_region(buffer, seed, |p| same_color(p, target.0));

    let raw = buffer.as_raw_mut();
    for (px, &s) in raw.chunks_exact_mut(4).zip(region.state.iter()) {
        if s == INCLUDED {
            px.copy_from_slice(&fill.0);
        }
    }

    Ok(FillOutcome {
        filled: region.count,
        bounds: Some(region.bounds),
    })
}

/// Magic wand: the 4-connected region around `seed` whose pixels are within
/// `tolerance` of the seed colour on every channel (R, G, B and A
/// independently).
pub fn select_similar(buffer: &PixelBuffer, seed: (u32, u32), tolerance: u8) -> Result<Selection> {
    let target = seed_color(buffer, seed)?;
    let region = grow_region(buffer, seed, |p| within_tolerance(p, target.0, tolerance));
    Ok(build_selection(buffer, target, region.state, region.bounds))
}

/// Magic wand in global mode: every pixel within `tolerance` of the seed
/// colour, connected to the seed or not.
pub fn select_global(buffer: &PixelBuffer, seed: (u32, u32), tolerance: u8) -> Result<Selection> {
    let target = seed_color(buffer, seed)?;
    let flat = buffer.as_raw();
    let wu = buffer.width() as usize;

    let mut state = vec![REJECTED; flat.len() / 4];
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (seed.0, seed.1, seed.0, seed.1);
    for (idx, s) in state.iter_mut().enumerate() {
        if within_tolerance(pix(flat, idx), target.0, tolerance) {
            *s = INCLUDED;
            let x = (idx % wu) as u32;
            let y = (idx / wu) as u32;
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
    }

    let bounds = Rect::from_min_max(min_x, min_y, max_x, max_y);
    Ok(build_selection(buffer, target, state, bounds))
}

fn build_selection(buffer: &PixelBuffer, target: Rgba<u8>, mut state: Vec<u8>, bounds: Rect) -> Selection {
    let wu = buffer.width() as usize;
    let mut pixels = Vec::new();
    for (idx, s) in state.iter_mut().enumerate() {
        if *s == INCLUDED {
            pixels.push(((idx % wu) as u32, (idx / wu) as u32));
        } else {
            *s = 0;
        }
    }
    Selection {
        pixels,
        bounds,
        target,
        width: buffer.width(),
        height: buffer.height(),
        mask: state,
    }
}

/// Write `color` to every selected pixel of `buffer`.
///
/// The selection must have been taken from a buffer of the same size.
pub fn fill_selection(buffer: &mut PixelBuffer, selection: &Selection, color: Rgba<u8>) -> Result<u64> {
    if buffer.dimensions() != selection.dimensions() {
        return Err(EngineError::InvalidDimensions {
            width: selection.width as u64,
            height: selection.height as u64,
        });
    }
    let raw = buffer.as_raw_mut();
    for (px, &m) in raw.chunks_exact_mut(4).zip(selection.mask.iter()) {
        if m == INCLUDED {
            px.copy_from_slice(&color.0);
        }
    }
    Ok(selection.pixels.len() as u64)
}
