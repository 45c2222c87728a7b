// ============================================================================
// TOOLS – pixel-editing entry points used by painting / UI callers
// ============================================================================
//
// Every tool acts on the active layer of the stack it is given.  Tools that
// write pixels check the layer's lock first and fail with `LayerLocked`
// before touching anything; read-only tools (magic wand, copy) work on
// locked layers too.

use image::Rgba;

use crate::canvas::{PixelBuffer, Rect, TRANSPARENT};
use crate::components::layers::LayerStack;
use crate::error::Result;
use crate::log_info;
use crate::ops::fill::{self, FillOutcome, Selection};

/// Fill tool: flood fill the active layer from `seed` with `color`.
pub fn fill_active(stack: &mut LayerStack, seed: (u32, u32), color: Rgba<u8>) -> Result<FillOutcome> {
    stack.active().ensure_unlocked()?;
    let outcome = fill::flood_fill(stack.active_mut().raw_buffer_mut(), seed, color)?;
    log_info!(
        "fill at ({}, {}) on '{}': {} px",
        seed.0,
        seed.1,
        stack.active().name,
        outcome.filled
    );
    Ok(outcome)
}

/// Magic wand on the active layer.  `global` selects every similar pixel on
/// the layer instead of only the region connected to `seed`.
pub fn select_on_active(stack: &LayerStack, seed: (u32, u32), tolerance: u8, global: bool) -> Result<Selection> {
    let buffer = stack.active().buffer();
    if global {
        fill::select_global(buffer, seed, tolerance)
    } else {
        fill::select_similar(buffer, seed, tolerance)
    }
}

/// Paint `color` into every pixel of `selection` on the active layer.
pub fn fill_selection_active(stack: &mut LayerStack, selection: &Selection, color: Rgba<u8>) -> Result<u64> {
    stack.active().ensure_unlocked()?;
    fill::fill_selection(stack.active_mut().raw_buffer_mut(), selection, color)
}

/// Brush: overwrite a filled disc of `radius` around `center` with `color`.
///
/// The disc is clipped to the canvas.  Returns the rectangle that was
/// written, or `None` when the dab lies entirely off-canvas.
pub fn brush_dab(stack: &mut LayerStack, center: (i64, i64), radius: u32, color: Rgba<u8>) -> Result<Option<Rect>> {
    stack.active().ensure_unlocked()?;
    Ok(stamp_disc(stack.active_mut().raw_buffer_mut(), center, radius, color))
}

/// Eraser: clear a disc of `radius` around `center` to transparent.
pub fn erase_dab(stack: &mut LayerStack, center: (i64, i64), radius: u32) -> Result<Option<Rect>> {
    brush_dab(stack, center, radius, TRANSPARENT)
}

/// Brush stroke from `from` to `to`: dabs spaced half a radius apart (at
/// least one pixel), including both end points.
///
/// The segment is first clipped to the canvas grown by `radius` on every
/// side, so only the part that can reach a pixel is stepped; end points far
/// off the canvas cost nothing extra.
pub fn brush_line(
    stack: &mut LayerStack,
    from: (i64, i64),
    to: (i64, i64),
    radius: u32,
    color: Rgba<u8>,
) -> Result<Option<Rect>> {
    stack.active().ensure_unlocked()?;
    let buffer = stack.active_mut().raw_buffer_mut();

    let r = radius as f64;
    let lo = (-r, -r);
    let hi = (buffer.width() as f64 - 1.0 + r, buffer.height() as f64 - 1.0 + r);
    let p = (from.0 as f64, from.1 as f64);
    let d = (to.0 as f64 - p.0, to.1 as f64 - p.1);
    let Some((t0, t1)) = clip_segment(p, d, lo, hi) else {
        return Ok(None);
    };
    let at = |t: f64| ((p.0 + d.0 * t).clamp(lo.0, hi.0), (p.1 + d.1 * t).clamp(lo.1, hi.1));
    let (start, end) = (at(t0), at(t1));

    let (sx, sy) = (end.0 - start.0, end.1 - start.1);
    let spacing = (r / 2.0).max(1.0);
    let steps = (sx.hypot(sy) / spacing).ceil().max(1.0) as u64;

    let mut dirty: Option<Rect> = None;
    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        let cx = (start.0 + sx * t).round() as i64;
        let cy = (start.1 + sy * t).round() as i64;
        if let Some(rect) = stamp_disc(buffer, (cx, cy), radius, color) {
            dirty = Some(union(dirty, rect));
        }
    }
    Ok(dirty)
}

/// Linear gradient over the whole active layer.
///
/// Each pixel is projected onto the line from `start` to `end`; the
/// parameter is clamped to `[0, 1]` and picks a colour between `fg` (at
/// `start`) and `bg` (at `end`), channel by channel, rounded half-up.  Every
/// pixel is overwritten.  A zero-length gradient (`start == end`) paints
/// nothing and returns `None`.
pub fn gradient_active(
    stack: &mut LayerStack,
    start: (i64, i64),
    end: (i64, i64),
    fg: Rgba<u8>,
    bg: Rgba<u8>,
) -> Result<Option<Rect>> {
    stack.active().ensure_unlocked()?;
    let vx = end.0 as f64 - start.0 as f64;
    let vy = end.1 as f64 - start.1 as f64;
    let len2 = vx * vx + vy * vy;
    if start == end || len2 == 0.0 {
        return Ok(None);
    }

    let buffer = stack.active_mut().raw_buffer_mut();
    let bounds = buffer.bounds();
    let stride = buffer.width() as usize * 4;
    let (sx, sy) = (start.0 as f64, start.1 as f64);
    for (y, row) in buffer.as_raw_mut().chunks_exact_mut(stride).enumerate() {
        let py = y as f64 - sy;
        for (x, px) in row.chunks_exact_mut(4).enumerate() {
            let t = (((x as f64 - sx) * vx + py * vy) / len2).clamp(0.0, 1.0);
            for c in 0..4 {
                let (a, b) = (fg.0[c] as f64, bg.0[c] as f64);
                px[c] = (a + (b - a) * t + 0.5).floor() as u8;
            }
        }
    }
    log_info!(
        "gradient ({}, {}) -> ({}, {}) on '{}'",
        start.0,
        start.1,
        end.0,
        end.1,
        stack.active().name
    );
    Ok(Some(bounds))
}

/// Clone stamp: copy the `size x size` square whose top-left corner is
/// `source` and paste it centred on `dest`.
///
/// Parts of the source square outside the canvas copy as transparent; the
/// paste is clipped to the canvas.
pub fn clone_stamp(stack: &mut LayerStack, source: (i64, i64), dest: (i64, i64), size: u32) -> Result<Option<Rect>> {
    stack.active().ensure_unlocked()?;
    let mut patch = PixelBuffer::new(size, size)?;
    // pasting the layer at a negative offset performs a clipped read
    patch.write_rect(source.0.saturating_neg(), source.1.saturating_neg(), stack.active().buffer());

    let half = size as i64 / 2;
    let written = stack
        .active_mut().raw_buffer_mut()
        .write_rect(dest.0.saturating_sub(half), dest.1.saturating_sub(half), &patch);
    Ok(written)
}

/// Copy a rectangle of the active layer.  The rectangle must be fully inside
/// the canvas.
pub fn copy_active(stack: &LayerStack, rect: Rect) -> Result<PixelBuffer> {
    stack
        .active()
        .buffer()
        .read_rect(rect.x, rect.y, rect.width, rect.height)
}

/// Paste `patch` onto the active layer with its top-left corner at `(x, y)`,
/// clipped to the canvas.
pub fn paste_into_active(stack: &mut LayerStack, x: i64, y: i64, patch: &PixelBuffer) -> Result<Option<Rect>> {
    stack.active().ensure_unlocked()?;
    Ok(stack.active_mut().raw_buffer_mut().write_rect(x, y, patch))
}

/// Clear the whole active layer to transparent.
pub fn clear_active(stack: &mut LayerStack) -> Result<()> {
    stack.active().ensure_unlocked()?;
    stack.active_mut().raw_buffer_mut().clear();
    Ok(())
}

fn stamp_disc(buffer: &mut PixelBuffer, center: (i64, i64), radius: u32, color: Rgba<u8>) -> Option<Rect> {
    // i128 keeps `center ± r` and `r²` exact for any i64 centre and u32 radius
    let (cx, cy) = (center.0 as i128, center.1 as i128);
    let r = radius as i128;
    let x0 = (cx - r).max(0);
    let y0 = (cy - r).max(0);
    let x1 = (cx + r).min(buffer.width() as i128 - 1);
    let y1 = (cy + r).min(buffer.height() as i128 - 1);
    if x0 > x1 || y0 > y1 {
        return None;
    }

    let r2 = r * r;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (u32::MAX, u32::MAX, 0, 0);
    let mut any = false;
    let wu = buffer.width() as usize;
    let raw = buffer.as_raw_mut();
    for y in y0..=y1 {
        let dy2 = (y - cy) * (y - cy);
        for x in x0..=x1 {
            let dx = x - cx;
            if dx * dx + dy2 > r2 {
                continue;
            }
            let (xu, yu) = (x as u32, y as u32);
            let o = (yu as usize * wu + xu as usize) * 4;
            raw[o..o + 4].copy_from_slice(&color.0);
            min_x = min_x.min(xu);
            min_y = min_y.min(yu);
            max_x = max_x.max(xu);
            max_y = max_y.max(yu);
            any = true;
        }
    }
    any.then(|| Rect::from_min_max(min_x, min_y, max_x, max_y))
}

/// Liang-Barsky: the parameter range `[t0, t1]` within `[0, 1]` for which
/// `p + d * t` lies inside the box `lo..=hi`, or `None` when the segment
/// misses it.
fn clip_segment(p: (f64, f64), d: (f64, f64), lo: (f64, f64), hi: (f64, f64)) -> Option<(f64, f64)> {
    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
    for (p, d, lo, hi) in [(p.0, d.0, lo.0, hi.0), (p.1, d.1, lo.1, hi.1)] {
        if d == 0.0 {
            if p < lo || p > hi {
                return None;
            }
            continue;
        }
        let (a, b) = ((lo - p) / d, (hi - p) / d);
        t0 = t0.max(a.min(b));
        t1 = t1.min(a.max(b));
        if t0 > t1 {
            return None;
        }
    }
    Some((t0, t1))
}

fn union(a: Option<Rect>, b: Rect) -> Rect {
    match a {
        None => b,
        Some(a) => Rect::from_min_max(
            a.x.min(b.x),
            a.y.min(b.y),
            a.max_x().max(b.max_x()),
            a.max_y().max(b.max_y()),
        ),
    }
}
