// ============================================================================
// CPU COMPOSITOR – back-to-front straight-alpha blending of a LayerStack
// ============================================================================
//
// Per pixel, for each visible layer (bottom to top), with 0..255 channels:
//
//   k     = srcA / 255 * opacity
//   outC  = srcC * k + dstC * (1 - k)        for R, G, B
//   outA  = 255  * k + dstA * (1 - k)
//
// Opacity is quantized once per layer to a 1/65536 weight and the blend is
// evaluated as an exact integer ratio, rounded half-up.  Every pixel depends
// only on the same pixel of each layer, so rows are blended independently and
// may be spread across the rayon pool without changing the output.

use image::Rgba;
use rayon::prelude::*;

use crate::canvas::PixelBuffer;
use crate::components::layers::LayerStack;
use crate::error::{EngineError, Result};
use crate::{log_info, log_warn};
use crate::settings::EngineSettings;

/// Composite the stack with default settings.
pub fn composite(stack: &LayerStack) -> Result<PixelBuffer> {
    composite_with(stack, &EngineSettings::default())
}

/// Composite every visible layer of `stack` into a new document-sized buffer.
///
/// Fails with `UnsupportedBlendMode` before doing any work if a visible layer
/// uses a mode other than `Normal`.  Hidden layers are skipped entirely.
pub fn composite_with(stack: &LayerStack, settings: &EngineSettings) -> Result<PixelBuffer> {
    if let Some(layer) = stack
        .layers()
        .iter()
        .find(|l| l.visible && !l.blend_mode.is_supported())
    {
        log_warn!(
            "composite rejected: layer '{}' uses unsupported blend mode {}",
            layer.name,
            layer.blend_mode.name()
        );
        return Err(EngineError::UnsupportedBlendMode(layer.blend_mode));
    }

    if let Some(layer) = stack
        .layers()
        .iter()
        .find(|l| l.buffer().dimensions() != (stack.width(), stack.height()))
    {
        log_warn!(
            "composite rejected: layer '{}' is {}x{}, document is {}x{}",
            layer.name,
            layer.buffer().width(),
            layer.buffer().height(),
            stack.width(),
            stack.height()
        );
        return Err(EngineError::InvalidDimensions {
            width: layer.buffer().width() as u64,
            height: layer.buffer().height() as u64,
        });
    }

    // (pixels, weight) of each contributing layer, bottom first
    let sources: Vec<(&[u8], u64)> = stack
        .layers()
        .iter()
        .map(|l| (l, opacity_weight(l.opacity())))
        .filter(|(l, w)| l.visible && *w > 0)
        .map(|(l, w)| (l.buffer().as_raw(), w))
        .collect();

    let mut out = PixelBuffer::blank(stack.width(), stack.height());
    let stride = stack.width() as usize * 4;
    let parallel = settings.use_parallel(out.pixel_count());
    if parallel {
        log_info!(
            "composite {}x{} ({} contributing layers) on {} threads",
            stack.width(),
            stack.height(),
            sources.len(),
            rayon::current_num_threads()
        );
    }

    let composite_row = |(y, row): (usize, &mut [u8])| {
        let start = y * stride;
        for (src, weight) in &sources {
            blend_row(row, &src[start..start + stride], *weight);
        }
    };

    if parallel {
        out.as_raw_mut()
            .par_chunks_mut(stride)
            .enumerate()
            .for_each(composite_row);
    } else {
        out.as_raw_mut()
            .chunks_mut(stride)
            .enumerate()
            .for_each(composite_row);
    }

    Ok(out)
}

/// Blend `src` onto `dst` in place with the `Normal` rule.
pub(crate) fn blend_buffer_onto(dst: &mut PixelBuffer, src: &PixelBuffer, opacity: f32, parallel: bool) -> Result<()> {
    if dst.dimensions() != src.dimensions() {
        return Err(EngineError::InvalidDimensions {
            width: src.width() as u64,
            height: src.height() as u64,
        });
    }
    let weight = opacity_weight(opacity);
    if weight == 0 {
        return Ok(());
    }
    let stride = dst.width() as usize * 4;
    let src_raw = src.as_raw();
    let dst_raw = dst.as_raw_mut();
    if parallel {
        dst_raw
            .par_chunks_mut(stride)
            .zip(src_raw.par_chunks(stride))
            .for_each(|(d, s)| blend_row(d, s, weight));
    } else {
        blend_row(dst_raw, src_raw, weight);
    }
    Ok(())
}

/// Full opacity as an integer weight.
const WEIGHT_ONE: u64 = 1 << 16;
/// Denominator of `srcA * weight`.
const SCALE: u64 = 255 * WEIGHT_ONE;

/// Quantize a layer opacity to `0..=WEIGHT_ONE`.  NaN and non-positive
/// values give 0.
fn opacity_weight(opacity: f32) -> u64 {
    if opacity.is_nan() || opacity <= 0.0 {
        return 0;
    }
    (opacity.min(1.0) as f64 * WEIGHT_ONE as f64).round() as u64
}

#[inline]
fn blend_row(dst: &mut [u8], src: &[u8], weight: u64) {
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = blend_weighted(
            Rgba([d[0], d[1], d[2], d[3]]),
            Rgba([s[0], s[1], s[2], s[3]]),
            weight,
        );
        d.copy_from_slice(&out.0);
    }
}

/// Straight-alpha `Normal` blend of `top` (scaled by `opacity`) over `base`.
#[inline]
pub fn blend_normal(base: Rgba<u8>, top: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    blend_weighted(base, top, opacity_weight(opacity))
}

#[inline]
fn blend_weighted(base: Rgba<u8>, top: Rgba<u8>, weight: u64) -> Rgba<u8> {
    if top[3] == 0 || weight == 0 {
        return base;
    }
    if top[3] == 255 && weight == WEIGHT_ONE {
        return top;
    }

    // k = ka / SCALE
    let ka = top[3] as u64 * weight;
    let inv = SCALE - ka;
    let mix = |s: u64, d: u8| ratio_half_up(s * ka + d as u64 * inv);
    Rgba([
        mix(top[0] as u64, base[0]),
        mix(top[1] as u64, base[1]),
        mix(top[2] as u64, base[2]),
        mix(255, base[3]),
    ])
}

/// `num / SCALE` rounded half-up.  `num <= 255 * SCALE`, so the result fits.
#[inline(always)]
fn ratio_half_up(num: u64) -> u8 {
    ((2 * num + SCALE) / (2 * SCALE)) as u8
}
