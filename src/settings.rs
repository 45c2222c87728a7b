//! Engine settings, persisted as a plain `key=value` text file.
//!
//! Unknown keys are ignored and malformed values fall back to their defaults,
//! so an old or hand-edited file never prevents the engine from starting.

use std::path::Path;

use crate::canvas::MAX_PIXELS;
use crate::error::Result;

/// Tunables for compositing and tool defaults.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineSettings {
    /// Allow the compositor to spread rows across the rayon pool.
    pub parallel_composite: bool,
    /// Documents with fewer pixels than this are always composited on the
    /// calling thread.
    pub parallel_min_pixels: u64,
    /// Upper bound on `width * height` for new documents.
    pub max_document_pixels: u64,
    /// Magic-wand tolerance used when the caller has no preference.
    pub default_tolerance: u8,
    /// Brush / eraser radius used when the caller has no preference.
    pub default_brush_radius: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            parallel_composite: true,
            parallel_min_pixels: 65_536,
            max_document_pixels: MAX_PIXELS,
            default_tolerance: 30,
            default_brush_radius: 8,
        }
    }
}

impl EngineSettings {
    /// Parse settings from `key=value` lines (returns defaults for anything missing).
    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else { continue };
            let key = key.trim();
            let val = val.trim();
            match key {
                "parallel_composite" => {
                    s.parallel_composite = val == "true";
                }
                "parallel_min_pixels" => {
                    s.parallel_min_pixels = val.parse().unwrap_or(s.parallel_min_pixels);
                }
                "max_document_pixels" => {
                    // never allow raising the cap past what a buffer can hold
                    s.max_document_pixels = val
                        .parse::<u64>()
                        .map(|v| v.min(MAX_PIXELS))
                        .unwrap_or(s.max_document_pixels);
                }
                "default_tolerance" => {
                    s.default_tolerance = val.parse().unwrap_or(s.default_tolerance);
                }
                "default_brush_radius" => {
                    s.default_brush_radius = val.parse().unwrap_or(s.default_brush_radius);
                }
                _ => {}
            }
        }
        s
    }

    pub fn to_config_string(&self) -> String {
        format!(
            "parallel_composite={}\n\
             parallel_min_pixels={}\n\
             max_document_pixels={}\n\
             default_tolerance={}\n\
             default_brush_radius={}\n",
            self.parallel_composite,
            self.parallel_min_pixels,
            self.max_document_pixels,
            self.default_tolerance,
            self.default_brush_radius,
        )
    }

    /// Load settings from disk (returns default if the file is missing).
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Self::parse(&content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Save settings to disk, creating the parent directory if needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_config_string())?;
        Ok(())
    }

    /// Whether a document of `pixel_count` pixels should be composited in parallel.
    pub fn use_parallel(&self, pixel_count: u64) -> bool {
        self.parallel_composite && pixel_count >= self.parallel_min_pixels
    }
}
