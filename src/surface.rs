//! Rendering Surface Interface
//!
//! The engine never paints pixels. It talks to an external canvas through
//! this narrow trait and receives user gestures back as `SurfaceEvent`s.
//! Surface-side visual objects are referenced by opaque ids only; the
//! engine keeps a non-owning lookup from those ids to its own state.
//!
//! `HeadlessSurface` is the reference implementation used by the CLI and
//! the test suite: it records every operation and "decodes" payloads by
//! reading a declared-dimensions header instead of real pixel data.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::pool::ImageData;
use crate::templates::Rect;

/// Opaque id of a visual object owned by the surface.
pub type SurfaceObjectId = u64;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceConfig {
    pub background_color: String,
    pub width: f64,
    pub height: f64,
    pub selectable: bool,
}

/// Result of decoding an image payload into a renderable surface object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedImage {
    pub object_id: SurfaceObjectId,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("surface rejected image payload: {0}")]
    DecodeRejected(String),

    #[error("unknown surface object: {0}")]
    UnknownObject(SurfaceObjectId),
}

/// Gestures and notifications flowing from the surface into the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    /// User interacted with a still-empty placeholder cell.
    PlaceholderInteracted { cell_index: usize },
    /// Surface selection changed; carries the surface-side object id, or
    /// `None` when the user clicked outside every object.
    SelectionChanged(Option<SurfaceObjectId>),
    /// Container bounds changed.
    Resized { width: f64, height: f64 },
}

pub trait RenderSurface {
    /// (Re)configures the canvas; drops everything previously drawn.
    fn configure(&mut self, config: &SurfaceConfig);

    /// Draws an empty placeholder cell and returns its visual handle.
    fn add_placeholder(&mut self, cell_index: usize, rect: Rect) -> SurfaceObjectId;

    fn remove_placeholder(&mut self, handle: SurfaceObjectId);

    /// Drops a previously placed image object (cell cleared).
    fn remove_object(&mut self, handle: SurfaceObjectId);

    /// Decodes a payload into a renderable object. The one suspension
    /// point of the system; may reject corrupt payloads.
    fn decode_image(&mut self, payload: &ImageData) -> Result<DecodedImage, SurfaceError>;

    /// Attaches a decoded image at `dest`, clipped to `clip`, scaled by
    /// `scale` on both axes.
    fn place_image(
        &mut self,
        object_id: SurfaceObjectId,
        dest: Rect,
        clip: Rect,
        scale: f64,
    ) -> Result<(), SurfaceError>;

    fn clear(&mut self);

    /// Rasterizes the current canvas. Consumed by the export/download
    /// collaborator, not by the engine.
    fn export_raster(&self) -> Vec<u8>;
}

/// One image painted onto the headless surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaintedImage {
    pub object_id: SurfaceObjectId,
    pub dest: Rect,
    pub clip: Rect,
    pub scale: f64,
    pub source_width: f64,
    pub source_height: f64,
}

/// Recording surface for tests and the CLI.
///
/// Decode contract: a payload whose bytes start with an ascii
/// `WIDTHxHEIGHT:` header (e.g. `b"800x600:..."`) reports those intrinsic
/// dimensions; a header-less payload falls back to 1024x768; an empty
/// payload is rejected as corrupt.
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    config: Option<SurfaceConfig>,
    next_object_id: SurfaceObjectId,
    placeholders: HashMap<SurfaceObjectId, (usize, Rect)>,
    decoded: HashMap<SurfaceObjectId, (f64, f64)>,
    painted: Vec<PaintedImage>,
}

const FALLBACK_SOURCE_SIZE: (f64, f64) = (1024.0, 768.0);

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn placeholder_count(&self) -> usize {
        self.placeholders.len()
    }

    pub fn painted(&self) -> &[PaintedImage] {
        &self.painted
    }

    fn next_id(&mut self) -> SurfaceObjectId {
        self.next_object_id += 1;
        self.next_object_id
    }

    fn parse_header(payload: &ImageData) -> Option<(f64, f64)> {
        let text = std::str::from_utf8(payload.as_bytes()).ok()?;
        let header = text.split(':').next()?;
        let (w, h) = header.split_once('x')?;
        let width: f64 = w.trim().parse().ok()?;
        let height: f64 = h.trim().parse().ok()?;
        if width > 0.0 && height > 0.0 {
            Some((width, height))
        } else {
            None
        }
    }
}

impl RenderSurface for HeadlessSurface {
    fn configure(&mut self, config: &SurfaceConfig) {
        self.config = Some(config.clone());
        self.placeholders.clear();
        self.decoded.clear();
        self.painted.clear();
    }

    fn add_placeholder(&mut self, cell_index: usize, rect: Rect) -> SurfaceObjectId {
        let id = self.next_id();
        self.placeholders.insert(id, (cell_index, rect));
        id
    }

    fn remove_placeholder(&mut self, handle: SurfaceObjectId) {
        self.placeholders.remove(&handle);
    }

    fn remove_object(&mut self, handle: SurfaceObjectId) {
        self.painted.retain(|p| p.object_id != handle);
        self.decoded.remove(&handle);
    }

    fn decode_image(&mut self, payload: &ImageData) -> Result<DecodedImage, SurfaceError> {
        if payload.as_bytes().is_empty() {
            return Err(SurfaceError::DecodeRejected("empty payload".to_string()));
        }
        let (width, height) = Self::parse_header(payload).unwrap_or(FALLBACK_SOURCE_SIZE);
        let object_id = self.next_id();
        self.decoded.insert(object_id, (width, height));
        Ok(DecodedImage {
            object_id,
            width,
            height,
        })
    }

    fn place_image(
        &mut self,
        object_id: SurfaceObjectId,
        dest: Rect,
        clip: Rect,
        scale: f64,
    ) -> Result<(), SurfaceError> {
        let (source_width, source_height) = self
            .decoded
            .remove(&object_id)
            .ok_or(SurfaceError::UnknownObject(object_id))?;
        self.painted.push(PaintedImage {
            object_id,
            dest,
            clip,
            scale,
            source_width,
            source_height,
        });
        Ok(())
    }

    fn clear(&mut self) {
        self.placeholders.clear();
        self.decoded.clear();
        self.painted.clear();
    }

    fn export_raster(&self) -> Vec<u8> {
        // Headless raster: a JSON scene description standing in for pixels.
        let scene = serde_json::json!({
            "canvas": self.config,
            "placeholders": self.placeholders.len(),
            "images": self.painted,
        });
        scene.to_string().into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_reads_dimension_header() {
        let mut surface = HeadlessSurface::new();
        let decoded = surface
            .decode_image(&ImageData::from("800x600:payload"))
            .unwrap();
        assert_eq!(decoded.width, 800.0);
        assert_eq!(decoded.height, 600.0);
    }

    #[test]
    fn test_decode_falls_back_without_header() {
        let mut surface = HeadlessSurface::new();
        let decoded = surface.decode_image(&ImageData::from("not-a-header")).unwrap();
        assert_eq!((decoded.width, decoded.height), FALLBACK_SOURCE_SIZE);
    }

    #[test]
    fn test_decode_rejects_empty_payload() {
        let mut surface = HeadlessSurface::new();
        let err = surface.decode_image(&ImageData(Vec::new())).unwrap_err();
        assert!(matches!(err, SurfaceError::DecodeRejected(_)));
    }

    #[test]
    fn test_place_requires_decoded_object() {
        let mut surface = HeadlessSurface::new();
        let rect = Rect {
            left: 0.0,
            top: 0.0,
            width: 10.0,
            height: 10.0,
        };
        let err = surface.place_image(99, rect, rect, 1.0).unwrap_err();
        assert!(matches!(err, SurfaceError::UnknownObject(99)));
    }
}
