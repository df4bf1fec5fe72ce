//! Composition State - Session Aggregate
//!
//! The authoritative record of everything placed in the current collage:
//! per-image filter parameters, the single selection cursor, the upload
//! pool, and the epoch token that fences stale decode completions.
//!
//! All mutation goes through named commands on `CompositionSession`; no
//! collaborator writes fields directly.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pool::ImagePool;
use crate::templates::{RatioId, TemplateId};

pub type ImageId = String;

/// Non-destructive per-image adjustment scalars. Stored here, applied by
/// the rendering surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSet {
    pub brightness: f64,
    pub contrast: f64,
    pub noise: f64,
    pub saturation: f64,
    pub vibrance: f64,
    pub blur: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Brightness,
    Contrast,
    Noise,
    Saturation,
    Vibrance,
    Blur,
}

impl FilterKind {
    pub fn name(&self) -> &'static str {
        match self {
            FilterKind::Brightness => "brightness",
            FilterKind::Contrast => "contrast",
            FilterKind::Noise => "noise",
            FilterKind::Saturation => "saturation",
            FilterKind::Vibrance => "vibrance",
            FilterKind::Blur => "blur",
        }
    }
}

impl std::str::FromStr for FilterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "brightness" => Ok(FilterKind::Brightness),
            "contrast" => Ok(FilterKind::Contrast),
            "noise" => Ok(FilterKind::Noise),
            "saturation" => Ok(FilterKind::Saturation),
            "vibrance" => Ok(FilterKind::Vibrance),
            "blur" => Ok(FilterKind::Blur),
            other => Err(format!("unknown filter: {other}")),
        }
    }
}

impl FilterSet {
    /// Overwrites exactly one scalar; the rest are untouched.
    pub fn set(&mut self, kind: FilterKind, value: f64) {
        match kind {
            FilterKind::Brightness => self.brightness = value,
            FilterKind::Contrast => self.contrast = value,
            FilterKind::Noise => self.noise = value,
            FilterKind::Saturation => self.saturation = value,
            FilterKind::Vibrance => self.vibrance = value,
            FilterKind::Blur => self.blur = value,
        }
    }

    pub fn get(&self, kind: FilterKind) -> f64 {
        match kind {
            FilterKind::Brightness => self.brightness,
            FilterKind::Contrast => self.contrast,
            FilterKind::Noise => self.noise,
            FilterKind::Saturation => self.saturation,
            FilterKind::Vibrance => self.vibrance,
            FilterKind::Blur => self.blur,
        }
    }
}

/// One image placed into a cell. Owned exclusively by the session; the
/// rendering surface only ever holds the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedImage {
    pub id: ImageId,
    pub cell_index: usize,
    pub filters: FilterSet,
}

impl PlacedImage {
    pub fn new(id: ImageId, cell_index: usize) -> Self {
        Self {
            id,
            cell_index,
            filters: FilterSet::default(),
        }
    }
}

/// Aggregate root for one collage-editing session.
#[derive(Debug)]
pub struct CompositionSession {
    template_id: TemplateId,
    ratio_id: RatioId,
    pool: ImagePool,
    placed: Vec<PlacedImage>,
    selection: Option<ImageId>,
    epoch: u64,
}

impl CompositionSession {
    pub fn new(template_id: TemplateId, ratio_id: RatioId) -> Self {
        Self {
            template_id,
            ratio_id,
            pool: ImagePool::new(),
            placed: Vec::new(),
            selection: None,
            epoch: 0,
        }
    }

    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    pub fn ratio_id(&self) -> &str {
        &self.ratio_id
    }

    pub fn pool(&self) -> &ImagePool {
        &self.pool
    }

    pub fn pool_mut(&mut self) -> &mut ImagePool {
        &mut self.pool
    }

    /// Generation token captured by placement plans; advanced on every
    /// reset so completions against a torn-down collage are discarded.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn placed(&self) -> &[PlacedImage] {
        &self.placed
    }

    pub fn placed_image(&self, id: &str) -> Option<&PlacedImage> {
        self.placed.iter().find(|img| img.id == id)
    }

    pub fn is_cell_occupied(&self, cell_index: usize) -> bool {
        self.placed.iter().any(|img| img.cell_index == cell_index)
    }

    pub fn selection(&self) -> Option<&ImageId> {
        self.selection.as_ref()
    }

    /// Mints a collision-free placement id.
    pub fn mint_id(&self) -> ImageId {
        Uuid::new_v4().to_string()
    }

    /// Inserts a placed image. `capacity` is the active template's cell
    /// count; planning never produces more, so violations are bugs.
    pub fn insert_placed(&mut self, image: PlacedImage, capacity: usize) {
        debug_assert!(self.placed.len() < capacity, "collage over capacity");
        debug_assert!(
            self.placed_image(&image.id).is_none(),
            "duplicate placement id"
        );
        debug_assert!(
            !self.is_cell_occupied(image.cell_index),
            "cell already occupied"
        );
        self.placed.push(image);
    }

    /// Overwrites one filter scalar. Returns false for unknown ids.
    pub fn update_filter(&mut self, id: &str, kind: FilterKind, value: f64) -> bool {
        match self.placed.iter_mut().find(|img| img.id == id) {
            Some(img) => {
                img.filters.set(kind, value);
                log::debug!("filter {}={} on {}", kind.name(), value, id);
                true
            }
            None => false,
        }
    }

    /// Deletes a placed image, clearing the selection if it pointed there.
    /// Returns the removed record so the caller can restore the cell.
    pub fn remove_image(&mut self, id: &str) -> Option<PlacedImage> {
        let pos = self.placed.iter().position(|img| img.id == id)?;
        let removed = self.placed.remove(pos);
        if self.selection.as_deref() == Some(id) {
            self.selection = None;
        }
        Some(removed)
    }

    /// Sets the selection if the id refers to a placed image; unknown ids
    /// are a no-op so the selection never dangles.
    pub fn select(&mut self, id: &str) -> bool {
        if self.placed_image(id).is_some() {
            self.selection = Some(id.to_string());
            true
        } else {
            false
        }
    }

    pub fn deselect(&mut self) {
        self.selection = None;
    }

    /// Template/ratio change: every placement is invalidated, the pool
    /// cursor rewinds to 0, and the epoch advances so in-flight decode
    /// completions from the old geometry are fenced out.
    pub fn reset_for(&mut self, template_id: TemplateId, ratio_id: RatioId) {
        log::debug!(
            "session reset: template={} ratio={} epoch={}",
            template_id,
            ratio_id,
            self.epoch + 1
        );
        self.template_id = template_id;
        self.ratio_id = ratio_id;
        self.placed.clear();
        self.selection = None;
        self.pool.rewind();
        self.epoch += 1;
    }

    /// Return-to-upload teardown: also drops the pool contents.
    pub fn clear_all(&mut self) {
        self.placed.clear();
        self.selection = None;
        self.pool.clear();
        self.epoch += 1;
    }
}
