//! Collage Engine - Command/Query Facade
//!
//! Owns the template registry, the composition session and the rendering
//! surface, and reconciles surface gestures with session state. This is
//! the only module UI code talks to.
//!
//! Every mutation is a named command returning a discriminated result;
//! the engine never swallows an error, but `PlacementRenderFailed` keeps
//! its pool entry consumed by design (a corrupt upload is spent, the cell
//! stays empty).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::placement::{
    cover_scale, plan_auto_population, plan_manual, CommitOutcome, PlacementTicket, PlanError,
};
use crate::pool::{ImageData, PoolExhausted};
use crate::session::{CompositionSession, FilterKind, FilterSet, ImageId, PlacedImage};
use crate::surface::{RenderSurface, SurfaceConfig, SurfaceError, SurfaceEvent, SurfaceObjectId};
use crate::templates::{AspectRatio, CanvasSize, Template, TemplateRegistry};

const CANVAS_BACKGROUND: &str = "#1a1a1a";

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no more images available: {0}")]
    PoolExhausted(#[from] PoolExhausted),

    #[error("rendering surface rejected the image: {0}")]
    PlacementRenderFailed(#[from] SurfaceError),

    #[error("unknown image: {0}")]
    UnknownImage(ImageId),

    #[error("template not found: {0}")]
    TemplateNotFound(String),

    #[error("aspect ratio not found: {0}")]
    RatioNotFound(String),

    #[error("cell {0} is already occupied")]
    CellOccupied(usize),

    #[error("cell {0} is out of range for the active template")]
    CellOutOfRange(usize),
}

impl From<PlanError> for EngineError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::PoolExhausted(e) => EngineError::PoolExhausted(e),
            PlanError::CellOccupied(i) => EngineError::CellOccupied(i),
            PlanError::CellOutOfRange(i) => EngineError::CellOutOfRange(i),
        }
    }
}

/// Per-cell result of one bulk population pass. Render rejections keep
/// the consume-and-continue policy but are reported here so the UI layer
/// can present them; they are never reduced to a log line alone.
#[derive(Debug)]
pub enum PopulateOutcome {
    Placed {
        cell_index: usize,
        image_id: ImageId,
    },
    /// Decode rejected; the pool entry stays consumed, the cell empty.
    RenderFailed {
        cell_index: usize,
        error: SurfaceError,
    },
}

/// Which editing panel the UI should show. Selecting an image (or placing
/// one manually) flips to the image controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PanelMode {
    TemplatePicker,
    ImageControls,
}

pub struct CollageEngine<S: RenderSurface> {
    registry: TemplateRegistry,
    session: CompositionSession,
    surface: S,
    max_width: f64,
    max_height: f64,
    canvas: CanvasSize,
    /// Cell index -> placeholder handle, for cells still empty.
    placeholders: HashMap<usize, SurfaceObjectId>,
    /// Weak, non-owning map from surface visual objects to placed images.
    object_lookup: HashMap<SurfaceObjectId, ImageId>,
    panel: PanelMode,
}

impl<S: RenderSurface> CollageEngine<S> {
    /// Builds an engine against the first template and ratio in the
    /// registry, lays out placeholders, and leaves the pool empty.
    pub fn new(
        registry: TemplateRegistry,
        surface: S,
        max_width: f64,
        max_height: f64,
    ) -> Result<Self, EngineError> {
        let template_id = registry
            .templates()
            .first()
            .map(|t| t.id.clone())
            .ok_or_else(|| EngineError::TemplateNotFound("<empty registry>".to_string()))?;
        let ratio_id = registry
            .ratios()
            .first()
            .map(|r| r.id.clone())
            .ok_or_else(|| EngineError::RatioNotFound("<empty registry>".to_string()))?;

        let mut engine = Self {
            registry,
            session: CompositionSession::new(template_id, ratio_id),
            surface,
            max_width,
            max_height,
            canvas: CanvasSize {
                width: max_width,
                height: max_height,
            },
            placeholders: HashMap::new(),
            object_lookup: HashMap::new(),
            panel: PanelMode::TemplatePicker,
        };
        engine.rebuild()?;
        Ok(engine)
    }

    // --- commands ---

    /// Activates a template. Invalidates every placement, rewinds the
    /// pool cursor and rebuilds the placeholder grid; call [`populate`]
    /// afterwards to re-run bulk auto-population.
    ///
    /// [`populate`]: CollageEngine::populate
    pub fn set_template(&mut self, id: &str) -> Result<(), EngineError> {
        if self.registry.template(id).is_none() {
            return Err(EngineError::TemplateNotFound(id.to_string()));
        }
        let ratio_id = self.session.ratio_id().to_string();
        self.session.reset_for(id.to_string(), ratio_id);
        self.rebuild()
    }

    /// Activates an aspect ratio; same reset semantics as `set_template`.
    pub fn set_aspect_ratio(&mut self, id: &str) -> Result<(), EngineError> {
        if self.registry.ratio(id).is_none() {
            return Err(EngineError::RatioNotFound(id.to_string()));
        }
        let template_id = self.session.template_id().to_string();
        self.session.reset_for(template_id, id.to_string());
        self.rebuild()
    }

    /// Appends uploads to the pool. Never disturbs existing placements or
    /// the consumption cursor.
    pub fn append_to_pool(&mut self, images: Vec<ImageData>) {
        log::info!("pool: appending {} image(s)", images.len());
        self.session.pool_mut().append(images);
    }

    /// Bulk auto-population: drains the pool into still-empty cells in
    /// cell order. Individual render rejections do not abort the pass;
    /// they come back as [`PopulateOutcome::RenderFailed`] with the entry
    /// consumed. Everything else propagates.
    pub fn populate(&mut self) -> Result<Vec<PopulateOutcome>, EngineError> {
        let template = self.active_template()?.clone();
        let tickets = plan_auto_population(&mut self.session, &template, self.canvas);
        let mut outcomes = Vec::with_capacity(tickets.len());
        for ticket in tickets {
            let cell_index = ticket.cell_index;
            match self.commit_placement(ticket) {
                Ok(CommitOutcome::Placed(image_id)) => {
                    outcomes.push(PopulateOutcome::Placed {
                        cell_index,
                        image_id,
                    });
                }
                // Planned and committed in the same tick; cannot go stale.
                Ok(CommitOutcome::Stale) => {}
                Err(EngineError::PlacementRenderFailed(error)) => {
                    log::warn!("placement render failed, pool entry stays consumed: {error}");
                    outcomes.push(PopulateOutcome::RenderFailed { cell_index, error });
                }
                Err(other) => return Err(other),
            }
        }
        Ok(outcomes)
    }

    /// Manual placement into a still-empty cell: consumes the next pool
    /// entry regardless of the cell's index.
    pub fn place_into_cell(&mut self, cell_index: usize) -> Result<ImageId, EngineError> {
        let ticket = self.plan_manual_placement(cell_index)?;
        let image_id = ticket.image_id.clone();
        match self.commit_placement(ticket)? {
            CommitOutcome::Placed(id) => {
                self.panel = PanelMode::ImageControls;
                Ok(id)
            }
            // Planning and committing happen in the same tick here, so the
            // epoch cannot have moved.
            CommitOutcome::Stale => Err(EngineError::UnknownImage(image_id)),
        }
    }

    /// Planning half of manual placement, exposed for drivers that await
    /// decode completions themselves. Consumes the pool entry.
    pub fn plan_manual_placement(
        &mut self,
        cell_index: usize,
    ) -> Result<PlacementTicket, EngineError> {
        let template = self.active_template()?.clone();
        Ok(plan_manual(
            &mut self.session,
            &template,
            self.canvas,
            cell_index,
        )?)
    }

    /// Completion half of a placement: decodes, paints, records. Tickets
    /// planned before a session reset are discarded as [`CommitOutcome::Stale`]
    /// without touching state. A decode rejection returns
    /// `PlacementRenderFailed`; the pool entry stays consumed and the
    /// placeholder stays up.
    pub fn commit_placement(
        &mut self,
        ticket: PlacementTicket,
    ) -> Result<CommitOutcome, EngineError> {
        if ticket.epoch != self.session.epoch() {
            log::warn!(
                "discarding stale placement for cell {} (epoch {} != {})",
                ticket.cell_index,
                ticket.epoch,
                self.session.epoch()
            );
            return Ok(CommitOutcome::Stale);
        }

        let decoded = self.surface.decode_image(&ticket.payload)?;
        let scale = cover_scale(ticket.scale_to, ticket.cell_rect, decoded.width, decoded.height);
        self.surface
            .place_image(decoded.object_id, ticket.cell_rect, ticket.cell_rect, scale)?;
        if let Some(handle) = self.placeholders.remove(&ticket.cell_index) {
            self.surface.remove_placeholder(handle);
        }

        let capacity = self.max_placeable();
        self.session
            .insert_placed(PlacedImage::new(ticket.image_id.clone(), ticket.cell_index), capacity);
        self.object_lookup
            .insert(decoded.object_id, ticket.image_id.clone());

        log::info!(
            "placed pool entry {} into cell {} as {}",
            ticket.pool_index,
            ticket.cell_index,
            ticket.image_id
        );
        Ok(CommitOutcome::Placed(ticket.image_id))
    }

    /// Overwrites one filter scalar on a placed image.
    pub fn update_filter(
        &mut self,
        id: &str,
        kind: FilterKind,
        value: f64,
    ) -> Result<(), EngineError> {
        if self.session.update_filter(id, kind, value) {
            Ok(())
        } else {
            Err(EngineError::UnknownImage(id.to_string()))
        }
    }

    /// Deletes a placed image and restores its cell to a placeholder.
    pub fn remove_image(&mut self, id: &str) -> Result<(), EngineError> {
        let removed = self
            .session
            .remove_image(id)
            .ok_or_else(|| EngineError::UnknownImage(id.to_string()))?;

        let stale_objects: Vec<SurfaceObjectId> = self
            .object_lookup
            .iter()
            .filter(|(_, image_id)| image_id.as_str() == id)
            .map(|(object_id, _)| *object_id)
            .collect();
        for object_id in stale_objects {
            self.object_lookup.remove(&object_id);
            self.surface.remove_object(object_id);
        }

        let template = self.active_template()?.clone();
        let rect = template.cells[removed.cell_index].geometry(self.canvas);
        let handle = self.surface.add_placeholder(removed.cell_index, rect);
        self.placeholders.insert(removed.cell_index, handle);
        log::info!("removed {} from cell {}", id, removed.cell_index);
        Ok(())
    }

    /// Reconciles a surface gesture with session state.
    pub fn handle_event(&mut self, event: SurfaceEvent) -> Result<(), EngineError> {
        match event {
            SurfaceEvent::PlaceholderInteracted { cell_index } => {
                self.place_into_cell(cell_index)?;
                Ok(())
            }
            SurfaceEvent::SelectionChanged(Some(object_id)) => {
                // Resolve through the weak lookup; an object we never
                // placed (or already removed) is a no-op so the selection
                // never dangles.
                if let Some(image_id) = self.object_lookup.get(&object_id).cloned() {
                    if self.session.select(&image_id) {
                        self.panel = PanelMode::ImageControls;
                    }
                }
                Ok(())
            }
            SurfaceEvent::SelectionChanged(None) => {
                self.session.deselect();
                Ok(())
            }
            SurfaceEvent::Resized { width, height } => {
                self.max_width = width;
                self.max_height = height;
                let template_id = self.session.template_id().to_string();
                let ratio_id = self.session.ratio_id().to_string();
                self.session.reset_for(template_id, ratio_id);
                self.rebuild()?;
                self.populate()?;
                Ok(())
            }
        }
    }

    /// Return-to-upload teardown: drops the pool, every placement and the
    /// whole canvas.
    pub fn reset(&mut self) {
        self.session.clear_all();
        self.surface.clear();
        self.placeholders.clear();
        self.object_lookup.clear();
        self.panel = PanelMode::TemplatePicker;
    }

    // --- queries ---

    pub fn placed_images(&self) -> &[PlacedImage] {
        self.session.placed()
    }

    pub fn placed_image(&self, id: &str) -> Option<&PlacedImage> {
        self.session.placed_image(id)
    }

    pub fn filters_of(&self, id: &str) -> Result<FilterSet, EngineError> {
        self.session
            .placed_image(id)
            .map(|img| img.filters)
            .ok_or_else(|| EngineError::UnknownImage(id.to_string()))
    }

    pub fn selection(&self) -> Option<&ImageId> {
        self.session.selection()
    }

    pub fn remaining_pool_count(&self) -> usize {
        self.session.pool().remaining()
    }

    /// Cell count of the active template; the hard cap on placements.
    pub fn max_placeable(&self) -> usize {
        self.registry
            .template(self.session.template_id())
            .map(Template::capacity)
            .unwrap_or(0)
    }

    pub fn has_images(&self) -> bool {
        !self.session.pool().is_empty()
    }

    pub fn panel_mode(&self) -> PanelMode {
        self.panel
    }

    pub fn epoch(&self) -> u64 {
        self.session.epoch()
    }

    pub fn canvas_size(&self) -> CanvasSize {
        self.canvas
    }

    pub fn active_template(&self) -> Result<&Template, EngineError> {
        let id = self.session.template_id();
        self.registry
            .template(id)
            .ok_or_else(|| EngineError::TemplateNotFound(id.to_string()))
    }

    pub fn active_ratio(&self) -> Result<&AspectRatio, EngineError> {
        let id = self.session.ratio_id();
        self.registry
            .ratio(id)
            .ok_or_else(|| EngineError::RatioNotFound(id.to_string()))
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Surface handle currently standing in for a placed image, if any.
    pub fn surface_object(&self, id: &str) -> Option<SurfaceObjectId> {
        self.object_lookup
            .iter()
            .find(|(_, image_id)| image_id.as_str() == id)
            .map(|(object_id, _)| *object_id)
    }

    /// Rasterizes the canvas for the export/download collaborator.
    pub fn export_raster(&self) -> Vec<u8> {
        self.surface.export_raster()
    }

    // --- internals ---

    /// Re-derives the canvas from the active ratio, reconfigures the
    /// surface and lays out one placeholder per cell.
    fn rebuild(&mut self) -> Result<(), EngineError> {
        let ratio = self.active_ratio()?.clone();
        let template = self.active_template()?.clone();
        self.canvas = ratio.canvas_size(self.max_width, self.max_height);

        self.surface.configure(&SurfaceConfig {
            background_color: CANVAS_BACKGROUND.to_string(),
            width: self.canvas.width,
            height: self.canvas.height,
            selectable: false,
        });
        self.placeholders.clear();
        self.object_lookup.clear();

        for (cell_index, cell) in template.cells.iter().enumerate() {
            let rect = cell.geometry(self.canvas);
            let handle = self.surface.add_placeholder(cell_index, rect);
            self.placeholders.insert(cell_index, handle);
        }
        log::debug!(
            "rebuilt canvas {}x{} with {} placeholder(s)",
            self.canvas.width,
            self.canvas.height,
            template.capacity()
        );
        Ok(())
    }
}
