//! Placement Engine - Pool-to-Cell Assignment
//!
//! Placement is split into two phases so the pool-to-cell assignment is
//! decided synchronously, before any image decode is awaited:
//!
//! - **planning** consumes pool entries, mints ids, resolves geometry and
//!   stamps the session epoch into a `PlacementTicket`;
//! - **committing** (driven by the engine when a decode resolves) paints
//!   the image and inserts the `PlacedImage`, unless the epoch moved on.
//!
//! Bulk auto-population and manual single-cell placement share the same
//! ticket shape and therefore produce identical `PlacedImage` records.

use thiserror::Error;

use crate::pool::{ImageData, PoolExhausted};
use crate::session::{CompositionSession, ImageId};
use crate::templates::{CanvasSize, Rect, ScalePolicy, Template};

/// Extra unit added to the covered axis so anti-aliased edges cannot open
/// a visible seam between adjacent cells.
pub const SEAM_OVERLAP: f64 = 1.0;

/// A planned placement: pool entry already consumed, id already minted,
/// geometry already resolved. Committing it is pure execution.
#[derive(Debug, Clone)]
pub struct PlacementTicket {
    pub epoch: u64,
    pub image_id: ImageId,
    pub cell_index: usize,
    pub pool_index: usize,
    pub payload: ImageData,
    pub cell_rect: Rect,
    pub scale_to: ScalePolicy,
}

/// Result of committing a ticket against the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Image painted and recorded.
    Placed(ImageId),
    /// The session was reset after planning; the completion was discarded
    /// without touching state.
    Stale,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error(transparent)]
    PoolExhausted(#[from] PoolExhausted),

    #[error("cell {0} is already occupied")]
    CellOccupied(usize),

    #[error("cell {0} is out of range for the active template")]
    CellOutOfRange(usize),
}

/// Scale factor that makes the source cover the cell along the policy
/// axis, preserving the source aspect ratio.
pub fn cover_scale(policy: ScalePolicy, cell: Rect, source_width: f64, source_height: f64) -> f64 {
    match policy {
        ScalePolicy::Width => (cell.width + SEAM_OVERLAP) / source_width,
        ScalePolicy::Height => (cell.height + SEAM_OVERLAP) / source_height,
    }
}

fn make_ticket(
    session: &mut CompositionSession,
    template: &Template,
    canvas: CanvasSize,
    cell_index: usize,
) -> Result<PlacementTicket, PoolExhausted> {
    let entry = session.pool_mut().consume_next()?;
    let cell = &template.cells[cell_index];
    Ok(PlacementTicket {
        epoch: session.epoch(),
        image_id: session.mint_id(),
        cell_index,
        pool_index: entry.index,
        payload: entry.data,
        cell_rect: cell.geometry(canvas),
        scale_to: cell.scale_to,
    })
}

/// Bulk auto-population: walks still-empty cells in template order,
/// draining the pool until cells or entries run out. Never wraps;
/// occupied cells are left alone, so a second pass after more uploads
/// only fills the gaps. Leftover cells stay empty and leftover entries
/// stay available for manual placement.
pub fn plan_auto_population(
    session: &mut CompositionSession,
    template: &Template,
    canvas: CanvasSize,
) -> Vec<PlacementTicket> {
    let mut tickets = Vec::new();
    for cell_index in 0..template.capacity() {
        if session.pool().remaining() == 0 {
            break;
        }
        if session.is_cell_occupied(cell_index) {
            continue;
        }
        match make_ticket(session, template, canvas, cell_index) {
            Ok(ticket) => tickets.push(ticket),
            Err(PoolExhausted) => break,
        }
    }
    log::debug!(
        "planned auto-population: {} placements, {} pool entries left",
        tickets.len(),
        session.pool().remaining()
    );
    tickets
}

/// Manual placement: the next unconsumed entry goes into the interacted
/// cell, whatever its index. Placement order is interaction order, not
/// geometric cell order. Fails without mutation when the cell is invalid,
/// occupied, or the pool is drained.
pub fn plan_manual(
    session: &mut CompositionSession,
    template: &Template,
    canvas: CanvasSize,
    cell_index: usize,
) -> Result<PlacementTicket, PlanError> {
    if cell_index >= template.capacity() {
        return Err(PlanError::CellOutOfRange(cell_index));
    }
    if session.is_cell_occupied(cell_index) {
        return Err(PlanError::CellOccupied(cell_index));
    }
    if session.pool().remaining() == 0 {
        return Err(PlanError::PoolExhausted(PoolExhausted));
    }
    Ok(make_ticket(session, template, canvas, cell_index)?)
}
