//! Engine Invariant Tests
//!
//! Pins the placement, reset, selection and error-policy guarantees the
//! UI layer relies on.

use collage_core::{
    CollageEngine, CommitOutcome, EngineError, FilterKind, HeadlessSurface, ImageData, PanelMode,
    PopulateOutcome, SurfaceEvent, TemplateRegistry,
};

fn pool_images(count: usize) -> Vec<ImageData> {
    (0..count)
        .map(|i| ImageData::from(format!("800x600:img-{i}").as_str()))
        .collect()
}

fn create_engine(template: &str, pool_size: usize) -> CollageEngine<HeadlessSurface> {
    let mut engine = CollageEngine::new(
        TemplateRegistry::builtin(),
        HeadlessSurface::new(),
        640.0,
        640.0,
    )
    .unwrap();
    engine.set_template(template).unwrap();
    engine.append_to_pool(pool_images(pool_size));
    engine
}

#[test]
fn invariant_bulk_population_fills_cells_in_order() {
    // Pool smaller than the template fills cells 0..N in order.
    let mut engine = create_engine("grid-2x2", 3);
    let outcomes = engine.populate().unwrap();

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes
        .iter()
        .all(|o| matches!(o, PopulateOutcome::Placed { .. })));
    let cells: Vec<_> = engine.placed_images().iter().map(|p| p.cell_index).collect();
    assert_eq!(cells, vec![0, 1, 2]);
    assert_eq!(engine.remaining_pool_count(), 0);
}

#[test]
fn invariant_bulk_population_stops_at_capacity() {
    // Surplus pool entries stay unconsumed.
    let mut engine = create_engine("grid-2x2", 6);
    engine.populate().unwrap();

    assert_eq!(engine.placed_images().len(), 4);
    assert_eq!(engine.max_placeable(), 4);
    assert_eq!(engine.remaining_pool_count(), 2);
}

#[test]
fn invariant_manual_placement_on_empty_pool_is_a_noop() {
    // No mutation, discriminated error.
    let mut engine = create_engine("grid-2x2", 0);

    let err = engine.place_into_cell(1).unwrap_err();
    assert!(matches!(err, EngineError::PoolExhausted(_)));
    assert!(engine.placed_images().is_empty());
    assert_eq!(engine.remaining_pool_count(), 0);
}

#[test]
fn invariant_filter_update_touches_exactly_one_scalar() {
    let mut engine = create_engine("single", 1);
    engine.populate().unwrap();
    let placed = engine.placed_images()[0].clone();

    engine
        .update_filter(&placed.id, FilterKind::Contrast, 25.0)
        .unwrap();

    let after = engine.placed_image(&placed.id).unwrap();
    assert_eq!(after.id, placed.id);
    assert_eq!(after.cell_index, placed.cell_index);
    assert_eq!(after.filters.contrast, 25.0);
    assert_eq!(after.filters.brightness, 0.0);
    assert_eq!(after.filters.noise, 0.0);
    assert_eq!(after.filters.saturation, 0.0);
    assert_eq!(after.filters.vibrance, 0.0);
    assert_eq!(after.filters.blur, 0.0);
}

#[test]
fn invariant_template_change_is_an_idempotent_reset() {
    // Placements cleared and pool cursor rewound, whatever came before.
    let mut engine = create_engine("grid-2x2", 3);
    engine.populate().unwrap();
    assert_eq!(engine.placed_images().len(), 3);

    engine.set_template("split-vertical").unwrap();
    assert!(engine.placed_images().is_empty());
    assert_eq!(engine.remaining_pool_count(), 3);

    // Changing again without any interim activity behaves identically.
    engine.set_template("split-vertical").unwrap();
    assert!(engine.placed_images().is_empty());
    assert_eq!(engine.remaining_pool_count(), 3);
}

#[test]
fn invariant_selection_never_dangles() {
    // Unknown object ids are ignored; removal clears the selection.
    let mut engine = create_engine("split-vertical", 2);
    engine.populate().unwrap();
    let id = engine.placed_images()[0].id.clone();
    let object_id = engine.surface_object(&id).unwrap();

    engine
        .handle_event(SurfaceEvent::SelectionChanged(Some(object_id)))
        .unwrap();
    assert_eq!(engine.selection(), Some(&id));
    assert_eq!(engine.panel_mode(), PanelMode::ImageControls);

    // A surface object the engine never placed selects nothing.
    engine
        .handle_event(SurfaceEvent::SelectionChanged(Some(9999)))
        .unwrap();
    assert_eq!(engine.selection(), Some(&id));

    engine.remove_image(&id).unwrap();
    assert_eq!(engine.selection(), None);

    // Selecting the removed image's old object is now a no-op too.
    engine
        .handle_event(SurfaceEvent::SelectionChanged(Some(object_id)))
        .unwrap();
    assert_eq!(engine.selection(), None);
}

#[test]
fn scenario_a_partial_fill_leaves_empty_cells() {
    let mut engine = create_engine("grid-2x2", 3);
    engine.populate().unwrap();

    assert_eq!(engine.placed_images().len(), 3);
    assert_eq!(engine.surface().placeholder_count(), 1);
    assert_eq!(engine.remaining_pool_count(), 0);
}

#[test]
fn scenario_b_full_template_rejects_further_interaction() {
    let mut engine = create_engine("split-vertical", 5);
    engine.populate().unwrap();

    assert_eq!(engine.placed_images().len(), 2);
    assert_eq!(engine.remaining_pool_count(), 3);

    // Both cells are filled; interacting with either is a no-op.
    let err = engine.place_into_cell(0).unwrap_err();
    assert!(matches!(err, EngineError::CellOccupied(0)));
    assert_eq!(engine.placed_images().len(), 2);
    assert_eq!(engine.remaining_pool_count(), 3);
}

#[test]
fn scenario_c_append_then_manual_placement() {
    let mut engine = create_engine("split-vertical", 0);
    engine.populate().unwrap();
    assert!(engine.placed_images().is_empty());

    engine.append_to_pool(pool_images(1));
    engine
        .handle_event(SurfaceEvent::PlaceholderInteracted { cell_index: 0 })
        .unwrap();

    assert_eq!(engine.placed_images().len(), 1);
    assert_eq!(engine.placed_images()[0].cell_index, 0);
    assert_eq!(engine.remaining_pool_count(), 0);
}

#[test]
fn scenario_d_ratio_change_invalidates_old_ids() {
    let mut engine = create_engine("single", 1);
    engine.populate().unwrap();
    let id = engine.placed_images()[0].id.clone();
    engine
        .update_filter(&id, FilterKind::Brightness, 40.0)
        .unwrap();
    assert_eq!(engine.filters_of(&id).unwrap().brightness, 40.0);

    engine.set_aspect_ratio("landscape").unwrap();
    assert!(engine.placed_images().is_empty());
    let err = engine.filters_of(&id).unwrap_err();
    assert!(matches!(err, EngineError::UnknownImage(_)));
}

#[test]
fn manual_placement_follows_interaction_order_not_cell_order() {
    let mut engine = create_engine("grid-2x2", 0);
    engine.append_to_pool(vec![
        ImageData::from("100x100:first"),
        ImageData::from("200x200:second"),
    ]);

    // Click cell 2 first, then cell 0.
    engine.place_into_cell(2).unwrap();
    engine.place_into_cell(0).unwrap();

    let painted = engine.surface().painted();
    assert_eq!(painted.len(), 2);
    // First pool entry landed in cell 2 (bottom-left of the 2x2 grid).
    assert_eq!(painted[0].source_width, 100.0);
    assert_eq!(painted[0].clip.top, 320.0);
    assert_eq!(painted[0].clip.left, 0.0);
    // Second pool entry landed in cell 0.
    assert_eq!(painted[1].source_width, 200.0);
    assert_eq!(painted[1].clip.top, 0.0);
    assert_eq!(painted[1].clip.left, 0.0);
}

#[test]
fn stale_commit_after_reset_is_discarded() {
    let mut engine = create_engine("grid-2x2", 1);

    let ticket = engine.plan_manual_placement(0).unwrap();
    assert_eq!(engine.remaining_pool_count(), 0);

    // Session resets while the decode is in flight.
    engine.set_aspect_ratio("portrait").unwrap();

    let outcome = engine.commit_placement(ticket).unwrap();
    assert_eq!(outcome, CommitOutcome::Stale);
    assert!(engine.placed_images().is_empty());
    // The reset rewound the pool; the entry is available again.
    assert_eq!(engine.remaining_pool_count(), 1);
}

#[test]
fn render_failure_consumes_the_pool_entry() {
    // Documented policy: a corrupt payload is spent, the cell stays empty.
    let mut engine = create_engine("split-vertical", 0);
    engine.append_to_pool(vec![ImageData(Vec::new())]);

    let err = engine.place_into_cell(0).unwrap_err();
    assert!(matches!(err, EngineError::PlacementRenderFailed(_)));
    assert!(engine.placed_images().is_empty());
    assert_eq!(engine.remaining_pool_count(), 0);
    assert_eq!(engine.surface().placeholder_count(), 2);

    // The next interaction reports exhaustion, not another render failure.
    let err = engine.place_into_cell(0).unwrap_err();
    assert!(matches!(err, EngineError::PoolExhausted(_)));
}

#[test]
fn bulk_population_reports_corrupt_entries_without_aborting() {
    let mut engine = create_engine("split-vertical", 0);
    engine.append_to_pool(vec![
        ImageData(Vec::new()),
        ImageData::from("640x480:good"),
    ]);

    let outcomes = engine.populate().unwrap();
    // The failure is a discriminated outcome the caller can present, not
    // just a log line.
    assert_eq!(outcomes.len(), 2);
    assert!(matches!(
        outcomes[0],
        PopulateOutcome::RenderFailed { cell_index: 0, .. }
    ));
    assert!(matches!(
        outcomes[1],
        PopulateOutcome::Placed { cell_index: 1, .. }
    ));

    // The corrupt first entry went into cell 0 and was spent; the good
    // entry filled cell 1.
    assert_eq!(engine.placed_images().len(), 1);
    assert_eq!(engine.placed_images()[0].cell_index, 1);
    assert_eq!(engine.remaining_pool_count(), 0);
}

#[test]
fn repopulate_after_append_fills_only_empty_cells() {
    let mut engine = create_engine("grid-2x2", 2);
    engine.populate().unwrap();
    let first_ids: Vec<_> = engine.placed_images().iter().map(|p| p.id.clone()).collect();

    // More uploads arrive; a second bulk pass only fills the gaps.
    engine.append_to_pool(pool_images(2));
    let outcomes = engine.populate().unwrap();

    assert_eq!(outcomes.len(), 2);
    let new_cells: Vec<_> = outcomes
        .iter()
        .map(|o| match o {
            PopulateOutcome::Placed { cell_index, .. } => *cell_index,
            PopulateOutcome::RenderFailed { cell_index, .. } => *cell_index,
        })
        .collect();
    assert_eq!(new_cells, vec![2, 3]);

    // The earlier placements are untouched.
    let mut cells: Vec<_> = engine.placed_images().iter().map(|p| p.cell_index).collect();
    cells.sort();
    assert_eq!(cells, vec![0, 1, 2, 3]);
    for id in &first_ids {
        assert!(engine.placed_image(id).is_some());
    }
    assert_eq!(engine.remaining_pool_count(), 0);

    // A third pass with a drained pool and a full grid plans nothing.
    let outcomes = engine.populate().unwrap();
    assert!(outcomes.is_empty());
    assert_eq!(engine.placed_images().len(), 4);
}

#[test]
fn scale_factor_covers_the_policy_axis_with_seam_overlap() {
    // split-vertical cells are 320x640 on a 640x640 canvas, scale-to-height.
    let mut engine = create_engine("split-vertical", 0);
    engine.append_to_pool(vec![ImageData::from("1000x641:tall")]);
    engine.populate().unwrap();

    let painted = &engine.surface().painted()[0];
    assert_eq!(painted.scale, (640.0 + 1.0) / 641.0);
    assert_eq!(painted.dest, painted.clip);
}

#[test]
fn remove_image_restores_the_placeholder() {
    let mut engine = create_engine("split-vertical", 2);
    engine.populate().unwrap();
    assert_eq!(engine.surface().placeholder_count(), 0);

    let id = engine.placed_images()[0].id.clone();
    engine.remove_image(&id).unwrap();

    assert_eq!(engine.placed_images().len(), 1);
    assert_eq!(engine.surface().placeholder_count(), 1);
    assert_eq!(engine.surface().painted().len(), 1);

    // The freed cell accepts a manual placement again.
    engine.append_to_pool(pool_images(1));
    engine.place_into_cell(0).unwrap();
    assert_eq!(engine.placed_images().len(), 2);
}

#[test]
fn resize_rebuilds_against_new_geometry() {
    let mut engine = create_engine("single", 1);
    engine.populate().unwrap();
    let old_id = engine.placed_images()[0].id.clone();

    engine
        .handle_event(SurfaceEvent::Resized {
            width: 320.0,
            height: 320.0,
        })
        .unwrap();

    assert_eq!(engine.canvas_size().width, 320.0);
    // Rebuilt from scratch: same count, fresh identity.
    assert_eq!(engine.placed_images().len(), 1);
    assert_ne!(engine.placed_images()[0].id, old_id);
}

#[test]
fn reset_returns_to_upload_state() {
    let mut engine = create_engine("grid-2x2", 2);
    engine.populate().unwrap();
    assert!(engine.has_images());

    engine.reset();
    assert!(!engine.has_images());
    assert!(engine.placed_images().is_empty());
    assert_eq!(engine.selection(), None);
    assert_eq!(engine.panel_mode(), PanelMode::TemplatePicker);
}

#[test]
fn placement_ids_are_unique_across_modes() {
    let mut engine = create_engine("grid-2x2", 3);
    engine.populate().unwrap();
    engine.append_to_pool(pool_images(1));
    engine.place_into_cell(3).unwrap();

    let mut ids: Vec<_> = engine.placed_images().iter().map(|p| p.id.clone()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 4);
}
