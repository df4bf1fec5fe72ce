//! Collage CLI - Headless Composition Driver
//!
//! Commands: templates, ratios, compose
//! Outputs JSON to stdout
//! Returns non-zero when composition fails

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use collage_core::{
    CollageEngine, FilterKind, HeadlessSurface, ImageData, PopulateOutcome, TemplateRegistry,
    ENGINE_VERSION,
};

#[derive(Parser)]
#[command(name = "collage-cli")]
#[command(about = "Collage CLI - Headless Collage Composition")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available layout templates
    Templates,

    /// List available aspect ratios
    Ratios,

    /// Compose a collage from image files and print a manifest
    Compose {
        /// Template ID
        #[arg(short, long, default_value = "grid-2x2")]
        template: String,

        /// Aspect ratio ID
        #[arg(short, long, default_value = "square")]
        ratio: String,

        /// Container width in canvas units
        #[arg(long, default_value_t = 640.0)]
        max_width: f64,

        /// Container height in canvas units
        #[arg(long, default_value_t = 640.0)]
        max_height: f64,

        /// Filter edits applied after population, as CELL:NAME=VALUE
        /// (e.g. --filter 0:brightness=40)
        #[arg(long = "filter", value_name = "CELL:NAME=VALUE")]
        filters: Vec<String>,

        /// Image files, placed into cells in the order given
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    let registry = TemplateRegistry::builtin();

    match cli.command {
        Commands::Templates => {
            let templates: Vec<_> = registry
                .templates()
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "id": t.id,
                        "name": t.name,
                        "cells": t.capacity(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&templates).unwrap());
            ExitCode::SUCCESS
        }

        Commands::Ratios => {
            println!(
                "{}",
                serde_json::to_string_pretty(registry.ratios()).unwrap()
            );
            ExitCode::SUCCESS
        }

        Commands::Compose {
            template,
            ratio,
            max_width,
            max_height,
            filters,
            images,
        } => match compose(
            registry, &template, &ratio, max_width, max_height, &filters, &images,
        ) {
            Ok(manifest) => {
                println!("{}", serde_json::to_string_pretty(&manifest).unwrap());
                ExitCode::SUCCESS
            }
            Err(e) => {
                let output = serde_json::json!({
                    "success": false,
                    "error": e,
                });
                println!("{}", serde_json::to_string(&output).unwrap());
                ExitCode::from(2)
            }
        },
    }
}

fn compose(
    registry: TemplateRegistry,
    template: &str,
    ratio: &str,
    max_width: f64,
    max_height: f64,
    filters: &[String],
    images: &[PathBuf],
) -> Result<serde_json::Value, String> {
    let mut payloads = Vec::with_capacity(images.len());
    for path in images {
        let bytes = std::fs::read(path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
        payloads.push(ImageData::from(bytes));
    }

    let mut engine = CollageEngine::new(registry, HeadlessSurface::new(), max_width, max_height)
        .map_err(|e| e.to_string())?;
    engine.set_template(template).map_err(|e| e.to_string())?;
    engine.set_aspect_ratio(ratio).map_err(|e| e.to_string())?;
    engine.append_to_pool(payloads);
    let outcomes = engine.populate().map_err(|e| e.to_string())?;

    let render_failures: Vec<_> = outcomes
        .iter()
        .filter_map(|o| match o {
            PopulateOutcome::RenderFailed { cell_index, error } => Some(serde_json::json!({
                "cell": cell_index,
                "error": error.to_string(),
            })),
            PopulateOutcome::Placed { .. } => None,
        })
        .collect();

    for spec in filters {
        apply_filter(&mut engine, spec)?;
    }

    let raster = engine.export_raster();
    let raster_base64 =
        base64::Engine::encode(&base64::engine::general_purpose::STANDARD, &raster);

    Ok(serde_json::json!({
        "success": true,
        "engine_version": ENGINE_VERSION,
        "template": template,
        "ratio": ratio,
        "canvas": engine.canvas_size(),
        "placed": engine.placed_images(),
        "render_failures": render_failures,
        "remaining_pool": engine.remaining_pool_count(),
        "raster_base64": raster_base64,
    }))
}

/// Parses `CELL:NAME=VALUE` and applies it to the image in that cell.
fn apply_filter(
    engine: &mut CollageEngine<HeadlessSurface>,
    spec: &str,
) -> Result<(), String> {
    let (cell, edit) = spec
        .split_once(':')
        .ok_or_else(|| format!("invalid filter spec: {spec}"))?;
    let (name, value) = edit
        .split_once('=')
        .ok_or_else(|| format!("invalid filter spec: {spec}"))?;

    let cell: usize = cell
        .trim()
        .parse()
        .map_err(|_| format!("invalid cell index: {cell}"))?;
    let kind: FilterKind = name.trim().parse()?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid filter value: {value}"))?;

    let id = engine
        .placed_images()
        .iter()
        .find(|p| p.cell_index == cell)
        .map(|p| p.id.clone())
        .ok_or_else(|| format!("no image in cell {cell}"))?;
    engine
        .update_filter(&id, kind, value)
        .map_err(|e| e.to_string())
}
