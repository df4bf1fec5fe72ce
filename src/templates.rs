//! Template System - Layout Catalog
//!
//! Templates and aspect ratios are enumerated at process start and never
//! mutate. The registry is pure lookup.

use serde::{Deserialize, Serialize};

pub type TemplateId = String;
pub type RatioId = String;

/// Canvas dimensions derived from an aspect ratio and container bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

/// Axis-aligned rectangle in canvas units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AspectRatio {
    pub id: RatioId,
    pub name: String,
    pub width_ratio: u32,
    pub height_ratio: u32,
}

impl AspectRatio {
    /// Largest canvas of this ratio that fits within the container bounds.
    pub fn canvas_size(&self, max_width: f64, max_height: f64) -> CanvasSize {
        let ratio = self.width_ratio as f64 / self.height_ratio as f64;
        let height_from_width = max_width / ratio;
        if height_from_width <= max_height {
            CanvasSize {
                width: max_width,
                height: height_from_width,
            }
        } else {
            CanvasSize {
                width: max_height * ratio,
                height: max_height,
            }
        }
    }
}

/// How an image dropped into a cell is scaled: cover the cell's width or
/// its height, preserving the source aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalePolicy {
    Width,
    Height,
}

/// One placeholder region within a template, expressed as fractions of the
/// canvas so the same template works at any aspect ratio.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellConfig {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub scale_to: ScalePolicy,
}

impl CellConfig {
    pub fn geometry(&self, canvas: CanvasSize) -> Rect {
        Rect {
            left: self.left * canvas.width,
            top: self.top * canvas.height,
            width: self.width * canvas.width,
            height: self.height * canvas.height,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: TemplateId,
    pub name: String,
    pub cells: Vec<CellConfig>,
}

impl Template {
    /// Hard upper bound on images in one collage.
    pub fn capacity(&self) -> usize {
        self.cells.len()
    }
}

fn cell(left: f64, top: f64, width: f64, height: f64, scale_to: ScalePolicy) -> CellConfig {
    CellConfig {
        left,
        top,
        width,
        height,
        scale_to,
    }
}

/// Template registry - built-in catalog plus embedder additions
pub struct TemplateRegistry {
    templates: Vec<Template>,
    ratios: Vec<AspectRatio>,
}

impl TemplateRegistry {
    pub fn empty() -> Self {
        Self {
            templates: Vec::new(),
            ratios: Vec::new(),
        }
    }

    /// The catalog shipped with the engine.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();

        registry.register(Template {
            id: "single".to_string(),
            name: "Single".to_string(),
            cells: vec![cell(0.0, 0.0, 1.0, 1.0, ScalePolicy::Width)],
        });
        registry.register(Template {
            id: "split-vertical".to_string(),
            name: "Vertical Split".to_string(),
            cells: vec![
                cell(0.0, 0.0, 0.5, 1.0, ScalePolicy::Height),
                cell(0.5, 0.0, 0.5, 1.0, ScalePolicy::Height),
            ],
        });
        registry.register(Template {
            id: "split-horizontal".to_string(),
            name: "Horizontal Split".to_string(),
            cells: vec![
                cell(0.0, 0.0, 1.0, 0.5, ScalePolicy::Width),
                cell(0.0, 0.5, 1.0, 0.5, ScalePolicy::Width),
            ],
        });
        registry.register(Template {
            id: "grid-2x2".to_string(),
            name: "Grid 2x2".to_string(),
            cells: vec![
                cell(0.0, 0.0, 0.5, 0.5, ScalePolicy::Width),
                cell(0.5, 0.0, 0.5, 0.5, ScalePolicy::Width),
                cell(0.0, 0.5, 0.5, 0.5, ScalePolicy::Width),
                cell(0.5, 0.5, 0.5, 0.5, ScalePolicy::Width),
            ],
        });
        registry.register(Template {
            id: "feature-left".to_string(),
            name: "Feature + Sidebar".to_string(),
            cells: vec![
                cell(0.0, 0.0, 0.66, 1.0, ScalePolicy::Height),
                cell(0.66, 0.0, 0.34, 0.5, ScalePolicy::Width),
                cell(0.66, 0.5, 0.34, 0.5, ScalePolicy::Width),
            ],
        });

        registry.register_ratio(AspectRatio {
            id: "square".to_string(),
            name: "Square 1:1".to_string(),
            width_ratio: 1,
            height_ratio: 1,
        });
        registry.register_ratio(AspectRatio {
            id: "portrait".to_string(),
            name: "Portrait 4:5".to_string(),
            width_ratio: 4,
            height_ratio: 5,
        });
        registry.register_ratio(AspectRatio {
            id: "landscape".to_string(),
            name: "Landscape 16:9".to_string(),
            width_ratio: 16,
            height_ratio: 9,
        });
        registry.register_ratio(AspectRatio {
            id: "story".to_string(),
            name: "Story 9:16".to_string(),
            width_ratio: 9,
            height_ratio: 16,
        });

        registry
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn template(&self, id: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.id == id)
    }

    pub fn ratios(&self) -> &[AspectRatio] {
        &self.ratios
    }

    pub fn ratio(&self, id: &str) -> Option<&AspectRatio> {
        self.ratios.iter().find(|r| r.id == id)
    }

    pub fn register(&mut self, template: Template) {
        self.templates.retain(|t| t.id != template.id);
        self.templates.push(template);
    }

    pub fn register_ratio(&mut self, ratio: AspectRatio) {
        self.ratios.retain(|r| r.id != ratio.id);
        self.ratios.push(ratio);
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canvas_size_width_bound() {
        let square = AspectRatio {
            id: "square".into(),
            name: "Square".into(),
            width_ratio: 1,
            height_ratio: 1,
        };
        let size = square.canvas_size(640.0, 800.0);
        assert_eq!(size.width, 640.0);
        assert_eq!(size.height, 640.0);
    }

    #[test]
    fn test_canvas_size_height_bound() {
        let story = AspectRatio {
            id: "story".into(),
            name: "Story".into(),
            width_ratio: 9,
            height_ratio: 16,
        };
        let size = story.canvas_size(640.0, 480.0);
        assert_eq!(size.height, 480.0);
        assert!((size.width - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_cell_geometry_scales_with_canvas() {
        let config = CellConfig {
            left: 0.5,
            top: 0.0,
            width: 0.5,
            height: 1.0,
            scale_to: ScalePolicy::Height,
        };
        let rect = config.geometry(CanvasSize {
            width: 640.0,
            height: 480.0,
        });
        assert_eq!(rect.left, 320.0);
        assert_eq!(rect.top, 0.0);
        assert_eq!(rect.width, 320.0);
        assert_eq!(rect.height, 480.0);
    }

    #[test]
    fn test_builtin_catalog_lookup() {
        let registry = TemplateRegistry::builtin();
        assert!(registry.template("grid-2x2").is_some());
        assert!(registry.ratio("square").is_some());
        assert!(registry.template("no-such-layout").is_none());
        assert_eq!(registry.template("grid-2x2").unwrap().capacity(), 4);
    }
}
