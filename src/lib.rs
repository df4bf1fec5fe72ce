//! Collage Core - Composition Engine
//!
//! Assembles uploaded photos into the cells of a grid template:
//!
//! 1. Templates Are Geometry - the registry is a fixed catalog
//! 2. The Pool Is Ordered - consumption is monotonic, never revisited
//! 3. Planning Before Decoding - cell assignment is decided synchronously
//! 4. State Mutates Through Commands - invariants live in the session
//! 5. The Surface Owns Pixels - the engine only holds ids

pub mod engine;
pub mod placement;
pub mod pool;
pub mod session;
pub mod surface;
pub mod templates;

pub use engine::{CollageEngine, EngineError, PanelMode, PopulateOutcome};
pub use placement::{CommitOutcome, PlacementTicket, SEAM_OVERLAP};
pub use pool::{ImageData, ImagePool, PoolEntry, PoolExhausted};
pub use session::{CompositionSession, FilterKind, FilterSet, ImageId, PlacedImage};
pub use surface::{
    HeadlessSurface, RenderSurface, SurfaceConfig, SurfaceEvent, SurfaceObjectId,
};
pub use templates::{AspectRatio, CanvasSize, CellConfig, Rect, ScalePolicy, Template, TemplateRegistry};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
