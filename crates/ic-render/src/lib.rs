pub mod chrome;
pub mod export;
pub mod hit;
pub mod paint;
pub mod scene;
pub mod svg;

pub use chrome::{Overlay, chrome};
pub use export::{
    ExportArtifact, ExportError, ExportJob, ExportPipeline, RasterOutcome, export_filename,
    export_frame,
};
pub use scene::{CanvasSize, Primitive, Scene, StrokeSpec, project};
