//! Export framing and the single-flight export pipeline.
//!
//! An export is split around the one asynchronous step the host performs
//! (decoding the SVG into an image and rasterizing it):
//!
//! 1. [`ExportPipeline::begin`] claims the pipeline, frames the chart, and
//!    returns an [`ExportJob`] carrying the scene and its SVG text.
//! 2. The host rasterizes `job.svg` at `job.pixel_ratio`.
//! 3. [`ExportJob::finish`] consumes the job with the raster outcome and
//!    yields the artifact to download. A failed raster falls back to the
//!    SVG itself.
//!
//! Dropping a job without finishing it also releases the pipeline.

use crate::scene::{CanvasSize, Scene, project};
use crate::svg::{svg_data_uri, to_svg};
use ic_core::inflight::{InFlight, InFlightGuard};
use ic_core::model::{Chart, Node};
use thiserror::Error;

pub const EXPORT_MIN_SIZE: CanvasSize = CanvasSize::new(800.0, 600.0);
pub const EXPORT_PADDING: f64 = 100.0;
pub const EXPORT_MARGIN: f64 = 1.5;
pub const EXPORT_PIXEL_RATIO: f64 = 2.0;
pub const DEFAULT_EXPORT_NAME: &str = "identity-chart";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    #[error("could not find {0}")]
    MissingSurface(&'static str),
    #[error("error creating image: {0}")]
    Raster(String),
    #[error("an export is already in progress")]
    Busy,
}

/// Export frame for a set of nodes.
///
/// The frame is anchored at the canvas origin and never smaller than
/// 800×600. It spans the nodes' bounding box (each node padded by
/// 1.5×radius) plus 100px, and is widened further so the box's far edge
/// plus half the padding is always inside.
pub fn export_frame(nodes: &[Node]) -> CanvasSize {
    if nodes.is_empty() {
        return EXPORT_MIN_SIZE;
    }
    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for n in nodes {
        let m = n.radius * EXPORT_MARGIN;
        min_x = min_x.min(n.x - m);
        min_y = min_y.min(n.y - m);
        max_x = max_x.max(n.x + m);
        max_y = max_y.max(n.y + m);
    }
    let half = EXPORT_PADDING / 2.0;
    CanvasSize::new(
        EXPORT_MIN_SIZE
            .width
            .max(max_x - min_x + EXPORT_PADDING)
            .max(max_x + half),
        EXPORT_MIN_SIZE
            .height
            .max(max_y - min_y + EXPORT_PADDING)
            .max(max_y + half),
    )
}

/// `<title or "identity-chart">-<epoch ms>.<ext>`
pub fn export_filename(title: &str, now_ms: i64, ext: &str) -> String {
    let stem = if title.is_empty() {
        DEFAULT_EXPORT_NAME
    } else {
        title
    };
    format!("{stem}-{now_ms}.{ext}")
}

// ─── Pipeline ────────────────────────────────────────────────────────────

/// Result of the host's rasterization step.
#[derive(Debug, Clone, PartialEq)]
pub enum RasterOutcome {
    /// PNG data URL.
    Encoded(String),
    Failed(String),
}

/// What the host should download.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportArtifact {
    Raster { filename: String, data_url: String },
    /// SVG fallback after a raster failure; `reason` is that failure.
    Vector {
        filename: String,
        data_url: String,
        reason: String,
    },
}

impl ExportArtifact {
    pub fn filename(&self) -> &str {
        match self {
            ExportArtifact::Raster { filename, .. } | ExportArtifact::Vector { filename, .. } => filename,
        }
    }

    pub fn data_url(&self) -> &str {
        match self {
            ExportArtifact::Raster { data_url, .. } | ExportArtifact::Vector { data_url, .. } => data_url,
        }
    }
}

#[derive(Debug, Default)]
pub struct ExportPipeline {
    slot: InFlight,
}

impl ExportPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.slot.is_busy()
    }

    /// Frame and project `chart` for export.
    ///
    /// # Errors
    /// [`ExportError::Busy`] while a previous job is unresolved.
    pub fn begin(&self, chart: &Chart, now_ms: i64) -> Result<ExportJob, ExportError> {
        let guard = self.slot.try_begin().ok_or(ExportError::Busy)?;
        let frame = export_frame(&chart.nodes);
        let scene = project(chart, frame);
        let svg = to_svg(&scene);
        log::debug!(
            "export {} at {}x{} ({} primitives)",
            chart.id,
            frame.width,
            frame.height,
            scene.primitives.len()
        );
        Ok(ExportJob {
            scene,
            svg,
            pixel_ratio: EXPORT_PIXEL_RATIO,
            title: chart.title.clone(),
            now_ms,
            _guard: guard,
        })
    }
}

/// A pending export. Resolve exactly once with [`ExportJob::finish`].
#[derive(Debug)]
pub struct ExportJob {
    pub scene: Scene,
    pub svg: String,
    pub pixel_ratio: f64,
    title: String,
    now_ms: i64,
    _guard: InFlightGuard,
}

impl ExportJob {
    pub fn frame(&self) -> CanvasSize {
        self.scene.size
    }

    /// Backing-store size of the raster surface.
    pub fn raster_size(&self) -> (u32, u32) {
        let CanvasSize { width, height } = self.scene.size;
        (
            (width * self.pixel_ratio).ceil() as u32,
            (height * self.pixel_ratio).ceil() as u32,
        )
    }

    pub fn svg_data_uri(&self) -> String {
        svg_data_uri(&self.svg)
    }

    pub fn finish(self, outcome: RasterOutcome) -> ExportArtifact {
        match outcome {
            RasterOutcome::Encoded(data_url) => ExportArtifact::Raster {
                filename: export_filename(&self.title, self.now_ms, "png"),
                data_url,
            },
            RasterOutcome::Failed(reason) => {
                log::warn!("raster export failed, falling back to SVG: {reason}");
                ExportArtifact::Vector {
                    filename: export_filename(&self.title, self.now_ms, "svg"),
                    data_url: self.svg_data_uri(),
                    reason,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ic_core::id::NodeId;
    use pretty_assertions::assert_eq;

    fn chart_with(nodes: &[(&str, f64, f64, f64)]) -> Chart {
        let mut chart = Chart::empty("exp".into(), "Export Me", 0);
        for (name, x, y, r) in nodes {
            chart.nodes.push(Node::new(NodeId::intern(name), *x, *y, *r));
        }
        chart
    }

    #[test]
    fn small_chart_uses_minimum_frame() {
        let chart = chart_with(&[("ef-a", 400.0, 300.0, 60.0)]);
        assert_eq!(export_frame(&chart.nodes), CanvasSize::new(800.0, 600.0));
        assert_eq!(export_frame(&[]), EXPORT_MIN_SIZE);
    }

    #[test]
    fn wide_chart_grows_frame() {
        let chart = chart_with(&[("ef-l", 0.0, 100.0, 20.0), ("ef-r", 1000.0, 100.0, 20.0)]);
        let frame = export_frame(&chart.nodes);
        // extent 1060 + 100 padding
        assert_eq!(frame.width, 1160.0);
        assert_eq!(frame.height, 600.0);
    }

    #[test]
    fn far_nodes_are_never_clipped() {
        let chart = chart_with(&[("ef-far", 1500.0, 1200.0, 40.0)]);
        let frame = export_frame(&chart.nodes);
        assert!(frame.width >= 1500.0 + 60.0);
        assert!(frame.height >= 1200.0 + 60.0);
    }

    #[test]
    fn filename_defaults_when_untitled() {
        assert_eq!(export_filename("", 42, "png"), "identity-chart-42.png");
        assert_eq!(export_filename("Me", 7, "svg"), "Me-7.svg");
    }

    #[test]
    fn pipeline_is_single_flight() {
        let pipeline = ExportPipeline::new();
        let chart = chart_with(&[("ef-p", 100.0, 100.0, 10.0)]);
        let job = pipeline.begin(&chart, 5).unwrap();
        assert_eq!(pipeline.begin(&chart, 6).unwrap_err(), ExportError::Busy);
        assert_eq!(job.raster_size(), (1600, 1200));

        let artifact = job.finish(RasterOutcome::Encoded("data:image/png;base64,xx".into()));
        assert_eq!(artifact.filename(), "Export Me-5.png");
        assert!(!pipeline.is_busy());
    }

    #[test]
    fn raster_failure_falls_back_to_svg() {
        let pipeline = ExportPipeline::new();
        let chart = chart_with(&[]);
        let job = pipeline.begin(&chart, 9).unwrap();
        let artifact = job.finish(RasterOutcome::Failed("tainted canvas".into()));
        match artifact {
            ExportArtifact::Vector { filename, data_url, reason } => {
                assert_eq!(filename, "Export Me-9.svg");
                assert!(data_url.starts_with("data:image/svg+xml;base64,"));
                assert_eq!(reason, "tainted canvas");
            }
            other => panic!("expected vector fallback, got {other:?}"),
        }
    }

    #[test]
    fn dropped_job_releases_pipeline() {
        let pipeline = ExportPipeline::new();
        let chart = chart_with(&[]);
        drop(pipeline.begin(&chart, 1).unwrap());
        assert!(pipeline.begin(&chart, 2).is_ok());
    }
}
