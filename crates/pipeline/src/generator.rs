//! Rendering Stage
//!
//! Two opaque transforms in sequence: image generation (prompts in, PNG
//! bytes out) and print optimization (vector-trace the bitmap with potrace,
//! re-render on a fixed portrait canvas, flatten to a white background).
//! Both artifact locations share one basename, which becomes the record id.
//!
//! No retries here; a failed render fails the whole run and the production
//! loop decides what to do.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageFormat};
use tokio::process::Command;
use tracing::{debug, info};
use uuid::Uuid;

use colorit_core::models::{RenderedArtifact, StyledPrompt};
use colorit_core::stage::PipelineStage;
use colorit_llm::{ImageModel, LlmError};

use crate::artifacts::ArtifactStore;
use crate::error::{PipelineError, PipelineResult};

/// Print canvas: US letter portrait at 300 dpi.
pub const CANVAS_WIDTH: u32 = 2550;
pub const CANVAS_HEIGHT: u32 = 3300;

/// Black/white cutoff when preparing the trace input.
const BINARIZE_THRESHOLD: u8 = 128;

/// Opaque image transform: raw generated bitmap in, print-ready bitmap out.
#[async_trait]
pub trait ImageOptimizer: Send + Sync {
    /// Verify external tooling before any artifact work begins.
    async fn preflight(&self) -> PipelineResult<()>;

    /// Transform raw PNG bytes into optimized PNG bytes.
    async fn optimize(&self, raw_png: &[u8]) -> PipelineResult<Vec<u8>>;
}

/// Optimizer backed by the `potrace` CLI.
///
/// Pipeline: threshold to 1-bit BMP, trace with potrace's raster (PGM)
/// backend, rescale the rendering to the print canvas, flatten to RGB
/// on white.
pub struct PotraceOptimizer {
    width: u32,
    height: u32,
}

impl PotraceOptimizer {
    pub fn new() -> Self {
        Self {
            width: CANVAS_WIDTH,
            height: CANVAS_HEIGHT,
        }
    }
}

impl Default for PotraceOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageOptimizer for PotraceOptimizer {
    async fn preflight(&self) -> PipelineResult<()> {
        let probe = Command::new("potrace")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        match probe {
            Ok(status) if status.success() => Ok(()),
            _ => Err(PipelineError::missing_dependency(
                "the 'potrace' utility is not installed (e.g. 'apt-get install potrace')",
            )),
        }
    }

    async fn optimize(&self, raw_png: &[u8]) -> PipelineResult<Vec<u8>> {
        let decoded = image::load_from_memory(raw_png)
            .map_err(|e| PipelineError::optimization(format!("cannot decode raw image: {}", e)))?;
        let mono = binarize(&decoded.to_luma8(), BINARIZE_THRESHOLD);

        let scratch = tempfile::tempdir()?;
        let input_path = scratch.path().join("input.bmp");
        let traced_path = scratch.path().join("traced.pgm");

        write_image(&mono, &input_path, ImageFormat::Bmp)?;

        let output = Command::new("potrace")
            .arg(&input_path)
            .args(["-b", "pgm"])
            .arg("-o")
            .arg(&traced_path)
            .output()
            .await?;
        if !output.status.success() {
            return Err(PipelineError::optimization(format!(
                "potrace exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let traced_bytes = tokio::fs::read(&traced_path).await?;
        let traced = image::load_from_memory(&traced_bytes).map_err(|e| {
            PipelineError::optimization(format!("cannot decode traced image: {}", e))
        })?;

        let canvas = normalize_canvas(&traced, self.width, self.height);
        debug!(
            width = self.width,
            height = self.height,
            "rendered trace onto print canvas"
        );
        encode_png(&canvas)
    }
}

/// Threshold a grayscale image to pure black and white.
fn binarize(img: &GrayImage, threshold: u8) -> GrayImage {
    let mut out = img.clone();
    for pixel in out.pixels_mut() {
        pixel.0[0] = if pixel.0[0] > threshold { 255 } else { 0 };
    }
    out
}

/// Rescale to the target canvas and flatten to RGB. Grayscale input has no
/// alpha, so flattening is a plain color-space conversion; the background is
/// already white from the trace.
fn normalize_canvas(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    let resized = img.resize_exact(width, height, FilterType::Lanczos3);
    DynamicImage::ImageRgb8(resized.to_rgb8())
}

fn write_image(img: &GrayImage, path: &Path, format: ImageFormat) -> PipelineResult<()> {
    img.save_with_format(path, format)
        .map_err(|e| PipelineError::optimization(format!("cannot write trace input: {}", e)))
}

fn encode_png(img: &DynamicImage) -> PipelineResult<Vec<u8>> {
    let mut bytes = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| PipelineError::optimization(format!("cannot encode PNG: {}", e)))?;
    Ok(bytes)
}

/// The rendering stage: generate, store raw, optimize, store optimized.
pub struct Generator {
    image_model: Arc<dyn ImageModel>,
    optimizer: Arc<dyn ImageOptimizer>,
    artifacts: Arc<dyn ArtifactStore>,
}

impl Generator {
    pub fn new(
        image_model: Arc<dyn ImageModel>,
        optimizer: Arc<dyn ImageOptimizer>,
        artifacts: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            image_model,
            optimizer,
            artifacts,
        }
    }
}

#[async_trait]
impl PipelineStage for Generator {
    type Input = StyledPrompt;
    type Output = RenderedArtifact;
    type Error = PipelineError;

    fn name(&self) -> &'static str {
        "generator"
    }

    async fn preflight(&self) -> PipelineResult<()> {
        self.optimizer.preflight().await
    }

    async fn run(&self, styled: StyledPrompt) -> PipelineResult<RenderedArtifact> {
        let negative = styled.negative_prompt_text();
        let negative = (!negative.is_empty()).then_some(negative.as_str());

        let raw_bytes = self
            .image_model
            .generate(&styled.positive_prompt, negative)
            .await
            .map_err(|e| match e {
                LlmError::SafetyRejected { message } => PipelineError::generation(format!(
                    "image provider rejected the prompt: {}",
                    message
                )),
                LlmError::MalformedResponse { message } => PipelineError::generation(format!(
                    "image provider returned no image payload: {}",
                    message
                )),
                other => PipelineError::Llm(other),
            })?;

        let basename = format!("{}.png", Uuid::new_v4());
        let raw_location = self.artifacts.store_raw(&basename, &raw_bytes).await?;

        let optimized_bytes = self.optimizer.optimize(&raw_bytes).await?;
        let optimized_location = self
            .artifacts
            .store_optimized(&basename, &optimized_bytes)
            .await?;

        info!(
            title = %styled.concept.title,
            raw = %raw_location,
            optimized = %optimized_location,
            "rendered artifact"
        );
        Ok(RenderedArtifact {
            raw_location,
            optimized_location,
        })
    }
}
