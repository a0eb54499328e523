//! Page rasterization.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::tiers::TierError;

/// Renders PDF pages to image files
#[async_trait]
pub trait PageRasterizer: Send + Sync + std::fmt::Debug {
    /// Render at most `max_pages` leading pages into `out_dir`, returning the
    /// image paths in page order
    async fn rasterize(
        &self,
        pdf: &[u8],
        max_pages: usize,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, TierError>;

    /// Whether the backing tool is installed
    async fn is_available(&self) -> bool;
}

/// Rasterizer backed by poppler's `pdftoppm`
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    binary: String,
    dpi: u32,
}

impl PdftoppmRasterizer {
    pub fn new(binary: impl Into<String>, dpi: u32) -> Self {
        Self {
            binary: binary.into(),
            dpi,
        }
    }
}

#[async_trait]
impl PageRasterizer for PdftoppmRasterizer {
    async fn rasterize(
        &self,
        pdf: &[u8],
        max_pages: usize,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, TierError> {
        let input = out_dir.join("input.pdf");
        tokio::fs::write(&input, pdf).await?;

        let output = Command::new(&self.binary)
            .arg("-png")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-f")
            .arg("1")
            .arg("-l")
            .arg(max_pages.max(1).to_string())
            .arg(&input)
            .arg(out_dir.join("page"))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| TierError::Ocr(format!("Failed to run {}: {}", self.binary, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TierError::Ocr(format!(
                "{} failed: {}",
                self.binary,
                stderr.trim()
            )));
        }

        let mut images = Vec::new();
        let mut entries = tokio::fs::read_dir(out_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "png") {
                images.push(path);
            }
        }
        // pdftoppm zero-pads page numbers, so name order is page order
        images.sort();

        if images.is_empty() {
            return Err(TierError::Ocr(format!("{} produced no images", self.binary)));
        }
        Ok(images)
    }

    async fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("-v")
            .kill_on_drop(true)
            .output()
            .await
            .is_ok()
    }
}
