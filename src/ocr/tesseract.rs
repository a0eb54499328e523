//! Tesseract command-line recognition engine.

use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

use super::engine::{EngineProvider, RecognitionEngine};
use crate::tiers::TierError;

/// Hands out [`TesseractEngine`]s after checking the binary runs
#[derive(Debug, Clone)]
pub struct TesseractProvider {
    binary: String,
    language: String,
    page_segmentation: u8,
}

impl TesseractProvider {
    pub fn new(
        binary: impl Into<String>,
        language: impl Into<String>,
        page_segmentation: u8,
    ) -> Self {
        Self {
            binary: binary.into(),
            language: language.into(),
            page_segmentation,
        }
    }
}

#[async_trait]
impl EngineProvider for TesseractProvider {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn acquire(&self) -> Result<Box<dyn RecognitionEngine>, TierError> {
        if !self.is_available().await {
            return Err(TierError::Ocr(format!("{} is not installed", self.binary)));
        }
        Ok(Box::new(TesseractEngine {
            binary: self.binary.clone(),
            language: self.language.clone(),
            page_segmentation: self.page_segmentation,
            released: false,
        }))
    }

    async fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .kill_on_drop(true)
            .output()
            .await
            .is_ok()
    }
}

/// One recognition session; each page runs as a child process that is
/// killed if the page future is dropped
#[derive(Debug)]
pub struct TesseractEngine {
    binary: String,
    language: String,
    page_segmentation: u8,
    released: bool,
}

#[async_trait]
impl RecognitionEngine for TesseractEngine {
    async fn recognize(&mut self, image: &Path) -> Result<String, TierError> {
        if self.released {
            return Err(TierError::Ocr("engine already released".to_string()));
        }

        let output = Command::new(&self.binary)
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg(self.page_segmentation.to_string())
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

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn release(&mut self) {
        self.released = true;
    }
}
