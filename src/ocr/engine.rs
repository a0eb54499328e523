//! Recognition engine seam and its release guard.

use async_trait::async_trait;
use std::path::Path;

use crate::tiers::TierError;

/// A recognition engine instance held for the duration of one OCR call
#[async_trait]
pub trait RecognitionEngine: Send + std::fmt::Debug {
    /// Recognize the text of one rasterized page
    async fn recognize(&mut self, image: &Path) -> Result<String, TierError>;

    /// Free any resources held by the engine
    fn release(&mut self);
}

/// Creates engine instances
#[async_trait]
pub trait EngineProvider: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    /// Acquire a fresh engine for one call
    async fn acquire(&self) -> Result<Box<dyn RecognitionEngine>, TierError>;

    /// Whether the backing tools are installed
    async fn is_available(&self) -> bool;
}

/// Owns an engine and releases it exactly once, on [`EngineGuard::release`]
/// or on drop (including when the owning future is cancelled)
#[derive(Debug)]
pub struct EngineGuard {
    engine: Option<Box<dyn RecognitionEngine>>,
}

impl EngineGuard {
    pub fn new(engine: Box<dyn RecognitionEngine>) -> Self {
        Self {
            engine: Some(engine),
        }
    }

    pub async fn recognize(&mut self, image: &Path) -> Result<String, TierError> {
        match self.engine.as_mut() {
            Some(engine) => engine.recognize(image).await,
            None => Err(TierError::Ocr("engine already released".to_string())),
        }
    }

    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            engine.release();
            tracing::debug!("released recognition engine");
        }
    }
}

impl Drop for EngineGuard {
    fn drop(&mut self) {
        self.release_inner();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug)]
    struct CountingEngine {
        releases: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RecognitionEngine for CountingEngine {
        async fn recognize(&mut self, _image: &Path) -> Result<String, TierError> {
            Ok("text".to_string())
        }

        fn release(&mut self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn guard(releases: &Arc<AtomicUsize>) -> EngineGuard {
        EngineGuard::new(Box::new(CountingEngine {
            releases: Arc::clone(releases),
        }))
    }

    #[tokio::test]
    async fn test_explicit_release_happens_once() {
        let releases = Arc::new(AtomicUsize::new(0));
        let mut g = guard(&releases);
        assert_eq!(g.recognize(Path::new("p.png")).await.unwrap(), "text");
        g.release();
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_releases_once() {
        let releases = Arc::new(AtomicUsize::new(0));
        drop(guard(&releases));
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_future_releases_once() {
        let releases = Arc::new(AtomicUsize::new(0));
        let g = guard(&releases);
        let fut = async move {
            let _g = g;
            tokio::time::sleep(std::time::Duration::from_secs(10)).await;
        };
        let limit = std::time::Duration::from_millis(10);
        let _ = tokio::time::timeout(limit, fut).await;
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }
}
