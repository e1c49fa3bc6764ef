//! One-time acquisition of the rendering library.
//!
//! [`LibraryAcquirer`] memoizes the first successfully acquired and
//! initialized [`RendererHandle`]. Failures are not memoized: the next pass
//! tries again.

use std::fmt;
use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::renderer::{RenderOptions, RendererHandle};

/// The rendering library could not be obtained or initialized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AcquisitionError {
    /// The library or the service behind it is not reachable.
    #[error("rendering library unavailable: {0}")]
    Unavailable(String),
    /// The library was obtained but rejected its options.
    #[error("rendering library initialization failed: {0}")]
    Initialization(String),
}

/// Produces rendering library handles.
#[async_trait::async_trait]
pub trait RendererSource: Send + Sync {
    /// Obtain a handle, e.g. by loading the library or probing a server.
    async fn acquire(&self) -> Result<Arc<dyn RendererHandle>, AcquisitionError>;
}

/// Memoizing front of a [`RendererSource`].
pub struct LibraryAcquirer {
    source: Arc<dyn RendererSource>,
    options: RenderOptions,
    handle: OnceCell<Arc<dyn RendererHandle>>,
}

impl fmt::Debug for LibraryAcquirer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibraryAcquirer")
            .field("options", &self.options)
            .field("acquired", &self.is_acquired())
            .finish_non_exhaustive()
    }
}

impl LibraryAcquirer {
    /// Create an acquirer that initializes handles with `options`.
    #[must_use]
    pub fn new(source: Arc<dyn RendererSource>, options: RenderOptions) -> Self {
        Self {
            source,
            options,
            handle: OnceCell::new(),
        }
    }

    /// Return the memoized handle, acquiring and initializing it first if needed.
    ///
    /// Concurrent callers share one acquisition attempt.
    pub async fn acquire(&self) -> Result<Arc<dyn RendererHandle>, AcquisitionError> {
        self.handle
            .get_or_try_init(|| async {
                let handle = self.source.acquire().await?;
                handle
                    .initialize(&self.options)
                    .map_err(|e| AcquisitionError::Initialization(e.to_string()))?;
                tracing::info!(
                    theme = %self.options.theme,
                    security_level = %self.options.security_level,
                    "Rendering library initialized"
                );
                Ok(handle)
            })
            .await
            .map(Arc::clone)
    }

    /// Whether a handle has been acquired.
    #[must_use]
    pub fn is_acquired(&self) -> bool {
        self.handle.initialized()
    }

    /// Options applied to acquired handles.
    #[must_use]
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }
}
