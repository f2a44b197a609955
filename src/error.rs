use std::path::PathBuf;

use thiserror::Error;

/// Failures raised while setting up the renderer or registering scene content.
///
/// Every variant is fatal during setup. Once the frame loop runs, only
/// [`RenderError::Surface`] can still occur.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to initialize {stage}: {message}")]
    Initialization {
        stage: &'static str,
        message: String,
    },

    #[error("shader compilation failed for {label}\n{diagnostics}")]
    ShaderCompile { label: String, diagnostics: String },

    #[error("shader program linking failed for {label}\n{diagnostics}")]
    ShaderLink { label: String, diagnostics: String },

    #[error("failed to load texture {}: {reason}", path.display())]
    TextureLoad { path: PathBuf, reason: String },

    #[error("invalid mesh: {0}")]
    InvalidMesh(String),

    #[error("cannot register {0} after the render loop has started")]
    RegistrationClosed(&'static str),

    #[error("surface error: {0}")]
    Surface(String),
}

impl RenderError {
    pub(crate) fn init(stage: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Initialization {
            stage,
            message: err.to_string(),
        }
    }
}
