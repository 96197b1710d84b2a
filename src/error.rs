//! Render error types.

/// Errors that can occur while creating or updating device resources.
///
/// Contract violations (rendering before [`close`], out-of-range detail
/// indices, binding a buffer with no data) are asserts, not errors: they are
/// programmer mistakes and are never reported through `Result`.
///
/// [`close`]: crate::cache::PrimitiveVertexCache::close
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// Failed to create a device resource.
    #[error("resource creation failed: {0}")]
    ResourceCreationFailed(String),
    /// A requested capability is not supported by the context.
    #[error("capability not supported: {0}")]
    CapabilityNotSupported(String),
    /// An invalid parameter was provided.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// The rendering context has already been destroyed.
    #[error("context {0} has been destroyed")]
    ContextDestroyed(u32),
}
