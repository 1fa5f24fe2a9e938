use thiserror::Error;

/// Errors raised by the hint cache (§7.A).
#[derive(Debug, Error)]
pub enum HintError {
    /// Materializing a hint's template patches against its own predicted state failed —
    /// this would mean the hint was constructed inconsistently, since a hint's predicted
    /// state is supposed to be exactly what its templates need.
    #[error("failed to materialize hint {key:?}: {source}")]
    Materialize {
        key: String,
        #[source]
        source: minimact_core::PatchError,
    },
}
