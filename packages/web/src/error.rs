use thiserror::Error;

/// Errors raised by the browser runtime (§7.A).
#[derive(Debug, Error)]
pub enum WebError {
    /// A `web-sys` DOM call failed (threw a JS exception).
    #[error("DOM operation failed: {0}")]
    Dom(String),

    /// The document has no element matching the mount selector.
    #[error("mount point {0:?} not found")]
    MountPointMissing(String),

    /// Constructing the `WebSocket` transport failed.
    #[error("failed to open websocket to {0:?}: {1}")]
    SocketInit(String, String),
}

impl From<wasm_bindgen::JsValue> for WebError {
    fn from(value: wasm_bindgen::JsValue) -> Self {
        WebError::Dom(
            value
                .as_string()
                .unwrap_or_else(|| format!("{value:?}")),
        )
    }
}
