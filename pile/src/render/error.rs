use std::time::Duration;

use thiserror::Error;

/// Failure of one render attempt, or the terminal failure of a render.
///
/// Cloned to every waiter of a coalesced render.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RenderError {
    /// The stylesheet could not be lowered to the renderer's native style.
    #[error("Style compilation failed: {0}")]
    StyleCompilation(String),

    /// The renderer could not reach or query the spatial store.
    #[error("Datasource error: {0}")]
    Datasource(String),

    /// The rendering engine rejected the job or produced no output.
    #[error("Render engine error: {0}")]
    Engine(String),

    #[error("Render timed out after {0:?}")]
    Timeout(Duration),

    /// The attempt stayed in flight past the liveness threshold.
    #[error("Render stalled for {0:?}")]
    Stalled(Duration),

    #[error("Render task panicked: {0}")]
    Panicked(String),

    /// Every allowed attempt failed; `last` is the final attempt's error.
    #[error("Render failed after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        last: Box<RenderError>,
    },

    #[error("Render coordinator is shutting down")]
    ShuttingDown,
}
