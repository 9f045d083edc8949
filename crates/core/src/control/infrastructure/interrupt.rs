use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::shared::error::BoxError;

/// Process-wide Ctrl+C flag shared with the control surfaces.
///
/// The signal handler only raises the flag; the pipeline notices it at its
/// next key poll and shuts down through the normal path, so devices are
/// released the same way as for a quit key.
#[derive(Clone, Debug, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the Ctrl+C handler. Can only succeed once per process.
    pub fn install() -> Result<Self, BoxError> {
        let flag = Self::new();
        let handler_flag = flag.clone();
        ctrlc::set_handler(move || {
            log::info!("Interrupt received, stopping after the current frame");
            handler_flag.raise();
        })?;
        Ok(flag)
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
