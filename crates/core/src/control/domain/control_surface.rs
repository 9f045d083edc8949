use std::time::Duration;

use crate::shared::error::BoxError;
use crate::shared::frame::Frame;

use super::control_action::ControlAction;

/// Operator-facing side of the pipeline: optional preview plus key input.
pub trait ControlSurface {
    /// Shows `frame` to the operator. Headless surfaces ignore it.
    fn present(&mut self, _frame: &Frame) -> Result<(), BoxError> {
        Ok(())
    }

    /// Waits at most `timeout` for one key and maps it to an action.
    fn poll(&mut self, timeout: Duration) -> Result<Option<ControlAction>, BoxError>;
}
