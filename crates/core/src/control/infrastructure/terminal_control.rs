use std::io::{self, BufRead};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::control::domain::control_action::ControlAction;
use crate::control::domain::control_surface::ControlSurface;
use crate::shared::error::BoxError;

use super::interrupt::InterruptFlag;

/// Headless control surface: keys are typed into the terminal.
///
/// A reader thread forwards the first character of each stdin line over a
/// channel, so `poll` never blocks longer than its timeout. Ctrl+C maps to
/// [`ControlAction::Quit`].
pub struct TerminalControl {
    keys: Receiver<char>,
    interrupt: InterruptFlag,
}

impl TerminalControl {
    /// Starts reading keys from stdin.
    pub fn spawn(interrupt: InterruptFlag) -> Result<Self, BoxError> {
        let (tx, rx) = crossbeam_channel::unbounded();
        thread::Builder::new()
            .name("stdin-keys".into())
            .spawn(move || forward_keys(io::stdin().lock(), &tx))?;
        Ok(Self::new(rx, interrupt))
    }

    pub fn new(keys: Receiver<char>, interrupt: InterruptFlag) -> Self {
        Self { keys, interrupt }
    }
}

impl ControlSurface for TerminalControl {
    fn poll(&mut self, timeout: Duration) -> Result<Option<ControlAction>, BoxError> {
        if self.interrupt.is_raised() {
            return Ok(Some(ControlAction::Quit));
        }
        match self.keys.recv_timeout(timeout) {
            Ok(key) => Ok(ControlAction::from_key(key)),
            // stdin closed: only Ctrl+C can stop us now
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                Ok(self.interrupt.is_raised().then_some(ControlAction::Quit))
            }
        }
    }
}

/// Sends the first non-blank character of each line until EOF or until the
/// receiving side goes away.
fn forward_keys(reader: impl BufRead, tx: &Sender<char>) {
    for line in reader.lines() {
        let Ok(line) = line else {
            break;
        };
        if let Some(key) = line.trim().chars().next() {
            if tx.send(key).is_err() {
                break;
            }
        }
    }
    log::debug!("Terminal key reader finished");
}
