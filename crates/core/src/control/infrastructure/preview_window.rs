use std::thread;
use std::time::{Duration, Instant};

use minifb::{Key, KeyRepeat, Window, WindowOptions};

use crate::control::domain::control_action::ControlAction;
use crate::control::domain::control_surface::ControlSurface;
use crate::shared::constants::PREVIEW_WINDOW_TITLE;
use crate::shared::error::BoxError;
use crate::shared::frame::Frame;

use super::interrupt::InterruptFlag;

/// Local preview window that also collects key presses.
///
/// The window is created on the first [`present`](ControlSurface::present),
/// sized to that frame. Closing it counts as a quit.
pub struct PreviewWindow {
    window: Option<Window>,
    buffer: Vec<u32>,
    interrupt: InterruptFlag,
}

impl PreviewWindow {
    pub fn new(interrupt: InterruptFlag) -> Self {
        Self {
            window: None,
            buffer: Vec::new(),
            interrupt,
        }
    }
}

impl ControlSurface for PreviewWindow {
    fn present(&mut self, frame: &Frame) -> Result<(), BoxError> {
        let width = frame.width() as usize;
        let height = frame.height() as usize;

        if self.window.is_none() {
            let window = Window::new(PREVIEW_WINDOW_TITLE, width, height, WindowOptions::default())
                .map_err(|e| format!("cannot open preview window: {e}"))?;
            log::debug!("Preview window opened ({width}x{height})");
            self.window = Some(window);
        }
        let window = self.window.as_mut().ok_or("preview window missing")?;

        to_0rgb(frame, &mut self.buffer);
        window.update_with_buffer(&self.buffer, width, height)?;
        Ok(())
    }

    fn poll(&mut self, timeout: Duration) -> Result<Option<ControlAction>, BoxError> {
        let deadline = Instant::now() + timeout;
        if self.interrupt.is_raised() {
            return Ok(Some(ControlAction::Quit));
        }

        if let Some(window) = self.window.as_mut() {
            if !window.is_open() {
                return Ok(Some(ControlAction::Quit));
            }
            let action = window
                .get_keys_pressed(KeyRepeat::No)
                .into_iter()
                .find_map(action_for_key);
            if action.is_some() {
                return Ok(action);
            }
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        if !remaining.is_zero() {
            thread::sleep(remaining);
        }
        Ok(None)
    }
}

fn action_for_key(key: Key) -> Option<ControlAction> {
    match key {
        Key::B => ControlAction::from_key('b'),
        Key::Q => ControlAction::from_key('q'),
        Key::Escape => Some(ControlAction::Quit),
        _ => None,
    }
}

/// Packs BGR pixels into minifb's `0RGB` u32 layout.
fn to_0rgb(frame: &Frame, buffer: &mut Vec<u32>) {
    buffer.clear();
    buffer.extend(frame.data().chunks_exact(frame.channels() as usize).map(|px| {
        let (b, g, r) = (px[0] as u32, px[1] as u32, px[2] as u32);
        (r << 16) | (g << 8) | b
    }));
}
