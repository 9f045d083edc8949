/// Actions an operator can trigger while the pipeline runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlAction {
    /// Flip blur on/off starting with the next frame.
    Toggle,
    /// Stop after the current frame has been delivered.
    Quit,
}

impl ControlAction {
    /// Maps a pressed key to an action; unbound keys yield `None`.
    pub fn from_key(key: char) -> Option<Self> {
        match key.to_ascii_lowercase() {
            'b' => Some(Self::Toggle),
            'q' => Some(Self::Quit),
            _ => None,
        }
    }
}
