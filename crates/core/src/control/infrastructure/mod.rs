pub mod interrupt;
pub mod preview_window;
pub mod terminal_control;
