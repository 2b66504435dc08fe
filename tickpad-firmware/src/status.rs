//! Status peripherals that watch the resolved key stream.

use embassy_time::Instant;

use crate::{key_scanner::KeyEventKind, keymap::Action, matrix::KeyPosition};

pub mod display;
pub mod light;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PeripheralError {
    /// The hardware did not respond.
    Unavailable,
    InvalidConfig,
}

/// A key event after keymap resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ResolvedEvent {
    pub position: KeyPosition,
    pub kind: KeyEventKind,
    pub action: Action,
    /// Label of the macro this press started, if any.
    pub label: Option<&'static str>,
    pub at: Instant,
}

/// Observers must not block; the scan loop calls them every tick.
pub trait StatusObserver {
    fn on_event(&mut self, event: &ResolvedEvent);

    fn tick(&mut self, now: Instant);
}
