use embassy_time::{Duration, Instant};
use heapless::Vec;

use super::{PeripheralError, ResolvedEvent, StatusObserver};
use crate::{config::MAX_TEXT_ENTRIES, key_scanner::KeyEventKind, matrix::PinId};

/// Which point of the text box sits at `(x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Anchor {
    TopLeft,
    TopCenter,
    TopRight,
    MiddleLeft,
    MiddleCenter,
    MiddleRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

impl Anchor {
    /// Parse a two letter code such as `"TL"` or `"MC"`. `M` and `C` both mean centre.
    pub fn from_code(code: &str) -> Option<Self> {
        let b = code.as_bytes();
        if b.len() != 2 {
            return None;
        }
        let v = match b[0].to_ascii_uppercase() {
            b'T' => 0,
            b'M' | b'C' => 1,
            b'B' => 2,
            _ => return None,
        };
        let h = match b[1].to_ascii_uppercase() {
            b'L' => 0,
            b'M' | b'C' => 1,
            b'R' => 2,
            _ => return None,
        };
        Some(match (v, h) {
            (0, 0) => Self::TopLeft,
            (0, 1) => Self::TopCenter,
            (0, _) => Self::TopRight,
            (1, 0) => Self::MiddleLeft,
            (1, 1) => Self::MiddleCenter,
            (1, _) => Self::MiddleRight,
            (_, 0) => Self::BottomLeft,
            (_, 1) => Self::BottomCenter,
            _ => Self::BottomRight,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TextEntry {
    pub text: &'static str,
    pub x: i32,
    pub y: i32,
    pub scale: u8,
    pub anchor: Anchor,
}

impl TextEntry {
    pub const fn new(text: &'static str, x: i32, y: i32) -> Self {
        Self {
            text,
            x,
            y,
            scale: 1,
            anchor: Anchor::TopLeft,
        }
    }

    pub const fn with_scale(mut self, scale: u8) -> Self {
        self.scale = scale;
        self
    }

    pub const fn with_anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self
    }
}

/// The panel primitives the renderer pushes to. Nothing is read back.
pub trait DisplayDriver {
    type Error: core::fmt::Debug;

    /// Replace the screen contents with `entries`.
    fn draw(&mut self, entries: &[TextEntry]) -> Result<(), Self::Error>;

    /// `level` is between 0 and 1.
    fn set_brightness(&mut self, level: f32) -> Result<(), Self::Error>;

    fn set_power(&mut self, on: bool) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayState {
    Bright,
    Dimmed,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplayConfig {
    /// I2C address.
    pub address: u8,
    pub sda: PinId,
    pub scl: PinId,
    pub width: u16,
    pub height: u16,
    pub flip_x: bool,
    pub flip_y: bool,
    pub brightness: f32,
    pub dim_target: f32,
    /// Idle time before dimming.
    pub dim_time: Duration,
    /// Idle time before the panel is switched off.
    pub off_time: Duration,
    /// How long dimming takes to reach `dim_target`.
    pub fade_time: Duration,
    pub entries: &'static [TextEntry],
}

impl DisplayConfig {
    pub const fn new(address: u8, sda: PinId, scl: PinId, width: u16, height: u16) -> Self {
        Self {
            address,
            sda,
            scl,
            width,
            height,
            flip_x: false,
            flip_y: false,
            brightness: 1.0,
            dim_target: 0.1,
            dim_time: Duration::from_secs(20),
            off_time: Duration::from_secs(60),
            fade_time: Duration::from_ticks(0),
            entries: &[],
        }
    }

    pub const fn with_flip(mut self, flip_x: bool, flip_y: bool) -> Self {
        self.flip_x = flip_x;
        self.flip_y = flip_y;
        self
    }

    pub const fn with_brightness(mut self, brightness: f32, dim_target: f32) -> Self {
        self.brightness = brightness;
        self.dim_target = dim_target;
        self
    }

    pub const fn with_timers(mut self, dim_time: Duration, off_time: Duration) -> Self {
        self.dim_time = dim_time;
        self.off_time = off_time;
        self
    }

    pub const fn with_fade_time(mut self, fade_time: Duration) -> Self {
        self.fade_time = fade_time;
        self
    }

    pub const fn with_entries(mut self, entries: &'static [TextEntry]) -> Self {
        self.entries = entries;
        self
    }

    fn check(&self) -> Result<(), PeripheralError> {
        let valid = self.width > 0
            && self.height > 0
            && (0.0..=1.0).contains(&self.brightness)
            && (0.0..=self.brightness).contains(&self.dim_target)
            && self.dim_time <= self.off_time
            // one slot stays free for the status line
            && self.entries.len() < MAX_TEXT_ENTRIES;
        if valid {
            Ok(())
        } else {
            Err(PeripheralError::InvalidConfig)
        }
    }
}

/// Shows the configured text and dims then blanks the panel when the keyboard is idle.
pub struct DisplayRenderer<D: DisplayDriver> {
    /// `None` once the driver has failed.
    driver: Option<D>,
    config: DisplayConfig,
    entries: Vec<TextEntry, MAX_TEXT_ENTRIES>,
    state: DisplayState,
    last_activity: Instant,
    level: f32,
    redraw: bool,
}

impl<D: DisplayDriver> DisplayRenderer<D> {
    pub fn new(mut driver: D, config: DisplayConfig, now: Instant) -> Result<Self, PeripheralError> {
        config.check()?;
        let mut entries = Vec::new();
        entries
            .extend_from_slice(config.entries)
            .map_err(|_| PeripheralError::InvalidConfig)?;

        let init = driver
            .set_power(true)
            .and_then(|_| driver.set_brightness(config.brightness))
            .and_then(|_| driver.draw(&entries));
        if init.is_err() {
            crate::warn!("display init failed");
            return Err(PeripheralError::Unavailable);
        }

        Ok(Self {
            driver: Some(driver),
            config,
            entries,
            state: DisplayState::Bright,
            last_activity: now,
            level: config.brightness,
            redraw: false,
        })
    }

    pub fn state(&self) -> DisplayState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.driver.is_some()
    }

    pub fn brightness(&self) -> f32 {
        self.level
    }

    pub fn entries(&self) -> &[TextEntry] {
        &self.entries
    }

    /// Show `text` on the bottom line, replacing the previous status.
    pub fn set_status(&mut self, text: &'static str) {
        let line = TextEntry::new(text, 0, self.config.height as i32 - 1)
            .with_anchor(Anchor::BottomLeft);
        let idx = self.config.entries.len();
        if let Some(entry) = self.entries.get_mut(idx) {
            *entry = line;
        } else if self.entries.push(line).is_err() {
            return;
        }
        self.redraw = true;
    }

    /// Run `f` against the driver; a failure disables the renderer.
    fn with_driver(&mut self, f: impl FnOnce(&mut D) -> Result<(), D::Error>) {
        let Some(driver) = self.driver.as_mut() else {
            return;
        };
        if f(driver).is_err() {
            crate::warn!("display driver failed; disabled");
            self.driver = None;
        }
    }

    fn set_level(&mut self, level: f32) {
        if level != self.level {
            self.with_driver(|d| d.set_brightness(level));
            self.level = level;
        }
    }

    fn wake(&mut self) {
        match self.state {
            DisplayState::Bright => {}
            DisplayState::Dimmed => self.set_level(self.config.brightness),
            DisplayState::Off => {
                self.with_driver(|d| d.set_power(true));
                self.set_level(self.config.brightness);
            }
        }
        self.state = DisplayState::Bright;
    }

    fn dimmed_level(&self, dimmed_for: Duration) -> f32 {
        let fade = self.config.fade_time.as_ticks();
        if fade == 0 || dimmed_for.as_ticks() >= fade {
            return self.config.dim_target;
        }
        let t = dimmed_for.as_ticks() as f32 / fade as f32;
        self.config.brightness + (self.config.dim_target - self.config.brightness) * t
    }
}

impl<D: DisplayDriver> StatusObserver for DisplayRenderer<D> {
    fn on_event(&mut self, event: &ResolvedEvent) {
        if !self.is_enabled() {
            return;
        }
        self.last_activity = event.at;
        self.wake();
        if let (KeyEventKind::Pressed, Some(label)) = (event.kind, event.label) {
            self.set_status(label);
        }
    }

    fn tick(&mut self, now: Instant) {
        if !self.is_enabled() {
            return;
        }
        let idle = now.saturating_duration_since(self.last_activity);

        if self.state == DisplayState::Bright && idle >= self.config.dim_time {
            crate::debug!("display dimmed");
            self.state = DisplayState::Dimmed;
        }
        if self.state == DisplayState::Dimmed {
            if idle >= self.config.off_time {
                crate::debug!("display off");
                self.set_level(self.config.dim_target);
                self.with_driver(|d| d.set_power(false));
                self.state = DisplayState::Off;
            } else {
                let dimmed_for = idle
                    .checked_sub(self.config.dim_time)
                    .unwrap_or(Duration::from_ticks(0));
                self.set_level(self.dimmed_level(dimmed_for));
            }
        }

        if self.redraw {
            self.redraw = false;
            let entries = &self.entries;
            if let Some(driver) = self.driver.as_mut() {
                if driver.draw(entries).is_err() {
                    crate::warn!("display driver failed; disabled");
                    self.driver = None;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "display_test.rs"]
mod test;
