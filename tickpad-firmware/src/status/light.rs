use embassy_time::{Duration, Instant};
use embedded_hal::pwm::SetDutyCycle;

use super::{PeripheralError, ResolvedEvent, StatusObserver};
use crate::{key_scanner::KeyEventKind, matrix::PinId};

pub const MAX_BRIGHTNESS: u8 = 100;
pub const DEFAULT_BREATHING_PERIOD: Duration = Duration::from_secs(2);

/// Duty resolution used when writing to the PWM channel.
const FULL_SCALE: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AnimationMode {
    Static,
    /// Fade in and out once per period.
    Breathing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LedConfig {
    pub pin: PinId,
    /// 0 to 100
    pub brightness: u8,
    pub mode: AnimationMode,
    pub period: Duration,
    /// Light at full brightness for this long after each key press.
    pub flash: Option<Duration>,
}

impl LedConfig {
    pub const fn new(pin: PinId) -> Self {
        Self {
            pin,
            brightness: MAX_BRIGHTNESS,
            mode: AnimationMode::Static,
            period: DEFAULT_BREATHING_PERIOD,
            flash: None,
        }
    }

    pub const fn with_brightness(mut self, brightness: u8) -> Self {
        self.brightness = brightness;
        self
    }

    pub const fn with_mode(mut self, mode: AnimationMode) -> Self {
        self.mode = mode;
        self
    }

    pub const fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub const fn with_flash(mut self, flash: Duration) -> Self {
        self.flash = Some(flash);
        self
    }

    fn check(&self) -> Result<(), PeripheralError> {
        if self.brightness > MAX_BRIGHTNESS
            || (self.mode == AnimationMode::Breathing && self.period.as_ticks() == 0)
        {
            Err(PeripheralError::InvalidConfig)
        } else {
            Ok(())
        }
    }

    /// Duty in thousandths for the animation `elapsed` into its run.
    pub fn level_at(&self, elapsed: Duration) -> u16 {
        let scale = self.brightness as u32 * FULL_SCALE / MAX_BRIGHTNESS as u32;
        let level = match self.mode {
            AnimationMode::Static => scale,
            AnimationMode::Breathing => {
                let period = self.period.as_ticks().max(1);
                let phase = elapsed.as_ticks() % period;
                let rising = if phase * 2 < period {
                    phase * 2
                } else {
                    (period - phase) * 2
                };
                let tri = (rising * FULL_SCALE as u64 / period) as u32;
                tri * tri / FULL_SCALE * scale / FULL_SCALE
            }
        };
        level as u16
    }
}

/// Drives a single PWM status LED.
pub struct LedAnimator<P: SetDutyCycle> {
    /// `None` once a write has failed.
    pwm: Option<P>,
    config: LedConfig,
    started: Instant,
    flash_until: Option<Instant>,
    level: Option<u16>,
}

impl<P: SetDutyCycle> LedAnimator<P> {
    pub fn new(pwm: P, config: LedConfig, now: Instant) -> Result<Self, PeripheralError> {
        config.check()?;
        let mut me = Self {
            pwm: Some(pwm),
            config,
            started: now,
            flash_until: None,
            level: None,
        };
        me.tick(now);
        if me.is_enabled() {
            Ok(me)
        } else {
            Err(PeripheralError::Unavailable)
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.pwm.is_some()
    }

    /// The duty last written in thousandths.
    pub fn level(&self) -> Option<u16> {
        self.level
    }

    fn write(&mut self, level: u16) {
        if self.level == Some(level) {
            return;
        }
        let Some(pwm) = self.pwm.as_mut() else {
            return;
        };
        if pwm.set_duty_cycle_fraction(level, FULL_SCALE as u16).is_err() {
            crate::warn!("status LED write failed; disabled");
            self.pwm = None;
            return;
        }
        self.level = Some(level);
    }
}

impl<P: SetDutyCycle> StatusObserver for LedAnimator<P> {
    fn on_event(&mut self, event: &ResolvedEvent) {
        if let (KeyEventKind::Pressed, Some(flash)) = (event.kind, self.config.flash) {
            self.flash_until = Some(event.at.checked_add(flash).unwrap_or(Instant::MAX));
        }
    }

    fn tick(&mut self, now: Instant) {
        if !self.is_enabled() {
            return;
        }
        let level = match self.flash_until {
            Some(until) if now < until => FULL_SCALE as u16,
            _ => {
                self.flash_until = None;
                self.config
                    .level_at(now.saturating_duration_since(self.started))
            }
        };
        self.write(level);
    }
}

#[cfg(test)]
#[path = "light_test.rs"]
mod test;
