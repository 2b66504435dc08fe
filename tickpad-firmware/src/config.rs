//! Static keyboard configuration and its startup validation.

use embassy_time::Duration;
use heapless::Vec;

use crate::{
    keymap::{Action, Layer},
    macro_engine::{Macro, MacroStep},
    matrix::{Decoder, DiodeOrientation, PinId},
    status::{display::DisplayConfig, light::LedConfig},
};

pub const MAX_KEYS: usize = 64;
pub const MAX_LAYERS: usize = 8;
pub const MAX_HELD_LAYERS: usize = 8;
pub const MAX_MACROS: usize = u8::MAX as usize + 1;
pub const MAX_RUNNING_MACROS: usize = 4;
/// How many keys one macro invocation may hold down at the same time.
pub const MAX_MACRO_HELD: usize = 6;
pub const MAX_TEXT_ENTRIES: usize = 4;
pub const MAX_OBSERVERS: usize = 2;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(5);
pub const DEFAULT_SETTLE_TIME: Duration = Duration::from_micros(10);
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    EmptyMatrix,
    /// The pin is used more than once across the matrix and peripherals.
    PinConflict(PinId),
    /// The pins handed to the scanner do not match the matrix and orientation.
    PinCountMismatch {
        inputs: usize,
        outputs: usize,
    },
    NoLayers,
    LayerSizeMismatch {
        layer: usize,
        expected: usize,
        found: usize,
    },
    UnknownMacro {
        layer: usize,
        index: usize,
        id: u8,
    },
    UnknownLayer {
        layer: usize,
        index: usize,
        target: u8,
    },
    TooManyKeys(usize),
    TooManyLayers(usize),
    TooManyMacros(usize),
    MacroHoldsTooMany(u8),
}

#[derive(Debug, Clone, Copy)]
pub struct MatrixConfig {
    pub rows: &'static [PinId],
    pub cols: &'static [PinId],
    pub orientation: DiodeOrientation,
    /// How long a new switch level must hold before it is reported.
    pub debounce: Duration,
    /// Wait between driving a strobe line and sampling the sense lines.
    pub settle_time: Duration,
}

impl MatrixConfig {
    pub const fn new(
        rows: &'static [PinId],
        cols: &'static [PinId],
        orientation: DiodeOrientation,
    ) -> Self {
        Self {
            rows,
            cols,
            orientation,
            debounce: DEFAULT_DEBOUNCE,
            settle_time: DEFAULT_SETTLE_TIME,
        }
    }

    pub const fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub const fn with_settle_time(mut self, settle_time: Duration) -> Self {
        self.settle_time = settle_time;
        self
    }

    pub const fn key_count(&self) -> usize {
        self.rows.len() * self.cols.len()
    }

    /// Number of sense lines the scanner samples.
    pub const fn input_count(&self) -> usize {
        if self.orientation.columns_driven() {
            self.rows.len()
        } else {
            self.cols.len()
        }
    }

    /// Number of strobe lines the scanner drives.
    pub const fn output_count(&self) -> usize {
        if self.orientation.columns_driven() {
            self.cols.len()
        } else {
            self.rows.len()
        }
    }

    pub const fn decoder(&self) -> Decoder {
        Decoder::new(self.rows.len(), self.cols.len(), self.orientation)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct KeyboardConfig {
    pub matrix: MatrixConfig,
    pub keymap: &'static [Layer],
    pub macros: &'static [Macro],
    pub led: Option<LedConfig>,
    pub display: Option<DisplayConfig>,
    pub tick_period: Duration,
}

impl KeyboardConfig {
    pub const fn new(
        matrix: MatrixConfig,
        keymap: &'static [Layer],
        macros: &'static [Macro],
    ) -> Self {
        Self {
            matrix,
            keymap,
            macros,
            led: None,
            display: None,
            tick_period: DEFAULT_TICK_PERIOD,
        }
    }

    pub const fn with_led(mut self, led: LedConfig) -> Self {
        self.led = Some(led);
        self
    }

    pub const fn with_display(mut self, display: DisplayConfig) -> Self {
        self.display = Some(display);
        self
    }

    pub const fn with_tick_period(mut self, tick_period: Duration) -> Self {
        self.tick_period = tick_period;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let key_count = self.matrix.key_count();
        if key_count == 0 {
            return Err(ConfigError::EmptyMatrix);
        }
        if key_count > MAX_KEYS {
            return Err(ConfigError::TooManyKeys(key_count));
        }
        self.check_pins()?;

        if self.keymap.is_empty() {
            return Err(ConfigError::NoLayers);
        }
        if self.keymap.len() > MAX_LAYERS {
            return Err(ConfigError::TooManyLayers(self.keymap.len()));
        }
        if self.macros.len() > MAX_MACROS {
            return Err(ConfigError::TooManyMacros(self.macros.len()));
        }

        for (layer, actions) in self.keymap.iter().enumerate() {
            if actions.len() != key_count {
                return Err(ConfigError::LayerSizeMismatch {
                    layer,
                    expected: key_count,
                    found: actions.len(),
                });
            }
            for (index, action) in actions.iter().enumerate() {
                match *action {
                    Action::Macro(id) if id as usize >= self.macros.len() => {
                        return Err(ConfigError::UnknownMacro { layer, index, id });
                    }
                    Action::LayerShift(target) if target as usize >= self.keymap.len() => {
                        return Err(ConfigError::UnknownLayer {
                            layer,
                            index,
                            target,
                        });
                    }
                    _ => {}
                }
            }
        }

        for (id, mac) in self.macros.iter().enumerate() {
            check_macro(id as u8, mac)?;
        }

        Ok(())
    }

    fn check_pins(&self) -> Result<(), ConfigError> {
        let extra = [
            self.led.map(|l| l.pin),
            self.display.map(|d| d.sda),
            self.display.map(|d| d.scl),
        ];
        let pins = self
            .matrix
            .rows
            .iter()
            .chain(self.matrix.cols.iter())
            .copied()
            .chain(extra.into_iter().flatten());

        for (i, pin) in pins.clone().enumerate() {
            if pins.clone().skip(i + 1).any(|other| other == pin) {
                return Err(ConfigError::PinConflict(pin));
            }
        }
        Ok(())
    }
}

fn check_macro(id: u8, mac: &Macro) -> Result<(), ConfigError> {
    let mut held: Vec<u8, MAX_MACRO_HELD> = Vec::new();
    for step in mac.steps {
        match *step {
            MacroStep::Press(key) => {
                if !held.contains(&key) && held.push(key).is_err() {
                    return Err(ConfigError::MacroHoldsTooMany(id));
                }
            }
            MacroStep::Release(key) => held.retain(|k| *k != key),
            MacroStep::Delay(_) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod test;
