use embassy_time::{Duration, Instant, Timer};
use embedded_hal::digital::{InputPin, OutputPin};

use crate::{
    config::MatrixConfig,
    matrix::{Decoder, KeyPosition},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyEventKind {
    Pressed,
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyEvent {
    pub position: KeyPosition,
    pub kind: KeyEventKind,
    /// When the transition was accepted.
    pub at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyState {
    Idle,
    PressPending,
    Pressed,
    ReleasePending,
}

/// Debounce state of one switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SwitchState {
    pub state: KeyState,
    /// Time of the last state transition.
    pub since: Instant,
}

impl Default for SwitchState {
    fn default() -> Self {
        Self {
            state: KeyState::Idle,
            since: Instant::from_ticks(0),
        }
    }
}

impl SwitchState {
    /// Feed one sample. A level change is accepted once it has held for `window`.
    pub fn debounce(
        &mut self,
        is_down: bool,
        now: Instant,
        window: Duration,
    ) -> Option<KeyEventKind> {
        let settled = now.saturating_duration_since(self.since) >= window;
        let (next, event) = match (self.state, is_down) {
            (KeyState::Idle, true) => (KeyState::PressPending, None),
            (KeyState::PressPending, true) if settled => {
                (KeyState::Pressed, Some(KeyEventKind::Pressed))
            }
            (KeyState::PressPending, false) => (KeyState::Idle, None),
            (KeyState::Pressed, false) => (KeyState::ReleasePending, None),
            (KeyState::ReleasePending, true) => (KeyState::Pressed, None),
            (KeyState::ReleasePending, false) if settled => {
                (KeyState::Idle, Some(KeyEventKind::Released))
            }
            (state, _) => (state, None),
        };
        if next != self.state {
            self.state = next;
            self.since = now;
        }
        event
    }
}

/// Strobes one set of matrix lines active high and samples the other set.
pub struct KeyScanner<I: InputPin, O: OutputPin, const INPUT_N: usize, const OUTPUT_N: usize> {
    input_pins: [I; INPUT_N],
    output_pins: [O; OUTPUT_N],
    decoder: Decoder,

    state: [[SwitchState; INPUT_N]; OUTPUT_N],

    debounce: Duration,
    settle_time: Duration,

    /// How long the last full sweep took.
    last_sweep: Duration,
}

impl<I: InputPin, O: OutputPin, const INPUT_N: usize, const OUTPUT_N: usize>
    KeyScanner<I, O, INPUT_N, OUTPUT_N>
{
    pub fn new(
        input_pins: [I; INPUT_N],
        mut output_pins: [O; OUTPUT_N],
        matrix: &MatrixConfig,
    ) -> Self {
        for out in output_pins.iter_mut() {
            let _ = out.set_low();
        }
        Self {
            input_pins,
            output_pins,
            decoder: matrix.decoder(),
            state: [[SwitchState::default(); INPUT_N]; OUTPUT_N],
            debounce: matrix.debounce,
            settle_time: matrix.settle_time,
            last_sweep: Duration::from_ticks(0),
        }
    }

    pub fn last_sweep(&self) -> Duration {
        self.last_sweep
    }

    pub fn state(&self, position: KeyPosition) -> Option<KeyState> {
        let (input, output) = if self.decoder.orientation().columns_driven() {
            (position.row as usize, position.col as usize)
        } else {
            (position.col as usize, position.row as usize)
        };
        self.state
            .get(output)
            .and_then(|s| s.get(input))
            .map(|s| s.state)
    }

    /// Sweep every strobe line once and pass each accepted transition to `emit`.
    pub async fn scan(&mut self, mut emit: impl FnMut(KeyEvent)) {
        let started = Instant::now();

        for (output_idx, (op, s)) in self
            .output_pins
            .iter_mut()
            .zip(self.state.iter_mut())
            .enumerate()
        {
            let _ = op.set_high();
            if self.settle_time > Duration::from_ticks(0) {
                Timer::after(self.settle_time).await;
            }
            let now = Instant::now();

            for (input_idx, (ip, s)) in self.input_pins.iter_mut().zip(s.iter_mut()).enumerate() {
                // a failed read counts as an open switch
                let is_down = ip.is_high().unwrap_or(false);
                if let Some(kind) = s.debounce(is_down, now, self.debounce) {
                    emit(KeyEvent {
                        position: self.decoder.position_of(input_idx, output_idx),
                        kind,
                        at: now,
                    });
                }
            }

            let _ = op.set_low();
        }

        self.last_sweep = Instant::now().saturating_duration_since(started);
    }
}

#[cfg(test)]
#[path = "key_scanner_test.rs"]
mod test;
