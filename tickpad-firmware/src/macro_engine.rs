use embassy_time::{Duration, Instant};
use heapless::Vec;
use tickpad_common::keycodes;

use crate::{
    config::{MAX_MACRO_HELD, MAX_RUNNING_MACROS},
    key_reporter::ReportSink,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MacroStep {
    Press(u8),
    Release(u8),
    /// Suspend only this invocation.
    Delay(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Macro {
    /// Shown on the display status line when the macro fires.
    pub label: Option<&'static str>,
    pub steps: &'static [MacroStep],
}

impl Macro {
    pub const fn new(steps: &'static [MacroStep]) -> Self {
        Self { label: None, steps }
    }

    pub const fn labelled(label: &'static str, steps: &'static [MacroStep]) -> Self {
        Self {
            label: Some(label),
            steps,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MacroState {
    Idle,
    /// Index of the next step to apply.
    Expanding(usize),
}

struct MacroRun {
    id: u8,
    step: usize,
    resume_at: Option<Instant>,
    held: Vec<u8, MAX_MACRO_HELD>,
}

impl MacroRun {
    fn new(id: u8) -> Self {
        Self {
            id,
            step: 0,
            resume_at: None,
            held: Vec::new(),
        }
    }

    fn release_held(&mut self, sink: &mut ReportSink) {
        for key in self.held.iter() {
            sink.release(*key);
        }
        self.held.clear();
    }

    /// Track only keys this run put into the report, plus every modifier hold it took. A key
    /// someone else already holds is left alone.
    fn press(&mut self, key: u8, sink: &mut ReportSink) -> bool {
        if self.held.contains(&key) {
            return false;
        }
        if self.held.is_full() {
            crate::debug!("macro {} holds too many keys; {} dropped", self.id, key);
            return false;
        }
        let changed = sink.press(key);
        if changed || keycodes::is_modifier(key) {
            let _ = self.held.push(key);
        }
        changed
    }

    fn release(&mut self, key: u8, sink: &mut ReportSink) -> bool {
        let Some(i) = self.held.iter().position(|k| *k == key) else {
            return false;
        };
        self.held.swap_remove(i);
        sink.release(key)
    }

    /// Apply steps until one of them changes the report, a delay starts or the macro ends.
    /// Returns false once the macro has finished.
    fn advance(&mut self, mac: &Macro, now: Instant, sink: &mut ReportSink) -> bool {
        if let Some(at) = self.resume_at {
            if now < at {
                return true;
            }
            self.resume_at = None;
        }

        while let Some(step) = mac.steps.get(self.step) {
            self.step += 1;
            match *step {
                MacroStep::Press(key) => {
                    if self.press(key, sink) {
                        return true;
                    }
                }
                MacroStep::Release(key) => {
                    if self.release(key, sink) {
                        return true;
                    }
                }
                MacroStep::Delay(duration) => {
                    self.resume_at = Some(now.checked_add(duration).unwrap_or(Instant::MAX));
                    return true;
                }
            }
        }

        self.release_held(sink);
        false
    }
}

/// Expands macro invocations into sink presses and releases. Each invocation advances on its own
/// every tick.
pub struct MacroEngine {
    macros: &'static [Macro],
    running: Vec<MacroRun, MAX_RUNNING_MACROS>,
}

impl MacroEngine {
    pub fn new(macros: &'static [Macro]) -> Self {
        Self {
            macros,
            running: Vec::new(),
        }
    }

    pub fn get(&self, id: u8) -> Option<&'static Macro> {
        self.macros.get(id as usize)
    }

    /// Start macro `id` at its first step. A run of the same macro that is still expanding has its
    /// held keys released and starts over.
    pub fn trigger(&mut self, id: u8, sink: &mut ReportSink) -> bool {
        if self.get(id).is_none() {
            crate::warn!("unknown macro {}", id);
            return false;
        }

        if let Some(run) = self.running.iter_mut().find(|r| r.id == id) {
            crate::debug!("restart macro {}", id);
            run.release_held(sink);
            run.step = 0;
            run.resume_at = None;
            return true;
        }

        if self.running.push(MacroRun::new(id)).is_err() {
            crate::warn!("too many running macros; dropped {}", id);
            return false;
        }
        true
    }

    pub fn advance(&mut self, now: Instant, sink: &mut ReportSink) {
        let macros = self.macros;
        self.running.retain_mut(|run| match macros.get(run.id as usize) {
            Some(mac) => run.advance(mac, now, sink),
            None => false,
        });
    }

    pub fn state(&self, id: u8) -> MacroState {
        match self.running.iter().find(|r| r.id == id) {
            Some(run) => MacroState::Expanding(run.step),
            None => MacroState::Idle,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.running.is_empty()
    }

    /// Abandon every invocation without touching the sink.
    pub fn clear(&mut self) {
        self.running.clear();
    }
}

#[cfg(test)]
#[path = "macro_engine_test.rs"]
mod test;
