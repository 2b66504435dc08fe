//! The composition root: one cooperative tick loop that owns every stage.

use embassy_time::{Instant, Ticker};
use embedded_hal::digital::{InputPin, OutputPin};
use heapless::Vec;
use tickpad_common::keycodes::key_range;

use crate::{
    config::{ConfigError, KeyboardConfig, MAX_KEYS, MAX_OBSERVERS},
    key_reporter::{ReportSink, ReportTransport, TransportError},
    key_scanner::{KeyEvent, KeyEventKind, KeyScanner},
    keymap::{Action, Resolved, Resolver},
    macro_engine::MacroEngine,
    status::{ResolvedEvent, StatusObserver},
};

pub struct Keyboard<
    'a,
    I: InputPin,
    O: OutputPin,
    T: ReportTransport + ?Sized,
    const INPUT_N: usize,
    const OUTPUT_N: usize,
> {
    config: &'static KeyboardConfig,
    scanner: KeyScanner<I, O, INPUT_N, OUTPUT_N>,
    resolver: Resolver,
    macros: MacroEngine,
    sink: ReportSink,
    /// The last flush was refused; the pending report goes out before macros step again.
    backlog: bool,
    /// Keys whose `Modified` press took modifier holds.
    modified: [bool; MAX_KEYS],
    transport: &'a T,
    observers: Vec<&'a mut dyn StatusObserver, MAX_OBSERVERS>,
}

impl<
        'a,
        I: InputPin,
        O: OutputPin,
        T: ReportTransport + ?Sized,
        const INPUT_N: usize,
        const OUTPUT_N: usize,
    > Keyboard<'a, I, O, T, INPUT_N, OUTPUT_N>
{
    /// Validate `config` and take ownership of the matrix lines. `inputs` are the sense lines and
    /// `outputs` the strobe lines for the configured diode orientation.
    pub fn new(
        config: &'static KeyboardConfig,
        inputs: [I; INPUT_N],
        outputs: [O; OUTPUT_N],
        transport: &'a T,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let matrix = &config.matrix;
        if INPUT_N != matrix.input_count() || OUTPUT_N != matrix.output_count() {
            return Err(ConfigError::PinCountMismatch {
                inputs: INPUT_N,
                outputs: OUTPUT_N,
            });
        }

        Ok(Self {
            config,
            scanner: KeyScanner::new(inputs, outputs, matrix),
            resolver: Resolver::new(config.keymap, matrix.decoder()),
            macros: MacroEngine::new(config.macros),
            sink: ReportSink::new(),
            backlog: false,
            modified: [false; MAX_KEYS],
            transport,
            observers: Vec::new(),
        })
    }

    /// Add a status peripheral. Returns false when no slot is free.
    pub fn attach(&mut self, observer: &'a mut dyn StatusObserver) -> bool {
        if self.observers.push(observer).is_err() {
            crate::warn!("no room for another status observer");
            return false;
        }
        true
    }

    pub fn sink(&self) -> &ReportSink {
        &self.sink
    }

    pub fn macros(&self) -> &MacroEngine {
        &self.macros
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub async fn run(&mut self) -> ! {
        crate::info!("keyboard running");
        let period = self.config.tick_period;
        let mut ticker = Ticker::every(period);
        loop {
            self.tick().await;
            let sweep = self.scanner.last_sweep();
            if sweep > period {
                crate::warn!("tick overrun; sweep took {}us", sweep.as_micros());
            }
            ticker.next().await;
        }
    }

    /// Scan, resolve, expand macros, flush the report, then update the status peripherals.
    pub async fn tick(&mut self) {
        let mut edges: Vec<KeyEvent, MAX_KEYS> = Vec::new();
        self.scanner
            .scan(|event| {
                // each key changes at most once per sweep
                let _ = edges.push(event);
            })
            .await;

        let mut resolved: Vec<ResolvedEvent, MAX_KEYS> = Vec::new();
        for edge in edges.iter() {
            let Some(r) = self.resolver.resolve(edge) else {
                continue;
            };
            let label = self.dispatch(&r);
            let _ = resolved.push(ResolvedEvent {
                position: edge.position,
                kind: r.kind,
                action: r.action,
                label,
                at: edge.at,
            });
        }

        let now = Instant::now();
        if !self.backlog {
            self.macros.advance(now, &mut self.sink);
        }

        match self.sink.flush(self.transport) {
            Ok(_) => self.backlog = false,
            Err(TransportError::Backpressure) => {
                crate::debug!("report queue full; retry next tick");
                self.backlog = true;
            }
            Err(TransportError::Disconnected) => {
                self.sink.clear();
                self.macros.clear();
                self.modified = [false; MAX_KEYS];
                self.backlog = false;
            }
        }

        for observer in self.observers.iter_mut() {
            for event in resolved.iter() {
                observer.on_event(event);
            }
            observer.tick(now);
        }
    }

    /// Apply a resolved edge to the report. Returns the label of a macro it started.
    fn dispatch(&mut self, resolved: &Resolved) -> Option<&'static str> {
        let kind = resolved.kind;
        match resolved.action {
            Action::Key(key) => {
                self.sink.apply(key, kind);
            }
            Action::Modified { key, modifiers } => match kind {
                KeyEventKind::Pressed => {
                    self.sink.press(key);
                    // a dropped key takes no modifiers
                    if key == key_range::NONE || self.sink.is_held(key) {
                        self.sink.apply_modifiers(modifiers, kind);
                        self.modified[resolved.index] = true;
                    }
                }
                KeyEventKind::Released => {
                    self.sink.release(key);
                    if core::mem::take(&mut self.modified[resolved.index]) {
                        self.sink.apply_modifiers(modifiers, kind);
                    }
                }
            },
            Action::Macro(id) if kind == KeyEventKind::Pressed => {
                if self.macros.trigger(id, &mut self.sink) {
                    return self.macros.get(id).and_then(|m| m.label);
                }
            }
            Action::Macro(_) | Action::LayerShift(_) | Action::NoOp | Action::Transparent => {}
        }
        None
    }
}

#[cfg(test)]
#[path = "keyboard_test.rs"]
mod test;
