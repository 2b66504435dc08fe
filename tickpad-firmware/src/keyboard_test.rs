extern crate std;

use core::cell::{Cell, RefCell};
use embassy_futures::block_on;
use std::vec::Vec;
use tickpad_common::keycodes::{kc, modifiers};

use super::*;

use crate::{
    config::MatrixConfig,
    key_reporter::KeyboardReport,
    keymap::Layer,
    macro_engine::{Macro, MacroState, MacroStep},
    matrix::{DiodeOrientation, KeyPosition, PinId},
    switch_test_stub::{KeyMatrix, Pin},
    time_driver_test_stub::{advance_time, set_time},
};

const ROWS: &[PinId] = &[PinId(7), PinId(8), PinId(9)];
const COLS: &[PinId] = &[PinId(0), PinId(1), PinId(2)];
const MATRIX: MatrixConfig = MatrixConfig::new(ROWS, COLS, DiodeOrientation::ColumnToRow);

const SAVE: &[MacroStep] = &[
    MacroStep::Press(kc::LEFT_SHIFT),
    MacroStep::Press(kc::SEMICOLON),
    MacroStep::Release(kc::SEMICOLON),
    MacroStep::Release(kc::LEFT_SHIFT),
    MacroStep::Press(kc::W),
    MacroStep::Release(kc::W),
    MacroStep::Press(kc::ENTER),
    MacroStep::Release(kc::ENTER),
];
const QUIT: &[MacroStep] = &[
    MacroStep::Press(kc::LEFT_SHIFT),
    MacroStep::Press(kc::SEMICOLON),
    MacroStep::Release(kc::SEMICOLON),
    MacroStep::Release(kc::LEFT_SHIFT),
    MacroStep::Press(kc::W),
    MacroStep::Release(kc::W),
    MacroStep::Press(kc::Q),
    MacroStep::Release(kc::Q),
    MacroStep::Press(kc::ENTER),
    MacroStep::Release(kc::ENTER),
];
const MACROS: &[Macro] = &[
    Macro::labelled(":w<Enter>", SAVE),
    Macro::labelled(":wq<Enter>", QUIT),
];

const PAD: Layer = &[
    Action::Key(kc::N1),
    Action::Key(kc::N2),
    Action::Key(kc::N3),
    Action::Key(kc::N4),
    Action::Key(kc::N5),
    Action::Key(kc::N6),
    Action::Macro(0),
    Action::Key(kc::N0),
    Action::Macro(1),
];
static MACROPAD: KeyboardConfig = KeyboardConfig::new(MATRIX, &[PAD], MACROS);

const DIGITS: Layer = &[
    Action::Key(kc::N1),
    Action::Key(kc::N2),
    Action::Key(kc::N3),
    Action::Key(kc::N4),
    Action::Key(kc::N5),
    Action::Key(kc::N6),
    Action::Key(kc::N7),
    Action::Key(kc::N8),
    Action::Key(kc::N9),
];
static NUMPAD: KeyboardConfig = KeyboardConfig::new(MATRIX, &[DIGITS], &[]);

const SHIFTED: Layer = &[
    Action::Modified {
        key: kc::N1,
        modifiers: modifiers::LEFT_SHIFT,
    },
    Action::LayerShift(1),
    Action::NoOp,
    Action::NoOp,
    Action::NoOp,
    Action::NoOp,
    Action::NoOp,
    Action::NoOp,
    Action::NoOp,
];
const UPPER: Layer = &[
    Action::Key(kc::A),
    Action::Transparent,
    Action::NoOp,
    Action::NoOp,
    Action::NoOp,
    Action::NoOp,
    Action::NoOp,
    Action::NoOp,
    Action::NoOp,
];
static LAYERED: KeyboardConfig = KeyboardConfig::new(MATRIX, &[SHIFTED, UPPER], &[]);

const SHIFT_AND_MODIFIED: Layer = &[
    Action::Modified {
        key: kc::N1,
        modifiers: modifiers::LEFT_SHIFT,
    },
    Action::Key(kc::LEFT_SHIFT),
    Action::NoOp,
    Action::NoOp,
    Action::NoOp,
    Action::NoOp,
    Action::NoOp,
    Action::NoOp,
    Action::NoOp,
];
static SHIFT_PAD: KeyboardConfig = KeyboardConfig::new(MATRIX, &[SHIFT_AND_MODIFIED], &[]);

const SIX_AND_MODIFIED: Layer = &[
    Action::Key(kc::N1),
    Action::Key(kc::N2),
    Action::Key(kc::N3),
    Action::Key(kc::N4),
    Action::Key(kc::N5),
    Action::Key(kc::N6),
    Action::NoOp,
    Action::NoOp,
    Action::Modified {
        key: kc::N9,
        modifiers: modifiers::LEFT_CTRL,
    },
];
static FULL_PAD: KeyboardConfig = KeyboardConfig::new(MATRIX, &[SIX_AND_MODIFIED], &[]);

static NO_LAYERS: KeyboardConfig = KeyboardConfig::new(MATRIX, &[], &[]);

#[derive(Default)]
struct Transport {
    reports: RefCell<Vec<KeyboardReport>>,
    fail: Cell<Option<TransportError>>,
}
impl Transport {
    fn take(&self) -> Vec<(u8, [u8; 6])> {
        self.reports
            .borrow_mut()
            .drain(..)
            .map(|r| (r.modifiers, r.keys))
            .collect()
    }
}
impl ReportTransport for Transport {
    fn try_send_report(&self, report: &KeyboardReport) -> Result<(), TransportError> {
        if let Some(err) = self.fail.get() {
            return Err(err);
        }
        self.reports.borrow_mut().push(*report);
        Ok(())
    }
}

#[derive(Default)]
struct Watch {
    events: Vec<ResolvedEvent>,
    ticks: usize,
}
impl StatusObserver for Watch {
    fn on_event(&mut self, event: &ResolvedEvent) {
        self.events.push(*event);
    }

    fn tick(&mut self, _now: Instant) {
        self.ticks += 1;
    }
}

type Pad<'a> = Keyboard<'a, Pin, Pin, Transport, 3, 3>;

fn pins(first: u8) -> [Pin; 3] {
    [Pin::new(first), Pin::new(first + 1), Pin::new(first + 2)]
}

/// Rows are the sense lines and columns the strobe lines.
fn wire() -> ([Pin; 3], [Pin; 3], KeyMatrix) {
    let inputs = pins(7);
    let outputs = pins(0);
    let km = KeyMatrix::new(Vec::from(&inputs), Vec::from(&outputs));
    set_time(1_000_000);
    (inputs, outputs, km)
}

async fn ticks(kb: &mut Pad<'_>, n: usize) {
    for _ in 0..n {
        kb.tick().await;
        advance_time(1000);
    }
}

fn keys(list: &[u8]) -> [u8; 6] {
    let mut keys = [0; 6];
    keys[..list.len()].copy_from_slice(list);
    keys
}

#[test]
fn save_macro_end_to_end() {
    block_on(async {
        let (inputs, outputs, km) = wire();
        let transport = Transport::default();
        let mut watch = Watch::default();
        {
            let mut kb = Pad::new(&MACROPAD, inputs, outputs, &transport).unwrap();
            assert!(kb.attach(&mut watch));

            km.down(2, 0);
            ticks(&mut kb, 5).await;
            assert!(transport.take().is_empty());

            ticks(&mut kb, 1).await;
            km.up(2, 0);
            ticks(&mut kb, 20).await;
            assert!(kb.macros().is_idle());
            assert!(kb.sink().report().is_empty());
        }

        let shift = modifiers::LEFT_SHIFT;
        assert_eq!(
            transport.take(),
            [
                (shift, keys(&[])),
                (shift, keys(&[kc::SEMICOLON])),
                (shift, keys(&[])),
                (0, keys(&[])),
                (0, keys(&[kc::W])),
                (0, keys(&[])),
                (0, keys(&[kc::ENTER])),
                (0, keys(&[])),
            ]
        );

        assert_eq!(watch.ticks, 26);
        assert_eq!(watch.events.len(), 2);
        let press = watch.events[0];
        assert_eq!(press.position, KeyPosition::new(2, 0));
        assert_eq!(press.kind, KeyEventKind::Pressed);
        assert_eq!(press.action, Action::Macro(0));
        assert_eq!(press.label, Some(":w<Enter>"));
        let release = watch.events[1];
        assert_eq!(release.kind, KeyEventKind::Released);
        assert_eq!(release.label, None);
    });
}

#[test]
fn key_press_and_release() {
    block_on(async {
        let (inputs, outputs, km) = wire();
        let transport = Transport::default();
        let mut kb = Pad::new(&MACROPAD, inputs, outputs, &transport).unwrap();

        km.down(2, 1);
        ticks(&mut kb, 10).await;
        km.up(2, 1);
        ticks(&mut kb, 10).await;

        assert_eq!(
            transport.take(),
            [(0, keys(&[kc::N0])), (0, keys(&[]))]
        );
    });
}

#[test]
fn seventh_key_dropped() {
    block_on(async {
        let (inputs, outputs, km) = wire();
        let transport = Transport::default();
        let mut kb = Pad::new(&NUMPAD, inputs, outputs, &transport).unwrap();

        for (row, col) in [(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2), (2, 0)] {
            km.down(row, col);
        }
        ticks(&mut kb, 10).await;
        assert_eq!(
            transport.take(),
            [(
                0,
                [kc::N1, kc::N4, kc::N7, kc::N2, kc::N5, kc::N3]
            )]
        );

        // the dropped key was never in the report
        km.up(1, 2);
        ticks(&mut kb, 10).await;
        assert!(transport.take().is_empty());
    });
}

#[test]
fn modified_key_and_layer_shift() {
    block_on(async {
        let (inputs, outputs, km) = wire();
        let transport = Transport::default();
        let mut kb = Pad::new(&LAYERED, inputs, outputs, &transport).unwrap();

        km.down(0, 0);
        ticks(&mut kb, 10).await;
        km.up(0, 0);
        ticks(&mut kb, 10).await;
        assert_eq!(
            transport.take(),
            [(modifiers::LEFT_SHIFT, keys(&[kc::N1])), (0, keys(&[]))]
        );

        km.down(0, 1);
        ticks(&mut kb, 10).await;
        assert_eq!(kb.resolver().active_layer(), 1);
        km.down(0, 0);
        ticks(&mut kb, 10).await;
        km.up(0, 1);
        ticks(&mut kb, 10).await;
        assert_eq!(kb.resolver().active_layer(), 0);
        km.up(0, 0);
        ticks(&mut kb, 10).await;
        assert_eq!(transport.take(), [(0, keys(&[kc::A])), (0, keys(&[]))]);
    });
}

#[test]
fn backpressure_retries() {
    block_on(async {
        let (inputs, outputs, km) = wire();
        let transport = Transport::default();
        let mut kb = Pad::new(&MACROPAD, inputs, outputs, &transport).unwrap();

        transport.fail.set(Some(TransportError::Backpressure));
        km.down(0, 0);
        ticks(&mut kb, 10).await;
        assert!(transport.take().is_empty());
        assert!(kb.sink().is_dirty());

        transport.fail.set(None);
        ticks(&mut kb, 1).await;
        assert_eq!(transport.take(), [(0, keys(&[kc::N1]))]);
    });
}

#[test]
fn macro_waits_for_backpressure() {
    block_on(async {
        let (inputs, outputs, km) = wire();
        let transport = Transport::default();
        let mut kb = Pad::new(&MACROPAD, inputs, outputs, &transport).unwrap();

        transport.fail.set(Some(TransportError::Backpressure));
        km.down(2, 0);
        ticks(&mut kb, 10).await;
        assert!(transport.take().is_empty());
        assert_eq!(kb.macros().state(0), MacroState::Expanding(1));

        transport.fail.set(None);
        ticks(&mut kb, 20).await;
        assert!(kb.macros().is_idle());

        let shift = modifiers::LEFT_SHIFT;
        assert_eq!(
            transport.take(),
            [
                (shift, keys(&[])),
                (shift, keys(&[kc::SEMICOLON])),
                (shift, keys(&[])),
                (0, keys(&[])),
                (0, keys(&[kc::W])),
                (0, keys(&[])),
                (0, keys(&[kc::ENTER])),
                (0, keys(&[])),
            ]
        );
    });
}

#[test]
fn held_shift_outlives_modified_key() {
    block_on(async {
        let (inputs, outputs, km) = wire();
        let transport = Transport::default();
        let mut kb = Pad::new(&SHIFT_PAD, inputs, outputs, &transport).unwrap();

        let shift = modifiers::LEFT_SHIFT;
        km.down(0, 1);
        ticks(&mut kb, 10).await;
        km.down(0, 0);
        ticks(&mut kb, 10).await;
        km.up(0, 0);
        ticks(&mut kb, 10).await;
        assert_eq!(kb.sink().report().modifiers, shift);
        km.up(0, 1);
        ticks(&mut kb, 10).await;

        assert_eq!(
            transport.take(),
            [
                (shift, keys(&[])),
                (shift, keys(&[kc::N1])),
                (shift, keys(&[])),
                (0, keys(&[])),
            ]
        );
    });
}

#[test]
fn dropped_modified_key_leaves_modifiers_alone() {
    block_on(async {
        let (inputs, outputs, km) = wire();
        let transport = Transport::default();
        let mut kb = Pad::new(&FULL_PAD, inputs, outputs, &transport).unwrap();

        for (row, col) in [(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2), (2, 2)] {
            km.down(row, col);
        }
        ticks(&mut kb, 10).await;
        assert_eq!(
            transport.take(),
            [(0, [kc::N1, kc::N4, kc::N2, kc::N5, kc::N3, kc::N6])]
        );

        km.up(2, 2);
        ticks(&mut kb, 10).await;
        assert!(transport.take().is_empty());
        assert_eq!(kb.sink().report().modifiers, 0);
    });
}

#[test]
fn disconnect_clears_state() {
    block_on(async {
        let (inputs, outputs, km) = wire();
        let transport = Transport::default();
        let mut kb = Pad::new(&MACROPAD, inputs, outputs, &transport).unwrap();

        transport.fail.set(Some(TransportError::Disconnected));
        km.down(0, 0);
        km.down(2, 2);
        ticks(&mut kb, 10).await;
        assert!(kb.sink().report().is_empty());
        assert!(kb.macros().is_idle());

        transport.fail.set(None);
        ticks(&mut kb, 1).await;
        assert_eq!(transport.take(), [(0, keys(&[]))]);
        ticks(&mut kb, 20).await;
        assert!(transport.take().is_empty());
    });
}

#[test]
fn observer_slots() {
    let (inputs, outputs, _km) = wire();
    let transport = Transport::default();
    let mut a = Watch::default();
    let mut b = Watch::default();
    let mut c = Watch::default();
    let mut kb = Pad::new(&MACROPAD, inputs, outputs, &transport).unwrap();
    assert!(kb.attach(&mut a));
    assert!(kb.attach(&mut b));
    assert!(!kb.attach(&mut c));
}

#[test]
fn config_errors() {
    let transport = Transport::default();

    let (inputs, outputs, _km) = wire();
    assert_eq!(
        Pad::new(&NO_LAYERS, inputs, outputs, &transport).err(),
        Some(ConfigError::NoLayers)
    );

    let inputs = [Pin::new(7), Pin::new(8)];
    assert_eq!(
        Keyboard::<_, _, _, 2, 3>::new(&MACROPAD, inputs, pins(0), &transport).err(),
        Some(ConfigError::PinCountMismatch {
            inputs: 2,
            outputs: 3
        })
    );
}
