extern crate std;

use embassy_futures::block_on;
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use std::vec;
use tickpad_common::keycodes::{kc, modifiers};

use crate::{hid::HidWriter, usb_test_stub::{MyDriver, MyEndpointIn}};

use super::*;

type TestChannel = ReportChannel<NoopRawMutex, 2>;

fn connected() -> TestChannel {
    let channel = TestChannel::new();
    channel.set_connected(true);
    channel
}

#[test]
fn report_bytes() {
    let report = KeyboardReport {
        modifiers: modifiers::LEFT_SHIFT,
        keys: [kc::SEMICOLON, 0, 0, 0, 0, 0],
    };
    assert_eq!(report.as_bytes(), [2, 0, 0x33, 0, 0, 0, 0, 0]);
    assert!(report.contains(kc::SEMICOLON));
    assert!(!report.contains(0));
    assert!(!report.is_empty());
    assert!(KeyboardReport::default().is_empty());
}

#[test]
fn press_and_release() {
    let mut sink = ReportSink::new();
    assert!(!sink.is_dirty());

    assert!(sink.press(kc::A));
    assert!(sink.press(kc::LEFT_SHIFT));
    assert!(!sink.press(kc::A));
    assert_eq!(sink.report().modifiers, modifiers::LEFT_SHIFT);
    assert_eq!(sink.report().keys, [kc::A, 0, 0, 0, 0, 0]);
    assert!(sink.is_dirty());

    assert!(sink.press(kc::B));
    assert!(sink.release(kc::A));
    // freed slot is reused
    assert!(sink.press(kc::C));
    assert_eq!(sink.report().keys, [kc::C, kc::B, 0, 0, 0, 0]);

    assert!(sink.release(kc::LEFT_SHIFT));
    assert!(!sink.release(kc::LEFT_SHIFT));
    assert_eq!(sink.report().modifiers, 0);
}

#[test]
fn modifier_mask() {
    let mut sink = ReportSink::new();
    let mask = modifiers::LEFT_CTRL | modifiers::LEFT_SHIFT;
    assert!(sink.apply_modifiers(mask, KeyEventKind::Pressed));
    assert_eq!(sink.report().modifiers, 3);
    assert!(sink.apply_modifiers(modifiers::LEFT_CTRL, KeyEventKind::Released));
    assert_eq!(sink.report().modifiers, modifiers::LEFT_SHIFT);
}

#[test]
fn modifier_held_until_last_release() {
    let mut sink = ReportSink::new();
    assert!(sink.press(kc::LEFT_SHIFT));
    assert!(!sink.apply_modifiers(modifiers::LEFT_SHIFT, KeyEventKind::Pressed));
    assert!(sink.is_held(kc::LEFT_SHIFT));

    assert!(!sink.apply_modifiers(modifiers::LEFT_SHIFT, KeyEventKind::Released));
    assert_eq!(sink.report().modifiers, modifiers::LEFT_SHIFT);
    assert!(sink.release(kc::LEFT_SHIFT));
    assert!(!sink.is_held(kc::LEFT_SHIFT));

    // an unmatched release does not borrow from the next press
    assert!(!sink.release(kc::LEFT_SHIFT));
    assert!(sink.press(kc::LEFT_SHIFT));
    assert!(!sink.press(kc::LEFT_SHIFT));

    sink.clear();
    assert!(sink.press(kc::LEFT_SHIFT));
    assert!(sink.release(kc::LEFT_SHIFT));
}

#[test]
fn seventh_key_dropped() {
    let mut sink = ReportSink::new();
    let held = [kc::N1, kc::N2, kc::N3, kc::N4, kc::N5, kc::N6];
    for k in held {
        assert!(sink.apply(k, KeyEventKind::Pressed));
    }
    assert!(!sink.apply(kc::N7, KeyEventKind::Pressed));
    assert_eq!(sink.report().keys, held);

    // releasing the dropped key changes nothing
    assert!(sink.flush(&connected()).unwrap());
    assert!(!sink.apply(kc::N7, KeyEventKind::Released));
    assert!(!sink.is_dirty());
    assert_eq!(sink.report().keys, held);
}

#[test]
fn flush_only_when_changed() {
    let channel = connected();
    let mut sink = ReportSink::new();

    assert_eq!(sink.flush(&channel), Ok(false));
    sink.press(kc::A);
    assert_eq!(sink.flush(&channel), Ok(true));
    assert_eq!(sink.flush(&channel), Ok(false));
    sink.release(kc::A);
    assert_eq!(sink.flush(&channel), Ok(true));

    assert_eq!(channel.try_receive().map(|r| r.keys[0]), Some(kc::A));
    assert_eq!(channel.try_receive(), Some(KeyboardReport::EMPTY));
    assert_eq!(channel.try_receive(), None);
}

#[test]
fn backpressure_keeps_report_pending() {
    let channel = connected();
    let mut sink = ReportSink::new();

    sink.press(kc::A);
    sink.flush(&channel).unwrap();
    sink.press(kc::B);
    sink.flush(&channel).unwrap();
    sink.press(kc::C);
    assert_eq!(sink.flush(&channel), Err(TransportError::Backpressure));
    assert!(sink.is_dirty());

    channel.try_receive();
    assert_eq!(sink.flush(&channel), Ok(true));
    channel.try_receive();
    assert_eq!(
        channel.try_receive().map(|r| r.keys),
        Some([kc::A, kc::B, kc::C, 0, 0, 0])
    );
}

#[test]
fn clear_sends_empty_report() {
    let mut sink = ReportSink::new();
    sink.clear();
    assert!(!sink.is_dirty());

    sink.press(kc::A);
    sink.press(kc::LEFT_ALT);
    sink.flush(&connected()).unwrap();
    sink.clear();
    assert!(sink.is_dirty());
    assert!(sink.report().is_empty());
}

#[test]
fn disconnected_channel() {
    let channel = TestChannel::new();
    let mut sink = ReportSink::new();
    sink.press(kc::A);
    assert_eq!(sink.flush(&channel), Err(TransportError::Disconnected));
    assert!(sink.is_dirty());

    channel.set_connected(true);
    assert_eq!(sink.flush(&channel), Ok(true));
    channel.set_connected(false);
    assert_eq!(channel.try_receive(), None);
}

#[test]
fn reporter_writes_report() {
    block_on(async {
        let ep_in = MyEndpointIn::default();
        let messages = ep_in.messages.clone();
        let channel = connected();
        let mut reporter = Reporter::new(HidWriter::<'_, MyDriver, REPORT_SIZE>::new(ep_in), &channel);

        let report = KeyboardReport {
            modifiers: modifiers::LEFT_SHIFT,
            keys: [kc::W, 0, 0, 0, 0, 0],
        };
        reporter.write(&report).await.unwrap();
        reporter.write(&KeyboardReport::EMPTY).await.unwrap();

        let guard = messages.lock().unwrap();
        assert_eq!(guard.len(), 2);
        assert_eq!(&guard[0], &vec![2, 0, 0x1a, 0, 0, 0, 0, 0]);
        assert_eq!(&guard[1], &vec![0; 8]);
    });
}

#[test]
fn reporter_disabled_endpoint() {
    block_on(async {
        let ep_in = MyEndpointIn::default();
        let disabled = ep_in.disabled.clone();
        let channel = connected();
        let mut reporter = Reporter::new(HidWriter::<'_, MyDriver, REPORT_SIZE>::new(ep_in), &channel);

        disabled.set(true);
        assert_eq!(
            reporter.write(&KeyboardReport::EMPTY).await,
            Err(EndpointError::Disabled)
        );
        assert!(!channel.is_connected());
    });
}
