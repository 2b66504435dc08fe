use crate::hid::BOOT_KEYBOARD_REPORT_DESC;

use super::*;

fn control() -> Control {
    Control::new(InterfaceNumber(0), BOOT_KEYBOARD_REPORT_DESC)
}

fn request(bytes: [u8; 8]) -> Request {
    Request::parse(&bytes)
}

#[test]
fn report_descriptor() {
    let mut c = control();
    let mut buf = [0; 64];
    let req = request([0x81, 0x06, 0x00, 0x22, 0x00, 0x00, 0xff, 0x00]);
    match c.control_in(req, &mut buf) {
        Some(InResponse::Accepted(data)) => assert_eq!(data, BOOT_KEYBOARD_REPORT_DESC),
        _ => panic!("expected report descriptor"),
    }

    let req = request([0x81, 0x06, 0x00, 0x21, 0x00, 0x00, 0x09, 0x00]);
    match c.control_in(req, &mut buf) {
        Some(InResponse::Accepted(data)) => {
            assert_eq!(data.len(), 9);
            assert_eq!(data[7] as usize, BOOT_KEYBOARD_REPORT_DESC.len());
        }
        _ => panic!("expected hid descriptor"),
    }
}

#[test]
fn other_interface_is_ignored() {
    let mut c = control();
    let mut buf = [0; 64];
    let req = request([0x81, 0x06, 0x00, 0x22, 0x01, 0x00, 0xff, 0x00]);
    assert!(c.control_in(req, &mut buf).is_none());

    let req = request([0x21, 0x0a, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00]);
    assert!(c.control_out(req, &[]).is_none());
}

#[test]
fn idle_and_protocol() {
    let mut c = control();
    let mut buf = [0; 64];

    let set_idle = request([0x21, 0x0a, 0x00, 0x7d, 0x00, 0x00, 0x00, 0x00]);
    assert!(matches!(
        c.control_out(set_idle, &[]),
        Some(OutResponse::Accepted)
    ));
    let get_idle = request([0xa1, 0x02, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00]);
    match c.control_in(get_idle, &mut buf) {
        Some(InResponse::Accepted(data)) => assert_eq!(data, &[0x7d]),
        _ => panic!("expected idle"),
    }

    let set_boot = request([0x21, 0x0b, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
    assert!(matches!(
        c.control_out(set_boot, &[]),
        Some(OutResponse::Accepted)
    ));
    let get_protocol = request([0xa1, 0x03, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00]);
    match c.control_in(get_protocol, &mut buf) {
        Some(InResponse::Accepted(data)) => assert_eq!(data, &[PROTOCOL_BOOT]),
        _ => panic!("expected protocol"),
    }

    let set_bad = request([0x21, 0x0b, 0x05, 0x00, 0x00, 0x00, 0x00, 0x00]);
    assert!(matches!(
        c.control_out(set_bad, &[]),
        Some(OutResponse::Rejected)
    ));

    c.reset();
    match c.control_in(get_protocol, &mut buf) {
        Some(InResponse::Accepted(data)) => assert_eq!(data, &[PROTOCOL_REPORT]),
        _ => panic!("expected protocol"),
    }
}
