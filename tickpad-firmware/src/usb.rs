use core::mem::MaybeUninit;

use embassy_usb::{
    control::{InResponse, OutResponse, Recipient, Request, RequestType},
    driver::Driver,
    types::InterfaceNumber,
    Builder, Config, Handler,
};

use crate::{hid::HidWriter, key_reporter::REPORT_SIZE};

// HID
const HID_CLASS: u8 = 3;
const HID_SUBCLASS_BOOT: u8 = 1;
const HID_PROTOCOL_KEYBOARD: u8 = 1;

const HID_DESC_DESCTYPE_HID: u8 = 0x21;
const HID_DESC_DESCTYPE_HID_REPORT: u8 = 0x22;
const HID_DESC_SPEC_1_11: [u8; 2] = [0x11, 0x01];
const HID_DESC_COUNTRY_UNSPEC: u8 = 0x00;

const HID_REQ_SET_IDLE: u8 = 0x0a;
const HID_REQ_GET_IDLE: u8 = 0x02;
const HID_REQ_GET_REPORT: u8 = 0x01;
const HID_REQ_SET_REPORT: u8 = 0x09;
const HID_REQ_GET_PROTOCOL: u8 = 0x03;
const HID_REQ_SET_PROTOCOL: u8 = 0x0b;

const PROTOCOL_BOOT: u8 = 0;
const PROTOCOL_REPORT: u8 = 1;

/// Internal state for the keyboard interface.
pub struct State {
    control: MaybeUninit<Control>,
}
impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}
impl State {
    pub const fn new() -> Self {
        State {
            control: MaybeUninit::uninit(),
        }
    }
}

const CONFIG_SIZE: usize = 128;
const BOS_SIZE: usize = 32;
const MSOS_SIZE: usize = 0;
const CONTROL_SIZE: usize = 64;

pub struct UsbBuffers {
    config_descriptor_buf: [u8; CONFIG_SIZE],
    bos_descriptor_buf: [u8; BOS_SIZE],
    msos_descriptor_buf: [u8; MSOS_SIZE],
    control_buf: [u8; CONTROL_SIZE],
}

impl Default for UsbBuffers {
    fn default() -> Self {
        Self {
            config_descriptor_buf: [0; CONFIG_SIZE],
            bos_descriptor_buf: [0; BOS_SIZE],
            msos_descriptor_buf: [0; MSOS_SIZE],
            control_buf: [0; CONTROL_SIZE],
        }
    }
}

pub struct Configurator<'d> {
    device_config: Option<Config<'d>>,
    max_packet_size: u16,
    poll_ms: u8,
}

impl<'d> Configurator<'d> {
    pub fn new(device_config: Config<'d>) -> Self {
        Self {
            max_packet_size: REPORT_SIZE as u16,
            poll_ms: 1,
            device_config: Some(device_config),
        }
    }

    pub fn usb_builder<D: Driver<'d>>(
        &mut self,
        driver: D,
        buffers: &'d mut UsbBuffers,
    ) -> Option<Builder<'d, D>> {
        self.device_config.take().map(|device_config| {
            Builder::new(
                driver,
                device_config,
                &mut buffers.config_descriptor_buf,
                &mut buffers.bos_descriptor_buf,
                &mut buffers.msos_descriptor_buf,
                &mut buffers.control_buf,
            )
        })
    }

    /// Add a boot keyboard interface and return the writer for its IN endpoint.
    pub fn keyboard_iface<D: Driver<'d>>(
        &self,
        builder: &mut Builder<'d, D>,
        descriptor: &'static [u8],
        state: &'d mut State,
    ) -> HidWriter<'d, D, REPORT_SIZE> {
        let mut func = builder.function(HID_CLASS, HID_SUBCLASS_BOOT, HID_PROTOCOL_KEYBOARD);
        let mut iface = func.interface();
        let if_num = iface.interface_number();
        let mut alt = iface.alt_setting(HID_CLASS, HID_SUBCLASS_BOOT, HID_PROTOCOL_KEYBOARD, None);

        let control = Control::new(if_num, descriptor);
        alt.descriptor(HID_DESC_DESCTYPE_HID, &control.hid_descriptor[2..]);

        let ep_in = alt.endpoint_interrupt_in(self.max_packet_size, self.poll_ms);

        drop(func);

        let control = state.control.write(control);
        builder.handler(control);
        HidWriter::new(ep_in)
    }
}

struct Control {
    if_num: InterfaceNumber,
    report_descriptor: &'static [u8],
    hid_descriptor: [u8; 9],
    idle: u8,
    protocol: u8,
}
impl Control {
    fn new(if_num: InterfaceNumber, report_descriptor: &'static [u8]) -> Self {
        Control {
            if_num,
            report_descriptor,
            hid_descriptor: [
                9,                                           // Length of buf inclusive of size prefix
                HID_DESC_DESCTYPE_HID,                       // Descriptor type
                HID_DESC_SPEC_1_11[0],                       // HID Class spec version
                HID_DESC_SPEC_1_11[1],                       //
                HID_DESC_COUNTRY_UNSPEC,                     // Country code not supported
                1,                                           // Number of following descriptors
                HID_DESC_DESCTYPE_HID_REPORT, // We have a HID report descriptor the host should read
                (report_descriptor.len() & 0xFF) as u8, // HID report descriptor size,
                (report_descriptor.len() >> 8 & 0xFF) as u8, //
            ],
            idle: 0,
            protocol: PROTOCOL_REPORT,
        }
    }
}
impl Handler for Control {
    fn reset(&mut self) {
        self.idle = 0;
        self.protocol = PROTOCOL_REPORT;
    }

    fn control_out(&mut self, req: Request, _data: &[u8]) -> Option<OutResponse> {
        if (req.request_type, req.recipient, req.index)
            != (
                RequestType::Class,
                Recipient::Interface,
                self.if_num.0 as u16,
            )
        {
            return None;
        }

        match req.request {
            HID_REQ_SET_IDLE => {
                self.idle = (req.value >> 8) as u8;
                Some(OutResponse::Accepted)
            }
            HID_REQ_SET_PROTOCOL => {
                match req.value as u8 {
                    p @ (PROTOCOL_BOOT | PROTOCOL_REPORT) => {
                        self.protocol = p;
                        Some(OutResponse::Accepted)
                    }
                    _ => Some(OutResponse::Rejected),
                }
            }
            // LED output report; ignored
            HID_REQ_SET_REPORT => Some(OutResponse::Accepted),
            _ => Some(OutResponse::Rejected),
        }
    }

    fn control_in<'a>(&'a mut self, req: Request, buf: &'a mut [u8]) -> Option<InResponse<'a>> {
        if req.index != self.if_num.0 as u16 {
            return None;
        }

        match (req.request_type, req.recipient) {
            (RequestType::Standard, Recipient::Interface) => match req.request {
                Request::GET_DESCRIPTOR => match (req.value >> 8) as u8 {
                    HID_DESC_DESCTYPE_HID_REPORT => {
                        Some(InResponse::Accepted(self.report_descriptor))
                    }
                    HID_DESC_DESCTYPE_HID => Some(InResponse::Accepted(&self.hid_descriptor)),
                    _ => Some(InResponse::Rejected),
                },

                _ => Some(InResponse::Rejected),
            },
            (RequestType::Class, Recipient::Interface) => match req.request {
                HID_REQ_GET_IDLE if !buf.is_empty() => {
                    buf[0] = self.idle;
                    Some(InResponse::Accepted(&buf[0..1]))
                }
                HID_REQ_GET_PROTOCOL if !buf.is_empty() => {
                    buf[0] = self.protocol;
                    Some(InResponse::Accepted(&buf[0..1]))
                }
                HID_REQ_GET_REPORT if buf.len() >= REPORT_SIZE => {
                    buf[..REPORT_SIZE].fill(0);
                    Some(InResponse::Accepted(&buf[..REPORT_SIZE]))
                }
                _ => Some(InResponse::Rejected),
            },
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "usb_test.rs"]
mod test;
