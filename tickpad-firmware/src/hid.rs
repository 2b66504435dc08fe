use embassy_usb::driver::{Driver, Endpoint, EndpointError, EndpointIn};

#[rustfmt::skip]
pub const BOOT_KEYBOARD_REPORT_DESC: &[u8] = &[
    0x05, 0x01, // (GLOBAL) USAGE_PAGE         0x0001 Generic Desktop Page
    0x09, 0x06, // (LOCAL)  USAGE              0x00010006 Keyboard
    0xA1, 0x01, // (MAIN)   COLLECTION         Application
    0x05, 0x07, //   (GLOBAL) USAGE_PAGE         0x0007 Keyboard/Keypad Page
    0x19, 0xE0, //   (LOCAL)  USAGE_MINIMUM      0x000700E0 Keyboard LeftControl
    0x29, 0xE7, //   (LOCAL)  USAGE_MAXIMUM      0x000700E7 Keyboard Right GUI
    0x15, 0x00, //   (GLOBAL) LOGICAL_MINIMUM    0
    0x25, 0x01, //   (GLOBAL) LOGICAL_MAXIMUM    1
    0x75, 0x01, //   (GLOBAL) REPORT_SIZE        1 bit
    0x95, 0x08, //   (GLOBAL) REPORT_COUNT       8 modifier bits
    0x81, 0x02, //   (MAIN)   INPUT              Data,Var,Abs
    0x95, 0x01, //   (GLOBAL) REPORT_COUNT       1
    0x75, 0x08, //   (GLOBAL) REPORT_SIZE        8 bits
    0x81, 0x01, //   (MAIN)   INPUT              Const (reserved byte)
    0x95, 0x05, //   (GLOBAL) REPORT_COUNT       5
    0x75, 0x01, //   (GLOBAL) REPORT_SIZE        1 bit
    0x05, 0x08, //   (GLOBAL) USAGE_PAGE         0x0008 LED Page
    0x19, 0x01, //   (LOCAL)  USAGE_MINIMUM      Num Lock
    0x29, 0x05, //   (LOCAL)  USAGE_MAXIMUM      Kana
    0x91, 0x02, //   (MAIN)   OUTPUT             Data,Var,Abs
    0x95, 0x01, //   (GLOBAL) REPORT_COUNT       1
    0x75, 0x03, //   (GLOBAL) REPORT_SIZE        3 bits
    0x91, 0x01, //   (MAIN)   OUTPUT             Const (padding)
    0x95, 0x06, //   (GLOBAL) REPORT_COUNT       6 key slots
    0x75, 0x08, //   (GLOBAL) REPORT_SIZE        8 bits
    0x15, 0x00, //   (GLOBAL) LOGICAL_MINIMUM    0
    0x25, 0xE7, //   (GLOBAL) LOGICAL_MAXIMUM    0xE7
    0x05, 0x07, //   (GLOBAL) USAGE_PAGE         0x0007 Keyboard/Keypad Page
    0x19, 0x00, //   (LOCAL)  USAGE_MINIMUM      0x00070000
    0x29, 0xE7, //   (LOCAL)  USAGE_MAXIMUM      0x000700E7
    0x81, 0x00, //   (MAIN)   INPUT              Data,Array,Abs
    0xC0,       // (MAIN)   END_COLLECTION
];

/// Something that can deliver a raw HID input report to the host.
#[allow(async_fn_in_trait)]
pub trait ReportWriter {
    /// Wait until the host has configured the endpoint.
    async fn ready(&mut self);

    async fn write_report(&mut self, report: &[u8]) -> Result<(), EndpointError>;
}

pub struct HidWriter<'d, D: Driver<'d>, const N: usize> {
    ep_in: D::EndpointIn,
}

impl<'d, D: Driver<'d>, const N: usize> HidWriter<'d, D, N> {
    pub fn new(ep_in: <D>::EndpointIn) -> Self {
        Self { ep_in }
    }

    /// Writes `report` to its interrupt endpoint.
    pub async fn write(&mut self, report: &[u8]) -> Result<(), EndpointError> {
        if report.len() > N {
            return Err(EndpointError::BufferOverflow);
        }

        let max_packet_size = usize::from(self.ep_in.info().max_packet_size);
        let zlp_needed = report.len() < N && report.len() % max_packet_size == 0;
        for chunk in report.chunks(max_packet_size) {
            self.ep_in.write(chunk).await?;
        }

        if zlp_needed {
            self.ep_in.write(&[]).await?;
        }

        Ok(())
    }
}

impl<'d, D: Driver<'d>, const N: usize> ReportWriter for HidWriter<'d, D, N> {
    async fn ready(&mut self) {
        self.ep_in.wait_enabled().await;
    }

    async fn write_report(&mut self, report: &[u8]) -> Result<(), EndpointError> {
        self.write(report).await
    }
}
