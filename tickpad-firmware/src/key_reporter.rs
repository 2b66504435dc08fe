use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::{blocking_mutex::raw::RawMutex, channel::Channel};
use embassy_usb::driver::EndpointError;
use tickpad_common::keycodes::{self, key_range};

use crate::{hid::ReportWriter, key_scanner::KeyEventKind, warn};

pub const KEY_SLOTS: usize = 6;
pub const REPORT_SIZE: usize = KEY_SLOTS + 2;

/// Boot protocol keyboard report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyboardReport {
    pub modifiers: u8,
    pub keys: [u8; KEY_SLOTS],
}

impl KeyboardReport {
    pub const EMPTY: Self = Self {
        modifiers: 0,
        keys: [0; KEY_SLOTS],
    };

    /// `[modifiers, reserved, k1..k6]`
    pub fn as_bytes(&self) -> [u8; REPORT_SIZE] {
        let mut bytes = [0; REPORT_SIZE];
        bytes[0] = self.modifiers;
        bytes[2..].copy_from_slice(&self.keys);
        bytes
    }

    pub fn contains(&self, key: u8) -> bool {
        key != key_range::NONE && self.keys.contains(&key)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// No room for the report; it stays pending for the next flush.
    Backpressure,
    Disconnected,
}

/// Where [`ReportSink::flush`] sends reports.
pub trait ReportTransport {
    fn try_send_report(&self, report: &KeyboardReport) -> Result<(), TransportError>;
}

/// The held key state that the next report is built from.
#[derive(Debug, Default)]
pub struct ReportSink {
    report: KeyboardReport,
    /// Holders per modifier bit. A bit is reported while its count is non-zero.
    modifier_holds: [u8; 8],
    dirty: bool,
}

impl ReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&self) -> &KeyboardReport {
        &self.report
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Whether `key` is down in the report.
    pub fn is_held(&self, key: u8) -> bool {
        match keycodes::modifier_bit(key) {
            Some(bit) => self.report.modifiers & bit != 0,
            None => self.report.contains(key),
        }
    }

    /// Returns true if the report changed. A full report drops the key. Each press of a modifier
    /// takes a hold that one release gives back.
    pub fn press(&mut self, key: u8) -> bool {
        if let Some(bit) = keycodes::modifier_bit(key) {
            return self.hold_modifiers(bit);
        }
        let changed = if key == key_range::NONE || self.report.contains(key) {
            false
        } else if let Some(slot) = self.report.keys.iter_mut().find(|k| **k == key_range::NONE) {
            *slot = key;
            true
        } else {
            crate::debug!("report full; dropped key {}", key);
            false
        };
        self.dirty |= changed;
        changed
    }

    /// Returns true if the report changed. Releasing a key that is not held does nothing.
    pub fn release(&mut self, key: u8) -> bool {
        if let Some(bit) = keycodes::modifier_bit(key) {
            return self.drop_modifiers(bit);
        }
        let changed = if key == key_range::NONE {
            false
        } else if let Some(slot) = self.report.keys.iter_mut().find(|k| **k == key) {
            *slot = key_range::NONE;
            true
        } else {
            false
        };
        self.dirty |= changed;
        changed
    }

    pub fn apply(&mut self, key: u8, kind: KeyEventKind) -> bool {
        match kind {
            KeyEventKind::Pressed => self.press(key),
            KeyEventKind::Released => self.release(key),
        }
    }

    pub fn apply_modifiers(&mut self, modifiers: u8, kind: KeyEventKind) -> bool {
        match kind {
            KeyEventKind::Pressed => self.hold_modifiers(modifiers),
            KeyEventKind::Released => self.drop_modifiers(modifiers),
        }
    }

    fn hold_modifiers(&mut self, mask: u8) -> bool {
        for (i, holds) in self.modifier_holds.iter_mut().enumerate() {
            if mask & (1 << i) != 0 {
                *holds = holds.saturating_add(1);
            }
        }
        self.sync_modifiers()
    }

    fn drop_modifiers(&mut self, mask: u8) -> bool {
        for (i, holds) in self.modifier_holds.iter_mut().enumerate() {
            if mask & (1 << i) != 0 {
                *holds = holds.saturating_sub(1);
            }
        }
        self.sync_modifiers()
    }

    fn sync_modifiers(&mut self) -> bool {
        let modifiers = self
            .modifier_holds
            .iter()
            .enumerate()
            .fold(0u8, |acc, (i, holds)| if *holds > 0 { acc | 1 << i } else { acc });
        let changed = modifiers != self.report.modifiers;
        self.report.modifiers = modifiers;
        self.dirty |= changed;
        changed
    }

    /// Drop every held key. The host is sent an empty report on the next flush if it had seen
    /// keys down.
    pub fn clear(&mut self) {
        self.modifier_holds = [0; 8];
        if !self.report.is_empty() {
            self.report = KeyboardReport::EMPTY;
            self.dirty = true;
        }
    }

    /// Send the report when it has changed since the last successful flush. Returns whether a
    /// report was sent.
    pub fn flush<T: ReportTransport + ?Sized>(
        &mut self,
        transport: &T,
    ) -> Result<bool, TransportError> {
        if !self.dirty {
            return Ok(false);
        }
        transport.try_send_report(&self.report)?;
        self.dirty = false;
        Ok(true)
    }
}

/// Hands reports from the scan loop to the [`Reporter`] task.
pub struct ReportChannel<M: RawMutex, const N: usize> {
    channel: Channel<M, KeyboardReport, N>,
    connected: AtomicBool,
}

impl<M: RawMutex, const N: usize> Default for ReportChannel<M, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex, const N: usize> ReportChannel<M, N> {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
            connected: AtomicBool::new(false),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
        if !connected {
            while self.channel.try_receive().is_ok() {}
        }
    }

    pub async fn receive(&self) -> KeyboardReport {
        self.channel.receive().await
    }

    pub fn try_receive(&self) -> Option<KeyboardReport> {
        self.channel.try_receive().ok()
    }
}

impl<M: RawMutex, const N: usize> ReportTransport for ReportChannel<M, N> {
    fn try_send_report(&self, report: &KeyboardReport) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Disconnected);
        }
        self.channel
            .try_send(*report)
            .map_err(|_| TransportError::Backpressure)
    }
}

/// Drains a [`ReportChannel`] into a HID IN endpoint.
pub struct Reporter<'c, W: ReportWriter, M: RawMutex, const N: usize> {
    writer: W,
    channel: &'c ReportChannel<M, N>,
}

impl<'c, W: ReportWriter, M: RawMutex, const N: usize> Reporter<'c, W, M, N> {
    pub fn new(writer: W, channel: &'c ReportChannel<M, N>) -> Self {
        Self { writer, channel }
    }

    pub async fn run(&mut self) -> ! {
        loop {
            self.writer.ready().await;
            crate::info!("keyboard endpoint enabled");
            self.channel.set_connected(true);
            loop {
                let report = self.channel.receive().await;
                if let Err(EndpointError::Disabled) = self.write(&report).await {
                    break;
                }
            }
        }
    }

    /// Write one report. A disabled endpoint marks the channel disconnected.
    pub async fn write(&mut self, report: &KeyboardReport) -> Result<(), EndpointError> {
        let result = self.writer.write_report(&report.as_bytes()).await;
        match &result {
            Err(EndpointError::Disabled) => {
                warn!("keyboard endpoint disabled");
                self.channel.set_connected(false);
            }
            Err(e) => warn!("Failed to send report: {:?}", e),
            Ok(()) => {}
        }
        result
    }
}

#[cfg(test)]
#[path = "key_reporter_test.rs"]
mod test;
