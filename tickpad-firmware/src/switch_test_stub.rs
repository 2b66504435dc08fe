extern crate alloc;
extern crate std;

use alloc::vec;
use embedded_hal::digital::{Error, ErrorType, InputPin, OutputPin};
use std::rc::Rc;
use std::sync::Mutex;
use std::vec::Vec;

pub trait Observer {
    fn update(&self, pin: Pin);
}

#[derive(Debug)]
struct KeyMatrixInner {
    switches: Vec<bool>,
    inputs: Vec<Pin>,
    outputs: Vec<Pin>,
}
impl KeyMatrixInner {
    /// A sense line reads high when any closed switch connects it to a driven strobe line.
    fn refresh(&self) {
        for (ipin, input) in self.inputs.iter().enumerate() {
            let level = self.outputs.iter().enumerate().any(|(opin, output)| {
                self.switches[ipin * self.outputs.len() + opin]
                    && matches!(output.get_state(), Some(true))
            });
            input.0.lock().is_high = Some(level);
        }
    }
}

/// A diode matrix wiring `outputs` (strobe lines) to `inputs` (sense lines) through switches.
#[derive(Clone)]
pub struct KeyMatrix {
    inner: Rc<Mutex<KeyMatrixInner>>,
}
impl KeyMatrix {
    pub fn new(inputs: Vec<Pin>, outputs: Vec<Pin>) -> Self {
        let me = Self {
            inner: Rc::new(Mutex::new(KeyMatrixInner {
                switches: vec![false; inputs.len() * outputs.len()],
                inputs,
                outputs,
            })),
        };

        for o in me.inner().outputs.iter() {
            o.add_observer(Rc::new(me.clone()))
        }
        me.inner().refresh();

        me
    }

    pub fn down(&self, ipin: usize, opin: usize) {
        self.set_switch(ipin, opin, true);
    }

    pub fn up(&self, ipin: usize, opin: usize) {
        self.set_switch(ipin, opin, false);
    }

    pub fn set_switch(&self, ipin: usize, opin: usize, is_down: bool) {
        let mut inner = self.inner();
        let idx = ipin * inner.outputs.len() + opin;
        inner.switches[idx] = is_down;
        inner.refresh();
    }

    fn inner(&self) -> std::sync::MutexGuard<'_, KeyMatrixInner> {
        self.inner.lock().unwrap()
    }
}
impl Observer for KeyMatrix {
    fn update(&self, _pin: Pin) {
        self.inner().refresh();
    }
}

#[derive(Debug)]
pub struct TestError;

#[derive(Clone)]
pub struct Pin(Rc<PinShared>);
impl core::fmt::Debug for Pin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = self.get_state();

        f.debug_struct("Pin")
            .field("n", &self.0.n)
            .field("state", &state)
            .finish()
    }
}
impl Pin {
    pub fn new(n: u8) -> Self {
        Self(Rc::new(PinShared {
            n,
            observer: Mutex::new(None),
            inner: Mutex::new(PinInner {
                is_high: None,
                failing: false,
            }),
        }))
    }

    pub fn num(&self) -> u8 {
        self.0.n
    }

    pub fn get_state(&self) -> Option<bool> {
        self.0.lock().is_high
    }

    /// Make every read and write on this pin fail.
    pub fn set_failing(&self, failing: bool) {
        self.0.lock().failing = failing;
    }

    fn add_observer(&self, observer: Rc<dyn Observer>) {
        *self.0.observer.lock().unwrap() = Some(observer);
    }

    fn drive(&mut self, is_high: bool) -> Result<(), TestError> {
        {
            let mut inner = self.0.lock();
            if inner.failing {
                return Err(TestError);
            }
            if inner.is_high == Some(is_high) {
                return Ok(());
            }
            inner.is_high = Some(is_high);
        }
        let observer = self.0.observer.lock().unwrap().clone();
        if let Some(o) = observer {
            o.update(self.clone());
        }
        Ok(())
    }
}

struct PinInner {
    is_high: Option<bool>,
    failing: bool,
}

struct PinShared {
    n: u8,
    observer: Mutex<Option<Rc<dyn Observer>>>,
    inner: Mutex<PinInner>,
}
impl PinShared {
    fn lock(&self) -> std::sync::MutexGuard<'_, PinInner> {
        self.inner.lock().unwrap()
    }
}

impl Error for TestError {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

impl ErrorType for Pin {
    type Error = TestError;
}

impl InputPin for Pin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        let inner = self.0.lock();
        if inner.failing {
            return Err(TestError);
        }
        Ok(matches!(inner.is_high, Some(true)))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

impl OutputPin for Pin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(true)
    }
}
