#![no_std]
#![no_main]

#[cfg(feature = "defmt")]
use defmt_rtt as _;
use panic_probe as _;

use core::convert::Infallible;

use embassy_executor::Spawner;
use embassy_rp::{
    bind_interrupts,
    gpio::{Input, Level, Output, Pull},
    i2c::{self, I2c},
    peripherals::{I2C0, USB},
    pwm::{self, Pwm},
    usb::{Driver, InterruptHandler},
};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Duration, Instant};
use embassy_usb::UsbDevice;
use embedded_graphics::{
    mono_font::{
        ascii::{FONT_10X20, FONT_6X10},
        MonoTextStyle,
    },
    pixelcolor::BinaryColor,
    prelude::*,
    text::{Alignment, Baseline, Text, TextStyleBuilder},
};
use ssd1306::{
    mode::{BufferedGraphicsMode, DisplayConfig as _},
    prelude::{Brightness, DisplayRotation, DisplaySize128x64, I2CInterface},
    I2CDisplayInterface, Ssd1306,
};
use static_cell::StaticCell;
use tickpad_common::keycodes::kc;
use tickpad_firmware::{
    config::{ConfigError, KeyboardConfig, MatrixConfig},
    hid::{HidWriter, BOOT_KEYBOARD_REPORT_DESC},
    key_reporter::{ReportChannel, Reporter, REPORT_SIZE},
    keyboard::Keyboard,
    keymap::{Action, Layer},
    macro_engine::{Macro, MacroStep},
    matrix::{DiodeOrientation, PinId},
    status::{
        display::{Anchor, DisplayConfig, DisplayDriver, DisplayRenderer, TextEntry},
        light::{AnimationMode, LedAnimator, LedConfig},
    },
    usb::{Configurator, State, UsbBuffers},
};

// ---------------- User Config ------------------

// USB config
const VENDOR_ID: u16 = 0x6e0f;
const PRODUCT_ID: u16 = 0x0003;
const MANUFACTURER: &str = "tickpad";
const PRODUCT: &str = "tickpad macropad 3x3";
const SERIAL_NUMBER: &str = "tickpad:0003";
const MAX_POWER: u16 = 100;

const ROWS: &[PinId] = &[PinId(7), PinId(8), PinId(9)];
const COLS: &[PinId] = &[PinId(0), PinId(1), PinId(2)];

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

#[rustfmt::skip]
const BASE: Layer = &[
    Action::Key(kc::N1), Action::Key(kc::N2), Action::Key(kc::N3),
    Action::Key(kc::N4), Action::Key(kc::N5), Action::Key(kc::N6),
    Action::Macro(0),    Action::Key(kc::N0), Action::Macro(1),
];

const TEXT: &[TextEntry] = &[
    TextEntry::new("KMK Macropad!", 0, 0),
    TextEntry::new("Ready!", 0, 12),
];

static CONFIG: KeyboardConfig = KeyboardConfig::new(
    MatrixConfig::new(ROWS, COLS, DiodeOrientation::ColumnToRow),
    &[BASE],
    MACROS,
)
.with_led(
    LedConfig::new(PinId(10))
        .with_brightness(50)
        .with_mode(AnimationMode::Breathing),
)
.with_display(
    DisplayConfig::new(0x3c, PinId(4), PinId(5), 128, 64)
        .with_brightness(0.8, 0.2)
        .with_timers(Duration::from_secs(10), Duration::from_secs(60))
        .with_fade_time(Duration::from_secs(1))
        .with_entries(TEXT),
);

// ----------- End of user config ----------------

const REPORT_QUEUE: usize = 8;
const PWM_TOP: u16 = 1000;

type UsbDriver = Driver<'static, USB>;
type Channel = ReportChannel<CriticalSectionRawMutex, REPORT_QUEUE>;
type Oled = Ssd1306<
    I2CInterface<I2c<'static, I2C0, i2c::Blocking>>,
    DisplaySize128x64,
    BufferedGraphicsMode<DisplaySize128x64>,
>;

bind_interrupts!(struct Irqs {
    USBCTRL_IRQ => InterruptHandler<USB>;
});

static CHANNEL: Channel = Channel::new();
static USB_BUFFERS: StaticCell<UsbBuffers> = StaticCell::new();
static USB_CONFIG: StaticCell<Configurator> = StaticCell::new();
static HID_STATE: StaticCell<State> = StaticCell::new();
static LED: StaticCell<LedAnimator<LedPwm>> = StaticCell::new();
static DISPLAY: StaticCell<DisplayRenderer<OledPanel>> = StaticCell::new();

/// PWM slice output A as an `embedded-hal` duty cycle channel.
struct LedPwm {
    pwm: Pwm<'static>,
    config: pwm::Config,
}

impl embedded_hal::pwm::ErrorType for LedPwm {
    type Error = Infallible;
}

impl embedded_hal::pwm::SetDutyCycle for LedPwm {
    fn max_duty_cycle(&self) -> u16 {
        self.config.top
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        self.config.compare_a = duty;
        self.pwm.set_config(&self.config);
        Ok(())
    }
}

#[derive(Debug)]
struct PanelError;

struct OledPanel {
    oled: Oled,
}

impl OledPanel {
    fn new(i2c: I2c<'static, I2C0, i2c::Blocking>, config: &DisplayConfig) -> Result<Self, PanelError> {
        let rotation = if config.flip_y {
            DisplayRotation::Rotate180
        } else {
            DisplayRotation::Rotate0
        };
        let interface = I2CDisplayInterface::new_custom_address(i2c, config.address);
        let mut oled =
            Ssd1306::new(interface, DisplaySize128x64, rotation).into_buffered_graphics_mode();
        oled.init().map_err(|_| PanelError)?;
        oled.set_mirror(config.flip_x != config.flip_y)
            .map_err(|_| PanelError)?;
        Ok(Self { oled })
    }
}

fn text_style(anchor: Anchor) -> (Alignment, Baseline) {
    match anchor {
        Anchor::TopLeft => (Alignment::Left, Baseline::Top),
        Anchor::TopCenter => (Alignment::Center, Baseline::Top),
        Anchor::TopRight => (Alignment::Right, Baseline::Top),
        Anchor::MiddleLeft => (Alignment::Left, Baseline::Middle),
        Anchor::MiddleCenter => (Alignment::Center, Baseline::Middle),
        Anchor::MiddleRight => (Alignment::Right, Baseline::Middle),
        Anchor::BottomLeft => (Alignment::Left, Baseline::Bottom),
        Anchor::BottomCenter => (Alignment::Center, Baseline::Bottom),
        Anchor::BottomRight => (Alignment::Right, Baseline::Bottom),
    }
}

impl DisplayDriver for OledPanel {
    type Error = PanelError;

    fn draw(&mut self, entries: &[TextEntry]) -> Result<(), Self::Error> {
        self.oled.clear_buffer();
        for entry in entries {
            let font = if entry.scale > 1 { &FONT_10X20 } else { &FONT_6X10 };
            let (alignment, baseline) = text_style(entry.anchor);
            let style = TextStyleBuilder::new()
                .alignment(alignment)
                .baseline(baseline)
                .build();
            Text::with_text_style(
                entry.text,
                Point::new(entry.x, entry.y),
                MonoTextStyle::new(font, BinaryColor::On),
                style,
            )
            .draw(&mut self.oled)
            .map_err(|_| PanelError)?;
        }
        self.oled.flush().map_err(|_| PanelError)
    }

    fn set_brightness(&mut self, level: f32) -> Result<(), Self::Error> {
        let contrast = (level.clamp(0.0, 1.0) * 255.0) as u8;
        self.oled
            .set_brightness(Brightness::custom(1, contrast))
            .map_err(|_| PanelError)
    }

    fn set_power(&mut self, on: bool) -> Result<(), Self::Error> {
        self.oled.set_display_on(on).map_err(|_| PanelError)
    }
}

fn halt(err: ConfigError) -> ! {
    tickpad_firmware::error!("invalid keyboard config: {:?}", err);
    loop {
        cortex_m::asm::wfi();
    }
}

#[embassy_executor::task]
async fn usb_task(mut usb: UsbDevice<'static, UsbDriver>) -> ! {
    usb.run().await
}

#[embassy_executor::task]
async fn report_task(writer: HidWriter<'static, UsbDriver, REPORT_SIZE>) -> ! {
    Reporter::new(writer, &CHANNEL).run().await
}

#[embassy_executor::main]
async fn main(spawner: Spawner) -> ! {
    let p = embassy_rp::init(Default::default());

    // ColumnToRow: columns are strobed, rows are sensed
    let inputs = [
        Input::new(p.PIN_7, Pull::Down),
        Input::new(p.PIN_8, Pull::Down),
        Input::new(p.PIN_9, Pull::Down),
    ];
    let outputs = [
        Output::new(p.PIN_0, Level::Low),
        Output::new(p.PIN_1, Level::Low),
        Output::new(p.PIN_2, Level::Low),
    ];

    let mut keyboard = match Keyboard::new(&CONFIG, inputs, outputs, &CHANNEL) {
        Ok(keyboard) => keyboard,
        Err(err) => halt(err),
    };

    let mut device_config = embassy_usb::Config::new(VENDOR_ID, PRODUCT_ID);
    device_config.manufacturer = Some(MANUFACTURER);
    device_config.product = Some(PRODUCT);
    device_config.serial_number = Some(SERIAL_NUMBER);
    device_config.max_power = MAX_POWER;

    let usb_config = USB_CONFIG.init(Configurator::new(device_config));
    let usb_buffers = USB_BUFFERS.init(UsbBuffers::default());
    let mut builder = usb_config
        .usb_builder(Driver::new(p.USB, Irqs), usb_buffers)
        .unwrap();
    let writer =
        usb_config.keyboard_iface(&mut builder, BOOT_KEYBOARD_REPORT_DESC, HID_STATE.init(State::new()));
    let usb = builder.build();

    if let Some(led_config) = CONFIG.led {
        let mut config = pwm::Config::default();
        config.top = PWM_TOP;
        let pwm = LedPwm {
            pwm: Pwm::new_output_a(p.PWM_SLICE5, p.PIN_10, config.clone()),
            config,
        };
        match LedAnimator::new(pwm, led_config, Instant::now()) {
            Ok(led) => {
                keyboard.attach(LED.init(led));
            }
            Err(err) => tickpad_firmware::warn!("status LED detached: {:?}", err),
        }
    }

    if let Some(display_config) = CONFIG.display {
        let i2c = I2c::new_blocking(p.I2C0, p.PIN_5, p.PIN_4, i2c::Config::default());
        match OledPanel::new(i2c, &display_config) {
            Ok(panel) => match DisplayRenderer::new(panel, display_config, Instant::now()) {
                Ok(display) => {
                    keyboard.attach(DISPLAY.init(display));
                }
                Err(err) => tickpad_firmware::warn!("display detached: {:?}", err),
            },
            Err(_) => tickpad_firmware::warn!("display not found"),
        }
    }

    spawner.must_spawn(usb_task(usb));
    spawner.must_spawn(report_task(writer));

    keyboard.run().await
}
