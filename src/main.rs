//! KeyGuard Firmware: Main Entry Point
//!
//! Hexagonal architecture with a single cooperative polling loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  Keypad            LogEventSink      NvsAdapter   Esp32Time    │
//! │  (InputPort)       (Feedback+Event)  (Storage+    (Clock+      │
//! │                                       Config)      DelayNs)    │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │             AccessService (pure logic)                 │    │
//! │  │  FSM · CredentialStore · LockoutEngine                 │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wiring (ESP32-DevKitC)
//!
//! | Signal       | GPIO             |
//! |--------------|------------------|
//! | Rows 1–4     | 13, 12, 14, 27   |
//! | Columns 1–3  | 26, 25, 33       |
//! | Confirm      | 32 (active low)  |
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_hal::gpio::{AnyIOPin, AnyOutputPin, Input, Output, PinDriver, Pull};
use esp_idf_hal::peripherals::Peripherals;
use log::{info, warn};

use keyguard::adapters::log_sink::LogEventSink;
use keyguard::adapters::nvs::NvsAdapter;
use keyguard::adapters::time::Esp32TimeAdapter;
use keyguard::app::ports::{ClockPort, ConfigPort};
use keyguard::app::service::AccessService;
use keyguard::config::AccessConfig;
use keyguard::drivers::keypad::{Keypad, PHONE_KEYMAP};
use keyguard::drivers::watchdog::Watchdog;

fn pulled_up(pin: AnyIOPin) -> Result<PinDriver<'static, AnyIOPin, Input>> {
    let mut driver = PinDriver::input(pin)?;
    driver.set_pull(Pull::Up)?;
    Ok(driver)
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  KeyGuard v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Storage + config ───────────────────────────────────
    // Without a working store there is no lockout persistence; refuse to run.
    let mut nvs = NvsAdapter::new().map_err(|e| anyhow::anyhow!("NVS init failed: {}", e))?;
    let config = match nvs.load() {
        Ok(cfg) => match cfg.validate() {
            Ok(()) => {
                info!("Config loaded from NVS");
                cfg
            }
            Err(e) => {
                warn!("Stored config invalid ({}), using defaults", e);
                AccessConfig::default()
            }
        },
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            AccessConfig::default()
        }
    };

    let watchdog = Watchdog::new(&config);

    // ── 3. Keypad ─────────────────────────────────────────────
    let p = Peripherals::take()?;
    let pins = p.pins;
    let rows: [PinDriver<'static, AnyOutputPin, Output>; 4] = [
        PinDriver::output(pins.gpio13.downgrade_output())?,
        PinDriver::output(pins.gpio12.downgrade_output())?,
        PinDriver::output(pins.gpio14.downgrade_output())?,
        PinDriver::output(pins.gpio27.downgrade_output())?,
    ];
    let cols = [
        pulled_up(pins.gpio26.downgrade())?,
        pulled_up(pins.gpio25.downgrade())?,
        pulled_up(pins.gpio33.downgrade())?,
    ];
    let confirm = pulled_up(pins.gpio32.downgrade())?;
    let mut keypad = Keypad::new(rows, cols, confirm, PHONE_KEYMAP);

    // ── 4. Service ────────────────────────────────────────────
    let mut clock = Esp32TimeAdapter::new();
    let mut ui = LogEventSink::new();
    let mut app = AccessService::new(config.clone());
    app.start(clock.now_ms(), &mut nvs, &mut keypad, &mut ui);

    info!("System ready. Entering poll loop.");

    // ── 5. Poll loop ──────────────────────────────────────────
    loop {
        let now = clock.now_ms();
        app.poll(now, &mut nvs, &mut keypad, &mut ui, &mut clock);

        watchdog.feed();

        esp_idf_hal::delay::FreeRtos::delay_ms(config.poll_interval_ms);
    }
}
