// Copyright (C) 2025 wxclock contributors
//
// MIT License

//! wxclock - Firmware
//!
//! A WiFi clock and weather terminal.  An ESP8266 module is driven over
//! its serial AT interface to fetch two ThingHTTP relay fields, which are
//! then shown on a 16x2 character panel.
//!
//! Wiring, ESP32-C3 side:
//! - UART1 TX on GPIO5 to the module's RX, UART1 RX on GPIO4 to the
//!   module's TX, 115200 8N1
//! - Module hardware reset on GPIO6, active low
//! - Panel RS on GPIO0, E on GPIO1, D4-D7 on GPIO2, GPIO3, GPIO8, GPIO9
//! - Heartbeat LED on GPIO10
//!
//! To use, optionally set the `WXCLOCK_SSID`, `WXCLOCK_PASSWORD`,
//! `WXCLOCK_RELAY_IP`, `WXCLOCK_RELAY_PORT`, `WXCLOCK_TIME_KEY` and
//! `WXCLOCK_WEATHER_KEY` environment variables, then build and flash.

#![no_std]
#![no_main]
#![feature(type_alias_impl_trait)]
#![feature(impl_trait_in_assoc_type)]

use embassy_executor::Spawner;
use embassy_time::{Duration, Timer};
use esp_backtrace as _;
use esp_hal::gpio::{Level, Output, OutputConfig};
use esp_hal::uart::{Config as UartConfig, Uart};
use esp_hal::{clock::CpuClock, timer::timg::TimerGroup};
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use wxclock_at::Station;

mod config;
mod lcd;

use lcd::Lcd;

esp_bootloader_esp_idf::esp_app_desc!();

// Hardware reset pulse for the WiFi module, then time for it to boot far
// enough to accept AT commands.
const MODEM_RESET_HOLD: Duration = Duration::from_millis(500);
const MODEM_BOOT_WAIT: Duration = Duration::from_secs(1);

const HEARTBEAT_PERIOD: Duration = Duration::from_secs(1);

#[embassy_executor::task]
async fn heartbeat(mut led: Output<'static>) {
    loop {
        led.toggle();
        Timer::after(HEARTBEAT_PERIOD).await;
    }
}

// wxclock firmware's main function:
// - Set up the HAL, logging and embassy
// - Start the heartbeat
// - Bring up the panel
// - Hardware reset the WiFi module and open its UART
// - Run the station once to fetch both fields
// - Leave the result, or the error, on the panel
#[esp_hal_embassy::main]
async fn main(spawner: Spawner) -> ! {
    // Set up the logger
    esp_println::logger::init_logger_from_env();

    info!("*** wxclock ***");

    // Set up the HAL
    let hal_config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(hal_config);

    let clocks = esp_hal::clock::Clocks::get();
    info!(
        "Value: {} running at {}MHz",
        esp_hal::chip!(),
        clocks.cpu_clock.as_mhz()
    );

    // Initialize embassy
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_hal_embassy::init(timg0.timer0);

    let led = Output::new(peripherals.GPIO10, Level::Low, OutputConfig::default());
    spawner.must_spawn(heartbeat(led));

    // Bring up the panel
    let rs = Output::new(peripherals.GPIO0, Level::Low, OutputConfig::default());
    let enable = Output::new(peripherals.GPIO1, Level::Low, OutputConfig::default());
    let data = [
        Output::new(peripherals.GPIO2, Level::Low, OutputConfig::default()),
        Output::new(peripherals.GPIO3, Level::Low, OutputConfig::default()),
        Output::new(peripherals.GPIO8, Level::Low, OutputConfig::default()),
        Output::new(peripherals.GPIO9, Level::Low, OutputConfig::default()),
    ];
    let mut panel = Lcd::new(rs, enable, data);
    panel.init().await;
    panel.write_str("Hello.").await;

    // Hardware reset the WiFi module
    info!("Exec:  Modem hardware reset");
    let mut modem_reset = Output::new(peripherals.GPIO6, Level::Low, OutputConfig::default());
    Timer::after(MODEM_RESET_HOLD).await;
    modem_reset.set_high();
    Timer::after(MODEM_BOOT_WAIT).await;

    // Open the module's UART
    let uart_config = UartConfig::default().with_baudrate(config::BAUD_RATE);
    let uart = Uart::new(peripherals.UART1, uart_config)
        .expect("Failed to initialize UART1")
        .with_tx(peripherals.GPIO5)
        .with_rx(peripherals.GPIO4)
        .into_async();

    panel.clear().await;
    panel.write_str("Connecting...").await;

    // Run the station
    let mut station = Station::new(uart, config::station());
    match station.run().await {
        Ok(readings) => {
            info!("OK:    Time    {}", readings.time);
            info!("OK:    Weather {}", readings.weather);
            panel.clear().await;
            panel.write_str(&readings.time).await;
            panel.set_cursor(1, 0).await;
            panel.write_str(&readings.weather).await;
        }
        Err(error) => {
            error!("Error: Fetch failed: {error}");
            panel.clear().await;
            panel.write_str("Failed:").await;
            panel.set_cursor(1, 0).await;
            panel.write_str(error.as_str()).await;
        }
    }

    // The panel now holds the result.  Nothing left to do.
    loop {
        Timer::after(Duration::from_secs(60)).await;
    }
}
