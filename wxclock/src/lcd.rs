// Copyright (C) 2025 wxclock contributors
//
// MIT License

//! HD44780 character panel driver, 4-bit bus.
//!
//! Drives the panel through six GPIO outputs: register select, enable, and
//! data lines D4-D7.  The R/W line is assumed strapped low, so fixed waits
//! stand in for busy flag polling.

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use embassy_time::{Duration, Timer};
use esp_hal::gpio::Output;

/// Display rows.
pub const ROWS: usize = 2;

/// Display columns.
pub const COLUMNS: usize = 16;

// HD44780 command bytes.
const CMD_CLEAR: u8 = 0x01;
const CMD_ENTRY_INCREMENT: u8 = 0x06;
const CMD_DISPLAY_ON: u8 = 0x0c;
const CMD_FUNCTION_4BIT_2LINE: u8 = 0x28;
const CMD_SET_DDRAM: u8 = 0x80;

// DDRAM address of each row's first cell.
const ROW_OFFSETS: [u8; ROWS] = [0x00, 0x40];

/// An HD44780 panel on six GPIO outputs.
pub struct Lcd<'d> {
    rs: Output<'d>,
    enable: Output<'d>,
    data: [Output<'d>; 4],
}

impl<'d> Lcd<'d> {
    /// Creates the driver.  `data` is D4 through D7, in order.
    pub fn new(rs: Output<'d>, enable: Output<'d>, data: [Output<'d>; 4]) -> Self {
        Self { rs, enable, data }
    }

    /// Puts the controller in 4-bit 2-line mode and clears the panel.
    ///
    /// Follows the datasheet power-on sequence: three 8-bit function sets,
    /// then the switch to the 4-bit bus.
    pub async fn init(&mut self) {
        // Let the controller finish its own power-on reset.
        Timer::after(Duration::from_millis(50)).await;

        self.rs.set_low();
        for _ in 0..3 {
            self.write_nibble(0x03);
            Timer::after(Duration::from_millis(5)).await;
        }
        self.write_nibble(0x02);
        Timer::after(Duration::from_millis(1)).await;

        self.command(CMD_FUNCTION_4BIT_2LINE).await;
        self.command(CMD_DISPLAY_ON).await;
        self.command(CMD_ENTRY_INCREMENT).await;
        self.clear().await;

        trace!("OK:    Panel init");
    }

    /// Clears the panel and homes the cursor.
    pub async fn clear(&mut self) {
        self.command(CMD_CLEAR).await;
        // Clear is the one command that needs more than the common wait.
        Timer::after(Duration::from_millis(2)).await;
    }

    /// Moves the cursor to `row`, `column`, zero based, clamped to the
    /// panel.
    pub async fn set_cursor(&mut self, row: usize, column: usize) {
        let row = row.min(ROWS - 1);
        let column = column.min(COLUMNS - 1);
        self.command(CMD_SET_DDRAM | (ROW_OFFSETS[row] + column as u8))
            .await;
    }

    /// Writes `text` at the cursor, truncated to the panel width.
    pub async fn write_str(&mut self, text: &str) {
        for byte in text.bytes().take(COLUMNS) {
            self.write_data(byte).await;
        }
    }

    async fn command(&mut self, command: u8) {
        self.rs.set_low();
        self.write_byte(command).await;
    }

    async fn write_data(&mut self, data: u8) {
        self.rs.set_high();
        self.write_byte(data).await;
    }

    async fn write_byte(&mut self, byte: u8) {
        self.write_nibble(byte >> 4);
        self.write_nibble(byte & 0x0f);
        // Execution time of every command bar clear.
        Timer::after(Duration::from_micros(50)).await;
    }

    fn write_nibble(&mut self, nibble: u8) {
        for (bit, pin) in self.data.iter_mut().enumerate() {
            if nibble & (1 << bit) != 0 {
                pin.set_high();
            } else {
                pin.set_low();
            }
        }
        self.pulse_enable();
    }

    // Enable must stay high for 450ns or more.  A short spin at CPU speed
    // is comfortably past that.
    fn pulse_enable(&mut self) {
        self.enable.set_high();
        for _ in 0..100 {
            core::hint::spin_loop();
        }
        self.enable.set_low();
        for _ in 0..100 {
            core::hint::spin_loop();
        }
    }
}
