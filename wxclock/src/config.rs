// Copyright (C) 2025 wxclock contributors
//
// MIT License

//! Compile time configuration.
//!
//! Every setting can be overridden with a `WXCLOCK_*` environment variable
//! at build time, for example `WXCLOCK_SSID=MyNetwork cargo build`.  The
//! defaults match the deployment the device was built for.

use wxclock_at::station;

/// Serial rate of the ESP8266 module.
pub const BAUD_RATE: u32 = 115_200;

/// Access point SSID.
pub const SSID: &str = match option_env!("WXCLOCK_SSID") {
    Some(value) => value,
    None => "MSU_IOT",
};

/// Access point password.
pub const PASSWORD: &str = match option_env!("WXCLOCK_PASSWORD") {
    Some(value) => value,
    None => "msucowboys",
};

/// ThingHTTP relay IP address.
pub const RELAY_IP: &str = match option_env!("WXCLOCK_RELAY_IP") {
    Some(value) => value,
    None => "18.235.222.172",
};

/// ThingHTTP API key whose request returns the time of day string.
pub const TIME_KEY: &str = match option_env!("WXCLOCK_TIME_KEY") {
    Some(value) => value,
    None => "GPZOQ1CYCORFIET5",
};

/// ThingHTTP API key whose request returns the weather conditions string.
pub const WEATHER_KEY: &str = match option_env!("WXCLOCK_WEATHER_KEY") {
    Some(value) => value,
    None => "IRXOT0ZPTZLRPFT0",
};

const DEFAULT_RELAY_PORT: u16 = 8080;

/// ThingHTTP relay TCP port.
pub fn relay_port() -> u16 {
    match option_env!("WXCLOCK_RELAY_PORT") {
        Some(value) => value.parse().unwrap_or(DEFAULT_RELAY_PORT),
        None => DEFAULT_RELAY_PORT,
    }
}

/// Assembles the station configuration from the settings above.
pub fn station() -> station::Config<'static> {
    station::Config {
        ssid: SSID,
        password: PASSWORD,
        relay_ip: RELAY_IP,
        relay_port: relay_port(),
        time_key: TIME_KEY,
        weather_key: WEATHER_KEY,
    }
}
