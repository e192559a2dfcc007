// Copyright (C) 2025 wxclock contributors
//
// MIT License

//! build.rs for wxclock firmware

fn main() {
    println!("cargo:rerun-if-env-changed=ESP_LOG");
    println!("cargo:rerun-if-env-changed=WXCLOCK_SSID");
    println!("cargo:rerun-if-env-changed=WXCLOCK_PASSWORD");
    println!("cargo:rerun-if-env-changed=WXCLOCK_RELAY_IP");
    println!("cargo:rerun-if-env-changed=WXCLOCK_RELAY_PORT");
    println!("cargo:rerun-if-env-changed=WXCLOCK_TIME_KEY");
    println!("cargo:rerun-if-env-changed=WXCLOCK_WEATHER_KEY");
    println!("cargo:rerun-if-changed=build.rs");

    linker_be_nice();
    // make sure linkall.x is the last linker script (otherwise might cause problems with flip-link)
    println!("cargo:rustc-link-arg=-Tlinkall.x");
}

fn linker_be_nice() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        let kind = &args[1];
        let what = &args[2];

        match kind.as_str() {
            "undefined-symbol" => {
                if what.as_str() == "_stack_start" {
                    eprintln!();
                    eprintln!("💡 Is the linker script `linkall.x` missing?");
                    eprintln!();
                }
            }
            // we don't have anything helpful for "missing-lib" yet
            _ => {
                std::process::exit(1);
            }
        }

        std::process::exit(0);
    }

    println!(
        "cargo:rustc-link-arg=--error-handling-script={}",
        std::env::current_exe().unwrap().display()
    );
}
