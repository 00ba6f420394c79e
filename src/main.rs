//! Keyboard RGB daemon
//!
//! Drives the lighting controller of a 4-zone RGB laptop keyboard. Either
//! serves an HTTP API any local tool can call, or plays one effect in the
//! foreground until Ctrl+C.
//!
//! ## Architecture
//! - **Render thread** (std::thread): owns the keyboard, processes commands
//! - **HTTP server** (tokio/axum): accepts API requests, sends commands via channel
//!
//! ## Usage
//! ```sh
//! sudo ./target/release/keyboard-rgb-rs --profile profile.json serve --port 8080
//! sudo ./target/release/keyboard-rgb-rs play ripple
//! ```

#[cfg(not(feature = "hardware"))]
fn main() {
    eprintln!("This binary requires the 'hardware' feature (hidapi, evdev).");
    eprintln!("Build with: cargo build --release --features hardware");
    eprintln!("Tests run without it: cargo test");
    std::process::exit(1);
}

#[cfg(feature = "hardware")]
fn main() {
    use clap::Parser;
    use tracing_subscriber::EnvFilter;

    // Initialize tracing; RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_ansi(false) // Disable ANSI color codes for systemd/journald
        .compact()
        .init();

    let cli = app::Cli::parse();
    if let Err(e) = app::run(cli) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(feature = "hardware")]
mod app {
    use clap::{Parser, Subcommand, ValueEnum};
    use keyboard_rgb_rs::capture::ScreenSampler;
    use keyboard_rgb_rs::input::{EvdevKeyInput, KeyInput, UnavailableKeyInput};
    use keyboard_rgb_rs::keyboard::Keyboard;
    use keyboard_rgb_rs::profile::Profile;
    use keyboard_rgb_rs::render::{Controller, LightingStatus, render_loop};
    use keyboard_rgb_rs::server::{self, AppState};
    use keyboard_rgb_rs::swipe::{SwipeMode, SwipeOptions};
    use keyboard_rgb_rs::transport::HidTransport;
    use keyboard_rgb_rs::{
        BoxError, DeviceConfig, ambient, fade, ripple, setup_signal_handler, swipe,
    };
    use std::path::PathBuf;
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};

    /// Keyboard RGB lighting daemon
    #[derive(Parser)]
    #[command(name = "keyboard-rgb-rs")]
    #[command(about = "Software lighting effects for 4-zone RGB keyboards")]
    #[command(version)]
    pub struct Cli {
        /// USB vendor id of the lighting controller (hex)
        #[arg(long, global = true, default_value = "048d", value_parser = parse_hex)]
        vendor_id: u16,

        /// USB product id of the lighting controller (hex)
        #[arg(long, global = true, default_value = "c993", value_parser = parse_hex)]
        product_id: u16,

        /// HID usage page of the lighting interface (hex)
        #[arg(long, global = true, default_value = "ff89", value_parser = parse_hex)]
        usage_page: u16,

        /// HID usage of the lighting interface (hex)
        #[arg(long, global = true, default_value = "00cc", value_parser = parse_hex)]
        usage: u16,

        /// Open the first interface with the right VID/PID, whatever its usage
        #[arg(long, global = true)]
        any_interface: bool,

        /// Lighting profile (JSON); the built-in demo profile if omitted
        #[arg(long, global = true)]
        profile: Option<PathBuf>,

        #[command(subcommand)]
        command: Command,
    }

    #[derive(Subcommand)]
    enum Command {
        /// Run the HTTP control API
        Serve {
            /// Address to bind
            #[arg(long, default_value = "127.0.0.1")]
            bind: String,

            /// Port to listen on
            #[arg(long, default_value = "8080")]
            port: u16,
        },
        /// Play one effect until Ctrl+C
        Play {
            effect: PlayEffect,

            /// Swipe cycles to play (default: until Ctrl+C)
            #[arg(long)]
            cycles: Option<u32>,

            /// Fill mode: blank each zone again after painting it
            #[arg(long)]
            clean_with_black: bool,
        },
    }

    #[derive(Clone, Copy, ValueEnum)]
    enum PlayEffect {
        Swipe,
        Fill,
        Ripple,
        Ambient,
        Fade,
    }

    fn parse_hex(s: &str) -> Result<u16, String> {
        let digits = s.trim_start_matches("0x").trim_start_matches("0X");
        u16::from_str_radix(digits, 16).map_err(|e| format!("invalid hex id '{s}': {e}"))
    }

    pub fn run(cli: Cli) -> Result<(), BoxError> {
        let mut config = DeviceConfig {
            vendor_id: cli.vendor_id,
            product_id: cli.product_id,
            usage_page: Some(cli.usage_page),
            usage: Some(cli.usage),
        };
        if cli.any_interface {
            config = config.any_interface();
        }
        let profile = Profile::load_or_default(cli.profile.as_deref())?;

        tracing::info!("Keyboard RGB v{}", env!("CARGO_PKG_VERSION"));
        tracing::info!(
            "Device: {:04x}:{:04x}",
            config.vendor_id,
            config.product_id
        );

        let mut keyboard = Keyboard::new(HidTransport::open(config)?);
        keyboard.set_brightness(profile.brightness);
        keyboard.set_speed(profile.speed);

        match cli.command {
            Command::Serve { bind, port } => serve(keyboard, profile, bind, port),
            Command::Play {
                effect,
                cycles,
                clean_with_black,
            } => {
                let cancel = setup_signal_handler()?;
                let mut options = SwipeOptions::from_profile(&profile);
                options.cycles = cycles;
                options.clean_with_black |= clean_with_black;

                match effect {
                    PlayEffect::Swipe => swipe::play(&mut keyboard, &profile, options, &cancel),
                    PlayEffect::Fill => {
                        options.mode = SwipeMode::Fill;
                        swipe::play(&mut keyboard, &profile, options, &cancel);
                    }
                    PlayEffect::Ripple => {
                        let mut keys = EvdevKeyInput::discover()?;
                        ripple::play(&mut keyboard, &profile, &mut keys, None, &cancel);
                    }
                    PlayEffect::Ambient => {
                        let mut screen = screen_sampler();
                        let settings = profile.ambient;
                        ambient::play(&mut keyboard, settings, &mut screen, None, &cancel);
                    }
                    PlayEffect::Fade => {
                        let mut keys = EvdevKeyInput::discover()?;
                        fade::play(&mut keyboard, &profile, &mut keys, &cancel);
                    }
                }

                tracing::info!(
                    "Stopped ({} failed device writes)",
                    keyboard.failed_writes()
                );
                Ok(())
            }
        }
    }

    #[cfg(feature = "capture")]
    fn screen_sampler() -> Box<dyn ScreenSampler + Send> {
        Box::new(keyboard_rgb_rs::capture::XcapSampler)
    }

    #[cfg(not(feature = "capture"))]
    fn screen_sampler() -> Box<dyn ScreenSampler + Send> {
        tracing::info!("Built without the 'capture' feature, ambient will stay dark");
        Box::new(keyboard_rgb_rs::capture::UnavailableSampler)
    }

    fn key_input() -> Box<dyn KeyInput + Send> {
        match EvdevKeyInput::discover() {
            Ok(keys) => Box::new(keys),
            Err(e) => {
                tracing::warn!("Key input unavailable, ripple and fade will stay dark: {}", e);
                Box::new(UnavailableKeyInput)
            }
        }
    }

    #[tokio::main(flavor = "current_thread")]
    async fn serve(
        keyboard: Keyboard<HidTransport>,
        profile: Profile,
        bind: String,
        port: u16,
    ) -> Result<(), BoxError> {
        // Create the channel for sending commands to the render thread.
        let (tx, rx) = mpsc::channel();

        // Shared lighting status: render thread writes, HTTP handlers read.
        let status = Arc::new(Mutex::new(LightingStatus::new()));

        // Spawn the render thread.
        let render_status = status.clone();
        let keys = key_input();
        let screen = screen_sampler();
        let render_handle = std::thread::spawn(move || {
            render_loop(rx, render_status, keyboard, keys, screen);
        });

        let app_state = AppState {
            controller: Controller::new(tx),
            status,
            profile: Arc::new(profile),
        };

        let app = server::create_router(app_state);

        let addr = format!("{bind}:{port}");
        tracing::info!("Listening on http://{}", addr);
        tracing::info!("API Documentation: http://{}/docs", addr);
        tracing::info!("Try: curl http://{}/api/v1/status", addr);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| format!("Failed to bind to {addr}: {e}"))?;

        // Run the server; this blocks until the process is killed
        axum::serve(listener, app).await?;

        drop(render_handle);
        Ok(())
    }
}
