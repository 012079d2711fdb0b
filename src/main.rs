//! # Posnet CLI
//!
//! Command-line interface for talking to a POSNET fiscal printer.
//!
//! ## Usage
//!
//! ```bash
//! # Read the printer's clock
//! posnet get-time
//!
//! # Sync the clock with this machine
//! posnet set-time
//!
//! # Set an explicit time
//! posnet set-time --date "2024-03-01 09:30"
//!
//! # List configured VAT rates
//! posnet vat-rates
//!
//! # Show text on the customer display
//! posnet display 1 "WELCOME"
//!
//! # Load QR code text for the next receipt
//! posnet qr "https://example.com/receipt/42"
//! ```

use std::time::Duration;

use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use posnet::{PosnetError, Printer, SerialTransport};

/// Format accepted by `set-time --date`
const CLI_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Posnet - fiscal printer utility
#[derive(Parser, Debug)]
#[command(name = "posnet")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Printer device path
    #[arg(long, default_value = "/dev/ttyUSB0", global = true)]
    device: String,

    /// Serial baud rate
    #[arg(long, default_value = "9600", global = true)]
    baud: u32,

    /// Per-read timeout in milliseconds
    #[arg(long, default_value = "1000", global = true)]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Read the printer's real-time clock
    GetTime,

    /// Set the printer's real-time clock
    SetTime {
        /// Time to set, as "YYYY-MM-DD HH:MM" (defaults to now)
        #[arg(long)]
        date: Option<String>,
    },

    /// List the printer's configured VAT rates
    VatRates,

    /// Show a line of text on the customer display
    Display {
        /// Line number on the display
        line: u8,

        /// Text to show
        text: String,

        /// Display id
        #[arg(long, default_value = "0")]
        id: u8,
    },

    /// Load text for the QR code printed with the next receipt
    Qr {
        /// Text to encode
        text: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), PosnetError> {
    let cli = Cli::parse();

    let transport = SerialTransport::open_with_baud(&cli.device, cli.baud)?;
    let mut printer = Printer::new(transport);
    printer.set_timeout(Duration::from_millis(cli.timeout_ms));

    match cli.command {
        Commands::GetTime => {
            let clock = printer.get_time()?;
            println!("{}", clock.format(CLI_TIME_FORMAT));
        }
        Commands::SetTime { date } => {
            match date {
                Some(date) => {
                    let time =
                        NaiveDateTime::parse_from_str(&date, CLI_TIME_FORMAT).map_err(|e| {
                            PosnetError::Encoding(format!("invalid --date {date:?}: {e}"))
                        })?;
                    printer.set_time(time)?;
                }
                None => printer.set_time_now()?,
            }
            println!("Clock set.");
        }
        Commands::VatRates => {
            for rate in printer.get_vat_rates()? {
                println!("{}\t{:.2}%", rate.class, rate.rate);
            }
        }
        Commands::Display { line, text, id } => {
            printer.show_on_display(id, line, &text)?;
        }
        Commands::Qr { text } => {
            printer.prepare_qr_code(&text)?;
            println!("QR code prepared.");
        }
    }

    Ok(())
}
