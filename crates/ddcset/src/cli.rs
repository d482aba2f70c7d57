//! Argument parsing (spec.md §6, "CLI surface").

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::selector::Selector;

#[derive(Parser, Debug)]
#[command(name = "ddcset", about = "Query and set DDC/CI VCP features on attached monitors", version)]
pub struct Cli {
    /// Read back and compare after every `setvcp` (overrides the config
    /// file default for this invocation).
    #[arg(long, global = true, conflicts_with = "noverify")]
    pub verify: bool,
    /// Skip the read-back comparison after `setvcp`.
    #[arg(long, global = true)]
    pub noverify: bool,
    /// Synthesize a transient reference for selectors with direct transport
    /// coordinates (`--bus`, `--adl`, `--usb`) instead of requiring the
    /// display to have been found during detection (spec.md §4.6).
    #[arg(long, global = true)]
    pub force: bool,
    /// Use the `I2C_RDWR` ioctl transfer strategy instead of plain file I/O
    /// for the I2C transport (spec.md §4.1).
    #[arg(long, global = true)]
    pub ioctl: bool,
    /// Path to a `ddcset.toml` config file, overriding the XDG default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List displays found during detection and whether DDC is working.
    Detect,
    /// Retrieve and print the capability string.
    Capabilities {
        #[command(flatten)]
        selector: Selector,
    },
    /// Read one or more VCP features.
    Getvcp {
        #[command(flatten)]
        selector: Selector,
        /// Hex feature codes to read, or the keyword `common` for a small
        /// built-in subset (brightness, contrast, input source).
        #[arg(default_values_t = vec!["common".to_string()])]
        features: Vec<String>,
        /// Treat every listed feature as a table feature.
        #[arg(long)]
        table: bool,
    },
    /// Write one VCP feature.
    Setvcp {
        #[command(flatten)]
        selector: Selector,
        /// Hex feature code.
        feature: String,
        /// New value: a decimal integer, or (with `--table`) a hex byte string.
        value: String,
        /// Treat the feature as a table feature.
        #[arg(long)]
        table: bool,
    },
    /// Write the selected display's current VCP values to a profile file.
    Dumpvcp {
        #[command(flatten)]
        selector: Selector,
        file: PathBuf,
        /// Hex feature codes to dump, or the keyword `common` (default).
        #[arg(default_values_t = vec!["common".to_string()])]
        features: Vec<String>,
    },
    /// Replay a profile file's VCP values onto the selected display.
    Loadvcp {
        #[command(flatten)]
        selector: Selector,
        file: PathBuf,
    },
    /// Print diagnostic information: retry and sleep statistics, build
    /// configuration, and transport availability.
    #[command(alias = "interrogate")]
    Environment,
}
