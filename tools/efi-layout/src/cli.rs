//! Command-line interface definitions for efi-layout.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Inspects the binary layout of the `efi` crate.
#[derive(Parser)]
#[command(name = "efi-layout", version, about)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Output format. `json` implies `--quiet`.
    #[arg(long, value_enum, default_value_t = Format::Text, global = true)]
    pub format: Format,

    /// Print only mismatches.
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print every compared entry.
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Command {
    /// Print the structure layouts, status codes and GUIDs compiled into the crate.
    List(ListArgs),
    /// Compare the compiled crate against a manifest; exits non-zero on mismatch.
    Check(CheckArgs),
    /// Write a manifest describing the compiled crate.
    Manifest(ManifestArgs),
    /// Decode a raw `EFI_STATUS` value.
    Status(StatusArgs),
}

/// Arguments for the `list` subcommand.
#[derive(Parser)]
pub struct ListArgs {
    /// Only list structures whose name contains this string.
    #[arg(long)]
    pub filter: Option<String>,
}

/// Arguments for the `check` subcommand.
#[derive(Parser)]
pub struct CheckArgs {
    /// Manifest to compare against.
    pub manifest: PathBuf,
}

/// Arguments for the `manifest` subcommand.
#[derive(Parser)]
pub struct ManifestArgs {
    /// Write to this file instead of stdout.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

/// Arguments for the `status` subcommand.
#[derive(Parser)]
pub struct StatusArgs {
    /// The value, in decimal or with a `0x` prefix.
    pub value: String,
}

/// Report format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Human-readable tables.
    Text,
    /// JSON, one document per invocation.
    Json,
}
