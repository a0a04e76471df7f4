//! efi-layout: checks the compiled `efi` crate against a conformance manifest.
//!
//! The crate asserts its own layouts at compile time; this tool makes the same numbers
//! visible, diffable and checkable against an independently written manifest
//! (`reference.toml`) in CI.

mod catalog;
mod cli;
mod manifest;
mod render;
mod verbose;

use std::io::Write as _;

use anyhow::{Context, Result, bail};
use clap::Parser;

use catalog::Catalog;
use cli::{CheckArgs, Format, ListArgs, ManifestArgs, StatusArgs};
use manifest::Manifest;
use verbose::dprintln;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    // JSON reports own stdout; progress lines would corrupt the document.
    verbose::init(cli.quiet || cli.format == Format::Json, cli.verbose);

    match cli.command {
        cli::Command::List(ref args) => cmd_list(args, cli.format),
        cli::Command::Check(ref args) => cmd_check(args, cli.format),
        cli::Command::Manifest(ref args) => cmd_manifest(args),
        cli::Command::Status(ref args) => cmd_status(args, cli.format),
    }
}

fn emit(text: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text.as_bytes()).context("failed to write to stdout")?;
    if !text.ends_with('\n') {
        writeln!(stdout).context("failed to write to stdout")?;
    }
    Ok(())
}

fn cmd_list(args: &ListArgs, format: Format) -> Result<()> {
    let mut catalog = Catalog::build();
    if let Some(ref filter) = args.filter {
        catalog.retain_matching(filter);
    }
    emit(&render::catalog(&catalog, format)?)
}

fn cmd_check(args: &CheckArgs, format: Format) -> Result<()> {
    let manifest = Manifest::load(&args.manifest)?;
    let catalog = Catalog::build();
    let mismatches = manifest.check(&catalog);

    let report = render::mismatches(&mismatches, format)?;
    if format == Format::Json || !report.is_empty() {
        emit(&report)?;
    }

    let statuses = manifest.status.success.len()
        + manifest.status.warning.len()
        + manifest.status.error.len();
    dprintln!(
        "checked {} structures, {} status codes, {} guids against {}",
        manifest.structs.len(),
        statuses,
        manifest.guid.len(),
        args.manifest.display()
    );

    if !mismatches.is_empty() {
        bail!("{} mismatch(es)", mismatches.len());
    }
    Ok(())
}

fn cmd_manifest(args: &ManifestArgs) -> Result<()> {
    let text = Manifest::from_catalog(&Catalog::build()).to_toml()?;
    match args.output {
        Some(ref path) => std::fs::write(path, text)
            .with_context(|| format!("failed to write {}", path.display())),
        None => emit(&text),
    }
}

fn cmd_status(args: &StatusArgs, format: Format) -> Result<()> {
    let value = parse_value(&args.value)?;
    emit(&render::status(&render::DecodedStatus::new(value), format)?)
}

fn parse_value(text: &str) -> Result<usize> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(&hex.replace('_', ""), 16),
        None => text.replace('_', "").parse(),
    };
    parsed.with_context(|| format!("invalid status value {text:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_values() {
        assert_eq!(parse_value("14").unwrap(), 14);
        assert_eq!(parse_value("0x8000_0000").unwrap(), 0x8000_0000);
        assert_eq!(parse_value("0XFF").unwrap(), 255);
        assert!(parse_value("0xzz").is_err());
        assert!(parse_value("").is_err());
    }
}
