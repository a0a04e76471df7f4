//! Text and JSON reports.

use std::fmt::Write as _;

use anyhow::{Context, Result};
use efi::EfiStatus;
use serde::Serialize;

use crate::catalog::{Catalog, StatusClass};
use crate::cli::Format;
use crate::manifest::Mismatch;

/// A decoded `EFI_STATUS`.
#[derive(Debug, Serialize)]
pub struct DecodedStatus {
    /// The raw value.
    pub value: usize,
    /// `EFI_…` name, if defined.
    pub name: Option<&'static str>,
    /// Success, warning or error.
    pub class: StatusClass,
    /// Value with the high bit stripped.
    pub code: usize,
}

impl DecodedStatus {
    /// Decodes `value`.
    pub fn new(value: usize) -> Self {
        let status = EfiStatus(value);
        Self {
            value,
            name: status.name(),
            class: StatusClass::of(status),
            code: status.code(),
        }
    }
}

fn json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("failed to serialize report")
}

/// Renders the catalog.
pub fn catalog(catalog: &Catalog, format: Format) -> Result<String> {
    if format == Format::Json {
        return json(catalog);
    }

    let mut out = String::new();
    let _ = writeln!(out, "pointer width: {}", catalog.pointer_width);
    for s in &catalog.structs {
        let _ = writeln!(out, "\n{} (size {}, align {})", s.name, s.size, s.align);
        for f in &s.fields {
            let _ = writeln!(out, "  {:>#6x}  {}", f.offset, f.name);
        }
    }
    if !catalog.statuses.is_empty() {
        out.push_str("\nstatus codes:\n");
        for s in &catalog.statuses {
            let _ = writeln!(out, "  {:<8} {:>3}  {}", class_name(s.class), s.code, s.name);
        }
    }
    if !catalog.guids.is_empty() {
        out.push_str("\nguids:\n");
        for g in &catalog.guids {
            let _ = writeln!(out, "  {}  {}", g.value, g.name);
        }
    }
    Ok(out)
}

/// Renders the result of a check. Empty in text mode when there is nothing to report.
pub fn mismatches(mismatches: &[Mismatch], format: Format) -> Result<String> {
    if format == Format::Json {
        return json(mismatches);
    }
    let mut out = String::new();
    for m in mismatches {
        let _ = writeln!(out, "mismatch: {m}");
    }
    Ok(out)
}

/// Renders a decoded status.
pub fn status(decoded: &DecodedStatus, format: Format) -> Result<String> {
    if format == Format::Json {
        return json(decoded);
    }
    let name = decoded.name.unwrap_or("(undefined)");
    Ok(format!(
        "{:#x} {name} ({} {})\n",
        decoded.value,
        class_name(decoded.class),
        decoded.code
    ))
}

fn class_name(class: StatusClass) -> &'static str {
    match class {
        StatusClass::Success => "success",
        StatusClass::Warning => "warning",
        StatusClass::Error => "error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_error_status() {
        let decoded = DecodedStatus::new(EfiStatus::BUFFER_TOO_SMALL.0);
        assert_eq!(decoded.name, Some("EFI_BUFFER_TOO_SMALL"));
        assert_eq!(decoded.class, StatusClass::Error);
        let text = status(&decoded, Format::Text).unwrap();
        assert!(text.ends_with(" EFI_BUFFER_TOO_SMALL (error 5)\n"), "{text}");
    }

    #[test]
    fn undefined_warning() {
        let decoded = DecodedStatus::new(200);
        assert_eq!(
            status(&decoded, Format::Text).unwrap(),
            "0xc8 (undefined) (warning 200)\n"
        );
        let json: serde_json::Value =
            serde_json::from_str(&status(&decoded, Format::Json).unwrap()).unwrap();
        assert_eq!(json["class"], "warning");
        assert!(json["name"].is_null());
    }

    #[test]
    fn filtered_catalog_text() {
        let mut catalog = Catalog::build();
        catalog.retain_matching("input_key");
        let text = super::catalog(&catalog, Format::Text).unwrap();
        assert!(text.contains("EFI_INPUT_KEY (size 4, align 2)"));
        assert!(text.contains("     0x2  unicode_char"));
        assert!(!text.contains("status codes:"));
        assert!(!text.contains("guids:"));
    }

    #[test]
    fn mismatch_report() {
        let found = [Mismatch::MissingStruct {
            name: "EFI_SHELL_PROTOCOL".into(),
        }];
        assert_eq!(
            mismatches(&found, Format::Text).unwrap(),
            "mismatch: EFI_SHELL_PROTOCOL: not defined\n"
        );
        let json: serde_json::Value =
            serde_json::from_str(&mismatches(&found, Format::Json).unwrap()).unwrap();
        assert_eq!(json[0]["kind"], "missing_struct");
        assert!(mismatches(&[], Format::Text).unwrap().is_empty());
    }
}
