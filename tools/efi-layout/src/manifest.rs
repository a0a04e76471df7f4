//! Conformance manifests.
//!
//! A manifest is a TOML file of expected values:
//!
//! ```toml
//! pointer_width = 64
//!
//! [[struct]]
//! name = "EFI_TABLE_HEADER"
//! size = 24
//! align = 8
//! [struct.fields]
//! signature = 0
//! revision = 8
//!
//! [status.error]
//! EFI_BUFFER_TOO_SMALL = 5
//!
//! [guid]
//! EFI_ACPI_20_TABLE_GUID = "8868e871-e4f1-11d3-bc22-0080c73c8881"
//! ```
//!
//! Entries absent from the manifest are not checked; entries absent from the crate are
//! reported.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use efi::EfiGuid;
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, StatusClass};
use crate::verbose::vprintln;

/// Expected layout values.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Manifest {
    /// Pointer width the values were taken for.
    pub pointer_width: usize,
    /// Expected structure layouts.
    #[serde(default, rename = "struct")]
    pub structs: Vec<StructEntry>,
    /// Expected status codes by class.
    #[serde(default)]
    pub status: StatusTables,
    /// Expected GUIDs in registry format.
    #[serde(default)]
    pub guid: BTreeMap<String, String>,
}

/// One `[[struct]]` entry.
#[derive(Debug, Serialize, Deserialize)]
pub struct StructEntry {
    /// UEFI type name.
    pub name: String,
    /// Expected size in bytes.
    pub size: usize,
    /// Expected alignment, if checked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<usize>,
    /// Expected field offsets.
    #[serde(default)]
    pub fields: BTreeMap<String, usize>,
}

/// `[status.*]` tables: name to Appendix D number.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StatusTables {
    /// `EFI_SUCCESS`.
    #[serde(default)]
    pub success: BTreeMap<String, usize>,
    /// Warning codes.
    #[serde(default)]
    pub warning: BTreeMap<String, usize>,
    /// Error codes, without the high bit.
    #[serde(default)]
    pub error: BTreeMap<String, usize>,
}

/// A difference between a manifest and the compiled crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Mismatch {
    /// The manifest was written for another pointer width; nothing else was compared.
    PointerWidth {
        /// Manifest value.
        expected: usize,
        /// This build.
        actual: usize,
    },
    /// The crate has no structure of this name.
    MissingStruct {
        /// Structure name.
        name: String,
    },
    /// `size_of` differs.
    Size {
        /// Structure name.
        name: String,
        /// Manifest value.
        expected: usize,
        /// This build.
        actual: usize,
    },
    /// `align_of` differs.
    Align {
        /// Structure name.
        name: String,
        /// Manifest value.
        expected: usize,
        /// This build.
        actual: usize,
    },
    /// The structure has no field of this name.
    MissingField {
        /// Structure name.
        name: String,
        /// Field name.
        field: String,
    },
    /// A field offset differs.
    Offset {
        /// Structure name.
        name: String,
        /// Field name.
        field: String,
        /// Manifest value.
        expected: usize,
        /// This build.
        actual: usize,
    },
    /// The crate defines no status of this name.
    MissingStatus {
        /// `EFI_…` name.
        name: String,
    },
    /// The status exists but has another class or number.
    Status {
        /// `EFI_…` name.
        name: String,
        /// Manifest class and number.
        expected: (StatusClass, usize),
        /// This build.
        actual: (StatusClass, usize),
    },
    /// The crate defines no GUID of this name.
    MissingGuid {
        /// GUID name.
        name: String,
    },
    /// The manifest value is not a GUID.
    InvalidGuid {
        /// GUID name.
        name: String,
        /// Manifest text.
        value: String,
    },
    /// The GUID value differs.
    Guid {
        /// GUID name.
        name: String,
        /// Manifest value.
        expected: String,
        /// This build.
        actual: String,
    },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PointerWidth { expected, actual } => write!(
                f,
                "manifest is for {expected}-bit targets, this build is {actual}-bit"
            ),
            Self::MissingStruct { name } => write!(f, "{name}: not defined"),
            Self::Size {
                name,
                expected,
                actual,
            } => write!(f, "{name}: size {actual}, expected {expected}"),
            Self::Align {
                name,
                expected,
                actual,
            } => write!(f, "{name}: align {actual}, expected {expected}"),
            Self::MissingField { name, field } => write!(f, "{name}.{field}: no such field"),
            Self::Offset {
                name,
                field,
                expected,
                actual,
            } => write!(f, "{name}.{field}: offset {actual}, expected {expected}"),
            Self::MissingStatus { name } => write!(f, "{name}: not defined"),
            Self::Status {
                name,
                expected,
                actual,
            } => write!(
                f,
                "{name}: {:?} {}, expected {:?} {}",
                actual.0, actual.1, expected.0, expected.1
            ),
            Self::MissingGuid { name } => write!(f, "{name}: not defined"),
            Self::InvalidGuid { name, value } => write!(f, "{name}: {value:?} is not a GUID"),
            Self::Guid {
                name,
                expected,
                actual,
            } => write!(f, "{name}: {actual}, expected {expected}"),
        }
    }
}

impl Manifest {
    /// Reads and parses a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Describes `catalog` as a manifest that checks clean against it.
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let structs = catalog
            .structs
            .iter()
            .map(|s| StructEntry {
                name: s.name.to_owned(),
                size: s.size,
                align: Some(s.align),
                fields: s.fields.iter().map(|f| (f.name.to_owned(), f.offset)).collect(),
            })
            .collect();

        let mut status = StatusTables::default();
        for entry in &catalog.statuses {
            status
                .table_mut(entry.class)
                .insert(entry.name.to_owned(), entry.code);
        }

        let guid = catalog
            .guids
            .iter()
            .map(|g| (g.name.to_owned(), g.value.clone()))
            .collect();

        Self {
            pointer_width: catalog.pointer_width,
            structs,
            status,
            guid,
        }
    }

    /// Serializes to TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize manifest")
    }

    /// Compares the manifest against `catalog`.
    ///
    /// A pointer width mismatch is reported alone, since no other value would be comparable.
    pub fn check(&self, catalog: &Catalog) -> Vec<Mismatch> {
        if self.pointer_width != catalog.pointer_width {
            return vec![Mismatch::PointerWidth {
                expected: self.pointer_width,
                actual: catalog.pointer_width,
            }];
        }

        let mut out = Vec::new();
        self.check_structs(catalog, &mut out);
        self.check_statuses(catalog, &mut out);
        self.check_guids(catalog, &mut out);
        out
    }

    fn check_structs(&self, catalog: &Catalog, out: &mut Vec<Mismatch>) {
        for entry in &self.structs {
            let Some(actual) = catalog.find_struct(&entry.name) else {
                out.push(Mismatch::MissingStruct {
                    name: entry.name.clone(),
                });
                continue;
            };
            vprintln!("  {}: size {}", entry.name, actual.size);

            if actual.size != entry.size {
                out.push(Mismatch::Size {
                    name: entry.name.clone(),
                    expected: entry.size,
                    actual: actual.size,
                });
            }
            match entry.align {
                Some(align) if align != actual.align => out.push(Mismatch::Align {
                    name: entry.name.clone(),
                    expected: align,
                    actual: actual.align,
                }),
                _ => {}
            }

            for (field, &offset) in &entry.fields {
                match actual.field(field) {
                    None => out.push(Mismatch::MissingField {
                        name: entry.name.clone(),
                        field: field.clone(),
                    }),
                    Some(found) if found.offset != offset => out.push(Mismatch::Offset {
                        name: entry.name.clone(),
                        field: field.clone(),
                        expected: offset,
                        actual: found.offset,
                    }),
                    Some(_) => {}
                }
            }
        }
    }

    fn check_statuses(&self, catalog: &Catalog, out: &mut Vec<Mismatch>) {
        let tables = [
            (StatusClass::Success, &self.status.success),
            (StatusClass::Warning, &self.status.warning),
            (StatusClass::Error, &self.status.error),
        ];
        for (class, table) in tables {
            for (name, &code) in table {
                let Some(actual) = catalog.find_status(name) else {
                    out.push(Mismatch::MissingStatus { name: name.clone() });
                    continue;
                };
                vprintln!("  {name}: {:?} {}", actual.class, actual.code);
                if (actual.class, actual.code) != (class, code) {
                    out.push(Mismatch::Status {
                        name: name.clone(),
                        expected: (class, code),
                        actual: (actual.class, actual.code),
                    });
                }
            }
        }
    }

    fn check_guids(&self, catalog: &Catalog, out: &mut Vec<Mismatch>) {
        for (name, value) in &self.guid {
            let Some(actual) = catalog.find_guid(name) else {
                out.push(Mismatch::MissingGuid { name: name.clone() });
                continue;
            };
            let Ok(expected) = value.parse::<EfiGuid>() else {
                out.push(Mismatch::InvalidGuid {
                    name: name.clone(),
                    value: value.clone(),
                });
                continue;
            };
            vprintln!("  {name}: {}", actual.value);
            // Compare parsed values so upper-case manifests still match.
            if expected.to_string() != actual.value {
                out.push(Mismatch::Guid {
                    name: name.clone(),
                    expected: expected.to_string(),
                    actual: actual.value.clone(),
                });
            }
        }
    }
}

impl StatusTables {
    fn table_mut(&mut self, class: StatusClass) -> &mut BTreeMap<String, usize> {
        match class {
            StatusClass::Success => &mut self.success,
            StatusClass::Warning => &mut self.warning,
            StatusClass::Error => &mut self.error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Manifest {
        toml::from_str(text).unwrap()
    }

    fn width() -> usize {
        std::mem::size_of::<usize>() * 8
    }

    #[test]
    fn generated_manifest_checks_clean() {
        let catalog = Catalog::build();
        let manifest = Manifest::from_catalog(&catalog);
        let reparsed = parse(&manifest.to_toml().unwrap());
        assert_eq!(reparsed.structs.len(), catalog.structs.len());
        assert!(reparsed.check(&catalog).is_empty());
    }

    #[test]
    fn reports_layout_differences() {
        let manifest = parse(&format!(
            r#"
            pointer_width = {}

            [[struct]]
            name = "EFI_TABLE_HEADER"
            size = 32
            align = 8
            [struct.fields]
            signature = 0
            revision = 4
            checksum = 16

            [[struct]]
            name = "EFI_SHELL_PROTOCOL"
            size = 8
            "#,
            width()
        ));
        let mismatches = manifest.check(&Catalog::build());
        assert_eq!(
            mismatches,
            [
                Mismatch::Size {
                    name: "EFI_TABLE_HEADER".into(),
                    expected: 32,
                    actual: 24,
                },
                Mismatch::MissingField {
                    name: "EFI_TABLE_HEADER".into(),
                    field: "checksum".into(),
                },
                Mismatch::Offset {
                    name: "EFI_TABLE_HEADER".into(),
                    field: "revision".into(),
                    expected: 4,
                    actual: 8,
                },
                Mismatch::MissingStruct {
                    name: "EFI_SHELL_PROTOCOL".into(),
                },
            ]
        );
        assert_eq!(mismatches[2].to_string(), "EFI_TABLE_HEADER.revision: offset 8, expected 4");
    }

    #[test]
    fn reports_status_and_guid_differences() {
        let manifest = parse(&format!(
            r#"
            pointer_width = {}

            [status.warning]
            EFI_WARN_DELETE_FAILURE = 2
            EFI_BUFFER_TOO_SMALL = 5

            [status.error]
            EFI_NOT_FOUND = 14
            EFI_BOGUS = 99

            [guid]
            EFI_ACPI_20_TABLE_GUID = "8868E871-E4F1-11D3-BC22-0080C73C8881"
            EFI_FILE_INFO_ID = "09576e92-6d3f-11d2-8e39-00a0c969723c"
            EFI_GLOBAL_VARIABLE = "not-a-guid"
            "#,
            width()
        ));
        let mismatches = manifest.check(&Catalog::build());
        assert_eq!(
            mismatches,
            [
                Mismatch::Status {
                    name: "EFI_BUFFER_TOO_SMALL".into(),
                    expected: (StatusClass::Warning, 5),
                    actual: (StatusClass::Error, 5),
                },
                Mismatch::MissingStatus {
                    name: "EFI_BOGUS".into(),
                },
                Mismatch::Guid {
                    name: "EFI_FILE_INFO_ID".into(),
                    expected: "09576e92-6d3f-11d2-8e39-00a0c969723c".into(),
                    actual: "09576e92-6d3f-11d2-8e39-00a0c969723b".into(),
                },
                Mismatch::InvalidGuid {
                    name: "EFI_GLOBAL_VARIABLE".into(),
                    value: "not-a-guid".into(),
                },
            ]
        );
    }

    #[test]
    fn pointer_width_short_circuits() {
        let other = if width() == 64 { 32 } else { 64 };
        let manifest = parse(&format!(
            "pointer_width = {other}\n[[struct]]\nname = \"EFI_GUID\"\nsize = 99\n"
        ));
        assert_eq!(
            manifest.check(&Catalog::build()),
            [Mismatch::PointerWidth {
                expected: other,
                actual: width(),
            }]
        );
    }
}
