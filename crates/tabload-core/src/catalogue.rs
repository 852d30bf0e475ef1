//! Type Catalogue: authoritative column-name → declared-type mapping
//! merged from description files.
//!
//! Built once per run and read-only afterwards; the resolver receives
//! it by reference. Callers never need to know whether the
//! authoritative spelling of a name uses underscores or hyphens,
//! since both are stored.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;

/// Join-key names that must carry a single physical type across every
/// table, whatever the description files declare. Inconsistent
/// join-key types break cross-table queries.
const JOIN_KEY_ALIASES: &[&str] = &[
    "CU_NUMBER",
    "CU-NUMBER",
    "CUNUMBER",
    "JOIN_NUMBER",
    "JOIN-NUMBER",
    "JOINNUMBER",
];

/// Immutable declared-type lookup keyed by canonical-uppercased
/// column name.
#[derive(Debug, Clone, Default)]
pub struct Catalogue {
    entries: HashMap<String, String>,
}

impl Catalogue {
    /// Empty catalogue: every lookup misses and the resolver falls
    /// back entirely to statistical inference.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load and merge the given description files in order. Later
    /// files win on duplicate names. Missing files are logged and
    /// skipped; a parse error in one file does not abort the others.
    pub fn load(sources: &[PathBuf]) -> Self {
        let mut entries = HashMap::new();
        for path in sources {
            load_file(path, &mut entries);
        }
        pin_join_keys(&mut entries);
        log::info!("loaded {} column type definitions", entries.len());
        Self { entries }
    }

    /// Load from an archive-specific directory when it holds any of
    /// the expected description files, otherwise fall through to the
    /// shared directory. The fall-through is logged: a present but
    /// empty archive directory usually means a repackaged archive.
    pub fn load_with_fallback(
        archive_dir: Option<&Path>,
        shared_dir: &Path,
        file_names: &[String],
    ) -> Self {
        if let Some(dir) = archive_dir {
            if dir.is_dir() {
                let present = existing_files(dir, file_names);
                if !present.is_empty() {
                    log::info!("loading column types from {}", dir.display());
                    return Self::load(&present);
                }
                log::warn!(
                    "no description files found in {}, falling back to shared set",
                    dir.display()
                );
            } else {
                log::warn!(
                    "archive-specific directory {} not found, falling back to shared set",
                    dir.display()
                );
            }
        }
        Self::load(&existing_files(shared_dir, file_names))
    }

    /// Declared type for a column name, if the catalogue knows it.
    pub fn lookup(&self, column_name: &str) -> Option<&str> {
        self.entries
            .get(&column_name.trim().to_uppercase())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn existing_files(dir: &Path, file_names: &[String]) -> Vec<PathBuf> {
    file_names
        .iter()
        .map(|name| dir.join(name))
        .filter(|path| path.is_file())
        .collect()
}

/// Parse one description file: delimited records whose first two
/// columns are `(field_name, field_type)`, header skipped. Both the
/// exact name and its underscore/hyphen-swapped alias are stored,
/// uppercased.
fn load_file(path: &Path, entries: &mut HashMap<String, String>) {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            log::warn!("description file not found: {} ({err})", path.display());
            return;
        }
    };
    // Description files are machine-generated ASCII; a lossy scrub is
    // safer than a second encoding sweep.
    let text = String::from_utf8_lossy(&bytes);

    log::info!("loading column type definitions from {}", path.display());

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                log::error!("error parsing column types from {}: {err}", path.display());
                return;
            }
        };
        if record.len() < 2 {
            continue;
        }
        let field_name = record[0].trim().trim_matches('"');
        let field_type = record[1].trim().trim_matches('"');
        if field_name.is_empty() || field_type.is_empty() {
            continue;
        }

        entries.insert(field_name.to_uppercase(), field_type.to_string());

        if field_name.contains('_') {
            entries.insert(field_name.replace('_', "-").to_uppercase(), field_type.to_string());
        } else if field_name.contains('-') {
            entries.insert(field_name.replace('-', "_").to_uppercase(), field_type.to_string());
        }
    }
}

/// Force recognized join-key aliases to the integer class regardless
/// of what the source files declared, so tables loaded at different
/// times from possibly inconsistent description files stay joinable.
fn pin_join_keys(entries: &mut HashMap<String, String>) {
    for alias in JOIN_KEY_ALIASES {
        entries.insert((*alias).to_string(), "int".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_desc(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).expect("create description file");
        file.write_all(body.as_bytes()).expect("write description file");
        path
    }

    #[test]
    fn test_underscore_and_hyphen_spellings_resolve_identically() {
        let dir = TempDir::new().unwrap();
        let path = write_desc(
            dir.path(),
            "AcctDesc.txt",
            "FieldName,FieldType,Description\nTOTAL_ASSETS,bigint,Total assets\nACCT-010,decimal,Balance\n",
        );
        let catalogue = Catalogue::load(&[path]);

        assert_eq!(catalogue.lookup("TOTAL_ASSETS"), Some("bigint"));
        assert_eq!(catalogue.lookup("TOTAL-ASSETS"), Some("bigint"));
        assert_eq!(catalogue.lookup("ACCT-010"), Some("decimal"));
        assert_eq!(catalogue.lookup("ACCT_010"), Some("decimal"));
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let dir = TempDir::new().unwrap();
        let path = write_desc(
            dir.path(),
            "AcctDesc.txt",
            "FieldName,FieldType\nCycle_Date,smalldatetime\n",
        );
        let catalogue = Catalogue::load(&[path]);
        assert_eq!(catalogue.lookup("cycle_date"), Some("smalldatetime"));
        assert_eq!(catalogue.lookup(" CYCLE_DATE "), Some("smalldatetime"));
    }

    #[test]
    fn test_join_keys_pinned_over_declared_type() {
        let dir = TempDir::new().unwrap();
        let path = write_desc(
            dir.path(),
            "AcctDesc.txt",
            "FieldName,FieldType\nCU_NUMBER,varchar\n",
        );
        let catalogue = Catalogue::load(&[path]);
        assert_eq!(catalogue.lookup("CU_NUMBER"), Some("int"));
        assert_eq!(catalogue.lookup("CU-NUMBER"), Some("int"));
        assert_eq!(catalogue.lookup("JOIN_NUMBER"), Some("int"));
    }

    #[test]
    fn test_later_sources_win_on_duplicates() {
        let dir = TempDir::new().unwrap();
        let first = write_desc(dir.path(), "a.txt", "FieldName,FieldType\nAMT,varchar\n");
        let second = write_desc(dir.path(), "b.txt", "FieldName,FieldType\nAMT,decimal\n");
        let catalogue = Catalogue::load(&[first, second]);
        assert_eq!(catalogue.lookup("AMT"), Some("decimal"));
    }

    #[test]
    fn test_archive_directory_preferred_when_populated() {
        let archive = TempDir::new().unwrap();
        let shared = TempDir::new().unwrap();
        write_desc(archive.path(), "AcctDesc.txt", "FieldName,FieldType\nAMT,int\n");
        write_desc(shared.path(), "AcctDesc.txt", "FieldName,FieldType\nAMT,varchar\n");

        let catalogue = Catalogue::load_with_fallback(
            Some(archive.path()),
            shared.path(),
            &["AcctDesc.txt".to_string()],
        );
        assert_eq!(catalogue.lookup("AMT"), Some("int"));
    }

    #[test]
    fn test_empty_archive_directory_falls_through_to_shared() {
        let archive = TempDir::new().unwrap();
        let shared = TempDir::new().unwrap();
        write_desc(shared.path(), "AcctDesc.txt", "FieldName,FieldType\nAMT,varchar\n");

        let catalogue = Catalogue::load_with_fallback(
            Some(archive.path()),
            shared.path(),
            &["AcctDesc.txt".to_string()],
        );
        assert_eq!(catalogue.lookup("AMT"), Some("varchar"));
    }

    #[test]
    fn test_missing_everything_yields_empty_catalogue() {
        let shared = TempDir::new().unwrap();
        let catalogue =
            Catalogue::load_with_fallback(None, shared.path(), &["AcctDesc.txt".to_string()]);
        // Join-key pins are always present; nothing else is.
        assert_eq!(catalogue.lookup("TOTAL_ASSETS"), None);
        assert_eq!(catalogue.lookup("CU_NUMBER"), Some("int"));
    }
}
