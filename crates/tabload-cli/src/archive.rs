//! Archive sources: where raw extracts and their period come from.
//!
//! The engine never parses archive names itself; this module is the
//! collaborator that supplies extract bytes and the period suffix.

use std::fs;
use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;

/// One raw extract handed to the engine.
#[derive(Debug, Clone)]
pub struct RawExtract {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// `YYYY-MM` from an archive or directory name, as the `YYYY_MM`
/// table-name suffix.
pub fn period_from_name(name: &str) -> Option<String> {
    static PERIOD: OnceLock<Regex> = OnceLock::new();
    let re = PERIOD.get_or_init(|| {
        Regex::new(r"(\d{4})-(\d{2})").expect("period pattern is valid")
    });
    let caps = re.captures(name)?;
    Some(format!("{}_{}", &caps[1], &caps[2]))
}

/// Hidden and system files are never data; only `.txt` entries are.
fn should_process(name: &str) -> bool {
    if name.starts_with('.') || name.starts_with('~') {
        return false;
    }
    name.ends_with(".txt")
}

/// Read every data extract from a directory of loose `.txt` files,
/// in name order.
pub fn read_directory(dir: &Path) -> Result<Vec<RawExtract>> {
    let mut extracts = Vec::new();
    let entries =
        fs::read_dir(dir).with_context(|| format!("cannot read input directory {}", dir.display()))?;
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if !entry.path().is_file() || !should_process(&name) {
            continue;
        }
        // An unreadable file aborts that extract only, never the run.
        match fs::read(entry.path()) {
            Ok(bytes) => extracts.push(RawExtract { file_name: name, bytes }),
            Err(err) => {
                log::error!("skipping unreadable extract {}: {}", entry.path().display(), err);
            }
        }
    }
    extracts.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(extracts)
}

/// Read every `.txt` entry from a zip archive, in name order.
/// Directory prefixes inside the archive are dropped.
pub fn read_zip(path: &Path) -> Result<Vec<RawExtract>> {
    let file =
        fs::File::open(path).with_context(|| format!("cannot open archive {}", path.display()))?;
    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("cannot read archive {}", path.display()))?;

    let mut extracts = Vec::new();
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .with_context(|| format!("cannot read entry {} of {}", index, path.display()))?;
        if !entry.is_file() {
            continue;
        }
        let name = match Path::new(entry.name()).file_name() {
            Some(name) => name.to_string_lossy().to_string(),
            None => continue,
        };
        if !should_process(&name) {
            continue;
        }
        let mut bytes = Vec::new();
        match entry.read_to_end(&mut bytes) {
            Ok(_) => extracts.push(RawExtract { file_name: name, bytes }),
            Err(err) => {
                log::error!("skipping unreadable entry {} in {}: {}", name, path.display(), err);
            }
        }
    }
    extracts.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(extracts)
}
