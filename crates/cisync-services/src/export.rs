use std::fs;
use std::path::{Path, PathBuf};

use cisync_domain::CiObject;
use cisync_mapping::TypeMap;
use tracing::{info, warn};

use crate::Result;

/// Parse one live export XML document into a typed admin object.
pub fn export_object(xml: &str) -> Result<CiObject> {
    cisync_parsers_xml::parse_export(xml)
}

/// Live export XML straight to canonical `.ci` text.
pub fn export_to_string(xml: &str, inquiry_delimiter: &str) -> Result<String> {
    let obj = cisync_parsers_xml::parse_export(xml)?;
    Ok(cisync_export_ci::generate_with(&obj, inquiry_delimiter)?)
}

/// Convert every export XML under `in_dir` into a `.ci` file under `out_dir`,
/// laid out by kind per the naming conventions. One bad export is logged and
/// skipped; the rest of the batch proceeds.
pub fn export_dir(
    in_dir: &Path,
    out_dir: &Path,
    map: &TypeMap,
    inquiry_delimiter: &str,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for entry in walkdir::WalkDir::new(in_dir).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("xml") {
            continue;
        }
        let xml = fs::read_to_string(path)?;
        let obj = match cisync_parsers_xml::parse_export(&xml) {
            Ok(obj) => obj,
            Err(e) => {
                warn!(path = %path.display(), "skipping export: {e}");
                continue;
            }
        };
        let script = match cisync_export_ci::generate_with(&obj, inquiry_delimiter) {
            Ok(s) => s,
            Err(e) => {
                warn!(path = %path.display(), "skipping export: {e}");
                continue;
            }
        };
        let dir = out_dir.join(map.dir_name(obj.kind()));
        fs::create_dir_all(&dir)?;
        let out_path = dir.join(map.ci_file_name(obj.kind(), obj.name()));
        fs::write(&out_path, script)?;
        info!(kind = %obj.kind(), name = %obj.name(), path = %out_path.display(), "exported");
        written.push(out_path);
    }
    Ok(written)
}
