use std::fs;
use std::path::Path;

use cisync_domain::{HealthIssue, HealthReport, SCHEMA_VERSION};
use cisync_mapping::TypeMap;
use tracing::debug;

use crate::{Result, UpdateOptions};

/// Walk a CI tree, parse and validate every `.ci` file, and collect issues.
/// Informational validation messages are not issues.
pub fn health_scan(dir: &Path, map: &TypeMap, opts: &UpdateOptions) -> Result<HealthReport> {
    let mut report = HealthReport {
        schema_version: SCHEMA_VERSION,
        ..HealthReport::default()
    };
    for entry in walkdir::WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(file) = path.file_name().and_then(|f| f.to_str()) else {
            continue;
        };
        if !file.ends_with(map.suffix()) {
            continue;
        }
        report.checked += 1;
        debug!(path = %path.display(), "health check");

        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) => {
                push(&mut report, path, "io", format!("{e}"));
                continue;
            }
        };
        let obj = match cisync_import_ci::read_ci(&text, &opts.inquiry_delimiter) {
            Ok(obj) => obj,
            Err(e) => {
                push(&mut report, path, "parse", format!("{e}"));
                continue;
            }
        };
        for m in cisync_validate::validate(&obj) {
            if m.severity != "info" {
                push(&mut report, path, &m.category, m.message);
            }
        }
    }
    Ok(report)
}

fn push(report: &mut HealthReport, path: &Path, category: &str, error: String) {
    report.issues.push(HealthIssue {
        path: path.display().to_string(),
        category: category.to_string(),
        error,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_files_and_collects_issues() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join("command_Good.ci"),
            "mod command \"Good\" \\\n    label \"L\" \\\n    href \"\" \\\n    alt \"\"\n",
        )
        .unwrap();
        fs::write(tmp.path().join("command_Bad.ci"), "mod command \"Bad\" \\\n    what\n").unwrap();
        fs::write(tmp.path().join("README.md"), "not a ci file").unwrap();

        let report =
            health_scan(tmp.path(), &TypeMap::default(), &UpdateOptions::default()).unwrap();
        assert_eq!(report.schema_version, SCHEMA_VERSION);
        assert_eq!(report.checked, 2);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].category, "parse");
        assert!(report.issues[0].path.contains("command_Bad.ci"));
    }
}
