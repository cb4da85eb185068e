use std::fs;
use std::path::{Path, PathBuf};

use cisync_core::{escape, CisyncError};
use cisync_domain::{CiObject, SyncOutcome, SyncSummary, SCHEMA_VERSION};
use cisync_export_ci::DEFAULT_INQUIRY_DELIMITER;
use cisync_mapping::TypeMap;
use cisync_transport::Transport;
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::Result;

/// Update-direction knobs, filled from `[update]` config by the CLI.
#[derive(Debug, Clone)]
pub struct UpdateOptions {
    pub inquiry_delimiter: String,
    /// Root container menu checked before a menu reset.
    pub tree_menu: String,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        UpdateOptions {
            inquiry_delimiter: DEFAULT_INQUIRY_DELIMITER.to_string(),
            tree_menu: "Tree".to_string(),
        }
    }
}

/// Read a desired-state `.ci` file. The file name is cross-checked against
/// the naming conventions; a mismatch is only a warning, the file content is
/// authoritative.
pub fn read_ci_file(path: &Path, map: &TypeMap, opts: &UpdateOptions) -> Result<CiObject> {
    let text = fs::read_to_string(path)?;
    let obj = cisync_import_ci::read_ci(&text, &opts.inquiry_delimiter)?;
    match map.kind_for_file(path) {
        Some((kind, name)) if kind != obj.kind() || name != obj.name() => {
            warn!(
                path = %path.display(),
                expected = %format!("{kind} '{name}'"),
                actual = %format!("{} '{}'", obj.kind(), obj.name()),
                "file name does not match the object it declares"
            );
        }
        None => warn!(path = %path.display(), "file name follows no known convention"),
        _ => {}
    }
    Ok(obj)
}

/// One assembled reset-plus-update command batch. Temporary files backing an
/// inquiry split live as long as the submission and are deleted on drop, on
/// every exit path.
#[derive(Debug)]
pub struct Submission {
    pub blob: String,
    pub created: bool,
    script_file: Option<NamedTempFile>,
    code_file: Option<NamedTempFile>,
}

impl Submission {
    pub fn script_path(&self) -> Option<&Path> {
        self.script_file.as_ref().map(NamedTempFile::path)
    }

    pub fn code_path(&self) -> Option<&Path> {
        self.code_file.as_ref().map(NamedTempFile::path)
    }
}

/// Validate the desired object, build the reset prefix from the current live
/// state (or a creation statement when there is none), render the script and
/// assemble the submission blob: reset statements each terminated with `;`,
/// then `extra_reset`, a blank-line terminator, then the update script.
pub fn build_submission(
    current: Option<&CiObject>,
    desired: &CiObject,
    extra_reset: &[String],
    transport: &mut dyn Transport,
    opts: &UpdateOptions,
) -> Result<Submission> {
    let msgs = cisync_validate::validate(desired);
    if cisync_validate::is_fatal(&msgs) {
        for m in msgs.iter().filter(|m| m.severity == "error") {
            warn!(kind = %m.kind, name = %m.name, category = %m.category, "{}", m.message);
        }
        return Err(CisyncError::Validation {
            kind: desired.kind().to_string(),
            name: desired.name().to_string(),
            errors: cisync_validate::error_count(&msgs),
        }
        .into());
    }

    let mut reset: Vec<String> = Vec::new();
    if let Some(cur) = current {
        if cur.kind() != desired.kind() || cur.name() != desired.name() {
            return Err(CisyncError::Other(format!(
                "live object is {} '{}', file declares {} '{}'",
                cur.kind(),
                cur.name(),
                desired.kind(),
                desired.name()
            ))
            .into());
        }
        reset = cisync_reset::build_reset(cur, &opts.tree_menu, transport)?;
    } else {
        reset.push(format!(
            "add {} \"{}\"",
            desired.kind().as_str(),
            escape(desired.name())
        ));
    }

    let script = cisync_export_ci::generate_with(desired, &opts.inquiry_delimiter)?;

    let mut blob = String::new();
    for stmt in reset.iter().chain(extra_reset.iter()) {
        let stmt = stmt.trim_end().trim_end_matches(';').trim_end();
        blob.push_str(stmt);
        blob.push_str(";\n");
    }
    blob.push('\n');

    let mut script_file = None;
    let mut code_file = None;
    let delimiter_line = format!("\n{}\n", opts.inquiry_delimiter);
    match script.split_once(&delimiter_line) {
        // Inquiry: the statement and the code body are too large/distinct to
        // inline, so each goes to its own uniquely-named temporary file and
        // the blob references them.
        Some((statement, code)) if matches!(desired, CiObject::Inquiry(_)) => {
            let code_tmp = tempfile::Builder::new()
                .prefix("cisync-code-")
                .suffix(".tcl")
                .tempfile()?;
            fs::write(code_tmp.path(), code)?;

            let mut statement = statement.trim_end().to_string();
            statement.push_str(&format!(
                " \\\n    file \"{}\"\n",
                escape(&code_tmp.path().display().to_string())
            ));
            let script_tmp = tempfile::Builder::new()
                .prefix("cisync-script-")
                .suffix(".tcl")
                .tempfile()?;
            fs::write(script_tmp.path(), statement)?;

            blob.push_str(&format!(
                "run file \"{}\";\n",
                escape(&script_tmp.path().display().to_string())
            ));
            script_file = Some(script_tmp);
            code_file = Some(code_tmp);
        }
        _ => blob.push_str(&script),
    }

    Ok(Submission {
        blob,
        created: current.is_none(),
        script_file,
        code_file,
    })
}

/// One object to synchronize: the desired `.ci` file plus, when the object
/// already exists, its current live export.
#[derive(Debug, Clone)]
pub struct SyncInput {
    pub ci_path: PathBuf,
    pub live_xml: Option<String>,
}

/// Synchronize one object end to end. Never panics and never aborts the
/// batch: every failure is folded into the outcome status.
pub fn sync_object(
    input: &SyncInput,
    map: &TypeMap,
    transport: &mut dyn Transport,
    opts: &UpdateOptions,
) -> SyncOutcome {
    let fallback = map
        .kind_for_file(&input.ci_path)
        .map(|(k, n)| (k.to_string(), n))
        .unwrap_or_else(|| (String::new(), input.ci_path.display().to_string()));

    let desired = match read_ci_file(&input.ci_path, map, opts) {
        Ok(obj) => obj,
        Err(e) => return outcome(&fallback.0, &fallback.1, "parse-error", Some(e)),
    };
    let kind = desired.kind().to_string();
    let name = desired.name().to_string();

    let current = match &input.live_xml {
        Some(xml) => match crate::export_object(xml) {
            Ok(obj) => Some(obj),
            Err(e) => return outcome(&kind, &name, "parse-error", Some(e)),
        },
        None => None,
    };

    let submission = match build_submission(current.as_ref(), &desired, &[], transport, opts) {
        Ok(s) => s,
        Err(e) => return outcome(&kind, &name, classify(&e), Some(e)),
    };

    match transport.execute(&submission.blob) {
        Ok(_) => {
            let status = if submission.created { "created" } else { "updated" };
            info!(kind = %kind, name = %name, status, "synchronized");
            outcome(&kind, &name, status, None)
        }
        Err(e) => outcome(&kind, &name, "submit-error", Some(e.into())),
    }
}

pub fn sync_batch(
    inputs: &[SyncInput],
    map: &TypeMap,
    transport: &mut dyn Transport,
    opts: &UpdateOptions,
) -> SyncSummary {
    let mut summary = SyncSummary {
        schema_version: SCHEMA_VERSION,
        ..SyncSummary::default()
    };
    for input in inputs {
        let result = sync_object(input, map, transport, opts);
        match result.status.as_str() {
            "updated" => summary.updated += 1,
            "created" => summary.created += 1,
            _ => summary.failed += 1,
        }
        summary.objects.push(result);
    }
    summary
}

fn classify(e: &color_eyre::eyre::Report) -> &'static str {
    match e.downcast_ref::<CisyncError>() {
        Some(CisyncError::Validation { .. }) => "validation-error",
        Some(CisyncError::Transport(_)) => "submit-error",
        _ => "parse-error",
    }
}

fn outcome(
    kind: &str,
    name: &str,
    status: &str,
    error: Option<color_eyre::eyre::Report>,
) -> SyncOutcome {
    if let Some(e) = &error {
        warn!(kind, name, status, "{e}");
    }
    SyncOutcome {
        kind: kind.to_string(),
        name: name.to_string(),
        status: status.to_string(),
        message: error.map(|e| format!("{e}")),
    }
}
