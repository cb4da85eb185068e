//! Read-only lookup from admin kinds to live-system names and `.ci` file
//! conventions. Defaults are a compile-time table; the `[mapping]` config
//! section may override the suffix and per-kind prefixes.

use std::collections::BTreeMap;
use std::path::Path;

use cisync_domain::Kind;
use once_cell::sync::Lazy;

const DEFAULT_SUFFIX: &str = ".ci";

/// Naming conventions for one kind.
#[derive(Debug, Clone)]
struct MapEntry {
    kind: Kind,
    /// Name of the administrative type in the live system.
    admin_name: &'static str,
    /// Default file prefix, e.g. `command_` for `command_Search.ci`.
    prefix: &'static str,
    /// Per-kind directory under the CI tree.
    dir: &'static str,
}

static DEFAULT_ENTRIES: Lazy<Vec<MapEntry>> = Lazy::new(|| {
    Kind::ALL
        .iter()
        .map(|&kind| MapEntry {
            kind,
            admin_name: kind.as_str(),
            prefix: match kind {
                Kind::Command => "command_",
                Kind::Menu => "menu_",
                Kind::Form => "form_",
                Kind::Table => "table_",
                Kind::Channel => "channel_",
                Kind::Portal => "portal_",
                Kind::Inquiry => "inquiry_",
            },
            dir: match kind {
                Kind::Command => "commands",
                Kind::Menu => "menus",
                Kind::Form => "forms",
                Kind::Table => "tables",
                Kind::Channel => "channels",
                Kind::Portal => "portals",
                Kind::Inquiry => "inquiries",
            },
        })
        .collect()
});

#[derive(Debug, Clone)]
pub struct TypeMap {
    suffix: String,
    prefixes: BTreeMap<Kind, String>,
}

impl Default for TypeMap {
    fn default() -> Self {
        TypeMap {
            suffix: DEFAULT_SUFFIX.to_string(),
            prefixes: DEFAULT_ENTRIES
                .iter()
                .map(|e| (e.kind, e.prefix.to_string()))
                .collect(),
        }
    }
}

impl TypeMap {
    /// Defaults plus config overrides. `prefixes` keys are kind names; unknown
    /// keys are ignored (forward compatibility with other admin kinds).
    pub fn with_overrides(suffix: Option<&str>, prefixes: &BTreeMap<String, String>) -> Self {
        let mut map = TypeMap::default();
        if let Some(s) = suffix {
            map.suffix = s.to_string();
        }
        for (key, prefix) in prefixes {
            if let Ok(kind) = key.parse::<Kind>() {
                map.prefixes.insert(kind, prefix.clone());
            }
        }
        map
    }

    /// Live-system administrative type name for a kind.
    pub fn admin_name(&self, kind: Kind) -> &'static str {
        entry(kind).admin_name
    }

    /// Directory the kind's CI files live under.
    pub fn dir_name(&self, kind: Kind) -> &'static str {
        entry(kind).dir
    }

    /// Canonical file name for one object, `<prefix><name><suffix>`.
    pub fn ci_file_name(&self, kind: Kind, object: &str) -> String {
        format!("{}{}{}", self.prefixes[&kind], object, self.suffix)
    }

    /// Recover `(kind, object name)` from a file path by its naming
    /// convention. `None` when the file follows no known convention.
    pub fn kind_for_file(&self, path: &Path) -> Option<(Kind, String)> {
        let file = path.file_name()?.to_str()?;
        let stem = file.strip_suffix(self.suffix.as_str())?;
        for kind in Kind::ALL {
            if let Some(name) = stem.strip_prefix(self.prefixes[&kind].as_str()) {
                if !name.is_empty() {
                    return Some((kind, name.to_string()));
                }
            }
        }
        None
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

fn entry(kind: Kind) -> &'static MapEntry {
    DEFAULT_ENTRIES
        .iter()
        .find(|e| e.kind == kind)
        .expect("every kind has a default entry")
}
