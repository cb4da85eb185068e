use std::collections::BTreeMap;

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CisyncConfig {
    /// Row limit for console listings (scan/diff output).
    pub list_limit: Option<usize>,
    pub export: Option<ExportCfg>,
    pub update: Option<UpdateCfg>,
    pub diff: Option<DiffCfg>,
    pub mapping: Option<MappingCfg>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportCfg {
    pub out_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCfg {
    /// Line separating an inquiry statement from its embedded code body.
    pub inquiry_delimiter: Option<String>,
    /// Name of the root container menu checked before a menu reset.
    pub tree_menu: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiffCfg {
    /// Print every row, ignoring `list_limit`.
    pub full: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MappingCfg {
    pub suffix: Option<String>,
    /// Kind name -> file prefix overrides.
    pub prefixes: Option<BTreeMap<String, String>>,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("{0}")]
    Other(String),
}

pub fn load_config() -> Result<CisyncConfig, ConfigError> {
    // Search order: CWD/cisync.toml, then <config dir>/cisync/cisync.toml.
    let mut merged = CisyncConfig::default();
    if let Ok(p) = std::env::current_dir() {
        let path = p.join("cisync.toml");
        if let Ok(s) = std::fs::read_to_string(&path) {
            if let Ok(cfg) = toml::from_str::<CisyncConfig>(&s) {
                merged = merge(merged, cfg);
            }
        }
    }
    if let Some(base) = dirs::config_dir() {
        let path = base.join("cisync").join("cisync.toml");
        if let Ok(s) = std::fs::read_to_string(&path) {
            if let Ok(cfg) = toml::from_str::<CisyncConfig>(&s) {
                merged = merge(merged, cfg);
            }
        }
    }
    Ok(merged)
}

fn merge(mut a: CisyncConfig, b: CisyncConfig) -> CisyncConfig {
    if a.list_limit.is_none() {
        a.list_limit = b.list_limit;
    }
    a.export = merge_opt(a.export, b.export, merge_export);
    a.update = merge_opt(a.update, b.update, merge_update);
    a.diff = merge_opt(a.diff, b.diff, merge_diff);
    a.mapping = merge_opt(a.mapping, b.mapping, merge_mapping);
    a
}

fn merge_opt<T: Default>(a: Option<T>, b: Option<T>, f: fn(T, T) -> T) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(f(a, b)),
        (None, Some(b)) => Some(b),
        (Some(a), None) => Some(a),
        (None, None) => None,
    }
}

fn merge_export(mut a: ExportCfg, b: ExportCfg) -> ExportCfg {
    if a.out_dir.is_none() {
        a.out_dir = b.out_dir;
    }
    a
}

fn merge_update(mut a: UpdateCfg, b: UpdateCfg) -> UpdateCfg {
    if a.inquiry_delimiter.is_none() {
        a.inquiry_delimiter = b.inquiry_delimiter;
    }
    if a.tree_menu.is_none() {
        a.tree_menu = b.tree_menu;
    }
    a
}

fn merge_diff(mut a: DiffCfg, b: DiffCfg) -> DiffCfg {
    if a.full.is_none() {
        a.full = b.full;
    }
    a
}

fn merge_mapping(mut a: MappingCfg, b: MappingCfg) -> MappingCfg {
    if a.suffix.is_none() {
        a.suffix = b.suffix;
    }
    if a.prefixes.is_none() {
        a.prefixes = b.prefixes;
    }
    a
}
