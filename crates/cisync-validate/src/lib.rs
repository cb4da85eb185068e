use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;

use cisync_core::is_escapable;
use cisync_domain::{CiObject, Field, ValidationMsg, SCHEMA_VERSION};
use regex::Regex;

/// Проверки перед обновлением. Направление строгое: любое сообщение уровня
/// "error" блокирует отправку этого объекта.
///
/// Категории: "control-char" | "empty-name" | "duplicate-child" |
/// "grid-overlap" | "macro-check".
pub fn validate(obj: &CiObject) -> Vec<ValidationMsg> {
    let mut v = Validator::new(obj);

    v.check_value("name", obj.name());
    if obj.name().is_empty() {
        v.error("empty-name", "object has no name".to_string());
    }

    if let Some(link) = obj.link() {
        v.check_value("label", &link.label);
        v.check_value("href", &link.href);
        v.check_value("alt", &link.alt);
        v.check_macros("href", &link.href);
    }
    for (k, val) in &obj.common().settings {
        v.check_value(&format!("setting {k}"), k);
        v.check_value(&format!("setting {k}"), val);
    }
    for p in &obj.common().properties {
        v.check_value(&format!("property {}", p.name), &p.name);
        if let Some(t) = &p.target {
            v.check_value(&format!("property {} target", p.name), &t.name);
        }
        if let Some(val) = &p.value {
            v.check_value(&format!("property {} value", p.name), val);
        }
    }

    match obj {
        CiObject::Command(_) => {}
        CiObject::Menu(m) => {
            v.check_children("child", m.children.iter().map(|c| c.name.as_str()));
        }
        CiObject::Form(f) => v.check_fields("field", &f.fields),
        CiObject::Table(t) => v.check_fields("column", &t.columns),
        CiObject::Channel(c) => {
            v.check_children("command", c.commands.iter().map(|c| c.name.as_str()));
        }
        CiObject::Portal(p) => {
            v.check_children("channel", p.channels.iter().map(|c| c.name.as_str()));
            let mut cells: HashMap<(i64, i64), &str> = HashMap::new();
            for c in &p.channels {
                if let Some(prev) = cells.insert((c.row, c.col), &c.name) {
                    v.warn(
                        "grid-overlap",
                        format!(
                            "channels '{prev}' and '{}' share cell ({}, {})",
                            c.name, c.row, c.col
                        ),
                    );
                }
            }
        }
        CiObject::Inquiry(i) => {
            v.check_value("pattern", &i.pattern);
            v.check_value("format", &i.format);
            for a in &i.arguments {
                v.check_value(&format!("argument {}", a.name), &a.name);
                v.check_value(&format!("argument {}", a.name), &a.value);
            }
            // inquiry code travels in its own file, never through the escaper
        }
    }

    v.out
}

pub fn is_fatal(msgs: &[ValidationMsg]) -> bool {
    msgs.iter().any(|m| m.severity == "error")
}

pub fn error_count(msgs: &[ValidationMsg]) -> usize {
    msgs.iter().filter(|m| m.severity == "error").count()
}

fn macro_re() -> &'static Regex {
    static MACRO_RE: OnceLock<Regex> = OnceLock::new();
    MACRO_RE.get_or_init(|| Regex::new(r"\$\{[^}]+\}").unwrap())
}

struct Validator {
    kind: String,
    name: String,
    out: Vec<ValidationMsg>,
}

impl Validator {
    fn new(obj: &CiObject) -> Self {
        Validator {
            kind: obj.kind().to_string(),
            name: obj.name().to_string(),
            out: Vec::new(),
        }
    }

    fn push(&mut self, severity: &str, category: &str, message: String) {
        self.out.push(ValidationMsg {
            schema_version: SCHEMA_VERSION,
            severity: severity.to_string(),
            category: category.to_string(),
            kind: self.kind.clone(),
            name: self.name.clone(),
            message,
        });
    }

    fn error(&mut self, category: &str, message: String) {
        self.push("error", category, message);
    }

    fn warn(&mut self, category: &str, message: String) {
        self.push("warning", category, message);
    }

    fn info(&mut self, category: &str, message: String) {
        self.push("info", category, message);
    }

    fn check_value(&mut self, what: &str, value: &str) {
        if !is_escapable(value) {
            self.error(
                "control-char",
                format!("{what} contains control characters the script syntax cannot carry"),
            );
        }
    }

    fn check_macros(&mut self, what: &str, value: &str) {
        let found: BTreeSet<String> = macro_re()
            .find_iter(value)
            .map(|m| m.as_str().to_string())
            .collect();
        if !found.is_empty() {
            let list: Vec<String> = found.into_iter().collect();
            self.info("macro-check", format!("{what} uses macros: {}", list.join(" ")));
        }
    }

    fn check_children<'a>(&mut self, what: &str, names: impl Iterator<Item = &'a str>) {
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        for name in names {
            if name.is_empty() {
                self.error("empty-name", format!("{what} reference has no name"));
            } else if !seen.insert(name) {
                self.warn("duplicate-child", format!("duplicate {what} '{name}'"));
            }
            self.check_value(&format!("{what} name"), name);
        }
    }

    fn check_fields(&mut self, what: &str, fields: &[Field]) {
        self.check_children(what, fields.iter().map(|f| f.name.as_str()));
        for f in fields {
            let ctx = format!("{what} {}", f.name);
            self.check_value(&ctx, &f.label);
            self.check_value(&ctx, &f.href);
            self.check_value(&ctx, &f.range_href);
            self.check_value(&ctx, &f.update_href);
            self.check_value(&ctx, &f.alt);
            if let Some(p) = &f.sort_program {
                self.check_value(&ctx, p);
            }
            for s in &f.settings {
                self.check_value(&format!("{ctx} setting {}", s.name), &s.name);
                self.check_value(&format!("{ctx} setting {}", s.name), &s.value);
            }
            self.check_macros(&ctx, &f.href);
            self.check_macros(&ctx, &f.range_href);
            self.check_macros(&ctx, &f.update_href);
        }
    }
}
