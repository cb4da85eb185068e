//! Flattening of an object model into attribute rows. The rows feed the CSV
//! listing and the live-vs-file diff; paths are keyed by child NAME (not
//! position) so an inserted field does not shift every row after it.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{order, AdminCommon, CiObject, Field, LinkAttrs, SCHEMA_VERSION};

/// One flattened `(attribute path, value)` row of an object model.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FlatAttr {
    pub schema_version: u32,
    pub kind: String,
    pub name: String,
    pub attr: String,
    pub value: String,
}

pub fn flatten(obj: &CiObject) -> Vec<FlatAttr> {
    let mut rows = Rows::new(obj);

    flatten_common(&mut rows, obj.common());
    if let Some(link) = obj.link() {
        flatten_link(&mut rows, link);
    }

    match obj {
        CiObject::Command(_) => {}
        CiObject::Menu(m) => {
            let ordered = m.ordered_children();
            for (idx, c) in ordered.iter().enumerate() {
                rows.push(format!("child/{} {}", c.kind.as_str(), c.name), (idx + 1).to_string());
            }
        }
        CiObject::Form(f) => {
            let ordered = f.ordered_fields();
            rows.push("field-order", join_names(ordered.iter().map(|f| f.name.as_str())));
            for field in ordered {
                flatten_field(&mut rows, "field", field);
            }
        }
        CiObject::Table(t) => {
            let ordered = t.ordered_columns();
            rows.push("column-order", join_names(ordered.iter().map(|c| c.name.as_str())));
            for column in ordered {
                flatten_field(&mut rows, "column", column);
            }
        }
        CiObject::Channel(c) => {
            rows.push("height", c.height.to_string());
            for (idx, cmd) in c.ordered_commands().iter().enumerate() {
                rows.push(format!("command/{}", cmd.name), (idx + 1).to_string());
            }
        }
        CiObject::Portal(p) => {
            for (row_idx, row) in p.grid().iter().enumerate() {
                for (col_idx, cell) in row.iter().enumerate() {
                    rows.push(
                        format!("channel/{}", cell.name),
                        format!("{},{}", row_idx + 1, col_idx + 1),
                    );
                }
            }
        }
        CiObject::Inquiry(i) => {
            rows.push("pattern", i.pattern.clone());
            rows.push("format", i.format.clone());
            rows.push("code", i.code.clone());
            for s in order::sorted_settings(&i.arguments) {
                rows.push(format!("argument/{}", s.name), s.value.clone());
            }
        }
    }

    rows.out
}

fn flatten_common(rows: &mut Rows, common: &AdminCommon) {
    if common.hidden {
        rows.push("hidden", "true".to_string());
    }
    for (k, v) in &common.settings {
        rows.push(format!("setting/{k}"), v.clone());
    }
    for p in order::sorted_properties(&common.properties) {
        let mut value = String::new();
        if let Some(t) = &p.target {
            value.push_str(&format!("to {} {}", t.kind, t.name));
        }
        if let Some(v) = &p.value {
            if !value.is_empty() {
                value.push(' ');
            }
            value.push_str(&format!("value {v}"));
        }
        rows.push(format!("property/{}", p.name), value);
    }
}

fn flatten_link(rows: &mut Rows, link: &LinkAttrs) {
    rows.push("label", link.label.clone());
    rows.push("href", link.href.clone());
    rows.push("alt", link.alt.clone());
}

fn flatten_field(rows: &mut Rows, tag: &str, f: &Field) {
    let base = format!("{tag}/{}", f.name);
    let mut put = |suffix: &str, value: String| rows.push(format!("{base}/{suffix}"), value);

    if !f.label.is_empty() {
        put("label", f.label.clone());
    }
    if !f.href.is_empty() {
        put("href", f.href.clone());
    }
    if !f.range_href.is_empty() {
        put("range", f.range_href.clone());
    }
    if !f.update_href.is_empty() {
        put("update", f.update_href.clone());
    }
    if !f.alt.is_empty() {
        put("alt", f.alt.clone());
    }
    if f.sort_type != crate::SortType::None {
        put("sorttype", f.sort_type.as_str().to_string());
    }
    if let Some(p) = &f.sort_program {
        put("sortprogram", p.clone());
    }
    if !f.geometry.is_default_size() {
        put("size", format!("{:?} {:?}", f.geometry.width, f.geometry.height));
    }
    if !f.geometry.is_default_minsize() {
        put("minsize", format!("{:?} {:?}", f.geometry.min_width, f.geometry.min_height));
    }
    if f.geometry.auto_height {
        put("autoheight", "true".to_string());
    }
    if f.geometry.auto_width {
        put("autowidth", "true".to_string());
    }
    if let Some(s) = f.scale {
        put("scale", s.to_string());
    }
    if f.editable {
        put("editable", "true".to_string());
    }
    if f.hidden {
        put("hidden", "true".to_string());
    }
    for s in order::sorted_settings(&f.settings) {
        rows.push(format!("{base}/setting/{}", s.name), s.value.clone());
    }
}

fn join_names<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.collect::<Vec<_>>().join(" | ")
}

struct Rows {
    kind: String,
    name: String,
    out: Vec<FlatAttr>,
}

impl Rows {
    fn new(obj: &CiObject) -> Self {
        Rows {
            kind: obj.kind().to_string(),
            name: obj.name().to_string(),
            out: Vec::new(),
        }
    }

    fn push(&mut self, attr: impl Into<String>, value: String) {
        self.out.push(FlatAttr {
            schema_version: SCHEMA_VERSION,
            kind: self.kind.clone(),
            name: self.name.clone(),
            attr: attr.into(),
            value,
        });
    }
}
