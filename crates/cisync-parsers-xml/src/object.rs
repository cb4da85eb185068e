use cisync_core::{CisyncError, PathEvent};
use cisync_domain::{
    AdminRef, ChannelRef, Channel, ChildKind, ChildRef, CiObject, CommandRef, Field, Form,
    Inquiry, Kind, LinkAttrs, Menu, Portal, Setting, SortType, Table,
};
use tracing::warn;

// Контейнерные теги и даты экспорта не несут состояния модели.
const IGNORE_COMMON: &[&str] = &[
    "/settingList",
    "/propertyList",
    "/propertyList/property/adminRef",
    "/creationInfo",
    "/creationInfo/datetime",
    "/modificationInfo",
    "/modificationInfo/datetime",
];

const IGNORE_MENU: &[&str] = &["/commandRefList", "/menuRefList"];

const IGNORE_FORM: &[&str] = &[
    "/fieldList",
    "/fieldList/field/fieldType",
    "/fieldList/field/fieldOrder",
    "/fieldList/field/geometry",
    "/fieldList/field/settingList",
];

const IGNORE_TABLE: &[&str] = &[
    "/columnList",
    "/columnList/column/columnType",
    "/columnList/column/columnOrder",
    "/columnList/column/geometry",
    "/columnList/column/settingList",
];

const IGNORE_CHANNEL: &[&str] = &["/commandRefList"];
const IGNORE_PORTAL: &[&str] = &["/channelRefList"];
const IGNORE_INQUIRY: &[&str] = &["/argumentList"];

fn is_ignored(kind: Kind, path: &str) -> bool {
    let extra: &[&str] = match kind {
        Kind::Command => &[],
        Kind::Menu => IGNORE_MENU,
        Kind::Form => IGNORE_FORM,
        Kind::Table => IGNORE_TABLE,
        Kind::Channel => IGNORE_CHANNEL,
        Kind::Portal => IGNORE_PORTAL,
        Kind::Inquiry => IGNORE_INQUIRY,
    };
    IGNORE_COMMON.contains(&path) || extra.contains(&path)
}

/// Fold a path event stream into a typed admin object.
///
/// Collections grow append-only: a container-start event pushes a fresh
/// record, sub-paths always address the last record of their vector. Unknown
/// paths are logged and skipped; corrupt numerics and missing identity abort
/// the object.
pub fn parse_object(kind: Kind, events: &[PathEvent]) -> Result<CiObject, CisyncError> {
    let mut builder = Builder::new(kind);
    for ev in events {
        builder.apply(ev)?;
    }
    builder.finish()
}

struct Builder {
    obj: CiObject,
    /// Object-level settings in arrival order; merged into the map at finish.
    settings_raw: Vec<Setting>,
}

impl Builder {
    fn new(kind: Kind) -> Self {
        Builder {
            obj: CiObject::empty(kind),
            settings_raw: Vec::new(),
        }
    }

    fn apply(&mut self, ev: &PathEvent) -> Result<(), CisyncError> {
        let path = ev.path.as_str();
        let content = ev.content.as_deref();
        let kind = self.obj.kind();

        if is_ignored(kind, path) {
            return Ok(());
        }
        if self.apply_common(path, content)? {
            return Ok(());
        }

        let claimed = match &mut self.obj {
            CiObject::Command(o) => apply_link(&mut o.link, path, content),
            CiObject::Menu(o) => {
                apply_link(&mut o.link, path, content) || apply_menu(o, path, content)?
            }
            CiObject::Form(o) => apply_form(o, path, content)?,
            CiObject::Table(o) => apply_table(o, path, content)?,
            CiObject::Channel(o) => {
                apply_link(&mut o.link, path, content) || apply_channel(o, path, content)?
            }
            CiObject::Portal(o) => {
                apply_link(&mut o.link, path, content) || apply_portal(o, path, content)?
            }
            CiObject::Inquiry(o) => apply_inquiry(o, path, content)?,
        };

        if !claimed {
            warn!(kind = %kind, path, "unknown export path, skipping");
        }
        Ok(())
    }

    /// Paths shared by every kind: identity, the hidden flag, settings and
    /// properties.
    fn apply_common(&mut self, path: &str, content: Option<&str>) -> Result<bool, CisyncError> {
        let kind = self.obj.kind();
        let common = self.obj.common_mut();
        match path {
            "/name" => set_text(&mut common.name, content),
            "/hidden" => common.hidden = !matches!(content, Some("false")),
            "/settingList/setting" => {
                if content.is_none() {
                    self.settings_raw.push(Setting::default());
                }
            }
            "/settingList/setting/name" => {
                if let Some(v) = content {
                    match self.settings_raw.last_mut() {
                        Some(s) => s.name = v.to_string(),
                        None => return Err(structural(kind, &common.name, path)),
                    }
                }
            }
            "/settingList/setting/value" => {
                if let Some(v) = content {
                    match self.settings_raw.last_mut() {
                        Some(s) => s.value = v.to_string(),
                        None => return Err(structural(kind, &common.name, path)),
                    }
                }
            }
            "/propertyList/property" => {
                if content.is_none() {
                    common.properties.push(Default::default());
                }
            }
            "/propertyList/property/name" => {
                if let Some(v) = content {
                    match common.properties.last_mut() {
                        Some(p) => p.name = v.to_string(),
                        None => return Err(structural(kind, &common.name, path)),
                    }
                }
            }
            "/propertyList/property/value" => match common.properties.last_mut() {
                Some(p) => match content {
                    Some(v) => p.value = Some(v.to_string()),
                    // presence of the tag means the property carries a value
                    // clause, возможно пустой
                    None => {
                        if p.value.is_none() {
                            p.value = Some(String::new());
                        }
                    }
                },
                None => return Err(structural(kind, &common.name, path)),
            },
            "/propertyList/property/adminRef/adminType" => {
                if let Some(v) = content {
                    match common.properties.last_mut() {
                        Some(p) => p.target.get_or_insert_with(AdminRef::default).kind = v.to_string(),
                        None => return Err(structural(kind, &common.name, path)),
                    }
                }
            }
            "/propertyList/property/adminRef/adminName" => {
                if let Some(v) = content {
                    match common.properties.last_mut() {
                        Some(p) => p.target.get_or_insert_with(AdminRef::default).name = v.to_string(),
                        None => return Err(structural(kind, &common.name, path)),
                    }
                }
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn finish(mut self) -> Result<CiObject, CisyncError> {
        let kind = self.obj.kind();
        let common = self.obj.common_mut();
        for Setting { name, value } in self.settings_raw.drain(..) {
            if let Some(old) = common.settings.get(&name) {
                if *old != value {
                    warn!(kind = %kind, setting = %name, "duplicate setting, last value wins");
                }
            }
            common.settings.insert(name, value);
        }
        if common.name.is_empty() {
            return Err(CisyncError::Parse {
                kind: kind.as_str().to_string(),
                name: String::new(),
                message: "export carries no object name".to_string(),
            });
        }
        match &mut self.obj {
            CiObject::Form(o) => named_records(kind, &o.common.name, &o.fields, "field")?,
            CiObject::Table(o) => named_records(kind, &o.common.name, &o.columns, "column")?,
            CiObject::Inquiry(o) => {
                let trimmed = o.code.trim_end_matches(['\n', '\r']).len();
                o.code.truncate(trimmed);
            }
            _ => {}
        }
        Ok(self.obj)
    }
}

fn apply_link(link: &mut LinkAttrs, path: &str, content: Option<&str>) -> bool {
    match path {
        "/label" => set_text(&mut link.label, content),
        "/href" => set_text(&mut link.href, content),
        "/alt" => set_text(&mut link.alt, content),
        _ => return false,
    }
    true
}

fn apply_menu(o: &mut Menu, path: &str, content: Option<&str>) -> Result<bool, CisyncError> {
    match path {
        "/commandRefList/commandRef" => {
            if content.is_none() {
                o.children.push(ChildRef {
                    kind: ChildKind::Command,
                    name: String::new(),
                    order: 0,
                });
            }
        }
        "/menuRefList/menuRef" => {
            if content.is_none() {
                o.children.push(ChildRef {
                    kind: ChildKind::Menu,
                    name: String::new(),
                    order: 0,
                });
            }
        }
        "/commandRefList/commandRef/name" | "/menuRefList/menuRef/name" => {
            if let Some(v) = content {
                match o.children.last_mut() {
                    Some(c) => c.name = v.to_string(),
                    None => return Err(structural(Kind::Menu, &o.common.name, path)),
                }
            }
        }
        "/commandRefList/commandRef/order" | "/menuRefList/menuRef/order" => {
            if let Some(v) = content {
                let order = parse_i64(Kind::Menu, &o.common.name, path, v)?;
                match o.children.last_mut() {
                    Some(c) => c.order = order,
                    None => return Err(structural(Kind::Menu, &o.common.name, path)),
                }
            }
        }
        _ => return Ok(false),
    }
    Ok(true)
}

fn apply_form(o: &mut Form, path: &str, content: Option<&str>) -> Result<bool, CisyncError> {
    if let Some(sub) = record_sub(path, "/fieldList/field") {
        return apply_field_path(Kind::Form, &o.common.name, &mut o.fields, sub, path, content, false);
    }
    Ok(false)
}

fn apply_table(o: &mut Table, path: &str, content: Option<&str>) -> Result<bool, CisyncError> {
    if let Some(sub) = record_sub(path, "/columnList/column") {
        return apply_field_path(Kind::Table, &o.common.name, &mut o.columns, sub, path, content, true);
    }
    Ok(false)
}

fn apply_channel(o: &mut Channel, path: &str, content: Option<&str>) -> Result<bool, CisyncError> {
    match path {
        "/height" => {
            if let Some(v) = content {
                o.height = parse_i64(Kind::Channel, &o.common.name, path, v)?;
            }
        }
        "/commandRefList/commandRef" => {
            if content.is_none() {
                o.commands.push(CommandRef {
                    name: String::new(),
                    order: 0,
                });
            }
        }
        "/commandRefList/commandRef/name" => {
            if let Some(v) = content {
                match o.commands.last_mut() {
                    Some(c) => c.name = v.to_string(),
                    None => return Err(structural(Kind::Channel, &o.common.name, path)),
                }
            }
        }
        "/commandRefList/commandRef/order" => {
            if let Some(v) = content {
                let order = parse_i64(Kind::Channel, &o.common.name, path, v)?;
                match o.commands.last_mut() {
                    Some(c) => c.order = order,
                    None => return Err(structural(Kind::Channel, &o.common.name, path)),
                }
            }
        }
        _ => return Ok(false),
    }
    Ok(true)
}

fn apply_portal(o: &mut Portal, path: &str, content: Option<&str>) -> Result<bool, CisyncError> {
    match path {
        "/channelRefList/channelRef" => {
            if content.is_none() {
                o.channels.push(ChannelRef {
                    name: String::new(),
                    row: 0,
                    col: 0,
                });
            }
        }
        "/channelRefList/channelRef/name" => {
            if let Some(v) = content {
                match o.channels.last_mut() {
                    Some(c) => c.name = v.to_string(),
                    None => return Err(structural(Kind::Portal, &o.common.name, path)),
                }
            }
        }
        "/channelRefList/channelRef/portalRow" => {
            if let Some(v) = content {
                let row = parse_i64(Kind::Portal, &o.common.name, path, v)?;
                match o.channels.last_mut() {
                    Some(c) => c.row = row,
                    None => return Err(structural(Kind::Portal, &o.common.name, path)),
                }
            }
        }
        "/channelRefList/channelRef/portalColumn" => {
            if let Some(v) = content {
                let col = parse_i64(Kind::Portal, &o.common.name, path, v)?;
                match o.channels.last_mut() {
                    Some(c) => c.col = col,
                    None => return Err(structural(Kind::Portal, &o.common.name, path)),
                }
            }
        }
        _ => return Ok(false),
    }
    Ok(true)
}

fn apply_inquiry(o: &mut Inquiry, path: &str, content: Option<&str>) -> Result<bool, CisyncError> {
    match path {
        "/pattern" => set_text(&mut o.pattern, content),
        "/format" => set_text(&mut o.format, content),
        // code may arrive in several text/CDATA chunks
        "/code" => {
            if let Some(v) = content {
                o.code.push_str(v);
            }
        }
        "/argumentList/argument" => {
            if content.is_none() {
                o.arguments.push(Setting::default());
            }
        }
        "/argumentList/argument/name" => {
            if let Some(v) = content {
                match o.arguments.last_mut() {
                    Some(a) => a.name = v.to_string(),
                    None => return Err(structural(Kind::Inquiry, &o.common.name, path)),
                }
            }
        }
        "/argumentList/argument/value" => {
            if let Some(v) = content {
                match o.arguments.last_mut() {
                    Some(a) => a.value = v.to_string(),
                    None => return Err(structural(Kind::Inquiry, &o.common.name, path)),
                }
            }
        }
        _ => return Ok(false),
    }
    Ok(true)
}

/// Field/column sub-paths, shared between forms and tables. `sub` is `path`
/// with the record prefix stripped; the empty string is the record start.
fn apply_field_path(
    kind: Kind,
    owner: &str,
    fields: &mut Vec<Field>,
    sub: &str,
    path: &str,
    content: Option<&str>,
    table: bool,
) -> Result<bool, CisyncError> {
    if sub.is_empty() {
        if content.is_none() {
            fields.push(Field::default());
        }
        return Ok(true);
    }
    let f = match fields.last_mut() {
        Some(f) => f,
        None => return Err(structural(kind, owner, path)),
    };
    match sub {
        "/name" => set_text(&mut f.name, content),
        "/label" => set_text(&mut f.label, content),
        "/href" => set_text(&mut f.href, content),
        "/rangeHref" => set_text(&mut f.range_href, content),
        "/updateHref" => set_text(&mut f.update_href, content),
        "/alt" => set_text(&mut f.alt, content),
        "/order" => {
            if let Some(v) = content {
                f.order = parse_i64(kind, owner, path, v)?;
            }
        }
        "/sortType" => {
            if let Some(v) = content {
                match v.parse::<SortType>() {
                    Ok(st) => f.sort_type = st,
                    Err(e) => warn!(kind = %kind, path, "{e}, keeping none"),
                }
            }
        }
        "/sortProgram" => match content {
            Some(v) => f.sort_program = Some(v.to_string()),
            None => {
                if f.sort_program.is_none() {
                    f.sort_program = Some(String::new());
                }
            }
        },
        "/scale" => {
            if let Some(v) = content {
                f.scale = Some(parse_f64(kind, owner, path, v)?);
            }
        }
        "/geometry/height" => {
            if let Some(v) = content {
                f.geometry.height = parse_f64(kind, owner, path, v)?;
            }
        }
        "/geometry/width" => {
            if let Some(v) = content {
                f.geometry.width = parse_f64(kind, owner, path, v)?;
            }
        }
        "/geometry/minHeight" => {
            if let Some(v) = content {
                f.geometry.min_height = parse_f64(kind, owner, path, v)?;
            }
        }
        "/geometry/minWidth" => {
            if let Some(v) = content {
                f.geometry.min_width = parse_f64(kind, owner, path, v)?;
            }
        }
        "/geometry/autoHeight" => f.geometry.auto_height = !matches!(content, Some("false")),
        "/geometry/autoWidth" => f.geometry.auto_width = !matches!(content, Some("false")),
        "/settingList/setting" => {
            if content.is_none() {
                f.settings.push(Setting::default());
            }
        }
        "/settingList/setting/name" => {
            if let Some(v) = content {
                match f.settings.last_mut() {
                    Some(s) => s.name = v.to_string(),
                    None => return Err(structural(kind, owner, path)),
                }
            }
        }
        "/settingList/setting/value" => {
            if let Some(v) = content {
                match f.settings.last_mut() {
                    Some(s) => s.value = v.to_string(),
                    None => return Err(structural(kind, owner, path)),
                }
            }
        }
        "/editable" if table => f.editable = !matches!(content, Some("false")),
        "/hidden" if table => f.hidden = !matches!(content, Some("false")),
        _ => return Ok(false),
    }
    Ok(true)
}

fn record_sub<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let sub = path.strip_prefix(prefix)?;
    (sub.is_empty() || sub.starts_with('/')).then_some(sub)
}

fn set_text(slot: &mut String, content: Option<&str>) {
    if let Some(v) = content {
        *slot = v.to_string();
    }
}

fn structural(kind: Kind, name: &str, path: &str) -> CisyncError {
    CisyncError::Parse {
        kind: kind.as_str().to_string(),
        name: name.to_string(),
        message: format!("content at {path} before its record start"),
    }
}

fn parse_i64(kind: Kind, name: &str, path: &str, raw: &str) -> Result<i64, CisyncError> {
    raw.trim().parse::<i64>().map_err(|_| CisyncError::Parse {
        kind: kind.as_str().to_string(),
        name: name.to_string(),
        message: format!("invalid integer '{raw}' at {path}"),
    })
}

// Экспорт локализует десятичные ("1,5") — приводим к точке перед разбором.
fn parse_f64(kind: Kind, name: &str, path: &str, raw: &str) -> Result<f64, CisyncError> {
    let normalized = raw.trim().replace(',', ".");
    normalized.parse::<f64>().map_err(|_| CisyncError::Parse {
        kind: kind.as_str().to_string(),
        name: name.to_string(),
        message: format!("invalid number '{raw}' at {path}"),
    })
}

fn named_records(kind: Kind, owner: &str, fields: &[Field], what: &str) -> Result<(), CisyncError> {
    for (i, f) in fields.iter().enumerate() {
        if f.name.is_empty() {
            return Err(CisyncError::Parse {
                kind: kind.as_str().to_string(),
                name: owner.to_string(),
                message: format!("{what} {} has no name", i + 1),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(path: &str, content: Option<&str>) -> PathEvent {
        PathEvent::new(path, content)
    }

    fn scalar(path: &str, value: &str) -> [PathEvent; 2] {
        [ev(path, None), ev(path, Some(value))]
    }

    fn parse(kind: Kind, events: &[PathEvent]) -> CiObject {
        parse_object(kind, events).unwrap()
    }

    #[test]
    fn command_with_settings_and_properties() {
        let mut events = vec![];
        events.extend(scalar("/name", "Search"));
        events.extend(scalar("/label", "Open search"));
        events.extend(scalar("/href", "${ROOT}/search.jsp"));
        events.push(ev("/hidden", None));
        events.push(ev("/settingList", None));
        events.push(ev("/settingList/setting", None));
        events.extend(scalar("/settingList/setting/name", "Target Location"));
        events.extend(scalar("/settingList/setting/value", "popup"));
        events.push(ev("/settingList/setting", None));
        events.extend(scalar("/settingList/setting/name", "Access"));
        events.extend(scalar("/settingList/setting/value", "all"));
        events.push(ev("/propertyList", None));
        events.push(ev("/propertyList/property", None));
        events.extend(scalar("/propertyList/property/name", "linked form"));
        events.push(ev("/propertyList/property/adminRef", None));
        events.extend(scalar("/propertyList/property/adminRef/adminType", "form"));
        events.extend(scalar("/propertyList/property/adminRef/adminName", "SearchForm"));
        events.push(ev("/creationInfo", None));
        events.push(ev("/creationInfo/datetime", None));
        events.push(ev("/creationInfo/datetime", Some("2024-03-01 10:00:00")));

        let obj = parse(Kind::Command, &events);
        let CiObject::Command(cmd) = &obj else { panic!("not a command") };
        assert_eq!(cmd.common.name, "Search");
        assert!(cmd.common.hidden);
        assert_eq!(cmd.link.label, "Open search");
        assert_eq!(cmd.link.href, "${ROOT}/search.jsp");
        assert_eq!(cmd.link.alt, "");
        // map iteration is the canonical order
        let keys: Vec<&str> = cmd.common.settings.keys().map(String::as_str).collect();
        assert_eq!(keys, ["Access", "Target Location"]);
        assert_eq!(cmd.common.properties.len(), 1);
        let p = &cmd.common.properties[0];
        assert_eq!(p.name, "linked form");
        assert_eq!(
            p.target,
            Some(AdminRef { kind: "form".into(), name: "SearchForm".into() })
        );
        assert_eq!(p.value, None);
    }

    #[test]
    fn hidden_false_text_clears_the_flag() {
        let mut events = vec![];
        events.extend(scalar("/name", "C"));
        events.extend(scalar("/hidden", "false"));
        let obj = parse(Kind::Command, &events);
        assert!(!obj.common().hidden);
    }

    #[test]
    fn menu_children_from_both_ref_lists() {
        let mut events = vec![];
        events.extend(scalar("/name", "Main"));
        events.push(ev("/commandRefList", None));
        events.push(ev("/commandRefList/commandRef", None));
        events.extend(scalar("/commandRefList/commandRef/name", "X"));
        events.extend(scalar("/commandRefList/commandRef/order", "2"));
        events.push(ev("/menuRefList", None));
        events.push(ev("/menuRefList/menuRef", None));
        events.extend(scalar("/menuRefList/menuRef/name", "Y"));
        events.extend(scalar("/menuRefList/menuRef/order", "1"));

        let CiObject::Menu(menu) = parse(Kind::Menu, &events) else { panic!() };
        let ordered: Vec<(&str, ChildKind)> = menu
            .ordered_children()
            .iter()
            .map(|c| (c.name.as_str(), c.kind))
            .collect();
        assert_eq!(ordered, [("Y", ChildKind::Menu), ("X", ChildKind::Command)]);
    }

    #[test]
    fn form_fields_with_geometry_and_nested_settings() {
        let mut events = vec![];
        events.extend(scalar("/name", "EditPart"));
        events.push(ev("/fieldList", None));
        events.push(ev("/fieldList/field", None));
        events.extend(scalar("/fieldList/field/name", "Revision"));
        events.extend(scalar("/fieldList/field/order", "1"));
        events.extend(scalar("/fieldList/field/fieldType", "select"));
        events.extend(scalar("/fieldList/field/fieldOrder", "0"));
        events.push(ev("/fieldList/field/geometry", None));
        events.extend(scalar("/fieldList/field/geometry/height", "1,5"));
        events.push(ev("/fieldList/field/geometry/autoWidth", None));
        events.push(ev("/fieldList/field/settingList", None));
        events.push(ev("/fieldList/field/settingList/setting", None));
        events.extend(scalar("/fieldList/field/settingList/setting/name", "Editable"));
        events.extend(scalar("/fieldList/field/settingList/setting/value", "true"));

        let CiObject::Form(form) = parse(Kind::Form, &events) else { panic!() };
        assert_eq!(form.fields.len(), 1);
        let f = &form.fields[0];
        assert_eq!(f.name, "Revision");
        assert_eq!(f.geometry.height, 1.5);
        assert!(f.geometry.auto_width);
        assert!(!f.geometry.auto_height);
        assert_eq!(f.settings.len(), 1);
        assert_eq!(f.settings[0].name, "Editable");
    }

    #[test]
    fn table_columns_claim_flags() {
        let mut events = vec![];
        events.extend(scalar("/name", "PartList"));
        events.push(ev("/columnList", None));
        events.push(ev("/columnList/column", None));
        events.extend(scalar("/columnList/column/name", "Name"));
        events.extend(scalar("/columnList/column/order", "1"));
        events.push(ev("/columnList/column/editable", None));
        events.extend(scalar("/columnList/column/sortType", "alpha"));

        let CiObject::Table(table) = parse(Kind::Table, &events) else { panic!() };
        let c = &table.columns[0];
        assert!(c.editable);
        assert!(!c.hidden);
        assert_eq!(c.sort_type, SortType::Alpha);
    }

    #[test]
    fn channel_height_and_commands() {
        let mut events = vec![];
        events.extend(scalar("/name", "News"));
        events.extend(scalar("/height", "250"));
        events.push(ev("/commandRefList", None));
        events.push(ev("/commandRefList/commandRef", None));
        events.extend(scalar("/commandRefList/commandRef/name", "Refresh"));
        events.extend(scalar("/commandRefList/commandRef/order", "0"));

        let CiObject::Channel(ch) = parse(Kind::Channel, &events) else { panic!() };
        assert_eq!(ch.height, 250);
        assert_eq!(ch.commands.len(), 1);
        assert_eq!(ch.commands[0].name, "Refresh");
    }

    #[test]
    fn portal_grid_from_row_and_column_keys() {
        let mut events = vec![];
        events.extend(scalar("/name", "Home"));
        events.push(ev("/channelRefList", None));
        for (name, row, col) in [("B", "2", "1"), ("A", "1", "1"), ("C", "2", "2")] {
            events.push(ev("/channelRefList/channelRef", None));
            events.extend(scalar("/channelRefList/channelRef/name", name));
            events.extend(scalar("/channelRefList/channelRef/portalRow", row));
            events.extend(scalar("/channelRefList/channelRef/portalColumn", col));
        }

        let CiObject::Portal(portal) = parse(Kind::Portal, &events) else { panic!() };
        let grid: Vec<Vec<&str>> = portal
            .grid()
            .iter()
            .map(|row| row.iter().map(|c| c.name.as_str()).collect())
            .collect();
        assert_eq!(grid, [vec!["A"], vec!["B", "C"]]);
    }

    #[test]
    fn inquiry_trims_trailing_code_newlines() {
        let mut events = vec![];
        events.extend(scalar("/name", "FindParts"));
        events.extend(scalar("/pattern", "*"));
        events.extend(scalar("/format", "${ID}"));
        events.extend(scalar("/code", "temp query bus Part * *;\n\n"));
        events.push(ev("/argumentList", None));
        events.push(ev("/argumentList/argument", None));
        events.extend(scalar("/argumentList/argument/name", "TYPE"));
        events.extend(scalar("/argumentList/argument/value", "Part"));

        let CiObject::Inquiry(inq) = parse(Kind::Inquiry, &events) else { panic!() };
        assert_eq!(inq.code, "temp query bus Part * *;");
        assert_eq!(inq.pattern, "*");
        assert_eq!(inq.arguments[0].name, "TYPE");
    }

    #[test]
    fn unknown_path_is_skipped() {
        let mut events = vec![];
        events.extend(scalar("/name", "C"));
        events.extend(scalar("/futureAttribute", "whatever"));
        let obj = parse(Kind::Command, &events);
        assert_eq!(obj.name(), "C");
    }

    #[test]
    fn malformed_order_is_fatal() {
        let mut events = vec![];
        events.extend(scalar("/name", "Main"));
        events.push(ev("/commandRefList/commandRef", None));
        events.extend(scalar("/commandRefList/commandRef/name", "X"));
        events.extend(scalar("/commandRefList/commandRef/order", "second"));
        let err = parse_object(Kind::Menu, &events).unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("menu"), "missing kind context: {msg}");
        assert!(msg.contains("invalid integer"), "unexpected message: {msg}");
    }

    #[test]
    fn missing_object_name_is_fatal() {
        let events = [ev("/hidden", None)];
        assert!(parse_object(Kind::Command, &events).is_err());
    }

    #[test]
    fn unnamed_field_is_fatal() {
        let mut events = vec![];
        events.extend(scalar("/name", "F"));
        events.push(ev("/fieldList/field", None));
        events.extend(scalar("/fieldList/field/order", "1"));
        assert!(parse_object(Kind::Form, &events).is_err());
    }

    #[test]
    fn setting_content_before_record_is_fatal() {
        let mut events = vec![];
        events.extend(scalar("/name", "C"));
        events.extend(scalar("/settingList/setting/name", "orphan"));
        assert!(parse_object(Kind::Command, &events).is_err());
    }

    #[test]
    fn duplicate_setting_keeps_last_value() {
        let mut events = vec![];
        events.extend(scalar("/name", "C"));
        for value in ["one", "two"] {
            events.push(ev("/settingList/setting", None));
            events.extend(scalar("/settingList/setting/name", "Registry"));
            events.extend(scalar("/settingList/setting/value", value));
        }
        let obj = parse(Kind::Command, &events);
        assert_eq!(obj.common().settings.get("Registry").map(String::as_str), Some("two"));
    }
}
