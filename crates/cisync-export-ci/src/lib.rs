use cisync_core::{escape, is_escapable, CisyncError};
use cisync_domain::{order, AdminCommon, CiObject, Field, LinkAttrs, SortType};

/// Separates the admin statement from the embedded code body in inquiry files.
pub const DEFAULT_INQUIRY_DELIMITER: &str = "############ inquiry code ############";

/// Render the canonical `.ci` script for an object.
///
/// The output is a pure function of the model: clause order is fixed per
/// kind, settings/arguments/properties are sorted, children appear in
/// reconstructed order. Re-parsing the script yields an equal model.
pub fn generate(obj: &CiObject) -> Result<String, CisyncError> {
    generate_with(obj, DEFAULT_INQUIRY_DELIMITER)
}

pub fn generate_with(obj: &CiObject, inquiry_delimiter: &str) -> Result<String, CisyncError> {
    let mut st = Statement::new(format!("mod {} {}", obj.kind().as_str(), quoted(obj.name())?));
    let mut epilogue: Option<Statement> = None;
    let mut code_block: Option<&str> = None;

    match obj {
        CiObject::Command(o) => {
            link_clauses(&mut st, &o.link)?;
            common_clauses(&mut st, &o.common)?;
        }
        CiObject::Menu(o) => {
            link_clauses(&mut st, &o.link)?;
            common_clauses(&mut st, &o.common)?;
            for c in o.ordered_children() {
                st.clause(format!("add {} {}", c.kind.as_str(), quoted(&c.name)?));
            }
        }
        CiObject::Form(o) => {
            common_clauses(&mut st, &o.common)?;
            let ordered = o.ordered_fields();
            for f in &ordered {
                field_block(&mut st, f, false)?;
            }
            // Живая система перетасовывает поля после обновления, поэтому
            // фиксируем порядок отдельным оператором.
            if !ordered.is_empty() {
                let mut re = Statement::new(format!("reorder form {}", quoted(&o.common.name)?));
                for f in &ordered {
                    re.clause(format!("field {}", quoted(&f.name)?));
                }
                epilogue = Some(re);
            }
        }
        CiObject::Table(o) => {
            common_clauses(&mut st, &o.common)?;
            for c in o.ordered_columns() {
                field_block(&mut st, c, true)?;
            }
        }
        CiObject::Channel(o) => {
            link_clauses(&mut st, &o.link)?;
            st.clause(format!("height {}", o.height));
            common_clauses(&mut st, &o.common)?;
            for c in o.ordered_commands() {
                st.clause(format!("add command {}", quoted(&c.name)?));
            }
        }
        CiObject::Portal(o) => {
            link_clauses(&mut st, &o.link)?;
            common_clauses(&mut st, &o.common)?;
            for (i, row) in o.grid().iter().enumerate() {
                if i > 0 {
                    st.clause("add newrow");
                }
                for c in row {
                    st.clause(format!("add channel {}", quoted(&c.name)?));
                }
            }
        }
        CiObject::Inquiry(o) => {
            st.clause(format!("pattern {}", quoted(&o.pattern)?));
            st.clause(format!("format {}", quoted(&o.format)?));
            hidden_clause(&mut st, &o.common);
            setting_clauses(&mut st, &o.common)?;
            for a in order::sorted_settings(&o.arguments) {
                st.clause(format!("add argument {} {}", quoted(&a.name)?, quoted(&a.value)?));
            }
            property_clauses(&mut st, &o.common)?;
            code_block = Some(&o.code);
        }
    }

    let mut out = st.render();
    if let Some(re) = epilogue {
        out.push('\n');
        out.push_str(&re.render());
    }
    if let Some(code) = code_block {
        out.push('\n');
        out.push_str(inquiry_delimiter);
        out.push('\n');
        out.push_str(code);
        out.push('\n');
    }
    Ok(out)
}

/// One admin statement: a head line plus indented clause lines, joined with
/// ` \` continuations (every line but the last).
struct Statement {
    lines: Vec<String>,
}

impl Statement {
    fn new(head: String) -> Self {
        Statement { lines: vec![head] }
    }

    fn clause(&mut self, text: impl AsRef<str>) {
        self.lines.push(format!("    {}", text.as_ref()));
    }

    fn sub(&mut self, text: impl AsRef<str>) {
        self.lines.push(format!("        {}", text.as_ref()));
    }

    fn render(&self) -> String {
        let mut out = String::new();
        for (i, line) in self.lines.iter().enumerate() {
            out.push_str(line);
            if i + 1 < self.lines.len() {
                out.push_str(" \\");
            }
            out.push('\n');
        }
        out
    }
}

fn quoted(s: &str) -> Result<String, CisyncError> {
    if !is_escapable(s) {
        return Err(CisyncError::Other(format!(
            "value {s:?} contains control characters the script syntax cannot carry"
        )));
    }
    Ok(format!("\"{}\"", escape(s)))
}

fn link_clauses(st: &mut Statement, link: &LinkAttrs) -> Result<(), CisyncError> {
    st.clause(format!("label {}", quoted(&link.label)?));
    st.clause(format!("href {}", quoted(&link.href)?));
    st.clause(format!("alt {}", quoted(&link.alt)?));
    Ok(())
}

fn common_clauses(st: &mut Statement, common: &AdminCommon) -> Result<(), CisyncError> {
    hidden_clause(st, common);
    setting_clauses(st, common)?;
    property_clauses(st, common)?;
    Ok(())
}

fn hidden_clause(st: &mut Statement, common: &AdminCommon) {
    if common.hidden {
        st.clause("hidden");
    }
}

fn setting_clauses(st: &mut Statement, common: &AdminCommon) -> Result<(), CisyncError> {
    for (k, v) in &common.settings {
        st.clause(format!("add setting {} {}", quoted(k)?, quoted(v)?));
    }
    Ok(())
}

fn property_clauses(st: &mut Statement, common: &AdminCommon) -> Result<(), CisyncError> {
    for p in order::sorted_properties(&common.properties) {
        let mut line = format!("add property {}", quoted(&p.name)?);
        if let Some(t) = &p.target {
            line.push_str(&format!(" to {} {}", t.kind, quoted(&t.name)?));
        }
        if let Some(v) = &p.value {
            line.push_str(&format!(" value {}", quoted(v)?));
        }
        st.clause(line);
    }
    Ok(())
}

fn field_block(st: &mut Statement, f: &Field, table: bool) -> Result<(), CisyncError> {
    let tag = if table { "column" } else { "field" };
    st.clause(format!("{tag} name {}", quoted(&f.name)?));
    if !f.label.is_empty() {
        st.sub(format!("label {}", quoted(&f.label)?));
    }
    if !f.href.is_empty() {
        st.sub(format!("href {}", quoted(&f.href)?));
    }
    if !f.range_href.is_empty() {
        st.sub(format!("range {}", quoted(&f.range_href)?));
    }
    if !f.update_href.is_empty() {
        st.sub(format!("update {}", quoted(&f.update_href)?));
    }
    if !f.alt.is_empty() {
        st.sub(format!("alt {}", quoted(&f.alt)?));
    }
    if f.sort_type != SortType::None {
        st.sub(format!("sorttype {}", f.sort_type.as_str()));
    }
    if let Some(p) = &f.sort_program {
        st.sub(format!("sortprogram {}", quoted(p)?));
    }
    // Ширина перед высотой, всегда с десятичной точкой ("1.0", не "1").
    if !f.geometry.is_default_size() {
        st.sub(format!("size {:?} {:?}", f.geometry.width, f.geometry.height));
    }
    if !f.geometry.is_default_minsize() {
        st.sub(format!("minsize {:?} {:?}", f.geometry.min_width, f.geometry.min_height));
    }
    if f.geometry.auto_height {
        st.sub("autoheight");
    }
    if f.geometry.auto_width {
        st.sub("autowidth");
    }
    if let Some(s) = f.scale {
        st.sub(format!("scale {s}"));
    }
    if table && f.editable {
        st.sub("editable");
    }
    if table && f.hidden {
        st.sub("hidden");
    }
    for s in order::sorted_settings(&f.settings) {
        st.sub(format!("add setting {} {}", quoted(&s.name)?, quoted(&s.value)?));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cisync_domain::{
        ChannelRef, Channel, ChildKind, ChildRef, Command, Form, Geometry, Inquiry, Menu, Portal,
        Setting,
    };

    fn lines(parts: &[&str]) -> String {
        parts.join("\n") + "\n"
    }

    #[test]
    fn command_script_shape() {
        let mut cmd = Command::default();
        cmd.common.name = "Search".into();
        cmd.link.label = "Open search".into();
        cmd.common.settings.insert("b".into(), "2".into());
        cmd.common.settings.insert("a".into(), "1".into());

        let script = generate(&CiObject::Command(cmd)).unwrap();
        let expected = lines(&[
            "mod command \"Search\" \\",
            "    label \"Open search\" \\",
            "    href \"\" \\",
            "    alt \"\" \\",
            "    add setting \"a\" \"1\" \\",
            "    add setting \"b\" \"2\"",
        ]);
        assert_eq!(script, expected);
    }

    #[test]
    fn menu_children_follow_reconstructed_order() {
        let mut menu = Menu::default();
        menu.common.name = "Main".into();
        menu.children.push(ChildRef { kind: ChildKind::Command, name: "X".into(), order: 2 });
        menu.children.push(ChildRef { kind: ChildKind::Menu, name: "Y".into(), order: 1 });

        let script = generate(&CiObject::Menu(menu)).unwrap();
        let y = script.find("add menu \"Y\"").unwrap();
        let x = script.find("add command \"X\"").unwrap();
        assert!(y < x, "children out of order:\n{script}");
    }

    #[test]
    fn portal_rows_carry_newrow_markers() {
        let mut portal = Portal::default();
        portal.common.name = "Home".into();
        portal.channels.push(ChannelRef { name: "B".into(), row: 2, col: 1 });
        portal.channels.push(ChannelRef { name: "A".into(), row: 1, col: 1 });
        portal.channels.push(ChannelRef { name: "C".into(), row: 2, col: 2 });

        let script = generate(&CiObject::Portal(portal)).unwrap();
        let placements: Vec<&str> = script
            .lines()
            .filter(|l| l.contains("add "))
            .map(|l| l.trim().trim_end_matches(" \\"))
            .collect();
        assert_eq!(
            placements,
            [
                "add channel \"A\"",
                "add newrow",
                "add channel \"B\"",
                "add channel \"C\"",
            ]
        );
    }

    #[test]
    fn geometry_defaults_are_omitted() {
        let mut form = Form::default();
        form.common.name = "F".into();
        form.fields.push(Field { name: "Plain".into(), order: 1, ..Field::default() });
        form.fields.push(Field {
            name: "Tall".into(),
            order: 2,
            geometry: Geometry { height: 2.0, ..Geometry::default() },
            ..Field::default()
        });

        let script = generate(&CiObject::Form(form)).unwrap();
        assert!(!script.contains("minsize"));
        assert_eq!(script.matches("size").count(), 1);
        // ширина перед высотой, десятичная запись
        assert!(script.contains("size 1.0 2.0"), "unexpected size clause:\n{script}");
    }

    #[test]
    fn minsize_renders_width_then_height() {
        let mut form = Form::default();
        form.common.name = "F".into();
        form.fields.push(Field {
            name: "Wide".into(),
            order: 1,
            geometry: Geometry { min_height: 1.0, min_width: 2.5, ..Geometry::default() },
            ..Field::default()
        });
        let script = generate(&CiObject::Form(form)).unwrap();
        assert!(script.contains("minsize 2.5 1.0"), "unexpected minsize clause:\n{script}");
    }

    #[test]
    fn form_epilogue_repeats_field_order() {
        let mut form = Form::default();
        form.common.name = "EditPart".into();
        form.fields.push(Field { name: "B".into(), order: 2, ..Field::default() });
        form.fields.push(Field { name: "A".into(), order: 1, ..Field::default() });

        let script = generate(&CiObject::Form(form)).unwrap();
        let expected_tail = lines(&[
            "reorder form \"EditPart\" \\",
            "    field \"A\" \\",
            "    field \"B\"",
        ]);
        assert!(script.ends_with(&format!("\n{expected_tail}")), "missing epilogue:\n{script}");
    }

    #[test]
    fn empty_form_has_no_epilogue() {
        let mut form = Form::default();
        form.common.name = "Empty".into();
        let script = generate(&CiObject::Form(form)).unwrap();
        assert!(!script.contains("reorder"));
    }

    #[test]
    fn inquiry_appends_code_after_delimiter() {
        let mut inq = Inquiry::default();
        inq.common.name = "FindParts".into();
        inq.pattern = "*".into();
        inq.code = "temp query bus Part * *;".into();
        inq.arguments.push(Setting { name: "TYPE".into(), value: "Part".into() });

        let script = generate(&CiObject::Inquiry(inq)).unwrap();
        let expected_tail = format!(
            "\n{}\ntemp query bus Part * *;\n",
            DEFAULT_INQUIRY_DELIMITER
        );
        assert!(script.ends_with(&expected_tail), "missing code block:\n{script}");
        assert!(script.contains("add argument \"TYPE\" \"Part\""));
        assert!(script.contains("pattern \"*\""));
        assert!(script.contains("format \"\""));
    }

    #[test]
    fn channel_height_always_present() {
        let mut ch = Channel::default();
        ch.common.name = "News".into();
        let script = generate(&CiObject::Channel(ch)).unwrap();
        assert!(script.contains("height 0"));
    }

    #[test]
    fn names_are_escaped_in_the_header() {
        let mut cmd = Command::default();
        cmd.common.name = "A \"quoted\" name\\path".into();
        let script = generate(&CiObject::Command(cmd)).unwrap();
        assert!(script.starts_with("mod command \"A \\\"quoted\\\" name\\\\path\""));
    }

    #[test]
    fn control_characters_refuse_to_render() {
        let mut cmd = Command::default();
        cmd.common.name = "C".into();
        cmd.link.label = "bell\u{7}".into();
        assert!(generate(&CiObject::Command(cmd)).is_err());
    }

    #[test]
    fn hidden_emitted_only_when_set() {
        let mut cmd = Command::default();
        cmd.common.name = "C".into();
        let script = generate(&CiObject::Command(cmd.clone())).unwrap();
        assert!(!script.contains("hidden"));
        cmd.common.hidden = true;
        let script = generate(&CiObject::Command(cmd)).unwrap();
        assert!(script.contains("\n    hidden"));
    }
}
