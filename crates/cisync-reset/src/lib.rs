//! Reset script generation. The live admin language has no "replace object"
//! operation, so every update is prefixed with commands returning the current
//! object to its empty baseline: scalars cleared, flags unset, one removal per
//! repeated element. Removal order does not affect convergence but is kept
//! deterministic.

use cisync_core::{escape, is_escapable, CisyncError};
use cisync_domain::{order, AdminCommon, CiObject, Field, Kind, LinkAttrs};
use cisync_transport::Transport;

/// Read-before-write lookup: does `tree_menu` currently contain `menu`?
/// Exposed so tests and the offline CLI can can the exact query string.
pub fn tree_query(tree_menu: &str, menu: &str) -> String {
    format!("print menu \"{}\" select contains[\"{}\"] dump", escape(tree_menu), escape(menu))
}

/// Build the undo statements for the current live object, one statement per
/// line, without terminators. A menu additionally queries the root container
/// through the transport; a failed lookup aborts the whole reset (fail-closed).
pub fn build_reset(
    current: &CiObject,
    tree_menu: &str,
    transport: &mut dyn Transport,
) -> Result<Vec<String>, CisyncError> {
    let kind = current.kind();
    let head = format!("mod {} {}", kind.as_str(), quoted(current.name())?);
    let mut out = Vec::new();

    if kind == Kind::Menu {
        let answer = transport
            .execute(&tree_query(tree_menu, current.name()))
            .map_err(|e| CisyncError::Transport(e.to_string()))?;
        if answer.trim() == "true" {
            out.push(format!(
                "mod menu {} remove menu {}",
                quoted(tree_menu)?,
                quoted(current.name())?
            ));
        }
    }

    let mut scalars: Vec<String> = Vec::new();
    if let Some(link) = current.link() {
        clear_link(&mut scalars, link);
    }
    match current {
        CiObject::Channel(c) if c.height != 0 => scalars.push("height 0".to_string()),
        CiObject::Inquiry(i) => {
            if !i.pattern.is_empty() {
                scalars.push("pattern \"\"".to_string());
            }
            if !i.format.is_empty() {
                scalars.push("format \"\"".to_string());
            }
            if !i.code.is_empty() {
                scalars.push("code \"\"".to_string());
            }
        }
        _ => {}
    }
    if current.common().hidden {
        scalars.push("!hidden".to_string());
    }
    if !scalars.is_empty() {
        out.push(format!("{head} {}", scalars.join(" ")));
    }

    removals(&mut out, &head, current.common())?;
    match current {
        CiObject::Command(_) => {}
        CiObject::Menu(m) => {
            for c in &m.children {
                out.push(format!("{head} remove {} {}", c.kind.as_str(), quoted(&c.name)?));
            }
        }
        CiObject::Form(f) => remove_fields(&mut out, &head, &f.fields, "field")?,
        CiObject::Table(t) => remove_fields(&mut out, &head, &t.columns, "column")?,
        CiObject::Channel(c) => {
            for cmd in &c.commands {
                out.push(format!("{head} remove command {}", quoted(&cmd.name)?));
            }
        }
        CiObject::Portal(p) => {
            for ch in &p.channels {
                out.push(format!("{head} remove channel {}", quoted(&ch.name)?));
            }
        }
        CiObject::Inquiry(i) => {
            for a in order::sorted_settings(&i.arguments) {
                out.push(format!("{head} remove argument {}", quoted(&a.name)?));
            }
        }
    }

    Ok(out)
}

fn clear_link(scalars: &mut Vec<String>, link: &LinkAttrs) {
    if !link.label.is_empty() {
        scalars.push("label \"\"".to_string());
    }
    if !link.href.is_empty() {
        scalars.push("href \"\"".to_string());
    }
    if !link.alt.is_empty() {
        scalars.push("alt \"\"".to_string());
    }
}

fn removals(out: &mut Vec<String>, head: &str, common: &AdminCommon) -> Result<(), CisyncError> {
    for key in common.settings.keys() {
        out.push(format!("{head} remove setting {}", quoted(key)?));
    }
    for p in order::sorted_properties(&common.properties) {
        let mut line = format!("{head} remove property {}", quoted(&p.name)?);
        if let Some(t) = &p.target {
            line.push_str(&format!(" to {} {}", t.kind, quoted(&t.name)?));
        }
        out.push(line);
    }
    Ok(())
}

fn remove_fields(
    out: &mut Vec<String>,
    head: &str,
    fields: &[Field],
    tag: &str,
) -> Result<(), CisyncError> {
    for f in fields {
        out.push(format!("{head} remove {tag} {}", quoted(&f.name)?));
    }
    Ok(())
}

fn quoted(s: &str) -> Result<String, CisyncError> {
    if !is_escapable(s) {
        return Err(CisyncError::Other(format!(
            "value {s:?} contains control characters the script syntax cannot carry"
        )));
    }
    Ok(format!("\"{}\"", escape(s)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cisync_domain::{
        AdminRef, Channel, ChildKind, ChildRef, Command, Form, Inquiry, Menu, Property, Setting,
    };
    use cisync_transport::RecordingTransport;

    fn reset(obj: &CiObject, transport: &mut RecordingTransport) -> Vec<String> {
        build_reset(obj, "Tree", transport).unwrap()
    }

    #[test]
    fn empty_command_needs_no_reset() {
        let mut cmd = Command::default();
        cmd.common.name = "C".into();
        let stmts = reset(&CiObject::Command(cmd), &mut RecordingTransport::new());
        assert!(stmts.is_empty(), "unexpected statements: {stmts:?}");
    }

    #[test]
    fn command_scalars_flags_and_collections() {
        let mut cmd = Command::default();
        cmd.common.name = "Search".into();
        cmd.common.hidden = true;
        cmd.link.label = "Open".into();
        cmd.common.settings.insert("b".into(), "2".into());
        cmd.common.settings.insert("a".into(), "1".into());
        cmd.common.properties.push(Property {
            name: "linked form".into(),
            target: Some(AdminRef { kind: "form".into(), name: "F".into() }),
            value: None,
        });

        let stmts = reset(&CiObject::Command(cmd), &mut RecordingTransport::new());
        assert_eq!(
            stmts,
            [
                "mod command \"Search\" label \"\" !hidden",
                "mod command \"Search\" remove setting \"a\"",
                "mod command \"Search\" remove setting \"b\"",
                "mod command \"Search\" remove property \"linked form\" to form \"F\"",
            ]
        );
    }

    #[test]
    fn menu_in_tree_removes_from_container_first() {
        let mut menu = Menu::default();
        menu.common.name = "Main".into();
        menu.children.push(ChildRef { kind: ChildKind::Command, name: "X".into(), order: 2 });
        menu.children.push(ChildRef { kind: ChildKind::Menu, name: "Y".into(), order: 1 });

        let mut t = RecordingTransport::new();
        t.respond(tree_query("Tree", "Main"), "true");
        let stmts = reset(&CiObject::Menu(menu), &mut t);
        assert_eq!(stmts[0], "mod menu \"Tree\" remove menu \"Main\"");
        // typed child removals keep raw arrival order
        assert_eq!(stmts[1], "mod menu \"Main\" remove command \"X\"");
        assert_eq!(stmts[2], "mod menu \"Main\" remove menu \"Y\"");
    }

    #[test]
    fn menu_outside_tree_skips_container_removal() {
        let mut menu = Menu::default();
        menu.common.name = "Main".into();
        let mut t = RecordingTransport::new();
        let stmts = reset(&CiObject::Menu(menu), &mut t);
        assert!(stmts.is_empty());
        // the lookup still went out
        assert_eq!(t.submitted.len(), 1);
        assert!(t.submitted[0].starts_with("print menu \"Tree\""));
    }

    #[test]
    fn failed_tree_lookup_fails_closed() {
        let mut menu = Menu::default();
        menu.common.name = "Main".into();
        menu.link.label = "would be reset".into();
        let mut t = RecordingTransport::new();
        t.fail_on("print menu");
        let err = build_reset(&CiObject::Menu(menu), "Tree", &mut t).unwrap_err();
        assert!(matches!(err, CisyncError::Transport(_)));
    }

    #[test]
    fn form_fields_and_table_columns_carry_their_tag() {
        let mut form = Form::default();
        form.common.name = "F".into();
        form.fields.push(Field { name: "Rev".into(), order: 1, ..Field::default() });
        let stmts = reset(&CiObject::Form(form), &mut RecordingTransport::new());
        assert_eq!(stmts, ["mod form \"F\" remove field \"Rev\""]);
    }

    #[test]
    fn channel_resets_height_and_commands() {
        let mut ch = Channel::default();
        ch.common.name = "News".into();
        ch.height = 250;
        ch.commands.push(cisync_domain::CommandRef { name: "Refresh".into(), order: 1 });
        let stmts = reset(&CiObject::Channel(ch), &mut RecordingTransport::new());
        assert_eq!(
            stmts,
            [
                "mod channel \"News\" height 0",
                "mod channel \"News\" remove command \"Refresh\"",
            ]
        );
    }

    #[test]
    fn inquiry_clears_body_and_arguments() {
        let mut inq = Inquiry::default();
        inq.common.name = "Q".into();
        inq.pattern = "*".into();
        inq.code = "temp query;".into();
        inq.arguments.push(Setting { name: "TYPE".into(), value: "Part".into() });
        let stmts = reset(&CiObject::Inquiry(inq), &mut RecordingTransport::new());
        assert_eq!(
            stmts,
            [
                "mod inquiry \"Q\" pattern \"\" code \"\"",
                "mod inquiry \"Q\" remove argument \"TYPE\"",
            ]
        );
    }
}
