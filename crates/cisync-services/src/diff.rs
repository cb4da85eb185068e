use std::collections::BTreeMap;

use cisync_domain::{flatten, CiObject, DiffOutput, SCHEMA_VERSION};

/// Compare the live object against the desired file on flattened attribute
/// rows. `changed` carries the desired value; attribute paths are keyed by
/// child name, so inserting a field does not shift unrelated rows.
pub fn diff_objects(live: &CiObject, desired: &CiObject) -> DiffOutput {
    let mut out = DiffOutput {
        schema_version: SCHEMA_VERSION,
        ..DiffOutput::default()
    };
    if live.kind() != desired.kind() {
        out.changed.push(("kind".to_string(), desired.kind().to_string()));
    }
    if live.name() != desired.name() {
        out.changed.push(("name".to_string(), desired.name().to_string()));
    }

    let live_rows = rows(live);
    let desired_rows = rows(desired);

    for (attr, value) in &desired_rows {
        match live_rows.get(attr) {
            Some(current) if current == value => {}
            Some(_) => out.changed.push((attr.clone(), value.clone())),
            None => out.only_in_file.push(attr.clone()),
        }
    }
    for attr in live_rows.keys() {
        if !desired_rows.contains_key(attr) {
            out.only_in_live.push(attr.clone());
        }
    }
    out
}

fn rows(obj: &CiObject) -> BTreeMap<String, String> {
    flatten::flatten(obj)
        .into_iter()
        .map(|r| (r.attr, r.value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cisync_domain::Command;

    fn command(name: &str, label: &str, setting: Option<(&str, &str)>) -> CiObject {
        let mut cmd = Command::default();
        cmd.common.name = name.into();
        cmd.link.label = label.into();
        if let Some((k, v)) = setting {
            cmd.common.settings.insert(k.into(), v.into());
        }
        CiObject::Command(cmd)
    }

    #[test]
    fn equal_objects_diff_empty() {
        let a = command("C", "L", Some(("k", "v")));
        let b = command("C", "L", Some(("k", "v")));
        assert!(diff_objects(&a, &b).is_empty());
    }

    #[test]
    fn changed_and_one_sided_rows() {
        let live = command("C", "Old", Some(("stale", "1")));
        let desired = command("C", "New", Some(("fresh", "2")));
        let d = diff_objects(&live, &desired);
        assert_eq!(d.schema_version, SCHEMA_VERSION);
        assert!(d.changed.contains(&("label".to_string(), "New".to_string())));
        assert_eq!(d.only_in_file, ["setting/fresh"]);
        assert_eq!(d.only_in_live, ["setting/stale"]);
    }
}
