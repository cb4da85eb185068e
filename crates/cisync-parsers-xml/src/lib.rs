use cisync_core::{CisyncError, PathEvent, Result};
use cisync_domain::{CiObject, Kind};
use quick_xml::events::Event;
use quick_xml::Reader;

mod object;

pub use object::parse_object;

/// Parse one live export document into a typed admin object.
pub fn parse_export(xml: &str) -> Result<CiObject> {
    let (kind, events) = events_from_xml(xml)?;
    Ok(parse_object(kind, &events)?)
}

/// Adapt a live export XML document to the flattened `(path, content)` event
/// stream the object parser consumes. The root element names the kind; every
/// element start (or empty element) yields a `(path, None)` event and every
/// text/CDATA node a `(path, Some(text))` event, so boolean-presence tags and
/// container starts arrive without content.
pub fn events_from_xml(xml: &str) -> Result<(Kind, Vec<PathEvent>)> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<String> = Vec::new();
    let mut kind: Option<Kind> = None;
    let mut events: Vec<PathEvent> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if stack.is_empty() {
                    kind = Some(root_kind(&name)?);
                } else {
                    events.push(PathEvent::new(sub_path(&stack, Some(&name)), None));
                }
                stack.push(name);
            }
            Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if stack.is_empty() {
                    kind = Some(root_kind(&name)?);
                } else {
                    events.push(PathEvent::new(sub_path(&stack, Some(&name)), None));
                }
            }
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| xml_error(&stack, format!("{e}")))?
                    .to_string();
                if stack.len() > 1 && !text.is_empty() {
                    events.push(PathEvent::new(sub_path(&stack, None), Some(&text)));
                }
            }
            Ok(Event::CData(t)) => {
                let text = String::from_utf8_lossy(t.as_ref()).into_owned();
                if stack.len() > 1 {
                    events.push(PathEvent::new(sub_path(&stack, None), Some(&text)));
                }
            }
            Ok(Event::End(_)) => {
                stack.pop();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(&stack, format!("{e}")).into()),
            _ => {}
        }
        buf.clear();
    }

    let kind = kind.ok_or_else(|| CisyncError::Other("empty export document".into()))?;
    Ok((kind, events))
}

fn root_kind(tag: &str) -> Result<Kind> {
    tag.parse::<Kind>().map_err(|e| {
        CisyncError::Parse {
            kind: tag.to_string(),
            name: String::new(),
            message: e,
        }
        .into()
    })
}

/// Path of `leaf` under the stack, relative to the object root (the root
/// element itself never appears in paths).
fn sub_path(stack: &[String], leaf: Option<&str>) -> String {
    let mut path = String::new();
    for part in stack.iter().skip(1) {
        path.push('/');
        path.push_str(part);
    }
    if let Some(leaf) = leaf {
        path.push('/');
        path.push_str(leaf);
    }
    path
}

fn xml_error(stack: &[String], message: String) -> CisyncError {
    CisyncError::Parse {
        kind: stack.first().cloned().unwrap_or_default(),
        name: String::new(),
        message,
    }
}
