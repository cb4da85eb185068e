//! Line-oriented reader for `.ci` update scripts, the inverse of the code
//! generator. This is the update direction, so the regime is strict: unknown
//! clauses, bad numbers and a reorder epilogue that contradicts the field
//! blocks are all hard errors, unlike the lenient live-export parser.

use cisync_core::{unescape, CisyncError};
use cisync_domain::{
    AdminRef, ChannelRef, ChildKind, ChildRef, CiObject, CommandRef, Field, Kind, Property,
    Setting, SortType,
};

/// Parse one `.ci` file into a typed admin object. `inquiry_delimiter` is the
/// line separating an inquiry statement from its embedded code body.
pub fn read_ci(text: &str, inquiry_delimiter: &str) -> Result<CiObject, CisyncError> {
    let mut reader = Reader::default();

    let mut code_lines: Option<Vec<&str>> = None;
    let mut script_lines: Vec<&str> = Vec::new();
    for line in text.lines() {
        if let Some(body) = code_lines.as_mut() {
            body.push(line);
        } else if line.trim() == inquiry_delimiter {
            code_lines = Some(Vec::new());
        } else {
            script_lines.push(line);
        }
    }

    for (idx, raw) in script_lines.iter().enumerate() {
        reader.line(idx + 1, raw)?;
    }
    reader.finish(code_lines.map(|lines| lines.join("\n")))
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Word(String),
    Str(String),
}

impl Tok {
    fn as_str(&self) -> &str {
        match self {
            Tok::Word(s) | Tok::Str(s) => s,
        }
    }
}

#[derive(Default)]
struct Reader {
    obj: Option<CiObject>,
    /// Field names collected from a `reorder form` epilogue.
    reorder: Option<Vec<String>>,
    in_reorder: bool,
    /// Synthetic order keys, assigned by file position.
    next_order: i64,
    row: i64,
    col: i64,
}

impl Reader {
    fn line(&mut self, no: usize, raw: &str) -> Result<(), CisyncError> {
        let line = raw.trim_end();
        let line = line.strip_suffix('\\').unwrap_or(line).trim_end();
        let trimmed = line.trim_start();
        if trimmed.is_empty() {
            self.in_reorder = false;
            return Ok(());
        }
        if trimmed.starts_with('#') {
            return Ok(());
        }

        let indent = line.len() - trimmed.len();
        let toks = tokenize(no, trimmed)?;
        if indent == 0 {
            self.head(no, &toks)
        } else if self.in_reorder {
            self.reorder_clause(no, &toks)
        } else if indent >= 8 {
            self.sub_clause(no, &toks)
        } else {
            self.clause(no, &toks)
        }
    }

    fn head(&mut self, no: usize, toks: &[Tok]) -> Result<(), CisyncError> {
        match toks {
            [Tok::Word(op), Tok::Word(kind), Tok::Str(name)] if op == "mod" => {
                if self.obj.is_some() {
                    return Err(err(no, "second object statement in one file"));
                }
                let kind: Kind = kind
                    .parse()
                    .map_err(|e: String| err(no, &e))?;
                let mut obj = CiObject::empty(kind);
                obj.common_mut().name = name.clone();
                self.obj = Some(obj);
                Ok(())
            }
            [Tok::Word(op), Tok::Word(form), Tok::Str(name)]
                if op == "reorder" && form == "form" =>
            {
                match &self.obj {
                    Some(CiObject::Form(f)) if f.common.name == *name => {}
                    _ => return Err(err(no, "reorder epilogue names a different form")),
                }
                if self.reorder.is_some() {
                    return Err(err(no, "second reorder epilogue"));
                }
                self.reorder = Some(Vec::new());
                self.in_reorder = true;
                Ok(())
            }
            _ => Err(err(no, "expected 'mod <kind> \"<name>\"' statement")),
        }
    }

    fn reorder_clause(&mut self, no: usize, toks: &[Tok]) -> Result<(), CisyncError> {
        match toks {
            [Tok::Word(w), Tok::Str(name)] if w == "field" => {
                self.reorder
                    .as_mut()
                    .expect("in_reorder implies reorder list")
                    .push(name.clone());
                Ok(())
            }
            _ => Err(err(no, "reorder epilogue accepts only 'field \"<name>\"' lines")),
        }
    }

    fn clause(&mut self, no: usize, toks: &[Tok]) -> Result<(), CisyncError> {
        let obj = self
            .obj
            .as_mut()
            .ok_or_else(|| err(no, "clause before any object statement"))?;
        match toks {
            [Tok::Word(w), Tok::Str(v)] if w == "label" || w == "href" || w == "alt" => {
                let link = obj
                    .link_mut()
                    .ok_or_else(|| err(no, &format!("'{w}' on a kind without link attributes")))?;
                match w.as_str() {
                    "label" => link.label = v.clone(),
                    "href" => link.href = v.clone(),
                    _ => link.alt = v.clone(),
                }
                Ok(())
            }
            [Tok::Word(w), Tok::Word(v)] if w == "height" => match obj {
                CiObject::Channel(c) => {
                    c.height = parse_int(no, v)?;
                    Ok(())
                }
                _ => Err(err(no, "'height' outside a channel")),
            },
            [Tok::Word(w), Tok::Str(v)] if w == "pattern" || w == "format" => match obj {
                CiObject::Inquiry(i) => {
                    if w == "pattern" {
                        i.pattern = v.clone();
                    } else {
                        i.format = v.clone();
                    }
                    Ok(())
                }
                _ => Err(err(no, &format!("'{w}' outside an inquiry"))),
            },
            [Tok::Word(w)] if w == "hidden" => {
                obj.common_mut().hidden = true;
                Ok(())
            }
            [Tok::Word(add), rest @ ..] if add == "add" => self.add_clause(no, rest),
            [Tok::Word(tag), Tok::Word(nm), Tok::Str(name)]
                if nm == "name" && (tag == "field" || tag == "column") =>
            {
                self.next_order += 1;
                let field = Field {
                    name: name.clone(),
                    order: self.next_order,
                    ..Field::default()
                };
                match (tag.as_str(), obj) {
                    ("field", CiObject::Form(f)) => f.fields.push(field),
                    ("column", CiObject::Table(t)) => t.columns.push(field),
                    ("field", _) => return Err(err(no, "'field' outside a form")),
                    _ => return Err(err(no, "'column' outside a table")),
                }
                Ok(())
            }
            _ => Err(err(no, &format!("unknown clause '{}'", render(toks)))),
        }
    }

    fn add_clause(&mut self, no: usize, rest: &[Tok]) -> Result<(), CisyncError> {
        let obj = self.obj.as_mut().expect("checked by caller");
        match rest {
            [Tok::Word(w), Tok::Str(k), Tok::Str(v)] if w == "setting" => {
                obj.common_mut().settings.insert(k.clone(), v.clone());
                Ok(())
            }
            [Tok::Word(w), Tok::Str(k), Tok::Str(v)] if w == "argument" => match obj {
                CiObject::Inquiry(i) => {
                    i.arguments.push(Setting { name: k.clone(), value: v.clone() });
                    Ok(())
                }
                _ => Err(err(no, "'add argument' outside an inquiry")),
            },
            [Tok::Word(w), Tok::Str(name), tail @ ..] if w == "property" => {
                let prop = property(no, name, tail)?;
                obj.common_mut().properties.push(prop);
                Ok(())
            }
            [Tok::Word(w), Tok::Str(name)] if w == "command" => {
                self.next_order += 1;
                match obj {
                    CiObject::Menu(m) => m.children.push(ChildRef {
                        kind: ChildKind::Command,
                        name: name.clone(),
                        order: self.next_order,
                    }),
                    CiObject::Channel(c) => c
                        .commands
                        .push(CommandRef { name: name.clone(), order: self.next_order }),
                    _ => return Err(err(no, "'add command' outside a menu or channel")),
                }
                Ok(())
            }
            [Tok::Word(w), Tok::Str(name)] if w == "menu" => match obj {
                CiObject::Menu(m) => {
                    self.next_order += 1;
                    m.children.push(ChildRef {
                        kind: ChildKind::Menu,
                        name: name.clone(),
                        order: self.next_order,
                    });
                    Ok(())
                }
                _ => Err(err(no, "'add menu' outside a menu")),
            },
            [Tok::Word(w), Tok::Str(name)] if w == "channel" => match obj {
                CiObject::Portal(p) => {
                    if self.row == 0 {
                        self.row = 1;
                    }
                    self.col += 1;
                    p.channels.push(ChannelRef {
                        name: name.clone(),
                        row: self.row,
                        col: self.col,
                    });
                    Ok(())
                }
                _ => Err(err(no, "'add channel' outside a portal")),
            },
            [Tok::Word(w)] if w == "newrow" => match obj {
                CiObject::Portal(_) => {
                    if self.row == 0 {
                        return Err(err(no, "'add newrow' before any placement"));
                    }
                    self.row += 1;
                    self.col = 0;
                    Ok(())
                }
                _ => Err(err(no, "'add newrow' outside a portal")),
            },
            _ => Err(err(no, &format!("unknown clause 'add {}'", render(rest)))),
        }
    }

    fn sub_clause(&mut self, no: usize, toks: &[Tok]) -> Result<(), CisyncError> {
        let (field, table) = match self.obj.as_mut() {
            Some(CiObject::Form(f)) => (f.fields.last_mut(), false),
            Some(CiObject::Table(t)) => (t.columns.last_mut(), true),
            _ => return Err(err(no, "nested clause outside a form or table")),
        };
        let f = field.ok_or_else(|| err(no, "nested clause before any field block"))?;
        match toks {
            [Tok::Word(w), Tok::Str(v)] => {
                match w.as_str() {
                    "label" => f.label = v.clone(),
                    "href" => f.href = v.clone(),
                    "range" => f.range_href = v.clone(),
                    "update" => f.update_href = v.clone(),
                    "alt" => f.alt = v.clone(),
                    "sortprogram" => f.sort_program = Some(v.clone()),
                    _ => return Err(err(no, &format!("unknown field clause '{w}'"))),
                }
                Ok(())
            }
            [Tok::Word(w), Tok::Word(v)] if w == "sorttype" => {
                f.sort_type = v
                    .parse::<SortType>()
                    .map_err(|e| err(no, &e))?;
                Ok(())
            }
            [Tok::Word(w), Tok::Word(v)] if w == "scale" => {
                f.scale = Some(parse_num(no, v)?);
                Ok(())
            }
            // ширина, затем высота
            [Tok::Word(w), Tok::Word(wd), Tok::Word(h)] if w == "size" => {
                f.geometry.width = parse_num(no, wd)?;
                f.geometry.height = parse_num(no, h)?;
                Ok(())
            }
            [Tok::Word(w), Tok::Word(wd), Tok::Word(h)] if w == "minsize" => {
                f.geometry.min_width = parse_num(no, wd)?;
                f.geometry.min_height = parse_num(no, h)?;
                Ok(())
            }
            [Tok::Word(w)] if w == "autoheight" => {
                f.geometry.auto_height = true;
                Ok(())
            }
            [Tok::Word(w)] if w == "autowidth" => {
                f.geometry.auto_width = true;
                Ok(())
            }
            [Tok::Word(w)] if w == "editable" => {
                if !table {
                    return Err(err(no, "'editable' on a form field"));
                }
                f.editable = true;
                Ok(())
            }
            [Tok::Word(w)] if w == "hidden" => {
                if !table {
                    return Err(err(no, "'hidden' on a form field"));
                }
                f.hidden = true;
                Ok(())
            }
            [Tok::Word(add), Tok::Word(st), Tok::Str(k), Tok::Str(v)]
                if add == "add" && st == "setting" =>
            {
                f.settings.push(Setting { name: k.clone(), value: v.clone() });
                Ok(())
            }
            _ => Err(err(no, &format!("unknown field clause '{}'", render(toks)))),
        }
    }

    fn finish(self, code: Option<String>) -> Result<CiObject, CisyncError> {
        let mut obj = self
            .obj
            .ok_or_else(|| err(0, "file contains no object statement"))?;

        if let Some(names) = &self.reorder {
            let CiObject::Form(f) = &obj else {
                return Err(err(0, "reorder epilogue on a non-form"));
            };
            let parsed: Vec<&str> = f.ordered_fields().iter().map(|f| f.name.as_str()).collect();
            let listed: Vec<&str> = names.iter().map(String::as_str).collect();
            if parsed != listed {
                return Err(err(
                    0,
                    &format!(
                        "reorder epilogue [{}] contradicts field blocks [{}]",
                        listed.join(", "),
                        parsed.join(", ")
                    ),
                ));
            }
        }

        match (&mut obj, code) {
            (CiObject::Inquiry(i), Some(body)) => {
                i.code = body.trim_end_matches(['\n', '\r']).to_string();
            }
            (CiObject::Inquiry(_), None) => {}
            (_, Some(_)) => {
                return Err(err(0, "code block on a non-inquiry object"));
            }
            _ => {}
        }
        Ok(obj)
    }
}

fn property(no: usize, name: &str, tail: &[Tok]) -> Result<Property, CisyncError> {
    let mut prop = Property { name: name.to_string(), target: None, value: None };
    let mut rest = tail;
    loop {
        match rest {
            [] => return Ok(prop),
            [Tok::Word(to), Tok::Word(kind), Tok::Str(target), more @ ..] if to == "to" => {
                prop.target = Some(AdminRef { kind: kind.clone(), name: target.clone() });
                rest = more;
            }
            [Tok::Word(value), Tok::Str(v), more @ ..] if value == "value" => {
                prop.value = Some(v.clone());
                rest = more;
            }
            _ => return Err(err(no, &format!("malformed property clause near '{}'", render(rest)))),
        }
    }
}

fn tokenize(no: usize, line: &str) -> Result<Vec<Tok>, CisyncError> {
    let mut toks = Vec::new();
    let mut chars = line.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '"' {
            chars.next();
            let mut raw = String::new();
            let mut closed = false;
            while let Some(c) = chars.next() {
                if c == '\\' {
                    raw.push(c);
                    if let Some(escaped) = chars.next() {
                        raw.push(escaped);
                    }
                } else if c == '"' {
                    closed = true;
                    break;
                } else {
                    raw.push(c);
                }
            }
            if !closed {
                return Err(err(no, "unterminated quoted string"));
            }
            toks.push(Tok::Str(unescape(&raw)));
        } else {
            let mut word = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() || c == '"' {
                    break;
                }
                word.push(c);
                chars.next();
            }
            toks.push(Tok::Word(word));
        }
    }
    Ok(toks)
}

fn render(toks: &[Tok]) -> String {
    toks.iter().map(Tok::as_str).collect::<Vec<_>>().join(" ")
}

fn parse_int(no: usize, raw: &str) -> Result<i64, CisyncError> {
    raw.parse::<i64>()
        .map_err(|_| err(no, &format!("invalid integer '{raw}'")))
}

fn parse_num(no: usize, raw: &str) -> Result<f64, CisyncError> {
    raw.parse::<f64>()
        .map_err(|_| err(no, &format!("invalid number '{raw}'")))
}

fn err(line: usize, message: &str) -> CisyncError {
    CisyncError::Script {
        line,
        message: message.to_string(),
    }
}
