use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub mod flatten;
pub mod order;

pub use flatten::FlatAttr;

pub const SCHEMA_VERSION: u32 = 1;

/// Administrative UI object kinds covered by the synchronization protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Command,
    Menu,
    Form,
    Table,
    Channel,
    Portal,
    Inquiry,
}

impl Kind {
    /// Compile-time registry of every kind, in canonical order.
    pub const ALL: [Kind; 7] = [
        Kind::Command,
        Kind::Menu,
        Kind::Form,
        Kind::Table,
        Kind::Channel,
        Kind::Portal,
        Kind::Inquiry,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Command => "command",
            Kind::Menu => "menu",
            Kind::Form => "form",
            Kind::Table => "table",
            Kind::Channel => "channel",
            Kind::Portal => "portal",
            Kind::Inquiry => "inquiry",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Kind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown admin kind '{s}'"))
    }
}

/// Reference from a property to another administrative object. The kind stays
/// a free string: live exports reference kinds outside the seven modeled here.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub struct AdminRef {
    pub kind: String,
    pub name: String,
}

/// One `(name, target?, value?)` property triple. Duplicate names with
/// different values are legal, so properties form a multiset, not a map.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub struct Property {
    pub name: String,
    pub target: Option<AdminRef>,
    pub value: Option<String>,
}

/// One setting entry as parsed (field settings keep arrival order).
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub struct Setting {
    pub name: String,
    pub value: String,
}

/// State shared by every admin kind: identity, the hidden flag, settings and
/// properties. Object-level settings are a map; a later duplicate wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct AdminCommon {
    pub name: String,
    pub hidden: bool,
    pub settings: BTreeMap<String, String>,
    pub properties: Vec<Property>,
}

impl PartialEq for AdminCommon {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.hidden == other.hidden
            && self.settings == other.settings
            && order::sorted_properties(&self.properties) == order::sorted_properties(&other.properties)
    }
}

/// The label/href/alt triple carried by navigation kinds. Always emitted,
/// empty string when never set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LinkAttrs {
    pub label: String,
    pub href: String,
    pub alt: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortType {
    #[default]
    None,
    Alpha,
    Numeric,
    Other,
}

impl SortType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortType::None => "none",
            SortType::Alpha => "alpha",
            SortType::Numeric => "numeric",
            SortType::Other => "other",
        }
    }
}

impl FromStr for SortType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(SortType::None),
            "alpha" => Ok(SortType::Alpha),
            "numeric" => Ok(SortType::Numeric),
            "other" => Ok(SortType::Other),
            _ => Err(format!("unknown sort type '{s}'")),
        }
    }
}

/// Размеры поля; значения по умолчанию не сериализуются в скрипт.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Geometry {
    pub height: f64,
    pub width: f64,
    pub min_height: f64,
    pub min_width: f64,
    pub auto_height: bool,
    pub auto_width: bool,
}

impl Default for Geometry {
    fn default() -> Self {
        Geometry {
            height: 1.0,
            width: 1.0,
            min_height: 0.0,
            min_width: 0.0,
            auto_height: false,
            auto_width: false,
        }
    }
}

impl Geometry {
    /// True for the documented defaults, in which case no size clause is emitted.
    pub fn is_default_size(&self) -> bool {
        self.height == 1.0 && self.width == 1.0
    }

    pub fn is_default_minsize(&self) -> bool {
        self.min_height == 0.0 && self.min_width == 0.0
    }
}

/// A form field or table column. `order` is the raw order key delivered by
/// the export; it is only comparable, never required to be contiguous.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Field {
    pub name: String,
    pub label: String,
    pub href: String,
    pub range_href: String,
    pub update_href: String,
    pub alt: String,
    pub order: i64,
    pub sort_type: SortType,
    pub sort_program: Option<String>,
    pub geometry: Geometry,
    pub scale: Option<f64>,
    /// Table-only flags; always false for form fields.
    pub editable: bool,
    pub hidden: bool,
    pub settings: Vec<Setting>,
}

impl PartialEq for Field {
    // Raw order keys are positional bookkeeping, not state: two fields are
    // equal when everything but the key matches.
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.label == other.label
            && self.href == other.href
            && self.range_href == other.range_href
            && self.update_href == other.update_href
            && self.alt == other.alt
            && self.sort_type == other.sort_type
            && self.sort_program == other.sort_program
            && self.geometry == other.geometry
            && self.scale == other.scale
            && self.editable == other.editable
            && self.hidden == other.hidden
            && order::sorted_settings(&self.settings) == order::sorted_settings(&other.settings)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChildKind {
    Command,
    Menu,
}

impl ChildKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChildKind::Command => "command",
            ChildKind::Menu => "menu",
        }
    }
}

/// Menu child: a command or submenu reference plus its raw order key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChildRef {
    pub kind: ChildKind,
    pub name: String,
    pub order: i64,
}

/// Channel child: a command reference plus its raw order key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CommandRef {
    pub name: String,
    pub order: i64,
}

/// Portal placement: a channel reference keyed by raw (row, column).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChannelRef {
    pub name: String,
    pub row: i64,
    pub col: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Command {
    #[serde(flatten)]
    pub common: AdminCommon,
    #[serde(flatten)]
    pub link: LinkAttrs,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Menu {
    #[serde(flatten)]
    pub common: AdminCommon,
    #[serde(flatten)]
    pub link: LinkAttrs,
    pub children: Vec<ChildRef>,
}

impl Menu {
    /// Children in reconstructed order (raw key ascending, stable).
    pub fn ordered_children(&self) -> Vec<&ChildRef> {
        order::sorted_by_order(&self.children, |c| c.order)
    }
}

impl PartialEq for Menu {
    fn eq(&self, other: &Self) -> bool {
        self.common == other.common
            && self.link == other.link
            && sequences_equal(&self.ordered_children(), &other.ordered_children(), |a, b| {
                a.kind == b.kind && a.name == b.name
            })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Form {
    #[serde(flatten)]
    pub common: AdminCommon,
    pub fields: Vec<Field>,
}

impl Form {
    pub fn ordered_fields(&self) -> Vec<&Field> {
        order::sorted_by_order(&self.fields, |f| f.order)
    }
}

impl PartialEq for Form {
    fn eq(&self, other: &Self) -> bool {
        self.common == other.common
            && sequences_equal(&self.ordered_fields(), &other.ordered_fields(), |a, b| a == b)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Table {
    #[serde(flatten)]
    pub common: AdminCommon,
    pub columns: Vec<Field>,
}

impl Table {
    pub fn ordered_columns(&self) -> Vec<&Field> {
        order::sorted_by_order(&self.columns, |c| c.order)
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.common == other.common
            && sequences_equal(&self.ordered_columns(), &other.ordered_columns(), |a, b| a == b)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Channel {
    #[serde(flatten)]
    pub common: AdminCommon,
    #[serde(flatten)]
    pub link: LinkAttrs,
    pub height: i64,
    pub commands: Vec<CommandRef>,
}

impl Channel {
    pub fn ordered_commands(&self) -> Vec<&CommandRef> {
        order::sorted_by_order(&self.commands, |c| c.order)
    }
}

impl PartialEq for Channel {
    fn eq(&self, other: &Self) -> bool {
        self.common == other.common
            && self.link == other.link
            && self.height == other.height
            && sequences_equal(&self.ordered_commands(), &other.ordered_commands(), |a, b| {
                a.name == b.name
            })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Portal {
    #[serde(flatten)]
    pub common: AdminCommon,
    #[serde(flatten)]
    pub link: LinkAttrs,
    pub channels: Vec<ChannelRef>,
}

impl Portal {
    /// Placements grouped into rows (row key ascending, column key within).
    pub fn grid(&self) -> Vec<Vec<&ChannelRef>> {
        order::grid_rows(&self.channels)
    }
}

impl PartialEq for Portal {
    fn eq(&self, other: &Self) -> bool {
        if self.common != other.common || self.link != other.link {
            return false;
        }
        let (a, b) = (self.grid(), other.grid());
        a.len() == b.len()
            && a.iter().zip(b.iter()).all(|(ra, rb)| {
                sequences_equal(ra, rb, |x, y| x.name == y.name)
            })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Inquiry {
    #[serde(flatten)]
    pub common: AdminCommon,
    pub pattern: String,
    pub format: String,
    /// Embedded code body, normalized without trailing newlines.
    pub code: String,
    pub arguments: Vec<Setting>,
}

impl PartialEq for Inquiry {
    fn eq(&self, other: &Self) -> bool {
        self.common == other.common
            && self.pattern == other.pattern
            && self.format == other.format
            && self.code == other.code
            && order::sorted_settings(&self.arguments) == order::sorted_settings(&other.arguments)
    }
}

/// One fully parsed administrative object of any kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CiObject {
    Command(Command),
    Menu(Menu),
    Form(Form),
    Table(Table),
    Channel(Channel),
    Portal(Portal),
    Inquiry(Inquiry),
}

impl CiObject {
    pub fn kind(&self) -> Kind {
        match self {
            CiObject::Command(_) => Kind::Command,
            CiObject::Menu(_) => Kind::Menu,
            CiObject::Form(_) => Kind::Form,
            CiObject::Table(_) => Kind::Table,
            CiObject::Channel(_) => Kind::Channel,
            CiObject::Portal(_) => Kind::Portal,
            CiObject::Inquiry(_) => Kind::Inquiry,
        }
    }

    /// Empty model of the given kind (the parse starting point).
    pub fn empty(kind: Kind) -> CiObject {
        match kind {
            Kind::Command => CiObject::Command(Command::default()),
            Kind::Menu => CiObject::Menu(Menu::default()),
            Kind::Form => CiObject::Form(Form::default()),
            Kind::Table => CiObject::Table(Table::default()),
            Kind::Channel => CiObject::Channel(Channel::default()),
            Kind::Portal => CiObject::Portal(Portal::default()),
            Kind::Inquiry => CiObject::Inquiry(Inquiry::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.common().name
    }

    pub fn common(&self) -> &AdminCommon {
        match self {
            CiObject::Command(o) => &o.common,
            CiObject::Menu(o) => &o.common,
            CiObject::Form(o) => &o.common,
            CiObject::Table(o) => &o.common,
            CiObject::Channel(o) => &o.common,
            CiObject::Portal(o) => &o.common,
            CiObject::Inquiry(o) => &o.common,
        }
    }

    pub fn common_mut(&mut self) -> &mut AdminCommon {
        match self {
            CiObject::Command(o) => &mut o.common,
            CiObject::Menu(o) => &mut o.common,
            CiObject::Form(o) => &mut o.common,
            CiObject::Table(o) => &mut o.common,
            CiObject::Channel(o) => &mut o.common,
            CiObject::Portal(o) => &mut o.common,
            CiObject::Inquiry(o) => &mut o.common,
        }
    }

    /// Link triple for the kinds that carry one.
    pub fn link(&self) -> Option<&LinkAttrs> {
        match self {
            CiObject::Command(o) => Some(&o.link),
            CiObject::Menu(o) => Some(&o.link),
            CiObject::Channel(o) => Some(&o.link),
            CiObject::Portal(o) => Some(&o.link),
            _ => None,
        }
    }

    pub fn link_mut(&mut self) -> Option<&mut LinkAttrs> {
        match self {
            CiObject::Command(o) => Some(&mut o.link),
            CiObject::Menu(o) => Some(&mut o.link),
            CiObject::Channel(o) => Some(&mut o.link),
            CiObject::Portal(o) => Some(&mut o.link),
            _ => None,
        }
    }
}

fn sequences_equal<T>(a: &[&T], b: &[&T], eq: impl Fn(&T, &T) -> bool) -> bool {
    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| eq(x, y))
}

// ---------------------------------------------------------------------------
// Report types shared with the CLI/services layers.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ValidationMsg {
    pub schema_version: u32,
    /// "error" | "warning" | "info"
    pub severity: String,
    /// Machine-readable category, e.g. "control-char" or "empty-name".
    pub category: String,
    pub kind: String,
    pub name: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct DiffOutput {
    pub schema_version: u32,
    /// `(attribute path, desired value)` pairs whose value differs.
    pub changed: Vec<(String, String)>,
    pub only_in_file: Vec<String>,
    pub only_in_live: Vec<String>,
}

impl DiffOutput {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.only_in_file.is_empty() && self.only_in_live.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SyncOutcome {
    pub kind: String,
    pub name: String,
    /// "updated" | "created" | "parse-error" | "validation-error" | "submit-error"
    pub status: String,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SyncSummary {
    pub schema_version: u32,
    pub updated: usize,
    pub created: usize,
    pub failed: usize,
    pub objects: Vec<SyncOutcome>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HealthIssue {
    pub path: String,
    pub category: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct HealthReport {
    pub schema_version: u32,
    pub checked: usize,
    pub issues: Vec<HealthIssue>,
}
