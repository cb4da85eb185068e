//! Order reconstruction for repeated children delivered with out-of-band
//! order keys. All sorts are stable: key-equal elements keep arrival order.

use crate::{ChannelRef, Property, Setting};

/// Borrowed view of `items` sorted ascending by the raw order key.
pub fn sorted_by_order<T, K: Ord>(items: &[T], key: impl Fn(&T) -> K) -> Vec<&T> {
    let mut view: Vec<&T> = items.iter().collect();
    view.sort_by_key(|item| key(item));
    view
}

/// Portal placements grouped into rows: row key ascending, then column key
/// ascending within each row. Row/column keys are only comparable; gaps and
/// negative keys are legal.
pub fn grid_rows(channels: &[ChannelRef]) -> Vec<Vec<&ChannelRef>> {
    let mut placed: Vec<&ChannelRef> = channels.iter().collect();
    placed.sort_by_key(|c| (c.row, c.col));

    let mut rows: Vec<Vec<&ChannelRef>> = Vec::new();
    for c in placed {
        match rows.last_mut() {
            Some(row) if row.first().map(|f| f.row) == Some(c.row) => row.push(c),
            _ => rows.push(vec![c]),
        }
    }
    rows
}

/// Canonical (sorted) view of a setting list; emission order must be a pure
/// function of the entries, never of insertion order.
pub fn sorted_settings(settings: &[Setting]) -> Vec<&Setting> {
    let mut view: Vec<&Setting> = settings.iter().collect();
    view.sort();
    view
}

/// Canonical (sorted) view of a property multiset.
pub fn sorted_properties(properties: &[Property]) -> Vec<&Property> {
    let mut view: Vec<&Property> = properties.iter().collect();
    view.sort();
    view
}
