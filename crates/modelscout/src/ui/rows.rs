//! Flattening folder groups into selectable list rows

use std::collections::HashSet;

use crate::results::FolderGroup;

/// A selectable row in the results list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Row {
    /// Folder header, by group index
    Folder(usize),
    /// File entry, by group and entry index
    File(usize, usize),
}

/// Pure function to compute visible rows: every folder header, followed by
/// its entries unless the folder is collapsed.
pub fn compute_visible_rows(groups: &[FolderGroup], collapsed: &HashSet<usize>) -> Vec<Row> {
    let mut rows = Vec::new();
    for (g, group) in groups.iter().enumerate() {
        rows.push(Row::Folder(g));
        if collapsed.contains(&g) {
            continue;
        }
        rows.extend((0..group.entries.len()).map(|e| Row::File(g, e)));
    }
    rows
}

/// Arrow shown on a folder header. Expanded folders show `▼`.
pub fn folder_arrow(collapsed: bool) -> &'static str {
    if collapsed {
        "▲"
    } else {
        "▼"
    }
}

/// Flip membership of `key` in `set`
pub fn toggle<T: std::hash::Hash + Eq>(set: &mut HashSet<T>, key: T) {
    if !set.remove(&key) {
        set.insert(key);
    }
}
