//! Results view model: filtering, folder grouping and match highlighting
//!
//! Everything here is a pure function from scan entries and a search term to
//! view records. The terminal UI and the plain-text CLI output both render from
//! [`ResultsView`]; neither touches the raw entries.

use std::collections::HashMap;
use std::ops::Range;

use crate::client::FileEntry;
use crate::file_types::{get_file_type_info, FileTypeInfo};
use crate::format::{format_date, format_file_size};

pub const NO_FILES_MESSAGE: &str = "No files found";

/// Detail panel labels
pub const PATH_LABEL: &str = "נתיב:";
pub const SIZE_LABEL: &str = "גודל:";
pub const MODIFIED_LABEL: &str = "תאריך עדכון:";

/// Piece of a filename, flagged when it is part of a search match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub highlighted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileEntryView {
    pub name: String,
    pub path: String,
    pub type_info: FileTypeInfo,
    pub name_segments: Vec<Segment>,
    pub size_label: String,
    pub modified_label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FolderGroup {
    pub folder: String,
    pub entries: Vec<FileEntryView>,
}

impl FolderGroup {
    pub fn count_label(&self) -> String {
        format!("{} files", self.entries.len())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ResultsView {
    /// Nothing rendered, e.g. after a failed search
    #[default]
    Cleared,
    /// The service returned no files at all
    NoFiles,
    /// Matched entries grouped by folder; may be empty when the term matched nothing
    Groups(Vec<FolderGroup>),
}

impl ResultsView {
    pub fn groups(&self) -> &[FolderGroup] {
        match self {
            ResultsView::Groups(groups) => groups,
            _ => &[],
        }
    }
}

/// Build the view for a scan result and search term.
pub fn display_results(files: &[FileEntry], search_term: &str) -> ResultsView {
    if files.is_empty() {
        return ResultsView::NoFiles;
    }

    let matched = filter_entries(files, search_term);
    let groups = group_by_folder(&matched)
        .into_iter()
        .map(|(folder, entries)| FolderGroup {
            folder: folder.to_string(),
            entries: entries
                .into_iter()
                .map(|entry| entry_view(entry, search_term))
                .collect(),
        })
        .collect();

    ResultsView::Groups(groups)
}

/// Keep entries whose name contains the term, ignoring case. An empty term keeps everything.
pub fn filter_entries<'a>(files: &'a [FileEntry], search_term: &str) -> Vec<&'a FileEntry> {
    if search_term.is_empty() {
        return files.iter().collect();
    }

    let term_lower = search_term.to_lowercase();
    files
        .iter()
        .filter(|file| file.name.to_lowercase().contains(&term_lower))
        .collect()
}

/// Folder part of a backslash-separated path. A path without a backslash has an empty folder.
pub fn folder_key(path: &str) -> &str {
    path.rsplit_once('\\').map(|(folder, _)| folder).unwrap_or("")
}

/// Group entries by folder, keeping folders in first-seen order and entries in input order
pub fn group_by_folder<'a>(entries: &[&'a FileEntry]) -> Vec<(&'a str, Vec<&'a FileEntry>)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, Vec<&FileEntry>)> = Vec::new();

    for &entry in entries {
        let folder = folder_key(&entry.path);
        match index.get(folder) {
            Some(&idx) => groups[idx].1.push(entry),
            None => {
                index.insert(folder, groups.len());
                groups.push((folder, vec![entry]));
            }
        }
    }

    groups
}

/// Split `text` into plain and highlighted runs, marking every case-insensitive
/// occurrence of `term`. The term is matched literally.
pub fn highlight_segments(text: &str, term: &str) -> Vec<Segment> {
    let ranges = match_ranges(text, term);
    if ranges.is_empty() {
        return vec![Segment {
            text: text.to_string(),
            highlighted: false,
        }];
    }

    let mut segments = Vec::with_capacity(ranges.len() * 2 + 1);
    let mut cursor = 0;
    for range in ranges {
        if range.start > cursor {
            segments.push(Segment {
                text: text[cursor..range.start].to_string(),
                highlighted: false,
            });
        }
        segments.push(Segment {
            text: text[range.clone()].to_string(),
            highlighted: true,
        });
        cursor = range.end;
    }
    if cursor < text.len() {
        segments.push(Segment {
            text: text[cursor..].to_string(),
            highlighted: false,
        });
    }

    segments
}

/// Byte ranges of non-overlapping case-insensitive matches, left to right
fn match_ranges(text: &str, term: &str) -> Vec<Range<usize>> {
    let needle: Vec<char> = term.chars().flat_map(char::to_lowercase).collect();
    if needle.is_empty() {
        return Vec::new();
    }

    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let byte_at = |idx: usize| chars.get(idx).map_or(text.len(), |(b, _)| *b);

    let mut ranges = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        match match_at(&chars, i, &needle) {
            Some(end) => {
                ranges.push(byte_at(i)..byte_at(end));
                i = end;
            }
            None => i += 1,
        }
    }
    ranges
}

/// Char index just past the match starting at `start`, if any
fn match_at(chars: &[(usize, char)], start: usize, needle: &[char]) -> Option<usize> {
    let mut lowered: Vec<char> = Vec::with_capacity(needle.len());
    let mut j = start;
    while lowered.len() < needle.len() && j < chars.len() {
        lowered.extend(chars[j].1.to_lowercase());
        j += 1;
    }
    (lowered == needle).then_some(j)
}

fn entry_view(entry: &FileEntry, search_term: &str) -> FileEntryView {
    FileEntryView {
        name: entry.name.clone(),
        path: entry.path.clone(),
        type_info: get_file_type_info(&entry.name),
        name_segments: highlight_segments(&entry.name, search_term),
        size_label: format_file_size(entry.size),
        modified_label: format_date(&entry.modified),
    }
}

/// Render a view as plain text lines. Matches are wrapped in `[` `]`.
pub fn render_text(view: &ResultsView) -> Vec<String> {
    match view {
        ResultsView::Cleared => Vec::new(),
        ResultsView::NoFiles => vec![NO_FILES_MESSAGE.to_string()],
        ResultsView::Groups(groups) => {
            let mut lines = Vec::new();
            for group in groups {
                lines.push(format!("{}  ({})", group.folder, group.count_label()));
                for entry in &group.entries {
                    let name: String = entry
                        .name_segments
                        .iter()
                        .map(|seg| {
                            if seg.highlighted {
                                format!("[{}]", seg.text)
                            } else {
                                seg.text.clone()
                            }
                        })
                        .collect();
                    lines.push(format!("  [{}] {}", entry.type_info.name, name));
                    lines.push(format!("      {} {}", PATH_LABEL, entry.path));
                    lines.push(format!("      {} {}", SIZE_LABEL, entry.size_label));
                    lines.push(format!("      {} {}", MODIFIED_LABEL, entry.modified_label));
                }
            }
            lines
        }
    }
}
