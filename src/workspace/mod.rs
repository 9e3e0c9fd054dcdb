//! File-tree helpers for the workspace inside a container.
//!
//! Everything here is engine-agnostic: commands are built as argv vectors and
//! run through [`crate::runtime::ContainerRuntime::exec`], never through a shell.

mod archive;
mod listing;

pub use archive::{is_plain_file_name, normalize_newlines, single_file_archive};
pub use listing::{FileSystemItem, ItemKind, filter_by_parent, parse_listing};

use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

pub fn find_command(root: &str, kind: ItemKind) -> Vec<String> {
    argv(&["find", root, "-type", kind.find_type()])
}

pub fn read_file_command(path: &str) -> Vec<String> {
    argv(&["cat", "--", path])
}

pub fn move_command(source: &str, destination: &str) -> Vec<String> {
    argv(&["mv", "--", source, destination])
}

pub fn make_dir_command(path: &str) -> Vec<String> {
    argv(&["mkdir", "-p", "--", path])
}

pub fn touch_command(path: &str) -> Vec<String> {
    argv(&["touch", "--", path])
}

pub fn remove_command(path: &str) -> Vec<String> {
    argv(&["rm", "-rf", "--", path])
}

/// Decode a directory path carried as a base64 URL segment.
///
/// Standard and URL-safe alphabets are accepted, with or without padding.
pub fn decode_path_segment(segment: &str) -> Option<String> {
    [&STANDARD, &URL_SAFE, &STANDARD_NO_PAD, &URL_SAFE_NO_PAD]
        .into_iter()
        .find_map(|engine| engine.decode(segment).ok())
        .and_then(|bytes| String::from_utf8(bytes).ok())
}
