use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Directory,
    File,
}

impl ItemKind {
    /// `find -type` letter for this kind.
    pub fn find_type(self) -> &'static str {
        match self {
            ItemKind::Directory => "d",
            ItemKind::File => "f",
        }
    }
}

/// One entry of the file tree as the IDE frontend consumes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSystemItem {
    pub name: String,
    pub path: String,
    pub parent_path: Option<String>,
    pub kind: ItemKind,
    pub handle: Option<String>,
    pub content: Option<String>,
    pub is_saved: bool,
    pub is_open: bool,
}

impl FileSystemItem {
    pub fn new(path: &str, kind: ItemKind) -> Self {
        let (parent, name) = match path.rsplit_once('/') {
            Some((parent, name)) => (parent, name),
            None => ("", path),
        };
        Self {
            name: name.to_string(),
            path: path.to_string(),
            parent_path: (!parent.is_empty()).then(|| parent.to_string()),
            kind,
            handle: None,
            content: None,
            is_saved: true,
            is_open: false,
        }
    }
}

/// Turn newline-separated `find` output into items, skipping blank lines.
pub fn parse_listing(output: &str, kind: ItemKind) -> Vec<FileSystemItem> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| FileSystemItem::new(line, kind))
        .collect()
}

/// Items whose parent path contains `dir`.
pub fn filter_by_parent(items: Vec<FileSystemItem>, dir: &str) -> Vec<FileSystemItem> {
    items
        .into_iter()
        .filter(|item| item.parent_path.as_deref().is_some_and(|p| p.contains(dir)))
        .collect()
}
