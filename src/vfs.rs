//! The in-memory filesystem backing the sandboxed backend.
//!
//! Entries live in a map keyed by normalized absolute path. Directory
//! membership is derived by comparing parent paths at lookup time; no
//! parent/child links are stored. The store is bounded and everything in
//! it is lost when the session ends.

use std::collections::BTreeMap;

use chrono::{DateTime, Local};

/// Maximum number of entries the store will hold.
pub const CAPACITY: usize = 100;

/// Upper bound on stored file content, in bytes.
pub const MAX_CONTENT: usize = 4096;

/// Root and initial working directory of every session.
pub const ROOT: &str = "/";
pub const HOME: &str = "/home";

/// Contents of the seeded `/home/README.md`, also served by `readme`.
pub const README_CONTENT: &str = "Available commands:\n\n\
    ls      - List files in current directory\n\
    cd      - Change directory\n\
    pwd     - Show current directory path\n\
    echo    - Print text to terminal\n\
    cat     - Display file contents\n\
    touch   - Create a new empty file\n\
    mkdir   - Create a new directory\n\
    rm      - Remove a file or directory\n\
    date    - Show current date and time\n\
    whoami  - Show current user\n\
    clear   - Clear terminal screen\n\
    help    - Show detailed command help\n\
    readme  - Show this command list\n";

/// One file or directory in the store.
#[derive(Debug, Clone)]
pub struct VfsEntry {
    pub is_dir: bool,
    /// Empty for directories; truncated to [`MAX_CONTENT`] on insertion.
    pub content: String,
    pub created: DateTime<Local>,
    pub modified: DateTime<Local>,
}

/// The filesystem store plus the two directory cells `cd` operates on.
#[derive(Debug)]
pub struct VfsState {
    entries: BTreeMap<String, VfsEntry>,
    pub current_dir: String,
    pub previous_dir: String,
}

impl VfsState {
    pub fn new() -> Self {
        let mut state = VfsState {
            entries: BTreeMap::new(),
            current_dir: HOME.to_string(),
            previous_dir: HOME.to_string(),
        };
        state.seed();
        state
    }

    /// Populate the initial tree. Idempotent: a non-empty store is left
    /// alone.
    fn seed(&mut self) {
        if !self.entries.is_empty() {
            return;
        }
        let now = Local::now();
        for path in [ROOT, HOME] {
            self.entries.insert(
                path.to_string(),
                VfsEntry {
                    is_dir: true,
                    content: String::new(),
                    created: now,
                    modified: now,
                },
            );
        }
        self.entries.insert(
            format!("{HOME}/README.md"),
            VfsEntry {
                is_dir: false,
                content: README_CONTENT.to_string(),
                created: now,
                modified: now,
            },
        );
        log::debug!("seeded virtual filesystem with {} entries", self.entries.len());
    }

    /// Resolve a command operand to an absolute path.
    ///
    /// Absolute names are used as-is. `..` names the parent of the current
    /// directory (bottoming out at `/`). Anything else is joined to the
    /// current directory with one separator.
    pub fn resolve(&self, name: &str) -> String {
        if name.starts_with('/') {
            return name.to_string();
        }
        if name == ".." {
            return parent_of(&self.current_dir).unwrap_or_else(|| ROOT.to_string());
        }
        if self.current_dir == ROOT {
            format!("/{name}")
        } else {
            format!("{}/{}", self.current_dir, name)
        }
    }

    pub fn entry(&self, path: &str) -> Option<&VfsEntry> {
        self.entries.get(path)
    }

    pub fn entry_mut(&mut self, path: &str) -> Option<&mut VfsEntry> {
        self.entries.get_mut(path)
    }

    /// Insert a new entry. Returns `false`, creating nothing, when the
    /// store is at capacity.
    pub fn insert(&mut self, path: String, is_dir: bool, content: &str) -> bool {
        if self.entries.len() >= CAPACITY {
            return false;
        }
        let mut content = content.to_string();
        content.truncate(MAX_CONTENT);
        let now = Local::now();
        self.entries.insert(
            path,
            VfsEntry {
                is_dir,
                content,
                created: now,
                modified: now,
            },
        );
        true
    }

    /// Remove the single entry with an exact path match.
    pub fn remove(&mut self, path: &str) -> bool {
        self.entries.remove(path).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries whose parent path equals the current directory, in store
    /// order, as `(bare name, entry)` pairs.
    pub fn list_current(&self) -> Vec<(&str, &VfsEntry)> {
        self.entries
            .iter()
            .filter(|(path, _)| {
                parent_of(path).as_deref() == Some(self.current_dir.as_str())
            })
            .map(|(path, entry)| (bare_name(path), entry))
            .collect()
    }
}

/// Parent path of an absolute path; `None` for the root itself.
pub fn parent_of(path: &str) -> Option<String> {
    if path == ROOT {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some(ROOT.to_string()),
        Some(idx) => Some(path[..idx].to_string()),
        None => None,
    }
}

/// Final path segment, used for listings.
pub fn bare_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_root_home_and_readme() {
        let state = VfsState::new();
        assert_eq!(state.len(), 3);
        assert!(state.entry(ROOT).is_some_and(|e| e.is_dir));
        assert!(state.entry(HOME).is_some_and(|e| e.is_dir));
        let readme = state.entry("/home/README.md").expect("seeded readme");
        assert!(!readme.is_dir);
        assert_eq!(readme.content, README_CONTENT);
        assert_eq!(state.current_dir, HOME);
        assert_eq!(state.previous_dir, HOME);
    }

    #[test]
    fn resolve_absolute_is_used_as_is() {
        let state = VfsState::new();
        assert_eq!(state.resolve("/etc/passwd"), "/etc/passwd");
    }

    #[test]
    fn resolve_joins_relative_to_current() {
        let mut state = VfsState::new();
        assert_eq!(state.resolve("notes.txt"), "/home/notes.txt");
        state.current_dir = ROOT.to_string();
        assert_eq!(state.resolve("home"), "/home");
    }

    #[test]
    fn resolve_dotdot_trims_current_directory() {
        let mut state = VfsState::new();
        assert_eq!(state.resolve(".."), "/");
        state.current_dir = "/home/docs".to_string();
        assert_eq!(state.resolve(".."), "/home");
        state.current_dir = ROOT.to_string();
        assert_eq!(state.resolve(".."), "/");
    }

    #[test]
    fn parent_of_root_is_none() {
        assert_eq!(parent_of("/"), None);
        assert_eq!(parent_of("/home"), Some("/".to_string()));
        assert_eq!(parent_of("/home/README.md"), Some("/home".to_string()));
    }

    #[test]
    fn listing_is_derived_from_parent_paths() {
        let mut state = VfsState::new();
        state.current_dir = ROOT.to_string();
        let names: Vec<&str> = state.list_current().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, ["home"]);

        state.current_dir = HOME.to_string();
        let names: Vec<&str> = state.list_current().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, ["README.md"]);
    }

    #[test]
    fn insert_rejects_beyond_capacity() {
        let mut state = VfsState::new();
        let seeded = state.len();
        for i in 0..(CAPACITY - seeded) {
            assert!(state.insert(format!("/home/f{i}"), false, ""));
        }
        assert_eq!(state.len(), CAPACITY);
        assert!(!state.insert("/home/overflow".to_string(), false, ""));
        assert_eq!(state.len(), CAPACITY);
    }

    #[test]
    fn remove_is_exact_match_only() {
        let mut state = VfsState::new();
        assert!(!state.remove("/home/README"));
        assert!(state.remove("/home/README.md"));
        assert_eq!(state.len(), 2);
    }
}
