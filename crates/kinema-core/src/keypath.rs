//! Content-tree addressing with wildcard patterns.
//!
//! A key path names nodes in the layer/content hierarchy, e.g.
//! `["Shape Layer 1", "Group 1", "Fill"]`. Two wildcards are understood:
//! `*` matches exactly one name at its position, `**` matches zero or more
//! consecutive names. Resolution walks the runtime tree (see `tree`), using
//! the depth-stepping queries here at each node.

use std::fmt;

/// Name of the implicit wrapper nodes (a layer's own content stack). A
/// container is transparent to matching: it never consumes pattern depth.
pub const CONTAINER: &str = "__container";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPath {
    keys: Vec<String>,
}

impl KeyPath {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        KeyPath {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// A copy with `key` appended; used while materializing resolved paths.
    pub fn extended(&self, key: &str) -> KeyPath {
        let mut keys = self.keys.clone();
        keys.push(key.to_string());
        KeyPath { keys }
    }

    fn ends_with_globstar(&self) -> bool {
        self.keys.last().map(String::as_str) == Some("**")
    }

    /// Whether `key` at `depth` is consistent with this pattern.
    pub fn matches(&self, key: &str, depth: usize) -> bool {
        if key == CONTAINER {
            return true;
        }
        if depth >= self.keys.len() {
            return false;
        }
        let at = self.keys[depth].as_str();
        at == key || at == "**" || at == "*"
    }

    /// How much pattern depth `key` consumes: containers consume none, a
    /// `**` consumes none unless the following key matches (then both are
    /// consumed), everything else consumes one.
    pub fn increment_depth_by(&self, key: &str, depth: usize) -> usize {
        if key == CONTAINER {
            return 0;
        }
        if self.keys[depth] != "**" {
            return 1;
        }
        if depth == self.keys.len() - 1 {
            return 0;
        }
        if self.keys[depth + 1] == key {
            return 2;
        }
        0
    }

    /// Whether the pattern is fully consumed at `key`/`depth`, i.e. the node
    /// is a final match rather than an intermediate one.
    pub fn fully_resolves_to(&self, key: &str, depth: usize) -> bool {
        if depth >= self.keys.len() {
            return false;
        }
        let is_last_depth = depth == self.keys.len() - 1;
        let at = self.keys[depth].as_str();

        if at != "**" {
            let matches = at == key || at == "*";
            return (is_last_depth
                || (depth == self.keys.len() - 2 && self.ends_with_globstar()))
                && matches;
        }

        let globstar_but_next_key_matches = !is_last_depth && self.keys[depth + 1] == key;
        if globstar_but_next_key_matches {
            return depth == self.keys.len() - 2
                || (depth == self.keys.len() - 3 && self.ends_with_globstar());
        }

        if is_last_depth {
            return true;
        }
        if depth + 1 < self.keys.len() - 1 {
            // After the globstar there are more keys than just the next one.
            return false;
        }
        self.keys[depth + 1] == key
    }

    /// Whether matching should continue into the children of `key`.
    pub fn propagate_to_children(&self, key: &str, depth: usize) -> bool {
        if key == CONTAINER {
            return true;
        }
        depth < self.keys.len() - 1 || self.keys[depth] == "**"
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keys.join("."))
    }
}
