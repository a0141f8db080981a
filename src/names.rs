//! Name table mapping identifier strings to small integer ids.

use std::collections::HashMap;
use std::fmt;

/// A unique identifier for an interned name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NameId(pub usize);

impl fmt::Display for NameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Interning table. Ids are handed out in first-seen order starting at 0.
#[derive(Debug, Clone, Default)]
pub struct Names {
    strings: Vec<String>,
    index: HashMap<String, NameId>,
}

impl Names {
    /// Create an empty name table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the ids of `names`, interning any that are new.
    pub fn lookup(&mut self, names: &[&str]) -> Vec<NameId> {
        names.iter().map(|name| self.lookup_one(name)).collect()
    }

    /// Return the id of `name`, interning it if new.
    pub fn lookup_one(&mut self, name: &str) -> NameId {
        if let Some(id) = self.index.get(name) {
            return *id;
        }
        let id = NameId(self.strings.len());
        self.strings.push(name.to_string());
        self.index.insert(name.to_string(), id);
        id
    }

    /// Return the id of `name` without interning it.
    pub fn query(&self, name: &str) -> Option<NameId> {
        self.index.get(name).copied()
    }

    /// Return the string for `id`, if it has been interned.
    pub fn get_name_string(&self, id: NameId) -> Option<&str> {
        self.strings.get(id.0).map(String::as_str)
    }

    /// Like [`get_name_string`](Self::get_name_string), for use in messages.
    pub fn display(&self, id: NameId) -> String {
        self.get_name_string(id)
            .map(str::to_string)
            .unwrap_or_else(|| format!("<{}>", id))
    }

    /// Number of interned names.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn used_names() -> Names {
        let mut names = Names::new();
        names.lookup(&["Alice", "Bob", "Eve"]);
        names
    }

    #[test]
    fn test_get_name_string() {
        let names = used_names();
        assert_eq!(names.get_name_string(NameId(0)), Some("Alice"));
        assert_eq!(names.get_name_string(NameId(2)), Some("Eve"));
        assert_eq!(names.get_name_string(NameId(3)), None);
        assert_eq!(Names::new().get_name_string(NameId(0)), None);
    }

    #[test]
    fn test_lookup_interns_in_order() {
        let mut names = used_names();
        let ids = names.lookup(&["Alice", "Bob", "Eve", "Mallory"]);
        assert_eq!(ids, vec![NameId(0), NameId(1), NameId(2), NameId(3)]);
        assert_eq!(names.len(), 4);
    }

    #[test]
    fn test_query_does_not_insert() {
        let names = used_names();
        assert_eq!(names.query("Bob"), Some(NameId(1)));
        assert_eq!(names.query("Mallory"), None);
        assert_eq!(names.len(), 3);
    }
}
