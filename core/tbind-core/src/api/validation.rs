//! Validation error collection filled by [`Entity::validate`](crate::Entity::validate).

/// Attribute name used for errors that are not tied to one attribute.
pub const BASE: &str = "base";

/// Ordered list of `(attribute, message)` validation errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Errors {
    entries: Vec<(String, String)>,
}

impl Errors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, attribute: impl Into<String>, message: impl Into<String>) {
        self.entries.push((attribute.into(), message.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Messages recorded against `attribute`.
    pub fn on(&self, attribute: &str) -> Vec<&str> {
        self.iter()
            .filter(|(attr, _)| *attr == attribute)
            .map(|(_, msg)| msg)
            .collect()
    }

    /// `"<attribute> <message>"` for each error; base errors are the bare message.
    pub fn full_messages(&self) -> Vec<String> {
        self.iter()
            .map(|(attr, msg)| {
                if attr == BASE {
                    msg.to_string()
                } else {
                    format!("{attr} {msg}")
                }
            })
            .collect()
    }

    /// `(attribute, message)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(a, m)| (a.as_str(), m.as_str()))
    }
}
