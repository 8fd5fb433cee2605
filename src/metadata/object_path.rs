// src/metadata/object_path.rs
use std::fmt;

use crate::error::{Result, TdmsError};

/// A parsed object path from the TDMS hierarchy: the root object `/`, a
/// group `/'Name'`, or a channel `/'Group'/'Channel'`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ObjectPath {
    Root,
    Group(String),
    Channel { group: String, channel: String },
}

impl ObjectPath {
    /// Parses a path string. Components are single-quoted; `''` inside a
    /// component is an escaped quote, and `/` inside a component does not
    /// delimit. Anything beyond two components, or any unquoted or
    /// unterminated component, is rejected.
    pub fn parse(path: &str) -> Result<Self> {
        let invalid = || TdmsError::InvalidPath(path.to_string());

        if path == "/" {
            return Ok(ObjectPath::Root);
        }

        let mut components: Vec<String> = Vec::with_capacity(2);
        let mut rest = path;

        while !rest.is_empty() {
            rest = rest.strip_prefix('/').ok_or_else(invalid)?;
            rest = rest.strip_prefix('\'').ok_or_else(invalid)?;

            let mut name = String::new();
            let mut closed_at = None;
            let mut chars = rest.char_indices().peekable();
            while let Some((i, c)) = chars.next() {
                if c == '\'' {
                    if matches!(chars.peek(), Some((_, '\''))) {
                        chars.next();
                        name.push('\'');
                    } else {
                        closed_at = Some(i + 1);
                        break;
                    }
                } else {
                    name.push(c);
                }
            }

            let end = closed_at.ok_or_else(invalid)?;
            components.push(name);
            rest = &rest[end..];
        }

        let mut components = components.into_iter();
        match (components.next(), components.next(), components.next()) {
            (Some(group), None, _) => Ok(ObjectPath::Group(group)),
            (Some(group), Some(channel), None) => Ok(ObjectPath::Channel { group, channel }),
            _ => Err(invalid()),
        }
    }

    pub fn group(&self) -> Option<&str> {
        match self {
            ObjectPath::Root => None,
            ObjectPath::Group(group) => Some(group),
            ObjectPath::Channel { group, .. } => Some(group),
        }
    }

    pub fn channel(&self) -> Option<&str> {
        match self {
            ObjectPath::Channel { channel, .. } => Some(channel),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let escape = |name: &str| name.replace('\'', "''");
        match self {
            ObjectPath::Root => write!(f, "/"),
            ObjectPath::Group(group) => write!(f, "/'{}'", escape(group)),
            ObjectPath::Channel { group, channel } => {
                write!(f, "/'{}'/'{}'", escape(group), escape(channel))
            }
        }
    }
}
