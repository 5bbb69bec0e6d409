use std::fmt;
use std::path::Path;

/// Separator between the group and object segments of a bucket key.
/// Neither segment may contain it.
pub const KEY_SEPARATOR: char = '/';

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("replica group must not be empty")]
    EmptyGroup,
    #[error("replica object id must not be empty")]
    EmptyId,
    #[error("replica group '{0}' must not contain '{KEY_SEPARATOR}'")]
    SeparatorInGroup(String),
    #[error("replica object id '{0}' must not contain '{KEY_SEPARATOR}'")]
    SeparatorInId(String),
}

/// Logical location of one replica: a caller-chosen group (the purpose of
/// the copy) plus the object's name within it.
///
/// Construction validates both segments, so every address that exists maps
/// to exactly one bucket key and distinct addresses never collide.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ReplicaAddress {
    group: String,
    id: String,
}

impl ReplicaAddress {
    pub fn new(group: &str, id: &str) -> Result<Self, AddressError> {
        if group.is_empty() {
            return Err(AddressError::EmptyGroup);
        }
        if group.contains(KEY_SEPARATOR) {
            return Err(AddressError::SeparatorInGroup(group.to_string()));
        }
        if id.is_empty() {
            return Err(AddressError::EmptyId);
        }
        if id.contains(KEY_SEPARATOR) {
            return Err(AddressError::SeparatorInId(id.to_string()));
        }
        Ok(Self {
            group: group.to_string(),
            id: id.to_string(),
        })
    }

    /// Address for a local payload file, named after the file itself.
    pub fn for_file(group: &str, path: &Path) -> Result<Self, AddressError> {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or(AddressError::EmptyId)?;
        Self::new(group, name)
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The bucket key this address resolves to: `{group}/{id}`.
    ///
    /// Deterministic and injective: listing a group's key prefix lists
    /// exactly that group's members.
    pub fn key(&self) -> String {
        format!("{}{}{}", self.group, KEY_SEPARATOR, self.id)
    }
}

impl fmt::Display for ReplicaAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.group, KEY_SEPARATOR, self.id)
    }
}
