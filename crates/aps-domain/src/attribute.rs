/// Object attributes the store exposes to callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectAttribute {
    Checksum,
    SizeBytes,
    Modified,
}

impl ObjectAttribute {
    /// Parse a caller-supplied attribute name.
    ///
    /// Unrecognized names yield `None`; they are not an error.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "checksum" => Some(Self::Checksum),
            "sizebytes" => Some(Self::SizeBytes),
            "modified" => Some(Self::Modified),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Checksum => "checksum",
            Self::SizeBytes => "sizebytes",
            Self::Modified => "modified",
        }
    }
}
