use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Literal used on the wire for "finish the form".
pub const END_TARGET: &str = "end";

/// Destination referenced by `nextSectionId` and conditional rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SectionTarget {
    End,
    Section(String),
}

impl SectionTarget {
    pub fn section(id: impl Into<String>) -> Self {
        Self::Section(id.into())
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }

    pub fn section_id(&self) -> Option<&str> {
        match self {
            Self::End => None,
            Self::Section(id) => Some(id),
        }
    }
}

impl From<String> for SectionTarget {
    fn from(raw: String) -> Self {
        if raw == END_TARGET {
            Self::End
        } else {
            Self::Section(raw)
        }
    }
}

impl From<&str> for SectionTarget {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_string())
    }
}

impl From<SectionTarget> for String {
    fn from(target: SectionTarget) -> Self {
        match target {
            SectionTarget::End => END_TARGET.to_string(),
            SectionTarget::Section(id) => id,
        }
    }
}

impl fmt::Display for SectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::End => f.write_str(END_TARGET),
            Self::Section(id) => f.write_str(id),
        }
    }
}

/// Editors save "sequential" as an empty string; treat it as unset.
pub(crate) fn deserialize_optional_target<'de, D>(
    deserializer: D,
) -> Result<Option<SectionTarget>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .filter(|value| !value.trim().is_empty())
        .map(SectionTarget::from))
}
