use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {field} value: {value}")]
pub struct InvalidEnum {
    pub field: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = InvalidEnum;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(SourceTag {
    NamUs => "namus",
    Ncmec => "ncmec",
    Fbi => "fbi",
    Charley => "charley",
});

impl SourceTag {
    /// Tie-break order for classification: agency posters first.
    pub const PRIORITY: [SourceTag; 4] = [
        SourceTag::Fbi,
        SourceTag::Ncmec,
        SourceTag::NamUs,
        SourceTag::Charley,
    ];

    /// Lenient mapping from a source directory name.
    pub fn from_hint(dir_name: &str) -> Option<Self> {
        let key: String = dir_name
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match key.as_str() {
            "namus" => Some(Self::NamUs),
            "ncmec" | "missingkids" => Some(Self::Ncmec),
            "fbi" => Some(Self::Fbi),
            "charley" | "charleyproject" | "thecharleyproject" => Some(Self::Charley),
            _ => None,
        }
    }

    pub fn priority_rank(&self) -> usize {
        Self::PRIORITY
            .iter()
            .position(|s| s == self)
            .unwrap_or(Self::PRIORITY.len())
    }
}

str_enum!(CaseStatus {
    Open => "open",
    Recovered => "recovered",
    Deceased => "deceased",
    Unknown => "unknown",
});

str_enum!(Gender {
    Male => "male",
    Female => "female",
});
