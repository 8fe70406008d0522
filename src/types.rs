use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Package index platform.
///
/// Only the platforms this tool builds for are represented; `Noarch` holds
/// platform-independent packages and is always consulted alongside the
/// native platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum Platform {
    Linux,
    Osx,
    Noarch,
}

impl Platform {
    /// Subdirectory name used by channels and build output folders.
    pub fn subdir(self) -> &'static str {
        match self {
            Platform::Linux => "linux-64",
            Platform::Osx => "osx-64",
            Platform::Noarch => "noarch",
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Platform::Linux
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.subdir())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "linux" | "linux-64" => Ok(Platform::Linux),
            "osx" | "osx-64" => Ok(Platform::Osx),
            "noarch" => Ok(Platform::Noarch),
            other => Err(format!(
                "invalid platform: {other} (expected \"linux-64\", \"osx-64\" or \"noarch\")"
            )),
        }
    }
}

impl TryFrom<String> for Platform {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Noarch classification of a recipe.
///
/// - `Python`: pure-interpreter package; one build serves every interpreter
///   version, so freshness is judged by version + build number alone.
/// - `Generic`: platform independent data/scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoarchKind {
    Python,
    Generic,
}

impl FromStr for NoarchKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "python" => Ok(NoarchKind::Python),
            "generic" => Ok(NoarchKind::Generic),
            other => Err(format!(
                "invalid noarch kind: {other} (expected \"python\" or \"generic\")"
            )),
        }
    }
}
