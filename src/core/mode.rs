use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A named build target. The mode decides how conditional directives are
/// evaluated, which resource variants the builders pick, and the suffix of the
/// generated file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GenerationMode {
    Development,
    Production,
    Testing,
    AutoTesting,
    TestingDebug,
    AutoTestingDebug,
    PTest,
    Stats,
    /// Documentation pass. It is evaluated like any other mode but has no
    /// output suffix, so no file is ever written for it.
    Doc,
}

impl GenerationMode {
    pub const ALL: [GenerationMode; 9] = [
        GenerationMode::Development,
        GenerationMode::Production,
        GenerationMode::Testing,
        GenerationMode::AutoTesting,
        GenerationMode::TestingDebug,
        GenerationMode::AutoTestingDebug,
        GenerationMode::PTest,
        GenerationMode::Stats,
        GenerationMode::Doc,
    ];

    /// The file name suffix for this mode, `None` when the mode produces no file.
    pub fn suffix(&self) -> Option<&'static str> {
        match self {
            GenerationMode::Development => Some("dev"),
            GenerationMode::Production => Some("prod"),
            GenerationMode::Testing => Some("test"),
            GenerationMode::AutoTesting => Some("auto"),
            GenerationMode::TestingDebug => Some("testdebug"),
            GenerationMode::AutoTestingDebug => Some("autodebug"),
            GenerationMode::PTest => Some("ptest"),
            GenerationMode::Stats => Some("stats"),
            GenerationMode::Doc => None,
        }
    }

    /// Testing modes keep mock directives.
    pub fn is_testing(&self) -> bool {
        matches!(
            self,
            GenerationMode::Testing
                | GenerationMode::AutoTesting
                | GenerationMode::TestingDebug
                | GenerationMode::AutoTestingDebug
                | GenerationMode::PTest
        )
    }

    /// Modes that ship the minified variants of injected resources.
    pub fn is_minified(&self) -> bool {
        matches!(
            self,
            GenerationMode::Production | GenerationMode::PTest | GenerationMode::Stats
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            GenerationMode::Development => "DEVELOPMENT",
            GenerationMode::Production => "PRODUCTION",
            GenerationMode::Testing => "TESTING",
            GenerationMode::AutoTesting => "AUTOTESTING",
            GenerationMode::TestingDebug => "TESTINGDEBUG",
            GenerationMode::AutoTestingDebug => "AUTOTESTINGDEBUG",
            GenerationMode::PTest => "PTEST",
            GenerationMode::Stats => "STATS",
            GenerationMode::Doc => "DOC",
        }
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for GenerationMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        GenerationMode::ALL
            .into_iter()
            .find(|mode| {
                mode.name().eq_ignore_ascii_case(wanted)
                    || mode.suffix().is_some_and(|suffix| suffix == wanted)
            })
            .ok_or_else(|| anyhow::anyhow!("Invalid generation mode: {}", s))
    }
}
