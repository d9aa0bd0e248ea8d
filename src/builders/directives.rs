use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use crate::core::error::{BundleError, BundleResult};
use crate::core::mode::GenerationMode;

/// The closed set of directive kinds the engine understands.
///
/// Each variant decides on its own what a marker turns into for a given
/// generation mode; the evaluator only walks the text and applies the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DirectiveKind {
    /// Pulls another file into the group and inlines it at the marker.
    Include,
    /// A block kept only for the modes listed in its JSON options.
    Conditional,
    /// A single line of code that only exists in testing modes.
    Mock,
    /// A block of code that only exists in testing modes.
    MultiLineMock,
    /// A marker that is always dropped.
    Dummy,
}

impl DirectiveKind {
    pub const ALL: [DirectiveKind; 5] = [
        DirectiveKind::Include,
        DirectiveKind::Conditional,
        DirectiveKind::Mock,
        DirectiveKind::MultiLineMock,
        DirectiveKind::Dummy,
    ];

    /// The label a source file uses for this kind unless configured otherwise.
    pub fn default_label(&self) -> &'static str {
        match self {
            DirectiveKind::Include => "include",
            DirectiveKind::Conditional => "if",
            DirectiveKind::Mock => "mock",
            DirectiveKind::MultiLineMock => "multilinemock",
            DirectiveKind::Dummy => "dummy",
        }
    }

    fn from_default_label(label: &str) -> Option<Self> {
        DirectiveKind::ALL
            .into_iter()
            .find(|kind| kind.default_label() == label)
    }

    /// Decides what a marker of this kind becomes in `mode`.
    ///
    /// `options` is the text following the label on the marker line. Errors are
    /// plain messages; the evaluator attaches the file and line.
    pub fn evaluate(&self, options: &str, mode: GenerationMode) -> Result<Evaluation, String> {
        match self {
            DirectiveKind::Include => Ok(Evaluation::Inline),
            DirectiveKind::Conditional => {
                let options = ConditionalOptions::parse(options)?;
                Ok(Evaluation::Block {
                    keep: options.keeps(mode),
                })
            }
            DirectiveKind::Mock => {
                if mode.is_testing() && !options.is_empty() {
                    Ok(Evaluation::Emit(options.to_string()))
                } else {
                    Ok(Evaluation::Omit)
                }
            }
            DirectiveKind::MultiLineMock => Ok(Evaluation::Block {
                keep: mode.is_testing(),
            }),
            DirectiveKind::Dummy => Ok(Evaluation::Omit),
        }
    }
}

impl fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectiveKind::Include => write!(f, "include"),
            DirectiveKind::Conditional => write!(f, "conditional"),
            DirectiveKind::Mock => write!(f, "mock"),
            DirectiveKind::MultiLineMock => write!(f, "multi-line-mock"),
            DirectiveKind::Dummy => write!(f, "dummy"),
        }
    }
}

/// The outcome of evaluating one marker for one mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    /// Replace the marker line with this text.
    Emit(String),
    /// Drop the marker line.
    Omit,
    /// Replace the marker with the evaluated content of the referenced file.
    Inline,
    /// Open a block; its body is kept or dropped as a whole.
    Block { keep: bool },
}

/// Options carried by a conditional marker, e.g.
/// `// #if {"modes": ["DEVELOPMENT", "TESTING"]}`.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ConditionalOptions {
    #[serde(default)]
    pub modes: Vec<GenerationMode>,
    #[serde(default, rename = "excludeModes")]
    pub exclude_modes: Vec<GenerationMode>,
}

impl ConditionalOptions {
    pub fn parse(options: &str) -> Result<Self, String> {
        if options.trim().is_empty() {
            return Err("conditional directive requires JSON options".to_string());
        }
        let parsed: ConditionalOptions = serde_json::from_str(options)
            .map_err(|e| format!("invalid conditional options '{options}': {e}"))?;
        if parsed.modes.is_empty() && parsed.exclude_modes.is_empty() {
            return Err("conditional directive must list 'modes' or 'excludeModes'".to_string());
        }
        Ok(parsed)
    }

    pub fn keeps(&self, mode: GenerationMode) -> bool {
        (self.modes.is_empty() || self.modes.contains(&mode)) && !self.exclude_modes.contains(&mode)
    }
}

/// A registered directive: a kind plus the label that selects it in source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectiveType {
    pub kind: DirectiveKind,
    pub label: String,
}

impl DirectiveType {
    pub fn new(kind: DirectiveKind) -> Self {
        Self {
            kind,
            label: kind.default_label().to_string(),
        }
    }

    pub fn with_label(kind: DirectiveKind, label: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
        }
    }

    pub fn include() -> Self {
        Self::new(DirectiveKind::Include)
    }

    pub fn conditional() -> Self {
        Self::new(DirectiveKind::Conditional)
    }

    pub fn mock() -> Self {
        Self::new(DirectiveKind::Mock)
    }

    pub fn multi_line_mock() -> Self {
        Self::new(DirectiveKind::MultiLineMock)
    }

    pub fn dummy() -> Self {
        Self::new(DirectiveKind::Dummy)
    }
}

/// How directive markers look in source text.
///
/// A marker is a whole line: optional indentation, the `prefix` (a regex
/// fragment), the label, then free-form options up to the end of the line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerSyntax {
    pub prefix: String,
    pub end_label: String,
}

impl Default for MarkerSyntax {
    fn default() -> Self {
        Self {
            prefix: r"//\s*#".to_string(),
            end_label: "end".to_string(),
        }
    }
}

impl MarkerSyntax {
    pub fn compile(&self) -> BundleResult<Regex> {
        let pattern = format!(
            r"^\s*{}(?P<label>[A-Za-z_][A-Za-z0-9_]*)\b[ \t]*(?P<options>.*?)\s*$",
            self.prefix
        );
        Ok(Regex::new(&pattern)?)
    }
}

/// A marker found while scanning a file. Line numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveMarker {
    pub line: usize,
    pub label: String,
    pub options: String,
}

/// What a marker label means for a particular group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelResolution {
    /// A directive the group registered.
    Registered(DirectiveKind),
    /// Closes the innermost open block.
    End,
    /// A known directive kind the group did not register.
    Foreign(DirectiveKind),
    /// Not a directive at all; the line is plain text.
    Unknown,
}

/// The directive types a group recognizes, keyed by label.
///
/// The label-to-kind table is recorded once when the registry is built and
/// is read-only afterwards, so every file and every mode sees the same
/// expectations.
#[derive(Debug, Clone)]
pub struct DirectiveRegistry {
    types: Vec<DirectiveType>,
    by_label: HashMap<String, DirectiveKind>,
    end_label: String,
    marker: Regex,
}

impl DirectiveRegistry {
    pub fn new(types: Vec<DirectiveType>, syntax: &MarkerSyntax) -> BundleResult<Self> {
        let marker = syntax.compile()?;
        let mut by_label = HashMap::new();
        for directive in &types {
            if directive.label == syntax.end_label {
                return Err(BundleError::LabelConflict {
                    label: directive.label.clone(),
                    conflict: "the end marker".to_string(),
                });
            }
            if let Some(previous) = by_label.insert(directive.label.clone(), directive.kind) {
                return Err(BundleError::LabelConflict {
                    label: directive.label.clone(),
                    conflict: format!("the {previous} directive"),
                });
            }
        }

        Ok(Self {
            types,
            by_label,
            end_label: syntax.end_label.clone(),
            marker,
        })
    }

    pub fn with_defaults(types: Vec<DirectiveType>) -> BundleResult<Self> {
        Self::new(types, &MarkerSyntax::default())
    }

    pub fn types(&self) -> &[DirectiveType] {
        &self.types
    }

    /// Human-readable list of what this registry accepts, used in mismatch errors.
    pub fn expected(&self) -> String {
        if self.types.is_empty() {
            return "no directives".to_string();
        }
        self.types
            .iter()
            .map(|directive| directive.label.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Finds every marker line in `content`.
    pub fn scan(&self, content: &str) -> Vec<DirectiveMarker> {
        content
            .lines()
            .enumerate()
            .filter_map(|(index, line)| self.match_line(line, index + 1))
            .collect()
    }

    /// Matches a single line, returning the marker if the line is one.
    pub fn match_line(&self, line: &str, line_number: usize) -> Option<DirectiveMarker> {
        let captures = self.marker.captures(line)?;
        Some(DirectiveMarker {
            line: line_number,
            label: captures["label"].to_string(),
            options: captures["options"].to_string(),
        })
    }

    pub fn resolve(&self, label: &str) -> LabelResolution {
        if let Some(kind) = self.by_label.get(label) {
            return LabelResolution::Registered(*kind);
        }
        if label == self.end_label {
            return LabelResolution::End;
        }
        match DirectiveKind::from_default_label(label) {
            Some(kind) => LabelResolution::Foreign(kind),
            None => LabelResolution::Unknown,
        }
    }

    /// Whether `marker` is an include this registry follows.
    pub fn is_include(&self, marker: &DirectiveMarker) -> bool {
        matches!(
            self.resolve(&marker.label),
            LabelResolution::Registered(DirectiveKind::Include)
        )
    }

    pub fn ensure_known(&self, file: &std::path::Path, marker: &DirectiveMarker) -> BundleResult<()> {
        if let LabelResolution::Foreign(found) = self.resolve(&marker.label) {
            return Err(BundleError::DirectiveMismatch {
                file: file.to_path_buf(),
                line: marker.line,
                label: marker.label.clone(),
                found,
                expected: self.expected(),
            });
        }
        Ok(())
    }
}

/// Maps an include target to a path relative to the group's base directory.
///
/// Targets containing a `/` or ending in `.js` are taken as paths; anything
/// else is a dotted name, so `aura.util.Json` becomes `aura/util/Json.js`.
pub fn include_target(options: &str) -> Option<PathBuf> {
    let target = options.trim().trim_matches(|c| c == '"' || c == '\'');
    if target.is_empty() {
        return None;
    }
    if target.contains('/') || target.ends_with(".js") {
        return Some(PathBuf::from(target));
    }
    let mut path: PathBuf = target.split('.').collect();
    path.set_extension("js");
    Some(path)
}
