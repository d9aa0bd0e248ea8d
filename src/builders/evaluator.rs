use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use tracing::trace;

use crate::builders::directives::{
    DirectiveKind, DirectiveMarker, DirectiveRegistry, Evaluation, LabelResolution,
};
use crate::core::error::{BundleError, BundleResult};
use crate::core::graph::{FileSet, SourceFile};
use crate::core::mode::GenerationMode;

/// A block directive waiting for its end marker.
struct OpenBlock {
    line: usize,
    kind: DirectiveKind,
    keep: bool,
}

/// Turns a group's files into one mode-specific text.
///
/// Evaluation starts at the start file. Plain lines pass through, markers are
/// replaced according to their kind, and an include marker is replaced by the
/// evaluated content of its target the first time that target is reached.
pub struct DirectiveEvaluator<'a> {
    registry: &'a DirectiveRegistry,
    files: &'a FileSet,
}

impl<'a> DirectiveEvaluator<'a> {
    pub fn new(registry: &'a DirectiveRegistry, files: &'a FileSet) -> Self {
        Self { registry, files }
    }

    /// Fails with a directive mismatch if any file, in any region, carries a
    /// marker for a kind the registry does not expect.
    pub fn check_markers(&self) -> BundleResult<()> {
        for file in self.files.iter() {
            for marker in &file.markers {
                self.registry.ensure_known(&file.path, marker)?;
            }
        }
        Ok(())
    }

    pub fn evaluate(&self, mode: GenerationMode) -> BundleResult<String> {
        self.check_markers()?;

        let mut output = String::new();
        let Some(start) = self.files.start() else {
            return Ok(output);
        };
        let mut emitted = HashSet::new();
        self.evaluate_file(start, mode, &mut emitted, &mut output)?;
        Ok(output)
    }

    fn evaluate_file(
        &self,
        file: &SourceFile,
        mode: GenerationMode,
        emitted: &mut HashSet<PathBuf>,
        output: &mut String,
    ) -> BundleResult<()> {
        emitted.insert(file.path.clone());
        trace!(path = %file.path.display(), %mode, "evaluating");

        let markers: HashMap<usize, &DirectiveMarker> =
            file.markers.iter().map(|marker| (marker.line, marker)).collect();
        let mut blocks: Vec<OpenBlock> = Vec::new();

        for (index, line) in file.content.lines().enumerate() {
            let line_number = index + 1;
            let active = blocks.iter().all(|block| block.keep);

            let Some(marker) = markers.get(&line_number) else {
                if active {
                    push_line(output, line);
                }
                continue;
            };

            match self.registry.resolve(&marker.label) {
                LabelResolution::Unknown => {
                    if active {
                        push_line(output, line);
                    }
                }
                LabelResolution::Foreign(found) => {
                    return Err(BundleError::DirectiveMismatch {
                        file: file.path.clone(),
                        line: line_number,
                        label: marker.label.clone(),
                        found,
                        expected: self.registry.expected(),
                    });
                }
                LabelResolution::End => {
                    if blocks.pop().is_none() {
                        return Err(malformed(file, line_number, "end marker without an open block"));
                    }
                }
                LabelResolution::Registered(kind) => {
                    let evaluation = kind
                        .evaluate(&marker.options, mode)
                        .map_err(|message| malformed(file, line_number, &message))?;

                    match evaluation {
                        Evaluation::Block { keep } => blocks.push(OpenBlock {
                            line: line_number,
                            kind,
                            keep,
                        }),
                        _ if !active => {}
                        Evaluation::Emit(text) => {
                            let indent = &line[..line.len() - line.trim_start().len()];
                            output.push_str(indent);
                            push_line(output, &text);
                        }
                        Evaluation::Omit => {}
                        Evaluation::Inline => {
                            self.inline(file, line_number, mode, emitted, output)?;
                        }
                    }
                }
            }
        }

        if let Some(open) = blocks.last() {
            return Err(malformed(
                file,
                open.line,
                &format!("{} block is never closed", open.kind),
            ));
        }
        Ok(())
    }

    fn inline(
        &self,
        file: &SourceFile,
        line_number: usize,
        mode: GenerationMode,
        emitted: &mut HashSet<PathBuf>,
        output: &mut String,
    ) -> BundleResult<()> {
        let included = file
            .includes
            .get(&line_number)
            .and_then(|target| self.files.get(target))
            .ok_or_else(|| malformed(file, line_number, "include target was not discovered"))?;

        if emitted.contains(&included.path) {
            trace!(path = %included.path.display(), "already inlined");
            return Ok(());
        }
        self.evaluate_file(included, mode, emitted, output)
    }
}

fn push_line(output: &mut String, line: &str) {
    output.push_str(line);
    output.push('\n');
}

fn malformed(file: &SourceFile, line: usize, message: &str) -> BundleError {
    BundleError::MalformedDirective {
        file: file.path.clone(),
        line,
        message: message.to_string(),
    }
}
