//! Builder stages applied to directive-evaluated text.
//!
//! A group runs its stages in a fixed order. Each stage receives the streams
//! produced so far and returns new ones: the main stream, and optionally a
//! compat stream carrying compatibility-shimmed content. A compat stream of
//! `None` means "same as main"; it only becomes its own artifact once some
//! stage contributes compat-specific content.

use std::sync::Arc;
use tracing::debug;

use crate::builders::resources::ResourceLoader;
use crate::core::error::{BundleError, BundleResult};
use crate::core::mode::GenerationMode;

pub const ENGINE_BUILDER: &str = "engine";
pub const FRAMEWORK_BUILDER: &str = "framework";

/// Main and compat text flowing through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStreams {
    pub main: String,
    pub compat: Option<String>,
}

impl BuildStreams {
    pub fn new(main: String) -> Self {
        Self { main, compat: None }
    }

    /// The compat text, falling back to main when no stage produced compat content.
    pub fn compat_text(&self) -> &str {
        self.compat.as_deref().unwrap_or(&self.main)
    }
}

/// One stage of the pipeline. Stages must not keep state between calls.
pub trait JavascriptBuilder {
    fn name(&self) -> &str;

    /// Resolves a resource this builder injects.
    fn get_source(&self, resource_id: &str) -> BundleResult<String>;

    fn build(&self, mode: GenerationMode, input: BuildStreams) -> BundleResult<BuildStreams>;
}

fn variant(base: &str, mode: GenerationMode) -> String {
    if mode.is_minified() {
        format!("{base}.min.js")
    } else {
        format!("{base}.js")
    }
}

fn push_source(target: &mut String, source: &str) {
    target.push_str(source);
    if !source.is_empty() && !source.ends_with('\n') {
        target.push('\n');
    }
}

fn load_from(
    loader: &dyn ResourceLoader,
    builder: &str,
    resource_id: &str,
) -> BundleResult<String> {
    loader
        .load(resource_id)?
        .ok_or_else(|| BundleError::ResourceNotFound {
            builder: builder.to_string(),
            resource_id: resource_id.to_string(),
        })
}

/// Runtime modules the engine builder puts in front of the group: the main
/// build and its es5 counterpart for compat.
const ENGINE_MODULES: [(&str, &str); 2] = [
    ("lwc/engine/es2017/engine", "lwc/engine/es5/engine"),
    ("lwc/wire-service/es2017/wire", "lwc/wire-service/es5/wire"),
];

const PROXY_COMPAT: &str = "lwc/proxy-compat/compat";

/// Prepends the runtime engine to the bundle and, when compat is enabled,
/// builds the compat stream from the proxy-compat shim and es5 modules.
pub struct EngineJavascriptBuilder {
    loader: Arc<dyn ResourceLoader>,
    compat: bool,
}

impl EngineJavascriptBuilder {
    pub fn new(loader: Arc<dyn ResourceLoader>, compat: bool) -> Self {
        Self { loader, compat }
    }
}

impl JavascriptBuilder for EngineJavascriptBuilder {
    fn name(&self) -> &str {
        ENGINE_BUILDER
    }

    fn get_source(&self, resource_id: &str) -> BundleResult<String> {
        load_from(self.loader.as_ref(), self.name(), resource_id)
    }

    fn build(&self, mode: GenerationMode, input: BuildStreams) -> BundleResult<BuildStreams> {
        let mut prelude = String::new();
        for (module, _) in ENGINE_MODULES {
            push_source(&mut prelude, &self.get_source(&variant(module, mode))?);
        }

        let compat = if self.compat {
            let mut compat = String::new();
            push_source(&mut compat, &self.get_source(&variant(PROXY_COMPAT, mode))?);
            for (_, es5) in ENGINE_MODULES {
                push_source(&mut compat, &self.get_source(&variant(es5, mode))?);
            }
            compat.push_str(input.compat_text());
            Some(compat)
        } else {
            input.compat.map(|compat| format!("{prelude}{compat}"))
        };

        Ok(BuildStreams {
            main: format!("{prelude}{}", input.main),
            compat,
        })
    }
}

/// Appends framework resources to whatever the earlier stages produced.
/// It has no compat-specific content of its own.
pub struct FrameworkJavascriptBuilder {
    loader: Arc<dyn ResourceLoader>,
    resources: Vec<String>,
}

impl FrameworkJavascriptBuilder {
    pub fn new(loader: Arc<dyn ResourceLoader>, resources: Vec<String>) -> Self {
        Self { loader, resources }
    }
}

impl JavascriptBuilder for FrameworkJavascriptBuilder {
    fn name(&self) -> &str {
        FRAMEWORK_BUILDER
    }

    fn get_source(&self, resource_id: &str) -> BundleResult<String> {
        load_from(self.loader.as_ref(), self.name(), resource_id)
    }

    fn build(&self, _mode: GenerationMode, input: BuildStreams) -> BundleResult<BuildStreams> {
        if self.resources.is_empty() {
            return Ok(input);
        }

        let mut trailer = String::new();
        for resource in &self.resources {
            push_source(&mut trailer, &self.get_source(resource)?);
        }

        let mut main = input.main;
        if !main.is_empty() && !main.ends_with('\n') {
            main.push('\n');
        }
        main.push_str(&trailer);

        Ok(BuildStreams {
            main,
            compat: input.compat.map(|compat| {
                let mut compat = compat;
                if !compat.is_empty() && !compat.ends_with('\n') {
                    compat.push('\n');
                }
                compat.push_str(&trailer);
                compat
            }),
        })
    }
}

/// Creates a builder by its configured name.
pub fn create_builder(
    name: &str,
    loader: Arc<dyn ResourceLoader>,
    compat: bool,
    framework_resources: &[String],
) -> BundleResult<Box<dyn JavascriptBuilder>> {
    match name {
        ENGINE_BUILDER => Ok(Box::new(EngineJavascriptBuilder::new(loader, compat))),
        FRAMEWORK_BUILDER => Ok(Box::new(FrameworkJavascriptBuilder::new(
            loader,
            framework_resources.to_vec(),
        ))),
        other => Err(BundleError::UnknownBuilder(other.to_string())),
    }
}

/// Runs `stages` in order over `text`.
pub fn run_pipeline(
    stages: &[Box<dyn JavascriptBuilder>],
    mode: GenerationMode,
    text: String,
) -> BundleResult<BuildStreams> {
    let mut streams = BuildStreams::new(text);
    for stage in stages {
        let had_compat = streams.compat.is_some();
        streams = stage.build(mode, streams)?;
        debug!(
            stage = stage.name(),
            %mode,
            main_len = streams.main.len(),
            compat = streams.compat.is_some(),
            started_compat = !had_compat && streams.compat.is_some(),
            "builder stage finished"
        );
    }
    Ok(streams)
}
