// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Log consumers driven by the host framework.

use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use crate::Error;
use crate::LogRegistry;
use crate::Logger;
use crate::append::FileTargetBuilder;
use crate::context::Context;
use crate::event::LogEvent;
use crate::layout::TemplateLayout;
use crate::rule::LoggingRule;

/// The default file name template.
pub const DEFAULT_FILE_NAME: &str = "Trace.log";

/// The default layout of [`FileLogConsumer`].
///
/// Renders the elapsed time, the execution unit id, the upper-cased level padded to five
/// characters, the nesting text, the `{source}` and `[category]` prefixes when present, the
/// message, and the attached error. The error is separated from the message by a space, or
/// follows the level directly when the message is empty.
///
/// To log wall-clock time instead of the elapsed time, replace
/// `${property:time-elapsed|elapsed}` with `${date}`.
pub const DEFAULT_LAYOUT: &str = concat!(
    "${property:time-elapsed|elapsed} ",
    "${property:execution-unit-id} ",
    "${level|upper|pad=5} ",
    "${property:log-nesting-text}",
    r"${property:log-source|prefix=\{|suffix=\} }",
    "${property:log-category|prefix=[|suffix=] }",
    "${message}",
    "${exception|after-message= }",
);

const TYPE_TAG: &str = "FileLogConsumer";

/// A component that receives log events from the host.
///
/// The host calls [`initialize`](LogConsumer::initialize) once before logging starts,
/// [`log`](LogConsumer::log) for every event, and [`dispose`](LogConsumer::dispose) once at
/// teardown. [`clone_consumer`](LogConsumer::clone_consumer) produces an uninitialized copy
/// that can be attached to another context.
pub trait LogConsumer: fmt::Debug + Send + Sync {
    /// Prepare the consumer for the given context.
    ///
    /// Default to a no-op.
    fn initialize(&mut self, context: &dyn Context) -> Result<(), Error> {
        let _ = context;
        Ok(())
    }

    /// Record a single event.
    fn log(&self, event: &LogEvent) -> Result<(), Error>;

    /// Return an uninitialized copy of the consumer's configuration.
    fn clone_consumer(&self) -> Box<dyn LogConsumer>;

    /// Release everything acquired in [`initialize`](LogConsumer::initialize).
    ///
    /// Default to a no-op.
    fn dispose(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

/// The user-settable configuration of a [`FileLogConsumer`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "kebab-case"))]
pub struct FileLogConsumerConfig {
    /// The file name template, interpolated against the context variables.
    pub file_name_template: String,
    /// The layout template of each line.
    pub layout: String,
}

impl Default for FileLogConsumerConfig {
    fn default() -> Self {
        Self {
            file_name_template: DEFAULT_FILE_NAME.to_string(),
            layout: DEFAULT_LAYOUT.to_string(),
        }
    }
}

/// A log consumer that writes events to a file.
///
/// On [`initialize`](LogConsumer::initialize) the consumer takes the next number of its
/// registry to build a unique name `FileLogConsumer<N>`, resolves
/// `<artifacts path>/<file name template>` against the context, and registers a final rule for
/// every level that routes the logger of that name to the file. The rule is removed on
/// [`dispose`](LogConsumer::dispose), or when an initialized consumer is dropped.
///
/// # Examples
///
/// ```
/// use logforth_sink::FileLogConsumer;
/// use logforth_sink::LogConsumer;
/// use logforth_sink::LogRegistry;
/// use logforth_sink::context::VariablesContext;
/// use logforth_sink::event::LogEvent;
/// use logforth_sink::event::LogLevel;
///
/// let dir = tempfile::tempdir().unwrap();
/// let context = VariablesContext::new(dir.path()).with_variable("test-name", "SignIn");
///
/// let mut consumer = FileLogConsumer::new(LogRegistry::shared())
///     .with_file_name_template("{test-name}.log")
///     .with_layout("${level|upper} ${message}");
/// consumer.initialize(&context).unwrap();
/// consumer
///     .log(&LogEvent::builder(LogLevel::INFO).message("Starting").build())
///     .unwrap();
/// consumer.dispose().unwrap();
///
/// let content = std::fs::read_to_string(dir.path().join("SignIn.log")).unwrap();
/// assert_eq!(content, "INFO Starting\n");
/// ```
#[derive(Debug)]
pub struct FileLogConsumer {
    registry: Arc<LogRegistry>,
    config: FileLogConsumerConfig,
    state: ConsumerState,
}

#[derive(Debug)]
enum ConsumerState {
    Uninitialized,
    Active(ActiveSink),
    Disposed,
}

#[derive(Debug)]
struct ActiveSink {
    name: String,
    path: PathBuf,
    rule: RuleGuard,
    logger: Logger,
}

// Removes the rule from its registry when dropped, unless released before.
#[derive(Debug)]
struct RuleGuard {
    registry: Arc<LogRegistry>,
    rule: Option<Arc<LoggingRule>>,
}

impl RuleGuard {
    fn rule(&self) -> Option<&Arc<LoggingRule>> {
        self.rule.as_ref()
    }

    fn release(mut self) -> Result<bool, Error> {
        match self.rule.take() {
            Some(rule) => self.registry.remove_rule(&rule),
            None => Ok(false),
        }
    }
}

impl Drop for RuleGuard {
    fn drop(&mut self) {
        if let Some(rule) = self.rule.take() {
            let _ = self.registry.remove_rule(&rule);
        }
    }
}

impl Default for FileLogConsumer {
    /// A consumer with the default configuration, bound to [`LogRegistry::shared`].
    fn default() -> Self {
        Self::new(LogRegistry::shared())
    }
}

impl Clone for FileLogConsumer {
    /// Copy the configuration only; the clone is uninitialized.
    fn clone(&self) -> Self {
        Self::from_config(self.registry.clone(), self.config.clone())
    }
}

impl FileLogConsumer {
    /// Create a consumer with the default configuration.
    pub fn new(registry: Arc<LogRegistry>) -> Self {
        Self::from_config(registry, FileLogConsumerConfig::default())
    }

    /// Create a consumer from a configuration.
    pub fn from_config(registry: Arc<LogRegistry>, config: FileLogConsumerConfig) -> Self {
        Self {
            registry,
            config,
            state: ConsumerState::Uninitialized,
        }
    }

    /// Set the file name template.
    ///
    /// Default to [`DEFAULT_FILE_NAME`].
    pub fn with_file_name_template(mut self, template: impl Into<String>) -> Self {
        self.config.file_name_template = template.into();
        self
    }

    /// Set the layout template.
    ///
    /// Default to [`DEFAULT_LAYOUT`].
    pub fn with_layout(mut self, layout: impl Into<String>) -> Self {
        self.config.layout = layout.into();
        self
    }

    /// The file name template, before interpolation.
    pub fn file_name_template(&self) -> &str {
        &self.config.file_name_template
    }

    /// The layout template.
    pub fn layout(&self) -> &str {
        &self.config.layout
    }

    /// The configuration the consumer was built with.
    pub fn config(&self) -> &FileLogConsumerConfig {
        &self.config
    }

    /// The registry rules are added to.
    pub fn registry(&self) -> &Arc<LogRegistry> {
        &self.registry
    }

    /// Whether the consumer is initialized and not yet disposed.
    pub fn is_active(&self) -> bool {
        matches!(self.state, ConsumerState::Active(_))
    }

    /// The unique name of the rule and logger, once initialized.
    pub fn unique_name(&self) -> Option<&str> {
        self.active().ok().map(|sink| sink.name.as_str())
    }

    /// The registered rule, once initialized.
    pub fn rule(&self) -> Option<&Arc<LoggingRule>> {
        self.active().ok().and_then(|sink| sink.rule.rule())
    }

    /// The resolved log file path, once initialized.
    pub fn file_path(&self) -> Option<&Path> {
        self.active().ok().map(|sink| sink.path.as_path())
    }

    fn active(&self) -> Result<&ActiveSink, Error> {
        match &self.state {
            ConsumerState::Active(sink) => Ok(sink),
            ConsumerState::Uninitialized => Err(Error::new("consumer is not initialized")),
            ConsumerState::Disposed => Err(Error::new("consumer is disposed")),
        }
    }

    fn build_file_path(&self, context: &dyn Context) -> Result<PathBuf, Error> {
        let file_name = context.fill_path_template_string(&self.config.file_name_template)?;
        Ok(context.artifacts_path().join(file_name))
    }
}

impl LogConsumer for FileLogConsumer {
    fn initialize(&mut self, context: &dyn Context) -> Result<(), Error> {
        match &self.state {
            ConsumerState::Uninitialized => {}
            ConsumerState::Active(sink) => {
                return Err(Error::new("consumer is already initialized")
                    .with_context("name", &sink.name));
            }
            ConsumerState::Disposed => return Err(Error::new("consumer is disposed")),
        }

        let number = self.registry.next_sequence();
        let name = format!("{TYPE_TAG}{number}");
        let path = self.build_file_path(context)?;

        let layout = TemplateLayout::new(self.config.layout.as_str())?;
        let target = FileTargetBuilder::new(&name, &path)
            .layout(layout)
            .build()?;

        let rule = self.registry.add_rule_for_all_levels(&name, target, &name);
        let rule = RuleGuard {
            registry: self.registry.clone(),
            rule: Some(rule),
        };
        let logger = self.registry.logger(&name);

        self.state = ConsumerState::Active(ActiveSink {
            name,
            path,
            rule,
            logger,
        });
        Ok(())
    }

    fn log(&self, event: &LogEvent) -> Result<(), Error> {
        let sink = self.active()?;
        let record = event.to_record(&sink.name)?;
        sink.logger.log(&record)
    }

    fn clone_consumer(&self) -> Box<dyn LogConsumer> {
        Box::new(self.clone())
    }

    fn dispose(&mut self) -> Result<(), Error> {
        match std::mem::replace(&mut self.state, ConsumerState::Disposed) {
            ConsumerState::Active(ActiveSink { rule, logger, .. }) => {
                let released = rule.release();
                drop(logger);
                released.map(|_| ())
            }
            ConsumerState::Uninitialized => {
                self.state = ConsumerState::Uninitialized;
                Err(Error::new("consumer is not initialized"))
            }
            ConsumerState::Disposed => Err(Error::new("consumer is already disposed")),
        }
    }
}
