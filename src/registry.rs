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

//! The registry owning a logging configuration and the logger handles bound to it.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::OnceLock;
use std::sync::Weak;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use crate::Append;
use crate::Error;
use crate::Logger;
use crate::logger::LoggerShared;
use crate::record::Level;
use crate::rule::LoggingConfiguration;
use crate::rule::LoggingRule;

static SHARED_REGISTRY: OnceLock<Arc<LogRegistry>> = OnceLock::new();

/// A logging configuration, the logger handles bound to it, and a sequence counter for unique
/// names.
///
/// Every structural change (creating the configuration, adding or removing a rule, creating a
/// logger handle) runs under one lock. Logging through a [`Logger`] never takes that lock.
///
/// # Examples
///
/// ```
/// use logforth_sink::LogRegistry;
/// use logforth_sink::append::FileTargetBuilder;
/// use logforth_sink::record::Level;
/// use logforth_sink::record::Record;
///
/// let dir = tempfile::tempdir().unwrap();
/// let registry = LogRegistry::new();
/// let target = FileTargetBuilder::new("main", dir.path().join("main.log"))
///     .build()
///     .unwrap();
///
/// let rule = registry.add_rule_for_all_levels("main", target, "main");
/// let logger = registry.logger("main");
/// logger
///     .log(&Record::builder().level(Level::Info).message("hello").build())
///     .unwrap();
///
/// assert!(registry.remove_rule(&rule).unwrap());
/// ```
#[derive(Debug, Default)]
pub struct LogRegistry {
    state: Mutex<RegistryState>,
    sequence: AtomicU64,
}

#[derive(Debug, Default)]
struct RegistryState {
    configuration: Option<LoggingConfiguration>,
    loggers: HashMap<String, Weak<LoggerShared>>,
}

impl RegistryState {
    fn ensure_configuration(&mut self) -> &mut LoggingConfiguration {
        self.configuration
            .get_or_insert_with(LoggingConfiguration::new)
    }

    fn rules_for_logger(&self, name: &str) -> Vec<Arc<LoggingRule>> {
        self.configuration
            .as_ref()
            .map(|c| c.rules_for_logger(name))
            .unwrap_or_default()
    }

    fn unbind_rule(&mut self, rule: &Arc<LoggingRule>) {
        self.loggers.retain(|_, logger| logger.strong_count() > 0);
        for logger in self.loggers.values() {
            if let Some(shared) = logger.upgrade() {
                Logger::from_shared(shared).unbind(rule);
            }
        }
    }

    fn reconfigure_existing_loggers(&mut self) {
        self.loggers.retain(|_, logger| logger.strong_count() > 0);
        for (name, logger) in &self.loggers {
            if let Some(shared) = logger.upgrade() {
                Logger::from_shared(shared).rebind(self.rules_for_logger(name));
            }
        }
    }
}

impl LogRegistry {
    /// Create a new registry with no configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry, created on first use.
    pub fn shared() -> Arc<LogRegistry> {
        SHARED_REGISTRY
            .get_or_init(|| Arc::new(LogRegistry::new()))
            .clone()
    }

    fn state(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Advance the sequence counter and return the new value. The first value is `1`.
    pub fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Return a snapshot of the configuration, creating an empty one if none exists yet.
    pub fn ensure_configuration(&self) -> LoggingConfiguration {
        let mut state = self.state();
        state.ensure_configuration().clone()
    }

    /// Return a snapshot of the configuration, or `None` if it was never created.
    pub fn configuration(&self) -> Option<LoggingConfiguration> {
        self.state().configuration.clone()
    }

    /// Append a rule to the configuration and rebind every live logger so the rule takes
    /// effect immediately.
    pub fn add_rule(&self, rule: LoggingRule) -> Arc<LoggingRule> {
        let rule = Arc::new(rule);

        let mut state = self.state();
        state.ensure_configuration().add_rule(rule.clone());
        state.reconfigure_existing_loggers();
        rule
    }

    /// Add a final rule spanning every level that routes loggers matching
    /// `logger_name_pattern` to `target`.
    pub fn add_rule_for_all_levels(
        &self,
        rule_name: impl Into<String>,
        target: impl Into<Box<dyn Append>>,
        logger_name_pattern: &str,
    ) -> Arc<LoggingRule> {
        let rule = LoggingRule::builder(rule_name, logger_name_pattern)
            .levels(Level::Trace, Level::Fatal)
            .final_rule(true)
            .target(target)
            .build();
        self.add_rule(rule)
    }

    /// Remove a rule from the configuration. Return whether it was present.
    ///
    /// Loggers are not rebound: the removed rule is detached, so it stops matching at once,
    /// and is dropped from the binding of every live handle, which releases its targets. The
    /// other rules a handle is bound to stay as they are.
    ///
    /// # Errors
    ///
    /// Return an error if the configuration was never created, which means the rule cannot
    /// have come from this registry.
    pub fn remove_rule(&self, rule: &Arc<LoggingRule>) -> Result<bool, Error> {
        let mut state = self.state();
        let Some(configuration) = state.configuration.as_mut() else {
            return Err(Error::new("logging configuration is not initialized")
                .with_context("rule", rule.name()));
        };
        let removed = configuration.remove_rule(rule);
        if removed {
            state.unbind_rule(rule);
        }
        Ok(removed)
    }

    /// Return the logger handle for `name`, creating and binding it if no live handle exists.
    pub fn logger(&self, name: &str) -> Logger {
        let mut state = self.state();
        if let Some(shared) = state.loggers.get(name).and_then(Weak::upgrade) {
            return Logger::from_shared(shared);
        }

        let logger = Logger::new(name, state.rules_for_logger(name));
        state.loggers.retain(|_, logger| logger.strong_count() > 0);
        state.loggers.insert(name.to_string(), logger.downgrade());
        logger
    }

    /// Rebind every live logger to the current rules.
    pub fn reconfigure_existing_loggers(&self) {
        self.state().reconfigure_existing_loggers();
    }
}
