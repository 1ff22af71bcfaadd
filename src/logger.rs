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

use std::sync::Arc;
use std::sync::RwLock;
use std::sync::Weak;

use crate::Error;
use crate::record::Level;
use crate::record::Record;
use crate::rule::LoggingRule;

/// A named logger handle.
///
/// A handle holds the rules of its registry that match its name, in evaluation order. The
/// registry refreshes this binding whenever a rule is added, so a handle obtained before the
/// rule existed starts routing to it immediately. Handles are cheap to clone and safe to use
/// from many threads; logging never takes the registry lock.
#[derive(Debug, Clone)]
pub struct Logger {
    shared: Arc<LoggerShared>,
}

#[derive(Debug)]
pub(crate) struct LoggerShared {
    name: String,
    rules: RwLock<Arc<[Arc<LoggingRule>]>>,
}

impl Logger {
    pub(crate) fn new(name: impl Into<String>, rules: Vec<Arc<LoggingRule>>) -> Self {
        let shared = LoggerShared {
            name: name.into(),
            rules: RwLock::new(rules.into()),
        };
        Self {
            shared: Arc::new(shared),
        }
    }

    pub(crate) fn from_shared(shared: Arc<LoggerShared>) -> Self {
        Self { shared }
    }

    pub(crate) fn downgrade(&self) -> Weak<LoggerShared> {
        Arc::downgrade(&self.shared)
    }

    pub(crate) fn rebind(&self, rules: Vec<Arc<LoggingRule>>) {
        let mut bound = self
            .shared
            .rules
            .write()
            .unwrap_or_else(|e| e.into_inner());
        *bound = rules.into();
    }

    // drops one rule from the binding and keeps the others as bound
    pub(crate) fn unbind(&self, rule: &Arc<LoggingRule>) {
        let mut bound = self
            .shared
            .rules
            .write()
            .unwrap_or_else(|e| e.into_inner());
        if bound.iter().any(|r| Arc::ptr_eq(r, rule)) {
            let kept = bound.iter().filter(|r| !Arc::ptr_eq(r, rule)).cloned();
            *bound = kept.collect();
        }
    }

    fn rules(&self) -> Arc<[Arc<LoggingRule>]> {
        let bound = self.shared.rules.read().unwrap_or_else(|e| e.into_inner());
        bound.clone()
    }

    /// The logger name.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Whether a record of this level would reach any target.
    pub fn is_enabled(&self, level: Level) -> bool {
        self.rules().iter().any(|rule| rule.accepts(level))
    }

    /// Route a record through the bound rules.
    ///
    /// Rules are evaluated in order; a final rule that accepts the record ends the evaluation.
    ///
    /// # Errors
    ///
    /// Return the first error raised by a target; the remaining rules are skipped.
    pub fn log(&self, record: &Record) -> Result<(), Error> {
        let level = record.level();
        for rule in self.rules().iter() {
            if !rule.accepts(level) {
                continue;
            }
            rule.write(record)?;
            if rule.is_final() {
                break;
            }
        }
        Ok(())
    }

    /// Flush every target the logger is bound to.
    pub fn flush(&self) -> Result<(), Error> {
        for rule in self.rules().iter() {
            for target in rule.targets() {
                target.flush()?;
            }
        }
        Ok(())
    }
}
