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

//! Routing rules and the configuration that holds them.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use crate::Append;
use crate::Error;
use crate::record::Level;
use crate::record::Record;

/// A matcher for logger names.
///
/// * `*` matches every logger.
/// * `abc*` matches names starting with `abc`.
/// * `*abc` matches names ending with `abc`.
/// * `*abc*` matches names containing `abc`.
/// * Anything else matches the exact name.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum NamePattern {
    All,
    Exact(String),
    Prefix(String),
    Suffix(String),
    Contains(String),
}

impl NamePattern {
    /// Parse a pattern string.
    pub fn new(pattern: &str) -> NamePattern {
        if pattern == "*" {
            return NamePattern::All;
        }

        let head = pattern.starts_with('*');
        let tail = pattern.ends_with('*') && pattern.len() > 1;
        let trimmed = pattern.trim_start_matches('*').trim_end_matches('*');
        match (head, tail) {
            (true, true) => NamePattern::Contains(trimmed.to_string()),
            (true, false) => NamePattern::Suffix(trimmed.to_string()),
            (false, true) => NamePattern::Prefix(trimmed.to_string()),
            (false, false) => NamePattern::Exact(pattern.to_string()),
        }
    }

    /// Whether the logger name matches this pattern.
    pub fn matches(&self, name: &str) -> bool {
        match self {
            NamePattern::All => true,
            NamePattern::Exact(s) => name == s,
            NamePattern::Prefix(s) => name.starts_with(s.as_str()),
            NamePattern::Suffix(s) => name.ends_with(s.as_str()),
            NamePattern::Contains(s) => name.contains(s.as_str()),
        }
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamePattern::All => write!(f, "*"),
            NamePattern::Exact(s) => write!(f, "{s}"),
            NamePattern::Prefix(s) => write!(f, "{s}*"),
            NamePattern::Suffix(s) => write!(f, "*{s}"),
            NamePattern::Contains(s) => write!(f, "*{s}*"),
        }
    }
}

impl fmt::Debug for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NamePattern({self})")
    }
}

/// A routing rule: records of loggers matching `pattern` whose level lies in `[min, max]` are
/// written to every target of the rule.
///
/// A final rule stops the evaluation of the rules that follow it once it has accepted a record.
#[derive(Debug)]
pub struct LoggingRule {
    name: String,
    pattern: NamePattern,
    min_level: Level,
    max_level: Level,
    is_final: bool,
    targets: Vec<Arc<dyn Append>>,
    // cleared once the rule leaves its configuration
    attached: AtomicBool,
}

impl LoggingRule {
    /// Returns a new builder.
    pub fn builder(name: impl Into<String>, pattern: &str) -> LoggingRuleBuilder {
        LoggingRuleBuilder {
            rule: LoggingRule {
                name: name.into(),
                pattern: NamePattern::new(pattern),
                min_level: Level::Trace,
                max_level: Level::Fatal,
                is_final: false,
                targets: vec![],
                attached: AtomicBool::new(true),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &NamePattern {
        &self.pattern
    }

    pub fn min_level(&self) -> Level {
        self.min_level
    }

    pub fn max_level(&self) -> Level {
        self.max_level
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }

    pub fn targets(&self) -> &[Arc<dyn Append>] {
        &self.targets
    }

    /// Whether the rule is still part of a configuration.
    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    pub(crate) fn detach(&self) {
        self.attached.store(false, Ordering::Release);
    }

    /// Whether the rule applies to the given logger name, regardless of level.
    pub fn matches_logger(&self, name: &str) -> bool {
        self.pattern.matches(name)
    }

    /// Whether the rule accepts a record of the given level.
    pub fn accepts(&self, level: Level) -> bool {
        self.is_attached() && self.min_level <= level && level <= self.max_level
    }

    /// Write the record to every target of the rule.
    pub fn write(&self, record: &Record) -> Result<(), Error> {
        for target in &self.targets {
            target.append(record)?;
        }
        Ok(())
    }
}

/// Builder for [`LoggingRule`].
#[derive(Debug)]
pub struct LoggingRuleBuilder {
    rule: LoggingRule,
}

impl LoggingRuleBuilder {
    /// Set the accepted level range. Default to `[Trace, Fatal]`.
    pub fn levels(mut self, min: Level, max: Level) -> Self {
        self.rule.min_level = min;
        self.rule.max_level = max;
        self
    }

    /// Mark the rule final. Default to `false`.
    pub fn final_rule(mut self, is_final: bool) -> Self {
        self.rule.is_final = is_final;
        self
    }

    /// Add a target to the rule.
    pub fn target(mut self, target: impl Into<Box<dyn Append>>) -> Self {
        self.rule.targets.push(Arc::from(target.into()));
        self
    }

    pub fn build(self) -> LoggingRule {
        self.rule
    }
}

/// An ordered collection of routing rules.
///
/// Cloning a configuration clones the rule handles, not the rules.
#[derive(Debug, Clone, Default)]
pub struct LoggingConfiguration {
    rules: Vec<Arc<LoggingRule>>,
}

impl LoggingConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule.
    pub fn add_rule(&mut self, rule: Arc<LoggingRule>) {
        self.rules.push(rule);
    }

    /// Remove a rule by identity and detach it. Return whether the rule was present.
    pub fn remove_rule(&mut self, rule: &Arc<LoggingRule>) -> bool {
        let before = self.rules.len();
        self.rules.retain(|r| !Arc::ptr_eq(r, rule));
        let removed = self.rules.len() != before;
        if removed {
            rule.detach();
        }
        removed
    }

    /// The rules in evaluation order.
    pub fn rules(&self) -> &[Arc<LoggingRule>] {
        &self.rules
    }

    pub fn find_rule_by_name(&self, name: &str) -> Option<&Arc<LoggingRule>> {
        self.rules.iter().find(|r| r.name() == name)
    }

    /// The rules that apply to a logger name, in evaluation order.
    pub fn rules_for_logger(&self, name: &str) -> Vec<Arc<LoggingRule>> {
        self.rules
            .iter()
            .filter(|r| r.matches_logger(name))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_pattern() {
        assert!(NamePattern::new("*").matches("anything"));
        assert_eq!(
            NamePattern::new("FileLogConsumer1"),
            NamePattern::Exact("FileLogConsumer1".to_string())
        );
        assert!(NamePattern::new("FileLogConsumer1").matches("FileLogConsumer1"));
        assert!(!NamePattern::new("FileLogConsumer1").matches("FileLogConsumer12"));
        assert!(NamePattern::new("File*").matches("FileLogConsumer12"));
        assert!(NamePattern::new("*Consumer12").matches("FileLogConsumer12"));
        assert!(NamePattern::new("*Log*").matches("FileLogConsumer12"));
        assert!(!NamePattern::new("*Sink*").matches("FileLogConsumer12"));
        assert_eq!(NamePattern::new("*Log*").to_string(), "*Log*");
    }

    #[test]
    fn test_rule_level_range() {
        let rule = LoggingRule::builder("warnings", "*")
            .levels(Level::Warn, Level::Error)
            .build();
        assert!(!rule.accepts(Level::Info));
        assert!(rule.accepts(Level::Warn));
        assert!(rule.accepts(Level::Error));
        assert!(!rule.accepts(Level::Fatal));
    }

    #[test]
    fn test_remove_rule_by_identity() {
        let a = Arc::new(LoggingRule::builder("same", "*").build());
        let b = Arc::new(LoggingRule::builder("same", "*").build());

        let mut config = LoggingConfiguration::new();
        config.add_rule(a.clone());
        config.add_rule(b.clone());

        assert!(config.remove_rule(&a));
        assert!(!a.is_attached());
        assert!(!a.accepts(Level::Fatal));
        assert!(b.is_attached());
        assert_eq!(config.rules().len(), 1);
        assert!(Arc::ptr_eq(&config.rules()[0], &b));

        assert!(!config.remove_rule(&a));
        assert_eq!(config.rules().len(), 1);
    }

    #[test]
    fn test_rules_for_logger() {
        let mut config = LoggingConfiguration::new();
        config.add_rule(Arc::new(LoggingRule::builder("one", "Sink1").build()));
        config.add_rule(Arc::new(LoggingRule::builder("all", "*").build()));
        config.add_rule(Arc::new(LoggingRule::builder("two", "Sink2").build()));

        let names = config
            .rules_for_logger("Sink1")
            .iter()
            .map(|r| r.name().to_string())
            .collect::<Vec<_>>();
        assert_eq!(names, ["one", "all"]);
        assert!(config.find_rule_by_name("two").is_some());
        assert!(config.find_rule_by_name("three").is_none());
    }
}
