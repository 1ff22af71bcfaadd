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

//! Log record and severity levels of the logging engine.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use jiff::Timestamp;
use value_bag::OwnedValueBag;
use value_bag::ValueBag;

use crate::Error;

/// A shared reference to an error attached to a log record.
pub type ErrorRef = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Structured properties of a log record.
pub type Properties = HashMap<String, OwnedValueBag>;

/// An enum representing the available severity levels of the engine.
///
/// Levels are ordered from the most verbose to the most severe.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Designates very low priority, often extremely verbose, information.
    Trace,
    /// Designates lower priority information.
    Debug,
    /// Designates useful information.
    Info,
    /// Designates hazardous situations.
    Warn,
    /// Designates errors.
    Error,
    /// Designates failures the process cannot recover from.
    Fatal,
}

impl Level {
    /// All levels, from the most verbose to the most severe.
    pub const ALL: [Level; 6] = [
        Level::Trace,
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::Fatal,
    ];

    /// Return the string representation of the `Level`.
    ///
    /// This returns the same string as the `fmt::Display` implementation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "Trace",
            Level::Debug => "Debug",
            Level::Info => "Info",
            Level::Warn => "Warn",
            Level::Error => "Error",
            Level::Fatal => "Fatal",
        }
    }
}

impl fmt::Debug for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Level {
    type Err = Error;
    fn from_str(s: &str) -> Result<Level, Self::Err> {
        for level in Level::ALL {
            if s.eq_ignore_ascii_case(level.as_str()) {
                return Ok(level);
            }
        }

        Err(Error::new(format!("malformed level: {s:?}")))
    }
}

/// A log event in the shape the engine routes and renders.
#[derive(Clone, Debug)]
pub struct Record {
    // the observed time
    time: Timestamp,

    // the metadata
    level: Level,
    logger: String,

    // the payload
    message: String,
    exception: Option<ErrorRef>,

    // structural logging
    properties: Properties,
}

impl Record {
    /// The observed time.
    pub fn time(&self) -> Timestamp {
        self.time
    }

    /// The severity level of the message.
    pub fn level(&self) -> Level {
        self.level
    }

    /// The name of the logger the record was emitted through.
    pub fn logger(&self) -> &str {
        &self.logger
    }

    /// The message body.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The attached error, if any.
    pub fn exception(&self) -> Option<&ErrorRef> {
        self.exception.as_ref()
    }

    /// The structured properties.
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Look up a single property.
    pub fn property(&self, key: &str) -> Option<ValueBag<'_>> {
        self.properties.get(key).map(OwnedValueBag::by_ref)
    }

    /// Create a builder initialized with the current record's values.
    pub fn to_builder(&self) -> RecordBuilder {
        RecordBuilder {
            record: self.clone(),
        }
    }

    /// Returns a new builder.
    pub fn builder() -> RecordBuilder {
        RecordBuilder::default()
    }
}

/// Builder for [`Record`].
#[derive(Debug)]
pub struct RecordBuilder {
    record: Record,
}

impl Default for RecordBuilder {
    fn default() -> Self {
        RecordBuilder {
            record: Record {
                time: Timestamp::now(),
                level: Level::Info,
                logger: String::new(),
                message: String::new(),
                exception: None,
                properties: Properties::new(),
            },
        }
    }
}

impl RecordBuilder {
    /// Set [`time`](Record::time).
    pub fn time(mut self, time: Timestamp) -> Self {
        self.record.time = time;
        self
    }

    /// Set [`level`](Record::level).
    pub fn level(mut self, level: Level) -> Self {
        self.record.level = level;
        self
    }

    /// Set [`logger`](Record::logger).
    pub fn logger(mut self, logger: impl Into<String>) -> Self {
        self.record.logger = logger.into();
        self
    }

    /// Set [`message`](Record::message).
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.record.message = message.into();
        self
    }

    /// Set [`exception`](Record::exception).
    pub fn exception(mut self, exception: Option<ErrorRef>) -> Self {
        self.record.exception = exception;
        self
    }

    /// Insert one property. A later value for the same key replaces the earlier one.
    pub fn property<'v>(mut self, key: impl Into<String>, value: impl Into<ValueBag<'v>>) -> Self {
        let value: ValueBag<'v> = value.into();
        self.record.properties.insert(key.into(), value.to_owned());
        self
    }

    /// Set [`properties`](Record::properties).
    pub fn properties(mut self, properties: Properties) -> Self {
        self.record.properties = properties;
        self
    }

    /// Invoke the builder and return a `Record`
    pub fn build(self) -> Record {
        self.record
    }
}
