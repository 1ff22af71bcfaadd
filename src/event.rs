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

//! Log events as the host framework emits them, and their translation into [`Record`]s.

use std::fmt;

use jiff::Timestamp;
use value_bag::OwnedValueBag;
use value_bag::ValueBag;

use crate::Error;
use crate::record::ErrorRef;
use crate::record::Level;
use crate::record::Properties;
use crate::record::Record;

/// The severity of a host log event.
///
/// Hosts transport levels as raw numbers; only the six named constants have a mapping onto
/// [`Level`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogLevel(u8);

impl LogLevel {
    pub const TRACE: LogLevel = LogLevel(0);
    pub const DEBUG: LogLevel = LogLevel(1);
    pub const INFO: LogLevel = LogLevel(2);
    pub const WARN: LogLevel = LogLevel(3);
    pub const ERROR: LogLevel = LogLevel(4);
    pub const FATAL: LogLevel = LogLevel(5);

    /// Wrap a raw level number as received from the host.
    pub const fn from_raw(raw: u8) -> LogLevel {
        LogLevel(raw)
    }

    /// The raw level number.
    pub const fn raw(self) -> u8 {
        self.0
    }
}

impl fmt::Debug for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Level::try_from(*self) {
            Ok(level) => write!(f, "LogLevel::{}", level.as_str().to_ascii_uppercase()),
            Err(_) => write!(f, "LogLevel({})", self.0),
        }
    }
}

impl TryFrom<LogLevel> for Level {
    type Error = Error;

    fn try_from(level: LogLevel) -> Result<Self, Error> {
        match level {
            LogLevel::TRACE => Ok(Level::Trace),
            LogLevel::DEBUG => Ok(Level::Debug),
            LogLevel::INFO => Ok(Level::Info),
            LogLevel::WARN => Ok(Level::Warn),
            LogLevel::ERROR => Ok(Level::Error),
            LogLevel::FATAL => Ok(Level::Fatal),
            _ => Err(Error::unsupported_value("level", level.raw())),
        }
    }
}

impl From<Level> for LogLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::Trace => LogLevel::TRACE,
            Level::Debug => LogLevel::DEBUG,
            Level::Info => LogLevel::INFO,
            Level::Warn => LogLevel::WARN,
            Level::Error => LogLevel::ERROR,
            Level::Fatal => LogLevel::FATAL,
        }
    }
}

/// A log event emitted by the host framework.
#[derive(Clone, Debug)]
pub struct LogEvent {
    timestamp: Timestamp,
    level: LogLevel,
    message: Option<String>,
    exception: Option<ErrorRef>,
    // in emission order; keys may repeat
    properties: Vec<(String, OwnedValueBag)>,
}

impl LogEvent {
    /// Returns a new builder for an event of the given level.
    pub fn builder(level: LogLevel) -> LogEventBuilder {
        LogEventBuilder {
            event: LogEvent {
                timestamp: Timestamp::now(),
                level,
                message: None,
                exception: None,
                properties: vec![],
            },
        }
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn exception(&self) -> Option<&ErrorRef> {
        self.exception.as_ref()
    }

    /// The properties in emission order.
    pub fn properties(&self) -> impl Iterator<Item = (&str, ValueBag<'_>)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v.by_ref()))
    }

    /// Translate this event into a [`Record`] for the named logger.
    ///
    /// The level is mapped one to one, a missing message becomes an empty string, the attached
    /// error is shared rather than copied, and properties are copied into a fresh map where the
    /// last value for a repeated key wins.
    ///
    /// # Errors
    ///
    /// Return an error if the event level has no engine counterpart.
    pub fn to_record(&self, logger: &str) -> Result<Record, Error> {
        let level = Level::try_from(self.level)?;

        let mut properties = Properties::with_capacity(self.properties.len());
        for (key, value) in &self.properties {
            properties.insert(key.clone(), value.clone());
        }

        Ok(Record::builder()
            .time(self.timestamp)
            .level(level)
            .logger(logger)
            .message(self.message.clone().unwrap_or_default())
            .exception(self.exception.clone())
            .properties(properties)
            .build())
    }
}

/// Builder for [`LogEvent`].
#[derive(Debug)]
pub struct LogEventBuilder {
    event: LogEvent,
}

impl LogEventBuilder {
    /// Set the event timestamp. Default to the time the builder was created.
    pub fn timestamp(mut self, timestamp: Timestamp) -> Self {
        self.event.timestamp = timestamp;
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.event.message = Some(message.into());
        self
    }

    pub fn exception(mut self, exception: impl Into<ErrorRef>) -> Self {
        self.event.exception = Some(exception.into());
        self
    }

    /// Append a property.
    pub fn property<'v>(mut self, key: impl Into<String>, value: impl Into<ValueBag<'v>>) -> Self {
        let value: ValueBag<'v> = value.into();
        self.event.properties.push((key.into(), value.to_owned()));
        self
    }

    pub fn build(self) -> LogEvent {
        self.event
    }
}
