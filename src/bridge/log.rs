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

use std::io::Write;

use crate::Error;
use crate::Logger;
use crate::record::Level;
use crate::record::Record;

impl From<log::Level> for Level {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Self::Error,
            log::Level::Warn => Self::Warn,
            log::Level::Info => Self::Info,
            log::Level::Debug => Self::Debug,
            log::Level::Trace => Self::Trace,
        }
    }
}

impl Logger {
    /// Install this handle as the backend of the [`log`] crate.
    ///
    /// Records emitted through the `log` macros are routed by the rules bound to this handle,
    /// under the handle's name. The log target, module path, file and line are kept as the
    /// `target`, `module`, `file` and `line` properties.
    ///
    /// # Errors
    ///
    /// Return an error if a global logger has already been set.
    pub fn apply(self) -> Result<(), log::SetLoggerError> {
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(log::LevelFilter::Trace);
        Ok(())
    }

    fn bridge_record(&self, record: &log::Record) -> Record {
        let mut builder = Record::builder()
            .level(record.level().into())
            .logger(self.name())
            .message(record.args().to_string())
            .property("target", record.target());
        if let Some(module) = record.module_path() {
            builder = builder.property("module", module);
        }
        if let Some(file) = record.file() {
            builder = builder.property("file", file);
        }
        if let Some(line) = record.line() {
            builder = builder.property("line", line);
        }
        builder.build()
    }
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.is_enabled(metadata.level().into())
    }

    fn log(&self, record: &log::Record) {
        if !log::Log::enabled(self, record.metadata()) {
            return;
        }

        let record = self.bridge_record(record);
        if let Err(err) = Logger::log(self, &record) {
            handle_log_error(&record, err);
        }
    }

    fn flush(&self) {
        if let Err(err) = Logger::flush(self) {
            handle_flush_error(err);
        }
    }
}

fn handle_log_error(record: &Record, error: Error) {
    let Err(fallback_error) = write!(
        std::io::stderr(),
        r###"
Error perform logging.
    Attempted to log: {message}
    Record: {record:?}
    Error: {error:?}
"###,
        message = record.message(),
        record = record,
        error = error,
    ) else {
        return;
    };

    panic!(
        r###"
Error performing stderr logging after error occurred during regular logging.
    Attempted to log: {message}
    Record: {record:?}
    Error: {error:?}
    Fallback error: {fallback_error}
"###,
        message = record.message(),
        record = record,
        error = error,
        fallback_error = fallback_error,
    );
}

fn handle_flush_error(error: Error) {
    let Err(fallback_error) = write!(
        std::io::stderr(),
        r###"
Error perform flush.
    Error: {error:?}
"###,
    ) else {
        return;
    };

    panic!(
        r###"
Error performing stderr logging after error occurred during regular flush.
    Error: {error:?}
    Fallback error: {fallback_error}
"###,
    );
}
