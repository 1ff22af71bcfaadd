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

use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::Error;
use crate::Layout;
use crate::append::Append;
use crate::layout::TemplateLayout;
use crate::record::Record;

/// A builder to configure and create a [`FileTarget`].
#[derive(Debug)]
pub struct FileTargetBuilder {
    name: String,
    filepath: PathBuf,
    layout: Box<dyn Layout>,
}

impl FileTargetBuilder {
    /// Create a new builder for a target writing to `filepath`.
    pub fn new(name: impl Into<String>, filepath: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            filepath: filepath.into(),
            layout: Box::new(TemplateLayout::default()),
        }
    }

    /// Set the layout for the logs.
    ///
    /// Default to [`TemplateLayout::default`].
    ///
    /// # Examples
    ///
    /// ```
    /// use logforth_sink::append::FileTargetBuilder;
    /// use logforth_sink::layout::TemplateLayout;
    ///
    /// let layout = TemplateLayout::new("${level} ${message}").unwrap();
    /// let builder = FileTargetBuilder::new("main", "logs/Trace.log").layout(layout);
    /// ```
    pub fn layout(mut self, layout: impl Into<Box<dyn Layout>>) -> Self {
        self.layout = layout.into();
        self
    }

    /// Build the [`FileTarget`], opening the file in append mode.
    ///
    /// # Errors
    ///
    /// Return an error if either:
    ///
    /// * The path has no file name.
    /// * The parent directory cannot be created.
    /// * The file cannot be opened for appending.
    pub fn build(self) -> Result<FileTarget, Error> {
        let FileTargetBuilder {
            name,
            filepath,
            layout,
        } = self;

        if filepath.file_name().is_none() {
            return Err(Error::new("log file path has no file name")
                .with_context("path", filepath.display()));
        }

        if let Some(dir) = filepath.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|err| {
                Error::new("failed to create log directory")
                    .with_context("path", dir.display())
                    .with_source(err)
            })?;
        }

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&filepath)
            .map_err(|err| {
                Error::new("failed to open log file")
                    .with_context("path", filepath.display())
                    .with_source(err)
            })?;

        Ok(FileTarget {
            name,
            filepath,
            layout,
            writer: Mutex::new(file),
        })
    }
}

/// A target that appends rendered log records to a file, one line per record.
#[derive(Debug)]
pub struct FileTarget {
    name: String,
    filepath: PathBuf,
    layout: Box<dyn Layout>,
    writer: Mutex<File>,
}

impl FileTarget {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The resolved path of the log file.
    pub fn path(&self) -> &Path {
        &self.filepath
    }

    fn writer(&self) -> MutexGuard<'_, File> {
        self.writer.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Append for FileTarget {
    fn append(&self, record: &Record) -> Result<(), Error> {
        let mut bytes = self.layout.format(record)?;
        bytes.push(b'\n');
        let mut writer = self.writer();
        writer.write_all(&bytes).map_err(Error::from_io_error)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), Error> {
        let mut writer = self.writer();
        writer.flush().map_err(Error::from_io_error)?;
        Ok(())
    }
}

impl Drop for FileTarget {
    fn drop(&mut self) {
        let writer = self.writer.get_mut().unwrap_or_else(|e| e.into_inner());
        let _ = writer.flush();
    }
}
