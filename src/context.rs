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

//! The host context a consumer is initialized against.

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use crate::Error;

/// What a log consumer needs from the host when it is initialized.
pub trait Context {
    /// Interpolate host variables into a template meant to become (part of) a file path.
    fn fill_path_template_string(&self, template: &str) -> Result<String, Error>;

    /// The directory artifacts of the current run are written to.
    fn artifacts_path(&self) -> &Path;
}

/// A [`Context`] backed by a map of variables.
///
/// Templates reference variables as `{name}`; `{{` and `}}` produce literal braces. Values are
/// made safe for file names: path separators and characters that are invalid in file names on
/// common platforms are replaced with `_`.
///
/// # Examples
///
/// ```
/// use logforth_sink::context::Context;
/// use logforth_sink::context::VariablesContext;
///
/// let context = VariablesContext::new("/tmp/run1").with_variable("test-name", "Sign in");
/// let name = context.fill_path_template_string("{test-name}.log").unwrap();
/// assert_eq!(name, "Sign in.log");
/// ```
#[derive(Debug, Clone)]
pub struct VariablesContext {
    artifacts_path: PathBuf,
    variables: BTreeMap<String, String>,
}

impl VariablesContext {
    pub fn new(artifacts_path: impl Into<PathBuf>) -> Self {
        Self {
            artifacts_path: artifacts_path.into(),
            variables: BTreeMap::new(),
        }
    }

    /// Set a variable, replacing any previous value.
    pub fn with_variable(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.set_variable(name, value);
        self
    }

    /// Set a variable, replacing any previous value.
    pub fn set_variable(&mut self, name: impl Into<String>, value: impl ToString) {
        self.variables.insert(name.into(), value.to_string());
    }

    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }
}

impl Context for VariablesContext {
    fn fill_path_template_string(&self, template: &str) -> Result<String, Error> {
        let mut text = String::with_capacity(template.len());

        let mut chars = template.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    text.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    text.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        name.push(c);
                    }
                    if !closed {
                        return Err(Error::new("unterminated variable in path template")
                            .with_context("template", template));
                    }

                    let Some(value) = self.variables.get(name.trim()) else {
                        return Err(Error::new("unknown variable in path template")
                            .with_context("variable", name)
                            .with_context("template", template));
                    };
                    text.extend(value.chars().map(sanitize_path_char));
                }
                c => text.push(c),
            }
        }

        Ok(text)
    }

    fn artifacts_path(&self) -> &Path {
        &self.artifacts_path
    }
}

fn sanitize_path_char(c: char) -> char {
    match c {
        '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
        c if c.is_control() => '_',
        c => c,
    }
}
