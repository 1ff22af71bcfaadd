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

//! A file log consumer for test-automation hosts, with routing rules registered at runtime.
//!
//! # Overview
//!
//! A host drives a [`LogConsumer`] through its lifecycle: `initialize` once per context, `log`
//! for every event, `clone_consumer` to reuse the configuration elsewhere, and `dispose` at
//! teardown. [`FileLogConsumer`] implements that lifecycle on top of a [`LogRegistry`]: on
//! initialize it adds a uniquely named, final routing rule that sends its own logger to a file
//! under the context's artifacts directory, and on dispose it removes the rule again. Many
//! consumers can share one registry; each only ever sees its own events.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use logforth_sink::FileLogConsumer;
//! use logforth_sink::LogConsumer;
//! use logforth_sink::LogRegistry;
//! use logforth_sink::context::VariablesContext;
//! use logforth_sink::event::LogEvent;
//! use logforth_sink::event::LogLevel;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let registry = Arc::new(LogRegistry::new());
//!
//! let mut consumer = FileLogConsumer::new(registry.clone());
//! consumer.initialize(&VariablesContext::new(dir.path())).unwrap();
//!
//! let event = LogEvent::builder(LogLevel::INFO)
//!     .message("Go to \"Sign In\" page")
//!     .property("time-elapsed", "00:00:00.015")
//!     .property("execution-unit-id", "a1")
//!     .build();
//! consumer.log(&event).unwrap();
//! consumer.dispose().unwrap();
//!
//! let content = std::fs::read_to_string(dir.path().join("Trace.log")).unwrap();
//! assert_eq!(content, "00:00:00.015 a1  INFO Go to \"Sign In\" page\n");
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod append;
pub mod bridge;
pub mod context;
pub mod event;
pub mod layout;
pub mod record;
pub mod rule;

mod consumer;
mod error;
mod logger;
mod registry;

pub use self::append::Append;
pub use self::consumer::DEFAULT_FILE_NAME;
pub use self::consumer::DEFAULT_LAYOUT;
pub use self::consumer::FileLogConsumer;
pub use self::consumer::FileLogConsumerConfig;
pub use self::consumer::LogConsumer;
pub use self::error::Error;
pub use self::layout::Layout;
pub use self::logger::Logger;
pub use self::registry::LogRegistry;
