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

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::sync::Barrier;
use std::thread;

use logforth_sink::FileLogConsumer;
use logforth_sink::FileLogConsumerConfig;
use logforth_sink::LogConsumer;
use logforth_sink::LogRegistry;
use logforth_sink::context::VariablesContext;
use logforth_sink::event::LogEvent;
use logforth_sink::event::LogLevel;
use logforth_sink::record::ErrorRef;
use tempfile::TempDir;

const LAYOUT: &str = "${level|upper|pad=-5} ${message}${exception|prefix= }";

fn info(message: &str) -> LogEvent {
    LogEvent::builder(LogLevel::INFO).message(message).build()
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_parallel_initializations_yield_distinct_names() {
    let dir = TempDir::new().expect("failed to create a temporary directory");
    let registry = Arc::new(LogRegistry::new());
    let n = 16;
    let barrier = Arc::new(Barrier::new(n));

    let handles = (0..n)
        .map(|i| {
            let registry = registry.clone();
            let barrier = barrier.clone();
            let context = VariablesContext::new(dir.path()).with_variable("i", i);
            thread::spawn(move || {
                let mut consumer = FileLogConsumer::new(registry)
                    .with_file_name_template("{i}.log")
                    .with_layout(LAYOUT);
                barrier.wait();
                consumer.initialize(&context).unwrap();
                consumer
            })
        })
        .collect::<Vec<_>>();

    let consumers = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .collect::<Vec<_>>();

    let names = consumers
        .iter()
        .map(|c| c.unique_name().unwrap().to_string())
        .collect::<HashSet<_>>();
    assert_eq!(names.len(), n);
    assert_eq!(registry.configuration().unwrap().rules().len(), n);

    for mut consumer in consumers {
        consumer.dispose().unwrap();
    }
    assert!(registry.configuration().unwrap().rules().is_empty());
}

#[test]
fn test_two_consumers_write_independent_files() {
    let dir = TempDir::new().expect("failed to create a temporary directory");
    let registry = Arc::new(LogRegistry::new());

    let mut a = FileLogConsumer::new(registry.clone()).with_layout(LAYOUT);
    let mut b = a.clone();
    a.initialize(&VariablesContext::new(dir.path().join("a")))
        .unwrap();
    b.initialize(&VariablesContext::new(dir.path().join("b")))
        .unwrap();
    assert_ne!(a.unique_name(), b.unique_name());
    assert_ne!(a.rule().unwrap().name(), b.rule().unwrap().name());

    a.log(&info("from a")).unwrap();
    b.log(&info("from b")).unwrap();

    assert_eq!(read_lines(&dir.path().join("a/Trace.log")), ["INFO  from a"]);
    assert_eq!(read_lines(&dir.path().join("b/Trace.log")), ["INFO  from b"]);
}

#[test]
fn test_dispose_removes_only_own_rule() {
    let dir = TempDir::new().expect("failed to create a temporary directory");
    let registry = Arc::new(LogRegistry::new());

    let mut a = FileLogConsumer::new(registry.clone())
        .with_file_name_template("a.log")
        .with_layout(LAYOUT);
    let mut b = FileLogConsumer::new(registry.clone())
        .with_file_name_template("b.log")
        .with_layout(LAYOUT);
    let context = VariablesContext::new(dir.path());
    a.initialize(&context).unwrap();
    b.initialize(&context).unwrap();

    let before = registry.configuration().unwrap().rules().len();
    let b_rule = b.rule().unwrap().clone();
    a.dispose().unwrap();

    let configuration = registry.configuration().unwrap();
    assert_eq!(configuration.rules().len(), before - 1);
    assert!(
        configuration
            .rules()
            .iter()
            .any(|rule| Arc::ptr_eq(rule, &b_rule))
    );

    b.log(&info("after a left")).unwrap();
    assert_eq!(read_lines(&dir.path().join("b.log")), ["INFO  after a left"]);
    assert!(read_lines(&dir.path().join("a.log")).is_empty());
}

#[test]
fn test_concurrent_logging_from_many_threads() {
    let dir = TempDir::new().expect("failed to create a temporary directory");
    let registry = Arc::new(LogRegistry::new());
    let mut consumer = FileLogConsumer::new(registry).with_layout("${message}");
    consumer
        .initialize(&VariablesContext::new(dir.path()))
        .unwrap();

    let consumer = Arc::new(consumer);
    let handles = (0..8)
        .map(|t| {
            let consumer = consumer.clone();
            thread::spawn(move || {
                for i in 0..50 {
                    consumer.log(&info(&format!("{t}-{i}"))).unwrap();
                }
            })
        })
        .collect::<Vec<_>>();
    for handle in handles {
        handle.join().unwrap();
    }

    let lines = read_lines(&dir.path().join("Trace.log"));
    assert_eq!(lines.len(), 400);
    assert_eq!(lines.iter().collect::<HashSet<_>>().len(), 400);
}

#[test]
fn test_error_is_rendered_after_message() {
    let dir = TempDir::new().expect("failed to create a temporary directory");
    let registry = Arc::new(LogRegistry::new());
    let mut consumer = FileLogConsumer::new(registry).with_layout(LAYOUT);
    consumer
        .initialize(&VariablesContext::new(dir.path()))
        .unwrap();

    let err: ErrorRef = Arc::new(io::Error::other("element not found"));
    let event = LogEvent::builder(LogLevel::ERROR)
        .message("Click \"Save\" button")
        .exception(err)
        .build();
    consumer.log(&event).unwrap();

    assert_eq!(
        read_lines(&dir.path().join("Trace.log")),
        ["ERROR Click \"Save\" button element not found"]
    );
}

#[test]
fn test_full_default_layout() {
    let dir = TempDir::new().expect("failed to create a temporary directory");
    let registry = Arc::new(LogRegistry::new());
    let mut consumer = FileLogConsumer::new(registry);
    consumer
        .initialize(&VariablesContext::new(dir.path()))
        .unwrap();

    let event = LogEvent::builder(LogLevel::WARN)
        .message("Retrying")
        .property("time-elapsed", "00:00:03.120")
        .property("execution-unit-id", "7f3a")
        .property("log-nesting-text", "- ")
        .property("log-source", "LoginPage")
        .property("log-category", "Setup")
        .build();
    consumer.log(&event).unwrap();

    assert_eq!(
        read_lines(&dir.path().join("Trace.log")),
        ["00:00:03.120 7f3a  WARN - {LoginPage} [Setup] Retrying"]
    );
}

#[test]
fn test_default_layout_error_without_message() {
    let dir = TempDir::new().expect("failed to create a temporary directory");
    let registry = Arc::new(LogRegistry::new());
    let mut consumer = FileLogConsumer::new(registry);
    consumer
        .initialize(&VariablesContext::new(dir.path()))
        .unwrap();

    let err: ErrorRef = Arc::new(io::Error::other("boom"));
    let without_message = LogEvent::builder(LogLevel::ERROR)
        .exception(err.clone())
        .property("time-elapsed", 0.5f64)
        .property("execution-unit-id", "7f3a")
        .build();
    let with_message = LogEvent::builder(LogLevel::ERROR)
        .message("Saving failed")
        .exception(err)
        .property("time-elapsed", 0.75f64)
        .property("execution-unit-id", "7f3a")
        .build();
    consumer.log(&without_message).unwrap();
    consumer.log(&with_message).unwrap();

    assert_eq!(
        read_lines(&dir.path().join("Trace.log")),
        [
            "00:00:00.500 7f3a ERROR boom",
            "00:00:00.750 7f3a ERROR Saving failed boom",
        ]
    );
}

#[cfg(feature = "serde")]
#[test]
fn test_config_from_json() {
    let config: FileLogConsumerConfig =
        serde_json::from_str(r#"{ "file-name-template": "{test-name}.log" }"#).unwrap();
    assert_eq!(config.file_name_template, "{test-name}.log");
    assert_eq!(config.layout, logforth_sink::DEFAULT_LAYOUT);

    let consumer = FileLogConsumer::from_config(Arc::new(LogRegistry::new()), config.clone());
    assert_eq!(consumer.config(), &config);

    let defaults: FileLogConsumerConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(defaults, FileLogConsumerConfig::default());
}

#[test]
fn test_boxed_consumers_through_the_trait() {
    let dir = TempDir::new().expect("failed to create a temporary directory");
    let registry = Arc::new(LogRegistry::new());
    let template: Box<dyn LogConsumer> = Box::new(
        FileLogConsumer::new(registry.clone())
            .with_file_name_template("{unit}.log")
            .with_layout("${message}"),
    );

    let mut consumers = (0..3)
        .map(|_| template.clone_consumer())
        .collect::<Vec<_>>();
    for (i, consumer) in consumers.iter_mut().enumerate() {
        let context = VariablesContext::new(dir.path()).with_variable("unit", i);
        consumer.initialize(&context).unwrap();
        consumer.log(&info(&format!("unit {i}"))).unwrap();
    }
    for consumer in consumers.iter_mut() {
        consumer.dispose().unwrap();
    }

    for i in 0..3 {
        assert_eq!(
            read_lines(&dir.path().join(format!("{i}.log"))),
            [format!("unit {i}")]
        );
    }
    assert!(registry.configuration().unwrap().rules().is_empty());
}
