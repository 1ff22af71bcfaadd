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

use jiff::SignedDuration;
use jiff::tz::TimeZone;
use value_bag::ValueBag;

use crate::Error;
use crate::Layout;
use crate::record::Record;

const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

const DEFAULT_TEMPLATE: &str = "${date} ${level|upper|pad=5} ${logger}: ${message}${exception|after-message= }";

/// A layout that renders records through a template string.
///
/// The template is parsed once, when the layout is created. Placeholders have the form
/// `${name[:arg][|option...]}`; everything else is copied verbatim. Inside a placeholder, `\`
/// escapes the next character.
///
/// Fields:
///
/// * `level`, `message`, `logger`
/// * `exception`: the attached error followed by its source chain, separated by `: `.
/// * `date[:format]`: the record time, formatted with a strftime string (default
///   `%Y-%m-%d %H:%M:%S%.3f`) in the system time zone.
/// * `property:key`: a structured property, empty when absent.
///
/// Options:
///
/// * `upper`, `lower`: change the case.
/// * `pad=N`: pad with spaces to `N` characters; positive right-aligns, negative left-aligns.
/// * `prefix=TEXT`, `suffix=TEXT`: surround the value, only when it is not empty.
/// * `after-message=TEXT`: put `TEXT` before the value when both the value and the record
///   message are not empty.
/// * `utc`: render a `date` field in UTC.
/// * `elapsed`: render a `property` as `hh:mm:ss.fff`. Numbers are taken as seconds, strings
///   are parsed as durations (`PT1.5S`, `1m 30s`); other values are rendered as is.
///
/// Output format of the default template:
///
/// ```text
/// 2024-08-11 22:44:57.172 ERROR FileLogConsumer1: Hello error!
/// 2024-08-11 22:44:57.172  WARN FileLogConsumer1: Hello warn!
/// 2024-08-11 22:44:57.172  INFO FileLogConsumer1: Hello info!
/// ```
///
/// # Examples
///
/// ```
/// use logforth_sink::layout::TemplateLayout;
///
/// let layout = TemplateLayout::new(r"${level|upper|pad=-5} ${property:log-source|suffix=\: }${message}")
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct TemplateLayout {
    template: String,
    segments: Vec<Segment>,
}

impl Default for TemplateLayout {
    fn default() -> Self {
        let mut level = Field::new(FieldKind::Level);
        level.case = Case::Upper;
        level.pad = Some(5);
        let mut exception = Field::new(FieldKind::Exception);
        exception.after_message = " ".to_string();

        Self {
            template: DEFAULT_TEMPLATE.to_string(),
            segments: vec![
                Segment::Field(Field::new(FieldKind::Date(DEFAULT_DATE_FORMAT.to_string()))),
                Segment::Literal(" ".to_string()),
                Segment::Field(level),
                Segment::Literal(" ".to_string()),
                Segment::Field(Field::new(FieldKind::Logger)),
                Segment::Literal(": ".to_string()),
                Segment::Field(Field::new(FieldKind::Message)),
                Segment::Field(exception),
            ],
        }
    }
}

impl TemplateLayout {
    /// Parse a template into a layout.
    ///
    /// # Errors
    ///
    /// Return an error if a placeholder is unterminated, or names an unknown field or option.
    pub fn new(template: impl Into<String>) -> Result<Self, Error> {
        let template = template.into();
        let segments = parse(&template)?;
        Ok(Self { template, segments })
    }

    /// The template string the layout was parsed from.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Render a record into a string.
    pub fn render(&self, record: &Record) -> Result<String, Error> {
        let mut text = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => text.push_str(s),
                Segment::Field(field) => field.render(record, &mut text)?,
            }
        }
        Ok(text)
    }
}

impl Layout for TemplateLayout {
    fn format(&self, record: &Record) -> Result<Vec<u8>, Error> {
        Ok(self.render(record)?.into_bytes())
    }
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Field(Field),
}

#[derive(Debug, Clone)]
enum FieldKind {
    Level,
    Message,
    Logger,
    Exception,
    Date(String),
    Property(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Case {
    Keep,
    Upper,
    Lower,
}

#[derive(Debug, Clone)]
struct Field {
    kind: FieldKind,
    case: Case,
    pad: Option<isize>,
    prefix: String,
    suffix: String,
    after_message: String,
    utc: bool,
    elapsed: bool,
}

impl Field {
    fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            case: Case::Keep,
            pad: None,
            prefix: String::new(),
            suffix: String::new(),
            after_message: String::new(),
            utc: false,
            elapsed: false,
        }
    }

    fn render(&self, record: &Record, out: &mut String) -> Result<(), Error> {
        let mut value = match &self.kind {
            FieldKind::Level => record.level().as_str().to_string(),
            FieldKind::Message => record.message().to_string(),
            FieldKind::Logger => record.logger().to_string(),
            FieldKind::Exception => record
                .exception()
                .map(|err| render_error(err.as_ref()))
                .unwrap_or_default(),
            FieldKind::Date(format) => {
                let tz = if self.utc {
                    TimeZone::UTC
                } else {
                    TimeZone::system()
                };
                let zoned = record.time().to_zoned(tz);
                jiff::fmt::strtime::format(format.as_str(), &zoned).map_err(|err| {
                    Error::new("failed to format date")
                        .with_context("format", format)
                        .with_source(err)
                })?
            }
            FieldKind::Property(key) => match record.property(key) {
                Some(value) if self.elapsed => render_elapsed(&value),
                Some(value) => value.to_string(),
                None => String::new(),
            },
        };
        if value.is_empty() {
            return Ok(());
        }

        match self.case {
            Case::Keep => {}
            Case::Upper => value = value.to_uppercase(),
            Case::Lower => value = value.to_lowercase(),
        }

        if let Some(pad) = self.pad {
            let width = pad.unsigned_abs();
            let len = value.chars().count();
            if len < width {
                let fill = " ".repeat(width - len);
                if pad > 0 {
                    value.insert_str(0, &fill);
                } else {
                    value.push_str(&fill);
                }
            }
        }

        if !record.message().is_empty() {
            out.push_str(&self.after_message);
        }
        out.push_str(&self.prefix);
        out.push_str(&value);
        out.push_str(&self.suffix);
        Ok(())
    }
}

fn render_error(err: &(dyn std::error::Error + 'static)) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(err) = source {
        text.push_str(": ");
        text.push_str(&err.to_string());
        source = err.source();
    }
    text
}

fn render_elapsed(value: &ValueBag<'_>) -> String {
    let secs = value.to_f64().or_else(|| value.to_i64().map(|n| n as f64));
    let duration = match secs {
        Some(secs) if secs.is_finite() => Some(SignedDuration::from_millis(
            (secs * 1000.0).round() as i64,
        )),
        Some(_) => None,
        None => value.to_string().parse::<SignedDuration>().ok(),
    };
    match duration {
        Some(duration) => format_elapsed(duration),
        None => value.to_string(),
    }
}

fn format_elapsed(duration: SignedDuration) -> String {
    let sign = if duration.is_negative() { "-" } else { "" };
    let millis = duration.as_millis().unsigned_abs();
    let (secs, millis) = (millis / 1000, millis % 1000);
    format!(
        "{sign}{:02}:{:02}:{:02}.{millis:03}",
        secs / 3600,
        secs / 60 % 60,
        secs % 60
    )
}

// a template character and whether it was escaped
type Token = (char, bool);

fn parse(template: &str) -> Result<Vec<Segment>, Error> {
    let mut segments = vec![];
    let mut literal = String::new();

    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' || chars.peek() != Some(&'{') {
            literal.push(c);
            continue;
        }
        chars.next();

        let mut tokens = vec![];
        let mut closed = false;
        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some(escaped) => tokens.push((escaped, true)),
                    None => break,
                },
                '}' => {
                    closed = true;
                    break;
                }
                c => tokens.push((c, false)),
            }
        }
        if !closed {
            return Err(Error::new("unterminated placeholder in layout template")
                .with_context("template", template));
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }
        let field = parse_field(&tokens).map_err(|err| err.with_context("template", template))?;
        segments.push(Segment::Field(field));
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

fn parse_field(tokens: &[Token]) -> Result<Field, Error> {
    let mut parts = tokens.split(|&(c, escaped)| c == '|' && !escaped);
    let head = parts.next().unwrap_or_default();

    let (name, arg) = split_first(head, ':');
    let name = text(name);
    let kind = match (name.trim(), arg.map(text)) {
        ("level", None) => FieldKind::Level,
        ("message", None) => FieldKind::Message,
        ("logger", None) => FieldKind::Logger,
        ("exception", None) => FieldKind::Exception,
        ("date", format) => {
            FieldKind::Date(format.unwrap_or_else(|| DEFAULT_DATE_FORMAT.to_string()))
        }
        ("property", Some(key)) if !key.is_empty() => FieldKind::Property(key),
        ("property", _) => return Err(Error::new("property field requires a key")),
        (name, _) => return Err(Error::new(format!("unknown layout field: {name:?}"))),
    };

    let mut field = Field::new(kind);
    for option in parts {
        let (key, value) = split_first(option, '=');
        let key = text(key);
        match (key.trim(), value.map(text)) {
            ("upper", None) => field.case = Case::Upper,
            ("lower", None) => field.case = Case::Lower,
            ("utc", None) if matches!(field.kind, FieldKind::Date(_)) => field.utc = true,
            ("elapsed", None) if matches!(field.kind, FieldKind::Property(_)) => {
                field.elapsed = true
            }
            ("pad", Some(n)) => {
                let pad = n.trim().parse::<isize>().map_err(|err| {
                    Error::new("malformed padding")
                        .with_context("value", &n)
                        .with_source(err)
                })?;
                field.pad = Some(pad);
            }
            ("prefix", Some(v)) => field.prefix = v,
            ("suffix", Some(v)) => field.suffix = v,
            ("after-message", Some(v)) => field.after_message = v,
            (key, _) => return Err(Error::new(format!("unknown layout option: {key:?}"))),
        }
    }
    Ok(field)
}

fn split_first(tokens: &[Token], sep: char) -> (&[Token], Option<&[Token]>) {
    match tokens.iter().position(|&(c, escaped)| c == sep && !escaped) {
        Some(i) => (&tokens[..i], Some(&tokens[i + 1..])),
        None => (tokens, None),
    }
}

fn text(tokens: &[Token]) -> String {
    tokens.iter().map(|&(c, _)| c).collect()
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::Arc;

    use jiff::Timestamp;

    use super::*;
    use crate::record::ErrorRef;
    use crate::record::Level;

    fn timestamp() -> Timestamp {
        "2024-08-11T14:44:57.172105Z".parse().unwrap()
    }

    #[derive(Debug)]
    struct Wrapped(io::Error);

    impl std::fmt::Display for Wrapped {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("step failed")
        }
    }

    impl std::error::Error for Wrapped {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_render_fields() {
        let layout = TemplateLayout::new(
            r"${date|utc} ${level|upper|pad=5} ${logger}: ${property:log-source|prefix=\{|suffix=\} }${message}",
        )
        .unwrap();
        let record = Record::builder()
            .time(timestamp())
            .level(Level::Info)
            .logger("FileLogConsumer1")
            .message("Hello info!")
            .property("log-source", "LoginPage")
            .build();
        insta::assert_snapshot!(
            layout.render(&record).unwrap(),
            @"2024-08-11 14:44:57.172  INFO FileLogConsumer1: {LoginPage} Hello info!"
        );
    }

    #[test]
    fn test_prefix_and_suffix_skip_empty_values() {
        let layout =
            TemplateLayout::new("${property:log-category|prefix=[|suffix=] }${message}").unwrap();

        let with = Record::builder()
            .message("go")
            .property("log-category", "Setup")
            .build();
        assert_eq!(layout.render(&with).unwrap(), "[Setup] go");

        let without = Record::builder().message("go").build();
        assert_eq!(layout.render(&without).unwrap(), "go");
    }

    #[test]
    fn test_padding_skips_empty_values() {
        let layout = TemplateLayout::new("${property:log-category|pad=5|prefix=[}${message}").unwrap();
        let record = Record::builder().message("go").build();
        assert_eq!(layout.render(&record).unwrap(), "go");
    }

    #[test]
    fn test_after_message_separator() {
        let err: ErrorRef = Arc::new(io::Error::other("boom"));
        let layout = TemplateLayout::new("[${message}${exception|after-message=: }]").unwrap();

        let with_message = Record::builder()
            .message("Saving report")
            .exception(Some(err.clone()))
            .build();
        assert_eq!(layout.render(&with_message).unwrap(), "[Saving report: boom]");

        let without_message = Record::builder().exception(Some(err)).build();
        assert_eq!(layout.render(&without_message).unwrap(), "[boom]");

        let without_error = Record::builder().message("Saving report").build();
        assert_eq!(layout.render(&without_error).unwrap(), "[Saving report]");
    }

    #[test]
    fn test_elapsed_property() {
        let layout = TemplateLayout::new("${property:time-elapsed|elapsed}").unwrap();
        for (value, expected) in [
            (ValueBag::from(0.015f64), "00:00:00.015"),
            (ValueBag::from(1.25f64), "00:00:01.250"),
            (ValueBag::from(3723.5f64), "01:02:03.500"),
            (ValueBag::from(90i64), "00:01:30.000"),
            (ValueBag::from(-2.5f64), "-00:00:02.500"),
            (ValueBag::from("PT2M"), "00:02:00.000"),
            (ValueBag::from("n/a"), "n/a"),
        ] {
            let record = Record::builder().property("time-elapsed", value).build();
            assert_eq!(layout.render(&record).unwrap(), expected);
        }
    }

    #[test]
    fn test_negative_padding_left_aligns() {
        let layout = TemplateLayout::new("${level|lower|pad=-6}|").unwrap();
        let record = Record::builder().level(Level::Warn).build();
        assert_eq!(layout.render(&record).unwrap(), "warn  |");
    }

    #[test]
    fn test_exception_with_source_chain() {
        let err: ErrorRef = Arc::new(Wrapped(io::Error::other("disk full")));
        let layout = TemplateLayout::new("${message}${exception|prefix= }").unwrap();
        let record = Record::builder()
            .message("Saving report")
            .exception(Some(err))
            .build();
        insta::assert_snapshot!(
            layout.render(&record).unwrap(),
            @"Saving report step failed: disk full"
        );
    }

    #[test]
    fn test_custom_date_format() {
        let layout = TemplateLayout::new(r"${date:%H\:%M|utc}").unwrap();
        let record = Record::builder().time(timestamp()).build();
        assert_eq!(layout.render(&record).unwrap(), "14:44");
    }

    #[test]
    fn test_dollar_without_brace_is_literal() {
        let layout = TemplateLayout::new("cost: $5 ${message}").unwrap();
        let record = Record::builder().message("ok").build();
        assert_eq!(layout.render(&record).unwrap(), "cost: $5 ok");
    }

    #[test]
    fn test_default_layout() {
        let layout = TemplateLayout::default();
        assert_eq!(layout.template(), DEFAULT_TEMPLATE);

        let parsed = TemplateLayout::new(DEFAULT_TEMPLATE).unwrap();
        let record = Record::builder()
            .level(Level::Error)
            .logger("FileLogConsumer7")
            .message("Hello error!")
            .build();
        let rendered = layout.render(&record).unwrap();
        assert_eq!(rendered, parsed.render(&record).unwrap());
        assert!(rendered.ends_with(" ERROR FileLogConsumer7: Hello error!"));
    }

    #[test]
    fn test_malformed_templates() {
        for template in [
            "${message",
            "${nope}",
            "${property}",
            "${message|bold}",
            "${level|pad=wide}",
            "${level|utc}",
            "${message|elapsed}",
        ] {
            let err = TemplateLayout::new(template).unwrap_err();
            assert_eq!(err.context("template"), Some(template), "{template}");
        }
    }
}
