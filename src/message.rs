//! In-memory representation of a single RFC 3164 syslog message.
//!
//! A message is written back out in one of two shapes: the classic
//! `<pri>timestamp host tag: content` line, or a flat JSON document whose
//! syslog fields carry a `syslog_` prefix.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::content::{self, BodyKind, CEE_MARKER};
use crate::timestamp::{self, TimestampFormat};
use crate::{Error, Facility, Options, Priority, Severity, Tag};

/// A parsed RFC 3164 message.
///
/// All mutation goes through `&mut self`, so a message shared between
/// threads has to be wrapped in a lock; see [`SharedMessage`](crate::SharedMessage).
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub(crate) priority: Priority,
    pub(crate) timestamp: DateTime<FixedOffset>,
    pub(crate) timestamp_format: TimestampFormat,
    pub(crate) host: String,
    pub(crate) tag: Tag,
    pub(crate) content: String,
    pub(crate) structured: Map<String, Value>,
    pub(crate) body: BodyKind,
    pub(crate) suppress_json_reparse: bool,
}

/// The state a message moves to when it becomes a CEE message.
struct Promotion {
    structured: Map<String, Value>,
    body: String,
}

impl Default for Message {
    fn default() -> Self {
        Message::new()
    }
}

impl Message {
    /// An empty message, stamped at the unix epoch.
    pub fn new() -> Self {
        Message::with_options(&Options::default())
    }

    pub fn with_options(options: &Options) -> Self {
        Message {
            priority: Priority::default(),
            timestamp: NaiveDateTime::default().and_utc().fixed_offset(),
            timestamp_format: TimestampFormat::default(),
            host: String::new(),
            tag: Tag::default(),
            content: String::new(),
            structured: Map::new(),
            body: BodyKind::Plain,
            suppress_json_reparse: options.suppress_json_reparse,
        }
    }

    /// Parse a RFC 3164 line. A CEE body is decoded into the structured
    /// content right away.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, Error> {
        crate::rfc3164::parse_message(buf, &Options::default())
    }

    pub fn from_bytes_with_options(buf: &[u8], options: &Options) -> Result<Self, Error> {
        crate::rfc3164::parse_message(buf, options)
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn facility(&self) -> Facility {
        self.priority.facility
    }

    pub fn severity(&self) -> Severity {
        self.priority.severity
    }

    pub fn timestamp(&self) -> DateTime<FixedOffset> {
        self.timestamp
    }

    pub fn timestamp_format(&self) -> TimestampFormat {
        self.timestamp_format
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    pub fn program(&self) -> &str {
        &self.tag.program
    }

    pub fn pid(&self) -> &str {
        &self.tag.pid
    }

    /// The body as received, including any leading separator. For a CEE
    /// message this is the JSON text after the `@cee:` marker.
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn structured(&self) -> &Map<String, Value> {
        &self.structured
    }

    pub fn body_kind(&self) -> BodyKind {
        self.body
    }

    pub fn is_json(&self) -> bool {
        self.body == BodyKind::Json
    }

    pub fn is_cee(&self) -> bool {
        self.body == BodyKind::Cee
    }

    /// `" @cee:"` for CEE messages, empty otherwise.
    pub fn cee_marker(&self) -> &'static str {
        if self.is_cee() {
            CEE_MARKER
        } else {
            ""
        }
    }

    pub fn suppress_json_reparse(&self) -> bool {
        self.suppress_json_reparse
    }

    /// Accepts a `Facility` or a raw code, codes out of range are rejected.
    pub fn set_facility(&mut self, facility: impl Into<u8>) -> Result<(), Error> {
        self.priority.set_facility(facility)
    }

    /// Accepts a `Severity` or a raw code, codes out of range are rejected.
    pub fn set_severity(&mut self, severity: impl Into<u8>) -> Result<(), Error> {
        self.priority.set_severity(severity)
    }

    pub fn set_priority(&mut self, priority: Priority) {
        self.priority = priority;
    }

    /// Replace the timestamp. The layout it is written in stays the same,
    /// see [`Message::set_timestamp_format`].
    pub fn set_timestamp(&mut self, timestamp: impl Into<DateTime<FixedOffset>>) {
        self.timestamp = timestamp.into();
    }

    pub fn set_timestamp_format(&mut self, format: TimestampFormat) {
        self.timestamp_format = format;
    }

    pub fn set_program(&mut self, program: impl Into<String>) {
        self.tag.program = program.into();
    }

    pub fn set_pid(&mut self, pid: impl Into<String>) {
        self.tag.pid = pid.into();
    }

    pub fn set_tag(&mut self, tag: Tag) {
        self.tag = tag;
    }

    pub fn set_host(&mut self, host: impl Into<String>) {
        self.host = host.into();
    }

    /// Replace the body, classifying it again.
    ///
    /// When a CEE body does not decode, the error is returned but `raw` is
    /// still stored as a plain body so the message stays usable.
    pub fn set_content(&mut self, raw: &str) -> Result<(), Error> {
        match content::classify(raw, !self.suppress_json_reparse) {
            Ok(content) => {
                self.content = content.raw;
                self.structured = content.structured;
                self.body = content.kind;
                Ok(())
            }
            Err(err) => {
                debug!(%err, "body is not valid json, keeping it as text");

                self.content = raw.to_string();
                self.structured.clear();
                self.body = BodyKind::Plain;
                Err(err)
            }
        }
    }

    /// Set `key` to `value` in the structured content, replacing whatever
    /// was there.
    pub fn add_tag(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.structured.insert(key.into(), value.into());
    }

    /// Append `value` to the array at `key`, creating it when missing.
    ///
    /// The first append turns the message into a CEE message, its body
    /// minus the first character moving to the `msg` key. Fails with
    /// [`Error::TypeMismatch`] and changes nothing when `key` holds
    /// something other than an array.
    ///
    /// On a CEE message whose body was not decoded yet, the body is decoded
    /// first, so this can fail with [`Error::MalformedJson`].
    pub fn add_to_tag_array(&mut self, key: &str, value: impl Into<Value>) -> Result<(), Error> {
        let mut structured = if self.is_cee() {
            self.cee_fields()?
        } else {
            self.structured.clone()
        };

        if let Some(existing) = structured.get(key) {
            if !existing.is_array() {
                return Err(Error::TypeMismatch {
                    key: key.to_string(),
                });
            }
        }
        push_to_array(&mut structured, key, value.into());

        if self.is_cee() {
            self.structured = structured;
            return Ok(());
        }

        let mut chars = self.content.chars();
        chars.next();
        let promotion = self.promotion(structured, chars.as_str())?;
        self.apply(promotion);

        Ok(())
    }

    /// Turn this message into a CEE message. Does nothing if it already is
    /// one.
    ///
    /// The body is kept under the `msg` key, without its leading spaces.
    pub fn promote_to_cee(&mut self) -> Result<(), Error> {
        if self.is_cee() {
            return Ok(());
        }

        let promotion = self.promotion(self.structured.clone(), self.trimmed_content())?;
        self.apply(promotion);

        Ok(())
    }

    /// The RFC 3164 line for this message, newline terminated, without
    /// changing the message.
    ///
    /// The body is chosen as follows:
    ///  1. a decoded JSON body is written from the structured content,
    ///  2. otherwise, any structured content is written as a CEE body, as
    ///     [`Message::promote_to_cee`] would leave it,
    ///  3. otherwise the content is written as received.
    ///
    /// A re-encoded JSON body keeps the whitespace it was received with
    /// between the tag and the `{`, so an untouched message renders the
    /// way it was parsed.
    pub fn render(&self) -> Result<String, Error> {
        self.render_inner().map(|(text, _)| text)
    }

    /// Like [`Message::render`], but a message carrying structured content
    /// is promoted to CEE, so the message matches what was written.
    pub fn to_text(&mut self) -> Result<String, Error> {
        let (text, promotion) = self.render_inner()?;
        if let Some(promotion) = promotion {
            self.apply(promotion);
        }

        Ok(text)
    }

    pub fn to_bytes(&mut self) -> Result<Vec<u8>, Error> {
        self.to_text().map(String::into_bytes)
    }

    /// Export as a flat JSON object. Syslog fields are named with a
    /// `syslog_` prefix and overwrite body fields of the same name.
    pub fn to_json(&self) -> Result<Vec<u8>, Error> {
        let mut export = self.cee_fields()?;

        for (key, value) in [
            ("syslog_time", timestamp::canonical(&self.timestamp)),
            ("syslog_host", self.host.clone()),
            ("syslog_tag", self.tag.to_string()),
            ("syslog_programname", self.tag.program.clone()),
            ("syslog_pid", self.tag.pid.clone()),
            ("syslog_facilitytext", self.priority.facility_text().to_string()),
            ("syslog_severitytext", self.priority.severity_text().to_string()),
        ] {
            export.insert(key.to_string(), Value::String(value));
        }

        if !self.is_cee() {
            export.insert(
                "syslog_content".to_string(),
                Value::String(self.content.clone()),
            );
        }

        serde_json::to_vec(&export).map_err(Error::Encoding)
    }

    fn render_inner(&self) -> Result<(String, Option<Promotion>), Error> {
        let mut promotion = None;
        let body = match self.body {
            BodyKind::Json if !self.suppress_json_reparse => {
                let content = self.content.as_str();
                let leading = &content[..content.len() - content.trim_start().len()];
                format!("{leading}{}", encode(&self.structured)?)
            }
            BodyKind::Cee if !self.structured.is_empty() => encode(&self.cee_fields()?)?,
            _ if !self.structured.is_empty() => {
                let p = self.promotion(self.structured.clone(), self.trimmed_content())?;
                let body = p.body.clone();
                promotion = Some(p);
                body
            }
            _ => self.content.clone(),
        };

        let marker = if promotion.is_some() {
            CEE_MARKER
        } else {
            self.cee_marker()
        };

        let text = format!(
            "<{}>{} {} {}{}{}\n",
            self.priority,
            self.timestamp_format.format(&self.timestamp),
            self.host,
            self.tag,
            marker,
            body
        );

        Ok((text, promotion))
    }

    /// The structured content. A CEE body whose decoding was deferred is
    /// decoded here, with the structured content laid over it.
    fn cee_fields(&self) -> Result<Map<String, Value>, Error> {
        let mut fields = if self.suppress_json_reparse && self.is_cee() {
            serde_json::from_str::<Map<String, Value>>(&self.content)
                .map_err(Error::MalformedJson)?
        } else {
            Map::new()
        };

        fields.extend(
            self.structured
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );

        Ok(fields)
    }

    fn trimmed_content(&self) -> &str {
        self.content.trim_start_matches(' ')
    }

    /// Work out the CEE state for `structured` without touching `self`.
    fn promotion(
        &self,
        mut structured: Map<String, Value>,
        msg: &str,
    ) -> Result<Promotion, Error> {
        structured.insert("msg".to_string(), Value::String(msg.to_string()));

        let body = encode(&structured)?;
        Ok(Promotion { structured, body })
    }

    fn apply(&mut self, promotion: Promotion) {
        trace!(host = %self.host, tag = %self.tag, "promoting message to cee");

        self.structured = promotion.structured;
        self.content = promotion.body;
        self.body = BodyKind::Cee;
    }
}

fn push_to_array(structured: &mut Map<String, Value>, key: &str, value: Value) {
    if let Value::Array(values) = structured
        .entry(key)
        .or_insert_with(|| Value::Array(Vec::new()))
    {
        values.push(value);
    }
}

fn encode(structured: &Map<String, Value>) -> Result<String, Error> {
    serde_json::to_string(structured).map_err(Error::Encoding)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn plain() -> Message {
        let mut msg = Message::new();
        msg.set_timestamp(
            FixedOffset::east_opt(0)
                .unwrap()
                .with_ymd_and_hms(2016, 3, 8, 14, 59, 36)
                .unwrap(),
        );
        msg.set_host("host.example.com");
        msg.set_tag(Tag::new("kernel"));
        msg.set_content(" test").unwrap();
        msg
    }

    #[test]
    fn empty() {
        let mut msg = Message::new();
        assert_eq!(msg.body_kind(), BodyKind::Plain);
        assert!(msg.structured().is_empty());
        assert_eq!(msg.cee_marker(), "");
        assert_eq!(
            msg.to_text().unwrap(),
            "<0>1970-01-01T00:00:00.000000+00:00  \n"
        );
    }

    #[test]
    fn setters() {
        let mut msg = plain();
        msg.set_facility(Facility::LOCAL7).unwrap();
        msg.set_severity(Severity::ERR).unwrap();
        msg.set_program("test");
        msg.set_pid("12");

        assert_eq!(msg.priority().value(), 187);
        assert_eq!(msg.tag().to_string(), "test[12]:");
        assert_eq!(
            msg.render().unwrap(),
            "<187>2016-03-08T14:59:36.000000+00:00 host.example.com test[12]: test\n"
        );

        assert!(msg.set_facility(42u8).is_err());
        assert!(msg.set_severity(9u8).is_err());
        assert_eq!(msg.facility(), Facility::LOCAL7);
        assert_eq!(msg.severity(), Severity::ERR);
    }

    #[test]
    fn set_timestamp_keeps_format() {
        let mut msg = plain();
        let bsd = TimestampFormat::Bsd {
            zero_padded_day: false,
        };
        msg.set_timestamp_format(bsd);
        msg.set_timestamp(
            chrono::Utc
                .with_ymd_and_hms(2017, 4, 2, 1, 2, 3)
                .unwrap(),
        );
        assert_eq!(msg.timestamp_format(), bsd);
        assert!(msg
            .render()
            .unwrap()
            .starts_with("<0>Apr  2 01:02:03 host.example.com"));
    }

    #[test]
    fn set_content_classifies() {
        let mut msg = plain();
        msg.set_content(r#"{"a":"b"}"#).unwrap();
        assert!(msg.is_json());
        assert_eq!(msg.structured()["a"], json!("b"));

        msg.set_content(" plain again").unwrap();
        assert_eq!(msg.body_kind(), BodyKind::Plain);
        assert!(msg.structured().is_empty());
    }

    #[test]
    fn set_content_keeps_text_on_error() {
        let mut msg = plain();
        let err = msg.set_content(r#" @cee:{"a":"#).unwrap_err();
        assert!(matches!(err, Error::MalformedJson(_)));
        assert_eq!(msg.content(), r#" @cee:{"a":"#);
        assert_eq!(msg.body_kind(), BodyKind::Plain);
        assert!(msg.structured().is_empty());
    }

    #[test]
    fn add_tag_overwrites() {
        let mut msg = plain();
        msg.add_tag("a", 1);
        msg.add_tag("a", "two");
        assert_eq!(msg.structured()["a"], json!("two"));
        // adding a tag alone does not promote
        assert!(!msg.is_cee());
    }

    #[test]
    fn add_to_tag_array_promotes_once() {
        let mut msg = plain();
        msg.add_to_tag_array("tags", "trace").unwrap();

        assert!(msg.is_cee());
        assert_eq!(msg.cee_marker(), " @cee:");
        assert_eq!(msg.structured()["tags"], json!(["trace"]));
        assert_eq!(msg.structured()["msg"], json!("test"));

        msg.add_to_tag_array("tags", "oops").unwrap();
        msg.add_tag("msg", "replaced");
        msg.add_to_tag_array("tags", 3).unwrap();
        assert_eq!(msg.structured()["tags"], json!(["trace", "oops", 3]));
        // already CEE, msg is not taken from the content again
        assert_eq!(msg.structured()["msg"], json!("replaced"));
    }

    #[test]
    fn add_to_tag_array_type_mismatch() {
        let mut msg = plain();
        msg.add_tag("tags", "scalar");
        let before = msg.clone();

        let err = msg.add_to_tag_array("tags", "trace").unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { ref key } if key == "tags"));
        assert_eq!(msg, before);
        assert!(!msg.is_cee());
    }

    #[test]
    fn render_does_not_promote() {
        let mut msg = plain();
        msg.add_tag("tags", json!(["trace"]));
        let before = msg.clone();

        let rendered = msg.render().unwrap();
        assert_eq!(msg, before);

        let text = msg.to_text().unwrap();
        assert_eq!(rendered, text);
        assert!(msg.is_cee());
        assert_eq!(
            text,
            "<0>2016-03-08T14:59:36.000000+00:00 host.example.com kernel: @cee:{\"msg\":\"test\",\"tags\":[\"trace\"]}\n"
        );
    }

    #[test]
    fn promote_to_cee_is_idempotent() {
        let mut msg = plain();
        msg.promote_to_cee().unwrap();
        let once = msg.clone();
        msg.promote_to_cee().unwrap();

        assert_eq!(msg, once);
        assert_eq!(msg.structured()["msg"], json!("test"));
        assert_eq!(msg.content(), r#"{"msg":"test"}"#);
    }

    #[test]
    fn json_body_keeps_leading_separator() {
        let mut msg = plain();
        msg.set_content(r#" {"b":2,"a":1}"#).unwrap();
        assert!(msg
            .render()
            .unwrap()
            .ends_with("kernel: {\"a\":1,\"b\":2}\n"));
    }

    #[test]
    fn json_body_with_array_tag_becomes_cee() {
        let mut msg = plain();
        msg.set_content(r#" {"a":1}"#).unwrap();
        msg.add_to_tag_array("tags", "x").unwrap();

        assert!(msg.is_cee());
        assert_eq!(msg.structured()["a"], json!(1));
        assert_eq!(msg.structured()["msg"], json!(r#"{"a":1}"#));
        assert!(msg
            .render()
            .unwrap()
            .ends_with("kernel: @cee:{\"a\":1,\"msg\":\"{\\\"a\\\":1}\",\"tags\":[\"x\"]}\n"));
    }

    #[test]
    fn add_to_tag_array_drops_one_character() {
        let mut msg = plain();
        msg.set_content("  x").unwrap();
        msg.add_to_tag_array("tags", "t").unwrap();
        assert_eq!(msg.structured()["msg"], json!(" x"));

        let mut msg = plain();
        msg.set_content("").unwrap();
        msg.add_to_tag_array("tags", "t").unwrap();
        assert_eq!(msg.structured()["msg"], json!(""));
    }

    #[test]
    fn to_text_trims_leading_spaces() {
        let mut msg = plain();
        msg.set_content("  x").unwrap();
        msg.add_tag("a", 1);
        msg.to_text().unwrap();
        assert_eq!(msg.structured()["msg"], json!("x"));

        let mut msg = plain();
        msg.set_content("").unwrap();
        msg.add_tag("a", 1);
        msg.to_text().unwrap();
        assert_eq!(msg.structured()["msg"], json!(""));
    }

    #[test]
    fn export_plain() {
        let msg = plain();
        let got: Value = serde_json::from_slice(&msg.to_json().unwrap()).unwrap();
        assert_eq!(
            got,
            json!({
                "syslog_content": " test",
                "syslog_facilitytext": "kern",
                "syslog_host": "host.example.com",
                "syslog_pid": "",
                "syslog_programname": "kernel",
                "syslog_severitytext": "emerg",
                "syslog_tag": "kernel:",
                "syslog_time": "2016-03-08T14:59:36Z",
            })
        );
    }

    #[test]
    fn export_reserved_keys_win() {
        let mut msg = plain();
        msg.add_tag("syslog_host", "spoofed");
        msg.add_tag("other", true);

        let got: Value = serde_json::from_slice(&msg.to_json().unwrap()).unwrap();
        assert_eq!(got["syslog_host"], json!("host.example.com"));
        assert_eq!(got["other"], json!(true));
    }

    #[test]
    fn export_suppressed_cee_with_bad_body() {
        let options = Options::default().with_suppress_json_reparse(true);
        let mut msg = Message::with_options(&options);
        msg.set_content(r#" @cee:{"a":"#).unwrap();
        assert!(msg.is_cee());

        let err = msg.to_json().unwrap_err();
        assert!(matches!(err, Error::MalformedJson(_)));
    }

    #[test]
    fn export_after_promotion_with_suppressed_reparse() {
        let options = Options::default().with_suppress_json_reparse(true);
        let mut msg = Message::with_options(&options);
        msg.set_content(" plain text").unwrap();
        msg.add_to_tag_array("tags", "trace").unwrap();

        let got: Value = serde_json::from_slice(&msg.to_json().unwrap()).unwrap();
        assert_eq!(got["msg"], json!("plain text"));
        assert_eq!(got["tags"], json!(["trace"]));
        assert!(got.get("syslog_content").is_none());
    }
}
