//! Parser for [RFC 3164](https://tools.ietf.org/html/rfc3164) BSD syslog
//! lines, as written by rsyslog and friends:
//!
//! `<PRI>TIMESTAMP SP HOSTNAME SP TAG CONTENT`

use chrono::{Datelike, Utc};
use tracing::debug;

use crate::content;
use crate::timestamp::parse_timestamp;
use crate::{Error, Message, Options, Priority, Tag};

#[inline]
fn take_until_whitespace<'a>(input: &'a str, offset: &mut usize) -> Result<&'a str, Error> {
    let buf = input.as_bytes();
    for pos in *offset..buf.len() {
        if buf[pos] == b' ' {
            let value = &input[*offset..pos];
            *offset = pos;
            return Ok(value);
        }
    }

    Err(Error::UnexpectedEndOfInput)
}

#[inline]
fn expect_separator(buf: &[u8], offset: &mut usize) -> Result<(), Error> {
    match buf.get(*offset) {
        Some(b' ') => {
            *offset += 1;
            Ok(())
        }
        Some(_) => Err(Error::ExpectSeparator),
        None => Err(Error::UnexpectedEndOfInput),
    }
}

// example: `<4>`
fn parse_priority(buf: &[u8], offset: &mut usize) -> Result<Priority, Error> {
    if buf.first() != Some(&b'<') {
        return Err(Error::ExpectedChar('<'));
    }

    let mut prival = 0i32;
    for pos in 1..buf.len() {
        let ch = buf[pos];
        if ch == b'>' {
            if pos == 1 {
                return Err(Error::UnexpectedEndOfInput);
            }

            *offset = pos + 1;
            return Priority::try_from(prival);
        }

        // at most 3 digits, `<191>`
        if !ch.is_ascii_digit() || pos > 3 {
            return Err(Error::ExpectedChar('>'));
        }

        prival = (prival * 10) + (ch - b'0') as i32;
    }

    Err(Error::UnexpectedEndOfInput)
}

// examples: `kernel:`, `kernel[12]:`, `nginx`
fn parse_tag(input: &str, offset: &mut usize) -> Result<Tag, Error> {
    let buf = input.as_bytes();
    let start = *offset;

    let mut pos = start;
    while pos < buf.len() && !matches!(buf[pos], b'[' | b':' | b' ') {
        pos += 1;
    }
    let program = &input[start..pos];

    let mut pid = "";
    if buf.get(pos) == Some(&b'[') {
        let pid_start = pos + 1;
        let pid_len = buf[pid_start..]
            .iter()
            .position(|ch| *ch == b']')
            .ok_or(Error::UnexpectedEndOfInput)?;
        pid = &input[pid_start..pid_start + pid_len];
        pos = pid_start + pid_len + 1;
    }

    let has_colon = buf.get(pos) == Some(&b':');
    if has_colon {
        pos += 1;
    }

    *offset = pos;
    Ok(Tag {
        program: program.to_string(),
        pid: pid.to_string(),
        has_colon,
    })
}

/// Parse an array of bytes into a `Message`.
///
/// A single trailing newline is dropped, everything after the tag is kept
/// verbatim as the content and handed to the content classifier; with
/// `suppress_json_reparse` set, JSON and CEE bodies are only recognised,
/// not decoded.
pub fn parse_message(buf: &[u8], options: &Options) -> Result<Message, Error> {
    let buf = buf.strip_suffix(b"\n").unwrap_or(buf);
    let input = std::str::from_utf8(buf)?;

    let mut offset = 0;
    let priority = parse_priority(buf, &mut offset)?;

    let year = options.year.unwrap_or_else(|| Utc::now().year());
    let (timestamp, timestamp_format, used) = parse_timestamp(&buf[offset..], year)?;
    offset += used;
    expect_separator(buf, &mut offset)?;

    let host = take_until_whitespace(input, &mut offset)?;
    expect_separator(buf, &mut offset)?;

    let tag = parse_tag(input, &mut offset)?;

    let body = &input[offset..];
    let content = content::classify(body, !options.suppress_json_reparse).map_err(|err| {
        debug!(%err, host, program = %tag.program, "failed to decode message body");
        err
    })?;

    Ok(Message {
        priority,
        timestamp,
        timestamp_format,
        host: host.to_string(),
        tag,
        content: content.raw,
        structured: content.structured,
        body: content.kind,
        suppress_json_reparse: options.suppress_json_reparse,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::BodyKind;
    use crate::timestamp::{OffsetStyle, TimestampFormat};
    use crate::{Facility, Severity};

    fn options() -> Options {
        Options::default().with_year(2016)
    }

    #[test]
    fn priority() {
        for (input, want) in [("<0>", 0), ("<4>", 4), ("<174>", 174), ("<191>", 191)] {
            let mut offset = 0;
            let pri = parse_priority(input.as_bytes(), &mut offset).unwrap();
            assert_eq!(pri.value(), want);
            assert_eq!(offset, input.len());
        }

        for input in ["4>", "<>", "<1914>", "<4", "<a>"] {
            assert!(parse_priority(input.as_bytes(), &mut 0).is_err(), "{input}");
        }

        assert!(matches!(
            parse_priority(b"<192>", &mut 0),
            Err(Error::InvalidEnumValue { .. })
        ));
    }

    #[test]
    fn tag() {
        for (input, program, pid, has_colon, rest) in [
            ("kernel: test", "kernel", "", true, " test"),
            ("kernel[12]: test", "kernel", "12", true, " test"),
            ("nginx 192.168.1.1 -", "nginx", "", false, " 192.168.1.1 -"),
            ("sshd[871] x", "sshd", "871", false, " x"),
            ("su:", "su", "", true, ""),
        ] {
            let mut offset = 0;
            let tag = parse_tag(input, &mut offset).unwrap();
            assert_eq!(tag.program, program);
            assert_eq!(tag.pid, pid);
            assert_eq!(tag.has_colon, has_colon);
            assert_eq!(&input[offset..], rest);
        }

        assert!(matches!(
            parse_tag("kernel[12: test", &mut 0),
            Err(Error::UnexpectedEndOfInput)
        ));
    }

    #[test]
    fn rsyslog_high_precision() {
        let msg = parse_message(
            b"<4>2016-03-08T14:59:36.293816+00:00 host.example.com kernel[12]: test\n",
            &options(),
        )
        .unwrap();

        assert_eq!(msg.facility(), Facility::KERN);
        assert_eq!(msg.severity(), Severity::WARNING);
        assert_eq!(
            msg.timestamp_format(),
            TimestampFormat::Rfc3339 {
                fraction: 6,
                offset: OffsetStyle::Colon
            }
        );
        assert_eq!(msg.host(), "host.example.com");
        assert_eq!(msg.program(), "kernel");
        assert_eq!(msg.pid(), "12");
        assert_eq!(msg.content(), " test");
        assert_eq!(msg.body_kind(), BodyKind::Plain);
    }

    #[test]
    fn rfc3164_examples() {
        // https://datatracker.ietf.org/doc/html/rfc3164#section-5.4
        for input in [
            r##"<34>Oct 11 22:14:15 mymachine su: 'su root' failed for lonvick on /dev/pts/8"##,
            r##"<13>Feb  5 17:32:18 10.0.0.99 Use the BFG!"##,
        ] {
            let _msg = parse_message(input.as_bytes(), &options()).unwrap();
        }
    }

    #[test]
    fn truncated() {
        for input in [
            "<4>2016-03-08T14:59:36.293816+00:00",
            "<4>2016-03-08T14:59:36.293816+00:00 host.example.com",
            "<4>",
        ] {
            assert!(parse_message(input.as_bytes(), &options()).is_err(), "{input}");
        }
    }

    #[test]
    fn invalid_utf8() {
        let err = parse_message(b"<4>Mar  8 14:59:36 host kernel: \xff\xfe", &options()).unwrap_err();
        assert!(matches!(err, Error::Utf8(_)));
    }

    #[test]
    fn cee_body() {
        let input = br#"<4>2016-03-08T14:59:36.293816+00:00 host.example.com test[12]: @cee:{"a":1}"#;

        let msg = parse_message(input, &options()).unwrap();
        assert_eq!(msg.body_kind(), BodyKind::Cee);
        assert_eq!(msg.content(), r#"{"a":1}"#);
        assert_eq!(msg.structured().len(), 1);

        let suppressed = options().with_suppress_json_reparse(true);
        let msg = parse_message(input, &suppressed).unwrap();
        assert_eq!(msg.body_kind(), BodyKind::Cee);
        assert!(msg.structured().is_empty());
        assert!(msg.suppress_json_reparse());
    }

    #[test]
    fn malformed_cee_body() {
        let input = br#"<4>2016-03-08T14:59:36.293816+00:00 host.example.com test[12]: @cee:{"a":"#;
        let err = parse_message(input, &options()).unwrap_err();
        assert!(matches!(err, Error::MalformedJson(_)));
    }
}
