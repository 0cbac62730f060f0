//! Classification of a message body into plain text, an embedded JSON
//! object or a CEE (`@cee:`) structured body.

use serde_json::{Map, Value};

use crate::Error;

/// The marker put in front of a CEE body when writing a message.
pub const CEE_MARKER: &str = " @cee:";

const CEE_COOKIE: &str = "@cee:";

/// The shape of a message body.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum BodyKind {
    #[default]
    Plain,
    /// The whole body is a JSON object.
    Json,
    /// The body is `@cee:` followed by a JSON object.
    Cee,
}

/// A classified body.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Content {
    /// The body as received. For CEE bodies this is the text after the
    /// `@cee:` marker.
    pub raw: String,
    /// Decoded fields, empty unless the body was JSON and decoding was
    /// asked for.
    pub structured: Map<String, Value>,
    pub kind: BodyKind,
}

/// Classify `body`. With `parse_json` unset, JSON and CEE bodies are
/// recognised but not decoded into `structured`.
pub fn classify(body: &str, parse_json: bool) -> Result<Content, Error> {
    let trimmed = body.trim_start();

    if let Some(rest) = trimmed.strip_prefix(CEE_COOKIE) {
        let structured: Map<String, Value> = if parse_json {
            serde_json::from_str(rest).map_err(Error::MalformedJson)?
        } else {
            Map::new()
        };

        return Ok(Content {
            raw: rest.to_string(),
            structured,
            kind: BodyKind::Cee,
        });
    }

    if trimmed.starts_with('{') {
        // a body which only looks like JSON is still a valid plain message
        if let Ok(object) = serde_json::from_str::<Map<String, Value>>(body) {
            return Ok(Content {
                raw: body.to_string(),
                structured: if parse_json { object } else { Map::new() },
                kind: BodyKind::Json,
            });
        }
    }

    Ok(Content {
        raw: body.to_string(),
        structured: Map::new(),
        kind: BodyKind::Plain,
    })
}
