//! A model of a single [RFC 3164](https://tools.ietf.org/html/rfc3164) syslog message, as
//! produced by rsyslog, with conversion back to the wire line and export to JSON.
//!
//! Message bodies come in three shapes: plain text, a JSON object, or a CEE body (`@cee:`
//! followed by a JSON object). A message keeps both the body as received and its decoded
//! fields, and decides per write which of the two to emit so nothing gets lost. Adding
//! structured fields to a plain message turns it into a CEE message.
//!
//! # Example
//!
//! ```
//! use sysmsg::Message;
//!
//! let input = b"<4>2016-03-08T14:59:36.293816+00:00 host.example.com kernel: test\n";
//! let mut msg = Message::from_bytes(input).unwrap();
//! assert_eq!(msg.to_text().unwrap().as_bytes(), input);
//!
//! msg.add_to_tag_array("tags", "trace").unwrap();
//! assert_eq!(
//!     msg.to_text().unwrap(),
//!     "<4>2016-03-08T14:59:36.293816+00:00 host.example.com kernel: @cee:{\"msg\":\"test\",\"tags\":[\"trace\"]}\n"
//! );
//! ```
//!
//! # Unimplemented Features
//!
//!  * RFC 5424 messages and their structured data.
//!  * Non-unicode message bodies; the whole line has to be valid utf-8.
//!

pub mod content;
mod error;
mod facility;
mod message;
mod options;
mod priority;
pub mod rfc3164;
mod severity;
mod shared;
mod tag;
pub mod timestamp;

pub use content::BodyKind;
pub use error::{Error, Result};
pub use facility::Facility;
pub use message::Message;
pub use options::Options;
pub use priority::Priority;
pub use severity::Severity;
pub use shared::SharedMessage;
pub use tag::Tag;
pub use timestamp::{parse_timestamp, OffsetStyle, TimestampFormat};
