use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid {kind} value {value}")]
    InvalidEnumValue { kind: &'static str, value: i32 },
    #[error("malformed json: {0}")]
    MalformedJson(#[source] serde_json::Error),
    #[error("value at key {key:?} is not an array")]
    TypeMismatch { key: String },
    #[error("json encoding failed: {0}")]
    Encoding(#[source] serde_json::Error),

    #[error("unexpected eof")]
    UnexpectedEndOfInput,
    #[error("unexpected input, expected character {0:?}")]
    ExpectedChar(char),
    #[error("expected a space separator")]
    ExpectSeparator,
    #[error("unicode error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("timestamp is too short")]
    TimestampTooShort,
    #[error("invalid digit in timestamp")]
    InvalidDigit,
    #[error("invalid date separator")]
    InvalidCharDateSep,
    #[error("invalid date/time separator")]
    InvalidCharDateTimeSep,
    #[error("invalid time separator")]
    InvalidCharTimeSep,
    #[error("unknown month name")]
    InvalidMonthName,
    #[error("month out of range")]
    OutOfRangeMonth,
    #[error("day out of range")]
    OutOfRangeDay,
    #[error("hour out of range")]
    OutOfRangeHour,
    #[error("minute out of range")]
    OutOfRangeMinute,
    #[error("second out of range")]
    OutOfRangeSecond,
    #[error("second fraction is missing")]
    SecondFractionMissing,
    #[error("second fraction is too long")]
    SecondFractionTooLong,
    #[error("invalid timezone sign")]
    InvalidCharTzSign,
    #[error("invalid timezone hour")]
    InvalidCharTzHour,
    #[error("invalid timezone minute")]
    InvalidCharTzMinute,
    #[error("timezone minute out of range")]
    OutOfRangeTzMinute,
    #[error("timezone out of range")]
    OutOfRangeTimezone,
}
