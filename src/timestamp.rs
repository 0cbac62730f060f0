//! Timestamp detection and byte-stable re-rendering.
//!
//! A RFC 3164 sender may put either a BSD stamp (`Mar  8 14:59:36`) or a
//! RFC 3339 timestamp (`2016-03-08T14:59:36.293816+00:00`, rsyslog's high
//! precision template) after the PRI. Parsing records the exact layout in a
//! [`TimestampFormat`] so the message can be written back out unchanged.

use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat, TimeZone, Timelike};

use crate::Error;

// get a character from the bytes as as a decimal
macro_rules! get_digit {
    ($bytes:ident, $index:expr, $error:ident) => {
        match $bytes.get($index) {
            Some(c) if c.is_ascii_digit() => (c - b'0') as u32,
            _ => return Err(Error::$error),
        }
    };
}

macro_rules! expect_byte {
    ($bytes:ident, $index:expr, $want:expr, $error:ident) => {
        if $bytes.get($index).copied() != Some($want) {
            return Err(Error::$error);
        }
    };
}

const MONTHS: [&[u8; 3]; 12] = [
    b"Jan", b"Feb", b"Mar", b"Apr", b"May", b"Jun", b"Jul", b"Aug", b"Sep", b"Oct", b"Nov",
    b"Dec",
];

/// How the UTC offset of a RFC 3339 timestamp was written.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OffsetStyle {
    /// `Z`
    Zulu,
    /// `+00:00`
    Colon,
    /// `+0000`
    Compact,
    /// No offset at all, the timestamp is read as UTC.
    Omitted,
}

/// The textual layout a timestamp was received in.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TimestampFormat {
    /// `2016-03-08T14:59:36.293816+00:00`; `fraction` is the number of
    /// sub-second digits, 0 meaning no fraction part.
    Rfc3339 { fraction: u8, offset: OffsetStyle },
    /// `Mar  8 14:59:36`, or `Mar 08 14:59:36` when the sender zero pads
    /// the day.
    Bsd { zero_padded_day: bool },
}

impl Default for TimestampFormat {
    fn default() -> Self {
        TimestampFormat::Rfc3339 {
            fraction: 6,
            offset: OffsetStyle::Colon,
        }
    }
}

impl TimestampFormat {
    /// Render `ts` in this layout.
    pub fn format(&self, ts: &DateTime<FixedOffset>) -> String {
        match *self {
            TimestampFormat::Bsd { zero_padded_day } => {
                let layout = if zero_padded_day {
                    "%b %d %H:%M:%S"
                } else {
                    "%b %e %H:%M:%S"
                };
                ts.format(layout).to_string()
            }
            TimestampFormat::Rfc3339 { fraction, offset } => {
                let mut out = ts.format("%Y-%m-%dT%H:%M:%S").to_string();
                if fraction > 0 {
                    // leap seconds are carried as nanos >= 1e9
                    let nanos = format!("{:09}", ts.nanosecond() % 1_000_000_000);
                    out.push('.');
                    out.push_str(&nanos[..fraction.min(9) as usize]);
                }

                let utc = ts.offset().local_minus_utc() == 0;
                match offset {
                    OffsetStyle::Zulu if utc => out.push('Z'),
                    OffsetStyle::Omitted if utc => {}
                    OffsetStyle::Compact => out.push_str(&ts.format("%z").to_string()),
                    _ => out.push_str(&ts.format("%:z").to_string()),
                }

                out
            }
        }
    }
}

/// The instant encoding used when exporting a message as JSON, e.g.
/// `2016-03-08T14:59:36.293816Z`.
///
/// Fractions are padded to 3, 6 or 9 digits, so `.1` is written as `.100`.
/// Encoders which trim trailing zeros (Go's `RFC3339Nano`) write `.1`.
pub fn canonical(ts: &DateTime<FixedOffset>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parse the timestamp at the start of `buf`.
///
/// Returns the timestamp, the layout it was written in and the number of
/// bytes consumed. `year` is used for BSD stamps, which do not carry one.
pub fn parse_timestamp(
    buf: &[u8],
    year: i32,
) -> Result<(DateTime<FixedOffset>, TimestampFormat, usize), Error> {
    match buf.first() {
        Some(c) if c.is_ascii_digit() => parse_timestamp_rfc3339(buf),
        Some(c) if c.is_ascii_alphabetic() => parse_timestamp_bsd(buf, year),
        Some(_) => Err(Error::InvalidDigit),
        None => Err(Error::TimestampTooShort),
    }
}

/// Parse a RFC 3339 timestamp at the start of `buf`, trailing bytes are
/// left for the caller.
pub fn parse_timestamp_rfc3339(
    buf: &[u8],
) -> Result<(DateTime<FixedOffset>, TimestampFormat, usize), Error> {
    // First up, parse the full date if we can
    let (year, month, day) = parse_date(buf)?;

    // Next parse the separator between date and time
    let sep = buf.get(10).copied();
    if sep != Some(b'T') && sep != Some(b't') {
        return Err(Error::InvalidCharDateTimeSep);
    }

    // Next try to parse the time
    let (hour, minute, second) = parse_clock(buf, 11)?;
    let (nanos, fraction, mut position) = parse_fraction(buf, 19)?;

    // Parse the timezone offset
    let (offset, style) = match buf.get(position).copied() {
        Some(b'Z') | Some(b'z') => {
            position += 1;
            (0, OffsetStyle::Zulu)
        }
        Some(c @ b'+') | Some(c @ b'-') => {
            let sign = if c == b'-' { -1 } else { 1 };
            position += 1;

            let hours = get_digit!(buf, position, InvalidCharTzHour) * 10
                + get_digit!(buf, position + 1, InvalidCharTzHour);
            position += 2;

            let style = if buf.get(position).copied() == Some(b':') {
                position += 1;
                OffsetStyle::Colon
            } else {
                OffsetStyle::Compact
            };

            let minutes = get_digit!(buf, position, InvalidCharTzMinute) * 10
                + get_digit!(buf, position + 1, InvalidCharTzMinute);
            position += 2;
            if minutes > 59 {
                return Err(Error::OutOfRangeTzMinute);
            }

            let seconds = (hours * 3600 + minutes * 60) as i32;
            if seconds >= 24 * 3600 {
                return Err(Error::OutOfRangeTimezone);
            }

            (sign * seconds, style)
        }
        _ => (0, OffsetStyle::Omitted),
    };

    let ts = to_datetime(year, month, day, hour, minute, second, nanos, offset)?;

    Ok((
        ts,
        TimestampFormat::Rfc3339 {
            fraction,
            offset: style,
        },
        position,
    ))
}

/// Parse a BSD stamp, `Mmm dd hh:mm:ss`, where the day may be space padded.
/// The result is placed in `year`, at UTC.
pub fn parse_timestamp_bsd(
    buf: &[u8],
    year: i32,
) -> Result<(DateTime<FixedOffset>, TimestampFormat, usize), Error> {
    // `Mar  8 14:59:36`
    if buf.len() < 15 {
        return Err(Error::TimestampTooShort);
    }

    let month = MONTHS
        .iter()
        .position(|name| buf[..3] == name[..])
        .ok_or(Error::InvalidMonthName)? as u32
        + 1;
    expect_byte!(buf, 3, b' ', InvalidCharDateSep);

    let tens = match buf[4] {
        b' ' => 0,
        c if c.is_ascii_digit() => (c - b'0') as u32,
        _ => return Err(Error::InvalidDigit),
    };
    let day = tens * 10 + get_digit!(buf, 5, InvalidDigit);
    if day < 1 || day > days_in_month(year, month)? {
        return Err(Error::OutOfRangeDay);
    }
    expect_byte!(buf, 6, b' ', InvalidCharDateTimeSep);

    let (hour, minute, second) = parse_clock(buf, 7)?;
    let ts = to_datetime(year, month, day, hour, minute, second, 0, 0)?;

    Ok((
        ts,
        TimestampFormat::Bsd {
            zero_padded_day: buf[4] == b'0',
        },
        15,
    ))
}

fn parse_date(buf: &[u8]) -> Result<(i32, u32, u32), Error> {
    if buf.len() < 10 {
        return Err(Error::TimestampTooShort);
    }

    let year = get_digit!(buf, 0, InvalidDigit) * 1000
        + get_digit!(buf, 1, InvalidDigit) * 100
        + get_digit!(buf, 2, InvalidDigit) * 10
        + get_digit!(buf, 3, InvalidDigit);
    expect_byte!(buf, 4, b'-', InvalidCharDateSep);

    let month = get_digit!(buf, 5, InvalidDigit) * 10 + get_digit!(buf, 6, InvalidDigit);
    expect_byte!(buf, 7, b'-', InvalidCharDateSep);

    let day = get_digit!(buf, 8, InvalidDigit) * 10 + get_digit!(buf, 9, InvalidDigit);

    let year = year as i32;
    if day < 1 || day > days_in_month(year, month)? {
        return Err(Error::OutOfRangeDay);
    }

    Ok((year, month, day))
}

// calculate the maximum number of days in the month, accounting for leap
// years in the gregorian calendar
fn days_in_month(year: i32, month: u32) -> Result<u32, Error> {
    let max_days = match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if year % 4 == 0 && (year % 100 != 0 || year % 400 == 0) {
                29
            } else {
                28
            }
        }
        _ => return Err(Error::OutOfRangeMonth),
    };

    Ok(max_days)
}

/// Parse `hh:mm:ss` starting at `offset`
fn parse_clock(buf: &[u8], offset: usize) -> Result<(u32, u32, u32), Error> {
    if buf.len() < offset + 8 {
        return Err(Error::TimestampTooShort);
    }

    let hour = get_digit!(buf, offset, InvalidDigit) * 10 + get_digit!(buf, offset + 1, InvalidDigit);
    if hour > 23 {
        return Err(Error::OutOfRangeHour);
    }
    expect_byte!(buf, offset + 2, b':', InvalidCharTimeSep);

    let minute =
        get_digit!(buf, offset + 3, InvalidDigit) * 10 + get_digit!(buf, offset + 4, InvalidDigit);
    if minute > 59 {
        return Err(Error::OutOfRangeMinute);
    }
    expect_byte!(buf, offset + 5, b':', InvalidCharTimeSep);

    let second =
        get_digit!(buf, offset + 6, InvalidDigit) * 10 + get_digit!(buf, offset + 7, InvalidDigit);
    if second > 59 {
        return Err(Error::OutOfRangeSecond);
    }

    Ok((hour, minute, second))
}

/// Parse an optional `.ddddddddd` second fraction starting at `offset`.
///
/// Returns the nanoseconds, the number of digits and the position after
/// the fraction.
fn parse_fraction(buf: &[u8], offset: usize) -> Result<(u32, u8, usize), Error> {
    let sep = buf.get(offset).copied();
    if sep != Some(b'.') && sep != Some(b',') {
        return Ok((0, 0, offset));
    }

    let start = offset + 1;
    let mut nanos = 0u32;
    let mut count = 0usize;
    while let Some(c) = buf.get(start + count).filter(|c| c.is_ascii_digit()) {
        if count == 9 {
            return Err(Error::SecondFractionTooLong);
        }

        nanos = nanos * 10 + (c - b'0') as u32;
        count += 1;
    }

    if count == 0 {
        return Err(Error::SecondFractionMissing);
    }

    Ok((
        nanos * 10u32.pow(9 - count as u32),
        count as u8,
        start + count,
    ))
}

#[allow(clippy::too_many_arguments)]
#[inline]
fn to_datetime(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
    nanos: u32,
    offset: i32,
) -> Result<DateTime<FixedOffset>, Error> {
    let offset = FixedOffset::east_opt(offset).ok_or(Error::OutOfRangeTimezone)?;
    let datetime = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or(Error::OutOfRangeDay)?
        .and_hms_nano_opt(hour, minute, second, nanos)
        .ok_or(Error::OutOfRangeSecond)?;

    offset
        .from_local_datetime(&datetime)
        .single()
        .ok_or(Error::OutOfRangeTimezone)
}
