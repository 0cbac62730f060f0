use std::fmt;

use crate::{Error, Facility, Severity};

/// The `PRI` part of a syslog message, e.g. the `4` in `<4>`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Priority {
    pub facility: Facility,
    pub severity: Severity,
}

impl Default for Priority {
    fn default() -> Self {
        Priority {
            facility: Facility::KERN,
            severity: Severity::EMERG,
        }
    }
}

impl Priority {
    pub fn new(facility: Facility, severity: Severity) -> Self {
        Priority { facility, severity }
    }

    /// The numeric PRI value, `facility * 8 + severity`.
    pub fn value(&self) -> u8 {
        ((self.facility as u8) << 3) | self.severity as u8
    }

    /// Accepts a `Facility` or a raw facility code. Out of range codes are
    /// rejected and leave the priority untouched.
    pub fn set_facility(&mut self, facility: impl Into<u8>) -> Result<(), Error> {
        self.facility = Facility::try_from(facility.into())?;
        Ok(())
    }

    /// Accepts a `Severity` or a raw severity code. Out of range codes are
    /// rejected and leave the priority untouched.
    pub fn set_severity(&mut self, severity: impl Into<u8>) -> Result<(), Error> {
        self.severity = Severity::try_from(severity.into())?;
        Ok(())
    }

    pub fn facility_text(&self) -> &'static str {
        self.facility.as_str()
    }

    pub fn severity_text(&self) -> &'static str {
        self.severity.as_str()
    }
}

/// Decode a PRI as found on the wire.
impl TryFrom<i32> for Priority {
    type Error = Error;

    fn try_from(prival: i32) -> Result<Self, Self::Error> {
        if !(0..=191).contains(&prival) {
            return Err(Error::InvalidEnumValue {
                kind: "priority",
                value: prival,
            });
        }

        let severity = Severity::try_from((prival & 0x7) as u8)?;
        let facility = Facility::try_from((prival >> 3) as u8)?;

        Ok(Priority { facility, severity })
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}
