use std::fmt;

/// The `program[pid]:` prefix that follows the hostname in a RFC 3164
/// message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tag {
    pub program: String,
    /// Empty when the sender did not include one.
    pub pid: String,
    pub has_colon: bool,
}

impl Tag {
    /// A tag for `program`, rendered with a trailing colon.
    pub fn new(program: impl Into<String>) -> Self {
        Tag {
            program: program.into(),
            pid: String::new(),
            has_colon: true,
        }
    }

    pub fn with_pid(mut self, pid: impl Into<String>) -> Self {
        self.pid = pid.into();
        self
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        if !self.pid.is_empty() {
            write!(f, "[{}]", self.pid)?;
        }
        if self.has_colon {
            f.write_str(":")?;
        }

        Ok(())
    }
}
