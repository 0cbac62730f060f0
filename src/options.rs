use serde::Deserialize;

/// Options recognised when a message is created.
///
/// Deserializable so it can live in a host pipeline's configuration:
///
/// ```
/// let options: sysmsg::Options =
///     serde_json::from_str(r#"{"suppress_json_reparse": true}"#).unwrap();
/// assert!(options.suppress_json_reparse);
/// ```
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    /// Leave CEE and JSON bodies undecoded until the message is exported
    /// as JSON.
    pub suppress_json_reparse: bool,
    /// Year for BSD timestamps, which do not carry one. Defaults to the
    /// current UTC year.
    pub year: Option<i32>,
}

impl Options {
    pub fn with_suppress_json_reparse(mut self, suppress: bool) -> Self {
        self.suppress_json_reparse = suppress;
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }
}
