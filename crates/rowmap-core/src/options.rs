//! Per-query mapping options

/// Options threaded through schema resolution and materialization.
///
/// Every query carries its own copy; there is no process-wide switch.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct MapOptions {
    /// Parse textual column values into `Uuid` targets instead of rejecting them.
    pub parse_text_identifiers: bool,

    /// Fail schema resolution when an eligible field has no matching column.
    pub strict: bool,
}

impl MapOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse_text_identifiers(mut self, enabled: bool) -> Self {
        self.parse_text_identifiers = enabled;
        self
    }

    pub fn strict(mut self, enabled: bool) -> Self {
        self.strict = enabled;
        self
    }
}
