use thiserror::Error;

/// Alias for the result type of ADC codec operations.
pub type AdcResult<T> = Result<T, AdcError>;

/// Errors that can occur when writing or reading ADC records.
///
/// Everything except [`AdcError::Truncated`] and [`AdcError::BadSync`] leaves the
/// enclosing stream positioned after the offending item, so reading can continue
/// with the next sibling. See [`AdcError::is_recoverable`].
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdcError {
    /// Fewer bytes available than a header or count field promises
    #[error("Not enough data: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    /// Pixel count outside of what the limits or the record version allow
    #[error("Pixel count {pixels} exceeds the maximum of {max}")]
    PixelLimit { pixels: usize, max: usize },

    /// Gain count outside `1..=MAX_GAINS`
    #[error("Gain count {gains} is outside 1..={max}")]
    GainLimit { gains: usize, max: usize },

    /// Sample count outside of what the limits or the record version allow
    #[error("Sample count {samples} exceeds the maximum of {max}")]
    SampleLimit { samples: usize, max: usize },

    /// Unknown or unsupported combination of zero suppression and data reduction
    #[error("Unsupported mode: zero suppression {zero_sup_mode:#x}, data reduction {data_red_mode:#x} (version {version})")]
    UnsupportedMode {
        zero_sup_mode: u8,
        data_red_mode: u8,
        version: u32,
    },

    /// Record version newer than this codec understands
    #[error("Unsupported version {version} for item type {item_type} (max {max})")]
    UnsupportedVersion {
        item_type: u32,
        version: u32,
        max: u32,
    },

    /// A requested write version cannot represent the data
    #[error("Version {requested} cannot represent this data, at least version {required} is needed")]
    VersionTooLow { requested: u32, required: u32 },

    /// Decoded telescope ID differs from the expected one
    #[error("Telescope mismatch: expected {expected}, found {found}")]
    TelescopeMismatch { expected: i32, found: i32 },

    /// A pixel list or range list that is out of range, unsorted, or inconsistent
    #[error("Implausible pixel list: {0}")]
    ImplausibleList(String),

    /// A decoded or supplied value outside its representable range
    #[error("Value {value} out of range for {what}")]
    ValueOutOfRange { what: &'static str, value: i64 },

    /// Item type does not match the codec
    #[error("Wrong item type: expected {expected}, found {found}")]
    WrongItemType { expected: u32, found: u32 },

    /// Top-level item does not start with the sync marker
    #[error("Sync marker not found, got {0:#010x}")]
    BadSync(u32),

    /// `begin_item`/`end_item` calls do not pair up
    #[error("Unbalanced item nesting: {0}")]
    UnbalancedItems(&'static str),

    /// Item body too long for the container length field
    #[error("Item length {0} does not fit the container length field")]
    ItemTooLarge(usize),
}

impl AdcError {
    /// Whether reading may continue with the next sibling item.
    ///
    /// Truncation and a lost sync marker leave no trustworthy stream position.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, AdcError::Truncated { .. } | AdcError::BadSync(_))
    }
}
