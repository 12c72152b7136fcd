/// Result alias that carries the custom [`FumenError`] type.
pub type Result<T> = std::result::Result<T, FumenError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum FumenError {
    /// A coordinate was built from a fine component outside `[0, radix)`.
    #[error("invalid {axis} coordinate (unit {unit}, grid {grid}): grid must lie in [0, {radix})")]
    InvalidCoordinate {
        axis: &'static str,
        unit: i64,
        grid: i64,
        radix: i64,
    },
    /// A coordinate whose unit is too large to project onto a grid count.
    #[error("{axis} coordinate unit {unit} is outside [-{max}, {max}]")]
    CoordinateOutOfRange {
        axis: &'static str,
        unit: i64,
        max: i64,
    },
    /// Tempo values must be positive and finite.
    #[error("invalid tempo {0} BPM")]
    InvalidTempo(f64),
    /// Meters need a non-zero numerator and denominator.
    #[error("invalid meter {numerator}/{denominator}")]
    InvalidMeter { numerator: u32, denominator: u32 },
    /// A breakpoint map was used before its origin sentinel was installed.
    #[error("{0} map has no origin sentinel; call Fumen::setup first")]
    MissingSentinel(&'static str),
    /// Caller supplied an argument outside the accepted domain.
    #[error("{0}")]
    InvalidInput(&'static str),
    /// A shared document lock was poisoned by a panicking writer.
    #[error("{0} has been poisoned")]
    Poisoned(&'static str),
    /// Free-form error message.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Wrapper around JSON (de)serialization errors.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl FumenError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for FumenError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for FumenError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
