use std::fmt;

/// Errors raised while loading a simulation configuration.
#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Parse(e) => write!(f, "config parse error: {}", e),
            ConfigError::Invalid(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Parse(e) => Some(e),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err)
    }
}

/// Error type for pool, group and advance operations.
#[derive(Debug)]
pub enum PhysError {
    /// A batch request asked for more slots than the store holds. Nothing was allocated.
    CapacityExceeded { requested: usize, capacity: usize },
    /// Index outside the live/enabled range of a store or group.
    OutOfRange { index: usize, len: usize },
    /// Near-zero denominator in contact math. Only ever seen inside the narrowphase,
    /// which turns it into "no contact".
    DegenerateGeometry,
    /// Position or velocity went non-finite; the object has been force-terminated.
    InvalidNumericState { index: usize },
    Config(ConfigError),
}

impl fmt::Display for PhysError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhysError::CapacityExceeded { requested, capacity } => write!(
                f,
                "requested {} slots from a store of capacity {}",
                requested, capacity
            ),
            PhysError::OutOfRange { index, len } => {
                write!(f, "index {} out of range (len {})", index, len)
            }
            PhysError::DegenerateGeometry => write!(f, "degenerate contact geometry"),
            PhysError::InvalidNumericState { index } => {
                write!(f, "object {} has a non-finite position or velocity", index)
            }
            PhysError::Config(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for PhysError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PhysError::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for PhysError {
    fn from(err: ConfigError) -> Self {
        PhysError::Config(err)
    }
}

impl From<serde_json::Error> for PhysError {
    fn from(err: serde_json::Error) -> Self {
        PhysError::Config(ConfigError::Parse(err))
    }
}
