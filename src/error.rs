//! Error handling for Rackplay
//!
//! Every error carries a stable code and recovery suggestions so the UI
//! layer can show something useful without matching on variants.

use thiserror::Error;

/// Result type alias for Rackplay operations
pub type Result<T> = std::result::Result<T, RackError>;

/// Main error type for Rackplay operations
#[derive(Error, Debug)]
pub enum RackError {
    // Decode Errors
    #[error("File not found: {path}")]
    FileNotFound {
        path: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Invalid audio file: {reason}")]
    InvalidAudio {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Audio contains no samples")]
    EmptyAudio,

    // Host Errors
    #[error("Real-time audio is unavailable: {reason}")]
    HostUnavailable { reason: String },

    #[error("Audio host call failed: {reason}")]
    Host { reason: String },

    // Parameter Errors
    #[error("Unknown parameter: {field} on {target}")]
    UnknownParameter { target: String, field: String },

    #[error("EQ band {index} does not exist (bands: {count})")]
    InvalidBand { index: usize, count: usize },

    #[error("Invalid value for {param}: {value} (expected {expected})")]
    InvalidParameterValue {
        param: String,
        value: String,
        expected: String,
    },

    // Configuration Errors
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RackError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            RackError::FileNotFound { .. } => "FILE_NOT_FOUND",
            RackError::InvalidAudio { .. } => "INVALID_AUDIO",
            RackError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            RackError::EmptyAudio => "EMPTY_AUDIO",
            RackError::HostUnavailable { .. } => "HOST_UNAVAILABLE",
            RackError::Host { .. } => "HOST_ERROR",
            RackError::UnknownParameter { .. } => "UNKNOWN_PARAMETER",
            RackError::InvalidBand { .. } => "INVALID_BAND",
            RackError::InvalidParameterValue { .. } => "INVALID_PARAMETER_VALUE",
            RackError::Config { .. } => "CONFIG_ERROR",
            RackError::Io(_) => "IO_ERROR",
            RackError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// True for failures of the decode step (bytes are not playable audio)
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            RackError::InvalidAudio { .. }
                | RackError::UnsupportedFormat { .. }
                | RackError::EmptyAudio
        )
    }

    /// Check if this error is recoverable
    ///
    /// Host unavailability is the only fatal condition: the engine stays
    /// uninitialized and there is nothing the user can retry.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, RackError::HostUnavailable { .. })
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            RackError::FileNotFound { .. } => vec![
                "Check the file path is correct",
                "Verify the file hasn't been moved or deleted",
            ],
            RackError::InvalidAudio { .. } | RackError::EmptyAudio => vec![
                "Check if the file plays in another application",
                "The file may be corrupted - try re-exporting from source",
                "Select a different file",
            ],
            RackError::UnsupportedFormat { .. } => vec![
                "Convert to a mono or stereo WAV file",
                "Supported encodings: 8/16/24/32-bit PCM, 32-bit float",
            ],
            RackError::HostUnavailable { .. } => vec![
                "This platform does not offer real-time audio output",
                "Check that an output device is connected and not in exclusive use",
            ],
            RackError::Host { .. } => vec![
                "Stop playback and press play again",
                "Restart the audio engine if the problem persists",
            ],
            _ => vec![],
        }
    }

    /// Get a user-friendly message for this error
    pub fn friendly_message(&self) -> String {
        match self {
            RackError::FileNotFound { path, .. } => {
                format!("I couldn't find the file at '{}'.", path)
            }
            RackError::InvalidAudio { .. } | RackError::EmptyAudio => {
                "This file doesn't appear to be playable audio. Please pick another file."
                    .to_string()
            }
            RackError::UnsupportedFormat { format } => {
                format!("'{}' isn't supported yet. Try a mono or stereo WAV file.", format)
            }
            RackError::HostUnavailable { .. } => {
                "Audio playback isn't available on this device.".to_string()
            }
            _ => self.to_string(),
        }
    }
}
