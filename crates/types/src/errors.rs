use anchor_lang::prelude::Pubkey;
use thiserror::Error;

// ============================================================================
// Main Error Enum
// ============================================================================

/// Error taxonomy shared by the Dexloan client crates
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DexloanError {
    // ========================================================================
    // Identity Errors
    // ========================================================================

    /// No signing identity is connected
    #[error("Wallet not connected")]
    NotReady,

    // ========================================================================
    // Read Errors
    // ========================================================================

    /// The address derived fine but no record lives there
    #[error("Account not found: {address}")]
    NotFound { address: Pubkey },

    /// Retried reads were exhausted before the record became visible
    #[error("Account {address} not visible after {attempts} attempts")]
    StaleRead { address: Pubkey, attempts: u32 },

    /// RPC communication error
    #[error("RPC error: {message}")]
    Rpc { message: String },

    /// Account data could not be decoded
    #[error("Failed to deserialize {account_type}: {reason}")]
    Deserialization { account_type: String, reason: String },

    /// Data could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Metadata account or file could not be resolved
    #[error("Metadata error for {subject}: {reason}")]
    Metadata { subject: String, reason: String },

    // ========================================================================
    // Derivation and Math Errors
    // ========================================================================

    /// No bump produced an off-curve address
    #[error("Address derivation exhausted for {kind}")]
    DerivationExhausted { kind: String },

    /// Fixed-point arithmetic left the representable range
    #[error("Numerical overflow in '{operation}' with values: {values:?}")]
    NumericalOverflow { operation: String, values: Vec<String> },

    // ========================================================================
    // Lifecycle and Write Errors
    // ========================================================================

    /// Entity is not in a state that permits the transition
    #[error("Invalid state for {entity}: expected {expected}, found {actual}")]
    InvalidState {
        entity: String,
        expected: String,
        actual: String,
    },

    /// The authoritative write was rejected or failed to confirm
    #[error("Transaction failed: {reason}")]
    SubmissionFailed {
        reason: String,
        signature: Option<String>,
    },

    // ========================================================================
    // Validation Errors
    // ========================================================================

    /// Invalid parameter
    #[error("Invalid parameter '{parameter}': got '{value}', expected '{expected}'")]
    InvalidParameter {
        parameter: String,
        value: String,
        expected: String,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl DexloanError {
    /// Create a numerical overflow error with context
    pub fn numerical_overflow(operation: &str, values: &[&str]) -> Self {
        Self::NumericalOverflow {
            operation: operation.to_string(),
            values: values.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: &str, value: &str, expected: &str) -> Self {
        Self::InvalidParameter {
            parameter: parameter.to_string(),
            value: value.to_string(),
            expected: expected.to_string(),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state(entity: &str, expected: &str, actual: &str) -> Self {
        Self::InvalidState {
            entity: entity.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create an RPC error
    pub fn rpc(message: impl Into<String>) -> Self {
        Self::Rpc {
            message: message.into(),
        }
    }

    /// Create a deserialization error
    pub fn deserialization(account_type: &str, reason: impl ToString) -> Self {
        Self::Deserialization {
            account_type: account_type.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a submission failure without a signature
    pub fn submission_failed(reason: impl Into<String>) -> Self {
        Self::SubmissionFailed {
            reason: reason.into(),
            signature: None,
        }
    }

    /// Transient read failures worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Rpc { .. })
    }

    /// One line suitable for a user-facing notification
    pub fn user_message(&self) -> String {
        match self {
            Self::NotReady => "Please connect your wallet to continue".to_string(),
            Self::StaleRead { .. } => {
                "The network has not caught up yet, please try again shortly".to_string()
            }
            Self::DerivationExhausted { .. } => {
                "Could not derive an account address (configuration error)".to_string()
            }
            other => format!("Error: {}", other),
        }
    }
}

// ============================================================================
// Program Error Codes
// ============================================================================

/// Custom error codes returned by the listings program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramErrorCode {
    NotOverdue,
    InvalidExpiry,
    InvalidState,
    InvalidListingType,
    OptionExpired,
    InvalidMint,
    MetadataDoesntExist,
    DerivedKeyInvalid,
    OptionNotExpired,
    NumericalOverflow,
}

impl ProgramErrorCode {
    /// First custom code emitted by anchor programs
    pub const OFFSET: u32 = 6000;

    pub fn from_code(code: u32) -> Option<Self> {
        let code = match code.checked_sub(Self::OFFSET)? {
            0 => Self::NotOverdue,
            1 => Self::InvalidExpiry,
            2 => Self::InvalidState,
            3 => Self::InvalidListingType,
            4 => Self::OptionExpired,
            5 => Self::InvalidMint,
            6 => Self::MetadataDoesntExist,
            7 => Self::DerivedKeyInvalid,
            8 => Self::OptionNotExpired,
            9 => Self::NumericalOverflow,
            _ => return None,
        };
        Some(code)
    }

    pub fn code(self) -> u32 {
        Self::OFFSET + self as u32
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::NotOverdue => "This loan is not overdue",
            Self::InvalidExpiry => "Invalid expiry",
            Self::InvalidState => "Invalid state",
            Self::InvalidListingType => "Invalid listing type",
            Self::OptionExpired => "Option expired",
            Self::InvalidMint => "Invalid mint",
            Self::MetadataDoesntExist => "Metadata doesnt exist",
            Self::DerivedKeyInvalid => "Derived key invalid",
            Self::OptionNotExpired => "Option not expired",
            Self::NumericalOverflow => "NumericalOverflow",
        }
    }

    /// Map a rejected submission onto the client error taxonomy
    pub fn into_error(self, signature: Option<String>) -> DexloanError {
        match self {
            Self::InvalidState => {
                DexloanError::invalid_state("ledger record", "valid transition", self.message())
            }
            Self::NumericalOverflow => {
                DexloanError::numerical_overflow("ledger program arithmetic", &[])
            }
            other => DexloanError::SubmissionFailed {
                reason: format!("{} (code {})", other.message(), other.code()),
                signature,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_error_codes() {
        assert_eq!(ProgramErrorCode::from_code(6002), Some(ProgramErrorCode::InvalidState));
        assert_eq!(ProgramErrorCode::from_code(6009), Some(ProgramErrorCode::NumericalOverflow));
        assert_eq!(ProgramErrorCode::from_code(5999), None);
        assert_eq!(ProgramErrorCode::from_code(6010), None);
        assert_eq!(ProgramErrorCode::OptionExpired.code(), 6004);
    }

    #[test]
    fn test_invalid_state_maps_from_program() {
        let err = ProgramErrorCode::InvalidState.into_error(None);
        assert!(matches!(err, DexloanError::InvalidState { .. }));

        let err = ProgramErrorCode::NotOverdue.into_error(Some("sig".to_string()));
        match err {
            DexloanError::SubmissionFailed { reason, signature } => {
                assert!(reason.contains("not overdue"));
                assert_eq!(signature.as_deref(), Some("sig"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_retryable_classification() {
        assert!(DexloanError::rpc("timeout").is_retryable());
        assert!(!DexloanError::NotReady.is_retryable());
        assert!(!DexloanError::NotFound { address: Pubkey::default() }.is_retryable());
        assert!(!DexloanError::numerical_overflow("mul", &["1"]).is_retryable());
    }

    #[test]
    fn test_user_message_is_single_line() {
        let errors = [
            DexloanError::NotReady,
            DexloanError::submission_failed("blockhash expired"),
            DexloanError::StaleRead { address: Pubkey::default(), attempts: 3 },
        ];
        for err in errors {
            let message = err.user_message();
            assert!(!message.is_empty());
            assert!(!message.contains('\n'));
        }
    }
}
