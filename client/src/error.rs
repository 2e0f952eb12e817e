use anchor_client::ClientError;
use thiserror::Error;

/// Failure classes surfaced by the initialize surface. Everything the
/// platform raises that does not fit a class lands in `Platform` untouched;
/// nothing is retried here.
#[derive(Debug, Error)]
pub enum InitializeError {
    /// The target address already holds the account.
    #[error("state account already initialized")]
    AlreadyInitialized,

    /// The payer cannot cover the rent-exempt allocation.
    #[error("payer cannot cover account creation cost")]
    InsufficientFunds,

    /// The supplied address fails the canonical derivation.
    #[error("address fails canonical derivation")]
    InvalidAddress,

    /// The wallet file could not be read or parsed.
    #[error("wallet unavailable: {0}")]
    Wallet(String),

    /// Any other failure raised by the hosting platform.
    #[error("platform error: {0}")]
    Platform(#[from] ClientError),
}

impl InitializeError {
    /// Classify a platform failure into the taxonomy, keeping the original
    /// error when no class matches.
    pub fn classify(err: ClientError) -> Self {
        match classify_message(&err.to_string()) {
            Some(classified) => classified,
            None => InitializeError::Platform(err),
        }
    }
}

/// Match the runtime's failure text against the known classes. The system
/// program reports duplicate creation as "already in use" and underfunding
/// as "insufficient lamports"; Anchor reports a derivation mismatch as a
/// ConstraintSeeds violation (error 2006).
fn classify_message(message: &str) -> Option<InitializeError> {
    if message.contains("already in use") {
        return Some(InitializeError::AlreadyInitialized);
    }
    if message.contains("insufficient lamports") || message.contains("insufficient funds") {
        return Some(InitializeError::InsufficientFunds);
    }
    if message.contains("ConstraintSeeds")
        || message.contains("Error Number: 2006")
        || message.contains("Provided seeds do not result in a valid address")
    {
        return Some(InitializeError::InvalidAddress);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_creation_is_already_initialized() {
        let message = "Error processing Instruction 0: custom program error: 0x0; \
                       Allocate: account Address { address: 5K..., base: None } already in use";
        assert!(matches!(
            classify_message(message),
            Some(InitializeError::AlreadyInitialized)
        ));
    }

    #[test]
    fn underfunding_is_insufficient_funds() {
        let message = "Transfer: insufficient lamports 60000, need 1231920";
        assert!(matches!(
            classify_message(message),
            Some(InitializeError::InsufficientFunds)
        ));
    }

    #[test]
    fn seeds_violation_is_invalid_address() {
        let message = "Error Code: ConstraintSeeds. Error Number: 2006. \
                       Error Message: A seeds constraint was violated.";
        assert!(matches!(
            classify_message(message),
            Some(InitializeError::InvalidAddress)
        ));
    }

    #[test]
    fn unknown_failures_stay_unclassified() {
        assert!(classify_message("connection refused").is_none());
        assert!(classify_message("blockhash not found").is_none());
    }
}
