//! Error types for AgentCredit
//!
//! The taxonomy is a closed enum matched structurally - never by message
//! text. All amounts in error payloads are exact minor units.

use thiserror::Error;

/// Result type for AgentCredit operations
pub type Result<T> = std::result::Result<T, CreditError>;

/// AgentCredit error types
#[derive(Debug, Clone, Error)]
pub enum CreditError {
    // ========================================================================
    // Amount Errors
    // ========================================================================

    /// Amount overflow during arithmetic
    #[error("Amount overflow during arithmetic operation")]
    AmountOverflow,

    /// Invalid amount (non-positive, or out-of-range percentage/days)
    #[error("Invalid amount for {field}: {reason}")]
    InvalidAmount { field: String, reason: String },

    /// Invalid input that is not an amount
    #[error("Invalid input: {field} - {reason}")]
    InvalidInput { field: String, reason: String },

    // ========================================================================
    // Wallet Errors
    // ========================================================================

    /// Wallet not found
    #[error("Wallet {wallet_id} not found")]
    WalletNotFound { wallet_id: String },

    /// Agent already owns a wallet
    #[error("Agent {agent_id} already owns wallet {wallet_id}")]
    WalletExists { agent_id: String, wallet_id: String },

    /// Available balance too low for the requested debit
    #[error("Insufficient funds in wallet {wallet_id}: requested {requested}, available {available}")]
    InsufficientFunds {
        wallet_id: String,
        requested: i128,
        available: i128,
    },

    // ========================================================================
    // Lien Errors
    // ========================================================================

    /// Lien not found
    #[error("Lien {lien_id} not found")]
    LienNotFound { lien_id: String },

    /// Lien already settled
    #[error("Lien {lien_id} was already settled")]
    LienAlreadySettled { lien_id: String },

    // ========================================================================
    // Escrow Errors
    // ========================================================================

    /// Escrow not found
    #[error("Escrow {escrow_id} not found")]
    EscrowNotFound { escrow_id: String },

    /// Escrow already released or cancelled
    #[error("Escrow {escrow_id} has already been released")]
    EscrowAlreadyReleased { escrow_id: String },

    /// Release amount exceeds what remains in the escrow
    #[error("Escrow {escrow_id} holds {remaining}, cannot release {requested}")]
    EscrowAmountExceeded {
        escrow_id: String,
        requested: i128,
        remaining: i128,
    },

    // ========================================================================
    // Royalty Errors
    // ========================================================================

    /// Royalty agreement not found
    #[error("Royalty agreement {agreement_id} not found")]
    AgreementNotFound { agreement_id: String },

    /// Aggregate royalty obligations exceed the source's available balance
    #[error("Insufficient funds for royalties from wallet {wallet_id}: required {required}, available {available}")]
    InsufficientFundsForRoyalties {
        wallet_id: String,
        required: i128,
        available: i128,
    },

    // ========================================================================
    // Bond Errors
    // ========================================================================

    /// Bond not found
    #[error("Bond {bond_id} not found")]
    BondNotFound { bond_id: String },

    /// Bond already has a holder
    #[error("Bond {bond_id} has already been purchased")]
    BondAlreadyPurchased { bond_id: String },

    /// Bond is already in a terminal state
    #[error("Bond {bond_id} is already {status}")]
    BondAlreadyMatured { bond_id: String, status: String },

    /// Maturity date has not been reached
    #[error("Bond {bond_id} does not mature until {maturity_date}")]
    BondNotMatured {
        bond_id: String,
        maturity_date: String,
    },

    /// Bond has no holder to pay
    #[error("Bond {bond_id} has no holder")]
    BondNotHeld { bond_id: String },

    /// Issuer cannot buy their own bond
    #[error("Wallet {wallet_id} cannot purchase its own bond {bond_id}")]
    SelfPurchase { bond_id: String, wallet_id: String },

    /// Issuer could not pay face value at maturity
    #[error("Bond {bond_id} defaulted: issuer {issuer_wallet} could not pay {face_value}")]
    BondDefaulted {
        bond_id: String,
        issuer_wallet: String,
        face_value: i128,
    },

    // ========================================================================
    // Integrity Errors
    // ========================================================================

    /// A stored wallet field disagrees with its recomputed value
    #[error("Integrity violation on wallet {wallet_id}: {field} stored {stored}, expected {expected}")]
    SystemIntegrityViolation {
        wallet_id: String,
        field: String,
        stored: i128,
        expected: i128,
    },
}

impl CreditError {
    /// Create an invalid amount error
    pub fn invalid_amount(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAmount {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Get an error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AmountOverflow => "AMOUNT_OVERFLOW",
            Self::InvalidAmount { .. } => "INVALID_AMOUNT",
            Self::InvalidInput { .. } => "INVALID_INPUT",
            Self::WalletNotFound { .. } => "WALLET_NOT_FOUND",
            Self::WalletExists { .. } => "WALLET_EXISTS",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::LienNotFound { .. } => "LIEN_NOT_FOUND",
            Self::LienAlreadySettled { .. } => "LIEN_ALREADY_SETTLED",
            Self::EscrowNotFound { .. } => "ESCROW_NOT_FOUND",
            Self::EscrowAlreadyReleased { .. } => "ESCROW_ALREADY_RELEASED",
            Self::EscrowAmountExceeded { .. } => "ESCROW_AMOUNT_EXCEEDED",
            Self::AgreementNotFound { .. } => "AGREEMENT_NOT_FOUND",
            Self::InsufficientFundsForRoyalties { .. } => "INSUFFICIENT_FUNDS_FOR_ROYALTIES",
            Self::BondNotFound { .. } => "BOND_NOT_FOUND",
            Self::BondAlreadyPurchased { .. } => "BOND_ALREADY_PURCHASED",
            Self::BondAlreadyMatured { .. } => "BOND_ALREADY_MATURED",
            Self::BondNotMatured { .. } => "BOND_NOT_MATURED",
            Self::BondNotHeld { .. } => "BOND_NOT_HELD",
            Self::SelfPurchase { .. } => "SELF_PURCHASE",
            Self::BondDefaulted { .. } => "BOND_DEFAULTED",
            Self::SystemIntegrityViolation { .. } => "SYSTEM_INTEGRITY_VIOLATION",
        }
    }
}
