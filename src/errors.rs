use thiserror::Error;

/// Application-wide error type - single point of truth
#[derive(Error, Debug)]
pub enum AppError {
    /// Ticket registry storage
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// P2FMS transport codec
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Ticket construction/serialisation
    #[error("Ticket error: {0}")]
    Ticket(#[from] TicketError),

    /// Transaction funding/relay
    #[error("Submit error: {0}")]
    Submit(#[from] SubmitError),

    /// Database operations
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File I/O operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration issues
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation/parsing
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Errors from the P2FMS frame/chunk/script codec
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CodecError {
    /// Encode called with an empty payload
    #[error("Input data is empty")]
    EmptyPayload,

    /// Chunking produced no output scripts (unreachable for non-empty input, but checked)
    #[error("No fake multisig scripts produced from input data")]
    NoChunksProduced,

    /// No bare multisig outputs found in the transaction
    #[error("No data multisigs found in transaction")]
    NoEmbeddedData,

    /// Reassembled frame is shorter than the length+hash header
    #[error("Frame too short: {found} bytes, need at least 40")]
    FrameTooShort { found: usize },

    /// Declared payload length exceeds the bytes actually carried
    #[error("Length mismatch: declared {declared} bytes, only {available} available")]
    LengthMismatch { declared: u64, available: usize },

    /// Recomputed content hash does not match the frame header
    #[error("Content hash mismatch")]
    HashMismatch,
}

/// Errors from ticket registry lookups
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Stored bytes failed ticket deserialisation
    #[error("Corrupt record under key '{key}'")]
    CorruptRecord { key: String },

    /// The underlying key-value store failed
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[from] rusqlite::Error),
}

/// Errors from ticket construction and (de)serialisation
#[derive(Error, Debug)]
pub enum TicketError {
    /// Structural mismatch while decoding ticket bytes
    #[error("Malformed ticket: {0}")]
    MalformedTicket(String),

    /// Masternode-issued construction requires an active, registered masternode
    #[error(
        "This is not an active masternode. Only an active masternode can register its identity"
    )]
    NotAnActiveMasternode,

    /// Leading payload byte does not name a known ticket type
    #[error("Unknown ticket type tag: {0:#04x}")]
    UnknownTypeTag(u8),

    /// The signing collaborator refused to produce a ticket signature
    #[error("Ticket signing failed: {reason}")]
    SigningFailed { reason: String },
}

/// Errors from the ticket submission path
#[derive(Error, Debug)]
pub enum SubmitError {
    /// No single spendable output covers the required amount
    #[error(
        "No suitable unspent output found - cannot send data to the blockchain (required {required})"
    )]
    NoSuitableInput { required: bitcoin::Amount },

    /// The relay collaborator rejected the transaction
    #[error("Transaction rejected by relay ({code}): {reason}")]
    RelayRejected { code: i32, reason: String },

    /// The relay collaborator timed out
    #[error("Transaction relay timed out")]
    RelayTimeout,

    /// The funding input could not be signed
    #[error("Failed to sign funding input: {reason}")]
    SigningFailed { reason: String },

    /// Encoding the ticket payload failed
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Serialising the ticket failed
    #[error("Ticket error: {0}")]
    Ticket(#[from] TicketError),
}

/// Application-wide result type - single point of truth
pub type AppResult<T> = Result<T, AppError>;

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidData(format!("JSON error: {}", err))
    }
}
