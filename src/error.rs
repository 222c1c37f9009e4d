use crate::mvcc::Txid;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An iterator or guard method was called out of order.
    InvalidState(String),
    /// Commit or abort of a txid that is not in flight.
    InvalidTransaction(Txid),
    ColumnOutOfRange { index: usize, num_columns: usize },
    TypeMismatch(String),
    Projection(String),
    Corruption(String),
    ArenaExhausted { requested: usize, limit: usize },
    DuplicateDelta { row: u32, txid: Txid },
    InvalidSchema(String),
    Encoding(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            Error::InvalidTransaction(txid) => {
                write!(f, "Transaction {} is not in flight", txid)
            }
            Error::ColumnOutOfRange { index, num_columns } => write!(
                f,
                "Column index {} out of range ({} columns)",
                index, num_columns
            ),
            Error::TypeMismatch(msg) => write!(f, "Type mismatch: {}", msg),
            Error::Projection(msg) => write!(f, "Invalid projection: {}", msg),
            Error::Corruption(msg) => write!(f, "Corrupted change list: {}", msg),
            Error::ArenaExhausted { requested, limit } => write!(
                f,
                "Arena exhausted: cannot allocate {} bytes (limit {})",
                requested, limit
            ),
            Error::DuplicateDelta { row, txid } => {
                write!(f, "Delta for row {} at txid {} already exists", row, txid)
            }
            Error::InvalidSchema(msg) => write!(f, "Invalid schema: {}", msg),
            Error::Encoding(msg) => write!(f, "Encoding error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}
