use thiserror::Error;

/// Error type returned by mecab-rs public APIs.
#[derive(Debug, Error)]
pub enum MecabError {
    /// Dynamic library could not be loaded.
    #[error("failed to load library: {0}")]
    LibraryLoad(String),
    /// Required symbol could not be resolved from the library.
    #[error("failed to load symbol: {0}")]
    SymbolLoad(String),
    /// Rust string contained an interior `NUL` byte for C interop.
    #[error("string contains NUL byte: {0}")]
    NulByte(#[from] std::ffi::NulError),
    /// Unrecognized option key, or an option value outside its accepted form.
    #[error("invalid configuration: {0}")]
    Configuration(String),
    /// `mecab_new2` returned a null tagger.
    #[error("failed to create tagger with options \"{options}\": {message}")]
    Construction {
        /// Option string passed to the native constructor.
        options: String,
        /// Message reported by `mecab_strerror`.
        message: String,
    },
    /// A parse call returned null, or the result chain broke its length contract.
    #[error("decoding error: {0}")]
    Decoding(String),
    /// User-provided arguments were invalid.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The tagger was already destroyed.
    #[error("tagger not initialized")]
    NotInitialized,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MecabError>;
