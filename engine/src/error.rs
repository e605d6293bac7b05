use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Mutually exclusive or out-of-range settings.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    ReentrantBuild(#[from] storage::ReentrantBuild),

    /// The source trie was requested before `finalize_trie`.
    #[error("source trie has not been built yet")]
    NotFinalized,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
