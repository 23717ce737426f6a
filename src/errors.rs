/// Restack error types
#[derive(Debug, thiserror::Error)]
pub enum RestackError {
    /// The git executable could not be spawned at all
    #[error("Git is not available: {0}")]
    GitUnavailable(String),

    /// A git subcommand exited with a nonzero status
    #[error("git {command} failed (exit {status}): {stderr}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },

    /// The installed git is too old for the engine's primitives
    #[error("Unsupported git version: {0}")]
    UnsupportedGit(String),

    /// A revision or branch name did not resolve to a commit
    #[error("Unknown ref: {0}")]
    UnknownRef(String),

    /// Branch management errors
    #[error("Branch error: {0}")]
    Branch(String),

    /// Rebase operation errors
    #[error("Rebase error: {0}")]
    Rebase(String),

    /// Push / fetch / remote errors
    #[error("Remote error: {0}")]
    Remote(String),

    /// Argument and state validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RestackError {
    pub fn branch<S: Into<String>>(msg: S) -> Self {
        RestackError::Branch(msg.into())
    }

    pub fn rebase<S: Into<String>>(msg: S) -> Self {
        RestackError::Rebase(msg.into())
    }

    pub fn remote<S: Into<String>>(msg: S) -> Self {
        RestackError::Remote(msg.into())
    }

    pub fn validation<S: Into<String>>(msg: S) -> Self {
        RestackError::Validation(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, RestackError>;
