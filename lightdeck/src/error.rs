use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A local document is missing or malformed.
    #[error("failed to load {path}: {reason}")]
    ConfigLoad { path: String, reason: String },

    /// The named container service does not exist on the control plane.
    #[error("container service {0} is not found")]
    NotFound(String),

    /// Operator input that cannot be turned into a valid specification.
    #[error("{0}")]
    Validation(String),

    #[error("{action} failed: {message}")]
    Remote { action: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("operation cancelled")]
    Cancelled,

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn remote(action: &str, message: impl ToString) -> Self {
        Error::Remote {
            action: action.to_string(),
            message: message.to_string(),
        }
    }

    /// Innermost error underneath any number of context layers.
    #[cfg(test)]
    pub fn root(&self) -> &Error {
        match self {
            Error::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

pub trait ResultExt<T> {
    fn context<C: Into<String>>(self, context: C) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context<C: Into<String>>(self, context: C) -> Result<T> {
        self.map_err(|source| Error::Context {
            context: context.into(),
            source: Box::new(source),
        })
    }
}
