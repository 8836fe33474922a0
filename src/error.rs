use std::fmt;

#[derive(Debug)]
pub enum AccessFixError {
    InvalidConfiguration(String),
    EmptyDocument,
    Io(std::io::Error),
}

impl fmt::Display for AccessFixError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessFixError::InvalidConfiguration(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            AccessFixError::EmptyDocument => write!(f, "document is empty"),
            AccessFixError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for AccessFixError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AccessFixError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for AccessFixError {
    fn from(value: std::io::Error) -> Self {
        AccessFixError::Io(value)
    }
}
