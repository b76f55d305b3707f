//! Error taxonomy for policy resolution, extraction, coercion and the binding tree.

/// Errors that can occur while scanning a document into a destination.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    #[error("'{0}' is not a valid extraction policy")]
    InvalidPolicy(String),

    #[error("unable to locate attr '{0}'")]
    AttributeNotFound(String),

    #[error("cannot parse '{input}' as {kind}: {reason}")]
    NumericParse {
        input: String,
        kind: &'static str,
        reason: String,
    },

    #[error("cannot parse '{input}' as a date: {source}")]
    DateParse {
        input: String,
        source: chrono::ParseError,
    },

    #[error("value of type '{0}' is not supported")]
    UnsupportedType(&'static str),

    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("the node is already constructed")]
    AlreadyConstructed,

    #[error("the node is not constructed")]
    NotConstructed,

    #[error("the node's destination was already split into its fields")]
    DestinationConsumed,

    #[error("error constructing field '{field}': {source}")]
    Construct {
        field: String,
        #[source]
        source: Box<ScanError>,
    },

    #[error("error parsing field '{field}': {source}")]
    Parse {
        field: String,
        #[source]
        source: Box<ScanError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Custom(Box<dyn std::error::Error + Send + Sync>),
}

impl ScanError {
    /// Wrap an arbitrary error raised by a user decode hook.
    pub fn custom<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Custom(err.into())
    }

    pub(crate) fn construct(field: &str, source: ScanError) -> Self {
        Self::Construct {
            field: field.to_string(),
            source: Box::new(source),
        }
    }

    pub(crate) fn parse(field: &str, source: ScanError) -> Self {
        Self::Parse {
            field: field.to_string(),
            source: Box::new(source),
        }
    }

    /// Field names the error crossed on its way up, outermost first.
    pub fn field_path(&self) -> Vec<&str> {
        let mut path = Vec::new();
        let mut current = self;
        while let Self::Construct { field, source } | Self::Parse { field, source } = current {
            path.push(field.as_str());
            current = &**source;
        }
        path
    }

    /// The innermost error, with every field wrapper peeled off.
    pub fn root_cause(&self) -> &ScanError {
        let mut current = self;
        while let Self::Construct { source, .. } | Self::Parse { source, .. } = current {
            current = &**source;
        }
        current
    }
}

/// Convenience result type.
pub type ScanResult<T> = Result<T, ScanError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn nested() -> ScanError {
        ScanError::parse(
            "Page",
            ScanError::parse(
                "categories",
                ScanError::parse("travel", ScanError::AttributeNotFound("href".into())),
            ),
        )
    }

    #[test]
    fn test_field_path_outermost_first() {
        assert_eq!(nested().field_path(), vec!["Page", "categories", "travel"]);
    }

    #[test]
    fn test_root_cause_peels_wrappers() {
        let err = nested();
        assert!(matches!(err.root_cause(), ScanError::AttributeNotFound(name) if name == "href"));
    }

    #[test]
    fn test_display_carries_path() {
        let msg = nested().to_string();
        assert!(msg.starts_with("error parsing field 'Page'"));
        assert!(msg.ends_with("unable to locate attr 'href'"));
    }

    #[test]
    fn test_unwrapped_error_has_empty_path() {
        let err = ScanError::NotConstructed;
        assert!(err.field_path().is_empty());
        assert!(matches!(err.root_cause(), ScanError::NotConstructed));
    }

    #[test]
    fn test_custom_keeps_message() {
        let err = ScanError::custom("hook refused input");
        assert_eq!(err.to_string(), "hook refused input");
    }
}
