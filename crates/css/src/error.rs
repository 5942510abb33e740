use thiserror::Error;

/// Errors surfaced by the CSS parser and the style engine.
#[derive(Debug, Error)]
pub enum CssError {
    /// Low-level parse failure, produced by the tokenizer-facing code. The
    /// engine wraps these into `Syntax` with document context attached.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Malformed CSS, with the context the engine had at hand: the document
    /// or stylesheet URI, the attribute or property concerned, and the
    /// offending source text.
    #[error("syntax error at {uri} ({subject}): {message}: {source_text:?}")]
    Syntax {
        uri: String,
        subject: String,
        source_text: String,
        message: String,
    },

    /// An external resource load was refused by the security hook.
    #[error("security error: loading {url} from {document} refused")]
    Security { url: String, document: String },

    /// The stylesheet loader failed to produce the resource.
    #[error("resource error for {url}: {message}")]
    Resource { url: String, message: String },
}

impl CssError {
    pub fn parse(message: impl Into<String>) -> Self {
        CssError::Parse {
            message: message.into(),
        }
    }

    /// Attach document context to a parse-level error.
    pub fn into_syntax(self, uri: &str, subject: &str, source_text: &str) -> Self {
        match self {
            CssError::Parse { message } => CssError::Syntax {
                uri: uri.to_string(),
                subject: subject.to_string(),
                source_text: source_text.to_string(),
                message,
            },
            other => other,
        }
    }
}
