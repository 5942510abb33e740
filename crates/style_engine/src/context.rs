//! External hooks: resource security and stylesheet loading.

use css::CssError;
use url::Url;

/// Host environment the engine runs in. `@import` resolution asks the
/// security hook before fetching anything, then the loader for the bytes.
pub trait CssContext {
    /// Whether loading `url` on behalf of `document_url` is allowed.
    /// Errors propagate verbatim to the caller that triggered the load.
    fn check_load_external_resource(
        &self,
        url: &Url,
        document_url: Option<&Url>,
    ) -> Result<(), CssError>;

    /// Fetch the stylesheet text at `url`.
    fn load_style_sheet(&self, url: &Url) -> Result<String, CssError>;
}

/// Default context: every external load is refused.
#[derive(Debug, Default)]
pub struct DenyAllContext;

impl CssContext for DenyAllContext {
    fn check_load_external_resource(
        &self,
        url: &Url,
        document_url: Option<&Url>,
    ) -> Result<(), CssError> {
        Err(CssError::Security {
            url: url.to_string(),
            document: document_url.map_or_else(|| "about:blank".to_string(), Url::to_string),
        })
    }

    fn load_style_sheet(&self, url: &Url) -> Result<String, CssError> {
        Err(CssError::Resource {
            url: url.to_string(),
            message: "no stylesheet loader configured".to_string(),
        })
    }
}
