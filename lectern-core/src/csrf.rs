//! Anti-forgery token lookup

use serde::{Deserialize, Serialize};

use crate::config::CsrfConfig;
use crate::error::{LecternError, Result};
use crate::page::Page;

/// Where a token was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenSource {
    Cookie,
    Meta,
    HiddenField,
}

/// A resolved token together with the header it must be sent in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfToken {
    pub header: String,
    pub value: String,
    pub source: TokenSource,
}

/// Find the page's anti-forgery token.
///
/// Sources are tried in order: cookie, meta tag, hidden form field. Empty
/// values are skipped. When nothing is found the result is an error if the
/// deployment requires a token and `Ok(None)` otherwise.
pub fn resolve_token(page: &dyn Page, config: &CsrfConfig) -> Result<Option<CsrfToken>> {
    let found = non_empty(page.cookie(&config.cookie_name))
        .map(|value| (value, TokenSource::Cookie))
        .or_else(|| non_empty(page.meta(&config.meta_name)).map(|value| (value, TokenSource::Meta)))
        .or_else(|| {
            non_empty(
                page.query(&config.field_selector())
                    .map(|field| field.value()),
            )
            .map(|value| (value, TokenSource::HiddenField))
        });

    match found {
        Some((value, source)) => {
            tracing::trace!(?source, "resolved anti-forgery token");
            Ok(Some(CsrfToken {
                header: config.header_name.clone(),
                value,
                source,
            }))
        }
        None if config.required => Err(LecternError::MissingCsrfToken {
            cookie: config.cookie_name.clone(),
            meta: config.meta_name.clone(),
            field: config.field_name.clone(),
        }),
        None => Ok(None),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
