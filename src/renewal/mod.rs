//! Renewal links and the renewal flow behind them.

mod service;
mod token;

pub use service::{Renewal, RenewalError, RenewalService};
pub use token::{check_token, generate_token, issue_token, validate_token, TokenError};

/// `{base_url}/renew/{id}?token={token}`
pub fn renewal_link(base_url: &str, id: &str, token: &str) -> String {
    format!(
        "{}/renew/{}?token={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(id),
        urlencoding::encode(token)
    )
}
