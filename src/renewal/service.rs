use super::token::{check_token, TokenError};
use crate::actions::{DeliveryError, TagError, Tagger};
use crate::config::AppConfig;
use crate::email::{MailError, OwnerMailer};
use crate::lifecycle::{format_timestamp, parse_timestamp, Clock, Collaborators, Schedule};
use crate::reporting::ReporterSet;
use crate::search::{QueryError, Resource, ResourceFinder, RENEWED_AT_TAG};
use crate::server::metrics;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

lazy_static! {
    static ref RESOURCE_ID: Regex =
        Regex::new(r"^[A-Za-z0-9-]+$").expect("Invalid resource id regex");
}

#[derive(Debug, Error)]
pub enum RenewalError {
    #[error("invalid resource id '{0}'")]
    InvalidId(String),

    #[error("token parameter is missing or of bad format")]
    MissingToken,

    #[error("Failed getting details about resource: {0}")]
    Lookup(#[source] QueryError),

    #[error("resource {0} has no org")]
    NoOrg(String),

    #[error("invalid renewal token: {0}")]
    InvalidToken(#[source] TokenError),

    #[error("Unable to process renewal: {0}")]
    Tag(#[source] TagError),
}

impl RenewalError {
    /// Label used for the renewals metric.
    pub fn label(&self) -> &'static str {
        match self {
            RenewalError::InvalidId(_) => "bad_request",
            RenewalError::MissingToken | RenewalError::InvalidToken(_) => "forbidden",
            RenewalError::Lookup(_) | RenewalError::NoOrg(_) => "lookup_failed",
            RenewalError::Tag(_) => "tag_failed",
        }
    }
}

/// A successful renewal. `resource.renewed_at` already holds the new value.
#[derive(Debug, Clone)]
pub struct Renewal {
    pub resource: Resource,
    pub previous_renewed_at: String,
}

pub struct RenewalService {
    finder: Arc<dyn ResourceFinder>,
    tagger: Arc<dyn Tagger>,
    owner_mail: Arc<OwnerMailer>,
    reporters: ReporterSet,
    clock: Arc<dyn Clock>,
    schedule: Schedule,
    secret: String,
    redirect_url: String,
}

impl RenewalService {
    pub fn new(config: &AppConfig, collaborators: &Collaborators) -> Self {
        Self {
            finder: collaborators.finder.clone(),
            tagger: collaborators.tagger.clone(),
            owner_mail: collaborators.owner_mail.clone(),
            reporters: collaborators.reporters.clone(),
            clock: collaborators.clock.clone(),
            schedule: Schedule::new(
                config.notify.ages.clone(),
                config.decommission.age.clone(),
                config.destroy.age.clone(),
            ),
            secret: config.encryption_secret.clone(),
            redirect_url: config.redirect_url.clone(),
        }
    }

    /// Renew resource `id` if `tokens` holds exactly one valid token.
    pub async fn renew(&self, id: &str, tokens: &[String]) -> Result<Renewal, RenewalError> {
        let result = self.try_renew(id, tokens).await;
        metrics::record_renewal(match &result {
            Ok(_) => "renewed",
            Err(err) => err.label(),
        });
        result
    }

    async fn try_renew(&self, id: &str, tokens: &[String]) -> Result<Renewal, RenewalError> {
        if !RESOURCE_ID.is_match(id) {
            return Err(RenewalError::InvalidId(id.to_string()));
        }
        let [token] = tokens else {
            warn!(
                "Token parameter is missing or of bad format for renewal of {} ({} given)",
                id,
                tokens.len()
            );
            return Err(RenewalError::MissingToken);
        };

        let mut resource = self.finder.get(id).await.map_err(|err| {
            error!("Couldn't get the {} resource from the search backend, {}", id, err);
            RenewalError::Lookup(err)
        })?;
        if resource.org.is_empty() {
            error!("Cannot renew {}, it has no org", id);
            return Err(RenewalError::NoOrg(id.to_string()));
        }

        check_token(token, &resource.renewed_at, &self.secret)
            .await
            .map_err(|err| {
                warn!("Failed to validate renewal token for {}: {}", id, err);
                RenewalError::InvalidToken(err)
            })?;

        let renewed_at = format_timestamp(self.clock.now());
        let tags = BTreeMap::from([(RENEWED_AT_TAG.to_string(), renewed_at.clone())]);
        self.tagger.tag(&resource, &tags).await.map_err(|err| {
            error!("Failed to renew resource {}, {}", id, err);
            RenewalError::Tag(err)
        })?;

        let message = format!(
            "Renewed {} ({}) created by {}",
            resource.fqdn,
            id,
            resource.owner()
        );
        info!("{}", message);
        self.reporters.info(&message).await;

        let previous_renewed_at = std::mem::replace(&mut resource.renewed_at, renewed_at);
        Ok(Renewal {
            resource,
            previous_renewed_at,
        })
    }

    /// HTML page redirecting the owner back to the portal.
    pub fn renewal_page(&self) -> Result<String, MailError> {
        self.owner_mail.templates().renewal_page(&self.redirect_url)
    }

    pub fn redirect_url(&self) -> &str {
        &self.redirect_url
    }

    /// Tell the owner when the renewed resource now expires.
    pub async fn send_confirmation(&self, renewal: &Renewal) -> Result<(), DeliveryError> {
        let resource = &renewal.resource;
        let expire_on = parse_timestamp(&resource.renewed_at)
            .and_then(|renewed_at| self.schedule.decommission_at(renewed_at))
            .map_err(|err| DeliveryError::Mail(err.to_string()))?;
        self.owner_mail
            .send_renewed(resource, &format_timestamp(expire_on))
            .await
    }
}
