use super::{
    MailContext, MailMessage, MailTemplates, Mailer, DECOMMISSION_SUBJECT, RENEWAL_SUBJECT,
};
use crate::actions::DeliveryError;
use crate::search::Resource;
use crate::users::UserFetcher;
use std::sync::Arc;
use tracing::info;

/// Emails a resource's owner, resolving their address first.
pub struct OwnerMailer {
    users: Arc<dyn UserFetcher>,
    mailer: Arc<dyn Mailer>,
    templates: MailTemplates,
    spinup_url: String,
    spinup_site_url: String,
}

enum OwnerMail {
    Decommissioned,
    Renewed,
}

impl OwnerMailer {
    pub fn new(
        users: Arc<dyn UserFetcher>,
        mailer: Arc<dyn Mailer>,
        templates: MailTemplates,
        spinup_url: impl Into<String>,
        spinup_site_url: impl Into<String>,
    ) -> Self {
        Self {
            users,
            mailer,
            templates,
            spinup_url: spinup_url.into(),
            spinup_site_url: spinup_site_url.into(),
        }
    }

    pub fn templates(&self) -> &MailTemplates {
        &self.templates
    }

    pub async fn send_decommissioned(
        &self,
        resource: &Resource,
        expire_on: &str,
    ) -> Result<(), DeliveryError> {
        self.send(resource, expire_on, OwnerMail::Decommissioned).await
    }

    pub async fn send_renewed(
        &self,
        resource: &Resource,
        expire_on: &str,
    ) -> Result<(), DeliveryError> {
        self.send(resource, expire_on, OwnerMail::Renewed).await
    }

    async fn send(
        &self,
        resource: &Resource,
        expire_on: &str,
        kind: OwnerMail,
    ) -> Result<(), DeliveryError> {
        let owner = resource.owner();
        let user = self
            .users
            .fetch(owner)
            .await
            .map_err(|err| DeliveryError::Owner(err.to_string()))?;
        if user.email.is_empty() {
            return Err(DeliveryError::NoAddress(owner.to_string()));
        }

        let ctx = MailContext {
            first: user.first.clone(),
            netid: owner.to_string(),
            fqdn: resource.fqdn.clone(),
            expire_on: expire_on.to_string(),
            spinup_url: self.spinup_url.clone(),
            spinup_site_url: self.spinup_site_url.clone(),
        };
        let (subject, body) = match kind {
            OwnerMail::Decommissioned => (DECOMMISSION_SUBJECT, self.templates.decommission_body(&ctx)),
            OwnerMail::Renewed => (RENEWAL_SUBJECT, self.templates.renewal_body(&ctx)),
        };
        let html_body = body.map_err(|err| DeliveryError::Mail(err.to_string()))?;

        self.mailer
            .send(&MailMessage {
                to: user.email.clone(),
                subject: subject.to_string(),
                html_body,
            })
            .await
            .map_err(|err| DeliveryError::Mail(err.to_string()))?;

        info!("Sent '{}' for {} to {}", subject, resource.id, user.email);
        Ok(())
    }
}
