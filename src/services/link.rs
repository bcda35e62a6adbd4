use std::sync::Arc;

use nanoid::nanoid;
use tracing::instrument;

use crate::errors::LinkError;
use crate::models::link::{Answer, LinkRecord};
use crate::services::notification::{NotificationSender, compose_notification};
use crate::store::{AnswerOutcome, LinkStore};

/// Placeholder requester used when dev mode fabricates responses.
const BYPASS_EMAIL: &str = "dev@example.com";

#[derive(Clone)]
pub struct LinkService {
    store: Arc<dyn LinkStore>,
    mailer: Arc<dyn NotificationSender>,
    base_url: String,
    dev_mode: bool,
}

#[derive(Debug)]
pub struct CreatedLink {
    pub id: String,
    pub url: String,
    pub bypass: bool,
}

#[derive(Debug)]
pub struct RespondReceipt {
    pub bypass: bool,
}

fn is_valid_email(email: &str) -> bool {
    !email.is_empty() && email.contains('@')
}

fn normalize_name(name: Option<&str>) -> Option<String> {
    name.map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
}

impl LinkService {
    pub fn new(
        store: Arc<dyn LinkStore>,
        mailer: Arc<dyn NotificationSender>,
        base_url: String,
        dev_mode: bool,
    ) -> Self {
        Self {
            store,
            mailer,
            base_url,
            dev_mode,
        }
    }

    fn share_url(&self, id: &str) -> String {
        format!("{}/ask/{}", self.base_url.trim_end_matches('/'), id)
    }

    #[instrument(name = "Service: Create link", skip(self, email, name))]
    pub async fn create(
        &self,
        email: Option<&str>,
        name: Option<&str>,
    ) -> Result<CreatedLink, LinkError> {
        if self.dev_mode {
            let id = nanoid!();
            tracing::info!(%id, email = BYPASS_EMAIL, "Dev mode: skipping validation and storage");
            return Ok(CreatedLink {
                url: self.share_url(&id),
                id,
                bypass: true,
            });
        }

        let email = match email {
            Some(email) if is_valid_email(email) => email.to_string(),
            _ => return Err(LinkError::InvalidEmail),
        };
        let name = normalize_name(name);

        let id = nanoid!();
        let record = LinkRecord::pending(email, name);
        self.store
            .put(&id, &record)
            .await
            .map_err(LinkError::CreateFailed)?;

        tracing::info!(%id, "Created link");
        Ok(CreatedLink {
            url: self.share_url(&id),
            id,
            bypass: false,
        })
    }

    #[instrument(name = "Service: Check link", skip(self))]
    pub async fn read(&self, id: &str) -> Result<LinkRecord, LinkError> {
        if id.trim().is_empty() {
            return Err(LinkError::MissingId);
        }

        if self.dev_mode {
            return Ok(LinkRecord::pending(BYPASS_EMAIL.to_string(), None));
        }

        self.store
            .get(id)
            .await
            .map_err(LinkError::CheckFailed)?
            .ok_or(LinkError::NotFound)
    }

    #[instrument(name = "Service: Respond", skip(self))]
    pub async fn respond(&self, id: &str, answer: Answer) -> Result<RespondReceipt, LinkError> {
        if id.trim().is_empty() {
            return Err(LinkError::MissingId);
        }

        if self.dev_mode {
            tracing::info!(%id, answer = answer.as_str(), "Dev mode: skipping storage and email");
            return Ok(RespondReceipt { bypass: true });
        }

        // email and name never change after creation, so this read stays
        // valid while the scripted update below arbitrates the status race.
        let record = self
            .store
            .get(id)
            .await
            .map_err(LinkError::RespondFailed)?
            .ok_or(LinkError::NotFound)?;

        match self
            .store
            .answer(id, answer)
            .await
            .map_err(LinkError::RespondFailed)?
        {
            AnswerOutcome::Applied => {}
            AnswerOutcome::Missing => return Err(LinkError::NotFound),
            AnswerOutcome::AlreadyAnswered => return Err(LinkError::AlreadyAnswered),
        }

        // The transition above is already durable. The notification is
        // best-effort: log the failure and report success regardless.
        let notification = compose_notification(answer, record.name.as_deref());
        if let Err(e) = self
            .mailer
            .send(&record.email, &notification.subject, &notification.html_body)
            .await
        {
            tracing::error!("Failed to send notification email: {:?}", e);
        }

        Ok(RespondReceipt { bypass: false })
    }
}
