//! Append-only mailbox shared by clients (submissions) and legal staff
//! (responses). Newest record first.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::{LexflowError, Result};
use crate::models::{Message, Payload, Response, Role, Submission};
use crate::storage::{slots, Storage};

#[derive(Clone)]
pub struct Mailbox {
    storage: Storage,
}

impl Mailbox {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Whole mailbox in stored order.
    pub fn messages(&self) -> Vec<Message> {
        self.storage.load(slots::MAILBOX)
    }

    /// Store a filled form. The payload is taken as-is; checking it against
    /// the form is the caller's job (see `FormDefinition::fill`).
    pub fn submit(
        &self,
        form_id: &str,
        form_name: &str,
        from: &str,
        from_display: &str,
        payload: Payload,
    ) -> Result<Submission> {
        let submission = Submission {
            id: Uuid::new_v4().to_string(),
            from: from.to_string(),
            from_display: from_display.to_string(),
            to: Role::Legal,
            form_id: form_id.to_string(),
            form_name: form_name.to_string(),
            payload,
            created_at: Utc::now(),
        };
        self.prepend(Message::Submission(submission.clone()))?;
        info!(id = %submission.id, from, form_id, "submission sent");
        Ok(submission)
    }

    pub fn reply(
        &self,
        submission_id: &str,
        body: &str,
        to_user: &str,
        to_display: &str,
        form_name: &str,
    ) -> Result<Response> {
        let body = body.trim();
        if body.is_empty() {
            return Err(LexflowError::invalid("body", "reply must not be empty"));
        }
        let mut messages = self.messages();
        if !messages
            .iter()
            .any(|m| m.as_submission().is_some_and(|s| s.id == submission_id))
        {
            return Err(LexflowError::not_found("submission", submission_id));
        }
        let response = Response {
            id: Uuid::new_v4().to_string(),
            to_user: to_user.to_string(),
            to_display: to_display.to_string(),
            body: body.to_string(),
            in_reply_to: submission_id.to_string(),
            form_name: form_name.to_string(),
            created_at: Utc::now(),
        };
        messages.insert(0, Message::Response(response.clone()));
        self.storage.save(slots::MAILBOX, &messages)?;
        info!(id = %response.id, in_reply_to = submission_id, to_user, "response sent");
        Ok(response)
    }

    /// Reply addressed to the submission's sender, with the form name copied over.
    pub fn reply_to(&self, submission: &Submission, body: &str) -> Result<Response> {
        self.reply(
            &submission.id,
            body,
            &submission.from,
            &submission.from_display,
            &submission.form_name,
        )
    }

    pub fn get_submission(&self, id: &str) -> Result<Submission> {
        self.messages()
            .into_iter()
            .find_map(|m| match m {
                Message::Submission(s) if s.id == id => Some(s),
                _ => None,
            })
            .ok_or_else(|| LexflowError::not_found("submission", id))
    }

    /// What `username` acting as `role` may read, newest first.
    pub fn list_for(&self, role: Role, username: &str) -> Vec<Message> {
        let messages = self.messages();
        match role {
            Role::Legal => messages
                .into_iter()
                .filter(|m| matches!(m, Message::Submission(_)))
                .collect(),
            Role::Client => messages
                .into_iter()
                .filter(|m| match m {
                    Message::Submission(s) => s.from == username,
                    Message::Response(r) => r.to_user == username,
                })
                .collect(),
            Role::Admin => Vec::new(),
        }
    }

    /// Responses to one submission, newest first.
    pub fn responses_to(&self, submission_id: &str) -> Vec<Response> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                Message::Response(r) if r.in_reply_to == submission_id => Some(r),
                _ => None,
            })
            .collect()
    }

    pub fn is_answered(&self, submission_id: &str) -> bool {
        !self.responses_to(submission_id).is_empty()
    }

    fn prepend(&self, message: Message) -> Result<()> {
        let mut messages = self.messages();
        messages.insert(0, message);
        self.storage.save(slots::MAILBOX, &messages)
    }
}
