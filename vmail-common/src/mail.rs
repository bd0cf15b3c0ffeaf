/*
 * vMail mail transfer agent
 * Copyright (C) 2022 viridIT SAS
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 *  This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
 **/
use crate::{Address, Content, Recipients, RepositoryError, State};

/// values shared between the processing steps of a mail, keyed by an opaque name.
pub type Attributes = std::collections::BTreeMap<String, serde_json::Value>;

/// a mail going through the processing pipeline.
#[derive(Debug, Clone)]
pub struct Mail {
    id: String,
    /// emitter of the mail, `None` for a bounce (null sender).
    pub sender: Option<Address>,
    /// recipients still addressed by this mail.
    pub recipients: Recipients,
    /// raw content of the message.
    pub content: Content,
    /// values shared between processing steps.
    pub attributes: Attributes,
    /// the next processor, or a terminal marker.
    pub state: State,
    /// diagnostic of the last fault.
    pub last_error: Option<String>,
    /// processor dispatches taken during the current pass.
    pub hop_count: usize,
}

impl Mail {
    /// create a mail addressed to the root processor.
    ///
    /// `id` is usually obtained with [`Mail::generate_id`] and is the key
    /// the content has been stored under.
    #[must_use]
    pub fn new(
        id: String,
        sender: Option<Address>,
        recipients: Recipients,
        content: Content,
    ) -> Self {
        Self {
            id,
            sender,
            recipients,
            content,
            attributes: Attributes::new(),
            state: State::default(),
            last_error: None,
            hop_count: 0,
        }
    }

    /// unique id generated when the mail is created.
    /// format: {timestamp in micros}{sequence}{process id}
    #[must_use]
    pub fn generate_id() -> String {
        static SEQUENCE: std::sync::atomic::AtomicU32 = std::sync::atomic::AtomicU32::new(0);

        format!(
            "{}{:04x}{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_micros(),
            SEQUENCE.fetch_add(1, std::sync::atomic::Ordering::Relaxed) & 0xffff,
            std::process::id()
        )
    }

    /// the id of the mail, also the repository key of its content.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// create a new mail for `recipients`, with a copy of this mail's content
    /// under its own id. sender, attributes, state and last error are kept.
    ///
    /// # Errors
    ///
    /// * failed to copy the content.
    pub async fn derive(&self, recipients: Recipients) -> Result<Self, RepositoryError> {
        let id = Self::generate_id();
        let content = self.content.copy_to(id.clone()).await?;

        Ok(Self {
            id,
            sender: self.sender.clone(),
            recipients,
            content,
            attributes: self.attributes.clone(),
            state: self.state.clone(),
            last_error: self.last_error.clone(),
            hop_count: 0,
        })
    }

    /// the sender formatted as in a reverse path, `<>` for the null sender.
    #[must_use]
    pub fn reverse_path(&self) -> String {
        self.sender
            .as_ref()
            .map_or_else(|| "<>".to_string(), ToString::to_string)
    }
}

impl std::fmt::Display for Mail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "mail '{}' from {} to {} (state={})",
            self.id,
            self.reverse_path(),
            self.recipients,
            self.state
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryRepository;

    #[test]
    fn unique_ids() {
        let ids = (0..100)
            .map(|_| Mail::generate_id())
            .collect::<std::collections::HashSet<_>>();
        assert_eq!(ids.len(), 100);
    }

    #[tokio::test]
    async fn derive_copies_content() {
        let repository = std::sync::Arc::new(MemoryRepository::default());
        let id = Mail::generate_id();
        let content = Content::create(
            id.clone(),
            repository.clone(),
            crate::RetryPolicy::default(),
            b"Subject: test\r\n\r\nhello\r\n".to_vec(),
        )
        .await
        .unwrap();

        let mut mail = Mail::new(
            id,
            Some(Address::try_from("john@doe.com").unwrap()),
            Recipients::from(vec![
                Address::try_from("a@example.com").unwrap(),
                Address::try_from("b@example.com").unwrap(),
            ]),
            content,
        );
        mail.attributes
            .insert("spam-score".to_string(), serde_json::json!(2));

        let derived = mail
            .derive(Recipients::from(vec![
                Address::try_from("a@example.com").unwrap()
            ]))
            .await
            .unwrap();

        assert_ne!(derived.id(), mail.id());
        assert_eq!(derived.recipients.len(), 1);
        assert_eq!(derived.attributes, mail.attributes);

        mail.content.release().await.unwrap();
        assert_eq!(repository.keys().unwrap(), vec![derived.id().to_string()]);
        assert_eq!(
            &*derived.content.open().await.unwrap(),
            b"Subject: test\r\n\r\nhello\r\n"
        );
    }

    #[test]
    fn reverse_path() {
        let mut mail = Mail::new(
            "id".to_string(),
            None,
            Recipients::new(),
            Content::new(
                "id",
                std::sync::Arc::new(MemoryRepository::default()),
                crate::RetryPolicy::default(),
            ),
        );
        assert_eq!(mail.reverse_path(), "<>");
        mail.sender = Some(Address::try_from("john@doe.com").unwrap());
        assert_eq!(mail.reverse_path(), "john@doe.com");
    }
}
