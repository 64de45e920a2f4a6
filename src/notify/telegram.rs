use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::{EventKind, Notifier, NotifyError, SummaryEvent};

const API_BASE: &str = "https://api.telegram.org";

/// Posts summary events to a Telegram chat through the Bot API.
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
    public_url: String,
}

impl TelegramNotifier {
    pub fn new(
        bot_token: &str,
        chat_id: &str,
        public_url: &str,
    ) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            api_base: API_BASE.to_string(),
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
            public_url: public_url.trim_end_matches('/').to_string(),
        })
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.bot_token)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, event: &SummaryEvent) -> Result<(), NotifyError> {
        let text = render_message(event, &self.public_url);

        let resp = self
            .client
            .post(self.send_message_url())
            .json(&serde_json::json!({
                "chat_id": self.chat_id,
                "text": text,
                "parse_mode": "HTML",
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected(format!(
                "sendMessage failed ({status}): {body}"
            )));
        }

        Ok(())
    }
}

/// Render the HTML chat message for an event, linking to the course's summary list.
pub(crate) fn render_message(event: &SummaryEvent, public_url: &str) -> String {
    let link = format!(
        "<a href=\"{}/courses/{}/summaries\">Open the catalog.</a>",
        escape_html(public_url),
        event.course_id
    );
    let name = escape_html(&event.summary_name);

    match event.kind {
        EventKind::Added => {
            format!("The summary \"{name}\" has been uploaded to the catalog.\n{link}")
        }
        EventKind::Updated => {
            let changes = escape_html(event.commit_description.as_deref().unwrap_or(""));
            format!("The summary \"{name}\" has been updated.\nChanges: {changes}\n{link}")
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
