use crate::domain::ActionContext;
use serde::{Deserialize, Serialize};
use snafu::{ensure, ResultExt, Snafu};
use std::env;
use tracing::{trace, trace_span, Instrument};
use url::Url;

/// The exact body an incoming webhook answers with on success.
const WEBHOOK_OK: &str = "ok";

/// A message posted to an incoming webhook.
#[derive(Debug, Serialize)]
pub struct Message {
    pub text: String,
    pub channel: String,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Serialize)]
pub struct Attachment {
    pub text: String,
    pub actions: Vec<Action>,
}

/// An interactive button embedded in an attachment.
#[derive(Debug, Serialize)]
pub struct Action {
    pub name: String,
    pub integration: Integration,
}

#[derive(Debug, Serialize)]
pub struct Integration {
    // Mattermost uses this slug as the action URL suffix when present and a
    // generated hash otherwise; it accepts either.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub url: String,
    pub context: ActionContext,
}

/// The request Mattermost POSTs to the integration URL when a user clicks an
/// interactive button. Every field is optional on the wire.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Callback {
    pub user_id: String,
    pub user_name: String,
    pub channel_id: String,
    pub channel_name: String,
    pub team_id: String,
    pub team_domain: String,
    pub post_id: String,
    pub trigger_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data_source: String,
    pub context: Option<ActionContext>,
}

/// The reply a callback handler returns to rewrite the original message.
#[derive(Debug, Serialize)]
pub struct Update {
    update: UpdateMessage,
}

#[derive(Debug, Serialize)]
struct UpdateMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl Update {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            update: UpdateMessage {
                message: Some(message.into()),
            },
        }
    }

    pub fn empty() -> Self {
        Self {
            update: UpdateMessage { message: None },
        }
    }
}

//--

#[derive(Debug, Clone)]
pub struct Config {
    pub channel: String,
    webhook_url: Url,
}

impl Config {
    pub fn from_environment() -> Result<Self> {
        let url = env::var("MATTERMOST_WEBHOOK_URL").context(UnknownWebhookUrlSnafu)?;
        let channel = env::var("MATTERMOST_CHANNEL").context(UnknownChannelSnafu)?;

        let webhook_url = Url::parse(&url).context(InvalidWebhookUrlSnafu { url })?;

        Ok(Self {
            channel,
            webhook_url,
        })
    }

    pub(crate) fn new(webhook_url: Url, channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            webhook_url,
        }
    }

    pub fn into_client(self) -> Client {
        Client {
            client: super::reqwest_client(),
            config: self,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Client {
    client: reqwest::Client,
    config: Config,
}

impl Client {
    pub async fn deliver(&self, message: &Message) -> Result<()> {
        let Self { client, config } = self;
        let s = trace_span!("deliver", channel = %message.channel);

        async {
            trace!("Posting message to the incoming webhook");

            let response = client
                .post(config.webhook_url.clone())
                .json(message)
                .send()
                .await
                .context(UnableToDeliverMessageSnafu)?;

            // The webhook signals failure through the body, not the status.
            let body = response
                .text()
                .await
                .context(UnableToReadDeliveryResponseSnafu)?;
            ensure!(body == WEBHOOK_OK, DeliveryRejectedSnafu { body });

            Ok(())
        }
        .instrument(s)
        .await
    }
}

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("MATTERMOST_WEBHOOK_URL must be set"))]
    UnknownWebhookUrl {
        source: env::VarError,
    },

    #[snafu(display("MATTERMOST_WEBHOOK_URL is invalid"))]
    InvalidWebhookUrl {
        source: url::ParseError,
        url: String,
    },

    #[snafu(display("MATTERMOST_CHANNEL must be set"))]
    UnknownChannel {
        source: env::VarError,
    },

    UnableToDeliverMessage {
        source: reqwest::Error,
    },

    UnableToReadDeliveryResponse {
        source: reqwest::Error,
    },

    #[snafu(display("The incoming webhook rejected the message: {}", body))]
    DeliveryRejected {
        body: String,
    },
}

type Result<T, E = Error> = std::result::Result<T, E>;
