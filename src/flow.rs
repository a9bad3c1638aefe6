use crate::{
    domain::{ActionContext, ActionKind, Callback, Update},
    mattermost,
};
use snafu::{ResultExt, Snafu};
use tracing::warn;
use url::Url;

const ACKNOWLEDGE_NAME: &str = "Acknowledge";
const IGNORE_NAME: &str = "Ignore";
const IGNORE_DURATION: i64 = 60;

/// Builds the two-action notification message and hands it to the platform.
#[derive(Debug, Clone)]
pub struct SendFlow {
    channel: String,
    callback_uri: Url,
    mattermost: mattermost::Client,
}

impl SendFlow {
    pub fn new(channel: String, callback_uri: Url, mattermost: mattermost::Client) -> Self {
        Self {
            channel,
            callback_uri,
            mattermost,
        }
    }

    pub async fn send(&mut self, text: &str) -> Result<()> {
        let message = self.build_message(text);

        self.mattermost
            .deliver(&message)
            .await
            .context(UnableToDeliverSnafu)
    }

    fn build_message(&self, text: &str) -> mattermost::Message {
        let Self {
            channel,
            callback_uri,
            ..
        } = self;

        let action = |name: &str, context: ActionContext| mattermost::Action {
            name: name.into(),
            integration: mattermost::Integration {
                id: Some(context.action.as_tag().into()),
                url: callback_uri.to_string(),
                context,
            },
        };

        mattermost::Message {
            text: text.into(),
            channel: channel.clone(),
            attachments: vec![mattermost::Attachment {
                text: text.into(),
                actions: vec![
                    action(ACKNOWLEDGE_NAME, ActionContext::new(ActionKind::Ack)),
                    action(
                        IGNORE_NAME,
                        ActionContext::with_duration(ActionKind::Ignore, IGNORE_DURATION),
                    ),
                ],
            }],
        }
    }
}

/// Turns the context echoed back by the platform into a message update.
#[derive(Debug, Clone)]
pub struct CallbackFlow;

impl CallbackFlow {
    pub fn new() -> Self {
        Self
    }

    pub fn interpret(&self, callback: &Callback) -> Update {
        let context = match &callback.context {
            Some(context) => context,
            None => {
                warn!(
                    "Callback from @{} carried no action context",
                    callback.user_name,
                );
                return Update::empty();
            }
        };

        match context.action {
            ActionKind::Ack => Update::message(format!(
                "acknowledged, investigating by @{}",
                callback.user_name,
            )),
            ActionKind::Ignore => Update::message(format!(
                "ignore for {}, verified by @{}",
                context.duration.unwrap_or_default(),
                callback.user_name,
            )),
            ActionKind::Unknown => {
                warn!(
                    "Callback from @{} carried an unrecognized action",
                    callback.user_name,
                );
                Update::empty()
            }
        }
    }
}

#[derive(Debug, Snafu)]
pub enum Error {
    UnableToDeliver { source: mattermost::Error },
}

type Result<T, E = Error> = std::result::Result<T, E>;
