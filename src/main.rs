#![deny(rust_2018_idioms)]

use snafu::{ResultExt, Snafu};
use std::time::Duration;

pub use config::Config;

mod config;
mod domain;
mod flow;
mod mattermost;
mod web_ui;

type GlobalConfig = &'static Config;

const OUTBOUND_TIMEOUT: Duration = Duration::from_secs(10);

fn main() {
    if let Err(e) = core() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[tokio::main]
async fn core() -> Result<()> {
    tracing_subscriber::fmt::init();
    dotenv::dotenv().ok();

    let config = Config::from_environment().context(UnableToConfigureSnafu)?;
    let config = &*Box::leak(Box::new(config));

    let mattermost_config =
        mattermost::Config::from_environment().context(UnableToConfigureMattermostSnafu)?;

    let callback_uri = config
        .public_uri
        .join("api/callback")
        .context(UnableToBuildCallbackUriSnafu)?;

    let channel = mattermost_config.channel.clone();
    let mattermost = mattermost_config.into_client();

    let send_flow = flow::SendFlow::new(channel, callback_uri, mattermost);
    let callback_flow = flow::CallbackFlow::new();

    let web_ui = tokio::spawn(web_ui::serve(config, send_flow, callback_flow));

    web_ui.await.context(WebUiFailedSnafu)
}

fn reqwest_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(OUTBOUND_TIMEOUT)
        .build()
        .expect("Unable to construct the HTTP client")
}

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("Unable to configure application"))]
    UnableToConfigure { source: config::Error },

    #[snafu(display("Unable to configure Mattermost integration"))]
    UnableToConfigureMattermost { source: mattermost::Error },

    #[snafu(display("Unable to build the action callback URI"))]
    UnableToBuildCallbackUri { source: url::ParseError },

    #[snafu(display("The web UI failed"))]
    WebUiFailed { source: tokio::task::JoinError },
}

type Result<T, E = Error> = std::result::Result<T, E>;
