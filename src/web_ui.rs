use crate::{
    domain::Callback,
    flow::{self, CallbackFlow, SendFlow},
    mattermost, GlobalConfig,
};
use hyper::body::Bytes;
use serde::Deserialize;
use std::convert::Infallible;
use tracing::{error, info};
use warp::{
    filters::{query, BoxedFilter},
    http::{header, StatusCode},
    reply::{self, Response},
    Filter, Rejection, Reply,
};

pub(crate) async fn serve(config: GlobalConfig, send_flow: SendFlow, callback_flow: CallbackFlow) {
    let routes = routes(send_flow, callback_flow).recover(report_invalid);

    info!("Starting web server at {}", &config.listen_address);
    warp::serve(routes).run(config.listen_address).await
}

fn routes(send_flow: SendFlow, callback_flow: CallbackFlow) -> BoxedFilter<(Response,)> {
    send(send_flow).or(callback(callback_flow)).unify().boxed()
}

#[derive(Debug, Deserialize)]
struct SendParams {
    text: Option<String>,
}

fn send(flow: SendFlow) -> BoxedFilter<(Response,)> {
    warp::path!("api" / "send")
        .and(warp::post())
        .and(query::query())
        .and_then(move |params: SendParams| {
            let mut flow = flow.clone();
            async move { Ok::<_, Rejection>(handle_send(&mut flow, params).await) }
        })
        .boxed()
}

fn callback(flow: CallbackFlow) -> BoxedFilter<(Response,)> {
    warp::path!("api" / "callback")
        .and(warp::post())
        .and(warp::body::bytes())
        .and_then(move |body: Bytes| {
            let flow = flow.clone();
            async move { Ok::<_, Rejection>(handle_callback(&flow, &body)) }
        })
        .boxed()
}

async fn handle_send(flow: &mut SendFlow, params: SendParams) -> Response {
    let text = params.text.unwrap_or_default();

    match flow.send(&text).await {
        Ok(()) => plain(StatusCode::OK, String::new()),
        Err(flow::Error::UnableToDeliver {
            source: mattermost::Error::DeliveryRejected { body },
        }) => {
            error!("The incoming webhook rejected the message: {}", body);
            plain(StatusCode::INTERNAL_SERVER_ERROR, body)
        }
        Err(e) => {
            error!("Unable to deliver the message: {}", e);
            plain(StatusCode::INTERNAL_SERVER_ERROR, String::new())
        }
    }
}

fn handle_callback(flow: &CallbackFlow, body: &[u8]) -> Response {
    let callback: Callback = match serde_json::from_slice(body) {
        Ok(callback) => callback,
        Err(e) => {
            error!("Unable to decode the callback request: {}", e);
            return plain(StatusCode::INTERNAL_SERVER_ERROR, String::new());
        }
    };

    let update = flow.interpret(&callback);

    match serde_json::to_string(&update) {
        Ok(body) => json(StatusCode::OK, body),
        Err(e) => {
            error!("Unable to encode the update response: {}", e);
            plain(StatusCode::INTERNAL_SERVER_ERROR, String::new())
        }
    }
}

fn plain(status: StatusCode, body: String) -> Response {
    let mut response = Response::new(body.into());
    *response.status_mut() = status;

    response
}

fn json(status: StatusCode, body: String) -> Response {
    let mut response = plain(status, body);
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );

    response
}

async fn report_invalid(r: Rejection) -> Result<impl Reply, Infallible> {
    let status = if r.is_not_found() {
        StatusCode::NOT_FOUND
    } else if r.find::<warp::reject::MethodNotAllowed>().is_some() {
        StatusCode::METHOD_NOT_ALLOWED
    } else {
        error!("Unhandled web UI error: {:?}", r);
        StatusCode::INTERNAL_SERVER_ERROR
    };

    Ok(reply::with_status(reply::reply(), status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    async fn mock_webhook(body: &'static str) -> Url {
        let route = warp::post().map(move || body);
        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        Url::parse(&format!("http://{}/hooks/abc123", addr)).unwrap()
    }

    fn routes_against(webhook_url: Url) -> BoxedFilter<(Response,)> {
        let callback_uri = Url::parse("http://relay.example/api/callback").unwrap();
        let mattermost = mattermost::Config::new(webhook_url, "alerts").into_client();
        let send_flow = SendFlow::new("alerts".into(), callback_uri, mattermost);

        routes(send_flow, CallbackFlow::new())
    }

    fn callback_routes() -> BoxedFilter<(Response,)> {
        routes_against(Url::parse("http://127.0.0.1:8065/hooks/abc123").unwrap())
    }

    #[tokio::test]
    async fn send_succeeds_when_the_webhook_accepts() {
        let routes = routes_against(mock_webhook("ok").await);

        let response = warp::test::request()
            .method("POST")
            .path("/api/send?text=disk%20almost%20full")
            .reply(&routes)
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.body().is_empty());
    }

    #[tokio::test]
    async fn send_echoes_a_webhook_rejection() {
        let routes = routes_against(mock_webhook("Couldn't find the channel").await);

        let response = warp::test::request()
            .method("POST")
            .path("/api/send?text=hello")
            .reply(&routes)
            .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.body().as_ref(), b"Couldn't find the channel");
    }

    #[tokio::test]
    async fn send_fails_cleanly_when_the_webhook_is_unreachable() {
        let routes = routes_against(Url::parse("http://127.0.0.1:9/hooks/abc123").unwrap());

        let response = warp::test::request()
            .method("POST")
            .path("/api/send?text=hello")
            .reply(&routes)
            .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.body().is_empty());
    }

    #[tokio::test]
    async fn acknowledging_updates_the_message() {
        let response = warp::test::request()
            .method("POST")
            .path("/api/callback")
            .body(r#"{"user_name": "alice", "context": {"action": "ack"}}"#)
            .reply(&callback_routes())
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(
            response.body().as_ref(),
            br#"{"update":{"message":"acknowledged, investigating by @alice"}}"#,
        );
    }

    #[tokio::test]
    async fn ignoring_updates_the_message() {
        let response = warp::test::request()
            .method("POST")
            .path("/api/callback")
            .body(r#"{"user_name": "bob", "context": {"action": "ignore", "duration": 60}}"#)
            .reply(&callback_routes())
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.body().as_ref(),
            br#"{"update":{"message":"ignore for 60, verified by @bob"}}"#,
        );
    }

    #[tokio::test]
    async fn undecodable_callbacks_are_rejected() {
        let response = warp::test::request()
            .method("POST")
            .path("/api/callback")
            .body("this is not json")
            .reply(&callback_routes())
            .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.body().is_empty());
    }

    #[tokio::test]
    async fn callbacks_without_a_context_get_a_neutral_update() {
        let response = warp::test::request()
            .method("POST")
            .path("/api/callback")
            .body(r#"{"user_name": "carol"}"#)
            .reply(&callback_routes())
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body().as_ref(), br#"{"update":{}}"#);
    }

    #[tokio::test]
    async fn callbacks_with_a_foreign_action_get_a_neutral_update() {
        let response = warp::test::request()
            .method("POST")
            .path("/api/callback")
            .body(r#"{"user_name": "carol", "context": {"action": "escalate"}}"#)
            .reply(&callback_routes())
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body().as_ref(), br#"{"update":{}}"#);
    }

    #[tokio::test]
    async fn unknown_paths_are_not_found() {
        let routes = callback_routes().recover(report_invalid);

        let response = warp::test::request()
            .method("POST")
            .path("/api/nope")
            .reply(&routes)
            .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn wrong_methods_are_refused() {
        let routes = callback_routes().recover(report_invalid);

        let response = warp::test::request()
            .method("GET")
            .path("/api/callback")
            .reply(&routes)
            .await;

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
