//! `reqwest` transports for remote MCP servers.
//!
//! Streamable HTTP posts every JSON-RPC message to one URL and accepts
//! either a JSON body or an event stream in reply. Legacy SSE keeps a GET
//! event stream open and posts messages to the URL announced by its
//! `endpoint` event.

mod connector;
mod event_stream;
mod jsonrpc;
mod legacy_sse;
mod streamable;

pub use connector::HttpMcpConnector;

use crate::mcp::ports::{TransportError, TransportResult};
use reqwest::StatusCode;

const EVENT_STREAM: &str = "text/event-stream";

fn map_send_error(err: &reqwest::Error) -> TransportError {
    // reqwest errors embed the request URL; report the failure class only.
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connection(String::from("connection failed"))
    } else {
        TransportError::Connection(String::from("request failed"))
    }
}

fn check_status(status: StatusCode) -> TransportResult<()> {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(TransportError::Unauthorized(status.as_u16()))
        }
        ok if ok.is_success() => Ok(()),
        other => Err(TransportError::Http {
            status: other.as_u16(),
        }),
    }
}

fn is_event_stream(response: &reqwest::Response) -> bool {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim_start().starts_with(EVENT_STREAM))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(StatusCode::OK, Ok(()))]
    #[case(StatusCode::ACCEPTED, Ok(()))]
    #[case(StatusCode::UNAUTHORIZED, Err(TransportError::Unauthorized(401)))]
    #[case(StatusCode::FORBIDDEN, Err(TransportError::Unauthorized(403)))]
    #[case(StatusCode::NOT_FOUND, Err(TransportError::Http { status: 404 }))]
    fn statuses_are_classified(
        #[case] status: StatusCode,
        #[case] expected: TransportResult<()>,
    ) {
        assert_eq!(check_status(status), expected);
    }
}
