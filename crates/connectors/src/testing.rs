//! Scripted in-memory [`Transport`] for tests.
//!
//! Routes match on method and a URL substring; the first matching route
//! answers. A route with several queued replies hands them out in order and
//! then keeps repeating the last one. Unmatched requests get a 404.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use reqwest::Method;

use crate::error::ConnectorError;
use crate::transport::{HttpRequest, HttpResponse, Transport};

#[derive(Debug, Clone)]
enum Reply {
    Response(HttpResponse),
    Error(ConnectorError),
}

#[derive(Debug)]
struct Route {
    method: Method,
    url_fragment: String,
    replies: VecDeque<Reply>,
}

/// Records every request and answers from scripted routes.
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer matching requests with `response`.
    pub fn respond(&self, method: Method, url_fragment: &str, response: HttpResponse) -> &Self {
        self.push(method, url_fragment, Reply::Response(response));
        self
    }

    /// Answer matching requests with a JSON body.
    pub fn respond_json(
        &self,
        method: Method,
        url_fragment: &str,
        status: u16,
        body: &serde_json::Value,
    ) -> &Self {
        self.respond(method, url_fragment, HttpResponse::json_body(status, body))
    }

    /// Fail matching requests at the transport level.
    pub fn fail(&self, method: Method, url_fragment: &str, error: ConnectorError) -> &Self {
        self.push(method, url_fragment, Reply::Error(error));
        self
    }

    /// Drop all scripted routes. Recorded requests are kept.
    pub fn clear_routes(&self) {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Every request sent so far.
    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Requests whose URL contains `url_fragment`.
    #[must_use]
    pub fn requests_matching(&self, url_fragment: &str) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.url.contains(url_fragment))
            .collect()
    }

    fn push(&self, method: Method, url_fragment: &str, reply: Reply) {
        let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(route) = routes
            .iter_mut()
            .find(|route| route.method == method && route.url_fragment == url_fragment)
        {
            route.replies.push_back(reply);
        } else {
            routes.push(Route {
                method,
                url_fragment: url_fragment.to_string(),
                replies: VecDeque::from([reply]),
            });
        }
    }

    fn next_reply(&self, request: &HttpRequest) -> Option<Reply> {
        let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        let route = routes.iter_mut().find(|route| {
            route.method == request.method && request.url.contains(&route.url_fragment)
        })?;
        if route.replies.len() > 1 {
            route.replies.pop_front()
        } else {
            route.replies.front().cloned()
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ConnectorError> {
        let reply = self.next_reply(&request);
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        match reply {
            Some(Reply::Response(response)) => Ok(response),
            Some(Reply::Error(error)) => Err(error),
            None => Ok(HttpResponse::new(404, "no mock route")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replies_in_order_then_repeat_last() {
        let transport = MockTransport::new();
        transport
            .respond(Method::GET, "/a", HttpResponse::new(500, ""))
            .respond(Method::GET, "/a", HttpResponse::new(200, "ok"));

        let statuses = [
            transport.send(HttpRequest::get("https://x/a")).await,
            transport.send(HttpRequest::get("https://x/a")).await,
            transport.send(HttpRequest::get("https://x/a")).await,
        ]
        .map(|result| result.map(|response| response.status));

        assert_eq!(statuses, [Ok(500), Ok(200), Ok(200)]);
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test]
    async fn test_unmatched_is_404() {
        let transport = MockTransport::new();
        transport.respond(Method::POST, "/a", HttpResponse::new(200, ""));

        let response = transport
            .send(HttpRequest::get("https://x/a"))
            .await
            .expect("response");
        assert_eq!(response.status, 404);
    }
}
