//! The seam between the catalog client and the network. Production code sends requests with a
//! [reqwest::Client]; tests swap in a transport that records requests and replays canned responses.
use reqwest::{Request, Response};

pub trait Transport {
    async fn send(&self, request: Request) -> reqwest::Result<Response>;
}

/// Redirects are followed by reqwest's default policy.
impl Transport for reqwest::Client {
    async fn send(&self, request: Request) -> reqwest::Result<Response> {
        self.execute(request).await
    }
}

impl<T: Transport> Transport for &T {
    async fn send(&self, request: Request) -> reqwest::Result<Response> {
        (**self).send(request).await
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::Transport;
    use reqwest::{Method, Request, Response};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use url::Url;

    /// Replays queued responses in order and records every request it is handed.
    #[derive(Default)]
    pub struct MockTransport {
        responses: Mutex<VecDeque<(u16, Vec<u8>)>>,
        requests: Mutex<Vec<(Method, Url)>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push(&self, status: u16, body: impl Into<Vec<u8>>) -> &Self {
            self.responses
                .lock()
                .unwrap()
                .push_back((status, body.into()));
            self
        }

        pub fn push_json(&self, body: &serde_json::Value) -> &Self {
            self.push(200, serde_json::to_vec(body).unwrap())
        }

        pub fn requests(&self) -> Vec<(Method, Url)> {
            self.requests.lock().unwrap().clone()
        }

        pub fn urls(&self) -> Vec<Url> {
            self.requests().into_iter().map(|(_, url)| url).collect()
        }
    }

    impl Transport for MockTransport {
        async fn send(&self, request: Request) -> reqwest::Result<Response> {
            self.requests
                .lock()
                .unwrap()
                .push((request.method().clone(), request.url().clone()));
            let (status, body) = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("MockTransport ran out of responses");
            let response = http::Response::builder()
                .status(status)
                .body(body)
                .unwrap();
            Ok(Response::from(response))
        }
    }
}
