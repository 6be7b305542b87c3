use crate::config::ClientConfig;
use crate::error::{check_status, Error, Result};
use crate::transport::Transport;
use reqwest::{Method, Request, Response};
use serde::de::DeserializeOwned;
use url::Url;

pub const API_KEY_PARAM: &str = "key";

/// HTTP client bound to one catalog root. Every request it sends carries the API key.
pub struct CatalogClient<T: Transport = reqwest::Client> {
    transport: T,
    api_key: String,
    base_url: Url,
}

impl CatalogClient<reqwest::Client> {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(config, reqwest::Client::new())
    }
}

impl<T: Transport> CatalogClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        let ClientConfig {
            api_key,
            mut base_url,
        } = config;
        // Url::join drops the last path segment unless the base ends with a slash
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            transport,
            api_key,
            base_url,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute http(s) urls are returned unchanged, anything else is resolved below the base url.
    pub fn resolve(&self, path: &str) -> Result<Url> {
        if let Ok(url) = Url::parse(path) {
            if matches!(url.scheme(), "http" | "https") {
                return Ok(url);
            }
        }
        let url = self.base_url.join(path.trim_start_matches('/'))?;
        Ok(url)
    }

    /// Url below the base with each of `segments` percent-encoded as a single path segment, so ids
    /// containing `/`, `?` or `#` cannot address another resource. `.` and `..` never name a
    /// resource and are reported as not found without sending anything.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        if segments.iter().any(|s| matches!(*s, "" | "." | "..")) {
            return Err(Error::NotFound {
                url: format!("{}{}", self.base_url, segments.join("/")),
            });
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("{} cannot be a base url", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Only urls that already carry a `key` pair get their query rewritten, everything else keeps
    /// its query byte for byte.
    fn authorize(&self, mut url: Url) -> Url {
        if !url.query_pairs().any(|(k, _)| k == API_KEY_PARAM) {
            url.query_pairs_mut().append_pair(API_KEY_PARAM, &self.api_key);
            return url;
        }
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| k != API_KEY_PARAM)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(pairs)
            .append_pair(API_KEY_PARAM, &self.api_key);
        url
    }

    /// Send a request and hand back the raw response. Status codes are not inspected here.
    pub async fn request(&self, method: Method, path: &str) -> Result<Response> {
        let url = self.authorize(self.resolve(path)?);
        let response = self.transport.send(Request::new(method, url)).await?;
        Ok(response)
    }

    pub async fn get(&self, path: &str) -> Result<Response> {
        self.request(Method::GET, path).await
    }

    /// GET `path`, fail on a non-2xx status and decode the body as JSON.
    pub async fn get_json<D: DeserializeOwned>(&self, path: &str) -> Result<D> {
        let response = check_status(self.get(path).await?).await?;
        let bytes = response.bytes().await?;
        let value = serde_json::from_slice(&bytes)?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::transport::mock::MockTransport;

    fn client(transport: &MockTransport) -> CatalogClient<&MockTransport> {
        let config = ClientConfig::new("secret", "https://host/v1").unwrap();
        CatalogClient::with_transport(config, transport)
    }

    #[test]
    fn test_resolve_relative_path() {
        let transport = MockTransport::new();
        let client = client(&transport);
        assert_eq!(
            client.resolve("archive/foo").unwrap().as_str(),
            "https://host/v1/archive/foo"
        );
        assert_eq!(
            client.resolve("/collections/bar").unwrap().as_str(),
            "https://host/v1/collections/bar"
        );
    }

    #[test]
    fn test_resolve_absolute_url_unchanged() {
        let transport = MockTransport::new();
        let client = client(&transport);
        let href = "https://storage.example.com/labels/tile_01.tif?sig=abc";
        assert_eq!(client.resolve(href).unwrap().as_str(), href);
    }

    #[test]
    fn test_base_url_with_trailing_slash() {
        let transport = MockTransport::new();
        let config = ClientConfig::new("secret", "https://host/v1/").unwrap();
        let client = CatalogClient::with_transport(config, &transport);
        assert_eq!(client.base_url().as_str(), "https://host/v1/");
        assert_eq!(
            client.resolve("search").unwrap().as_str(),
            "https://host/v1/search"
        );
    }

    #[tokio::test]
    async fn test_every_request_carries_key() {
        let transport = MockTransport::new();
        transport.push(200, "a").push(200, "b").push(500, "c");
        let client = client(&transport);

        client.get("collections/x").await.unwrap();
        client
            .get("https://elsewhere.example/file.tif?key=stale&x=1")
            .await
            .unwrap();
        // Status codes are passed through untouched
        let res = client.request(Method::HEAD, "archive/x").await.unwrap();
        assert_eq!(res.status().as_u16(), 500);

        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[2].0, Method::HEAD);
        for (_, url) in requests {
            let keys: Vec<String> = url
                .query_pairs()
                .filter(|(k, _)| k == API_KEY_PARAM)
                .map(|(_, v)| v.into_owned())
                .collect();
            assert_eq!(keys, vec!["secret".to_string()]);
        }
        assert_eq!(
            transport.urls()[1].as_str(),
            "https://elsewhere.example/file.tif?x=1&key=secret"
        );
    }

    #[test]
    fn test_endpoint_encodes_ids() {
        let transport = MockTransport::new();
        let client = client(&transport);
        assert_eq!(
            client.endpoint(&["collections", "a#b"]).unwrap().as_str(),
            "https://host/v1/collections/a%23b"
        );
        assert_eq!(
            client
                .endpoint(&["collections", "../archive/x", "items", "t?1"])
                .unwrap()
                .as_str(),
            "https://host/v1/collections/..%2Farchive%2Fx/items/t%3F1"
        );
        assert!(matches!(
            client.endpoint(&["collections", ".."]),
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            client.endpoint(&["archive", ""]),
            Err(Error::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_signed_query_kept_verbatim() {
        let transport = MockTransport::new();
        transport.push(200, "tile");
        let client = client(&transport);

        client
            .get("https://storage.example.com/a.tif?sv=2020&sig=a%20b~c")
            .await
            .unwrap();
        assert_eq!(
            transport.urls()[0].as_str(),
            "https://storage.example.com/a.tif?sv=2020&sig=a%20b~c&key=secret"
        );
    }

    #[tokio::test]
    async fn test_get_json_decode_error() {
        let transport = MockTransport::new();
        transport.push(200, "not json");
        let client = client(&transport);
        let err = client
            .get_json::<serde_json::Value>("collections/x")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }
}
