use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, Proxy, StatusCode, Url, header};
use serde_json::Value;

use crate::amp::{
    credentials::resolve_api_token,
    error::{ReportingError, http_error, illegal_argument, map_http_status},
    types::{AmpConfig, ProxyConfig, TRANSPORT_TIMEOUT_MS},
};

const API_TOKEN_PARAM: &str = "apiToken";
const JSON_CONTENT_TYPE: &str = "application/json;charset=UTF-8";

/// Raw JSON exchange with an AMP instance. `Ok(None)` is an empty response body.
#[async_trait]
pub trait AmpTransport: Send + Sync {
    /// Host of the AMP instance, used in error messages.
    fn instance(&self) -> &str;

    async fn get(
        &self,
        path: &str,
        query: &[(&str, String)],
        include_token: bool,
    ) -> Result<Option<Value>, ReportingError>;

    async fn post(
        &self,
        path: &str,
        body: &Value,
        include_token: bool,
    ) -> Result<Option<Value>, ReportingError>;
}

#[derive(Clone)]
pub struct HttpAmpTransport {
    client: Client,
    endpoint: Url,
    instance: String,
    api_token: Option<String>,
    timeout: Duration,
}

impl HttpAmpTransport {
    pub fn new(config: &AmpConfig) -> Result<Self, ReportingError> {
        let endpoint = Url::parse(&config.endpoint).map_err(|err| {
            illegal_argument(format!("invalid AMP endpoint '{}': {}", config.endpoint, err))
        })?;
        let instance = endpoint
            .host_str()
            .ok_or_else(|| illegal_argument(format!("AMP endpoint '{}' has no host", endpoint)))?
            .to_string();
        let api_token = resolve_api_token(&config.api_token)?;
        let timeout = Duration::from_millis(TRANSPORT_TIMEOUT_MS);

        let mut builder = Client::builder().timeout(timeout);
        builder = match &config.proxy {
            Some(proxy) => builder.proxy(build_proxy(proxy)?),
            None => builder.no_proxy(),
        };
        let client = builder
            .build()
            .map_err(|err| http_error(format!("failed to build AMP http client: {err}")))?;

        Ok(Self {
            client,
            endpoint,
            instance,
            api_token,
            timeout,
        })
    }

    fn url_for(&self, path: &str) -> String {
        format!(
            "{}{}",
            self.endpoint.as_str().trim_end_matches('/'),
            path
        )
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
        include_token: bool,
    ) -> Result<Option<Value>, ReportingError> {
        let url = self.url_for(path);
        let mut params: Vec<(&str, String)> = query.to_vec();
        if include_token && let Some(token) = &self.api_token {
            params.push((API_TOKEN_PARAM, token.clone()));
        }

        let mut request = self
            .client
            .request(method.clone(), &url)
            .timeout(self.timeout)
            .header(header::CONTENT_TYPE, JSON_CONTENT_TYPE);
        if !params.is_empty() {
            request = request.query(&params);
        }
        if let Some(body) = body {
            request = request.body(body.to_string());
        }

        tracing::debug!(target: "amp", method = %method, path = %path, "amp_request_started");

        let response = request.send().await.map_err(|err| {
            if err.is_timeout() {
                http_error(format!(
                    "request to {url} timed out after {} ms",
                    self.timeout.as_millis()
                ))
            } else {
                http_error(format!("request to {url} failed: {err}"))
            }
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| http_error(format!("failed to read response from {url}: {err}")))?;

        tracing::debug!(
            target: "amp",
            method = %method,
            path = %path,
            status = status.as_u16(),
            body_bytes = text.len(),
            "amp_request_completed"
        );

        if status != StatusCode::OK {
            return Err(map_http_status(status.as_u16(), &url, &text));
        }

        parse_body(&text, &url)
    }
}

#[async_trait]
impl AmpTransport for HttpAmpTransport {
    fn instance(&self) -> &str {
        &self.instance
    }

    async fn get(
        &self,
        path: &str,
        query: &[(&str, String)],
        include_token: bool,
    ) -> Result<Option<Value>, ReportingError> {
        self.send(Method::GET, path, query, None, include_token).await
    }

    async fn post(
        &self,
        path: &str,
        body: &Value,
        include_token: bool,
    ) -> Result<Option<Value>, ReportingError> {
        self.send(Method::POST, path, &[], Some(body), include_token)
            .await
    }
}

fn build_proxy(config: &ProxyConfig) -> Result<Proxy, ReportingError> {
    if config.host.trim().is_empty() {
        return Err(illegal_argument("proxy host cannot be empty"));
    }

    let proxy_url = format!("http://{}:{}", config.host, config.port);
    let mut proxy = Proxy::all(&proxy_url)
        .map_err(|err| illegal_argument(format!("invalid proxy '{proxy_url}': {err}")))?;
    if let Some(username) = config.username.as_deref().filter(|name| !name.is_empty()) {
        proxy = proxy.basic_auth(username, config.password.as_deref().unwrap_or_default());
    }

    Ok(proxy)
}

fn parse_body(text: &str, url: &str) -> Result<Option<Value>, ReportingError> {
    if text.trim().is_empty() {
        return Ok(None);
    }

    match serde_json::from_str::<Value>(text) {
        Ok(Value::Null) => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(err) => Err(http_error(format!(
            "malformed JSON response from {url}: {err}"
        ))),
    }
}
