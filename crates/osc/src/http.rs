//! REST adapter: [`ResourceApi`] over blocking HTTP.
//!
//! One request per call, no retries. Request and response bodies follow the
//! OpenStack envelope convention (`{"router": {...}}`, `{"routers": [...]}`)
//! unless the kind says otherwise.

use anyhow::Context as _;
use osc_dispatch::{
    Action, AttributePayload, Error, Method, ResourceApi, ResourceHandle, ResourceKind,
    ResourceQuery, Result, Service, UpdateMethod,
};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{StatusCode, Url};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::config::Settings;

const JSON_PATCH: &str = "application/openstack-images-v2.1-json-patch";

/// HTTP implementation of [`ResourceApi`].
pub struct HttpApi {
    client: Client,
    settings: Settings,
}

impl HttpApi {
    pub fn new(settings: Settings) -> anyhow::Result<Self> {
        let mut builder = Client::builder()
            .user_agent(concat!("osc/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(!settings.verify);
        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to create HTTP client")?;
        Ok(Self { client, settings })
    }

    fn base(&self, service: Service) -> Result<&str> {
        self.settings.endpoint(service).ok_or_else(|| {
            let flag = flag_name(service);
            Error::transport(format!(
                "No {} endpoint configured; use --os-{}-endpoint or OS_{}_ENDPOINT",
                service,
                flag,
                flag.to_ascii_uppercase()
            ))
        })
    }

    fn url(&self, kind: &ResourceKind, id: Option<&str>, suffix: Option<&str>) -> Result<Url> {
        let base = self.base(kind.service)?;
        let mut url = Url::parse(base)
            .map_err(|e| Error::transport(format!("Invalid endpoint '{}': {}", base, e)))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| Error::transport(format!("Invalid endpoint '{}'", base)))?;
            segments.pop_if_empty().extend(static_segments(kind.path));
            if let Some(id) = id {
                if !is_valid_id(id) {
                    return Err(Error::validation(format!("'{}' is not a valid ID", id)));
                }
                segments.push(id);
            }
            if let Some(suffix) = suffix {
                segments.extend(static_segments(suffix));
            }
        }
        Ok(url)
    }

    fn request(&self, method: reqwest::Method, service: Service, url: Url) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, url)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(token) = &self.settings.token {
            builder = builder.header("X-Auth-Token", token);
        }
        match service {
            Service::Compute => {
                if let Some(version) = &self.settings.compute_api_version {
                    builder = builder
                        .header("OpenStack-API-Version", format!("compute {}", version))
                        .header("X-OpenStack-Nova-API-Version", version);
                }
            }
            Service::Volume => {
                if let Some(version) = &self.settings.volume_api_version {
                    builder =
                        builder.header("OpenStack-API-Version", format!("volume {}", version));
                }
            }
            _ => {}
        }
        builder
    }

    /// Sends a request, returning the response whatever its status.
    fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let request = builder
            .build()
            .map_err(|e| Error::transport(format!("Failed to build request: {}", e)))?;
        let (method, url) = (request.method().clone(), request.url().clone());
        let response = self
            .client
            .execute(request)
            .map_err(|e| Error::transport(format!("{} {} failed: {}", method, url, e)))?;
        debug!(%method, %url, status = response.status().as_u16(), "request");
        Ok(response)
    }

    /// Sends a request and decodes the body of a successful response.
    fn call(&self, builder: RequestBuilder) -> Result<Value> {
        let response = self.send(builder)?;
        read_body(response)
    }
}

/// Decodes a response, turning non-2xx statuses into backend errors.
fn read_body(response: Response) -> Result<Value> {
    let status = response.status();
    let text = response
        .text()
        .map_err(|e| Error::transport(format!("Failed to read response body: {}", e)))?;
    if !status.is_success() {
        return Err(Error::http(status.as_u16(), error_message(status, &text)));
    }
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text)
        .map_err(|e| Error::transport(format!("Invalid JSON in response: {}", e)))
}

/// The server's error text: a `message` at the top level or one level down
/// (`{"NeutronError": {"message": ...}}`), a `faultstring`, or the raw body.
pub fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        let nested = map.values().filter_map(|v| v.get("message"));
        let found = map
            .get("message")
            .into_iter()
            .chain(nested)
            .chain(map.get("faultstring"))
            .find_map(Value::as_str);
        if let Some(message) = found {
            return message.to_string();
        }
    }
    match body.trim() {
        "" => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
        text => text.to_string(),
    }
}

fn static_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

/// IDs go into the path as one segment; dot segments would change the path.
fn is_valid_id(id: &str) -> bool {
    !matches!(id, "" | "." | "..")
}

fn flag_name(service: Service) -> &'static str {
    match service {
        Service::Volume => "volume",
        other => other.as_str(),
    }
}

fn http_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn query_pairs(query: &ResourceQuery) -> Vec<(&str, &str)> {
    query.iter().collect()
}

/// Wraps a payload in the kind's envelope.
fn envelope(kind: &ResourceKind, payload: &AttributePayload) -> Value {
    let body = Value::Object(payload.as_map().clone());
    if kind.enveloped {
        let mut wrapper = Map::new();
        wrapper.insert(kind.singular.to_string(), body);
        Value::Object(wrapper)
    } else {
        body
    }
}

/// Removes the kind's envelope from a response body.
fn unwrap_envelope(kind: &ResourceKind, body: Value) -> Result<Value> {
    match body {
        Value::Object(mut map) if kind.enveloped => map.remove(kind.singular).ok_or_else(|| {
            Error::transport(format!("response has no '{}' object", kind.singular))
        }),
        other => Ok(other),
    }
}

/// Unwraps a single resource from a response body.
fn unwrap_single(kind: &ResourceKind, body: Value) -> Result<ResourceHandle> {
    ResourceHandle::from_value(unwrap_envelope(kind, body)?)
}

/// Unwraps an update reply. Some services answer with only the changed keys
/// and no `id`, or with an empty body; the updated resource keeps `id`.
fn unwrap_updated(kind: &ResourceKind, id: &str, body: Value) -> Result<ResourceHandle> {
    let mut inner = match body {
        Value::Null => Value::Object(Map::new()),
        body => unwrap_envelope(kind, body)?,
    };
    if let Value::Object(map) = &mut inner {
        map.entry("id").or_insert_with(|| Value::from(id));
    }
    ResourceHandle::from_value(inner)
}

/// JSON patch operations for an image update. `null` values remove the
/// attribute; everything else is added or replaced.
pub fn json_patch(payload: &AttributePayload) -> Value {
    let ops: Vec<Value> = payload
        .as_map()
        .iter()
        .map(|(key, value)| match value {
            Value::Null => json!({"op": "remove", "path": format!("/{}", key)}),
            value => json!({"op": "add", "path": format!("/{}", key), "value": value}),
        })
        .collect();
    Value::Array(ops)
}

impl ResourceApi for HttpApi {
    fn get(&self, kind: &ResourceKind, id: &str) -> Result<Option<ResourceHandle>> {
        if !is_valid_id(id) {
            return Ok(None);
        }
        let url = self.url(kind, Some(id), None)?;
        let response = self.send(self.request(reqwest::Method::GET, kind.service, url))?;
        // Some services answer 400 to IDs of the wrong shape.
        if matches!(
            response.status(),
            StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST
        ) {
            return Ok(None);
        }
        unwrap_single(kind, read_body(response)?).map(Some)
    }

    fn list(&self, kind: &ResourceKind, query: &ResourceQuery) -> Result<Vec<ResourceHandle>> {
        let url = self.url(kind, None, None)?;
        let builder = self
            .request(reqwest::Method::GET, kind.service, url)
            .query(&query_pairs(query));
        let mut body = self.call(builder)?;
        let items = match body.get_mut(kind.plural).map(Value::take) {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(Error::transport(format!(
                    "response has no '{}' list",
                    kind.plural
                )))
            }
        };
        items.into_iter().map(ResourceHandle::from_value).collect()
    }

    fn create(&self, kind: &ResourceKind, payload: &AttributePayload) -> Result<ResourceHandle> {
        let url = self.url(kind, None, None)?;
        let builder = self
            .request(reqwest::Method::POST, kind.service, url)
            .json(&envelope(kind, payload));
        unwrap_single(kind, self.call(builder)?)
    }

    fn update(
        &self,
        kind: &ResourceKind,
        id: &str,
        payload: &AttributePayload,
    ) -> Result<ResourceHandle> {
        let url = self.url(kind, Some(id), None)?;
        let builder = match (kind.update_method, kind.enveloped) {
            (UpdateMethod::Patch, false) => self
                .request(reqwest::Method::PATCH, kind.service, url)
                .header(reqwest::header::CONTENT_TYPE, JSON_PATCH)
                .body(json_patch(payload).to_string()),
            (UpdateMethod::Patch, true) => self
                .request(reqwest::Method::PATCH, kind.service, url)
                .json(&envelope(kind, payload)),
            (UpdateMethod::Put, _) => self
                .request(reqwest::Method::PUT, kind.service, url)
                .json(&envelope(kind, payload)),
        };
        unwrap_updated(kind, id, self.call(builder)?)
    }

    fn delete(&self, kind: &ResourceKind, id: &str, query: &ResourceQuery) -> Result<()> {
        let url = self.url(kind, Some(id), None)?;
        let builder = self
            .request(reqwest::Method::DELETE, kind.service, url)
            .query(&query_pairs(query));
        self.call(builder).map(|_| ())
    }

    fn action(
        &self,
        kind: &ResourceKind,
        id: &str,
        action: &Action,
    ) -> Result<Option<ResourceHandle>> {
        let url = self.url(kind, Some(id), Some(action.path))?;
        let mut builder = self
            .request(http_method(action.method), kind.service, url)
            .query(&query_pairs(&action.query));
        if let Some(body) = &action.body {
            builder = builder.json(body);
        }
        match self.call(builder)? {
            Value::Object(mut map) => match map.remove(kind.singular) {
                Some(inner) => ResourceHandle::from_value(inner).map(Some),
                None => Ok(None),
            },
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::{IMAGE, PROJECT, QOS_SPEC, ROUTER};
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    fn api(endpoints: &[(Service, &str)]) -> HttpApi {
        let mut settings = Settings::default();
        for (service, url) in endpoints {
            settings.endpoints.insert(*service, url.to_string());
        }
        HttpApi::new(settings).unwrap()
    }

    /// Answers one request with `reply` and hands back its request line.
    fn serve_once(reply: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let mut length = 0;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line.trim().is_empty() {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        length = value.trim().parse().unwrap();
                    }
                }
            }
            let mut body = vec![0; length];
            reader.read_exact(&mut body).unwrap();
            write!(
                stream,
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
                 Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                reply.len(),
                reply
            )
            .unwrap();
            request_line.trim_end().to_string()
        });
        (base, server)
    }

    /// A client for the local stub, bypassing any proxy from the environment.
    fn local_api(service: Service, endpoint: String) -> HttpApi {
        let mut settings = Settings::default();
        settings.endpoints.insert(service, endpoint);
        let client = Client::builder().no_proxy().build().unwrap();
        HttpApi { client, settings }
    }

    #[test]
    fn test_error_message_top_level() {
        let body = r#"{"message": "Quota exceeded"}"#;
        assert_eq!(error_message(StatusCode::CONFLICT, body), "Quota exceeded");
    }

    #[test]
    fn test_error_message_nested() {
        let body = r#"{"NeutronError": {"type": "RouterInUse", "message": "Router r1 is in use"}}"#;
        assert_eq!(
            error_message(StatusCode::CONFLICT, body),
            "Router r1 is in use"
        );
    }

    #[test]
    fn test_error_message_faultstring_and_text() {
        let body = r#"{"faultstring": "Invalid input"}"#;
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, body),
            "Invalid input"
        );
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, "upstream down\n"),
            "upstream down"
        );
        assert_eq!(error_message(StatusCode::NOT_FOUND, ""), "Not Found");
    }

    #[test]
    fn test_url_building() {
        let api = api(&[(Service::Network, "http://neutron:9696/")]);
        assert_eq!(
            api.url(&ROUTER, Some("r1"), Some("add_router_interface"))
                .unwrap()
                .as_str(),
            "http://neutron:9696/v2.0/routers/r1/add_router_interface"
        );
        assert_eq!(
            api.url(&ROUTER, None, None).unwrap().as_str(),
            "http://neutron:9696/v2.0/routers"
        );
    }

    #[test]
    fn test_url_encodes_id_segment() {
        let api = api(&[(Service::Volume, "http://cinder:8776/v3/p")]);
        assert_eq!(
            api.url(&QOS_SPEC, Some("a?b/c#d"), None).unwrap().as_str(),
            "http://cinder:8776/v3/p/qos-specs/a%3Fb%2Fc%23d"
        );
        for id in ["", ".", ".."] {
            assert!(api.url(&QOS_SPEC, Some(id), None).is_err(), "{:?}", id);
        }
    }

    #[test]
    fn test_get_dot_segment_is_a_miss() {
        // Nothing listens on the endpoint, so any request would fail.
        let api = api(&[(Service::Network, "http://127.0.0.1:9")]);
        assert!(api.get(&ROUTER, "..").unwrap().is_none());
        assert!(api.get(&ROUTER, ".").unwrap().is_none());
    }

    #[test]
    fn test_update_reply_without_id() {
        let (base, server) = serve_once(r#"{"qos_specs": {"read_iops_sec": "100"}}"#);
        let api = local_api(Service::Volume, format!("{}/v3/p", base));
        let mut payload = AttributePayload::new();
        payload.set("read_iops_sec", "100");

        let handle = api.update(&QOS_SPEC, "q-1", &payload).unwrap();

        assert_eq!(handle.id(), "q-1");
        assert_eq!(handle.get_str("read_iops_sec"), Some("100"));
        assert_eq!(server.join().unwrap(), "PUT /v3/p/qos-specs/q-1 HTTP/1.1");
    }

    #[test]
    fn test_unwrap_updated() {
        let empty = unwrap_updated(&ROUTER, "r1", Value::Null).unwrap();
        assert_eq!(empty.id(), "r1");
        let full = unwrap_updated(&ROUTER, "r1", json!({"router": {"id": "r9"}})).unwrap();
        assert_eq!(full.id(), "r9");
    }

    #[test]
    fn test_missing_endpoint_names_flag() {
        let api = api(&[]);
        let err = api.url(&PROJECT, None, None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "No identity endpoint configured; use --os-identity-endpoint or OS_IDENTITY_ENDPOINT"
        );
    }

    #[test]
    fn test_envelope() {
        let mut payload = AttributePayload::new();
        payload.set("name", "edge");
        assert_eq!(envelope(&ROUTER, &payload), json!({"router": {"name": "edge"}}));
        assert_eq!(envelope(&IMAGE, &payload), json!({"name": "edge"}));
    }

    #[test]
    fn test_unwrap_single() {
        let handle = unwrap_single(&ROUTER, json!({"router": {"id": "r1"}})).unwrap();
        assert_eq!(handle.id(), "r1");
        let image = unwrap_single(&IMAGE, json!({"id": "i1", "name": "cirros"})).unwrap();
        assert_eq!(image.name(), Some("cirros"));
        assert!(unwrap_single(&ROUTER, json!({"network": {}})).is_err());
    }

    #[test]
    fn test_json_patch() {
        let mut payload = AttributePayload::new();
        payload.set("name", "cirros").set("os_distro", Value::Null);
        assert_eq!(
            json_patch(&payload),
            json!([
                {"op": "add", "path": "/name", "value": "cirros"},
                {"op": "remove", "path": "/os_distro"}
            ])
        );
    }
}
