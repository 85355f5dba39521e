use crate::{
    config::ClientConfig,
    error::{ApiError, ApiResult},
    models::{CreateLinkBody, Credentials, OwnerQueryBody, Registration, ShortLink},
};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

// ── Response schemas ───────────────────────────────────────────────────────

/// `{ URLS: ShortLink[] }`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LinkList {
    #[serde(rename = "URLS")]
    pub urls: Vec<ShortLink>,
}

/// `{ URLS: ShortLink }`, returned by the create endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SingleLink {
    #[serde(rename = "URLS")]
    pub url: ShortLink,
}

/// Pull `field` out of a 2xx body and decode it as `T`. A missing field or a
/// value of the wrong shape becomes `ShapeMismatch`, carrying the body's
/// `message` if it had one.
pub fn decode_field<T: DeserializeOwned>(body: &Value, field: &str) -> ApiResult<T> {
    let mismatch = || ApiError::ShapeMismatch {
        message: body
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_owned),
    };

    let value = body.get(field).ok_or_else(mismatch)?;
    serde_json::from_value(value.clone()).map_err(|e| {
        tracing::debug!("Field '{}' has unexpected shape: {}", field, e);
        mismatch()
    })
}

impl LinkList {
    pub fn from_body(body: &Value) -> ApiResult<Self> {
        decode_field(body, "URLS").map(|urls| Self { urls })
    }
}

impl SingleLink {
    pub fn from_body(body: &Value) -> ApiResult<Self> {
        decode_field(body, "URLS").map(|url| Self { url })
    }
}

// ── Gateway seam ───────────────────────────────────────────────────────────

/// Every backend call the client makes. Principal payloads are returned
/// verbatim so the session store can persist exactly what the server issued.
#[async_trait]
pub trait ApiGateway: Send + Sync {
    async fn login_user(&self, credentials: &Credentials) -> ApiResult<Value>;
    async fn signup_user(&self, registration: &Registration) -> ApiResult<Value>;
    async fn login_admin(&self, credentials: &Credentials) -> ApiResult<Value>;
    async fn signup_admin(&self, registration: &Registration) -> ApiResult<Value>;

    async fn list_own_links(&self) -> ApiResult<LinkList>;
    async fn create_link(&self, url: &str) -> ApiResult<SingleLink>;
    async fn delete_link(&self, short_id: &str) -> ApiResult<()>;

    async fn list_all_links(&self) -> ApiResult<LinkList>;
    async fn links_by_owner(&self, query: &str) -> ApiResult<LinkList>;
}

// ── HTTP implementation ────────────────────────────────────────────────────

/// reqwest-backed gateway. The cookie store keeps whatever session cookie the
/// backend sets on login and replays it on every later call.
#[derive(Clone, Debug)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(config: &ClientConfig) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiError::NetworkFailure(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and return the JSON body of a 2xx response.
    async fn send<B: Serialize + ?Sized + Sync>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> ApiResult<Value> {
        let mut request = self.client.request(method.clone(), self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }

        let resp = request.send().await.map_err(|e| {
            tracing::warn!("{} {} failed: {}", method, path, e);
            ApiError::NetworkFailure(e.to_string())
        })?;

        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ApiError::NetworkFailure(e.to_string()))?;
        let body: Value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        if !status.is_success() {
            tracing::warn!("{} {} rejected with {}", method, path, status);
            return Err(rejected(status, &body));
        }

        tracing::debug!("{} {} -> {}", method, path, status);
        Ok(body)
    }

    async fn get(&self, path: &str) -> ApiResult<Value> {
        self.send::<()>(Method::GET, path, None).await
    }

    async fn post<B: Serialize + ?Sized + Sync>(&self, path: &str, body: &B) -> ApiResult<Value> {
        self.send(Method::POST, path, Some(body)).await
    }
}

fn rejected(status: StatusCode, body: &Value) -> ApiError {
    ApiError::ServerRejected {
        status: status.as_u16(),
        message: body
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_owned),
    }
}

#[async_trait]
impl ApiGateway for HttpGateway {
    async fn login_user(&self, credentials: &Credentials) -> ApiResult<Value> {
        let body = self.post("/user/login", credentials).await?;
        decode_field(&body, "user")
    }

    async fn signup_user(&self, registration: &Registration) -> ApiResult<Value> {
        let body = self.post("/user/signup", registration).await?;
        decode_field(&body, "user")
    }

    async fn login_admin(&self, credentials: &Credentials) -> ApiResult<Value> {
        let body = self.post("/admin/login", credentials).await?;
        decode_field(&body, "Admin")
    }

    async fn signup_admin(&self, registration: &Registration) -> ApiResult<Value> {
        let body = self.post("/admin/signup", registration).await?;
        decode_field(&body, "Admin")
    }

    async fn list_own_links(&self) -> ApiResult<LinkList> {
        LinkList::from_body(&self.get("/url/getallurls").await?)
    }

    async fn create_link(&self, url: &str) -> ApiResult<SingleLink> {
        let body = self.post("/url/geturl", &CreateLinkBody { url }).await?;
        SingleLink::from_body(&body)
    }

    async fn delete_link(&self, short_id: &str) -> ApiResult<()> {
        let path = format!("/url/delete/{short_id}");
        self.send::<()>(Method::DELETE, &path, None).await?;
        Ok(())
    }

    async fn list_all_links(&self) -> ApiResult<LinkList> {
        LinkList::from_body(&self.get("/admin/getallurls").await?)
    }

    async fn links_by_owner(&self, query: &str) -> ApiResult<LinkList> {
        let body = self
            .post("/admin/urlDetails", &OwnerQueryBody { query })
            .await?;
        LinkList::from_body(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::Path,
        http::{header, StatusCode as AxumStatus},
        response::IntoResponse,
        routing::{delete, get, post},
        Json, Router,
    };
    use serde_json::json;

    // ── Shape validation ───────────────────────────────────────────────────

    #[test]
    fn link_list_requires_an_array() {
        let ok = LinkList::from_body(&json!({
            "URLS": [{ "shortId": "a", "OriginalURL": "https://a.test" }]
        }))
        .unwrap();
        assert_eq!(ok.urls.len(), 1);

        let single = json!({ "URLS": { "shortId": "a", "OriginalURL": "https://a.test" } });
        assert!(matches!(
            LinkList::from_body(&single),
            Err(ApiError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn link_list_reads_populated_owner_records() {
        let list = LinkList::from_body(&json!({ "URLS": [{
            "shortId": "abc",
            "OriginalURL": "https://x.test",
            "visitHistory": [],
            "createdBy": { "_id": "u1", "email": "a@b.com" }
        }]}))
        .unwrap();
        assert_eq!(list.urls[0].original_url, "https://x.test");
        assert_eq!(list.urls[0].created_by.as_deref(), Some("a@b.com"));

        let list = LinkList::from_body(&json!({ "URLS": [{
            "shortId": "abc",
            "originalUrl": "https://x.test",
            "createdBy": { "email": "a@b.com" }
        }]}))
        .unwrap();
        assert_eq!(list.urls[0].created_by.as_deref(), Some("a@b.com"));
    }

    #[test]
    fn single_link_rejects_a_list() {
        let list = json!({ "URLS": [] });
        assert!(matches!(
            SingleLink::from_body(&list),
            Err(ApiError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn shape_mismatch_keeps_server_message() {
        let err = LinkList::from_body(&json!({ "message": "No user with that email" })).unwrap_err();
        assert_eq!(err.server_message(), Some("No user with that email"));
    }

    // ── End to end against a fake backend ──────────────────────────────────

    async fn spawn_backend(router: Router) -> HttpGateway {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        let config = ClientConfig::with_base_url(&format!("http://{addr}")).unwrap();
        HttpGateway::new(&config).unwrap()
    }

    fn link(id: &str) -> Value {
        json!({
            "_id": format!("oid-{id}"),
            "shortId": id,
            "OriginalURL": format!("https://{id}.test"),
            "visitHistory": [],
            "createdBy": { "_id": "u1", "name": "Ann", "email": "a@b.com" }
        })
    }

    #[tokio::test]
    async fn login_then_list_replays_session_cookie() {
        let router = Router::new()
            .route(
                "/user/login",
                post(|Json(body): Json<Value>| async move {
                    assert_eq!(body["email"], "a@b.com");
                    (
                        [(header::SET_COOKIE, "token=abc; Path=/")],
                        Json(json!({ "user": { "name": "Ann", "email": "a@b.com" } })),
                    )
                }),
            )
            .route(
                "/url/getallurls",
                get(|headers: axum::http::HeaderMap| async move {
                    let cookie = headers
                        .get(header::COOKIE)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_owned();
                    if cookie.contains("token=abc") {
                        Json(json!({ "URLS": [link("a1"), link("a2")] })).into_response()
                    } else {
                        (AxumStatus::UNAUTHORIZED, Json(json!({ "message": "Login first" })))
                            .into_response()
                    }
                }),
            );
        let gateway = spawn_backend(router).await;

        let rejected = gateway.list_own_links().await.unwrap_err();
        assert_eq!(rejected.server_message(), Some("Login first"));

        let user = gateway
            .login_user(&Credentials {
                email: "a@b.com".into(),
                password: "pw".into(),
            })
            .await
            .unwrap();
        assert_eq!(user["name"], "Ann");

        let list = gateway.list_own_links().await.unwrap();
        let ids: Vec<_> = list.urls.iter().map(|l| l.short_id.as_str()).collect();
        assert_eq!(ids, ["a1", "a2"]);
    }

    #[tokio::test]
    async fn admin_endpoints_use_admin_envelope_and_bodies() {
        let router = Router::new()
            .route(
                "/admin/login",
                post(|| async { Json(json!({ "Admin": { "name": "Root" } })) }),
            )
            .route(
                "/admin/urlDetails",
                post(|Json(body): Json<Value>| async move {
                    assert_eq!(body["query"], "a@b.com");
                    Json(json!({ "URLS": [link("z9")] }))
                }),
            )
            .route(
                "/url/geturl",
                post(|Json(body): Json<Value>| async move {
                    Json(json!({ "URLS": {
                        "shortId": "new1",
                        "OriginalURL": body["url"],
                        "visitHistory": [],
                        "createdBy": "u1",
                    }}))
                }),
            )
            .route(
                "/url/delete/:id",
                delete(|Path(id): Path<String>| async move {
                    if id == "gone" {
                        (AxumStatus::NOT_FOUND, Json(json!({ "message": "URL not found" })))
                            .into_response()
                    } else {
                        AxumStatus::OK.into_response()
                    }
                }),
            );
        let gateway = spawn_backend(router).await;

        let admin = gateway
            .login_admin(&Credentials {
                email: "root@b.com".into(),
                password: "pw".into(),
            })
            .await
            .unwrap();
        assert_eq!(admin["name"], "Root");

        let found = gateway.links_by_owner("a@b.com").await.unwrap();
        assert_eq!(found.urls[0].short_id, "z9");
        assert_eq!(found.urls[0].created_by.as_deref(), Some("a@b.com"));

        let created = gateway.create_link("https://long.test/x").await.unwrap();
        assert_eq!(created.url.short_id, "new1");
        assert_eq!(created.url.original_url, "https://long.test/x");

        gateway.delete_link("new1").await.unwrap();
        let err = gateway.delete_link("gone").await.unwrap_err();
        assert_eq!(
            err,
            ApiError::ServerRejected {
                status: 404,
                message: Some("URL not found".into())
            }
        );
    }

    #[tokio::test]
    async fn login_without_envelope_is_shape_mismatch() {
        let router = Router::new().route(
            "/user/signup",
            post(|| async { Json(json!({ "ok": true })) }),
        );
        let gateway = spawn_backend(router).await;

        let err = gateway
            .signup_user(&Registration {
                name: "Ann".into(),
                email: "a@b.com".into(),
                password: "pw".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::ShapeMismatch { .. }));
    }

    #[tokio::test]
    async fn unreachable_backend_is_network_failure() {
        let config = ClientConfig::with_base_url("http://127.0.0.1:1").unwrap();
        let gateway = HttpGateway::new(&config).unwrap();
        assert!(matches!(
            gateway.list_all_links().await,
            Err(ApiError::NetworkFailure(_))
        ));
    }
}
