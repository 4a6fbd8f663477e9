use async_trait::async_trait;
use reqwest::header::IF_MATCH;
use reqwest::{Client, Method, RequestBuilder, Response, multipart};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

use tutorial_core::catalog::TutorialFilter;
use tutorial_core::media::MediaKind;
use tutorial_core::model::{
    AuthToken, Credentials, NewTutorial, Progress, Registration, Session, Step, Tutorial,
    TutorialId, TutorialPatch, User, UserId, UserPatch, ValidationErrors,
};

use super::{Backend, UploadedMedia};
use crate::error::ApiError;

/// REST adapter over `<origin>/api`.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    api_root: Url,
}

impl HttpBackend {
    #[must_use]
    pub fn new(api_root: Url) -> Self {
        Self::with_client(Client::new(), api_root)
    }

    #[must_use]
    pub fn with_client(client: Client, api_root: Url) -> Self {
        Self { client, api_root }
    }

    #[must_use]
    pub fn api_root(&self) -> &Url {
        &self.api_root
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.api_root.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::Network(format!("API root {} cannot be a base", self.api_root)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(
        &self,
        method: Method,
        url: Url,
        token: Option<&AuthToken>,
    ) -> RequestBuilder {
        debug!(%method, %url, "backend request");
        let builder = self.client.request(method, url);
        match token {
            Some(token) => builder.bearer_auth(token.as_str()),
            None => builder,
        }
    }

    fn call(
        &self,
        method: Method,
        segments: &[&str],
        token: Option<&AuthToken>,
    ) -> Result<RequestBuilder, ApiError> {
        Ok(self.request(method, self.endpoint(segments)?, token))
    }
}

fn transport(err: reqwest::Error) -> ApiError {
    if err.is_decode() {
        ApiError::Decode(err.to_string())
    } else {
        ApiError::Network(err.to_string())
    }
}

async fn send(
    builder: RequestBuilder,
    authenticated: bool,
    fallback: &str,
) -> Result<Response, ApiError> {
    let response = builder.send().await.map_err(transport)?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    debug!(status = status.as_u16(), "backend rejected request");
    Err(classify(status.as_u16(), &body, authenticated, fallback))
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let bytes = response.bytes().await.map_err(transport)?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

//
// ─── RESPONSE SHAPES ───────────────────────────────────────────────────────────
//

/// Accepts a bare payload or one wrapped under a conventional key.
#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Bare(T),
    User { user: T },
    Tutorial { tutorial: T },
    Data { data: T },
}

impl<T> Envelope<T> {
    fn into_inner(self) -> T {
        match self {
            Self::Bare(inner)
            | Self::User { user: inner }
            | Self::Tutorial { tutorial: inner }
            | Self::Data { data: inner } => inner,
        }
    }
}

fn decode_value<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value::<Envelope<T>>(value)
        .map(Envelope::into_inner)
        .map_err(|e| ApiError::Decode(e.to_string()))
}

/// The login answer is the user record with a `token` next to its fields;
/// a nested `user` object is accepted too.
fn parse_login(mut value: Value) -> Result<Session, ApiError> {
    let token = value
        .get("token")
        .and_then(Value::as_str)
        .map(AuthToken::new)
        .filter(|t| !t.is_blank())
        .ok_or_else(|| ApiError::Decode("login response carries no token".into()))?;
    let user_value = if value.get("user").is_some_and(Value::is_object) {
        value["user"].take()
    } else {
        value
    };
    let user: User =
        serde_json::from_value(user_value).map_err(|e| ApiError::Decode(e.to_string()))?;
    Ok(Session::new(user, token))
}

fn parse_progress(value: Value) -> Result<Option<Progress>, ApiError> {
    let value = match value {
        Value::Object(mut map) if map.contains_key("progress") => {
            map.remove("progress").unwrap_or(Value::Null)
        }
        other => other,
    };
    if value.is_null() {
        return Ok(None);
    }
    decode_value(value).map(Some)
}

//
// ─── ERROR BODIES ──────────────────────────────────────────────────────────────
//

/// Turn a non-success answer into an `ApiError`.
///
/// `authenticated` tells whether the request carried a token; a 401 on an
/// anonymous request (a failed login) is shown with the backend's message.
pub(crate) fn classify(status: u16, body: &str, authenticated: bool, fallback: &str) -> ApiError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|v| v.get("message"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_owned);
    let fields = parsed
        .as_ref()
        .and_then(|v| v.get("errors"))
        .map(field_errors)
        .unwrap_or_default();

    match status {
        401 if authenticated => ApiError::Unauthorized,
        404 => ApiError::NotFound,
        409 => ApiError::Conflict {
            message: message.unwrap_or_default(),
        },
        _ if !fields.is_empty() => ApiError::Validation(fields),
        400 | 422 => match message.as_deref().and_then(field_named_in) {
            Some(field) => ApiError::Validation(ValidationErrors::single(
                field,
                message.unwrap_or_default(),
            )),
            None => ApiError::Rejected {
                status,
                message: message.unwrap_or_else(|| fallback.to_owned()),
            },
        },
        _ => ApiError::Rejected {
            status,
            message: message.unwrap_or_else(|| fallback.to_owned()),
        },
    }
}

/// `{field: {message}}`, `{field: "msg"}` or `[{path|param, msg|message}]`.
fn field_errors(errors: &Value) -> ValidationErrors {
    fn text(v: &Value) -> Option<&str> {
        v.as_str()
            .or_else(|| v.get("message").and_then(Value::as_str))
            .or_else(|| v.get("msg").and_then(Value::as_str))
    }

    let mut out = ValidationErrors::new();
    match errors {
        Value::Object(map) => {
            for (field, entry) in map {
                if let Some(message) = text(entry) {
                    out.insert(field.as_str(), message);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                let field = ["path", "param", "field"]
                    .iter()
                    .find_map(|key| item.get(*key).and_then(Value::as_str));
                if let (Some(field), Some(message)) = (field, text(item)) {
                    out.insert(field, message);
                }
            }
        }
        _ => {}
    }
    out
}

/// Duplicate-account messages name the offending field in prose.
fn field_named_in(message: &str) -> Option<&'static str> {
    let lower = message.to_lowercase();
    if lower.contains("email") {
        Some("email")
    } else if lower.contains("username") {
        Some("username")
    } else {
        None
    }
}

//
// ─── PAYLOADS ──────────────────────────────────────────────────────────────────
//

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProgressPayload {
    step_number: u32,
    completed: bool,
}

#[derive(Serialize)]
struct StepsPayload<'a> {
    steps: &'a [Step],
    version: u64,
}

//
// ─── BACKEND IMPL ──────────────────────────────────────────────────────────────
//

#[async_trait]
impl Backend for HttpBackend {
    async fn list_tutorials(&self, filter: &TutorialFilter) -> Result<Vec<Tutorial>, ApiError> {
        let mut url = self.endpoint(&["tutorials"])?;
        let pairs = filter.query_pairs();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        let response = send(
            self.request(Method::GET, url, None),
            false,
            "Gagal memuat tutorial",
        )
        .await?;
        decode_value(read_json(response).await?)
    }

    async fn get_tutorial(&self, id: &TutorialId) -> Result<Tutorial, ApiError> {
        let builder = self.call(Method::GET, &["tutorials", id.as_str()], None)?;
        let response = send(builder, false, "Gagal memuat tutorial").await?;
        decode_value(read_json(response).await?)
    }

    async fn login(&self, credentials: &Credentials) -> Result<Session, ApiError> {
        let builder = self
            .call(Method::POST, &["auth", "login"], None)?
            .json(credentials);
        let response = send(builder, false, "Login gagal").await?;
        parse_login(read_json(response).await?)
    }

    async fn register(&self, registration: &Registration) -> Result<(), ApiError> {
        let builder = self
            .call(Method::POST, &["auth", "register"], None)?
            .json(registration);
        send(builder, false, "Registrasi gagal").await?;
        Ok(())
    }

    async fn current_user(&self, token: &AuthToken) -> Result<User, ApiError> {
        let builder = self.call(Method::GET, &["auth", "me"], Some(token))?;
        let response = send(builder, true, "Gagal memuat profil").await?;
        decode_value(read_json(response).await?)
    }

    async fn record_step_progress(
        &self,
        token: &AuthToken,
        tutorial_id: &TutorialId,
        step_number: u32,
        completed: bool,
    ) -> Result<Progress, ApiError> {
        let builder = self
            .call(
                Method::POST,
                &["tutorials", tutorial_id.as_str(), "progress"],
                Some(token),
            )?
            .json(&ProgressPayload {
                step_number,
                completed,
            });
        let response = send(builder, true, "Gagal menyimpan progres").await?;
        parse_progress(read_json(response).await?)?
            .ok_or_else(|| ApiError::Decode("progress write returned no record".into()))
    }

    async fn get_progress(
        &self,
        token: &AuthToken,
        tutorial_id: &TutorialId,
    ) -> Result<Option<Progress>, ApiError> {
        let builder = self.call(
            Method::GET,
            &["tutorials", tutorial_id.as_str(), "progress"],
            Some(token),
        )?;
        match send(builder, true, "Gagal memuat progres").await {
            Ok(response) => parse_progress(read_json(response).await?),
            Err(ApiError::NotFound) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn list_user_progress(&self, token: &AuthToken) -> Result<Vec<Progress>, ApiError> {
        let builder = self.call(Method::GET, &["tutorials", "user", "progress"], Some(token))?;
        let response = send(builder, true, "Gagal memuat progres").await?;
        decode_value(read_json(response).await?)
    }

    async fn list_users(&self, token: &AuthToken) -> Result<Vec<User>, ApiError> {
        let builder = self.call(Method::GET, &["users"], Some(token))?;
        let response = send(builder, true, "Gagal memuat pengguna").await?;
        decode_value(read_json(response).await?)
    }

    async fn update_user(
        &self,
        token: &AuthToken,
        id: &UserId,
        patch: &UserPatch,
    ) -> Result<User, ApiError> {
        let builder = self
            .call(Method::PUT, &["users", id.as_str()], Some(token))?
            .json(patch);
        let response = send(builder, true, "Gagal memperbarui pengguna").await?;
        decode_value(read_json(response).await?)
    }

    async fn delete_user(&self, token: &AuthToken, id: &UserId) -> Result<(), ApiError> {
        let builder = self.call(Method::DELETE, &["users", id.as_str()], Some(token))?;
        send(builder, true, "Gagal menghapus pengguna").await?;
        Ok(())
    }

    async fn create_tutorial(
        &self,
        token: &AuthToken,
        tutorial: &NewTutorial,
    ) -> Result<Tutorial, ApiError> {
        let builder = self
            .call(Method::POST, &["tutorials"], Some(token))?
            .json(tutorial);
        let response = send(builder, true, "Gagal membuat tutorial").await?;
        decode_value(read_json(response).await?)
    }

    async fn update_tutorial(
        &self,
        token: &AuthToken,
        id: &TutorialId,
        patch: &TutorialPatch,
    ) -> Result<Tutorial, ApiError> {
        let builder = self
            .call(Method::PUT, &["tutorials", id.as_str()], Some(token))?
            .json(patch);
        let response = send(builder, true, "Gagal memperbarui tutorial").await?;
        decode_value(read_json(response).await?)
    }

    async fn delete_tutorial(&self, token: &AuthToken, id: &TutorialId) -> Result<(), ApiError> {
        let builder = self.call(Method::DELETE, &["tutorials", id.as_str()], Some(token))?;
        send(builder, true, "Gagal menghapus tutorial").await?;
        Ok(())
    }

    async fn replace_steps(
        &self,
        token: &AuthToken,
        id: &TutorialId,
        expected_version: u64,
        steps: &[Step],
    ) -> Result<Tutorial, ApiError> {
        let builder = self
            .call(Method::PUT, &["tutorials", id.as_str()], Some(token))?
            .header(IF_MATCH, expected_version.to_string())
            .json(&StepsPayload {
                steps,
                version: expected_version,
            });
        let response = send(builder, true, "Gagal menyimpan langkah").await?;
        decode_value(read_json(response).await?)
    }

    async fn upload_media(
        &self,
        token: &AuthToken,
        kind: MediaKind,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedMedia, ApiError> {
        let part = multipart::Part::bytes(bytes)
            .file_name(file_name.to_owned())
            .mime_str(kind.mime_for(file_name))
            .map_err(transport)?;
        let form = multipart::Form::new().part(kind.as_str(), part);
        let builder = self
            .call(Method::POST, &["upload", kind.as_str()], Some(token))?
            .multipart(form);
        let fallback = match kind {
            MediaKind::Image => "Gagal mengunggah gambar",
            MediaKind::Video => "Gagal mengunggah video",
        };
        let response = send(builder, true, fallback).await?;
        read_json(response).await
    }

    async fn delete_media(
        &self,
        token: &AuthToken,
        public_id: &str,
        kind: MediaKind,
    ) -> Result<(), ApiError> {
        let mut url = self.endpoint(&["upload", public_id])?;
        url.query_pairs_mut()
            .append_pair("resourceType", kind.as_str());
        send(
            self.request(Method::DELETE, url, Some(token)),
            true,
            "Gagal menghapus media",
        )
        .await?;
        Ok(())
    }
}
