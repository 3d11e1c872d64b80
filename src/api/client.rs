//! Check-in Server Client
//!
//! HTTP client for the check-in server's JSON endpoints.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::dto::{
    CheckinReceipt, CheckinRequest, CheckinResponse, DeleteReceipt, DeleteResponse, Envelope,
    HistoryViewResponse, NewCheckin, Project, ProjectId, ProjectResponse, RecentCheckin,
    RecentCheckinsResponse,
};
use super::error::{ClientError, ClientResult};
use super::CheckinApi;
use crate::config::Config;
use crate::fragment::Fragment;
use crate::timezone;

/// Header the server uses to tell partial requests from page loads
pub const AJAX_HEADER: &str = "X-Requested-With";
pub const AJAX_HEADER_VALUE: &str = "XMLHttpRequest";
pub const CSRF_HEADER: &str = "X-CSRFToken";
/// Hidden form field the server renders the CSRF token into
pub const CSRF_FIELD: &str = "csrf_token";

/// Configuration for the check-in client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the check-in server (e.g., "http://localhost:5000")
    pub base_url: String,
    /// Token attached to state-changing requests
    pub csrf_token: Option<String>,
    /// Raw `name=value` session cookie
    pub session_cookie: Option<String>,
    /// IANA zone reported through the `timezone` cookie
    pub timezone: String,
    /// Unset means no timeout
    pub request_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            csrf_token: None,
            session_cookie: None,
            timezone: "UTC".to_string(),
            request_timeout: None,
        }
    }
}

impl ClientConfig {
    /// Build from the application config, resolving the host time zone
    pub fn from_config(config: &Config) -> Self {
        let timezone = config
            .timezone
            .name
            .clone()
            .unwrap_or_else(|| timezone::resolve(&config.timezone.default));

        Self {
            base_url: config.server.base_url.clone(),
            csrf_token: config.server.csrf_token.clone(),
            session_cookie: config.server.session_cookie.clone(),
            timezone,
            request_timeout: config.server.request_timeout(),
        }
    }
}

/// reqwest-backed implementation of [`CheckinApi`]
pub struct CheckinClient {
    client: Client,
    base: Url,
    config: ClientConfig,
}

impl CheckinClient {
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        let base = Url::parse(&config.base_url).map_err(|e| ClientError::InvalidUrl {
            url: config.base_url.clone(),
            error: e.to_string(),
        })?;

        Ok(Self {
            client,
            base,
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn with_csrf_token(mut self, token: impl Into<String>) -> Self {
        self.config.csrf_token = Some(token.into());
        self
    }

    /// Resolve a server-relative URL (as found in links and form actions)
    pub fn resolve(&self, url: &str) -> ClientResult<Url> {
        self.base.join(url).map_err(|e| ClientError::InvalidUrl {
            url: url.to_string(),
            error: e.to_string(),
        })
    }

    /// Read the CSRF token a server-rendered page embeds in its forms
    pub async fn fetch_csrf_token(&self, page: &str) -> ClientResult<Option<String>> {
        let url = self.resolve(page)?;
        tracing::debug!(url = %url, "Fetching CSRF token");

        let response = self
            .with_cookies(self.client.get(url))
            .send()
            .await
            .map_err(ClientError::from_reqwest)?;
        let html = response.text().await.map_err(ClientError::from_reqwest)?;

        Ok(Fragment::parse(html).input_value(CSRF_FIELD))
    }

    fn cookie_header(&self) -> String {
        let mut cookie = timezone::cookie(&self.config.timezone);
        if let Some(session) = &self.config.session_cookie {
            cookie.push_str("; ");
            cookie.push_str(session);
        }
        cookie
    }

    fn with_cookies(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(reqwest::header::COOKIE, self.cookie_header())
    }

    fn get(&self, url: Url) -> RequestBuilder {
        self.with_cookies(self.client.get(url))
            .header(AJAX_HEADER, AJAX_HEADER_VALUE)
    }

    fn post(&self, url: Url) -> RequestBuilder {
        let request = self
            .with_cookies(self.client.post(url))
            .header(AJAX_HEADER, AJAX_HEADER_VALUE);
        match &self.config.csrf_token {
            Some(token) => request.header(CSRF_HEADER, token),
            None => request,
        }
    }

    /// Send a request and unwrap the `{success, message}` envelope
    async fn send<T>(&self, request: RequestBuilder) -> ClientResult<T>
    where
        T: DeserializeOwned + Envelope,
    {
        let response = request.send().await.map_err(ClientError::from_reqwest)?;
        let status = response.status();
        let body = response.text().await.map_err(ClientError::from_reqwest)?;

        let parsed: T = serde_json::from_str(&body).map_err(|e| ClientError::Decode {
            status: status.as_u16(),
            error: e.to_string(),
        })?;

        if parsed.success() {
            Ok(parsed)
        } else {
            tracing::debug!(status = %status, message = ?parsed.message(), "Server declined request");
            Err(ClientError::declared(parsed.message()))
        }
    }

    fn multipart_form(checkin: &NewCheckin) -> ClientResult<Form> {
        let mut form = Form::new()
            .text("project_id", checkin.project_id.to_string())
            .text("note", checkin.note.clone());

        for image in &checkin.images {
            let part = Part::bytes(image.bytes.clone())
                .file_name(image.file_name.clone())
                .mime_str(image.content_type())?;
            form = form.part("images[]", part);
        }

        Ok(form)
    }
}

#[async_trait]
impl CheckinApi for CheckinClient {
    async fn submit_checkin(&self, checkin: &NewCheckin) -> ClientResult<CheckinReceipt> {
        let url = self.resolve("/checkin/api/checkin")?;
        tracing::debug!(
            project_id = checkin.project_id,
            images = checkin.images.len(),
            "Submitting check-in"
        );

        let request = if checkin.images.is_empty() {
            self.post(url).json(&CheckinRequest {
                project_id: checkin.project_id.to_string(),
                note: &checkin.note,
            })
        } else {
            self.post(url).multipart(Self::multipart_form(checkin)?)
        };

        let response: CheckinResponse = self.send(request).await?;
        Ok(CheckinReceipt {
            message: response.message,
            images_added: response.images_added.unwrap_or(0),
        })
    }

    async fn project(&self, project_id: ProjectId) -> ClientResult<Project> {
        let url = self.resolve(&format!("/checkin/api/project/{}", project_id))?;
        let response: ProjectResponse = self.send(self.get(url)).await?;

        let mut project = response.project.ok_or_else(|| ClientError::Decode {
            status: 200,
            error: "missing field `project`".to_string(),
        })?;
        project.id.get_or_insert(project_id);
        Ok(project)
    }

    async fn recent_checkins(&self, project_id: ProjectId) -> ClientResult<Vec<RecentCheckin>> {
        let url = self.resolve(&format!("/checkin/api/recent-checkins/{}", project_id))?;
        let response: RecentCheckinsResponse = self.send(self.get(url)).await?;
        Ok(response.recent_checkins)
    }

    async fn history_view(&self, url: &str) -> ClientResult<String> {
        let url = self.resolve(url)?;
        let response: HistoryViewResponse = self.send(self.get(url)).await?;
        Ok(response.html.unwrap_or_default())
    }

    async fn delete_checkin(
        &self,
        action: &str,
        fields: &[(String, String)],
    ) -> ClientResult<DeleteReceipt> {
        let url = self.resolve(action)?;

        let mut fields = fields.to_vec();
        if let Some(token) = &self.config.csrf_token {
            if !fields.iter().any(|(name, _)| name == CSRF_FIELD) {
                fields.push((CSRF_FIELD.to_string(), token.clone()));
            }
        }

        let response: DeleteResponse = self.send(self.post(url).form(&fields)).await?;
        Ok(DeleteReceipt {
            message: response.message,
            dashboard_url: response.dashboard_url,
        })
    }
}
