use async_trait::async_trait;
use codelab_api_types::AnalyticsQuery;
use codelab_api_types::AnalyticsRowPage;
use codelab_api_types::AnalyticsSummary;
use codelab_api_types::AuthPayload;
use codelab_api_types::LoginRequest;
use codelab_api_types::RefreshPayload;
use codelab_api_types::ResetPasswordRequest;
use codelab_api_types::Submission;
use codelab_api_types::SubmissionPage;
use codelab_api_types::SubmissionResult;
use codelab_api_types::SubmitRequest;
use codelab_api_types::User;
use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::http::HttpClient;
use crate::session::Session;

/// The slice of the API the submission runner needs, kept behind a trait so
/// the lifecycle can be driven against scripted fakes in tests.
#[async_trait]
pub trait JudgeApi: Send + Sync {
    async fn submit(&self, request: SubmitRequest) -> Result<Submission, ApiError>;
    async fn fetch_result(&self, id: &str) -> Result<SubmissionResult, ApiError>;
}

pub struct AvatarUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub avatar: Option<AvatarUpload>,
}

/// Authenticated client for the lab API.
///
/// Every authenticated call carries the session's current access token and,
/// on an authorization failure, performs exactly one refresh-and-retry cycle
/// before surfacing the failure. Not a retry framework: one refresh, one
/// retry, then the caller decides (typically by routing to the login view).
#[derive(Debug, Clone)]
pub struct LabClient {
    http: HttpClient,
    session: Session,
}

impl LabClient {
    pub fn new(http: HttpClient, session: Session) -> LabClient {
        LabClient { http, session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    async fn send_authed<T, F>(&self, build: F) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        F: Fn(&HttpClient) -> reqwest::RequestBuilder,
    {
        let token = self.session.access_token().await.unwrap_or_default();

        match self.http.send(build(&self.http).bearer_auth(&token)).await {
            Err(err) if err.is_auth_failure() => {
                log::debug!("authorization failure, attempting one token refresh");
                let fresh = self.refresh_token().await?;
                self.http.send(build(&self.http).bearer_auth(&fresh)).await
            }
            other => other,
        }
    }

    async fn send_authed_empty<F>(&self, build: F) -> Result<(), ApiError>
    where
        F: Fn(&HttpClient) -> reqwest::RequestBuilder,
    {
        let token = self.session.access_token().await.unwrap_or_default();

        match self
            .http
            .send_empty(build(&self.http).bearer_auth(&token))
            .await
        {
            Err(err) if err.is_auth_failure() => {
                log::debug!("authorization failure, attempting one token refresh");
                let fresh = self.refresh_token().await?;
                self.http
                    .send_empty(build(&self.http).bearer_auth(&fresh))
                    .await
            }
            other => other,
        }
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<AuthPayload, ApiError> {
        let payload: AuthPayload = self
            .http
            .send(self.http.post("users/login").json(request))
            .await?;

        self.session.apply_login(payload.clone()).await;
        Ok(payload)
    }

    pub async fn register(&self, form: &RegisterForm) -> Result<User, ApiError> {
        let mut multipart = reqwest::multipart::Form::new()
            .text("username", form.username.clone())
            .text("email", form.email.clone())
            .text("password", form.password.clone());

        if let Some(avatar) = &form.avatar {
            let part = reqwest::multipart::Part::bytes(avatar.bytes.clone())
                .file_name(avatar.filename.clone());
            multipart = multipart.part("avatar", part);
        }

        self.http
            .send(self.http.post("users/register").multipart(multipart))
            .await
    }

    /// One silent token refresh, cookie-credentialed. Updates the session on
    /// success and returns the fresh token.
    pub async fn refresh_token(&self) -> Result<String, ApiError> {
        let payload: RefreshPayload = self
            .http
            .send(self.http.get("users/refresh-token"))
            .await?;

        self.session
            .apply_refresh(payload.access_token.clone())
            .await;
        Ok(payload.access_token)
    }

    /// Clears local state first; a failed server-side logout only gets logged.
    pub async fn logout(&self) {
        self.session.clear().await;

        if let Err(err) = self.http.send_empty(self.http.get("users/logout")).await {
            log::warn!("server-side logout failed: {err}");
        }
    }

    pub async fn submissions(&self, page: u32, count: u32) -> Result<SubmissionPage, ApiError> {
        self.send_authed(|http| {
            http.get("submissions")
                .query(&[("page", page), ("count", count)])
        })
        .await
    }

    pub async fn analytics(&self) -> Result<AnalyticsSummary, ApiError> {
        self.send_authed(|http| http.get("submissions/analytics"))
            .await
    }

    pub async fn analytics_rows(
        &self,
        query: &AnalyticsQuery,
    ) -> Result<AnalyticsRowPage, ApiError> {
        self.send_authed(|http| http.get("submissions/analytics-submission").query(query))
            .await
    }

    pub async fn reset_password(&self, request: &ResetPasswordRequest) -> Result<(), ApiError> {
        self.send_authed_empty(|http| http.post("users/reset-password").json(request))
            .await
    }

    pub async fn reset_avatar(&self, avatar: &AvatarUpload) -> Result<User, ApiError> {
        self.send_authed(|http| {
            let part = reqwest::multipart::Part::bytes(avatar.bytes.clone())
                .file_name(avatar.filename.clone());
            let multipart = reqwest::multipart::Form::new().part("avatar", part);
            http.post("users/reset-avatar").multipart(multipart)
        })
        .await
    }
}

#[async_trait]
impl JudgeApi for LabClient {
    async fn submit(&self, request: SubmitRequest) -> Result<Submission, ApiError> {
        self.send_authed(|http| http.post("submissions/submit").json(&request))
            .await
    }

    async fn fetch_result(&self, id: &str) -> Result<SubmissionResult, ApiError> {
        self.send_authed(|http| http.get(&format!("submissions/result/{id}")))
            .await
    }
}
