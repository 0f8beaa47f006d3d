//! HTTP client for the provider API

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::config::UpstreamConfig;
use crate::credentials::Credentials;
use crate::error::{RelayError, Result};

use super::types::{
    ChannelListResponse, DeviceInfo, LiveUrlResponse, LoginResponse, RefreshSsoTokenResponse,
    RefreshTokenRequest, RefreshTokenResponse, SendOtpRequest, UpstreamChannel, VerifyOtpRequest,
};
use super::AuthApi;

const MAX_ERROR_BODY: usize = 256;

/// Shared client for every upstream call. Cheap to clone.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: Client,
    config: UpstreamConfig,
}

impl UpstreamClient {
    pub fn new(config: UpstreamConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &UpstreamConfig {
        &self.config
    }

    /// Fetch the built-in channel catalog.
    pub async fn fetch_channels(&self) -> Result<Vec<UpstreamChannel>> {
        let res = self.http.get(&self.config.channels_url).send().await?;
        let res = expect_success("channels", res).await?;
        let list: ChannelListResponse = read_json("channels", res).await?;

        tracing::debug!("Fetched {} built-in channels", list.result.len());
        Ok(list.result)
    }

    /// Resolve the upstream manifest URL for a built-in channel.
    pub async fn live_stream_url(
        &self,
        channel_id: &str,
        credentials: &Credentials,
        quality: Option<&str>,
    ) -> Result<String> {
        let res = self
            .http
            .post(&self.config.playback_url)
            .header("appkey", "NzNiMDhlYzQyNjJm")
            .header("devicetype", "phone")
            .header("os", "android")
            .header("deviceId", &self.config.device_id)
            .header("accesstoken", &credentials.access_token)
            .header("ssotoken", &credentials.sso_token)
            .header("uniqueId", &credentials.unique_id)
            .header("crmid", &credentials.crm)
            .header("userId", &credentials.crm)
            .header("subscriberId", &credentials.crm)
            .header("channel_id", channel_id)
            .form(&[("channel_id", channel_id), ("stream_type", "Seek")])
            .send()
            .await?;
        let res = expect_success("playback", res).await?;
        let live: LiveUrlResponse = read_json("playback", res).await?;

        live.url_for(quality)
            .map(str::to_string)
            .ok_or_else(|| RelayError::MalformedResponse {
                endpoint: "playback",
                reason: format!("no stream URL for channel {}", channel_id),
            })
    }

    /// Fetch a manifest body as text.
    pub async fn fetch_manifest(&self, url: &str) -> Result<String> {
        let res = self.http.get(url).send().await?;
        let res = expect_success("manifest", res).await?;
        Ok(res.text().await?)
    }
}

#[async_trait]
impl AuthApi for UpstreamClient {
    async fn refresh_access_token(&self, credentials: &Credentials) -> Result<String> {
        let body = RefreshTokenRequest {
            app_name: &self.config.app_name,
            device_id: &self.config.device_id,
            refresh_token: &credentials.refresh_token,
        };

        let res = self
            .http
            .post(&self.config.refresh_token_url)
            .header("accessToken", &credentials.access_token)
            .header("devicetype", "phone")
            .header("os", "android")
            .json(&body)
            .send()
            .await?;
        let res = expect_success("refreshtoken", res).await?;
        let parsed: RefreshTokenResponse = read_json("refreshtoken", res).await?;

        if parsed.access_token.is_empty() {
            return Err(RelayError::MalformedResponse {
                endpoint: "refreshtoken",
                reason: "missing authToken".to_string(),
            });
        }
        Ok(parsed.access_token)
    }

    async fn refresh_sso_token(&self, credentials: &Credentials) -> Result<String> {
        let res = self
            .http
            .get(&self.config.refresh_sso_url)
            .header("ssoToken", &credentials.sso_token)
            .header("uniqueId", &credentials.unique_id)
            .header("deviceId", &self.config.device_id)
            .send()
            .await?;
        let res = expect_success("refreshsso", res).await?;
        let parsed: RefreshSsoTokenResponse = read_json("refreshsso", res).await?;

        if parsed.sso_token.is_empty() {
            return Err(RelayError::MalformedResponse {
                endpoint: "refreshsso",
                reason: "missing ssoToken".to_string(),
            });
        }
        Ok(parsed.sso_token)
    }

    async fn send_otp(&self, number: &str) -> Result<()> {
        let body = SendOtpRequest {
            number: STANDARD.encode(number),
        };

        let res = self
            .http
            .post(&self.config.send_otp_url)
            .header("appname", &self.config.app_name)
            .header("os", "android")
            .header("devicetype", "phone")
            .json(&body)
            .send()
            .await?;
        expect_success("sendotp", res).await?;
        Ok(())
    }

    async fn verify_otp(&self, number: &str, otp: &str) -> Result<Credentials> {
        let body = VerifyOtpRequest {
            number: STANDARD.encode(number),
            otp: otp.to_string(),
            device_info: DeviceInfo::android(&self.config.device_id),
        };

        let res = self
            .http
            .post(&self.config.verify_otp_url)
            .header("appname", &self.config.app_name)
            .header("os", "android")
            .header("devicetype", "phone")
            .json(&body)
            .send()
            .await?;
        let res = expect_success("verifyotp", res).await?;
        let login: LoginResponse = read_json("verifyotp", res).await?;

        if login.auth_token.is_empty() || login.sso_token.is_empty() {
            return Err(RelayError::MalformedResponse {
                endpoint: "verifyotp",
                reason: "missing authToken or ssoToken".to_string(),
            });
        }

        let now = chrono::Utc::now().timestamp().to_string();
        Ok(Credentials {
            sso_token: login.sso_token,
            unique_id: login.session_attributes.user.unique,
            crm: login.session_attributes.user.subscriber_id,
            access_token: login.auth_token,
            refresh_token: login.refresh_token,
            last_token_refresh_time: now.clone(),
            last_sso_token_refresh_time: now,
        })
    }
}

async fn expect_success(endpoint: &'static str, res: reqwest::Response) -> Result<reqwest::Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }

    let body: String = res
        .text()
        .await
        .unwrap_or_default()
        .chars()
        .take(MAX_ERROR_BODY)
        .collect();
    tracing::warn!("Upstream {} answered {}", endpoint, status);

    Err(RelayError::UpstreamRejected {
        endpoint,
        status: status.as_u16(),
        body,
    })
}

async fn read_json<T: DeserializeOwned>(endpoint: &'static str, res: reqwest::Response) -> Result<T> {
    let bytes = res.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| RelayError::MalformedResponse {
        endpoint,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{HeaderMap, StatusCode},
        routing::{get, post},
        Form, Json, Router,
    };
    use std::collections::HashMap;

    async fn spawn_upstream() -> String {
        let app = Router::new()
            .route(
                "/refresh",
                post(|headers: HeaderMap, Json(body): Json<serde_json::Value>| async move {
                    let ok = headers.get("accessToken").is_some()
                        && body["refreshToken"] == "refresh"
                        && body["appName"] == "RJIL_JioTV";
                    if ok {
                        (StatusCode::OK, Json(serde_json::json!({"authToken": "fresh-access"})))
                    } else {
                        (StatusCode::UNAUTHORIZED, Json(serde_json::json!({"message": "bad"})))
                    }
                }),
            )
            .route(
                "/sso",
                get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
            )
            .route("/otp/send", post(|| async { StatusCode::NO_CONTENT }))
            .route(
                "/otp/verify",
                post(|Json(body): Json<serde_json::Value>| async move {
                    if body["otp"] != "123456" {
                        return Json(serde_json::json!({}));
                    }
                    Json(serde_json::json!({
                        "authToken": "access",
                        "refreshToken": "refresh",
                        "ssoToken": "sso",
                        "sessionAttributes": {"user": {"subscriberId": "sub", "unique": "uniq"}}
                    }))
                }),
            )
            .route(
                "/channels",
                get(|| async {
                    Json(serde_json::json!({"result": [
                        {"channel_id": 1, "channel_name": "One", "logoUrl": "1.png",
                         "channelCategoryId": 5, "channelLanguageId": 1, "isHD": false}
                    ]}))
                }),
            )
            .route(
                "/playback",
                post(|Form(form): Form<HashMap<String, String>>| async move {
                    let id = form.get("channel_id").cloned().unwrap_or_default();
                    Json(serde_json::json!({
                        "result": format!("https://cdn.test/{}/master.m3u8", id),
                        "bitrates": {"auto": "", "high": format!("https://cdn.test/{}/high.m3u8", id)}
                    }))
                }),
            )
            .route("/bad-json", get(|| async { "not json" }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client(base: &str) -> UpstreamClient {
        UpstreamClient::new(UpstreamConfig {
            refresh_token_url: format!("{}/refresh", base),
            refresh_sso_url: format!("{}/sso", base),
            send_otp_url: format!("{}/otp/send", base),
            verify_otp_url: format!("{}/otp/verify", base),
            channels_url: format!("{}/channels", base),
            playback_url: format!("{}/playback", base),
            ..Default::default()
        })
        .unwrap()
    }

    fn creds() -> Credentials {
        Credentials {
            access_token: "old".to_string(),
            refresh_token: "refresh".to_string(),
            sso_token: "sso".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_refresh_access_token() {
        let base = spawn_upstream().await;
        let token = client(&base).refresh_access_token(&creds()).await.unwrap();
        assert_eq!(token, "fresh-access");
    }

    #[tokio::test]
    async fn test_refresh_rejected() {
        let base = spawn_upstream().await;
        let mut bad = creds();
        bad.refresh_token = "revoked".to_string();

        let err = client(&base).refresh_access_token(&bad).await.unwrap_err();
        assert!(matches!(err, RelayError::UpstreamRejected { status: 401, .. }));
        assert!(err.is_auth_failure());
    }

    #[tokio::test]
    async fn test_sso_server_error_is_transient() {
        let base = spawn_upstream().await;
        let err = client(&base).refresh_sso_token(&creds()).await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_otp_login() {
        let base = spawn_upstream().await;
        let api = client(&base);

        api.send_otp("+919999999999").await.unwrap();
        let creds = api.verify_otp("+919999999999", "123456").await.unwrap();
        assert_eq!(creds.access_token, "access");
        assert_eq!(creds.crm, "sub");
        assert_eq!(creds.unique_id, "uniq");
        assert!(!creds.last_token_refresh_time.is_empty());
        assert_eq!(creds.last_token_refresh_time, creds.last_sso_token_refresh_time);
    }

    #[tokio::test]
    async fn test_wrong_otp_is_malformed() {
        let base = spawn_upstream().await;
        let err = client(&base)
            .verify_otp("+919999999999", "000000")
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn test_fetch_channels_and_playback() {
        let base = spawn_upstream().await;
        let api = client(&base);

        let channels = api.fetch_channels().await.unwrap();
        assert_eq!(channels[0].channel_name, "One");

        let url = api.live_stream_url("143", &creds(), None).await.unwrap();
        assert_eq!(url, "https://cdn.test/143/master.m3u8");
        let url = api.live_stream_url("143", &creds(), Some("high")).await.unwrap();
        assert_eq!(url, "https://cdn.test/143/high.m3u8");
    }

    #[tokio::test]
    async fn test_undecodable_body() {
        let base = spawn_upstream().await;
        let api = UpstreamClient::new(UpstreamConfig {
            channels_url: format!("{}/bad-json", base),
            ..Default::default()
        })
        .unwrap();

        let err = api.fetch_channels().await.unwrap_err();
        assert!(matches!(err, RelayError::MalformedResponse { endpoint: "channels", .. }));
    }

    #[tokio::test]
    async fn test_unreachable_is_transport() {
        let api = UpstreamClient::new(UpstreamConfig {
            refresh_token_url: "http://127.0.0.1:1/refresh".to_string(),
            timeout_secs: 2,
            ..Default::default()
        })
        .unwrap();

        let err = api.refresh_access_token(&creds()).await.unwrap_err();
        assert!(matches!(err, RelayError::Transport(_)));
        assert!(err.is_transient());
    }
}
