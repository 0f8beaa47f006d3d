//! Wire shapes of the upstream provider API

use serde::{Deserialize, Serialize};

/// POST body for the refresh-access-token call
#[derive(Debug, Serialize)]
pub struct RefreshTokenRequest<'a> {
    #[serde(rename = "appName")]
    pub app_name: &'a str,
    #[serde(rename = "deviceId")]
    pub device_id: &'a str,
    #[serde(rename = "refreshToken")]
    pub refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct RefreshTokenResponse {
    #[serde(rename = "authToken", default)]
    pub access_token: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshSsoTokenResponse {
    #[serde(rename = "ssoToken", default)]
    pub sso_token: String,
}

#[derive(Debug, Serialize)]
pub struct SendOtpRequest {
    /// base64 of the full number including country prefix
    pub number: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyOtpRequest {
    pub number: String,
    pub otp: String,
    #[serde(rename = "deviceInfo")]
    pub device_info: DeviceInfo,
}

#[derive(Debug, Serialize)]
pub struct DeviceInfo {
    #[serde(rename = "consumptionDeviceName")]
    pub consumption_device_name: String,
    pub info: DeviceInfoDetails,
}

#[derive(Debug, Serialize)]
pub struct DeviceInfoDetails {
    #[serde(rename = "type")]
    pub kind: String,
    pub platform: DevicePlatform,
    #[serde(rename = "androidId")]
    pub android_id: String,
}

#[derive(Debug, Serialize)]
pub struct DevicePlatform {
    pub name: String,
    pub version: String,
}

impl DeviceInfo {
    pub fn android(device_id: &str) -> Self {
        Self {
            consumption_device_name: "ZUK Z1".to_string(),
            info: DeviceInfoDetails {
                kind: "android".to_string(),
                platform: DevicePlatform {
                    name: "ham".to_string(),
                    version: "8.0.0".to_string(),
                },
                android_id: device_id.to_string(),
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginResponse {
    #[serde(rename = "authToken")]
    pub auth_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
    #[serde(rename = "ssoToken")]
    pub sso_token: String,
    #[serde(rename = "sessionAttributes")]
    pub session_attributes: SessionAttributes,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SessionAttributes {
    pub user: SessionUser,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SessionUser {
    #[serde(rename = "subscriberId")]
    pub subscriber_id: String,
    pub unique: String,
}

/// Built-in catalog response
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChannelListResponse {
    pub result: Vec<UpstreamChannel>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpstreamChannel {
    pub channel_id: i64,
    pub channel_name: String,
    #[serde(rename = "logoUrl")]
    pub logo_url: String,
    #[serde(rename = "channelCategoryId")]
    pub category_id: i32,
    #[serde(rename = "channelLanguageId")]
    pub language_id: i32,
    #[serde(rename = "isHD")]
    pub is_hd: bool,
}

/// Playback URL response
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LiveUrlResponse {
    pub result: String,
    pub bitrates: Bitrates,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Bitrates {
    pub auto: String,
    pub high: String,
    pub medium: String,
    pub low: String,
}

impl LiveUrlResponse {
    /// Pick the variant for a quality hint, falling back to the master URL.
    pub fn url_for(&self, quality: Option<&str>) -> Option<&str> {
        let pick = match quality.map(str::to_ascii_lowercase).as_deref() {
            Some("high") | Some("h") => &self.bitrates.high,
            Some("medium") | Some("m") => &self.bitrates.medium,
            Some("low") | Some("l") => &self.bitrates.low,
            _ => &self.bitrates.auto,
        };

        [pick.as_str(), self.result.as_str()]
            .into_iter()
            .find(|u| !u.is_empty())
    }
}
