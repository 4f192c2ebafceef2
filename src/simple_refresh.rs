// src/simple_refresh.rs

use crate::config::GmailConfig;
use serde::Deserialize;
use tracing::warn;
use urlencoding::encode;

#[derive(Deserialize, Debug)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
    pub token_type: String,
}

/// Exchange the stored refresh token for a new access token.
pub async fn manual_refresh(gmail: &GmailConfig) -> Result<TokenResponse, Box<dyn std::error::Error>> {
    let client = reqwest::Client::new();

    let body = refresh_body(gmail);

    let resp = client
        .post(&gmail.urls.token_url)
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body(body)
        .send()
        .await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let error_text = resp.text().await?;
        warn!(status = %status, body = %error_text, "Token refresh rejected");
        return Err(error_text.into());
    }

    let token_resp: TokenResponse = resp.json().await?;
    Ok(token_resp)
}

fn refresh_body(gmail: &GmailConfig) -> String {
    format!(
        "client_id={}&client_secret={}&refresh_token={}&grant_type=refresh_token",
        encode(&gmail.client_id),
        encode(&gmail.client_secret),
        encode(&gmail.tokens.refresh_token),
    )
}
