// src/gmail_hub.rs

use google_gmail1::Gmail;
use yup_oauth2::{ApplicationSecret, InstalledFlowAuthenticator, InstalledFlowReturnMethod};

use crate::config::{Config, GmailConfig};
use crate::simple_refresh::manual_refresh;
use crate::simplestore::ConfigTokenStore;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use std::env;
use std::path::Path;
use time::{Duration, OffsetDateTime};
use tracing::info;
use yup_oauth2::storage::TokenInfo;

pub type GmailHub = Gmail<HttpsConnector<HttpConnector>>;

/// Build a Gmail hub from the `[gmail_oauth]` section. With `REFRESH=1` the
/// access token is refreshed first and written back to `config_path`;
/// otherwise yup-oauth2 refreshes through the token store once it expires.
pub async fn create_hub(
    gmail: &GmailConfig,
    config_path: &Path,
) -> Result<GmailHub, Box<dyn std::error::Error>> {
    let store = if env::var("REFRESH").is_ok_and(|v| v == "1") {
        info!("Refreshing Gmail access token");
        let token = manual_refresh(gmail).await?;
        let expires_at = OffsetDateTime::now_utc() + Duration::seconds(token.expires_in);
        Config::update_access_token(config_path, &token.access_token, Some(expires_at.unix_timestamp()))?;
        ConfigTokenStore::new(
            TokenInfo {
                access_token: Some(token.access_token),
                refresh_token: Some(gmail.tokens.refresh_token.clone()),
                expires_at: Some(expires_at),
                id_token: None,
            },
            config_path,
        )
    } else {
        ConfigTokenStore::from_config(gmail, config_path)
    };

    let secret = ApplicationSecret {
        client_id: gmail.client_id.clone(),
        client_secret: gmail.client_secret.clone(),
        token_uri: gmail.urls.token_url.clone(),
        auth_uri: gmail.urls.auth_url.clone(),
        redirect_uris: vec!["http://localhost".to_string()],
        project_id: None,
        client_email: None,
        auth_provider_x509_cert_url: None,
        client_x509_cert_url: None,
    };

    let auth = InstalledFlowAuthenticator::builder(secret, InstalledFlowReturnMethod::HTTPRedirect)
        .with_storage(Box::new(store))
        .build()
        .await?;

    let client = hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
        .build(
            hyper_rustls::HttpsConnectorBuilder::new()
                .with_webpki_roots()
                .https_or_http()
                .enable_http1()
                .build(),
        );

    Ok(Gmail::new(client, auth))
}
