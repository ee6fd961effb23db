//! Credential store: provisioning and loading the two credential files
//!
//! - the *app* file holds the application registration for one instance
//! - the *account* file holds the access token for one account
//!
//! Both are small JSON documents written with owner-only permissions.
//! The password used during provisioning is never stored or logged.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::CredentialPaths;
use crate::error::{CredentialError, PlatformError, Result};
use crate::platforms::mastodon::MastodonClient;
use crate::platforms::Platform;

pub const APP_NAME: &str = "tootbot";
const SCOPES: [&str; 2] = ["read", "write"];
const OOB_REDIRECT: &str = "urn:ietf:wg:oauth:2.0:oob";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub instance_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCredentials {
    pub username: String,
    pub access_token: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Register the app, log in with the account password and write both files
///
/// Prompts for the password on the terminal without echo.
pub async fn provision(instance_url: &str, username: &str, paths: &CredentialPaths) -> Result<()> {
    let password = rpassword::prompt_password("Mastodon password: ")
        .map_err(|e| CredentialError::Provisioning(format!("Failed to read password: {}", e)))?;

    provision_with_password(instance_url, username, &password, paths).await
}

/// Non-interactive half of [`provision`]
pub async fn provision_with_password(
    instance_url: &str,
    username: &str,
    password: &str,
    paths: &CredentialPaths,
) -> Result<()> {
    let app = register_app(instance_url).await?;
    write_json(&paths.app, &app)?;
    tracing::info!("Registered {} on {}", APP_NAME, instance_url);

    let access_token = log_in(&app, username, password).await?;
    let account = AccountCredentials {
        username: username.to_string(),
        access_token,
    };
    write_json(&paths.account, &account)?;
    tracing::info!("Stored access token for {}", username);

    Ok(())
}

async fn register_app(instance_url: &str) -> Result<AppCredentials> {
    let client = megalodon::generator(
        megalodon::SNS::Mastodon,
        instance_url.to_string(),
        None,
        None,
    )
    .map_err(|e| CredentialError::Provisioning(format!("Failed to create client: {:?}", e)))?;

    let options = megalodon::megalodon::AppInputOptions {
        scopes: Some(SCOPES.iter().map(|s| s.to_string()).collect()),
        redirect_uris: Some(OOB_REDIRECT.to_string()),
        ..Default::default()
    };

    let app = client
        .register_app(APP_NAME.to_string(), &options)
        .await
        .map_err(|e| CredentialError::Provisioning(format!("App registration failed: {}", e)))?;

    Ok(AppCredentials {
        client_id: app.client_id,
        client_secret: app.client_secret,
        instance_url: instance_url.to_string(),
    })
}

/// OAuth password grant
async fn log_in(app: &AppCredentials, username: &str, password: &str) -> Result<String> {
    let scope = SCOPES.join(" ");
    let form = [
        ("grant_type", "password"),
        ("client_id", app.client_id.as_str()),
        ("client_secret", app.client_secret.as_str()),
        ("username", username),
        ("password", password),
        ("scope", scope.as_str()),
    ];

    let response = reqwest::Client::new()
        .post(format!("{}/oauth/token", app.instance_url))
        .form(&form)
        .send()
        .await
        .map_err(|e| CredentialError::Provisioning(format!("Login request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(CredentialError::Provisioning(format!(
            "Login rejected with HTTP {}",
            status
        ))
        .into());
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| CredentialError::Provisioning(format!("Unexpected login response: {}", e)))?;

    Ok(token.access_token)
}

/// Read both credential files
pub fn read(paths: &CredentialPaths) -> Result<(AppCredentials, AccountCredentials)> {
    let app: AppCredentials = read_json(&paths.app)?;
    let account: AccountCredentials = read_json(&paths.account)?;

    if account.access_token.trim().is_empty() {
        return Err(CredentialError::Invalid(format!(
            "{}: access token is empty",
            paths.account.display()
        ))
        .into());
    }

    Ok((app, account))
}

/// Build an authenticated client from stored credentials
///
/// # Errors
///
/// `CredentialError` when a file is missing or malformed,
/// `PlatformError::Authentication` when the service rejects the token.
pub async fn load(paths: &CredentialPaths, instance_url: &str) -> Result<MastodonClient> {
    let (app, account) = read(paths)?;

    if app.instance_url != instance_url {
        tracing::warn!(
            "App credentials were registered on {} but {} was requested",
            app.instance_url,
            instance_url
        );
    }

    let mut client = MastodonClient::new(instance_url.to_string(), account.access_token)
        .map_err(|e| PlatformError::Authentication(e.to_string()))?;
    client.authenticate().await?;

    tracing::debug!("Authenticated as {} on {}", account.username, instance_url);
    Ok(client)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(CredentialError::NotFound(path.display().to_string()).into());
    }

    let content = std::fs::read_to_string(path).map_err(CredentialError::Io)?;
    serde_json::from_str(&content)
        .map_err(|e| CredentialError::Invalid(format!("{}: {}", path.display(), e)).into())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(CredentialError::Io)?;
        }
    }

    let content = serde_json::to_string_pretty(value)
        .map_err(|e| CredentialError::Invalid(e.to_string()))?;
    std::fs::write(path, content).map_err(CredentialError::Io)?;

    // Owner read/write only
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, perms).map_err(CredentialError::Io)?;
    }

    Ok(())
}
