//! SSO and OAuth endpoint locations.

use crate::error::ConfigurationError;

const GARMIN_SSO_ORIGIN: &str = "https://sso.garmin.com";
const GARMIN_API_ORIGIN: &str = "https://connectapi.garmin.com";

const SSO_PATH: &str = "/sso";
const PREAUTHORIZED_PATH: &str = "/oauth-service/oauth/preauthorized";
const EXCHANGE_PATH: &str = "/oauth-service/oauth/exchange/user/2.0";

/// URLs used by the login flow.
///
/// [`Endpoints::garmin`] is the production set. [`Endpoints::with_hosts`]
/// keeps the same paths on other origins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    sso_base: String,
    api_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::garmin()
    }
}

impl Endpoints {
    /// Production Garmin endpoints.
    #[must_use]
    pub fn garmin() -> Self {
        Self {
            sso_base: format!("{GARMIN_SSO_ORIGIN}{SSO_PATH}"),
            api_base: GARMIN_API_ORIGIN.to_string(),
        }
    }

    /// Same paths rooted at `sso_origin` and `api_origin`
    /// (for example `http://127.0.0.1:8080`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidSetting`] when an origin is not an
    /// absolute http(s) URL.
    pub fn with_hosts(sso_origin: &str, api_origin: &str) -> Result<Self, ConfigurationError> {
        Ok(Self {
            sso_base: format!("{}{SSO_PATH}", normalize_origin("sso_origin", sso_origin)?),
            api_base: normalize_origin("api_origin", api_origin)?,
        })
    }

    /// SSO base URL, also sent as `gauthHost`.
    #[must_use]
    pub fn sso_base(&self) -> &str {
        &self.sso_base
    }

    /// API origin hosting the OAuth service and data endpoints.
    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Embed widget URL, used to seed cookies and as the OAuth1 `login-url`.
    #[must_use]
    pub fn embed_url(&self) -> String {
        format!("{}/embed", self.sso_base)
    }

    /// Sign-in form URL.
    #[must_use]
    pub fn signin_url(&self) -> String {
        format!("{}/signin", self.sso_base)
    }

    /// Pre-authorized OAuth1 exchange URL.
    #[must_use]
    pub fn preauthorized_url(&self) -> String {
        format!("{}{PREAUTHORIZED_PATH}", self.api_base)
    }

    /// OAuth1 to OAuth2 exchange URL.
    #[must_use]
    pub fn exchange_url(&self) -> String {
        format!("{}{EXCHANGE_PATH}", self.api_base)
    }

    /// Absolute API URL for `path`.
    #[must_use]
    pub fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }

    /// Query parameters for the embed bootstrap.
    #[must_use]
    pub fn embed_params(&self) -> Vec<(String, String)> {
        vec![
            ("id".to_string(), "gauth-widget".to_string()),
            ("embedWidget".to_string(), "true".to_string()),
            ("gauthHost".to_string(), self.sso_base.clone()),
        ]
    }

    /// Query parameters for the sign-in page and credential submit.
    #[must_use]
    pub fn signin_params(&self) -> Vec<(String, String)> {
        let embed = self.embed_url();
        let mut params = self.embed_params();
        for (key, value) in &mut params {
            if key == "gauthHost" {
                value.clone_from(&embed);
            }
        }
        for key in [
            "service",
            "source",
            "redirectAfterAccountLoginUrl",
            "redirectAfterAccountCreationUrl",
        ] {
            params.push((key.to_string(), embed.clone()));
        }
        params
    }
}

fn normalize_origin(name: &'static str, origin: &str) -> Result<String, ConfigurationError> {
    let parsed = url::Url::parse(origin)
        .map_err(|e| ConfigurationError::invalid_setting(name, e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ConfigurationError::invalid_setting(
            name,
            format!("expected an http(s) origin, got '{origin}'"),
        ));
    }
    Ok(origin.trim_end_matches('/').to_string())
}
