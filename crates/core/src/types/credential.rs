//! Marketplace credential types.
//!
//! Credentials are owned by an organization and scoped to one marketplace.
//! Secret material is held in [`SecretString`] so it never ends up in logs.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::id::OrganizationId;
use super::marketplace::Marketplace;

/// A credential field a marketplace may require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialField {
    ApiKey,
    ApiSecret,
    AccessToken,
    RefreshToken,
    SellerId,
    StoreUrl,
    MerchantWarehouseId,
}

impl CredentialField {
    /// Field name as it appears in credential payloads and error messages.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ApiKey => "apiKey",
            Self::ApiSecret => "apiSecret",
            Self::AccessToken => "accessToken",
            Self::RefreshToken => "refreshToken",
            Self::SellerId => "sellerId",
            Self::StoreUrl => "storeUrl",
            Self::MerchantWarehouseId => "merchantWarehouseId",
        }
    }
}

impl std::fmt::Display for CredentialField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An access token obtained from a marketplace token refresh.
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// Bearer token value.
    pub token: SecretString,
    /// When the token stops being accepted, if the marketplace says.
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// Create a token.
    #[must_use]
    pub fn new(token: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            token: SecretString::from(token.into()),
            expires_at,
        }
    }

    /// Whether the token expires within `seconds` from now.
    #[must_use]
    pub fn expires_within(&self, seconds: i64) -> bool {
        self.expires_at
            .is_some_and(|at| at <= Utc::now() + chrono::Duration::seconds(seconds))
    }
}

/// Credentials for one organization's connection to one marketplace.
///
/// Implements `Debug` manually to redact secrets. Deserializes from the
/// camelCase JSON shape the dashboard submits on connector setup.
#[derive(Clone)]
pub struct ConnectorCredentials {
    /// Organization that owns these credentials.
    pub organization_id: OrganizationId,
    /// Marketplace the credentials are for.
    pub marketplace: Marketplace,
    /// API key (Takealot/Wantitall key, WooCommerce consumer key).
    pub api_key: Option<SecretString>,
    /// API secret (WooCommerce consumer secret).
    pub api_secret: Option<SecretString>,
    /// OAuth-style access token, rotated on refresh.
    pub access_token: Option<SecretString>,
    /// Refresh token used to obtain new access tokens.
    pub refresh_token: Option<SecretString>,
    /// Access token expiry, if known.
    pub token_expires_at: Option<DateTime<Utc>>,
    /// Seller account identifier.
    pub seller_id: Option<String>,
    /// Store base URL (self-hosted stores).
    pub store_url: Option<String>,
    /// Warehouse used for stock updates.
    pub merchant_warehouse_id: Option<String>,
    /// Marketplace-specific extras.
    pub extra: HashMap<String, String>,
}

impl ConnectorCredentials {
    /// Create empty credentials for an organization and marketplace.
    #[must_use]
    pub fn new(organization_id: OrganizationId, marketplace: Marketplace) -> Self {
        Self {
            organization_id,
            marketplace,
            api_key: None,
            api_secret: None,
            access_token: None,
            refresh_token: None,
            token_expires_at: None,
            seller_id: None,
            store_url: None,
            merchant_warehouse_id: None,
            extra: HashMap::new(),
        }
    }

    /// Set the API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(key.into()));
        self
    }

    /// Set the API secret.
    #[must_use]
    pub fn with_api_secret(mut self, secret: impl Into<String>) -> Self {
        self.api_secret = Some(SecretString::from(secret.into()));
        self
    }

    /// Set the access token.
    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(SecretString::from(token.into()));
        self
    }

    /// Set the refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(SecretString::from(token.into()));
        self
    }

    /// Set the seller id.
    #[must_use]
    pub fn with_seller_id(mut self, seller_id: impl Into<String>) -> Self {
        self.seller_id = Some(seller_id.into());
        self
    }

    /// Set the store URL.
    #[must_use]
    pub fn with_store_url(mut self, url: impl Into<String>) -> Self {
        self.store_url = Some(url.into());
        self
    }

    /// Set the merchant warehouse id.
    #[must_use]
    pub fn with_merchant_warehouse_id(mut self, id: impl Into<String>) -> Self {
        self.merchant_warehouse_id = Some(id.into());
        self
    }

    /// Whether a field is present and non-blank.
    #[must_use]
    pub fn has(&self, field: CredentialField) -> bool {
        fn secret_present(value: Option<&SecretString>) -> bool {
            value.is_some_and(|s| !s.expose_secret().trim().is_empty())
        }
        fn plain_present(value: Option<&String>) -> bool {
            value.is_some_and(|s| !s.trim().is_empty())
        }

        match field {
            CredentialField::ApiKey => secret_present(self.api_key.as_ref()),
            CredentialField::ApiSecret => secret_present(self.api_secret.as_ref()),
            CredentialField::AccessToken => secret_present(self.access_token.as_ref()),
            CredentialField::RefreshToken => secret_present(self.refresh_token.as_ref()),
            CredentialField::SellerId => plain_present(self.seller_id.as_ref()),
            CredentialField::StoreUrl => plain_present(self.store_url.as_ref()),
            CredentialField::MerchantWarehouseId => {
                plain_present(self.merchant_warehouse_id.as_ref())
            }
        }
    }

    /// Required fields that are absent or blank, in the order given.
    #[must_use]
    pub fn missing_fields(&self, required: &[CredentialField]) -> Vec<CredentialField> {
        required.iter().copied().filter(|f| !self.has(*f)).collect()
    }

    /// Replace the access token after a successful refresh.
    pub fn rotate_access_token(&mut self, token: AccessToken) {
        self.access_token = Some(token.token);
        self.token_expires_at = token.expires_at;
    }
}

impl std::fmt::Debug for ConnectorCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn redact(value: Option<&SecretString>) -> &'static str {
            if value.is_some() { "[REDACTED]" } else { "None" }
        }

        f.debug_struct("ConnectorCredentials")
            .field("organization_id", &self.organization_id)
            .field("marketplace", &self.marketplace)
            .field("api_key", &redact(self.api_key.as_ref()))
            .field("api_secret", &redact(self.api_secret.as_ref()))
            .field("access_token", &redact(self.access_token.as_ref()))
            .field("refresh_token", &redact(self.refresh_token.as_ref()))
            .field("token_expires_at", &self.token_expires_at)
            .field("seller_id", &self.seller_id)
            .field("store_url", &self.store_url)
            .field("merchant_warehouse_id", &self.merchant_warehouse_id)
            .finish_non_exhaustive()
    }
}

/// Wire shape of submitted credentials.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CredentialsPayload {
    organization_id: OrganizationId,
    marketplace: Marketplace,
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    api_secret: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    token_expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    seller_id: Option<String>,
    #[serde(default)]
    store_url: Option<String>,
    #[serde(default)]
    merchant_warehouse_id: Option<String>,
    #[serde(default)]
    extra: HashMap<String, String>,
}

impl From<CredentialsPayload> for ConnectorCredentials {
    fn from(payload: CredentialsPayload) -> Self {
        Self {
            organization_id: payload.organization_id,
            marketplace: payload.marketplace,
            api_key: payload.api_key.map(SecretString::from),
            api_secret: payload.api_secret.map(SecretString::from),
            access_token: payload.access_token.map(SecretString::from),
            refresh_token: payload.refresh_token.map(SecretString::from),
            token_expires_at: payload.token_expires_at,
            seller_id: payload.seller_id,
            store_url: payload.store_url,
            merchant_warehouse_id: payload.merchant_warehouse_id,
            extra: payload.extra,
        }
    }
}

impl<'de> Deserialize<'de> for ConnectorCredentials {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        CredentialsPayload::deserialize(deserializer).map(Self::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wantitall() -> ConnectorCredentials {
        ConnectorCredentials::new(OrganizationId::new("org-1"), Marketplace::Wantitall)
    }

    #[test]
    fn test_missing_fields_reports_absent_and_blank() {
        let creds = wantitall().with_api_key("k3y-9f8a7b").with_seller_id("   ");
        let missing = creds.missing_fields(&[CredentialField::ApiKey, CredentialField::SellerId]);
        assert_eq!(missing, vec![CredentialField::SellerId]);
    }

    #[test]
    fn test_missing_fields_empty_when_complete() {
        let creds = wantitall().with_api_key("k3y-9f8a7b").with_seller_id("S-100");
        assert!(
            creds
                .missing_fields(&[CredentialField::ApiKey, CredentialField::SellerId])
                .is_empty()
        );
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = wantitall()
            .with_api_key("super_secret_api_key")
            .with_refresh_token("super_secret_refresh")
            .with_seller_id("S-100");

        let debug_output = format!("{creds:?}");

        assert!(debug_output.contains("S-100"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_api_key"));
        assert!(!debug_output.contains("super_secret_refresh"));
    }

    #[test]
    fn test_deserialize_camel_case_payload() {
        let json = r#"{
            "organizationId": "org-7",
            "marketplace": "woocommerce",
            "apiKey": "ck_live",
            "apiSecret": "cs_live",
            "storeUrl": "https://shop.example.co.za"
        }"#;

        let creds: ConnectorCredentials = serde_json::from_str(json).expect("deserialize");
        assert_eq!(creds.organization_id.as_str(), "org-7");
        assert_eq!(creds.marketplace, Marketplace::WooCommerce);
        assert!(creds.has(CredentialField::ApiSecret));
        assert_eq!(creds.store_url.as_deref(), Some("https://shop.example.co.za"));
        assert!(!creds.has(CredentialField::SellerId));
    }

    #[test]
    fn test_rotate_access_token() {
        let mut creds = wantitall().with_access_token("old");
        creds.rotate_access_token(AccessToken {
            token: SecretString::from("new"),
            expires_at: None,
        });
        assert_eq!(
            creds.access_token.as_ref().map(|t| t.expose_secret().to_string()),
            Some("new".to_string())
        );
    }

    #[test]
    fn test_access_token_expiry_window() {
        let soon = AccessToken {
            token: SecretString::from("t"),
            expires_at: Some(Utc::now() + chrono::Duration::seconds(60)),
        };
        assert!(soon.expires_within(300));
        assert!(!soon.expires_within(10));

        let unknown = AccessToken {
            token: SecretString::from("t"),
            expires_at: None,
        };
        assert!(!unknown.expires_within(300));
    }
}
