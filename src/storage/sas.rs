//! Service SAS issuance for individual blobs.

use crate::config::StorageConnection;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use reqwest::Url;
use sha2::Sha256;
use thiserror::Error;
use time::{Duration, OffsetDateTime, format_description::FormatItem, macros::format_description};

/// Storage service version the string-to-sign layout corresponds to.
pub const SAS_VERSION: &str = "2020-12-06";

/// Lifetime of every SAS token minted by [`SasIssuer`].
pub const SAS_VALIDITY: Duration = Duration::minutes(15);

const EXPIRY_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");

/// Errors raised while minting SAS URLs.
#[derive(Debug, Error)]
pub enum SasError {
    /// The account key could not be used as an HMAC secret.
    #[error("Invalid storage account key: {0}")]
    InvalidAccountKey(String),
    /// The blob endpoint could not be turned into a blob URL.
    #[error("Invalid blob URL: {0}")]
    InvalidUrl(String),
    /// The blob name has segments a URL cannot carry verbatim.
    #[error("Blob name {0:?} cannot be addressed by URL")]
    InvalidBlobName(String),
    /// Expiry timestamp could not be rendered.
    #[error("Failed to format SAS expiry: {0}")]
    Format(#[from] time::error::Format),
}

/// Permissions granted by a SAS token, rendered in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SasPermissions {
    /// Read-only access.
    Read,
    /// Create and write access for uploads.
    CreateWrite,
}

impl SasPermissions {
    fn as_str(self) -> &'static str {
        match self {
            Self::Read => "r",
            Self::CreateWrite => "cw",
        }
    }
}

/// Mints time-limited, blob-scoped SAS URLs from the storage account key.
///
/// Signing is local; no network call is made. Tokens are never cached.
pub struct SasIssuer {
    connection: StorageConnection,
    key: Vec<u8>,
}

impl SasIssuer {
    /// Build an issuer from a parsed storage connection string.
    pub fn new(connection: StorageConnection) -> Result<Self, SasError> {
        let key = STANDARD
            .decode(connection.account_key.trim())
            .map_err(|err| SasError::InvalidAccountKey(err.to_string()))?;
        Ok(Self { connection, key })
    }

    /// Storage account the issuer signs for.
    pub fn account_name(&self) -> &str {
        &self.connection.account_name
    }

    /// Read-only URL for one blob, valid for [`SAS_VALIDITY`].
    pub fn read_url(&self, container: &str, blob: &str) -> Result<Url, SasError> {
        self.sign(container, blob, SasPermissions::Read, expiry_from_now())
    }

    /// Create/write URL for one blob, valid for [`SAS_VALIDITY`].
    pub fn write_url(&self, container: &str, blob: &str) -> Result<Url, SasError> {
        self.sign(container, blob, SasPermissions::CreateWrite, expiry_from_now())
    }

    /// Sign a blob URL with an explicit expiry.
    pub fn sign(
        &self,
        container: &str,
        blob: &str,
        permissions: SasPermissions,
        expiry: OffsetDateTime,
    ) -> Result<Url, SasError> {
        let expiry = expiry
            .to_offset(time::UtcOffset::UTC)
            .replace_nanosecond(0)
            .unwrap_or(expiry)
            .format(EXPIRY_FORMAT)?;
        let canonical_resource = format!(
            "/blob/{}/{}/{}",
            self.connection.account_name, container, blob
        );
        let string_to_sign = [
            permissions.as_str(),
            "",
            expiry.as_str(),
            canonical_resource.as_str(),
            "",
            "",
            "",
            SAS_VERSION,
            "b",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
        ]
        .join("\n");

        let mut mac = Hmac::<Sha256>::new_from_slice(&self.key)
            .map_err(|err| SasError::InvalidAccountKey(err.to_string()))?;
        mac.update(string_to_sign.as_bytes());
        let signature = STANDARD.encode(mac.finalize().into_bytes());

        let mut url = blob_url(&self.connection, container, blob)?;
        url.query_pairs_mut()
            .append_pair("sv", SAS_VERSION)
            .append_pair("sr", "b")
            .append_pair("sp", permissions.as_str())
            .append_pair("se", &expiry)
            .append_pair("sig", &signature);

        tracing::debug!(
            container,
            blob,
            permissions = permissions.as_str(),
            expiry = %expiry,
            "Issued blob SAS"
        );
        Ok(url)
    }
}

/// Whether `blob` maps to the same path in a URL as in the signed resource.
///
/// `.` and `..` segments are collapsed by URL normalization, so a name containing them would be
/// written somewhere other than the resource the signature covers.
pub fn is_addressable_blob_name(blob: &str) -> bool {
    !blob.trim().is_empty() && blob.split('/').all(|segment| segment != "." && segment != "..")
}

/// Unsigned URL addressing `container/blob` under the account's blob endpoint.
pub fn blob_url(
    connection: &StorageConnection,
    container: &str,
    blob: &str,
) -> Result<Url, SasError> {
    if !is_addressable_blob_name(blob) {
        return Err(SasError::InvalidBlobName(blob.to_string()));
    }
    let mut url = Url::parse(&connection.blob_endpoint)
        .map_err(|err| SasError::InvalidUrl(err.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| SasError::InvalidUrl(connection.blob_endpoint.clone()))?
        .pop_if_empty()
        .push(container)
        .extend(blob.split('/'));
    Ok(url)
}

fn expiry_from_now() -> OffsetDateTime {
    OffsetDateTime::now_utc() + SAS_VALIDITY
}
