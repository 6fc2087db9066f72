//! Master-key request signing for the Cosmos DB REST API.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use time::{OffsetDateTime, format_description::FormatItem, macros::format_description};

const RFC1123_FORMAT: &[FormatItem<'static>] = format_description!(
    "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
);

/// Decoded master key able to sign resource requests.
pub(crate) struct MasterKey {
    key: Vec<u8>,
}

impl MasterKey {
    /// Decode a base64 master key.
    pub(crate) fn decode(encoded: &str) -> Result<Self, String> {
        let key = STANDARD
            .decode(encoded.trim())
            .map_err(|err| err.to_string())?;
        Ok(Self { key })
    }

    /// Build the url-encoded `Authorization` value for one request.
    ///
    /// `verb`, `resource_type` and `date` are lowercased before signing; `resource_link` is
    /// signed as given.
    pub(crate) fn authorization(
        &self,
        verb: &str,
        resource_type: &str,
        resource_link: &str,
        date: &str,
    ) -> Result<String, String> {
        let payload = format!(
            "{}\n{}\n{}\n{}\n\n",
            verb.to_lowercase(),
            resource_type.to_lowercase(),
            resource_link,
            date.to_lowercase()
        );
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.key).map_err(|err| err.to_string())?;
        mac.update(payload.as_bytes());
        let signature = STANDARD.encode(mac.finalize().into_bytes());
        let token = format!("type=master&ver=1.0&sig={signature}");
        Ok(urlencoding::encode(&token).into_owned())
    }
}

/// Format a timestamp as the RFC 1123 `x-ms-date` header value.
pub(crate) fn rfc1123(at: OffsetDateTime) -> Result<String, time::error::Format> {
    at.to_offset(time::UtcOffset::UTC).format(RFC1123_FORMAT)
}
