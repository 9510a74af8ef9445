use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use souk_common::{Fils, Secret};

use crate::GatewayError;

type HmacSha256 = Hmac<Sha256>;

/// How long a customer has to complete a checkout session before the provider expires it.
pub const SESSION_EXPIRY_MINUTES: i64 = 15;

pub fn session_expiry() -> DateTime<Utc> {
    Utc::now() + Duration::minutes(SESSION_EXPIRY_MINUTES)
}

/// Providers take amounts as integer minor units (fils). [`Fils`] already *is* minor units, so the
/// wire value is just the inner integer, either bare or stringly depending on the provider.
pub fn amount_to_wire(amount: Fils) -> String {
    amount.value().to_string()
}

/// Parses a provider amount that may arrive as a JSON integer or as a string of minor units.
pub fn amount_from_wire(gateway: &str, value: &Value) -> Result<Fils, GatewayError> {
    let fils = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse::<i64>().ok(),
        _ => None,
    };
    fils.map(Fils::from).ok_or_else(|| GatewayError::ResponseFormat {
        gateway: gateway.to_string(),
        detail: format!("unparseable amount: {value}"),
    })
}

pub fn required_str<'a>(gateway: &str, payload: &'a Value, field: &str) -> Result<&'a str, GatewayError> {
    payload.get(field).and_then(Value::as_str).ok_or_else(|| GatewayError::ResponseFormat {
        gateway: gateway.to_string(),
        detail: format!("missing field: {field}"),
    })
}

/// Verifies the HMAC-SHA256 signature a provider attaches to its webhook payloads.
///
/// The signature is computed over the canonical form of the payload: compact JSON with object
/// keys sorted and the `signature` field removed. The provided signature is hex-encoded.
/// Comparison is constant-time via [`Mac::verify_slice`].
pub fn verify_payload_signature(
    gateway: &str,
    payload: &Value,
    secret: &Secret<String>,
) -> Result<(), GatewayError> {
    let provided = payload
        .get("signature")
        .and_then(Value::as_str)
        .ok_or_else(|| GatewayError::InvalidSignature(gateway.to_string()))?;
    let provided = hex::decode(provided).map_err(|_| GatewayError::InvalidSignature(gateway.to_string()))?;
    let mut canonical = payload.clone();
    if let Some(map) = canonical.as_object_mut() {
        map.remove("signature");
    }
    // serde_json's default map is a BTreeMap, so serialization yields sorted keys
    let message = canonical.to_string();
    let mut mac = HmacSha256::new_from_slice(secret.reveal().as_bytes())
        .map_err(|e| GatewayError::Initialization { gateway: gateway.to_string(), detail: e.to_string() })?;
    mac.update(message.as_bytes());
    mac.verify_slice(&provided).map_err(|_| GatewayError::InvalidSignature(gateway.to_string()))
}

/// Computes the hex signature for a payload the way [`verify_payload_signature`] expects it.
/// Used by tests and by tools that need to emit signed payloads.
pub fn sign_payload(payload: &Value, secret: &Secret<String>) -> String {
    let mut canonical = payload.clone();
    if let Some(map) = canonical.as_object_mut() {
        map.remove("signature");
    }
    let mut mac = HmacSha256::new_from_slice(secret.reveal().as_bytes()).expect("HMAC accepts any key length");
    mac.update(canonical.to_string().as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Sends a prepared request and returns the JSON body of a 2xx response.
///
/// Transport failures become [`GatewayError::Network`] (unknown outcome); non-2xx responses become
/// [`GatewayError::Api`] carrying the provider's `message` field when one is present.
pub(crate) async fn send_json(gateway: &str, req: reqwest::RequestBuilder) -> Result<Value, GatewayError> {
    let response = req.send().await.map_err(|e| GatewayError::from_reqwest(gateway, e))?;
    let status = response.status();
    if status.is_success() {
        response
            .json::<Value>()
            .await
            .map_err(|e| GatewayError::ResponseFormat { gateway: gateway.to_string(), detail: e.to_string() })
    } else {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
            .unwrap_or(body);
        Err(GatewayError::Api { gateway: gateway.to_string(), status: status.as_u16(), message })
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;
    use souk_common::{Fils, Secret};

    use super::{amount_from_wire, amount_to_wire, sign_payload, verify_payload_signature};

    #[test]
    fn amounts_round_trip_as_minor_units() {
        assert_eq!(amount_to_wire(Fils::from_aed(105)), "10500");
        assert_eq!(amount_from_wire("TEST", &json!(10500)).unwrap(), Fils::from_aed(105));
        assert_eq!(amount_from_wire("TEST", &json!("10500")).unwrap(), Fils::from_aed(105));
        assert!(amount_from_wire("TEST", &json!("12.5")).is_err());
        assert!(amount_from_wire("TEST", &json!(null)).is_err());
    }

    #[test]
    fn signature_round_trip() {
        let secret = Secret::new("whsec_test".to_string());
        let mut payload = json!({"payment_id": "pi_123", "status": "completed", "amount": 10500});
        let sig = sign_payload(&payload, &secret);
        payload["signature"] = sig.into();
        verify_payload_signature("ZIINA", &payload, &secret).expect("signature should verify");
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let secret = Secret::new("whsec_test".to_string());
        let mut payload = json!({"payment_id": "pi_123", "status": "completed", "amount": 10500});
        payload["signature"] = sign_payload(&payload, &secret).into();
        payload["amount"] = 1.into();
        assert!(verify_payload_signature("ZIINA", &payload, &secret).is_err());
    }

    #[test]
    fn missing_signature_is_rejected() {
        let secret = Secret::new("whsec_test".to_string());
        let payload = json!({"payment_id": "pi_123", "status": "completed"});
        assert!(verify_payload_signature("ZIINA", &payload, &secret).is_err());
    }
}
