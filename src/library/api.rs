use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde_json::Value;
use std::collections::BTreeSet;
use std::time::Duration;

/// Read-only gateway to the library backend, the system of record for
/// which ASINs are already converted. Everything here is a localhost call
/// with a short timeout; callers own the degrade decision when it fails.
fn client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .context("failed to build library api client")
}

fn converted_url(base_url: &str) -> String {
    format!(
        "{}/api/v1/library/converted",
        base_url.trim_end_matches('/')
    )
}

fn parse_converted_payload(root: &Value) -> Result<BTreeSet<String>> {
    let asins = root
        .get("asins")
        .and_then(Value::as_array)
        .context("library api payload missing `asins` array")?;

    let mut out = BTreeSet::new();
    for entry in asins {
        let Some(asin) = entry.as_str() else {
            continue;
        };
        let trimmed = asin.trim();
        if !trimmed.is_empty() {
            out.insert(trimmed.to_string());
        }
    }
    Ok(out)
}

/// Fetch the complete set of ASINs the backend considers processed. The
/// backend only reports items it is certain about; false positives here
/// would propagate straight into the index.
pub fn fetch_converted_asins(base_url: &str, timeout_secs: u64) -> Result<BTreeSet<String>> {
    let url = converted_url(base_url);
    let response = client(timeout_secs)?
        .get(&url)
        .send()
        .with_context(|| format!("failed to reach library api at {url}"))?;

    if !response.status().is_success() {
        anyhow::bail!("library api returned status {} for {url}", response.status());
    }

    let json: Value = response
        .json()
        .with_context(|| format!("invalid JSON from library api at {url}"))?;
    parse_converted_payload(&json)
}

/// Cheap availability probe for health reporting.
pub fn backend_available(base_url: &str, timeout_secs: u64) -> bool {
    let url = converted_url(base_url);
    let Ok(client) = client(timeout_secs) else {
        return false;
    };
    match client.get(&url).send() {
        Ok(response) => response.status().is_success(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::{converted_url, parse_converted_payload};

    #[test]
    fn url_building_tolerates_trailing_slash() {
        assert_eq!(
            converted_url("http://127.0.0.1:5005/"),
            "http://127.0.0.1:5005/api/v1/library/converted"
        );
    }

    #[test]
    fn payload_parsing_dedupes_and_skips_non_strings() {
        let raw = serde_json::json!({
            "asins": ["B00A1B2C3D", "B00A1B2C3D", " B09XYZW123 ", 42, ""]
        });
        let parsed = parse_converted_payload(&raw).expect("parse");
        assert_eq!(parsed.len(), 2);
        assert!(parsed.contains("B09XYZW123"));
    }

    #[test]
    fn payload_without_asins_is_an_error() {
        let raw = serde_json::json!({"items": []});
        assert!(parse_converted_payload(&raw).is_err());
    }
}
