use base64::{engine::general_purpose, Engine};

/// Characters that survive the cleanup pass before base64 decoding.
const BASE64_CHARSET: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/=";

/// Try to recover a username from the encoded payload of a subscription
/// link, i.e. whatever comes after the final `/`.
///
/// Two strategies are attempted in order: reading the `sub` claim of a JWT
/// without verifying its signature, and decoding the payload as base64 of
/// comma-separated text. Returns [`None`] if both fail; never errors.
pub fn extract_username(payload: &str) -> Option<String> {
    if let Some(username) = username_from_jwt(payload) {
        log::info!("Username extracted using JWT: {username}");
        return Some(username);
    }

    if let Some(username) = username_from_base64(payload) {
        log::info!("Username extracted using base64: {username}");
        return Some(username);
    }

    log::debug!("No username could be extracted from the payload");
    None
}

/// Read the `sub` claim out of an unverified JWT.
///
/// The token must have its three dot-separated segments, but the signature
/// segment may be empty and is never checked against anything.
fn username_from_jwt(payload: &str) -> Option<String> {
    let mut segments = payload.split('.');
    let header = segments.next()?;
    let claims = segments.next()?;
    let _signature = segments.next()?;
    if segments.next().is_some() {
        return None;
    }

    // The header still has to be well-formed JSON for this to count as
    // a token at all.
    let header: serde_json::Value = serde_json::from_slice(&decode_jwt_segment(header)?).ok()?;
    if !header.is_object() {
        return None;
    }

    let claims: serde_json::Value = serde_json::from_slice(&decode_jwt_segment(claims)?).ok()?;

    // A numeric subject is fine too; anything else isn't usable.
    let subject = match claims.get("sub")? {
        serde_json::Value::String(subject) => subject.clone(),
        serde_json::Value::Number(subject) => subject.to_string(),
        _ => return None,
    };

    let subject = subject.trim();
    match subject.is_empty() {
        true => None,
        false => Some(subject.to_string()),
    }
}

fn decode_jwt_segment(segment: &str) -> Option<Vec<u8>> {
    general_purpose::URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .ok()
}

/// Decode the payload as base64 of text shaped like `username,whatever`.
fn username_from_base64(payload: &str) -> Option<String> {
    let mut cleaned: String = payload
        .chars()
        .filter(|c| BASE64_CHARSET.contains(*c))
        .collect();

    // Padding normalization, warts and all: strip trailing `=`, then pad
    // back up to a multiple of four. This mis-pads some inputs, but links
    // in the wild depend on exactly this treatment.
    while cleaned.ends_with('=') {
        cleaned.pop();
    }
    while cleaned.len() % 4 != 0 {
        cleaned.push('=');
    }

    let bytes = general_purpose::STANDARD.decode(&cleaned).ok()?;

    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        // Not UTF-8, which rules out ASCII as well. Latin-1 maps every
        // byte, so this last resort can't fail.
        Err(err) => err.into_bytes().iter().map(|&b| b as char).collect(),
    };

    let (username, _rest) = text.split_once(',')?;
    let username = username.trim();
    match username.is_empty() {
        true => None,
        false => Some(username.to_string()),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    // {"alg":"none"}.{"sub":"alice"}. with no signature.
    const UNSIGNED_ALICE: &str = "eyJhbGciOiJub25lIn0.eyJzdWIiOiJhbGljZSJ9.";

    #[test]
    fn jwt_subject_is_extracted_without_a_signature() {
        assert_eq!(extract_username(UNSIGNED_ALICE).unwrap(), "alice");
    }

    #[test]
    fn jwt_subject_is_trimmed() {
        // {"sub":"  dave  "}
        let payload = "eyJhbGciOiJub25lIn0.eyJzdWIiOiIgIGRhdmUgICJ9.";
        assert_eq!(extract_username(payload).unwrap(), "dave");
    }

    #[test]
    fn numeric_jwt_subject_is_stringified() {
        // {"sub":42}
        let payload = "eyJhbGciOiJub25lIn0.eyJzdWIiOjQyfQ.";
        assert_eq!(extract_username(payload).unwrap(), "42");
    }

    #[test]
    fn jwt_without_a_subject_falls_through() {
        // {"alg":"none"}.{"name":"bob"}. parses as a token but has no
        // usable subject, and its characters aren't meaningful base64
        // either, so the whole extraction comes up empty.
        let payload = "eyJhbGciOiJub25lIn0.eyJuYW1lIjoiYm9iIn0.";
        assert_eq!(extract_username(payload), None);
    }

    #[test]
    fn jwt_with_an_empty_subject_falls_through() {
        // {"sub":""}
        let payload = "eyJhbGciOiJub25lIn0.eyJzdWIiOiIifQ.";
        assert_eq!(extract_username(payload), None);
    }

    #[test]
    fn base64_of_comma_separated_text_yields_the_prefix() {
        // "bob,extra"
        assert_eq!(extract_username("Ym9iLGV4dHJh").unwrap(), "bob");
    }

    #[test]
    fn base64_prefix_is_trimmed() {
        // " carol ,rest"
        assert_eq!(extract_username("IGNhcm9sICxyZXN0").unwrap(), "carol");
    }

    #[test]
    fn foreign_characters_are_stripped_before_decoding() {
        // Same as "bob,extra" with junk sprinkled in.
        assert_eq!(extract_username("Ym9iLGV4!!dHJh***").unwrap(), "bob");
    }

    #[test]
    fn latin1_text_is_decoded_as_a_last_resort() {
        // Bytes E9 78 2C 61: not UTF-8, "éx,a" in Latin-1.
        assert_eq!(extract_username("6XgsYQ==").unwrap(), "\u{e9}x");
    }

    #[test]
    fn valid_base64_without_a_comma_yields_nothing() {
        // "plainstring"
        assert_eq!(extract_username("cGxhaW5zdHJpbmc="), None);
    }

    #[test]
    fn empty_payload_yields_nothing() {
        assert_eq!(extract_username(""), None);
    }

    #[test]
    fn garbage_payload_yields_nothing() {
        assert_eq!(extract_username("not-valid-at-all!!"), None);
        assert_eq!(extract_username("!!!???"), None);
    }
}
