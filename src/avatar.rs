use md5::{Digest, Md5};

const GRAVATAR_BASE: &str = "http://www.gravatar.com/avatar/";

/// Gravatar image URL for an e-mail address, falling back to a generated
/// identicon when no avatar is registered.
pub fn gravatar_url(email: &str) -> String {
    let normalized = email.trim().to_lowercase();
    let digest = Md5::digest(normalized.as_bytes());
    format!("{GRAVATAR_BASE}{}?d=identicon", hex::encode(digest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gravatar_url_format() {
        assert_eq!(
            gravatar_url("abc"),
            "http://www.gravatar.com/avatar/900150983cd24fb0d6963f7d28e17f72?d=identicon"
        );
    }

    #[test]
    fn test_gravatar_url_normalizes_email() {
        assert_eq!(gravatar_url("  ABC "), gravatar_url("abc"));
    }

    #[test]
    fn test_empty_email_hashes_empty_string() {
        assert_eq!(
            gravatar_url(""),
            "http://www.gravatar.com/avatar/d41d8cd98f00b204e9800998ecf8427e?d=identicon"
        );
    }
}
