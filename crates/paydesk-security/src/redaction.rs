use std::sync::LazyLock;
use tracing_subscriber::fmt::MakeWriter;

/// A writer that scrubs credentials from log output before it reaches `inner`.
pub struct RedactingWriter<W> {
    inner: W,
}

impl<W> RedactingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl RedactingWriter<std::io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(std::io::stderr())
    }
}

impl<W: std::io::Write> std::io::Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let original = String::from_utf8_lossy(buf);
        let redacted = redact_secrets(&original);
        self.inner.write_all(redacted.as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl<'a> MakeWriter<'a> for RedactingWriter<std::io::Stderr> {
    type Writer = RedactingWriter<std::io::Stderr>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::stderr()
    }
}

/// Replace bearer credentials, JWT-shaped tokens, stored credential values and
/// payment API keys with `[REDACTED]`.
pub fn redact_secrets(input: &str) -> String {
    // Credential storage keys keep their name; only the value is replaced.
    static KEY_VALUE: LazyLock<regex::Regex> = LazyLock::new(|| {
        regex::Regex::new(
            r#"(?x)
              (?P<key>
                (?:"?\bauthToken(?:_admin|_merchant)?"? | "token" | \btoken)
                \s*[=:]\s*
              )
              (?P<value>"[^"]*" | [^\s,;&"{}\[\]]+)
            "#,
        )
        .expect("credential key/value regex should compile")
    });
    static PATTERNS: LazyLock<regex::Regex> = LazyLock::new(|| {
        regex::Regex::new(
            r"(?x)
              Bearer\s+[A-Za-z0-9\-._~+/]+=*                      # Authorization header values
            | [A-Za-z0-9_\-]+\.eyJ[A-Za-z0-9_\-]+=*\.[A-Za-z0-9_\-]*  # JWT-shaped tokens
            | (?:sk|rk)_(?:live|test)_[A-Za-z0-9]{10,}            # payment provider secret keys
            | whsec_[A-Za-z0-9]{10,}                              # webhook signing secrets
            ",
        )
        .expect("redaction regex should compile")
    });

    let scrubbed = KEY_VALUE.replace_all(input, |caps: &regex::Captures<'_>| {
        let quote = if caps["value"].starts_with('"') { "\"" } else { "" };
        format!("{}{quote}[REDACTED]{quote}", &caps["key"])
    });
    PATTERNS.replace_all(&scrubbed, "[REDACTED]").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn redacts_bearer_header() {
        let input = "Authorization: Bearer abc123.def-456";
        assert_eq!(redact_secrets(input), "Authorization: [REDACTED]");
    }

    #[test]
    fn redacts_jwt_shaped_token() {
        let input = "token=abc.eyJ1c2VyIjp7InJvbGUiOiJtZXJjaGFudCJ9fQ.xyz done";
        assert_eq!(redact_secrets(input), "token=[REDACTED] done");
    }

    #[test]
    fn redacts_payment_keys() {
        assert_eq!(
            redact_secrets("key=sk_live_1234567890abcdef"),
            "key=[REDACTED]"
        );
        assert_eq!(
            redact_secrets("secret whsec_abcdefghijklmnop"),
            "secret [REDACTED]"
        );
    }

    #[test]
    fn redacts_opaque_values_next_to_credential_keys() {
        let input = r#"authToken_admin={"token":"opaque-session-123"} authToken=legacy-opaque-456"#;
        assert_eq!(
            redact_secrets(input),
            r#"authToken_admin={"token":"[REDACTED]"} authToken=[REDACTED]"#
        );
        assert_eq!(
            redact_secrets(r#"{"authToken_merchant": "m-1", "currentRole": "merchant"}"#),
            r#"{"authToken_merchant": "[REDACTED]", "currentRole": "merchant"}"#
        );
    }

    #[test]
    fn leaves_normal_text_unchanged() {
        let input = "stored merchant credential for payout.review";
        assert_eq!(redact_secrets(input), input);
    }

    #[test]
    fn writer_redacts_before_forwarding() {
        let mut writer = RedactingWriter::new(Vec::new());
        writer
            .write_all(b"sending Bearer eyJhbGciOi.eyJzdWIiOiJ1MSJ9.sig\n")
            .unwrap();
        writer.flush().unwrap();
        assert_eq!(String::from_utf8(writer.inner).unwrap(), "sending [REDACTED]\n");
    }
}
