use std::fmt;

/// A credential that must never appear in logs or serialized configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expose_returns_password() {
        let password = Secret::new("pg-s3cret");
        assert_eq!(password.expose(), "pg-s3cret");
    }

    #[test]
    fn formatting_never_shows_password() {
        let password = Some(Secret::new("pg-s3cret"));
        for rendered in [
            format!("{password:?}"),
            format!("{password:#?}"),
            format!("{}", password.as_ref().unwrap()),
        ] {
            assert!(!rendered.contains("pg-s3cret"), "leaked in {rendered}");
            assert!(rendered.contains("[REDACTED]"));
        }
    }
}
