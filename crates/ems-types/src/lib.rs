//! Validated primitive types shared across the EMS report crates.

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,

    /// The input was not a plausible email address
    #[error("invalid email address: {0}")]
    InvalidEmail(String),
}

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// The input is trimmed of leading and trailing whitespace. If the trimmed
    /// result is empty, an error is returned.
    ///
    /// # Arguments
    ///
    /// * `input` - Any type that can be converted to a string reference
    ///
    /// # Returns
    ///
    /// Returns `Ok(NonEmptyText)` if the trimmed input is non-empty,
    /// or `Err(TextError::Empty)` if it's empty or contains only whitespace.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// An email address that passed a structural sanity check.
///
/// Only the shape `local@domain` with a dotted domain is checked here; the mail transport
/// performs full RFC 5322 parsing when the message is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates a new `EmailAddress` from the given input, trimming surrounding whitespace.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }

        let valid = match trimmed.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.is_empty()
                    && !domain.contains('@')
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
                    && !trimmed.chars().any(char::is_whitespace)
            }
            None => false,
        };

        if !valid {
            return Err(TextError::InvalidEmail(trimmed.to_owned()));
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Parses a comma-separated address list (`a@x.org, b@y.org`).
    ///
    /// Blank items are skipped; at least one address is required.
    pub fn parse_list(input: impl AsRef<str>) -> Result<Vec<Self>, TextError> {
        let addresses = input
            .as_ref()
            .split(',')
            .filter(|item| !item.trim().is_empty())
            .map(EmailAddress::new)
            .collect::<Result<Vec<_>, _>>()?;

        if addresses.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(addresses)
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_text_trims() {
        let text = NonEmptyText::new("  Encounter Report  ").expect("non-empty");
        assert_eq!(text.as_str(), "Encounter Report");
        assert_eq!(NonEmptyText::new(" \t"), Err(TextError::Empty));
    }

    #[test]
    fn non_empty_text_deserialize_rejects_blank() {
        let err = serde_json::from_str::<NonEmptyText>("\"   \"").expect_err("blank rejected");
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn email_address_accepts_plain_address() {
        let address = EmailAddress::new(" reports@example.nhs.uk ").expect("valid address");
        assert_eq!(address.as_str(), "reports@example.nhs.uk");
    }

    #[test]
    fn email_address_rejects_malformed() {
        for input in ["nobody", "@example.org", "a@", "a@localhost", "a b@example.org", "a@.org"] {
            assert!(
                matches!(EmailAddress::new(input), Err(TextError::InvalidEmail(_))),
                "{input} should be rejected"
            );
        }
    }

    #[test]
    fn parses_recipient_list() {
        let list = EmailAddress::parse_list("a@example.org, b@example.org,").expect("valid list");
        assert_eq!(list.len(), 2);
        assert_eq!(list[1].as_str(), "b@example.org");
        assert_eq!(EmailAddress::parse_list(" , "), Err(TextError::Empty));
    }
}
