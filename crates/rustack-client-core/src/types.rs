//! Common request types shared across signers.

use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// The HTTP verbs an AWS API call may use.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    /// `GET`
    #[default]
    Get,
    /// `PUT`
    Put,
    /// `POST`
    Post,
    /// `DELETE`
    Delete,
    /// `HEAD`
    Head,
}

impl Verb {
    /// The upper-case wire form of the verb.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "PUT" => Ok(Self::Put),
            "POST" => Ok(Self::Post),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            _ => Err(CoreError::UnsupportedVerb(s.to_owned())),
        }
    }
}

impl From<Verb> for http::Method {
    fn from(verb: Verb) -> Self {
        match verb {
            Verb::Get => http::Method::GET,
            Verb::Put => http::Method::PUT,
            Verb::Post => http::Method::POST,
            Verb::Delete => http::Method::DELETE,
            Verb::Head => http::Method::HEAD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_parse_verb_case_insensitively() {
        assert_eq!("get".parse::<Verb>().unwrap(), Verb::Get);
        assert_eq!("Post".parse::<Verb>().unwrap(), Verb::Post);
        assert_eq!("DELETE".parse::<Verb>().unwrap(), Verb::Delete);
    }

    #[test]
    fn test_should_reject_unknown_verb() {
        let result = "PATCH".parse::<Verb>();
        assert!(matches!(result, Err(CoreError::UnsupportedVerb(v)) if v == "PATCH"));
    }

    #[test]
    fn test_should_display_upper_case() {
        assert_eq!(Verb::Head.to_string(), "HEAD");
        assert_eq!(http::Method::from(Verb::Put), http::Method::PUT);
    }
}
