//! Request headers as seen by the matching engine

use http::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::HeaderError;

/// Request headers backed by an [`http::HeaderMap`]. Lookups are
/// case-insensitive and return the first value of a name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestHeaders(HeaderMap);

impl RequestHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(name, value)` text pairs, keeping repeated names.
    pub fn from_pairs<'a>(
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, HeaderError> {
        let mut headers = Self::new();
        for (name, value) in pairs {
            headers.append(name, value)?;
        }
        Ok(headers)
    }

    /// Add a value, keeping earlier values of the same name.
    pub fn append(&mut self, name: &str, value: &str) -> Result<(), HeaderError> {
        let name = HeaderName::from_bytes(name.trim().as_bytes())?;
        let value = HeaderValue::from_str(value.trim())?;
        self.0.append(name, value);
        Ok(())
    }

    /// First value of a header, if it is visible ASCII
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_map(&self) -> &HeaderMap {
        &self.0
    }

    /// Parse a `Name: value` line, splitting on the first colon
    pub fn parse_line(line: &str) -> Result<(HeaderName, HeaderValue), HeaderError> {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| HeaderError::MissingSeparator(line.to_string()))?;
        Ok((
            HeaderName::from_bytes(name.trim().as_bytes())?,
            HeaderValue::from_str(value.trim())?,
        ))
    }
}

impl From<HeaderMap> for RequestHeaders {
    fn from(map: HeaderMap) -> Self {
        Self(map)
    }
}

impl Extend<(HeaderName, HeaderValue)> for RequestHeaders {
    fn extend<I: IntoIterator<Item = (HeaderName, HeaderValue)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.0.append(name, value);
        }
    }
}

impl FromIterator<(HeaderName, HeaderValue)> for RequestHeaders {
    fn from_iter<I: IntoIterator<Item = (HeaderName, HeaderValue)>>(iter: I) -> Self {
        let mut headers = Self::new();
        headers.extend(iter);
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let headers = RequestHeaders::from_pairs([
            ("X-Wap-Profile", "\"http://example.com/prof.xml\""),
            ("Accept", "text/html"),
        ])
        .unwrap();

        assert_eq!(headers.get("x-wap-profile"), Some("\"http://example.com/prof.xml\""));
        assert_eq!(headers.get("ACCEPT"), Some("text/html"));
        assert_eq!(headers.get("profile"), None);
        assert_eq!(headers.get("not a header name"), None);
    }

    #[test]
    fn repeated_names_keep_the_first_value() {
        let headers =
            RequestHeaders::from_pairs([("Profile", "http://a.example/1"), ("profile", "http://a.example/2")])
                .unwrap();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("Profile"), Some("http://a.example/1"));
    }

    #[test]
    fn parse_line_splits_on_first_colon() {
        let (name, value) = RequestHeaders::parse_line("Profile: http://a.example/x.xml").unwrap();
        assert_eq!(name, "profile");
        assert_eq!(value, "http://a.example/x.xml");

        assert!(matches!(
            RequestHeaders::parse_line("no colon"),
            Err(HeaderError::MissingSeparator(_))
        ));
        assert!(matches!(RequestHeaders::parse_line(": empty"), Err(HeaderError::Name(_))));
        assert!(matches!(
            RequestHeaders::parse_line("Profile: bad\u{7f}value"),
            Err(HeaderError::Value(_))
        ));
    }

    #[test]
    fn collect_from_parsed_lines() {
        let headers: RequestHeaders = ["Accept: */*", "X-Wap-Profile: http://a.example/p.xml"]
            .into_iter()
            .map(RequestHeaders::parse_line)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("x-wap-profile"), Some("http://a.example/p.xml"));
    }
}
