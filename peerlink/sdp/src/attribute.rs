//! SDP attribute (`a=`) lines.

use std::fmt;

/// Either a flag (`a=<name>`) or a value attribute (`a=<name>:<value>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: Option<String>,
}

impl Attribute {
    pub fn flag(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    pub fn with_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    /// Parses the text after `a=`. Only the first `:` separates name and value.
    pub fn parse(value: &str) -> Self {
        match value.split_once(':') {
            Some((name, val)) => Self::with_value(name, val),
            None => Self::flag(value),
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(val) => write!(f, "a={}:{}\r\n", self.name, val),
            None => write!(f, "a={}\r\n", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_parse_flag() {
        let attr = Attribute::parse("recvonly");
        assert_eq!(attr.name, "recvonly");
        assert_eq!(attr.value, None);
    }

    #[test]
    fn test_attribute_parse_keeps_colons_in_value() {
        let attr = Attribute::parse("candidate:1 1 TCP 2130706431 127.0.0.1 9 typ host");
        assert_eq!(attr.name, "candidate");
        assert_eq!(
            attr.value.as_deref(),
            Some("1 1 TCP 2130706431 127.0.0.1 9 typ host")
        );
    }

    #[test]
    fn test_attribute_display() {
        assert_eq!(Attribute::flag("sendrecv").to_string(), "a=sendrecv\r\n");
        assert_eq!(
            Attribute::with_value("mid", "0").to_string(),
            "a=mid:0\r\n"
        );
    }
}
