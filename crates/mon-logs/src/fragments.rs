//! Canonical grammar fragments
//!
//! Single source of truth for the tokens a log pattern may reference. Each
//! entry carries the grok form shipped to the pipeline, an equivalent
//! `regex` crate body for local matching, the extracted field and its index
//! mapping type.

use serde::Serialize;
use std::fmt;

/// Index mapping type of an extracted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Date,
    Keyword,
    Integer,
    Ip,
    Float,
    Text,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Keyword => "keyword",
            Self::Integer => "integer",
            Self::Ip => "ip",
            Self::Float => "float",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fragment {
    pub token: &'static str,
    pub grok: &'static str,
    pub field: &'static str,
    pub field_type: FieldType,
    /// Regex body without the capture group.
    pub regex: &'static str,
}

const TIMESTAMP_REGEX: &str =
    r"\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(?:[.,]\d+)?(?:Z|[+-]\d{2}:?\d{2})?";

pub const FRAGMENTS: &[Fragment] = &[
    Fragment {
        token: "TIMESTAMP",
        grok: "%{TIMESTAMP_ISO8601:timestamp}",
        field: "timestamp",
        field_type: FieldType::Date,
        regex: TIMESTAMP_REGEX,
    },
    Fragment {
        token: "LEVEL",
        grok: "(?<level>TRACE|DEBUG|INFO|NOTICE|WARN|WARNING|ERROR|CRITICAL|FATAL)",
        field: "level",
        field_type: FieldType::Keyword,
        regex: "TRACE|DEBUG|INFO|NOTICE|WARNING|WARN|ERROR|CRITICAL|FATAL",
    },
    Fragment {
        token: "MODULE",
        grok: r"(?<module>[\w.\-/]+)",
        field: "module",
        field_type: FieldType::Keyword,
        regex: r"[\w.\-/]+",
    },
    Fragment {
        token: "LINE",
        grok: "%{POSINT:line}",
        field: "line",
        field_type: FieldType::Integer,
        regex: r"[1-9]\d*",
    },
    Fragment {
        token: "FUNCTION",
        grok: r"(?<function>[\w.<>$]+)",
        field: "function",
        field_type: FieldType::Keyword,
        regex: r"[\w.<>$]+",
    },
    Fragment {
        token: "USERNAME",
        grok: "%{USERNAME:user}",
        field: "user",
        field_type: FieldType::Keyword,
        regex: r"[a-zA-Z0-9._-]+",
    },
    Fragment {
        token: "IP_ADDRESS",
        grok: "%{IP:client_ip}",
        field: "client_ip",
        field_type: FieldType::Ip,
        regex: r"\d{1,3}(?:\.\d{1,3}){3}|[0-9A-Fa-f]*:[0-9A-Fa-f:.]+",
    },
    Fragment {
        token: "ACTION",
        grok: "%{WORD:action}",
        field: "action",
        field_type: FieldType::Keyword,
        regex: r"\w+",
    },
    Fragment {
        token: "RESOURCE",
        grok: "%{NOTSPACE:resource}",
        field: "resource",
        field_type: FieldType::Keyword,
        regex: r"\S+",
    },
    Fragment {
        token: "METHOD",
        grok: "%{WORD:method}",
        field: "method",
        field_type: FieldType::Keyword,
        regex: r"\w+",
    },
    Fragment {
        token: "PATH",
        grok: "%{URIPATHPARAM:path}",
        field: "path",
        field_type: FieldType::Keyword,
        regex: r"/\S*",
    },
    Fragment {
        token: "STATUS_CODE",
        grok: "%{POSINT:status_code}",
        field: "status_code",
        field_type: FieldType::Integer,
        regex: r"[1-9]\d*",
    },
    Fragment {
        token: "DURATION",
        grok: "%{NUMBER:duration}",
        field: "duration",
        field_type: FieldType::Float,
        regex: r"[+-]?\d+(?:\.\d+)?",
    },
    Fragment {
        token: "QUERIES",
        grok: "%{NUMBER:db_queries}",
        field: "db_queries",
        field_type: FieldType::Integer,
        regex: r"[+-]?\d+(?:\.\d+)?",
    },
    Fragment {
        token: "THREAD",
        grok: "%{NOTSPACE:thread}",
        field: "thread",
        field_type: FieldType::Keyword,
        regex: r"\S+",
    },
    Fragment {
        token: "PID",
        grok: "%{POSINT:pid}",
        field: "pid",
        field_type: FieldType::Integer,
        regex: r"[1-9]\d*",
    },
    Fragment {
        token: "HOSTNAME",
        grok: "%{IPORHOST:hostname}",
        field: "hostname",
        field_type: FieldType::Keyword,
        regex: r"[\w.\-:]+",
    },
    Fragment {
        token: "MESSAGE",
        grok: "%{GREEDYDATA:message}",
        field: "message",
        field_type: FieldType::Text,
        regex: r".*",
    },
];

/// Look up the fragment for `token` (exact, case-sensitive).
pub fn fragment(token: &str) -> Option<&'static Fragment> {
    FRAGMENTS.iter().find(|f| f.token == token)
}

/// Known tokens in table order.
pub fn known_tokens() -> impl Iterator<Item = &'static str> {
    FRAGMENTS.iter().map(|f| f.token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;
    use std::collections::HashSet;

    #[test]
    fn tokens_and_fields_are_unique() {
        let tokens: HashSet<_> = FRAGMENTS.iter().map(|f| f.token).collect();
        let fields: HashSet<_> = FRAGMENTS.iter().map(|f| f.field).collect();
        assert_eq!(tokens.len(), FRAGMENTS.len());
        assert_eq!(fields.len(), FRAGMENTS.len());
    }

    #[test]
    fn every_regex_body_compiles() {
        for f in FRAGMENTS {
            let wrapped = format!("^(?P<{}>{})$", f.field, f.regex);
            assert!(Regex::new(&wrapped).is_ok(), "{} does not compile", f.token);
        }
    }

    #[test]
    fn grok_fragments_name_their_field() {
        for f in FRAGMENTS {
            assert!(f.grok.contains(f.field), "{} grok lacks {}", f.token, f.field);
        }
    }
}
