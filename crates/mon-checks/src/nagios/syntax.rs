//! Local structural validation of object files
//!
//! This is not a replacement for the check system's own `-v` run; it catches
//! unbalanced blocks, unknown object types, missing mandatory directives,
//! duplicate names and dangling references before files leave the machine.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

const KNOWN_TYPES: &[&str] = &[
    "command",
    "contact",
    "contactgroup",
    "host",
    "hostdependency",
    "hostescalation",
    "hostextinfo",
    "hostgroup",
    "service",
    "servicedependency",
    "serviceescalation",
    "serviceextinfo",
    "servicegroup",
    "timeperiod",
];

/// One `define <kind> { ... }` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectDefinition {
    pub kind: String,
    pub directives: BTreeMap<String, String>,
    /// Line of the `define` keyword, 1-based.
    pub line: usize,
}

impl ObjectDefinition {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.directives.get(key).map(String::as_str)
    }

    /// Templates (`register 0`) are not instantiated and skip mandatory checks.
    pub fn is_template(&self) -> bool {
        self.get("register") == Some("0")
    }

    /// Identity used for duplicate detection.
    pub fn identity(&self) -> Option<String> {
        let key = match self.kind.as_str() {
            "service" => {
                let host = self.get("host_name").or_else(|| self.get("hostgroup_name"))?;
                let desc = self.get("service_description")?;
                return Some(format!("{}/{}", host, desc));
            }
            "serviceescalation" | "hostescalation" | "hostdependency"
            | "servicedependency" | "hostextinfo" | "serviceextinfo" => return None,
            kind => format!("{}_name", kind),
        };
        self.get(&key).map(str::to_string)
    }

    fn missing(&self) -> Vec<&'static str> {
        let required: &[&[&'static str]] = match self.kind.as_str() {
            "host" => &[&["host_name"], &["max_check_attempts"]],
            "service" => &[
                &["service_description"],
                &["host_name", "hostgroup_name"],
                &["check_command"],
            ],
            "command" => &[&["command_name"], &["command_line"]],
            "contact" => &[&["contact_name"]],
            "contactgroup" => &[&["contactgroup_name"]],
            "hostgroup" => &[&["hostgroup_name"]],
            "servicegroup" => &[&["servicegroup_name"]],
            "timeperiod" => &[&["timeperiod_name"]],
            "serviceescalation" => &[
                &["host_name", "hostgroup_name"],
                &["service_description"],
                &["contact_groups", "contacts"],
            ],
            "hostescalation" => &[&["host_name", "hostgroup_name"], &["contact_groups", "contacts"]],
            _ => &[],
        };
        required
            .iter()
            .filter(|alternatives| alternatives.iter().all(|key| self.get(key).is_none()))
            .map(|alternatives| alternatives[0])
            .collect()
    }
}

/// A problem found in an object file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxIssue {
    pub file: String,
    pub line: usize,
    pub message: String,
}

impl SyntaxIssue {
    fn new(file: &str, line: usize, message: impl Into<String>) -> Self {
        Self {
            file: file.to_string(),
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for SyntaxIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.file, self.line, self.message)
    }
}

/// Drop everything after the first unescaped `;`.
fn strip_inline_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    for (idx, byte) in bytes.iter().enumerate() {
        if *byte == b';' && (idx == 0 || bytes[idx - 1] != b'\\') {
            return &line[..idx];
        }
    }
    line
}

/// Parse a single object file. Structural errors are reported, and parsing
/// continues with the next block where possible.
pub fn parse_objects(file: &str, content: &str) -> (Vec<ObjectDefinition>, Vec<SyntaxIssue>) {
    let mut objects = Vec::new();
    let mut issues = Vec::new();
    let mut current: Option<ObjectDefinition> = None;

    for (idx, raw) in content.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }
        let line = strip_inline_comment(trimmed).trim();

        if let Some(rest) = line.strip_prefix("define") {
            if let Some(open) = current.take() {
                issues.push(SyntaxIssue::new(
                    file,
                    open.line,
                    format!("'{}' block is not closed before the next define", open.kind),
                ));
            }
            let rest = rest.trim();
            let Some(kind) = rest.strip_suffix('{').map(str::trim) else {
                issues.push(SyntaxIssue::new(file, line_no, "expected '{' after object type"));
                continue;
            };
            if kind.is_empty() || kind.contains(char::is_whitespace) {
                issues.push(SyntaxIssue::new(file, line_no, format!("malformed define '{}'", line)));
                continue;
            }
            if !KNOWN_TYPES.contains(&kind) {
                issues.push(SyntaxIssue::new(file, line_no, format!("unknown object type '{}'", kind)));
            }
            current = Some(ObjectDefinition {
                kind: kind.to_string(),
                directives: BTreeMap::new(),
                line: line_no,
            });
            continue;
        }

        if line == "}" {
            match current.take() {
                Some(object) => objects.push(object),
                None => issues.push(SyntaxIssue::new(file, line_no, "'}' without an open define")),
            }
            continue;
        }

        let Some(object) = current.as_mut() else {
            issues.push(SyntaxIssue::new(
                file,
                line_no,
                format!("directive outside of a define block: '{}'", line),
            ));
            continue;
        };
        let (key, value) = match line.split_once(char::is_whitespace) {
            Some((key, value)) => (key, value.trim()),
            None => (line, ""),
        };
        if value.is_empty() {
            issues.push(SyntaxIssue::new(file, line_no, format!("directive '{}' has no value", key)));
            continue;
        }
        if object.directives.insert(key.to_string(), value.to_string()).is_some() {
            issues.push(SyntaxIssue::new(
                file,
                line_no,
                format!("directive '{}' repeated in '{}' block", key, object.kind),
            ));
        }
    }

    if let Some(open) = current {
        issues.push(SyntaxIssue::new(
            file,
            open.line,
            format!("'{}' block is not closed", open.kind),
        ));
    }
    (objects, issues)
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn defined_names<'a>(all: &'a [(String, ObjectDefinition)], kind: &str) -> HashSet<&'a str> {
    let key = format!("{}_name", kind);
    all.iter()
        .filter(|(_, o)| o.kind == kind)
        .filter_map(|(_, o)| o.get(&key))
        .collect()
}

/// Validate a set of object files as one configuration.
///
/// Beyond per-file structure this checks mandatory directives, duplicate
/// names across files and references to hosts, commands and contact groups
/// that the set does not define.
pub fn validate_object_set<'a>(files: impl IntoIterator<Item = (&'a str, &'a str)>) -> Vec<SyntaxIssue> {
    let mut issues = Vec::new();
    let mut all: Vec<(String, ObjectDefinition)> = Vec::new();
    for (file, content) in files {
        let (objects, file_issues) = parse_objects(file, content);
        issues.extend(file_issues);
        all.extend(objects.into_iter().map(|o| (file.to_string(), o)));
    }

    let mut seen: HashSet<(String, String)> = HashSet::new();
    for (file, object) in &all {
        if object.is_template() {
            continue;
        }
        for key in object.missing() {
            issues.push(SyntaxIssue::new(
                file,
                object.line,
                format!("'{}' definition is missing '{}'", object.kind, key),
            ));
        }
        if let Some(identity) = object.identity() {
            if !seen.insert((object.kind.clone(), identity.clone())) {
                issues.push(SyntaxIssue::new(
                    file,
                    object.line,
                    format!("duplicate {} '{}'", object.kind, identity),
                ));
            }
        }
    }

    let hosts = defined_names(&all, "host");
    let commands = defined_names(&all, "command");
    let groups = defined_names(&all, "contactgroup");
    let contacts = defined_names(&all, "contact");

    for (file, object) in &all {
        let mut dangling = |what: &str, name: &str| {
            issues.push(SyntaxIssue::new(
                file,
                object.line,
                format!("{} references undefined {} '{}'", object.kind, what, name),
            ));
        };
        if matches!(object.kind.as_str(), "service" | "serviceescalation" | "hostgroup") {
            let key = if object.kind == "hostgroup" { "members" } else { "host_name" };
            for host in object.get(key).map(split_list).into_iter().flatten() {
                if !hosts.contains(host) {
                    dangling("host", host);
                }
            }
        }
        for key in ["check_command", "service_notification_commands", "host_notification_commands"] {
            for command in object.get(key).map(split_list).into_iter().flatten() {
                let name = command.split('!').next().unwrap_or(command);
                if !commands.contains(name) {
                    dangling("command", name);
                }
            }
        }
        for group in object.get("contact_groups").map(split_list).into_iter().flatten() {
            if !groups.contains(group) {
                dangling("contact group", group);
            }
        }
        if object.kind == "contactgroup" {
            for member in object.get("members").map(split_list).into_iter().flatten() {
                if !contacts.contains(member) {
                    dangling("contact", member);
                }
            }
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const COMMANDS: &str = "\
define command {
    command_name    check_db
    command_line    $USER1$/check_tcp -H db -p 5432 ; trailing comment
}
";

    #[test]
    fn parses_directives_and_strips_comments() {
        let (objects, issues) = parse_objects("commands.cfg", COMMANDS);

        assert!(issues.is_empty(), "{:?}", issues);
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].kind, "command");
        assert_eq!(objects[0].line, 1);
        assert_eq!(
            objects[0].get("command_line"),
            Some("$USER1$/check_tcp -H db -p 5432")
        );
    }

    #[test]
    fn reports_unclosed_and_stray_braces() {
        let (_, issues) = parse_objects("x.cfg", "define host {\n host_name a\n");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].line, 1);
        assert!(issues[0].message.contains("not closed"));

        let (_, issues) = parse_objects("x.cfg", "}\n");
        assert_eq!(issues[0].to_string(), "x.cfg:1: '}' without an open define");
    }

    #[test]
    fn reports_unknown_type_and_empty_directive() {
        let (_, issues) = parse_objects("x.cfg", "define widget {\n  color\n}\n");
        let messages: Vec<&str> = issues.iter().map(|i| i.message.as_str()).collect();

        assert_eq!(
            messages,
            vec!["unknown object type 'widget'", "directive 'color' has no value"]
        );
    }

    #[test]
    fn set_validation_finds_dangling_references() {
        let services = "\
define service {
    service_description  DB (TCP)
    host_name            host_exp_web_01
    check_command        check_db
    contact_groups       cg_payments
}
";
        let issues = validate_object_set([("commands.cfg", COMMANDS), ("services.cfg", services)]);
        let messages: Vec<&str> = issues.iter().map(|i| i.message.as_str()).collect();

        assert_eq!(
            messages,
            vec![
                "service references undefined host 'host_exp_web_01'",
                "service references undefined contact group 'cg_payments'",
            ]
        );
    }

    #[test]
    fn set_validation_finds_duplicates_and_missing_directives() {
        let issues = validate_object_set([
            ("a.cfg", COMMANDS),
            ("b.cfg", COMMANDS),
            ("c.cfg", "define command {\n command_name lonely\n}\n"),
        ]);
        let messages: Vec<String> = issues.iter().map(|i| i.to_string()).collect();

        assert_eq!(
            messages,
            vec![
                "b.cfg:1: duplicate command 'check_db'".to_string(),
                "c.cfg:1: 'command' definition is missing 'command_line'".to_string(),
            ]
        );
    }

    #[test]
    fn templates_skip_mandatory_directives() {
        let issues = validate_object_set([(
            "t.cfg",
            "define host {\n name generic\n register 0\n}\n",
        )]);
        assert!(issues.is_empty());
    }
}
