//! Rendering of object definitions

use crate::{CheckCommand, CheckSchedule};
use mon_model::{Environment, ServiceDescriptor, slugify};
use std::collections::HashMap;

/// Directive column width; keys at least this long still get one space.
const KEY_WIDTH: usize = 31;

const NOTIFY_HOST_BY_EMAIL: &str = r#"/usr/bin/printf "%b" "***** Monforge *****\n\nNotification Type: $NOTIFICATIONTYPE$\nHost: $HOSTNAME$\nState: $HOSTSTATE$\nAddress: $HOSTADDRESS$\nInfo: $HOSTOUTPUT$\n\nDate/Time: $LONGDATETIME$\n" | /usr/bin/mail -s "** $NOTIFICATIONTYPE$ Host Alert: $HOSTNAME$ is $HOSTSTATE$ **" $CONTACTEMAIL$"#;
const NOTIFY_SERVICE_BY_EMAIL: &str = r#"/usr/bin/printf "%b" "***** Monforge *****\n\nNotification Type: $NOTIFICATIONTYPE$\nService: $SERVICEDESC$\nHost: $HOSTALIAS$\nAddress: $HOSTADDRESS$\nState: $SERVICESTATE$\n\nDate/Time: $LONGDATETIME$\n\nAdditional Info:\n\n$SERVICEOUTPUT$\n" | /usr/bin/mail -s "** $NOTIFICATIONTYPE$ Service Alert: $HOSTALIAS$/$SERVICEDESC$ is $SERVICESTATE$ **" $CONTACTEMAIL$"#;

/// Rendered object files for one environment.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckSystemFiles {
    pub hosts: String,
    pub services: String,
    pub contacts: String,
    pub commands: String,
}

impl CheckSystemFiles {
    /// `(file name, content)` pairs in load order.
    pub fn files(&self) -> [(&'static str, &str); 4] {
        [
            ("commands.cfg", &self.commands),
            ("contacts.cfg", &self.contacts),
            ("hosts.cfg", &self.hosts),
            ("services.cfg", &self.services),
        ]
    }
}

struct Block {
    kind: &'static str,
    fields: Vec<(&'static str, String)>,
}

impl Block {
    fn new(kind: &'static str) -> Self {
        Self {
            kind,
            fields: Vec::new(),
        }
    }

    fn field(mut self, key: &'static str, value: impl ToString) -> Self {
        self.fields.push((key, value.to_string()));
        self
    }

    fn schedule(self, schedule: &CheckSchedule) -> Self {
        self.field("check_interval", schedule.check_interval)
            .field("retry_interval", schedule.retry_interval)
            .field("max_check_attempts", schedule.max_check_attempts)
            .field("check_period", "24x7")
            .field("notification_interval", schedule.notification_interval)
            .field("notification_period", "24x7")
            .field("notifications_enabled", u8::from(schedule.notifications_enabled))
    }

    fn write_to(&self, out: &mut String) {
        out.push_str(&format!("define {} {{\n", self.kind));
        for (key, value) in &self.fields {
            out.push_str(&format!("    {:<width$} {}\n", key, value, width = KEY_WIDTH));
        }
        out.push_str("}\n\n");
    }
}

fn header(kind: &str, descriptor: &ServiceDescriptor, environment: &Environment) -> String {
    format!(
        "# {} for {} ({})\n# Generated by monforge. Changes are overwritten on the next deployment.\n\n",
        kind, descriptor.identification.name, environment.name
    )
}

struct HealthCheck {
    command_name: String,
    command_line: String,
    schedule: CheckSchedule,
}

/// Split `scheme://host[:port]/path` into the pieces check_http needs.
fn health_check(descriptor: &ServiceDescriptor) -> Option<HealthCheck> {
    let details = descriptor.health_endpoint()?;
    let endpoint = details.endpoint.trim();
    let (tls, rest) = match endpoint.split_once("://") {
        Some((scheme, rest)) => (scheme.eq_ignore_ascii_case("https"), rest),
        None => (false, endpoint),
    };
    let (authority, path) = match rest.find('/') {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, "/"),
    };
    let (host, port) = match authority.rsplit_once(':') {
        Some((host, port)) if port.parse::<u16>().is_ok() => (host, Some(port)),
        _ => (authority, None),
    };

    let mut command_line = format!("check_http -H {}", host);
    if let Some(port) = port {
        command_line.push_str(&format!(" -p {}", port));
    }
    command_line.push_str(&format!(" -u {} -t 30", path));
    if tls {
        command_line.push_str(" -S");
    }

    let mut schedule = CheckSchedule::for_priority(descriptor.identification.priority);
    if let Some(seconds) = details.interval_sec {
        schedule = schedule.with_interval_secs(seconds);
    }
    Some(HealthCheck {
        command_name: format!("check_health_{}", descriptor.slug()),
        command_line,
        schedule,
    })
}

/// Assign each check a command name unique within the set.
fn unique_command_names(checks: &[CheckCommand]) -> Vec<String> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    checks
        .iter()
        .map(|check| {
            let count = seen.entry(check.command_name.as_str()).or_insert(0);
            *count += 1;
            if *count == 1 {
                check.command_name.clone()
            } else {
                format!("{}_{}", check.command_name, count)
            }
        })
        .collect()
}

/// Render the object files for `environment`.
///
/// Output is a pure function of its inputs (no timestamps), so unchanged
/// descriptors produce byte-identical files.
pub fn render_environment(
    descriptor: &ServiceDescriptor,
    environment: &Environment,
    checks: &[CheckCommand],
) -> CheckSystemFiles {
    let contact_group =
        (!descriptor.responsibles.is_empty()).then(|| descriptor.contact_group());
    let host_schedule = CheckSchedule::for_priority(descriptor.identification.priority);
    let host_names: Vec<String> = environment
        .hosts
        .iter()
        .map(|h| h.object_name(&environment.name))
        .collect();
    let health = health_check(descriptor);
    let command_names = unique_command_names(checks);

    // hosts.cfg
    let mut hosts = header("Hosts", descriptor, environment);
    if !host_names.is_empty() {
        Block::new("hostgroup")
            .field(
                "hostgroup_name",
                format!("hg_{}_{}", descriptor.slug(), slugify(&environment.name)),
            )
            .field(
                "alias",
                format!("{} - {}", descriptor.identification.name, environment.name),
            )
            .field("members", host_names.join(","))
            .write_to(&mut hosts);
    }
    for (host, name) in environment.hosts.iter().zip(&host_names) {
        let mut block = Block::new("host")
            .field("host_name", name)
            .field("alias", format!("{} - {}", environment.name, host.identifier))
            .field("address", host.address())
            .field("check_command", "check_host_alive")
            .schedule(&host_schedule);
        if let Some(group) = &contact_group {
            block = block.field("contact_groups", group);
        }
        block
            .field("_environment", &environment.name)
            .field("_host_type", host.kind)
            .field("register", 1)
            .write_to(&mut hosts);
    }

    // services.cfg
    let mut services = header("Services", descriptor, environment);
    for name in &host_names {
        if let Some(health) = &health {
            let mut block = Block::new("service")
                .field(
                    "service_description",
                    format!("Health Check - {}", descriptor.identification.name),
                )
                .field("host_name", name)
                .field("check_command", &health.command_name)
                .schedule(&health.schedule);
            if let Some(group) = &contact_group {
                block = block.field("contact_groups", group);
            }
            block.field("register", 1).write_to(&mut services);
        }
        for (check, command_name) in checks.iter().zip(&command_names) {
            let mut block = Block::new("service")
                .field("service_description", &check.service_description)
                .field("host_name", name)
                .field("check_command", command_name)
                .schedule(&check.schedule);
            if let Some(group) = &contact_group {
                block = block.field("contact_groups", group);
            }
            block
                .field("_dependency_impact", check.impact)
                .field("register", 1)
                .write_to(&mut services);
        }
    }
    if let (Some(group), false) = (&contact_group, host_names.is_empty()) {
        for check in checks.iter().filter(|c| c.escalate) {
            Block::new("serviceescalation")
                .field("host_name", host_names.join(","))
                .field("service_description", &check.service_description)
                .field("first_notification", 2)
                .field("last_notification", 0)
                .field("notification_interval", check.schedule.notification_interval.max(5))
                .field("contact_groups", group)
                .write_to(&mut services);
        }
    }

    // contacts.cfg
    let mut contacts = header("Contacts", descriptor, environment);
    for responsible in &descriptor.responsibles {
        Block::new("contact")
            .field("contact_name", responsible.contact_id())
            .field("alias", &responsible.name)
            .field("email", &responsible.email)
            .field("service_notification_period", "24x7")
            .field("host_notification_period", "24x7")
            .field("service_notification_options", "w,u,c,r")
            .field("host_notification_options", "d,u,r")
            .field("service_notification_commands", "notify-service-by-email")
            .field("host_notification_commands", "notify-host-by-email")
            .write_to(&mut contacts);
    }
    if let Some(group) = &contact_group {
        let members: Vec<String> = descriptor
            .responsibles
            .iter()
            .map(|r| r.contact_id())
            .collect();
        Block::new("contactgroup")
            .field("contactgroup_name", group)
            .field(
                "alias",
                format!("{} responsibles", descriptor.identification.name),
            )
            .field("members", members.join(","))
            .write_to(&mut contacts);
    }

    // commands.cfg
    let mut commands = header("Commands", descriptor, environment);
    Block::new("command")
        .field("command_name", "check_host_alive")
        .field(
            "command_line",
            "$USER1$/check_ping -H $HOSTADDRESS$ -w 3000.0,80% -c 5000.0,100% -p 5",
        )
        .write_to(&mut commands);
    Block::new("command")
        .field("command_name", "notify-host-by-email")
        .field("command_line", NOTIFY_HOST_BY_EMAIL)
        .write_to(&mut commands);
    Block::new("command")
        .field("command_name", "notify-service-by-email")
        .field("command_line", NOTIFY_SERVICE_BY_EMAIL)
        .write_to(&mut commands);
    if let Some(health) = &health {
        Block::new("command")
            .field("command_name", &health.command_name)
            .field("command_line", format!("$USER1$/{}", health.command_line))
            .write_to(&mut commands);
    }
    for (check, command_name) in checks.iter().zip(&command_names) {
        Block::new("command")
            .field("command_name", command_name)
            .field("command_line", format!("$USER1$/{}", check.command_line))
            .write_to(&mut commands);
    }

    CheckSystemFiles {
        hosts,
        services,
        contacts,
        commands,
    }
}
