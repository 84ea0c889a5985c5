//! Remote backups and rollback
//!
//! Before the first write to a host, every file about to be replaced is
//! copied into a timestamped directory on that host and the mapping is
//! appended to `<state_dir>/backups.jsonl`. A file that did not exist is
//! recorded as a tombstone and removed again on rollback.

use crate::transport::{RemoteTransport, TransportError};
use crate::Result;
use chrono::{DateTime, Utc};
use mon_fs::{JsonLines, NormalizedPath};
use mon_model::Host;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupEntry {
    pub remote_path: String,
    /// `None` is a tombstone: the file did not exist before.
    #[serde(default)]
    pub backup_path: Option<String>,
}

impl BackupEntry {
    pub fn is_tombstone(&self) -> bool {
        self.backup_path.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub id: String,
    pub created: DateTime<Utc>,
    pub environment: String,
    pub host: String,
    pub entries: Vec<BackupEntry>,
}

impl BackupRecord {
    pub fn tombstones(&self) -> usize {
        self.entries.iter().filter(|e| e.is_tombstone()).count()
    }
}

/// A remote file about to be replaced and where its copy goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupTarget {
    pub remote_path: String,
    pub backup_dir: String,
}

/// Copy the current content of every target into a fresh backup directory
/// on `host`. The record is returned, not persisted.
pub fn create(
    transport: &dyn RemoteTransport,
    host: &Host,
    environment: &str,
    targets: &[BackupTarget],
) -> std::result::Result<BackupRecord, TransportError> {
    let created = Utc::now();
    let id = uuid::Uuid::new_v4().to_string();
    let folder = format!("{}-{}", created.format("%Y%m%dT%H%M%SZ"), &id[..8]);

    let mut entries = Vec::with_capacity(targets.len());
    for target in targets {
        let backup_path = match transport.read_file(host, &target.remote_path)? {
            Some(content) => {
                let path = format!(
                    "{}/{}/{}",
                    target.backup_dir.trim_end_matches('/'),
                    folder,
                    target.remote_path.trim_start_matches('/')
                );
                transport.write_file(host, &path, &content)?;
                Some(path)
            }
            None => None,
        };
        entries.push(BackupEntry {
            remote_path: target.remote_path.clone(),
            backup_path,
        });
    }

    let record = BackupRecord {
        id,
        created,
        environment: environment.to_string(),
        host: host.identifier.clone(),
        entries,
    };
    tracing::info!(
        host = %host.identifier,
        backup = %record.id,
        files = record.entries.len(),
        tombstones = record.tombstones(),
        stage = "backup",
        "backed up remote configuration"
    );
    Ok(record)
}

/// Put every file of `record` back: copies are restored and tombstoned
/// files removed. All entries are attempted; the first error is returned.
pub fn restore(
    transport: &dyn RemoteTransport,
    host: &Host,
    record: &BackupRecord,
) -> std::result::Result<(), TransportError> {
    let mut first_error = None;
    for entry in &record.entries {
        let result = match &entry.backup_path {
            None => transport.remove_file(host, &entry.remote_path),
            Some(backup) => match transport.read_file(host, backup) {
                Ok(Some(content)) => transport.write_file(host, &entry.remote_path, &content),
                Ok(None) => Err(TransportError::file(host, "restore", &entry.remote_path, format!("backup copy {} is missing", backup))),
                Err(e) => Err(e),
            },
        };
        if let Err(error) = result {
            tracing::error!(host = %host.identifier, path = %entry.remote_path, "{}", error);
            first_error.get_or_insert(error);
        }
    }
    match first_error {
        Some(error) => Err(error),
        None => {
            tracing::info!(host = %host.identifier, backup = %record.id, "rolled back");
            Ok(())
        }
    }
}

/// `backups.jsonl`
#[derive(Debug, Clone)]
pub struct BackupLog {
    log: JsonLines<BackupRecord>,
}

impl BackupLog {
    pub fn new(path: NormalizedPath) -> Self {
        Self {
            log: JsonLines::new(path),
        }
    }

    pub fn path(&self) -> &NormalizedPath {
        self.log.path()
    }

    pub fn append(&self, record: &BackupRecord) -> Result<()> {
        Ok(self.log.append(record)?)
    }

    /// Every record, oldest first.
    pub fn records(&self) -> Result<Vec<BackupRecord>> {
        Ok(self.log.read_all()?)
    }

    pub fn get(&self, id: &str) -> Result<Option<BackupRecord>> {
        Ok(self.records()?.into_iter().find(|r| r.id == id || r.id.starts_with(id)))
    }

    /// Most recent record for a host of an environment.
    pub fn latest(&self, environment: &str, host: &str) -> Result<Option<BackupRecord>> {
        Ok(self
            .records()?
            .into_iter()
            .rev()
            .find(|r| r.environment.eq_ignore_ascii_case(environment) && r.host == host))
    }

    /// Keep the `keep` most recent records per (environment, host) and drop
    /// the rest from the log. Returns the dropped records. Backup copies on
    /// the hosts are not touched.
    pub fn prune(&self, keep: usize) -> Result<Vec<BackupRecord>> {
        let records = self.records()?;
        let mut seen: HashMap<(String, String), usize> = HashMap::new();
        let mut kept = Vec::new();
        let mut dropped = Vec::new();
        for record in records.into_iter().rev() {
            let count = seen
                .entry((record.environment.to_lowercase(), record.host.clone()))
                .or_default();
            *count += 1;
            if *count <= keep {
                kept.push(record);
            } else {
                dropped.push(record);
            }
        }
        if !dropped.is_empty() {
            kept.reverse();
            self.log.rewrite(&kept)?;
            tracing::info!(dropped = dropped.len(), kept = kept.len(), "pruned backup log");
        }
        dropped.reverse();
        Ok(dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::LocalTransport;
    use mon_model::HostKind;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tempfile::TempDir;

    fn targets() -> Vec<BackupTarget> {
        ["/etc/nagios/objects/hosts.cfg", "/etc/nagios/objects/services.cfg"]
            .into_iter()
            .map(|p| BackupTarget {
                remote_path: p.into(),
                backup_dir: "/var/backups/monforge/nagios".into(),
            })
            .collect()
    }

    #[test]
    fn absent_files_become_tombstones() {
        let temp = TempDir::new().unwrap();
        let transport = LocalTransport::new(temp.path(), Duration::from_secs(10));
        let host = Host::new(HostKind::Host, "web-01");
        transport.write_file(&host, "/etc/nagios/objects/hosts.cfg", b"old hosts").unwrap();

        let record = create(&transport, &host, "EXP", &targets()).unwrap();

        assert_eq!(record.entries.len(), 2);
        assert_eq!(record.tombstones(), 1);
        let copy = record.entries[0].backup_path.as_deref().unwrap();
        assert!(copy.starts_with("/var/backups/monforge/nagios/"));
        assert!(copy.ends_with("/etc/nagios/objects/hosts.cfg"));
        assert_eq!(transport.read_file(&host, copy).unwrap(), Some(b"old hosts".to_vec()));
    }

    #[test]
    fn restore_reverts_writes_and_removes_new_files() {
        let temp = TempDir::new().unwrap();
        let transport = LocalTransport::new(temp.path(), Duration::from_secs(10));
        let host = Host::new(HostKind::Host, "web-01");
        transport.write_file(&host, "/etc/nagios/objects/hosts.cfg", b"old hosts").unwrap();
        let record = create(&transport, &host, "EXP", &targets()).unwrap();

        transport.write_file(&host, "/etc/nagios/objects/hosts.cfg", b"new hosts").unwrap();
        transport.write_file(&host, "/etc/nagios/objects/services.cfg", b"new services").unwrap();
        restore(&transport, &host, &record).unwrap();

        assert_eq!(
            transport.read_file(&host, "/etc/nagios/objects/hosts.cfg").unwrap(),
            Some(b"old hosts".to_vec())
        );
        assert_eq!(transport.read_file(&host, "/etc/nagios/objects/services.cfg").unwrap(), None);
    }

    fn record(id: &str, host: &str) -> BackupRecord {
        BackupRecord {
            id: id.into(),
            created: Utc::now(),
            environment: "EXP".into(),
            host: host.into(),
            entries: vec![],
        }
    }

    #[test]
    fn prune_keeps_the_newest_per_host() {
        let temp = TempDir::new().unwrap();
        let log = BackupLog::new(NormalizedPath::new(temp.path().join("backups.jsonl")));
        for (id, host) in [("a1", "web-01"), ("b1", "web-02"), ("a2", "web-01"), ("a3", "web-01")] {
            log.append(&record(id, host)).unwrap();
        }

        let dropped = log.prune(2).unwrap();

        assert_eq!(dropped.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["a1"]);
        let kept: Vec<String> = log.records().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(kept, vec!["b1", "a2", "a3"]);
        assert_eq!(log.latest("exp", "web-01").unwrap().unwrap().id, "a3");
        assert_eq!(log.get("b1").unwrap().unwrap().host, "web-02");
    }
}
