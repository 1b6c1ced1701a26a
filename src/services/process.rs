// Process listing backed by sysinfo

use super::traits::{ProcessInfo, ProcessSource};
use std::collections::HashMap;
use sysinfo::System;

/// Lists the processes of the local machine
///
/// Each call takes a fresh snapshot; nothing is cached between calls.
#[derive(Default)]
pub struct SystemProcessSource;

impl SystemProcessSource {
    pub fn new() -> Self {
        Self
    }
}

/// Split `KEY=VALUE` environment entries; entries without `=` are ignored
fn parse_environ(environ: &[String]) -> HashMap<String, String> {
    environ
        .iter()
        .filter_map(|entry| entry.split_once('='))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

impl ProcessSource for SystemProcessSource {
    fn processes(&self) -> Vec<ProcessInfo> {
        let mut sys = System::new();
        sys.refresh_processes();

        sys.processes()
            .values()
            .filter(|process| !process.cmd().is_empty())
            .map(|process| ProcessInfo {
                pid: process.pid().as_u32(),
                parent_pid: process.parent().map(|pid| pid.as_u32()),
                args: process.cmd().to_vec(),
                env: parse_environ(process.environ()),
                cwd: process.cwd().map(|path| path.to_path_buf()),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_environ() {
        let env = parse_environ(&[
            "JBOSS_HOME=/opt/jboss".to_string(),
            "EMPTY=".to_string(),
            "garbage".to_string(),
            "OPTS=-Da=b".to_string(),
        ]);
        assert_eq!(env.len(), 3);
        assert_eq!(env["JBOSS_HOME"], "/opt/jboss");
        assert_eq!(env["EMPTY"], "");
        assert_eq!(env["OPTS"], "-Da=b");
    }

    #[test]
    fn test_lists_current_process() {
        let source = SystemProcessSource::new();
        let own_pid = std::process::id();
        let processes = source.processes();
        // Restricted environments may hide command lines; only check when visible
        if let Some(own) = processes.iter().find(|p| p.pid == own_pid) {
            assert!(!own.args.is_empty());
        }
    }
}
