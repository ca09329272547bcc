// file: src/rules/script.rs
// version: 1.0.0
// guid: 7a1d4f60-e8c3-4b92-b5d7-0c3e9a2f6b81

//! Remote command builders and snapshot replay scripts
//!
//! A snapshot is the captured output of [`save_command`]: blocks separated
//! by blank lines, where the first line of a block names the table and the
//! remaining lines are `iptables -S` rule specs for it.

use super::TableSet;
use crate::error::{MultirouterError, Result};

/// One table's worth of rules from a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableBlock {
    pub table: String,
    pub rules: Vec<String>,
}

/// Listing command: a header line per table followed by its numbered rules
pub fn list_command(tables: &TableSet, verbose: bool) -> String {
    tables
        .iter()
        .map(|table| {
            format!(
                "printf \"\\n{table}\\n\" && iptables -L -t {table} --line-numbers{}",
                if verbose { " -v" } else { "" }
            )
        })
        .collect::<Vec<_>>()
        .join(" && ")
}

/// Snapshot command: a header line per table followed by replayable rule specs
pub fn save_command(tables: &TableSet) -> String {
    tables
        .iter()
        .map(|table| format!("printf \"\\n{table}\\n\" && iptables -S -t {table}"))
        .collect::<Vec<_>>()
        .join(" && ")
}

/// Split snapshot text into table blocks
pub fn parse_snapshot(text: &str) -> Result<Vec<TableBlock>> {
    let mut blocks = Vec::new();
    let mut current: Option<TableBlock> = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            if let Some(block) = current.take() {
                blocks.push(block);
            }
            continue;
        }
        match current.as_mut() {
            Some(block) => block.rules.push(line.to_string()),
            None => {
                if !is_table_name(line) {
                    return Err(MultirouterError::validation(format!(
                        "'{}' is not a table name",
                        line
                    )));
                }
                current = Some(TableBlock {
                    table: line.to_string(),
                    rules: Vec::new(),
                });
            }
        }
    }
    if let Some(block) = current {
        blocks.push(block);
    }

    Ok(blocks)
}

/// Flush-then-replay script for every table in a snapshot
pub fn replay_script(blocks: &[TableBlock]) -> String {
    let mut commands = Vec::new();
    for block in blocks {
        commands.push(format!("iptables -t {} -F", block.table));
        for rule in &block.rules {
            commands.push(format!("iptables -t {} {}", block.table, rule));
        }
    }
    commands.join(" && ")
}

fn is_table_name(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        && !s.starts_with('-')
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = "\nfilter\n-P INPUT ACCEPT\n-P FORWARD DROP\n-A INPUT -p tcp --dport 22 -j ACCEPT\n\nnat\n-P PREROUTING ACCEPT\n-A POSTROUTING -o eth0 -j MASQUERADE\n";

    #[test]
    fn test_list_command_verbose() {
        let tables = TableSet::new(&["filter"]);
        assert_eq!(
            list_command(&tables, true),
            "printf \"\\nfilter\\n\" && iptables -L -t filter --line-numbers -v"
        );
        assert!(!list_command(&tables, false).contains(" -v"));
    }

    #[test]
    fn test_save_command_covers_every_table() {
        let cmd = save_command(&TableSet::default());
        assert_eq!(
            cmd,
            "printf \"\\nfilter\\n\" && iptables -S -t filter && printf \"\\nnat\\n\" && iptables -S -t nat"
        );
    }

    #[test]
    fn test_parse_snapshot_blocks() {
        // Act
        let blocks = parse_snapshot(SNAPSHOT).unwrap();

        // Assert
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].table, "filter");
        assert_eq!(blocks[0].rules.len(), 3);
        assert_eq!(blocks[1].table, "nat");
        assert_eq!(blocks[1].rules[1], "-A POSTROUTING -o eth0 -j MASQUERADE");
    }

    #[test]
    fn test_replay_script_flushes_each_table_first() {
        let script = replay_script(&parse_snapshot(SNAPSHOT).unwrap());
        assert_eq!(
            script,
            "iptables -t filter -F && iptables -t filter -P INPUT ACCEPT && \
             iptables -t filter -P FORWARD DROP && \
             iptables -t filter -A INPUT -p tcp --dport 22 -j ACCEPT && \
             iptables -t nat -F && iptables -t nat -P PREROUTING ACCEPT && \
             iptables -t nat -A POSTROUTING -o eth0 -j MASQUERADE"
        );
    }

    #[test]
    fn test_replay_is_deterministic() {
        let first = replay_script(&parse_snapshot(SNAPSHOT).unwrap());
        let second = replay_script(&parse_snapshot(SNAPSHOT).unwrap());
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_table_only_flushes() {
        let blocks = parse_snapshot("\nraw\n\nfilter\n-A INPUT -j DROP\n").unwrap();
        assert_eq!(
            replay_script(&blocks),
            "iptables -t raw -F && iptables -t filter -F && iptables -t filter -A INPUT -j DROP"
        );
    }

    #[test]
    fn test_rejects_rule_where_table_expected() {
        let err = parse_snapshot("-A INPUT -j DROP\n").unwrap_err();
        assert!(matches!(err, MultirouterError::Validation(_)));
    }
}
