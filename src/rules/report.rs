// file: src/rules/report.rs
// version: 1.0.0
// guid: 2e6b9c14-a07d-4f53-8b1e-d5c4f0a9e372

//! Per-host output rendering

use super::TableSet;
use crate::dispatch::ExecutionResult;
use colored::Colorize;
use std::io::{self, Write};

/// Writes dispatch results in host order under a header per host
pub struct Report<'a> {
    tables: &'a TableSet,
    colorize: bool,
}

impl<'a> Report<'a> {
    pub fn new(tables: &'a TableSet, colorize: bool) -> Self {
        Self { tables, colorize }
    }

    pub fn write_results(&self, out: &mut dyn Write, results: &[ExecutionResult]) -> io::Result<()> {
        for result in results {
            writeln!(out)?;
            writeln!(out, "{}", self.header(&result.host))?;

            if let Some(error) = &result.error {
                writeln!(out, "{}", self.paint_error(&format!("error: {}", error)))?;
                writeln!(out)?;
                continue;
            }

            for line in &result.stdout {
                writeln!(out, "{}", self.paint_line(line))?;
            }
            match result.exit_status {
                Some(0) | None => {}
                Some(code) => {
                    for line in &result.stderr {
                        writeln!(out, "{}", self.paint_error(line))?;
                    }
                    writeln!(out, "{}", self.paint_error(&format!("(exit status {})", code)))?;
                }
            }
            writeln!(out)?;
        }
        out.flush()
    }

    /// Numbered listing, as used for hosts, context and tables
    pub fn write_numbered<S: AsRef<str>>(
        &self,
        out: &mut dyn Write,
        title: &str,
        items: &[S],
    ) -> io::Result<()> {
        writeln!(out, "\n{}:\n", title)?;
        for (i, item) in items.iter().enumerate() {
            writeln!(out, "{}\t{}", i, item.as_ref())?;
        }
        writeln!(out)?;
        out.flush()
    }

    fn header(&self, host: &str) -> String {
        if self.colorize {
            host.black().on_white().to_string()
        } else {
            host.to_string()
        }
    }

    fn paint_error(&self, text: &str) -> String {
        if self.colorize {
            text.red().to_string()
        } else {
            text.to_string()
        }
    }

    fn paint_line(&self, line: &str) -> String {
        if !self.colorize {
            return line.to_string();
        }
        if self.tables.contains(line.trim()) {
            return line.yellow().to_string();
        }
        line.replace("ACCEPT", &"ACCEPT".green().to_string())
            .replace("DROP", &"DROP".red().to_string())
            .replace("REJECT", &"REJECT".red().to_string())
            .replace("DENY", &"DENY".red().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::SessionOutput;

    fn render(results: &[ExecutionResult]) -> String {
        let tables = TableSet::default();
        let mut out = Vec::new();
        Report::new(&tables, false).write_results(&mut out, results).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_results_rendered_under_host_headers() {
        let results = vec![
            ExecutionResult::from_output(
                "10.0.0.1",
                SessionOutput::completed(vec!["filter".into(), "-P INPUT ACCEPT".into()], vec![], 0),
            ),
            ExecutionResult::from_output("10.0.0.2", SessionOutput::failed("connection refused")),
        ];

        let text = render(&results);

        assert_eq!(
            text,
            "\n10.0.0.1\nfilter\n-P INPUT ACCEPT\n\n\n10.0.0.2\nerror: Host 10.0.0.2 unreachable: connection refused\n\n"
        );
    }

    #[test]
    fn test_nonzero_exit_shows_stderr() {
        let results = vec![ExecutionResult::from_output(
            "10.0.0.1",
            SessionOutput::completed(vec![], vec!["iptables: Bad rule".into()], 1),
        )];

        let text = render(&results);

        assert!(text.contains("iptables: Bad rule"));
        assert!(text.contains("(exit status 1)"));
    }

    #[test]
    fn test_numbered_listing() {
        let tables = TableSet::default();
        let mut out = Vec::new();
        Report::new(&tables, false)
            .write_numbered(&mut out, "Tables", tables.as_slice())
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "\nTables:\n\n0\tfilter\n1\tnat\n\n");
    }

    #[test]
    fn test_colorized_verdicts() {
        colored::control::set_override(true);
        let tables = TableSet::default();
        let report = Report::new(&tables, true);
        let painted = report.paint_line("-A INPUT -j DROP");
        assert!(painted.contains("\u{1b}["));
        assert!(painted.contains("DROP"));
    }
}
