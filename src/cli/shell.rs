// file: src/cli/shell.rs
// version: 1.0.0
// guid: 2b7d9e41-c5a3-4f80-9d16-e0f4b8a2c753

//! Interactive command shell over the rule set manager

use crate::error::{MultirouterError, Result};
use crate::fleet::{Selection, Target};
use crate::inventory::{Credential, Host};
use crate::logging::with_async_operation_span;
use crate::network::SessionPool;
use crate::rules::RuleSetManager;
use std::collections::VecDeque;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{debug, info, warn};

pub const INTRO: &str =
    "Welcome to Multirouter, the tool for configuring multiple iptables routers over SSH.\n";
pub const PROMPT: &str = "> ";

const LOAD_NOTICE: &str = "WARNING: this operation will reset the tables, but it will NOT change the default policies.\nMake sure you set your policies to accept traffic or you're in for a bad time.\nProceed? (yes/no) ";

const HELP: &str = "
Commands:

cmd [sudo] <command>                      Run a command on the current context
hosts                                     List hosts
hosts add <host> <user> <password> [port] [sshkey]
hosts remove <host|index> ...             Remove hosts by address or number
tables                                    List managed tables
tables add <table> ...                    Add tables
tables remove <table|index> ...           Remove tables by name or number
list [-v] [all | <host|index> ...]        List rules
context                                   Show the context
context set <host|index> ... | all        Set the context
context reset                             Unset the context
iptables [all | <host|index> ...] <args>  Run iptables (hosts required when the context is not set)
save [directory]                          Save rules to a directory (default save_<timestamp>)
load <directory>                          Replace rules from a saved directory
help                                      Show this help
exit                                      Leave the shell
";

/// Source of operator input lines
pub trait LineSource {
    /// Show `prompt` and return the next line, or `None` at end of input
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;
}

/// Reads lines from standard input without holding its lock between calls
#[derive(Debug, Default)]
pub struct StdinLines;

impl LineSource for StdinLines {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        let mut stdout = io::stdout();
        write!(stdout, "{}", prompt)?;
        stdout.flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

/// Replays a fixed list of lines
#[derive(Debug, Default)]
pub struct ScriptedLines {
    lines: VecDeque<String>,
}

impl ScriptedLines {
    pub fn new<S: AsRef<str>>(lines: &[S]) -> Self {
        Self {
            lines: lines.iter().map(|l| l.as_ref().to_string()).collect(),
        }
    }
}

impl LineSource for ScriptedLines {
    fn read_line(&mut self, _prompt: &str) -> Result<Option<String>> {
        Ok(self.lines.pop_front())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostsAction {
    Show,
    Add(Host),
    Remove(Selection),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TablesAction {
    Show,
    Add(Vec<String>),
    Remove(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextAction {
    Show,
    Set(Selection),
    SetAll,
    Reset,
}

/// One parsed shell line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Empty,
    Cmd { sudo: bool, command: String },
    Hosts(HostsAction),
    Tables(TablesAction),
    List { verbose: bool, target: Target },
    Context(ContextAction),
    Iptables { target: Target, args: String },
    Save(Option<PathBuf>),
    Load(PathBuf),
    Help,
    Exit,
}

impl Command {
    /// Name used for the operation span
    pub fn name(&self) -> &'static str {
        match self {
            Command::Empty => "empty",
            Command::Cmd { .. } => "cmd",
            Command::Hosts(_) => "hosts",
            Command::Tables(_) => "tables",
            Command::List { .. } => "list",
            Command::Context(_) => "context",
            Command::Iptables { .. } => "iptables",
            Command::Save(_) => "save",
            Command::Load(_) => "load",
            Command::Help => "help",
            Command::Exit => "exit",
        }
    }
}

fn invalid() -> MultirouterError {
    MultirouterError::validation("Args invalid")
}

/// Parse one input line into a command
pub fn parse_command(line: &str) -> Result<Command> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (line, ""),
    };
    let args: Vec<&str> = rest.split_whitespace().collect();

    match word {
        "" => Ok(Command::Empty),
        "cmd" => parse_cmd(&args),
        "hosts" => parse_hosts(&args),
        "tables" => parse_tables(&args),
        "list" => parse_list(&args),
        "context" => parse_context(&args),
        "iptables" => parse_iptables(rest),
        "save" => match args.as_slice() {
            [] => Ok(Command::Save(None)),
            [dir] => Ok(Command::Save(Some(PathBuf::from(dir)))),
            _ => Err(MultirouterError::validation("Too many args")),
        },
        "load" => match args.as_slice() {
            [] => Err(MultirouterError::validation("Directory name required")),
            [dir] => Ok(Command::Load(PathBuf::from(dir))),
            _ => Err(invalid()),
        },
        "help" | "?" => Ok(Command::Help),
        "exit" | "quit" => Ok(Command::Exit),
        other => Err(MultirouterError::validation(format!(
            "Unknown command: {} (try `help`)",
            other
        ))),
    }
}

fn parse_cmd(args: &[&str]) -> Result<Command> {
    match args {
        [] => Ok(Command::Empty),
        ["sudo", rest @ ..] => Ok(Command::Cmd {
            sudo: true,
            command: rest.join(" "),
        }),
        _ => Ok(Command::Cmd {
            sudo: false,
            command: args.join(" "),
        }),
    }
}

fn parse_hosts(args: &[&str]) -> Result<Command> {
    match args {
        [] => Ok(Command::Hosts(HostsAction::Show)),
        ["add", rest @ ..] => parse_host_entry(rest).map(|h| Command::Hosts(HostsAction::Add(h))),
        ["remove", rest @ ..] if !rest.is_empty() => {
            let selection = Selection::classify(rest).map_err(|_| invalid())?;
            Ok(Command::Hosts(HostsAction::Remove(selection)))
        }
        _ => Err(invalid()),
    }
}

/// `<host> <user> <password> [port] [sshkey]`; a lone fourth field that is
/// not a number is taken as the key file
fn parse_host_entry(args: &[&str]) -> Result<Host> {
    let (address, user, password, extra) = match args {
        [address, user, password, extra @ ..] if extra.len() <= 2 => {
            (*address, *user, *password, extra)
        }
        _ => return Err(invalid()),
    };

    let (port, key) = match extra {
        [] => (None, None),
        [field] => match field.parse::<u16>() {
            Ok(port) => (Some(port), None),
            Err(_) => (None, Some(*field)),
        },
        [port, key] => {
            let port = port.parse::<u16>().map_err(|_| invalid())?;
            (Some(port), Some(*key))
        }
        _ => return Err(invalid()),
    };

    if port == Some(0) {
        return Err(invalid());
    }

    let credential = match key {
        Some(key) => Credential::with_key(user, password, key),
        None => Credential::new(user, password),
    };
    Ok(match port {
        Some(port) => Host::with_port(address, credential, port),
        None => Host::new(address, credential),
    })
}

fn parse_tables(args: &[&str]) -> Result<Command> {
    let owned = |rest: &[&str]| rest.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    match args {
        [] => Ok(Command::Tables(TablesAction::Show)),
        ["add", rest @ ..] if !rest.is_empty() => Ok(Command::Tables(TablesAction::Add(owned(rest)))),
        ["remove", rest @ ..] if !rest.is_empty() => {
            Ok(Command::Tables(TablesAction::Remove(owned(rest))))
        }
        _ => Err(invalid()),
    }
}

fn parse_list(args: &[&str]) -> Result<Command> {
    let verbose = args.contains(&"-v");
    let rest: Vec<&str> = args.iter().copied().filter(|a| *a != "-v").collect();
    let target = if rest.is_empty() {
        Target::Context
    } else if rest.iter().any(|a| *a == "all" || *a == "a") {
        Target::All
    } else {
        Target::Hosts(Selection::classify(rest.as_slice()).map_err(|_| invalid())?)
    };
    Ok(Command::List { verbose, target })
}

fn parse_context(args: &[&str]) -> Result<Command> {
    match args {
        [] => Ok(Command::Context(ContextAction::Show)),
        ["reset"] => Ok(Command::Context(ContextAction::Reset)),
        ["set", rest @ ..] if !rest.is_empty() => {
            if rest.contains(&"all") {
                Ok(Command::Context(ContextAction::SetAll))
            } else {
                let selection = Selection::classify(rest).map_err(|_| invalid())?;
                Ok(Command::Context(ContextAction::Set(selection)))
            }
        }
        _ => Err(invalid()),
    }
}

/// Everything before the first `-` selects hosts; the rest goes to iptables
fn parse_iptables(rest: &str) -> Result<Command> {
    let Some(idx) = rest.find('-') else {
        return Err(MultirouterError::validation(
            "iptables arguments must start with '-'",
        ));
    };
    let selectors: Vec<&str> = rest[..idx].split_whitespace().collect();
    let args = rest[idx..].trim().to_string();

    let target = if selectors.is_empty() {
        Target::Context
    } else if selectors.contains(&"all") {
        Target::All
    } else {
        Target::Hosts(Selection::classify(selectors.as_slice()).map_err(|_| invalid())?)
    };
    Ok(Command::Iptables { target, args })
}

/// Default snapshot directory name for the local time
pub fn default_save_dir() -> PathBuf {
    PathBuf::from(chrono::Local::now().format("save_%b-%d-%Y_%H%M").to_string())
}

/// Whether the shell keeps reading after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct Shell<P: SessionPool> {
    manager: RuleSetManager<P>,
    out: Box<dyn Write + Send>,
}

impl<P: SessionPool> Shell<P> {
    pub fn new(manager: RuleSetManager<P>) -> Self {
        Self {
            manager,
            out: Box::new(io::stdout()),
        }
    }

    pub fn with_output(mut self, out: Box<dyn Write + Send>) -> Self {
        self.out = out;
        self
    }

    pub fn manager(&self) -> &RuleSetManager<P> {
        &self.manager
    }

    /// Read and run commands until `exit` or end of input
    pub async fn run(&mut self, input: &mut dyn LineSource) -> Result<()> {
        writeln!(self.out, "{}", INTRO)?;
        self.out.flush()?;

        loop {
            let Some(line) = input.read_line(PROMPT)? else {
                writeln!(self.out, "\n")?;
                break;
            };
            if self.handle_line(&line, input).await == Flow::Exit {
                break;
            }
        }

        info!("Shell closed");
        Ok(())
    }

    /// Parse and run one line, printing any rejection
    pub async fn handle_line(&mut self, line: &str, input: &mut dyn LineSource) -> Flow {
        let outcome = match parse_command(line) {
            Ok(command) => {
                debug!("Running {:?}", command.name());
                let this = &mut *self;
                with_async_operation_span(command.name(), move || this.execute(command, input))
                    .await
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(flow) => flow,
            Err(MultirouterError::DestructiveActionAborted) => Flow::Continue,
            Err(e) => {
                if !e.is_rejection() {
                    warn!("{} failed: {}", line.trim(), e);
                }
                let _ = writeln!(self.out, "{}", e);
                let _ = self.out.flush();
                Flow::Continue
            }
        }
    }

    async fn execute(&mut self, command: Command, input: &mut dyn LineSource) -> Result<Flow> {
        match command {
            Command::Empty => {}
            Command::Cmd { sudo, command } => {
                if !command.is_empty() {
                    self.manager.run_raw(&command, sudo, &Target::Context).await?;
                }
            }
            Command::Hosts(action) => self.hosts(action)?,
            Command::Tables(action) => {
                match action {
                    TablesAction::Show => {}
                    TablesAction::Add(tables) => self.manager.add_tables(tables.as_slice()),
                    TablesAction::Remove(tables) => self.manager.remove_tables(tables.as_slice()),
                }
                self.manager.print_tables()?;
            }
            Command::List { verbose, target } => {
                self.manager.list_rules(verbose, &target).await?;
            }
            Command::Context(action) => {
                match action {
                    ContextAction::Show => {}
                    ContextAction::Set(selection) => self.manager.set_context_selection(&selection)?,
                    ContextAction::SetAll => self.manager.set_context_all(),
                    ContextAction::Reset => self.manager.reset_context(),
                }
                self.manager.print_context()?;
            }
            Command::Iptables { target, args } => {
                self.manager.run_iptables(&args, &target).await?;
            }
            Command::Save(dir) => {
                let dir = dir.unwrap_or_else(default_save_dir);
                if dir.exists() {
                    return Err(MultirouterError::validation(format!(
                        "Directory already exists: {}",
                        dir.display()
                    )));
                }
                self.manager.save(&dir).await?;
            }
            Command::Load(dir) => self.load(&dir, input).await?,
            Command::Help => writeln!(self.out, "{}", HELP)?,
            Command::Exit => return Ok(Flow::Exit),
        }
        self.out.flush()?;
        Ok(Flow::Continue)
    }

    fn hosts(&mut self, action: HostsAction) -> Result<()> {
        match action {
            HostsAction::Show => {}
            HostsAction::Add(host) => self.manager.add_host(host),
            HostsAction::Remove(Selection::ByAddress(set)) => {
                let addresses: Vec<&String> = set.iter().collect();
                self.manager.remove_hosts(&addresses);
            }
            HostsAction::Remove(Selection::ByIndex(set)) => {
                let indices: Vec<i64> = set.into_iter().collect();
                self.manager.remove_hosts_by_indices(&indices);
            }
        }
        self.manager.print_hosts()
    }

    async fn load(&mut self, dir: &std::path::Path, input: &mut dyn LineSource) -> Result<()> {
        if !dir.is_dir() {
            return Err(MultirouterError::validation(format!(
                "Directory doesn't exist: {}",
                dir.display()
            )));
        }
        let files = RuleSetManager::<P>::snapshot_files(dir)?;

        let mut prompt = LOAD_NOTICE;
        let proceed = loop {
            match input.read_line(prompt)?.as_deref() {
                Some("yes") => break true,
                Some("no") | None => break false,
                Some(_) => {
                    writeln!(self.out, "Answer must be `yes` or `no`")?;
                    prompt = "Proceed? (yes/no) ";
                }
            }
        };

        if !proceed {
            writeln!(self.out, "\nGood call\nSee you when you're ready.\n")?;
            return Ok(());
        }
        self.manager.load(&files).await?;
        Ok(())
    }
}
