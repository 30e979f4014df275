//! Interactive Morpheus shell
//!
//! Reads lines from a [`LineReader`], handles the built-in verbs (`exit`,
//! `help`, `history`, `!!`, `. FILE`, ...) and hands everything else to
//! [`dispatch::execute`]. Each line is independent: a failing command
//! prints its error and the loop moves on to the next prompt.
//!
//! Lines are queued rather than run directly, so sourced files and startup
//! scripts run in order ahead of whatever was queued behind them.

pub mod completion;
pub mod input;

use std::collections::VecDeque;
use std::fs;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing_subscriber::filter::LevelFilter;

use crate::aliases::AliasTable;
use crate::commands::{parse_args, CommandContext};
use crate::config::prompt::PromptFormatter;
use crate::config::RuntimeSettings;
use crate::dispatch::{self, split_line, Outcome, PROGRAM_NAME};
use crate::error::{Error, Result};
use crate::logging::LogHandle;
use crate::options::ConfirmOptions;
use crate::registry::CommandRegistry;
use crate::render;
use crate::session::{Sandbox, SessionContext, SessionStack};

pub use input::{EditorReader, LineReader, ReadOutcome, ScriptedReader};

/// Verbs the shell handles itself, offered for completion
pub const BUILTIN_VERBS: [&str; 12] = [
    "exit", "help", "clear", "history", "reload", "reload!", "insecure", "shell", "hello", "hi",
    "hey", "hola",
];

/// Built-in help lines
const BUILTIN_HELP: [(&str, &str); 10] = [
    ("exit [CODE]", "Exit the shell, or leave a temporary session"),
    ("help [COMMAND]", "List commands, or print usage for one"),
    ("clear", "Clear the screen"),
    ("history", "List and search command history"),
    ("!!", "Run the previous command again"),
    ("!N", "Run command N from history"),
    ("reload", "Reload configuration, remotes and history"),
    ("insecure [on|off]", "Skip TLS certificate verification"),
    ("shell -Z | -z", "Start a temporary or clean temporary session"),
    (". FILE", "Run each line of FILE as shell input"),
];

/// Deepest nesting of `. FILE` inside sourced files
const MAX_SOURCE_DEPTH: u8 = 8;

/// Flags for `morpheus shell`
#[derive(Debug, Clone, Default, Parser)]
#[command(about = "Start the interactive Morpheus shell")]
pub struct ShellArgs {
    /// Run EXPR as a single line of input and exit
    #[arg(short = 'e', long = "exec", value_name = "EXPR")]
    pub exec: Option<String>,

    /// Do not run .morpheus_profile and .morpheusrc
    #[arg(long)]
    pub norc: bool,

    /// Skip TLS certificate verification
    #[arg(short = 'I', long)]
    pub insecure: bool,

    /// Work in a temporary copy of the home directory
    #[arg(short = 'Z', long)]
    pub temporary: bool,

    /// Work in an empty temporary home directory
    #[arg(short = 'z', long)]
    pub clean: bool,

    /// Disable ANSI colors
    #[arg(short = 'C', long)]
    pub nocolor: bool,

    /// Enable debug logging
    #[arg(short = 'V', long)]
    pub debug: bool,

    /// Print the time taken by every command
    #[arg(short = 'B', long)]
    pub benchmark: bool,
}

#[derive(Debug, Parser)]
struct HistoryArgs {
    /// Only entries containing this text, or with this number
    phrase: Vec<String>,

    /// Entries per page
    #[arg(short = 'm', long)]
    max: Option<usize>,

    #[arg(short = 'o', long, default_value_t = 0)]
    offset: usize,

    /// Oldest entries first
    #[arg(short = 'r', long)]
    reverse: bool,

    /// Delete the history log
    #[arg(long)]
    flush: bool,

    #[command(flatten)]
    confirm: ConfirmOptions,
}

/// Where the shell reads confirmation answers and writes output
pub struct ShellIo {
    pub answers: Box<dyn BufRead>,
    pub out: Box<dyn Write>,
    pub err: Box<dyn Write>,
}

impl ShellIo {
    pub fn new(answers: Box<dyn BufRead>, out: Box<dyn Write>, err: Box<dyn Write>) -> Self {
        Self { answers, out, err }
    }

    /// Process stdin, stdout and stderr. Answers are read a byte at a time
    /// so nothing meant for the line editor is buffered away.
    pub fn stdio() -> Self {
        Self::new(
            Box::new(BufReader::with_capacity(1, io::stdin())),
            Box::new(io::stdout()),
            Box::new(io::stderr()),
        )
    }
}

enum Step {
    Line {
        text: String,
        record: bool,
        depth: u8,
    },
    /// Turn profile writes for `alias add` on or off
    Autosave(bool),
}

impl Step {
    fn typed(text: &str) -> Self {
        Step::Line {
            text: text.to_string(),
            record: true,
            depth: 0,
        }
    }

    fn scripted(text: &str, depth: u8) -> Self {
        Step::Line {
            text: text.to_string(),
            record: false,
            depth,
        }
    }
}

/// The interactive shell
pub struct Shell {
    registry: CommandRegistry,
    sessions: SessionStack,
    settings: RuntimeSettings,
    log: Option<LogHandle>,
    reader: Box<dyn LineReader>,
    io: ShellIo,
    /// Stack depth the shell started at; `exit` above it leaves a sandbox
    base_depth: usize,
    norc: bool,
    terminated: bool,
    exit_code: i32,
    pending: VecDeque<Step>,
}

/// Borrow the pieces of a shell a handler may touch
fn command_context<'a>(
    sessions: &'a mut SessionStack,
    settings: &'a mut RuntimeSettings,
    log: &'a Option<LogHandle>,
    io: &'a mut ShellIo,
) -> CommandContext<'a> {
    CommandContext {
        session: sessions.current_mut(),
        settings,
        log: log.as_ref(),
        input: &mut *io.answers,
        out: &mut *io.out,
        err: &mut *io.err,
    }
}

/// `("history", "-m 5")` from `"history -m 5"`
fn split_verb(line: &str) -> (&str, &str) {
    let line = line.trim();
    match line.find(char::is_whitespace) {
        Some(idx) => (&line[..idx], line[idx..].trim_start()),
        None => (line, ""),
    }
}

/// Drop a pasted leading `morpheus` word
fn strip_program_name(line: &str) -> &str {
    match split_verb(line) {
        (PROGRAM_NAME, rest) => rest,
        _ => line.trim(),
    }
}

impl Shell {
    pub fn new(
        registry: CommandRegistry,
        session: SessionContext,
        settings: RuntimeSettings,
        log: Option<LogHandle>,
        reader: Box<dyn LineReader>,
        io: ShellIo,
    ) -> Self {
        Self {
            registry,
            sessions: SessionStack::new(session),
            settings,
            log,
            reader,
            io,
            base_depth: 1,
            norc: false,
            terminated: false,
            exit_code: 0,
            pending: VecDeque::new(),
        }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn sessions(&self) -> &SessionStack {
        &self.sessions
    }

    pub fn session(&self) -> &SessionContext {
        self.sessions.current()
    }

    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// Start the shell: apply flags, run startup scripts, then either run
    /// `--exec` once or read lines until `exit` or end of input.
    ///
    /// Returns the process exit code. Sandboxes are removed on the way out.
    pub async fn run(&mut self, args: &ShellArgs) -> Result<i32> {
        self.apply_flags(args);
        if args.temporary || args.clean {
            self.enter_sandbox(args.clean)?;
        }
        self.base_depth = self.sessions.depth();
        self.norc = args.norc;

        if !self.norc {
            self.queue_startup_scripts(0);
            self.drain().await;
        }

        let result = match &args.exec {
            Some(expression) => {
                let outcome = self.execute(expression).await;
                self.exit_code = outcome.code;
                Ok(())
            }
            None => self.run_loop().await,
        };

        self.leave_all_sandboxes();
        result.map(|_| self.exit_code)
    }

    /// Prompt, read and execute lines until the shell terminates
    pub async fn run_loop(&mut self) -> Result<()> {
        info!("Morpheus shell started at {}", self.session().home.display());
        while !self.terminated {
            let prompt = self.render_prompt();
            self.reader.set_candidates(self.completion_candidates());

            match self.reader.read_line(&prompt)? {
                ReadOutcome::Line(line) => {
                    if !line.trim().is_empty() {
                        self.reader.add_history(line.trim());
                    }
                    self.execute(&line).await;
                }
                ReadOutcome::Interrupted => continue,
                ReadOutcome::Eof => {
                    writeln!(self.io.out)?;
                    self.exit_command("");
                }
            }
        }
        self.io.out.flush()?;
        Ok(())
    }

    /// Execute one line of user input and anything it queues
    pub async fn execute(&mut self, line: &str) -> Outcome {
        self.pending.push_back(Step::typed(line));
        self.drain().await
    }

    /// Prompt for the current session
    pub fn render_prompt(&self) -> String {
        let session = self.sessions.current();
        PromptFormatter::new(session.config.shell.prompt.clone())
            .render(&session.prompt_vars(), self.settings.coloring)
    }

    /// Command names, `"command subcommand"` pairs, built-ins, handler
    /// aliases and user aliases
    pub fn completion_candidates(&self) -> Vec<String> {
        let mut candidates = self.registry.list_names();
        candidates.extend(BUILTIN_VERBS.iter().map(|verb| verb.to_string()));
        candidates.extend(
            self.registry
                .aliases()
                .into_iter()
                .map(|(alias, _)| alias.to_string()),
        );
        candidates.extend(self.session().aliases.names().map(str::to_string));
        candidates
    }

    /// Push a temporary session. Unless `clean`, the parent's aliases
    /// carry over.
    pub fn enter_sandbox(&mut self, clean: bool) -> Result<()> {
        let parent_aliases = self.session().aliases.clone();
        let context = self.sessions.push_sandbox(clean)?;
        context.aliases = if clean {
            let mut aliases = AliasTable::new();
            aliases.set_autosave(parent_aliases.autosave());
            aliases
        } else {
            parent_aliases
        };

        let label = context.sandbox.as_ref().map(Sandbox::label).unwrap_or_default();
        writeln!(
            self.io.out,
            "Starting {} shell session {}",
            if clean { "clean temporary" } else { "temporary" },
            label
        )?;
        Ok(())
    }

    /// Pop the current sandbox and delete its directory
    pub fn exit_sandbox(&mut self) -> Result<()> {
        if let Some(context) = self.sessions.pop()? {
            let label = context.sandbox.as_ref().map(Sandbox::label).unwrap_or_default();
            writeln!(self.io.out, "Exited temporary shell session {}", label)?;
        }
        Ok(())
    }

    fn leave_all_sandboxes(&mut self) {
        while self.sessions.depth() > 1 {
            if let Err(e) = self.exit_sandbox() {
                warn!("{}", e);
                break;
            }
        }
    }

    fn apply_flags(&mut self, args: &ShellArgs) {
        if args.insecure {
            self.sessions.current_mut().insecure = true;
        }
        if args.nocolor {
            self.settings.coloring = false;
        }
        if args.benchmark {
            self.settings.benchmark = true;
        }
        if args.debug {
            self.settings.log_level = LevelFilter::DEBUG;
            self.apply_log_level();
        }
    }

    fn apply_log_level(&self) {
        if let Some(log) = &self.log {
            if let Err(e) = log.set_level(self.settings.log_level) {
                warn!("{}", e);
            }
        }
    }

    /// Queue the profile and rc scripts ahead of pending input. Alias
    /// autosave is off while they run so replaying the profile does not
    /// rewrite it.
    fn queue_startup_scripts(&mut self, depth: u8) {
        let session = self.session();
        let scripts = [session.profile_path(), session.rc_path()];

        let mut steps = vec![Step::Autosave(false)];
        for path in scripts.iter().filter(|path| path.is_file()) {
            match script_lines(path) {
                Ok(lines) => {
                    debug!("Running startup script {}", path.display());
                    steps.extend(lines.iter().map(|line| Step::scripted(line, depth + 1)));
                }
                Err(e) => warn!("Skipping {}: {}", path.display(), e),
            }
        }
        steps.push(Step::Autosave(true));
        self.queue_front(steps);
    }

    fn queue_front(&mut self, steps: Vec<Step>) {
        for step in steps.into_iter().rev() {
            self.pending.push_front(step);
        }
    }

    async fn drain(&mut self) -> Outcome {
        let mut outcome = Outcome::success();
        while let Some(step) = self.pending.pop_front() {
            if self.terminated {
                self.pending.clear();
                break;
            }
            match step {
                Step::Line {
                    text,
                    record,
                    depth,
                } => outcome = self.execute_line(&text, record, depth).await,
                Step::Autosave(enabled) => {
                    self.sessions.current_mut().aliases.set_autosave(enabled)
                }
            }
        }
        outcome
    }

    async fn execute_line(&mut self, line: &str, record: bool, depth: u8) -> Outcome {
        let line = strip_program_name(line);
        if line.is_empty() {
            return Outcome::success();
        }
        let (verb, rest) = split_verb(line);
        if verb == "exit" {
            return self.exit_command(rest);
        }

        let line = if line.starts_with('!') {
            match self.recall(line) {
                Ok(expanded) => strip_program_name(&expanded).to_string(),
                Err(e) => return self.report(e),
            }
        } else {
            line.to_string()
        };
        if record {
            self.record(&line);
        }

        let (verb, rest) = split_verb(&line);
        if verb.starts_with('#') {
            return Outcome::success();
        }
        match verb {
            "help" => self.help(rest),
            "clear" => self.clear(),
            "reload" => self.reload(false),
            "reload!" => self.reload(true),
            "insecure" => self.insecure(rest),
            "hello" | "hi" | "hey" | "hola" => self.greet(verb),
            "history" => self.history(rest).await,
            "shell" => self.shell_command(rest),
            "." => self.source(rest, depth),
            _ => self.dispatch(&line).await,
        }
    }

    fn record(&mut self, line: &str) {
        let session = self.sessions.current_mut();
        let context = session.context_label();
        match session.history.record(line, &context) {
            Ok(Some(number)) => trace!("Logged history entry {}", number),
            Ok(None) => trace!("Skipped repeated history command"),
            Err(e) => warn!("Failed to write history: {}", e),
        }
    }

    /// Expand `!!` or `!N` (plus any trailing words) from history
    fn recall(&mut self, line: &str) -> Result<String> {
        let (reference, rest) = split_verb(&line[1..]);
        let history = &self.session().history;
        let (label, text) = if reference == "!" {
            ("!!".to_string(), history.last().map(|entry| entry.text))
        } else {
            let text = reference
                .parse::<u64>()
                .ok()
                .and_then(|number| history.get(number))
                .map(str::to_string);
            (reference.to_string(), text)
        };

        let text = text.ok_or(Error::HistoryEntryNotFound(label))?;
        let expanded = if rest.is_empty() {
            text
        } else {
            format!("{} {}", text, rest)
        };
        writeln!(self.io.out, "{}", expanded)?;
        Ok(expanded)
    }

    fn exit_command(&mut self, rest: &str) -> Outcome {
        let code = match rest.trim() {
            "" => 0,
            text => match text.parse::<i32>() {
                Ok(code) => code,
                Err(_) => return self.report(Error::Usage("Usage: exit [CODE]".to_string())),
            },
        };

        if self.sessions.depth() > self.base_depth {
            if let Err(e) = self.exit_sandbox() {
                return self.report(e);
            }
        } else {
            debug!("Shell exiting with code {}", code);
            self.terminated = true;
            self.exit_code = code;
        }
        Outcome {
            code,
            message: None,
        }
    }

    fn help(&mut self, rest: &str) -> Outcome {
        let result = match split_verb(rest).0 {
            "" => self.print_help(),
            name => match self.registry.resolve(name) {
                Some(handler) => write!(self.io.out, "{}", handler.usage()).map_err(Error::from),
                None => Err(Error::UnknownCommand(name.to_string())),
            },
        };
        self.finish(result.map(|_| 0))
    }

    fn print_help(&mut self) -> Result<()> {
        let coloring = self.settings.coloring;
        let out = &mut *self.io.out;
        let width = self
            .registry
            .command_names()
            .iter()
            .map(|name| name.len())
            .chain(BUILTIN_HELP.iter().map(|(usage, _)| usage.len()))
            .max()
            .unwrap_or(0);

        render::print_title(out, "Commands", coloring)?;
        for handler in self.registry.handlers() {
            writeln!(out, "    {:width$}  {}", handler.name(), handler.description())?;
        }

        writeln!(out)?;
        render::print_title(out, "Shell commands", coloring)?;
        for (usage, description) in BUILTIN_HELP {
            writeln!(out, "    {:width$}  {}", usage, description)?;
        }

        let aliases = &self.sessions.current().aliases;
        if !aliases.is_empty() {
            writeln!(out)?;
            render::print_title(out, "Aliases", coloring)?;
            for (name, command) in aliases.iter() {
                writeln!(out, "    {:width$}  '{}'", name, command)?;
            }
        }

        writeln!(out)?;
        writeln!(out, "Run 'help COMMAND' or 'COMMAND --help' for details.")?;
        Ok(())
    }

    fn clear(&mut self) -> Outcome {
        let result = write!(self.io.out, "\x1b[2J\x1b[H")
            .and_then(|_| self.io.out.flush())
            .map_err(Error::from);
        self.finish(result.map(|_| 0))
    }

    /// `reload` re-reads the session files; `reload!` also forgets aliases
    /// and replays the startup scripts
    fn reload(&mut self, full: bool) -> Outcome {
        let session = self.sessions.current_mut();
        if let Err(e) = session.reinitialize() {
            return self.report(e);
        }
        self.settings = RuntimeSettings::from_config(&self.session().config);
        self.apply_log_level();

        if full {
            self.sessions.current_mut().aliases = AliasTable::new();
            if !self.norc {
                self.queue_startup_scripts(0);
            }
        }

        let result = writeln!(self.io.out, "Reloaded {}", self.session().context_label());
        self.finish(result.map(|_| 0).map_err(Error::from))
    }

    fn insecure(&mut self, rest: &str) -> Outcome {
        let enabled = match rest.trim() {
            "" | "on" => true,
            "off" => false,
            _ => return self.report(Error::Usage("Usage: insecure [on|off]".to_string())),
        };
        self.sessions.current_mut().insecure = enabled;
        let message = if enabled {
            "Insecure mode enabled. TLS certificates will not be verified."
        } else {
            "Insecure mode disabled."
        };
        let result = writeln!(self.io.out, "{}", message);
        self.finish(result.map(|_| 0).map_err(Error::from))
    }

    fn greet(&mut self, verb: &str) -> Outcome {
        let name = self.session().username().unwrap_or_else(|| "there".to_string());
        let mut greeting = verb.to_string();
        greeting[..1].make_ascii_uppercase();
        let result = writeln!(self.io.out, "{} {}!", greeting, name);
        self.finish(result.map(|_| 0).map_err(Error::from))
    }

    async fn history(&mut self, rest: &str) -> Outcome {
        let result = self.history_command(rest).await;
        self.finish(result)
    }

    async fn history_command(&mut self, rest: &str) -> Result<i32> {
        let args: HistoryArgs = parse_args("history", &split_line(rest)?)?;

        if args.flush {
            if !args.confirm.yes {
                command_context(&mut self.sessions, &mut self.settings, &self.log, &mut self.io)
                    .confirm("Are you sure you want to flush your command history?")
                    .await?;
            }
            self.sessions.current_mut().history.flush()?;
            writeln!(self.io.out, "Command history flushed")?;
            return Ok(0);
        }

        let session = self.sessions.current();
        let phrase = (!args.phrase.is_empty()).then(|| args.phrase.join(" "));
        let max = args.max.unwrap_or(session.config.shell.max_history);
        let entries = session
            .history
            .paginate(phrase.as_deref(), args.offset, max, args.reverse);
        let total = session.history.count_matching(phrase.as_deref());

        let out = &mut *self.io.out;
        render::print_title(out, "Morpheus Shell History", self.settings.coloring)?;
        if entries.is_empty() {
            writeln!(out, "No history found")?;
            return Ok(0);
        }
        for entry in &entries {
            writeln!(out, "{:>5}  {}", entry.number, entry.text)?;
        }
        writeln!(out, "{}", render::page_footer(args.offset, entries.len(), total))?;
        Ok(0)
    }

    /// `shell` inside the shell: start a sandbox, run an expression or
    /// change settings for the rest of the session
    fn shell_command(&mut self, rest: &str) -> Outcome {
        let args: ShellArgs = match split_line(rest).and_then(|tokens| parse_args("shell", &tokens))
        {
            Ok(args) => args,
            Err(e) => return self.report(e),
        };
        self.apply_flags(&args);

        let sandboxed = args.temporary || args.clean;
        if sandboxed {
            if let Err(e) = self.enter_sandbox(args.clean) {
                return self.report(e);
            }
        }

        match args.exec {
            // A sandbox opened just for the expression closes after it
            Some(expression) if sandboxed => {
                self.queue_front(vec![Step::typed(&expression), Step::scripted("exit", 0)])
            }
            Some(expression) => self.queue_front(vec![Step::typed(&expression)]),
            None if !sandboxed => {
                let result = writeln!(
                    self.io.out,
                    "Already running a shell. Use 'shell -Z' to start a temporary session."
                );
                return self.finish(result.map(|_| 0).map_err(Error::from));
            }
            None => {}
        }
        Outcome::success()
    }

    /// `. FILE`: queue each line of FILE ahead of pending input
    fn source(&mut self, rest: &str, depth: u8) -> Outcome {
        let path = match split_line(rest) {
            Ok(tokens) if tokens.len() == 1 => PathBuf::from(&tokens[0]),
            Ok(_) => return self.report(Error::Usage("Usage: . FILE".to_string())),
            Err(e) => return self.report(e),
        };
        if depth >= MAX_SOURCE_DEPTH {
            return self.report(Error::Usage(format!(
                "Cannot run {}: scripts nested too deeply",
                path.display()
            )));
        }

        match script_lines(&path) {
            Ok(lines) => {
                debug!("Running {} ({} lines)", path.display(), lines.len());
                let steps = lines
                    .iter()
                    .map(|line| Step::scripted(line, depth + 1))
                    .collect();
                self.queue_front(steps);
                Outcome::success()
            }
            Err(e) => self.report(e),
        }
    }

    async fn dispatch(&mut self, line: &str) -> Outcome {
        let expanded = self.session().aliases.expand_line(line);
        let line = expanded.as_deref().unwrap_or(line);
        if expanded.is_some() {
            trace!("Alias expanded to '{}'", line);
        }

        let tokens = match split_line(line) {
            Ok(tokens) => tokens,
            Err(e) => return self.report(e),
        };
        let mut ctx = command_context(&mut self.sessions, &mut self.settings, &self.log, &mut self.io);
        dispatch::execute(&self.registry, &mut ctx, &tokens).await
    }

    fn finish(&mut self, result: Result<i32>) -> Outcome {
        match result {
            Ok(code) => Outcome {
                code,
                message: None,
            },
            Err(e) => self.report(e),
        }
    }

    fn report(&mut self, error: Error) -> Outcome {
        let mut ctx = command_context(&mut self.sessions, &mut self.settings, &self.log, &mut self.io);
        dispatch::report(&mut ctx, error)
    }
}

/// Non-empty lines of a script file
fn script_lines(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
