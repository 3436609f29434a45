use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use judged::fmt::{self, Style};
use judged::resolver::Tracer;
use judged::{
    parse_statements, Backend, Diagnostic, Literal, MontecarloConfig, QueryReport, Sentence,
    Session, Statement, Term,
};
use reedline::{DefaultPrompt, Reedline, Signal};
use serde::Serialize;

#[derive(Debug, Parser)]
#[command(name = "judged")]
#[command(about = "Probabilistic datalog with descriptive sentences")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Answer queries under explicitly selected world parts.
    Deterministic(CommonArgs),
    /// Report the descriptive sentence of each answer.
    Exact(CommonArgs),
    /// Estimate answer probabilities by sampling worlds.
    Montecarlo(MontecarloArgs),
}

#[derive(Debug, Args)]
struct CommonArgs {
    /// Program files to process in order.
    files: Vec<PathBuf>,
    /// Enter the interactive shell after loading the files.
    #[arg(short, long)]
    interactive: bool,
    /// Report every performed action.
    #[arg(short, long)]
    verbose: bool,
    /// Trace the resolver on stderr.
    #[arg(short, long)]
    debug: bool,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Plain)]
    format: OutputFormat,
    /// Extensions to load before processing, as if by @use.
    #[arg(short = 'e', long = "extension")]
    extensions: Vec<String>,
    /// Data module files to load before the main files.
    #[arg(short = 'm', long = "module")]
    modules: Vec<PathBuf>,
}

#[derive(Debug, Args)]
struct MontecarloArgs {
    #[command(flatten)]
    common: CommonArgs,
    /// Number of worlds to sample; 0 samples until convergence.
    #[arg(short = 'n', long, default_value_t = 1000)]
    number: usize,
    /// Seed for reproducible sampling.
    #[arg(long)]
    seed: Option<u64>,
    /// Stop sampling once every estimate converged to this half-width.
    #[arg(long)]
    approximate: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Plain,
    Color,
    Json,
}

impl OutputFormat {
    fn style(self) -> Style {
        match self {
            OutputFormat::Color => Style::Color,
            _ => Style::Plain,
        }
    }
}

#[derive(Debug, Serialize)]
struct JsonResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    query: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    answers: Vec<JsonAnswer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    iterations: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    diagnostics: Vec<JsonDiagnostic>,
}

#[derive(Debug, Serialize)]
struct JsonAnswer {
    literal: String,
    sentence: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    probability: Option<f64>,
}

#[derive(Debug, Serialize)]
struct JsonDiagnostic {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<&'static str>,
}

fn main() {
    let cli = Cli::parse();
    let exit_code = run(cli);
    std::process::exit(exit_code);
}

fn run(cli: Cli) -> i32 {
    let (backend, common, mode) = match cli.command {
        Command::Deterministic(common) => (Backend::Deterministic, common, "deterministic"),
        Command::Exact(common) => (Backend::Exact, common, "exact"),
        Command::Montecarlo(args) => (
            Backend::Montecarlo(MontecarloConfig {
                samples: args.number,
                seed: args.seed,
                approximate: args.approximate,
            }),
            args.common,
            "montecarlo",
        ),
    };

    let mut session = Session::new(backend);
    if common.debug {
        session = session.with_tracer(Box::new(TraceReporter));
    }
    let mut shell = Shell {
        session,
        verbose: common.verbose,
        format: common.format,
    };

    for name in &common.extensions {
        if let Err(diagnostic) = shell.session.use_extension(name) {
            shell.emit_errors(&[diagnostic]);
            return 1;
        }
    }
    for module in common.modules.iter().chain(common.files.iter()) {
        if !shell.run_file(module) {
            return 1;
        }
    }

    if common.interactive || common.files.is_empty() {
        shell.repl(mode);
    }
    0
}

struct Shell {
    session: Session,
    verbose: bool,
    format: OutputFormat,
}

impl Shell {
    /// Batch-processes one file. Returns false on the first error, matching
    /// the break-on-error contract for batch input.
    fn run_file(&mut self, path: &Path) -> bool {
        let source = path.display().to_string();
        let src = match fs::read_to_string(path) {
            Ok(src) => src,
            Err(err) => {
                self.emit_errors(&[Diagnostic::new(
                    "E-IO",
                    format!("failed to read file: {err}"),
                    None,
                )
                .with_source(source)]);
                return false;
            }
        };

        let statements = match parse_statements(&src) {
            Ok(statements) => statements,
            Err(diagnostics) => {
                let diagnostics: Vec<Diagnostic> = diagnostics
                    .into_iter()
                    .map(|d| d.with_source(source.clone()))
                    .collect();
                self.emit_errors(&diagnostics);
                return false;
            }
        };

        for statement in &statements {
            if let Err(diagnostics) = self.process_statement(statement) {
                let diagnostics: Vec<Diagnostic> = diagnostics
                    .into_iter()
                    .map(|d| d.with_source(source.clone()))
                    .collect();
                self.emit_errors(&diagnostics);
                return false;
            }
        }
        true
    }

    fn process_statement(&mut self, statement: &Statement) -> Result<(), Vec<Diagnostic>> {
        let style = self.format.style();
        if self.verbose {
            println!("{}", fmt::comment(&format!("% {}", fmt::describe(statement, style)), style));
        }
        let reports = self.session.ingest(statement)?;
        for report in &reports {
            self.emit_report(report);
        }
        Ok(())
    }

    fn emit_report(&self, report: &QueryReport) {
        let style = self.format.style();
        if self.format == OutputFormat::Json {
            emit_json(&JsonResponse {
                status: "ok",
                query: Some(report.query.to_string()),
                answers: report
                    .answers
                    .iter()
                    .map(|ans| JsonAnswer {
                        literal: Literal::new(report.query.pred.clone(), ans.terms.clone())
                            .to_string(),
                        sentence: ans.sentence.to_string(),
                        probability: ans.probability,
                    })
                    .collect(),
                iterations: report.iterations,
                diagnostics: report.warnings.iter().map(as_json_diagnostic).collect(),
            });
            return;
        }

        for warning in &report.warnings {
            eprintln!("{}", fmt::comment(&format!("% warning: {warning}"), style));
        }
        if let Some(iterations) = report.iterations {
            println!(
                "{}",
                fmt::comment(&format!("% iterations: {iterations}"), style)
            );
        }
        for answer in &report.answers {
            println!("{}", fmt::answer(&report.query.pred, answer, style));
        }
    }

    fn emit_errors(&self, diagnostics: &[Diagnostic]) {
        if self.format == OutputFormat::Json {
            emit_json(&JsonResponse {
                status: "error",
                query: None,
                answers: Vec::new(),
                iterations: None,
                diagnostics: diagnostics.iter().map(as_json_diagnostic).collect(),
            });
            return;
        }
        for diagnostic in diagnostics {
            eprintln!("{diagnostic}");
        }
    }

    fn repl(&mut self, mode: &str) {
        println!("JudgeD, {mode} ({})", env!("CARGO_PKG_VERSION"));
        println!("Type \".help\" for interactive commands.");
        println!();

        let mut editor = Reedline::create();
        let prompt = DefaultPrompt::default();
        loop {
            match editor.read_line(&prompt) {
                Ok(Signal::Success(line)) => {
                    let line = line.trim().to_string();
                    if line.is_empty() {
                        continue;
                    }
                    if let Some(command) = line.strip_prefix('.') {
                        if !self.interactive_command(command) {
                            break;
                        }
                        continue;
                    }
                    self.process_line(&line);
                }
                Ok(Signal::CtrlC) => continue,
                Ok(Signal::CtrlD) => break,
                Err(err) => {
                    eprintln!("E-IO: failed to read input: {err}");
                    break;
                }
            }
        }
    }

    fn process_line(&mut self, line: &str) {
        let statements = match parse_statements(line) {
            Ok(statements) => statements,
            Err(diagnostics) => {
                self.emit_errors(&diagnostics);
                return;
            }
        };
        for statement in &statements {
            if let Err(diagnostics) = self.process_statement(statement) {
                self.emit_errors(&diagnostics);
                return;
            }
        }
    }

    /// Handles a `.command`; returns false to leave the shell.
    fn interactive_command(&mut self, command: &str) -> bool {
        let style = self.format.style();
        let mut words = command.split_whitespace();
        match words.next() {
            Some("help") | None => {
                for (name, description) in [
                    ("help", "display all available commands"),
                    ("kb", "output the internal knowledge base"),
                    ("ext", "list the loaded extensions"),
                    ("select", "select a world part, e.g. .select x=1"),
                    ("reset", "clear all selected world parts"),
                    ("quit", "leave the shell"),
                ] {
                    println!(
                        "{}",
                        fmt::comment(&format!("% .{name}: {description}"), style)
                    );
                }
            }
            Some("kb") => {
                println!("{}", fmt::comment("% knowledge base:", style));
                for pred in self.session.kb().predicates() {
                    println!("{}", fmt::comment(&format!("% {pred} =>"), style));
                    for clause in self.session.kb().clauses_for(pred) {
                        println!("%   {}", fmt::clause(clause, style));
                    }
                }
            }
            Some("ext") => {
                for name in self.session.kb().loaded_extensions() {
                    println!("{}", fmt::comment(&format!("% {name}"), style));
                }
            }
            Some("select") => {
                let rest: String = words.collect::<Vec<_>>().join(" ");
                match judged::parser::parse_selection(&rest) {
                    Ok(label) => self.session.select_world(label.partition, label.value),
                    Err(diagnostic) => self.emit_errors(&[diagnostic]),
                }
            }
            Some("reset") => self.session.reset_world(),
            Some("quit") | Some("q") => return false,
            Some(other) => {
                eprintln!("unknown interactive command '.{other}', type .help for the command list");
            }
        }
        true
    }
}

fn emit_json<T: Serialize>(output: &T) {
    let rendered = serde_json::to_string(output).expect("serialize JSON output");
    println!("{rendered}");
}

fn as_json_diagnostic(diag: &Diagnostic) -> JsonDiagnostic {
    JsonDiagnostic {
        code: diag.code,
        message: diag.message.clone(),
        source: diag.source().map(ToOwned::to_owned),
        hint: diag.hint(),
    }
}

/// Stderr reporter for the `-d` debug trace.
struct TraceReporter;

impl Tracer for TraceReporter {
    fn ask(&mut self, query: &Literal) {
        eprintln!("{}", "-".repeat(60));
        eprintln!("query '{query}'");
    }

    fn subgoal(&mut self, goal: &Literal, depth: usize) {
        eprintln!("{}subgoal '{goal}'", "  ".repeat(depth));
    }

    fn answer(&mut self, goal: &Literal, terms: &[Term], sentence: &Sentence) {
        let instantiated = Literal::new(goal.pred.clone(), terms.to_vec());
        if *sentence == Sentence::True {
            eprintln!("answer for '{goal}': '{instantiated}'");
        } else {
            eprintln!("answer for '{goal}': '{instantiated} [{sentence}]'");
        }
    }

    fn complete(&mut self, goal: &Literal, answers: usize) {
        eprintln!("completed '{goal}' with {answers} answers");
    }

    fn done(&mut self, query: &Literal, answers: usize) {
        eprintln!("query completed: {answers} answers");
        eprintln!("{}", "-".repeat(60));
    }
}
