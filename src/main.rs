use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use preflight_core::{PreflightConfig, PreflightError, Record, SeverityClass};
use preflight_navigator::{Frame, Renderer, ReviewNavigator, TerminalRenderer};
use preflight_review::extract::{extract_stream, Extraction, StreamOutcome};
use preflight_review::git::{collect_change, Action, ChangeSet};
use preflight_review::llm::ChatMessage;
use preflight_review::notify::{CommandNotifier, Notifier};
use preflight_review::report::{write_report, ReportMeta};
use preflight_review::store::ReviewStore;

const CONFIG_FILE: &str = ".preflight.toml";

#[derive(Parser)]
#[command(
    name = "preflight",
    version,
    about = "Local AI pre-review for your changes",
    long_about = "Preflight sends your change to a local or hosted LLM, shows findings as they\n\
                   stream in, stores them, writes an HTML report, and lets you browse them in\n\
                   the terminal.\n\n\
                   Examples:\n  \
                     preflight review commit           Review the HEAD commit\n  \
                     preflight review diff             Review unstaged working-tree changes\n  \
                     preflight review branch --base main  Review the current branch against main\n  \
                     preflight review diff --mock --test  Try the flow without a model\n  \
                     preflight init                    Write a .preflight.toml template"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (default: .preflight.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose (debug) logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// When to use colors
    #[arg(long, global = true, default_value = "auto")]
    color: ColorChoice,
}

#[derive(Subcommand)]
enum Command {
    /// Review a change with the model and browse the findings
    #[command(long_about = "Review a change with the model and browse the findings.\n\n\
        Findings are printed as soon as they are complete in the model's output.\n\
        Once the response ends, the full answer is decoded, stored in SQLite,\n\
        rendered to an HTML report and opened in an interactive browser\n\
        (j/k or arrows to move, q to quit).\n\n\
        Examples:\n  preflight review commit\n  preflight review branch --base main --branch feature/x\n  preflight review diff --mock")]
    Review {
        /// Which change to review
        #[arg(value_enum)]
        action: ReviewAction,

        /// Base reference for branch reviews (default: [review] base_branch)
        #[arg(long)]
        base: Option<String>,

        /// Branch to review (default: the current branch)
        #[arg(long)]
        branch: Option<String>,

        /// Repository path (default: current directory)
        #[arg(long, default_value = ".")]
        repo: PathBuf,

        /// Replay a canned model response instead of calling the LLM
        #[arg(long)]
        mock: bool,

        /// Dry run: in-memory database, no report, no notification
        #[arg(long)]
        test: bool,
    },
    /// Create a default .preflight.toml configuration file
    #[command(long_about = "Create a default .preflight.toml configuration file.\n\n\
        Generates a commented-out template with all available options.\n\
        Fails if .preflight.toml already exists.")]
    Init,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ReviewAction {
    /// The HEAD commit
    Commit,
    /// Unstaged working-tree changes
    Diff,
    /// A branch against a base reference
    Branch,
}

impl From<ReviewAction> for Action {
    fn from(action: ReviewAction) -> Self {
        match action {
            ReviewAction::Commit => Action::Commit,
            ReviewAction::Diff => Action::Diff,
            ReviewAction::Branch => Action::Branch,
        }
    }
}

#[derive(Clone, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    /// Detect from the terminal
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

struct ReviewOptions {
    action: Action,
    base: Option<String>,
    branch: Option<String>,
    repo: PathBuf,
    mock: bool,
    test: bool,
}

const DEFAULT_CONFIG: &str = r#"# Preflight Configuration

[llm]
# OpenAI-compatible endpoint (llama.cpp server, Ollama, vLLM, hosted providers)
# base_url = "http://localhost:8080"
# model = "qwen3-30b-a3b-instruct"
# api_key is read from PREFLIGHT_API_KEY when set
# max_input_tokens = 32768
# temperature = 0.7
# top_p = 0.8
# timeout_secs = 600

[review]
# base_branch = "master"
# mock_fragment_width = 16
# escape_timeout_ms = 50

[storage]
# database = "~/.preflight/reviews.db"
# reports_dir = "~/.preflight/reports"

[notify]
# enabled = true
# command = "terminal-notifier"
"#;

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let use_color = match cli.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => std::io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    };

    match cli.command {
        Command::Review {
            action,
            base,
            branch,
            repo,
            mock,
            test,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let options = ReviewOptions {
                action: action.into(),
                base,
                branch,
                repo,
                mock,
                test,
            };
            run_review(&config, &options, use_color)?;
        }
        Command::Init => {
            let path = Path::new(CONFIG_FILE);
            if path.exists() {
                miette::bail!("{CONFIG_FILE} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {CONFIG_FILE} with default configuration");
        }
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "preflight", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<PreflightConfig, PreflightError> {
    let config = match path {
        Some(path) => PreflightConfig::from_file(path)?,
        None => {
            let default_path = Path::new(CONFIG_FILE);
            if default_path.exists() {
                PreflightConfig::from_file(default_path)?
            } else {
                PreflightConfig::default()
            }
        }
    };
    Ok(config.with_env_overrides())
}

fn run_review(config: &PreflightConfig, options: &ReviewOptions, use_color: bool) -> Result<()> {
    let base = options
        .base
        .clone()
        .unwrap_or_else(|| config.review.base_branch.clone());
    let change = collect_change(
        &options.repo,
        options.action,
        &base,
        options.branch.as_deref(),
    )?;

    if change.is_empty() {
        println!("Nothing to review: the {} has no changes.", options.action);
        return Ok(());
    }

    let messages = preflight_review::prompt::review_messages(&change.diff);
    preflight_review::source::check_capacity(&messages, config.llm.max_input_tokens)?;

    let result = stream_findings(config, options, &change, messages);
    let Some(records) = settle(result, &mut std::io::stdout(), &mut std::io::stderr())? else {
        return Ok(());
    };

    println!("{}", summary_line(&records));
    persist(config, options, &change, &records)?;

    if std::io::stdin().is_terminal() && std::io::stdout().is_terminal() {
        browse(config, records, use_color)?;
    } else {
        list_plain(&records).into_diagnostic()?;
    }
    Ok(())
}

fn stream_findings(
    config: &PreflightConfig,
    options: &ReviewOptions,
    change: &ChangeSet,
    messages: Vec<ChatMessage>,
) -> Result<StreamOutcome, PreflightError> {
    let spinner = if std::io::stderr().is_terminal() {
        let pb = indicatif::ProgressBar::new_spinner();
        if let Ok(style) = indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})")
        {
            pb.set_style(style);
        }
        pb.set_message(format!("Reviewing {} on {}...", options.action, change.branch));
        pb.enable_steady_tick(Duration::from_millis(120));
        Some(pb)
    } else {
        None
    };

    let mut found = 0usize;
    let on_record = |record: Record| {
        found += 1;
        let line = format!(
            "  [{}] {}:{}  {}",
            record.severity_class(),
            record.file,
            record.line,
            record.description
        );
        match &spinner {
            Some(pb) => {
                pb.println(line);
                pb.set_message(format!("Reviewing... {found} found so far"));
            }
            None => eprintln!("{line}"),
        }
    };

    let result = if options.mock {
        let source = preflight_review::source::CannedSource::mock(config.review.mock_fragment_width);
        extract_stream(source, on_record)
    } else {
        let client = preflight_review::llm::LlmClient::new(&config.llm)?;
        info!(model = client.model(), "requesting review");
        client
            .stream(messages)
            .and_then(|stream| extract_stream(stream, on_record))
    };

    if let Some(pb) = spinner {
        match &result {
            Ok(_) => pb.finish_with_message("Done"),
            Err(_) => pb.finish_with_message("Failed"),
        }
    }
    result
}

/// Map the end of a stream to the records worth showing.
///
/// Every other outcome is reported here: undecodable output is echoed to
/// `err` and fails the run, a missing array or an empty one is an
/// informational message on `out`.
fn settle(
    result: Result<StreamOutcome, PreflightError>,
    out: &mut impl Write,
    err: &mut impl Write,
) -> Result<Option<Vec<Record>>> {
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(PreflightError::Decode { reason, raw }) => {
            writeln!(err, "Model output that could not be decoded:\n{raw}").into_diagnostic()?;
            return Err(PreflightError::Decode { reason, raw }.into());
        }
        Err(e) => return Err(e.into()),
    };

    match outcome.extraction {
        Extraction::NothingFound => {
            writeln!(out, "The model did not return a list of findings; nothing to show.")
                .into_diagnostic()?;
            info!(chars = outcome.transcript.len(), "no array in model output");
            Ok(None)
        }
        Extraction::Records(records) if records.is_empty() => {
            writeln!(out, "No issues found.").into_diagnostic()?;
            Ok(None)
        }
        Extraction::Records(records) => Ok(Some(records)),
    }
}

fn summary_line(records: &[Record]) -> String {
    let mut classes: Vec<SeverityClass> = records.iter().map(Record::severity_class).collect();
    classes.sort_by_key(|c| c.rank());

    let mut counts: Vec<(SeverityClass, usize)> = Vec::new();
    for class in classes {
        if let Some((last, n)) = counts.last_mut() {
            if *last == class {
                *n += 1;
                continue;
            }
        }
        counts.push((class, 1));
    }
    let counts: Vec<String> = counts.iter().map(|(class, n)| format!("{n} {class}")).collect();
    format!("Found {} issue(s): {}", records.len(), counts.join(", "))
}

fn persist(
    config: &PreflightConfig,
    options: &ReviewOptions,
    change: &ChangeSet,
    records: &[Record],
) -> Result<()> {
    let store = if options.test {
        ReviewStore::in_memory()?
    } else {
        ReviewStore::open(&config.storage.database_path())?
    };
    for record in records {
        store.save(record, &change.commit_hash, &change.branch)?;
    }
    info!(saved = records.len(), total = store.count()?, "issues stored");

    if options.test {
        return Ok(());
    }

    let meta = ReportMeta {
        project: change.project.clone(),
        branch: change.branch.clone(),
        commit_hash: change.commit_hash.clone(),
    };
    let path = write_report(&config.storage.reports_path(), records, &meta)?;
    println!("Report: {}", path.display());

    if config.notify.enabled {
        let notifier = CommandNotifier::from_config(&config.notify);
        let message = format!("{} issue(s) found in {}", records.len(), change.project);
        let url = format!("file://{}", path.display());
        if let Err(e) = notifier.notify(&message, &url) {
            warn!(error = %e, "notification failed");
        }
    }
    Ok(())
}

fn browse(config: &PreflightConfig, records: Vec<Record>, use_color: bool) -> Result<()> {
    preflight_navigator::install_panic_hook();
    let _guard = preflight_navigator::RawModeGuard::acquire()?;

    let mut navigator = ReviewNavigator::new(records)
        .with_lookahead(Duration::from_millis(config.review.escape_timeout_ms));
    let mut input = preflight_navigator::TerminalInput::new();
    let mut renderer = TerminalRenderer::new(std::io::stdout().lock()).with_color(use_color);
    navigator.run(&mut input, &mut renderer)?;
    Ok(())
}

fn list_plain(records: &[Record]) -> std::io::Result<()> {
    let mut renderer = TerminalRenderer::plain(std::io::stdout().lock());
    for (i, record) in records.iter().enumerate() {
        renderer.render(&Frame {
            record,
            position: i + 1,
            total: records.len(),
            unseen: records.len() - i - 1,
        })?;
    }
    renderer.finish()
}
