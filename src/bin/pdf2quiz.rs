//! CLI binary for edgequake-pdf2quiz.
//!
//! A thin shim over the library crate: maps flags to `ExtractionConfig` /
//! `ServerConfig`, renders progress events, and prints results.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_pdf2quiz::cost::format_cost;
use edgequake_pdf2quiz::practice::{self, Grade, PracticeTally};
use edgequake_pdf2quiz::storage::CacheSummary;
use edgequake_pdf2quiz::{
    api, estimate_cost, extract_stream, find_model, open_input, CatalogClient, ExtractionConfig,
    ExtractionEvent, ExtractionOutput, ResultStore, ServerConfig, DEFAULT_MODEL,
};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufRead, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Start the extraction proxy (holds the provider key)
  OPENROUTER_API_KEY=sk-or-... pdf2quiz serve

  # Extract questions from a local file, cache them, print a summary
  pdf2quiz extract biology_final.pdf

  # Extract from an object-storage URL with another model, JSON to stdout
  pdf2quiz extract https://bucket.example/pdfs/chem.pdf --model anthropic/claude-3.5-sonnet --json

  # What would it cost?
  pdf2quiz estimate biology_final.pdf

  # Practise the cached MCQs
  pdf2quiz quiz biology_final.pdf

ENVIRONMENT VARIABLES:
  OPENROUTER_API_KEY     Provider key used by `serve`
  PDF2QUIZ_ENDPOINT      Base URL of the extraction proxy
  PDF2QUIZ_MODEL         Model id (default: openai/gpt-4o)
  PDF2QUIZ_CONCURRENCY   Max extraction requests in flight
  PDF2QUIZ_CACHE_DIR     Directory of the local result cache
  PDFIUM_LIB_PATH        Path to libpdfium
"#;

/// Extract exam questions from PDFs with Vision LLMs, then practise them.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2quiz",
    version,
    about = "Extract exam questions from PDFs with Vision LLMs",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDF2QUIZ_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDF2QUIZ_QUIET")]
    quiet: bool,

    /// Local result cache directory.
    #[arg(long, global = true, env = "PDF2QUIZ_CACHE_DIR")]
    cache_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract questions from a PDF file or URL.
    Extract(ExtractArgs),
    /// Show page count and estimated cost without extracting.
    Estimate(ClientArgs),
    /// List available vision models and their pricing.
    Models {
        /// Query the provider directly instead of the proxy.
        #[arg(long)]
        upstream: bool,
        #[arg(long, env = "PDF2QUIZ_ENDPOINT", default_value = "http://127.0.0.1:3000")]
        endpoint: String,
    },
    /// Run the extraction proxy server.
    Serve(ServeArgs),
    /// Practise cached MCQs for a file.
    Quiz {
        /// File name the questions were cached under (e.g. biology_final.pdf).
        file_name: String,
    },
}

#[derive(Args, Debug)]
struct ClientArgs {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Base URL of the extraction proxy.
    #[arg(long, env = "PDF2QUIZ_ENDPOINT", default_value = "http://127.0.0.1:3000")]
    endpoint: String,

    /// Vision model id.
    #[arg(long, env = "PDF2QUIZ_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2QUIZ_PASSWORD")]
    password: Option<String>,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDF2QUIZ_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[derive(Args, Debug)]
struct ExtractArgs {
    #[command(flatten)]
    client: ClientArgs,

    /// Max extraction requests in flight.
    #[arg(short, long, env = "PDF2QUIZ_CONCURRENCY", default_value_t = 10)]
    concurrency: usize,

    /// Per-page request timeout in seconds (0 = none).
    #[arg(long, env = "PDF2QUIZ_REQUEST_TIMEOUT", default_value_t = 120)]
    request_timeout: u64,

    /// Print the full result as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Write the JSON result to this file.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Do not write to the local result cache.
    #[arg(long)]
    no_cache: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2QUIZ_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to listen on.
    #[arg(long, env = "PDF2QUIZ_BIND", default_value = "127.0.0.1:3000")]
    bind: SocketAddr,

    /// edgequake-llm provider backing the proxy.
    #[arg(long, env = "PDF2QUIZ_PROVIDER", default_value = "openrouter")]
    provider: String,

    /// Max output tokens per page.
    #[arg(long, env = "PDF2QUIZ_MAX_TOKENS", default_value_t = 4000)]
    max_tokens: usize,

    /// Sampling temperature (provider default when unset).
    #[arg(long, env = "PDF2QUIZ_TEMPERATURE")]
    temperature: Option<f32>,

    /// Retries per page on upstream failure.
    #[arg(long, env = "PDF2QUIZ_MAX_RETRIES", default_value_t = 0)]
    max_retries: u32,

    /// Path to a text file containing a custom extraction prompt.
    #[arg(long, env = "PDF2QUIZ_PROMPT")]
    prompt: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar provides all the feedback that matters during
    // extraction; library INFO logs would tear it apart.
    let quiet_progress = match &cli.command {
        Command::Extract(a) => !a.no_progress && !a.json,
        Command::Quiz { .. } => true,
        _ => false,
    };
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || quiet_progress {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    let store = cli
        .cache_dir
        .clone()
        .map(ResultStore::new)
        .unwrap_or_else(ResultStore::default_location);

    match cli.command {
        Command::Extract(args) => run_extract(args, &store, cli.quiet).await,
        Command::Estimate(args) => run_estimate(args).await,
        Command::Models { upstream, endpoint } => run_models(upstream, &endpoint).await,
        Command::Serve(args) => run_serve(args).await,
        Command::Quiz { file_name } => run_quiz(&file_name, &store).await,
    }
}

// ── extract ──────────────────────────────────────────────────────────────

async fn run_extract(args: ExtractArgs, store: &ResultStore, quiet: bool) -> Result<()> {
    let timeout = (args.request_timeout > 0).then_some(args.request_timeout);
    let config = client_config(&args.client)
        .concurrency(args.concurrency)
        .request_timeout_secs(timeout)
        .build()
        .context("Invalid configuration")?;

    let doc = open_input(&args.client.input, &config)
        .await
        .context("Failed to open PDF")?;
    let total = doc.page_count();
    let file_name = doc.file_name().to_string();

    let estimated_cost = estimate_cost(total, &config).await;
    if !quiet && !args.json {
        eprintln!(
            "{} {}  {} pages  {}  est. {}",
            cyan("◆"),
            bold(&file_name),
            total,
            dim(&config.model),
            if estimated_cost > 0.0 {
                format_cost(estimated_cost)
            } else {
                "n/a".to_string()
            }
        );
    }

    let show_progress = !quiet && !args.no_progress && !args.json;
    let bar = if show_progress { Some(progress_bar(total)) } else { None };

    let mut handle = extract_stream(doc, config.clone()).context("Failed to start extraction")?;
    while let Some(event) = handle.events.next().await {
        if let Some(ref bar) = bar {
            render_event(bar, &event);
        }
    }
    let session = handle.task.await.context("Extraction task failed")?;
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    let summary = session.summary();
    let output = ExtractionOutput {
        file_name: file_name.clone(),
        model: config.model.clone(),
        pages: session.into_results().into_values().collect(),
        summary,
        estimated_cost,
    };

    if !args.no_cache {
        let path = store
            .save(&file_name, &output.question_map())
            .await
            .context("Failed to save to the local cache")?;
        if !quiet && !args.json {
            eprintln!("   cached at {}", dim(&path.display().to_string()));
        }
    }

    let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
    if let Some(ref path) = args.output {
        write_atomic(path, json.as_bytes()).await?;
    }
    if args.json {
        println!("{json}");
    } else if !quiet {
        print_summary(&output);
    }
    Ok(())
}

fn client_config(args: &ClientArgs) -> edgequake_pdf2quiz::ExtractionConfigBuilder {
    let mut builder = ExtractionConfig::builder()
        .endpoint(args.endpoint.clone())
        .model(args.model.clone())
        .download_timeout_secs(args.download_timeout);
    if let Some(ref pwd) = args.password {
        builder = builder.password(pwd.clone());
    }
    builder
}

fn progress_bar(total: usize) -> ProgressBar {
    let bar = ProgressBar::new(total as u64);
    let style = ProgressStyle::with_template(
        "{spinner:.cyan} {prefix:.bold}  \
         [{bar:42.green/238}] {pos:>3}/{len} pages  \
         ⏱ {elapsed_precise}  ETA {eta_precise}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("█▉▊▋▌▍▎▏  ")
    .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
    bar.set_style(style);
    bar.set_prefix("Rendering");
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

fn render_event(bar: &ProgressBar, event: &ExtractionEvent) {
    match event {
        ExtractionEvent::Started { .. } => {}
        ExtractionEvent::Rasterized { failed, .. } => {
            bar.set_prefix("Extracting");
            if *failed > 0 {
                bar.println(format!("  {} {} pages could not be rendered", red("✗"), failed));
            }
        }
        ExtractionEvent::PageSettled {
            page_num,
            question_count,
            error,
            total,
            elapsed_ms,
            ..
        } => {
            let line = match error {
                None => format!(
                    "  {} Page {:>3}/{:<3}  {}  {}",
                    green("✓"),
                    page_num,
                    total,
                    dim(&format!("{question_count:>3} questions")),
                    dim(&format!("{:.1}s", *elapsed_ms as f64 / 1000.0)),
                ),
                Some(msg) => {
                    // Keep the log line on one terminal row.
                    let msg: String = if msg.chars().count() > 80 {
                        format!("{}\u{2026}", msg.chars().take(79).collect::<String>())
                    } else {
                        msg.clone()
                    };
                    format!("  {} Page {:>3}/{:<3}  {}", red("✗"), page_num, total, red(&msg))
                }
            };
            bar.println(line);
            bar.inc(1);
        }
        ExtractionEvent::Finished(_) => bar.set_prefix("Done"),
    }
}

fn print_summary(output: &ExtractionOutput) {
    let s = &output.summary;
    for page in &output.pages {
        if page.questions.is_empty() && page.error.is_none() {
            continue;
        }
        match page.error {
            Some(ref e) => eprintln!("  {} {}", red("✗"), e),
            None => eprintln!(
                "  Page {:>3}: {} questions ({} MCQ)",
                page.page_num,
                page.questions.len(),
                page.mcq_count()
            ),
        }
    }
    eprintln!(
        "{}  {} questions ({} MCQ) from {} pages  {}ms{}",
        if s.failed_pages == 0 { green("✔") } else { cyan("⚠") },
        bold(&s.total_questions.to_string()),
        s.mcq_questions,
        s.total_pages,
        s.elapsed_ms,
        if s.failed_pages > 0 {
            format!("  ({} failed)", red(&s.failed_pages.to_string()))
        } else {
            String::new()
        }
    );
}

/// Write via a temp file + rename so readers never see a partial file.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, bytes)
        .await
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

// ── estimate / models ────────────────────────────────────────────────────

async fn run_estimate(args: ClientArgs) -> Result<()> {
    let config = client_config(&args).build().context("Invalid configuration")?;
    let doc = open_input(&args.input, &config)
        .await
        .context("Failed to open PDF")?;
    let cost = estimate_cost(doc.page_count(), &config).await;

    println!("File:   {}", doc.file_name());
    println!("Pages:  {}", doc.page_count());
    println!("Model:  {}", config.model);
    if cost > 0.0 {
        println!("Cost:   {} (estimate)", format_cost(cost));
    } else {
        println!("Cost:   unknown (no pricing for this model)");
    }
    Ok(())
}

async fn run_models(upstream: bool, endpoint: &str) -> Result<()> {
    let catalog = if upstream {
        CatalogClient::new(ServerConfig::default().catalog_url)
    } else {
        CatalogClient::proxy(endpoint)
    };
    let models = catalog.list_models().await;

    println!("{:<44} {:>12} {:>12}", "MODEL", "IN $/1K", "OUT $/1K");
    for m in &models {
        let (p, c) = m
            .pricing
            .map(|p| (p.prompt, p.completion))
            .unwrap_or((None, None));
        let fmt = |v: Option<f64>| v.map(|v| format!("{v:.5}")).unwrap_or_else(|| "-".into());
        let marker = if m.id == DEFAULT_MODEL { " *" } else { "" };
        println!("{:<44} {:>12} {:>12}{}", m.id, fmt(p), fmt(c), marker);
    }
    if find_model(&models, DEFAULT_MODEL).is_some() {
        println!("{}", dim("* default"));
    }
    Ok(())
}

// ── serve ────────────────────────────────────────────────────────────────

async fn run_serve(args: ServeArgs) -> Result<()> {
    let prompt = match args.prompt {
        Some(ref path) => Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read prompt from {:?}", path))?,
        ),
        None => None,
    };
    let config = ServerConfig {
        bind: args.bind,
        provider_name: args.provider,
        temperature: args.temperature,
        max_tokens: args.max_tokens,
        max_retries: args.max_retries,
        prompt,
        ..ServerConfig::default()
    };
    api::serve(&config).await.context("Server failed")
}

// ── quiz ─────────────────────────────────────────────────────────────────

async fn run_quiz(file_name: &str, store: &ResultStore) -> Result<()> {
    let Some(stored) = store.load(file_name).await.context("Failed to read the local cache")? else {
        bail!(
            "No cached questions for '{}'. Run `pdf2quiz extract` first.",
            file_name
        );
    };
    let counts = CacheSummary::of(&stored);
    let all: Vec<_> = stored.values().flatten().collect();
    let mcqs = practice::mcqs(all.iter().copied());
    if mcqs.is_empty() {
        bail!("'{}' has {} questions but no MCQs to practise", file_name, counts.total_questions);
    }
    println!(
        "{} {}  {} questions, {} MCQ  (answer with a letter or number, q to quit)\n",
        cyan("◆"),
        bold(file_name),
        counts.total_questions,
        counts.mcq_count
    );

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut tally = PracticeTally::default();

    'questions: for (i, q) in mcqs.iter().enumerate() {
        println!("{} {}", bold(&format!("Q{}.", i + 1)), q.question);
        for (j, choice) in q.choices.iter().enumerate() {
            println!("   {}  {}", dim(&format!("[{}]", j + 1)), choice);
        }

        let picked = loop {
            print!("> ");
            io::stdout().flush().ok();
            let Some(line) = lines.next() else {
                break 'questions;
            };
            let line = line.context("Failed to read answer")?;
            let answer = line.trim();
            if answer.eq_ignore_ascii_case("q") {
                break 'questions;
            }
            match pick_index(answer, &q.choices) {
                Some(idx) => break idx,
                None => println!("{}", dim("Pick one of the listed choices.")),
            }
        };

        let grade = practice::grade(q, picked);
        tally.record(grade);
        match grade {
            Grade::Correct => println!("{}", green("Correct!")),
            Grade::Incorrect => println!(
                "{} The answer is {}.",
                red("Incorrect."),
                q.correct_answer.as_deref().map(str::trim).unwrap_or("?")
            ),
            Grade::Ungraded => println!("{}", dim("No answer key for this question.")),
        }
        if let Some(exp) = q.explanation.as_deref().filter(|e| !e.trim().is_empty()) {
            println!("{}", dim(exp));
        }
        println!();
    }

    println!(
        "Score: {}/{} ({:.0}%)",
        tally.correct,
        tally.answered(),
        tally.score_pct()
    );
    Ok(())
}

/// `"2"` → index 1; `"b"` → the choice labelled B.
fn pick_index(answer: &str, choices: &[String]) -> Option<usize> {
    if let Ok(n) = answer.parse::<usize>() {
        return (n >= 1 && n <= choices.len()).then(|| n - 1);
    }
    let label = answer.to_ascii_uppercase();
    if label.is_empty() {
        return None;
    }
    choices
        .iter()
        .position(|c| edgequake_pdf2quiz::question::choice_matches_label(c, &label))
}
