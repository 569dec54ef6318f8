//! Interactive session: dataset setup, agent lifecycle and the question loop.

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, error, info};

use crate::{
    agents::{Agent, AgentFactory, LiveAgents},
    cli::Cli,
    config::Config,
    error::AppError,
    llm::ReasoningEffort,
    printer::Console,
};

pub mod interrupt;
pub mod prompt;

pub use interrupt::Interrupt;
pub use prompt::{DATASET_PROMPT, DATA_FILE_NAME};

pub const EXEC_MODEL: &str = "o3-mini";
pub const EXEC_REASONING_EFFORT: ReasoningEffort = ReasoningEffort::High;

const MISSING_FILE_MESSAGE: &str = "Error: Required data file not found. Please ensure traffic_accidents.csv exists in the resources/data directory.";
const FAILED_QUESTION_MESSAGE: &str = "An error occurred while processing your request. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The user typed `exit`, closed input, or interrupted at the prompt.
    Finished,
    /// An interrupt arrived outside the prompt.
    Interrupted,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub data_file: PathBuf,
    pub prompt: String,
    pub exec_model: String,
    pub reasoning_effort: ReasoningEffort,
}

impl SessionSettings {
    pub fn for_project(root: &Path) -> Self {
        Self {
            data_file: data_dir(root).join(DATA_FILE_NAME),
            prompt: DATASET_PROMPT.to_string(),
            exec_model: EXEC_MODEL.to_string(),
            reasoning_effort: EXEC_REASONING_EFFORT,
        }
    }
}

pub fn data_dir(root: &Path) -> PathBuf {
    root.join("resources").join("data")
}

/// `--project-root`, then `PROJECT_ROOT`, then the working directory; canonicalised.
pub fn resolve_project_root(explicit: Option<PathBuf>, cfg: &Config) -> Result<PathBuf, AppError> {
    let candidate = match explicit.or_else(|| cfg.get_path("PROJECT_ROOT")) {
        Some(p) => p,
        None => std::env::current_dir()
            .map_err(|source| AppError::ProjectRoot { path: PathBuf::from("."), source })?,
    };
    candidate
        .canonicalize()
        .map_err(|source| AppError::ProjectRoot { path: candidate.clone(), source })
}

/// Run the session against the real agents, stdin and stdout.
pub async fn launch(cli: Cli, cfg: Config) -> Result<Outcome, AppError> {
    let interrupt = interrupt::ctrl_c()?;
    let root = resolve_project_root(cli.project_root, &cfg)?;
    debug!(root = %root.display(), config = %cfg.config_path.display(), "project root resolved");

    let settings = SessionSettings::for_project(&root);
    let mut console = Console::stdout(&cfg);
    let factory = LiveAgents::new(cfg, data_dir(&root));
    let input = BufReader::new(tokio::io::stdin());

    let outcome = run(&factory, &settings, input, &mut console, interrupt).await;
    console.flush()?;
    outcome
}

/// Setup, guard, agent lifecycle and question loop.
///
/// Every agent the factory produced is cleaned up exactly once before this returns,
/// whatever the outcome.
pub async fn run<F, R, W>(
    factory: &F,
    settings: &SessionSettings,
    input: R,
    console: &mut Console<W>,
    interrupt: Interrupt,
) -> Result<Outcome, AppError>
where
    F: AgentFactory,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    console.heading("Setup:")?;
    console.line(&settings.prompt)?;
    info!("Setting up the agents...");

    if !settings.data_file.exists() {
        error!(path = %settings.data_file.display(), "Required file not found");
        console.error(MISSING_FILE_MESSAGE)?;
        return Err(AppError::MissingDataFile(settings.data_file.clone()));
    }

    let mut file_agent: Option<F::FileAgent> = None;
    let mut exec_agent: Option<F::ExecAgent> = None;

    let driven = {
        let mut outer = interrupt.clone();
        tokio::select! {
            biased;
            r = drive(factory, settings, &mut file_agent, &mut exec_agent, input, console, interrupt) => Some(r),
            _ = outer.recv() => None,
        }
    };

    release("file ingestion agent", file_agent).await;
    release("data analysis agent", exec_agent).await;

    match driven {
        Some(Ok(())) => Ok(Outcome::Finished),
        Some(Err(e)) => Err(AppError::Other(e)),
        None => {
            console.line("\nApplication interrupted by user. Exiting gracefully.")?;
            Ok(Outcome::Interrupted)
        }
    }
}

async fn drive<F, R, W>(
    factory: &F,
    settings: &SessionSettings,
    file_slot: &mut Option<F::FileAgent>,
    exec_slot: &mut Option<F::ExecAgent>,
    input: R,
    console: &mut Console<W>,
    interrupt: Interrupt,
) -> Result<()>
where
    F: AgentFactory,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let file_agent = file_slot.insert(factory.file_agent()?);
    let exec_agent = exec_slot.insert(factory.exec_agent(&settings.exec_model, settings.reasoning_effort)?);

    console.line("Understanding the contents of the file...")?;
    let description = file_agent.task(&settings.prompt).await?;

    exec_agent.add_context(&settings.prompt);
    exec_agent.add_context(&description);

    question_loop(exec_agent, input, console, interrupt).await
}

async fn question_loop<A, R, W>(
    agent: &mut A,
    mut input: R,
    console: &mut Console<W>,
    mut interrupt: Interrupt,
) -> Result<()>
where
    A: Agent,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut line = String::new();
    loop {
        console.line("\nType your question related to the data in the file (or type 'exit' to exit):")?;
        console.prompt("Your question: ")?;

        line.clear();
        let read = tokio::select! {
            biased;
            _ = interrupt.recv() => None,
            r = input.read_line(&mut line) => Some(r?),
        };

        let question = match read {
            None | Some(0) => {
                console.line("\nExiting the application.")?;
                return Ok(());
            }
            Some(_) => line.trim(),
        };
        if question.eq_ignore_ascii_case("exit") {
            console.line("Exiting the application.")?;
            return Ok(());
        }

        console.line(&format!("User question: {}", question))?;
        console.line("Generating dynamic tools and executing code interpreter...")?;

        match agent.task(question).await {
            Ok(output) => {
                console.heading("Output:")?;
                console.answer(&output)?;
            }
            Err(e) => {
                error!(error = ?e, "Error during dynamic code generation or execution.");
                console.error(FAILED_QUESTION_MESSAGE)?;
            }
        }
    }
}

/// Clean up one agent if it was constructed. Failures are logged, never propagated.
async fn release<A: Agent>(label: &str, slot: Option<A>) {
    let Some(mut agent) = slot else { return };
    match agent.cleanup().await {
        Ok(()) => debug!("{} cleaned up", label),
        Err(e) => error!(error = ?e, "Error cleaning up {}", label),
    }
}
