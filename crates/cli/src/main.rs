use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use lambdachain_engine::{ChainExecutor, ExecutorSettings, HttpStepDispatcher, StaticHandlerLocator, validate_templates};
use lambdachain_registry::{DirectoryWorkflowSource, RuntimeConfig, WorkflowRegistry};
use lambdachain_types::{JsonMap, WorkflowInput};
use lambdachain_util::expand_tilde;
use serde::Serialize;
use tracing::{debug, warn};

/// Run workflow chains against remote handlers.
#[derive(Debug, Parser)]
#[command(name = "lambdachain", version, about)]
struct Cli {
    /// Configuration file (defaults to $LAMBDACHAIN_CONFIG, then the user config dir).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding workflow documents; overrides the configuration.
    #[arg(long, global = true)]
    workflows_dir: Option<String>,

    /// Default per-step dispatch deadline in milliseconds; overrides the configuration.
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List workflows available in the workflows directory.
    List,
    /// Load and validate workflow definitions, including template syntax.
    Validate {
        /// Workflows to check; all when omitted.
        names: Vec<String>,
    },
    /// Execute a workflow and print its output.
    Run {
        workflow: String,
        #[command(flatten)]
        input: InputArgs,
        /// Print the full execution record instead of the output.
        #[arg(long)]
        trace: bool,
    },
    /// Invoke a single handler directly and print its result.
    Invoke {
        handler: String,
        #[command(flatten)]
        input: InputArgs,
    },
    /// Print the configured handler routes.
    Handlers,
}

#[derive(Debug, clap::Args)]
struct InputArgs {
    /// JSON object sent as the input data.
    #[arg(long, default_value = "{}")]
    data: String,
    /// JSON object carried as context through every step.
    #[arg(long, default_value = "{}")]
    context: String,
}

impl InputArgs {
    fn to_input(&self) -> Result<WorkflowInput> {
        Ok(WorkflowInput::new(
            parse_object("--data", &self.data)?,
            parse_object("--context", &self.context)?,
        ))
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    debug!(workflows_dir = %config.workflows_dir, handlers = config.handlers.len(), "configuration loaded");

    match &cli.command {
        Command::List => {
            let registry = open_registry(&config);
            registry.load_all().context("failed to scan workflows directory")?;
            for name in registry.list() {
                let description = registry.get(&name).map(|definition| definition.description.clone()).unwrap_or_default();
                if description.is_empty() {
                    println!("{name}");
                } else {
                    println!("{name}\t{description}");
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Validate { names } => validate(&config, names),
        Command::Run { workflow, input, trace } => {
            let executor = build_executor(&config)?;
            let run = executor
                .run_chain(workflow, input.to_input()?)
                .await
                .with_context(|| format!("workflow '{workflow}' could not run"))?;
            if *trace {
                print_json(&run)?;
            } else {
                print_json(&run.output)?;
            }
            Ok(if run.output.is_error() { ExitCode::FAILURE } else { ExitCode::SUCCESS })
        }
        Command::Invoke { handler, input } => {
            let executor = build_executor(&config)?;
            let result = executor
                .invoke_handler(handler, input.to_input()?)
                .await
                .with_context(|| format!("handler '{handler}' could not be invoked"))?;
            print_json(&result)?;
            Ok(if result.is_error() { ExitCode::FAILURE } else { ExitCode::SUCCESS })
        }
        Command::Handlers => {
            let locator = StaticHandlerLocator::from_config(&config)?;
            for (handler, address) in locator.routes() {
                println!("{handler}\t{address}");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(cli: &Cli) -> Result<RuntimeConfig> {
    let explicit = cli.config.as_ref().map(|path| expand_tilde(&path.to_string_lossy()));
    let mut config = RuntimeConfig::load(explicit.as_deref()).context("failed to load configuration")?;
    if let Some(dir) = &cli.workflows_dir {
        config.workflows_dir = dir.clone();
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.request_timeout_ms = timeout_ms;
    }
    config.validated().context("invalid configuration")
}

fn open_registry(config: &RuntimeConfig) -> Arc<WorkflowRegistry> {
    let source = DirectoryWorkflowSource::new(config.workflows_path());
    Arc::new(WorkflowRegistry::new(Arc::new(source)))
}

fn build_executor(config: &RuntimeConfig) -> Result<ChainExecutor> {
    let locator = StaticHandlerLocator::from_config(config).context("invalid handler configuration")?;
    let dispatcher = HttpStepDispatcher::new().context("failed to build HTTP client")?;
    Ok(ChainExecutor::new(open_registry(config), Arc::new(locator), Arc::new(dispatcher)).with_settings(ExecutorSettings::from_config(config)))
}

fn validate(config: &RuntimeConfig, names: &[String]) -> Result<ExitCode> {
    let registry = open_registry(config);
    let mut failures = 0usize;

    let names = if names.is_empty() {
        let report = registry.load_all().context("failed to scan workflows directory")?;
        for (name, error) in &report.failed {
            println!("error\t{name}\t{error}");
        }
        failures += report.failed.len();
        report.loaded
    } else {
        let mut loaded = Vec::new();
        for name in names {
            match registry.load(name) {
                Ok(_) => loaded.push(name.clone()),
                Err(error) => {
                    println!("error\t{name}\t{error}");
                    failures += 1;
                }
            }
        }
        loaded
    };

    for name in names {
        let definition = registry.get(&name)?;
        match validate_templates(&definition) {
            Ok(()) => println!("ok\t{name}"),
            Err(error) => {
                println!("error\t{name}\t{error}");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        warn!(failures, "workflow validation failed");
        bail!("{failures} workflow(s) failed validation");
    }
    Ok(ExitCode::SUCCESS)
}

fn parse_object(flag: &str, raw: &str) -> Result<JsonMap> {
    let value: serde_json::Value = serde_json::from_str(raw).with_context(|| format!("{flag} is not valid JSON"))?;
    match value {
        serde_json::Value::Object(map) => Ok(map),
        serde_json::Value::Null => Ok(JsonMap::new()),
        _ => bail!("{flag} must be a JSON object"),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_run_with_input_and_global_flags() {
        let cli = Cli::try_parse_from([
            "lambdachain",
            "run",
            "signup",
            "--data",
            r#"{"email":"a@b.com"}"#,
            "--trace",
            "--timeout-ms",
            "500",
        ])
        .unwrap();
        assert_eq!(cli.timeout_ms, Some(500));
        let Command::Run { workflow, input, trace } = cli.command else {
            panic!("expected run");
        };
        assert_eq!(workflow, "signup");
        assert!(trace);
        let input = input.to_input().unwrap();
        assert_eq!(input.data.get("email"), Some(&serde_json::json!("a@b.com")));
        assert!(input.context.is_empty());
    }

    #[test]
    fn zero_timeout_override_is_rejected() {
        assert!(Cli::try_parse_from(["lambdachain", "--timeout-ms", "0", "list"]).is_err());
        let cli = Cli::try_parse_from(["lambdachain", "--timeout-ms", "1", "list"]).unwrap();
        assert_eq!(cli.timeout_ms, Some(1));
    }

    #[test]
    fn rejects_non_object_input() {
        assert!(parse_object("--data", "[1]").is_err());
        assert!(parse_object("--data", "{").is_err());
        assert!(parse_object("--data", "null").unwrap().is_empty());
    }

    #[test]
    fn overrides_apply_on_top_of_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "workflows_dir: flows\nrequest_timeout_ms: 1000\nhandlers:\n  echo: 9000\n").unwrap();
        let cli = Cli::try_parse_from(["lambdachain", "--config", path.to_str().unwrap(), "--workflows-dir", "other", "handlers"]).unwrap();

        let config = load_config(&cli).unwrap();
        assert_eq!(config.workflows_dir, "other");
        assert_eq!(config.request_timeout_ms, 1000);
        assert_eq!(config.handlers.len(), 1);
    }
}
