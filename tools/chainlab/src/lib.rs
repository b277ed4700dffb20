pub mod config;
pub mod errors;
pub mod host;
pub mod library;
pub mod logging;
pub mod recorder;
pub mod runtime;
pub mod session;
pub mod tui;
pub mod value;

use clap::{error::ErrorKind, Parser, ValueEnum};
use config::{load_config, CliOverrides, OutputFormat};
use errors::ChainlabError;
use host::Host;
use library::FluentLibrary;
use logging::{structured_fallback_line, JsonlLogger, LogEvent};
use runtime::ProductionRuntime;
use serde_json::json;
use session::{ProcessOutcome, Session, EXAMPLE_CODE, EXAMPLE_DATA};
use tui::{render_json, render_report, render_text};

#[derive(Debug, Clone, Parser)]
#[command(name = "chainlab")]
#[command(about = "Run a fluent chain over JSON data and show every recorded step")]
pub struct Cli {
    #[arg(long)]
    pub config: Option<std::path::PathBuf>,
    /// Chain expression, e.g. `_(data).map('city').value()`.
    #[arg(long, conflicts_with = "code_file")]
    pub code: Option<String>,
    #[arg(long)]
    pub code_file: Option<std::path::PathBuf>,
    /// Input data as JSON text.
    #[arg(long, conflicts_with = "data_file")]
    pub data: Option<String>,
    #[arg(long)]
    pub data_file: Option<std::path::PathBuf>,
    #[arg(long, value_enum)]
    pub format: Option<CliFormat>,
    #[arg(long, default_value_t = false)]
    pub use_example: bool,
    #[arg(long, default_value_t = false)]
    pub beautify_data: bool,
    #[arg(long)]
    pub width: Option<u16>,
    #[arg(long)]
    pub height: Option<u16>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CliFormat {
    Auto,
    Text,
    Json,
    Frame,
}

impl From<CliFormat> for OutputFormat {
    fn from(value: CliFormat) -> Self {
        match value {
            CliFormat::Auto => OutputFormat::Auto,
            CliFormat::Text => OutputFormat::Text,
            CliFormat::Json => OutputFormat::Json,
            CliFormat::Frame => OutputFormat::Frame,
        }
    }
}

pub fn run() -> Result<i32, ChainlabError> {
    let args = std::env::args_os().collect::<Vec<_>>();
    let cwd = std::env::current_dir().map_err(|e| ChainlabError::Io(e.to_string()))?;
    let runtime = ProductionRuntime::new();
    run_with_runtime(&args, &cwd, &runtime)
}

pub fn run_with_runtime(
    args: &[std::ffi::OsString],
    cwd: &std::path::Path,
    runtime: &ProductionRuntime,
) -> Result<i32, ChainlabError> {
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => match error.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{error}");
                return Ok(0);
            }
            _ => return Err(ChainlabError::Cli(error.to_string())),
        },
    };

    let overrides = CliOverrides {
        config_path: cli.config.as_ref().map(|path| cwd.join(path)),
        format: cli.format.map(Into::into),
        width: cli.width,
        height: cli.height,
    };
    let cfg = load_config(&overrides, cwd, runtime.file_system.as_ref())?;

    let logger = cfg.logging.path.as_ref().map(|path| JsonlLogger {
        path: path.clone(),
        max_payload_bytes: cfg.logging.max_payload_bytes,
    });
    if let Some(logger) = &logger {
        logger.append(&LogEvent::info(
            "cli_start",
            json!({
                "format": cfg.render.format,
                "use_example": cli.use_example,
                "beautify_data": cli.beautify_data,
            }),
        ))?;
    }

    let code = read_input(runtime, cwd, cli.code.as_deref(), cli.code_file.as_deref())?;
    let data = read_input(runtime, cwd, cli.data.as_deref(), cli.data_file.as_deref())?;
    if code.is_none() && !cli.use_example {
        return Err(ChainlabError::Cli(
            "one of --code, --code-file or --use-example is required".to_string(),
        ));
    }

    let mut session = Session::new(Host::new(FluentLibrary::new()), cfg.serializer());
    if let Some(logger) = logger {
        session = session.with_logger(logger);
    }
    let mut outcome = match (cli.use_example, code, data) {
        (true, None, None) => session.use_example(),
        (true, code, data) => session.load(
            code.unwrap_or_else(|| EXAMPLE_CODE.to_string()),
            data.unwrap_or_else(|| EXAMPLE_DATA.to_string()),
        ),
        (false, code, data) => session.load(code.unwrap_or_default(), data.unwrap_or_default()),
    };
    if cli.beautify_data {
        if let Some(beautified) = session.beautify_data() {
            outcome = beautified;
        }
    }

    let report = session.report();
    let interactive = runtime.terminal.stdout_is_tty();
    match cfg.render.format {
        OutputFormat::Frame => {
            runtime
                .terminal
                .draw(&render_report(&report, cfg.render.width, cfg.render.height)?)?;
        }
        OutputFormat::Auto if interactive => {
            runtime
                .terminal
                .draw(&render_report(&report, cfg.render.width, cfg.render.height)?)?;
        }
        OutputFormat::Json => runtime.terminal.write_line(&render_json(&report)?)?,
        OutputFormat::Text => runtime.terminal.write_line(&render_text(&report))?,
        OutputFormat::Auto => {
            runtime.terminal.write_line(&render_text(&report))?;
            runtime.terminal.write_line(&structured_fallback_line(
                "execute",
                outcome_label(outcome),
                &format!("{} steps recorded", report.steps.len()),
            ))?;
        }
    }

    match session.error() {
        Some(message) => Err(ChainlabError::cannot_process(message)),
        None => Ok(0),
    }
}

fn outcome_label(outcome: ProcessOutcome) -> &'static str {
    match outcome {
        ProcessOutcome::NewResult => "new_result",
        ProcessOutcome::SameResult => "same_result",
        ProcessOutcome::CannotProcess => "cannot_process",
    }
}

fn read_input(
    runtime: &ProductionRuntime,
    cwd: &std::path::Path,
    inline: Option<&str>,
    file: Option<&std::path::Path>,
) -> Result<Option<String>, ChainlabError> {
    if let Some(text) = inline {
        return Ok(Some(text.to_string()));
    }
    match file {
        Some(path) => runtime.file_system.read_to_string(&cwd.join(path)).map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runtime::{FakeFileSystem, FakeTerminal};
    use std::ffi::OsString;
    use std::path::Path;
    use std::sync::Arc;

    fn args(list: &[&str]) -> Vec<OsString> {
        std::iter::once("chainlab")
            .chain(list.iter().copied())
            .map(OsString::from)
            .collect()
    }

    fn fake_runtime(fs: FakeFileSystem, terminal: FakeTerminal) -> ProductionRuntime {
        ProductionRuntime {
            file_system: Arc::new(fs),
            terminal: Arc::new(terminal),
        }
    }

    #[test]
    fn example_renders_a_frame_on_a_terminal() {
        let terminal = FakeTerminal::new(true);
        let rt = fake_runtime(FakeFileSystem::default(), terminal.clone());
        let code = run_with_runtime(&args(&["--use-example"]), Path::new("/work"), &rt)
            .expect("run");
        assert_eq!(code, 0);
        let frames = terminal.drawn_frames();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].contains("Step 2: sortBy"));
    }

    #[test]
    fn code_and_data_files_resolve_against_cwd() {
        let fs = FakeFileSystem::with_file("/work/chain.js", "_.sum(data)");
        fs.insert("/work/data.json", "[1, 2, 3]");
        let terminal = FakeTerminal::new(false);
        let rt = fake_runtime(fs, terminal.clone());
        run_with_runtime(
            &args(&["--code-file", "chain.js", "--data-file", "data.json", "--format", "json"]),
            Path::new("/work"),
            &rt,
        )
        .expect("run");
        let output: serde_json::Value =
            serde_json::from_str(&terminal.written_lines()[0]).expect("json output");
        assert_eq!(output["result"], 6);
        assert_eq!(output["steps"][0]["function_name"], "sum");
    }

    #[test]
    fn non_terminal_auto_output_ends_with_fallback_line() {
        let terminal = FakeTerminal::new(false);
        let rt = fake_runtime(FakeFileSystem::default(), terminal.clone());
        run_with_runtime(&args(&["--code", "_.add(1, 2)"]), Path::new("/work"), &rt)
            .expect("run");
        let lines = terminal.written_lines();
        assert!(lines[0].starts_with("Result:\n3"));
        assert_eq!(
            lines[1],
            "event=execute outcome=new_result message=1 steps recorded "
        );
    }

    #[test]
    fn failures_render_the_report_then_error() {
        let terminal = FakeTerminal::new(false);
        let rt = fake_runtime(FakeFileSystem::default(), terminal.clone());
        let err = run_with_runtime(
            &args(&["--code", "_.map(data", "--format", "text"]),
            Path::new("/work"),
            &rt,
        )
        .expect_err("cannot process");
        assert!(matches!(err, ChainlabError::CannotProcess { .. }));
        assert!(terminal.written_lines()[0].starts_with("Error: can't process"));
    }

    #[test]
    fn missing_code_is_a_cli_error() {
        let rt = fake_runtime(FakeFileSystem::default(), FakeTerminal::new(false));
        let err = run_with_runtime(&args(&["--data", "[]"]), Path::new("/work"), &rt)
            .expect_err("no code");
        assert!(matches!(err, ChainlabError::Cli(_)));
        let err = run_with_runtime(&args(&["--bogus"]), Path::new("/work"), &rt)
            .expect_err("unknown flag");
        assert!(matches!(err, ChainlabError::Cli(_)));
    }
}
