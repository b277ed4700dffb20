use crate::errors::ChainlabError;
use crate::logging::DEFAULT_MAX_PAYLOAD_BYTES;
use crate::recorder::text::{DEFAULT_INDENT, DEFAULT_MAX_TEXT_BYTES};
use crate::recorder::StepSerializer;
use crate::runtime::FileSystem;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

pub const MAX_INDENT: usize = 8;
pub const FRAME_WIDTH_RANGE: RangeInclusive<u16> = 20..=500;
pub const FRAME_HEIGHT_RANGE: RangeInclusive<u16> = 8..=500;

#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub format: Option<OutputFormat>,
    pub width: Option<u16>,
    pub height: Option<u16>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Frame on a terminal, text otherwise.
    #[default]
    Auto,
    Text,
    Json,
    Frame,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    pub recorder: RecorderConfig,
    pub render: RenderConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecorderConfig {
    pub indent: usize,
    pub max_text_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RenderConfig {
    pub format: OutputFormat,
    pub width: u16,
    pub height: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    pub path: Option<PathBuf>,
    pub max_payload_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            recorder: RecorderConfig {
                indent: DEFAULT_INDENT,
                max_text_bytes: DEFAULT_MAX_TEXT_BYTES,
            },
            render: RenderConfig {
                format: OutputFormat::Auto,
                width: 120,
                height: 40,
            },
            logging: LoggingConfig {
                path: None,
                max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            },
        }
    }
}

impl AppConfig {
    pub fn serializer(&self) -> StepSerializer {
        StepSerializer::new(self.recorder.indent, self.recorder.max_text_bytes)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PartialAppConfig {
    recorder: Option<PartialRecorderConfig>,
    render: Option<PartialRenderConfig>,
    logging: Option<PartialLoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PartialRecorderConfig {
    indent: Option<usize>,
    max_text_bytes: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PartialRenderConfig {
    format: Option<OutputFormat>,
    width: Option<u16>,
    height: Option<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PartialLoggingConfig {
    path: Option<PathBuf>,
    max_payload_bytes: Option<usize>,
}

/// Defaults, then the TOML file (if any), then CLI flags, then validation.
/// A relative logging path resolves against `process_cwd`.
pub fn load_config(
    overrides: &CliOverrides,
    process_cwd: &Path,
    fs: &dyn FileSystem,
) -> Result<AppConfig, ChainlabError> {
    let mut cfg = AppConfig::default();

    if let Some(path) = &overrides.config_path {
        let file_contents = fs.read_to_string(path)?;
        let partial: PartialAppConfig = toml::from_str(&file_contents)
            .map_err(|e| ChainlabError::ConfigParse(e.to_string()))?;
        merge_partial_config(&mut cfg, partial);
    }

    apply_cli_overrides(&mut cfg, overrides);

    if let Some(path) = &cfg.logging.path {
        cfg.logging.path = Some(absolutize_path(process_cwd, path));
    }

    validate_config(&cfg)?;
    Ok(cfg)
}

fn merge_partial_config(cfg: &mut AppConfig, partial: PartialAppConfig) {
    if let Some(recorder) = partial.recorder {
        if let Some(indent) = recorder.indent {
            cfg.recorder.indent = indent;
        }
        if let Some(max_text_bytes) = recorder.max_text_bytes {
            cfg.recorder.max_text_bytes = max_text_bytes;
        }
    }

    if let Some(render) = partial.render {
        if let Some(format) = render.format {
            cfg.render.format = format;
        }
        if let Some(width) = render.width {
            cfg.render.width = width;
        }
        if let Some(height) = render.height {
            cfg.render.height = height;
        }
    }

    if let Some(logging) = partial.logging {
        if let Some(path) = logging.path {
            cfg.logging.path = Some(path);
        }
        if let Some(value) = logging.max_payload_bytes {
            cfg.logging.max_payload_bytes = value;
        }
    }
}

fn apply_cli_overrides(cfg: &mut AppConfig, overrides: &CliOverrides) {
    if let Some(format) = overrides.format {
        cfg.render.format = format;
    }
    if let Some(width) = overrides.width {
        cfg.render.width = width;
    }
    if let Some(height) = overrides.height {
        cfg.render.height = height;
    }
}

fn absolutize_path(base: &Path, value: &Path) -> PathBuf {
    if value.is_absolute() {
        value.to_path_buf()
    } else {
        base.join(value)
    }
}

fn validate_config(cfg: &AppConfig) -> Result<(), ChainlabError> {
    if cfg.recorder.indent > MAX_INDENT {
        return Err(ChainlabError::InvalidConfig(format!(
            "recorder.indent must be at most {MAX_INDENT}"
        )));
    }
    if cfg.recorder.max_text_bytes == 0 {
        return Err(ChainlabError::InvalidConfig(
            "recorder.max_text_bytes must be greater than zero".to_string(),
        ));
    }
    if !FRAME_WIDTH_RANGE.contains(&cfg.render.width) {
        return Err(ChainlabError::InvalidConfig(format!(
            "render.width must be within {}..={}",
            FRAME_WIDTH_RANGE.start(),
            FRAME_WIDTH_RANGE.end()
        )));
    }
    if !FRAME_HEIGHT_RANGE.contains(&cfg.render.height) {
        return Err(ChainlabError::InvalidConfig(format!(
            "render.height must be within {}..={}",
            FRAME_HEIGHT_RANGE.start(),
            FRAME_HEIGHT_RANGE.end()
        )));
    }
    if cfg.logging.max_payload_bytes < 16 {
        return Err(ChainlabError::InvalidConfig(
            "logging.max_payload_bytes must be at least 16".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::FakeFileSystem;

    fn load(toml: &str, overrides: CliOverrides) -> Result<AppConfig, ChainlabError> {
        let fs = FakeFileSystem::with_file("/work/chainlab.toml", toml);
        let overrides = CliOverrides {
            config_path: Some(PathBuf::from("/work/chainlab.toml")),
            ..overrides
        };
        load_config(&overrides, Path::new("/work"), &fs)
    }

    #[test]
    fn defaults_apply_without_a_config_file() {
        let cfg = load_config(
            &CliOverrides::default(),
            Path::new("/work"),
            &FakeFileSystem::default(),
        )
        .expect("defaults");
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.serializer(), StepSerializer::default());
    }

    #[test]
    fn partial_file_merges_over_defaults() {
        let cfg = load(
            "[recorder]\nindent = 4\n\n[logging]\npath = \".cache/events.jsonl\"\n",
            CliOverrides::default(),
        )
        .expect("config");
        assert_eq!(cfg.recorder.indent, 4);
        assert_eq!(cfg.recorder.max_text_bytes, DEFAULT_MAX_TEXT_BYTES);
        assert_eq!(
            cfg.logging.path,
            Some(PathBuf::from("/work/.cache/events.jsonl"))
        );
    }

    #[test]
    fn cli_flags_win_over_file() {
        let cfg = load(
            "[render]\nformat = \"json\"\nwidth = 80\n",
            CliOverrides {
                format: Some(OutputFormat::Frame),
                height: Some(12),
                ..CliOverrides::default()
            },
        )
        .expect("config");
        assert_eq!(cfg.render.format, OutputFormat::Frame);
        assert_eq!(cfg.render.width, 80);
        assert_eq!(cfg.render.height, 12);
    }

    #[test]
    fn invalid_values_and_syntax_are_reported() {
        let err = load("[recorder]\nindent = 12\n", CliOverrides::default()).expect_err("indent");
        assert!(matches!(err, ChainlabError::InvalidConfig(_)));
        let err = load("[recorder]\nmax_text_bytes = 0\n", CliOverrides::default())
            .expect_err("zero cap");
        assert!(matches!(err, ChainlabError::InvalidConfig(_)));
        let err = load(
            "",
            CliOverrides {
                width: Some(u16::MAX),
                height: Some(u16::MAX),
                ..CliOverrides::default()
            },
        )
        .expect_err("huge frame");
        assert!(matches!(err, ChainlabError::InvalidConfig(ref m) if m.starts_with("render.width")));
        let err = load("[render]\nheight = 4\n", CliOverrides::default()).expect_err("tiny frame");
        assert!(matches!(err, ChainlabError::InvalidConfig(ref m) if m.starts_with("render.height")));
        let err = load("[recorder\n", CliOverrides::default()).expect_err("syntax");
        assert!(matches!(err, ChainlabError::ConfigParse(_)));
        let err = load("[recorder]\nindnet = 2\n", CliOverrides::default()).expect_err("typo");
        assert!(matches!(err, ChainlabError::ConfigParse(_)));
    }
}
