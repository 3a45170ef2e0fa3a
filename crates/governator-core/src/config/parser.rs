//! TOML parser with helpful error messages

use super::GovernatorConfig;
use anyhow::{Context, Result};
use std::path::Path;

/// Load the config file.
///
/// An explicitly requested file must exist; the default location is optional
/// and yields an empty config when absent.
pub fn load_config_file(explicit: Option<&Path>) -> Result<GovernatorConfig> {
    match explicit {
        Some(path) => parse_config(path),
        None => match super::paths::default_config_path() {
            Some(path) if path.exists() => parse_config(&path),
            _ => Ok(GovernatorConfig::default()),
        },
    }
}

/// Parse governator.toml with detailed error messages
pub fn parse_config(path: &Path) -> Result<GovernatorConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse governator.toml content from string
pub fn parse_config_str(content: &str) -> Result<GovernatorConfig> {
    toml::from_str(content).map_err(|e| enhance_toml_error(e, content))
}

/// Enhance TOML parsing errors with the offending line
fn enhance_toml_error(error: toml::de::Error, content: &str) -> anyhow::Error {
    let error_msg = error.to_string();

    let line_hint = error
        .span()
        .map(|span| content[..span.start.min(content.len())].matches('\n').count() + 1);

    match line_hint {
        Some(line_num) => anyhow::anyhow!(
            "TOML parsing error at line {}:\n{}\n\nError: {}",
            line_num,
            get_line_context(content, line_num),
            error_msg
        ),
        None => anyhow::anyhow!("TOML parsing error: {}", error_msg),
    }
}

/// Get context lines around an error
fn get_line_context(content: &str, line_num: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = line_num.saturating_sub(2);
    let end = (line_num + 2).min(lines.len());

    lines[start.min(end)..end]
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let num = start + i + 1;
            let marker = if num == line_num { ">>>" } else { "   " };
            format!("{} {:4} | {}", marker, num, line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
