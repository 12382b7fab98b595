//! Instruction sources.

use std::fs;
use std::path::Path;

use autoheal_protocols::Instruction;
use tracing::debug;

use crate::error::EngineError;

/// Serialization of an instruction file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Json,
    Yaml,
}

impl SourceFormat {
    /// Format implied by a file extension, if any.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("json") => Some(SourceFormat::Json),
            Some("yaml") | Some("yml") => Some(SourceFormat::Yaml),
            _ => None,
        }
    }
}

/// Load instructions from a JSON or YAML file.
///
/// Files without a recognised extension are tried as JSON, then YAML.
pub fn load_instructions(path: impl AsRef<Path>) -> Result<Vec<Instruction>, EngineError> {
    let path = path.as_ref();
    let source_err = |message: String| EngineError::Source {
        path: path.display().to_string(),
        message,
    };

    let content = fs::read_to_string(path).map_err(|e| source_err(e.to_string()))?;
    let instructions = match SourceFormat::from_path(path) {
        Some(format) => parse_instructions(&content, format).map_err(source_err)?,
        None => parse_instructions(&content, SourceFormat::Json)
            .or_else(|_| parse_instructions(&content, SourceFormat::Yaml))
            .map_err(source_err)?,
    };

    debug!("Loaded {} instruction(s) from {}", instructions.len(), path.display());
    Ok(instructions)
}

/// Parse instruction records. Blank step labels are numbered by position.
pub fn parse_instructions(content: &str, format: SourceFormat) -> Result<Vec<Instruction>, String> {
    let mut instructions: Vec<Instruction> = match format {
        SourceFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string())?,
        SourceFormat::Yaml => serde_yml::from_str(content).map_err(|e| e.to_string())?,
    };

    for (index, instruction) in instructions.iter_mut().enumerate() {
        if instruction.step.trim().is_empty() {
            instruction.step = (index + 1).to_string();
        }
    }
    Ok(instructions)
}
