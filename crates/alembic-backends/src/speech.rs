//! Speech synthesis via external `espeak-ng` (or classic `espeak`).

use crate::backend::{require_input, write_cleanly, Backend, BackendError, ConvertTask};
use crate::tools::{ToolConfig, ToolRegistry};
use alembic_common::{BackendFamily, Capability};
use serde::{Deserialize, Serialize};
use std::process::Command;

const DEFAULT_RATE: u32 = 175;
const DEFAULT_AMPLITUDE: u32 = 100;

/// Backend for text-to-speech conversion.
pub struct SpeechBackend {
    caps: Capability,
    espeak: Option<ToolConfig>,
}

impl SpeechBackend {
    pub fn probe(tools: &ToolRegistry) -> Self {
        let espeak = tools.first_of(&["espeak-ng", "espeak"]).cloned();
        let caps = if espeak.is_some() {
            Capability::of(BackendFamily::Speech, &["txt"], &["wav"])
        } else {
            tracing::warn!("espeak-ng not found; speech synthesis disabled");
            Capability::empty(BackendFamily::Speech)
        };
        Self { caps, espeak }
    }
}

impl Backend for SpeechBackend {
    fn family(&self) -> BackendFamily {
        BackendFamily::Speech
    }

    fn capabilities(&self) -> &Capability {
        &self.caps
    }

    fn convert(&self, task: &ConvertTask<'_>) -> Result<(), BackendError> {
        require_input(task.input)?;
        let tool = self
            .espeak
            .as_ref()
            .ok_or_else(|| BackendError::new("espeak-ng is not available"))?;

        // Rate is words per minute; volume maps onto espeak's 0-200
        // amplitude scale.
        let rate = task.options.rate.unwrap_or(DEFAULT_RATE).clamp(50, 400);
        let amplitude = task
            .options
            .volume
            .map(|v| (v.clamp(0.0, 1.0) * 200.0).round() as u32)
            .unwrap_or(DEFAULT_AMPLITUDE);

        let mut args = vec![
            "-f".to_string(),
            task.input.display().to_string(),
            "-w".to_string(),
            task.output.display().to_string(),
            "-s".to_string(),
            rate.to_string(),
            "-a".to_string(),
            amplitude.to_string(),
        ];
        if let Some(ref voice) = task.options.voice {
            args.extend(["-v".to_string(), voice.clone()]);
        }

        write_cleanly(task.output, || tool.run(&args))
    }
}

/// One synthesizer voice as reported by espeak.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voice {
    /// Identifier accepted by the `voice` conversion option.
    pub id: String,
    pub name: String,
    pub language: String,
}

/// List the voices the installed synthesizer offers.
pub fn list_voices(tools: &ToolRegistry) -> Result<Vec<Voice>, BackendError> {
    let tool = tools
        .first_of(&["espeak-ng", "espeak"])
        .ok_or_else(|| BackendError::new("espeak-ng is not available"))?;

    let output = Command::new(&tool.path)
        .arg("--voices")
        .output()
        .map_err(|e| BackendError::new(format!("failed to run {}: {e}", tool.name)))?;
    if !output.status.success() {
        return Err(BackendError::new(format!(
            "{} --voices exited with {}",
            tool.name, output.status
        )));
    }

    // Columns: Pty Language Age/Gender VoiceName File Other
    let stdout = String::from_utf8_lossy(&output.stdout);
    let voices = stdout
        .lines()
        .skip(1)
        .filter_map(|line| {
            let cols: Vec<&str> = line.split_whitespace().collect();
            if cols.len() < 4 {
                return None;
            }
            Some(Voice {
                id: cols[1].to_string(),
                name: cols[3].to_string(),
                language: cols[1].to_string(),
            })
        })
        .collect();

    Ok(voices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolPaths;
    use alembic_common::FormatToken;

    #[test]
    fn probe_reports_degraded_or_full() {
        let backend = SpeechBackend::probe(&ToolRegistry::discover(&ToolPaths::default()));
        if backend.espeak.is_some() {
            assert!(backend
                .caps
                .supports(&FormatToken::new("txt"), &FormatToken::new("wav")));
        } else {
            assert!(backend.caps.is_empty());
        }
    }
}
