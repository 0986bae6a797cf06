//! Video and audio conversions via external `ffmpeg`.

use crate::backend::{require_input, write_cleanly, Backend, BackendError, ConvertTask};
use crate::tools::{ToolConfig, ToolRegistry};
use alembic_common::{BackendFamily, Capability};

const INPUT_FORMATS: &[&str] = &[
    "mp4", "avi", "mov", "mkv", "wmv", "flv", "webm", "gif", "mp3", "wav", "flac", "aac", "ogg",
];
const OUTPUT_FORMATS: &[&str] = &[
    "mp4", "avi", "mov", "mkv", "webm", "wmv", "gif", "mp3", "wav", "aac", "flac", "ogg",
];

const VIDEO_FORMATS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm", "wmv", "flv"];

/// Backend for time-based media conversions.
pub struct MediaBackend {
    caps: Capability,
    ffmpeg: Option<ToolConfig>,
}

impl MediaBackend {
    /// Everything hinges on `ffmpeg`: without it the whole family degrades
    /// to an empty capability set.
    pub fn probe(tools: &ToolRegistry) -> Self {
        let ffmpeg = tools.get("ffmpeg").cloned();
        let caps = if ffmpeg.is_some() {
            Capability::of(BackendFamily::Media, INPUT_FORMATS, OUTPUT_FORMATS)
        } else {
            tracing::warn!("ffmpeg not found; media conversions disabled");
            Capability::empty(BackendFamily::Media)
        };
        Self { caps, ffmpeg }
    }

    /// Animated GIF to video container.
    fn gif_to_video(&self, tool: &ToolConfig, task: &ConvertTask<'_>) -> Result<(), BackendError> {
        let fps = task.options.fps.unwrap_or(15);
        tool.run(&[
            "-i".to_string(),
            task.input.display().to_string(),
            "-movflags".to_string(),
            "faststart".to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-r".to_string(),
            fps.to_string(),
            "-y".to_string(),
            task.output.display().to_string(),
        ])
    }

    /// Video to GIF with palette optimization, falling back to a plain
    /// single-pass conversion when palette generation fails.
    fn video_to_gif(&self, tool: &ToolConfig, task: &ConvertTask<'_>) -> Result<(), BackendError> {
        let fps = task.options.fps.unwrap_or(10);
        let scale = task.options.scale.as_deref().unwrap_or("320:-1");

        let scratch = tempfile::tempdir()?;
        let palette = scratch.path().join("palette.png");

        let palette_result = tool.run(&[
            "-i".to_string(),
            task.input.display().to_string(),
            "-vf".to_string(),
            "palettegen".to_string(),
            "-y".to_string(),
            palette.display().to_string(),
        ]);

        if palette_result.is_ok() && palette.is_file() {
            return tool.run(&[
                "-i".to_string(),
                task.input.display().to_string(),
                "-i".to_string(),
                palette.display().to_string(),
                "-filter_complex".to_string(),
                format!("fps={fps},scale={scale}:flags=lanczos[x];[x][1:v]paletteuse"),
                "-y".to_string(),
                task.output.display().to_string(),
            ]);
        }

        tracing::debug!("palette generation failed, using single-pass gif conversion");
        tool.run(&[
            "-i".to_string(),
            task.input.display().to_string(),
            "-vf".to_string(),
            format!("fps={fps},scale={scale}:flags=lanczos"),
            "-y".to_string(),
            task.output.display().to_string(),
        ])
    }

    /// Standard container/codec conversion with optional quality knobs.
    fn transcode(&self, tool: &ToolConfig, task: &ConvertTask<'_>) -> Result<(), BackendError> {
        let mut args = vec!["-i".to_string(), task.input.display().to_string()];

        if let Some(quality) = task.options.quality {
            args.extend(["-crf".to_string(), quality.to_string()]);
        }
        if let Some(ref bitrate) = task.options.bitrate {
            args.extend(["-b:v".to_string(), bitrate.clone()]);
        }
        if let Some(ref audio_bitrate) = task.options.audio_bitrate {
            args.extend(["-b:a".to_string(), audio_bitrate.clone()]);
        }

        args.extend(["-y".to_string(), task.output.display().to_string()]);
        tool.run(&args)
    }
}

impl Backend for MediaBackend {
    fn family(&self) -> BackendFamily {
        BackendFamily::Media
    }

    fn capabilities(&self) -> &Capability {
        &self.caps
    }

    fn convert(&self, task: &ConvertTask<'_>) -> Result<(), BackendError> {
        require_input(task.input)?;
        let tool = self
            .ffmpeg
            .as_ref()
            .ok_or_else(|| BackendError::new("ffmpeg is not available"))?;

        let source = task.source_format.as_str();
        let target = task.target_format.as_str();

        write_cleanly(task.output, || {
            if source == "gif" && VIDEO_FORMATS.contains(&target) {
                self.gif_to_video(tool, task)
            } else if target == "gif" && VIDEO_FORMATS.contains(&source) {
                self.video_to_gif(tool, task)
            } else {
                self.transcode(tool, task)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolPaths;
    use alembic_common::FormatToken;

    #[test]
    fn probe_without_panicking() {
        let backend = MediaBackend::probe(&ToolRegistry::discover(&ToolPaths::default()));
        // Either ffmpeg is present and the full set is reported, or the
        // family is degraded to empty -- never anything in between.
        if backend.ffmpeg.is_some() {
            assert!(backend
                .caps
                .supports(&FormatToken::new("mp4"), &FormatToken::new("webm")));
        } else {
            assert!(backend.caps.is_empty());
        }
    }
}
