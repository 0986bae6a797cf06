//! Document conversions.
//!
//! Plain-text and HTML conversions are pure Rust and always available. PDF
//! text extraction and page rasterization use the poppler utilities
//! (`pdftotext`, `pdftoppm`); everything involving office formats goes
//! through a headless `soffice`. Missing tools shrink the capability set
//! rather than failing startup.

use crate::backend::{require_input, write_cleanly, Backend, BackendError, ConvertTask};
use crate::tools::{ToolConfig, ToolRegistry};
use alembic_common::{BackendFamily, Capability, OutputShape};
use regex::Regex;
use std::fs;
use std::io::Write;
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const DEFAULT_DPI: u32 = 150;

/// Backend for document conversions.
pub struct DocumentBackend {
    caps: Capability,
    pdftotext: Option<ToolConfig>,
    pdftoppm: Option<ToolConfig>,
    soffice: Option<ToolConfig>,
}

impl DocumentBackend {
    pub fn probe(tools: &ToolRegistry) -> Self {
        let pdftotext = tools.get("pdftotext").cloned();
        let pdftoppm = tools.get("pdftoppm").cloned();
        let soffice = tools.get("soffice").cloned();

        // Text and HTML handling has no external dependencies.
        let mut caps = Capability::of(BackendFamily::Document, &["txt", "html"], &["txt", "html"]);

        if pdftotext.is_some() {
            caps.add_inputs(&["pdf"]);
            caps.add_outputs(&["txt"]);
        }
        if pdftoppm.is_some() {
            // Serves the pdf-to-image fan-out; the outputs feed the
            // special-case resolution, not plain document conversion.
            caps.add_inputs(&["pdf"]);
            caps.add_outputs(&["jpg", "jpeg", "png"]);
        }
        if soffice.is_some() {
            caps.add_inputs(&["pdf", "docx", "odt", "rtf"]);
            caps.add_outputs(&["pdf", "docx"]);
        }

        Self {
            caps,
            pdftotext,
            pdftoppm,
            soffice,
        }
    }

    fn pdf_to_text(&self, task: &ConvertTask<'_>) -> Result<(), BackendError> {
        let tool = self
            .pdftotext
            .as_ref()
            .ok_or_else(|| BackendError::new("pdftotext is not available"))?;
        tool.run(&[
            task.input.display().to_string(),
            task.output.display().to_string(),
        ])
    }

    /// Rasterize every PDF page and package the images into one zip archive.
    fn pdf_to_page_archive(&self, task: &ConvertTask<'_>) -> Result<(), BackendError> {
        let tool = self
            .pdftoppm
            .as_ref()
            .ok_or_else(|| BackendError::new("pdftoppm is not available"))?;

        let image_ext = match task.target_format.as_str() {
            "png" => "png",
            "jpg" | "jpeg" => "jpg",
            other => {
                return Err(BackendError::new(format!(
                    "unsupported page image format: {other}"
                )))
            }
        };

        let scratch = tempfile::tempdir()?;
        let prefix = scratch.path().join("page");
        let dpi = task.options.dpi.unwrap_or(DEFAULT_DPI);

        let format_flag = if image_ext == "png" { "-png" } else { "-jpeg" };
        tool.run(&[
            "-r".to_string(),
            dpi.to_string(),
            format_flag.to_string(),
            task.input.display().to_string(),
            prefix.display().to_string(),
        ])?;

        // pdftoppm names pages itself; collect and sort them for stable
        // archive ordering.
        let mut pages: Vec<_> = fs::read_dir(scratch.path())?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .collect();
        pages.sort();

        if pages.is_empty() {
            return Err(BackendError::new("pdftoppm produced no pages"));
        }

        let stem = task
            .input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("document");

        write_cleanly(task.output, || {
            let file = fs::File::create(task.output)?;
            let mut zip = ZipWriter::new(file);
            let options =
                SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

            for (index, page) in pages.iter().enumerate() {
                let entry_name = format!("{}_page_{:03}.{}", stem, index + 1, image_ext);
                zip.start_file(entry_name, options)?;
                zip.write_all(&fs::read(page)?)?;
            }
            zip.finish()?;
            Ok(())
        })
    }

    /// Generic office-format conversion through headless LibreOffice.
    fn soffice_convert(&self, task: &ConvertTask<'_>) -> Result<(), BackendError> {
        let tool = self.soffice.as_ref().ok_or_else(|| {
            BackendError::new(format!(
                "no converter available for {} -> {}",
                task.source_format, task.target_format
            ))
        })?;

        let scratch = tempfile::tempdir()?;
        tool.run(&[
            "--headless".to_string(),
            "--convert-to".to_string(),
            task.target_format.as_str().to_string(),
            "--outdir".to_string(),
            scratch.path().display().to_string(),
            task.input.display().to_string(),
        ])?;

        // soffice names the output after the input stem.
        let stem = task
            .input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("document");
        let produced = scratch
            .path()
            .join(format!("{}.{}", stem, task.target_format.as_str()));
        if !produced.is_file() {
            return Err(BackendError::new("soffice produced no output"));
        }

        write_cleanly(task.output, || {
            fs::copy(&produced, task.output)?;
            Ok(())
        })
    }
}

impl Backend for DocumentBackend {
    fn family(&self) -> BackendFamily {
        BackendFamily::Document
    }

    fn capabilities(&self) -> &Capability {
        &self.caps
    }

    fn convert(&self, task: &ConvertTask<'_>) -> Result<(), BackendError> {
        require_input(task.input)?;

        if task.shape == OutputShape::PageArchive {
            return self.pdf_to_page_archive(task);
        }

        match (task.source_format.as_str(), task.target_format.as_str()) {
            ("txt", "html") => write_cleanly(task.output, || txt_to_html(task.input, task.output)),
            ("html", "txt") => write_cleanly(task.output, || html_to_txt(task.input, task.output)),
            ("pdf", "txt") if self.pdftotext.is_some() => {
                write_cleanly(task.output, || self.pdf_to_text(task))
            }
            _ => self.soffice_convert(task),
        }
    }
}

/// Render plain text as a standalone styled HTML page.
///
/// A short all-caps line with no trailing period is treated as a heading,
/// everything else as a paragraph.
fn txt_to_html(input: &Path, output: &Path) -> Result<(), BackendError> {
    let content = fs::read_to_string(input)?;
    let title = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");

    let mut body = String::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            body.push_str("        <div class=\"empty-line\"></div>\n");
        } else if looks_like_heading(trimmed) {
            body.push_str(&format!("        <h2>{}</h2>\n", escape_html(trimmed)));
        } else {
            body.push_str(&format!("        <p>{}</p>\n", escape_html(line)));
        }
    }

    let html = format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
             <meta charset=\"UTF-8\">\n\
             <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
             <title>{title}</title>\n\
             <style>\n\
                 body {{ font-family: Arial, sans-serif; line-height: 1.6; max-width: 800px; margin: 0 auto; padding: 20px; background-color: #f9f9f9; }}\n\
                 .container {{ background-color: white; padding: 30px; border-radius: 8px; box-shadow: 0 2px 10px rgba(0,0,0,0.1); }}\n\
                 h1 {{ color: #333; border-bottom: 2px solid #007acc; padding-bottom: 10px; }}\n\
                 h2 {{ color: #555; margin-top: 30px; }}\n\
                 p {{ margin-bottom: 15px; text-align: justify; }}\n\
                 .empty-line {{ height: 15px; }}\n\
             </style>\n\
         </head>\n\
         <body>\n\
             <div class=\"container\">\n\
                 <h1>{heading}</h1>\n\
         {body}    </div>\n\
         </body>\n\
         </html>",
        title = escape_html(title),
        heading = escape_html(title),
        body = body,
    );

    fs::write(output, html)?;
    Ok(())
}

/// Strip markup from an HTML file, leaving readable plain text.
fn html_to_txt(input: &Path, output: &Path) -> Result<(), BackendError> {
    let html = fs::read_to_string(input)?;

    let script_re = Regex::new(r"(?is)<script[^>]*>.*?</script>")
        .map_err(|e| BackendError::new(format!("regex error: {e}")))?;
    let style_re = Regex::new(r"(?is)<style[^>]*>.*?</style>")
        .map_err(|e| BackendError::new(format!("regex error: {e}")))?;
    let tag_re =
        Regex::new(r"<[^>]+>").map_err(|e| BackendError::new(format!("regex error: {e}")))?;

    let without_script = script_re.replace_all(&html, "");
    let without_style = style_re.replace_all(&without_script, "");
    let stripped = tag_re.replace_all(&without_style, "");

    let decoded = stripped
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ");

    let lines: Vec<&str> = decoded
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    fs::write(output, lines.join("\n"))?;
    Ok(())
}

fn looks_like_heading(line: &str) -> bool {
    line.len() < 50
        && !line.ends_with('.')
        && line.chars().any(|c| c.is_alphabetic())
        && line
            .chars()
            .filter(|c| c.is_alphabetic())
            .all(|c| c.is_uppercase())
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolPaths;
    use alembic_common::{ConvertOptions, FormatToken};

    fn backend() -> DocumentBackend {
        DocumentBackend::probe(&ToolRegistry::discover(&ToolPaths::default()))
    }

    #[test]
    fn txt_and_html_are_always_supported() {
        let caps = backend().caps;
        assert!(caps.supports(&FormatToken::new("txt"), &FormatToken::new("html")));
        assert!(caps.supports(&FormatToken::new("html"), &FormatToken::new("txt")));
    }

    #[test]
    fn txt_to_html_escapes_and_detects_headings() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("notes.txt");
        let output = dir.path().join("notes.html");
        fs::write(&input, "CHAPTER ONE\nA line with <angles> & ampersands.\n").unwrap();

        let source = FormatToken::new("txt");
        let target = FormatToken::new("html");
        let options = ConvertOptions::default();
        backend()
            .convert(&ConvertTask {
                input: &input,
                output: &output,
                source_format: &source,
                target_format: &target,
                shape: OutputShape::Single,
                options: &options,
            })
            .unwrap();

        let html = fs::read_to_string(&output).unwrap();
        assert!(html.contains("<h2>CHAPTER ONE</h2>"));
        assert!(html.contains("&lt;angles&gt; &amp; ampersands."));
    }

    #[test]
    fn html_to_txt_strips_markup() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("page.html");
        let output = dir.path().join("page.txt");
        fs::write(
            &input,
            "<html><head><style>p { color: red }</style></head>\
             <body><script>alert(1)</script><p>Hello &amp; goodbye</p></body></html>",
        )
        .unwrap();

        let source = FormatToken::new("html");
        let target = FormatToken::new("txt");
        let options = ConvertOptions::default();
        backend()
            .convert(&ConvertTask {
                input: &input,
                output: &output,
                source_format: &source,
                target_format: &target,
                shape: OutputShape::Single,
                options: &options,
            })
            .unwrap();

        let text = fs::read_to_string(&output).unwrap();
        assert!(text.contains("Hello & goodbye"));
        assert!(!text.contains("alert"));
        assert!(!text.contains("color: red"));
    }

    #[test]
    fn heading_heuristic() {
        assert!(looks_like_heading("INTRODUCTION"));
        assert!(!looks_like_heading("INTRODUCTION."));
        assert!(!looks_like_heading("A normal sentence"));
        assert!(!looks_like_heading("123 456"));
    }
}
