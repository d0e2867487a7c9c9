//! `md2cf render` command implementation.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use md2cf_config::{CliSettings, Config};
use md2cf_renderer::{ConfluenceRenderer, RelativeLink, RenderResult};
use serde::Serialize;

use crate::error::CliError;
use crate::output::Output;

/// Output format for rendered documents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Storage format bodies, one after another.
    #[default]
    Xml,
    /// JSON array with body, title, attachments and relative links per file.
    Json,
}

/// Arguments for the render command.
#[derive(Args)]
#[allow(clippy::struct_excessive_bools)]
pub(crate) struct RenderArgs {
    /// Markdown files to convert.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Leave the heading used as the page title out of the body.
    #[arg(long)]
    strip_header: bool,

    /// Replace newlines in paragraph text with spaces.
    #[arg(long)]
    remove_text_newlines: bool,

    /// Replace links to local documents with placeholders.
    #[arg(long)]
    enable_relative_links: bool,

    /// Disable GitHub Flavored Markdown extensions (tables, strikethrough, task lists).
    #[arg(long)]
    no_gfm: bool,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Xml)]
    format: OutputFormat,

    /// Path to configuration file (default: auto-discover md2cf.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

/// A converted markdown file.
#[derive(Debug, Serialize)]
struct RenderedFile {
    file: PathBuf,
    title: String,
    body: String,
    attachments: Vec<PathBuf>,
    relative_links: Vec<RelativeLink>,
    /// Whether `title` came from a level-1 heading rather than the file name.
    #[serde(skip)]
    has_heading_title: bool,
}

impl RenderedFile {
    fn new(file: &Path, result: RenderResult) -> Self {
        let base_dir = file.parent().unwrap_or(Path::new(""));
        let attachments = result.attachment_paths(base_dir);
        let has_heading_title = result.title.is_some();
        let title = result.title.unwrap_or_else(|| title_from_file_name(file));
        Self {
            file: file.to_path_buf(),
            title,
            body: result.body,
            attachments,
            relative_links: result.relative_links,
            has_heading_title,
        }
    }
}

impl RenderArgs {
    /// Execute the render command.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be loaded, a file cannot be read,
    /// or the output cannot be written.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let config = Config::load(self.config.as_deref(), Some(&self.cli_settings()))?;
        if let Some(path) = &config.config_path {
            tracing::info!(path = %path.display(), "Loaded configuration");
        }

        let mut renderer = ConfluenceRenderer::with_options(config.renderer_options());
        let mut documents = Vec::with_capacity(self.files.len());
        for file in &self.files {
            let document = convert_file(&mut renderer, file)?;
            if !document.has_heading_title {
                output.warning(&format!(
                    "No level-1 heading in {}, using \"{}\" as title",
                    file.display(),
                    document.title
                ));
            }
            documents.push(document);
        }

        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        if self.format == OutputFormat::Xml && documents.len() > 1 {
            for document in &documents {
                output.highlight(&document.file.display().to_string());
                out.write_all(document.body.as_bytes())?;
                out.flush()?;
            }
        } else {
            write_documents(&mut out, self.format, &documents)?;
        }

        output.success(&format!("Converted {} file(s)", documents.len()));
        Ok(())
    }

    fn cli_settings(&self) -> CliSettings {
        CliSettings {
            strip_header: self.strip_header.then_some(true),
            remove_text_newlines: self.remove_text_newlines.then_some(true),
            enable_relative_links: self.enable_relative_links.then_some(true),
            gfm: self.no_gfm.then_some(false),
        }
    }
}

fn convert_file(renderer: &mut ConfluenceRenderer, file: &Path) -> Result<RenderedFile, CliError> {
    let markdown = std::fs::read_to_string(file).map_err(|source| CliError::Read {
        path: file.to_path_buf(),
        source,
    })?;
    let result = renderer.render_markdown(&markdown);
    tracing::info!(
        file = %file.display(),
        title = result.title.as_deref(),
        attachments = result.attachments.len(),
        relative_links = result.relative_links.len(),
        "Converted file"
    );
    Ok(RenderedFile::new(file, result))
}

fn write_documents<W: Write>(
    out: &mut W,
    format: OutputFormat,
    documents: &[RenderedFile],
) -> Result<(), CliError> {
    match format {
        OutputFormat::Xml => {
            for document in documents {
                out.write_all(document.body.as_bytes())?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, documents)?;
            writeln!(out)?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Page title derived from the file name (`getting-started.md` -> `getting-started`).
fn title_from_file_name(file: &Path) -> String {
    file.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: RenderArgs,
    }

    fn parse(args: &[&str]) -> RenderArgs {
        let argv = std::iter::once("md2cf").chain(args.iter().copied());
        TestCli::try_parse_from(argv).unwrap().args
    }

    #[test]
    fn test_cli_settings_default_to_config_values() {
        let settings = parse(&["page.md"]).cli_settings();
        assert_eq!(settings.strip_header, None);
        assert_eq!(settings.remove_text_newlines, None);
        assert_eq!(settings.enable_relative_links, None);
        assert_eq!(settings.gfm, None);
    }

    #[test]
    fn test_cli_settings_from_flags() {
        let args = parse(&[
            "--strip-header",
            "--remove-text-newlines",
            "--enable-relative-links",
            "--no-gfm",
            "page.md",
        ]);
        let settings = args.cli_settings();
        assert_eq!(settings.strip_header, Some(true));
        assert_eq!(settings.remove_text_newlines, Some(true));
        assert_eq!(settings.enable_relative_links, Some(true));
        assert_eq!(settings.gfm, Some(false));
    }

    #[test]
    fn test_files_required() {
        let argv = ["md2cf"];
        assert!(TestCli::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_format_flag() {
        assert_eq!(parse(&["page.md"]).format, OutputFormat::Xml);
        assert_eq!(
            parse(&["--format", "json", "page.md"]).format,
            OutputFormat::Json
        );
    }

    #[test]
    fn test_title_from_file_name() {
        assert_eq!(
            title_from_file_name(Path::new("docs/getting-started.md")),
            "getting-started"
        );
        assert_eq!(title_from_file_name(Path::new("README")), "README");
    }

    #[test]
    fn test_convert_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("page.md");
        std::fs::write(&file, "# Welcome\n\n![diagram](img/arch.png)\n").unwrap();

        let mut renderer = ConfluenceRenderer::new();
        let document = convert_file(&mut renderer, &file).unwrap();

        assert_eq!(document.title, "Welcome");
        assert!(document.has_heading_title);
        assert_eq!(document.attachments, vec![dir.path().join("img/arch.png")]);
        assert!(document.body.starts_with("<h1>Welcome</h1>\n"));
    }

    #[test]
    fn test_convert_file_title_falls_back_to_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("release-notes.md");
        std::fs::write(&file, "## Changes\n\nNothing yet.\n").unwrap();

        let mut renderer = ConfluenceRenderer::new();
        let document = convert_file(&mut renderer, &file).unwrap();

        assert_eq!(document.title, "release-notes");
        assert!(!document.has_heading_title);
    }

    #[test]
    fn test_convert_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("missing.md");

        let mut renderer = ConfluenceRenderer::new();
        let result = convert_file(&mut renderer, &file);

        assert!(matches!(result, Err(CliError::Read { path, .. }) if path == file));
    }

    #[test]
    fn test_write_documents_xml() {
        let documents = vec![RenderedFile::new(
            Path::new("a.md"),
            RenderResult {
                body: "<p>a</p>\n".to_owned(),
                ..RenderResult::default()
            },
        )];
        let mut out = Vec::new();

        write_documents(&mut out, OutputFormat::Xml, &documents).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "<p>a</p>\n");
    }

    #[test]
    fn test_write_documents_json() {
        let documents = vec![RenderedFile::new(
            Path::new("docs/a.md"),
            RenderResult {
                body: "<p>a</p>\n".to_owned(),
                title: Some("A".to_owned()),
                attachments: vec!["b.png".to_owned()],
                relative_links: Vec::new(),
            },
        )];
        let mut out = Vec::new();

        write_documents(&mut out, OutputFormat::Json, &documents).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(
            value,
            serde_json::json!([{
                "file": "docs/a.md",
                "title": "A",
                "body": "<p>a</p>\n",
                "attachments": ["docs/b.png"],
                "relative_links": [],
            }])
        );
    }
}
