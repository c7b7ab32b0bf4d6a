//! PDF rendering of the patched report.

use crate::metadata::PatientInfoMap;
use crate::{ReportError, ReportResult};
use handlebars::Handlebars;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Turns patched markup plus metadata into a PDF at `output`.
///
/// Implementations must not leave a partial file at `output` on failure.
pub trait Renderer {
    fn render(&self, html: &str, info: &PatientInfoMap, output: &Path) -> ReportResult<()>;
}

/// Fill `{{NHS}}`-style placeholders from `info`.
///
/// Unknown placeholders are an error rather than silently blank.
pub fn fill_placeholders(html: &str, info: &PatientInfoMap) -> ReportResult<String> {
    let mut registry = Handlebars::new();
    registry.set_strict_mode(true);
    registry
        .render_template(html, info)
        .map_err(|e| ReportError::Template(e.to_string()))
}

/// Renders through an external `wkhtmltopdf` executable.
#[derive(Clone, Debug)]
pub struct WkhtmltopdfRenderer {
    executable: PathBuf,
}

impl WkhtmltopdfRenderer {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    fn arguments(source: &Path, target: &Path) -> Vec<String> {
        vec![
            "--footer-right".into(),
            "Page [page] of [toPage]".into(),
            "--footer-left".into(),
            "Date Created [isodate]".into(),
            "--quiet".into(),
            source.display().to_string(),
            target.display().to_string(),
        ]
    }
}

impl Renderer for WkhtmltopdfRenderer {
    fn render(&self, html: &str, info: &PatientInfoMap, output: &Path) -> ReportResult<()> {
        let filled = fill_placeholders(html, info)?;
        let dir = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut source = tempfile::Builder::new()
            .prefix(".render-")
            .suffix(".html")
            .tempfile_in(dir)
            .map_err(ReportError::FileWrite)?;
        source
            .write_all(filled.as_bytes())
            .and_then(|_| source.flush())
            .map_err(ReportError::FileWrite)?;
        let target = tempfile::Builder::new()
            .prefix(".render-")
            .suffix(".pdf")
            .tempfile_in(dir)
            .map_err(ReportError::FileWrite)?;

        tracing::debug!("running {} for {}", self.executable.display(), output.display());
        let result = Command::new(&self.executable)
            .args(Self::arguments(source.path(), target.path()))
            .stdin(Stdio::null())
            .output()
            .map_err(ReportError::RendererLaunch)?;

        if !result.status.success() {
            return Err(ReportError::RendererFailed {
                status: result.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        target
            .persist(output)
            .map_err(|e| ReportError::FileWrite(e.error))?;
        tracing::info!("wrote PDF report {}", output.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::tests::sample_info;
    use tempfile::TempDir;

    #[test]
    fn test_fill_placeholders() {
        let html = "<td>{{NHS}}</td><td>{{firstname}} {{lastname}}</td><td>{{copies}}</td>";
        let filled = fill_placeholders(html, &sample_info(None)).unwrap();
        assert_eq!(filled, "<td>9434765919</td><td>Jane Doe</td><td></td>");
    }

    #[test]
    fn test_fill_placeholders_escapes_values() {
        let filled = fill_placeholders("{{clinician_add}}", &sample_info(None)).unwrap();
        assert_eq!(filled, "Clinical Genetics, Guy&#x27;s Hospital");
    }

    #[test]
    fn test_fill_placeholders_rejects_unknown_name() {
        let result = fill_placeholders("{{postcode}}", &sample_info(None));
        assert!(matches!(result, Err(ReportError::Template(_))));
    }

    #[test]
    fn test_arguments_carry_footer() {
        let args = WkhtmltopdfRenderer::arguments(Path::new("in.html"), Path::new("out.pdf"));
        assert_eq!(
            args,
            vec![
                "--footer-right",
                "Page [page] of [toPage]",
                "--footer-left",
                "Date Created [isodate]",
                "--quiet",
                "in.html",
                "out.pdf"
            ]
        );
    }

    #[test]
    fn test_missing_executable_is_launch_error() {
        let dir = TempDir::new().unwrap();
        let renderer = WkhtmltopdfRenderer::new(dir.path().join("no-such-wkhtmltopdf"));
        let output = dir.path().join("report.pdf");
        let result = renderer.render("<p>x</p>", &sample_info(None), &output);
        assert!(matches!(result, Err(ReportError::RendererLaunch(_))));
        assert!(!output.exists());
    }

    #[cfg(unix)]
    fn script(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("fake-wkhtmltopdf");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_render_leaves_no_output() {
        let dir = TempDir::new().unwrap();
        let renderer = WkhtmltopdfRenderer::new(script(dir.path(), "echo broken >&2; exit 3"));
        let output = dir.path().join("report.pdf");
        match renderer.render("<p>x</p>", &sample_info(None), &output) {
            Err(ReportError::RendererFailed { status, stderr }) => {
                assert_eq!(status, 3);
                assert_eq!(stderr, "broken");
            }
            other => panic!("expected RendererFailed, got {other:?}"),
        }
        assert!(!output.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_successful_render_moves_pdf_into_place() {
        let dir = TempDir::new().unwrap();
        let renderer = WkhtmltopdfRenderer::new(script(
            dir.path(),
            "for last; do :; done\ncat \"$6\" > \"$last\"",
        ));
        let output = dir.path().join("report.pdf");
        renderer
            .render("<p>{{NHS}}</p>", &sample_info(None), &output)
            .unwrap();
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "<p>9434765919</p>");
    }
}
