//! HTML report rendering with minijinja

use std::path::{Path, PathBuf};

use chrono::Utc;
use log::debug;
use minijinja::{Environment, context, path_loader};

use super::RiskCount;
use super::sanitize::SanitizedAlert;

/// Template looked up by name in the template directory
pub const TEMPLATE_NAME: &str = "report.html.j2";

/// Copy of the template compiled into the binary
const EMBEDDED_TEMPLATE: &str = include_str!("../../templates/report.html.j2");

/// Where the template was loaded from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    Directory(PathBuf),
    Embedded,
}

/// Renders alerts into the HTML report
pub struct TemplateRenderer {
    env: Environment<'static>,
    source: TemplateSource,
}

impl TemplateRenderer {
    /// Pick the template location.
    ///
    /// An explicit directory always wins. Otherwise the directory holding the
    /// executable (and its `templates/` subdirectory) is searched, falling back
    /// to the embedded copy.
    pub fn discover(template_dir: Option<&Path>) -> Self {
        if let Some(dir) = template_dir {
            return Self::from_dir(dir);
        }

        install_dirs()
            .into_iter()
            .find(|dir| dir.join(TEMPLATE_NAME).is_file())
            .map(|dir| Self::from_dir(&dir))
            .unwrap_or_else(Self::embedded)
    }

    /// Load templates from `dir`
    pub fn from_dir(dir: &Path) -> Self {
        debug!("Loading report template from {}", dir.display());
        let mut env = Environment::new();
        env.set_loader(path_loader(dir));
        Self {
            env,
            source: TemplateSource::Directory(dir.to_path_buf()),
        }
    }

    /// Use the template compiled into the binary
    pub fn embedded() -> Self {
        let mut env = Environment::new();
        env.set_loader(|name| {
            Ok((name == TEMPLATE_NAME).then(|| EMBEDDED_TEMPLATE.to_string()))
        });
        Self {
            env,
            source: TemplateSource::Embedded,
        }
    }

    pub fn source(&self) -> &TemplateSource {
        &self.source
    }

    /// Render the report from sanitized alerts and their per-risk counts
    pub fn render(
        &self,
        alerts: &[SanitizedAlert],
        summary: &[RiskCount],
        target: &str,
    ) -> Result<String, minijinja::Error> {
        let template = self.env.get_template(TEMPLATE_NAME)?;
        template.render(context! {
            alerts => alerts,
            summary => summary,
            target => target,
            generated_at => Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            version => env!("CARGO_PKG_VERSION"),
        })
    }
}

/// The executable's directory and its `templates/` subdirectory
fn install_dirs() -> Vec<PathBuf> {
    let Some(dir) = std::env::current_exe()
        .and_then(|exe| exe.canonicalize())
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    else {
        return Vec::new();
    };

    vec![dir.join("templates"), dir]
}
