//! The two-phase step contract and the kubeconfig step itself.
//!
//! An orchestrator drives each step through `prepare` and then `execute`.
//! `prepare` does all the checking and acquires whatever `execute` needs, so
//! a step that fails `prepare` has touched nothing an operator would have to
//! clean up.

use std::fs::File;
use std::path::PathBuf;

use tracing::debug;

use crate::credentials::{ClusterCredentials, CredentialsError};
use crate::template::ConfigTemplate;

/// A unit of pipeline work.
///
/// A step is single-use: `prepare` once, `execute` once, then discard it.
/// `prepare` must leave the step either fully ready to execute or holding no
/// resources at all. `execute` releases whatever `prepare` acquired before it
/// returns, on failure as well as on success.
pub trait Step {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Validate inputs and acquire the resources `execute` needs.
    fn prepare(&mut self) -> Result<(), StepError>;

    /// Perform the step's effect.
    fn execute(&mut self) -> Result<(), StepError>;
}

/// Drive a step through both phases in order, stopping at the first failure.
pub fn run(step: &mut dyn Step) -> Result<(), StepError> {
    debug!(step = step.name(), "preparing");
    step.prepare()?;
    debug!(step = step.name(), "executing");
    step.execute()
}

/// Why a step failed.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    /// The credential bundle cannot be used to deploy.
    #[error(transparent)]
    Credentials(#[from] CredentialsError),

    /// The kubeconfig template could not be read or parsed.
    #[error("could not load kubeconfig template {}: {}", .path.display(), .source)]
    TemplateLoad {
        path: PathBuf,
        source: handlebars::TemplateError,
    },

    /// The target file could not be created or truncated.
    #[error("could not open kubeconfig file {} for writing: {}", .path.display(), .source)]
    OpenTarget {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The template engine failed while writing the kubeconfig.
    #[error("could not render kubeconfig to {}: {}", .path.display(), .source)]
    Render {
        path: PathBuf,
        source: handlebars::RenderError,
    },

    /// `execute` was called without a successful `prepare`, or a phase was
    /// re-run on a spent step.
    #[error("step executed before a successful prepare")]
    NotPrepared,
}

/// Step that renders the kubeconfig downstream deploy steps read.
///
/// Holds raw inputs until `prepare`, which validates the credentials, parses
/// the template, and opens (creating or truncating) the target file. Between
/// a successful `prepare` and the end of `execute` the step owns the open
/// file handle; `execute` streams the render into it and closes it.
pub struct KubeConfigStep {
    credentials: Option<ClusterCredentials>,
    template_path: PathBuf,
    target_path: PathBuf,
    template: Option<ConfigTemplate>,
    target: Option<File>,
}

impl KubeConfigStep {
    /// Create a step from raw inputs. Nothing is checked here.
    pub fn new(
        credentials: ClusterCredentials,
        template_path: impl Into<PathBuf>,
        target_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            credentials: Some(credentials),
            template_path: template_path.into(),
            target_path: target_path.into(),
            template: None,
            target: None,
        }
    }
}

impl Step for KubeConfigStep {
    fn name(&self) -> &str {
        "kubeconfig"
    }

    fn prepare(&mut self) -> Result<(), StepError> {
        let raw = self.credentials.take().ok_or(StepError::NotPrepared)?;
        self.credentials = Some(raw.validated()?);

        debug!(path = %self.template_path.display(), "loading kubeconfig template");
        let template =
            ConfigTemplate::from_file(&self.template_path).map_err(|source| {
                StepError::TemplateLoad {
                    path: self.template_path.clone(),
                    source,
                }
            })?;

        // The probe only affects log wording; an unreadable path logs as
        // "creating" and the real error comes out of File::create.
        if tracing::enabled!(tracing::Level::DEBUG) {
            let verb = if self.target_path.exists() {
                "truncating"
            } else {
                "creating"
            };
            debug!(path = %self.target_path.display(), "{} kubeconfig file", verb);
        }
        let target = File::create(&self.target_path).map_err(|source| StepError::OpenTarget {
            path: self.target_path.clone(),
            source,
        })?;

        self.template = Some(template);
        self.target = Some(target);
        Ok(())
    }

    fn execute(&mut self) -> Result<(), StepError> {
        let template = self.template.as_ref().ok_or(StepError::NotPrepared)?;
        let credentials = self.credentials.as_ref().ok_or(StepError::NotPrepared)?;
        // Take ownership so the handle is closed on every path out.
        let target = self.target.take().ok_or(StepError::NotPrepared)?;

        debug!(path = %self.target_path.display(), "writing kubeconfig file");
        if let Err(source) = template.render_to(credentials, &target) {
            // A partial kubeconfig must not survive for downstream steps
            // to pick up.
            let _ = target.set_len(0);
            return Err(StepError::Render {
                path: self.target_path.clone(),
                source,
            });
        }
        Ok(())
    }
}
