//! Kubeconfig template loading and rendering.
//!
//! The template is ordinary handlebars text and every credential field is
//! addressable by its snake_case name. Strict mode is on, so a template that
//! references a field that does not exist fails the render instead of
//! silently producing an empty value.

use std::io::Write;
use std::path::Path;

use handlebars::Handlebars;
use secrecy::ExposeSecret;
use serde::Serialize;

use crate::credentials::ClusterCredentials;

/// Registry name for the single template each step carries.
const TEMPLATE_NAME: &str = "kubeconfig";

/// Stock kubeconfig template, embedded for pipelines that do not mount their
/// own. `kubeprep template` prints it.
pub const STOCK_TEMPLATE: &str = include_str!("../assets/kubeconfig.hbs");

/// A parsed kubeconfig template, ready to render.
pub struct ConfigTemplate {
    registry: Handlebars<'static>,
}

impl ConfigTemplate {
    /// Read and parse the template file at `path`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, handlebars::TemplateError> {
        let mut registry = strict_registry();
        registry.register_template_file(TEMPLATE_NAME, path)?;
        Ok(Self { registry })
    }

    /// Parse a template held in memory, such as [`STOCK_TEMPLATE`].
    pub fn from_string(source: &str) -> Result<Self, handlebars::TemplateError> {
        let mut registry = strict_registry();
        registry.register_template_string(TEMPLATE_NAME, source)?;
        Ok(Self { registry })
    }

    /// Render the template for `credentials` into `writer`.
    ///
    /// Writer errors surface through the engine's `RenderError`.
    pub fn render_to<W: Write>(
        &self,
        credentials: &ClusterCredentials,
        writer: W,
    ) -> Result<(), handlebars::RenderError> {
        let context = RenderContext::new(credentials);
        self.registry
            .render_to_write(TEMPLATE_NAME, &context, writer)
    }
}

fn strict_registry() -> Handlebars<'static> {
    let mut registry = Handlebars::new();
    registry.set_strict_mode(true);
    // The output is YAML; HTML escaping would mangle tokens and
    // certificate blobs.
    registry.register_escape_fn(handlebars::no_escape);
    registry
}

/// Field-by-field view of a credential bundle as the template sees it.
///
/// Secrets are exposed here, at the last moment before they land in the
/// rendered file. Unset fields render as empty strings.
#[derive(Serialize)]
struct RenderContext<'a> {
    api_server: &'a str,
    namespace: &'a str,
    service_account: &'a str,
    token: &'a str,
    client_certificate: &'a str,
    client_key: &'a str,
    certificate_authority: &'a str,
    skip_tls_verify: bool,
}

impl<'a> RenderContext<'a> {
    fn new(credentials: &'a ClusterCredentials) -> Self {
        Self {
            api_server: &credentials.api_server,
            namespace: credentials.namespace.as_deref().unwrap_or(""),
            service_account: credentials.service_account.as_deref().unwrap_or(""),
            token: credentials
                .token
                .as_ref()
                .map(|token| token.expose_secret())
                .unwrap_or(""),
            client_certificate: credentials.client_certificate.as_deref().unwrap_or(""),
            client_key: credentials
                .client_key
                .as_ref()
                .map(|key| key.expose_secret())
                .unwrap_or(""),
            certificate_authority: credentials.certificate_authority.as_deref().unwrap_or(""),
            skip_tls_verify: credentials.skip_tls_verify,
        }
    }
}
