use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kubeprep::credentials::ClusterCredentials;
use kubeprep::step::{self, KubeConfigStep};
use kubeprep::template::STOCK_TEMPLATE;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kubeprep")]
#[command(about = "Renders the kubeconfig a deployment pipeline needs to reach its cluster")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_COMMIT_HASH"), ")"))]
struct Cli {
    /// Log progress details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate cluster credentials and write the kubeconfig file
    Run(RunArgs),
    /// Print the stock kubeconfig template
    Template {
        /// Write the template to this path instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

/// Credential flags mirror the environment a pipeline runner injects; an
/// empty value counts as unset.
#[derive(clap::Args)]
struct RunArgs {
    /// Cluster API server address
    #[arg(long, env = "KUBE_API_SERVER", default_value = "", hide_default_value = true)]
    api_server: String,

    /// Namespace the deployment targets
    #[arg(long, env = "KUBE_NAMESPACE", default_value = "", hide_default_value = true)]
    namespace: String,

    /// Service account to authenticate as
    #[arg(long, env = "KUBE_SERVICE_ACCOUNT", default_value = "", hide_default_value = true)]
    service_account: String,

    /// Bearer token
    #[arg(long, env = "KUBE_TOKEN", default_value = "", hide_default_value = true)]
    token: String,

    /// Client certificate data
    #[arg(
        long,
        env = "KUBE_CLIENT_CERTIFICATE",
        default_value = "",
        hide_default_value = true
    )]
    client_certificate: String,

    /// Client key data
    #[arg(long, env = "KUBE_CLIENT_KEY", default_value = "", hide_default_value = true)]
    client_key: String,

    /// Certificate authority data for verifying the API server
    #[arg(
        long,
        env = "KUBE_CERTIFICATE_AUTHORITY",
        default_value = "",
        hide_default_value = true
    )]
    certificate_authority: String,

    /// Skip TLS certificate verification when talking to the API server
    #[arg(long, env = "KUBE_SKIP_TLS_VERIFY")]
    skip_tls_verify: bool,

    /// Path to the kubeconfig template (see `kubeprep template`)
    #[arg(long, env = "KUBE_TEMPLATE")]
    template: PathBuf,

    /// Where to write the rendered kubeconfig
    #[arg(long, env = "KUBECONFIG")]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Run(args) => render_kubeconfig(args),
        Command::Template { out } => write_stock_template(out),
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "kubeprep=debug"
    } else {
        "kubeprep=info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn render_kubeconfig(args: RunArgs) -> Result<()> {
    let output = match args.output {
        Some(path) => path,
        None => default_kubeconfig_path()?,
    };

    let credentials = ClusterCredentials::new(args.api_server)
        .with_namespace(args.namespace)
        .with_service_account(args.service_account)
        .with_token(args.token)
        .with_client_certificate(args.client_certificate)
        .with_client_key(args.client_key)
        .with_certificate_authority(args.certificate_authority)
        .with_skip_tls_verify(args.skip_tls_verify);

    let mut init = KubeConfigStep::new(credentials, args.template, &output);
    step::run(&mut init)?;

    info!(path = %output.display(), "kubeconfig ready");
    Ok(())
}

fn default_kubeconfig_path() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .context("could not determine a home directory for the default kubeconfig path")?;
    Ok(home.join(".kube").join("config"))
}

fn write_stock_template(out: Option<PathBuf>) -> Result<()> {
    match out {
        Some(path) => {
            std::fs::write(&path, STOCK_TEMPLATE)
                .with_context(|| format!("Failed to write template to {}", path.display()))?;
            println!("wrote kubeconfig template to {}", path.display());
        }
        None => print!("{STOCK_TEMPLATE}"),
    }
    Ok(())
}
