mod support;

use anyhow::Result;
use kubeprep::credentials::{ClusterCredentials, CredentialsError};
use kubeprep::step::{KubeConfigStep, Step, StepError};
use tempfile::TempDir;

#[test]
fn missing_api_server_leaves_existing_target_untouched() -> Result<()> {
    let dir = TempDir::new()?;
    let template = support::write_template(dir.path(), "kubeconfig.hbs", support::FLAT_TEMPLATE);
    let target = dir.path().join("kubeconfig");
    std::fs::write(&target, "previous contents")?;

    let credentials = ClusterCredentials::new("").with_token("tok123");
    let mut step = KubeConfigStep::new(credentials, &template, &target);

    let err = step.prepare().unwrap_err();
    assert!(matches!(
        err,
        StepError::Credentials(CredentialsError::MissingApiServer)
    ));
    assert_eq!(std::fs::read_to_string(&target)?, "previous contents");
    Ok(())
}

#[test]
fn empty_bundle_reports_missing_credentials() -> Result<()> {
    let dir = TempDir::new()?;
    let template = support::write_template(dir.path(), "kubeconfig.hbs", support::FLAT_TEMPLATE);
    let target = dir.path().join("kubeconfig");

    let credentials = ClusterCredentials::new("https://k8s.example:6443");
    let mut step = KubeConfigStep::new(credentials, &template, &target);

    let err = step.prepare().unwrap_err();
    assert!(matches!(
        err,
        StepError::Credentials(CredentialsError::MissingCredentials)
    ));
    assert!(!target.exists());
    Ok(())
}

#[test]
fn half_a_certificate_pair_fails_prepare_even_with_a_token() -> Result<()> {
    let dir = TempDir::new()?;
    let template = support::write_template(dir.path(), "kubeconfig.hbs", support::FLAT_TEMPLATE);
    let target = dir.path().join("kubeconfig");

    let credentials = support::token_credentials().with_client_certificate("Q2VydA==");
    let mut step = KubeConfigStep::new(credentials, &template, &target);

    let err = step.prepare().unwrap_err();
    assert!(matches!(
        err,
        StepError::Credentials(CredentialsError::IncompleteClientCertPair)
    ));
    assert!(!target.exists());
    Ok(())
}

#[test]
fn missing_template_fails_prepare_without_creating_target() -> Result<()> {
    let dir = TempDir::new()?;
    let template = dir.path().join("missing.hbs");
    let target = dir.path().join("kubeconfig");

    let mut step = KubeConfigStep::new(support::token_credentials(), &template, &target);

    let err = step.prepare().unwrap_err();
    assert!(matches!(err, StepError::TemplateLoad { .. }));
    assert!(!target.exists());
    Ok(())
}

#[test]
fn template_load_error_names_the_path() -> Result<()> {
    let dir = TempDir::new()?;
    let template = dir.path().join("missing.hbs");
    let target = dir.path().join("kubeconfig");

    let mut step = KubeConfigStep::new(support::token_credentials(), &template, &target);

    let message = step.prepare().unwrap_err().to_string();
    assert!(message.contains("could not load kubeconfig template"));
    assert!(message.contains("missing.hbs"));
    Ok(())
}

#[test]
fn unparseable_template_fails_prepare() -> Result<()> {
    let dir = TempDir::new()?;
    let template =
        support::write_template(dir.path(), "broken.hbs", "server: {{#if token}}never closed");
    let target = dir.path().join("kubeconfig");

    let mut step = KubeConfigStep::new(support::token_credentials(), &template, &target);

    let err = step.prepare().unwrap_err();
    assert!(matches!(err, StepError::TemplateLoad { .. }));
    assert!(!target.exists());
    Ok(())
}

#[test]
fn unwritable_target_fails_prepare() -> Result<()> {
    let dir = TempDir::new()?;
    let template = support::write_template(dir.path(), "kubeconfig.hbs", support::FLAT_TEMPLATE);
    // A target whose parent directory does not exist.
    let target = dir.path().join("no-such-dir").join("kubeconfig");

    let mut step = KubeConfigStep::new(support::token_credentials(), &template, &target);

    let err = step.prepare().unwrap_err();
    assert!(matches!(err, StepError::OpenTarget { .. }));
    Ok(())
}
