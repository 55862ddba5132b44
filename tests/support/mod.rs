use std::path::{Path, PathBuf};

use kubeprep::credentials::ClusterCredentials;

/// Template with no conditional blocks, so the expected output is easy to
/// write down. Unset fields show up as the empty string.
pub const FLAT_TEMPLATE: &str = "server: {{api_server}}
namespace: {{namespace}}
service-account: {{service_account}}
token: {{token}}
";

pub fn write_template(dir: &Path, name: &str, source: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, source).expect("failed to write template file");
    path
}

pub fn token_credentials() -> ClusterCredentials {
    ClusterCredentials::new("https://k8s.example:6443").with_token("tok123")
}
