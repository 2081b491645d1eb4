/// Installs kubectl and kind into a local bin directory when missing
use std::path::{Path, PathBuf};

use reqwest::Client;
use tracing::{debug, info};
use url::Url;

use super::platform::Platform;
use crate::error::{Error, Result};

/// Where kubectl versions and binaries are published
pub const KUBECTL_RELEASE_BASE: &str = "https://storage.googleapis.com/kubernetes-release/release/";

/// Where kind binaries are published
pub const KIND_RELEASE_BASE: &str = "https://kind.sigs.k8s.io/dl/";

/// Pinned kind release
pub const DEFAULT_KIND_VERSION: &str = "v0.20.0";

/// A CLI dependency kindup can install on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Kubectl,
    Kind,
}

impl Tool {
    /// Name of the executable on PATH
    pub fn name(&self) -> &'static str {
        match self {
            Tool::Kubectl => "kubectl",
            Tool::Kind => "kind",
        }
    }
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Tool installer
#[derive(Clone)]
pub struct ToolInstaller {
    client: Client,
    bin_dir: PathBuf,
    kubectl_release_base: String,
    kind_release_base: String,
    kind_version: String,
}

impl ToolInstaller {
    /// Create an installer writing into `bin_dir`
    pub fn new(bin_dir: PathBuf) -> Self {
        Self {
            client: Client::new(),
            bin_dir,
            kubectl_release_base: KUBECTL_RELEASE_BASE.to_string(),
            kind_release_base: KIND_RELEASE_BASE.to_string(),
            kind_version: DEFAULT_KIND_VERSION.to_string(),
        }
    }

    /// Point kubectl lookups at another release mirror
    #[allow(dead_code)]
    pub fn with_kubectl_release_base(mut self, base: &str) -> Self {
        self.kubectl_release_base = with_trailing_slash(base);
        self
    }

    /// Point kind downloads at another release mirror
    #[allow(dead_code)]
    pub fn with_kind_release_base(mut self, base: &str) -> Self {
        self.kind_release_base = with_trailing_slash(base);
        self
    }

    pub fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }

    /// Make sure `tool` is available, returning the path to run it from
    pub async fn ensure_installed(&self, tool: Tool) -> Result<PathBuf> {
        if let Some(path) = self.locate(tool) {
            debug!("{} found at {}", tool, path.display());
            return Ok(path);
        }

        info!("{} not found, installing into {}", tool, self.bin_dir.display());
        self.install(tool).await
    }

    /// Find `tool` on PATH or in the bin directory
    pub fn locate(&self, tool: Tool) -> Option<PathBuf> {
        if let Ok(path) = which::which(tool.name()) {
            return Some(path);
        }

        let suffix = Platform::current(tool.name())
            .map(|p| p.exe_suffix())
            .unwrap_or("");
        let local = self.bin_dir.join(format!("{}{}", tool.name(), suffix));
        local.is_file().then_some(local)
    }

    /// Resolve the version and download `tool` unconditionally
    pub async fn install(&self, tool: Tool) -> Result<PathBuf> {
        let version = self.resolve_version(tool).await?;
        let platform = Platform::current(tool.name())?;
        self.download(tool, &version, platform).await
    }

    /// Version of `tool` to install
    pub async fn resolve_version(&self, tool: Tool) -> Result<String> {
        match tool {
            Tool::Kind => Ok(self.kind_version.clone()),
            Tool::Kubectl => self.latest_kubectl_version().await,
        }
    }

    async fn latest_kubectl_version(&self) -> Result<String> {
        let url = Url::parse(&self.kubectl_release_base)
            .and_then(|base| base.join("stable.txt"))
            .map_err(|e| Error::version_lookup("kubectl", e))?;
        debug!("GET {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::version_lookup("kubectl", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::version_lookup(
                "kubectl",
                format!("GET {} ({})", url, status),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::version_lookup("kubectl", format!("error reading response from {}: {}", url, e)))?;

        let version = body.trim();
        if version.is_empty() {
            return Err(Error::version_lookup(
                "kubectl",
                format!("empty response from {}", url),
            ));
        }

        Ok(version.to_string())
    }

    /// Release URL of `tool` at `version` for `platform`
    pub fn download_url(&self, tool: Tool, version: &str, platform: Platform) -> Result<Url> {
        let (base, path) = match tool {
            Tool::Kubectl => (
                &self.kubectl_release_base,
                format!(
                    "{}/bin/{}/{}/kubectl{}",
                    version,
                    platform.os,
                    platform.arch,
                    platform.exe_suffix()
                ),
            ),
            Tool::Kind => (
                &self.kind_release_base,
                format!("{}/kind-{}-{}", version, platform.os, platform.arch),
            ),
        };

        Url::parse(base)
            .and_then(|base| base.join(&path))
            .map_err(|e| Error::download(tool.name(), format!("{}{}", base, path), e))
    }

    /// Fetch `tool` into the bin directory
    pub async fn download(&self, tool: Tool, version: &str, platform: Platform) -> Result<PathBuf> {
        let url = self.download_url(tool, version, platform)?;
        info!("Downloading {} {} from {}", tool, version, url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::download(tool.name(), url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::download(
                tool.name(),
                url.as_str(),
                format!("HTTP {}", status),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::download(tool.name(), url.as_str(), e))?;

        tokio::fs::create_dir_all(&self.bin_dir)
            .await
            .map_err(|e| Error::file_write(&self.bin_dir, e))?;

        let file_name = format!("{}{}", tool.name(), platform.exe_suffix());
        let dest = self.bin_dir.join(&file_name);
        // Staged next to dest so a partial download is never picked up by `locate`
        let staged = self.bin_dir.join(format!(".{}.download", file_name));

        if let Err(e) = place_binary(&staged, &dest, &bytes).await {
            let _ = tokio::fs::remove_file(&staged).await;
            return Err(e);
        }

        info!("Installed {} {} at {}", tool, version, dest.display());
        Ok(dest)
    }
}

fn with_trailing_slash(base: &str) -> String {
    if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{}/", base)
    }
}

async fn place_binary(staged: &Path, dest: &Path, bytes: &[u8]) -> Result<()> {
    tokio::fs::write(staged, bytes)
        .await
        .map_err(|e| Error::file_write(staged, e))?;
    make_executable(staged).await?;
    tokio::fs::rename(staged, dest)
        .await
        .map_err(|e| Error::file_write(dest, e))
}

#[cfg(unix)]
async fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .await
        .map_err(|e| Error::file_write(path, e))
}

#[cfg(not(unix))]
async fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LINUX_AMD64: Platform = Platform {
        os: "linux",
        arch: "amd64",
    };

    fn installer(server: &MockServer, bin_dir: &Path) -> ToolInstaller {
        ToolInstaller::new(bin_dir.to_path_buf())
            .with_kubectl_release_base(&format!("{}/release", server.uri()))
            .with_kind_release_base(&format!("{}/dl", server.uri()))
    }

    #[test]
    fn test_download_urls() {
        let installer = ToolInstaller::new(PathBuf::from("/tmp/bin"));

        let kubectl = installer
            .download_url(Tool::Kubectl, "v1.30.0", LINUX_AMD64)
            .unwrap();
        assert_eq!(
            kubectl.as_str(),
            "https://storage.googleapis.com/kubernetes-release/release/v1.30.0/bin/linux/amd64/kubectl"
        );

        let kind = installer
            .download_url(Tool::Kind, DEFAULT_KIND_VERSION, LINUX_AMD64)
            .unwrap();
        assert_eq!(
            kind.as_str(),
            "https://kind.sigs.k8s.io/dl/v0.20.0/kind-linux-amd64"
        );

        let windows = Platform {
            os: "windows",
            arch: "amd64",
        };
        let kubectl = installer
            .download_url(Tool::Kubectl, "v1.30.0", windows)
            .unwrap();
        assert!(kubectl.as_str().ends_with("/windows/amd64/kubectl.exe"));
    }

    #[tokio::test]
    async fn test_kubectl_version_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/release/stable.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("v1.30.2\n"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let version = installer(&server, dir.path())
            .resolve_version(Tool::Kubectl)
            .await
            .unwrap();

        assert_eq!(version, "v1.30.2");
    }

    #[tokio::test]
    async fn test_kubectl_version_lookup_non_2xx() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/release/stable.txt"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let err = installer(&server, dir.path())
            .resolve_version(Tool::Kubectl)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::VersionLookup { .. }));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_kind_version_is_pinned() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        let version = installer(&server, dir.path())
            .resolve_version(Tool::Kind)
            .await
            .unwrap();
        assert_eq!(version, DEFAULT_KIND_VERSION);
    }

    #[tokio::test]
    async fn test_download_writes_executable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/release/v1.30.2/bin/linux/amd64/kubectl"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"#!/bin/sh\necho ok\n".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let bin_dir = dir.path().join("bin");
        let dest = installer(&server, &bin_dir)
            .download(Tool::Kubectl, "v1.30.2", LINUX_AMD64)
            .await
            .unwrap();

        assert_eq!(dest, bin_dir.join("kubectl"));
        assert_eq!(std::fs::read(&dest).unwrap(), b"#!/bin/sh\necho ok\n");
        assert!(!bin_dir.join(".kubectl.download").exists());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&dest).unwrap().permissions().mode();
            assert_eq!(mode & 0o111, 0o111);
        }
    }

    #[tokio::test]
    async fn test_download_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dl/v0.20.0/kind-linux-amd64"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let err = installer(&server, dir.path())
            .download(Tool::Kind, DEFAULT_KIND_VERSION, LINUX_AMD64)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Download { .. }));
        assert!(!dir.path().join("kind").exists());
    }

    #[tokio::test]
    async fn test_failed_install_leaves_no_partial_binary() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dl/v0.20.0/kind-linux-amd64"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"kind".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let bin_dir = dir.path().join("bin");
        std::fs::create_dir(&bin_dir).unwrap();
        // a directory in the way makes the final rename fail
        std::fs::create_dir(bin_dir.join("kind")).unwrap();
        std::fs::write(bin_dir.join("kind").join("keep"), "").unwrap();

        let err = installer(&server, &bin_dir)
            .download(Tool::Kind, DEFAULT_KIND_VERSION, LINUX_AMD64)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::FileWrite { .. }));
        assert!(!bin_dir.join("kind").is_file());
        assert!(!bin_dir.join(".kind.download").exists());
    }

    #[test]
    fn test_locate_in_bin_dir() {
        let dir = tempfile::tempdir().unwrap();
        let installer = ToolInstaller::new(dir.path().to_path_buf());

        // Only meaningful where kind is not already on PATH
        if which::which("kind").is_err() {
            assert!(installer.locate(Tool::Kind).is_none());
            std::fs::write(dir.path().join("kind"), "").unwrap();
            assert_eq!(installer.locate(Tool::Kind), Some(dir.path().join("kind")));
        }
    }
}
