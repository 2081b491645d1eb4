/// Host platform naming as used by kubectl and kind release artifacts
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub os: &'static str,
    pub arch: &'static str,
}

impl Platform {
    /// Platform of the running binary
    pub fn current(tool: &str) -> Result<Self> {
        Self::from_rust(tool, std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Map Rust target names onto release naming
    pub fn from_rust(tool: &str, os: &str, arch: &str) -> Result<Self> {
        let unsupported = || Error::UnsupportedPlatform {
            tool: tool.to_string(),
            os: os.to_string(),
            arch: arch.to_string(),
        };

        let os = match os {
            "linux" => "linux",
            "macos" => "darwin",
            "windows" => "windows",
            _ => return Err(unsupported()),
        };
        let arch = match arch {
            "x86_64" => "amd64",
            "aarch64" => "arm64",
            _ => return Err(unsupported()),
        };

        Ok(Self { os, arch })
    }

    /// Executable suffix on this platform
    pub fn exe_suffix(&self) -> &'static str {
        if self.os == "windows" {
            ".exe"
        } else {
            ""
        }
    }
}
