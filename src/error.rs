/// Error types for cluster provisioning
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across kindup
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure is fatal for the operation that raised it
#[derive(Debug, Error)]
pub enum Error {
    /// Override template file could not be opened or read
    #[error("error reading kind config template from {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Template text is not valid handlebars
    #[error("error parsing kind config template: {0}")]
    TemplateParse(#[source] Box<handlebars::TemplateError>),

    /// Template references data that is not provided
    #[error("could not render the {name} template: {source}")]
    TemplateExec {
        name: String,
        #[source]
        source: Box<handlebars::RenderError>,
    },

    /// External tool exited with a non-zero status
    #[error("{program} {} failed ({status}): {}", args.join(" "), stderr.trim())]
    ToolInvocation {
        program: String,
        args: Vec<String>,
        status: String,
        stderr: String,
    },

    /// External tool could not be started at all
    #[error("failed to execute {program}: {source}")]
    ToolSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Latest tool version could not be determined
    #[error("unable to determine the latest version of {tool}: {message}")]
    VersionLookup { tool: String, message: String },

    /// Tool binary could not be fetched or stored
    #[error("failed to download {tool} from {url}: {message}")]
    Download {
        tool: String,
        url: String,
        message: String,
    },

    /// Config or kube-config file could not be written
    #[error("error writing {}: {source}", path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Local network interfaces could not be listed
    #[error("could not get a list of network interfaces: {0}")]
    HostAddress(#[source] std::io::Error),

    /// No prebuilt binary exists for this host
    #[error("no {tool} binary is published for {os}/{arch}")]
    UnsupportedPlatform {
        tool: String,
        os: String,
        arch: String,
    },
}

impl Error {
    /// Create a file write error for the given path
    pub fn file_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }

    /// Create a version lookup error for the given tool
    pub fn version_lookup(tool: impl Into<String>, message: impl ToString) -> Self {
        Self::VersionLookup {
            tool: tool.into(),
            message: message.to_string(),
        }
    }

    /// Create a download error for the given tool and URL
    pub fn download(tool: impl Into<String>, url: impl Into<String>, message: impl ToString) -> Self {
        Self::Download {
            tool: tool.into(),
            url: url.into(),
            message: message.to_string(),
        }
    }
}
