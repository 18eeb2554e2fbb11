use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigMissingFile,
    ConfigMissingKey,
    ConfigInvalidYaml,

    ValidationInvalidArgument,

    HostInvalid,
    SshIdentityFileNotFound,

    RemoteCommandFailed,

    GitCommandFailed,
    ProvisionFailed,

    DockerBuildFailed,
    DockerPushFailed,
    DockerPullFailed,

    InternalIoError,
    InternalJsonError,
    InternalUnexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigMissingFile => "config.missing_file",
            ErrorCode::ConfigMissingKey => "config.missing_key",
            ErrorCode::ConfigInvalidYaml => "config.invalid_yaml",

            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",

            ErrorCode::HostInvalid => "host.invalid",
            ErrorCode::SshIdentityFileNotFound => "ssh.identity_file_not_found",

            ErrorCode::RemoteCommandFailed => "remote.command_failed",

            ErrorCode::GitCommandFailed => "git.command_failed",
            ErrorCode::ProvisionFailed => "provision.failed",

            ErrorCode::DockerBuildFailed => "docker.build_failed",
            ErrorCode::DockerPushFailed => "docker.push_failed",
            ErrorCode::DockerPullFailed => "docker.pull_failed",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMissingKeyDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidYamlDetails {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidArgumentDetails {
    pub field: String,
    pub problem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tried: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SshIdentityFileNotFoundDetails {
    pub host: String,
    pub identity_file: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCommandFailedDetails {
    pub command: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub host: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalIoErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
    pub retryable: Option<bool>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
            retryable: None,
        }
    }

    pub fn config_missing_file(path: impl Into<String>) -> Self {
        let path = path.into();
        Self::new(
            ErrorCode::ConfigMissingFile,
            format!("Settings file '{}' not found", path),
            serde_json::json!({ "path": path }),
        )
        .with_hint("Create a dockhand.yml in the directory you run dockhand from")
    }

    pub fn config_missing_key(key: impl Into<String>, path: Option<String>) -> Self {
        let details = serde_json::to_value(ConfigMissingKeyDetails {
            key: key.into(),
            path,
        })
        .unwrap_or_else(|_| Value::Object(serde_json::Map::new()));

        Self::new(
            ErrorCode::ConfigMissingKey,
            "Missing required configuration key",
            details,
        )
    }

    pub fn config_invalid_yaml(path: impl Into<String>, error: impl Into<String>) -> Self {
        let details = serde_json::to_value(ConfigInvalidYamlDetails {
            path: path.into(),
            error: error.into(),
        })
        .unwrap_or_else(|_| Value::Object(serde_json::Map::new()));

        Self::new(
            ErrorCode::ConfigInvalidYaml,
            "Invalid YAML in settings file",
            details,
        )
    }

    pub fn validation_invalid_argument(
        field: impl Into<String>,
        problem: impl Into<String>,
        tried: Option<Vec<String>>,
    ) -> Self {
        let details = serde_json::to_value(InvalidArgumentDetails {
            field: field.into(),
            problem: problem.into(),
            tried,
        })
        .unwrap_or_else(|_| Value::Object(serde_json::Map::new()));

        Self::new(
            ErrorCode::ValidationInvalidArgument,
            "Invalid argument",
            details,
        )
    }

    pub fn host_invalid(spec: impl Into<String>, problem: impl Into<String>) -> Self {
        let spec = spec.into();
        Self::new(
            ErrorCode::HostInvalid,
            format!("Invalid host '{}'", spec),
            serde_json::json!({ "host": spec, "problem": problem.into() }),
        )
        .with_hint("Host targets use the form user@host or user@host:port")
    }

    pub fn ssh_identity_file_not_found(
        host: impl Into<String>,
        identity_file: impl Into<String>,
    ) -> Self {
        let details = serde_json::to_value(SshIdentityFileNotFoundDetails {
            host: host.into(),
            identity_file: identity_file.into(),
        })
        .unwrap_or_else(|_| Value::Object(serde_json::Map::new()));

        Self::new(
            ErrorCode::SshIdentityFileNotFound,
            "SSH identity file not found",
            details,
        )
    }

    pub fn remote_command_failed(details: RemoteCommandFailedDetails) -> Self {
        let details =
            serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()));

        Self::new(
            ErrorCode::RemoteCommandFailed,
            "Remote command failed",
            details,
        )
    }

    pub fn git_command_failed(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::GitCommandFailed,
            message,
            Value::Object(serde_json::Map::new()),
        )
    }

    pub fn provision_failed(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ProvisionFailed,
            message,
            Value::Object(serde_json::Map::new()),
        )
    }

    pub fn docker_build_failed(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::DockerBuildFailed,
            message,
            Value::Object(serde_json::Map::new()),
        )
    }

    pub fn docker_push_failed(image: impl Into<String>) -> Self {
        let image = image.into();
        Self::new(
            ErrorCode::DockerPushFailed,
            format!("Failed to push '{}' to the registry", image),
            serde_json::json!({ "image": image }),
        )
        .with_hint("Check registry credentials with 'docker login'")
    }

    pub fn docker_pull_failed(image: impl Into<String>, host: impl Into<String>) -> Self {
        let image = image.into();
        let host = host.into();
        Self::new(
            ErrorCode::DockerPullFailed,
            format!("Failed to pull '{}' on '{}'", image, host),
            serde_json::json!({ "image": image, "host": host }),
        )
        .with_hint("Check registry credentials with 'docker login' on the target host")
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        let details = serde_json::to_value(InternalIoErrorDetails {
            error: error.into(),
            context,
        })
        .unwrap_or_else(|_| Value::Object(serde_json::Map::new()));

        Self::new(ErrorCode::InternalIoError, "IO error", details)
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        Self::new(
            ErrorCode::InternalJsonError,
            "JSON error",
            serde_json::json!({ "error": error.into(), "context": context }),
        )
    }

    pub fn internal_unexpected(error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InternalUnexpected,
            "Unexpected error",
            serde_json::json!({ "error": error.into() }),
        )
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }

    pub fn retryable(mut self, retryable: bool) -> Self {
        self.retryable = Some(retryable);
        self
    }
}
