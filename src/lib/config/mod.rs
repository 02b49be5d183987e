use std::{fmt, time::Duration};

use clap::Parser;

use crate::lib::{
    command::types::ToolCommand,
    sync::types::{Credentials, SyncTools},
};

/// Local development origins that may always call the API from a browser.
pub const DEV_ORIGINS: [&str; 4] = [
    "http://localhost:5173",
    "http://localhost:3000",
    "http://127.0.0.1:5173",
    "http://127.0.0.1:3000",
];

/// Process settings, from flags or the environment.
#[derive(Parser, Clone)]
#[command(
    name = "image-sync",
    version,
    about = "Copy multi-platform images from a public registry into a private one"
)]
pub struct Settings {
    #[arg(long, env = "APP_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "APP_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Default target registry reported to clients.
    #[arg(long, env = "HARBOR_REGISTRY")]
    pub harbor_registry: Option<String>,

    #[arg(long, env = "HARBOR_USERNAME")]
    pub harbor_username: Option<String>,

    #[arg(long, env = "HARBOR_PASSWORD", hide_env_values = true)]
    pub harbor_password: Option<String>,

    /// Container engine invocation, e.g. `docker` or `sudo docker`.
    #[arg(long, env = "DOCKER_COMMAND", default_value = "docker")]
    pub docker_command: ToolCommand,

    #[arg(long, env = "SKOPEO_COMMAND", default_value = "skopeo")]
    pub skopeo_command: ToolCommand,

    /// Upper bound on each tool availability probe.
    #[arg(long, env = "PROBE_TIMEOUT_SECS", default_value_t = 10)]
    pub probe_timeout_secs: u64,

    /// Browser origin of the web frontend, allowed by CORS.
    #[arg(
        long,
        env = "FRONTEND_URL",
        default_value = "http://localhost:5173"
    )]
    pub frontend_url: String,
}

impl Settings {
    pub fn tools(&self) -> SyncTools {
        SyncTools {
            docker: self.docker_command.clone(),
            skopeo: self.skopeo_command.clone(),
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// The frontend origin followed by the local development origins.
    pub fn allowed_origins(&self) -> Vec<String> {
        let frontend = self.frontend_url.trim_end_matches('/').to_string();
        let mut origins = vec![frontend];
        for origin in DEV_ORIGINS {
            if !origins.iter().any(|known| known == origin) {
                origins.push(origin.to_string());
            }
        }
        origins
    }

    /// Credentials from the environment, only when both halves are present.
    pub fn default_credentials(&self) -> Option<Credentials> {
        match (&self.harbor_username, &self.harbor_password) {
            (Some(username), Some(password)) => Some(Credentials::new(username, password)),
            _ => None,
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("harbor_registry", &self.harbor_registry)
            .field("harbor_username", &self.harbor_username)
            .field(
                "harbor_password",
                &self.harbor_password.as_ref().map(|_| "***"),
            )
            .field("docker_command", &self.docker_command)
            .field("skopeo_command", &self.skopeo_command)
            .field("probe_timeout_secs", &self.probe_timeout_secs)
            .field("frontend_url", &self.frontend_url)
            .finish()
    }
}
