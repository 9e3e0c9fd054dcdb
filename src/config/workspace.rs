use serde::{Deserialize, Serialize};

/// What every user container is built from and where the IDE looks inside it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkspaceConfig {
    /// Image pulled and instantiated by `POST /docker/create-container`.
    /// TOML: `workspace.image`. Default: `javierhersan/code-ai`.
    #[serde(default = "default_image")]
    pub image: String,

    /// Directory exposed to the file browser.
    /// TOML: `workspace.root`. Default: `/app`.
    #[serde(default = "default_root")]
    pub root: String,

    /// Shell started for web terminal sessions.
    /// TOML: `workspace.shell`. Default: `/bin/sh`.
    #[serde(default = "default_shell")]
    pub shell: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            image: default_image(),
            root: default_root(),
            shell: default_shell(),
        }
    }
}

fn default_image() -> String {
    "javierhersan/code-ai".to_string()
}

fn default_root() -> String {
    "/app".to_string()
}

fn default_shell() -> String {
    "/bin/sh".to_string()
}
