use crate::probe::{self, RuntimeInfo};
use crate::runtime::cli::CliRuntime;

/// Settings for one invocation, resolved once from the command line.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Selected runtime, if any was found
    pub runtime: Option<RuntimeInfo>,

    /// All runtimes found on `PATH`
    pub detected: Vec<RuntimeInfo>,

    /// JSON destination (`-` for stdout)
    pub json: Option<String>,

    /// Draw progress bars on stderr
    pub progress: bool,

    /// Resolve missing parent pointers through image history
    pub history_parents: bool,
}

impl AppConfig {
    pub fn from_cli(
        runtime: Option<&str>,
        json: Option<String>,
        no_progress: bool,
        history_parents: bool,
    ) -> Self {
        let detected = probe::detect();
        let runtime = probe::select(runtime, &detected);
        let progress = !no_progress && json.as_deref() != Some("-");
        Self {
            runtime,
            detected,
            json,
            progress,
            history_parents,
        }
    }

    /// Build a CLI-backed runtime for the selected binary.
    pub fn cli_runtime(&self) -> Option<CliRuntime> {
        self.runtime
            .as_ref()
            .map(|rt| CliRuntime::new(rt.binary_path.display().to_string(), rt.kind))
    }
}
