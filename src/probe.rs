use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Container runtimes with a docker-compatible CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeKind {
    Docker,
    Podman,
}

impl RuntimeKind {
    /// Detection order when nothing is selected explicitly.
    pub const ALL: [RuntimeKind; 2] = [RuntimeKind::Docker, RuntimeKind::Podman];

    pub fn binary_name(self) -> &'static str {
        match self {
            RuntimeKind::Docker => "docker",
            RuntimeKind::Podman => "podman",
        }
    }

    /// Guess the kind from a binary name or path (`/usr/bin/podman` -> Podman).
    pub fn from_binary(binary: &str) -> Option<Self> {
        let stem = Path::new(binary).file_stem()?.to_str()?;
        Self::ALL.into_iter().find(|k| k.binary_name() == stem)
    }
}

impl fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.binary_name())
    }
}

/// A runtime binary found on this machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeInfo {
    pub kind: RuntimeKind,
    pub binary_path: PathBuf,
}

/// Every known runtime binary found on `PATH`, in detection order.
pub fn detect() -> Vec<RuntimeInfo> {
    let path = std::env::var_os("PATH").unwrap_or_default();
    let dirs: Vec<PathBuf> = std::env::split_paths(&path).collect();
    detect_in(&dirs)
}

fn detect_in(dirs: &[PathBuf]) -> Vec<RuntimeInfo> {
    RuntimeKind::ALL
        .into_iter()
        .filter_map(|kind| {
            dirs.iter()
                .map(|d| d.join(kind.binary_name()))
                .find(|p| p.is_file())
                .map(|binary_path| RuntimeInfo { kind, binary_path })
        })
        .collect()
}

/// Pick a runtime: an explicit name or path wins, otherwise the first detected.
pub fn select(preferred: Option<&str>, detected: &[RuntimeInfo]) -> Option<RuntimeInfo> {
    match preferred {
        None => detected.first().cloned(),
        Some(choice) => {
            if let Some(found) = detected.iter().find(|rt| rt.kind.binary_name() == choice) {
                return Some(found.clone());
            }
            // An arbitrary path to a docker-compatible binary.
            let path = PathBuf::from(choice);
            path.is_file().then(|| RuntimeInfo {
                kind: RuntimeKind::from_binary(choice).unwrap_or(RuntimeKind::Docker),
                binary_path: path,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_binary_path() {
        assert_eq!(RuntimeKind::from_binary("/usr/bin/podman"), Some(RuntimeKind::Podman));
        assert_eq!(RuntimeKind::from_binary("docker"), Some(RuntimeKind::Docker));
        assert_eq!(RuntimeKind::from_binary("nerdctl"), None);
    }

    #[test]
    fn explicit_choice_wins() {
        let detected = vec![
            RuntimeInfo {
                kind: RuntimeKind::Docker,
                binary_path: "/usr/bin/docker".into(),
            },
            RuntimeInfo {
                kind: RuntimeKind::Podman,
                binary_path: "/usr/bin/podman".into(),
            },
        ];
        assert_eq!(select(None, &detected).unwrap().kind, RuntimeKind::Docker);
        assert_eq!(select(Some("podman"), &detected).unwrap().kind, RuntimeKind::Podman);
        assert!(select(Some("/nonexistent/runtime"), &detected).is_none());
        assert!(select(None, &[]).is_none());
    }

    #[test]
    fn empty_path_detects_nothing() {
        assert!(detect_in(&[]).is_empty());
    }
}
