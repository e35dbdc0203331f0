use std::process::{Command, Output};

use serde::Deserialize;
use tracing::{debug, warn};

use super::{Runtime, RuntimeError};
use crate::model::{Container, ContainerId, Image, ImageId};
use crate::probe::RuntimeKind;

/// Ids passed to a single `inspect` invocation.
const INSPECT_BATCH: usize = 100;

// --- `image inspect` / `container inspect` JSON output ---

#[derive(Deserialize)]
struct ImageInspect {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Parent", default)]
    parent: Option<String>,
    #[serde(rename = "RepoTags", default)]
    repo_tags: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct ContainerInspect {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Image")]
    image: String,
    #[serde(rename = "State")]
    state: ContainerState,
}

#[derive(Deserialize)]
struct ContainerState {
    #[serde(rename = "Running", default)]
    running: bool,
}

impl From<ImageInspect> for Image {
    fn from(raw: ImageInspect) -> Self {
        Image {
            id: ImageId::new(raw.id),
            parent_id: raw.parent.filter(|p| !p.is_empty()).map(ImageId::new),
            repo_tags: raw.repo_tags.unwrap_or_default(),
        }
    }
}

impl From<ContainerInspect> for Container {
    fn from(raw: ContainerInspect) -> Self {
        Container::new(
            ContainerId::new(raw.id),
            ImageId::new(raw.image),
            raw.state.running,
        )
    }
}

/// Talks to the runtime through its CLI (`docker`/`podman`).
/// Every call is a blocking subprocess.
pub struct CliRuntime {
    cmd: String,
    kind: RuntimeKind,
}

impl CliRuntime {
    pub fn new(cmd: String, kind: RuntimeKind) -> Self {
        Self { cmd, kind }
    }

    pub fn kind(&self) -> RuntimeKind {
        self.kind
    }

    fn output(&self, args: &[&str]) -> Result<Output, RuntimeError> {
        debug!(cmd = %self.cmd, ?args, "exec");
        Command::new(&self.cmd)
            .args(args)
            .output()
            .map_err(|e| RuntimeError::Unavailable(format!("failed to run '{}': {e}", self.cmd)))
    }

    /// Run `cmd args...`, returning stdout; `target` names the entity in errors.
    fn exec(&self, args: &[&str], target: &str) -> Result<String, RuntimeError> {
        let output = self.output(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(stderr.trim(), target));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// List ids, then inspect them in batches.
    ///
    /// Ids removed between the listing and the inspect are dropped: the
    /// runtime still prints the objects it found before failing on the
    /// missing ones.
    fn inspect_all<T: for<'de> Deserialize<'de>>(
        &self,
        list_args: &[&str],
        inspect_args: &[&str],
    ) -> Result<Vec<T>, RuntimeError> {
        let listing = self.exec(list_args, "listing")?;
        let ids = unique_lines(&listing);

        let mut out = Vec::with_capacity(ids.len());
        for batch in ids.chunks(INSPECT_BATCH) {
            let mut args = inspect_args.to_vec();
            args.extend(batch.iter().map(String::as_str));
            let output = self.output(&args)?;
            let stdout = String::from_utf8_lossy(&output.stdout);

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                match classify_failure(stderr.trim(), "inspect") {
                    RuntimeError::NotFound(_) => {
                        warn!(stderr = %stderr.trim(), "entities vanished during inspect");
                    }
                    err => return Err(err),
                }
            }

            let json = stdout.trim();
            if json.is_empty() {
                continue;
            }
            let parsed: Vec<T> = serde_json::from_str(json).map_err(|e| {
                RuntimeError::Rejected(format!("failed to parse '{} {}' JSON: {e}", self.cmd, inspect_args.join(" ")))
            })?;
            out.extend(parsed);
        }
        Ok(out)
    }
}

impl Runtime for CliRuntime {
    fn list_images(&self, include_intermediate: bool) -> Result<Vec<Image>, RuntimeError> {
        let mut list = vec!["image", "ls", "--quiet", "--no-trunc"];
        if include_intermediate {
            list.push("--all");
        }
        let raw: Vec<ImageInspect> = self.inspect_all(&list, &["image", "inspect"])?;
        Ok(raw.into_iter().map(Image::from).collect())
    }

    fn list_containers(&self, include_stopped: bool) -> Result<Vec<Container>, RuntimeError> {
        let mut list = vec!["container", "ls", "--quiet", "--no-trunc"];
        if include_stopped {
            list.push("--all");
        }
        let raw: Vec<ContainerInspect> = self.inspect_all(&list, &["container", "inspect"])?;
        Ok(raw.into_iter().map(Container::from).collect())
    }

    fn image_history(&self, image: &ImageId) -> Result<Vec<ImageId>, RuntimeError> {
        let out = self.exec(
            &["image", "history", "--quiet", "--no-trunc", image.as_str()],
            image.as_str(),
        )?;
        Ok(parse_history(&out))
    }

    fn remove_container(&self, container: &ContainerId) -> Result<(), RuntimeError> {
        self.exec(&["container", "rm", container.as_str()], container.as_str())
            .map(|_| ())
    }

    fn remove_image_tag(&self, tag: &str) -> Result<(), RuntimeError> {
        // Removing by reference only untags while other references remain.
        self.exec(&["image", "rm", tag], tag).map(|_| ())
    }

    fn remove_image(&self, image: &ImageId, force: bool, noprune: bool) -> Result<(), RuntimeError> {
        let mut args = vec!["image", "rm"];
        if force {
            args.push("--force");
        }
        if noprune {
            args.push("--no-prune");
        }
        args.push(image.as_str());
        self.exec(&args, image.as_str()).map(|_| ())
    }
}

/// Map a failed invocation's stderr onto the runtime error kinds.
fn classify_failure(stderr: &str, target: &str) -> RuntimeError {
    let lower = stderr.to_lowercase();
    const VANISHED: &[&str] = &[
        "no such container",
        "no such image",
        "image not known",
        "no container with name or id",
        "reference does not exist",
    ];
    const UNREACHABLE: &[&str] = &[
        "cannot connect to the docker daemon",
        "is the docker daemon running",
        "cannot connect to podman",
        "permission denied while trying to connect",
    ];

    if VANISHED.iter().any(|m| lower.contains(m)) {
        RuntimeError::NotFound(target.to_string())
    } else if UNREACHABLE.iter().any(|m| lower.contains(m)) {
        RuntimeError::Unavailable(stderr.to_string())
    } else {
        RuntimeError::Rejected(stderr.to_string())
    }
}

/// Non-empty lines, first occurrence wins.
fn unique_lines(s: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    s.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && seen.insert(*l))
        .map(String::from)
        .collect()
}

/// `history --quiet` prints the image itself first, then its ancestors;
/// layers not present locally show up as `<missing>`.
fn parse_history(out: &str) -> Vec<ImageId> {
    out.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .skip(1)
        .filter(|l| *l != "<missing>")
        .map(ImageId::new)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vanished_entities_map_to_not_found() {
        let err = classify_failure("Error response from daemon: No such container: abc", "abc");
        assert_eq!(err, RuntimeError::NotFound("abc".into()));
        let err = classify_failure("Error: sha256:ff: image not known", "sha256:ff");
        assert_eq!(err, RuntimeError::NotFound("sha256:ff".into()));
    }

    #[test]
    fn daemon_down_maps_to_unavailable() {
        let err = classify_failure(
            "Cannot connect to the Docker daemon at unix:///var/run/docker.sock. Is the docker daemon running?",
            "listing",
        );
        assert!(matches!(err, RuntimeError::Unavailable(_)));
    }

    #[test]
    fn conflicts_map_to_rejected() {
        let err = classify_failure(
            "Error response from daemon: conflict: unable to delete 0123 (cannot be forced) - image has dependent child images",
            "0123",
        );
        assert!(matches!(err, RuntimeError::Rejected(_)));
    }

    #[test]
    fn missing_binary_is_unavailable() {
        let rt = CliRuntime::new("/nonexistent/sweep-test-runtime".into(), RuntimeKind::Docker);
        assert!(matches!(rt.list_images(true), Err(RuntimeError::Unavailable(_))));
    }

    #[test]
    fn parses_image_inspect() {
        let json = r#"[
            {"Id": "sha256:bb", "Parent": "sha256:aa", "RepoTags": ["app:1", "reg.io/org/app:1"]},
            {"Id": "sha256:aa", "Parent": "", "RepoTags": []},
            {"Id": "sha256:cc", "RepoTags": null}
        ]"#;
        let raw: Vec<ImageInspect> = serde_json::from_str(json).unwrap();
        let images: Vec<Image> = raw.into_iter().map(Image::from).collect();

        assert_eq!(images[0].parent_id, Some(ImageId::from("sha256:aa")));
        assert_eq!(images[0].repo_tags.len(), 2);
        assert_eq!(images[1].parent_id, None);
        assert!(images[2].repo_tags.is_empty());
    }

    #[test]
    fn parses_container_inspect() {
        let json = r#"[{"Id": "c1", "Image": "sha256:aa", "State": {"Status": "exited", "Running": false}}]"#;
        let raw: Vec<ContainerInspect> = serde_json::from_str(json).unwrap();
        let c = Container::from(raw.into_iter().next().unwrap());
        assert_eq!(c, Container::new("c1", "sha256:aa", false));
    }

    #[test]
    fn history_skips_self_and_missing_layers() {
        let out = "sha256:cc\nsha256:bb\n<missing>\nsha256:aa\n";
        assert_eq!(
            parse_history(out),
            vec![ImageId::from("sha256:bb"), ImageId::from("sha256:aa")]
        );
    }

    /// Write an executable shell script standing in for the runtime binary.
    #[cfg(unix)]
    fn fake_runtime(name: &str, body: &str) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = std::env::temp_dir().join(format!("sweep-{name}-{}", std::process::id()));
        std::fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn container_removed_before_inspect_is_dropped() {
        let script = fake_runtime(
            "vanished",
            r#"case "$1 $2" in
  "container ls") printf 'c1\nc2\n' ;;
  "container inspect")
    echo '[{"Id": "c1", "Image": "sha256:aa", "State": {"Running": true}}]'
    echo 'Error response from daemon: No such container: c2' >&2
    exit 1 ;;
esac
"#,
        );
        let rt = CliRuntime::new(script.to_string_lossy().into_owned(), RuntimeKind::Docker);

        let containers = rt.list_containers(true).unwrap();
        std::fs::remove_file(&script).unwrap();
        assert_eq!(containers, vec![Container::new("c1", "sha256:aa", true)]);
    }

    #[cfg(unix)]
    #[test]
    fn inspect_failure_other_than_vanished_is_returned() {
        let script = fake_runtime(
            "inspect-down",
            r#"case "$1 $2" in
  "image ls") echo 'sha256:aa' ;;
  "image inspect")
    echo 'Cannot connect to the Docker daemon at unix:///var/run/docker.sock' >&2
    exit 1 ;;
esac
"#,
        );
        let rt = CliRuntime::new(script.to_string_lossy().into_owned(), RuntimeKind::Docker);

        let result = rt.list_images(true);
        std::fs::remove_file(&script).unwrap();
        assert!(matches!(result, Err(RuntimeError::Unavailable(_))));
    }

    #[test]
    fn listing_is_deduplicated() {
        assert_eq!(unique_lines("a\nb\n\na\n"), vec!["a", "b"]);
    }
}
