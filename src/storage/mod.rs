use anyhow::{Context, Result};
use rand::Rng;
use std::path::{Path, PathBuf};

pub mod index;

pub use index::ProcessedSet;

/// Suffix every persisted transcript carries
pub const ARTIFACT_SUFFIX: &str = ".trans.txt";

/// First-line marker that precedes the source link of an artifact
pub const LINK_PREFIX: &str = "// link: ";

const FORBIDDEN_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
const SUFFIX_LEN: usize = 5;
const SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const MAX_COLLISION_ATTEMPTS: usize = 16;

/// Replace every character that is unsafe in a file or directory name with `_`
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if FORBIDDEN_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// Pick a filename in `dir` that does not clash with an existing file.
///
/// A clashing `name.ext` becomes `name.xxxxx.ext`, where `xxxxx` is a random lowercase
/// alphanumeric segment.
pub fn resolve_collision(dir: &Path, filename: &str) -> PathBuf {
    let candidate = dir.join(filename);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, extension) = split_artifact_name(filename);
    let mut suffixed = candidate;
    for _ in 0..MAX_COLLISION_ATTEMPTS {
        suffixed = dir.join(format!("{}.{}{}", stem, random_suffix(), extension));
        if !suffixed.exists() {
            break;
        }
        tracing::debug!("Suffixed name {} is taken as well, retrying", suffixed.display());
    }
    suffixed
}

/// Split a filename in front of its final extension. Artifact names keep `.trans.txt` whole.
fn split_artifact_name(filename: &str) -> (&str, &str) {
    if let Some(stem) = filename.strip_suffix(ARTIFACT_SUFFIX) {
        return (stem, ARTIFACT_SUFFIX);
    }

    match filename.rfind('.') {
        Some(0) | None => (filename, ""),
        Some(dot) => filename.split_at(dot),
    }
}

fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect()
}

/// A repaired transcript together with the video it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub source_link: String,
    pub body: String,
}

impl Artifact {
    pub fn new(source_link: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            source_link: source_link.into(),
            body: body.into(),
        }
    }

    /// File contents: the link header line followed by the body
    pub fn render(&self) -> String {
        format!("{}{}\n{}", LINK_PREFIX, self.source_link, self.body)
    }
}

/// Writes artifacts for one query into its own directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Create (if needed) `<root>/<sanitized query>` and return a store writing into it
    pub fn for_query(root: &Path, query: &str) -> Result<Self> {
        let dir = root.join(sanitize(query));
        fs_err::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist an artifact under a name derived from `title`, returning the path written
    pub fn write(&self, title: &str, artifact: &Artifact) -> Result<PathBuf> {
        let filename = sanitize(&format!("{}{}", title, ARTIFACT_SUFFIX));
        let path = resolve_collision(&self.dir, &filename);

        fs_err::write(&path, artifact.render())
            .with_context(|| format!("Failed to write transcript to {}", path.display()))?;

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_replaces_forbidden_chars() {
        assert_eq!(sanitize(r#"a<b>c:d"e/f\g|h?i*j"#), "a_b_c_d_e_f_g_h_i_j");
        assert_eq!(sanitize("plain title"), "plain title");
        assert_eq!(sanitize(""), "");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let inputs = [
            "What is Rust? | Part 1/3",
            "<unk> \"quoted\" *stars*",
            "C:\\videos\\ünïcödé",
            "___",
        ];
        for input in inputs {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once);
            assert!(!once.chars().any(|c| FORBIDDEN_CHARS.contains(&c)));
        }
    }

    #[test]
    fn test_split_artifact_name() {
        assert_eq!(split_artifact_name("talk.trans.txt"), ("talk", ".trans.txt"));
        assert_eq!(split_artifact_name("notes.md"), ("notes", ".md"));
        assert_eq!(split_artifact_name("README"), ("README", ""));
        assert_eq!(split_artifact_name(".hidden"), (".hidden", ""));
    }

    #[test]
    fn test_resolve_collision_without_clash() {
        let dir = TempDir::new().unwrap();
        let path = resolve_collision(dir.path(), "talk.trans.txt");
        assert_eq!(path, dir.path().join("talk.trans.txt"));
    }

    #[test]
    fn test_second_write_gets_suffix_and_both_persist() {
        let root = TempDir::new().unwrap();
        let store = ArtifactStore::for_query(root.path(), "rust: async?").unwrap();
        assert_eq!(store.dir(), root.path().join("rust_ async_"));

        let first = store
            .write("Same Title", &Artifact::new("https://www.youtube.com/watch?v=a", "one"))
            .unwrap();
        let second = store
            .write("Same Title", &Artifact::new("https://www.youtube.com/watch?v=b", "two"))
            .unwrap();

        assert_ne!(first, second);
        assert!(first.exists());
        assert!(second.exists());

        let second_name = second.file_name().unwrap().to_string_lossy().into_owned();
        let suffix = second_name
            .strip_prefix("Same Title.")
            .and_then(|rest| rest.strip_suffix(ARTIFACT_SUFFIX))
            .unwrap();
        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_artifact_render_has_link_header() {
        let artifact = Artifact::new("https://www.youtube.com/watch?v=xyz", "Hello there.");
        assert_eq!(
            artifact.render(),
            "// link: https://www.youtube.com/watch?v=xyz\nHello there."
        );
    }
}
