use std::collections::HashSet;
use std::io::{BufRead, BufReader};
use std::path::Path;
use walkdir::WalkDir;

use super::{ARTIFACT_SUFFIX, LINK_PREFIX};

/// Video ids that already have an artifact somewhere under the output root.
///
/// Seeded from disk once per run and then kept current as new artifacts are written, so a
/// video met both at the top level and inside a playlist is only archived once.
#[derive(Debug, Clone, Default)]
pub struct ProcessedSet {
    ids: HashSet<String>,
}

impl ProcessedSet {
    /// Recover the ids of every artifact below `root`. Missing roots yield an empty set.
    pub fn scan(root: &Path) -> Self {
        let mut ids = HashSet::new();

        for entry in WalkDir::new(root).into_iter().filter_map(|entry| entry.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            if !entry.file_name().to_string_lossy().ends_with(ARTIFACT_SUFFIX) {
                continue;
            }

            match read_first_line(entry.path()) {
                Some(line) => {
                    if let Some(id) = video_id_from_header(&line) {
                        ids.insert(id.to_string());
                    } else {
                        tracing::debug!("No link header in {}", entry.path().display());
                    }
                }
                None => tracing::debug!("Could not read {}", entry.path().display()),
            }
        }

        Self { ids }
    }

    pub fn contains(&self, video_id: &str) -> bool {
        self.ids.contains(video_id)
    }

    pub fn insert(&mut self, video_id: impl Into<String>) -> bool {
        self.ids.insert(video_id.into())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Ids in sorted order
    pub fn sorted(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.ids.iter().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

impl FromIterator<String> for ProcessedSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

fn read_first_line(path: &Path) -> Option<String> {
    let file = fs_err::File::open(path).ok()?;
    let mut line = String::new();
    BufReader::new(file).read_line(&mut line).ok()?;
    Some(line)
}

/// The id is whatever follows the last `=` of the link, which holds for `watch?v=<id>` links.
fn video_id_from_header(line: &str) -> Option<&str> {
    let link = line.trim_end().strip_prefix(LINK_PREFIX)?.trim();
    let id = link.rsplit('=').next()?.trim();
    if id.is_empty() || id == link {
        return None;
    }
    Some(id)
}
