//! Grouping mesh files into two-object scenes.
//!
//! A category directory holds `{scene}_0.ext` and `{scene}_1.ext` for every
//! scene. The resolver needs the whole listing before it can tell a scene is
//! missing a partner, so grouping happens up front; emission is lazy and
//! each scene key comes out exactly once, either as a complete pair or as a
//! `MissingPairedMesh` error.

mod claim;

pub use claim::{ClaimStore, InMemoryClaimStore, MarkerClaimStore};

use crate::error::{InvalidConfig, SceneError};
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Identity of one scene across inputs and outputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneKey {
    pub category: String,
    pub scene: String,
}

impl SceneKey {
    pub fn new(category: impl Into<String>, scene: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            scene: scene.into(),
        }
    }
}

impl fmt::Display for SceneKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.scene)
    }
}

/// A scene with both of its mesh files present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneEntry {
    pub key: SceneKey,
    /// Mesh paths indexed by object index.
    pub meshes: [PathBuf; 2],
}

/// Filename convention mapping a file name to (scene, object index).
#[derive(Debug, Clone)]
pub struct FilenamePattern {
    regex: Regex,
}

impl FilenamePattern {
    pub const DEFAULT: &'static str = r"^(?P<scene>.+)_(?P<index>[01])\.(?P<ext>off|ply)$";

    /// Compile `pattern`; it must define the named groups `scene` and `index`.
    pub fn new(pattern: &str) -> Result<Self, InvalidConfig> {
        let regex = Regex::new(pattern)
            .map_err(|e| InvalidConfig::new("mesh_filename_pattern", e.to_string()))?;
        let names: Vec<&str> = regex.capture_names().flatten().collect();
        for group in ["scene", "index"] {
            if !names.contains(&group) {
                return Err(InvalidConfig::new(
                    "mesh_filename_pattern",
                    format!("missing named group `{group}`"),
                ));
            }
        }
        Ok(Self { regex })
    }

    /// Scene name and object index for `filename`, `None` if it does not
    /// follow the convention or the index is not 0 or 1.
    pub fn parse(&self, filename: &str) -> Option<(String, usize)> {
        let caps = self.regex.captures(filename)?;
        let scene = caps.name("scene")?.as_str();
        let index = match caps.name("index")?.as_str() {
            "0" => 0,
            "1" => 1,
            _ => return None,
        };
        if scene.is_empty() {
            return None;
        }
        Some((scene.to_string(), index))
    }
}

#[derive(Debug)]
struct SceneGroup {
    scene: String,
    meshes: [Option<PathBuf>; 2],
}

/// Lazy, restartable sequence of the scenes in one category.
///
/// Cloning is cheap and the clone starts from the same position.
#[derive(Debug, Clone)]
pub struct ScenePairs {
    category: Arc<str>,
    groups: Arc<[SceneGroup]>,
    cursor: usize,
}

impl ScenePairs {
    /// Rewind to the first scene.
    pub fn restart(&mut self) {
        self.cursor = 0;
    }

    /// Number of distinct scene keys, complete or not.
    pub fn scene_count(&self) -> usize {
        self.groups.len()
    }
}

impl Iterator for ScenePairs {
    type Item = Result<SceneEntry, SceneError>;

    fn next(&mut self) -> Option<Self::Item> {
        let group = self.groups.get(self.cursor)?;
        self.cursor += 1;
        let key = SceneKey::new(&*self.category, &group.scene);
        Some(match &group.meshes {
            [Some(a), Some(b)] => Ok(SceneEntry {
                key,
                meshes: [a.clone(), b.clone()],
            }),
            [None, _] => Err(SceneError::MissingPairedMesh {
                key,
                missing_index: 0,
            }),
            [_, None] => Err(SceneError::MissingPairedMesh {
                key,
                missing_index: 1,
            }),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.groups.len() - self.cursor;
        (left, Some(left))
    }
}

/// Groups a category's mesh files by scene.
#[derive(Debug, Clone)]
pub struct PairResolver {
    pattern: FilenamePattern,
}

impl PairResolver {
    pub fn new(pattern: FilenamePattern) -> Self {
        Self { pattern }
    }

    /// Group `filenames` (entries of `dir`) into scenes, keeping first-seen
    /// order. Names that do not match the convention are skipped.
    pub fn resolve<I, S>(&self, category: &str, dir: &Path, filenames: I) -> ScenePairs
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut groups: Vec<SceneGroup> = Vec::new();
        let mut slots: HashMap<String, usize> = HashMap::new();

        for name in filenames {
            let name = name.as_ref();
            let Some((scene, index)) = self.pattern.parse(name) else {
                warn!(category, file = name, "Skipping file outside naming convention");
                continue;
            };
            let slot = *slots.entry(scene.clone()).or_insert_with(|| {
                groups.push(SceneGroup {
                    scene,
                    meshes: [None, None],
                });
                groups.len() - 1
            });
            let group = &mut groups[slot];
            if let Some(existing) = &group.meshes[index] {
                warn!(
                    category,
                    scene = %group.scene,
                    index,
                    kept = %existing.display(),
                    ignored = name,
                    "Duplicate mesh for object index"
                );
                continue;
            }
            group.meshes[index] = Some(dir.join(name));
        }

        debug!(category, scenes = groups.len(), "Resolved scene pairs");
        ScenePairs {
            category: Arc::from(category),
            groups: groups.into(),
            cursor: 0,
        }
    }
}

/// Names of the regular files in `dir`, sorted.
pub fn list_mesh_files(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(name) => debug!(?name, "Skipping non UTF-8 file name"),
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn resolve(names: &[&str]) -> ScenePairs {
        let pattern = FilenamePattern::new(FilenamePattern::DEFAULT).unwrap();
        PairResolver::new(pattern).resolve("chair", Path::new("/meshes/chair"), names.iter().copied())
    }

    #[test]
    fn test_pair_dedup() {
        let results: Vec<_> = resolve(&["sceneA_0.off", "sceneA_1.off", "sceneB_0.off"]).collect();
        assert_eq!(results.len(), 2);

        let entry = results[0].as_ref().unwrap();
        assert_eq!(entry.key, SceneKey::new("chair", "sceneA"));
        assert_eq!(entry.meshes[0], PathBuf::from("/meshes/chair/sceneA_0.off"));
        assert_eq!(entry.meshes[1], PathBuf::from("/meshes/chair/sceneA_1.off"));

        match &results[1] {
            Err(SceneError::MissingPairedMesh { key, missing_index }) => {
                assert_eq!(key.scene, "sceneB");
                assert_eq!(*missing_index, 1);
            }
            other => panic!("expected missing pair, got {other:?}"),
        }
    }

    #[test]
    fn test_emits_once_regardless_of_order() {
        let results: Vec<_> = resolve(&["b_1.ply", "a_1.off", "b_0.ply", "a_0.off"])
            .collect::<Result<_, _>>()
            .unwrap();
        let scenes: Vec<&str> = results.iter().map(|e: &SceneEntry| e.key.scene.as_str()).collect();
        assert_eq!(scenes, vec!["b", "a"]);
    }

    #[test]
    fn test_missing_first_mesh() {
        let mut pairs = resolve(&["only_1.off"]);
        assert!(matches!(
            pairs.next(),
            Some(Err(SceneError::MissingPairedMesh { missing_index: 0, .. }))
        ));
        assert!(pairs.next().is_none());
    }

    #[test]
    fn test_non_matching_names_skipped() {
        let pairs = resolve(&["readme.txt", "x_2.off", "x_0.obj", "y_0.off", "y_1.off"]);
        assert_eq!(pairs.scene_count(), 1);
    }

    #[derive(Clone)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_skipped_names_logged_as_warnings() {
        let log = CapturedLog(Arc::new(Mutex::new(Vec::new())));
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            resolve(&["readme.txt", "y_0.off", "y_1.off"]);
        });

        let out = String::from_utf8(log.0.lock().unwrap().clone()).unwrap();
        assert!(out.contains("WARN"), "{out}");
        assert!(out.contains("readme.txt"), "{out}");
        assert!(!out.contains("y_0.off"), "{out}");
    }

    #[test]
    fn test_scene_names_with_underscores() {
        let entry = resolve(&["my_scene_01_0.off", "my_scene_01_1.off"])
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(entry.key.scene, "my_scene_01");
    }

    #[test]
    fn test_duplicate_index_keeps_first() {
        let entry = resolve(&["s_0.off", "s_0.ply", "s_1.off"])
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(entry.meshes[0], PathBuf::from("/meshes/chair/s_0.off"));
    }

    #[test]
    fn test_restart_and_clone() {
        let mut pairs = resolve(&["a_0.off", "a_1.off", "b_0.off", "b_1.off"]);
        assert!(pairs.next().is_some());
        let rest = pairs.clone();
        assert_eq!(rest.count(), 1);
        pairs.restart();
        assert_eq!(pairs.count(), 2);
    }

    #[test]
    fn test_custom_pattern() {
        let pattern = FilenamePattern::new(r"^obj(?P<index>[01])_(?P<scene>\w+)\.off$").unwrap();
        assert_eq!(pattern.parse("obj1_kitchen.off"), Some(("kitchen".into(), 1)));
        assert_eq!(pattern.parse("kitchen_1.off"), None);
    }

    #[test]
    fn test_pattern_requires_groups() {
        let err = FilenamePattern::new(r"^(?P<scene>.+)\.off$").unwrap_err();
        assert_eq!(err.field, "mesh_filename_pattern");
        assert!(FilenamePattern::new("(").is_err());
    }

    #[test]
    fn test_list_mesh_files_sorted_files_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b_0.off"), "").unwrap();
        std::fs::write(dir.path().join("a_1.off"), "").unwrap();
        std::fs::create_dir(dir.path().join("c_0.off")).unwrap();
        assert_eq!(list_mesh_files(dir.path()).unwrap(), vec!["a_1.off", "b_0.off"]);
    }
}
