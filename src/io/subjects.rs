//! Discovery of subject volumes in a directory by file naming convention.

use lazy_static::lazy_static;
use regex::Regex;
use std::{
    collections::{BTreeMap, HashMap},
    fs, io,
    path::{Path, PathBuf},
};

lazy_static! {
    static ref SUBJECT_FILE_REGEX: Regex =
        Regex::new(r"^(?P<id>.+)_(?P<role>cortex|brain|wm|pial)\.nii(?:\.gz)?$").unwrap();
    static ref THICKNESS_FILE_REGEX: Regex =
        Regex::new(r"^(?P<id>.+)_thickness\.nii(?:\.gz)?$").unwrap();
}

/// Where the boundary masks of a subject come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BoundarySource {
    /// Boundaries are derived from the cortex mask and this whole-brain mask.
    Brain(PathBuf),
    /// Boundaries are given directly as white matter and pial masks.
    Given { inner: PathBuf, outer: PathBuf },
}

/// Input volumes of a single subject.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubjectFiles {
    id: String,
    cortex: PathBuf,
    boundaries: BoundarySource,
}

/// Output volumes written for a single subject.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubjectOutputs {
    pub laplace: PathBuf,
    pub gradient: PathBuf,
    pub thickness: PathBuf,
}

impl SubjectFiles {
    pub fn new(id: String, cortex: PathBuf, boundaries: BoundarySource) -> Self {
        Self {
            id,
            cortex,
            boundaries,
        }
    }

    /// Returns the identifier of the subject.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the path of the cortex (domain) mask.
    pub fn cortex(&self) -> &Path {
        &self.cortex
    }

    /// Returns the source of the boundary masks.
    pub fn boundaries(&self) -> &BoundarySource {
        &self.boundaries
    }

    /// Returns the paths of the output volumes in the given directory.
    pub fn output_paths(&self, output_dir: &Path) -> SubjectOutputs {
        let path = |suffix: &str| output_dir.join(format!("{}_{}.nii.gz", self.id, suffix));
        SubjectOutputs {
            laplace: path("laplace"),
            gradient: path("gradient"),
            thickness: path("thickness"),
        }
    }
}

/// Result of scanning a directory for subjects.
#[derive(Clone, Debug, Default)]
pub struct DiscoveredSubjects {
    /// Subjects with a cortex mask and a complete set of boundary inputs,
    /// sorted by identifier.
    pub complete: Vec<SubjectFiles>,
    /// Identifiers of subjects missing some required volume, sorted.
    pub incomplete: Vec<String>,
}

/// Scans the given directory for subject volumes named
/// `<id>_cortex.nii[.gz]` together with either `<id>_brain.nii[.gz]` or
/// both `<id>_wm.nii[.gz]` and `<id>_pial.nii[.gz]`.
///
/// Given white matter and pial masks take precedence over a brain mask.
pub fn discover_subjects(input_dir: &Path) -> io::Result<DiscoveredSubjects> {
    let mut files: BTreeMap<String, HashMap<String, PathBuf>> = BTreeMap::new();

    for entry in fs::read_dir(input_dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let file_name = match path.file_name().and_then(|name| name.to_str()) {
            Some(file_name) => file_name,
            None => continue,
        };
        if let Some(captures) = SUBJECT_FILE_REGEX.captures(file_name) {
            let id = captures["id"].to_string();
            let role = captures["role"].to_string();
            files.entry(id).or_default().insert(role, path.clone());
        }
    }

    let mut discovered = DiscoveredSubjects::default();
    for (id, mut roles) in files {
        let cortex = roles.remove("cortex");
        let given = match (roles.remove("wm"), roles.remove("pial")) {
            (Some(inner), Some(outer)) => Some(BoundarySource::Given { inner, outer }),
            _ => None,
        };
        let boundaries = given.or_else(|| roles.remove("brain").map(BoundarySource::Brain));
        match (cortex, boundaries) {
            (Some(cortex), Some(boundaries)) => discovered
                .complete
                .push(SubjectFiles::new(id, cortex, boundaries)),
            _ => discovered.incomplete.push(id),
        }
    }
    Ok(discovered)
}

/// Finds all thickness maps named `<id>_thickness.nii[.gz]` in the given
/// directory and returns their subject identifiers and paths, sorted by identifier.
pub fn discover_thickness_maps(input_dir: &Path) -> io::Result<Vec<(String, PathBuf)>> {
    let mut maps = Vec::new();
    for entry in fs::read_dir(input_dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let id = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|file_name| THICKNESS_FILE_REGEX.captures(file_name))
            .map(|captures| captures["id"].to_string());
        if let Some(id) = id {
            maps.push((id, path));
        }
    }
    maps.sort();
    Ok(maps)
}
