//! Linking of pregenerated grid, orography and surface climatology files
//!
//! When the workflow does not generate these files itself it links them
//! from a staged directory into the experiment's FIXlam directory. The
//! resolution encoded in the filenames (`C<res>...`) must be the same for
//! every linked file of a group.

use globset::Glob;
use regex_lite::Regex;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

use crate::FixFileError;

/// Group of pregenerated files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileGroup {
    Grid,
    Orog,
    SfcClimo,
}

impl FileGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileGroup::Grid => "grid",
            FileGroup::Orog => "orog",
            FileGroup::SfcClimo => "sfc_climo",
        }
    }
}

/// What to link, from where, and the halo widths that appear in filenames
#[derive(Debug, Clone)]
pub struct LinkSpec<'a> {
    pub group: FileGroup,
    pub source_dir: &'a Path,
    pub target_dir: &'a Path,
    /// Separator between the resolution prefix and the rest of the name
    pub dot_or_uscore: &'a str,
    pub nhw: i64,
    pub nh0: i64,
    pub nh3: i64,
    pub nh4: i64,
    pub tile_rgnl: i64,
    pub sfc_climo_fields: &'a [String],
}

impl LinkSpec<'_> {
    /// Filename globs for the group, in a stable order without duplicates.
    pub fn patterns(&self) -> Vec<String> {
        let sep = self.dot_or_uscore;
        let tile = self.tile_rgnl;
        let mut patterns = Vec::new();
        match self.group {
            FileGroup::Grid => {
                for halo in [self.nhw, self.nh3, self.nh4] {
                    patterns.push(format!("C*{}mosaic.halo{}.nc", sep, halo));
                }
                for halo in [self.nhw, self.nh3, self.nh4] {
                    patterns.push(format!("C*{}grid.tile{}.halo{}.nc", sep, tile, halo));
                }
            }
            FileGroup::Orog => {
                for halo in [self.nh0, self.nh4] {
                    patterns.push(format!("C*{}oro_data.tile{}.halo{}.nc", sep, tile, halo));
                }
            }
            FileGroup::SfcClimo => {
                for field in self.sfc_climo_fields {
                    for halo in [self.nh0, self.nh4] {
                        patterns.push(format!("C*.{}.tile{}.halo{}.nc", field, tile, halo));
                    }
                }
            }
        }
        let mut seen = BTreeSet::new();
        patterns.retain(|p| seen.insert(p.clone()));
        patterns
    }
}

fn resolution_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^C(\d+)").expect("valid regex"))
}

/// Link the group's files into the target directory and return their resolution.
pub fn link_pregen_files(spec: &LinkSpec<'_>) -> Result<u32, FixFileError> {
    let available = list_files(spec.source_dir)?;

    let mut matched: Vec<PathBuf> = Vec::new();
    for pattern in spec.patterns() {
        let matcher = Glob::new(&pattern)?.compile_matcher();
        let hits: Vec<&PathBuf> = available
            .iter()
            .filter(|p| p.file_name().map(|n| matcher.is_match(n)).unwrap_or(false))
            .collect();
        if hits.is_empty() {
            return Err(FixFileError::NoFiles {
                group: spec.group.as_str().to_string(),
                pattern,
                dir: spec.source_dir.to_path_buf(),
            });
        }
        for hit in hits {
            if !matched.contains(hit) {
                matched.push(hit.clone());
            }
        }
    }

    let resolutions: BTreeSet<u32> = matched
        .iter()
        .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
        .filter_map(|name| resolution_re().captures(name))
        .filter_map(|c| c.get(1).and_then(|m| m.as_str().parse().ok()))
        .collect();
    if resolutions.len() != 1 {
        return Err(FixFileError::ResolutionMismatch {
            group: spec.group.as_str().to_string(),
            found: resolutions.into_iter().collect(),
        });
    }

    fs::create_dir_all(spec.target_dir).map_err(|source| FixFileError::Io {
        path: spec.target_dir.to_path_buf(),
        source,
    })?;
    for source_path in &matched {
        if let Some(name) = source_path.file_name() {
            create_link(source_path, &spec.target_dir.join(name))?;
        }
    }

    Ok(resolutions.into_iter().next().unwrap_or_default())
}

fn list_files(dir: &Path) -> Result<Vec<PathBuf>, FixFileError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_dir() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn create_link(source: &Path, link: &Path) -> Result<(), FixFileError> {
    let io_err = |source| FixFileError::Io {
        path: link.to_path_buf(),
        source,
    };
    if fs::symlink_metadata(link).is_ok() {
        fs::remove_file(link).map_err(io_err)?;
    }
    #[cfg(unix)]
    std::os::unix::fs::symlink(source, link).map_err(io_err)?;
    #[cfg(not(unix))]
    fs::copy(source, link).map(|_| ()).map_err(io_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"").unwrap();
    }

    fn spec<'a>(group: FileGroup, src: &'a Path, dst: &'a Path, fields: &'a [String]) -> LinkSpec<'a> {
        LinkSpec {
            group,
            source_dir: src,
            target_dir: dst,
            dot_or_uscore: "_",
            nhw: 6,
            nh0: 0,
            nh3: 3,
            nh4: 4,
            tile_rgnl: 7,
            sfc_climo_fields: fields,
        }
    }

    #[test]
    fn test_orog_links_and_resolution() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        touch(src.path(), "C403_oro_data.tile7.halo0.nc");
        touch(src.path(), "C403_oro_data.tile7.halo4.nc");

        let res = link_pregen_files(&spec(FileGroup::Orog, src.path(), dst.path(), &[])).unwrap();
        assert_eq!(res, 403);
        let link = dst.path().join("C403_oro_data.tile7.halo4.nc");
        assert!(fs::symlink_metadata(&link).is_ok());
    }

    #[test]
    fn test_missing_file_reports_pattern() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        touch(src.path(), "C403_oro_data.tile7.halo0.nc");

        let err = link_pregen_files(&spec(FileGroup::Orog, src.path(), dst.path(), &[])).unwrap_err();
        assert!(err.to_string().contains("oro_data.tile7.halo4.nc"));
    }

    #[test]
    fn test_resolution_read_from_leading_prefix() {
        let caps = resolution_re().captures("C3357_oro_data.tile7.halo4.nc").unwrap();
        assert_eq!(&caps[1], "3357");
        assert!(resolution_re().captures("oro_C403.nc").is_none());
        assert!(std::ptr::eq(resolution_re(), resolution_re()));
    }

    #[test]
    fn test_mixed_resolutions_rejected() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        touch(src.path(), "C403_oro_data.tile7.halo0.nc");
        touch(src.path(), "C768_oro_data.tile7.halo4.nc");

        let err = link_pregen_files(&spec(FileGroup::Orog, src.path(), dst.path(), &[])).unwrap_err();
        match err {
            FixFileError::ResolutionMismatch { found, .. } => assert_eq!(found, vec![403, 768]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_sfc_climo_patterns() {
        let fields = vec!["facsf".to_string(), "snowfree_albedo".to_string()];
        let src = Path::new("/src");
        let s = spec(FileGroup::SfcClimo, src, src, &fields);
        assert_eq!(
            s.patterns(),
            vec![
                "C*.facsf.tile7.halo0.nc",
                "C*.facsf.tile7.halo4.nc",
                "C*.snowfree_albedo.tile7.halo0.nc",
                "C*.snowfree_albedo.tile7.halo4.nc",
            ]
        );
    }

    #[test]
    fn test_grid_patterns_deduplicated() {
        let src = Path::new("/src");
        let mut s = spec(FileGroup::Grid, src, src, &[]);
        s.nhw = 4;
        assert_eq!(s.patterns().len(), 4);
    }

    #[test]
    fn test_relink_replaces_existing() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        touch(src.path(), "C403_oro_data.tile7.halo0.nc");
        touch(src.path(), "C403_oro_data.tile7.halo4.nc");
        let s = spec(FileGroup::Orog, src.path(), dst.path(), &[]);
        link_pregen_files(&s).unwrap();
        assert_eq!(link_pregen_files(&s).unwrap(), 403);
    }
}
