//! Header retrieval
//!
//! Finds the go_asm.h the build left behind, reads it, and cleans up the
//! temporary file or work directory it came from.
//!
//! Inside a `-work` directory the header's location depends on the go
//! version: older releases used `<import path>/_obj/go_asm.h`, newer ones
//! use per-action directories where the target package is `b001`. Both are
//! tried before falling back to a search.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::SizeofConfig;
use crate::invoke::Invocation;
use crate::plan::{BuildPlan, HeaderStrategy};
use crate::unit::UnitInfo;

/// Action directory of the package named on the `go build` command line
const TARGET_ACTION_DIR: &str = "b001";

/// Header retrieval errors
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("go build: cannot find work directory")]
    MissingWorkDir,

    #[error("go build: no header file was planned")]
    MissingHeaderFile,

    #[error("cannot find {header} in {}", .dir.display())]
    NotFound { header: String, dir: PathBuf },

    #[error("ambiguous {header} in {}: {}", .dir.display(), display_paths(.candidates))]
    Ambiguous {
        header: String,
        dir: PathBuf,
        candidates: Vec<PathBuf>,
    },

    #[error("reading {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("removing {}: {source}", .path.display())]
    Cleanup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Read the header the build produced, removing whatever held it.
pub fn read_header(
    plan: &mut BuildPlan,
    invocation: Invocation,
    unit: &UnitInfo,
    config: &SizeofConfig,
) -> Result<String, ArtifactError> {
    match plan.strategy() {
        HeaderStrategy::WorkDir => {
            let work_dir = invocation.work_dir.ok_or(ArtifactError::MissingWorkDir)?;
            let dir = work_dir.path().to_path_buf();

            let text = locate_in_work_dir(&dir, &unit.import_path, &config.header_name)
                .and_then(|path| {
                    if config.verbose {
                        eprintln!("sizeof: reading {}", path.display());
                    }
                    read_text(&path)
                });

            if config.verbose && !work_dir.is_kept() {
                eprintln!("sizeof: removing {}", dir.display());
            }
            let removed = work_dir.remove();

            settle(text, removed, dir)
        }
        HeaderStrategy::ExplicitPath => {
            let file = plan
                .take_header_file()
                .ok_or(ArtifactError::MissingHeaderFile)?;
            let path = file.path().to_path_buf();
            if config.verbose {
                eprintln!("sizeof: reading {}", path.display());
            }

            let text = read_text(&path);
            let removed = file.close();

            settle(text, removed, path)
        }
    }
}

/// Find `header` inside a go work directory.
pub fn locate_in_work_dir(
    work_dir: &Path,
    import_path: &str,
    header: &str,
) -> Result<PathBuf, ArtifactError> {
    let conventional = [
        work_dir.join(import_path).join("_obj").join(header),
        work_dir.join(TARGET_ACTION_DIR).join(header),
    ];
    if let Some(path) = conventional.into_iter().find(|p| p.is_file()) {
        return Ok(path);
    }

    let mut candidates: Vec<PathBuf> = WalkDir::new(work_dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == header)
        .map(|entry| entry.into_path())
        .collect();
    candidates.sort();

    match candidates.len() {
        0 => Err(ArtifactError::NotFound {
            header: header.to_string(),
            dir: work_dir.to_path_buf(),
        }),
        1 => Ok(candidates.remove(0)),
        _ => Err(ArtifactError::Ambiguous {
            header: header.to_string(),
            dir: work_dir.to_path_buf(),
            candidates,
        }),
    }
}

/// Combine a read with the removal that followed it. A read failure wins.
fn settle(
    text: Result<String, ArtifactError>,
    removed: io::Result<()>,
    path: PathBuf,
) -> Result<String, ArtifactError> {
    let text = text?;
    removed.map_err(|source| ArtifactError::Cleanup { path, source })?;
    Ok(text)
}

fn read_text(path: &Path) -> Result<String, ArtifactError> {
    let bytes = fs::read(path).map_err(|source| ArtifactError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoke::WorkDir;
    use crate::plan::plan;
    use tempfile::TempDir;

    const HEADER: &str = "#define T__size 8\n";

    fn unit(dir: &Path, has_asm_sources: bool) -> UnitInfo {
        UnitInfo {
            dir: dir.to_path_buf(),
            import_path: "example.com/geom".to_string(),
            stale: true,
            has_asm_sources,
            name: "geom".to_string(),
        }
    }

    fn write(path: &Path, text: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    #[test]
    fn test_locate_legacy_layout() {
        let temp = TempDir::new().unwrap();
        let expected = temp.path().join("example.com/geom/_obj/go_asm.h");
        write(&expected, HEADER);
        write(&temp.path().join("b001/go_asm.h"), "other");

        let found = locate_in_work_dir(temp.path(), "example.com/geom", "go_asm.h").unwrap();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_locate_action_layout() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("b002/go_asm.h"), "dependency");
        let expected = temp.path().join("b001/go_asm.h");
        write(&expected, HEADER);

        let found = locate_in_work_dir(temp.path(), "example.com/geom", "go_asm.h").unwrap();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_locate_single_search_hit() {
        let temp = TempDir::new().unwrap();
        let expected = temp.path().join("b017/go_asm.h");
        write(&expected, HEADER);

        let found = locate_in_work_dir(temp.path(), "example.com/geom", "go_asm.h").unwrap();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_locate_ambiguous_and_missing() {
        let temp = TempDir::new().unwrap();
        let err = locate_in_work_dir(temp.path(), "m", "go_asm.h").unwrap_err();
        assert!(matches!(err, ArtifactError::NotFound { .. }));

        write(&temp.path().join("b002/go_asm.h"), "a");
        write(&temp.path().join("b003/go_asm.h"), "b");
        let err = locate_in_work_dir(temp.path(), "m", "go_asm.h").unwrap_err();
        match err {
            ArtifactError::Ambiguous { candidates, .. } => assert_eq!(candidates.len(), 2),
            other => panic!("expected Ambiguous, got {:?}", other),
        }
    }

    #[test]
    fn test_read_from_work_dir_removes_it() {
        let temp = TempDir::new().unwrap();
        let work = temp.path().join("work");
        write(&work.join("example.com/geom/_obj/go_asm.h"), HEADER);

        let unit = unit(temp.path(), true);
        let config = SizeofConfig::default();
        let mut plan = plan(&unit, &config).unwrap();
        let invocation = Invocation {
            output: String::new(),
            work_dir: Some(WorkDir::new(&work, false)),
        };

        let text = read_header(&mut plan, invocation, &unit, &config).unwrap();

        assert_eq!(text, HEADER);
        assert!(!work.exists());
    }

    #[test]
    fn test_missing_header_still_removes_work_dir() {
        let temp = TempDir::new().unwrap();
        let work = temp.path().join("work");
        fs::create_dir_all(&work).unwrap();

        let unit = unit(temp.path(), true);
        let config = SizeofConfig::default();
        let mut plan = plan(&unit, &config).unwrap();
        let invocation = Invocation {
            output: String::new(),
            work_dir: Some(WorkDir::new(&work, false)),
        };

        let err = read_header(&mut plan, invocation, &unit, &config).unwrap_err();

        assert!(matches!(err, ArtifactError::NotFound { .. }));
        assert!(!work.exists());
    }

    #[test]
    fn test_kept_work_dir_survives() {
        let temp = TempDir::new().unwrap();
        let work = temp.path().join("work");
        write(&work.join("b001/go_asm.h"), HEADER);

        let unit = unit(temp.path(), true);
        let config = SizeofConfig::default();
        let mut plan = plan(&unit, &config).unwrap();
        let invocation = Invocation {
            output: String::new(),
            work_dir: Some(WorkDir::new(&work, true)),
        };

        read_header(&mut plan, invocation, &unit, &config).unwrap();
        assert!(work.exists());
    }

    #[test]
    fn test_work_strategy_without_work_dir() {
        let temp = TempDir::new().unwrap();
        let unit = unit(temp.path(), true);
        let config = SizeofConfig::default();
        let mut plan = plan(&unit, &config).unwrap();
        let invocation = Invocation {
            output: String::new(),
            work_dir: None,
        };

        let err = read_header(&mut plan, invocation, &unit, &config).unwrap_err();
        assert_eq!(err.to_string(), "go build: cannot find work directory");
    }

    #[test]
    fn test_failed_removal_after_read_is_an_error() {
        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "permission denied");
        let err = settle(Ok(HEADER.to_string()), Err(denied), PathBuf::from("/tmp/go-build7"))
            .unwrap_err();

        assert!(matches!(err, ArtifactError::Cleanup { .. }));
        assert_eq!(err.to_string(), "removing /tmp/go-build7: permission denied");
    }

    #[test]
    fn test_read_failure_outranks_removal_failure() {
        let read = Err(ArtifactError::MissingHeaderFile);
        let busy = io::Error::new(io::ErrorKind::Other, "busy");
        let err = settle(read, Err(busy), PathBuf::from("/tmp/x.h")).unwrap_err();
        assert!(matches!(err, ArtifactError::MissingHeaderFile));

        let text = settle(Ok(HEADER.to_string()), Ok(()), PathBuf::from("/tmp/x.h")).unwrap();
        assert_eq!(text, HEADER);
    }

    #[test]
    fn test_read_explicit_file_removes_it() {
        let temp = TempDir::new().unwrap();
        let unit = unit(temp.path(), false);
        let config = SizeofConfig::default();
        let mut plan = plan(&unit, &config).unwrap();
        let header = plan.header_path().unwrap().to_path_buf();
        fs::write(&header, HEADER).unwrap();

        let invocation = Invocation {
            output: String::new(),
            work_dir: None,
        };
        let text = read_header(&mut plan, invocation, &unit, &config).unwrap();

        assert_eq!(text, HEADER);
        assert!(!header.exists());
        assert!(plan.header_path().is_none());
    }
}
