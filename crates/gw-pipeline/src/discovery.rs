//! Turning command-line inputs into sample sources.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use gw_core::{DatasetDiscovery, Error, Result, SampleSource};

/// How to interpret the inputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// Inputs are list files rather than globs or patterns
    pub input_list: bool,
    /// Inputs are grid dataset patterns
    pub input_grid: bool,
    /// Each file is a sample of its own
    pub flat_layout: bool,
}

/// Discover samples for `inputs`. Grid mode needs `grid`.
pub fn discover(
    inputs: &[String],
    opts: &DiscoveryOptions,
    grid: Option<&dyn DatasetDiscovery>,
) -> Result<Vec<SampleSource>> {
    let sources = match (opts.input_grid, opts.input_list) {
        (true, as_list) => {
            let grid = grid.ok_or_else(|| {
                Error::Setup("grid inputs need a catalog with replica information".into())
            })?;
            let mut patterns = Vec::new();
            for input in inputs {
                if as_list {
                    patterns.extend(read_list(Path::new(input))?);
                } else {
                    patterns.push(clean(input).to_string());
                }
            }
            let mut sources = Vec::new();
            for pattern in &patterns {
                let found = grid.resolve(pattern)?;
                if found.is_empty() {
                    tracing::warn!(pattern = %pattern, "no grid dataset matches");
                }
                sources.extend(found);
            }
            sources
        }
        (false, true) => inputs
            .iter()
            .map(|input| from_list_file(Path::new(clean(input)), opts.flat_layout))
            .collect::<Result<Vec<_>>>()?,
        (false, false) => {
            let mut sources = Vec::new();
            for input in inputs {
                sources.extend(scan(clean(input), opts.flat_layout)?);
            }
            sources
        }
    };
    tracing::info!(inputs = inputs.len(), samples = sources.len(), "samples discovered");
    Ok(sources)
}

/// Non-empty, non-comment lines of a list file.
pub fn read_list(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path).map_err(|e| {
        Error::Setup(format!("cannot read list file {}: {e}", path.display()))
    })?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Shells sometimes hand quoted globs through unchanged.
fn clean(input: &str) -> &str {
    input.trim().trim_matches(|c| c == '"' || c == '\'')
}

fn from_list_file(list: &Path, flat_layout: bool) -> Result<SampleSource> {
    let files: Vec<PathBuf> = read_list(list)?.into_iter().map(PathBuf::from).collect();
    let name = if flat_layout {
        files.first().and_then(|f| f.file_name()).map(|n| n.to_string_lossy().into_owned())
    } else {
        list.file_name().map(|n| {
            let n = n.to_string_lossy();
            n.strip_suffix(".list").unwrap_or(&n).to_string()
        })
    };
    let name = name.ok_or_else(|| {
        Error::Validation(format!("cannot name a sample from list {}", list.display()))
    })?;
    Ok(SampleSource::new(name, files))
}

fn scan(input: &str, flat_layout: bool) -> Result<Vec<SampleSource>> {
    let pattern = if Path::new(input).is_dir() {
        format!("{}/*.root*", input.trim_end_matches('/'))
    } else {
        input.to_string()
    };

    let paths = glob::glob(&pattern)
        .map_err(|e| Error::Validation(format!("bad input pattern '{pattern}': {e}")))?;
    let mut files = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "skipping unreadable path"),
        }
    }
    if files.is_empty() {
        tracing::warn!(pattern = %pattern, "input matched no files");
    }

    if flat_layout {
        return Ok(files
            .into_iter()
            .filter_map(|f| {
                let name = f.file_name()?.to_string_lossy().into_owned();
                Some(SampleSource::new(name, vec![f]))
            })
            .collect());
    }

    let mut by_dir: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    for file in files {
        // A bare `*.root` yields an empty parent: the working directory.
        let dir = match file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        by_dir.entry(dir).or_default().push(file);
    }
    Ok(by_dir
        .into_iter()
        .map(|(dir, files)| {
            let abs = fs::canonicalize(&dir).unwrap_or(dir);
            let name = abs.file_name().map(|n| n.to_string_lossy().into_owned());
            SampleSource::new(name.unwrap_or_else(|| abs.display().to_string()), files)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gw-discovery-{tag}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    fn layout(tag: &str) -> PathBuf {
        let root = tmp_dir(tag);
        for f in [
            "user.a.410000.ttbar.e3698_p1/f1.root",
            "user.a.410000.ttbar.e3698_p1/f2.root",
            "user.a.361106.Zee.e3601_p1/f1.root",
            "user.a.361106.Zee.e3601_p1/notes.txt",
        ] {
            touch(&root.join(f));
        }
        root
    }

    #[test]
    fn glob_groups_files_by_directory() {
        let root = layout("scan");
        let input = format!("{}/user.a.*/*.root", root.display());
        let mut sources = discover(&[input], &DiscoveryOptions::default(), None).unwrap();
        sources.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].name, "user.a.361106.Zee.e3601_p1");
        assert_eq!(sources[0].files.len(), 1);
        assert_eq!(sources[1].name, "user.a.410000.ttbar.e3698_p1");
        assert_eq!(sources[1].files.len(), 2);
    }

    #[test]
    fn flat_layout_makes_one_sample_per_file() {
        let root = tmp_dir("flat");
        touch(&root.join("user.a.410000.ttbar.e3698.root"));
        touch(&root.join("user.a.361106.Zee.e3601.root"));
        let opts = DiscoveryOptions { flat_layout: true, ..Default::default() };
        let input = format!("\"{}/*.root\"", root.display());
        let sources = discover(&[input], &opts, None).unwrap();
        assert_eq!(sources.len(), 2);
        assert!(sources.iter().all(|s| s.files.len() == 1 && s.name.ends_with(".root")));
    }

    #[test]
    fn pattern_without_directory_names_sample_after_working_directory() {
        // Cargo runs unit tests from the crate directory.
        let cwd = std::env::current_dir().unwrap();
        let expected = cwd.file_name().unwrap().to_string_lossy().into_owned();
        let sources =
            discover(&["Cargo.tom?".to_string()], &DiscoveryOptions::default(), None).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].name, expected);
        assert_eq!(sources[0].files, vec![PathBuf::from("Cargo.toml")]);
    }

    #[test]
    fn directory_input_scans_root_files() {
        let root = layout("dir");
        let input = root.join("user.a.361106.Zee.e3601_p1").display().to_string();
        let sources = discover(&[input], &DiscoveryOptions::default(), None).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].files.len(), 1);
    }

    #[test]
    fn list_file_names_the_sample() {
        let root = tmp_dir("list");
        let list = root.join("user.a.410000.ttbar.e3698_p1.list");
        fs::write(&list, "# produced by hand\n/data/a.root\n\n  /data/b.root  \n").unwrap();
        let opts = DiscoveryOptions { input_list: true, ..Default::default() };
        let sources = discover(&[list.display().to_string()], &opts, None).unwrap();
        assert_eq!(sources[0].name, "user.a.410000.ttbar.e3698_p1");
        assert_eq!(
            sources[0].files,
            vec![PathBuf::from("/data/a.root"), PathBuf::from("/data/b.root")]
        );

        let flat = DiscoveryOptions { flat_layout: true, ..opts };
        let sources = discover(&[list.display().to_string()], &flat, None).unwrap();
        assert_eq!(sources[0].name, "a.root");
    }

    #[test]
    fn grid_without_catalog_is_setup_error() {
        let opts = DiscoveryOptions { input_grid: true, ..Default::default() };
        let err = discover(&["user.a.*".to_string()], &opts, None).unwrap_err();
        assert!(matches!(err, Error::Setup(_)));
    }

    #[test]
    fn missing_list_file_is_setup_error() {
        let opts = DiscoveryOptions { input_list: true, ..Default::default() };
        let err = discover(&["/nonexistent/x.list".to_string()], &opts, None).unwrap_err();
        assert!(matches!(err, Error::Setup(_)));
    }
}
