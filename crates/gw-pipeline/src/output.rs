//! Weight table serialization and checkpoint files.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use gw_core::{Error, Result, WeightTable};

/// On-disk format, chosen from the output extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty JSON, 4-space indent
    Json,
    /// YAML block style
    Yaml,
}

impl OutputFormat {
    /// `.yaml` / `.yml` select YAML, anything else JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
            Some("yaml" | "yml") => OutputFormat::Yaml,
            _ => OutputFormat::Json,
        }
    }

    /// Serialize a table; keys come out sorted at every level.
    pub fn render(self, table: &WeightTable) -> Result<Vec<u8>> {
        match self {
            OutputFormat::Json => {
                let mut buf = Vec::new();
                let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
                let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
                table.serialize(&mut ser)?;
                buf.push(b'\n');
                Ok(buf)
            }
            OutputFormat::Yaml => Ok(serde_yaml::to_string(table)?.into_bytes()),
        }
    }

    /// Parse a table previously written in this format.
    pub fn parse(self, bytes: &[u8]) -> Result<WeightTable> {
        match self {
            OutputFormat::Json => Ok(serde_json::from_slice(bytes)?),
            OutputFormat::Yaml => Ok(serde_yaml::from_slice(bytes)?),
        }
    }
}

/// Destination of the weight table, rewritten whole on every checkpoint.
#[derive(Debug, Clone)]
pub struct OutputFile {
    path: PathBuf,
    format: OutputFormat,
}

impl OutputFile {
    /// Output at `path`, format from its extension.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = OutputFormat::from_path(&path);
        Self { path, format }
    }

    /// Claim `path` for a new run: an existing file is an error unless
    /// `force`, in which case it is removed.
    pub fn create(path: impl Into<PathBuf>, force: bool) -> Result<Self> {
        let out = Self::new(path);
        if out.path.exists() {
            if !force {
                return Err(Error::Setup(format!(
                    "output {} already exists (use --force to overwrite)",
                    out.path.display()
                )));
            }
            tracing::info!(path = %out.path.display(), "removing existing output");
            fs::remove_file(&out.path)?;
        }
        Ok(out)
    }

    /// Output path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize `table` in this output's format.
    pub fn render(&self, table: &WeightTable) -> Result<Vec<u8>> {
        self.format.render(table)
    }

    /// Render and write `table`.
    pub fn write(&self, table: &WeightTable) -> Result<()> {
        let bytes = self.render(table)?;
        self.write_bytes(&bytes)
    }

    /// Replace the file atomically: write a sibling temporary, then rename.
    pub fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.temp_path();
        fs::write(&tmp, bytes)?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    /// Read the table currently on disk.
    pub fn read(&self) -> Result<WeightTable> {
        let bytes = fs::read(&self.path)?;
        self.format.parse(&bytes)
    }

    fn temp_path(&self) -> PathBuf {
        let name = self.path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        self.path.with_file_name(format!(".{name}.{}.tmp", std::process::id()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gw_core::{PhysicsConstants, WeightRecord};

    fn tmp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gw-output-{tag}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn table() -> WeightTable {
        let mut t = WeightTable::new();
        let physics =
            PhysicsConstants { cross_section: 696.11, filter_efficiency: 0.543, k_factor: 1.1949 };
        t.upsert("410000", WeightRecord::new(4200.0, vec![], physics));
        t.upsert("361106", WeightRecord::new(0.0, vec!["/data/x.root".into()], Default::default()));
        t
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(OutputFormat::from_path(Path::new("w.yaml")), OutputFormat::Yaml);
        assert_eq!(OutputFormat::from_path(Path::new("w.YML")), OutputFormat::Yaml);
        assert_eq!(OutputFormat::from_path(Path::new("w.json")), OutputFormat::Json);
        assert_eq!(OutputFormat::from_path(Path::new("weights")), OutputFormat::Json);
    }

    #[test]
    fn json_is_indented_and_sorted() {
        let text = String::from_utf8(OutputFormat::Json.render(&table()).unwrap()).unwrap();
        let expected = r#"{
    "361106": {
        "cross section": -1.0,
        "errors": [
            "/data/x.root"
        ],
        "filter efficiency": -1.0,
        "k-factor": -1.0,
        "num events": 0.0
    },
    "410000": {
        "cross section": 696.11,
        "errors": [],
        "filter efficiency": 0.543,
        "k-factor": 1.1949,
        "num events": 4200.0
    }
}
"#;
        assert_eq!(text, expected);
    }

    #[test]
    fn yaml_reads_back() {
        let bytes = OutputFormat::Yaml.render(&table()).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.find("361106").unwrap() < text.find("410000").unwrap());
        assert!(text.contains("num events: 4200.0"));
        assert_eq!(OutputFormat::Yaml.parse(&bytes).unwrap(), table());
    }

    #[test]
    fn existing_output_needs_force() {
        let dir = tmp_dir("force");
        let path = dir.join("weights.json");
        fs::write(&path, "{}").unwrap();

        assert!(matches!(OutputFile::create(&path, false), Err(Error::Setup(_))));
        assert!(path.exists());

        let out = OutputFile::create(&path, true).unwrap();
        assert!(!path.exists());
        out.write(&table()).unwrap();
        assert_eq!(out.read().unwrap(), table());
    }

    #[test]
    fn write_leaves_no_temporary_behind() {
        let dir = tmp_dir("atomic");
        let out = OutputFile::new(dir.join("nested").join("weights.yml"));
        out.write(&table()).unwrap();
        out.write(&WeightTable::new()).unwrap();
        let names: Vec<_> =
            fs::read_dir(dir.join("nested")).unwrap().map(|e| e.unwrap().file_name()).collect();
        assert_eq!(names, vec![std::ffi::OsString::from("weights.yml")]);
        assert!(out.read().unwrap().is_empty());
    }
}
