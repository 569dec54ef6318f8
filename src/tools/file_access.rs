//! `safe_file_access`: read a dataset from the data directory and stage it in the sandbox.

use std::{
    fs,
    io::{BufRead, BufReader},
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tracing::debug;

use super::{string_arg, Tool};
use crate::sandbox::DockerSandbox;

pub struct FileAccessTool {
    data_dir: PathBuf,
    sandbox: Option<Arc<DockerSandbox>>,
    preview_rows: usize,
}

impl FileAccessTool {
    pub fn new(data_dir: impl Into<PathBuf>, preview_rows: usize) -> Self {
        Self { data_dir: data_dir.into(), sandbox: None, preview_rows }
    }

    /// Also copy every file read into this sandbox.
    pub fn with_sandbox(mut self, sandbox: Arc<DockerSandbox>) -> Self {
        self.sandbox = Some(sandbox);
        self
    }

    /// Resolve `filename` inside the data directory, refusing anything that could escape it.
    fn resolve(&self, filename: &str) -> Result<PathBuf> {
        let rel = Path::new(filename.trim());
        if rel.as_os_str().is_empty() {
            bail!("filename must not be empty");
        }
        for c in rel.components() {
            match c {
                Component::Normal(_) | Component::CurDir => {}
                _ => bail!("access denied: {} is outside the data directory", filename),
            }
        }
        let path = self.data_dir.join(rel);
        if !path.is_file() {
            bail!("file not found: {}", filename);
        }
        let root = self
            .data_dir
            .canonicalize()
            .with_context(|| format!("resolving {}", self.data_dir.display()))?;
        let real = path
            .canonicalize()
            .with_context(|| format!("resolving {}", path.display()))?;
        if !real.starts_with(&root) {
            bail!("access denied: {} is outside the data directory", filename);
        }
        Ok(real)
    }
}

#[async_trait]
impl Tool for FileAccessTool {
    fn name(&self) -> &str {
        "safe_file_access"
    }

    fn description(&self) -> &str {
        "Read a data file by name from the data directory, make it available to the code \
         sandbox, and return its header and leading rows."
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "filename": {
                    "type": "string",
                    "description": "Name of the file inside the data directory, e.g. traffic_accidents.csv"
                }
            },
            "required": ["filename"],
            "additionalProperties": false
        })
    }

    async fn call(&self, args: serde_json::Value) -> Result<String> {
        let filename = string_arg(&args, "filename")?;
        let path = self.resolve(filename)?;
        debug!(path = %path.display(), "reading data file");

        let staged = match &self.sandbox {
            Some(sb) => {
                if !sb.is_running().await {
                    bail!("sandbox container '{}' is not running", sb.container());
                }
                Some(sb.copy_in(&path).await?)
            }
            None => None,
        };

        let preview = csv_preview(&path, self.preview_rows)?;
        let mut out = String::new();
        if let Some(target) = staged {
            out.push_str(&format!("The file is available in the sandbox at {}\n\n", target));
        }
        out.push_str(&preview);
        Ok(out)
    }
}

/// Header, the first `rows` data rows, and the total data-row count.
pub fn csv_preview(path: &Path, rows: usize) -> Result<String> {
    let file = fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut lines = BufReader::new(file).lines();

    let header = match lines.next() {
        Some(h) => h.with_context(|| format!("reading {}", path.display()))?,
        None => bail!("{} is empty", path.display()),
    };

    let mut shown = Vec::with_capacity(rows);
    let mut total = 0usize;
    for line in lines {
        let line = line.with_context(|| format!("reading {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        if shown.len() < rows {
            shown.push(line);
        }
        total += 1;
    }

    let columns = header.split(',').count();
    let mut out = format!(
        "File: {}\nColumns ({}): {}\nData rows: {}\n\nFirst {} rows:\n{}\n",
        path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default(),
        columns,
        header,
        total,
        shown.len(),
        header
    );
    for row in shown {
        out.push_str(&row);
        out.push('\n');
    }
    Ok(out)
}
