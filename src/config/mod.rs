use std::{
    collections::HashMap,
    env,
    fs,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use directories::BaseDirs;

#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
    pub config_path: PathBuf,
}

impl Config {
    pub fn load() -> Self {
        Self::load_from(&default_config_path())
    }

    /// Defaults, then the rc file at `path` (if any), then the environment.
    pub fn load_from(path: &Path) -> Self {
        let mut map = default_map();

        if path.exists() {
            if let Ok(file) = fs::File::open(path) {
                merge_rc(&mut map, BufReader::new(file));
            }
        }

        // Overlay environment variables (take precedence)
        for (k, v) in env::vars() {
            if is_config_key(&k) {
                map.insert(k, v);
            }
        }

        Self { inner: map, config_path: path.to_path_buf() }
    }

    /// Build a config from explicit pairs on top of the defaults, ignoring rc file and env.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = default_map();
        for (k, v) in pairs {
            map.insert(k.into(), v.into());
        }
        Self { inner: map, config_path: PathBuf::new() }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).cloned()
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.parse::<usize>().ok())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.parse::<u64>().ok())
    }

    pub fn get_path(&self, key: &str) -> Option<PathBuf> {
        self.get(key).filter(|v| !v.trim().is_empty()).map(PathBuf::from)
    }
}

fn merge_rc<R: BufRead>(map: &mut HashMap<String, String>, reader: R) {
    for line in reader.lines().map_while(Result::ok) {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((k, v)) = line.split_once('=') {
            map.insert(k.trim().to_string(), v.trim().to_string());
        }
    }
}

fn is_config_key(k: &str) -> bool {
    // Accept known keys or AGENTIC_*/OPENAI_* for forward-compat
    const KEYS: &[&str] = &[
        "OPENAI_API_KEY",
        "API_BASE_URL",
        "REQUEST_TIMEOUT",
        "DEFAULT_MODEL",
        "PROJECT_ROOT",
        "SANDBOX_CONTAINER",
        "SANDBOX_DATA_DIR",
        "SANDBOX_PYTHON",
        "DOCKER_BIN",
        "EXEC_TIMEOUT",
        "MAX_TOOL_ROUNDS",
        "CSV_PREVIEW_ROWS",
        "PRETTIFY_MARKDOWN",
    ];

    KEYS.contains(&k) || k.starts_with("AGENTIC_") || k.starts_with("OPENAI_")
}

fn default_config_path() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    base.join("agentic_app").join(".agenticrc")
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();

    // Numbers
    m.insert("REQUEST_TIMEOUT".into(), "300".into());
    m.insert("EXEC_TIMEOUT".into(), "60".into());
    m.insert("MAX_TOOL_ROUNDS".into(), "5".into());
    m.insert("CSV_PREVIEW_ROWS".into(), "15".into());

    // Strings
    m.insert("DEFAULT_MODEL".into(), "gpt-4o".into());
    m.insert("API_BASE_URL".into(), "default".into());
    m.insert("SANDBOX_CONTAINER".into(), "sandbox".into());
    m.insert("SANDBOX_DATA_DIR".into(), "/home/sandboxuser/data".into());
    m.insert("SANDBOX_PYTHON".into(), "python".into());
    m.insert("DOCKER_BIN".into(), "docker".into());

    // Bools as strings
    m.insert("PRETTIFY_MARKDOWN".into(), "false".into());

    m
}
