//! GitHub repository fetch, search, and read
//!
//! Repositories are shallow-cloned into a local cache directory keyed by
//! repository name. The cache is shared state owned by [`RepoCache`]; agents
//! only ever see it through the three tools below.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::{fs, process::Command};
use walkdir::{DirEntry, WalkDir};

use super::{required_str, Tool, ToolError};

/// Directories never indexed or searched
const SKIP_DIRS: &[&str] = &[".git", "node_modules", "__pycache__", ".next", "build", "dist", "target"];

/// Search results are truncated to this many matches
const MAX_MATCHES: usize = 200;

/// Files larger than this are not searched
const MAX_SEARCH_FILE_BYTES: u64 = 1024 * 1024;

const DEFAULT_CLONE_TIMEOUT: Duration = Duration::from_secs(120);

/// Manifest files and the ecosystem they indicate
const MANIFESTS: &[(&str, &str)] = &[
    ("package.json", "Node.js/JavaScript"),
    ("pom.xml", "Java/Maven"),
    ("build.gradle", "Java/Gradle"),
    ("requirements.txt", "Python"),
    ("Gemfile", "Ruby"),
    ("go.mod", "Go"),
    ("Cargo.toml", "Rust"),
];

/// npm dependency name and the framework it indicates
const NPM_FRAMEWORKS: &[(&str, &str)] = &[
    ("react", "React"),
    ("next", "Next.js"),
    ("vue", "Vue.js"),
    ("angular", "Angular"),
];

/// Outcome of a successful clone
#[derive(Debug, Clone, Serialize)]
pub struct ClonedRepo {
    pub repo_name: String,
    pub repo_url: String,
    pub branch: String,
    pub local_path: PathBuf,
}

/// File statistics of a cloned repository
#[derive(Debug, Clone, Default, Serialize)]
pub struct RepoIndex {
    pub total_files: usize,
    pub files_by_type: BTreeMap<String, usize>,
    pub directories: Vec<String>,
    pub tech_stack: TechStack,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TechStack {
    pub languages: BTreeSet<String>,
    pub frameworks: BTreeSet<String>,
    pub dependencies: BTreeMap<String, Vec<String>>,
}

/// A single line matching a search term
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchMatch {
    pub file: String,
    pub line: usize,
    pub content: String,
}

/// Local clone cache
#[derive(Debug, Clone)]
pub struct RepoCache {
    root: PathBuf,
    clone_timeout: Duration,
}

impl RepoCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            clone_timeout: DEFAULT_CLONE_TIMEOUT,
        }
    }

    pub fn with_clone_timeout(mut self, timeout: Duration) -> Self {
        self.clone_timeout = timeout;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Local path of a cached repository, if it has been fetched
    pub fn repo_path(&self, repo_name: &str) -> Result<PathBuf, ToolError> {
        if !is_plain_name(repo_name) {
            return Err(ToolError::InvalidInput(format!("bad repository name '{}'", repo_name)));
        }
        let path = self.root.join(repo_name);
        if path.is_dir() {
            Ok(path)
        } else {
            Err(ToolError::RepoNotFound(repo_name.to_string()))
        }
    }

    /// Shallow-clone `repo_url`, replacing any previous clone of the same name
    ///
    /// When `branch` is `main` and the clone fails, `master` is tried next.
    pub async fn clone_repo(&self, repo_url: &str, branch: &str) -> Result<ClonedRepo, ToolError> {
        if repo_url.starts_with('-') {
            return Err(ToolError::InvalidInput(format!("'{}' is not a repository URL", repo_url)));
        }
        let repo_name = repo_name_from_url(repo_url)
            .ok_or_else(|| ToolError::InvalidInput(format!("cannot derive repository name from '{}'", repo_url)))?;
        let local_path = self.root.join(&repo_name);
        fs::create_dir_all(&self.root).await?;

        let mut branches = vec![branch.to_string()];
        if branch == "main" {
            branches.push("master".to_string());
        }

        let mut last_error = None;
        for candidate in branches {
            if fs::try_exists(&local_path).await? {
                fs::remove_dir_all(&local_path).await?;
            }

            tracing::info!(repo_url, branch = %candidate, path = %local_path.display(), "cloning repository");
            match self.git_clone(repo_url, &candidate, &local_path).await {
                Ok(()) => {
                    return Ok(ClonedRepo {
                        repo_name,
                        repo_url: repo_url.to_string(),
                        branch: candidate,
                        local_path,
                    })
                }
                Err(e) => {
                    tracing::warn!(repo_url, branch = %candidate, error = %e, "clone failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ToolError::Command("git clone was not attempted".to_string())))
    }

    async fn git_clone(&self, repo_url: &str, branch: &str, dest: &Path) -> Result<(), ToolError> {
        let output = Command::new("git")
            .args(["clone", "--depth", "1", "--branch", branch, "--", repo_url])
            .arg(dest)
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.clone_timeout, output)
            .await
            .map_err(|_| ToolError::Timeout(self.clone_timeout))??;

        if output.status.success() {
            Ok(())
        } else {
            Err(ToolError::Command(format!(
                "git clone failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }

    /// Index a fetched repository
    pub async fn index(&self, repo_name: &str) -> Result<RepoIndex, ToolError> {
        let path = self.repo_path(repo_name)?;
        tokio::task::spawn_blocking(move || index_tree(&path))
            .await
            .map_err(|e| ToolError::Command(format!("indexing task failed: {}", e)))?
    }

    /// Case-insensitive line search across a fetched repository
    pub async fn search(&self, repo_name: &str, term: &str) -> Result<Vec<SearchMatch>, ToolError> {
        let path = self.repo_path(repo_name)?;
        let term = term.to_lowercase();
        tokio::task::spawn_blocking(move || Ok(search_tree(&path, &term)))
            .await
            .map_err(|e| ToolError::Command(format!("search task failed: {}", e)))?
    }

    /// Read a file relative to a fetched repository's root
    pub async fn read(&self, repo_name: &str, file_path: &str) -> Result<String, ToolError> {
        let root = self.repo_path(repo_name)?;
        let relative = Path::new(file_path);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(ToolError::InvalidInput(format!(
                "path '{}' must stay inside the repository",
                file_path
            )));
        }

        let full = root.join(relative);
        match fs::read(&full).await {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ToolError::NotFound(format!("{}/{}", repo_name, file_path)))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Last path segment of a repository URL without `.git`
pub fn repo_name_from_url(repo_url: &str) -> Option<String> {
    let name = repo_url.trim().trim_end_matches('/').rsplit('/').next()?;
    let name = name.strip_suffix(".git").unwrap_or(name);
    is_plain_name(name).then(|| name.to_string())
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

fn is_skipped(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|name| SKIP_DIRS.contains(&name))
            .unwrap_or(false)
}

fn relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn index_tree(root: &Path) -> Result<RepoIndex, ToolError> {
    let mut index = RepoIndex::default();

    for entry in WalkDir::new(root).into_iter().filter_entry(|e| !is_skipped(e)) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(error = %e, "skipping unreadable entry");
                continue;
            }
        };

        if entry.file_type().is_dir() {
            if entry.depth() == 1 {
                index.directories.push(relative(root, entry.path()));
            }
            continue;
        }

        let ext = entry
            .path()
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_else(|| "no_extension".to_string());
        *index.files_by_type.entry(ext).or_default() += 1;
        index.total_files += 1;
    }

    index.directories.sort();
    index.tech_stack = detect_tech_stack(root);
    Ok(index)
}

fn detect_tech_stack(root: &Path) -> TechStack {
    let mut stack = TechStack::default();

    for (file, tech) in MANIFESTS {
        if root.join(file).is_file() {
            stack.languages.insert(tech.to_string());
        }
    }

    let package_json = std::fs::read_to_string(root.join("package.json"))
        .ok()
        .and_then(|raw| serde_json::from_str::<Value>(&raw).ok());
    if let Some(deps) = package_json
        .as_ref()
        .and_then(|pkg| pkg.get("dependencies"))
        .and_then(Value::as_object)
    {
        stack
            .dependencies
            .insert("npm".to_string(), deps.keys().cloned().collect());
        for (dep, framework) in NPM_FRAMEWORKS {
            if deps.contains_key(*dep) {
                stack.frameworks.insert(framework.to_string());
            }
        }
    }

    stack
}

fn search_tree(root: &Path, term_lower: &str) -> Vec<SearchMatch> {
    let mut matches = Vec::new();

    let files = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_skipped(e))
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.metadata().map(|m| m.len() <= MAX_SEARCH_FILE_BYTES).unwrap_or(false));

    for entry in files {
        let Ok(bytes) = std::fs::read(entry.path()) else {
            continue;
        };
        let text = String::from_utf8_lossy(&bytes);
        for (idx, line) in text.lines().enumerate() {
            if line.to_lowercase().contains(term_lower) {
                matches.push(SearchMatch {
                    file: relative(root, entry.path()),
                    line: idx + 1,
                    content: line.trim().to_string(),
                });
                if matches.len() >= MAX_MATCHES {
                    return matches;
                }
            }
        }
    }

    matches
}

/// Tool: fetch_github_repository
pub struct FetchRepoTool {
    cache: Arc<RepoCache>,
}

impl FetchRepoTool {
    pub fn new(cache: Arc<RepoCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl Tool for FetchRepoTool {
    fn name(&self) -> &str {
        "fetch_github_repository"
    }

    fn description(&self) -> &str {
        "Clone and index a GitHub repository. Provide the full GitHub URL (e.g. https://github.com/user/repo)."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "repo_url": {"type": "string", "description": "Full repository URL"},
                "branch": {"type": "string", "description": "Branch to clone (default: main)"}
            },
            "required": ["repo_url"]
        })
    }

    async fn call(&self, input: Value) -> Result<String, ToolError> {
        let repo_url = required_str(&input, "repo_url")?;
        let branch = input.get("branch").and_then(Value::as_str).unwrap_or("main");

        let cloned = self.cache.clone_repo(repo_url, branch).await?;
        let index = self.cache.index(&cloned.repo_name).await?;

        let summary = json!({
            "repo_name": cloned.repo_name,
            "repo_url": cloned.repo_url,
            "branch": cloned.branch,
            "index": index,
        });
        Ok(serde_json::to_string_pretty(&summary).unwrap_or_else(|_| summary.to_string()))
    }
}

/// Tool: search_in_codebase
pub struct SearchCodebaseTool {
    cache: Arc<RepoCache>,
}

impl SearchCodebaseTool {
    pub fn new(cache: Arc<RepoCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl Tool for SearchCodebaseTool {
    fn name(&self) -> &str {
        "search_in_codebase"
    }

    fn description(&self) -> &str {
        "Search for a term in a fetched codebase. Returns file, line number, and matching line."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "repo_name": {"type": "string"},
                "search_term": {"type": "string"}
            },
            "required": ["repo_name", "search_term"]
        })
    }

    async fn call(&self, input: Value) -> Result<String, ToolError> {
        let repo_name = required_str(&input, "repo_name")?;
        let term = required_str(&input, "search_term")?;

        let matches = self.cache.search(repo_name, term).await?;
        Ok(serde_json::to_string_pretty(&matches).unwrap_or_else(|_| "[]".to_string()))
    }
}

/// Tool: read_code_file
pub struct ReadCodeFileTool {
    cache: Arc<RepoCache>,
}

impl ReadCodeFileTool {
    pub fn new(cache: Arc<RepoCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl Tool for ReadCodeFileTool {
    fn name(&self) -> &str {
        "read_code_file"
    }

    fn description(&self) -> &str {
        "Read a file from a fetched codebase. Provide repo_name and the path relative to the repository root."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "repo_name": {"type": "string"},
                "file_path": {"type": "string"}
            },
            "required": ["repo_name", "file_path"]
        })
    }

    async fn call(&self, input: Value) -> Result<String, ToolError> {
        let repo_name = required_str(&input, "repo_name")?;
        let file_path = required_str(&input, "file_path")?;
        self.cache.read(repo_name, file_path).await
    }
}
