//! Page route - source file to URL and artifact mapping.
//!
//! Derivation is a pure function of the path relative to the route root:
//!
//! ```text
//! routes/index.svelte        name: index        url: /           id: index
//! routes/about.svelte        name: about        url: /about      id: about
//! routes/blog/index.svelte   name: blog/index   url: /blog       id: blog_index
//! routes/Blog/Post.svelte    name: Blog/Post    url: /blog/post  id: blog_post
//! ```

use std::path::{Component, Path, PathBuf};

/// Segment collapsed out of URL paths.
const INDEX_SEGMENT: &str = "index";

/// Names derived from a route file's path relative to the route root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteNames {
    /// Relative path without extension, `/`-separated on every platform.
    pub name: String,
    /// Lowercased name with `index` segments removed, always rooted at `/`.
    pub url_path: String,
    /// Lowercased name with separators flattened to `_`. Doubles as page id.
    pub artifact: String,
}

impl RouteNames {
    pub fn derive(relative: &Path) -> Self {
        let stem = relative.with_extension("");
        let segments: Vec<String> = stem
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();

        let name = segments.join("/");
        let lower: Vec<String> = segments.iter().map(|s| s.to_lowercase()).collect();

        let url_segments: Vec<&str> = lower
            .iter()
            .map(String::as_str)
            .filter(|s| *s != INDEX_SEGMENT)
            .collect();
        let url_path = format!("/{}", url_segments.join("/"));

        Self {
            name,
            url_path,
            artifact: lower.join("_"),
        }
    }
}

/// Where a page's artifacts and transient build inputs live.
#[derive(Debug, Clone)]
pub struct PageLayout {
    /// Bundler output directory served by the backend.
    pub static_dir: PathBuf,
    /// Root of the per-page transient input directories.
    pub tmp_dir: PathBuf,
}

impl PageLayout {
    pub fn from_config(config: &crate::config::ProjectConfig) -> Self {
        Self {
            static_dir: config.backend.static_dir.clone(),
            tmp_dir: config.tmp_dir(),
        }
    }
}

/// One discovered route of the frontend tree.
///
/// Rebuilt from scratch on every scan. The build coordinator only ever
/// clears `style` when the bundler emitted no stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Unique identifier (the flattened artifact name).
    pub id: String,
    pub name: String,
    pub title: String,
    pub url_path: String,
    pub source: PathBuf,
    /// `<static_dir>/<id>.js`
    pub script: PathBuf,
    /// `<static_dir>/<id>.css`, `None` when no stylesheet was produced
    pub style: Option<PathBuf>,
    /// Generated entry stub (`<tmp>/<id>/<id>.js`)
    pub entry: PathBuf,
    /// Generated bundler script (`<tmp>/<id>/build.js`)
    pub build_script: PathBuf,
}

impl Page {
    pub fn new(source: PathBuf, relative: &Path, layout: &PageLayout) -> Self {
        let RouteNames {
            name,
            url_path,
            artifact: id,
        } = RouteNames::derive(relative);

        let work_dir = layout.tmp_dir.join(&id);
        Self {
            title: title_of(&name),
            script: layout.static_dir.join(format!("{id}.js")),
            style: Some(layout.static_dir.join(format!("{id}.css"))),
            entry: work_dir.join(format!("{id}.js")),
            build_script: work_dir.join("build.js"),
            source,
            name,
            url_path,
            id,
        }
    }

    /// Directory holding this page's transient build inputs.
    pub fn work_dir(&self) -> &Path {
        self.build_script.parent().unwrap_or(&self.build_script)
    }

    /// Expected stylesheet path, whether or not it was produced.
    pub fn style_target(&self) -> PathBuf {
        self.script.with_extension("css")
    }

    /// Artifact file names this page owns in the static directory.
    pub fn artifact_names(&self) -> [String; 2] {
        [format!("{}.js", self.id), format!("{}.css", self.id)]
    }
}

/// Human-readable title: last meaningful segment, first letter uppercased.
fn title_of(name: &str) -> String {
    let segment = name
        .rsplit('/')
        .find(|s| !s.eq_ignore_ascii_case(INDEX_SEGMENT))
        .unwrap_or("Home");
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
