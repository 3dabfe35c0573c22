//! Backend source generation.
//!
//! The emitter turns the current page set into a route table the backend
//! compiles in. `wap_gen.go` is overwritten on every full cycle and must not
//! be edited by hand.

use std::fmt::Write as _;
use std::io;
use std::path::{Component, Path, PathBuf};

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::config::ProjectConfig;
use crate::embed::backend::{GoSourceVars, LIVE_RELOAD_HTML, LiveReloadVars, WAP_GEN_GO};
use crate::embed::go_escape;
use crate::page::Page;

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("failed to write `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("pages `{first}` and `{second}` are both served at `{url}`")]
    DuplicateUrl {
        url: String,
        first: String,
        second: String,
    },
}

/// Renders backend source from the page set.
///
/// `run` selects paths for a binary started from the backend directory
/// (`wap run`) rather than the project root (`wap build`). `dev` injects the
/// live reload client.
pub trait CodeEmitter {
    fn emit(&self, pages: &[Page], run: bool, dev: bool) -> Result<(), EmitError>;
}

/// Writes `registerWAPGen` for an httprouter-based Go backend.
#[derive(Debug, Clone)]
pub struct GoEmitter {
    output: PathBuf,
    root: PathBuf,
    backend_dir: PathBuf,
    static_dir: PathBuf,
    reload_port: u16,
}

impl GoEmitter {
    pub fn from_config(config: &ProjectConfig) -> Self {
        Self {
            output: config.backend.generated.clone(),
            root: config.root.clone(),
            backend_dir: config.backend.dir.clone(),
            static_dir: config.backend.static_dir.clone(),
            reload_port: config.serve.reload_port,
        }
    }

    /// Use the port the reload server actually bound.
    pub fn with_reload_port(mut self, port: u16) -> Self {
        self.reload_port = port;
        self
    }

    /// URL prefix the static directory is served under (`/build`).
    fn static_url(&self) -> String {
        let name = self
            .static_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "static".into());
        format!("/{name}")
    }

    /// Static directory as seen from the binary's working directory.
    fn static_root(&self, run: bool) -> String {
        let base = if run { &self.backend_dir } else { &self.root };
        match self.static_dir.strip_prefix(base) {
            Ok(rel) => slash_join(rel),
            Err(_) => self.static_dir.to_string_lossy().into_owned(),
        }
    }

    fn render(&self, pages: &[Page], run: bool, dev: bool) -> Result<String, EmitError> {
        let mut by_url: FxHashMap<&str, &Page> = FxHashMap::default();
        for page in pages {
            if let Some(first) = by_url.insert(&page.url_path, page) {
                return Err(EmitError::DuplicateUrl {
                    url: page.url_path.clone(),
                    first: first.id.clone(),
                    second: page.id.clone(),
                });
            }
        }

        let mut sorted: Vec<&Page> = pages.iter().collect();
        sorted.sort_by(|a, b| a.url_path.cmp(&b.url_path));

        let static_url = self.static_url();
        let mut routes = String::new();
        for page in sorted {
            let style = if page.style.is_some() {
                format!("{static_url}/{}.css", page.id)
            } else {
                String::new()
            };
            let _ = writeln!(
                routes,
                "\t\"{}\": {{title: \"{}\", script: \"{}\", style: \"{}\"}},",
                go_escape(&page.url_path),
                go_escape(&page.title),
                go_escape(&format!("{static_url}/{}.js", page.id)),
                go_escape(&style),
            );
        }

        let live_reload = if dev {
            LIVE_RELOAD_HTML.render(&LiveReloadVars {
                port: self.reload_port,
            })
        } else {
            String::new()
        };

        Ok(WAP_GEN_GO.render(&GoSourceVars {
            routes: &routes,
            static_url: &go_escape(&static_url),
            static_root: &go_escape(&self.static_root(run)),
            live_reload: &live_reload,
        }))
    }
}

impl CodeEmitter for GoEmitter {
    fn emit(&self, pages: &[Page], run: bool, dev: bool) -> Result<(), EmitError> {
        let source = self.render(pages, run, dev)?;
        let io_err = |source: io::Error| EmitError::Io {
            path: self.output.clone(),
            source,
        };

        if let Some(parent) = self.output.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(&self.output, source).map_err(io_err)?;

        crate::debug!("emit"; "wrote {} routes to {}", pages.len(), self.output.display());
        Ok(())
    }
}

/// Relative path with `/` separators, for paths embedded in source text.
fn slash_join(path: &Path) -> String {
    let parts: Vec<_> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy()),
            _ => None,
        })
        .collect();
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config_at;
    use crate::page::PageLayout;
    use tempfile::TempDir;

    fn page(config: &ProjectConfig, rel: &str, styled: bool) -> Page {
        let mut page = Page::new(
            config.frontend.routes.join(rel),
            Path::new(rel),
            &PageLayout::from_config(config),
        );
        if !styled {
            page.style = None;
        }
        page
    }

    #[test]
    fn test_emit_route_table() {
        let temp = TempDir::new().unwrap();
        let config = test_config_at(temp.path());
        let emitter = GoEmitter::from_config(&config);
        let pages = vec![
            page(&config, "index.svelte", true),
            page(&config, "about.svelte", false),
        ];

        emitter.emit(&pages, true, false).unwrap();
        let source = std::fs::read_to_string(&config.backend.generated).unwrap();

        assert!(source.contains("func registerWAPGen(r *httprouter.Router)"));
        assert!(source.contains(
            "\"/\": {title: \"Home\", script: \"/build/index.js\", style: \"/build/index.css\"},"
        ));
        assert!(source.contains(
            "\"/about\": {title: \"About\", script: \"/build/about.js\", style: \"\"},"
        ));
        assert!(source.contains("http.Dir(\"public/build\")"));
        assert!(!source.contains("WebSocket"));
        assert!(!source.contains("__WAP_"));
    }

    #[test]
    fn test_emit_build_mode_paths() {
        let temp = TempDir::new().unwrap();
        let config = test_config_at(temp.path());
        let emitter = GoEmitter::from_config(&config);

        let source = emitter.render(&[page(&config, "index.svelte", false)], false, false).unwrap();
        assert!(source.contains("http.Dir(\"backend/public/build\")"));
    }

    #[test]
    fn test_emit_dev_injects_live_reload() {
        let temp = TempDir::new().unwrap();
        let mut config = test_config_at(temp.path());
        config.serve.reload_port = 9123;
        let emitter = GoEmitter::from_config(&config);

        let source = emitter.render(&[page(&config, "index.svelte", false)], true, true).unwrap();
        assert!(source.contains("WebSocket"));
        assert!(source.contains(":9123"));
    }

    #[test]
    fn test_emit_rejects_duplicate_urls() {
        let temp = TempDir::new().unwrap();
        let config = test_config_at(temp.path());
        let emitter = GoEmitter::from_config(&config);
        let pages = vec![
            page(&config, "blog.svelte", false),
            page(&config, "blog/index.svelte", false),
        ];

        let err = emitter.emit(&pages, true, false).unwrap_err();
        assert!(matches!(err, EmitError::DuplicateUrl { ref url, .. } if url == "/blog"));
        assert!(!config.backend.generated.exists());
    }
}
