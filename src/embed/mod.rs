//! Embedded text templates.
//!
//! # Module Structure
//!
//! - `template` - Template types for typed variable injection
//! - `bundle` - Per-page bundler inputs (build.js, entry stub)
//! - `backend` - Generated backend source and the live reload snippet
//!
//! # Usage
//!
//! ```ignore
//! use embed::bundle::{ENTRY_JS, EntryVars};
//!
//! let js = ENTRY_JS.render(&EntryVars { source: "/p/frontend/src/routes/about.svelte" });
//! ```

mod template;

pub use template::{Template, TemplateVars};

/// Escape text for a single-quoted JavaScript string literal.
fn js_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Escape text for a double-quoted Go string literal.
pub fn go_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

pub mod bundle {
    use super::{Template, TemplateVars, js_escape};

    /// Variables for build.js.
    pub struct BuildScriptVars<'a> {
        pub entry: &'a str,
        pub outfile: &'a str,
    }

    impl TemplateVars for BuildScriptVars<'_> {
        fn apply(&self, content: &str) -> String {
            content
                .replace("__WAP_ENTRY__", &js_escape(self.entry))
                .replace("__WAP_OUTFILE__", &js_escape(self.outfile))
        }
    }

    /// Bundler script invoked once per page.
    pub const BUILD_JS: Template<BuildScriptVars<'static>> =
        Template::new(include_str!("bundle/build.js"));

    /// Variables for the entry stub.
    pub struct EntryVars<'a> {
        pub source: &'a str,
    }

    impl TemplateVars for EntryVars<'_> {
        fn apply(&self, content: &str) -> String {
            content.replace("__WAP_SOURCE__", &js_escape(self.source))
        }
    }

    /// Entry point mounting the page component on `document.body`.
    pub const ENTRY_JS: Template<EntryVars<'static>> =
        Template::new(include_str!("bundle/entry.js"));
}

pub mod backend {
    use super::{Template, TemplateVars};

    /// Variables for the generated Go source.
    ///
    /// `routes` and `static_root` must already be Go-escaped.
    pub struct GoSourceVars<'a> {
        pub routes: &'a str,
        pub static_url: &'a str,
        pub static_root: &'a str,
        pub live_reload: &'a str,
    }

    impl TemplateVars for GoSourceVars<'_> {
        fn apply(&self, content: &str) -> String {
            content
                .replace("__WAP_ROUTES__", self.routes)
                .replace("__WAP_STATIC_URL__", self.static_url)
                .replace("__WAP_STATIC_ROOT__", self.static_root)
                // Raw string literal, a backtick would end it early
                .replace("__WAP_LIVE_RELOAD__", &self.live_reload.replace('`', ""))
        }
    }

    /// Route registration source written into the backend tree.
    pub const WAP_GEN_GO: Template<GoSourceVars<'static>> =
        Template::new(include_str!("backend/wap_gen.go"));

    /// Variables for the live reload snippet.
    pub struct LiveReloadVars {
        pub port: u16,
    }

    impl TemplateVars for LiveReloadVars {
        fn apply(&self, content: &str) -> String {
            content.replace("__WAP_RELOAD_PORT__", &self.port.to_string())
        }
    }

    /// Browser snippet reloading the page on `update`.
    pub const LIVE_RELOAD_HTML: Template<LiveReloadVars> =
        Template::new(include_str!("backend/livereload.html"));
}

#[cfg(test)]
mod tests {
    use super::backend::{LIVE_RELOAD_HTML, LiveReloadVars};
    use super::bundle::{BUILD_JS, BuildScriptVars, ENTRY_JS, EntryVars};
    use super::*;

    #[test]
    fn test_build_script_paths() {
        let js = BUILD_JS.render(&BuildScriptVars {
            entry: "/p/.wap/build/about/about.js",
            outfile: "/p/backend/public/build/about.js",
        });
        assert!(js.contains("entryPoints: ['/p/.wap/build/about/about.js']"));
        assert!(js.contains("outfile: '/p/backend/public/build/about.js'"));
        assert!(!js.contains("__WAP_"));
    }

    #[test]
    fn test_entry_escapes_windows_paths() {
        let js = ENTRY_JS.render(&EntryVars {
            source: r"C:\p\frontend\src\routes\it's.svelte",
        });
        assert!(js.contains(r"import Page from 'C:\\p\\frontend\\src\\routes\\it\'s.svelte';"));
    }

    #[test]
    fn test_live_reload_port() {
        let html = LIVE_RELOAD_HTML.render(&LiveReloadVars { port: 8081 });
        assert!(html.contains(":8081"));
        assert!(html.contains("'update'"));
        assert!(html.contains("ws.send('close')"));
    }

    #[test]
    fn test_go_escape() {
        assert_eq!(go_escape(r#"a"b\c"#), r#"a\"b\\c"#);
    }
}
