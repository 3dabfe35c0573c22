//! Configuration section definitions.
//!
//! Each module corresponds to a section in `wap.toml`:
//!
//! | Module     | TOML Section   | Purpose                                   |
//! |------------|----------------|-------------------------------------------|
//! | `frontend` | `[frontend]`   | Route tree, bundler command, build limits |
//! | `backend`  | `[backend]`    | Static dir, generated source, toolchain   |
//! | `serve`    | `[serve]`      | Live reload port, debounce, settle delay  |

mod backend;
mod frontend;
mod serve;

pub use backend::BackendConfig;
pub use frontend::FrontendConfig;
pub use serve::ServeConfig;
