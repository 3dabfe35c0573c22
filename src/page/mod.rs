//! Pages discovered in the frontend route tree.

mod route;
mod scan;

pub use route::{Page, PageLayout, RouteNames};
pub use scan::{ScanError, scan_routes};
