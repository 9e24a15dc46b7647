pub mod actions;
pub mod context;
pub mod location;
pub mod path;
pub mod router;
pub mod routes;
pub mod surface;
pub mod views;
pub mod vm;

pub use actions::ActionError;
pub use context::AppContext;
pub use location::{BrowserLocation, NavSignal};
pub use path::normalize_path;
pub use router::{RouteOutcome, Router};
pub use routes::{Page, RouteEntry, RouteTable, RouteTableError};
pub use surface::{RouteState, Surface};
