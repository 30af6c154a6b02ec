pub mod assembly;
pub mod config;
pub mod error;
pub mod estimate;
pub mod external;
pub mod fragment;
pub mod io;
pub mod junction;
pub mod matches;
pub mod mismatch;
pub mod node;
pub mod plan;
pub mod primer;
pub mod seq;
pub mod synth;

pub use assembly::{search, Assembly, SearchOutcome};
pub use config::Config;
pub use error::{ConfigError, DefragError};
pub use fragment::{Fragment, FragmentKind};
pub use matches::Match;
pub use node::Node;
pub use plan::{prepare, Planner};
