pub mod config;
pub mod env;
pub mod id;
pub mod inflight;
pub mod model;
pub mod persist;
pub mod store;

pub use config::EditorConfig;
pub use env::{Env, FixedEnv, SystemEnv};
pub use id::NodeId;
pub use inflight::{InFlight, InFlightGuard};
pub use model::*;
pub use persist::{KeyValueStore, MemoryStorage, PersistError, PersistedState};
pub use store::{ChartStore, ConnectError, Selection};
