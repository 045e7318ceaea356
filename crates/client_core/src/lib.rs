//! Client-side engine for leave requests: a cached view of the requests
//! ([`RequestStore`]) kept in step with a remote authority by [`LeaveClient`].

pub mod config;
pub mod credentials;
pub mod error;
pub mod http;
pub mod remote;
pub mod store;
pub mod sync;

pub use config::{load_settings, ClientSettings};
pub use credentials::{Anonymous, CredentialProvider, StaticToken};
pub use error::{LeaveError, RemoteError, SynchronizationError};
pub use http::HttpRemoteAuthority;
pub use remote::{MissingRemoteAuthority, RemoteAuthority, RemoteResult};
pub use store::{RequestStore, StoreEvent, StoreSnapshot, UpsertOutcome};
pub use sync::{LeaveClient, LeaveResult};
