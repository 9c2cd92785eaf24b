mod auth;
mod client;
mod functions;
mod realtime;
mod rowbase_url;
mod storage;

pub mod domain;

pub use auth::*;
pub use client::*;
pub use functions::*;
pub use realtime::*;
pub use rowbase_url::RowbaseUrl;
