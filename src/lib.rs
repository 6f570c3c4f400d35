//! Schema server: JSON:API and GraphQL endpoints derived at startup from a record schema, served
//! over any transactional record source, plus a per-type change feed.

pub mod case;
pub mod codec;
pub mod config;
pub mod error;
pub mod extractors;
pub mod feed;
pub mod graphql;
pub mod handlers;
pub mod operation;
pub mod record;
pub mod response;
pub mod routes;
pub mod schema;
pub mod server;
pub mod source;
pub mod state;

pub use codec::ResourceCodec;
pub use config::{load_schema_from_path, load_schema_from_str, ServerSettings};
pub use error::{AppError, ConfigError, SchemaError, SourceError};
pub use feed::{ChangeFeed, FeedEvent, MemoryPubSub, PubSub};
pub use operation::{Operation, Transform};
pub use record::{Identity, Linkage, Record};
pub use routes::{app, RouteTable};
pub use schema::Schema;
pub use server::Server;
pub use source::{MemorySource, RequestOptions, Source};
pub use state::AppState;
