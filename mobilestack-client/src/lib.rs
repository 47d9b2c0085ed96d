//! Table client for MobileStack.
//!
//! Talks to a hosted mobile service's table API over HTTP/JSON:
//! - [`MobileService`]: entry point; config, transport, signed-in user, worker pool
//! - [`Table`]: typed insert/update/delete/select for one entity type
//! - [`Query`]: fluent filter, paging and ordering compiled into the select URL
//! - [`dispatch`]: worker pool and the contexts async completions run on
//!
//! ```no_run
//! use mobilestack_client::{MobileService, ServiceConfig};
//! # use mobilestack_model::{Declaration, TableEntity};
//! # #[derive(Debug, Default)]
//! # struct Listing { id: i32, bedrooms: i32 }
//! # impl TableEntity for Listing {
//! #     fn declare() -> Declaration<Self> {
//! #         Declaration::<Self>::new()
//! #             .table("listing")
//! #             .key("id", |l| &l.id, |l| &mut l.id)
//! #             .column("bedrooms", |l| &l.bedrooms, |l| &mut l.bedrooms)
//! #     }
//! # }
//!
//! # fn main() -> mobilestack_client::ClientResult<()> {
//! let service = MobileService::new(ServiceConfig::new(
//!     "https://rentahome.azure-mobile.net",
//!     "application-key",
//! ))?;
//! let listings = service.table::<Listing>()?;
//!
//! let mut listing = Listing { bedrooms: 2, ..Default::default() };
//! listings.insert(&mut listing)?;
//!
//! let two_bedrooms = listings.query().equal("bedrooms", 2).select()?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod decorator;
pub mod dispatch;
pub mod error;
pub mod query;
pub mod service;
pub mod table;
pub mod transport;

pub use auth::{AuthProvider, User, parse_login_redirect};
pub use config::ServiceConfig;
pub use decorator::{APPLICATION_KEY_HEADER, AUTH_HEADER, RequestDecorator};
pub use dispatch::{EventLoop, ExecutionContext, LoopHandle, Pending, WorkerPool, event_loop};
pub use error::{
    AuthError, ClientError, ClientResult, ErrorKind, Operation, OperationError, QueryError,
    QueryResult, TransportError,
};
pub use query::{Comparison, Query, QueryValue};
pub use service::MobileService;
pub use table::Table;
pub use transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport};
