//! Search backend client.
//!
//! Connects the query compiler to a live index backend over HTTP: a
//! [`Connection`] loads handler specifications through a
//! [`SpecRegistry`](helio_spec::SpecRegistry), compiles user input with
//! [`helio_query`], and dispatches select/update/terms/browse requests,
//! post-processing responses (error sniffing, highlighting re-assembly,
//! term reshaping) before returning them.
//!
//! # Example
//!
//! ```no_run
//! use helio::{BackendConfig, Connection, SearchOptions};
//! use helio_spec::SpecRegistry;
//!
//! let config = BackendConfig::new("http://localhost:8983/solr", "biblio");
//! let registry = SpecRegistry::new("conf/searchspecs.yaml");
//! let conn = Connection::new(config, registry)?;
//! conn.ping()?;
//!
//! let options = SearchOptions::new("dogs").with_handler("Title");
//! let results = conn.search(&options)?;
//! println!("{}", results["response"]["numFound"]);
//! # Ok::<(), helio::BackendError>(())
//! ```

#![warn(missing_docs)]

mod config;
mod connection;
mod error;
mod executor;
mod params;
mod process;
mod shards;
mod sort;
mod xml;

pub use config::BackendConfig;
pub use connection::{Connection, FacetOptions, SearchOptions};
pub use error::BackendError;
pub use executor::{HttpMethod, RequestExecutor};
pub use params::ParamList;
pub use shards::ShardFilter;
pub use sort::normalize_sort;
pub use xml::{delete_xml, save_xml};
