//! Data-source fetching and property-path resolution: the bridge between
//! externally-sourced facts (applications, lender configs, the
//! authorization matrix) and the dotted paths rules reference.

pub mod application;
pub mod bag;
pub mod error;
pub mod lender_configuration;
pub mod resolver;
pub mod source;
pub mod user_authorization_matrix;

pub use application::Application;
pub use bag::DataSourceBag;
pub use error::SourceError;
pub use lender_configuration::LenderConfiguration;
pub use resolver::DataSourceResolver;
pub use source::DataSource;
pub use user_authorization_matrix::UserAuthorizationMatrix;
