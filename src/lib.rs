pub mod config;
pub mod crev;
pub mod deps;
pub mod draft;
pub mod error;
pub mod models;
pub mod proofs;
pub mod session;

pub use config::{Config, CrevConfig, ReviewDefaults};
pub use crev::{CargoCrev, Invocation, ToolOutput};
pub use deps::CrateListItem;
pub use draft::{parse_draft, serialize_draft};
pub use error::CrevError;
pub use models::*;
pub use proofs::{parse_package_identity, parse_review_record, parse_review_records, parse_review_score};
pub use session::{Page, Session, SetupStatus};
