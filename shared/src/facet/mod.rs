pub mod database_token;
pub mod error;
pub mod facet;
pub mod facet_kind;
pub mod facet_kinds;
pub mod identity;
pub mod network_identity;
