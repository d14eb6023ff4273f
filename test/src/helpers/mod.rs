mod memory_authenticator;
mod memory_database;

pub use memory_authenticator::MemoryAuthenticator;
pub use memory_database::MemoryDatabase;
pub use packet_exchange::{connect_client, listen, run_ticks, TestClient};
