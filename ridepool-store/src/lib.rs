pub mod app_config;
pub mod memory;
pub mod postgres;
pub mod sms;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use sms::NocSmsGateway;
