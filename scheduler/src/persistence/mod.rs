pub mod gateway;

pub use gateway::PersistenceGateway;
