//! A proof-of-stake style chain node: stake-weighted block production,
//! heaviest-chain fork choice and header-first synchronization.

pub mod api;
pub mod blockchain;
pub mod config;
pub mod consensus;
pub mod error;
pub mod message;
pub mod node;
pub mod peers;
pub mod state;
pub mod storage;
pub mod sync;
pub mod transaction;
pub mod wallet;

pub use config::{ChainConfig, NodeConfig};
pub use error::{ChainError, Result};
pub use message::{Message, Outgoing, PeerId};
pub use node::Node;
