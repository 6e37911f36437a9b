pub mod action;
pub mod cache;
pub mod model;
pub mod pool;
pub mod validation;

pub use cache::TransactionCache;
pub use model::{
    Action, AddressInfo, NodeType, Role, SignedTransaction, StatInfo, StatItem, Transaction,
    Transfer,
};
pub use pool::TransactionPool;
pub use validation::{check_admission_window, check_block_window, check_signed_transaction};
