pub mod account;
pub mod asset;
pub mod candle;
pub mod holding;
pub mod ledger;
pub mod loan;
pub mod market;
pub mod money;
pub mod tick;
pub mod trading;

pub use account::*;
pub use asset::*;
pub use candle::*;
pub use holding::*;
pub use ledger::*;
pub use loan::*;
pub use market::*;
pub use money::{Money, MAX_MONEY};
pub use tick::*;
pub use trading::*;
