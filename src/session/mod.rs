pub mod auto_lock;
pub mod wallet_session;

pub use auto_lock::{AutoLockFired, AutoLockTimer, InactivityTimer};
pub use wallet_session::WalletSession;
