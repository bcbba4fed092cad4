pub mod cache;
pub mod rpc;
pub mod session;
