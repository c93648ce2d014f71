pub mod auth;
pub mod customer;
pub mod machine;
pub mod shared;
pub mod storage;
