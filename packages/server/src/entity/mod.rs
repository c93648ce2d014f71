pub mod customer;
pub mod machine;
