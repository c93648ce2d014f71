
mod customer;
mod machine;
mod storage;
