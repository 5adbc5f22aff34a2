pub mod bucket_counter;
pub mod share_store;
