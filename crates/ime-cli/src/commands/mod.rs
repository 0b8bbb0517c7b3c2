pub mod config_ops;
pub mod key_ops;
