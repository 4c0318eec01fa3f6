pub mod agent;
pub mod errors;
pub mod invoker;
pub mod models;
pub mod prompt_template;
pub mod providers;
pub mod sanitize;
pub mod transport;
