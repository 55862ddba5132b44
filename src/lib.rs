pub mod credentials;
pub mod step;
pub mod template;
