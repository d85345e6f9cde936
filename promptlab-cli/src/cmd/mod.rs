pub mod manifest;
pub mod plan;
pub mod progress;
pub mod run;
pub mod validate;
