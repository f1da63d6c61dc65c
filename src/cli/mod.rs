pub mod run;
pub mod validate;

pub use run::{cmd_run, RunArgs};
pub use validate::{cmd_validate, ValidateArgs};
