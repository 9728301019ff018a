mod assemble;
mod config;
mod counter;
mod sites;

pub use assemble::cmd_assemble;
pub use config::cmd_config;
pub use counter::{cmd_counter, cmd_counts};
pub use sites::{cmd_match, cmd_sites};
