mod generate_id;
mod init;
mod migrate;
mod report_cases;

pub use generate_id::cmd_generate_id;
pub use init::cmd_init;
pub use migrate::cmd_migrate;
pub use report_cases::{cmd_report_cases_add, cmd_report_cases_list};
