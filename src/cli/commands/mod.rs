//! Command implementations, one module per subcommand.

pub mod check;
pub mod encrypt;
pub mod generate_key;
pub mod rotate;
pub mod rotate_all;
pub mod status;
