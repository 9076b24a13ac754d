mod check;
mod replay;

pub use check::cmd_check;
pub use replay::cmd_replay;
