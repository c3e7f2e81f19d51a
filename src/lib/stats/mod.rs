pub mod movavg;
pub mod rate;
