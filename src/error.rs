use std::{error::Error, fmt};

use backtrace::Backtrace;
use log::debug;

#[derive(Debug)]
pub struct TinyError {
    details: String,
}

impl TinyError {
    pub fn new(msg: &str) -> TinyError {
        TinyError {
            details: msg.to_string(),
        }
    }

    pub fn show_backtrace(&self) {
        debug!("{}\n{:?}", self.details, Backtrace::new());
    }
}

impl fmt::Display for TinyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.details)
    }
}

impl Error for TinyError {}
