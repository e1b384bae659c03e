//! Mobile-device presentation for capture pages

pub mod scripts;

pub use scripts::{
    mobile_headers, ANTI_AUTOMATION_SCRIPT, MOBILE_EMULATION_SCRIPT, MOBILE_USER_AGENT,
};
