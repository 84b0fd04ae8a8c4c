#![allow(dead_code)]

pub mod audio;
pub mod bthf;
pub mod sapmsg;
pub mod tnhf;

pub use sapmsg::*;
