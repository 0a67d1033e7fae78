//! 应用层

pub mod catalog;
pub mod pages;
