#![allow(dead_code)]

pub mod env;
pub mod npz;
pub mod tree;
