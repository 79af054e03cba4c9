#![allow(dead_code)]

pub mod faulty_engine;
pub mod synthetic_image;
