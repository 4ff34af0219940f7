// sealc — SEAL component compiler
//
// Library root. Turns a platform description and a parsed application into
// C sources for the target firmware.

pub mod branch;
pub mod cache;
pub mod codegen;
pub mod component;
pub mod diag;
pub mod id;
pub mod packet;
pub mod pass;
pub mod pipeline;
pub mod platform;
pub mod session;
pub mod usecase;
pub mod value;
pub mod virtual_component;
