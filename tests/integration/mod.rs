//! Integration tests for the library pipeline and the bundled patch sets.

mod pipeline;
mod raydium_patch_set;
