//! Vision Transformer forward pass on a small ndarray tensor core.
//!
//! The crate builds the full ViT computational graph — patch embedding, cls
//! token, positional embedding, pre-norm encoder blocks, final norm and a
//! linear head — as forward-only tensor algebra. Gradients, optimizers and
//! data pipelines are out of scope; parameters are exposed through
//! [`nn::Module::parameters`] for an external training facility.

pub mod error;
pub mod models;
pub mod nn;
pub mod tensor;
