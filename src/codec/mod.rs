mod quantization;

pub use quantization::{Quantized, Quantizer};
