pub mod source;
pub mod torch;
