pub mod moondream;
