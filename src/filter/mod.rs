pub mod ema;
pub mod hampel;
pub mod savgol;

pub use ema::Ema;
pub use hampel::Hampel;
pub use savgol::SavGol;
