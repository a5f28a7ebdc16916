pub mod median;
pub mod rebin;
pub mod reference;
