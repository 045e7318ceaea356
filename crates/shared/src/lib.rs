pub mod calendar;
pub mod domain;
pub mod error;
pub mod lifecycle;
pub mod protocol;
pub mod validation;
