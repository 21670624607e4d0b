mod occurrence;
mod reminder;
mod status;
mod webhook;

pub mod dtos {
    pub use crate::occurrence::dtos::*;
    pub use crate::reminder::dtos::*;
}

pub use crate::occurrence::api::*;
pub use crate::reminder::api::*;
pub use crate::status::api::*;
pub use crate::webhook::api::*;
