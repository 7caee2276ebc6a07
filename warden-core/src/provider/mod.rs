//! External backend implementations of the core seams.

#[cfg(feature = "idp")]
mod idp;

#[cfg(feature = "idp")]
pub use idp::{IdpDirectory, IdpRelationshipStore, IdpStepUpProvider};
