//! SDP Module - Session Description Protocol
//!
//! The RFC 4566 subset a PeerLink description carries: version, origin,
//! session name, timing, session-level ICE credentials and one media
//! section per negotiated stream (the data channel plus audio/video tracks).

pub mod attribute;
pub mod errors;
pub mod media_description;
pub mod origin;
pub mod sdp_type;
pub mod session_description;
pub mod session_description_builder;

pub use attribute::Attribute;
pub use errors::SdpError;
pub use media_description::{Direction, MediaDescription, MediaKind};
pub use origin::Origin;
pub use sdp_type::SdpType;
pub use session_description::SessionDescription;
pub use session_description_builder::SessionDescriptionBuilder;
