//! Fluent construction of session descriptions.

use crate::{
    attribute::Attribute, errors::SdpError, media_description::MediaDescription,
    origin::Origin, sdp_type::SdpType, session_description::SessionDescription,
};

pub struct SessionDescriptionBuilder {
    session: SessionDescription,
}

impl SessionDescriptionBuilder {
    pub fn new(sdp_type: SdpType) -> Self {
        Self {
            session: SessionDescription::new(sdp_type),
        }
    }

    pub fn origin(mut self, origin: Origin) -> Self {
        self.session.origin = origin;
        self
    }

    pub fn session_name(mut self, name: impl Into<String>) -> Self {
        self.session.session_name = name.into();
        self
    }

    /// Sets `a=ice-ufrag` and `a=ice-pwd` at session level.
    pub fn ice_credentials(self, ufrag: &str, pwd: &str) -> Self {
        self.add_attribute(Attribute::with_value("ice-ufrag", ufrag))
            .add_attribute(Attribute::with_value("ice-pwd", pwd))
    }

    pub fn add_attribute(mut self, attr: Attribute) -> Self {
        self.session.attributes.push(attr);
        self
    }

    pub fn add_media(mut self, media: MediaDescription) -> Self {
        self.session.media.push(media);
        self
    }

    /// Validates and returns the description.
    ///
    /// # Errors
    ///
    /// Fails with the first [`SdpError`] found by [`SessionDescription::validate`].
    pub fn build(self) -> Result<SessionDescription, SdpError> {
        self.session.validate()?;
        Ok(self.session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_credentials() {
        let session = SessionDescription::builder(SdpType::Offer)
            .origin(Origin::generate())
            .ice_credentials("ufrag", "0123456789abcdefghijkl")
            .add_media(MediaDescription::data_channel("0"))
            .build()
            .unwrap();
        assert_eq!(
            session.ice_credentials().unwrap(),
            ("ufrag", "0123456789abcdefghijkl")
        );
    }

    #[test]
    fn test_builder_rejects_missing_origin_id() {
        let result = SessionDescription::builder(SdpType::Offer)
            .add_media(MediaDescription::data_channel("0"))
            .build();
        assert_eq!(result, Err(SdpError::InvalidSessionId));
    }

    #[test]
    fn test_builder_rejects_empty_session() {
        let result = SessionDescription::builder(SdpType::Offer)
            .origin(Origin::generate())
            .build();
        assert_eq!(result, Err(SdpError::NoMediaSections));
    }
}
