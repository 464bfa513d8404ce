//! Complete SDP session description.

use crate::{
    attribute::Attribute, errors::SdpError, media_description::MediaDescription,
    origin::Origin, sdp_type::SdpType,
    session_description_builder::SessionDescriptionBuilder,
};
use std::fmt;

/// A parsed or built session description.
///
/// ICE credentials live at session level (`a=ice-ufrag`, `a=ice-pwd`) and
/// apply to every media section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    pub sdp_type: SdpType,
    pub version: i32,
    pub origin: Origin,
    pub session_name: String,
    pub attributes: Vec<Attribute>,
    pub media: Vec<MediaDescription>,
}

impl SessionDescription {
    pub fn new(sdp_type: SdpType) -> Self {
        Self {
            sdp_type,
            version: 0,
            origin: Origin::default(),
            session_name: "-".to_string(),
            attributes: Vec::new(),
            media: Vec::new(),
        }
    }

    pub fn builder(sdp_type: SdpType) -> SessionDescriptionBuilder {
        SessionDescriptionBuilder::new(sdp_type)
    }

    /// Parses and validates SDP text. Accepts both CRLF and LF line endings.
    ///
    /// Line types other than `v`, `o`, `s`, `m` and `a` are ignored.
    pub fn parse(sdp_type: SdpType, sdp: &str) -> Result<Self, SdpError> {
        let mut session = Self::new(sdp_type);
        let mut current_media: Option<MediaDescription> = None;
        let mut seen_version = false;

        for line in sdp.lines() {
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }

            let (type_char, value) = split_line(line)?;
            match type_char {
                'v' => {
                    session.version = value.parse().map_err(|_| SdpError::InvalidVersion)?;
                    seen_version = true;
                }
                'o' => session.origin = Origin::parse(value)?,
                's' => session.session_name = value.to_string(),
                'm' => {
                    if let Some(media) = current_media.take() {
                        session.media.push(media);
                    }
                    current_media = Some(MediaDescription::parse(value)?);
                }
                'a' => {
                    let attr = Attribute::parse(value);
                    match current_media.as_mut() {
                        Some(media) => media.attributes.push(attr),
                        None => session.attributes.push(attr),
                    }
                }
                _ => {}
            }
        }

        if let Some(media) = current_media {
            session.media.push(media);
        }
        if !seen_version {
            return Err(SdpError::InvalidVersion);
        }

        session.validate()?;
        Ok(session)
    }

    pub fn validate(&self) -> Result<(), SdpError> {
        if self.version != 0 {
            return Err(SdpError::InvalidVersionNumber);
        }
        self.origin.validate()?;
        if self.session_name.is_empty() {
            return Err(SdpError::EmptySessionName);
        }
        if self.media.is_empty() {
            return Err(SdpError::NoMediaSections);
        }
        for media in &self.media {
            media.validate()?;
        }
        Ok(())
    }

    /// First value of the session-level attribute called `name`.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .and_then(|a| a.value.as_deref())
    }

    /// `(ice-ufrag, ice-pwd)`, falling back to the first media section that carries them.
    pub fn ice_credentials(&self) -> Result<(&str, &str), SdpError> {
        let lookup = |name: &'static str| {
            self.attribute(name)
                .or_else(|| self.media.iter().find_map(|m| m.attribute(name)))
                .ok_or(SdpError::MissingAttribute(name))
        };
        Ok((lookup("ice-ufrag")?, lookup("ice-pwd")?))
    }

    /// `a=candidate` values embedded in the description, if any.
    pub fn candidates(&self) -> Vec<&str> {
        self.attributes
            .iter()
            .chain(self.media.iter().flat_map(|m| m.attributes.iter()))
            .filter(|a| a.name == "candidate")
            .filter_map(|a| a.value.as_deref())
            .collect()
    }
}

fn split_line(line: &str) -> Result<(char, &str), SdpError> {
    let (type_str, value) = line
        .split_once('=')
        .ok_or_else(|| SdpError::InvalidLineFormat(line.to_string()))?;

    let mut chars = type_str.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok((c, value)),
        _ => Err(SdpError::InvalidLineFormat(line.to_string())),
    }
}

/// Serializes in RFC 4566 order with CRLF line endings.
impl fmt::Display for SessionDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v={}\r\n", self.version)?;
        write!(f, "{}", self.origin)?;
        write!(f, "s={}\r\n", self.session_name)?;
        write!(f, "t=0 0\r\n")?;
        for attr in &self.attributes {
            write!(f, "{}", attr)?;
        }
        for media in &self.media {
            write!(f, "{}", media)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media_description::{Direction, MediaKind};

    fn sample_offer() -> String {
        "v=0\r\n\
         o=- 4611731400430051336 1 IN IP4 127.0.0.1\r\n\
         s=-\r\n\
         t=0 0\r\n\
         a=ice-ufrag:F7gI\r\n\
         a=ice-pwd:x9cml/YzichV2+XlhiMu8g\r\n\
         m=application 9 UDP/DTLS/SCTP webrtc-datachannel\r\n\
         a=mid:0\r\n\
         m=video 9 UDP/TLS/RTP/SAVPF 96\r\n\
         a=mid:1\r\n\
         a=sendrecv\r\n\
         a=msid:stream camera\r\n"
            .to_string()
    }

    #[test]
    fn test_parse_offer() {
        let session = SessionDescription::parse(SdpType::Offer, &sample_offer()).unwrap();
        assert_eq!(session.sdp_type, SdpType::Offer);
        assert_eq!(session.origin.session_id, 4611731400430051336);
        assert_eq!(session.media.len(), 2);
        assert_eq!(session.media[0].kind, MediaKind::Application);
        assert_eq!(session.media[1].msid(), Some(("stream", "camera")));
        assert_eq!(
            session.ice_credentials().unwrap(),
            ("F7gI", "x9cml/YzichV2+XlhiMu8g")
        );
    }

    #[test]
    fn test_parse_accepts_lf_only() {
        let text = sample_offer().replace("\r\n", "\n");
        assert!(SessionDescription::parse(SdpType::Offer, &text).is_ok());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            SessionDescription::parse(SdpType::Offer, "not an sdp"),
            Err(SdpError::InvalidLineFormat(_))
        ));
        assert_eq!(
            SessionDescription::parse(SdpType::Offer, ""),
            Err(SdpError::InvalidVersion)
        );
    }

    #[test]
    fn test_parse_requires_media() {
        let text = "v=0\r\no=- 1 1 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n";
        assert_eq!(
            SessionDescription::parse(SdpType::Answer, text),
            Err(SdpError::NoMediaSections)
        );
    }

    #[test]
    fn test_missing_credentials() {
        let text = "v=0\r\no=- 1 1 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n\
                    m=application 9 UDP/DTLS/SCTP webrtc-datachannel\r\n";
        let session = SessionDescription::parse(SdpType::Offer, text).unwrap();
        assert_eq!(
            session.ice_credentials(),
            Err(SdpError::MissingAttribute("ice-ufrag"))
        );
    }

    #[test]
    fn test_display_then_parse_preserves_sections() {
        let session = SessionDescription::builder(SdpType::Answer)
            .origin(Origin {
                session_id: 7,
                ..Default::default()
            })
            .add_attribute(Attribute::with_value("ice-ufrag", "abcd"))
            .add_attribute(Attribute::with_value("ice-pwd", "0123456789abcdefghijkl"))
            .add_media(MediaDescription::data_channel("0"))
            .add_media(MediaDescription::track(
                MediaKind::Audio,
                "1",
                Direction::RecvOnly,
                None,
            ))
            .build()
            .unwrap();

        let text = session.to_string();
        assert!(text.starts_with("v=0\r\no=- 7 1 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n"));

        let parsed = SessionDescription::parse(SdpType::Answer, &text).unwrap();
        assert_eq!(parsed, session);
    }

    #[test]
    fn test_candidates_collected_from_all_levels() {
        let text = format!(
            "{}a=candidate:1 1 TCP 2130706431 127.0.0.1 5000 typ host\r\n",
            sample_offer()
        );
        let session = SessionDescription::parse(SdpType::Offer, &text).unwrap();
        assert_eq!(
            session.candidates(),
            vec!["1 1 TCP 2130706431 127.0.0.1 5000 typ host"]
        );
    }
}
