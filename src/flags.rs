//! Startup flags
//!
//! Derives the record handed to the application's `init` from the page
//! location. Missing query parameters map to defaults, never to errors.

use serde::Serialize;
use url::Url;

use crate::error::BootstrapError;

/// Query parameter naming the room to join.
pub const ROOM_PARAM: &str = "room";
/// Query parameter carrying the opponent's display name.
pub const PLAYER_NAME_PARAM: &str = "playerName";

/// Flags passed once into the application at mount time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartupConfig {
    pub host: String,
    pub joining_room: bool,
    pub room_id: String,
    pub opponent_name: String,
}

impl StartupConfig {
    /// Build the flags from a page location.
    ///
    /// `joining_room` follows the truthiness of the raw `room` value: a
    /// present but empty `room` means "not joining".
    pub fn from_location(location: &Url) -> Self {
        let room = query_param(location, ROOM_PARAM);
        let opponent_name = query_param(location, PLAYER_NAME_PARAM).unwrap_or_default();

        Self {
            host: location.as_str().to_owned(),
            joining_room: room.as_deref().is_some_and(|room| !room.is_empty()),
            room_id: room.unwrap_or_default(),
            opponent_name,
        }
    }

    /// Encode as the JSON object literal the application receives.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// First value for `key`, like `URLSearchParams.get`.
fn query_param(location: &Url, key: &str) -> Option<String> {
    location
        .query_pairs()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.into_owned())
}

/// The page location the host pretends to be serving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location(Url);

impl Location {
    pub fn parse(location: &str) -> Result<Self, BootstrapError> {
        Url::parse(location)
            .map(Self)
            .map_err(|source| BootstrapError::InvalidLocation {
                location: location.to_owned(),
                source,
            })
    }

    pub fn url(&self) -> &Url {
        &self.0
    }

    pub fn href(&self) -> &str {
        self.0.as_str()
    }

    /// Serialized origin, e.g. `http://localhost:3000`.
    pub fn origin(&self) -> String {
        self.0.origin().ascii_serialization()
    }

    /// `window.location` fields as a JSON object.
    pub fn to_js_object(&self) -> serde_json::Value {
        let url = &self.0;
        let hostname = url.host_str().unwrap_or_default();
        let port = url.port().map(|p| p.to_string()).unwrap_or_default();
        let host = if port.is_empty() {
            hostname.to_owned()
        } else {
            format!("{}:{}", hostname, port)
        };

        serde_json::json!({
            "href": url.as_str(),
            "origin": self.origin(),
            "protocol": format!("{}:", url.scheme()),
            "host": host,
            "hostname": hostname,
            "port": port,
            "pathname": url.path(),
            "search": url.query().map(|q| format!("?{}", q)).unwrap_or_default(),
            "hash": url.fragment().map(|f| format!("#{}", f)).unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(location: &str) -> StartupConfig {
        StartupConfig::from_location(&Url::parse(location).unwrap())
    }

    #[test_log::test]
    fn no_room_means_not_joining() {
        let config = flags("http://localhost:3000/?playerName=Bob");
        assert!(!config.joining_room);
        assert_eq!(config.room_id, "");
        assert_eq!(config.opponent_name, "Bob");
    }

    #[test_log::test]
    fn empty_room_means_not_joining() {
        let config = flags("http://localhost:3000/?room=");
        assert!(!config.joining_room);
        assert_eq!(config.room_id, "");

        let bare = flags("http://localhost:3000/?room");
        assert!(!bare.joining_room);
        assert_eq!(bare.room_id, "");
    }

    #[test_log::test]
    fn room_present_means_joining() {
        let config = flags("http://localhost:3000/?room=abc123");
        assert!(config.joining_room);
        assert_eq!(config.room_id, "abc123");
        assert_eq!(config.opponent_name, "");
    }

    #[test_log::test]
    fn full_query_from_a_shared_link() {
        let config = flags("http://localhost:3000/?room=game42&playerName=Ada");
        assert_eq!(
            config,
            StartupConfig {
                host: "http://localhost:3000/?room=game42&playerName=Ada".to_string(),
                joining_room: true,
                room_id: "game42".to_string(),
                opponent_name: "Ada".to_string(),
            }
        );
    }

    #[test_log::test]
    fn first_repeated_value_wins() {
        let config = flags("http://localhost:3000/?room=first&room=second");
        assert_eq!(config.room_id, "first");
    }

    #[test_log::test]
    fn values_are_decoded() {
        let config = flags("http://localhost:3000/?playerName=Ada+L%C3%B6vel&room=a%26b");
        assert_eq!(config.opponent_name, "Ada Lövel");
        assert_eq!(config.room_id, "a&b");
    }

    #[test_log::test]
    fn json_uses_application_field_names() {
        let config = flags("http://localhost:3000/?room=game42&playerName=Ada");
        let json: serde_json::Value = serde_json::from_str(&config.to_json().unwrap()).unwrap();
        assert_eq!(json["joiningRoom"], true);
        assert_eq!(json["roomId"], "game42");
        assert_eq!(json["opponentName"], "Ada");
        assert_eq!(json["host"], "http://localhost:3000/?room=game42&playerName=Ada");
    }

    #[test_log::test]
    fn malformed_location_is_a_startup_error() {
        let err = Location::parse("not a url").unwrap_err();
        assert!(matches!(err, BootstrapError::InvalidLocation { .. }));
    }

    #[test_log::test]
    fn location_fields() {
        let location = Location::parse("https://play.example.com:8443/lobby?room=x#top").unwrap();
        let js = location.to_js_object();
        assert_eq!(js["origin"], "https://play.example.com:8443");
        assert_eq!(js["protocol"], "https:");
        assert_eq!(js["host"], "play.example.com:8443");
        assert_eq!(js["pathname"], "/lobby");
        assert_eq!(js["search"], "?room=x");
        assert_eq!(js["hash"], "#top");
    }
}
