use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a new time-ordered identifier.
///
/// UUID v7 embeds a millisecond timestamp in its most significant bits, so
/// sorting by id recovers creation order without a secondary index. Version
/// tokens use the same scheme.
pub fn new_id() -> Uuid {
    Uuid::now_v7()
}

/// Current UTC time truncated to microseconds, the finest precision the
/// stores keep. Values stamped with it read back unchanged.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// The managed record.
///
/// `id` never changes once assigned. `version` is an opaque stamp that is
/// regenerated on every successful write and compared on conditional replace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: Uuid,
    pub version: Uuid,
    pub email: String,
    pub name: String,
    pub updated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Player {
    /// Builds a brand new player with fresh identity, version and timestamps.
    pub fn new(email: String, name: String) -> Self {
        let now = now();

        Self {
            id: new_id(),
            version: new_id(),
            email,
            name,
            updated_at: now,
            created_at: now,
        }
    }

    /// Returns a copy carrying the new attributes, a fresh version and a
    /// bumped `updated_at`. Identity and `created_at` are preserved.
    pub fn revised(&self, email: String, name: String) -> Self {
        Self {
            id: self.id,
            version: new_id(),
            email,
            name,
            updated_at: now(),
            created_at: self.created_at,
        }
    }
}

/// Exact-match predicate for filtered listings. Present fields are ANDed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl FilterRequest {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref().filter(|e| !e.is_empty())
    }

    /// True when no usable predicate is present. Empty strings count as absent.
    pub fn is_empty(&self) -> bool {
        self.name().is_none() && self.email().is_none()
    }

    pub fn matches(&self, player: &Player) -> bool {
        self.name().is_none_or(|n| player.name == n)
            && self.email().is_none_or(|e| player.email == e)
    }
}

/// One page of a filtered listing plus the unpaginated match count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerPage {
    pub total: u64,
    pub players: Vec<Player>,
}

impl PlayerPage {
    pub fn empty() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_player_has_matching_timestamps() {
        let player = Player::new("a@x.com".to_string(), "Ann".to_string());

        assert_eq!(player.created_at, player.updated_at);
        assert_ne!(player.id, player.version);
        assert!(!player.id.is_nil());
    }

    #[test]
    fn revised_player_keeps_identity() {
        let player = Player::new("a@x.com".to_string(), "Ann".to_string());
        let revised = player.revised("b@x.com".to_string(), "Anne".to_string());

        assert_eq!(revised.id, player.id);
        assert_eq!(revised.created_at, player.created_at);
        assert_ne!(revised.version, player.version);
        assert!(revised.updated_at >= player.updated_at);
        assert_eq!(revised.name, "Anne");
    }

    #[test]
    fn ids_sort_by_creation_order() {
        let ids: Vec<Uuid> = (0..64).map(|_| new_id()).collect();
        let mut sorted = ids.clone();
        sorted.sort();

        assert_eq!(ids, sorted);
    }

    #[test]
    fn filter_treats_blank_fields_as_absent() {
        let request = FilterRequest {
            name: Some(String::new()),
            email: None,
        };
        assert!(request.is_empty());

        let request = FilterRequest {
            name: Some("Ann".to_string()),
            email: Some(String::new()),
        };
        assert!(!request.is_empty());
        assert_eq!(request.email(), None);
    }

    #[test]
    fn filter_matches_with_and_semantics() {
        let player = Player::new("a@x.com".to_string(), "Ann".to_string());

        let by_name = FilterRequest {
            name: Some("Ann".to_string()),
            email: None,
        };
        let both = FilterRequest {
            name: Some("Ann".to_string()),
            email: Some("other@x.com".to_string()),
        };

        assert!(by_name.matches(&player));
        assert!(!both.matches(&player));
    }

    #[test]
    fn player_serializes_with_flat_fields() {
        let player = Player::new("a@x.com".to_string(), "Ann".to_string());
        let json = serde_json::to_value(&player).unwrap();

        assert_eq!(json["id"], player.id.to_string());
        assert_eq!(json["email"], "a@x.com");
        assert!(json["created_at"].as_str().unwrap().ends_with('Z'));
    }
}
