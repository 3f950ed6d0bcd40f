use serde::{Deserialize, Serialize};

/// Engagement edge label between a reacting post and its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EngagementType {
    Reply,
    Like,
    Zap,
}

impl EngagementType {
    pub const ALL: [EngagementType; 3] = [
        EngagementType::Reply,
        EngagementType::Like,
        EngagementType::Zap,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EngagementType::Reply => "REPLY",
            EngagementType::Like => "LIKE",
            EngagementType::Zap => "ZAP",
        }
    }

    /// Exact, case-sensitive match on the relationship type
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "REPLY" => Some(EngagementType::Reply),
            "LIKE" => Some(EngagementType::Like),
            "ZAP" => Some(EngagementType::Zap),
            _ => None,
        }
    }
}

/// Engagement edge as read from the store, before validation
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawEngagement {
    #[serde(rename = "type")]
    pub edge_type: String,
    /// Pubkey of the reacting post's author
    pub author: Option<String>,
    /// Similarity score from the viewer to the author, if such an edge exists
    pub affinity: Option<f64>,
}

/// Validated engagement edge
#[derive(Debug, Clone, PartialEq)]
pub struct Engagement {
    pub kind: EngagementType,
    pub author: String,
    pub affinity: Option<f64>,
}

impl Engagement {
    pub fn new(kind: EngagementType, author: impl Into<String>) -> Self {
        Self {
            kind,
            author: author.into(),
            affinity: None,
        }
    }

    pub fn with_affinity(mut self, affinity: f64) -> Self {
        self.affinity = Some(affinity);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engagement_type_labels() {
        for kind in EngagementType::ALL {
            assert_eq!(EngagementType::from_label(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn test_engagement_type_label_is_case_sensitive() {
        assert_eq!(EngagementType::from_label("reply"), None);
        assert_eq!(EngagementType::from_label("REPOST"), None);
        assert_eq!(EngagementType::from_label(""), None);
    }
}
